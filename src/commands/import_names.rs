use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use npym::NameImporter;

pub fn run() -> Result<()> {
    let (config, store, npm) = super::open_context()?;

    println!("Downloading the package name list...");
    let names = npm.get_all_names()?;
    println!("Importing {} names", names.len());

    let bar = ProgressBar::new(names.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}]")?,
    );

    let importer = NameImporter::new(&store, &config.prefix, config.import_chunk_size);
    let stats = importer.import(names, |seen| bar.set_position(seen as u64))?;
    bar.finish();

    store.persist()?;

    println!(
        "Imported {} new distributions into {} buckets ({} collisions among {} names)",
        stats.inserted, stats.buckets, stats.collisions, stats.seen
    );

    Ok(())
}
