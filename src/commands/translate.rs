use anyhow::{anyhow, Result};
use npym::resolver::sync_versions;
use npym::{get_or_create_archive, version_sem_to_py, NameImporter, Store};

pub fn run(package: &str, version: &str) -> Result<()> {
    let (config, store, npm) = super::open_context()?;

    NameImporter::new(&store, &config.prefix, config.import_chunk_size)
        .import([package.to_string()], |_| {})?;

    let distribution = store
        .distribution_by_js_name(package)?
        .ok_or_else(|| anyhow!("package not found: {}", package))?;

    let info = npm.get_package_info(package)?;
    sync_versions(&store, distribution.id, &info)?;

    let python_version = version_sem_to_py(version)?;
    let archive = get_or_create_archive(
        &store,
        &npm,
        &config.prefix,
        &distribution.python_name_searchable,
        &python_version,
    )?;

    store.persist()?;

    println!("Archive:  {}", store.blob_path(&archive).display());
    println!("SHA-256:  {}", archive.hash_sha256);

    Ok(())
}
