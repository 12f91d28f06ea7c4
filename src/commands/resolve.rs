use std::sync::Arc;

use anyhow::{anyhow, Result};
use dashmap::DashMap;
use npym::resolver::{deep_fetch, sync_versions, DeepFetchQuery};
use npym::{version_sem_to_py, NameImporter, Resolver, Store};

pub fn run(package: &str, version: &str, dry_run: bool) -> Result<()> {
    let (config, store, npm) = super::open_context()?;

    // Crawl the reachable packages once so their names can be mapped before
    // the resolver runs.
    println!("Prefetching metadata for {}@{}...", package, version);
    let cache = Arc::new(DashMap::new());
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(deep_fetch(
        npm.clone(),
        cache.clone(),
        DeepFetchQuery {
            js_name: package.to_string(),
            spec: version.to_string(),
        },
    ));

    let mut names: Vec<String> = cache.iter().map(|entry| entry.key().clone()).collect();
    if !names.iter().any(|n| n == package) {
        names.push(package.to_string());
    }
    NameImporter::new(&store, &config.prefix, config.import_chunk_size)
        .import(names, |_| {})?;

    let distribution = store
        .distribution_by_js_name(package)?
        .ok_or_else(|| anyhow!("package not found on the registry: {}", package))?;

    let info = npm.get_package_info(package)?;
    sync_versions(&store, distribution.id, &info)?;

    let python_version = version_sem_to_py(version)?;
    let root_version = store
        .version_by_python_version(distribution.id, &python_version)?
        .ok_or_else(|| anyhow!("version not found: {}@{}", package, version))?;

    let mut resolver = Resolver::new(&npm, &store, root_version.clone())?;

    if dry_run {
        resolver.build_dep_tree()?;
    } else {
        resolver.resolve()?;
        store.persist()?;
    }

    println!("{}", resolver.tree_display()?);

    if !dry_run {
        let synthetic = store.synthetic_for(root_version.id)?;
        println!("Saved {} synthetic distributions", synthetic.len());
    }

    Ok(())
}
