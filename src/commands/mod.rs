pub mod import_names;
pub mod purge;
pub mod resolve;
pub mod search;
pub mod translate;

use anyhow::Result;
use npym::{Config, MemoryStore, NpmClient};

/// Shared command setup: configuration, the file-backed store harness and a
/// registry client.
pub fn open_context() -> Result<(Config, MemoryStore, NpmClient)> {
    let config = Config::load()?;
    let store = MemoryStore::open(config.storage_dir.clone())?;
    let npm = NpmClient::from_config(&config)?;

    Ok((config, store, npm))
}
