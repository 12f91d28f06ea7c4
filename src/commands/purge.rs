use anyhow::Result;
use npym::Store;

pub fn run_archives() -> Result<()> {
    let (_config, store, _npm) = super::open_context()?;

    let deleted = store.purge_archives()?;
    store.persist()?;

    println!("Deleted {} archives", deleted);

    Ok(())
}

pub fn run_derivates() -> Result<()> {
    let (_config, store, _npm) = super::open_context()?;

    let deleted = store.purge_derivates()?;
    store.persist()?;

    println!("Deleted {} synthetic distributions", deleted);

    Ok(())
}
