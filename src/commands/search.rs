use anyhow::{anyhow, Result};
use npym::Store;

pub fn run(package: &str) -> Result<()> {
    let (_config, store, _npm) = super::open_context()?;

    let distribution = store.distribution_by_js_name(package)?.ok_or_else(|| {
        anyhow!(
            "no distribution mapped for '{}' (run `npym import-names` first)",
            package
        )
    })?;

    println!("{}", distribution.python_name);

    if !distribution.description.is_empty() {
        println!("  {}", distribution.description);
    }
    println!("  {}", distribution.npm_url());

    Ok(())
}
