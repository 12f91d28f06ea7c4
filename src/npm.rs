//! NPM registry client and metadata types
//!
//! Mirrors the two endpoints the system needs: the per-package metadata
//! document (`GET /{name}`) and the daily export of all package names. The
//! client comes in two flavors behind one enum: an HTTP client for the real
//! registry and a static, in-memory one used by tests and offline runs, so
//! the resolver and the wheel synthesizer can be exercised without network.
//!
//! # Examples
//!
//! ```no_run
//! use npym::{Config, NpmClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let npm = NpmClient::from_config(&config)?;
//! let info = npm.get_package_info("lodash")?;
//! println!("{} has {} versions", info.name, info.versions.len());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Config, Error, Result};

/// Daily export of every NPM package name, published on GitHub.
pub const NAMES_JSON: &str =
    "https://raw.githubusercontent.com/nice-registry/all-the-package-names/master/names.json";

/// The slice of the registry metadata document that the system consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub versions: HashMap<String, VersionInfo>,
}

/// One version entry of a metadata document.
///
/// The registry mirrors whatever ended up in `package.json`, so everything
/// beyond the fields with structural guarantees is kept as loose JSON and
/// interpreted leniently at wheel-synthesis time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dist: Option<DistInfo>,
    #[serde(default)]
    pub bin: Option<BinField>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<Value>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub bugs: Option<Value>,
    #[serde(default)]
    pub repository: Option<Value>,
    #[serde(default)]
    pub homepage: Option<Value>,
    #[serde(default)]
    pub keywords: Option<Value>,
    #[serde(default)]
    pub maintainers: Option<Value>,
}

/// Where to download the version's tarball and what it must hash to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistInfo {
    pub tarball: String,
    #[serde(default)]
    pub integrity: Option<String>,
}

/// The `bin` field of `package.json`: either a single script path (the script
/// takes the package's base name) or an explicit name → path map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

impl BinField {
    /// Normalize to a name → path map, using the unscoped package name for
    /// the single-script form.
    pub fn as_map(&self, js_name: &str) -> BTreeMap<String, String> {
        match self {
            BinField::Map(map) => map.clone(),
            BinField::Single(path) => {
                let base = js_name.rsplit('/').next().unwrap_or(js_name);
                BTreeMap::from([(base.to_string(), path.clone())])
            }
        }
    }
}

#[derive(Clone)]
pub enum NpmClient {
    Http(HttpNpmClient),
    Static(StaticNpmClient),
}

impl NpmClient {
    /// Create a client against the registry configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(NpmClient::Http(HttpNpmClient::new(
            config.registry_url.clone(),
            config.names_url.clone(),
        )?))
    }

    /// Retrieves the information about a specific package.
    pub fn get_package_info(&self, js_name: &str) -> Result<PackageInfo> {
        match self {
            NpmClient::Http(client) => client.get_package_info(js_name),
            NpmClient::Static(client) => client.get_package_info(js_name),
        }
    }

    /// Same as [`NpmClient::get_package_info`] but from an async context,
    /// used by the deep-fetch prefetch.
    pub async fn async_get_package_info(&self, js_name: &str) -> Result<PackageInfo> {
        match self {
            NpmClient::Http(client) => client.async_get_package_info(js_name).await,
            NpmClient::Static(client) => client.get_package_info(js_name),
        }
    }

    /// Streams a tarball to `dest`.
    pub fn download_tarball(&self, url: &str, dest: &Path) -> Result<()> {
        match self {
            NpmClient::Http(client) => client.download_tarball(url, dest),
            NpmClient::Static(client) => client.download_tarball(url, dest),
        }
    }

    /// Downloads the full list of package names.
    pub fn get_all_names(&self) -> Result<Vec<String>> {
        match self {
            NpmClient::Http(client) => client.get_all_names(),
            NpmClient::Static(client) => Ok(client.inner.names.clone()),
        }
    }
}

#[derive(Clone)]
pub struct HttpNpmClient {
    base_url: String,
    names_url: String,
    client: reqwest::blocking::Client,
    async_client: reqwest::Client,
}

impl HttpNpmClient {
    pub fn new(base_url: String, names_url: String) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            names_url,
            client: reqwest::blocking::Client::builder().build()?,
            async_client: reqwest::Client::builder().build()?,
        })
    }

    /// Registry names keep their `/` separator but everything else gets
    /// percent-encoded (scoped packages become `@scope/name`).
    fn package_url(&self, js_name: &str) -> String {
        let quoted = urlencoding::encode(js_name).replace("%2F", "/");
        format!("{}/{}", self.base_url, quoted)
    }

    pub fn get_package_info(&self, js_name: &str) -> Result<PackageInfo> {
        let response = self.client.get(self.package_url(js_name)).send()?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound(js_name.to_string()));
        }

        Ok(response.error_for_status()?.json()?)
    }

    pub async fn async_get_package_info(&self, js_name: &str) -> Result<PackageInfo> {
        let response = self.async_client.get(self.package_url(js_name)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound(js_name.to_string()));
        }

        Ok(response.error_for_status()?.json().await?)
    }

    pub fn download_tarball(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut file = File::create(dest)?;
        response.copy_to(&mut file)?;

        Ok(())
    }

    pub fn get_all_names(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.names_url).send()?.error_for_status()?;

        Ok(serde_json::from_reader(response)?)
    }
}

/// In-memory registry: a fixed set of metadata documents, tarball blobs and
/// names. Drives the resolver and synthesizer tests without network.
#[derive(Clone, Default)]
pub struct StaticNpmClient {
    inner: Arc<StaticInner>,
}

#[derive(Default)]
struct StaticInner {
    packages: HashMap<String, PackageInfo>,
    tarballs: HashMap<String, Vec<u8>>,
    names: Vec<String>,
}

/// Builder for [`StaticNpmClient`].
#[derive(Default)]
pub struct StaticNpmClientBuilder {
    inner: StaticInner,
}

impl StaticNpmClientBuilder {
    pub fn package(mut self, info: PackageInfo) -> Self {
        self.inner.names.push(info.name.clone());
        self.inner.packages.insert(info.name.clone(), info);
        self
    }

    /// Register a package from a raw metadata document.
    pub fn package_json(self, doc: Value) -> Self {
        let info: PackageInfo =
            serde_json::from_value(doc).expect("invalid static package document");
        self.package(info)
    }

    pub fn tarball(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.inner.tarballs.insert(url.to_string(), bytes);
        self
    }

    pub fn build(self) -> NpmClient {
        NpmClient::Static(StaticNpmClient {
            inner: Arc::new(self.inner),
        })
    }
}

impl StaticNpmClient {
    pub fn builder() -> StaticNpmClientBuilder {
        StaticNpmClientBuilder::default()
    }

    fn get_package_info(&self, js_name: &str) -> Result<PackageInfo> {
        self.inner
            .packages
            .get(js_name)
            .cloned()
            .ok_or_else(|| Error::PackageNotFound(js_name.to_string()))
    }

    fn download_tarball(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .inner
            .tarballs
            .get(url)
            .ok_or_else(|| Error::Other(format!("no tarball registered for {}", url)))?;

        std::fs::write(dest, bytes)?;

        Ok(())
    }
}
