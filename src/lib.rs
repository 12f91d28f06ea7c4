//! NPyM - Serve the NPM registry to Python package managers
//!
//! NPyM exposes NPM packages as if they were Python distributions, so that
//! pip-style tooling can install JavaScript packages (the JS runtime is still
//! required at use time) from synthesized wheel archives. The hard parts live
//! in four subsystems:
//!
//! - A SemVer range algebra that parses NPM version specifiers into a
//!   canonical disjunction of intervals, with intersection, union and
//!   translation into Python specifiers
//! - A name mapper that folds the ~2M NPM names into a disjoint, stable
//!   Python-side namespace
//! - A resolver that mimics NPM's nested `node_modules` semantics while
//!   flattening where possible, materialized as uniquely-named synthetic
//!   distributions
//! - A wheel synthesizer that turns a verified NPM tarball into a
//!   bit-reproducible Python wheel with synthesized metadata
//!
//! # Examples
//!
//! ```no_run
//! use npym::{Config, NameImporter, MemoryStore, NpmClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let store = MemoryStore::new(config.storage_dir.clone());
//! let npm = NpmClient::from_config(&config)?;
//!
//! let importer = NameImporter::new(&store, &config.prefix, config.import_chunk_size);
//! let stats = importer.import(npm.get_all_names()?, |_| {})?;
//! println!("Imported {} names", stats.inserted);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`version`] - Version interval arithmetic and SemVer → PEP 440 conversion
//! - [`specifier`] - The NPM version specifier grammar
//! - [`names`] - NPM → Python name normalization and deduplication
//! - [`npm`] - NPM registry client and metadata types
//! - [`store`] - Storage entities and the persistence interface
//! - [`resolver`] - Dependency tree construction and persistence
//! - [`translator`] - Wheel synthesis
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result handling

pub mod config;
pub mod error;
pub mod names;
pub mod npm;
pub mod resolver;
pub mod specifier;
pub mod store;
pub mod translator;
pub mod version;

pub use config::Config;
pub use error::{Error, Result};
pub use names::{searchable_py_name, NameImporter, NormName};
pub use npm::{NpmClient, PackageInfo, StaticNpmClient, VersionInfo};
pub use resolver::{hash_data, package_versions, Resolver, VersionConstraint};
pub use specifier::{parse_spec, sem_range_to_py_range};
pub use store::{
    Archive, ArchiveFormat, Dependencies, Distribution, MemoryStore, Store, TranslatorVersion,
    Version,
};
pub use translator::{
    get_or_create_archive, parse_wheel_filename, serve_archive, PackageTranslator,
};
pub use version::{version_sem_to_py, Bound, Range, Ver};
