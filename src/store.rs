//! Storage entities and the persistence interface
//!
//! The relational backend itself lives outside this crate; the core only
//! talks to the [`Store`] trait, which captures the handful of operations the
//! mapper, the resolver and the wheel synthesizer need. [`MemoryStore`] is
//! the reference implementation backing the tests and the CLI harness, with
//! archive blobs written under the same four-level hash-prefix layout a
//! production backend would use.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Pre-resolved dependencies of a package: the sentinel for "resolution has
/// not happened yet", or a `python_name → python-range-specifier` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dependencies {
    #[default]
    Unresolved,
    Resolved(BTreeMap<String, String>),
}

impl Dependencies {
    pub fn as_resolved(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Dependencies::Unresolved => None,
            Dependencies::Resolved(map) => Some(map),
        }
    }
}

/// The mapping of one JS package to a Python distribution.
///
/// Primary distributions (`original = None`, `generated_for = None`) come
/// from the bulk name import, one per canonical NPM name. Synthetic ones are
/// produced by the resolver for a specific root version and are disposable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Uuid,
    /// The canonical NPM name, or the slash-joined ancestor chain for
    /// synthetic distributions.
    pub js_name: String,
    /// The normalized Python name, globally unique.
    pub python_name: String,
    /// The Python name before deduplication, searchable form.
    pub python_name_base: String,
    /// The final Python name in searchable form, globally unique.
    pub python_name_searchable: String,
    /// Position of this JS name inside its collision bucket; never changes
    /// once assigned.
    pub dedup_seq: i32,
    pub description: String,
    /// The primary distribution this one is a synthetic copy of.
    pub original: Option<Uuid>,
    /// The root Version this synthetic distribution was generated for.
    pub generated_for: Option<Uuid>,
    pub dependencies: Dependencies,
}

impl Distribution {
    pub fn is_primary(&self) -> bool {
        self.generated_for.is_none()
    }

    /// The distribution to use for registry metadata: the original behind a
    /// synthetic copy, or the distribution itself.
    pub fn real_id(&self) -> Uuid {
        self.original.unwrap_or(self.id)
    }

    pub fn npm_url(&self) -> String {
        format!(
            "https://www.npmjs.com/package/{}",
            urlencoding::encode(&self.js_name)
        )
    }

    /// The wheel file name for one of this distribution's versions:
    /// `{name with - and . mapped to _}-{version}-{py}-{abi}-{platform}.whl`.
    pub fn wheel_name(&self, python_version: &str) -> String {
        let name = self.python_name.replace(['-', '.'], "_");
        format!("{}-{}-py3-none-any.whl", name, python_version)
    }
}

/// A version of a distribution, keyed by its converted Python version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub distribution: Uuid,
    pub python_version: String,
    pub js_version: String,
    /// Only set on tree roots, by the resolver.
    pub dependencies: Dependencies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Wheel,
    Sdist,
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveFormat::Wheel => write!(f, "wheel"),
            ArchiveFormat::Sdist => write!(f, "sdist"),
        }
    }
}

/// Version tag of the synthesis algorithm. Bumping it invalidates every
/// cached archive without touching the stored files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorVersion {
    V1,
}

impl std::fmt::Display for TranslatorVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorVersion::V1 => write!(f, "v1"),
        }
    }
}

/// A cached archive for a version, stored once per (format, translator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub id: Uuid,
    pub version: Uuid,
    pub format: ArchiveFormat,
    pub translator: TranslatorVersion,
    pub hash_sha256: String,
    /// Blob reference, relative to the storage root.
    pub archive: String,
}

/// Append-only record of archive fetches, for statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: Uuid,
    pub archive: Uuid,
    pub date: DateTime<Utc>,
}

/// The blob path for an archive: fan out under the first four bytes of the
/// hash so no directory grows unbounded.
pub fn archive_blob_path(
    translator: TranslatorVersion,
    hash_sha256: &str,
    file_name: &str,
) -> String {
    format!(
        "distributions/{}/{}/{}/{}/{}/{}",
        translator,
        &hash_sha256[0..2],
        &hash_sha256[2..4],
        &hash_sha256[4..6],
        &hash_sha256[6..8],
        file_name,
    )
}

/// Guard for a row-level exclusive lock on a Distribution, held for the
/// duration of an archive lookup-or-create.
pub struct DistributionLock {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

/// The persistence operations the core consumes.
pub trait Store: Send + Sync {
    fn distribution_by_id(&self, id: Uuid) -> Result<Option<Distribution>>;

    /// Primary distribution lookup by canonical NPM name.
    fn distribution_by_js_name(&self, js_name: &str) -> Result<Option<Distribution>>;

    fn distribution_by_python_name(&self, python_name: &str) -> Result<Option<Distribution>>;

    fn distribution_by_searchable(&self, searchable: &str) -> Result<Option<Distribution>>;

    /// Primary distributions whose base matches any of the given ones,
    /// ordered by `dedup_seq`.
    fn distributions_by_base(&self, bases: &[String]) -> Result<Vec<Distribution>>;

    /// Primary distributions for the given NPM names.
    fn distributions_by_js_names(&self, js_names: &[String]) -> Result<Vec<Distribution>>;

    /// Bulk insert with on-conflict-do-nothing on `(generated_for, js_name)`
    /// and on `python_name`. Returns the number of rows actually inserted.
    fn insert_distributions(&self, rows: Vec<Distribution>) -> Result<usize>;

    /// Bulk insert with on-conflict-do-nothing on
    /// `(distribution, python_version)`. Returns the number of rows inserted.
    fn insert_versions(&self, rows: Vec<Version>) -> Result<usize>;

    /// All versions of a distribution, newest first by PEP 440 ordering.
    fn versions_for_distribution(&self, distribution: Uuid) -> Result<Vec<Version>>;

    fn version_by_id(&self, id: Uuid) -> Result<Option<Version>>;

    fn version_by_python_version(
        &self,
        distribution: Uuid,
        python_version: &str,
    ) -> Result<Option<Version>>;

    fn set_version_dependencies(
        &self,
        version: Uuid,
        dependencies: BTreeMap<String, String>,
    ) -> Result<()>;

    fn set_distribution_description(&self, distribution: Uuid, description: &str) -> Result<()>;

    /// Row-level select-for-update: serializes archive synthesis per
    /// distribution.
    fn lock_distribution(&self, distribution: Uuid) -> Result<DistributionLock>;

    fn archive_for_version(
        &self,
        version: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
    ) -> Result<Option<Archive>>;

    /// Archives of every version of a distribution, for the given format and
    /// translator.
    fn archives_for_distribution(
        &self,
        distribution: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
    ) -> Result<Vec<Archive>>;

    /// Persist a freshly built archive: copy the blob into storage and create
    /// the row.
    fn create_archive(
        &self,
        version: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
        hash_sha256: String,
        blob_source: &Path,
        file_name: &str,
    ) -> Result<Archive>;

    fn record_download(&self, archive: Uuid) -> Result<()>;

    /// Delete every archive row and blob. Returns the number deleted.
    fn purge_archives(&self) -> Result<usize>;

    /// Delete every synthetic distribution (cascading their versions and
    /// archives) and reset all stored resolutions to unresolved. Returns the
    /// number of distributions deleted.
    fn purge_derivates(&self) -> Result<usize>;
}

#[derive(Default)]
struct Inner {
    distributions: HashMap<Uuid, Distribution>,
    versions: HashMap<Uuid, Version>,
    archives: HashMap<Uuid, Archive>,
    downloads: Vec<Download>,
}

impl Inner {
    fn primary_by_js_name(&self, js_name: &str) -> Option<&Distribution> {
        self.distributions
            .values()
            .find(|d| d.is_primary() && d.js_name == js_name)
    }
}

/// In-memory [`Store`], with archive blobs on disk under `blob_root`.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    blob_root: PathBuf,
    // Keeps the temp blob root alive for stores created by `for_tests`.
    _temp: Option<tempfile::TempDir>,
}

/// Serialized form of a [`MemoryStore`], for the CLI harness. A production
/// deployment replaces this with a relational backend behind the same trait.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    distributions: Vec<Distribution>,
    versions: Vec<Version>,
    archives: Vec<Archive>,
    downloads: Vec<Download>,
}

impl MemoryStore {
    pub fn new(blob_root: PathBuf) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            locks: Mutex::new(HashMap::new()),
            blob_root,
            _temp: None,
        }
    }

    /// A store whose blob root lives in a temporary directory.
    pub fn for_tests() -> Self {
        let temp = tempfile::tempdir().expect("cannot create temp blob root");
        Self {
            inner: Mutex::new(Inner::default()),
            locks: Mutex::new(HashMap::new()),
            blob_root: temp.path().to_path_buf(),
            _temp: Some(temp),
        }
    }

    /// Open a store rooted at `blob_root`, loading a previously persisted
    /// state when one exists.
    pub fn open(blob_root: PathBuf) -> Result<Self> {
        let store = Self::new(blob_root);
        let state_path = store.state_path();

        if state_path.exists() {
            let state: StoreState = serde_json::from_str(&fs::read_to_string(&state_path)?)?;
            let mut inner = store.inner.lock().unwrap();

            inner.distributions = state.distributions.into_iter().map(|d| (d.id, d)).collect();
            inner.versions = state.versions.into_iter().map(|v| (v.id, v)).collect();
            inner.archives = state.archives.into_iter().map(|a| (a.id, a)).collect();
            inner.downloads = state.downloads;
        }

        Ok(store)
    }

    /// Write the current state next to the blobs.
    pub fn persist(&self) -> Result<()> {
        let state = {
            let inner = self.inner.lock().unwrap();
            StoreState {
                distributions: inner.distributions.values().cloned().collect(),
                versions: inner.versions.values().cloned().collect(),
                archives: inner.archives.values().cloned().collect(),
                downloads: inner.downloads.clone(),
            }
        };

        fs::create_dir_all(&self.blob_root)?;
        fs::write(self.state_path(), serde_json::to_string(&state)?)?;

        Ok(())
    }

    fn state_path(&self) -> PathBuf {
        self.blob_root.join("state.json")
    }

    pub fn blob_root(&self) -> &Path {
        &self.blob_root
    }

    /// Absolute path of an archive's blob.
    pub fn blob_path(&self, archive: &Archive) -> PathBuf {
        self.blob_root.join(&archive.archive)
    }

    /// Every primary distribution, in no particular order.
    pub fn all_primary_distributions(&self) -> Result<Vec<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .distributions
            .values()
            .filter(|d| d.is_primary())
            .cloned()
            .collect())
    }

    pub fn download_count(&self, archive: Uuid) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.downloads.iter().filter(|d| d.archive == archive).count())
    }

    /// Synthetic distributions generated for the given root version.
    pub fn synthetic_for(&self, root_version: Uuid) -> Result<Vec<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .distributions
            .values()
            .filter(|d| d.generated_for == Some(root_version))
            .cloned()
            .collect())
    }
}

fn sort_versions_desc(versions: &mut [Version]) {
    versions.sort_by(|a, b| {
        let pa = pep440_rs::Version::from_str(&a.python_version).ok();
        let pb = pep440_rs::Version::from_str(&b.python_version).ok();
        pb.cmp(&pa)
    });
}

impl Store for MemoryStore {
    fn distribution_by_id(&self, id: Uuid) -> Result<Option<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.distributions.get(&id).cloned())
    }

    fn distribution_by_js_name(&self, js_name: &str) -> Result<Option<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.primary_by_js_name(js_name).cloned())
    }

    fn distribution_by_python_name(&self, python_name: &str) -> Result<Option<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .distributions
            .values()
            .find(|d| d.python_name == python_name)
            .cloned())
    }

    fn distribution_by_searchable(&self, searchable: &str) -> Result<Option<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .distributions
            .values()
            .find(|d| d.python_name_searchable == searchable)
            .cloned())
    }

    fn distributions_by_base(&self, bases: &[String]) -> Result<Vec<Distribution>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Distribution> = inner
            .distributions
            .values()
            .filter(|d| d.is_primary() && bases.contains(&d.python_name_base))
            .cloned()
            .collect();

        out.sort_by_key(|d| d.dedup_seq);

        Ok(out)
    }

    fn distributions_by_js_names(&self, js_names: &[String]) -> Result<Vec<Distribution>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .distributions
            .values()
            .filter(|d| d.is_primary() && js_names.contains(&d.js_name))
            .cloned()
            .collect())
    }

    fn insert_distributions(&self, rows: Vec<Distribution>) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let mut inserted = 0;

        for row in rows {
            let conflict = inner.distributions.values().any(|d| {
                (d.generated_for == row.generated_for && d.js_name == row.js_name)
                    || d.python_name == row.python_name
            });

            if conflict {
                continue;
            }

            inner.distributions.insert(row.id, row);
            inserted += 1;
        }

        Ok(inserted)
    }

    fn insert_versions(&self, rows: Vec<Version>) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let mut inserted = 0;

        for row in rows {
            let conflict = inner.versions.values().any(|v| {
                v.distribution == row.distribution && v.python_version == row.python_version
            });

            if conflict {
                continue;
            }

            inner.versions.insert(row.id, row);
            inserted += 1;
        }

        Ok(inserted)
    }

    fn versions_for_distribution(&self, distribution: Uuid) -> Result<Vec<Version>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Version> = inner
            .versions
            .values()
            .filter(|v| v.distribution == distribution)
            .cloned()
            .collect();

        sort_versions_desc(&mut out);

        Ok(out)
    }

    fn version_by_id(&self, id: Uuid) -> Result<Option<Version>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.versions.get(&id).cloned())
    }

    fn version_by_python_version(
        &self,
        distribution: Uuid,
        python_version: &str,
    ) -> Result<Option<Version>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .versions
            .values()
            .find(|v| v.distribution == distribution && v.python_version == python_version)
            .cloned())
    }

    fn set_version_dependencies(
        &self,
        version: Uuid,
        dependencies: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .versions
            .get_mut(&version)
            .ok_or_else(|| Error::VersionNotFound(version.to_string()))?;

        row.dependencies = Dependencies::Resolved(dependencies);

        Ok(())
    }

    fn set_distribution_description(&self, distribution: Uuid, description: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .distributions
            .get_mut(&distribution)
            .ok_or_else(|| Error::PackageNotFound(distribution.to_string()))?;

        row.description = description.to_string();

        Ok(())
    }

    fn lock_distribution(&self, distribution: Uuid) -> Result<DistributionLock> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(distribution)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        Ok(DistributionLock {
            _guard: lock.blocking_lock_owned(),
        })
    }

    fn archive_for_version(
        &self,
        version: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
    ) -> Result<Option<Archive>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .archives
            .values()
            .find(|a| a.version == version && a.format == format && a.translator == translator)
            .cloned())
    }

    fn archives_for_distribution(
        &self,
        distribution: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
    ) -> Result<Vec<Archive>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .archives
            .values()
            .filter(|a| {
                a.format == format
                    && a.translator == translator
                    && inner
                        .versions
                        .get(&a.version)
                        .is_some_and(|v| v.distribution == distribution)
            })
            .cloned()
            .collect())
    }

    fn create_archive(
        &self,
        version: Uuid,
        format: ArchiveFormat,
        translator: TranslatorVersion,
        hash_sha256: String,
        blob_source: &Path,
        file_name: &str,
    ) -> Result<Archive> {
        let rel_path = archive_blob_path(translator, &hash_sha256, file_name);
        let dest = self.blob_root.join(&rel_path);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(blob_source, &dest)?;

        let archive = Archive {
            id: Uuid::new_v4(),
            version,
            format,
            translator,
            hash_sha256,
            archive: rel_path,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.archives.insert(archive.id, archive.clone());

        Ok(archive)
    }

    fn record_download(&self, archive: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.downloads.push(Download {
            id: Uuid::new_v4(),
            archive,
            date: Utc::now(),
        });

        Ok(())
    }

    fn purge_archives(&self) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let archives: Vec<Archive> = inner.archives.drain().map(|(_, a)| a).collect();

        for archive in &archives {
            let path = self.blob_root.join(&archive.archive);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        inner.downloads.clear();

        Ok(archives.len())
    }

    fn purge_derivates(&self) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();

        let doomed_dists: Vec<Uuid> = inner
            .distributions
            .values()
            .filter(|d| !d.is_primary())
            .map(|d| d.id)
            .collect();

        let doomed_versions: Vec<Uuid> = inner
            .versions
            .values()
            .filter(|v| doomed_dists.contains(&v.distribution))
            .map(|v| v.id)
            .collect();

        inner
            .archives
            .retain(|_, a| !doomed_versions.contains(&a.version));
        inner.versions.retain(|id, _| !doomed_versions.contains(id));
        inner.distributions.retain(|id, _| !doomed_dists.contains(id));

        for distribution in inner.distributions.values_mut() {
            distribution.dependencies = Dependencies::Unresolved;
        }
        for version in inner.versions.values_mut() {
            version.dependencies = Dependencies::Unresolved;
        }

        Ok(doomed_dists.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(js_name: &str, python_name: &str) -> Distribution {
        Distribution {
            id: Uuid::new_v4(),
            js_name: js_name.to_string(),
            python_name: python_name.to_string(),
            python_name_base: python_name.replace(['_', '.'], "-"),
            python_name_searchable: python_name.replace(['_', '.'], "-"),
            dedup_seq: 0,
            description: String::new(),
            original: None,
            generated_for: None,
            dependencies: Dependencies::Unresolved,
        }
    }

    #[test]
    fn test_wheel_name() {
        let dist = primary("lodash", "npym.lodash");
        assert_eq!(dist.wheel_name("4.17.21"), "npym_lodash-4.17.21-py3-none-any.whl");

        let scoped = primary("@types/node", "npym.types.node");
        assert_eq!(
            scoped.wheel_name("18.0.0"),
            "npym_types_node-18.0.0-py3-none-any.whl"
        );
    }

    #[test]
    fn test_archive_blob_path() {
        let path = archive_blob_path(
            TranslatorVersion::V1,
            "deadbeef00112233",
            "npym_lodash-4.17.21-py3-none-any.whl",
        );
        assert_eq!(
            path,
            "distributions/v1/de/ad/be/ef/npym_lodash-4.17.21-py3-none-any.whl"
        );
    }

    #[test]
    fn test_insert_distributions_conflict_semantics() {
        let store = MemoryStore::for_tests();

        let first = primary("lodash", "npym.lodash");
        let same_js = primary("lodash", "npym.other");
        let same_py = primary("different", "npym.lodash");

        assert_eq!(store.insert_distributions(vec![first]).unwrap(), 1);
        assert_eq!(
            store.insert_distributions(vec![same_js, same_py]).unwrap(),
            0
        );
    }

    #[test]
    fn test_insert_versions_conflict_semantics() {
        let store = MemoryStore::for_tests();
        let dist = primary("lodash", "npym.lodash");
        let dist_id = dist.id;
        store.insert_distributions(vec![dist]).unwrap();

        let version = |py: &str, js: &str| Version {
            id: Uuid::new_v4(),
            distribution: dist_id,
            python_version: py.to_string(),
            js_version: js.to_string(),
            dependencies: Dependencies::Unresolved,
        };

        assert_eq!(
            store
                .insert_versions(vec![version("1.0.0", "1.0.0"), version("1.0.0", "1.0.0+x")])
                .unwrap(),
            1
        );
        assert_eq!(store.insert_versions(vec![version("1.0.0", "1.0.0")]).unwrap(), 0);
    }

    #[test]
    fn test_versions_sorted_newest_first() {
        let store = MemoryStore::for_tests();
        let dist = primary("lodash", "npym.lodash");
        let dist_id = dist.id;
        store.insert_distributions(vec![dist]).unwrap();

        let rows = ["1.0.0", "1.10.0", "1.2.0", "2.0.0rc1", "2.0.0"]
            .iter()
            .map(|py| Version {
                id: Uuid::new_v4(),
                distribution: dist_id,
                python_version: py.to_string(),
                js_version: py.to_string(),
                dependencies: Dependencies::Unresolved,
            })
            .collect();
        store.insert_versions(rows).unwrap();

        let sorted: Vec<String> = store
            .versions_for_distribution(dist_id)
            .unwrap()
            .into_iter()
            .map(|v| v.python_version)
            .collect();

        assert_eq!(sorted, vec!["2.0.0", "2.0.0rc1", "1.10.0", "1.2.0", "1.0.0"]);
    }

    #[test]
    fn test_purge_derivates_resets_resolutions() {
        let store = MemoryStore::for_tests();

        let mut root = primary("express", "npym.express");
        root.dependencies = Dependencies::Resolved(BTreeMap::new());
        let root_id = root.id;
        store.insert_distributions(vec![root]).unwrap();

        let root_version = Version {
            id: Uuid::new_v4(),
            distribution: root_id,
            python_version: "4.18.2".to_string(),
            js_version: "4.18.2".to_string(),
            dependencies: Dependencies::Resolved(BTreeMap::new()),
        };
        let root_version_id = root_version.id;
        store.insert_versions(vec![root_version]).unwrap();

        let synthetic = Distribution {
            original: Some(root_id),
            generated_for: Some(root_version_id),
            ..primary("express/node_modules/accepts", "npym.express.accepts.x12345678")
        };
        store.insert_distributions(vec![synthetic]).unwrap();

        assert_eq!(store.synthetic_for(root_version_id).unwrap().len(), 1);
        assert_eq!(store.purge_derivates().unwrap(), 1);
        assert!(store.synthetic_for(root_version_id).unwrap().is_empty());

        let root = store.distribution_by_id(root_id).unwrap().unwrap();
        assert_eq!(root.dependencies, Dependencies::Unresolved);
        let version = store.version_by_id(root_version_id).unwrap().unwrap();
        assert_eq!(version.dependencies, Dependencies::Unresolved);
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_path_buf();

        {
            let store = MemoryStore::new(root.clone());
            store
                .insert_distributions(vec![primary("lodash", "npym.lodash")])
                .unwrap();
            store.persist().unwrap();
        }

        let store = MemoryStore::open(root).unwrap();
        let dist = store.distribution_by_js_name("lodash").unwrap().unwrap();
        assert_eq!(dist.python_name, "npym.lodash");
    }

    #[test]
    fn test_lock_distribution_is_reentrant_across_rows() {
        let store = MemoryStore::for_tests();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // Locks on different rows do not block each other.
        let _la = store.lock_distribution(a).unwrap();
        let _lb = store.lock_distribution(b).unwrap();
    }
}
