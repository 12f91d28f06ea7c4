//! Dependency resolution
//!
//! NPM resolves version conflicts by nesting `node_modules` directories, so
//! any number of versions of one package can coexist in a tree. Python
//! installs into a single flat environment, one version per distribution
//! name. This module bridges the two models: for one root package-version it
//! builds a dependency tree that stays as flat as NPM would make it (hoisting
//! every dependency as high as possible, branching only on genuine version
//! conflicts), then materializes each non-root node as a synthetic
//! distribution with a fresh, content-addressed Python name. A flat-namespace
//! package manager can then install the whole set without conflicts, and the
//! on-disk `node_modules` layout is reconstructed from the slash-joined
//! ancestor chains.
//!
//! # Examples
//!
//! ```no_run
//! use npym::{Config, MemoryStore, NpmClient, Resolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let root_version: npym::Version = todo!();
//! let store = MemoryStore::new("/tmp/npym".into());
//! let npm = NpmClient::from_config(&Config::default())?;
//! let mut resolver = Resolver::new(&npm, &store, root_version)?;
//! resolver.resolve()?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};

use dashmap::DashMap;
use semver::Version as SemVersion;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::names::searchable_py_name;
use crate::npm::{NpmClient, PackageInfo, VersionInfo};
use crate::specifier::{flatten_py_range, parse_spec};
use crate::store::{
    ArchiveFormat, Dependencies, Distribution, Store, TranslatorVersion, Version,
};
use crate::version::{intersect_ranges, union_ranges, version_sem_to_py, Range};
use crate::{Error, Result};

/// Serialize a JSON value the way Python's `json.dumps(sort_keys=True)`
/// does: `", "` and `": "` separators, sorted keys, ASCII-only output. The
/// signature scheme depends on this exact byte format staying stable.
fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_canonical_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_json_string(key, out);
                out.push_str(": ");
                write_canonical_json(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');

    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }

    out.push('"');
}

/// Given a JSON-serializable object, return a short stable hash of it. The
/// serialization is normalized (sorted keys) so logically equal objects hash
/// identically regardless of construction order.
pub fn hash_data(data: &Value) -> String {
    let mut canonical = String::new();
    write_canonical_json(data, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// The intersection-so-far of every version spec requested for one package
/// while building the dependency tree. Becoming empty is the signal that a
/// branch is needed.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    pub ranges: Vec<Range>,
}

impl VersionConstraint {
    /// Initial constraint from a `package.json` spec string.
    pub fn from_spec(spec: &str) -> Result<Self> {
        Ok(Self {
            ranges: parse_spec(spec)?,
        })
    }

    /// Indicates if this constraint is still matching anything.
    pub fn has_matches(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Checks if a given version from a package is accepted.
    pub fn accept(&self, version: &str) -> Result<bool> {
        let version = SemVersion::parse(version)?;
        Ok(self.accept_version(&version))
    }

    pub fn accept_version(&self, version: &SemVersion) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }

    /// A new constraint accepting exactly the versions both accept.
    pub fn intersect(&self, other: &VersionConstraint) -> VersionConstraint {
        let mut out = Vec::new();

        for a in &self.ranges {
            for b in &other.ranges {
                out.extend(intersect_ranges(&[a.clone(), b.clone()]));
            }
        }

        VersionConstraint {
            ranges: union_ranges(&out),
        }
    }

    /// Renders as a single Python range specifier.
    pub fn flat_py_range(&self) -> Result<String> {
        let py_ranges = self
            .ranges
            .iter()
            .map(|r| r.as_py_range())
            .collect::<Result<Vec<_>>>()?;

        flatten_py_range(&format!("{:?}", self.ranges), &py_ranges)
    }
}

/// One `(package, spec)` pair still to fetch during the deep-fetch pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeepFetchQuery {
    pub js_name: String,
    pub spec: String,
}

/// Concurrent best-effort prefetch of the metadata for everything reachable
/// from the root query.
///
/// Per-name locks guarantee each package is fetched exactly once even when
/// many versions request it concurrently; everything else runs in arbitrary
/// order. Failures of any kind (network, unparseable spec, non-SemVer
/// version) drop that branch silently: the synchronous resolver is the
/// source of truth and will refetch whatever is missing.
pub async fn deep_fetch(
    npm: NpmClient,
    cache: Arc<DashMap<String, PackageInfo>>,
    root: DeepFetchQuery,
) {
    let locks: Arc<DashMap<String, Arc<tokio::sync::Mutex<()>>>> = Arc::new(DashMap::new());
    let found = Arc::new(StdMutex::new(HashSet::from([root])));
    let mut fetching: HashSet<DeepFetchQuery> = HashSet::new();

    loop {
        let pending: Vec<DeepFetchQuery> = {
            let found = found.lock().unwrap();
            found.difference(&fetching).cloned().collect()
        };

        if pending.is_empty() {
            break;
        }

        let mut tasks = tokio::task::JoinSet::new();

        for query in pending {
            fetching.insert(query.clone());

            let npm = npm.clone();
            let cache = cache.clone();
            let locks = locks.clone();
            let found = found.clone();

            tasks.spawn(async move {
                if let Err(e) = fetch_one(&npm, &cache, &locks, &found, &query).await {
                    tracing::debug!(
                        package = %query.js_name,
                        spec = %query.spec,
                        error = %e,
                        "deep fetch branch dropped"
                    );
                }
            });
        }

        while tasks.join_next().await.is_some() {}
    }
}

async fn fetch_one(
    npm: &NpmClient,
    cache: &DashMap<String, PackageInfo>,
    locks: &DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    found: &StdMutex<HashSet<DeepFetchQuery>>,
    query: &DeepFetchQuery,
) -> Result<()> {
    let lock = locks
        .entry(query.js_name.clone())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone();
    let _guard = lock.lock().await;

    // Take the cached document out before any await: a shard guard must not
    // be held across a suspension point.
    let cached = cache.get(&query.js_name).map(|info| info.clone());
    let info = match cached {
        Some(info) => info,
        None => npm.async_get_package_info(&query.js_name).await?,
    };

    let constraint = VersionConstraint::from_spec(&query.spec)?;
    cache.insert(query.js_name.clone(), info.clone());

    let mut versions: Vec<(SemVersion, &VersionInfo)> = info
        .versions
        .values()
        .map(|v| Ok((SemVersion::parse(&v.version)?, v)))
        .collect::<Result<_>>()?;
    versions.sort_by(|a, b| b.0.cmp_precedence(&a.0));

    for (parsed, version_info) in &versions {
        if !constraint.accept_version(parsed) {
            continue;
        }

        let mut found = found.lock().unwrap();
        for (package, spec) in &version_info.dependencies {
            found.insert(DeepFetchQuery {
                js_name: package.clone(),
                spec: spec.clone(),
            });
        }

        break;
    }

    Ok(())
}

/// Create the Version rows implied by a registry document and return the
/// distribution's versions, newest first.
///
/// The SemVer → PEP 440 mapping is not injective, so colliding Python
/// versions are resolved first-wins in ascending SemVer order, and the
/// insert ignores conflicts with rows from earlier passes.
pub fn sync_versions(
    store: &dyn Store,
    distribution: Uuid,
    info: &PackageInfo,
) -> Result<Vec<Version>> {
    let mut keys: Vec<(&String, SemVersion)> = info
        .versions
        .keys()
        .filter_map(|k| SemVersion::parse(k).ok().map(|v| (k, v)))
        .collect();
    keys.sort_by(|a, b| a.1.cmp_precedence(&b.1));

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for (js_version, _) in keys {
        let Ok(python_version) = version_sem_to_py(js_version) else {
            continue;
        };

        if !seen.insert(python_version.clone()) {
            continue;
        }

        rows.push(Version {
            id: Uuid::new_v4(),
            distribution,
            python_version,
            js_version: js_version.clone(),
            dependencies: Dependencies::Unresolved,
        });
    }

    store.insert_versions(rows)?;
    store.versions_for_distribution(distribution)
}

/// One entry of a package page: the wheel file name the package manager can
/// request, plus the hash of the cached archive when one exists.
#[derive(Debug, Clone)]
pub struct VersionListing {
    pub python_version: String,
    pub file_name: String,
    pub hash_sha256: String,
}

/// Build the version listing for a package page.
///
/// For a synthetic distribution, only the versions whose recomputed signature
/// matches the tag embedded in its Python name are listed: the synthetic name
/// pins the exact dependency set it was generated from.
pub fn package_versions(
    store: &dyn Store,
    distribution: &Distribution,
    info: &PackageInfo,
) -> Result<Vec<VersionListing>> {
    if info.description != distribution.description {
        store.set_distribution_description(distribution.id, &info.description)?;
    }

    let versions = sync_versions(store, distribution.id, info)?;

    let mut hashes: HashMap<Uuid, String> = HashMap::new();
    for archive in store.archives_for_distribution(
        distribution.id,
        ArchiveFormat::Wheel,
        TranslatorVersion::V1,
    )? {
        hashes.insert(archive.version, archive.hash_sha256);
    }

    let signature = match distribution.original {
        Some(_) => distribution
            .python_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_string(),
        None => String::new(),
    };

    let root = match (signature.is_empty(), distribution.generated_for) {
        (false, Some(root_version)) => {
            let version = store
                .version_by_id(root_version)?
                .ok_or_else(|| Error::VersionNotFound(root_version.to_string()))?;
            let dist = store
                .distribution_by_id(version.distribution)?
                .ok_or_else(|| Error::PackageNotFound(version.distribution.to_string()))?;
            Some((dist.js_name, version.js_version))
        }
        _ => None,
    };

    let mut out = Vec::new();

    for version in versions {
        if let Some((root_js_name, root_js_version)) = &root {
            let Some(version_info) = info.versions.get(&version.js_version) else {
                continue;
            };

            let computed = hash_data(&json!({
                "name": root_js_name,
                "version": root_js_version,
                "path": distribution.js_name,
                "dependencies": version_info.dependencies,
            }));

            if format!("x{}", computed) != signature {
                continue;
            }
        }

        out.push(VersionListing {
            file_name: distribution.wheel_name(&version.python_version),
            hash_sha256: hashes.get(&version.id).cloned().unwrap_or_default(),
            python_version: version.python_version,
        });
    }

    Ok(out)
}

/// A dependency right after parsing: the best version satisfying the spec,
/// plus the constraint it came from.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub version: Version,
    pub constraint: VersionConstraint,
}

/// Per-node naming inferred from the finished tree.
#[derive(Debug, Clone)]
pub struct NodeResolution {
    pub python_name: String,
    pub js_name: String,
}

/// Index of a node inside the resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node of the dependency tree. Links are arena indices, which keeps
/// upward traversal cheap without reference cycles.
#[derive(Debug)]
pub struct Node {
    pub version: Version,
    pub constraint: VersionConstraint,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub resolution: Option<NodeResolution>,
    /// Distribution → child node, for conflict lookups along the ancestor
    /// chain.
    dist_cache: HashMap<Uuid, NodeId>,
}

/// Builds and persists the dependency tree for one root version.
///
/// The tree mimics what NPM would install with a twist: the analyzed package
/// is the root, every dependency is hoisted directly under it when possible,
/// and a deeper branch is only created when two requesters need incompatible
/// versions of the same package. Resolving against a fixed snapshot means a
/// later release of a dependency can be hidden until the root is re-resolved,
/// which is the price of installability.
pub struct Resolver<'a> {
    npm: &'a NpmClient,
    store: &'a dyn Store,
    nodes: Vec<Node>,
    root: NodeId,
    info_cache: Arc<DashMap<String, PackageInfo>>,
    version_cache: HashMap<String, Vec<(Version, VersionInfo)>>,
    dist_cache: HashMap<Uuid, Distribution>,
}

impl<'a> Resolver<'a> {
    pub fn new(npm: &'a NpmClient, store: &'a dyn Store, version: Version) -> Result<Self> {
        let constraint = VersionConstraint::from_spec(&version.js_version)?;
        let root_node = Node {
            version,
            constraint,
            parent: None,
            children: Vec::new(),
            resolution: None,
            dist_cache: HashMap::new(),
        };

        Ok(Self {
            npm,
            store,
            nodes: vec![root_node],
            root: NodeId(0),
            info_cache: Arc::new(DashMap::new()),
            version_cache: HashMap::new(),
            dist_cache: HashMap::new(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Call this to resolve dependencies: build the tree, then persist it.
    pub fn resolve(&mut self) -> Result<()> {
        self.build_dep_tree()?;
        self.save_dependencies()
    }

    /// Build the dependency tree for the root version.
    pub fn build_dep_tree(&mut self) -> Result<()> {
        let root_dist = self.distribution(self.nodes[self.root.0].version.distribution)?;
        let root_query = DeepFetchQuery {
            js_name: root_dist.js_name,
            spec: self.nodes[self.root.0].version.js_version.clone(),
        };

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(deep_fetch(
            self.npm.clone(),
            self.info_cache.clone(),
            root_query,
        ));

        let mut queue = VecDeque::from([self.root]);

        while let Some(node_id) = queue.pop_front() {
            let version = self.nodes[node_id.0].version.clone();

            for dep in self.get_dependencies(&version)? {
                let (modified, new_node) = self.ingest(node_id, dep)?;

                if modified {
                    queue.push_back(new_node);
                }
            }
        }

        Ok(())
    }

    /// Saves the dependency tree so the package set can be installed.
    pub fn save_dependencies(&mut self) -> Result<()> {
        self.resolve_nodes()?;
        self.create_distributions()
    }

    /// Place a dependency in the tree, as high as possible.
    ///
    /// If an ancestor (or the requesting node itself) already carries the
    /// distribution, try to merge: intersect the constraints and re-pick a
    /// version satisfying both. An empty intersection, or no satisfying
    /// version, attaches the dependency as a branch under the requester.
    /// Unknown distributions hoist straight under the root. The returned
    /// flag says whether the affected node must be re-expanded.
    fn ingest(&mut self, current: NodeId, dep: ResolvedDependency) -> Result<(bool, NodeId)> {
        let dist_id = dep.version.distribution;

        let Some(existing) = self.node_for(current, dist_id) else {
            let node = self.add_child(self.root, dep.version, dep.constraint);
            return Ok((true, node));
        };

        let common = self.nodes[existing.0].constraint.intersect(&dep.constraint);

        let best = if common.has_matches() {
            self.find_best_version(&common, dist_id)?
        } else {
            None
        };

        match best {
            Some(best) => {
                let node = &mut self.nodes[existing.0];
                let modified = node.version.id != best.id;
                node.constraint = common;
                node.version = best;
                Ok((modified, existing))
            }
            None => {
                let node = self.add_child(current, dep.version, dep.constraint);
                Ok((true, node))
            }
        }
    }

    fn add_child(
        &mut self,
        parent: NodeId,
        version: Version,
        constraint: VersionConstraint,
    ) -> NodeId {
        let distribution = version.distribution;
        let id = NodeId(self.nodes.len());

        self.nodes.push(Node {
            version,
            constraint,
            parent: Some(parent),
            children: Vec::new(),
            resolution: None,
            dist_cache: HashMap::new(),
        });

        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.dist_cache.insert(distribution, id);

        id
    }

    /// Find the node already carrying `distribution` at `from` or above.
    fn node_for(&self, from: NodeId, distribution: Uuid) -> Option<NodeId> {
        let mut cursor = Some(from);

        while let Some(id) = cursor {
            let node = &self.nodes[id.0];

            if let Some(found) = node.dist_cache.get(&distribution) {
                return Some(*found);
            }

            cursor = node.parent;
        }

        None
    }

    /// The JS names from the root down to this node, which is the path of
    /// the module on disk.
    fn ancestors_js_names(&mut self, id: NodeId) -> Result<Vec<String>> {
        let mut ids = vec![id];
        let mut cursor = self.nodes[id.0].parent;

        while let Some(parent) = cursor {
            ids.push(parent);
            cursor = self.nodes[parent.0].parent;
        }

        ids.reverse();

        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            let dist = self.distribution(self.nodes[id.0].version.distribution)?;
            names.push(dist.js_name);
        }

        Ok(names)
    }

    fn distribution(&mut self, id: Uuid) -> Result<Distribution> {
        if let Some(dist) = self.dist_cache.get(&id) {
            return Ok(dist.clone());
        }

        let dist = self
            .store
            .distribution_by_id(id)?
            .ok_or_else(|| Error::PackageNotFound(id.to_string()))?;

        self.dist_cache.insert(id, dist.clone());

        Ok(dist)
    }

    /// Package info from the registry, through the cache pre-warmed by the
    /// deep fetch.
    fn package_info(&mut self, js_name: &str) -> Result<PackageInfo> {
        if let Some(info) = self.info_cache.get(js_name) {
            return Ok(info.clone());
        }

        let info = self.npm.get_package_info(js_name)?;
        self.info_cache.insert(js_name.to_string(), info.clone());

        Ok(info)
    }

    /// Maps the distribution's stored versions to the registry document,
    /// newest first, creating missing Version rows on the way.
    fn package_versions_of(
        &mut self,
        distribution: &Distribution,
    ) -> Result<Vec<(Version, VersionInfo)>> {
        if let Some(cached) = self.version_cache.get(&distribution.js_name) {
            return Ok(cached.clone());
        }

        let real = self.distribution(distribution.real_id())?;
        let info = self.package_info(&real.js_name)?;
        let versions = sync_versions(self.store, distribution.id, &info)?;

        let mapped: Vec<(Version, VersionInfo)> = versions
            .into_iter()
            .filter_map(|v| {
                let version_info = info.versions.get(&v.js_version)?.clone();
                Some((v, version_info))
            })
            .collect();

        self.version_cache
            .insert(distribution.js_name.clone(), mapped.clone());

        Ok(mapped)
    }

    /// Looks for the highest version accepted by the constraint.
    ///
    /// Similar versions are expected to have similar dependencies, so even
    /// though the tree is computed against this exact version, the package
    /// manager keeps some latitude to upgrade above it.
    fn find_best_version(
        &mut self,
        constraint: &VersionConstraint,
        distribution: Uuid,
    ) -> Result<Option<Version>> {
        let dist = self.distribution(distribution)?;

        for (version, _) in self.package_versions_of(&dist)? {
            if constraint.accept(&version.js_version)? {
                return Ok(Some(version));
            }
        }

        Ok(None)
    }

    /// Extract and resolve the dependencies declared by a version.
    fn get_dependencies(&mut self, version: &Version) -> Result<Vec<ResolvedDependency>> {
        let dist = self.distribution(version.distribution)?;
        let versions = self.package_versions_of(&dist)?;

        let version_info = versions
            .iter()
            .find(|(v, _)| v.id == version.id)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| {
                Error::Resolution(format!(
                    "version {} of {} vanished from the registry document",
                    version.js_version, dist.js_name
                ))
            })?;

        let mut out = Vec::new();

        for (package, spec) in &version_info.dependencies {
            let dep_dist = self
                .store
                .distribution_by_js_name(package)?
                .ok_or_else(|| Error::PackageNotFound(package.clone()))?;

            let constraint = VersionConstraint::from_spec(spec)?;
            let best = self.find_best_version(&constraint, dep_dist.id)?.ok_or_else(|| {
                Error::Resolution(format!(
                    "could not find a version for {} that satisfies {}",
                    package, spec
                ))
            })?;

            out.push(ResolvedDependency {
                version: best,
                constraint,
            });
        }

        Ok(out)
    }

    /// Compute each node's on-disk JS path and its content-addressed Python
    /// name.
    ///
    /// The name tag hashes the root identity, the node's path and the exact
    /// dependency set of the chosen version, so re-resolving the same root
    /// reproduces the same names byte for byte.
    fn resolve_nodes(&mut self) -> Result<()> {
        let root_dist = self.distribution(self.nodes[self.root.0].version.distribution)?;
        let root_js_name = root_dist.js_name;
        let root_js_version = self.nodes[self.root.0].version.js_version.clone();

        let mut queue = VecDeque::from([self.root]);

        while let Some(node_id) = queue.pop_front() {
            let version = self.nodes[node_id.0].version.clone();
            let dist = self.distribution(version.distribution)?;

            let version_info = self
                .package_versions_of(&dist)?
                .into_iter()
                .find(|(v, _)| v.id == version.id)
                .map(|(_, info)| info)
                .ok_or_else(|| {
                    Error::Resolution(format!(
                        "version {} of {} vanished from the registry document",
                        version.js_version, dist.js_name
                    ))
                })?;

            let js_name = self.ancestors_js_names(node_id)?.join("/node_modules/");
            let signature = hash_data(&json!({
                "name": root_js_name,
                "version": root_js_version,
                "path": js_name,
                "dependencies": version_info.dependencies,
            }));

            let node = &mut self.nodes[node_id.0];
            node.resolution = Some(NodeResolution {
                python_name: format!("{}.x{}", dist.python_name, signature),
                js_name,
            });

            queue.extend(self.nodes[node_id.0].children.iter().copied());
        }

        Ok(())
    }

    /// Persist the tree: the root's dependency mapping goes on its Version
    /// row, every other node becomes a synthetic Distribution.
    fn create_distributions(&mut self) -> Result<()> {
        let root_version = self.nodes[self.root.0].version.clone();
        let mut to_create = Vec::new();
        let mut queue = VecDeque::from([self.root]);

        while let Some(node_id) = queue.pop_front() {
            let mut dependencies = std::collections::BTreeMap::new();

            for child_id in self.nodes[node_id.0].children.clone() {
                let child = &self.nodes[child_id.0];
                let resolution = child.resolution.as_ref().ok_or_else(|| {
                    Error::Resolution("tree node missing its resolution".to_string())
                })?;

                dependencies.insert(
                    resolution.python_name.clone(),
                    child.constraint.flat_py_range()?,
                );

                queue.push_back(child_id);
            }

            if node_id == self.root {
                self.store
                    .set_version_dependencies(root_version.id, dependencies)?;
                continue;
            }

            let node = &self.nodes[node_id.0];
            let resolution = node.resolution.as_ref().ok_or_else(|| {
                Error::Resolution("tree node missing its resolution".to_string())
            })?;
            let searchable = searchable_py_name(&resolution.python_name);

            to_create.push(Distribution {
                id: Uuid::new_v4(),
                js_name: resolution.js_name.clone(),
                python_name: resolution.python_name.clone(),
                python_name_base: searchable.clone(),
                python_name_searchable: searchable,
                dedup_seq: 0,
                description: String::new(),
                original: Some(node.version.distribution),
                generated_for: Some(root_version.id),
                dependencies: Dependencies::Resolved(dependencies),
            });
        }

        self.store.insert_distributions(to_create)?;

        Ok(())
    }

    /// Indented rendering of the tree, for the CLI.
    pub fn tree_display(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];

        while let Some((node_id, depth)) = stack.pop() {
            let version = self.nodes[node_id.0].version.clone();
            let dist = self.distribution(version.distribution)?;

            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{}@{}\n", dist.js_name, version.js_version));

            for child in self.nodes[node_id.0].children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }

        Ok(out)
    }
}
