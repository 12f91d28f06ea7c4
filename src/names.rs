//! NPM → Python name mapping
//!
//! NPM names are close to free-form while Python distribution names are
//! normalized aggressively by package managers, so two distinct NPM names can
//! collapse onto the same Python name. The mapper normalizes every name into a
//! dotted Python name under a fixed prefix and resolves collisions with a
//! stable, content-derived deduplication tag, so that the mapping survives
//! incremental imports and full rebuilds alike.
//!
//! # Examples
//!
//! ```
//! use npym::names::NormName;
//!
//! let norm = NormName::parse("@14islands/r3f-scroll-rig");
//! assert_eq!(norm.py_name("npym"), "npym.n14islands.r3f-scroll-rig");
//! ```

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::{Dependencies, Distribution, Store};
use crate::Result;

/// Transforms all non-alphanumeric characters into dashes and removes any
/// leading or trailing dashes. This produces a valid Python distribution name
/// component.
pub fn norm_py_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

/// The searchable form of a Python name: `.` and `_` collapse to `-`, which
/// is how Python package managers normalize incoming queries.
pub fn searchable_py_name(name: &str) -> String {
    norm_py_name(name).replace(['_', '.'], "-")
}

/// A decomposed NPM name: the normalized package, the normalized organization
/// if the name was scoped, and the original spellings of both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormName {
    pub package: String,
    pub org: String,
    pub original_package: String,
    pub original_org: String,
}

impl NormName {
    /// Decompose and normalize an NPM name (`[@org/]package`).
    ///
    /// Names that normalize to nothing become `undefined` and rely on the
    /// deduplication pass to stay unique.
    pub fn parse(js_name: &str) -> Self {
        let js_name = js_name.to_lowercase();

        let (original_org, original_package) = match js_name.strip_prefix('@') {
            Some(rest) => match rest.split_once('/') {
                Some((org, package)) => (org.to_string(), package.to_string()),
                None => (String::new(), js_name.clone()),
            },
            None => (String::new(), js_name.clone()),
        };

        let mut org = norm_py_name(&original_org);
        let mut package = norm_py_name(&original_package);

        if !original_org.is_empty() && org.is_empty() {
            org = "undefined".to_string();
        }

        if package.is_empty() {
            package = "undefined".to_string();
        }

        Self {
            package,
            org,
            original_package,
            original_org,
        }
    }

    /// A component that can be a valid Python package name: it cannot start
    /// with a digit.
    fn make_safe(name: &str) -> String {
        match name.chars().next() {
            Some(c) if c.is_ascii_digit() => format!("n{}", name),
            _ => name.to_string(),
        }
    }

    pub fn safe_org(&self) -> String {
        Self::make_safe(&self.org)
    }

    pub fn safe_package(&self) -> String {
        Self::make_safe(&self.package)
    }

    /// Theoretical Python name for this package (may still change through
    /// deduplication).
    pub fn py_name(&self, prefix: &str) -> String {
        if self.org.is_empty() {
            format!("{}.{}", prefix, self.safe_package())
        } else {
            format!("{}.{}.{}", prefix, self.safe_org(), self.safe_package())
        }
    }
}

/// The 8-hex-character deduplication tag for a colliding name: a SHA-256 of
/// the identity triple, so the tag is reproducible from content alone.
pub fn dedup_tag(js_name: &str, py_name: &str, seq: i32) -> String {
    let digest = Sha256::digest(format!("{}:{}:{}", js_name, py_name, seq).as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// The final Python name for a given position in its collision bucket. The
/// bucket winner (`seq == 0`) keeps the theoretical name; later entries get
/// the tag injected right after the prefix: `npym.x1a2b3c4d.org.package`.
pub fn dedup_py_name(js_name: &str, py_name: &str, seq: i32, prefix: &str) -> String {
    if seq == 0 {
        return py_name.to_string();
    }

    let tag = dedup_tag(js_name, py_name, seq);

    match py_name.strip_prefix(&format!("{}.", prefix)) {
        Some(rest) => format!("{}.x{}.{}", prefix, tag, rest),
        None => format!("{}.x{}.{}", prefix, tag, py_name),
    }
}

/// Outcome of one bulk import pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub seen: usize,
    pub inserted: usize,
    /// Distinct `python_name_base` groups touched by the pass.
    pub buckets: usize,
    pub collisions: usize,
}

/// Bulk importer for the full NPM name list.
///
/// Consumes names in chunks. For each chunk it loads the already-imported
/// distributions sharing any base name, rebuilds the per-base buckets with the
/// stored entries first (their `dedup_seq` order is immutable) and the new
/// names appended, and inserts only the previously-unseen rows.
pub struct NameImporter<'a> {
    store: &'a dyn Store,
    prefix: &'a str,
    chunk_size: usize,
}

impl<'a> NameImporter<'a> {
    pub fn new(store: &'a dyn Store, prefix: &'a str, chunk_size: usize) -> Self {
        Self {
            store,
            prefix,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Import every name from the iterator, calling `progress` after each
    /// chunk with the number of names consumed so far.
    pub fn import<I>(&self, names: I, mut progress: impl FnMut(usize)) -> Result<ImportStats>
    where
        I: IntoIterator<Item = String>,
    {
        let mut stats = ImportStats::default();
        let mut seen_bases: HashSet<String> = HashSet::new();
        let mut chunk = Vec::with_capacity(self.chunk_size);

        for name in names {
            chunk.push(name);

            if chunk.len() >= self.chunk_size {
                self.import_chunk(&chunk, &mut stats, &mut seen_bases)?;
                stats.seen += chunk.len();
                progress(stats.seen);
                chunk.clear();
            }
        }

        if !chunk.is_empty() {
            self.import_chunk(&chunk, &mut stats, &mut seen_bases)?;
            stats.seen += chunk.len();
            progress(stats.seen);
        }

        stats.buckets = seen_bases.len();

        tracing::info!(
            seen = stats.seen,
            inserted = stats.inserted,
            buckets = stats.buckets,
            collisions = stats.collisions,
            "name import pass finished"
        );

        Ok(stats)
    }

    fn import_chunk(
        &self,
        chunk: &[String],
        stats: &mut ImportStats,
        seen_bases: &mut HashSet<String>,
    ) -> Result<()> {
        let normalized: Vec<(String, String, String)> = chunk
            .iter()
            .map(|js_name| {
                let norm = NormName::parse(js_name);
                let py_name = norm.py_name(self.prefix);
                let base = searchable_py_name(&py_name);
                (js_name.clone(), py_name, base)
            })
            .collect();

        let bases: Vec<String> = normalized.iter().map(|(_, _, base)| base.clone()).collect();

        // Stored entries come back ordered by dedup_seq; they seed the
        // buckets so committed positions never move.
        let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
        let mut known: HashSet<String> = HashSet::new();

        for existing in self.store.distributions_by_base(&bases)? {
            known.insert(existing.js_name.clone());
            buckets
                .entry(existing.python_name_base.clone())
                .or_default()
                .push(existing.js_name);
        }

        for (js_name, _, base) in &normalized {
            let bucket = buckets.entry(base.clone()).or_default();

            if !bucket.iter().any(|existing| existing == js_name) {
                bucket.push(js_name.clone());
            }
        }

        let mut to_add = Vec::new();

        for (base, js_names) in &buckets {
            seen_bases.insert(base.clone());

            if js_names.len() > 1 {
                tracing::debug!(base = %base, names = ?js_names, "python name collision");
                stats.collisions += js_names.len() - 1;
            }

            for (seq, js_name) in js_names.iter().enumerate() {
                if known.contains(js_name) {
                    continue;
                }

                let norm = NormName::parse(js_name);
                let py_name = norm.py_name(self.prefix);
                let final_name = dedup_py_name(js_name, &py_name, seq as i32, self.prefix);

                to_add.push(Distribution {
                    id: Uuid::new_v4(),
                    js_name: js_name.clone(),
                    python_name: final_name.clone(),
                    python_name_base: base.clone(),
                    python_name_searchable: searchable_py_name(&final_name),
                    dedup_seq: seq as i32,
                    description: String::new(),
                    original: None,
                    generated_for: None,
                    dependencies: Dependencies::Unresolved,
                });
            }
        }

        stats.inserted += self.store.insert_distributions(to_add)?;

        Ok(())
    }
}
