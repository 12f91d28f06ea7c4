//! Shared fixtures for the integration tests.
//!
//! Everything runs against a [`StaticNpmClient`] registry and a
//! [`MemoryStore`], so no test touches the network.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use npym::{MemoryStore, NameImporter, NpmClient, Store, Version};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha512};

pub const PREFIX: &str = "npym";

/// Build a gzipped NPM tarball with the given files, all rooted under the
/// conventional `package/` directory.
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in files {
        let full_path = format!("package/{}", path);
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, &full_path, content.as_bytes())
            .unwrap();
    }

    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap()
}

/// The `dist.integrity` value NPM would publish for these bytes.
pub fn integrity(bytes: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(bytes)))
}

/// One version entry for a package document.
pub fn version_entry(version: &str, dependencies: &[(&str, &str)]) -> Value {
    let deps: Map<String, Value> = dependencies
        .iter()
        .map(|(name, spec)| (name.to_string(), json!(spec)))
        .collect();

    json!({
        "version": version,
        "dependencies": deps,
    })
}

/// Same as [`version_entry`] but with a downloadable tarball attached.
pub fn version_entry_with_dist(
    version: &str,
    dependencies: &[(&str, &str)],
    tarball_url: &str,
    integrity: &str,
) -> Value {
    let mut entry = version_entry(version, dependencies);
    entry["dist"] = json!({"tarball": tarball_url, "integrity": integrity});
    entry
}

/// A full package document from version entries.
pub fn package_doc(name: &str, versions: &[Value]) -> Value {
    let map: Map<String, Value> = versions
        .iter()
        .map(|v| (v["version"].as_str().unwrap().to_string(), v.clone()))
        .collect();

    json!({
        "name": name,
        "description": format!("{} test package", name),
        "versions": map,
    })
}

/// Run the name-import pass for the given NPM names.
pub fn import_names(store: &MemoryStore, names: &[&str]) {
    NameImporter::new(store, PREFIX, 10_000)
        .import(names.iter().map(|n| n.to_string()), |_| {})
        .unwrap();
}

/// Create the Version rows for a package and return the one matching the
/// given JS version.
pub fn seed_version(store: &MemoryStore, npm: &NpmClient, js_name: &str, js_version: &str) -> Version {
    let distribution = store.distribution_by_js_name(js_name).unwrap().unwrap();
    let info = npm.get_package_info(js_name).unwrap();

    npym::resolver::sync_versions(store, distribution.id, &info)
        .unwrap()
        .into_iter()
        .find(|v| v.js_version == js_version)
        .expect("seeded version not found")
}

/// A root package with eight direct dependencies, each pulling three private
/// leaves: 32 transitive packages, all hoistable.
pub fn wide_tree_fixture() -> (NpmClient, Vec<String>) {
    let mut builder = npym::StaticNpmClient::builder();
    let mut names = vec!["webapp".to_string()];
    let mut root_deps: Vec<(String, String)> = Vec::new();

    for i in 0..8 {
        let dep = format!("dep-{}", i);
        root_deps.push((dep.clone(), "^1.0.0".to_string()));

        let mut dep_deps: Vec<(String, String)> = Vec::new();
        for j in 0..3 {
            let leaf = format!("leaf-{}-{}", i, j);
            dep_deps.push((leaf.clone(), "~1.0.0".to_string()));

            builder = builder.package_json(package_doc(
                &leaf,
                &[version_entry("1.0.2", &[])],
            ));
            names.push(leaf);
        }

        let dep_deps_ref: Vec<(&str, &str)> = dep_deps
            .iter()
            .map(|(n, s)| (n.as_str(), s.as_str()))
            .collect();
        builder = builder.package_json(package_doc(
            &dep,
            &[version_entry("1.3.0", &dep_deps_ref)],
        ));
        names.push(dep);
    }

    let root_deps_ref: Vec<(&str, &str)> = root_deps
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    builder = builder.package_json(package_doc(
        "webapp",
        &[version_entry("1.0.0", &root_deps_ref)],
    ));

    (builder.build(), names)
}
