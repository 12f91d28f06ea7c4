//! Wheel synthesis
//!
//! Turns one NPM package version into an installable Python wheel: download
//! the tarball, verify its integrity, lay the package out under
//! `{prefix}/node_modules/`, synthesize the `dist-info` metadata (including
//! the translated dependency set and console entry points for `bin`
//! scripts), and zip the result reproducibly. Everything happens in a scoped
//! working directory that is deleted on every exit path.
//!
//! # Examples
//!
//! ```no_run
//! use npym::translator::get_or_create_archive;
//! use npym::{Config, MemoryStore, NpmClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let store = MemoryStore::new(config.storage_dir.clone());
//! let npm = NpmClient::from_config(&config)?;
//!
//! let archive = get_or_create_archive(&store, &npm, &config.prefix, "npym-lodash", "4.17.21")?;
//! println!("wheel sha256: {}", archive.hash_sha256);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use flate2::read::GzDecoder;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};
use tar::Archive as TarArchive;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::names::dedup_tag;
use crate::npm::{NpmClient, VersionInfo};
use crate::specifier::sem_range_to_py_range;
use crate::store::{Archive, ArchiveFormat, Distribution, Store, TranslatorVersion, Version};
use crate::{Error, Result};

/// Drop all new lines, non-printable characters, etc. Metadata files are
/// line-oriented, so a stray control character would corrupt them.
pub fn sanitize(value: &str) -> String {
    static NON_PRINTABLE: OnceLock<Regex> = OnceLock::new();
    let re = NON_PRINTABLE.get_or_init(|| Regex::new(r"[^\x20-\x7e]+").unwrap());

    re.replace_all(value, " ").into_owned()
}

/// The RECORD hash encoding mandated by the wheel format.
fn urlsafe_b64_nopad(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// SHA-256 of a file, streamed, as lowercase hex.
pub fn file_sha256_hex(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn file_digest(path: &Path, algorithm: &str) -> Result<Vec<u8>> {
    fn stream<D: Digest + Write>(path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut hasher = D::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hasher.finalize().to_vec())
    }

    match algorithm {
        "sha256" => stream::<Sha256>(path),
        "sha512" => stream::<Sha512>(path),
        other => Err(Error::Integrity(format!(
            "unsupported integrity algorithm: {}",
            other
        ))),
    }
}

/// A parsed `{dist}-{version}[-{build}]-{python}-{abi}-{platform}.whl` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    pub project: String,
    pub version: String,
    pub build_tag: Option<String>,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
}

impl WheelFilename {
    /// The searchable distribution name this file refers to.
    pub fn searchable_name(&self) -> String {
        self.project.replace('_', "-")
    }
}

pub fn parse_wheel_filename(name: &str) -> Result<WheelFilename> {
    let stem = name
        .strip_suffix(".whl")
        .ok_or_else(|| Error::WheelFilename(name.to_string()))?;

    let parts: Vec<&str> = stem.split('-').collect();

    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::WheelFilename(name.to_string()));
    }

    match parts.as_slice() {
        [project, version, python, abi, platform] => Ok(WheelFilename {
            project: project.to_string(),
            version: version.to_string(),
            build_tag: None,
            python_tag: python.to_string(),
            abi_tag: abi.to_string(),
            platform_tag: platform.to_string(),
        }),
        [project, version, build, python, abi, platform] => Ok(WheelFilename {
            project: project.to_string(),
            version: version.to_string(),
            build_tag: Some(build.to_string()),
            python_tag: python.to_string(),
            abi_tag: abi.to_string(),
            platform_tag: platform.to_string(),
        }),
        _ => Err(Error::WheelFilename(name.to_string())),
    }
}

/// Builds the wheel for one distribution version inside a scoped working
/// directory. The directory and everything in it disappear when the
/// translator is dropped, whether the build succeeded or not.
pub struct PackageTranslator<'a> {
    distribution: &'a Distribution,
    version: &'a Version,
    version_info: &'a VersionInfo,
    npm: &'a NpmClient,
    store: &'a dyn Store,
    prefix: &'a str,
    work_dir: TempDir,
}

impl<'a> PackageTranslator<'a> {
    pub fn new(
        distribution: &'a Distribution,
        version: &'a Version,
        version_info: &'a VersionInfo,
        npm: &'a NpmClient,
        store: &'a dyn Store,
        prefix: &'a str,
    ) -> Result<Self> {
        Ok(Self {
            distribution,
            version,
            version_info,
            npm,
            store,
            prefix,
            work_dir: TempDir::new()?,
        })
    }

    /// Where we download the source NPM package.
    fn source_path(&self) -> PathBuf {
        self.work_dir.path().join("source.tgz")
    }

    /// Where we uncompress the NPM source package.
    fn source_dir(&self) -> PathBuf {
        self.work_dir.path().join("source")
    }

    /// Where we build the wheel's structure.
    fn wheel_dir(&self) -> PathBuf {
        self.work_dir.path().join("wheel")
    }

    /// Where the package lands inside the wheel. For synthetic distributions
    /// the JS name is the full slash-joined ancestor chain, which is exactly
    /// the nested `node_modules` path the runtime expects.
    fn npm_package_dir(&self) -> Result<PathBuf> {
        let mut path = self.wheel_dir().join(self.prefix).join("node_modules");

        for component in self.distribution.js_name.split('/') {
            if component.is_empty() || component == ".." || component == "." {
                return Err(Error::Other(format!(
                    "unsafe package path: {}",
                    self.distribution.js_name
                )));
            }
            path.push(component);
        }

        Ok(path)
    }

    /// The escaped `name-version` stem shared by the wheel file name and the
    /// dist-info directory.
    fn name_stem(&self) -> String {
        format!(
            "{}-{}",
            self.distribution.python_name.replace(['-', '.'], "_"),
            self.version.python_version
        )
    }

    fn dist_info_dir(&self) -> PathBuf {
        self.wheel_dir().join(format!("{}.dist-info", self.name_stem()))
    }

    fn wheel_path(&self) -> PathBuf {
        self.work_dir
            .path()
            .join(format!("{}-py3-none-any.whl", self.name_stem()))
    }

    /// Run the full synthesis. Returns the path of the finished `.whl`
    /// inside the working directory; copy it out before dropping the
    /// translator.
    pub fn translate(&self) -> Result<PathBuf> {
        self.download_source()?;
        self.check_source_integrity()?;
        self.extract_source()?;
        self.copy_source()?;
        self.write_dist_info()?;
        self.zip_wheel()?;

        Ok(self.wheel_path())
    }

    fn download_source(&self) -> Result<()> {
        let dist = self
            .version_info
            .dist
            .as_ref()
            .ok_or_else(|| Error::Other("version has no dist entry".to_string()))?;

        tracing::debug!(url = %dist.tarball, "downloading source tarball");
        self.npm.download_tarball(&dist.tarball, &self.source_path())
    }

    /// Making sure that the hash checks out before anything gets extracted.
    fn check_source_integrity(&self) -> Result<()> {
        let dist = self
            .version_info
            .dist
            .as_ref()
            .ok_or_else(|| Error::Other("version has no dist entry".to_string()))?;

        let integrity = dist
            .integrity
            .as_deref()
            .ok_or_else(|| Error::Integrity("version has no integrity field".to_string()))?;

        let (algorithm, b64_hash) = integrity
            .split_once('-')
            .ok_or_else(|| Error::Integrity(format!("malformed integrity: {}", integrity)))?;

        let expected = STANDARD
            .decode(b64_hash)
            .map_err(|e| Error::Integrity(format!("malformed integrity hash: {}", e)))?;
        let actual = file_digest(&self.source_path(), algorithm)?;

        if expected != actual {
            return Err(Error::Integrity(format!(
                "tarball hash mismatch for {}",
                self.distribution.js_name
            )));
        }

        Ok(())
    }

    fn extract_source(&self) -> Result<()> {
        fs::create_dir_all(self.source_dir())?;

        let tar_gz = File::open(self.source_path())?;
        let tar = GzDecoder::new(tar_gz);
        let mut archive = TarArchive::new(tar);

        archive.set_preserve_permissions(false);
        archive.set_preserve_mtime(false);
        archive.set_overwrite(true);
        archive.unpack(self.source_dir())?;

        Ok(())
    }

    /// NPM tarballs root everything under `package/`; copy that tree into
    /// the wheel.
    fn copy_source(&self) -> Result<()> {
        let target = self.npm_package_dir()?;
        fs::create_dir_all(&target)?;
        copy_directory_recursive(&self.source_dir().join("package"), &target)
    }

    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()> {
        let mut content = String::new();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }

        fs::write(path, content)?;

        Ok(())
    }

    fn write_dist_info(&self) -> Result<()> {
        fs::create_dir_all(self.dist_info_dir())?;
        self.write_dist_info_wheel()?;
        self.write_dist_info_license()?;
        self.write_dist_info_metadata()?;
        self.write_entry_points()?;
        self.write_dist_info_record()?;

        Ok(())
    }

    fn write_dist_info_wheel(&self) -> Result<()> {
        let lines = [
            "Wheel-Version: 1.0".to_string(),
            "Generator: npym v1".to_string(),
            "Root-Is-Purelib: true".to_string(),
            "Tag: py3-none-any".to_string(),
        ];

        self.write_lines(&self.dist_info_dir().join("WHEEL"), &lines)
    }

    /// NPM only carries the license name, not the text, which is enough at
    /// install time.
    fn write_dist_info_license(&self) -> Result<()> {
        let Some(license) = license_name(self.version_info) else {
            return Ok(());
        };

        self.write_lines(
            &self.dist_info_dir().join("LICENSE"),
            &[format!("License: {}", license)],
        )
    }

    /// The synthesized `Requires-Dist` set.
    ///
    /// Tree roots carry their resolution on the Version row and synthetic
    /// distributions on the Distribution row; both are taken verbatim. An
    /// unresolved primary falls back to translating the raw NPM dependency
    /// and peer-dependency specs through the canonical name map.
    fn requires_dist(&self) -> Result<BTreeMap<String, String>> {
        if let Some(resolved) = self.version.dependencies.as_resolved() {
            return Ok(resolved.clone());
        }

        if let Some(resolved) = self.distribution.dependencies.as_resolved() {
            return Ok(resolved.clone());
        }

        let mut merged = self.version_info.dependencies.clone();
        merged.extend(self.version_info.peer_dependencies.clone());

        let js_names: Vec<String> = merged.keys().cloned().collect();
        let name_map: BTreeMap<String, String> = self
            .store
            .distributions_by_js_names(&js_names)?
            .into_iter()
            .map(|d| (d.js_name, d.python_name))
            .collect();

        let mut out = BTreeMap::new();

        for (js_name, spec) in &merged {
            let Some(python_name) = name_map.get(js_name) else {
                continue;
            };

            let range = sem_range_to_py_range(spec).unwrap_or_else(|_| ">=0.0.0".to_string());
            out.insert(python_name.clone(), range);
        }

        Ok(out)
    }

    fn write_dist_info_metadata(&self) -> Result<()> {
        let info = self.version_info;
        let (author, author_email) = author_info(info);
        let maintainers = maintainer_info(info);
        let requires = self.requires_dist()?;

        let mut lines = vec![
            "Metadata-Version: 2.1".to_string(),
            format!("Name: {}", self.distribution.python_name),
            format!("Version: {}", self.version.python_version),
            format!(
                "Summary: {}",
                sanitize(info.description.as_deref().unwrap_or(""))
            ),
        ];

        if let Some(homepage) = value_str(info.homepage.as_ref()) {
            lines.push(format!("Home-page: {}", sanitize(&homepage)));
        }

        let keywords = keyword_list(info);
        if !keywords.is_empty() {
            let joined: Vec<String> = keywords.iter().map(|k| sanitize(k)).collect();
            lines.push(format!("Keywords: {}", joined.join(",")));
        }

        if !author.is_empty() {
            lines.push(format!("Author: {}", sanitize(&author)));
        }

        if !author_email.is_empty() {
            lines.push(format!("Author-email: {}", sanitize(&author_email)));
        }

        let names: Vec<String> = maintainers
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, _)| sanitize(name))
            .collect();
        if !names.is_empty() {
            lines.push(format!("Maintainer: {}", names.join(", ")));
        }

        let emails: Vec<String> = maintainers
            .iter()
            .filter(|(_, email)| !email.is_empty())
            .map(|(_, email)| sanitize(email))
            .collect();
        if !emails.is_empty() {
            lines.push(format!("Maintainer-email: {}", emails.join(", ")));
        }

        if let Some(license) = license_name(info) {
            lines.push(format!("License: {}", sanitize(&license)));
        }

        if let Some(bugs) = bug_tracker(info) {
            lines.push(format!("Project-URL: Bug Tracker, {}", sanitize(&bugs)));
        }

        if let Some(repository) = repository_url(info) {
            lines.push(format!("Project-URL: Repository, {}", sanitize(&repository)));
        }

        // The runtime support package comes first, then the synthesized
        // dependency set.
        lines.push(format!("Requires-Dist: {} (>=0.0.0)", self.prefix));
        for (name, range) in &requires {
            lines.push(format!("Requires-Dist: {} ({})", name, range));
        }

        self.write_lines(&self.dist_info_dir().join("METADATA"), &lines)
    }

    /// Entry points for `bin`-bearing packages: a Python package that binds
    /// each script through the runtime helper, a `__main__` when the script
    /// is unambiguous, and the `entry_points.txt` console bindings.
    fn write_entry_points(&self) -> Result<()> {
        let Some(bin) = &self.version_info.bin else {
            return Ok(());
        };

        let real_js_name = self
            .distribution
            .js_name
            .rsplit("/node_modules/")
            .next()
            .unwrap_or(&self.distribution.js_name);
        let scripts = bin.as_map(real_js_name);

        if scripts.is_empty() {
            return Ok(());
        }

        let scripts = dedup_script_names(&scripts);

        let module_dir = self
            .distribution
            .python_name
            .split('.')
            .fold(self.wheel_dir(), |dir, part| dir.join(part));
        fs::create_dir_all(&module_dir)?;

        let mut map_entries: Vec<String> = Vec::new();
        for (script, (_, js_path)) in &scripts {
            map_entries.push(format!(
                "{}: {}",
                py_string_literal(script),
                py_string_literal(js_path)
            ));
        }

        let init = format!(
            "from {}.entrypoints import make_entrypoints\n\nentrypoints = make_entrypoints({}, {{{}}})\n",
            self.prefix,
            py_string_literal(real_js_name),
            map_entries.join(", "),
        );
        fs::write(module_dir.join("__init__.py"), init)?;

        if scripts.len() == 1 {
            let script = scripts.keys().next().unwrap();
            let main = format!("from . import entrypoints\n\nentrypoints.{}()\n", script);
            fs::write(module_dir.join("__main__.py"), main)?;
        }

        let mut lines = vec!["[console_scripts]".to_string()];
        for (script, (original, _)) in &scripts {
            lines.push(format!(
                "{} = {}:entrypoints.{}",
                original, self.distribution.python_name, script
            ));
        }

        self.write_lines(&self.dist_info_dir().join("entry_points.txt"), &lines)
    }

    /// The hash of every file in the archive, one line each, with the usual
    /// unhashed trailer for RECORD itself.
    fn write_dist_info_record(&self) -> Result<()> {
        let wheel_dir = self.wheel_dir();
        let mut lines = Vec::new();

        for path in sorted_files(&wheel_dir) {
            let rel = relative_slash_path(&path, &wheel_dir)?;
            let digest = file_digest(&path, "sha256")?;
            let size = fs::metadata(&path)?.len();

            lines.push(format!(
                "{},sha256={},{}",
                rel,
                urlsafe_b64_nopad(&digest),
                size
            ));
        }

        let dist_info_rel = relative_slash_path(&self.dist_info_dir(), &wheel_dir)?;
        lines.push(format!("{}/RECORD,,", dist_info_rel));

        self.write_lines(&self.dist_info_dir().join("RECORD"), &lines)
    }

    /// Zip the laid-out tree. Fixed timestamps, fixed permissions and a
    /// stable file order keep the output bit-reproducible.
    fn zip_wheel(&self) -> Result<()> {
        let wheel_dir = self.wheel_dir();
        let file = File::create(self.wheel_path())?;
        let mut zip = ZipWriter::new(file);

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        for path in sorted_files(&wheel_dir) {
            let rel = relative_slash_path(&path, &wheel_dir)?;
            zip.start_file(rel, options)?;

            let mut source = File::open(&path)?;
            std::io::copy(&mut source, &mut zip)?;
        }

        zip.finish()?;

        Ok(())
    }
}

/// Deduplicate script names into valid Python identifiers. Returns
/// `safe_name → (original_name, js_path)`, where colliding safe names get
/// the same content-derived tag scheme as distribution names.
fn dedup_script_names(scripts: &BTreeMap<String, String>) -> BTreeMap<String, (String, String)> {
    let mut out = BTreeMap::new();

    for (original, js_path) in scripts {
        let safe = safe_script_name(original);
        let mut seq = 0;
        let mut candidate = safe.clone();

        while out.contains_key(&candidate) {
            seq += 1;
            candidate = format!("{}_x{}", safe, dedup_tag(original, &safe, seq));
        }

        out.insert(candidate, (original.clone(), js_path.clone()));
    }

    out
}

/// Render a string as a Python string literal. Non-ASCII and control
/// characters are escaped by codepoint (`\uXXXX`, `\UXXXXXXXX` above the
/// BMP), so the generated source stays ASCII whatever the `bin` field holds.
fn py_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');

    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xffff => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }

    out.push('"');
    out
}

/// Lowercase, `_`-join every non-alphanumeric run, and keep the result a
/// valid identifier.
fn safe_script_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }

    if out.is_empty() {
        out.push_str("undefined");
    }

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'n');
    }

    out
}

fn sorted_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

fn relative_slash_path(path: &Path, root: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| Error::Other(format!("path escapes wheel dir: {}", path.display())))?;

    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    Ok(parts.join("/"))
}

fn copy_directory_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_directory_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

fn value_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn license_name(info: &VersionInfo) -> Option<String> {
    match info.license.as_ref() {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(map)) => match map.get("type") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn author_info(info: &VersionInfo) -> (String, String) {
    match info.author.as_ref() {
        Some(Value::String(s)) => (s.clone(), String::new()),
        Some(Value::Object(map)) => (
            map.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
            map.get("email").and_then(Value::as_str).unwrap_or("").to_string(),
        ),
        _ => (String::new(), String::new()),
    }
}

fn bug_tracker(info: &VersionInfo) -> Option<String> {
    match info.bugs.as_ref() {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(map)) => value_str(map.get("url")),
        _ => None,
    }
}

fn repository_url(info: &VersionInfo) -> Option<String> {
    match info.repository.as_ref() {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(map)) => value_str(map.get("url")),
        _ => None,
    }
}

fn keyword_list(info: &VersionInfo) -> Vec<String> {
    match info.keywords.as_ref() {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn maintainer_info(info: &VersionInfo) -> Vec<(String, String)> {
    match info.maintainers.as_ref() {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|m| {
                (
                    m.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
                    m.get("email").and_then(Value::as_str).unwrap_or("").to_string(),
                )
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Look up or synthesize the wheel archive for one distribution version.
///
/// Holds the distribution's row lock for the whole lookup-or-create so two
/// concurrent requests cannot both synthesize. A failed synthesis leaves no
/// Archive row behind.
pub fn get_or_create_archive(
    store: &dyn Store,
    npm: &NpmClient,
    prefix: &str,
    searchable_name: &str,
    python_version: &str,
) -> Result<Archive> {
    let distribution = store
        .distribution_by_searchable(searchable_name)?
        .ok_or_else(|| Error::PackageNotFound(searchable_name.to_string()))?;

    let _lock = store.lock_distribution(distribution.id)?;

    let version = store
        .version_by_python_version(distribution.id, python_version)?
        .ok_or_else(|| {
            Error::VersionNotFound(format!("{} {}", searchable_name, python_version))
        })?;

    if let Some(archive) =
        store.archive_for_version(version.id, ArchiveFormat::Wheel, TranslatorVersion::V1)?
    {
        return Ok(archive);
    }

    let real = match distribution.original {
        Some(original) => store
            .distribution_by_id(original)?
            .ok_or_else(|| Error::PackageNotFound(original.to_string()))?,
        None => distribution.clone(),
    };

    let info = npm.get_package_info(&real.js_name)?;
    let version_info = info.versions.get(&version.js_version).ok_or_else(|| {
        Error::VersionNotFound(format!("{} {}", real.js_name, version.js_version))
    })?;

    tracing::info!(
        distribution = %distribution.python_name,
        version = %version.python_version,
        "synthesizing wheel"
    );

    let translator =
        PackageTranslator::new(&distribution, &version, version_info, npm, store, prefix)?;
    let wheel_path = translator.translate()?;
    let hash = file_sha256_hex(&wheel_path)?;

    let file_name = wheel_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Other("wheel path has no file name".to_string()))?;

    store.create_archive(
        version.id,
        ArchiveFormat::Wheel,
        TranslatorVersion::V1,
        hash,
        &wheel_path,
        file_name,
    )
}

/// The archive-serving operation behind the wheel endpoint: parse the
/// requested file name, look up or synthesize the archive, and log the
/// download.
pub fn serve_archive(
    store: &dyn Store,
    npm: &NpmClient,
    prefix: &str,
    wheel_file_name: &str,
) -> Result<Archive> {
    let parsed = parse_wheel_filename(wheel_file_name)?;
    let archive = get_or_create_archive(
        store,
        npm,
        prefix,
        &parsed.searchable_name(),
        &parsed.version,
    )?;

    store.record_download(archive.id)?;

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("hello"), "hello");
        assert_eq!(sanitize("a\r\nb"), "a b");
        assert_eq!(sanitize("a\x00\x1fb"), "a b");
        assert_eq!(sanitize("héllo"), "h llo");
        assert_eq!(sanitize("tabs\tand\nlines"), "tabs and lines");
    }

    #[test]
    fn test_urlsafe_b64_nopad() {
        // Python: urlsafe_b64encode(b"any carnal pleasure.").rstrip(b"=")
        assert_eq!(
            urlsafe_b64_nopad(b"any carnal pleasure."),
            "YW55IGNhcm5hbCBwbGVhc3VyZS4"
        );
    }

    #[test]
    fn test_parse_wheel_filename() {
        let parsed = parse_wheel_filename("npym_lodash-4.17.21-py3-none-any.whl").unwrap();
        assert_eq!(parsed.project, "npym_lodash");
        assert_eq!(parsed.version, "4.17.21");
        assert_eq!(parsed.python_tag, "py3");
        assert_eq!(parsed.abi_tag, "none");
        assert_eq!(parsed.platform_tag, "any");
        assert_eq!(parsed.searchable_name(), "npym-lodash");

        let with_build =
            parse_wheel_filename("pkg-1.0.0-1-py3-none-any.whl").unwrap();
        assert_eq!(with_build.build_tag.as_deref(), Some("1"));

        assert!(parse_wheel_filename("not-a-wheel.zip").is_err());
        assert!(parse_wheel_filename("tooshort-py3.whl").is_err());
        assert!(parse_wheel_filename("a--b-py3-none-any.whl").is_err());
    }

    #[test]
    fn test_py_string_literal() {
        assert_eq!(py_string_literal("cli.js"), r#""cli.js""#);
        assert_eq!(py_string_literal("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(py_string_literal("a\nb\tc"), r#""a\nb\tc""#);
        // Codepoint escapes, not Rust's braced Debug form.
        assert_eq!(py_string_literal("café"), "\"caf\\u00e9\"");
        assert_eq!(py_string_literal("bin/日本.js"), "\"bin/\\u65e5\\u672c.js\"");
        assert_eq!(py_string_literal("🚀"), "\"\\U0001f680\"");
    }

    #[test]
    fn test_safe_script_name() {
        assert_eq!(safe_script_name("my-cli"), "my_cli");
        assert_eq!(safe_script_name("My.CLI"), "my_cli");
        assert_eq!(safe_script_name("7zip"), "n7zip");
        assert_eq!(safe_script_name("@@"), "undefined");
    }

    #[test]
    fn test_dedup_script_names() {
        let scripts = BTreeMap::from([
            ("my-cli".to_string(), "bin/a.js".to_string()),
            ("my.cli".to_string(), "bin/b.js".to_string()),
        ]);

        let deduped = dedup_script_names(&scripts);
        assert_eq!(deduped.len(), 2);
        assert!(deduped.contains_key("my_cli"));

        let tagged: Vec<&String> = deduped
            .keys()
            .filter(|k| k.as_str() != "my_cli")
            .collect();
        assert_eq!(tagged.len(), 1);
        assert!(tagged[0].starts_with("my_cli_x"));
    }
}
