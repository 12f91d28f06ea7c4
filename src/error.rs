use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Version parsing error: {0}")]
    SemVer(#[from] semver::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid version spec: {0}")]
    Spec(String),

    #[error("Version conversion error: {0}")]
    VersionConversion(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Source integrity check failed: {0}")]
    Integrity(String),

    #[error("Dependency resolution failed: {0}")]
    Resolution(String),

    #[error("Invalid wheel filename: {0}")]
    WheelFilename(String),

    #[error("{0}")]
    Other(String),
}
