//! Error taxonomy for the provisioning pipeline
//!
//! Tool absence is not an error and has no variant here: probes report it as
//! a `ToolState` with `installed == false`. Everything below is a failure of
//! one unit of work (a download, an install job, a build invocation) and is
//! logged to the progress sink with its cause before being returned.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while downloading an installer artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} interrupted: {source}")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no data received for {secs} seconds while downloading {url}")]
    Timeout { url: String, secs: u64 },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single install job. Never aborts the rest of the batch.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no installer configured for {tool} on this platform")]
    NotConfigured { tool: String },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("failed to extract {}: {message}", archive.display())]
    Extract { archive: PathBuf, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reading or writing the persistent PATH.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry operation failed: {0}")]
    Registry(String),

    #[error("environment change broadcast failed: {0}")]
    Broadcast(String),

    #[error("could not determine home directory")]
    NoHome,
}

/// Failure launching or supervising the build script. A non-zero exit is not
/// an error: it is reported through `BuildResult`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to launch {interpreter}: {source}")]
    Launch {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build output stream failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure loading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}
