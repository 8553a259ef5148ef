//! Typed failures raised by the installer steps.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    #[error("must input the zabbix server ip")]
    MissingServerIp,

    #[error("invalid server ip: {0}")]
    InvalidServerIp(String),

    #[error("invalid agent ip: {0}")]
    InvalidAgentIp(String),

    #[error("invalid package URL: {0}")]
    InvalidPackageUrl(String),

    #[error("switch to {expected} then install (current user is {current})")]
    UserMismatch { expected: String, current: String },

    #[error("unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("no package found: {0}")]
    NoPackageFound(String),

    #[error("unknown package format: {0}")]
    UnsupportedArchive(PathBuf),

    #[error("archive entry '{0}' escapes the destination directory")]
    UnsafeEntryPath(PathBuf),

    #[error("path {0} already in use")]
    PathInUse(PathBuf),

    #[error("`{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{0}")]
    System(String),
}

impl InstallerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallerError>;
