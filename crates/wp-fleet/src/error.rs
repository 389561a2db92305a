use std::{
    io,
    net::AddrParseError,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("server '{name}' not found")]
    ServerNotFound { name: String },

    #[error("failed to read deployment descriptor {path}")]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write deployment descriptor {path}")]
    WriteDescriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no restart command configured (set RESTART_COMMAND)")]
    RestartCommandMissing,

    #[error("failed to launch restart command in {path}")]
    RestartSpawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to capture restart command stderr in {path}")]
    RestartStderr {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for restart command in {path}")]
    RestartWait {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Carries the child's stderr verbatim.
    #[error("{stderr}")]
    RestartFailed { path: PathBuf, stderr: String },

    #[error("restart command in {path} failed: {status}")]
    RestartExit { path: PathBuf, status: ExitStatus },

    #[error("invalid bind address '{value}'")]
    InvalidBindAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },
}

impl CoreError {
    /// True for a restart command that ran and exited unsuccessfully.
    pub fn is_restart_failure(&self) -> bool {
        matches!(self, CoreError::RestartFailed { .. } | CoreError::RestartExit { .. })
    }

    /// Filesystem path the failure refers to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            CoreError::ReadDescriptor { path, .. }
            | CoreError::WriteDescriptor { path, .. }
            | CoreError::RestartSpawn { path, .. }
            | CoreError::RestartStderr { path, .. }
            | CoreError::RestartWait { path, .. }
            | CoreError::RestartFailed { path, .. }
            | CoreError::RestartExit { path, .. } => Some(path),
            CoreError::ServerNotFound { .. }
            | CoreError::RestartCommandMissing
            | CoreError::InvalidBindAddress { .. } => None,
        }
    }
}
