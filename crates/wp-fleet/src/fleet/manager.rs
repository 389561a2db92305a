use std::path::Path;

use tracing::{debug, info};

use super::{
    descriptor,
    registry::ServerRegistry,
    restart,
    status::{self, DebugStatus, ServerStatus},
};
use crate::error::CoreError;

/// Entry point used by the HTTP shell and the CLI.
///
/// Built once at startup and shared read-only; every operation goes back to the descriptor
/// files on disk.
#[derive(Debug, Clone)]
pub struct FleetManager {
    registry: ServerRegistry,
    restart_command: Option<String>,
}

impl FleetManager {
    pub fn new(registry: ServerRegistry, restart_command: Option<String>) -> Self {
        let restart_command =
            restart_command.map(|cmd| cmd.trim().to_string()).filter(|cmd| !cmd.is_empty());
        Self { registry, restart_command }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn server_count(&self) -> usize {
        self.registry.len()
    }

    pub fn restart_command(&self) -> Option<&str> {
        self.restart_command.as_deref()
    }

    pub fn lookup(&self, name: &str) -> Result<&Path, CoreError> {
        let path = self
            .registry
            .lookup(name)
            .ok_or_else(|| CoreError::ServerNotFound { name: name.to_string() })?;
        debug!(server = name, path = %path.display(), "resolved server");
        Ok(path)
    }

    pub fn is_debug_enabled(&self, path: &Path) -> Result<bool, CoreError> {
        descriptor::is_debug_enabled(path)
    }

    pub fn toggle(&self, path: &Path, enable: bool) -> Result<(), CoreError> {
        descriptor::toggle_debug(path, enable)
    }

    pub fn all_statuses(&self) -> Result<Vec<ServerStatus>, CoreError> {
        status::all_statuses(&self.registry)
    }

    pub fn restart(&self, path: &Path) -> Result<(), CoreError> {
        let command = self.restart_command.as_deref().ok_or(CoreError::RestartCommandMissing)?;
        restart::restart(path, command)
    }

    /// Flip the named server's debug flag and return the state read back from disk.
    pub fn flip_debug(&self, name: &str) -> Result<DebugStatus, CoreError> {
        let path = self.lookup(name)?;
        let enabled = self.is_debug_enabled(path)?;
        self.set_debug_at(name, path, !enabled)
    }

    /// Toggle the named server's debug flag towards `enable`.
    pub fn set_debug(&self, name: &str, enable: bool) -> Result<DebugStatus, CoreError> {
        let path = self.lookup(name)?;
        self.set_debug_at(name, path, enable)
    }

    pub fn restart_server(&self, name: &str) -> Result<(), CoreError> {
        let path = self.lookup(name)?;
        self.restart(path)?;
        info!(server = name, "server restarted");
        Ok(())
    }

    fn set_debug_at(
        &self,
        name: &str,
        path: &Path,
        enable: bool,
    ) -> Result<DebugStatus, CoreError> {
        self.toggle(path, enable)?;
        let status = DebugStatus::from(self.is_debug_enabled(path)?);
        info!(server = name, requested = enable, %status, "debug flag toggled");
        Ok(status)
    }
}
