use std::fmt;

use serde::Serialize;

use super::{descriptor, registry::ServerRegistry};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugStatus {
    Enabled,
    Disabled,
}

impl From<bool> for DebugStatus {
    fn from(enabled: bool) -> Self {
        if enabled { DebugStatus::Enabled } else { DebugStatus::Disabled }
    }
}

impl DebugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebugStatus::Enabled => "enabled",
            DebugStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for DebugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub name: String,
    pub status: DebugStatus,
}

/// Debug status of every registered server, in registration order.
///
/// The first unreadable descriptor aborts the whole report.
pub fn all_statuses(registry: &ServerRegistry) -> Result<Vec<ServerStatus>, CoreError> {
    registry
        .iter()
        .map(|server| {
            let enabled = descriptor::is_debug_enabled(&server.path)?;
            Ok(ServerStatus { name: server.name.clone(), status: enabled.into() })
        })
        .collect()
}
