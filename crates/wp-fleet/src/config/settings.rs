use std::{env, net::SocketAddr};

use tracing::debug;

use super::users::UserRegistry;
use crate::{error::CoreError, fleet::ServerRegistry};

const SERVERS_ENV_KEY: &str = "SERVERS";
const USERS_ENV_KEY: &str = "USERS";
const RESTART_COMMAND_ENV_KEY: &str = "RESTART_COMMAND";
const BIND_ENV_KEY: &str = "WP_FLEET_BIND";

/// Address the HTTP shell listens on when nothing else is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub servers: ServerRegistry,
    pub users: UserRegistry,
    pub restart_command: Option<String>,
    pub bind: SocketAddr,
}

impl FleetSettings {
    /// Read settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self, CoreError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded environment file"),
            Err(err) if err.not_found() => {}
            Err(err) => debug!(error = %err, "ignoring unreadable environment file"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let servers = ServerRegistry::load(&lookup(SERVERS_ENV_KEY).unwrap_or_default());
        let users = UserRegistry::load(&lookup(USERS_ENV_KEY).unwrap_or_default());
        let restart_command =
            lookup(RESTART_COMMAND_ENV_KEY).filter(|value| !value.trim().is_empty());
        let bind = parse_bind(lookup(BIND_ENV_KEY).as_deref().unwrap_or(DEFAULT_BIND))?;
        Ok(Self { servers, users, restart_command, bind })
    }
}

fn parse_bind(value: &str) -> Result<SocketAddr, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|source| CoreError::InvalidBindAddress { value: value.to_string(), source })
}
