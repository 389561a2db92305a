//! Debug flag and restart control for a fleet of WordPress docker-compose deployments.

pub mod audit;
pub mod config;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod serve;

pub use config::{FleetSettings, UserRegistry};
pub use error::CoreError;
pub use fleet::{DebugStatus, FleetManager, Server, ServerRegistry, ServerStatus};

// HTTP shell
pub mod web {
    pub mod http;
    pub mod session;
}
