//! Registry, descriptor inspection/toggling, status aggregation and restarts.

pub mod descriptor;
pub mod manager;
pub mod registry;
pub mod restart;
pub mod status;

pub use manager::FleetManager;
pub use registry::{Server, ServerRegistry};
pub use status::{DebugStatus, ServerStatus};
