mod settings;
mod users;

pub use settings::{DEFAULT_BIND, FleetSettings};
pub use users::UserRegistry;
