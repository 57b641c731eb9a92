pub mod agent;
pub mod entities;
pub mod messaging;
pub mod repositories;
pub mod settings;

pub use agent::*;
pub use entities::*;
pub use fleet_errors::{FleetError, FleetResult};
pub use messaging::*;
pub use repositories::*;
pub use settings::*;
