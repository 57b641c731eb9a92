pub mod app_config;
pub mod database;
pub mod observability;
pub mod scheduler_worker;

pub use app_config::*;
pub use database::*;
pub use observability::*;
pub use scheduler_worker::*;
