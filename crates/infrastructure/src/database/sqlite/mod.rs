pub mod sqlite_agent_repository;
pub mod sqlite_driver_repository;
pub mod sqlite_load_repository;
pub mod sqlite_output_repositories;
pub mod sqlite_record_repositories;
pub mod sqlite_truck_repository;

pub use sqlite_agent_repository::SqliteAgentRepository;
pub use sqlite_driver_repository::SqliteDriverRepository;
pub use sqlite_load_repository::SqliteLoadRepository;
pub use sqlite_output_repositories::{
    SqliteComplianceRepository, SqliteConversationRepository, SqliteMetricRepository,
    SqliteNotificationRepository,
};
pub use sqlite_record_repositories::{SqliteHosLogRepository, SqliteTrackingRepository};
pub use sqlite_truck_repository::SqliteTruckRepository;
