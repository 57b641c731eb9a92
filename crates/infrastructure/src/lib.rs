pub mod database;
pub mod error_handling;
pub mod in_memory_queue;
pub mod redis_queue;

pub use database::{DatabaseManager, SqliteStoreLifecycle};
pub use error_handling::{OperationContext, RepositoryErrorHelpers, RepositoryOperation};
pub use in_memory_queue::InMemoryJobQueue;
pub use redis_queue::RedisJobQueue;
