//! 代理调度
//!
//! 注册表在启动时加载一次启用的代理定义，调度器按固定间隔驱动每个代理，
//! 并保证同一代理不会重叠运行。

pub mod intervals;
pub mod registry;
pub mod scheduler;

pub use intervals::interval_for;
pub use registry::AgentRegistry;
pub use scheduler::{AgentScheduler, SchedulerSettings};
