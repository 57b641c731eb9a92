//! 货运调度代理
//!
//! 五种代理各自完成一次"读取-判定-写回"的处理，运行结果通过
//! [`AgentContext`] 统一写回代理状态、成功率和告警通知。

pub mod compliance;
pub mod context;
pub mod customer_communication;
pub mod fuel_optimization;
pub mod handler;
pub mod load_matching;
pub mod random;
pub mod route_optimization;

pub use compliance::ComplianceAgent;
pub use context::{AgentContext, RunReport};
pub use customer_communication::CustomerCommunicationAgent;
pub use fuel_optimization::FuelOptimizationAgent;
pub use handler::AgentHandler;
pub use load_matching::LoadMatchingAgent;
pub use random::{FixedRandom, RandomSource, SystemRandom};
pub use route_optimization::RouteOptimizationAgent;
