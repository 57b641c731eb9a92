//! 会话任务 Worker
//!
//! 从任务队列弹出会话任务，生成代理回复写入会话，并发布完成或失败事件。

pub mod service;

pub use service::{AgentJobWorker, WorkerSettings};
