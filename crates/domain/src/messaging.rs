//! 会话任务队列抽象

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_errors::FleetResult;
use serde::{Deserialize, Serialize};

/// 列表式任务队列，外部消息代理的接缝
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 阻塞弹出，超时返回 `None`
    async fn pop(&self, queue: &str, timeout: Duration) -> FleetResult<Option<String>>;
    async fn push(&self, queue: &str, payload: String) -> FleetResult<()>;
    async fn publish(&self, channel: &str, payload: String) -> FleetResult<()>;
}

/// 队列中的会话任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentJob {
    pub id: String,
    pub conversation_id: String,
    pub prompt: String,
}

/// 代理对一次会话任务的回复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompleted {
    pub task_id: String,
    pub result: AgentReply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailed {
    pub task_id: String,
    pub error: String,
}
