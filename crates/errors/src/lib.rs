use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("代理定义未找到: {id}")]
    AgentNotFound { id: String },
    #[error("货物未找到: {id}")]
    LoadNotFound { id: String },
    #[error("司机未找到: {id}")]
    DriverNotFound { id: String },
    #[error("车辆未找到: {id}")]
    TruckNotFound { id: String },
    #[error("未知的代理类型: {0}")]
    UnknownAgentKind(String),
    #[error("无效的代理配置: {kind} - {message}")]
    InvalidAgentConfig { kind: String, message: String },
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type FleetResult<T> = Result<T, FleetError>;

impl FleetError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn agent_not_found<S: Into<String>>(id: S) -> Self {
        Self::AgentNotFound { id: id.into() }
    }
    pub fn load_not_found<S: Into<String>>(id: S) -> Self {
        Self::LoadNotFound { id: id.into() }
    }
    pub fn driver_not_found<S: Into<String>>(id: S) -> Self {
        Self::DriverNotFound { id: id.into() }
    }
    pub fn truck_not_found<S: Into<String>>(id: S) -> Self {
        Self::TruckNotFound { id: id.into() }
    }
    pub fn invalid_config<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        Self::InvalidAgentConfig {
            kind: kind.into(),
            message: message.into(),
        }
    }
    pub fn queue_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }

    /// 加载阶段的配置类错误，只跳过对应定义，不影响其余代理
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FleetError::UnknownAgentKind(_)
                | FleetError::InvalidAgentConfig { .. }
                | FleetError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for FleetError {
    fn from(err: anyhow::Error) -> Self {
        FleetError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
