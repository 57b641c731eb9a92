//! 仓储操作的错误上下文
//!
//! 为所有仓储操作生成带实体信息和操作类型的错误消息，并统一记录日志。

use std::fmt;

use chrono::{DateTime, Utc};
use fleet_errors::FleetError;
use sqlx::Error as SqlxError;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone, Copy)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Query,
    Close,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Create => write!(f, "创建"),
            RepositoryOperation::Read => write!(f, "查询"),
            RepositoryOperation::Update => write!(f, "更新"),
            RepositoryOperation::Query => write!(f, "检索"),
            RepositoryOperation::Close => write!(f, "关闭"),
        }
    }
}

/// 仓储操作上下文
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub operation: RepositoryOperation,
    /// 实体名称，如 "代理"、"货物"
    pub entity: &'static str,
    pub entity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub additional_info: Option<String>,
}

impl OperationContext {
    pub fn new(operation: RepositoryOperation, entity: &'static str) -> Self {
        Self {
            operation,
            entity,
            entity_id: None,
            timestamp: Utc::now(),
            additional_info: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn entity_description(&self) -> String {
        match &self.entity_id {
            Some(id) => format!("{} (ID: {})", self.entity, id),
            None => self.entity.to_string(),
        }
    }
}

/// 便捷构造操作上下文
#[macro_export]
macro_rules! repo_context {
    ($operation:expr, $entity:expr) => {
        $crate::error_handling::OperationContext::new($operation, $entity)
    };
    ($operation:expr, $entity:expr, id = $id:expr) => {
        $crate::error_handling::OperationContext::new($operation, $entity).with_id($id.to_string())
    };
}

pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    #[instrument(skip_all, fields(
        operation = %context.operation,
        entity = context.entity,
        entity_id = ?context.entity_id,
    ))]
    pub fn database_error(context: OperationContext, error: SqlxError) -> FleetError {
        let entity_desc = context.entity_description();
        let operation_desc = context.operation.to_string();

        let error_msg = match &error {
            SqlxError::Database(db_error) => match db_error.constraint() {
                Some(constraint) => format!(
                    "{operation_desc}{entity_desc}时发生数据库约束冲突: {constraint}"
                ),
                None => format!("{operation_desc}{entity_desc}时发生数据库错误: {db_error}"),
            },
            SqlxError::PoolClosed => format!("{operation_desc}{entity_desc}时数据库连接池已关闭"),
            SqlxError::PoolTimedOut => format!("{operation_desc}{entity_desc}时数据库连接池超时"),
            SqlxError::Io(io_error) => {
                format!("{operation_desc}{entity_desc}时发生I/O错误: {io_error}")
            }
            _ => format!("{operation_desc}{entity_desc}时发生未知数据库错误: {error}"),
        };
        let error_msg = match &context.additional_info {
            Some(info) => format!("{error_msg} ({info})"),
            None => error_msg,
        };

        error!(error = %error, "{}", error_msg);
        FleetError::database_error(error_msg)
    }

    pub fn serialization_error(context: OperationContext, error: impl fmt::Display) -> FleetError {
        let error_msg = format!(
            "{}{}时序列化失败: {}",
            context.operation,
            context.entity_description(),
            error
        );
        error!(error = %error, "{}", error_msg);
        FleetError::Serialization(error_msg)
    }

    pub fn log_operation_success(context: &OperationContext, additional_info: Option<&str>) {
        let base_msg = format!("{}{}成功", context.operation, context.entity_description());
        match additional_info {
            Some(info) => debug!("{}: {}", base_msg, info),
            None => debug!("{}", base_msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_description() {
        let context = repo_context!(RepositoryOperation::Update, "货物", id = "L-1");
        assert_eq!(context.entity_description(), "货物 (ID: L-1)");
        let context = repo_context!(RepositoryOperation::Query, "司机");
        assert_eq!(context.entity_description(), "司机");
    }

    #[test]
    fn test_database_error_message() {
        let context = repo_context!(RepositoryOperation::Read, "代理", id = "a1");
        let err = RepositoryErrorHelpers::database_error(context, SqlxError::PoolClosed);
        assert!(err.to_string().contains("查询代理 (ID: a1)时数据库连接池已关闭"));
    }
}
