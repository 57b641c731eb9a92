use crate::*;

#[test]
fn test_fleet_error_display() {
    let db_op_error = FleetError::DatabaseOperation("Connection failed".to_string());
    assert_eq!(db_op_error.to_string(), "数据库操作错误: Connection failed");

    let agent_error = FleetError::agent_not_found("agent-1");
    assert_eq!(agent_error.to_string(), "代理定义未找到: agent-1");

    let kind_error = FleetError::UnknownAgentKind("WEATHER".to_string());
    assert_eq!(kind_error.to_string(), "未知的代理类型: WEATHER");

    let config_error = FleetError::invalid_config("LOAD_MATCHING", "minDriverRating out of range");
    assert_eq!(
        config_error.to_string(),
        "无效的代理配置: LOAD_MATCHING - minDriverRating out of range"
    );

    let mq_error = FleetError::queue_error("closed");
    assert_eq!(mq_error.to_string(), "消息队列错误: closed");
}

#[test]
fn test_error_classification() {
    assert!(FleetError::UnknownAgentKind("X".into()).is_configuration());
    assert!(FleetError::invalid_config("X", "bad").is_configuration());
    assert!(FleetError::Configuration("broker".into()).is_configuration());
    assert!(!FleetError::database_error("down").is_configuration());
    assert!(!FleetError::queue_error("closed").is_configuration());
}

#[test]
fn test_conversions() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: FleetError = json_err.into();
    assert!(matches!(err, FleetError::Serialization(_)));

    let err: FleetError = anyhow::anyhow!("wrapped").into();
    assert!(matches!(err, FleetError::Internal(ref m) if m == "wrapped"));

    let err: FleetError = sqlx::Error::PoolClosed.into();
    assert!(matches!(err, FleetError::Database(_)));
}
