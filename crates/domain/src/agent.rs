//! 代理定义与运行结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text_enum;

/// 代理类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    LoadMatching,
    RouteOptimization,
    FuelOptimization,
    ComplianceMonitoring,
    CustomerCommunication,
}

text_enum!(AgentKind {
    LoadMatching => "LOAD_MATCHING",
    RouteOptimization => "ROUTE_OPTIMIZATION",
    FuelOptimization => "FUEL_OPTIMIZATION",
    ComplianceMonitoring => "COMPLIANCE_MONITORING",
    CustomerCommunication => "CUSTOMER_COMMUNICATION",
});

/// 代理状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
    Maintenance,
}

text_enum!(AgentStatus {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    Error => "ERROR",
    Maintenance => "MAINTENANCE",
});

/// 持久化的代理定义
///
/// `kind` 保留存储中的原始文本，注册表加载时才解析为 [`AgentKind`]，
/// 这样未知类型只会导致该定义被跳过。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub status: AgentStatus,
    pub config: serde_json::Value,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub success_rate: f64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, kind: AgentKind) -> Self {
        let now = Utc::now();
        Self {
            id: crate::new_id(),
            name: name.into(),
            kind: kind.as_str().to_string(),
            description: None,
            enabled: true,
            status: AgentStatus::Active,
            config: serde_json::Value::Object(serde_json::Map::new()),
            total_runs: 0,
            successful_runs: 0,
            success_rate: 0.0,
            last_run: None,
            next_run: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn parsed_kind(&self) -> Option<AgentKind> {
        self.kind.parse().ok()
    }

    /// 记录一次运行结果后的计数与成功率
    pub fn apply_outcome(&mut self, success: bool) {
        self.total_runs += 1;
        if success {
            self.successful_runs += 1;
        }
        self.success_rate = rolling_success_rate(self.successful_runs, self.total_runs);
        self.updated_at = Utc::now();
    }
}

/// 滚动成功率
pub fn rolling_success_rate(successful_runs: i64, total_runs: i64) -> f64 {
    if total_runs <= 0 {
        0.0
    } else {
        successful_runs as f64 / total_runs as f64
    }
}

/// 单次运行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            finished_at: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_outcome_updates_rate() {
        let mut definition = AgentDefinition::new("Load Matcher", AgentKind::LoadMatching);
        definition.total_runs = 4;
        definition.successful_runs = 3;

        definition.apply_outcome(true);
        assert_eq!(definition.total_runs, 5);
        assert_eq!(definition.successful_runs, 4);
        assert!((definition.success_rate - 0.8).abs() < f64::EPSILON);

        definition.apply_outcome(false);
        assert_eq!(definition.total_runs, 6);
        assert_eq!(definition.successful_runs, 4);
        assert!((definition.success_rate - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_parsed_kind() {
        let mut definition = AgentDefinition::new("x", AgentKind::ComplianceMonitoring);
        assert_eq!(definition.parsed_kind(), Some(AgentKind::ComplianceMonitoring));
        definition.kind = "WEATHER_FORECAST".to_string();
        assert_eq!(definition.parsed_kind(), None);
    }

    #[test]
    fn test_rolling_success_rate_zero_runs() {
        assert_eq!(rolling_success_rate(0, 0), 0.0);
    }
}
