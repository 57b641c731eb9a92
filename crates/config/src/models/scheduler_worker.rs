use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// 同一代理上一次运行尚未结束时，新触发的处理策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// 丢弃重叠的触发
    #[default]
    Skip,
    /// 最多排队一次触发，等待上一次运行结束
    Queue,
}

/// 每种代理类型的固定执行间隔（秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIntervals {
    pub load_matching_seconds: u64,
    pub route_optimization_seconds: u64,
    pub fuel_optimization_seconds: u64,
    pub compliance_monitoring_seconds: u64,
    pub customer_communication_seconds: u64,
}

impl Default for AgentIntervals {
    fn default() -> Self {
        Self {
            load_matching_seconds: 2 * 60,
            route_optimization_seconds: 5 * 60,
            fuel_optimization_seconds: 10 * 60,
            compliance_monitoring_seconds: 15 * 60,
            customer_communication_seconds: 30 * 60,
        }
    }
}

impl ConfigValidator for AgentIntervals {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_interval_seconds(
            self.load_matching_seconds,
            "scheduler.intervals.load_matching_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.route_optimization_seconds,
            "scheduler.intervals.route_optimization_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.fuel_optimization_seconds,
            "scheduler.intervals.fuel_optimization_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.compliance_monitoring_seconds,
            "scheduler.intervals.compliance_monitoring_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.customer_communication_seconds,
            "scheduler.intervals.customer_communication_seconds",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 首次运行的随机错峰窗口（毫秒），取值区间为 [0, startup_jitter_ms)
    pub startup_jitter_ms: u64,
    pub overlap_policy: OverlapPolicy,
    pub shutdown_timeout_seconds: u64,
    pub intervals: AgentIntervals,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            startup_jitter_ms: 10_000,
            overlap_policy: OverlapPolicy::Skip,
            shutdown_timeout_seconds: 30,
            intervals: AgentIntervals::default(),
        }
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.startup_jitter_ms > 600_000 {
            return Err(crate::ConfigError::Validation(
                "scheduler.startup_jitter_ms must be less than or equal to 600000".to_string(),
            ));
        }
        ValidationUtils::validate_timeout_seconds(
            self.shutdown_timeout_seconds,
            "scheduler.shutdown_timeout_seconds",
        )?;
        self.intervals.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub queue_name: String,
    pub completed_channel: String,
    pub failed_channel: String,
    pub concurrency: usize,
    pub pop_timeout_seconds: u64,
    /// 外部消息代理地址（redis:// 或 rediss://），未配置时使用进程内队列
    #[serde(default)]
    pub broker_url: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_name: "agent_tasks".to_string(),
            completed_channel: "agent_completed".to_string(),
            failed_channel: "agent_failed".to_string(),
            concurrency: 5,
            pop_timeout_seconds: 5,
            broker_url: None,
        }
    }
}

impl ConfigValidator for WorkerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.queue_name, "worker.queue_name")?;
        ValidationUtils::validate_not_empty(&self.completed_channel, "worker.completed_channel")?;
        ValidationUtils::validate_not_empty(&self.failed_channel, "worker.failed_channel")?;
        ValidationUtils::validate_count(self.concurrency, "worker.concurrency", 1000)?;
        ValidationUtils::validate_timeout_seconds(
            self.pop_timeout_seconds,
            "worker.pop_timeout_seconds",
        )?;
        if let Some(url) = &self.broker_url {
            ValidationUtils::validate_url_scheme(url, "worker.broker_url", &["redis", "rediss"])?;
        }
        Ok(())
    }
}
