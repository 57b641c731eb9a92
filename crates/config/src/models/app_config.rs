use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    database::DatabaseConfig,
    observability::ObservabilityConfig,
    scheduler_worker::{SchedulerConfig, WorkerConfig},
};
use crate::validation::ConfigValidator;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/fleet.toml",
    "fleet.toml",
    "/etc/fleet/config.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> FLEET_* 环境变量 的顺序合并配置
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults =
            ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("FLEET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.database.validate()?;
        self.scheduler.validate()?;
        self.worker.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogFormat, OverlapPolicy};
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.scheduler.startup_jitter_ms, 10_000);
        assert_eq!(config.scheduler.intervals.load_matching_seconds, 120);
        assert_eq!(config.worker.queue_name, "agent_tasks");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[database]
url = "sqlite::memory:"
max_connections = 2
min_connections = 1
connection_timeout_seconds = 30
idle_timeout_seconds = 600

[scheduler]
enabled = true
startup_jitter_ms = 0
overlap_policy = "queue"
shutdown_timeout_seconds = 10

[scheduler.intervals]
load_matching_seconds = 60
route_optimization_seconds = 300
fuel_optimization_seconds = 600
compliance_monitoring_seconds = 900
customer_communication_seconds = 1800

[observability]
log_level = "debug"
log_format = "json"
"#;

        let config = AppConfig::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.scheduler.overlap_policy, OverlapPolicy::Queue);
        assert_eq!(config.scheduler.intervals.load_matching_seconds, 60);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        // 未出现的段落使用默认值
        assert_eq!(config.worker.concurrency, 5);
    }

    #[test]
    fn test_app_config_rejects_invalid_toml_values() {
        let toml_str = r#"
[scheduler.intervals]
load_matching_seconds = 0
route_optimization_seconds = 300
fuel_optimization_seconds = 600
compliance_monitoring_seconds = 900
customer_communication_seconds = 1800
"#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[scheduler]
enabled = true
startup_jitter_ms = 500
overlap_policy = "skip"
shutdown_timeout_seconds = 5

[scheduler.intervals]
load_matching_seconds = 30
route_optimization_seconds = 300
fuel_optimization_seconds = 600
compliance_monitoring_seconds = 900
customer_communication_seconds = 1800
"#
        )
        .expect("Failed to write config");

        let path = file.path().to_str().expect("utf-8 path");
        let config = AppConfig::load(Some(path)).expect("Failed to load config");
        assert_eq!(config.scheduler.startup_jitter_ms, 500);
        assert_eq!(config.scheduler.intervals.load_matching_seconds, 30);
        assert_eq!(config.database.url, "sqlite://fleet.db");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/fleet.toml")).is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().expect("Failed to serialize");
        let parsed = AppConfig::from_toml(&toml_str).expect("Failed to parse");
        assert_eq!(
            parsed.scheduler.intervals.customer_communication_seconds,
            config.scheduler.intervals.customer_communication_seconds
        );
    }
}
