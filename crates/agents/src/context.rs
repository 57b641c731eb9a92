use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_domain::{
    AgentKind, AgentMetric, AgentStatus, FleetStore, Notification, NotificationType, Priority,
    RunOutcome,
};
use fleet_errors::{FleetError, FleetResult};
use tracing::{error, info, warn};

use crate::random::RandomSource;

/// 一次成功运行的产出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// 按顺序写入的指标
    pub metrics: Vec<(String, f64)>,
    pub summary: String,
}

impl RunReport {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            metrics: Vec::new(),
            summary: summary.into(),
        }
    }

    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.push((name.into(), value));
        self
    }
}

/// 代理共享的运行上下文与收尾逻辑
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub id: String,
    pub name: String,
    pub kind: AgentKind,
    pub store: FleetStore,
    /// 调度间隔，用于计算下次运行时间
    pub interval: Duration,
    pub random: Arc<dyn RandomSource>,
}

impl AgentContext {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: AgentKind,
        store: FleetStore,
        interval: Duration,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            store,
            interval,
            random,
        }
    }

    pub async fn notify(
        &self,
        title: &str,
        message: impl Into<String>,
        notification_type: NotificationType,
        priority: Priority,
    ) -> FleetResult<()> {
        let notification = Notification::new(
            title,
            message,
            notification_type,
            priority,
            Some(self.id.clone()),
        );
        self.store.notifications.create(&notification).await?;
        Ok(())
    }

    pub async fn record_metric(&self, metric_name: &str, value: f64) -> FleetResult<()> {
        self.store
            .metrics
            .record(&AgentMetric::new(&self.id, metric_name, value))
            .await
    }

    /// 把业务处理结果转换为运行结果，任何错误都不会向调用方传播
    pub async fn finish(&self, result: FleetResult<RunReport>) -> RunOutcome {
        let result = match result {
            Ok(report) => self.succeed(&report).await.map(|_| report),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                info!(agent_id = %self.id, kind = %self.kind, "{} 运行完成: {}", self.name, report.summary);
                RunOutcome::succeeded(report.summary)
            }
            Err(e) => {
                self.fail(&e).await;
                RunOutcome::failed(e.to_string())
            }
        }
    }

    async fn succeed(&self, report: &RunReport) -> FleetResult<()> {
        for (name, value) in &report.metrics {
            self.record_metric(name, *value).await?;
        }
        let now = Utc::now();
        self.store
            .agents
            .update_status(&self.id, AgentStatus::Active, Some(now), Some(self.next_run_at(now)))
            .await?;
        self.store.agents.record_outcome(&self.id, true).await?;
        Ok(())
    }

    /// 失败收尾，每一步独立执行
    async fn fail(&self, cause: &FleetError) {
        error!(agent_id = %self.id, kind = %self.kind, error = %cause, "{} 运行失败", self.name);

        let now = Utc::now();
        if let Err(e) = self
            .store
            .agents
            .update_status(&self.id, AgentStatus::Error, Some(now), Some(self.next_run_at(now)))
            .await
        {
            warn!(agent_id = %self.id, error = %e, "更新代理状态失败");
        }

        if let Err(e) = self.store.agents.record_outcome(&self.id, false).await {
            warn!(agent_id = %self.id, error = %e, "更新代理成功率失败");
        }

        if let Err(e) = self
            .notify(
                "Agent Error",
                format!("{} encountered an error: {}", self.name, cause),
                NotificationType::Error,
                Priority::High,
            )
            .await
        {
            warn!(agent_id = %self.id, error = %e, "创建告警通知失败");
        }
    }

    fn next_run_at(&self, now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
        now + chrono::Duration::from_std(self.interval).unwrap_or(chrono::Duration::zero())
    }

    /// 停止时的清理：清除下次运行时间
    pub async fn cleanup(&self) -> FleetResult<()> {
        self.store.agents.clear_next_run(&self.id).await
    }
}
