use chrono::{Duration, Utc};
use fleet_domain::{
    new_id, ComplianceEvent, ComplianceEventType, ComplianceSettings, Driver, DriverStatus,
    NotificationType, Priority, RunOutcome, TruckStatus,
};
use fleet_errors::FleetResult;
use tracing::{debug, warn};

use crate::context::{AgentContext, RunReport};

/// 合规监控代理
///
/// 检查每名在岗司机回溯窗口内最近一条工时日志，并模拟驾照、体检和车辆年检提醒。
#[derive(Debug, Clone)]
pub struct ComplianceAgent {
    ctx: AgentContext,
    settings: ComplianceSettings,
}

#[derive(Debug, Default)]
struct ComplianceTally {
    checks: usize,
    violations: usize,
    warnings: usize,
}

impl ComplianceAgent {
    pub fn new(ctx: AgentContext, settings: ComplianceSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub async fn run(&self) -> RunOutcome {
        let result = self.execute().await;
        self.ctx.finish(result).await
    }

    /// 写入合规事件并同步发出通知
    async fn raise_event(
        &self,
        driver: &Driver,
        event_type: ComplianceEventType,
        severity: Priority,
        description: String,
    ) -> FleetResult<()> {
        let now = Utc::now();
        let event = ComplianceEvent {
            id: new_id(),
            driver_id: driver.id.clone(),
            event_type,
            severity,
            description: description.clone(),
            due_date: Some(now + Duration::days(self.settings.event_due_days)),
            resolved: false,
            created_at: now,
        };
        self.ctx.store.compliance.create(&event).await?;

        let priority = if severity == Priority::Critical {
            Priority::Critical
        } else {
            Priority::High
        };
        self.ctx
            .notify("Compliance Violation", description, NotificationType::Error, priority)
            .await
    }

    async fn check_hours_of_service(
        &self,
        driver: &Driver,
        tally: &mut ComplianceTally,
    ) -> FleetResult<()> {
        let s = &self.settings;
        let since = Utc::now() - Duration::days(s.lookback_days);
        let Some(log) = self
            .ctx
            .store
            .hos_logs
            .find_latest_since(&driver.id, since)
            .await?
        else {
            return Ok(());
        };

        let driving_hours = log.driving_minutes as f64 / 60.0;
        if log.driving_minutes > s.max_driving_minutes {
            self.raise_event(
                driver,
                ComplianceEventType::HosViolation,
                Priority::Critical,
                format!(
                    "Driver {} exceeded {}-hour driving limit: {:.1} hours",
                    driver.name,
                    s.max_driving_minutes / 60,
                    driving_hours
                ),
            )
            .await?;
            tally.violations += 1;
            warn!(driver = %driver.name, driving_minutes = log.driving_minutes, "驾驶时长超限");
        } else if log.driving_minutes > s.driving_warning_minutes {
            self.ctx
                .notify(
                    "HOS Warning",
                    format!(
                        "Driver {} approaching driving time limit: {:.1} hours",
                        driver.name, driving_hours
                    ),
                    NotificationType::Warning,
                    Priority::High,
                )
                .await?;
            tally.warnings += 1;
        }

        if log.sleep_minutes < s.min_rest_minutes {
            self.ctx
                .notify(
                    "Rest Period Warning",
                    format!(
                        "Driver {} had insufficient rest: {:.1} hours",
                        driver.name,
                        log.sleep_minutes as f64 / 60.0
                    ),
                    NotificationType::Warning,
                    Priority::Medium,
                )
                .await?;
            tally.warnings += 1;
        }
        Ok(())
    }

    async fn check_credentials(
        &self,
        driver: &Driver,
        tally: &mut ComplianceTally,
    ) -> FleetResult<()> {
        let s = &self.settings;
        // 同一次抽样同时决定驾照与体检两项检查
        let draw = self.ctx.random.unit();

        if draw < s.license_check_probability {
            self.raise_event(
                driver,
                ComplianceEventType::LicenseExpired,
                Priority::High,
                format!("Driver {}'s CDL expires within 30 days", driver.name),
            )
            .await?;
            tally.violations += 1;
        }

        if draw > 1.0 - s.physical_check_probability {
            self.raise_event(
                driver,
                ComplianceEventType::InspectionDue,
                Priority::Medium,
                format!("Driver {}'s DOT physical expires within 60 days", driver.name),
            )
            .await?;
        }
        Ok(())
    }

    async fn execute(&self) -> FleetResult<RunReport> {
        debug!("{} 开始运行", self.ctx.name);
        let store = &self.ctx.store;
        let mut tally = ComplianceTally::default();

        let driver_statuses: Vec<DriverStatus> = DriverStatus::ALL
            .iter()
            .copied()
            .filter(|status| *status != DriverStatus::OutOfService)
            .collect();
        let drivers = store.drivers.find_by_status(&driver_statuses).await?;

        for driver in &drivers {
            tally.checks += 1;
            self.check_hours_of_service(driver, &mut tally).await?;
            self.check_credentials(driver, &mut tally).await?;
        }

        let truck_statuses: Vec<TruckStatus> = TruckStatus::ALL
            .iter()
            .copied()
            .filter(|status| *status != TruckStatus::OutOfService)
            .collect();
        let trucks = store.trucks.find_by_status(&truck_statuses).await?;
        for truck in &trucks {
            if self.ctx.random.unit() < self.settings.truck_inspection_probability {
                self.ctx
                    .notify(
                        "Vehicle Inspection Due",
                        format!(
                            "Truck {} annual inspection due within 30 days",
                            truck.unit_number
                        ),
                        NotificationType::Warning,
                        Priority::Medium,
                    )
                    .await?;
                tally.warnings += 1;
            }
        }

        Ok(RunReport::new(format!(
            "checked {} drivers, found {} violations, issued {} warnings",
            tally.checks, tally.violations, tally.warnings
        ))
        .metric("compliance_checks_today", tally.checks as f64)
        .metric("violations_found_today", tally.violations as f64)
        .metric("warnings_issued_today", tally.warnings as f64))
    }
}
