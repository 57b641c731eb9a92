use fleet_domain::{
    DriverStatus, FuelOptimizationSettings, NotificationType, Priority, RunOutcome,
};
use fleet_errors::FleetResult;
use tracing::{debug, info};

use crate::context::{AgentContext, RunReport};

const MPG_MIN: f64 = 6.5;
const MPG_MAX: f64 = 8.0;

/// 燃油优化代理
///
/// 只产生通知和指标，不修改车辆数据。
#[derive(Debug, Clone)]
pub struct FuelOptimizationAgent {
    ctx: AgentContext,
    settings: FuelOptimizationSettings,
}

impl FuelOptimizationAgent {
    pub fn new(ctx: AgentContext, settings: FuelOptimizationSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub async fn run(&self) -> RunOutcome {
        let result = self.execute().await;
        self.ctx.finish(result).await
    }

    async fn execute(&self) -> FleetResult<RunReport> {
        debug!("{} 开始运行", self.ctx.name);
        let store = &self.ctx.store;
        let s = &self.settings;

        let active_drivers = store
            .drivers
            .find_by_status(&[DriverStatus::OnDuty, DriverStatus::Driving])
            .await?;

        let mut recommendations = 0usize;
        let mut potential_savings = 0.0;
        for driver in &active_drivers {
            let Some(truck_id) = driver.truck_id.as_deref() else {
                continue;
            };
            let Some(truck) = store.trucks.find_by_id(truck_id).await? else {
                continue;
            };

            let fuel_level = self.ctx.random.between(s.fuel_level_min, s.fuel_level_max);
            if fuel_level < s.low_fuel_threshold {
                if let Some(station) = s.best_station() {
                    let fuel_needed = truck.fuel_capacity * (1.0 - fuel_level);
                    let savings = (s.market_price - station.price) * fuel_needed;
                    if savings > s.min_savings {
                        self.ctx
                            .notify(
                                "Fuel Savings Opportunity",
                                format!(
                                    "{}: Fuel at {} ({} miles) - Save ${:.2}",
                                    driver.name, station.name, station.distance, savings
                                ),
                                NotificationType::Info,
                                Priority::Low,
                            )
                            .await?;
                        recommendations += 1;
                        potential_savings += savings;
                        info!(driver = %driver.name, station = %station.name, savings, "生成加油建议");
                    }
                }
            }

            let avg_mpg = self.ctx.random.between(MPG_MIN, MPG_MAX);
            self.ctx
                .record_metric(&format!("fuel_efficiency_{}", driver.id), avg_mpg)
                .await?;
        }

        Ok(RunReport::new(format!(
            "generated {recommendations} recommendations, potential savings ${potential_savings:.2}"
        ))
        .metric("fuel_recommendations_today", recommendations as f64)
        .metric("potential_fuel_savings_today", potential_savings)
        .metric("active_drivers_monitored", active_drivers.len() as f64))
    }
}
