use fleet_domain::{
    LoadStatus, NotificationType, Priority, RouteOptimizationSettings, RunOutcome,
};
use fleet_errors::FleetResult;
use tracing::{debug, info};

use crate::context::{AgentContext, RunReport};

/// 路线优化代理，对进行中的货物模拟一次路线缩短
#[derive(Debug, Clone)]
pub struct RouteOptimizationAgent {
    ctx: AgentContext,
    settings: RouteOptimizationSettings,
}

/// 单票货物的优化结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSaving {
    pub optimized_distance: f64,
    pub distance_saved: f64,
    pub cost_saved: f64,
}

impl RouteOptimizationAgent {
    pub fn new(ctx: AgentContext, settings: RouteOptimizationSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub async fn run(&self) -> RunOutcome {
        let result = self.execute().await;
        self.ctx.finish(result).await
    }

    pub fn estimate(&self, current_distance: f64, r: f64) -> RouteSaving {
        let s = &self.settings;
        let reduction = s.min_reduction + r * (s.max_reduction - s.min_reduction);
        let optimized_distance = current_distance * (1.0 - reduction);
        let distance_saved = current_distance - optimized_distance;
        RouteSaving {
            optimized_distance,
            distance_saved,
            cost_saved: distance_saved * s.gallons_per_mile * s.fuel_price,
        }
    }

    async fn execute(&self) -> FleetResult<RunReport> {
        debug!("{} 开始运行", self.ctx.name);
        let store = &self.ctx.store;

        let active_loads = store
            .loads
            .find_by_status(&[LoadStatus::Assigned, LoadStatus::InTransit])
            .await?;

        let mut routes_optimized = 0usize;
        let mut total_savings = 0.0;
        for load in &active_loads {
            let saving = self.estimate(load.distance, self.ctx.random.unit());
            if saving.distance_saved <= self.settings.min_distance_saved {
                continue;
            }

            let note = format!("Route optimized - {:.1} miles saved.", saving.distance_saved);
            let instructions = match load.special_instructions.as_deref() {
                Some(existing) if !existing.is_empty() => format!("{existing}. {note}"),
                _ => note,
            };
            store
                .loads
                .update_route(&load.id, saving.optimized_distance, Some(&instructions))
                .await?;

            routes_optimized += 1;
            total_savings += saving.cost_saved;

            if saving.cost_saved > self.settings.notify_savings_threshold {
                self.ctx
                    .notify(
                        "Route Optimization Success",
                        format!(
                            "Load {}: Saved {:.1} miles, ${:.2} in fuel costs",
                            load.load_number, saving.distance_saved, saving.cost_saved
                        ),
                        NotificationType::Success,
                        Priority::Low,
                    )
                    .await?;
            }
            info!(
                load = %load.load_number,
                miles_saved = saving.distance_saved,
                cost_saved = saving.cost_saved,
                "路线已优化"
            );
        }

        Ok(
            RunReport::new(format!(
                "optimized {routes_optimized} routes, saved ${total_savings:.2}"
            ))
            .metric("routes_optimized_today", routes_optimized as f64)
            .metric("fuel_savings_today", total_savings)
            .metric("active_loads_analyzed", active_loads.len() as f64),
        )
    }
}
