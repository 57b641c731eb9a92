use fleet_domain::{
    Driver, DriverStatus, Load, LoadMatchingSettings, LoadStatus, NotificationType, Priority,
    RunOutcome, Truck, TruckStatus,
};
use fleet_errors::FleetResult;
use tracing::{debug, info};

use crate::context::{AgentContext, RunReport};

/// 货物匹配代理
///
/// 按创建顺序遍历空闲货物，为每票货物选择候选列表中第一个满足条件的司机：
/// 同一区域、评分达标、货物重量不超过车辆载重上限。
#[derive(Debug, Clone)]
pub struct LoadMatchingAgent {
    ctx: AgentContext,
    settings: LoadMatchingSettings,
}

impl LoadMatchingAgent {
    pub fn new(ctx: AgentContext, settings: LoadMatchingSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub async fn run(&self) -> RunOutcome {
        let result = self.execute().await;
        self.ctx.finish(result).await
    }

    fn is_eligible(&self, load: &Load, driver: &Driver, truck: &Truck) -> bool {
        let same_region = match (driver.current_region(), load.pickup_region()) {
            (Some(driver_region), Some(load_region)) => driver_region == load_region,
            _ => false,
        };
        same_region
            && driver.rating >= self.settings.min_driver_rating
            && load.weight <= truck.max_weight * self.settings.capacity_utilization
    }

    async fn execute(&self) -> FleetResult<RunReport> {
        debug!("{} 开始运行", self.ctx.name);
        let store = &self.ctx.store;

        let available_loads = store.loads.find_by_status(&[LoadStatus::Available]).await?;
        let mut candidates = store.drivers.find_available_with_trucks().await?;
        let available_drivers = candidates.len();

        let mut matches_found = 0usize;
        for load in &available_loads {
            let Some(position) = candidates
                .iter()
                .position(|(driver, truck)| self.is_eligible(load, driver, truck))
            else {
                continue;
            };
            // 本轮已分配的司机不再参与后续匹配
            let (driver, truck) = candidates.remove(position);

            store
                .loads
                .assign(&load.id, &driver.id, Some(truck.id.as_str()))
                .await?;
            store
                .drivers
                .update_status(&driver.id, DriverStatus::OnDuty)
                .await?;
            store
                .trucks
                .update_status(&truck.id, TruckStatus::InUse)
                .await?;
            matches_found += 1;

            self.ctx
                .notify(
                    "Load Assignment Complete",
                    format!("Load {} assigned to {}", load.load_number, driver.name),
                    NotificationType::Success,
                    Priority::Medium,
                )
                .await?;
            info!(load = %load.load_number, driver = %driver.name, "货物已匹配司机");
        }

        Ok(RunReport::new(format!("matched {matches_found} loads"))
            .metric("loads_matched_today", matches_found as f64)
            .metric("available_loads", available_loads.len() as f64)
            .metric("available_drivers", available_drivers as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;
    use fleet_domain::AgentKind;
    use fleet_testing_utils::{DriverBuilder, InMemoryFleetStore, LoadBuilder, TruckBuilder};
    use std::sync::Arc;
    use std::time::Duration;

    fn agent(mem: &InMemoryFleetStore) -> LoadMatchingAgent {
        let ctx = AgentContext::new(
            "agent-lm",
            "Load Matcher",
            AgentKind::LoadMatching,
            mem.store(),
            Duration::from_secs(120),
            Arc::new(FixedRandom::constant(0.5)),
        );
        LoadMatchingAgent::new(ctx, LoadMatchingSettings::default())
    }

    #[test]
    fn test_eligibility_rules() {
        let mem = InMemoryFleetStore::new();
        let agent = agent(&mem);
        let truck = TruckBuilder::new().with_max_weight(50000.0).build();
        let driver = DriverBuilder::new().with_location("Dallas, TX").with_rating(4.5).build();

        let fits = LoadBuilder::new().with_pickup("Austin, TX").with_weight(45000.0).build();
        assert!(agent.is_eligible(&fits, &driver, &truck));

        let too_heavy = LoadBuilder::new().with_pickup("Austin, TX").with_weight(45001.0).build();
        assert!(!agent.is_eligible(&too_heavy, &driver, &truck));

        let other_region = LoadBuilder::new().with_pickup("Denver, CO").with_weight(1000.0).build();
        assert!(!agent.is_eligible(&other_region, &driver, &truck));

        let low_rated = DriverBuilder::new().with_rating(4.4).build();
        assert!(!agent.is_eligible(&fits, &low_rated, &truck));

        let nowhere = DriverBuilder::new().without_location().build();
        assert!(!agent.is_eligible(&fits, &nowhere, &truck));
    }
}
