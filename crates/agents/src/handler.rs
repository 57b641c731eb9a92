use std::sync::Arc;
use std::time::Duration;

use fleet_domain::{AgentDefinition, AgentKind, AgentSettings, FleetStore, RunOutcome};
use fleet_errors::{FleetError, FleetResult};

use crate::compliance::ComplianceAgent;
use crate::context::AgentContext;
use crate::customer_communication::CustomerCommunicationAgent;
use crate::fuel_optimization::FuelOptimizationAgent;
use crate::load_matching::LoadMatchingAgent;
use crate::random::RandomSource;
use crate::route_optimization::RouteOptimizationAgent;

/// 可被调度的代理，类型集合是封闭的
#[derive(Debug, Clone)]
pub enum AgentHandler {
    LoadMatching(LoadMatchingAgent),
    RouteOptimization(RouteOptimizationAgent),
    FuelOptimization(FuelOptimizationAgent),
    ComplianceMonitoring(ComplianceAgent),
    CustomerCommunication(CustomerCommunicationAgent),
}

impl AgentHandler {
    /// 由持久化的代理定义构造处理器
    ///
    /// 未知类型返回 `UnknownAgentKind`，配置无法解析或超出范围返回 `InvalidAgentConfig`。
    pub fn from_definition(
        definition: &AgentDefinition,
        store: FleetStore,
        random: Arc<dyn RandomSource>,
        interval_of: impl Fn(AgentKind) -> Duration,
    ) -> FleetResult<Self> {
        let kind = definition
            .parsed_kind()
            .ok_or_else(|| FleetError::UnknownAgentKind(definition.kind.clone()))?;
        let settings = AgentSettings::parse(kind, &definition.config)?;
        let ctx = AgentContext::new(
            &definition.id,
            &definition.name,
            kind,
            store,
            interval_of(kind),
            random,
        );
        Ok(Self::with_settings(ctx, settings))
    }

    pub fn with_settings(ctx: AgentContext, settings: AgentSettings) -> Self {
        match settings {
            AgentSettings::LoadMatching(s) => Self::LoadMatching(LoadMatchingAgent::new(ctx, s)),
            AgentSettings::RouteOptimization(s) => {
                Self::RouteOptimization(RouteOptimizationAgent::new(ctx, s))
            }
            AgentSettings::FuelOptimization(s) => {
                Self::FuelOptimization(FuelOptimizationAgent::new(ctx, s))
            }
            AgentSettings::ComplianceMonitoring(s) => {
                Self::ComplianceMonitoring(ComplianceAgent::new(ctx, s))
            }
            AgentSettings::CustomerCommunication(s) => {
                Self::CustomerCommunication(CustomerCommunicationAgent::new(ctx, s))
            }
        }
    }

    pub fn context(&self) -> &AgentContext {
        match self {
            Self::LoadMatching(agent) => agent.context(),
            Self::RouteOptimization(agent) => agent.context(),
            Self::FuelOptimization(agent) => agent.context(),
            Self::ComplianceMonitoring(agent) => agent.context(),
            Self::CustomerCommunication(agent) => agent.context(),
        }
    }

    pub fn id(&self) -> &str {
        &self.context().id
    }

    pub fn name(&self) -> &str {
        &self.context().name
    }

    pub fn kind(&self) -> AgentKind {
        self.context().kind
    }

    pub fn interval(&self) -> Duration {
        self.context().interval
    }

    /// 执行一次处理，错误已在内部转换为状态与告警
    pub async fn run(&self) -> RunOutcome {
        match self {
            Self::LoadMatching(agent) => agent.run().await,
            Self::RouteOptimization(agent) => agent.run().await,
            Self::FuelOptimization(agent) => agent.run().await,
            Self::ComplianceMonitoring(agent) => agent.run().await,
            Self::CustomerCommunication(agent) => agent.run().await,
        }
    }

    pub async fn cleanup(&self) -> FleetResult<()> {
        self.context().cleanup().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;
    use fleet_testing_utils::{AgentDefinitionBuilder, InMemoryFleetStore};
    use serde_json::json;

    fn build(definition: &AgentDefinition) -> FleetResult<AgentHandler> {
        AgentHandler::from_definition(
            definition,
            InMemoryFleetStore::new().store(),
            Arc::new(FixedRandom::constant(0.5)),
            |_| Duration::from_secs(60),
        )
    }

    #[test]
    fn test_from_definition_resolves_kind() {
        for kind in AgentKind::ALL {
            let definition = AgentDefinitionBuilder::new(*kind).build();
            let handler = build(&definition).unwrap();
            assert_eq!(handler.kind(), *kind);
            assert_eq!(handler.id(), definition.id);
            assert_eq!(handler.interval(), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let definition = AgentDefinitionBuilder::new(AgentKind::LoadMatching)
            .with_raw_kind("WEATHER_WATCH")
            .build();
        let err = build(&definition).unwrap_err();
        assert!(matches!(err, FleetError::UnknownAgentKind(ref kind) if kind == "WEATHER_WATCH"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let definition = AgentDefinitionBuilder::new(AgentKind::RouteOptimization)
            .with_config(json!({ "minReduction": 0.5, "maxReduction": 0.1 }))
            .build();
        let err = build(&definition).unwrap_err();
        assert!(matches!(err, FleetError::InvalidAgentConfig { .. }));
        assert!(err.is_configuration());
    }
}
