use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_agents::{AgentHandler, RandomSource};
use fleet_config::AgentIntervals;
use fleet_domain::FleetStore;
use fleet_errors::FleetResult;
use tracing::{info, warn};

use crate::intervals::interval_for;

/// 代理注册表，以代理 ID 为键
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    handlers: BTreeMap<String, Arc<AgentHandler>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取全部启用的代理定义并构造处理器
    ///
    /// 类型未知或配置无效的定义记录警告后跳过，只有存储读取失败才返回错误。
    pub async fn load(
        store: &FleetStore,
        intervals: &AgentIntervals,
        random: Arc<dyn RandomSource>,
    ) -> FleetResult<Self> {
        let definitions = store.agents.find_enabled().await?;
        let mut registry = Self::new();

        for definition in &definitions {
            match AgentHandler::from_definition(
                definition,
                store.clone(),
                random.clone(),
                |kind| interval_for(intervals, kind),
            ) {
                Ok(handler) => registry.register(handler),
                Err(e) if e.is_configuration() => {
                    warn!(
                        agent_id = %definition.id,
                        kind = %definition.kind,
                        error = %e,
                        "跳过无法加载的代理定义: {}",
                        definition.name
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "代理注册表加载完成: 启用定义 {} 个，可调度代理 {} 个",
            definitions.len(),
            registry.len()
        );
        Ok(registry)
    }

    pub fn register(&mut self, handler: AgentHandler) {
        let id = handler.id().to_string();
        if self.handlers.insert(id.clone(), Arc::new(handler)).is_some() {
            warn!(agent_id = %id, "代理 ID 重复，后注册者覆盖前者");
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<AgentHandler>> {
        self.handlers.get(id)
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<AgentHandler>> {
        self.handlers.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
