//! 全部仓储 trait 的内存实现
//!
//! 所有实体按插入顺序保存在 `Vec` 中，查询顺序与 SQLite 实现保持一致。
//! 通过 [`InMemoryFleetStore::fail_on`] 可以让指定操作返回数据库错误。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_domain::{
    AgentDefinition, AgentMetric, AgentRepository, AgentStatus, ComplianceEvent,
    ComplianceRepository, ConversationMessage, ConversationRepository, Driver, DriverRepository,
    DriverStatus, FleetStore, HosLog, HosLogRepository, Load, LoadRepository, LoadStatus,
    MetricRepository, Notification, NotificationRepository, StoreLifecycle, TrackingEvent,
    TrackingRepository, Truck, TruckRepository, TruckStatus,
};
use fleet_errors::{FleetError, FleetResult};

#[derive(Debug, Default)]
struct FleetState {
    agents: Vec<AgentDefinition>,
    loads: Vec<Load>,
    drivers: Vec<Driver>,
    trucks: Vec<Truck>,
    hos_logs: Vec<HosLog>,
    tracking: Vec<TrackingEvent>,
    notifications: Vec<Notification>,
    metrics: Vec<AgentMetric>,
    compliance: Vec<ComplianceEvent>,
    conversations: Vec<ConversationMessage>,
    close_calls: usize,
}

/// 内存存储，克隆后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct InMemoryFleetStore {
    state: Arc<Mutex<FleetState>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 组装成各组件使用的存储句柄
    pub fn store(&self) -> FleetStore {
        let this = Arc::new(self.clone());
        FleetStore {
            agents: this.clone(),
            loads: this.clone(),
            drivers: this.clone(),
            trucks: this.clone(),
            hos_logs: this.clone(),
            tracking: this.clone(),
            notifications: this.clone(),
            metrics: this.clone(),
            compliance: this.clone(),
            conversations: this.clone(),
            lifecycle: this,
        }
    }

    /// 让操作返回错误，`operation` 形如 `"loads.find_by_status"`，`"*"` 表示全部
    pub fn fail_on(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, operation: &str) -> FleetResult<()> {
        let failing = self.failing.lock().unwrap();
        if failing.contains("*") || failing.contains(operation) {
            Err(FleetError::database_error(format!("模拟数据库故障: {operation}")))
        } else {
            Ok(())
        }
    }

    pub fn insert_agent(&self, agent: AgentDefinition) {
        self.state.lock().unwrap().agents.push(agent);
    }

    pub fn insert_load(&self, load: Load) {
        self.state.lock().unwrap().loads.push(load);
    }

    pub fn insert_driver(&self, driver: Driver) {
        self.state.lock().unwrap().drivers.push(driver);
    }

    pub fn insert_truck(&self, truck: Truck) {
        self.state.lock().unwrap().trucks.push(truck);
    }

    pub fn insert_hos_log(&self, log: HosLog) {
        self.state.lock().unwrap().hos_logs.push(log);
    }

    pub fn insert_tracking_event(&self, event: TrackingEvent) {
        self.state.lock().unwrap().tracking.push(event);
    }

    pub fn agent(&self, id: &str) -> Option<AgentDefinition> {
        self.state
            .lock()
            .unwrap()
            .agents
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub fn load(&self, id: &str) -> Option<Load> {
        self.state
            .lock()
            .unwrap()
            .loads
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    pub fn driver(&self, id: &str) -> Option<Driver> {
        self.state
            .lock()
            .unwrap()
            .drivers
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn truck(&self, id: &str) -> Option<Truck> {
        self.state
            .lock()
            .unwrap()
            .trucks
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().unwrap().notifications.clone()
    }

    pub fn notifications_titled(&self, title: &str) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.title == title)
            .collect()
    }

    pub fn metrics(&self) -> Vec<AgentMetric> {
        self.state.lock().unwrap().metrics.clone()
    }

    /// 某个指标最后一次记录的值
    pub fn metric_value(&self, metric_name: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .rev()
            .find(|m| m.metric_name == metric_name)
            .map(|m| m.value)
    }

    pub fn compliance_events(&self) -> Vec<ComplianceEvent> {
        self.state.lock().unwrap().compliance.clone()
    }

    pub fn tracking_events(&self) -> Vec<TrackingEvent> {
        self.state.lock().unwrap().tracking.clone()
    }

    pub fn conversation_messages(&self) -> Vec<ConversationMessage> {
        self.state.lock().unwrap().conversations.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }
}

fn latest<'a, T, F>(items: impl Iterator<Item = &'a T>, key: F) -> Option<&'a T>
where
    T: 'a,
    F: Fn(&T) -> DateTime<Utc>,
{
    // 时间相同取后插入者，与 SQLite 的 rowid DESC 一致
    items.fold(None, |best: Option<&T>, item| match best {
        Some(b) if key(b) > key(item) => Some(b),
        _ => Some(item),
    })
}

#[async_trait]
impl AgentRepository for InMemoryFleetStore {
    async fn create(&self, definition: &AgentDefinition) -> FleetResult<AgentDefinition> {
        self.check("agents.create")?;
        self.insert_agent(definition.clone());
        Ok(definition.clone())
    }

    async fn find_by_id(&self, id: &str) -> FleetResult<Option<AgentDefinition>> {
        self.check("agents.find_by_id")?;
        Ok(self.agent(id))
    }

    async fn find_all(&self) -> FleetResult<Vec<AgentDefinition>> {
        self.check("agents.find_all")?;
        Ok(self.state.lock().unwrap().agents.clone())
    }

    async fn find_enabled(&self) -> FleetResult<Vec<AgentDefinition>> {
        self.check("agents.find_enabled")?;
        let state = self.state.lock().unwrap();
        Ok(state.agents.iter().filter(|a| a.enabled).cloned().collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
        last_run: Option<DateTime<Utc>>,
        next_run: Option<DateTime<Utc>>,
    ) -> FleetResult<()> {
        self.check("agents.update_status")?;
        let mut state = self.state.lock().unwrap();
        let agent = state
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| FleetError::agent_not_found(id))?;
        agent.status = status;
        if last_run.is_some() {
            agent.last_run = last_run;
        }
        agent.next_run = next_run;
        agent.updated_at = Utc::now();
        Ok(())
    }

    async fn record_outcome(&self, id: &str, success: bool) -> FleetResult<AgentDefinition> {
        self.check("agents.record_outcome")?;
        let mut state = self.state.lock().unwrap();
        let agent = state
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| FleetError::agent_not_found(id))?;
        agent.apply_outcome(success);
        Ok(agent.clone())
    }

    async fn clear_next_run(&self, id: &str) -> FleetResult<()> {
        self.check("agents.clear_next_run")?;
        let mut state = self.state.lock().unwrap();
        if let Some(agent) = state.agents.iter_mut().find(|a| a.id == id) {
            agent.next_run = None;
        }
        Ok(())
    }
}

#[async_trait]
impl LoadRepository for InMemoryFleetStore {
    async fn create(&self, load: &Load) -> FleetResult<Load> {
        self.check("loads.create")?;
        self.insert_load(load.clone());
        Ok(load.clone())
    }

    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Load>> {
        self.check("loads.find_by_id")?;
        Ok(self.load(id))
    }

    async fn find_by_status(&self, statuses: &[LoadStatus]) -> FleetResult<Vec<Load>> {
        self.check("loads.find_by_status")?;
        let state = self.state.lock().unwrap();
        let mut loads: Vec<Load> = state
            .loads
            .iter()
            .filter(|l| statuses.contains(&l.status))
            .cloned()
            .collect();
        // 稳定排序，创建时间相同时保持插入顺序
        loads.sort_by_key(|l| l.created_at);
        Ok(loads)
    }

    async fn assign(
        &self,
        load_id: &str,
        driver_id: &str,
        truck_id: Option<&str>,
    ) -> FleetResult<()> {
        self.check("loads.assign")?;
        let mut state = self.state.lock().unwrap();
        let load = state
            .loads
            .iter_mut()
            .find(|l| l.id == load_id)
            .ok_or_else(|| FleetError::load_not_found(load_id))?;
        load.status = LoadStatus::Assigned;
        load.driver_id = Some(driver_id.to_string());
        load.truck_id = truck_id.map(str::to_string);
        load.updated_at = Utc::now();
        Ok(())
    }

    async fn update_route(
        &self,
        load_id: &str,
        distance: f64,
        special_instructions: Option<&str>,
    ) -> FleetResult<()> {
        self.check("loads.update_route")?;
        let mut state = self.state.lock().unwrap();
        let load = state
            .loads
            .iter_mut()
            .find(|l| l.id == load_id)
            .ok_or_else(|| FleetError::load_not_found(load_id))?;
        load.distance = distance;
        load.special_instructions = special_instructions.map(str::to_string);
        load.updated_at = Utc::now();
        Ok(())
    }

    async fn find_deliveries_between(
        &self,
        status: LoadStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FleetResult<Vec<Load>> {
        self.check("loads.find_deliveries_between")?;
        let state = self.state.lock().unwrap();
        let mut loads: Vec<Load> = state
            .loads
            .iter()
            .filter(|l| l.status == status && l.delivery_date >= from && l.delivery_date <= to)
            .cloned()
            .collect();
        loads.sort_by_key(|l| l.delivery_date);
        Ok(loads)
    }
}

#[async_trait]
impl DriverRepository for InMemoryFleetStore {
    async fn create(&self, driver: &Driver) -> FleetResult<Driver> {
        self.check("drivers.create")?;
        self.insert_driver(driver.clone());
        Ok(driver.clone())
    }

    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Driver>> {
        self.check("drivers.find_by_id")?;
        Ok(self.driver(id))
    }

    async fn find_by_status(&self, statuses: &[DriverStatus]) -> FleetResult<Vec<Driver>> {
        self.check("drivers.find_by_status")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .drivers
            .iter()
            .filter(|d| statuses.contains(&d.status))
            .cloned()
            .collect())
    }

    async fn find_available_with_trucks(&self) -> FleetResult<Vec<(Driver, Truck)>> {
        self.check("drivers.find_available_with_trucks")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .drivers
            .iter()
            .filter(|d| d.status == DriverStatus::Available)
            .filter_map(|d| {
                let truck_id = d.truck_id.as_deref()?;
                state
                    .trucks
                    .iter()
                    .find(|t| t.id == truck_id && t.status == TruckStatus::Available)
                    .map(|t| (d.clone(), t.clone()))
            })
            .collect())
    }

    async fn update_status(&self, id: &str, status: DriverStatus) -> FleetResult<()> {
        self.check("drivers.update_status")?;
        let mut state = self.state.lock().unwrap();
        let driver = state
            .drivers
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| FleetError::driver_not_found(id))?;
        driver.status = status;
        driver.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TruckRepository for InMemoryFleetStore {
    async fn create(&self, truck: &Truck) -> FleetResult<Truck> {
        self.check("trucks.create")?;
        self.insert_truck(truck.clone());
        Ok(truck.clone())
    }

    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Truck>> {
        self.check("trucks.find_by_id")?;
        Ok(self.truck(id))
    }

    async fn find_by_status(&self, statuses: &[TruckStatus]) -> FleetResult<Vec<Truck>> {
        self.check("trucks.find_by_status")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .trucks
            .iter()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, status: TruckStatus) -> FleetResult<()> {
        self.check("trucks.update_status")?;
        let mut state = self.state.lock().unwrap();
        let truck = state
            .trucks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| FleetError::truck_not_found(id))?;
        truck.status = status;
        truck.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl HosLogRepository for InMemoryFleetStore {
    async fn create(&self, log: &HosLog) -> FleetResult<HosLog> {
        self.check("hos_logs.create")?;
        self.insert_hos_log(log.clone());
        Ok(log.clone())
    }

    async fn find_latest_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> FleetResult<Option<HosLog>> {
        self.check("hos_logs.find_latest_since")?;
        let state = self.state.lock().unwrap();
        let candidates = state
            .hos_logs
            .iter()
            .filter(|l| l.driver_id == driver_id && l.date >= since);
        Ok(latest(candidates, |l| l.date).cloned())
    }
}

#[async_trait]
impl TrackingRepository for InMemoryFleetStore {
    async fn create(&self, event: &TrackingEvent) -> FleetResult<TrackingEvent> {
        self.check("tracking.create")?;
        self.insert_tracking_event(event.clone());
        Ok(event.clone())
    }

    async fn find_latest(&self, load_id: &str) -> FleetResult<Option<TrackingEvent>> {
        self.check("tracking.find_latest")?;
        let state = self.state.lock().unwrap();
        let candidates = state.tracking.iter().filter(|e| e.load_id == load_id);
        Ok(latest(candidates, |e| e.timestamp).cloned())
    }

    async fn find_by_load(&self, load_id: &str) -> FleetResult<Vec<TrackingEvent>> {
        self.check("tracking.find_by_load")?;
        let state = self.state.lock().unwrap();
        let mut events: Vec<TrackingEvent> = state
            .tracking
            .iter()
            .filter(|e| e.load_id == load_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryFleetStore {
    async fn create(&self, notification: &Notification) -> FleetResult<Notification> {
        self.check("notifications.create")?;
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(notification.clone())
    }

    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<Notification>> {
        self.check("notifications.find_by_agent")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.agent_id.as_deref() == Some(agent_id))
            .cloned()
            .collect())
    }

    async fn find_recent(&self, limit: i64) -> FleetResult<Vec<Notification>> {
        self.check("notifications.find_recent")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .notifications
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MetricRepository for InMemoryFleetStore {
    async fn record(&self, metric: &AgentMetric) -> FleetResult<()> {
        self.check("metrics.record")?;
        self.state.lock().unwrap().metrics.push(metric.clone());
        Ok(())
    }

    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<AgentMetric>> {
        self.check("metrics.find_by_agent")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .metrics
            .iter()
            .filter(|m| m.agent_id == agent_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ComplianceRepository for InMemoryFleetStore {
    async fn create(&self, event: &ComplianceEvent) -> FleetResult<ComplianceEvent> {
        self.check("compliance.create")?;
        self.state.lock().unwrap().compliance.push(event.clone());
        Ok(event.clone())
    }

    async fn find_by_driver(&self, driver_id: &str) -> FleetResult<Vec<ComplianceEvent>> {
        self.check("compliance.find_by_driver")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .compliance
            .iter()
            .filter(|e| e.driver_id == driver_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryFleetStore {
    async fn append(&self, message: &ConversationMessage) -> FleetResult<ConversationMessage> {
        self.check("conversations.append")?;
        self.state
            .lock()
            .unwrap()
            .conversations
            .push(message.clone());
        Ok(message.clone())
    }

    async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> FleetResult<Vec<ConversationMessage>> {
        self.check("conversations.find_by_conversation")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .conversations
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreLifecycle for InMemoryFleetStore {
    async fn close(&self) -> FleetResult<()> {
        self.state.lock().unwrap().close_calls += 1;
        self.check("store.close")
    }
}
