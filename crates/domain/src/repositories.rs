//! 领域仓储抽象
//!
//! 每个代理只通过这些 trait 访问持久化存储。所有写操作都是独立语句，
//! 一次运行中的多次写入不构成事务。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_errors::FleetResult;

use crate::{
    AgentDefinition, AgentMetric, AgentStatus, ComplianceEvent, ConversationMessage, Driver,
    DriverStatus, HosLog, Load, LoadStatus, Notification, TrackingEvent, Truck, TruckStatus,
};

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create(&self, definition: &AgentDefinition) -> FleetResult<AgentDefinition>;
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<AgentDefinition>>;
    async fn find_all(&self) -> FleetResult<Vec<AgentDefinition>>;
    /// 所有启用的定义，与状态无关
    async fn find_enabled(&self) -> FleetResult<Vec<AgentDefinition>>;
    async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
        last_run: Option<DateTime<Utc>>,
        next_run: Option<DateTime<Utc>>,
    ) -> FleetResult<()>;
    /// 单条语句累加运行次数并重新计算成功率，返回更新后的定义
    async fn record_outcome(&self, id: &str, success: bool) -> FleetResult<AgentDefinition>;
    async fn clear_next_run(&self, id: &str) -> FleetResult<()>;
}

#[async_trait]
pub trait LoadRepository: Send + Sync {
    async fn create(&self, load: &Load) -> FleetResult<Load>;
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Load>>;
    /// 按创建时间升序
    async fn find_by_status(&self, statuses: &[LoadStatus]) -> FleetResult<Vec<Load>>;
    async fn assign(&self, load_id: &str, driver_id: &str, truck_id: Option<&str>)
        -> FleetResult<()>;
    async fn update_route(
        &self,
        load_id: &str,
        distance: f64,
        special_instructions: Option<&str>,
    ) -> FleetResult<()>;
    /// 指定状态下交付时间落在 `[from, to]` 内的货物
    async fn find_deliveries_between(
        &self,
        status: LoadStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FleetResult<Vec<Load>>;
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn create(&self, driver: &Driver) -> FleetResult<Driver>;
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Driver>>;
    async fn find_by_status(&self, statuses: &[DriverStatus]) -> FleetResult<Vec<Driver>>;
    /// 空闲司机及其空闲车辆，按插入顺序
    async fn find_available_with_trucks(&self) -> FleetResult<Vec<(Driver, Truck)>>;
    async fn update_status(&self, id: &str, status: DriverStatus) -> FleetResult<()>;
}

#[async_trait]
pub trait TruckRepository: Send + Sync {
    async fn create(&self, truck: &Truck) -> FleetResult<Truck>;
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Truck>>;
    async fn find_by_status(&self, statuses: &[TruckStatus]) -> FleetResult<Vec<Truck>>;
    async fn update_status(&self, id: &str, status: TruckStatus) -> FleetResult<()>;
}

#[async_trait]
pub trait HosLogRepository: Send + Sync {
    async fn create(&self, log: &HosLog) -> FleetResult<HosLog>;
    /// 司机在 `since` 之后最近的一条日志
    async fn find_latest_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> FleetResult<Option<HosLog>>;
}

#[async_trait]
pub trait TrackingRepository: Send + Sync {
    async fn create(&self, event: &TrackingEvent) -> FleetResult<TrackingEvent>;
    async fn find_latest(&self, load_id: &str) -> FleetResult<Option<TrackingEvent>>;
    async fn find_by_load(&self, load_id: &str) -> FleetResult<Vec<TrackingEvent>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> FleetResult<Notification>;
    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<Notification>>;
    async fn find_recent(&self, limit: i64) -> FleetResult<Vec<Notification>>;
}

#[async_trait]
pub trait MetricRepository: Send + Sync {
    async fn record(&self, metric: &AgentMetric) -> FleetResult<()>;
    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<AgentMetric>>;
}

#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    async fn create(&self, event: &ComplianceEvent) -> FleetResult<ComplianceEvent>;
    async fn find_by_driver(&self, driver_id: &str) -> FleetResult<Vec<ComplianceEvent>>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn append(&self, message: &ConversationMessage) -> FleetResult<ConversationMessage>;
    async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> FleetResult<Vec<ConversationMessage>>;
}

/// 存储连接的生命周期
#[async_trait]
pub trait StoreLifecycle: Send + Sync {
    async fn close(&self) -> FleetResult<()>;
}

/// 进程内共享的存储句柄集合
#[derive(Clone)]
pub struct FleetStore {
    pub agents: Arc<dyn AgentRepository>,
    pub loads: Arc<dyn LoadRepository>,
    pub drivers: Arc<dyn DriverRepository>,
    pub trucks: Arc<dyn TruckRepository>,
    pub hos_logs: Arc<dyn HosLogRepository>,
    pub tracking: Arc<dyn TrackingRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub metrics: Arc<dyn MetricRepository>,
    pub compliance: Arc<dyn ComplianceRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub lifecycle: Arc<dyn StoreLifecycle>,
}

impl std::fmt::Debug for FleetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetStore").finish_non_exhaustive()
    }
}
