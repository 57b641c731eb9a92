//! 货运领域实体
//!
//! 状态类枚举在存储层以 SCREAMING_SNAKE_CASE 文本保存，
//! 通过 `as_str` / `FromStr` 与存储层互相转换。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 为文本形式持久化的枚举生成 `as_str`、`Display` 与 `FromStr`
#[macro_export]
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::FleetError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::FleetError::Serialization(format!(
                        "无效的{}取值: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Available,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

text_enum!(LoadStatus {
    Available => "AVAILABLE",
    Assigned => "ASSIGNED",
    InTransit => "IN_TRANSIT",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Available,
    OnDuty,
    Driving,
    OffDuty,
    OutOfService,
}

text_enum!(DriverStatus {
    Available => "AVAILABLE",
    OnDuty => "ON_DUTY",
    Driving => "DRIVING",
    OffDuty => "OFF_DUTY",
    OutOfService => "OUT_OF_SERVICE",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckStatus {
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

text_enum!(TruckStatus {
    Available => "AVAILABLE",
    InUse => "IN_USE",
    Maintenance => "MAINTENANCE",
    OutOfService => "OUT_OF_SERVICE",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Info,
    Warning,
    Error,
    Success,
    Alert,
}

text_enum!(NotificationType {
    Info => "INFO",
    Warning => "WARNING",
    Error => "ERROR",
    Success => "SUCCESS",
    Alert => "ALERT",
});

/// 通知优先级，同时用作合规事件的严重程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

text_enum!(Priority {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Critical => "CRITICAL",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceEventType {
    HosViolation,
    WeightViolation,
    PermitExpired,
    InspectionDue,
    LicenseExpired,
    DotViolation,
}

text_enum!(ComplianceEventType {
    HosViolation => "HOS_VIOLATION",
    WeightViolation => "WEIGHT_VIOLATION",
    PermitExpired => "PERMIT_EXPIRED",
    InspectionDue => "INSPECTION_DUE",
    LicenseExpired => "LICENSE_EXPIRED",
    DotViolation => "DOT_VIOLATION",
});

/// 货物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    pub load_number: String,
    pub status: LoadStatus,
    /// "City, ST" 格式
    pub pickup_location: String,
    pub delivery_location: String,
    pub pickup_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub distance: f64,
    pub weight: f64,
    pub commodity: String,
    pub rate: f64,
    pub special_instructions: Option<String>,
    pub driver_id: Option<String>,
    pub truck_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Load {
    pub fn is_active(&self) -> bool {
        matches!(self.status, LoadStatus::Assigned | LoadStatus::InTransit)
    }

    /// 提货地所在区域（州）
    pub fn pickup_region(&self) -> Option<&str> {
        region_of(&self.pickup_location)
    }
}

/// 司机
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_no: String,
    pub status: DriverStatus,
    pub current_location: Option<String>,
    pub home_base: Option<String>,
    pub rating: f64,
    pub total_miles: f64,
    pub truck_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn current_region(&self) -> Option<&str> {
        self.current_location.as_deref().and_then(region_of)
    }
}

/// 车辆
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Truck {
    pub id: String,
    pub unit_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub status: TruckStatus,
    pub current_location: Option<String>,
    /// 油箱容量（加仑）
    pub fuel_capacity: f64,
    /// 最大载重（磅）
    pub max_weight: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 工时（HOS）日志，时长单位为分钟
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HosLog {
    pub id: String,
    pub driver_id: String,
    pub date: DateTime<Utc>,
    pub on_duty_minutes: i64,
    pub driving_minutes: i64,
    pub sleep_minutes: i64,
    pub off_duty_minutes: i64,
    pub created_at: DateTime<Utc>,
}

/// 货物跟踪事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: String,
    pub load_id: String,
    pub event_type: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

impl TrackingEvent {
    pub fn new(load_id: &str, event_type: &str, location: &str, notes: Option<String>) -> Self {
        Self {
            id: new_id(),
            load_id: load_id.to_string(),
            event_type: event_type.to_string(),
            location: location.to_string(),
            timestamp: Utc::now(),
            notes,
        }
    }
}

/// 面向调度员的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub agent_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
        priority: Priority,
        agent_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            message: message.into(),
            notification_type,
            priority,
            agent_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// 代理运行指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetric {
    pub id: String,
    pub agent_id: String,
    pub metric_name: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl AgentMetric {
    pub fn new(agent_id: &str, metric_name: impl Into<String>, value: f64) -> Self {
        Self {
            id: new_id(),
            agent_id: agent_id.to_string(),
            metric_name: metric_name.into(),
            value,
            recorded_at: Utc::now(),
        }
    }
}

/// 合规事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceEvent {
    pub id: String,
    pub driver_id: String,
    pub event_type: ComplianceEventType,
    pub severity: Priority,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// 会话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn assistant(conversation_id: &str, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role: "assistant".to_string(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// 生成新的实体ID
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 取 "City, ST" 中逗号后的区域部分
pub fn region_of(location: &str) -> Option<&str> {
    location
        .split(',')
        .nth(1)
        .map(str::trim)
        .filter(|region| !region.is_empty())
}
