//! 每种代理的类型化配置
//!
//! 代理定义中的 `config` JSON 在注册表加载时解析为 [`AgentSettings`]，
//! 键名使用 camelCase，缺省键取默认值，未知键和越界取值直接报错。

use fleet_errors::{FleetError, FleetResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::AgentKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoadMatchingSettings {
    pub min_driver_rating: f64,
    /// 货物重量占车辆最大载重的上限比例
    pub capacity_utilization: f64,
}

impl Default for LoadMatchingSettings {
    fn default() -> Self {
        Self {
            min_driver_rating: 4.5,
            capacity_utilization: 0.9,
        }
    }
}

impl LoadMatchingSettings {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=5.0).contains(&self.min_driver_rating) {
            return Err("minDriverRating 必须在 0 到 5 之间".to_string());
        }
        check_fraction(self.capacity_utilization, "capacityUtilization")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RouteOptimizationSettings {
    pub min_reduction: f64,
    pub max_reduction: f64,
    pub min_distance_saved: f64,
    pub gallons_per_mile: f64,
    pub fuel_price: f64,
    pub notify_savings_threshold: f64,
}

impl Default for RouteOptimizationSettings {
    fn default() -> Self {
        Self {
            min_reduction: 0.02,
            max_reduction: 0.08,
            min_distance_saved: 5.0,
            gallons_per_mile: 0.15,
            fuel_price: 3.89,
            notify_savings_threshold: 20.0,
        }
    }
}

impl RouteOptimizationSettings {
    fn validate(&self) -> Result<(), String> {
        check_fraction(self.min_reduction, "minReduction")?;
        check_fraction(self.max_reduction, "maxReduction")?;
        if self.min_reduction > self.max_reduction {
            return Err("minReduction 不能大于 maxReduction".to_string());
        }
        check_non_negative(self.min_distance_saved, "minDistanceSaved")?;
        check_non_negative(self.gallons_per_mile, "gallonsPerMile")?;
        check_non_negative(self.fuel_price, "fuelPrice")?;
        check_non_negative(self.notify_savings_threshold, "notifySavingsThreshold")
    }
}

/// 候选加油站
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FuelStation {
    pub name: String,
    pub location: String,
    /// 每加仑价格
    pub price: f64,
    /// 与司机的距离（英里）
    pub distance: f64,
}

impl FuelStation {
    fn new(name: &str, location: &str, price: f64, distance: f64) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            price,
            distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FuelOptimizationSettings {
    pub low_fuel_threshold: f64,
    pub max_detour_miles: f64,
    pub min_savings: f64,
    pub market_price: f64,
    pub fuel_level_min: f64,
    pub fuel_level_max: f64,
    pub stations: Vec<FuelStation>,
}

impl Default for FuelOptimizationSettings {
    fn default() -> Self {
        Self {
            low_fuel_threshold: 0.4,
            max_detour_miles: 25.0,
            min_savings: 5.0,
            market_price: 3.89,
            fuel_level_min: 0.1,
            fuel_level_max: 0.9,
            stations: vec![
                FuelStation::new("Pilot Travel Center", "Dallas, TX", 3.85, 12.0),
                FuelStation::new("TA Travel Center", "Houston, TX", 3.92, 8.0),
                FuelStation::new("Loves Travel Stop", "Austin, TX", 3.79, 15.0),
                FuelStation::new("Flying J", "San Antonio, TX", 3.88, 20.0),
                FuelStation::new("Pilot Travel Center", "Phoenix, AZ", 3.95, 25.0),
            ],
        }
    }
}

impl FuelOptimizationSettings {
    fn validate(&self) -> Result<(), String> {
        check_fraction(self.low_fuel_threshold, "lowFuelThreshold")?;
        check_fraction(self.fuel_level_min, "fuelLevelMin")?;
        check_fraction(self.fuel_level_max, "fuelLevelMax")?;
        if self.fuel_level_min > self.fuel_level_max {
            return Err("fuelLevelMin 不能大于 fuelLevelMax".to_string());
        }
        check_non_negative(self.max_detour_miles, "maxDetourMiles")?;
        check_non_negative(self.min_savings, "minSavings")?;
        check_non_negative(self.market_price, "marketPrice")?;
        for station in &self.stations {
            if station.name.trim().is_empty() {
                return Err("加油站名称不能为空".to_string());
            }
            check_non_negative(station.price, "stations.price")?;
            check_non_negative(station.distance, "stations.distance")?;
        }
        Ok(())
    }

    /// 范围内价格最低的加油站，价格相同时取列表中靠前者
    pub fn best_station(&self) -> Option<&FuelStation> {
        self.stations
            .iter()
            .filter(|station| station.distance <= self.max_detour_miles)
            .fold(None, |best: Option<&FuelStation>, current| match best {
                Some(best) if best.price <= current.price => Some(best),
                _ => Some(current),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ComplianceSettings {
    pub max_driving_minutes: i64,
    pub driving_warning_minutes: i64,
    pub min_rest_minutes: i64,
    pub lookback_days: i64,
    pub license_check_probability: f64,
    pub physical_check_probability: f64,
    pub truck_inspection_probability: f64,
    pub event_due_days: i64,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            max_driving_minutes: 660,
            driving_warning_minutes: 600,
            min_rest_minutes: 600,
            lookback_days: 7,
            license_check_probability: 0.05,
            physical_check_probability: 0.05,
            truck_inspection_probability: 0.02,
            event_due_days: 30,
        }
    }
}

impl ComplianceSettings {
    fn validate(&self) -> Result<(), String> {
        if self.driving_warning_minutes > self.max_driving_minutes {
            return Err("drivingWarningMinutes 不能大于 maxDrivingMinutes".to_string());
        }
        if self.max_driving_minutes <= 0 || self.min_rest_minutes < 0 {
            return Err("工时阈值必须为正数".to_string());
        }
        if self.lookback_days <= 0 || self.event_due_days < 0 {
            return Err("lookbackDays 必须大于 0，eventDueDays 不能为负".to_string());
        }
        check_fraction(self.license_check_probability, "licenseCheckProbability")?;
        check_fraction(self.physical_check_probability, "physicalCheckProbability")?;
        check_fraction(self.truck_inspection_probability, "truckInspectionProbability")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CustomerCommunicationSettings {
    pub update_interval_hours: f64,
    pub confirmation_window_hours: f64,
    pub reminder_window_start_hours: f64,
    pub reminder_window_end_hours: f64,
    pub lookahead_hours: f64,
}

impl Default for CustomerCommunicationSettings {
    fn default() -> Self {
        Self {
            update_interval_hours: 4.0,
            confirmation_window_hours: 2.0,
            reminder_window_start_hours: 2.0,
            reminder_window_end_hours: 4.0,
            lookahead_hours: 24.0,
        }
    }
}

impl CustomerCommunicationSettings {
    fn validate(&self) -> Result<(), String> {
        check_non_negative(self.update_interval_hours, "updateIntervalHours")?;
        check_non_negative(self.confirmation_window_hours, "confirmationWindowHours")?;
        check_non_negative(self.reminder_window_start_hours, "reminderWindowStartHours")?;
        if self.reminder_window_start_hours >= self.reminder_window_end_hours {
            return Err("reminderWindowStartHours 必须小于 reminderWindowEndHours".to_string());
        }
        if self.lookahead_hours < self.reminder_window_end_hours {
            return Err("lookaheadHours 不能小于 reminderWindowEndHours".to_string());
        }
        Ok(())
    }
}

/// 按代理类型区分的配置
#[derive(Debug, Clone, PartialEq)]
pub enum AgentSettings {
    LoadMatching(LoadMatchingSettings),
    RouteOptimization(RouteOptimizationSettings),
    FuelOptimization(FuelOptimizationSettings),
    ComplianceMonitoring(ComplianceSettings),
    CustomerCommunication(CustomerCommunicationSettings),
}

impl AgentSettings {
    /// 按类型解析并校验配置，`null` 视为空对象
    pub fn parse(kind: AgentKind, config: &serde_json::Value) -> FleetResult<Self> {
        let settings = match kind {
            AgentKind::LoadMatching => Self::LoadMatching(decode(kind, config)?),
            AgentKind::RouteOptimization => Self::RouteOptimization(decode(kind, config)?),
            AgentKind::FuelOptimization => Self::FuelOptimization(decode(kind, config)?),
            AgentKind::ComplianceMonitoring => Self::ComplianceMonitoring(decode(kind, config)?),
            AgentKind::CustomerCommunication => {
                Self::CustomerCommunication(decode(kind, config)?)
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn defaults(kind: AgentKind) -> Self {
        match kind {
            AgentKind::LoadMatching => Self::LoadMatching(Default::default()),
            AgentKind::RouteOptimization => Self::RouteOptimization(Default::default()),
            AgentKind::FuelOptimization => Self::FuelOptimization(Default::default()),
            AgentKind::ComplianceMonitoring => Self::ComplianceMonitoring(Default::default()),
            AgentKind::CustomerCommunication => Self::CustomerCommunication(Default::default()),
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Self::LoadMatching(_) => AgentKind::LoadMatching,
            Self::RouteOptimization(_) => AgentKind::RouteOptimization,
            Self::FuelOptimization(_) => AgentKind::FuelOptimization,
            Self::ComplianceMonitoring(_) => AgentKind::ComplianceMonitoring,
            Self::CustomerCommunication(_) => AgentKind::CustomerCommunication,
        }
    }

    pub fn validate(&self) -> FleetResult<()> {
        let result = match self {
            Self::LoadMatching(s) => s.validate(),
            Self::RouteOptimization(s) => s.validate(),
            Self::FuelOptimization(s) => s.validate(),
            Self::ComplianceMonitoring(s) => s.validate(),
            Self::CustomerCommunication(s) => s.validate(),
        };
        result.map_err(|message| FleetError::invalid_config(self.kind().as_str(), message))
    }
}

fn decode<T: DeserializeOwned + Default>(
    kind: AgentKind,
    config: &serde_json::Value,
) -> FleetResult<T> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config.clone())
        .map_err(|e| FleetError::invalid_config(kind.as_str(), e.to_string()))
}

fn check_fraction(value: f64, field: &str) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{field} 必须在 0 到 1 之间，当前值: {value}"))
    }
}

fn check_non_negative(value: f64, field: &str) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{field} 不能为负数，当前值: {value}"))
    }
}
