//! 测试实体构建器，默认值取自演示车队数据

use chrono::{DateTime, Duration, Utc};
use fleet_domain::{
    new_id, AgentDefinition, AgentKind, AgentStatus, Driver, DriverStatus, HosLog, Load,
    LoadStatus, TrackingEvent, Truck, TruckStatus,
};

pub struct AgentDefinitionBuilder {
    agent: AgentDefinition,
}

impl AgentDefinitionBuilder {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            agent: AgentDefinition::new(format!("{kind} agent"), kind),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.agent.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.agent.name = name.to_string();
        self
    }

    /// 直接写入原始类型文本，用于构造未知类型
    pub fn with_raw_kind(mut self, kind: &str) -> Self {
        self.agent.kind = kind.to_string();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.agent.config = config;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.agent.enabled = enabled;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn with_runs(mut self, successful_runs: i64, total_runs: i64) -> Self {
        self.agent.successful_runs = successful_runs;
        self.agent.total_runs = total_runs;
        self.agent.success_rate = fleet_domain::rolling_success_rate(successful_runs, total_runs);
        self
    }

    pub fn build(self) -> AgentDefinition {
        self.agent
    }
}

pub struct TruckBuilder {
    truck: Truck,
}

impl TruckBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            truck: Truck {
                id: new_id(),
                unit_number: "T001".to_string(),
                make: "Freightliner".to_string(),
                model: "Cascadia".to_string(),
                year: 2022,
                status: TruckStatus::Available,
                current_location: Some("Dallas, TX".to_string()),
                fuel_capacity: 300.0,
                max_weight: 80000.0,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.truck.id = id.to_string();
        self
    }

    pub fn with_unit_number(mut self, unit_number: &str) -> Self {
        self.truck.unit_number = unit_number.to_string();
        self
    }

    pub fn with_status(mut self, status: TruckStatus) -> Self {
        self.truck.status = status;
        self
    }

    pub fn with_max_weight(mut self, max_weight: f64) -> Self {
        self.truck.max_weight = max_weight;
        self
    }

    pub fn with_fuel_capacity(mut self, fuel_capacity: f64) -> Self {
        self.truck.fuel_capacity = fuel_capacity;
        self
    }

    pub fn build(self) -> Truck {
        self.truck
    }
}

impl Default for TruckBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DriverBuilder {
    driver: Driver,
}

impl DriverBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            driver: Driver {
                id: new_id(),
                name: "Mike Johnson".to_string(),
                email: "mike.johnson@example.com".to_string(),
                phone: "+1-555-0101".to_string(),
                license_no: "CDL123456789".to_string(),
                status: DriverStatus::Available,
                current_location: Some("Dallas, TX".to_string()),
                home_base: Some("Dallas, TX".to_string()),
                rating: 4.8,
                total_miles: 125000.0,
                truck_id: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.driver.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.driver.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: DriverStatus) -> Self {
        self.driver.status = status;
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.driver.current_location = Some(location.to_string());
        self
    }

    pub fn without_location(mut self) -> Self {
        self.driver.current_location = None;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.driver.rating = rating;
        self
    }

    pub fn with_truck(mut self, truck_id: &str) -> Self {
        self.driver.truck_id = Some(truck_id.to_string());
        self
    }

    pub fn build(self) -> Driver {
        self.driver
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LoadBuilder {
    load: Load,
}

impl LoadBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            load: Load {
                id: new_id(),
                load_number: "L2024-001".to_string(),
                status: LoadStatus::Available,
                pickup_location: "Dallas, TX".to_string(),
                delivery_location: "Phoenix, AZ".to_string(),
                pickup_date: now + Duration::hours(12),
                delivery_date: now + Duration::hours(48),
                distance: 887.5,
                weight: 45000.0,
                commodity: "Electronics".to_string(),
                rate: 2850.0,
                special_instructions: None,
                driver_id: None,
                truck_id: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.load.id = id.to_string();
        self
    }

    pub fn with_load_number(mut self, load_number: &str) -> Self {
        self.load.load_number = load_number.to_string();
        self
    }

    pub fn with_status(mut self, status: LoadStatus) -> Self {
        self.load.status = status;
        self
    }

    pub fn with_pickup(mut self, location: &str) -> Self {
        self.load.pickup_location = location.to_string();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.load.weight = weight;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.load.distance = distance;
        self
    }

    pub fn with_delivery_date(mut self, delivery_date: DateTime<Utc>) -> Self {
        self.load.delivery_date = delivery_date;
        self
    }

    pub fn with_special_instructions(mut self, instructions: &str) -> Self {
        self.load.special_instructions = Some(instructions.to_string());
        self
    }

    pub fn with_assignment(mut self, driver_id: &str, truck_id: Option<&str>) -> Self {
        self.load.driver_id = Some(driver_id.to_string());
        self.load.truck_id = truck_id.map(str::to_string);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.load.created_at = created_at;
        self
    }

    pub fn build(self) -> Load {
        self.load
    }
}

impl Default for LoadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HosLogBuilder {
    log: HosLog,
}

impl HosLogBuilder {
    pub fn new(driver_id: &str) -> Self {
        let now = Utc::now();
        Self {
            log: HosLog {
                id: new_id(),
                driver_id: driver_id.to_string(),
                date: now - Duration::hours(6),
                on_duty_minutes: 540,
                driving_minutes: 420,
                sleep_minutes: 600,
                off_duty_minutes: 300,
                created_at: now,
            },
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.log.date = date;
        self
    }

    pub fn with_driving_minutes(mut self, minutes: i64) -> Self {
        self.log.driving_minutes = minutes;
        self
    }

    pub fn with_sleep_minutes(mut self, minutes: i64) -> Self {
        self.log.sleep_minutes = minutes;
        self
    }

    pub fn build(self) -> HosLog {
        self.log
    }
}

pub struct TrackingEventBuilder {
    event: TrackingEvent,
}

impl TrackingEventBuilder {
    pub fn new(load_id: &str) -> Self {
        Self {
            event: TrackingEvent::new(load_id, "LOCATION_UPDATE", "Dallas, TX", None),
        }
    }

    pub fn with_event_type(mut self, event_type: &str) -> Self {
        self.event.event_type = event_type.to_string();
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.event.location = location.to_string();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn build(self) -> TrackingEvent {
        self.event
    }
}
