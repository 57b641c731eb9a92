//! 演示车队数据

use chrono::{DateTime, Duration, Utc};
use fleet_domain::{
    new_id, rolling_success_rate, AgentDefinition, AgentKind, AgentStatus, Driver, DriverStatus,
    FleetStore, HosLog, Load, LoadStatus, TrackingEvent, Truck, TruckStatus,
};
use fleet_errors::FleetResult;
use serde_json::json;
use tracing::info;

/// 写入的记录数量
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub trucks: usize,
    pub drivers: usize,
    pub loads: usize,
    pub agents: usize,
    pub tracking_events: usize,
    pub hos_logs: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn truck(unit: &str, make: &str, model: &str, year: i32, status: TruckStatus, location: &str, fuel_capacity: f64) -> Truck {
    let now = Utc::now();
    Truck {
        id: new_id(),
        unit_number: unit.to_string(),
        make: make.to_string(),
        model: model.to_string(),
        year,
        status,
        current_location: Some(location.to_string()),
        fuel_capacity,
        max_weight: 80000.0,
        created_at: now,
        updated_at: now,
    }
}

struct DriverSeed<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    license_no: &'a str,
    status: DriverStatus,
    location: &'a str,
    rating: f64,
    total_miles: f64,
}

fn driver(seed: DriverSeed<'_>, truck: &Truck) -> Driver {
    let now = Utc::now();
    Driver {
        id: new_id(),
        name: seed.name.to_string(),
        email: seed.email.to_string(),
        phone: seed.phone.to_string(),
        license_no: seed.license_no.to_string(),
        status: seed.status,
        current_location: Some(seed.location.to_string()),
        home_base: Some(seed.location.to_string()),
        rating: seed.rating,
        total_miles: seed.total_miles,
        truck_id: Some(truck.id.clone()),
        created_at: now,
        updated_at: now,
    }
}

struct LoadSeed<'a> {
    number: &'a str,
    status: LoadStatus,
    pickup: &'a str,
    delivery: &'a str,
    pickup_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    distance: f64,
    weight: f64,
    commodity: &'a str,
    rate: f64,
    instructions: &'a str,
}

fn load(seed: LoadSeed<'_>, assignment: Option<(&Driver, &Truck)>, created_at: DateTime<Utc>) -> Load {
    Load {
        id: new_id(),
        load_number: seed.number.to_string(),
        status: seed.status,
        pickup_location: seed.pickup.to_string(),
        delivery_location: seed.delivery.to_string(),
        pickup_date: seed.pickup_date,
        delivery_date: seed.delivery_date,
        distance: seed.distance,
        weight: seed.weight,
        commodity: seed.commodity.to_string(),
        rate: seed.rate,
        special_instructions: Some(seed.instructions.to_string()),
        driver_id: assignment.map(|(d, _)| d.id.clone()),
        truck_id: assignment.map(|(_, t)| t.id.clone()),
        created_at,
        updated_at: created_at,
    }
}

fn agent(
    name: &str,
    kind: AgentKind,
    description: &str,
    config: serde_json::Value,
    success_rate: f64,
    total_runs: i64,
    next_run_in: Duration,
) -> AgentDefinition {
    let now = Utc::now();
    let mut definition = AgentDefinition::new(name, kind);
    definition.description = Some(description.to_string());
    definition.status = AgentStatus::Active;
    definition.config = config;
    definition.total_runs = total_runs;
    definition.successful_runs = (success_rate * total_runs as f64).round() as i64;
    definition.success_rate = rolling_success_rate(definition.successful_runs, total_runs);
    definition.last_run = Some(now);
    definition.next_run = Some(now + next_run_in);
    definition
}

fn hos_log(driver: &Driver, date: DateTime<Utc>, minutes: [i64; 4]) -> HosLog {
    let [on_duty, driving, sleep, off_duty] = minutes;
    HosLog {
        id: new_id(),
        driver_id: driver.id.clone(),
        date,
        on_duty_minutes: on_duty,
        driving_minutes: driving,
        sleep_minutes: sleep,
        off_duty_minutes: off_duty,
        created_at: Utc::now(),
    }
}

fn tracking(load: &Load, event_type: &str, location: &str, at: DateTime<Utc>, notes: &str) -> TrackingEvent {
    let mut event = TrackingEvent::new(&load.id, event_type, location, Some(notes.to_string()));
    event.timestamp = at;
    event
}

/// 写入演示车队；已有代理定义时视为已初始化，不重复写入
pub async fn seed_demo_data(store: &FleetStore) -> FleetResult<SeedSummary> {
    if !store.agents.find_all().await?.is_empty() {
        info!("数据库中已存在代理定义，跳过演示数据写入");
        return Ok(SeedSummary::default());
    }

    let now = Utc::now();
    let mut summary = SeedSummary::default();

    let trucks = [
        truck("T001", "Peterbilt", "579", 2022, TruckStatus::Available, "Dallas, TX", 300.0),
        truck("T002", "Kenworth", "T680", 2021, TruckStatus::InUse, "Houston, TX", 280.0),
        truck("T003", "Freightliner", "Cascadia", 2023, TruckStatus::Available, "Austin, TX", 320.0),
    ];
    for truck in &trucks {
        store.trucks.create(truck).await?;
        summary.trucks += 1;
    }

    let drivers = [
        driver(
            DriverSeed {
                name: "Mike Johnson",
                email: "mike.johnson@example.com",
                phone: "+1-555-0101",
                license_no: "TX123456789",
                status: DriverStatus::Available,
                location: "Dallas, TX",
                rating: 4.8,
                total_miles: 450000.0,
            },
            &trucks[0],
        ),
        driver(
            DriverSeed {
                name: "Carlos Rodriguez",
                email: "carlos.rodriguez@example.com",
                phone: "+1-555-0102",
                license_no: "TX987654321",
                status: DriverStatus::Driving,
                location: "Houston, TX",
                rating: 4.9,
                total_miles: 520000.0,
            },
            &trucks[1],
        ),
        driver(
            DriverSeed {
                name: "Jennifer Smith",
                email: "jennifer.smith@example.com",
                phone: "+1-555-0103",
                license_no: "TX456789123",
                status: DriverStatus::OffDuty,
                location: "Austin, TX",
                rating: 4.7,
                total_miles: 280000.0,
            },
            &trucks[2],
        ),
    ];
    for driver in &drivers {
        store.drivers.create(driver).await?;
        summary.drivers += 1;
    }

    // 日期相对当前时间，演示时各代理都有可处理的数据
    let loads = [
        load(
            LoadSeed {
                number: "L2024-001",
                status: LoadStatus::Assigned,
                pickup: "Dallas, TX",
                delivery: "Phoenix, AZ",
                pickup_date: now + Duration::hours(6),
                delivery_date: now + Duration::hours(40),
                distance: 887.5,
                weight: 45000.0,
                commodity: "Steel Coils",
                rate: 2850.0,
                instructions: "Tarps required, secure load properly",
            },
            Some((&drivers[0], &trucks[0])),
            now - Duration::minutes(3),
        ),
        load(
            LoadSeed {
                number: "L2024-002",
                status: LoadStatus::InTransit,
                pickup: "Houston, TX",
                delivery: "Atlanta, GA",
                pickup_date: now - Duration::hours(20),
                delivery_date: now + Duration::hours(3),
                distance: 789.2,
                weight: 38000.0,
                commodity: "Construction Equipment",
                rate: 3200.0,
                instructions: "Oversized load permit required",
            },
            Some((&drivers[1], &trucks[1])),
            now - Duration::minutes(2),
        ),
        load(
            LoadSeed {
                number: "L2024-003",
                status: LoadStatus::Available,
                pickup: "Austin, TX",
                delivery: "Denver, CO",
                pickup_date: now + Duration::hours(24),
                delivery_date: now + Duration::hours(54),
                distance: 926.8,
                weight: 42000.0,
                commodity: "Machinery Parts",
                rate: 2950.0,
                instructions: "Temperature sensitive, covered trailer required",
            },
            None,
            now - Duration::minutes(1),
        ),
    ];
    for load in &loads {
        store.loads.create(load).await?;
        summary.loads += 1;
    }

    let agents = [
        agent(
            "Load Matching Agent",
            AgentKind::LoadMatching,
            "Automatically matches available loads with suitable drivers and trucks",
            json!({ "minDriverRating": 4.5 }),
            0.85,
            247,
            Duration::minutes(30),
        ),
        agent(
            "Route Optimization Agent",
            AgentKind::RouteOptimization,
            "Optimizes routes for fuel efficiency and delivery time",
            json!({}),
            0.92,
            156,
            Duration::minutes(15),
        ),
        agent(
            "Fuel Optimization Agent",
            AgentKind::FuelOptimization,
            "Finds best fuel prices and optimal fueling locations",
            json!({ "maxDetourMiles": 25.0 }),
            0.78,
            89,
            Duration::minutes(20),
        ),
        agent(
            "Compliance Monitoring Agent",
            AgentKind::ComplianceMonitoring,
            "Monitors HOS compliance and regulatory requirements",
            json!({}),
            0.96,
            324,
            Duration::hours(1),
        ),
        agent(
            "Customer Communication Agent",
            AgentKind::CustomerCommunication,
            "Sends automated updates to customers about load status",
            json!({ "updateIntervalHours": 4.0 }),
            0.88,
            178,
            Duration::hours(4),
        ),
    ];
    for definition in &agents {
        store.agents.create(definition).await?;
        summary.agents += 1;
    }

    let events = [
        tracking(
            &loads[0],
            "PICKUP_COMPLETED",
            "Dallas, TX",
            now - Duration::hours(5),
            "Load secured and ready for transport",
        ),
        tracking(
            &loads[0],
            "IN_TRANSIT",
            "Abilene, TX",
            now - Duration::hours(1),
            "On schedule, good weather conditions",
        ),
        tracking(
            &loads[1],
            "PICKUP_COMPLETED",
            "Houston, TX",
            now - Duration::hours(19),
            "Oversized load secured with permits",
        ),
    ];
    for event in &events {
        store.tracking.create(event).await?;
        summary.tracking_events += 1;
    }

    let logs = [
        hos_log(&drivers[0], now - Duration::days(1), [480, 420, 600, 240]),
        hos_log(&drivers[1], now - Duration::days(1), [520, 480, 580, 160]),
    ];
    for log in &logs {
        store.hos_logs.create(log).await?;
        summary.hos_logs += 1;
    }

    info!(
        trucks = summary.trucks,
        drivers = summary.drivers,
        loads = summary.loads,
        agents = summary.agents,
        "演示数据写入完成"
    );
    Ok(summary)
}
