use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use fleet_agents::{AgentHandler, FixedRandom};
use fleet_domain::{
    AgentDefinition, AgentKind, AgentStatus, ComplianceEventType, DriverStatus, LoadStatus,
    NotificationType, Priority, TruckStatus,
};
use fleet_testing_utils::{
    AgentDefinitionBuilder, DriverBuilder, HosLogBuilder, InMemoryFleetStore, LoadBuilder,
    TrackingEventBuilder, TruckBuilder,
};

const INTERVAL: Duration = Duration::from_secs(120);

fn handler(mem: &InMemoryFleetStore, definition: AgentDefinition, random: FixedRandom) -> AgentHandler {
    mem.insert_agent(definition.clone());
    AgentHandler::from_definition(&definition, mem.store(), Arc::new(random), |_| INTERVAL).unwrap()
}

fn agent_of(kind: AgentKind) -> AgentDefinition {
    AgentDefinitionBuilder::new(kind).with_id("agent-1").build()
}

#[tokio::test]
async fn test_failure_marks_error_and_raises_alert_for_every_kind() {
    let first_read = |kind: AgentKind| match kind {
        AgentKind::FuelOptimization | AgentKind::ComplianceMonitoring => "drivers.find_by_status",
        _ => "loads.find_by_status",
    };

    for kind in AgentKind::ALL {
        let mem = InMemoryFleetStore::new();
        let definition = AgentDefinitionBuilder::new(*kind)
            .with_id("agent-1")
            .with_name("Broken Agent")
            .with_runs(9, 10)
            .build();
        let handler = handler(&mem, definition, FixedRandom::constant(0.5));
        mem.fail_on(first_read(*kind));

        let outcome = handler.run().await;
        assert!(!outcome.success, "{kind} 应当失败");

        let agent = mem.agent("agent-1").unwrap();
        assert_eq!(agent.status, AgentStatus::Error);
        assert_eq!(agent.total_runs, 11);
        assert_eq!(agent.successful_runs, 9);
        assert!((agent.success_rate - 9.0 / 11.0).abs() < 1e-9);

        let alerts = mem.notifications_titled("Agent Error");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].notification_type, NotificationType::Error);
        assert_eq!(alerts[0].priority, Priority::High);
        assert!(alerts[0].message.starts_with("Broken Agent encountered an error: "));
        assert_eq!(alerts[0].agent_id.as_deref(), Some("agent-1"));
    }
}

#[tokio::test]
async fn test_failure_path_continues_when_status_update_fails() {
    let mem = InMemoryFleetStore::new();
    let handler = handler(&mem, agent_of(AgentKind::RouteOptimization), FixedRandom::constant(0.5));
    mem.fail_on("loads.find_by_status");
    mem.fail_on("agents.update_status");

    let outcome = handler.run().await;
    assert!(!outcome.success);
    assert_eq!(mem.agent("agent-1").unwrap().total_runs, 1);
    assert_eq!(mem.notifications_titled("Agent Error").len(), 1);
}

#[tokio::test]
async fn test_success_updates_rolling_rate_and_schedule() {
    let mem = InMemoryFleetStore::new();
    let definition = AgentDefinitionBuilder::new(AgentKind::RouteOptimization)
        .with_id("agent-1")
        .with_runs(85, 100)
        .build();
    let handler = handler(&mem, definition, FixedRandom::constant(0.5));

    let outcome = handler.run().await;
    assert!(outcome.success);

    let agent = mem.agent("agent-1").unwrap();
    assert_eq!(agent.status, AgentStatus::Active);
    assert_eq!(agent.total_runs, 101);
    assert_eq!(agent.successful_runs, 86);
    assert!((agent.success_rate - 86.0 / 101.0).abs() < 1e-9);

    let last_run = agent.last_run.unwrap();
    let next_run = agent.next_run.unwrap();
    assert_eq!((next_run - last_run).num_seconds(), INTERVAL.as_secs() as i64);
    assert_eq!(mem.metric_value("active_loads_analyzed"), Some(0.0));

    handler.cleanup().await.unwrap();
    assert!(mem.agent("agent-1").unwrap().next_run.is_none());
}

#[tokio::test]
async fn test_load_matching_assigns_first_eligible_driver() {
    let mem = InMemoryFleetStore::new();
    let truck = TruckBuilder::new().build();
    let driver = DriverBuilder::new().with_truck(&truck.id).build();
    let base = Utc::now();
    let first = LoadBuilder::new()
        .with_load_number("L-1")
        .with_pickup("Austin, TX")
        .with_created_at(base - ChronoDuration::minutes(2))
        .build();
    let second = LoadBuilder::new()
        .with_load_number("L-2")
        .with_pickup("Houston, TX")
        .with_created_at(base - ChronoDuration::minutes(1))
        .build();
    mem.insert_truck(truck.clone());
    mem.insert_driver(driver.clone());
    mem.insert_load(first.clone());
    mem.insert_load(second.clone());

    let handler = handler(&mem, agent_of(AgentKind::LoadMatching), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    let assigned = mem.load(&first.id).unwrap();
    assert_eq!(assigned.status, LoadStatus::Assigned);
    assert_eq!(assigned.driver_id.as_deref(), Some(driver.id.as_str()));
    assert_eq!(assigned.truck_id.as_deref(), Some(truck.id.as_str()));
    // 司机已被占用，第二票货物保持空闲
    assert_eq!(mem.load(&second.id).unwrap().status, LoadStatus::Available);

    assert_eq!(mem.driver(&driver.id).unwrap().status, DriverStatus::OnDuty);
    assert_eq!(mem.truck(&truck.id).unwrap().status, TruckStatus::InUse);

    let notices = mem.notifications_titled("Load Assignment Complete");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Load L-1 assigned to Mike Johnson");
    assert_eq!(mem.metric_value("loads_matched_today"), Some(1.0));
    assert_eq!(mem.metric_value("available_loads"), Some(2.0));
    assert_eq!(mem.metric_value("available_drivers"), Some(1.0));
}

#[tokio::test]
async fn test_load_matching_prefers_earlier_driver_when_both_eligible() {
    let mem = InMemoryFleetStore::new();
    let first_truck = TruckBuilder::new().with_unit_number("T-A").build();
    let second_truck = TruckBuilder::new().with_unit_number("T-B").build();
    let first = DriverBuilder::new()
        .with_name("First Driver")
        .with_rating(4.6)
        .with_truck(&first_truck.id)
        .build();
    let second = DriverBuilder::new()
        .with_name("Second Driver")
        .with_rating(5.0)
        .with_truck(&second_truck.id)
        .build();
    let load = LoadBuilder::new().with_pickup("Austin, TX").build();
    mem.insert_truck(first_truck.clone());
    mem.insert_truck(second_truck.clone());
    mem.insert_driver(first.clone());
    mem.insert_driver(second.clone());
    mem.insert_load(load.clone());

    let handler = handler(&mem, agent_of(AgentKind::LoadMatching), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    // 不按评分择优，按候选顺序取第一个符合条件的司机
    let assigned = mem.load(&load.id).unwrap();
    assert_eq!(assigned.driver_id.as_deref(), Some(first.id.as_str()));
    assert_eq!(assigned.truck_id.as_deref(), Some(first_truck.id.as_str()));
    assert_eq!(mem.driver(&first.id).unwrap().status, DriverStatus::OnDuty);
    assert_eq!(mem.truck(&first_truck.id).unwrap().status, TruckStatus::InUse);

    assert_eq!(mem.driver(&second.id).unwrap().status, DriverStatus::Available);
    assert_eq!(mem.truck(&second_truck.id).unwrap().status, TruckStatus::Available);
    assert_eq!(mem.metric_value("available_drivers"), Some(2.0));
}

#[tokio::test]
async fn test_load_matching_without_eligible_driver_changes_nothing() {
    let mem = InMemoryFleetStore::new();
    let truck = TruckBuilder::new().build();
    let driver = DriverBuilder::new().with_truck(&truck.id).build();
    let load = LoadBuilder::new().with_pickup("Denver, CO").build();
    mem.insert_truck(truck);
    mem.insert_driver(driver.clone());
    mem.insert_load(load.clone());

    let handler = handler(&mem, agent_of(AgentKind::LoadMatching), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    assert_eq!(mem.load(&load.id).unwrap().status, LoadStatus::Available);
    assert_eq!(mem.driver(&driver.id).unwrap().status, DriverStatus::Available);
    assert!(mem.notifications_titled("Load Assignment Complete").is_empty());
    assert_eq!(mem.metric_value("loads_matched_today"), Some(0.0));
}

#[tokio::test]
async fn test_route_optimization_updates_distance_and_notes() {
    let mem = InMemoryFleetStore::new();
    let long = LoadBuilder::new()
        .with_load_number("L-LONG")
        .with_status(LoadStatus::InTransit)
        .with_distance(1000.0)
        .with_special_instructions("Fragile")
        .build();
    let short = LoadBuilder::new()
        .with_load_number("L-SHORT")
        .with_status(LoadStatus::Assigned)
        .with_distance(50.0)
        .build();
    mem.insert_load(long.clone());
    mem.insert_load(short.clone());

    let handler = handler(&mem, agent_of(AgentKind::RouteOptimization), FixedRandom::constant(1.0));
    assert!(handler.run().await.success);

    let optimized = mem.load(&long.id).unwrap();
    assert!((optimized.distance - 920.0).abs() < 1e-9);
    assert_eq!(
        optimized.special_instructions.as_deref(),
        Some("Fragile. Route optimized - 80.0 miles saved.")
    );

    // 50 英里最多节省 4 英里，低于阈值
    let untouched = mem.load(&short.id).unwrap();
    assert_eq!(untouched.distance, 50.0);
    assert!(untouched.special_instructions.is_none());

    let notices = mem.notifications_titled("Route Optimization Success");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Load L-LONG: Saved 80.0 miles, $46.68 in fuel costs");
    assert_eq!(mem.metric_value("routes_optimized_today"), Some(1.0));
    assert_eq!(mem.metric_value("active_loads_analyzed"), Some(2.0));
}

#[tokio::test]
async fn test_fuel_optimization_recommends_cheapest_station() {
    let mem = InMemoryFleetStore::new();
    let truck = TruckBuilder::new().with_fuel_capacity(300.0).build();
    let driver = DriverBuilder::new()
        .with_status(DriverStatus::Driving)
        .with_truck(&truck.id)
        .build();
    let idle = DriverBuilder::new()
        .with_name("No Truck")
        .with_status(DriverStatus::OnDuty)
        .build();
    mem.insert_truck(truck);
    mem.insert_driver(driver.clone());
    mem.insert_driver(idle);

    let handler = handler(&mem, agent_of(AgentKind::FuelOptimization), FixedRandom::constant(0.0));
    assert!(handler.run().await.success);

    let notices = mem.notifications_titled("Fuel Savings Opportunity");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].notification_type, NotificationType::Info);
    assert_eq!(notices[0].priority, Priority::Low);
    assert_eq!(
        notices[0].message,
        "Mike Johnson: Fuel at Loves Travel Stop (15 miles) - Save $27.00"
    );

    assert_eq!(mem.metric_value("fuel_recommendations_today"), Some(1.0));
    let savings = mem.metric_value("potential_fuel_savings_today").unwrap();
    assert!((savings - 27.0).abs() < 1e-6);
    assert_eq!(mem.metric_value("active_drivers_monitored"), Some(2.0));
    let mpg = mem.metric_value(&format!("fuel_efficiency_{}", driver.id)).unwrap();
    assert!((mpg - 6.5).abs() < 1e-9);

    // 车辆数据不被修改
    assert_eq!(mem.driver(&driver.id).unwrap().status, DriverStatus::Driving);
}

#[tokio::test]
async fn test_fuel_optimization_skips_when_tank_is_full_enough() {
    let mem = InMemoryFleetStore::new();
    let truck = TruckBuilder::new().build();
    let driver = DriverBuilder::new()
        .with_status(DriverStatus::OnDuty)
        .with_truck(&truck.id)
        .build();
    mem.insert_truck(truck);
    mem.insert_driver(driver);

    let handler = handler(&mem, agent_of(AgentKind::FuelOptimization), FixedRandom::constant(0.9));
    assert!(handler.run().await.success);
    assert!(mem.notifications_titled("Fuel Savings Opportunity").is_empty());
    assert_eq!(mem.metric_value("fuel_recommendations_today"), Some(0.0));
}

#[tokio::test]
async fn test_compliance_driving_violation_creates_critical_event() {
    let mem = InMemoryFleetStore::new();
    let driver = DriverBuilder::new().build();
    mem.insert_driver(driver.clone());
    mem.insert_hos_log(
        HosLogBuilder::new(&driver.id)
            .with_driving_minutes(661)
            .with_sleep_minutes(600)
            .build(),
    );

    let handler = handler(&mem, agent_of(AgentKind::ComplianceMonitoring), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    let events = mem.compliance_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, ComplianceEventType::HosViolation);
    assert_eq!(events[0].severity, Priority::Critical);
    assert_eq!(events[0].driver_id, driver.id);
    assert_eq!(
        events[0].description,
        "Driver Mike Johnson exceeded 11-hour driving limit: 11.0 hours"
    );
    assert!(events[0].due_date.is_some());

    let notices = mem.notifications_titled("Compliance Violation");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].priority, Priority::Critical);
    assert!(mem.notifications_titled("HOS Warning").is_empty());
    assert_eq!(mem.metric_value("violations_found_today"), Some(1.0));
    assert_eq!(mem.metric_value("compliance_checks_today"), Some(1.0));
}

#[tokio::test]
async fn test_compliance_driving_warning_without_event() {
    let mem = InMemoryFleetStore::new();
    let driver = DriverBuilder::new().build();
    mem.insert_driver(driver.clone());
    mem.insert_hos_log(
        HosLogBuilder::new(&driver.id)
            .with_driving_minutes(605)
            .with_sleep_minutes(600)
            .build(),
    );

    let handler = handler(&mem, agent_of(AgentKind::ComplianceMonitoring), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    assert!(mem.compliance_events().is_empty());
    let warnings = mem.notifications_titled("HOS Warning");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].priority, Priority::High);
    assert_eq!(
        warnings[0].message,
        "Driver Mike Johnson approaching driving time limit: 10.1 hours"
    );
    assert_eq!(mem.notifications().len(), 1);
    assert_eq!(mem.metric_value("warnings_issued_today"), Some(1.0));
}

#[tokio::test]
async fn test_compliance_ignores_logs_outside_lookback_and_out_of_service() {
    let mem = InMemoryFleetStore::new();
    let driver = DriverBuilder::new().build();
    let parked = DriverBuilder::new()
        .with_status(DriverStatus::OutOfService)
        .build();
    mem.insert_driver(driver.clone());
    mem.insert_driver(parked.clone());
    mem.insert_hos_log(
        HosLogBuilder::new(&driver.id)
            .with_date(Utc::now() - ChronoDuration::days(8))
            .with_driving_minutes(700)
            .build(),
    );
    mem.insert_hos_log(HosLogBuilder::new(&parked.id).with_driving_minutes(700).build());

    let handler = handler(&mem, agent_of(AgentKind::ComplianceMonitoring), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    assert!(mem.compliance_events().is_empty());
    assert_eq!(mem.metric_value("compliance_checks_today"), Some(1.0));
}

#[tokio::test]
async fn test_compliance_random_checks_share_one_draw() {
    let mem = InMemoryFleetStore::new();
    let driver = DriverBuilder::new().build();
    mem.insert_driver(driver);
    mem.insert_truck(TruckBuilder::new().with_unit_number("T009").build());

    // 0.01 同时触发驾照检查与车辆年检，体检检查不触发
    let handler = handler(&mem, agent_of(AgentKind::ComplianceMonitoring), FixedRandom::constant(0.01));
    assert!(handler.run().await.success);

    let events = mem.compliance_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, ComplianceEventType::LicenseExpired);
    assert_eq!(events[0].severity, Priority::High);
    assert_eq!(mem.notifications_titled("Compliance Violation")[0].priority, Priority::High);

    let inspections = mem.notifications_titled("Vehicle Inspection Due");
    assert_eq!(inspections.len(), 1);
    assert_eq!(
        inspections[0].message,
        "Truck T009 annual inspection due within 30 days"
    );
}

#[tokio::test]
async fn test_customer_update_for_stale_load() {
    let mem = InMemoryFleetStore::new();
    let truck = TruckBuilder::new().build();
    let driver = DriverBuilder::new().with_truck(&truck.id).build();
    let load = LoadBuilder::new()
        .with_status(LoadStatus::Assigned)
        .with_assignment(&driver.id, Some(truck.id.as_str()))
        .build();
    mem.insert_truck(truck);
    mem.insert_driver(driver);
    mem.insert_load(load.clone());

    let handler = handler(&mem, agent_of(AgentKind::CustomerCommunication), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    let notices = mem.notifications_titled("Customer Update Sent");
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.starts_with("Update sent for load L2024-001: Load L2024-001 update: "));
    assert!(notices[0].message.ends_with("Driver: Mike Johnson (+1-555-0101) | Unit: T001"));

    let events = mem.tracking_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "CUSTOMER_UPDATE");
    assert_eq!(events[0].location, "Dallas, TX");
    assert_eq!(events[0].load_id, load.id);

    assert_eq!(mem.metric_value("customer_updates_sent_today"), Some(1.0));
    assert_eq!(mem.metric_value("customers_notified_today"), Some(1.0));
    assert_eq!(mem.metric_value("active_loads_monitored"), Some(1.0));
}

#[tokio::test]
async fn test_customer_reminder_and_confirmation_windows() {
    let mem = InMemoryFleetStore::new();
    let now = Utc::now();
    let arriving = LoadBuilder::new()
        .with_load_number("L-SOON")
        .with_status(LoadStatus::InTransit)
        .with_delivery_date(now + ChronoDuration::hours(3))
        .build();
    let delivered = LoadBuilder::new()
        .with_load_number("L-LATE")
        .with_status(LoadStatus::InTransit)
        .with_delivery_date(now - ChronoDuration::hours(1))
        .build();
    mem.insert_load(arriving.clone());
    mem.insert_load(delivered.clone());
    for load in [&arriving, &delivered] {
        mem.insert_tracking_event(
            TrackingEventBuilder::new(&load.id)
                .with_timestamp(now - ChronoDuration::hours(1))
                .build(),
        );
    }

    let handler = handler(&mem, agent_of(AgentKind::CustomerCommunication), FixedRandom::constant(0.5));
    assert!(handler.run().await.success);

    assert!(mem.notifications_titled("Customer Update Sent").is_empty());

    let confirmations = mem.notifications_titled("Delivery Confirmation Needed");
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].message, "Load L-LATE delivery confirmation required");
    assert_eq!(confirmations[0].priority, Priority::High);

    let reminders = mem.notifications_titled("Delivery Reminder Sent");
    assert_eq!(reminders.len(), 1);
    assert!(reminders[0]
        .message
        .starts_with("Delivery reminder sent for load L-SOON - arriving in "));
    assert_eq!(mem.metric_value("customer_updates_sent_today"), Some(1.0));
    assert_eq!(mem.metric_value("customers_notified_today"), Some(0.0));
}
