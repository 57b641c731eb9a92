use chrono::{Duration, Utc};
use fleet_config::DatabaseConfig;
use fleet_domain::{
    AgentKind, AgentStatus, ComplianceEvent, ComplianceEventType, ConversationMessage,
    DriverStatus, FleetStore, LoadStatus, Notification, NotificationType, Priority, TruckStatus,
    AgentMetric,
};
use fleet_infrastructure::DatabaseManager;
use fleet_testing_utils::{
    AgentDefinitionBuilder, DriverBuilder, HosLogBuilder, LoadBuilder, TrackingEventBuilder,
    TruckBuilder,
};
use serde_json::json;

async fn setup() -> (DatabaseManager, FleetStore) {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    let manager = DatabaseManager::connect(&config).await.unwrap();
    manager.run_migrations().await.unwrap();
    let store = manager.store();
    (manager, store)
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let (manager, _) = setup().await;
    manager.run_migrations().await.unwrap();
    manager.health_check().await.unwrap();
}

#[tokio::test]
async fn test_agent_round_trip_and_enabled_filter() {
    let (_manager, store) = setup().await;

    let enabled = AgentDefinitionBuilder::new(AgentKind::LoadMatching)
        .with_config(json!({ "minDriverRating": 4.0 }))
        .build();
    let disabled = AgentDefinitionBuilder::new(AgentKind::FuelOptimization)
        .with_enabled(false)
        .build();
    store.agents.create(&enabled).await.unwrap();
    store.agents.create(&disabled).await.unwrap();

    let loaded = store.agents.find_by_id(&enabled.id).await.unwrap().unwrap();
    assert_eq!(loaded.kind, "LOAD_MATCHING");
    assert_eq!(loaded.config["minDriverRating"], json!(4.0));
    assert_eq!(loaded.status, AgentStatus::Active);

    let enabled_agents = store.agents.find_enabled().await.unwrap();
    assert_eq!(enabled_agents.len(), 1);
    assert_eq!(enabled_agents[0].id, enabled.id);
    assert_eq!(store.agents.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_record_outcome_updates_rate_in_one_statement() {
    let (_manager, store) = setup().await;
    let agent = AgentDefinitionBuilder::new(AgentKind::RouteOptimization)
        .with_runs(3, 4)
        .build();
    store.agents.create(&agent).await.unwrap();

    let updated = store.agents.record_outcome(&agent.id, true).await.unwrap();
    assert_eq!(updated.total_runs, 5);
    assert_eq!(updated.successful_runs, 4);
    assert!((updated.success_rate - 0.8).abs() < 1e-9);

    let updated = store.agents.record_outcome(&agent.id, false).await.unwrap();
    assert_eq!(updated.total_runs, 6);
    assert_eq!(updated.successful_runs, 4);
    assert!((updated.success_rate - 4.0 / 6.0).abs() < 1e-9);

    let missing = store.agents.record_outcome("missing", true).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_update_status_and_clear_next_run() {
    let (_manager, store) = setup().await;
    let agent = AgentDefinitionBuilder::new(AgentKind::ComplianceMonitoring).build();
    store.agents.create(&agent).await.unwrap();

    let now = Utc::now();
    store
        .agents
        .update_status(&agent.id, AgentStatus::Error, Some(now), Some(now + Duration::minutes(15)))
        .await
        .unwrap();
    let loaded = store.agents.find_by_id(&agent.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, AgentStatus::Error);
    assert!(loaded.last_run.is_some());
    assert!(loaded.next_run.is_some());

    store.agents.clear_next_run(&agent.id).await.unwrap();
    let loaded = store.agents.find_by_id(&agent.id).await.unwrap().unwrap();
    assert!(loaded.next_run.is_none());
    assert!(loaded.last_run.is_some());
}

#[tokio::test]
async fn test_available_drivers_are_paired_with_available_trucks() {
    let (_manager, store) = setup().await;

    let t1 = TruckBuilder::new().with_unit_number("T001").build();
    let t2 = TruckBuilder::new()
        .with_unit_number("T002")
        .with_status(TruckStatus::InUse)
        .build();
    let t3 = TruckBuilder::new().with_unit_number("T003").build();
    for truck in [&t1, &t2, &t3] {
        store.trucks.create(truck).await.unwrap();
    }

    let d1 = DriverBuilder::new().with_name("First").with_truck(&t1.id).build();
    let d2 = DriverBuilder::new().with_name("Busy truck").with_truck(&t2.id).build();
    let d3 = DriverBuilder::new()
        .with_name("Off duty")
        .with_status(DriverStatus::OffDuty)
        .with_truck(&t3.id)
        .build();
    let d4 = DriverBuilder::new().with_name("No truck").build();
    for driver in [&d1, &d2, &d3, &d4] {
        store.drivers.create(driver).await.unwrap();
    }

    let pairs = store.drivers.find_available_with_trucks().await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0.name, "First");
    assert_eq!(pairs[0].1.id, t1.id);
    assert_eq!(pairs[0].1.unit_number, "T001");
}

#[tokio::test]
async fn test_load_queries_and_assignment() {
    let (_manager, store) = setup().await;
    let truck = TruckBuilder::new().build();
    store.trucks.create(&truck).await.unwrap();
    let driver = DriverBuilder::new().with_truck(&truck.id).build();
    store.drivers.create(&driver).await.unwrap();

    let now = Utc::now();
    let older = LoadBuilder::new()
        .with_load_number("L-OLD")
        .with_created_at(now - Duration::hours(2))
        .build();
    let newer = LoadBuilder::new().with_load_number("L-NEW").build();
    let transit = LoadBuilder::new()
        .with_load_number("L-TRANSIT")
        .with_status(LoadStatus::InTransit)
        .with_delivery_date(now + Duration::hours(3))
        .build();
    for load in [&newer, &older, &transit] {
        store.loads.create(load).await.unwrap();
    }

    let available = store.loads.find_by_status(&[LoadStatus::Available]).await.unwrap();
    let numbers: Vec<_> = available.iter().map(|l| l.load_number.as_str()).collect();
    assert_eq!(numbers, vec!["L-OLD", "L-NEW"]);

    store
        .loads
        .assign(&older.id, &driver.id, Some(&truck.id))
        .await
        .unwrap();
    let assigned = store.loads.find_by_id(&older.id).await.unwrap().unwrap();
    assert_eq!(assigned.status, LoadStatus::Assigned);
    assert_eq!(assigned.driver_id.as_deref(), Some(driver.id.as_str()));

    store
        .loads
        .update_route(&older.id, 850.0, Some("Route optimized - 37.5 miles saved."))
        .await
        .unwrap();
    let routed = store.loads.find_by_id(&older.id).await.unwrap().unwrap();
    assert_eq!(routed.distance, 850.0);

    let upcoming = store
        .loads
        .find_deliveries_between(LoadStatus::InTransit, now, now + Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].load_number, "L-TRANSIT");

    let active = store
        .loads
        .find_by_status(&[LoadStatus::Assigned, LoadStatus::InTransit])
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_hos_and_tracking_latest() {
    let (_manager, store) = setup().await;
    let driver = DriverBuilder::new().build();
    store.drivers.create(&driver).await.unwrap();
    let load = LoadBuilder::new().build();
    store.loads.create(&load).await.unwrap();

    let now = Utc::now();
    let stale = HosLogBuilder::new(&driver.id)
        .with_date(now - Duration::days(10))
        .with_driving_minutes(700)
        .build();
    let older = HosLogBuilder::new(&driver.id)
        .with_date(now - Duration::days(2))
        .with_driving_minutes(300)
        .build();
    let recent = HosLogBuilder::new(&driver.id)
        .with_date(now - Duration::hours(5))
        .with_driving_minutes(605)
        .build();
    for log in [&stale, &recent, &older] {
        store.hos_logs.create(log).await.unwrap();
    }

    let latest = store
        .hos_logs
        .find_latest_since(&driver.id, now - Duration::days(7))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.driving_minutes, 605);
    assert!(store
        .hos_logs
        .find_latest_since(&driver.id, now)
        .await
        .unwrap()
        .is_none());

    let first = TrackingEventBuilder::new(&load.id)
        .with_timestamp(now - Duration::hours(6))
        .build();
    let second = TrackingEventBuilder::new(&load.id)
        .with_event_type("PICKUP")
        .with_timestamp(now - Duration::hours(1))
        .build();
    store.tracking.create(&second).await.unwrap();
    store.tracking.create(&first).await.unwrap();

    let latest_event = store.tracking.find_latest(&load.id).await.unwrap().unwrap();
    assert_eq!(latest_event.event_type, "PICKUP");
    assert_eq!(store.tracking.find_by_load(&load.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_output_records() {
    let (_manager, store) = setup().await;
    let driver = DriverBuilder::new().build();
    store.drivers.create(&driver).await.unwrap();

    let notification = Notification::new(
        "HOS Warning",
        "approaching limit",
        NotificationType::Warning,
        Priority::High,
        Some("agent-1".to_string()),
    );
    store.notifications.create(&notification).await.unwrap();
    let by_agent = store.notifications.find_by_agent("agent-1").await.unwrap();
    assert_eq!(by_agent.len(), 1);
    assert_eq!(by_agent[0].notification_type, NotificationType::Warning);
    assert_eq!(by_agent[0].priority, Priority::High);
    assert!(!by_agent[0].read);
    assert_eq!(store.notifications.find_recent(10).await.unwrap().len(), 1);

    store
        .metrics
        .record(&AgentMetric::new("agent-1", "loads_matched_today", 2.0))
        .await
        .unwrap();
    let metrics = store.metrics.find_by_agent("agent-1").await.unwrap();
    assert_eq!(metrics[0].metric_name, "loads_matched_today");

    let event = ComplianceEvent {
        id: fleet_domain::new_id(),
        driver_id: driver.id.clone(),
        event_type: ComplianceEventType::HosViolation,
        severity: Priority::Critical,
        description: "exceeded".to_string(),
        due_date: Some(Utc::now() + Duration::days(30)),
        resolved: false,
        created_at: Utc::now(),
    };
    store.compliance.create(&event).await.unwrap();
    let events = store.compliance.find_by_driver(&driver.id).await.unwrap();
    assert_eq!(events[0].event_type, ComplianceEventType::HosViolation);

    store
        .conversations
        .append(&ConversationMessage::assistant("conv-1", "hello"))
        .await
        .unwrap();
    let messages = store.conversations.find_by_conversation("conv-1").await.unwrap();
    assert_eq!(messages[0].role, "assistant");
}

#[tokio::test]
async fn test_close_releases_pool() {
    let (manager, store) = setup().await;
    store.lifecycle.close().await.unwrap();
    assert!(manager.pool().is_closed());
    // 重复关闭无副作用
    store.lifecycle.close().await.unwrap();
}
