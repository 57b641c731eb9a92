use std::sync::Arc;
use std::time::Duration;

use fleet_agents::FixedRandom;
use fleet_config::{AppConfig, DatabaseConfig};
use fleet_dispatch::app::{AppMode, Application};
use fleet_dispatch::seed::seed_demo_data;
use fleet_dispatch::shutdown::ShutdownManager;
use fleet_dispatcher::AgentRegistry;
use fleet_domain::{
    AgentKind, DriverStatus, FleetStore, JobCompleted, JobQueue, LoadStatus, TruckStatus,
};
use fleet_infrastructure::{DatabaseManager, InMemoryJobQueue};
use tokio::time::timeout;

async fn memory_store() -> (DatabaseManager, FleetStore) {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    let manager = DatabaseManager::connect(&config).await.unwrap();
    manager.run_migrations().await.unwrap();
    let store = manager.store();
    (manager, store)
}

fn file_config(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("fleet.db").display());
    config.scheduler.startup_jitter_ms = 0;
    config
}

#[tokio::test]
async fn test_seed_writes_demo_fleet_once() {
    let (_manager, store) = memory_store().await;

    let summary = seed_demo_data(&store).await.unwrap();
    assert_eq!(summary.trucks, 3);
    assert_eq!(summary.drivers, 3);
    assert_eq!(summary.loads, 3);
    assert_eq!(summary.agents, 5);
    assert_eq!(summary.tracking_events, 3);
    assert_eq!(summary.hos_logs, 2);

    let agents = store.agents.find_all().await.unwrap();
    assert_eq!(agents.len(), 5);
    let compliance = agents
        .iter()
        .find(|a| a.parsed_kind() == Some(AgentKind::ComplianceMonitoring))
        .unwrap();
    assert_eq!(compliance.total_runs, 324);
    assert_eq!(compliance.successful_runs, 311);
    assert!(agents.iter().all(|a| a.enabled && a.next_run.is_some()));

    let in_transit = store.loads.find_by_status(&[LoadStatus::InTransit]).await.unwrap();
    assert_eq!(in_transit.len(), 1);
    assert_eq!(in_transit[0].load_number, "L2024-002");
    let events = store.tracking.find_by_load(&in_transit[0].id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "PICKUP_COMPLETED");

    let again = seed_demo_data(&store).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(store.agents.find_all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_seeded_agents_all_register() {
    let (_manager, store) = memory_store().await;
    seed_demo_data(&store).await.unwrap();

    let registry = AgentRegistry::load(
        &store,
        &AppConfig::default().scheduler.intervals,
        Arc::new(FixedRandom::constant(0.5)),
    )
    .await
    .unwrap();
    assert_eq!(registry.len(), 5);
}

#[tokio::test]
async fn test_seeded_load_matching_assigns_open_load() {
    let (_manager, store) = memory_store().await;
    seed_demo_data(&store).await.unwrap();

    let registry = AgentRegistry::load(
        &store,
        &AppConfig::default().scheduler.intervals,
        Arc::new(FixedRandom::constant(0.5)),
    )
    .await
    .unwrap();
    let handler = registry
        .handlers()
        .find(|h| h.kind() == AgentKind::LoadMatching)
        .unwrap();

    let outcome = handler.run().await;
    assert!(outcome.success);

    assert!(store
        .loads
        .find_by_status(&[LoadStatus::Available])
        .await
        .unwrap()
        .is_empty());
    let assigned = store.loads.find_by_status(&[LoadStatus::Assigned]).await.unwrap();
    let denver = assigned.iter().find(|l| l.load_number == "L2024-003").unwrap();
    let driver_id = denver.driver_id.as_deref().unwrap();
    let driver = store.drivers.find_by_id(driver_id).await.unwrap().unwrap();
    assert_eq!(driver.name, "Mike Johnson");
    assert_eq!(driver.status, DriverStatus::OnDuty);
    let truck_id = denver.truck_id.as_deref().unwrap();
    let truck = store.trucks.find_by_id(truck_id).await.unwrap().unwrap();
    assert_eq!(truck.status, TruckStatus::InUse);
}

#[tokio::test]
async fn test_seed_mode_persists_to_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    let app = Application::new(config.clone(), AppMode::Seed).await.unwrap();
    app.run(&ShutdownManager::new()).await.unwrap();

    let manager = DatabaseManager::connect(&config.database).await.unwrap();
    let store = manager.store();
    assert_eq!(store.agents.find_all().await.unwrap().len(), 5);
    store.lifecycle.close().await.unwrap();
}

#[tokio::test]
async fn test_all_mode_serves_jobs_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(&dir);
    config.worker.enabled = true;
    config.worker.pop_timeout_seconds = 1;

    let queue = Arc::new(InMemoryJobQueue::new());
    let app = Arc::new(
        Application::with_queue(config, AppMode::All, queue.clone())
            .await
            .unwrap(),
    );
    let mut completed = queue.subscribe("agent_completed").await;

    let shutdown = ShutdownManager::new();
    let handle = tokio::spawn({
        let app = app.clone();
        let shutdown = shutdown.clone();
        async move { app.run(&shutdown).await }
    });

    queue
        .push(
            "agent_tasks",
            r#"{"id":"task-9","conversationId":"conv-9","prompt":"status"}"#.to_string(),
        )
        .await
        .unwrap();

    let payload = timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    let event: JobCompleted = serde_json::from_str(&payload).unwrap();
    assert_eq!(event.task_id, "task-9");

    let messages = app
        .store()
        .conversations
        .find_by_conversation("conv-9")
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);

    shutdown.shutdown();
    timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_broker_url_is_only_used_by_worker_modes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(&dir);
    config.worker.broker_url = Some("not a broker url".to_string());

    let err = Application::new(config.clone(), AppMode::Worker)
        .await
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("连接消息代理失败"));

    let app = Application::new(config, AppMode::Agents).await.unwrap();
    app.store().lifecycle.close().await.unwrap();
}

#[tokio::test]
async fn test_force_close_shuts_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new(file_config(&dir), AppMode::Agents)
        .await
        .unwrap();
    assert!(app.store().agents.find_all().await.is_ok());

    app.force_close().await;
    assert!(app.store().agents.find_all().await.is_err());
    // 再次关闭是无操作
    app.force_close().await;
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.toml");
    std::fs::write(
        &path,
        r#"
[scheduler]
overlap_policy = "queue"
startup_jitter_ms = 0

[scheduler.intervals]
load_matching_seconds = 30

[worker]
enabled = true
concurrency = 2
"#,
    )
    .unwrap();

    let config = AppConfig::load(path.to_str()).unwrap();
    assert_eq!(config.scheduler.intervals.load_matching_seconds, 30);
    assert_eq!(config.scheduler.intervals.route_optimization_seconds, 300);
    assert_eq!(config.scheduler.startup_jitter_ms, 0);
    assert!(config.worker.enabled);
    assert_eq!(config.worker.concurrency, 2);
    assert_eq!(config.worker.queue_name, "agent_tasks");

    assert!(AppConfig::load(Some("/nonexistent/fleet.toml")).is_err());
}
