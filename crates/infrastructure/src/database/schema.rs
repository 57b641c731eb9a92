//! 数据库表结构初始化，可重复执行

use fleet_errors::FleetResult;
use sqlx::SqlitePool;
use tracing::debug;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        description TEXT,
        enabled INTEGER NOT NULL DEFAULT 1,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        config TEXT NOT NULL DEFAULT '{}',
        total_runs INTEGER NOT NULL DEFAULT 0,
        successful_runs INTEGER NOT NULL DEFAULT 0,
        success_rate REAL NOT NULL DEFAULT 0,
        last_run DATETIME,
        next_run DATETIME,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trucks (
        id TEXT PRIMARY KEY,
        unit_number TEXT NOT NULL UNIQUE,
        make TEXT NOT NULL,
        model TEXT NOT NULL,
        year INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'AVAILABLE',
        current_location TEXT,
        fuel_capacity REAL NOT NULL,
        max_weight REAL NOT NULL,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS drivers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        license_no TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'AVAILABLE',
        current_location TEXT,
        home_base TEXT,
        rating REAL NOT NULL DEFAULT 5.0,
        total_miles REAL NOT NULL DEFAULT 0,
        truck_id TEXT REFERENCES trucks(id),
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loads (
        id TEXT PRIMARY KEY,
        load_number TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'AVAILABLE',
        pickup_location TEXT NOT NULL,
        delivery_location TEXT NOT NULL,
        pickup_date DATETIME NOT NULL,
        delivery_date DATETIME NOT NULL,
        distance REAL NOT NULL,
        weight REAL NOT NULL,
        commodity TEXT NOT NULL,
        rate REAL NOT NULL,
        special_instructions TEXT,
        driver_id TEXT REFERENCES drivers(id),
        truck_id TEXT REFERENCES trucks(id),
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hos_logs (
        id TEXT PRIMARY KEY,
        driver_id TEXT NOT NULL REFERENCES drivers(id) ON DELETE CASCADE,
        date DATETIME NOT NULL,
        on_duty_minutes INTEGER NOT NULL DEFAULT 0,
        driving_minutes INTEGER NOT NULL DEFAULT 0,
        sleep_minutes INTEGER NOT NULL DEFAULT 0,
        off_duty_minutes INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tracking_events (
        id TEXT PRIMARY KEY,
        load_id TEXT NOT NULL REFERENCES loads(id) ON DELETE CASCADE,
        event_type TEXT NOT NULL,
        location TEXT NOT NULL,
        timestamp DATETIME NOT NULL,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        type TEXT NOT NULL,
        priority TEXT NOT NULL DEFAULT 'MEDIUM',
        agent_id TEXT,
        read INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_metrics (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        metric_name TEXT NOT NULL,
        value REAL NOT NULL,
        recorded_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS compliance_events (
        id TEXT PRIMARY KEY,
        driver_id TEXT NOT NULL REFERENCES drivers(id) ON DELETE CASCADE,
        event_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        description TEXT NOT NULL,
        due_date DATETIME,
        resolved INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_agents_enabled ON agents(enabled)",
    "CREATE INDEX IF NOT EXISTS idx_loads_status ON loads(status)",
    "CREATE INDEX IF NOT EXISTS idx_loads_delivery_date ON loads(delivery_date)",
    "CREATE INDEX IF NOT EXISTS idx_drivers_status ON drivers(status)",
    "CREATE INDEX IF NOT EXISTS idx_trucks_status ON trucks(status)",
    "CREATE INDEX IF NOT EXISTS idx_hos_logs_driver_date ON hos_logs(driver_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_tracking_events_load ON tracking_events(load_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_agent ON notifications(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_agent_metrics_agent ON agent_metrics(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_compliance_events_driver ON compliance_events(driver_id)",
    "CREATE INDEX IF NOT EXISTS idx_conversation_messages_conversation ON conversation_messages(conversation_id)",
];

pub async fn run_migrations(pool: &SqlitePool) -> FleetResult<()> {
    debug!("初始化SQLite表结构");

    for table_sql in TABLES {
        sqlx::query(table_sql).execute(pool).await?;
    }
    for index_sql in INDEXES {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("SQLite表结构初始化完成");
    Ok(())
}
