//! 工时日志与跟踪事件

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_domain::{HosLog, HosLogRepository, TrackingEvent, TrackingRepository};
use fleet_errors::FleetResult;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::{
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

const HOS_COLUMNS: &str = "id, driver_id, date, on_duty_minutes, driving_minutes, sleep_minutes, \
     off_duty_minutes, created_at";
const TRACKING_COLUMNS: &str = "id, load_id, event_type, location, timestamp, notes";

pub struct SqliteHosLogRepository {
    pool: SqlitePool,
}

impl SqliteHosLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_log(row: &sqlx::sqlite::SqliteRow) -> FleetResult<HosLog> {
        Ok(HosLog {
            id: row.try_get("id")?,
            driver_id: row.try_get("driver_id")?,
            date: row.try_get("date")?,
            on_duty_minutes: row.try_get("on_duty_minutes")?,
            driving_minutes: row.try_get("driving_minutes")?,
            sleep_minutes: row.try_get("sleep_minutes")?,
            off_duty_minutes: row.try_get("off_duty_minutes")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl HosLogRepository for SqliteHosLogRepository {
    #[instrument(skip(self, log), fields(driver_id = %log.driver_id))]
    async fn create(&self, log: &HosLog) -> FleetResult<HosLog> {
        let context = repo_context!(RepositoryOperation::Create, "工时日志", id = &log.id);

        let sql = format!(
            "INSERT INTO hos_logs ({HOS_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             RETURNING {HOS_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&log.id)
            .bind(&log.driver_id)
            .bind(log.date)
            .bind(log.on_duty_minutes)
            .bind(log.driving_minutes)
            .bind(log.sleep_minutes)
            .bind(log.off_duty_minutes)
            .bind(log.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        Self::row_to_log(&row)
    }

    #[instrument(skip(self), fields(driver_id = %driver_id))]
    async fn find_latest_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> FleetResult<Option<HosLog>> {
        let context = repo_context!(RepositoryOperation::Query, "工时日志")
            .with_additional_info(format!("司机 {driver_id}"));

        let sql = format!(
            "SELECT {HOS_COLUMNS} FROM hos_logs WHERE driver_id = ?1 AND date >= ?2 \
             ORDER BY date DESC, rowid DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(driver_id)
            .bind(since)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_log).transpose()
    }
}

pub struct SqliteTrackingRepository {
    pool: SqlitePool,
}

impl SqliteTrackingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> FleetResult<TrackingEvent> {
        Ok(TrackingEvent {
            id: row.try_get("id")?,
            load_id: row.try_get("load_id")?,
            event_type: row.try_get("event_type")?,
            location: row.try_get("location")?,
            timestamp: row.try_get("timestamp")?,
            notes: row.try_get("notes")?,
        })
    }
}

#[async_trait]
impl TrackingRepository for SqliteTrackingRepository {
    #[instrument(skip(self, event), fields(load_id = %event.load_id, event_type = %event.event_type))]
    async fn create(&self, event: &TrackingEvent) -> FleetResult<TrackingEvent> {
        let context = repo_context!(RepositoryOperation::Create, "跟踪事件", id = &event.id);

        let sql = format!(
            "INSERT INTO tracking_events ({TRACKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {TRACKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&event.id)
            .bind(&event.load_id)
            .bind(&event.event_type)
            .bind(&event.location)
            .bind(event.timestamp)
            .bind(&event.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        Self::row_to_event(&row)
    }

    #[instrument(skip(self), fields(load_id = %load_id))]
    async fn find_latest(&self, load_id: &str) -> FleetResult<Option<TrackingEvent>> {
        let context = repo_context!(RepositoryOperation::Query, "跟踪事件")
            .with_additional_info(format!("货物 {load_id}"));

        let sql = format!(
            "SELECT {TRACKING_COLUMNS} FROM tracking_events WHERE load_id = ?1 \
             ORDER BY timestamp DESC, rowid DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(load_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    #[instrument(skip(self), fields(load_id = %load_id))]
    async fn find_by_load(&self, load_id: &str) -> FleetResult<Vec<TrackingEvent>> {
        let context = repo_context!(RepositoryOperation::Query, "跟踪事件")
            .with_additional_info(format!("货物 {load_id}"));

        let sql = format!(
            "SELECT {TRACKING_COLUMNS} FROM tracking_events WHERE load_id = ?1 \
             ORDER BY timestamp ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(load_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_event).collect()
    }
}
