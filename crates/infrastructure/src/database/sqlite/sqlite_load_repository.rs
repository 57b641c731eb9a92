use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_domain::{Load, LoadRepository, LoadStatus};
use fleet_errors::{FleetError, FleetResult};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

const LOAD_COLUMNS: &str = "id, load_number, status, pickup_location, delivery_location, \
     pickup_date, delivery_date, distance, weight, commodity, rate, special_instructions, \
     driver_id, truck_id, created_at, updated_at";

pub struct SqliteLoadRepository {
    pool: SqlitePool,
}

impl SqliteLoadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_load(row: &sqlx::sqlite::SqliteRow) -> FleetResult<Load> {
        Ok(Load {
            id: row.try_get("id")?,
            load_number: row.try_get("load_number")?,
            status: MappingHelpers::parse_enum(row, "status")?,
            pickup_location: row.try_get("pickup_location")?,
            delivery_location: row.try_get("delivery_location")?,
            pickup_date: row.try_get("pickup_date")?,
            delivery_date: row.try_get("delivery_date")?,
            distance: row.try_get("distance")?,
            weight: row.try_get("weight")?,
            commodity: row.try_get("commodity")?,
            rate: row.try_get("rate")?,
            special_instructions: row.try_get("special_instructions")?,
            driver_id: row.try_get("driver_id")?,
            truck_id: row.try_get("truck_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl LoadRepository for SqliteLoadRepository {
    #[instrument(skip(self, load), fields(load_id = %load.id, load_number = %load.load_number))]
    async fn create(&self, load: &Load) -> FleetResult<Load> {
        let context = repo_context!(RepositoryOperation::Create, "货物", id = &load.id);

        let sql = format!(
            "INSERT INTO loads ({LOAD_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) \
             RETURNING {LOAD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&load.id)
            .bind(&load.load_number)
            .bind(load.status.as_str())
            .bind(&load.pickup_location)
            .bind(&load.delivery_location)
            .bind(load.pickup_date)
            .bind(load.delivery_date)
            .bind(load.distance)
            .bind(load.weight)
            .bind(&load.commodity)
            .bind(load.rate)
            .bind(&load.special_instructions)
            .bind(&load.driver_id)
            .bind(&load.truck_id)
            .bind(load.created_at)
            .bind(load.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Self::row_to_load(&row)?;
        RepositoryErrorHelpers::log_operation_success(&context, Some(&created.load_number));
        Ok(created)
    }

    #[instrument(skip(self), fields(load_id = %id))]
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Load>> {
        let context = repo_context!(RepositoryOperation::Read, "货物", id = id);

        let sql = format!("SELECT {LOAD_COLUMNS} FROM loads WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_load).transpose()
    }

    #[instrument(skip(self), fields(statuses = ?statuses))]
    async fn find_by_status(&self, statuses: &[LoadStatus]) -> FleetResult<Vec<Load>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let context = repo_context!(RepositoryOperation::Query, "货物")
            .with_additional_info(format!("状态: {statuses:?}"));

        let sql = format!(
            "SELECT {LOAD_COLUMNS} FROM loads WHERE status IN ({}) ORDER BY created_at ASC, rowid ASC",
            MappingHelpers::placeholders(1, statuses.len())
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_load).collect()
    }

    #[instrument(skip(self), fields(load_id = %load_id, driver_id = %driver_id))]
    async fn assign(
        &self,
        load_id: &str,
        driver_id: &str,
        truck_id: Option<&str>,
    ) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "货物", id = load_id)
            .with_additional_info(format!("分配给司机 {driver_id}"));

        let result = sqlx::query(
            "UPDATE loads SET status = ?2, driver_id = ?3, truck_id = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(load_id)
        .bind(LoadStatus::Assigned.as_str())
        .bind(driver_id)
        .bind(truck_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        if result.rows_affected() == 0 {
            return Err(FleetError::load_not_found(load_id));
        }
        RepositoryErrorHelpers::log_operation_success(&context, None);
        Ok(())
    }

    #[instrument(skip(self, special_instructions), fields(load_id = %load_id, distance))]
    async fn update_route(
        &self,
        load_id: &str,
        distance: f64,
        special_instructions: Option<&str>,
    ) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "货物", id = load_id)
            .with_additional_info("更新路线");

        let result = sqlx::query(
            "UPDATE loads SET distance = ?2, special_instructions = ?3, updated_at = ?4 \
             WHERE id = ?1",
        )
        .bind(load_id)
        .bind(distance)
        .bind(special_instructions)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        if result.rows_affected() == 0 {
            return Err(FleetError::load_not_found(load_id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn find_deliveries_between(
        &self,
        status: LoadStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> FleetResult<Vec<Load>> {
        let context = repo_context!(RepositoryOperation::Query, "货物")
            .with_additional_info(format!("交付时间 {from} - {to}"));

        let sql = format!(
            "SELECT {LOAD_COLUMNS} FROM loads \
             WHERE status = ?1 AND delivery_date >= ?2 AND delivery_date <= ?3 \
             ORDER BY delivery_date ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_load).collect()
    }
}
