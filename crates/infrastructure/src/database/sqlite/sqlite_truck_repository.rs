use async_trait::async_trait;
use chrono::Utc;
use fleet_domain::{Truck, TruckRepository, TruckStatus};
use fleet_errors::{FleetError, FleetResult};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

pub(crate) const TRUCK_COLUMNS: &str = "id, unit_number, make, model, year, status, \
     current_location, fuel_capacity, max_weight, created_at, updated_at";

pub struct SqliteTruckRepository {
    pool: SqlitePool,
}

impl SqliteTruckRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 按列名前缀读取车辆，联表查询时前缀为 `truck_`
    pub(crate) fn row_to_truck(
        row: &sqlx::sqlite::SqliteRow,
        prefix: &str,
    ) -> FleetResult<Truck> {
        let col = |name: &str| format!("{prefix}{name}");
        Ok(Truck {
            id: row.try_get(col("id").as_str())?,
            unit_number: row.try_get(col("unit_number").as_str())?,
            make: row.try_get(col("make").as_str())?,
            model: row.try_get(col("model").as_str())?,
            year: row.try_get(col("year").as_str())?,
            status: MappingHelpers::parse_enum(row, &col("status"))?,
            current_location: row.try_get(col("current_location").as_str())?,
            fuel_capacity: row.try_get(col("fuel_capacity").as_str())?,
            max_weight: row.try_get(col("max_weight").as_str())?,
            created_at: row.try_get(col("created_at").as_str())?,
            updated_at: row.try_get(col("updated_at").as_str())?,
        })
    }
}

#[async_trait]
impl TruckRepository for SqliteTruckRepository {
    #[instrument(skip(self, truck), fields(truck_id = %truck.id, unit_number = %truck.unit_number))]
    async fn create(&self, truck: &Truck) -> FleetResult<Truck> {
        let context = repo_context!(RepositoryOperation::Create, "车辆", id = &truck.id);

        let sql = format!(
            "INSERT INTO trucks ({TRUCK_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING {TRUCK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&truck.id)
            .bind(&truck.unit_number)
            .bind(&truck.make)
            .bind(&truck.model)
            .bind(truck.year)
            .bind(truck.status.as_str())
            .bind(&truck.current_location)
            .bind(truck.fuel_capacity)
            .bind(truck.max_weight)
            .bind(truck.created_at)
            .bind(truck.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Self::row_to_truck(&row, "")?;
        RepositoryErrorHelpers::log_operation_success(&context, Some(&created.unit_number));
        Ok(created)
    }

    #[instrument(skip(self), fields(truck_id = %id))]
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Truck>> {
        let context = repo_context!(RepositoryOperation::Read, "车辆", id = id);

        let sql = format!("SELECT {TRUCK_COLUMNS} FROM trucks WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(|r| Self::row_to_truck(r, "")).transpose()
    }

    #[instrument(skip(self), fields(statuses = ?statuses))]
    async fn find_by_status(&self, statuses: &[TruckStatus]) -> FleetResult<Vec<Truck>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let context = repo_context!(RepositoryOperation::Query, "车辆");

        let sql = format!(
            "SELECT {TRUCK_COLUMNS} FROM trucks WHERE status IN ({}) ORDER BY rowid ASC",
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

        rows.iter().map(|r| Self::row_to_truck(r, "")).collect()
    }

    #[instrument(skip(self), fields(truck_id = %id, status = %status))]
    async fn update_status(&self, id: &str, status: TruckStatus) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "车辆", id = id);

        let result = sqlx::query("UPDATE trucks SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        if result.rows_affected() == 0 {
            return Err(FleetError::truck_not_found(id));
        }
        Ok(())
    }
}
