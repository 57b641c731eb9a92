use async_trait::async_trait;
use chrono::Utc;
use fleet_domain::{Driver, DriverRepository, DriverStatus, Truck, TruckStatus};
use fleet_errors::{FleetError, FleetResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use super::sqlite_truck_repository::SqliteTruckRepository;
use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

const DRIVER_COLUMNS: &str = "id, name, email, phone, license_no, status, current_location, \
     home_base, rating, total_miles, truck_id, created_at, updated_at";

pub struct SqliteDriverRepository {
    pool: SqlitePool,
}

impl SqliteDriverRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_driver(row: &sqlx::sqlite::SqliteRow) -> FleetResult<Driver> {
        Ok(Driver {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            license_no: row.try_get("license_no")?,
            status: MappingHelpers::parse_enum(row, "status")?,
            current_location: row.try_get("current_location")?,
            home_base: row.try_get("home_base")?,
            rating: row.try_get("rating")?,
            total_miles: row.try_get("total_miles")?,
            truck_id: row.try_get("truck_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DriverRepository for SqliteDriverRepository {
    #[instrument(skip(self, driver), fields(driver_id = %driver.id, driver_name = %driver.name))]
    async fn create(&self, driver: &Driver) -> FleetResult<Driver> {
        let context = repo_context!(RepositoryOperation::Create, "司机", id = &driver.id);

        let sql = format!(
            "INSERT INTO drivers ({DRIVER_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             RETURNING {DRIVER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&driver.id)
            .bind(&driver.name)
            .bind(&driver.email)
            .bind(&driver.phone)
            .bind(&driver.license_no)
            .bind(driver.status.as_str())
            .bind(&driver.current_location)
            .bind(&driver.home_base)
            .bind(driver.rating)
            .bind(driver.total_miles)
            .bind(&driver.truck_id)
            .bind(driver.created_at)
            .bind(driver.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Self::row_to_driver(&row)?;
        RepositoryErrorHelpers::log_operation_success(&context, Some(&created.name));
        Ok(created)
    }

    #[instrument(skip(self), fields(driver_id = %id))]
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<Driver>> {
        let context = repo_context!(RepositoryOperation::Read, "司机", id = id);

        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_driver).transpose()
    }

    #[instrument(skip(self), fields(statuses = ?statuses))]
    async fn find_by_status(&self, statuses: &[DriverStatus]) -> FleetResult<Vec<Driver>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let context = repo_context!(RepositoryOperation::Query, "司机");

        let sql = format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE status IN ({}) ORDER BY rowid ASC",
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

        rows.iter().map(Self::row_to_driver).collect()
    }

    #[instrument(skip(self))]
    async fn find_available_with_trucks(&self) -> FleetResult<Vec<(Driver, Truck)>> {
        let context = repo_context!(RepositoryOperation::Query, "司机")
            .with_additional_info("空闲司机及车辆");

        let rows = sqlx::query(
            r#"
            SELECT d.id, d.name, d.email, d.phone, d.license_no, d.status, d.current_location,
                   d.home_base, d.rating, d.total_miles, d.truck_id, d.created_at, d.updated_at,
                   t.unit_number AS truck_unit_number, t.make AS truck_make,
                   t.model AS truck_model, t.year AS truck_year, t.status AS truck_status,
                   t.current_location AS truck_current_location,
                   t.fuel_capacity AS truck_fuel_capacity, t.max_weight AS truck_max_weight,
                   t.created_at AS truck_created_at, t.updated_at AS truck_updated_at
            FROM drivers d
            INNER JOIN trucks t ON t.id = d.truck_id
            WHERE d.status = ?1 AND t.status = ?2
            ORDER BY d.rowid ASC
            "#,
        )
        .bind(DriverStatus::Available.as_str())
        .bind(TruckStatus::Available.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            let driver = Self::row_to_driver(row)?;
            // 联表条件保证 d.truck_id 即车辆ID
            let truck = SqliteTruckRepository::row_to_truck(row, "truck_")?;
            pairs.push((driver, truck));
        }
        debug!("查询到 {} 名空闲司机", pairs.len());
        Ok(pairs)
    }

    #[instrument(skip(self), fields(driver_id = %id, status = %status))]
    async fn update_status(&self, id: &str, status: DriverStatus) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "司机", id = id);

        let result = sqlx::query("UPDATE drivers SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        if result.rows_affected() == 0 {
            return Err(FleetError::driver_not_found(id));
        }
        Ok(())
    }
}
