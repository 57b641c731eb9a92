use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_domain::{AgentDefinition, AgentRepository, AgentStatus};
use fleet_errors::{FleetError, FleetResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

const AGENT_COLUMNS: &str = "id, name, kind, description, enabled, status, config, total_runs, \
     successful_runs, success_rate, last_run, next_run, created_at, updated_at";

pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> FleetResult<AgentDefinition> {
        Ok(AgentDefinition {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            description: row.try_get("description")?,
            enabled: row.try_get("enabled")?,
            status: MappingHelpers::parse_enum(row, "status")?,
            config: MappingHelpers::parse_json(row, "config")?,
            total_runs: row.try_get("total_runs")?,
            successful_runs: row.try_get("successful_runs")?,
            success_rate: row.try_get("success_rate")?,
            last_run: row.try_get("last_run")?,
            next_run: row.try_get("next_run")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    #[instrument(skip(self, definition), fields(agent_id = %definition.id, kind = %definition.kind))]
    async fn create(&self, definition: &AgentDefinition) -> FleetResult<AgentDefinition> {
        let context = repo_context!(RepositoryOperation::Create, "代理", id = &definition.id);

        let config_json = serde_json::to_string(&definition.config)
            .map_err(|e| RepositoryErrorHelpers::serialization_error(context.clone(), e))?;

        let sql = format!(
            "INSERT INTO agents ({AGENT_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
             RETURNING {AGENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&definition.id)
            .bind(&definition.name)
            .bind(&definition.kind)
            .bind(&definition.description)
            .bind(definition.enabled)
            .bind(definition.status.as_str())
            .bind(config_json)
            .bind(definition.total_runs)
            .bind(definition.successful_runs)
            .bind(definition.success_rate)
            .bind(definition.last_run)
            .bind(definition.next_run)
            .bind(definition.created_at)
            .bind(definition.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Self::row_to_agent(&row)?;
        RepositoryErrorHelpers::log_operation_success(&context, Some(&created.name));
        Ok(created)
    }

    #[instrument(skip(self), fields(agent_id = %id))]
    async fn find_by_id(&self, id: &str) -> FleetResult<Option<AgentDefinition>> {
        let context = repo_context!(RepositoryOperation::Read, "代理", id = id);

        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_agent).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> FleetResult<Vec<AgentDefinition>> {
        let context = repo_context!(RepositoryOperation::Query, "代理");

        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at ASC, rowid ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_agent).collect()
    }

    #[instrument(skip(self))]
    async fn find_enabled(&self) -> FleetResult<Vec<AgentDefinition>> {
        let context = repo_context!(RepositoryOperation::Query, "代理")
            .with_additional_info("enabled = 1");

        let sql = format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE enabled = 1 ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        let agents = rows
            .iter()
            .map(Self::row_to_agent)
            .collect::<FleetResult<Vec<_>>>()?;
        debug!("查询到 {} 个启用的代理定义", agents.len());
        Ok(agents)
    }

    #[instrument(skip(self), fields(agent_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
        last_run: Option<DateTime<Utc>>,
        next_run: Option<DateTime<Utc>>,
    ) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "代理", id = id);

        let result = sqlx::query(
            "UPDATE agents SET status = ?2, last_run = COALESCE(?3, last_run), next_run = ?4, \
             updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(last_run)
        .bind(next_run)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        if result.rows_affected() == 0 {
            return Err(FleetError::agent_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(agent_id = %id, success))]
    async fn record_outcome(&self, id: &str, success: bool) -> FleetResult<AgentDefinition> {
        let context = repo_context!(RepositoryOperation::Update, "代理", id = id)
            .with_additional_info("记录运行结果");

        // SET 右侧引用的都是更新前的列值
        let sql = format!(
            "UPDATE agents SET total_runs = total_runs + 1, \
             successful_runs = successful_runs + ?2, \
             success_rate = CAST(successful_runs + ?2 AS REAL) / (total_runs + 1), \
             updated_at = ?3 \
             WHERE id = ?1 RETURNING {AGENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(i64::from(success))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        match row {
            Some(row) => Self::row_to_agent(&row),
            None => Err(FleetError::agent_not_found(id)),
        }
    }

    #[instrument(skip(self), fields(agent_id = %id))]
    async fn clear_next_run(&self, id: &str) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Update, "代理", id = id);

        sqlx::query("UPDATE agents SET next_run = NULL, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;
        Ok(())
    }
}
