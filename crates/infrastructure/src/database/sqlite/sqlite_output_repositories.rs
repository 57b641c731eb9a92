//! 代理产出的记录：通知、指标、合规事件和会话消息

use async_trait::async_trait;
use fleet_domain::{
    AgentMetric, ComplianceEvent, ComplianceRepository, ConversationMessage,
    ConversationRepository, MetricRepository, Notification, NotificationRepository,
};
use fleet_errors::FleetResult;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    repo_context,
};

const NOTIFICATION_COLUMNS: &str =
    "id, title, message, type, priority, agent_id, read, created_at";
const METRIC_COLUMNS: &str = "id, agent_id, metric_name, value, recorded_at";
const COMPLIANCE_COLUMNS: &str =
    "id, driver_id, event_type, severity, description, due_date, resolved, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, created_at";

pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> FleetResult<Notification> {
        Ok(Notification {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            notification_type: MappingHelpers::parse_enum(row, "type")?,
            priority: MappingHelpers::parse_enum(row, "priority")?,
            agent_id: row.try_get("agent_id")?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    #[instrument(skip(self, notification), fields(
        title = %notification.title,
        notification_type = %notification.notification_type,
        priority = %notification.priority,
    ))]
    async fn create(&self, notification: &Notification) -> FleetResult<Notification> {
        let context = repo_context!(RepositoryOperation::Create, "通知", id = &notification.id);

        sqlx::query(
            "INSERT INTO notifications (id, title, message, type, priority, agent_id, read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .bind(notification.priority.as_str())
        .bind(&notification.agent_id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        Ok(notification.clone())
    }

    #[instrument(skip(self), fields(agent_id = %agent_id))]
    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<Notification>> {
        let context = repo_context!(RepositoryOperation::Query, "通知");

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE agent_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    #[instrument(skip(self))]
    async fn find_recent(&self, limit: i64) -> FleetResult<Vec<Notification>> {
        let context = repo_context!(RepositoryOperation::Query, "通知");

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_notification).collect()
    }
}

pub struct SqliteMetricRepository {
    pool: SqlitePool,
}

impl SqliteMetricRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricRepository for SqliteMetricRepository {
    #[instrument(skip(self, metric), fields(agent_id = %metric.agent_id, metric = %metric.metric_name))]
    async fn record(&self, metric: &AgentMetric) -> FleetResult<()> {
        let context = repo_context!(RepositoryOperation::Create, "代理指标", id = &metric.id);

        sqlx::query(
            "INSERT INTO agent_metrics (id, agent_id, metric_name, value, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&metric.id)
        .bind(&metric.agent_id)
        .bind(&metric.metric_name)
        .bind(metric.value)
        .bind(metric.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(agent_id = %agent_id))]
    async fn find_by_agent(&self, agent_id: &str) -> FleetResult<Vec<AgentMetric>> {
        let context = repo_context!(RepositoryOperation::Query, "代理指标");

        let sql = format!(
            "SELECT {METRIC_COLUMNS} FROM agent_metrics WHERE agent_id = ?1 \
             ORDER BY recorded_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter()
            .map(|row| -> FleetResult<AgentMetric> {
                Ok(AgentMetric {
                    id: row.try_get("id")?,
                    agent_id: row.try_get("agent_id")?,
                    metric_name: row.try_get("metric_name")?,
                    value: row.try_get("value")?,
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect()
    }
}

pub struct SqliteComplianceRepository {
    pool: SqlitePool,
}

impl SqliteComplianceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> FleetResult<ComplianceEvent> {
        Ok(ComplianceEvent {
            id: row.try_get("id")?,
            driver_id: row.try_get("driver_id")?,
            event_type: MappingHelpers::parse_enum(row, "event_type")?,
            severity: MappingHelpers::parse_enum(row, "severity")?,
            description: row.try_get("description")?,
            due_date: row.try_get("due_date")?,
            resolved: row.try_get("resolved")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ComplianceRepository for SqliteComplianceRepository {
    #[instrument(skip(self, event), fields(
        driver_id = %event.driver_id,
        event_type = %event.event_type,
        severity = %event.severity,
    ))]
    async fn create(&self, event: &ComplianceEvent) -> FleetResult<ComplianceEvent> {
        let context = repo_context!(RepositoryOperation::Create, "合规事件", id = &event.id);

        let sql = format!(
            "INSERT INTO compliance_events ({COMPLIANCE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {COMPLIANCE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&event.id)
            .bind(&event.driver_id)
            .bind(event.event_type.as_str())
            .bind(event.severity.as_str())
            .bind(&event.description)
            .bind(event.due_date)
            .bind(event.resolved)
            .bind(event.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        Self::row_to_event(&row)
    }

    #[instrument(skip(self), fields(driver_id = %driver_id))]
    async fn find_by_driver(&self, driver_id: &str) -> FleetResult<Vec<ComplianceEvent>> {
        let context = repo_context!(RepositoryOperation::Query, "合规事件");

        let sql = format!(
            "SELECT {COMPLIANCE_COLUMNS} FROM compliance_events WHERE driver_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_event).collect()
    }
}

pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id, role = %message.role))]
    async fn append(&self, message: &ConversationMessage) -> FleetResult<ConversationMessage> {
        let context = repo_context!(RepositoryOperation::Create, "会话消息", id = &message.id);

        sqlx::query(&format!(
            "INSERT INTO conversation_messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
        ))
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        Ok(message.clone())
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> FleetResult<Vec<ConversationMessage>> {
        let context = repo_context!(RepositoryOperation::Query, "会话消息");

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM conversation_messages WHERE conversation_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter()
            .map(|row| -> FleetResult<ConversationMessage> {
                Ok(ConversationMessage {
                    id: row.try_get("id")?,
                    conversation_id: row.try_get("conversation_id")?,
                    role: row.try_get("role")?,
                    content: row.try_get("content")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
