use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_config::WorkerConfig;
use fleet_domain::{
    AgentJob, AgentReply, ConversationMessage, ConversationRepository, JobCompleted, JobFailed,
    JobQueue,
};
use fleet_errors::{FleetError, FleetResult};
use metrics::counter;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// 弹出失败后的退避时长
const POP_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub queue_name: String,
    pub completed_channel: String,
    pub failed_channel: String,
    pub concurrency: usize,
    pub pop_timeout: Duration,
}

impl From<&WorkerConfig> for WorkerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            queue_name: config.queue_name.clone(),
            completed_channel: config.completed_channel.clone(),
            failed_channel: config.failed_channel.clone(),
            concurrency: config.concurrency.max(1),
            pop_timeout: Duration::from_secs(config.pop_timeout_seconds),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

/// 会话任务 Worker，克隆后共享队列、存储与并发槽
#[derive(Clone)]
pub struct AgentJobWorker {
    queue: Arc<dyn JobQueue>,
    conversations: Arc<dyn ConversationRepository>,
    settings: WorkerSettings,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl AgentJobWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        conversations: Arc<dyn ConversationRepository>,
        settings: WorkerSettings,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(settings.concurrency.max(1)));
        Self {
            queue,
            conversations,
            settings,
            slots,
            tracker: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// 主循环：直到令牌取消为止持续弹出任务，退出前等待进行中的任务完成
    pub async fn run(&self, token: CancellationToken) {
        info!(
            queue = %self.settings.queue_name,
            concurrency = self.settings.concurrency,
            "会话任务Worker已启动"
        );

        loop {
            // 先占用并发槽再弹出，避免弹出后无法处理
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                permit = self.slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let popped = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                popped = self.queue.pop(&self.settings.queue_name, self.settings.pop_timeout) => popped,
            };

            match popped {
                Ok(Some(payload)) => {
                    let worker = self.clone();
                    self.tracker.spawn(async move {
                        worker.process_payload(&payload).await;
                        drop(permit);
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "从队列弹出任务失败");
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = sleep(POP_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!("会话任务Worker正在停止，等待进行中的任务完成");
        self.tracker.close();
        self.tracker.wait().await;
        info!("会话任务Worker已停止");
    }

    /// 处理一条原始任务，格式错误的任务记录后丢弃
    pub async fn process_payload(&self, payload: &str) {
        let job: AgentJob = match serde_json::from_str(payload) {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "无法解析会话任务，已丢弃");
                counter!("fleet_worker_jobs_total", "outcome" => "malformed").increment(1);
                return;
            }
        };

        debug!(task_id = %job.id, conversation_id = %job.conversation_id, "开始处理会话任务");
        match self.handle(&job).await {
            Ok(reply) => {
                counter!("fleet_worker_jobs_total", "outcome" => "completed").increment(1);
                let event = JobCompleted {
                    task_id: job.id.clone(),
                    result: reply,
                };
                self.publish(&self.settings.completed_channel, &event).await;
                info!(task_id = %job.id, "会话任务处理完成");
            }
            Err(e) => {
                counter!("fleet_worker_jobs_total", "outcome" => "failed").increment(1);
                warn!(task_id = %job.id, error = %e, "会话任务处理失败");
                let event = JobFailed {
                    task_id: job.id.clone(),
                    error: e.to_string(),
                };
                self.publish(&self.settings.failed_channel, &event).await;
            }
        }
    }

    async fn handle(&self, job: &AgentJob) -> FleetResult<AgentReply> {
        let reply = Self::respond(job);
        self.conversations
            .append(&ConversationMessage::assistant(
                &job.conversation_id,
                reply.response.clone(),
            ))
            .await?;
        Ok(reply)
    }

    /// 占位回复，未接入实际的模型服务
    fn respond(job: &AgentJob) -> AgentReply {
        AgentReply {
            response: format!("AI Agent response for: {}", job.prompt),
            timestamp: Utc::now(),
        }
    }

    async fn publish<T: Serialize>(&self, channel: &str, event: &T) {
        let result = match serde_json::to_string(event) {
            Ok(payload) => self.queue.publish(channel, payload).await,
            Err(e) => Err(FleetError::from(e)),
        };
        if let Err(e) = result {
            error!(channel, error = %e, "发布任务事件失败");
        }
    }
}
