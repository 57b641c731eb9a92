use std::time::Duration;

use async_trait::async_trait;
use fleet_domain::JobQueue;
use fleet_errors::{FleetError, FleetResult};
use metrics::counter;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

/// 队列为空时两次 LPOP 之间的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Redis 任务队列
///
/// 任务列表用 RPUSH/LPOP，完成事件用 PUBLISH 广播。弹出在截止时间内轮询，
/// 不占用连接做阻塞等待，推送和发布因此不会被弹出拖住。
#[derive(Clone)]
pub struct RedisJobQueue {
    connection: ConnectionManager,
}

impl RedisJobQueue {
    pub async fn connect(url: &str) -> FleetResult<Self> {
        let client = Client::open(url)
            .map_err(|e| FleetError::Configuration(format!("无效的消息代理地址 {url}: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| FleetError::queue_error(format!("连接消息代理失败: {e}")))?;

        let queue = Self { connection };
        queue.ping().await?;
        info!("已连接消息代理");
        Ok(queue)
    }

    pub async fn ping(&self) -> FleetResult<()> {
        let mut conn = self.connection.clone();
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(response) if response == "PONG" => Ok(()),
            Ok(response) => {
                let message = format!("PING 返回异常响应: {response}");
                error!("{}", message);
                Err(FleetError::queue_error(message))
            }
            Err(e) => {
                let message = format!("PING 失败: {e}");
                error!("{}", message);
                Err(FleetError::queue_error(message))
            }
        }
    }

    async fn try_pop(&self, queue: &str) -> FleetResult<Option<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("LPOP")
            .arg(queue)
            .query_async(&mut conn)
            .await
            .map_err(|e| FleetError::queue_error(format!("LPOP {queue} 失败: {e}")))
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn pop(&self, queue: &str, timeout: Duration) -> FleetResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(payload) = self.try_pop(queue).await? {
                return Ok(Some(payload));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn push(&self, queue: &str, payload: String) -> FleetResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("RPUSH")
            .arg(queue)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| FleetError::queue_error(format!("RPUSH {queue} 失败: {e}")))?;
        counter!("fleet_jobs_enqueued_total", "queue" => queue.to_string()).increment(1);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> FleetResult<()> {
        let mut conn = self.connection.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| FleetError::queue_error(format!("PUBLISH {channel} 失败: {e}")))?;
        counter!("fleet_events_published_total", "channel" => channel.to_string()).increment(1);
        debug!("已发布事件到频道 {}，接收方 {} 个", channel, receivers);
        Ok(())
    }
}
