use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use fleet_domain::JobQueue;
use fleet_errors::FleetResult;
use metrics::counter;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;
/// 发布历史最多保留的条数，超出后丢弃最早的事件
const PUBLISHED_HISTORY: usize = 1024;

/// 内存任务队列
///
/// 列表语义与外部消息代理一致：`push` 追加到队尾，`pop` 从队首阻塞弹出。
/// 发布的事件转发给当前订阅者，并在有限长度的历史中保留最近的副本。
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    published: Mutex<VecDeque<(String, String)>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 某个频道上仍在历史中的已发布事件，按发布顺序
    pub async fn published(&self, channel: &str) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn len(&self, queue: &str) -> usize {
        self.lists.lock().await.get(queue).map_or(0, VecDeque::len)
    }

    pub async fn is_empty(&self, queue: &str) -> bool {
        self.len(queue).await == 0
    }

    async fn try_pop(&self, queue: &str) -> Option<String> {
        self.lists
            .lock()
            .await
            .get_mut(queue)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn pop(&self, queue: &str, timeout: Duration) -> FleetResult<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_pop(queue).await {
                return Ok(Some(payload));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn push(&self, queue: &str, payload: String) -> FleetResult<()> {
        self.lists
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
        counter!("fleet_jobs_enqueued_total", "queue" => queue.to_string()).increment(1);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> FleetResult<()> {
        {
            let mut published = self.published.lock().await;
            if published.len() == PUBLISHED_HISTORY {
                published.pop_front();
            }
            published.push_back((channel.to_string(), payload.clone()));
        }
        if let Some(sender) = self.channels.read().await.get(channel) {
            // 没有订阅者时发送失败，属于正常情况
            let _ = sender.send(payload);
        }
        counter!("fleet_events_published_total", "channel" => channel.to_string()).increment(1);
        debug!("已发布事件到频道 {}", channel);
        Ok(())
    }
}
