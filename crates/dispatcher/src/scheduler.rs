use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fleet_agents::{AgentHandler, RandomSource};
use fleet_config::{OverlapPolicy, SchedulerConfig};
use fleet_domain::FleetStore;
use fleet_errors::{FleetError, FleetResult};
use metrics::{counter, histogram};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{interval_at, sleep, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::registry::AgentRegistry;

/// 调度器运行参数
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub startup_jitter: Duration,
    pub overlap_policy: OverlapPolicy,
    pub shutdown_timeout: Duration,
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            startup_jitter: Duration::from_millis(config.startup_jitter_ms),
            overlap_policy: config.overlap_policy,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_seconds),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// 单个代理的调度条目
#[derive(Debug, Clone)]
struct ScheduleEntry {
    handler: Arc<AgentHandler>,
    /// 容量为 1 的互斥槽，同一代理同时只有一次运行
    guard: Arc<Semaphore>,
    /// 是否已有一次触发在排队等待
    queued: Arc<AtomicBool>,
}

impl ScheduleEntry {
    fn new(handler: Arc<AgentHandler>) -> Self {
        Self {
            handler,
            guard: Arc::new(Semaphore::new(1)),
            queued: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// 各驱动任务共享的调度控制
#[derive(Debug, Clone)]
struct TickControl {
    token: CancellationToken,
    tracker: TaskTracker,
    policy: OverlapPolicy,
}

/// 代理调度器
///
/// 每个代理一个驱动任务：先按随机错峰延迟运行一次，之后以注册时刻为锚点
/// 按固定间隔触发。`stop()` 返回后不会再有新的运行开始。
pub struct AgentScheduler {
    entries: Vec<ScheduleEntry>,
    store: FleetStore,
    settings: SchedulerSettings,
    random: Arc<dyn RandomSource>,
    token: CancellationToken,
    tracker: TaskTracker,
    state: Mutex<SchedulerState>,
}

impl AgentScheduler {
    pub fn new(
        registry: &AgentRegistry,
        store: FleetStore,
        settings: SchedulerSettings,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let entries = registry
            .handlers()
            .cloned()
            .map(ScheduleEntry::new)
            .collect();
        Self {
            entries,
            store,
            settings,
            random,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn agent_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_running(&self) -> bool {
        self.current_state() == SchedulerState::Running
    }

    fn current_state(&self) -> SchedulerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn transition(&self, from: SchedulerState, to: SchedulerState) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// 为每个代理启动驱动任务，重复调用会被拒绝
    pub fn start(&self) -> FleetResult<()> {
        if !self.transition(SchedulerState::Idle, SchedulerState::Running) {
            warn!("调度器已启动或已停止，忽略重复的启动请求");
            return Err(FleetError::Internal("调度器已启动或已停止".to_string()));
        }

        let control = TickControl {
            token: self.token.clone(),
            tracker: self.tracker.clone(),
            policy: self.settings.overlap_policy,
        };
        let registered_at = tokio::time::Instant::now();

        for entry in &self.entries {
            let jitter = self.jitter();
            let period = entry.handler.interval();
            info!(
                agent_id = %entry.handler.id(),
                kind = %entry.handler.kind(),
                interval_secs = period.as_secs(),
                jitter_ms = jitter.as_millis() as u64,
                "调度代理: {}",
                entry.handler.name()
            );

            let entry = entry.clone();
            let control = control.clone();
            self.tracker.spawn(async move {
                Self::drive(entry, control, registered_at, jitter).await;
            });
        }

        info!("调度器已启动，共 {} 个代理", self.entries.len());
        Ok(())
    }

    fn jitter(&self) -> Duration {
        let window = self.settings.startup_jitter.as_millis() as f64;
        if window <= 0.0 {
            return Duration::ZERO;
        }
        // unit() 取值 [0, 1)，结果落在 [0, window)
        let millis = (self.random.unit() * window).min(window - 1.0).max(0.0);
        Duration::from_millis(millis as u64)
    }

    async fn drive(
        entry: ScheduleEntry,
        control: TickControl,
        registered_at: tokio::time::Instant,
        jitter: Duration,
    ) {
        let period = entry.handler.interval();
        let mut ticker = interval_at(registered_at + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::select! {
            biased;
            _ = control.token.cancelled() => return,
            _ = sleep(jitter) => Self::dispatch(&entry, &control),
        }

        loop {
            tokio::select! {
                biased;
                _ = control.token.cancelled() => break,
                _ = ticker.tick() => Self::dispatch(&entry, &control),
            }
        }
        debug!(agent_id = %entry.handler.id(), "代理驱动任务退出");
    }

    /// 处理一次触发：取得互斥槽则立即运行，否则按重叠策略丢弃或排队
    fn dispatch(entry: &ScheduleEntry, control: &TickControl) {
        if control.token.is_cancelled() {
            return;
        }

        match entry.guard.clone().try_acquire_owned() {
            Ok(permit) => {
                let handler = entry.handler.clone();
                control.tracker.spawn(async move {
                    Self::run_once(&handler, permit).await;
                });
            }
            Err(_) if control.policy == OverlapPolicy::Queue
                && !entry.queued.swap(true, Ordering::SeqCst) =>
            {
                debug!(agent_id = %entry.handler.id(), "上一次运行未结束，触发进入等待");
                let entry = entry.clone();
                let token = control.token.clone();
                control.tracker.spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        permit = entry.guard.clone().acquire_owned() => permit.ok(),
                    };
                    entry.queued.store(false, Ordering::SeqCst);
                    // 等待期间可能已经停止
                    if let Some(permit) = permit {
                        if !token.is_cancelled() {
                            Self::run_once(&entry.handler, permit).await;
                        }
                    }
                });
            }
            Err(_) => {
                warn!(
                    agent_id = %entry.handler.id(),
                    kind = %entry.handler.kind(),
                    "代理 {} 上一次运行尚未结束，跳过本次触发",
                    entry.handler.name()
                );
                counter!("fleet_agent_ticks_skipped_total", "kind" => entry.handler.kind().as_str())
                    .increment(1);
            }
        }
    }

    async fn run_once(handler: &AgentHandler, _permit: OwnedSemaphorePermit) {
        let kind = handler.kind().as_str();
        let started = Instant::now();
        let outcome = handler.run().await;
        let elapsed_ms = started.elapsed().as_millis() as f64;

        let label = if outcome.success { "success" } else { "failure" };
        counter!("fleet_agent_runs_total", "kind" => kind, "outcome" => label).increment(1);
        histogram!("fleet_agent_run_duration_ms", "kind" => kind).record(elapsed_ms);
        debug!(
            agent_id = %handler.id(),
            kind,
            success = outcome.success,
            elapsed_ms,
            "代理运行结束"
        );
    }

    /// 停止调度：取消令牌，等待进行中的运行结束，依次清理代理，最后关闭存储
    pub async fn stop(&self) -> FleetResult<()> {
        let was_running = self.transition(SchedulerState::Running, SchedulerState::Stopped);
        let was_idle = !was_running && self.transition(SchedulerState::Idle, SchedulerState::Stopped);
        if !was_running && !was_idle {
            debug!("调度器已停止，忽略重复的停止请求");
            return Ok(());
        }

        info!("正在停止调度器...");
        self.token.cancel();
        self.tracker.close();
        if timeout(self.settings.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.settings.shutdown_timeout.as_secs(),
                "等待进行中的代理运行超时，继续关闭"
            );
        }

        for entry in &self.entries {
            if let Err(e) = entry.handler.cleanup().await {
                warn!(agent_id = %entry.handler.id(), error = %e, "代理清理失败");
            }
        }

        if let Err(e) = self.store.lifecycle.close().await {
            error!(error = %e, "关闭存储连接失败");
            return Err(e);
        }

        info!("调度器已停止");
        Ok(())
    }
}
