use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_agents::{RandomSource, SystemRandom};
use fleet_config::AppConfig;
use fleet_dispatcher::{AgentRegistry, AgentScheduler, SchedulerSettings};
use fleet_domain::{FleetStore, JobQueue};
use fleet_infrastructure::{DatabaseManager, InMemoryJobQueue, RedisJobQueue};
use fleet_worker::{AgentJobWorker, WorkerSettings};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::seed::seed_demo_data;
use crate::shutdown::ShutdownManager;

/// 强制关闭时等待连接池释放的上限
const FORCE_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行代理调度
    Agents,
    /// 仅运行会话任务Worker
    Worker,
    /// 运行所有组件
    All,
    /// 写入演示数据后退出
    Seed,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    database: DatabaseManager,
    store: FleetStore,
    queue: Arc<dyn JobQueue>,
}

impl Application {
    /// 连接数据库并完成迁移，数据库不可用时直接返回错误
    ///
    /// Worker 所在的模式按 `worker.broker_url` 连接消息代理，未配置时使用进程内队列。
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        let needs_broker = matches!(mode, AppMode::Worker | AppMode::All);
        let queue: Arc<dyn JobQueue> = match &config.worker.broker_url {
            Some(url) if needs_broker => Arc::new(
                RedisJobQueue::connect(url)
                    .await
                    .context("连接消息代理失败")?,
            ),
            _ => {
                if needs_broker {
                    info!("未配置消息代理，使用进程内任务队列");
                }
                Arc::new(InMemoryJobQueue::new())
            }
        };
        Self::with_queue(config, mode, queue).await
    }

    /// 使用给定的任务队列初始化
    pub async fn with_queue(
        config: AppConfig,
        mode: AppMode,
        queue: Arc<dyn JobQueue>,
    ) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        let database = DatabaseManager::connect(&config.database)
            .await
            .context("连接数据库失败")?;
        database.run_migrations().await.context("执行数据库迁移失败")?;

        if let Some(addr) = &config.observability.metrics_listen_addr {
            install_metrics_exporter(addr)?;
        }

        let store = database.store();
        Ok(Self {
            config,
            mode,
            database,
            store,
            queue,
        })
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    /// 优雅关闭超时后直接关闭存储，仍在运行的任务随进程退出
    pub async fn force_close(&self) {
        error!("应用关闭超时，强制关闭存储连接");
        match tokio::time::timeout(FORCE_CLOSE_TIMEOUT, self.store.lifecycle.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("关闭存储连接失败: {}", e),
            Err(_) => error!("关闭存储连接超时，仍有连接未释放"),
        }
    }

    /// 运行应用程序，直到关闭信号到达（seed 模式写完即返回）
    pub async fn run(&self, shutdown: &ShutdownManager) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Agents => self.run_agents(shutdown.token()).await,
            AppMode::Worker => self.run_worker(shutdown.token()).await,
            AppMode::All => self.run_all_components(shutdown.token()).await,
            AppMode::Seed => self.run_seed().await,
        }
    }

    async fn run_seed(&self) -> Result<()> {
        let summary = seed_demo_data(&self.store)
            .await
            .context("写入演示数据失败")?;
        if summary.is_empty() {
            info!("数据库已初始化，未写入新数据");
        }
        self.store.lifecycle.close().await?;
        Ok(())
    }

    async fn run_agents(&self, token: CancellationToken) -> Result<()> {
        let scheduler = self.start_scheduler().await?;

        token.cancelled().await;
        info!("收到关闭信号，停止代理调度器");

        scheduler.stop().await.context("停止代理调度器失败")?;
        Ok(())
    }

    async fn run_worker(&self, token: CancellationToken) -> Result<()> {
        let worker = self.build_worker();
        worker.run(token).await;

        self.store.lifecycle.close().await?;
        Ok(())
    }

    async fn run_all_components(&self, token: CancellationToken) -> Result<()> {
        info!("启动所有组件");

        let scheduler = if self.config.scheduler.enabled {
            Some(self.start_scheduler().await?)
        } else {
            warn!("代理调度被禁用，跳过调度器");
            None
        };

        let worker_handle = if self.config.worker.enabled {
            let worker = self.build_worker();
            let worker_token = token.child_token();
            Some(tokio::spawn(async move { worker.run(worker_token).await }))
        } else {
            info!("Worker被禁用，跳过会话任务处理");
            None
        };

        token.cancelled().await;
        info!("收到关闭信号，停止所有组件");

        // Worker 先排空，调度器停止时会关闭存储
        if let Some(handle) = worker_handle {
            if let Err(e) = handle.await {
                error!("Worker任务异常退出: {}", e);
            }
        }

        match scheduler {
            Some(scheduler) => scheduler.stop().await.context("停止代理调度器失败")?,
            None => self.store.lifecycle.close().await?,
        }

        info!("所有组件已停止");
        Ok(())
    }

    async fn start_scheduler(&self) -> Result<AgentScheduler> {
        let random: Arc<dyn RandomSource> = Arc::new(SystemRandom);
        let registry =
            AgentRegistry::load(&self.store, &self.config.scheduler.intervals, random.clone())
                .await
                .context("加载代理定义失败")?;
        if registry.is_empty() {
            warn!("没有可调度的代理，可先以 seed 模式写入演示数据");
        }

        let scheduler = AgentScheduler::new(
            &registry,
            self.store.clone(),
            SchedulerSettings::from(&self.config.scheduler),
            random,
        );
        scheduler.start().context("启动代理调度器失败")?;

        info!("代理调度器已启动，代理数量: {}", scheduler.agent_count());
        Ok(scheduler)
    }

    fn build_worker(&self) -> AgentJobWorker {
        AgentJobWorker::new(
            self.queue.clone(),
            self.store.conversations.clone(),
            WorkerSettings::from(&self.config.worker),
        )
    }
}

fn install_metrics_exporter(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("无效的指标监听地址: {addr}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("安装Prometheus指标导出器失败")?;

    info!("Prometheus指标导出器已启动: http://{}/metrics", addr);
    Ok(())
}
