use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use fleet_config::AppConfig;
use fleet_dispatch::app::{AppMode, Application};
use fleet_dispatch::common::{init_logging, parse_app_mode, wait_for_shutdown_signal};
use fleet_dispatch::shutdown::ShutdownManager;
use tracing::{error, info};

/// 调度器排空之外，留给其余组件的关闭时间
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn cli() -> Command {
    Command::new("fleet-dispatch")
        .version("1.0.0")
        .about("货运调度智能代理运行器")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时按默认路径查找"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("运行模式")
                .value_parser(["agents", "worker", "all", "seed"])
                .default_value("agents"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("缺少命令行参数: {name}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let mode_str = arg(&matches, "mode")?;
    let log_level = arg(&matches, "log-level")?;
    let log_format = arg(&matches, "log-format")?;

    init_logging(log_level, log_format)?;

    info!("启动货运调度代理运行器");
    info!("配置文件: {}", config_path.unwrap_or("(默认路径)"));
    info!("运行模式: {mode_str}");

    let config = AppConfig::load(config_path).context("加载配置失败")?;
    let app_mode = parse_app_mode(mode_str, &config)?;
    let shutdown_timeout =
        Duration::from_secs(config.scheduler.shutdown_timeout_seconds) + SHUTDOWN_GRACE;

    let app = Arc::new(Application::new(config, app_mode).await?);
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::clone(&app);
        let shutdown_manager = shutdown_manager.clone();
        tokio::spawn(async move { app.run(&shutdown_manager).await })
    };

    // seed 模式写完即结束，其余模式一直运行到收到信号
    let finished = tokio::select! {
        result = &mut app_handle => Some(result),
        _ = wait_for_shutdown_signal() => None,
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown_manager.shutdown();
            match tokio::time::timeout(shutdown_timeout, app_handle).await {
                Ok(result) => result,
                Err(_) => {
                    app.force_close().await;
                    anyhow::bail!("应用未能在 {} 秒内完成关闭", shutdown_timeout.as_secs());
                }
            }
        }
    };

    match result {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => {
            error!("应用运行失败: {e:#}");
            return Err(e);
        }
        Err(e) => error!("应用任务异常退出: {e}"),
    }

    if app_mode == AppMode::Seed {
        info!("演示数据写入流程结束");
    }
    info!("货运调度代理运行器已退出");
    Ok(())
}
