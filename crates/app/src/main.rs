use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marketboard_api::server::{AppState, start_server};
use marketboard_core::config::AppConfig;
use tracing::info;

mod bootstrap;

#[derive(Parser, Debug)]
#[command(name = "marketboard")]
#[command(about = "Homepage market board quote service", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径，不存在时使用默认值与环境变量
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// 启动 HTTP 服务 (默认)
    Serve,

    /// 执行一次聚合并将 JSON 输出到 stdout
    Snapshot {
        /// 格式化输出
        #[arg(long)]
        pretty: bool,
    },
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 解析命令行并加载配置。
/// 2. 初始化全局日志。
/// 3. 装配引擎（Feed 适配器注入 Market 聚合器）。
/// 4. 按子命令启动 HTTP 服务或输出一次快照。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. 加载配置
    let config = AppConfig::load(&cli.config)?;

    // 2. 初始化日志
    let _log_guard = bootstrap::init_logging(&config.log);
    info!("Marketboard starting with config {}", cli.config.display());

    // 3. 装配引擎
    let engine = bootstrap::build_engine(&config)?;

    // 4. 分发子命令
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let bind_addr = format!("{}:{}", config.server.host, config.server.port);
            start_server(AppState { engine }, &bind_addr).await?;
        }
        Command::Snapshot { pretty } => {
            let envelope = engine.snapshot().await;
            let output = if pretty {
                serde_json::to_string_pretty(&envelope)?
            } else {
                serde_json::to_string(&envelope)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
