use clap::{Arg, Command};
use std::sync::Arc;

use rustgrid::core::config::{FeedCredentials, GlobalConfig};
use rustgrid::listener::{FileStrategyStore, Listener, LoggingTickHandler};
use rustgrid::utils::{init_global_logger, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenv::dotenv().ok();

    // 解析命令行参数
    let matches = Command::new("RustGrid")
        .version("0.1")
        .about("网格交易行情监听服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/config.yaml"),
        )
        .arg(
            Arg::new("strategies")
                .short('s')
                .long("strategies")
                .value_name("FILE")
                .help("初始策略文件路径")
                .default_value("config/strategies.yaml"),
        )
        .get_matches();

    let config_file = matches.get_one::<String>("config").unwrap();
    let strategies_file = matches.get_one::<String>("strategies").unwrap();

    // 加载全局配置
    let config = GlobalConfig::from_file(config_file)?;

    // 初始化统一日志系统
    let log_config = LogConfig {
        default_level: config.log_level.clone(),
        ..LogConfig::default()
    };
    init_global_logger(log_config).map_err(|e| anyhow::anyhow!("日志初始化失败: {}", e))?;

    log::info!(
        "启动行情监听服务: config={} strategies={}",
        config_file,
        strategies_file
    );

    // 行情源凭证与连接地址
    let credentials = FeedCredentials::from_env(&config.feed.token_env)?;
    let connect_url = config.feed.connect_url(&credentials)?;

    // 组合根：构造监听器并注入tick处理器
    let listener = Arc::new(Listener::new(
        connect_url,
        config.reconnect.clone(),
        Arc::new(LoggingTickHandler),
    ));

    // 加载初始活跃策略
    let store = FileStrategyStore::new(strategies_file.as_str());
    let seeded = listener.init(&store).await?;
    log::info!("✅ 已加载{}条活跃策略", seeded);

    // 建立连接并启动分发循环
    listener.start_listening().await?;

    // 等待退出信号
    tokio::signal::ctrl_c().await?;
    log::info!("收到退出信号，正在关停监听器");
    listener.shutdown().await;

    Ok(())
}
