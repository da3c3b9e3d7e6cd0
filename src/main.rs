use dropsync_lib::logging::{get_log_dir, LogConfig, SizeRotatingWriter};
use dropsync_lib::AppState;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 初始化日志系统
fn init_logging() {
    let log_dir = get_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let config = LogConfig::load(&log_dir);
    if !config.enabled {
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return;
    }

    let env_filter = EnvFilter::from_default_env()
        .add_directive(config.tracing_level().into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("sqlx=warn".parse().unwrap());

    match SizeRotatingWriter::new(&log_dir, config.max_size_mb) {
        Ok(file_writer) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false);

            // debug 模式下同时输出到控制台
            #[cfg(debug_assertions)]
            let console_layer = Some(tracing_subscriber::fmt::layer().with_target(false));
            #[cfg(not(debug_assertions))]
            let console_layer: Option<tracing_subscriber::fmt::Layer<_>> = None;

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(console_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        Err(e) => {
            // 文件日志创建失败，回退到控制台
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            tracing::warn!("无法创建日志文件: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let state = AppState::new().await?;
    let manager = state.manager()?;

    let report = manager.sync_all().await;
    state.cleanup().await;

    let report = report?;
    println!("{}", report.status);
    if report.pairs_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
