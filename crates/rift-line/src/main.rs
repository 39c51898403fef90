use anyhow::Context;
use clap::{Parser, ValueEnum};
use rift_line::admin_api::AdminApiServer;
use rift_line::{Config, DispatchStrategy, StubEngine, StubServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Scenario-scoped stub for line-oriented TCP protocols
#[derive(Parser, Debug)]
#[command(name = "rift-line", author, version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "RIFT_LINE_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for stubbed traffic (overrides listen.port)
    #[arg(short, long, env = "RIFT_LINE_PORT")]
    port: Option<u16>,

    /// Port for the admin API (overrides admin.port)
    #[arg(long, env = "RIFT_LINE_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Dispatch strategy (overrides dispatch.strategy)
    #[arg(long)]
    strategy: Option<DispatchStrategy>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(port) = args.admin_port {
        config.admin.port = port;
    }
    if let Some(strategy) = args.strategy {
        config.dispatch.strategy = strategy;
    }
    config.validate()?;
    Ok(config)
}

fn socket_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = load_config(&args)?;
    let engine = Arc::new(StubEngine::from_config(&config)?);

    let stub = StubServer::bind(
        socket_addr(&config.listen.host, config.listen.port)?,
        Arc::clone(&engine),
        config.listen.delimiter.clone(),
        config.listen.max_connections,
    )
    .await?
    .with_max_request_bytes(config.listen.max_request_bytes);
    let admin = AdminApiServer::bind(
        socket_addr(&config.admin.host, config.admin.port)?,
        Arc::clone(&engine),
    )
    .await?;

    tokio::select! {
        result = stub.run() => {
            if let Err(e) = &result {
                error!("Stub server stopped: {}", e);
            }
            result?;
        }
        result = admin.run() => {
            if let Err(e) = &result {
                error!("Admin API stopped: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    if engine.manager().session().active_scenario().is_some() {
        info!("Cancelling active scenario on shutdown");
        if let Err(e) = tokio::task::spawn_blocking(move || engine.cancel_scenario()).await? {
            error!("Failed to cancel scenario on shutdown: {}", e);
        }
    }
    Ok(())
}
