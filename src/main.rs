// Main entry point: one binary, one subcommand per role

use anyhow::Context;
use clap::{Parser, Subcommand};
use elicitation_relay::api::create_router;
use elicitation_relay::config::{Config, Role};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "elicitation-relay", version, about = "File-upload elicitation over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// JSON-RPC capability server handing out the upload URL
    CapabilityServer,
    /// Chat-facing requester that calls the capability server
    Requester,
    /// Transfer endpoint accepting multipart uploads
    Transfer,
}

impl From<Command> for Role {
    fn from(command: Command) -> Self {
        match command {
            Command::CapabilityServer => Role::CapabilityServer,
            Command::Requester => Role::Requester,
            Command::Transfer => Role::Transfer,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let role = Role::from(cli.command);

    // Load and validate configuration first (before any logging)
    let config = Config::from_env(role).context("Configuration error")?;

    // Tracing panics if init() is called twice
    init_tracing(&config)?;

    info!(
        role = %role,
        bind_address = %config.bind_address,
        port = config.port,
        "Configuration loaded"
    );

    let router = create_router(&config).await.map_err(|e| {
        error!(error = %e, "Failed to build router");
        e
    })?;

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind to address");
        e
    })?;

    info!(addr = %addr, role = %role, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = parse_log_level(&config.log_level).map_err(anyhow::Error::msg)?;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> Result<tracing::Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => Err(format!("Invalid log level: {}", level)),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
