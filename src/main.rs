//! Front controller server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (request id, trace, timeout, body limit)
//!                         │
//!                         ▼
//!                    Dispatcher ──▶ static files
//!                         │
//!                         ├──▶ RouteRegistry ──▶ 404 / 405
//!                         ├──▶ AccessGuard ──▶ 302 login / access denied
//!                         ├──▶ ParameterResolver ──▶ Handler
//!                         ▼
//!     Client Response ◀── text | view | JSON envelope | handled
//! ```
//!
//! Routes come from `[[routes]]` in the configuration file, compiled against
//! the handlers of the bundled demo application. Without a configuration
//! file the demo's own route table is used.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use front_controller::config::{load_config, validation::validate_config, ConfigError};
use front_controller::observability::{logging, metrics};
use front_controller::{Dispatcher, FrontConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "front-controller")]
#[command(about = "Single-entry-point web dispatcher", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FrontConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if config.routes.is_empty() {
        config.routes = demo::default_routes();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "front-controller starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        context_path = %config.server.context_path,
        strict_methods = config.routing.strict_methods,
        static_root = ?config.static_files.root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(err) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %err,
                "Failed to parse metrics address"
            ),
        }
    }

    let catalog = demo::catalog(&config.security);
    let dispatcher = Dispatcher::from_catalog(&config, &catalog)?.with_views(Arc::new(demo::render_view));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    HttpServer::new(config, Arc::new(dispatcher))
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
