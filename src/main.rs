//! URL relay.
//!
//! ```text
//!  client ── GET /https://site/page ──▶ relay ── GET /page ─────▶ site
//!  client ◀── links now point at ───── relay ◀── HTML / M3U8 ─── site
//!             http://relay/https://site/...
//! ```
//!
//! With no `--config`, defaults are used and the relay listens on `0.0.0.0:8080`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use url_relay::config::{load_config, validation::validate_config, ConfigError, LogFormat, RelayConfig};
use url_relay::http::HttpServer;
use url_relay::lifecycle::Shutdown;
use url_relay::net::load_tls_config;
use url_relay::observability::init_logging;

#[derive(Parser)]
#[command(name = "url-relay", version)]
#[command(about = "Forward relay that rewrites HTML and HLS links back through itself", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_format` (pretty or json).
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);

    tracing::info!("url-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        follow_redirects = config.upstream.follow_redirects,
        request_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
