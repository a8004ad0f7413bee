use std::path::{Path, PathBuf};

use clap::Parser;

use gemini_server::config::{self, ServerConfig};
use gemini_server::files::{serve_files, MimeTypes};
use gemini_server::lifecycle::signals;
use gemini_server::middleware::stages;
use gemini_server::net::tls;
use gemini_server::observability::logging;
use gemini_server::routing::{build_routes, Route};
use gemini_server::server::GeminiServer;

/// Gemini protocol server serving a static capsule.
#[derive(Debug, Parser)]
#[command(name = "gemini-server", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gemini.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        config::load_config(&args.config)?
    } else {
        ServerConfig::default()
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        content_root = %config.content.root,
        "configuration loaded"
    );

    let acceptor = tls::load_tls_config(
        Path::new(&config.tls.cert_path),
        Path::new(&config.tls.key_path),
        config.listener.request_client_certificates,
    )?;

    let mime = MimeTypes::new(config.content.default_mime_type.clone())
        .with_overrides(&config.content.mime_types);

    let routes = build_routes(vec![Route::new("/")
        .fallback(serve_files(
            config.content.root.clone(),
            config.content.index_file.clone(),
            mime,
        ))
        .middleware(stages::log_requests())])?;

    let handle = GeminiServer::new(acceptor, routes.into_handler())
        .bind_address(config.listener.bind_address.clone())
        .max_connections(config.listener.max_connections)
        .drain_timeout(std::time::Duration::from_secs(
            config.shutdown.drain_timeout_secs,
        ))
        .linger(std::time::Duration::from_millis(config.listener.linger_ms))
        .bind()
        .await?;

    signals::shutdown_signal().await;
    handle.shutdown();
    handle.stopped().await;

    tracing::info!("shutdown complete");
    Ok(())
}
