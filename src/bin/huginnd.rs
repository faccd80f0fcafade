//! huginnd — Huginn daemon.
//!
//! Serves prompt-test websocket sessions and the cached prompt-config API
//! over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use huginn::cache::{CacheStore, MemoryStore};
use huginn::server::config::{Config, Secrets};
use huginn::upstream::{GrpcUpstream, JwtIssuer};
use huginn::{Huginn, HuginnError};

/// Huginn daemon — prompt testing relay and prompt config cache.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn prompt testing daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let huginn = build_huginn(&config, &secrets).await?;

    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;

    info!(version = huginn::version_string(), %addr, "huginnd starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, huginn::server::router(huginn.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    huginn.shutdown().await;
    Ok(())
}

/// Build the service container from configuration.
async fn build_huginn(config: &Config, secrets: &Secrets) -> Result<Huginn, HuginnError> {
    let secret = secrets.jwt_secret().ok_or_else(|| {
        HuginnError::Configuration(format!(
            "No JWT secret configured. Set [jwt] secret in secrets.toml or {}",
            huginn::server::config::JWT_SECRET_ENV
        ))
    })?;
    let issuer = JwtIssuer::new(secret.as_bytes())?.ttl(config.session.credential_ttl());

    let upstream = GrpcUpstream::new(
        config.upstream.address.clone(),
        config.upstream.connect_timeout(),
    )?;

    Huginn::builder()
        .cache_store(cache_store(config).await?)
        .upstream(Arc::new(upstream))
        .credentials(Arc::new(issuer))
        .session(config.session.session_config())
        .request_config_ttl(config.cache.request_config_ttl())
        .build()
}

async fn cache_store(config: &Config) -> Result<Arc<dyn CacheStore>, HuginnError> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.cache.redis_url {
        let mut store = huginn::cache::RedisStore::connect(url).await?;
        if let Some(prefix) = &config.cache.key_prefix {
            store = store.with_prefix(prefix.clone());
        }
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "redis"))]
    if config.cache.redis_url.is_some() {
        tracing::warn!("redis_url is set but huginnd was built without the redis feature");
    }

    info!(max_entries = config.cache.max_entries, "using in-process cache store");
    Ok(Arc::new(MemoryStore::with_max_entries(config.cache.max_entries)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
