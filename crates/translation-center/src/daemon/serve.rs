//! Translation service daemon

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tracing::{error, info, warn};

use crate::{
    Layout,
    catalog::Catalog,
    config::ServiceConfig,
    daemon::logging,
    store::EntityStore,
    web::http::{self, HttpState},
};

/// Environment fallback for the HTTP token.
pub const TOKEN_ENV_KEY: &str = "TRANSLATION_CENTER_HTTP_TOKEN";

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind address for the HTTP API (e.g. 127.0.0.1:8080).
    #[arg(long, value_name = "ADDR")]
    pub http_bind: Option<SocketAddr>,
    /// Authentication token required for the HTTP API (fallback env TRANSLATION_CENTER_HTTP_TOKEN).
    #[arg(long, value_name = "TOKEN")]
    pub http_auth_token: Option<String>,
}

pub async fn run(layout: Layout, args: ServeArgs) -> Result<()> {
    layout.ensure()?;
    let _tracing_guard = logging::init_tracing(&layout.service_logs_dir())?;

    if let Err(err) = run_impl(layout, args).await {
        error!(error = ?err, "daemon terminated with error");
        return Err(err);
    }
    info!("daemon exited cleanly");
    Ok(())
}

async fn run_impl(layout: Layout, args: ServeArgs) -> Result<()> {
    let config = ServiceConfig::load_or_default(layout.service_config_path())?;
    let addr = match args.http_bind {
        Some(addr) => addr,
        None => config
            .http
            .bind
            .parse()
            .with_context(|| format!("invalid [http] bind address '{}'", config.http.bind))?,
    };
    let token = args
        .http_auth_token
        .or_else(|| std::env::var(TOKEN_ENV_KEY).ok())
        .or_else(|| config.http.auth_token.clone());

    let catalog = open_catalog(&layout, &config)?;
    let auth = http::HttpAuth::new(token);
    let auth_enabled = auth.is_enabled();
    let state = HttpState::new(catalog.clone(), config.seed, auth);
    let handle = http::spawn_http_server(state, addr).await?;

    info!(
        http_addr = %handle.addr(),
        auth = auth_enabled,
        persist = config.store.persist,
        translations = catalog.translations().count(),
        "daemon ready"
    );

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("received Ctrl+C, shutting down daemon");
        }
        Err(err) => {
            warn!(error = ?err, "failed to listen for Ctrl+C");
        }
    }

    handle.shutdown();
    if let Err(err) = catalog.store().compact() {
        warn!(error = ?err, "failed to compact catalog on shutdown");
    }
    info!("daemon stopped cleanly");
    Ok(())
}

/// Open the catalog described by `config`: backed by `data/catalog.json` when
/// persistence is on, purely in memory otherwise.
pub fn open_catalog(layout: &Layout, config: &ServiceConfig) -> Result<Catalog> {
    let store = if config.store.persist {
        EntityStore::open_with(layout.catalog_snapshot_path(), config.store.compact_after)?
    } else {
        EntityStore::in_memory()
    };
    Ok(Catalog::new(store))
}
