//! HTTP companion server.
//!
//! Serves the rendered quote sheet and editor, the JSON read/write
//! endpoints, and any static assets found under the configured root.

mod handlers;
mod middleware;
pub mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{ADMIN_PAGE, DATA_PATH, SAVE_PATH};
use crate::config::{Config, RenderConfig};
use crate::error::{Error, Result};
use crate::store::QuoteStore;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The quote document.
    pub store: Arc<QuoteStore>,
    /// Root static assets are served from.
    pub static_dir: Arc<PathBuf>,
    /// Page rendering options.
    pub render: Arc<RenderConfig>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    /// Build state from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            QuoteStore::new(config.data_file()),
            config.server.static_dir.clone(),
            config.render.clone(),
            config.server.max_body_bytes,
        )
    }

    /// Build state from its parts.
    #[must_use]
    pub fn new(
        store: QuoteStore,
        static_dir: PathBuf,
        render: RenderConfig,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            static_dir: Arc::new(static_dir),
            render: Arc::new(render),
            max_body_bytes,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Assemble the router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::quote_page))
        .route("/index.html", get(handlers::quote_page))
        .route("/quote", get(handlers::quote_page))
        .route(ADMIN_PAGE, get(handlers::editor_page))
        .route(
            "/editor",
            get(handlers::editor_page).post(handlers::editor_submit),
        )
        .route("/admin", get(handlers::admin_redirect))
        .route("/admin/", get(handlers::admin_redirect))
        .route(DATA_PATH, get(handlers::data))
        .route("/data.json", get(handlers::data))
        .route(SAVE_PATH, axum::routing::post(handlers::save))
        .fallback(handlers::static_asset)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(from_fn(middleware::cors_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing_middleware,
        ))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Returns [`Error::PortInUse`] when the port is taken, [`Error::Bind`] for
/// other bind failures, and [`Error::Io`] if the server stops abnormally.
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::bind(addr.clone(), config.server.port, source))?;
    let local = listener.local_addr()?;

    let state = AppState::from_config(config);
    if !state.static_dir.is_dir() {
        warn!(
            "Static directory {} does not exist; only rendered pages will be served",
            state.static_dir.display()
        );
    }
    info!("Data file: {}", state.store.path().display());
    log_banner(local, &config.public_url());

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

fn log_banner(local: SocketAddr, public_url: &str) {
    info!("Server listening on {}", local);
    info!("Quote sheet: {}/index.html", public_url);
    info!("Editor:      {}{}", public_url, ADMIN_PAGE);
    info!("Press Ctrl+C to stop");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!("Could not register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received");
}
