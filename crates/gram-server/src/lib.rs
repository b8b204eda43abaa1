//! gram-server library.
//!
//! axum HTTP surface over the gram-core services:
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /initiatives` | listing, newest first |
//! | `POST /initiatives` | multipart create |
//! | `POST /initiatives/vote/:id` | vote toggle |
//! | `GET`/`POST /initiatives/comment/:id` | comment list / append |
//! | `GET /initiatives/image/:id` | image URL |
//! | `GET /healthz` | liveness |
//!
//! Uploaded media is served from the configured `public_base_url` when that
//! is a local path.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use auth::AuthContext;
pub use error::ApiError;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Largest accepted request body, sized for an image upload.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Path under which media is served, if `public_base_url` is a local path.
fn media_mount(public_base_url: &str) -> Option<String> {
    let mount = public_base_url.trim_end_matches('/');
    (mount.starts_with('/') && mount.len() > 1).then(|| mount.to_string())
}

#[must_use]
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/initiatives",
            get(handlers::list_initiatives).post(handlers::create_initiative),
        )
        .route("/initiatives/vote/:id", post(handlers::toggle_vote))
        .route(
            "/initiatives/comment/:id",
            get(handlers::list_comments).post(handlers::append_comment),
        )
        .route("/initiatives/image/:id", get(handlers::image_url));

    if let Some(mount) = media_mount(&state.public_base_url) {
        router = router.nest_service(&mount, ServeDir::new(&state.media_dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    serve_with_shutdown(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    })
    .await
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, "gram server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    info!("gram server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::media_mount;

    #[test]
    fn media_is_mounted_only_for_local_paths() {
        assert_eq!(media_mount("/media"), Some("/media".to_string()));
        assert_eq!(media_mount("/media/"), Some("/media".to_string()));
        assert_eq!(media_mount("/"), None);
        assert_eq!(media_mount("https://cdn.example.org/gram"), None);
    }
}
