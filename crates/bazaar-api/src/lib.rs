pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod input;
pub mod notify;
pub mod params;
pub mod routes;
pub mod state;
pub mod wire;

use std::time::Duration;

use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, Method};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{ROLE_HEADER, USER_HEADER};
use crate::config::{AllowedOrigins, Config};
use crate::state::AppState;

/// The full HTTP application: routes, request tracing and CORS.
pub fn app(state: AppState, config: &Config) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.allowed_origins))
        .with_state(state)
}

fn cors(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => AllowOrigin::list(list.clone()),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(USER_HEADER),
            HeaderName::from_static(ROLE_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60))
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!("failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
