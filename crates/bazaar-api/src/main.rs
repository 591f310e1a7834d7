use bazaar_api::config::Config;
use bazaar_api::notify::Notifier;
use bazaar_api::state::AppState;
use bazaar_api::{app, shutdown_signal};
use bazaar_store::MemoryStore;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    });

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|e| {
        eprintln!("invalid BAZAAR_LOG {:?}: {e}, falling back to info", config.log);
        EnvFilter::new("info")
    });
    fmt().with_env_filter(filter).init();

    let notifier = Notifier::init(config.push.clone());
    let state = AppState::new(MemoryStore::new(), notifier);
    let app = app(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.api_addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("failed to bind {}: {e}", config.api_addr);
            std::process::exit(1);
        });

    info!("bazaar-api listening on {}", config.api_addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        std::process::exit(1);
    }
    info!("bazaar-api stopped");
}
