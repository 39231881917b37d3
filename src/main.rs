use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use icta_portal_server::{app, netmon, AppState, Config, RealtimeHub, ReportsClient, Store, StoreRole};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icta_portal_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ICTA Admin Portal Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // One store per credential tier; privileged falls back to the anon
    // key when no service role key is configured
    let public = Store::connect(&config.database_url, StoreRole::Public, &config.anon_key).await?;
    let privileged = Store::connect(
        &config.database_url,
        StoreRole::Privileged,
        config.service_key(),
    )
    .await?;

    // Reporting backend client
    let reports = ReportsClient::new(config.report_api_url.clone())?;

    // Realtime fan-out, fed by the database notification channel
    let realtime = RealtimeHub::new();
    realtime.spawn_listener(public.pool().clone());

    // Synthetic network sampler, off by default
    if config.network_sampler_enabled {
        tracing::info!("Network sampler enabled");
        netmon::spawn_sampler(public.clone());
    }

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origins
                .iter()
                .map(|s| s.parse().unwrap())
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    // Create app state and router
    let state = AppState::new(public, privileged, reports, realtime, config.clone());
    let router = app(state).layer(cors).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
