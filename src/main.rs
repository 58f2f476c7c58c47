use std::sync::Arc;

use intake_flow::api::{HttpSessionApi, SessionApi};
use intake_flow::cli;
use intake_flow::config::IntakeConfig;
use intake_flow::intake::{IntakeFlow, IntakeRouteState, intake_routes};
use intake_flow::store::{FlowStore, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export INTAKE_API_URL=https://api.example.com");
        std::process::exit(1);
    });

    eprintln!("Intake flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Session API: {}", config.api_url);
    eprintln!("   REST: http://0.0.0.0:{}/api/intake", config.http_port);
    eprintln!("   Type an answer and press Enter. \"back\" to go back, /quit to exit.\n");

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn FlowStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );

    // ── Session store ────────────────────────────────────────────────────
    let api: Arc<dyn SessionApi> = Arc::new(HttpSessionApi::from_config(&config)?);

    let flow = Arc::new(
        IntakeFlow::open(config.flow_key.clone(), api, store, config.routes.clone()).await?,
    );

    // Spawn Axum REST server for front-end clients
    let app = intake_routes(IntakeRouteState {
        flow: Arc::clone(&flow),
    });
    let port = config.http_port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tokio::spawn(async move {
        tracing::info!(port, "Intake REST server started");
        axum::serve(listener, app).await.ok();
    });

    cli::run(&flow).await?;

    tracing::info!("Shutting down");
    Ok(())
}
