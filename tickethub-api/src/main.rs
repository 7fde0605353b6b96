use std::net::SocketAddr;
use std::sync::Arc;

use tickethub_api::{app, consumer, AppState};
use tickethub_core::repository::EventRepository;
use tickethub_store::StoreEventRepository;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "tickethub_api=debug,tickethub_store=debug,tower_http=debug,axum::rejection=trace"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tickethub_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting TicketHub API on port {}", config.server.port);

    // Postgres Connection
    let db = tickethub_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let repo: Arc<dyn EventRepository> = Arc::new(StoreEventRepository::new(db.pool.clone()));

    // Refund consumer shares the pool with the HTTP handlers
    tokio::spawn(consumer::start_refund_consumer(
        config.amqp.url.clone(),
        repo.clone(),
    ));

    let app = app(AppState { repo });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
