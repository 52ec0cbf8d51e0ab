//! PrintForge - Print-Shop Management Backend

use anyhow::Result;
use printforge::http::{router, AppState};
use printforge::notify::Notifier;
use printforge::pipeline::FileProcessor;
use printforge::store::Store;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will not be published");
                None
            }
        },
        Err(_) => None,
    };

    let store = Store::new(db);
    let notifier = Notifier::new(nats);
    let files = FileProcessor::new(store.clone(), notifier.clone());
    let app = router(AppState { store, notifier, files });

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("printforge listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
