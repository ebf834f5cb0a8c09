use axum::http::HeaderValue;
use std::sync::Arc;

use movie_booking_api::{
    auth::AuthKeys,
    config::{AppConfig, StorageBackend},
    router::{build_router, cors_layer},
    store::{MemoryStore, MongoStore, Store},
};
use shuttle_secrets::{SecretStore, Secrets};

#[shuttle_runtime::main]
async fn main(#[Secrets] secret_store: SecretStore) -> shuttle_axum::ShuttleAxum {
    let config = AppConfig::from_secrets(&secret_store)?;

    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::Mongo { uri, database } => Arc::new(MongoStore::connect(uri, database).await?),
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_url = config
        .app_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("APP_URL is not a valid origin: {e}"))?;

    let app = build_router(store, AuthKeys::from_secret(&config.jwt_secret)).layer(cors_layer(app_url));

    tracing::info!("movie booking API ready");
    Ok(app.into())
}
