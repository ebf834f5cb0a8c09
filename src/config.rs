use anyhow::{anyhow, bail};
use shuttle_secrets::SecretStore;

const DEFAULT_DATABASE: &str = "movie-booking";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo { uri: String, database: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub app_url: String,
    pub jwt_secret: String,
}

impl AppConfig {
    /// Reads the deployment secrets defined in `Secrets.toml`.
    pub fn from_secrets(secret_store: &SecretStore) -> anyhow::Result<Self> {
        Self::from_lookup(|key| secret_store.get(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("secret {key} was not found"))
        };

        let storage = match lookup("STORAGE").as_deref().map(str::trim) {
            None | Some("") | Some("mongodb") => StorageBackend::Mongo {
                uri: required("MONGODB_URI")?,
                database: lookup("DATABASE_NAME")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            },
            Some("memory") => StorageBackend::Memory,
            Some(other) => bail!("unknown STORAGE backend {other:?}, expected mongodb or memory"),
        };

        Ok(AppConfig {
            storage,
            app_url: required("APP_URL")?,
            jwt_secret: required("JWT_SECRET")?,
        })
    }
}
