//! Service configuration loaded once at startup

use std::{env, str::FromStr, time::Duration};

use common::{
    credentials::ServiceAccountCredentials,
    database::DatabaseConfig,
    error::ConfigError,
    store::firestore::DEFAULT_BASE_URL,
};

use crate::scheduler::RetryPolicy;

/// App id records are filed under when `APP_ID` is not set
pub const DEFAULT_APP_ID: &str = "default-app-id";

/// Which document store backs the service
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Firestore {
        credentials: ServiceAccountCredentials,
        base_url: String,
    },
    Postgres(DatabaseConfig),
    Memory,
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Firestore { .. } => "firestore",
            StoreBackend::Postgres(_) => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Upload service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub app_id: String,
    /// Simulated video processing time
    pub processing_delay: Duration,
    /// How long shutdown waits for deferred tasks
    pub shutdown_grace: Duration,
    pub retry: RetryPolicy,
    /// Allowed CORS origin, any origin when unset
    pub cors_allowed_origin: Option<String>,
    pub store: StoreBackend,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: Listen port (default: 3001)
    /// - `APP_ID`: App id in the collection path (default: `default-app-id`)
    /// - `PROCESSING_DELAY_SECS`: Simulated processing time (default: 5)
    /// - `SHUTDOWN_GRACE_SECS`: Shutdown wait for deferred tasks (default: 10)
    /// - `TASK_MAX_ATTEMPTS`: Attempts per deferred task (default: 3)
    /// - `TASK_BACKOFF_BASE_MS`: First retry backoff (default: 1000)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed origin (default: any)
    /// - `STORE_BACKEND`: `firestore`, `postgres` or `memory` (default: `firestore`)
    /// - `FIRESTORE_BASE_URL`: Firestore API root, e.g. an emulator
    ///
    /// The Firestore backend additionally needs the `FIREBASE_*` credential
    /// variables, the Postgres backend `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = match optional("STORE_BACKEND").as_deref().unwrap_or("firestore") {
            "firestore" => StoreBackend::Firestore {
                credentials: ServiceAccountCredentials::from_env()?,
                base_url: optional("FIRESTORE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
            "postgres" => StoreBackend::Postgres(DatabaseConfig {
                database_url: required("DATABASE_URL")?,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            }),
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("unknown backend {:?}", other),
                });
            }
        };

        Ok(Self {
            port: parse_or("PORT", 3001)?,
            app_id: optional("APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            processing_delay: Duration::from_secs(parse_or("PROCESSING_DELAY_SECS", 5)?),
            shutdown_grace: Duration::from_secs(parse_or("SHUTDOWN_GRACE_SECS", 10)?),
            retry: RetryPolicy {
                max_attempts: parse_or("TASK_MAX_ATTEMPTS", 3)?,
                backoff_base: Duration::from_millis(parse_or("TASK_BACKOFF_BASE_MS", 1000)?),
            },
            cors_allowed_origin: optional("CORS_ALLOWED_ORIGIN"),
            store,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse {:?}", value),
        }),
        None => Ok(default),
    }
}
