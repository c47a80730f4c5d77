//! Academic resource sharing for college students: accounts, uploads with
//! college-private visibility, search, and one-review-per-user ratings, all kept
//! in a local key-value store.

pub mod access;
pub mod accounts;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod rating;
pub mod resources;
pub mod storage;
pub mod user_models;
pub mod user_storage;

use std::sync::Arc;

use accounts::AccountService;
use config::AppConfig;
use resources::ResourceService;
use storage::Storage;

/// Everything an entry point needs, sharing one store.
#[derive(Clone)]
pub struct Hub {
    pub storage: Arc<Storage>,
    pub accounts: Arc<AccountService>,
    pub resources: Arc<ResourceService>,
}

impl Hub {
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(config.data_dir.clone())?);
        Ok(Self {
            accounts: Arc::new(AccountService::new(storage.clone(), config.bcrypt_cost)),
            resources: Arc::new(ResourceService::new(storage.clone(), config.latency.clone())),
            storage,
        })
    }
}

/// `RUST_LOG` picks the filter, `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_filter: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
