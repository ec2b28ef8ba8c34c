pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod storage;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::storage::BlobStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenCodec,
    pub images: Arc<dyn BlobStore>,
}

impl AppState {
    /// Build the shared state. `config.auth.jwt_secret` must already be set.
    pub fn new(config: Config, db: DbPool, images: Arc<dyn BlobStore>) -> anyhow::Result<Self> {
        let ttl = config.auth.token_ttl()?;
        let tokens = TokenCodec::new(&config.auth.jwt_secret, ttl);
        Ok(Self {
            config,
            db,
            tokens,
            images,
        })
    }
}
