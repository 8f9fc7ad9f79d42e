/// Application context and dependency injection
use crate::{
    account::{AccountStore, SessionManager},
    blob_store::{BlobStore, DiskBlobStore},
    config::ServerConfig,
    db,
    error::AppResult,
    query::ChannelQueryEngine,
    token::TokenIssuer,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub accounts: AccountStore,
    pub token_issuer: Arc<TokenIssuer>,
    pub session_manager: Arc<SessionManager>,
    pub channel_queries: Arc<ChannelQueryEngine>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.account_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let token_issuer = Arc::new(TokenIssuer::new(config.tokens.clone()));

        let blob_store: Arc<dyn BlobStore> = Arc::new(DiskBlobStore::new(
            config.storage.blob_directory.clone(),
            config.service.public_url.clone(),
        ));

        let accounts = AccountStore::new(pool.clone());

        let session_manager = Arc::new(SessionManager::new(
            accounts.clone(),
            Arc::clone(&token_issuer),
            Arc::clone(&blob_store),
        ));

        let channel_queries = Arc::new(ChannelQueryEngine::new(pool.clone()));

        Ok(Self {
            config: Arc::new(config),
            accounts,
            token_issuer,
            session_manager,
            channel_queries,
        })
    }

    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.storage.blob_directory).await?;
        tokio::fs::create_dir_all(&config.storage.tmp_directory).await?;
        Ok(())
    }
}
