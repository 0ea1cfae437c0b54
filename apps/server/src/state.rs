//! Shared application state handed to every handler.

use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    auth::TokenIssuer,
    config::{Config, StorageBackend},
    db::{postgres, MemoryRecordStore, PostgresRecordStore, RecordStore},
    mail::{self, MailSender},
    services::{AccountService, BedService, EntryService, PatientService},
    Result,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    /// Set when the PostgreSQL backend is in use.
    pub db_pool: Option<PgPool>,
    pub tokens: Arc<TokenIssuer>,
    pub mailer: Arc<dyn MailSender>,
    pub accounts: Arc<AccountService>,
    pub patients: Arc<PatientService>,
    pub entries: Arc<EntryService>,
    pub beds: Arc<BedService>,
}

impl AppState {
    /// Build the state for the configured storage backend and mail transport.
    pub async fn new(config: Config) -> Result<Self> {
        let mailer = mail::build_mailer(&config.mail)?;

        match config.database.backend {
            StorageBackend::Postgres => {
                let pool = postgres::connect(&config.database).await?;
                let store = PostgresRecordStore::new(pool.clone());
                if config.database.run_migrations {
                    store.migrate().await?;
                    tracing::info!("Database migrations applied");
                }
                tracing::info!(
                    pool_max_size = config.database.pool_max_size,
                    "Connected to PostgreSQL"
                );
                let mut state = Self::with_store(config, Arc::new(store), mailer);
                state.db_pool = Some(pool);
                Ok(state)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory record store; data is lost on restart");
                Ok(Self::with_store(
                    config,
                    Arc::new(MemoryRecordStore::new()),
                    mailer,
                ))
            }
        }
    }

    /// Wire services around an existing store and mailer.
    pub fn with_store(
        config: Config,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.auth));
        let accounts = Arc::new(AccountService::new(
            &config,
            store.clone(),
            tokens.clone(),
            mailer.clone(),
        ));

        Self {
            patients: Arc::new(PatientService::new(store.clone())),
            entries: Arc::new(EntryService::new(store.clone())),
            beds: Arc::new(BedService::new(store.clone())),
            accounts,
            tokens,
            mailer,
            store,
            db_pool: None,
            config: Arc::new(config),
        }
    }
}
