use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::advisor::knowledge::{DisabledSemanticSearch, SemanticSearch};
use crate::config::Config;
use crate::guard::ChatLocks;
use crate::llm_client::LlmClient;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub config: Arc<Config>,
    pub chat_locks: ChatLocks,
    /// Pluggable semantic lookup over the knowledge base. The default
    /// implementation finds nothing, which drops education conversations
    /// down to the keyword search.
    pub semantic: Arc<dyn SemanticSearch>,
}

impl AppState {
    pub fn new(db: PgPool, llm: LlmClient, config: Config) -> Self {
        let chat_locks = ChatLocks::new(Duration::from_secs(config.chat_lock_ttl_secs));
        AppState {
            db,
            llm,
            config: Arc::new(config),
            chat_locks,
            semantic: Arc::new(DisabledSemanticSearch),
        }
    }
}
