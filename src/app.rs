use crate::errors::SandboxError;
use crate::managers::sandbox::SandboxManager;
use crate::services::identity::StubIdentityProvider;
use crate::services::logger::Logger;
use crate::services::token_store::{bootstrap_tokens, default_credentials, TokenClient, TokenStore};
use std::sync::Arc;

/// Root wiring for the sandbox: one logger tree, one token store, one
/// request manager shared by every caller.
pub struct App {
    pub logger: Logger,
    pub token_store: Arc<TokenStore>,
    pub sandbox: Arc<SandboxManager>,
}

impl App {
    pub fn initialize() -> Result<Self, SandboxError> {
        let logger = Logger::new("sandbox");
        let token_store = Arc::new(TokenStore::new());
        let sandbox = Arc::new(SandboxManager::new(
            logger.child("request"),
            Arc::clone(&token_store),
            Arc::new(StubIdentityProvider),
        )?);
        Ok(Self {
            logger,
            token_store,
            sandbox,
        })
    }

    /// Acquires one bearer token per channel. Failures are logged inside
    /// the bootstrap flow and never abort startup.
    pub async fn bootstrap_tokens(&self) -> Result<(), SandboxError> {
        let client = TokenClient::new(self.logger.child("auth"))?;
        let credentials = default_credentials();
        bootstrap_tokens(&client, &self.token_store, &credentials, &self.logger).await;
        Ok(())
    }
}
