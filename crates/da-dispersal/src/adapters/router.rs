//! In-memory verifier router.
//!
//! Implements `AuthorityRouter` over an [`AuthorityHistory`], using a
//! `ChainReader` for the current block.

use crate::domain::{Address, AuthorityHistory, RouterError};
use crate::ports::outbound::{AuthorityRouter, ChainReader};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

pub struct InMemoryAuthorityRouter {
    history: RwLock<AuthorityHistory>,
    chain: Arc<dyn ChainReader>,
}

impl InMemoryAuthorityRouter {
    pub fn new(history: AuthorityHistory, chain: Arc<dyn ChainReader>) -> Self {
        Self {
            history: RwLock::new(history),
            chain,
        }
    }

    /// Snapshot of the activation list.
    pub fn history(&self) -> AuthorityHistory {
        self.history.read().clone()
    }

    async fn current_block(&self) -> Result<u64, RouterError> {
        self.chain
            .latest_block_number()
            .await
            .map_err(|e| RouterError::Chain(e.to_string()))
    }
}

#[async_trait]
impl AuthorityRouter for InMemoryAuthorityRouter {
    async fn resolve_authority(&self, reference_block: u64) -> Result<Address, RouterError> {
        let current_block = self.current_block().await?;
        self.history.read().resolve(reference_block, current_block)
    }

    async fn add_authority(
        &self,
        activation_block: u64,
        address: Address,
    ) -> Result<(), RouterError> {
        let current_block = self.current_block().await?;
        self.history
            .write()
            .add(activation_block, address, current_block)?;
        info!(
            activation_block,
            current_block,
            verifier = ?address,
            "Scheduled cert verifier activation"
        );
        Ok(())
    }
}
