//! # Verifying Authority History
//!
//! Versioned mapping from activation block to verifier address, as kept
//! by a router contract. Certificates are verified against the authority
//! that was active at their reference block number.

use primitive_types::H160;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// On-chain contract address.
pub type Address = H160;

/// Router errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Activation must be strictly after the current block.
    #[error("activation block {activation_block} is not in the future (current block {current_block})")]
    ActivationNotInFuture {
        activation_block: u64,
        current_block: u64,
    },

    /// Activations must be strictly increasing.
    #[error("activation block {activation_block} is not after the last activation {last_activation}")]
    ActivationNotAfterLast {
        activation_block: u64,
        last_activation: u64,
    },

    /// Historical resolution of a block the chain has not reached yet.
    #[error("reference block {reference_block} is in the future (current block {current_block})")]
    ReferenceBlockInFuture {
        reference_block: u64,
        current_block: u64,
    },

    /// No authority was active at the requested block.
    #[error("no verifying authority active at block {reference_block}")]
    NoAuthority { reference_block: u64 },

    #[error("chain read failed: {0}")]
    Chain(String),
}

/// One router entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityActivation {
    pub activation_block: u64,
    pub address: Address,
}

/// Ordered activation list.
///
/// INVARIANT: `activations` is strictly increasing by `activation_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityHistory {
    activations: Vec<AuthorityActivation>,
}

impl AuthorityHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History with an initial authority active from `activation_block`.
    ///
    /// Used when deploying the router, where the first entry is not
    /// subject to the future-activation guard.
    pub fn with_initial(activation_block: u64, address: Address) -> Self {
        Self {
            activations: vec![AuthorityActivation {
                activation_block,
                address,
            }],
        }
    }

    pub fn activations(&self) -> &[AuthorityActivation] {
        &self.activations
    }

    pub fn last_activation(&self) -> Option<u64> {
        self.activations.last().map(|a| a.activation_block)
    }

    /// Schedule `address` to become active at `activation_block`.
    pub fn add(
        &mut self,
        activation_block: u64,
        address: Address,
        current_block: u64,
    ) -> Result<(), RouterError> {
        if activation_block <= current_block {
            return Err(RouterError::ActivationNotInFuture {
                activation_block,
                current_block,
            });
        }
        if let Some(last_activation) = self.last_activation() {
            if activation_block <= last_activation {
                return Err(RouterError::ActivationNotAfterLast {
                    activation_block,
                    last_activation,
                });
            }
        }
        self.activations.push(AuthorityActivation {
            activation_block,
            address,
        });
        Ok(())
    }

    /// Authority active at `reference_block`: the latest activation at or
    /// before it.
    pub fn resolve(&self, reference_block: u64, current_block: u64) -> Result<Address, RouterError> {
        if reference_block > current_block {
            return Err(RouterError::ReferenceBlockInFuture {
                reference_block,
                current_block,
            });
        }
        let idx = self
            .activations
            .partition_point(|a| a.activation_block <= reference_block);
        if idx == 0 {
            return Err(RouterError::NoAuthority { reference_block });
        }
        Ok(self.activations[idx - 1].address)
    }
}
