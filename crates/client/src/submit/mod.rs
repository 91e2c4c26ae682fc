//! Submission of signed user operations
//!
//! Both transports run the same pre-flight checks: the user operation must be bound to the
//! submitter's entry point and chain, its fields must still hash to the signed hash, and its
//! nonce must still be the sender's current one.

mod bundler;
mod direct;

pub use bundler::{BundlerClient, BundlerSubmitter};
pub use direct::DirectSubmitter;

use crate::{config::Transport, error::SubmitError};
use async_trait::async_trait;
use ethers::{
    providers::Middleware,
    types::{H256, U256},
};
use gasless_contracts::EntryPoint;
use gasless_primitives::{UserOperation, UserOperationHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What a submission returns, telling which receipt lookup applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionHandle {
    /// Accepted by a bundler, not yet included (`eth_getUserOperationReceipt`)
    Bundler(UserOperationHash),
    /// `handleOps` transaction sent by the relayer (`eth_getTransactionReceipt`)
    #[serde(rename_all = "camelCase")]
    Direct { transaction_hash: H256, user_operation_hash: UserOperationHash },
}

impl SubmissionHandle {
    pub fn user_operation_hash(&self) -> UserOperationHash {
        match self {
            Self::Bundler(hash) => *hash,
            Self::Direct { user_operation_hash, .. } => *user_operation_hash,
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Bundler(_) => Transport::Bundler,
            Self::Direct { .. } => Transport::Direct,
        }
    }
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundler(hash) => write!(f, "user operation {hash}"),
            Self::Direct { transaction_hash, .. } => write!(f, "transaction {transaction_hash:?}"),
        }
    }
}

#[async_trait]
pub trait Submit: Send + Sync {
    fn transport(&self) -> Transport;

    async fn submit(&self, uo: &UserOperation) -> Result<SubmissionHandle, SubmitError>;
}

/// Checks run before any submission
#[derive(Clone)]
pub(crate) struct PreFlight<M: Middleware + 'static> {
    entry_point: EntryPoint<M>,
    chain_id: u64,
}

impl<M: Middleware + 'static> PreFlight<M> {
    pub(crate) fn new(entry_point: EntryPoint<M>, chain_id: u64) -> Self {
        Self { entry_point, chain_id }
    }

    pub(crate) fn entry_point(&self) -> &EntryPoint<M> {
        &self.entry_point
    }

    pub(crate) async fn check(&self, uo: &UserOperation) -> Result<(), SubmitError> {
        let entry_point = self.entry_point.address();
        if !uo.is_bound_to(&entry_point, self.chain_id) {
            return Err(SubmitError::BindingMismatch {
                entry_point: uo.entry_point(),
                chain_id: uo.chain_id(),
                expected_entry_point: entry_point,
                expected_chain_id: self.chain_id,
            });
        }

        if !uo.is_consistent() {
            let derived = uo.user_operation().hash(&entry_point, self.chain_id);
            return Err(SubmitError::StaleSignature { signed: uo.hash(), derived });
        }

        let current = self.entry_point.get_nonce(&uo.sender, nonce_key(uo.nonce)).await?;
        if current != uo.nonce {
            return Err(SubmitError::NonceMismatch { expected: uo.nonce, current });
        }

        debug!("Pre-flight checks of user operation {} passed", uo.hash());
        Ok(())
    }
}

/// Key of an entry point nonce, its upper 192 bits
pub fn nonce_key(nonce: U256) -> U256 {
    nonce >> 64
}
