use crate::{config::HashStrategy, error::HashError};
use ethers::providers::Middleware;
use gasless_contracts::EntryPoint;
use gasless_primitives::{EntryPointVersion, PackedUserOperation, UserOperationHash};
use tracing::{debug, warn};

/// Source of the hash the user operation is signed over
#[derive(Clone)]
pub struct HashOracle<M: Middleware + 'static> {
    entry_point: EntryPoint<M>,
    chain_id: u64,
    version: EntryPointVersion,
    strategy: HashStrategy,
}

impl<M: Middleware + 'static> HashOracle<M> {
    pub fn new(
        entry_point: EntryPoint<M>,
        chain_id: u64,
        version: EntryPointVersion,
        strategy: HashStrategy,
    ) -> Self {
        Self { entry_point, chain_id, version, strategy }
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    /// Hash computed by the entry point (`getUserOpHash`)
    pub async fn remote(&self, uo: &PackedUserOperation) -> Result<UserOperationHash, HashError> {
        self.entry_point.get_user_op_hash(uo.clone()).await.map_err(HashError::from_entry_point)
    }

    /// Hash replicated off-chain with the encoding of the configured entry point version
    pub fn local(&self, uo: &PackedUserOperation) -> UserOperationHash {
        self.version.hash(uo, &self.entry_point.address(), self.chain_id)
    }

    pub async fn hash(&self, uo: &PackedUserOperation) -> Result<UserOperationHash, HashError> {
        let hash = match self.strategy {
            HashStrategy::Remote => self.remote(uo).await?,
            HashStrategy::Local => self.local(uo),
            HashStrategy::Checked => {
                let local = self.local(uo);
                let remote = self.remote(uo).await?;
                if local != remote {
                    warn!(
                        "Local hash {local} (entry point {}) differs from the entry point hash {remote}",
                        self.version
                    );
                    return Err(HashError::Mismatch { local, remote });
                }
                remote
            }
        };

        debug!("User operation hash {hash} ({} strategy)", self.strategy);
        Ok(hash)
    }
}
