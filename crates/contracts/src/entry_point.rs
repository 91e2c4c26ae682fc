pub use super::error::EntryPointError;
use super::{
    error::revert_data,
    gen::{
        entry_point_api::{EntryPointAPIErrors, PackedUserOperation},
        EntryPointAPI,
    },
    revert::{decode_revert_reason, RevertReason},
};
use ethers::{
    prelude::ContractError,
    providers::{Middleware, MiddlewareError},
    types::{transaction::eip2718::TypedTransaction, Address, BlockId, U256},
};
use gasless_primitives::UserOperationHash;
use std::sync::Arc;

#[derive(Clone)]
pub struct EntryPoint<M: Middleware + 'static> {
    eth_client: Arc<M>,
    address: Address,
    entry_point_api: EntryPointAPI<M>,
}

impl<M: Middleware + 'static> EntryPoint<M> {
    pub fn new(eth_client: Arc<M>, address: Address) -> Self {
        let entry_point_api = EntryPointAPI::new(address, eth_client.clone());
        Self { eth_client, address, entry_point_api }
    }

    pub fn eth_client(&self) -> Arc<M> {
        self.eth_client.clone()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn deserialize_error_msg(
        err: ContractError<M>,
    ) -> Result<EntryPointAPIErrors, EntryPointError> {
        match err {
            ContractError::DecodingError(e) => {
                Err(EntryPointError::Decode { inner: e.to_string() })
            }
            ContractError::AbiError(e) => Err(EntryPointError::ABI { inner: e.to_string() }),
            ContractError::MiddlewareError { e } => EntryPointError::from_middleware_error::<M>(e),
            ContractError::ProviderError { e } => EntryPointError::from_provider_error(&e),
            ContractError::Revert(data) => super::error::decode_revert_error(data),
            _ => Err(EntryPointError::Other { inner: err.to_string() }),
        }
    }

    fn call_error(err: ContractError<M>) -> EntryPointError {
        match Self::deserialize_error_msg(err) {
            Ok(op) => EntryPointError::from_revert(op),
            Err(err) => err,
        }
    }

    /// Nonce of the sender under the given key (`getNonce(sender, key)`)
    pub async fn get_nonce(&self, address: &Address, key: U256) -> Result<U256, EntryPointError> {
        self.entry_point_api.get_nonce(*address, key).call().await.map_err(Self::call_error)
    }

    /// Hash of the user operation as the entry point computes it (`getUserOpHash(uo)`)
    pub async fn get_user_op_hash<U: Into<PackedUserOperation>>(
        &self,
        uo: U,
    ) -> Result<UserOperationHash, EntryPointError> {
        self.entry_point_api
            .get_user_op_hash(uo.into())
            .call()
            .await
            .map(UserOperationHash::from)
            .map_err(Self::call_error)
    }

    /// Unsigned `handleOps(uos, beneficiary)` transaction to the entry point
    pub fn handle_ops_tx<U: Into<PackedUserOperation>>(
        &self,
        uos: Vec<U>,
        beneficiary: Address,
    ) -> TypedTransaction {
        self.entry_point_api
            .handle_ops(uos.into_iter().map(|u| u.into()).collect(), beneficiary)
            .tx
    }

    /// Replays a transaction with `eth_call` at the given block
    ///
    /// Returns the decoded revert reason, or `None` when the replay succeeds.
    pub async fn replay(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<Option<RevertReason>, EntryPointError> {
        let err = match self.eth_client.call(tx, block).await {
            Ok(_) => return Ok(None),
            Err(err) => err,
        };

        let Some(rpc_err) = err.as_error_response() else {
            return Err(EntryPointError::Provider { inner: format!("middleware error: {err:?}") });
        };

        match revert_data(rpc_err) {
            Some(data) => Ok(Some(decode_revert_reason(&data))),
            None if rpc_err.message.contains("revert") => {
                Ok(Some(RevertReason::RevertString(rpc_err.message.clone())))
            }
            None => Err(EntryPointError::Provider { inner: rpc_err.to_string() }),
        }
    }
}
