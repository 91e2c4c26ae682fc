use super::{PreFlight, Submit, SubmissionHandle};
use crate::{
    config::Transport,
    error::SubmitError,
    retry::{with_retries, RetryOpts},
};
use async_trait::async_trait;
use ethers::{
    providers::{JsonRpcClient, Middleware, Provider, ProviderError},
    types::{Address, U64},
};
use gasless_contracts::EntryPoint;
use gasless_primitives::{
    UserOperation, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
    UserOperationRequest,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, sync::Arc};
use tracing::{info, trace, warn};

/// JSON-RPC client of an ERC-4337 bundler (`eth` namespace)
#[derive(Debug)]
pub struct BundlerClient<P: JsonRpcClient> {
    provider: Arc<Provider<P>>,
}

impl<P: JsonRpcClient> Clone for BundlerClient<P> {
    fn clone(&self) -> Self {
        Self { provider: self.provider.clone() }
    }
}

impl<P: JsonRpcClient> BundlerClient<P> {
    pub fn new(provider: Arc<Provider<P>>) -> Self {
        Self { provider }
    }

    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, SubmitError>
    where
        T: Debug + Serialize + Send + Sync,
        R: Debug + DeserializeOwned + Serialize + Send,
    {
        trace!("Bundler request {method}: {params:?}");
        self.provider.request(method, params).await.map_err(rpc_error)
    }

    pub async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
        entry_point: &Address,
    ) -> Result<UserOperationHash, SubmitError> {
        self.request("eth_sendUserOperation", (uo, entry_point)).await
    }

    /// `None` while the user operation is not included
    pub async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, SubmitError> {
        self.request("eth_getUserOperationReceipt", [hash]).await
    }

    pub async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
        entry_point: &Address,
    ) -> Result<UserOperationGasEstimation, SubmitError> {
        self.request("eth_estimateUserOperationGas", (uo, entry_point)).await
    }

    pub async fn supported_entry_points(&self) -> Result<Vec<Address>, SubmitError> {
        self.request("eth_supportedEntryPoints", ()).await
    }

    pub async fn chain_id(&self) -> Result<U64, SubmitError> {
        self.request("eth_chainId", ()).await
    }
}

/// JSON-RPC error envelopes keep their code and message, anything else is a transport error
pub(crate) fn rpc_error(err: ProviderError) -> SubmitError {
    if let ProviderError::JsonRpcClientError(ref inner) = err {
        if let Some(err) = inner.as_error_response() {
            return SubmitError::Rpc {
                code: err.code,
                message: err.message.clone(),
                data: err.data.clone(),
            };
        }
    }
    SubmitError::Transport { inner: err.to_string() }
}

/// Submits user operations through `eth_sendUserOperation`
#[derive(Clone)]
pub struct BundlerSubmitter<M: Middleware + 'static, P: JsonRpcClient> {
    bundler: BundlerClient<P>,
    preflight: PreFlight<M>,
    retry: RetryOpts,
}

impl<M: Middleware + 'static, P: JsonRpcClient> BundlerSubmitter<M, P> {
    pub fn new(
        bundler: BundlerClient<P>,
        entry_point: EntryPoint<M>,
        chain_id: u64,
        retry: RetryOpts,
    ) -> Self {
        Self { bundler, preflight: PreFlight::new(entry_point, chain_id), retry }
    }

    pub fn bundler(&self) -> &BundlerClient<P> {
        &self.bundler
    }
}

#[async_trait]
impl<M, P> Submit for BundlerSubmitter<M, P>
where
    M: Middleware + 'static,
    P: JsonRpcClient + 'static,
{
    fn transport(&self) -> Transport {
        Transport::Bundler
    }

    async fn submit(&self, uo: &UserOperation) -> Result<SubmissionHandle, SubmitError> {
        self.preflight.check(uo).await?;

        let entry_point = self.preflight.entry_point().address();
        let request = UserOperationRequest::try_from(uo.user_operation())?;
        let hash = with_retries(
            "send user operation to the bundler",
            || self.bundler.send_user_operation(&request, &entry_point),
            self.retry,
            SubmitError::is_retryable,
        )
        .await?;

        if hash != uo.hash() {
            warn!("Bundler returned hash {hash} for user operation {}", uo.hash());
        }
        info!("User operation {hash} sent to the bundler");

        Ok(SubmissionHandle::Bundler(hash))
    }
}
