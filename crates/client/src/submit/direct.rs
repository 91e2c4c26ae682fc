use super::{PreFlight, Submit, SubmissionHandle};
use crate::{config::Transport, error::SubmitError, fees::GasFeeEstimator};
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Middleware, MiddlewareError},
    signers::{LocalWallet, Signer},
    types::{Address, Eip1559TransactionRequest},
};
use gasless_contracts::{EntryPoint, EntryPointError};
use gasless_primitives::{UserOperation, Wallet};
use std::sync::Arc;
use tracing::{info, trace};

/// Sends `handleOps` transactions signed by a funded relayer
///
/// Every transaction field is filled here so the signer middleware only signs and sends.
#[derive(Clone)]
pub struct DirectSubmitter<M: Middleware + 'static> {
    relayer: SignerMiddleware<Arc<M>, LocalWallet>,
    preflight: PreFlight<M>,
    fee_estimator: GasFeeEstimator<M>,
    beneficiary: Address,
    chain_id: u64,
}

impl<M: Middleware + 'static> DirectSubmitter<M> {
    /// The relayer receives the `handleOps` refund unless a beneficiary is given
    pub fn new(
        entry_point: EntryPoint<M>,
        relayer: Wallet,
        fee_estimator: GasFeeEstimator<M>,
        beneficiary: Option<Address>,
        chain_id: u64,
    ) -> Self {
        let beneficiary = beneficiary.unwrap_or_else(|| relayer.address());
        let relayer = SignerMiddleware::new(entry_point.eth_client(), relayer.signer);
        Self {
            relayer,
            preflight: PreFlight::new(entry_point, chain_id),
            fee_estimator,
            beneficiary,
            chain_id,
        }
    }

    pub fn relayer(&self) -> Address {
        self.relayer.signer().address()
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }
}

#[async_trait]
impl<M: Middleware + 'static> Submit for DirectSubmitter<M> {
    fn transport(&self) -> Transport {
        Transport::Direct
    }

    async fn submit(&self, uo: &UserOperation) -> Result<SubmissionHandle, SubmitError> {
        self.preflight.check(uo).await?;

        let entry_point = self.preflight.entry_point();
        let eth_client = entry_point.eth_client();
        let relayer = self.relayer();

        let mut handle_ops = entry_point.handle_ops_tx(vec![uo.clone()], self.beneficiary);
        handle_ops.set_from(relayer);

        let nonce = eth_client
            .get_transaction_count(relayer, None)
            .await
            .map_err(|err| SubmitError::Transport { inner: err.to_string() })?;

        // reverts of the estimation carry the entry point error of the user operation
        let gas = eth_client.estimate_gas(&handle_ops, None).await.map_err(|err| {
            match EntryPointError::from_middleware_error::<M>(err) {
                Ok(op) => EntryPointError::from_revert(op),
                Err(err) => err,
            }
        })?;

        let fees = self.fee_estimator.estimate().await;

        let tx = Eip1559TransactionRequest::new()
            .from(relayer)
            .to(entry_point.address())
            .data(handle_ops.data().cloned().unwrap_or_default())
            .chain_id(self.chain_id)
            .nonce(nonce)
            .gas(gas)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        trace!("Sending handleOps transaction {tx:?}");

        let transaction_hash = self
            .relayer
            .send_transaction(tx, None)
            .await
            .map_err(|err| match err.as_error_response() {
                Some(err) => SubmitError::Rpc {
                    code: err.code,
                    message: err.message.clone(),
                    data: err.data.clone(),
                },
                None => SubmitError::Transport { inner: err.to_string() },
            })?
            .tx_hash();

        info!(
            "User operation {} sent in transaction {transaction_hash:?} by relayer {relayer:?}",
            uo.hash()
        );

        Ok(SubmissionHandle::Direct { transaction_hash, user_operation_hash: uo.hash() })
    }
}
