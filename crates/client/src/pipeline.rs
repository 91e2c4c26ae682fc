use crate::{
    builder::{GasLimits, UserOperationBuilder},
    config::{Config, Transport},
    error::{PipelineError, SubmitError},
    fees::GasFeeEstimator,
    hash::HashOracle,
    submit::{BundlerClient, BundlerSubmitter, DirectSubmitter, SubmissionHandle, Submit},
    wait::{ConfirmationWaiter, Receipt},
};
use ethers::{
    providers::{JsonRpcClient, Middleware, Provider},
    types::{Address, Bytes},
};
use gasless_contracts::EntryPoint;
use gasless_primitives::{
    dummy_signature, PackedUserOperation, UserOperation, UserOperationGasEstimation,
    UserOperationRequest, Wallet,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Builds, hashes, signs, submits and confirms sponsored user operations
pub struct Pipeline<M: Middleware + 'static, P: JsonRpcClient> {
    config: Config,
    wallet: Wallet,
    entry_point: EntryPoint<M>,
    builder: UserOperationBuilder<M>,
    hash_oracle: HashOracle<M>,
    bundler: Option<BundlerSubmitter<M, P>>,
    direct: Option<DirectSubmitter<M>>,
    waiter: ConfirmationWaiter<M, P>,
}

impl<M, P> Pipeline<M, P>
where
    M: Middleware + Clone + 'static,
    P: JsonRpcClient + 'static,
{
    /// `wallet` owns the sender account, `relayer` pays for direct submissions
    pub fn new(
        config: Config,
        eth_client: Arc<M>,
        bundler: Option<Arc<Provider<P>>>,
        wallet: Wallet,
        relayer: Option<Wallet>,
    ) -> Self {
        let wallet = wallet.with_scheme(config.signing_scheme);
        let entry_point = EntryPoint::new(eth_client, config.entry_point);

        let builder = UserOperationBuilder::new(entry_point.clone(), &config.gas, config.nonce_key);
        let hash_oracle = HashOracle::new(
            entry_point.clone(),
            config.chain_id,
            config.entry_point_version,
            config.hash_strategy,
        );

        let bundler_client = bundler.map(BundlerClient::new);
        let bundler = bundler_client.clone().map(|bundler| {
            BundlerSubmitter::new(bundler, entry_point.clone(), config.chain_id, config.submit_retry)
        });
        let direct = relayer.map(|relayer| {
            DirectSubmitter::new(
                entry_point.clone(),
                relayer,
                GasFeeEstimator::new(entry_point.eth_client(), &config.gas),
                config.beneficiary,
                config.chain_id,
            )
        });
        let waiter = ConfirmationWaiter::new(
            entry_point.clone(),
            bundler_client,
            config.poll,
            config.confirmation_timeout,
        );

        Self { config, wallet, entry_point, builder, hash_oracle, bundler, direct, waiter }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn entry_point(&self) -> &EntryPoint<M> {
        &self.entry_point
    }

    pub fn hash_oracle(&self) -> &HashOracle<M> {
        &self.hash_oracle
    }

    pub fn bundler(&self) -> Option<&BundlerClient<P>> {
        self.bundler.as_ref().map(|submitter| submitter.bundler())
    }

    /// Builds the unsigned user operation of `sender` executing `call_data`
    pub async fn build(
        &self,
        sender: Address,
        call_data: Bytes,
    ) -> Result<PackedUserOperation, PipelineError> {
        let gas = GasLimits::from(&self.config.gas);
        Ok(self.builder.build(sender, call_data, &gas, self.config.paymaster.as_ref()).await?)
    }

    /// Asks the bundler for the gas limits of the user operation of `sender` executing
    /// `call_data`, signed with a placeholder
    pub async fn estimate(
        &self,
        sender: Address,
        call_data: Bytes,
    ) -> Result<UserOperationGasEstimation, PipelineError> {
        let bundler = self.bundler().ok_or(SubmitError::MissingBundler)?;
        let uo = self.build(sender, call_data).await?.signature(dummy_signature());
        let request = UserOperationRequest::try_from(&uo).map_err(SubmitError::from)?;

        let estimation =
            bundler.estimate_user_operation_gas(&request, &self.config.entry_point).await?;
        info!("Gas estimation of the user operation of {sender:?}: {estimation:?}");
        Ok(estimation)
    }

    /// Builds, hashes and signs the user operation of `sender` executing `call_data`
    pub async fn prepare(
        &self,
        sender: Address,
        call_data: Bytes,
    ) -> Result<UserOperation, PipelineError> {
        let uo = self.build(sender, call_data).await?;
        let hash = self.hash_oracle.hash(&uo).await?;
        let uo = self.wallet.sign_user_operation(
            uo,
            hash,
            self.config.entry_point,
            self.config.chain_id,
        )?;

        info!("Signed user operation {} of {sender:?} with nonce {}", uo.hash(), uo.nonce);
        Ok(uo)
    }

    fn submitter(&self, transport: Transport) -> Result<&dyn Submit, SubmitError> {
        match transport {
            Transport::Bundler => self
                .bundler
                .as_ref()
                .map(|submitter| submitter as &dyn Submit)
                .ok_or(SubmitError::MissingBundler),
            Transport::Direct => self
                .direct
                .as_ref()
                .map(|submitter| submitter as &dyn Submit)
                .ok_or(SubmitError::MissingRelayer),
        }
    }

    /// Submits with the configured transport
    pub async fn submit(&self, uo: &UserOperation) -> Result<SubmissionHandle, PipelineError> {
        self.submit_with(uo, self.config.transport).await
    }

    /// Submits with the given transport
    ///
    /// With direct fallback enabled, a user operation the bundler rejects (or cannot be reached
    /// for) is sent as is by the relayer.
    pub async fn submit_with(
        &self,
        uo: &UserOperation,
        transport: Transport,
    ) -> Result<SubmissionHandle, PipelineError> {
        match self.submitter(transport)?.submit(uo).await {
            Err(err) if transport == Transport::Bundler && self.can_fall_back(&err) => {
                warn!(
                    "Bundler did not accept user operation {}: {err}, falling back to direct submission",
                    uo.hash()
                );
                Ok(self.submitter(Transport::Direct)?.submit(uo).await?)
            }
            res => Ok(res?),
        }
    }

    fn can_fall_back(&self, err: &SubmitError) -> bool {
        self.config.direct_fallback &&
            self.direct.is_some() &&
            (err.is_rejection() || matches!(err, SubmitError::Transport { .. }))
    }

    pub async fn wait(&self, handle: &SubmissionHandle) -> Result<Receipt, PipelineError> {
        Ok(self.waiter.wait(handle).await?)
    }

    /// Runs the whole pipeline for one user operation
    pub async fn send(&self, sender: Address, call_data: Bytes) -> Result<Receipt, PipelineError> {
        let uo = self.prepare(sender, call_data).await?;
        let handle = self.submit(&uo).await?;
        self.wait(&handle).await
    }
}
