//! Assembly of unsigned user operations

use crate::{
    config::{GasConfig, PaymasterConfig},
    error::BuildError,
    fees::{GasFeeEstimator, GasFees},
};
use ethers::{
    abi::AbiEncode,
    providers::Middleware,
    types::{Address, Bytes, U256},
};
use gasless_contracts::{
    simple_account_api::ExecuteCall,
    token_api::{ApproveCall, TransferCall},
    utils::function_name,
    EntryPoint,
};
use gasless_primitives::{pack_paymaster_data, PackedUserOperation};
use tracing::{debug, trace};

/// Gas limits of a user operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasLimits {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

impl From<&GasConfig> for GasLimits {
    fn from(config: &GasConfig) -> Self {
        Self {
            call_gas_limit: config.call_gas_limit,
            verification_gas_limit: config.verification_gas_limit,
            pre_verification_gas: config.pre_verification_gas,
        }
    }
}

#[derive(Clone)]
pub struct UserOperationBuilder<M: Middleware + 'static> {
    entry_point: EntryPoint<M>,
    fee_estimator: GasFeeEstimator<M>,
    nonce_key: U256,
    fee_override: Option<GasFees>,
}

impl<M: Middleware + 'static> UserOperationBuilder<M> {
    pub fn new(entry_point: EntryPoint<M>, gas: &GasConfig, nonce_key: U256) -> Self {
        let fee_estimator = GasFeeEstimator::new(entry_point.eth_client(), gas);
        let fee_override = gas.max_fee_per_gas.map(|max_fee_per_gas| GasFees {
            max_fee_per_gas,
            max_priority_fee_per_gas: gas.max_priority_fee_per_gas.min(max_fee_per_gas),
        });
        Self { entry_point, fee_estimator, nonce_key, fee_override }
    }

    /// Builds the unsigned user operation of `sender` executing `call_data`
    ///
    /// The nonce is read from the entry point nonce registry right before building. The fees
    /// come from the latest base fee unless fixed in the gas configuration.
    pub async fn build(
        &self,
        sender: Address,
        call_data: Bytes,
        gas: &GasLimits,
        paymaster: Option<&PaymasterConfig>,
    ) -> Result<PackedUserOperation, BuildError> {
        let nonce =
            self.entry_point.get_nonce(&sender, self.nonce_key).await.map_err(BuildError::Nonce)?;

        let fees = match self.fee_override {
            Some(fees) => fees,
            None => self.fee_estimator.estimate().await,
        };

        debug!(
            "Building user operation of {sender:?} with nonce {nonce} calling {}",
            function_name(&call_data).unwrap_or("unknown function")
        );

        let uo = PackedUserOperation::default()
            .sender(sender)
            .nonce(nonce)
            .call_data(call_data)
            .gas_limits(gas.verification_gas_limit, gas.call_gas_limit)?
            .pre_verification_gas(gas.pre_verification_gas)
            .fees(fees.max_priority_fee_per_gas, fees.max_fee_per_gas)?
            .paymaster_and_data(pack_paymaster_data(paymaster)?);

        trace!("Built user operation {uo:?}");

        Ok(uo)
    }
}

/// `execute(dest, value, func)` call of the sender account
pub fn encode_execute(dest: Address, value: U256, func: Bytes) -> Bytes {
    ExecuteCall { dest, value, func }.encode().into()
}

/// ERC-20 `transfer(to, amount)`
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    TransferCall { to, amount }.encode().into()
}

/// ERC-20 `approve(spender, amount)`
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    ApproveCall { spender, amount }.encode().into()
}
