use crate::retry::RetryOpts;
use ethers::types::{Address, U256};
use gasless_primitives::{
    constants::{entry_point, gas, polling},
    EntryPointVersion, PaymasterAndData, SigningScheme,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

/// How a signed user operation reaches the entry point
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// `eth_sendUserOperation` on a bundler
    #[default]
    Bundler,
    /// `handleOps` sent by a funded relayer
    Direct,
}

/// Where the user operation hash comes from
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HashStrategy {
    /// `getUserOpHash` on the entry point
    #[default]
    Remote,
    /// Off-chain replication of the versioned entry point encoding
    Local,
    /// Both, refusing to continue when they disagree
    Checked,
}

/// Paymaster sponsoring the user operations
pub type PaymasterConfig = PaymasterAndData;

/// Gas limits and fee policy of the user operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    /// Priority fee target
    pub max_priority_fee_per_gas: U256,
    /// Fixed max fee, skipping the base fee read
    pub max_fee_per_gas: Option<U256>,
    /// Base fee used when the chain reports none (or the read fails)
    pub base_fee_floor: U256,
    /// Headroom over the base fee, in percent (at least 100)
    pub base_fee_multiplier_percent: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            call_gas_limit: gas::CALL_GAS_LIMIT.into(),
            verification_gas_limit: gas::VERIFICATION_GAS_LIMIT.into(),
            pre_verification_gas: gas::PRE_VERIFICATION_GAS.into(),
            max_priority_fee_per_gas: gas::PRIORITY_FEE_PER_GAS.into(),
            max_fee_per_gas: None,
            base_fee_floor: gas::BASE_FEE_FLOOR.into(),
            base_fee_multiplier_percent: gas::BASE_FEE_MULTIPLIER_PERCENT,
        }
    }
}

/// Configuration of the user operation pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub chain_id: u64,
    pub entry_point: Address,
    pub entry_point_version: EntryPointVersion,
    /// Key of the entry point nonce registry
    pub nonce_key: U256,
    pub gas: GasConfig,
    pub paymaster: Option<PaymasterConfig>,
    pub transport: Transport,
    /// Fall back to direct submission when the bundler rejects the user operation
    pub direct_fallback: bool,
    /// Receiver of the `handleOps` refund (relayer address when unset)
    pub beneficiary: Option<Address>,
    pub hash_strategy: HashStrategy,
    pub signing_scheme: SigningScheme,
    /// Retries of transient submission failures
    pub submit_retry: RetryOpts,
    /// Receipt polling
    pub poll: RetryOpts,
    /// Overall bound of the receipt polling
    pub confirmation_timeout: Duration,
}

impl Config {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            entry_point: entry_point::ADDRESS.parse().expect("entry point address is valid"),
            entry_point_version: EntryPointVersion::default(),
            nonce_key: entry_point::NONCE_KEY.into(),
            gas: GasConfig::default(),
            paymaster: None,
            transport: Transport::default(),
            direct_fallback: false,
            beneficiary: None,
            hash_strategy: HashStrategy::default(),
            signing_scheme: SigningScheme::default(),
            submit_retry: RetryOpts::default().with_max_attempts(3),
            poll: RetryOpts::default(),
            confirmation_timeout: Duration::from_secs(polling::DEADLINE_SECS),
        }
    }
}
