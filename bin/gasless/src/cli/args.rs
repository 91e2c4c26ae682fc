use crate::utils::{
    parse_address, parse_bytes, parse_duration, parse_entry_point_version, parse_hash_strategy,
    parse_transport, parse_u256, validate_private_key,
};
use alloy_chains::{Chain, NamedChain};
use clap::{value_parser, Parser};
use ethers::types::{Address, Bytes, U256};
use expanded_pathbuf::ExpandedPathBuf;
use gasless_client::{Config, GasConfig, HashStrategy, PaymasterConfig, Transport};
use gasless_primitives::{
    constants::{entry_point, gas},
    EntryPointVersion, Wallet,
};
use std::{str::FromStr, time::Duration};

/// Parses a chain from its name or id
pub fn parse_chain(s: &str) -> Result<Chain, String> {
    NamedChain::from_str(s)
        .map(Chain::from_named)
        .or_else(|_| s.parse::<u64>().map(Chain::from_id))
        .map_err(|_| format!("String {s} is not a valid chain"))
}

/// Connection args of the execution client and the bundler
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct ClientArgs {
    /// Ethereum execution client RPC endpoint.
    #[clap(long, env = "GASLESS_ETH_CLIENT", default_value = "http://127.0.0.1:8545")]
    pub eth_client_address: String,

    /// Bundler RPC endpoint.
    ///
    /// Without it only direct submission is available.
    #[clap(long, env = "GASLESS_BUNDLER")]
    pub bundler_address: Option<String>,

    /// Expected chain (name or id) of the execution client.
    #[clap(long, value_parser = parse_chain)]
    pub chain: Option<Chain>,

    /// Entry point address.
    #[clap(long, default_value = entry_point::ADDRESS, value_parser = parse_address)]
    pub entry_point: Address,

    /// Entry point version, selecting the local hash encoding.
    #[clap(long, default_value = entry_point::VERSION, value_parser = parse_entry_point_version)]
    pub entry_point_version: EntryPointVersion,

    /// Key of the entry point nonce registry.
    #[clap(long, default_value_t = entry_point::NONCE_KEY.into(), value_parser = parse_u256)]
    pub nonce_key: U256,

    /// Timeout of every RPC request, in seconds.
    #[clap(long, default_value = "30", value_parser = parse_duration)]
    pub request_timeout: Duration,
}

/// Keys of the account owner and of the relayer
#[derive(Debug, Clone, Parser)]
pub struct WalletArgs {
    /// Path to the mnemonic file of the account owner.
    #[clap(long, conflicts_with = "private_key", required_unless_present = "private_key")]
    pub mnemonic_file: Option<ExpandedPathBuf>,

    /// Private key of the account owner.
    #[clap(long, env = "GASLESS_PRIVATE_KEY", hide_env_values = true, value_parser = validate_private_key)]
    pub private_key: Option<String>,

    /// Private key of the relayer paying for direct submissions.
    #[clap(long, env = "GASLESS_RELAYER_KEY", hide_env_values = true, value_parser = validate_private_key)]
    pub relayer_key: Option<String>,
}

impl WalletArgs {
    pub fn wallet(&self, chain_id: u64) -> eyre::Result<Wallet> {
        match (&self.mnemonic_file, &self.private_key) {
            (Some(path), _) => Ok(Wallet::from_file(path.clone(), chain_id)?),
            (None, Some(key)) => Ok(Wallet::from_private_key(key, chain_id)?),
            (None, None) => Err(eyre::eyre!("Either a mnemonic file or a private key is required")),
        }
    }

    pub fn relayer(&self, chain_id: u64) -> eyre::Result<Option<Wallet>> {
        self.relayer_key
            .as_deref()
            .map(|key| Wallet::from_private_key(key, chain_id))
            .transpose()
            .map_err(Into::into)
    }
}

/// Gas limits and fee policy of the user operation
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct GasArgs {
    #[clap(long, default_value_t = gas::CALL_GAS_LIMIT.into(), value_parser = parse_u256)]
    pub call_gas_limit: U256,

    #[clap(long, default_value_t = gas::VERIFICATION_GAS_LIMIT.into(), value_parser = parse_u256)]
    pub verification_gas_limit: U256,

    #[clap(long, default_value_t = gas::PRE_VERIFICATION_GAS.into(), value_parser = parse_u256)]
    pub pre_verification_gas: U256,

    /// Priority fee per gas, in wei.
    #[clap(long, default_value_t = gas::PRIORITY_FEE_PER_GAS.into(), value_parser = parse_u256)]
    pub max_priority_fee_per_gas: U256,

    /// Fixed max fee per gas, in wei. The base fee is not read when set.
    #[clap(long, value_parser = parse_u256)]
    pub max_fee_per_gas: Option<U256>,

    /// Base fee assumed when the latest block reports none, in wei.
    #[clap(long, default_value_t = gas::BASE_FEE_FLOOR.into(), value_parser = parse_u256)]
    pub base_fee_floor: U256,

    /// Headroom over the base fee, in percent.
    #[clap(long, default_value_t = gas::BASE_FEE_MULTIPLIER_PERCENT, value_parser = value_parser!(u64).range(100..))]
    pub base_fee_multiplier: u64,
}

impl GasArgs {
    pub fn to_config(&self) -> GasConfig {
        GasConfig {
            call_gas_limit: self.call_gas_limit,
            verification_gas_limit: self.verification_gas_limit,
            pre_verification_gas: self.pre_verification_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            max_fee_per_gas: self.max_fee_per_gas,
            base_fee_floor: self.base_fee_floor,
            base_fee_multiplier_percent: self.base_fee_multiplier,
        }
    }
}

/// Paymaster sponsoring the user operation
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct PaymasterArgs {
    /// Paymaster address. The sender pays for itself when unset.
    #[clap(long, value_parser = parse_address)]
    pub paymaster: Option<Address>,

    #[clap(
        long = "paymaster.verification-gas-limit",
        default_value_t = gas::PAYMASTER_VERIFICATION_GAS_LIMIT.into(),
        value_parser = parse_u256
    )]
    pub paymaster_verification_gas_limit: U256,

    #[clap(
        long = "paymaster.post-op-gas-limit",
        default_value_t = gas::PAYMASTER_POST_OP_GAS_LIMIT.into(),
        value_parser = parse_u256
    )]
    pub paymaster_post_op_gas_limit: U256,

    /// Payload passed to the paymaster (e.g. the gas token address).
    #[clap(long = "paymaster.data", default_value = "0x", value_parser = parse_bytes)]
    pub paymaster_data: Bytes,
}

impl PaymasterArgs {
    pub fn to_config(&self) -> Option<PaymasterConfig> {
        self.paymaster.map(|paymaster| PaymasterConfig {
            paymaster,
            verification_gas_limit: self.paymaster_verification_gas_limit,
            post_op_gas_limit: self.paymaster_post_op_gas_limit,
            data: self.paymaster_data.clone(),
        })
    }
}

/// Submission and confirmation args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct SubmitArgs {
    /// How the signed user operation reaches the entry point (`bundler` or `direct`).
    #[clap(long, default_value_t = Transport::Bundler, value_parser = parse_transport)]
    pub transport: Transport,

    /// Send the user operation through the relayer when the bundler rejects it.
    #[clap(long)]
    pub direct_fallback: bool,

    /// Receiver of the `handleOps` refund. Defaults to the relayer.
    #[clap(long, value_parser = parse_address)]
    pub beneficiary: Option<Address>,

    /// Where the user operation hash comes from (`remote`, `local` or `checked`).
    #[clap(long, default_value_t = HashStrategy::Remote, value_parser = parse_hash_strategy)]
    pub hash_strategy: HashStrategy,

    /// Overall bound of the receipt polling, in seconds.
    #[clap(long, default_value = "120", value_parser = parse_duration)]
    pub confirmation_timeout: Duration,

    /// Print the submission handle without waiting for the receipt.
    #[clap(long)]
    pub no_wait: bool,
}

/// Everything the user operation pipeline is configured with
#[derive(Debug, Clone, Parser)]
pub struct PipelineArgs {
    #[clap(flatten)]
    pub client: ClientArgs,

    #[clap(flatten)]
    pub wallet: WalletArgs,

    #[clap(flatten)]
    pub gas: GasArgs,

    #[clap(flatten)]
    pub paymaster: PaymasterArgs,

    #[clap(flatten)]
    pub submit: SubmitArgs,
}

impl PipelineArgs {
    pub fn to_config(&self, chain_id: u64) -> Config {
        let mut config = Config::new(chain_id);
        config.entry_point = self.client.entry_point;
        config.entry_point_version = self.client.entry_point_version;
        config.nonce_key = self.client.nonce_key;
        config.gas = self.gas.to_config();
        config.paymaster = self.paymaster.to_config();
        config.transport = self.submit.transport;
        config.direct_fallback = self.submit.direct_fallback;
        config.beneficiary = self.submit.beneficiary;
        config.hash_strategy = self.submit.hash_strategy;
        config.confirmation_timeout = self.submit.confirmation_timeout;
        config
    }
}

/// Call executed by the sender account
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct CallArgs {
    /// Account sending the user operation.
    #[clap(long, value_parser = parse_address)]
    pub sender: Address,

    /// Contract called by the account.
    #[clap(long, value_parser = parse_address)]
    pub target: Address,

    /// Value sent with the call, in wei.
    #[clap(long, default_value = "0", value_parser = parse_u256)]
    pub value: U256,

    /// Call data of the inner call.
    #[clap(long, default_value = "0x", value_parser = parse_bytes)]
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_primitives::constants::polling;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn client_args_defaults() {
        let args = ClientArgs::try_parse_from(vec!["client"]).unwrap();
        assert_eq!(args.eth_client_address, "http://127.0.0.1:8545");
        assert_eq!(args.entry_point, parse_address(entry_point::ADDRESS).unwrap());
        assert_eq!(args.entry_point_version, EntryPointVersion::V0_7);
        assert_eq!(args.nonce_key, U256::zero());
        assert_eq!(args.request_timeout, Duration::from_secs(polling::REQUEST_TIMEOUT_SECS));
        assert!(args.chain.is_none());
    }

    #[test]
    fn client_args_chain() {
        let args = ClientArgs::try_parse_from(vec!["client", "--chain", "sepolia"]).unwrap();
        assert_eq!(args.chain.map(|chain| chain.id()), Some(11155111));
        assert!(ClientArgs::try_parse_from(vec!["client", "--entry-point-version", "0.6"]).is_err());
    }

    #[test]
    fn wallet_args_require_one_key() {
        assert!(WalletArgs::try_parse_from(vec!["wallet"]).is_err());
        assert!(WalletArgs::try_parse_from(vec![
            "wallet",
            "--mnemonic-file",
            "~/.gasless/mnemonic",
            "--private-key",
            KEY,
        ])
        .is_err());

        let args = WalletArgs::try_parse_from(vec!["wallet", "--private-key", KEY]).unwrap();
        let wallet = args.wallet(11155111).unwrap();
        assert_eq!(
            wallet.address(),
            parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        assert!(args.relayer(11155111).unwrap().is_none());
    }

    #[test]
    fn gas_args() {
        let args = GasArgs::try_parse_from(vec!["gas"]).unwrap();
        assert_eq!(args.to_config(), GasConfig::default());

        let args = GasArgs::try_parse_from(vec![
            "gas",
            "--max-fee-per-gas",
            "3000000000",
            "--base-fee-multiplier",
            "150",
        ])
        .unwrap();
        let config = args.to_config();
        assert_eq!(config.max_fee_per_gas, Some(3_000_000_000u64.into()));
        assert_eq!(config.base_fee_multiplier_percent, 150);

        assert!(GasArgs::try_parse_from(vec!["gas", "--base-fee-multiplier", "50"]).is_err());
    }

    #[test]
    fn paymaster_args() {
        let args = PaymasterArgs::try_parse_from(vec!["paymaster"]).unwrap();
        assert!(args.to_config().is_none());

        let args = PaymasterArgs::try_parse_from(vec![
            "paymaster",
            "--paymaster",
            "0x1111111111111111111111111111111111111111",
            "--paymaster.data",
            "0x2222222222222222222222222222222222222222",
        ])
        .unwrap();
        let paymaster = args.to_config().unwrap();
        assert_eq!(paymaster.verification_gas_limit, gas::PAYMASTER_VERIFICATION_GAS_LIMIT.into());
        assert_eq!(paymaster.post_op_gas_limit, gas::PAYMASTER_POST_OP_GAS_LIMIT.into());
        assert_eq!(paymaster.data.len(), 20);
    }

    #[test]
    fn pipeline_args() {
        let args = PipelineArgs::try_parse_from(vec![
            "pipeline",
            "--private-key",
            KEY,
            "--relayer-key",
            KEY,
            "--transport",
            "direct",
            "--hash-strategy",
            "checked",
            "--nonce-key",
            "7",
            "--confirmation-timeout",
            "60",
        ])
        .unwrap();
        let config = args.to_config(11155111);
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.transport, Transport::Direct);
        assert_eq!(config.hash_strategy, HashStrategy::Checked);
        assert_eq!(config.nonce_key, 7.into());
        assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
        assert!(!config.direct_fallback);
        assert!(args.wallet.relayer(11155111).unwrap().is_some());
    }
}
