use ethers::{
    abi::{encode, Token},
    contract::EthEvent,
    providers::{MockProvider, Provider},
    types::{Address, Block, Bytes, Log, TransactionReceipt, H256, U256},
};
use gasless_client::{encode_execute, encode_transfer, Config, Pipeline, PaymasterConfig};
use gasless_contracts::{UserOperationEventFilter, UserOperationRevertReasonFilter};
use gasless_primitives::{PackedUserOperation, UserOperationHash, Wallet};
use std::{sync::Arc, time::Duration};

pub const CHAIN_ID: u64 = 11155111;

// Testing keys
pub const KEY_PHRASE: &str = "test test test test test test test test test test test junk";
pub const RELAYER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const BASE_FEE: u64 = 1_000_000_000;

pub type TestPipeline = Pipeline<Provider<MockProvider>, MockProvider>;

pub struct TestContext {
    pub pipeline: TestPipeline,
    /// Chain RPC, responses are popped last-in first-out
    pub eth: MockProvider,
    /// Bundler RPC, responses are popped last-in first-out
    pub bundler: MockProvider,
    pub owner: Address,
    pub sender: Address,
    pub recipient: Address,
    pub token: Address,
    pub paymaster: PaymasterConfig,
}

impl TestContext {
    pub fn new(configure: impl FnOnce(&mut Config)) -> Self {
        let (eth_client, eth) = Provider::mocked();
        let (bundler_client, bundler) = Provider::mocked();

        let token = Address::random();
        let paymaster = PaymasterConfig {
            paymaster: Address::random(),
            verification_gas_limit: 100_000.into(),
            post_op_gas_limit: 50_000.into(),
            data: token.as_bytes().to_vec().into(),
        };

        let mut config = Config::new(CHAIN_ID);
        config.paymaster = Some(paymaster.clone());
        config.poll.min_nonzero_wait = Duration::from_millis(1);
        config.poll.max_wait = Duration::from_millis(1);
        config.submit_retry.min_nonzero_wait = Duration::from_millis(1);
        config.submit_retry.max_wait = Duration::from_millis(1);
        configure(&mut config);

        let wallet = Wallet::from_phrase(KEY_PHRASE, CHAIN_ID).expect("testing phrase is valid");
        let relayer =
            Wallet::from_private_key(RELAYER_KEY, CHAIN_ID).expect("testing key is valid");
        let owner = wallet.address();

        let pipeline = Pipeline::new(
            config,
            Arc::new(eth_client),
            Some(Arc::new(bundler_client)),
            wallet,
            Some(relayer),
        );

        Self {
            pipeline,
            eth,
            bundler,
            owner,
            sender: Address::random(),
            recipient: Address::random(),
            token,
            paymaster,
        }
    }

    /// `execute(token, 0, transfer(recipient, 0.1 token))`
    pub fn transfer_call_data(&self) -> Bytes {
        encode_execute(
            self.token,
            U256::zero(),
            encode_transfer(self.recipient, U256::exp10(17)),
        )
    }

    /// The unsigned user operation the pipeline is expected to build
    pub fn expected_user_operation(&self, nonce: u64) -> PackedUserOperation {
        PackedUserOperation::default()
            .sender(self.sender)
            .nonce(nonce.into())
            .call_data(self.transfer_call_data())
            .gas_limits(150_000.into(), 200_000.into())
            .expect("gas limits fit")
            .pre_verification_gas(60_000.into())
            .fees(1_500_000_000u64.into(), 3_500_000_000u64.into())
            .expect("fees fit")
            .paymaster_and_data(self.paymaster.pack().expect("paymaster fits"))
    }

    pub fn expected_hash(&self, nonce: u64) -> UserOperationHash {
        let config = self.pipeline.config();
        self.expected_user_operation(nonce).hash(&config.entry_point, config.chain_id)
    }
}

pub fn latest_block() -> Block<H256> {
    Block { base_fee_per_gas: Some(BASE_FEE.into()), ..Default::default() }
}

/// `eth_call` result of `getNonce`
pub fn nonce(nonce: u64) -> H256 {
    H256::from_low_u64_be(nonce)
}

pub fn user_operation_event(hash: &UserOperationHash, sender: Address, success: bool) -> Log {
    Log {
        topics: vec![
            UserOperationEventFilter::signature(),
            hash.0,
            H256::from(sender),
            H256::zero(),
        ],
        data: encode(&[
            Token::Uint(5.into()),
            Token::Bool(success),
            Token::Uint(100_000.into()),
            Token::Uint(95_000.into()),
        ])
        .into(),
        ..Default::default()
    }
}

pub fn revert_reason_event(hash: &UserOperationHash, sender: Address, revert_reason: Bytes) -> Log {
    Log {
        topics: vec![UserOperationRevertReasonFilter::signature(), hash.0, H256::from(sender)],
        data: encode(&[Token::Uint(5.into()), Token::Bytes(revert_reason.to_vec())]).into(),
        ..Default::default()
    }
}

pub fn transaction_receipt(status: u64, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: H256::random(),
        block_number: Some(1_000.into()),
        gas_used: Some(150_000.into()),
        status: Some(status.into()),
        logs,
        ..Default::default()
    }
}

/// `FailedOp(op_index, reason)` revert data
pub fn failed_op(op_index: u64, reason: &str) -> Bytes {
    [
        vec![0x22, 0x02, 0x66, 0xb6],
        encode(&[Token::Uint(op_index.into()), Token::String(reason.into())]),
    ]
    .concat()
    .into()
}
