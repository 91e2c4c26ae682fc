use super::args::{CallArgs, ClientArgs, GasArgs, PaymasterArgs, PipelineArgs};
use crate::{
    client::{connect_bundler, connect_eth_client, create_pipeline, report_receipt, send},
    utils::{
        parse_address, parse_duration, parse_h256, parse_hash_strategy, parse_u256,
        parse_user_operation_hash,
    },
};
use clap::Parser;
use ethers::types::{Address, H256, U256};
use gasless_client::{
    builder::UserOperationBuilder, encode_approve, encode_execute, encode_transfer,
    hash::HashOracle, retry::RetryOpts, submit::BundlerClient, wait::ConfirmationWaiter,
    GasLimits, HashStrategy, SubmissionHandle,
};
use gasless_contracts::EntryPoint;
use gasless_primitives::UserOperationHash;
use std::time::Duration;

/// Transfer ERC-20 tokens from the sender account
#[derive(Debug, Parser)]
pub struct TransferCommand {
    #[clap(flatten)]
    pipeline: PipelineArgs,

    /// Account sending the tokens.
    #[clap(long, value_parser = parse_address)]
    sender: Address,

    /// ERC-20 token.
    #[clap(long, value_parser = parse_address)]
    token: Address,

    /// Receiver of the tokens.
    #[clap(long, value_parser = parse_address)]
    to: Address,

    /// Amount in the token's smallest unit.
    #[clap(long, value_parser = parse_u256)]
    amount: U256,
}

impl TransferCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let pipeline = create_pipeline(&self.pipeline).await?;
        let call_data =
            encode_execute(self.token, U256::zero(), encode_transfer(self.to, self.amount));
        send(&pipeline, self.sender, call_data, self.pipeline.submit.no_wait).await
    }
}

/// Approve a spender of ERC-20 tokens of the sender account
#[derive(Debug, Parser)]
pub struct ApproveCommand {
    #[clap(flatten)]
    pipeline: PipelineArgs,

    /// Account owning the tokens.
    #[clap(long, value_parser = parse_address)]
    sender: Address,

    /// ERC-20 token.
    #[clap(long, value_parser = parse_address)]
    token: Address,

    /// Approved spender.
    #[clap(long, value_parser = parse_address)]
    spender: Address,

    /// Allowance in the token's smallest unit.
    #[clap(long, value_parser = parse_u256)]
    amount: U256,
}

impl ApproveCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let pipeline = create_pipeline(&self.pipeline).await?;
        let call_data =
            encode_execute(self.token, U256::zero(), encode_approve(self.spender, self.amount));
        send(&pipeline, self.sender, call_data, self.pipeline.submit.no_wait).await
    }
}

/// Execute an arbitrary call from the sender account
#[derive(Debug, Parser)]
pub struct ExecuteCommand {
    #[clap(flatten)]
    pipeline: PipelineArgs,

    #[clap(flatten)]
    call: CallArgs,
}

impl ExecuteCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let pipeline = create_pipeline(&self.pipeline).await?;
        let call_data = encode_execute(self.call.target, self.call.value, self.call.data);
        send(&pipeline, self.call.sender, call_data, self.pipeline.submit.no_wait).await
    }
}

/// Ask the bundler for the gas limits of a call from the sender account
#[derive(Debug, Parser)]
pub struct EstimateCommand {
    #[clap(flatten)]
    pipeline: PipelineArgs,

    #[clap(flatten)]
    call: CallArgs,
}

impl EstimateCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let pipeline = create_pipeline(&self.pipeline).await?;
        let call_data = encode_execute(self.call.target, self.call.value, self.call.data);
        let estimation = pipeline.estimate(self.call.sender, call_data).await?;
        println!("{}", serde_json::to_string_pretty(&estimation)?);
        Ok(())
    }
}

/// Build the unsigned user operation of a call and print its hash
#[derive(Debug, Parser)]
pub struct HashCommand {
    #[clap(flatten)]
    client: ClientArgs,

    #[clap(flatten)]
    gas: GasArgs,

    #[clap(flatten)]
    paymaster: PaymasterArgs,

    #[clap(flatten)]
    call: CallArgs,

    /// Where the user operation hash comes from (`remote`, `local` or `checked`).
    #[clap(long, default_value_t = HashStrategy::Checked, value_parser = parse_hash_strategy)]
    hash_strategy: HashStrategy,
}

impl HashCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (eth_client, chain_id) = connect_eth_client(&self.client).await?;
        let entry_point = EntryPoint::new(eth_client, self.client.entry_point);

        let gas = self.gas.to_config();
        let builder = UserOperationBuilder::new(entry_point.clone(), &gas, self.client.nonce_key);
        let uo = builder
            .build(
                self.call.sender,
                encode_execute(self.call.target, self.call.value, self.call.data),
                &GasLimits::from(&gas),
                self.paymaster.to_config().as_ref(),
            )
            .await?;

        let oracle = HashOracle::new(
            entry_point,
            chain_id,
            self.client.entry_point_version,
            self.hash_strategy,
        );
        let hash = oracle.hash(&uo).await?;

        println!("{}", serde_json::to_string_pretty(&uo)?);
        println!("{hash}");
        Ok(())
    }
}

/// Print the current entry point nonce of an account
#[derive(Debug, Parser)]
pub struct NonceCommand {
    #[clap(flatten)]
    client: ClientArgs,

    /// Account whose nonce is read.
    #[clap(long, value_parser = parse_address)]
    sender: Address,
}

impl NonceCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (eth_client, _) = connect_eth_client(&self.client).await?;
        let entry_point = EntryPoint::new(eth_client, self.client.entry_point);
        let nonce = entry_point.get_nonce(&self.sender, self.client.nonce_key).await?;
        println!("{nonce}");
        Ok(())
    }
}

/// Wait for the receipt of a submitted user operation
#[derive(Debug, Parser)]
pub struct ReceiptCommand {
    #[clap(flatten)]
    client: ClientArgs,

    /// Hash of the user operation.
    #[clap(long, value_parser = parse_user_operation_hash)]
    user_operation_hash: UserOperationHash,

    /// Hash of the `handleOps` transaction of a direct submission.
    ///
    /// Without it the receipt is looked up on the bundler.
    #[clap(long, value_parser = parse_h256)]
    transaction_hash: Option<H256>,

    /// Overall bound of the receipt polling, in seconds.
    #[clap(long, default_value = "120", value_parser = parse_duration)]
    timeout: Duration,
}

impl ReceiptCommand {
    fn handle(&self) -> SubmissionHandle {
        match self.transaction_hash {
            Some(transaction_hash) => SubmissionHandle::Direct {
                transaction_hash,
                user_operation_hash: self.user_operation_hash,
            },
            None => SubmissionHandle::Bundler(self.user_operation_hash),
        }
    }

    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (eth_client, chain_id) = connect_eth_client(&self.client).await?;
        let bundler = connect_bundler(&self.client, chain_id).await?;

        let waiter = ConfirmationWaiter::new(
            EntryPoint::new(eth_client, self.client.entry_point),
            bundler.map(BundlerClient::new),
            RetryOpts::default(),
            self.timeout,
        );
        let receipt = waiter.wait(&self.handle()).await?;
        report_receipt(&receipt)
    }
}
