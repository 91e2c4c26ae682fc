use crate::cli::args::{ClientArgs, PipelineArgs};
use alloy_chains::Chain;
use ethers::{
    providers::{Http, JsonRpcClient, Middleware, Provider},
    types::{Address, Bytes},
};
use gasless_client::{submit::BundlerClient, Pipeline, Receipt};
use gasless_primitives::provider::{create_http_client, create_http_provider};
use std::sync::Arc;
use tracing::{info, warn};

pub type HttpPipeline = Pipeline<Provider<Http>, Http>;

/// Connects to the execution client, returning it with its chain id
pub async fn connect_eth_client(args: &ClientArgs) -> eyre::Result<(Arc<Provider<Http>>, u64)> {
    let eth_client =
        Arc::new(create_http_provider(&args.eth_client_address, args.request_timeout).await?);
    let chain_id = check_connected_chain(eth_client.clone(), args.chain).await?;
    Ok((eth_client, chain_id))
}

/// Creates the bundler client when a bundler endpoint is configured
pub async fn connect_bundler(
    args: &ClientArgs,
    chain_id: u64,
) -> eyre::Result<Option<Arc<Provider<Http>>>> {
    let Some(address) = args.bundler_address.as_deref() else {
        return Ok(None);
    };

    let provider = Arc::new(create_http_client(address, args.request_timeout)?);
    let bundler = BundlerClient::new(provider.clone());

    let bundler_chain_id = bundler.chain_id().await?;
    if bundler_chain_id.as_u64() != chain_id {
        return Err(eyre::format_err!(
            "Bundler serves a different chain than the execution client: {} != {}",
            Chain::from_id(bundler_chain_id.as_u64()),
            Chain::from_id(chain_id)
        ));
    }

    let entry_points = bundler.supported_entry_points().await?;
    if !entry_points.contains(&args.entry_point) {
        warn!("Bundler does not list entry point {:?} among {entry_points:?}", args.entry_point);
    }

    Ok(Some(provider))
}

pub async fn create_pipeline(args: &PipelineArgs) -> eyre::Result<HttpPipeline> {
    let (eth_client, chain_id) = connect_eth_client(&args.client).await?;
    let bundler = connect_bundler(&args.client, chain_id).await?;

    let wallet = args.wallet.wallet(chain_id)?;
    let relayer = args.wallet.relayer(chain_id)?;
    info!(
        "Account owner {:?}, relayer {:?} on chain {}",
        wallet.address(),
        relayer.as_ref().map(|relayer| relayer.address()),
        Chain::from_id(chain_id)
    );

    Ok(Pipeline::new(args.to_config(chain_id), eth_client, bundler, wallet, relayer))
}

/// Signs and submits the call of `sender`, waiting for its receipt unless `no_wait`
pub async fn send(
    pipeline: &HttpPipeline,
    sender: Address,
    call_data: Bytes,
    no_wait: bool,
) -> eyre::Result<()> {
    let uo = pipeline.prepare(sender, call_data).await?;
    let handle = pipeline.submit(&uo).await?;
    println!("{handle}");

    if no_wait {
        return Ok(());
    }

    let receipt = pipeline.wait(&handle).await?;
    report_receipt(&receipt)
}

/// Prints the receipt, failing when the user operation did not succeed
pub fn report_receipt(receipt: &Receipt) -> eyre::Result<()> {
    println!("status: {}", receipt.status);
    println!("transaction: {:?}", receipt.transaction_hash);
    if let Some(block_number) = receipt.block_number {
        println!("block: {block_number}");
    }
    if let Some(gas_used) = receipt.gas_used {
        println!("gas used: {gas_used}");
    }

    if receipt.is_success() {
        return Ok(());
    }

    match &receipt.revert {
        Some(reason) => Err(eyre::format_err!("User operation {}: {reason}", receipt.status)),
        None => Err(eyre::format_err!("User operation {}", receipt.status)),
    }
}

async fn check_connected_chain<P>(
    eth_client: Arc<Provider<P>>,
    chain: Option<Chain>,
) -> eyre::Result<u64>
where
    P: JsonRpcClient,
{
    let chain_id = eth_client.get_chainid().await?;
    let chain_conn = Chain::from_id(chain_id.as_u64());

    if let Some(chain_opt) = chain {
        if chain_conn.id() != chain_opt.id() {
            return Err(eyre::format_err!(
                "Tried to connect to the execution client of different chain: {} != {}",
                chain_opt,
                chain_conn
            ));
        }
    }

    Ok(chain_conn.id())
}
