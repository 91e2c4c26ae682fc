//! Utils for creating ethers providers

use ethers::{
    providers::{Http, Middleware, Provider},
    types::Chain,
};
use std::time::Duration;
use url::Url;

/// Creates ethers provider with HTTP connection
///
/// Every request is bounded by `request_timeout`. The polling interval is short on dev chains.
pub async fn create_http_provider(
    addr: &str,
    request_timeout: Duration,
) -> eyre::Result<Provider<Http>> {
    let provider = create_http_client(addr, request_timeout)?;

    let chain_id = provider.get_chainid().await?;

    Ok(provider.interval(if chain_id == Chain::Dev.into() {
        Duration::from_millis(5u64)
    } else {
        Duration::from_millis(500u64)
    }))
}

/// Creates an HTTP JSON-RPC client without querying the endpoint (e.g. for a bundler)
pub fn create_http_client(addr: &str, request_timeout: Duration) -> eyre::Result<Provider<Http>> {
    let client = reqwest::Client::builder().timeout(request_timeout).build()?;
    let url = Url::parse(addr)?;
    Ok(Provider::new(Http::new_with_client(url, client)))
}
