use crate::config::GasConfig;
use ethers::{providers::Middleware, types::BlockNumber, types::U256};
use std::sync::Arc;
use tracing::{debug, warn};

/// EIP-1559 fee pair of a user operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Derives the fee pair from the latest base fee
#[derive(Clone)]
pub struct GasFeeEstimator<M: Middleware + 'static> {
    eth_client: Arc<M>,
    priority_fee: U256,
    base_fee_floor: U256,
    multiplier_percent: u64,
}

impl<M: Middleware + 'static> GasFeeEstimator<M> {
    pub fn new(eth_client: Arc<M>, config: &GasConfig) -> Self {
        Self {
            eth_client,
            priority_fee: config.max_priority_fee_per_gas,
            base_fee_floor: config.base_fee_floor,
            multiplier_percent: config.base_fee_multiplier_percent,
        }
    }

    /// Base fee of the latest block, the floor when it is missing, zero or unreadable
    pub async fn base_fee(&self) -> U256 {
        let base_fee = match self.eth_client.get_block(BlockNumber::Latest).await {
            Ok(block) => block.and_then(|block| block.base_fee_per_gas).filter(|fee| !fee.is_zero()),
            Err(err) => {
                warn!("Failed to read the latest base fee, using the floor: {err:?}");
                return self.base_fee_floor;
            }
        };

        base_fee.unwrap_or_else(|| {
            debug!("No base fee reported, using the floor {}", self.base_fee_floor);
            self.base_fee_floor
        })
    }

    pub async fn estimate(&self) -> GasFees {
        let base_fee = self.base_fee().await;
        let fees = calc_fees(base_fee, self.priority_fee, self.multiplier_percent);
        debug!("Gas fees {fees:?} for base fee {base_fee}");
        fees
    }
}

/// `max_fee = base_fee * multiplier% + priority_fee`, the multiplier being at least 100%
pub fn calc_fees(base_fee: U256, priority_fee: U256, multiplier_percent: u64) -> GasFees {
    // premium above 100%, saturating on its own: max_fee >= base_fee + priority_fee
    let premium = base_fee
        .checked_mul(U256::from(multiplier_percent.max(100) - 100))
        .map_or(U256::MAX, |premium| premium / 100);
    let max_fee_per_gas = base_fee.saturating_add(premium).saturating_add(priority_fee);

    GasFees { max_fee_per_gas, max_priority_fee_per_gas: priority_fee }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        providers::{MockProvider, Provider},
        types::{Block, H256},
    };

    fn estimator(config: &GasConfig) -> (GasFeeEstimator<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (GasFeeEstimator::new(Arc::new(provider), config), mock)
    }

    #[test]
    fn max_fee_covers_base_and_priority() {
        let fees = calc_fees(10.into(), 2.into(), 200);
        assert_eq!(fees, GasFees { max_fee_per_gas: 22.into(), max_priority_fee_per_gas: 2.into() });

        // below 100% is raised to 100%
        let fees = calc_fees(10.into(), 2.into(), 50);
        assert_eq!(fees.max_fee_per_gas, 12.into());

        let fees = calc_fees(U256::MAX, 2.into(), 200);
        assert_eq!(fees.max_fee_per_gas, U256::MAX);
    }

    #[test]
    fn max_fee_never_drops_below_base_and_priority_on_overflow() {
        let base_fee = U256::MAX / 2;
        let priority_fee = U256::from(2);

        let fees = calc_fees(base_fee, priority_fee, 200);
        assert!(fees.max_fee_per_gas >= base_fee + priority_fee);
        assert_eq!(fees.max_fee_per_gas, U256::MAX);

        // the product with the multiplier overflows, the sum does not
        let base_fee = U256::MAX / 1_000;
        let fees = calc_fees(base_fee, priority_fee, u64::MAX);
        assert_eq!(fees.max_fee_per_gas, U256::MAX);

        let fees = calc_fees(base_fee, priority_fee, 100);
        assert_eq!(fees.max_fee_per_gas, base_fee + priority_fee);
    }

    #[tokio::test]
    async fn estimate_from_latest_block() {
        let (estimator, mock) = estimator(&GasConfig::default());
        mock.push(Block::<H256> {
            base_fee_per_gas: Some(1_000_000_000u64.into()),
            ..Default::default()
        })
        .unwrap();

        let fees = estimator.estimate().await;
        assert_eq!(fees.max_priority_fee_per_gas, 1_500_000_000u64.into());
        assert_eq!(fees.max_fee_per_gas, 3_500_000_000u64.into());
    }

    #[tokio::test]
    async fn zero_base_fee_uses_floor() {
        let config = GasConfig { base_fee_floor: 7.into(), ..Default::default() };
        let (estimator, mock) = estimator(&config);
        mock.push(Block::<H256> { base_fee_per_gas: Some(U256::zero()), ..Default::default() })
            .unwrap();

        assert_eq!(estimator.base_fee().await, 7.into());
    }

    #[tokio::test]
    async fn failed_read_uses_floor() {
        let config = GasConfig { base_fee_floor: 7.into(), ..Default::default() };
        let (estimator, _mock) = estimator(&config);

        let fees = estimator.estimate().await;
        assert_eq!(fees.max_fee_per_gas, config.max_priority_fee_per_gas + 14);
    }
}
