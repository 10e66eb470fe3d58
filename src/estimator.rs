use bitcoin::{network::Network as BitcoinNetwork, Amount};

use crate::{
    error::AppError,
    provider::{FederationProvider, FeeRateProvider, UtxoProvider},
    selection::{TxHashOrdering, UtxoOrdering},
    transaction::resolve_pegout_fee,
    types::FeeResolution,
    units::{satoshis_to_weis, weis_to_satoshis},
};

/// 1回の見積もりで参照する外部データの取得元
pub struct BridgeContext<'a> {
    pub network: BitcoinNetwork,
    pub utxos: &'a dyn UtxoProvider,
    pub federation: &'a dyn FederationProvider,
    pub fee_rate: &'a dyn FeeRateProvider,
}

/// 指定額を受け取るために送る必要のある額
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegoutCost {
    pub weis: u128,
    pub total: Amount,
    pub resolution: FeeResolution,
}

/// 送金額に対して実際に受け取れる額
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegoutValue {
    pub satoshis: Amount,
    pub resolution: FeeResolution,
}

pub struct PegoutEstimator {
    ordering: Box<dyn UtxoOrdering>,
}

impl Default for PegoutEstimator {
    fn default() -> Self {
        PegoutEstimator::new()
    }
}

impl PegoutEstimator {
    pub fn new() -> Self {
        PegoutEstimator { ordering: Box::new(TxHashOrdering) }
    }

    pub fn with_utxo_ordering(mut self, ordering: impl UtxoOrdering + 'static) -> Self {
        self.set_utxo_ordering(ordering);
        self
    }

    pub fn set_utxo_ordering(&mut self, ordering: impl UtxoOrdering + 'static) {
        log::debug!("UTXOの並び順を {} に変更します。", ordering.name());
        self.ordering = Box::new(ordering);
    }

    pub fn ordering_name(&self) -> &str {
        self.ordering.name()
    }

    pub fn estimate_pegout_fee(
        &self,
        target: Amount,
        ctx: &BridgeContext<'_>,
    ) -> Result<FeeResolution, AppError> {
        let fee_per_kb = ctx.fee_rate.fetch_fee_per_kb()?;
        let federation = ctx.federation.fetch_federation_config(ctx.network)?;
        let pool = ctx.utxos.fetch_active_utxos()?;

        resolve_pegout_fee(&pool, target, fee_per_kb, &federation, self.ordering.as_ref())
    }

    pub fn calculate_pegout_cost(
        &self,
        target: Amount,
        ctx: &BridgeContext<'_>,
    ) -> Result<PegoutCost, AppError> {
        let resolution = self.estimate_pegout_fee(target, ctx)?;
        let total = target.checked_add(resolution.fee).ok_or_else(|| {
            AppError::Internal("peg-out額と手数料の合計がオーバーフローしました".to_string())
        })?;

        Ok(PegoutCost {
            weis: satoshis_to_weis(total),
            total,
            resolution,
        })
    }

    /// 手数料が送金額を上回る場合は負の値を返さず `FeeExceedsAmount` とする。
    pub fn calculate_pegout_value(
        &self,
        submitted_weis: u128,
        ctx: &BridgeContext<'_>,
    ) -> Result<PegoutValue, AppError> {
        let submitted = weis_to_satoshis(submitted_weis)?;
        let resolution = self.estimate_pegout_fee(submitted, ctx)?;

        let satoshis = submitted.checked_sub(resolution.fee).ok_or(AppError::FeeExceedsAmount {
            submitted,
            fee: resolution.fee,
        })?;

        Ok(PegoutValue { satoshis, resolution })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use super::*;
    use crate::{
        selection::ValueAscendingOrdering,
        types::{fixtures, FederationConfig, Utxo},
        units::WEIS_PER_SATOSHI,
    };

    struct StubBridge {
        utxos: Vec<Utxo>,
        fee_per_kb: Amount,
        fetches: Cell<usize>,
    }

    impl StubBridge {
        fn new(fee_per_kb: u64) -> Self {
            StubBridge { utxos: fixtures::pool(), fee_per_kb: Amount::from_sat(fee_per_kb), fetches: Cell::new(0) }
        }

        fn context(&self) -> BridgeContext<'_> {
            BridgeContext {
                network: BitcoinNetwork::Testnet,
                utxos: self,
                federation: self,
                fee_rate: self,
            }
        }
    }

    impl UtxoProvider for StubBridge {
        fn fetch_active_utxos(&self) -> Result<Vec<Utxo>, AppError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.utxos.clone())
        }
    }

    impl FederationProvider for StubBridge {
        fn fetch_federation_config(&self, _network: BitcoinNetwork) -> Result<FederationConfig, AppError> {
            Ok(fixtures::federation())
        }
    }

    impl FeeRateProvider for StubBridge {
        fn fetch_fee_per_kb(&self) -> Result<Amount, AppError> {
            Ok(self.fee_per_kb)
        }
    }

    struct UnavailableFeeRate;

    impl FeeRateProvider for UnavailableFeeRate {
        fn fetch_fee_per_kb(&self) -> Result<Amount, AppError> {
            Err(AppError::DataUnavailable("fee rate".to_string()))
        }
    }

    #[test]
    fn cost_for_single_input_pegout() {
        let bridge = StubBridge::new(1_000);
        let cost = PegoutEstimator::new()
            .calculate_pegout_cost(Amount::from_sat(80_000), &bridge.context())
            .unwrap();
        assert_eq!(cost.resolution.fee, Amount::from_sat(512));
        assert_eq!(cost.total, Amount::from_sat(80_512));
        assert_eq!(cost.weis, 80_512 * WEIS_PER_SATOSHI);
        assert_eq!(bridge.fetches.get(), 1);
    }

    #[test]
    fn cost_for_four_input_pegout() {
        let bridge = StubBridge::new(1_000);
        let cost = PegoutEstimator::new()
            .calculate_pegout_cost(Amount::from_sat(140_000), &bridge.context())
            .unwrap();
        assert_eq!(cost.resolution.fee, Amount::from_sat(1_808));
        assert_eq!(cost.total, Amount::from_sat(141_808));
    }

    #[test]
    fn value_for_submission() {
        let bridge = StubBridge::new(1_000);
        let value = PegoutEstimator::new()
            .calculate_pegout_value(80_000 * WEIS_PER_SATOSHI, &bridge.context())
            .unwrap();
        assert_eq!(value.resolution.fee, Amount::from_sat(512));
        assert_eq!(value.satoshis, Amount::from_sat(79_488));
    }

    #[test]
    fn value_of_cost_is_close_to_target() {
        let bridge = StubBridge::new(1_000);
        let estimator = PegoutEstimator::new();
        for target in [1_000u64, 80_000, 99_000, 119_500, 140_000] {
            let target = Amount::from_sat(target);
            let cost = estimator.calculate_pegout_cost(target, &bridge.context()).unwrap();
            let value = estimator.calculate_pegout_value(cost.weis, &bridge.context()).unwrap();
            let diff = value.satoshis.to_sat().abs_diff(target.to_sat());
            // 送金額が増えた分だけ入力が増えると、差は入力1件分の手数料に収まる
            assert!(diff <= 432, "target {} -> {}", target.to_sat(), value.satoshis.to_sat());
        }
    }

    #[test]
    fn amounts_beyond_pool_are_insufficient() {
        let bridge = StubBridge::new(100_000);
        let estimator = PegoutEstimator::new();
        let ctx = bridge.context();
        assert!(matches!(
            estimator.calculate_pegout_cost(Amount::from_sat(10_000_000), &ctx),
            Err(AppError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            estimator.calculate_pegout_value(10_000_000 * WEIS_PER_SATOSHI, &ctx),
            Err(AppError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn fee_larger_than_submission() {
        let bridge = StubBridge::new(100_000);
        let err = PegoutEstimator::new()
            .calculate_pegout_value(10_000 * WEIS_PER_SATOSHI, &bridge.context())
            .unwrap_err();
        match err {
            AppError::FeeExceedsAmount { submitted, fee } => {
                assert_eq!(submitted, Amount::from_sat(10_000));
                assert_eq!(fee, Amount::from_sat(51_200));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn provider_failure_is_propagated() {
        let bridge = StubBridge::new(1_000);
        let ctx = BridgeContext { fee_rate: &UnavailableFeeRate, ..bridge.context() };
        assert!(matches!(
            PegoutEstimator::new().calculate_pegout_cost(Amount::from_sat(1), &ctx),
            Err(AppError::DataUnavailable(_))
        ));
        assert_eq!(bridge.fetches.get(), 0);
    }

    #[test]
    fn ordering_can_be_replaced() {
        let bridge = StubBridge::new(1_000);
        let mut estimator = PegoutEstimator::new();
        assert_eq!(estimator.ordering_name(), "tx-hash");

        let by_hash = estimator.estimate_pegout_fee(Amount::from_sat(25_000), &bridge.context()).unwrap();
        estimator.set_utxo_ordering(ValueAscendingOrdering);
        let by_value = estimator.estimate_pegout_fee(Amount::from_sat(25_000), &bridge.context()).unwrap();

        assert_eq!(estimator.ordering_name(), "value-ascending");
        assert_ne!(by_hash.selection, by_value.selection);
        assert!(by_value.selection.selected_value >= Amount::from_sat(25_000) + by_value.fee);
    }
}
