use std::collections::HashSet;
use std::str::FromStr;
use bitcoin::{network::Network as BitcoinNetwork, Amount, OutPoint, ScriptBuf, Txid};

use crate::{
    cli::parse_network,
    config::{FederationEntry, SnapshotConfig, UtxoEntry},
    error::AppError,
    types::{FederationConfig, Utxo},
};

/// フェデレーションが保有するUTXOの取得元
pub trait UtxoProvider {
    fn fetch_active_utxos(&self) -> Result<Vec<Utxo>, AppError>;
}

/// ネットワークごとのフェデレーション設定の取得元
pub trait FederationProvider {
    fn fetch_federation_config(&self, network: BitcoinNetwork) -> Result<FederationConfig, AppError>;
}

/// 1000バイトあたりの手数料率の取得元
pub trait FeeRateProvider {
    fn fetch_fee_per_kb(&self) -> Result<Amount, AppError>;
}

/// JSONスナップショットに基づく読み取り専用の取得元。
/// 中身の検証は各fetch時に行い、不正なデータは `DataUnavailable` になる。
#[derive(Debug)]
pub struct BridgeSnapshot {
    network: BitcoinNetwork,
    fee_per_kb: u64,
    utxos: Vec<UtxoEntry>,
    federation: FederationEntry,
}

impl BridgeSnapshot {
    pub fn from_config(config: SnapshotConfig) -> Result<Self, AppError> {
        let network = parse_network(&config.network).map_err(|_| {
            AppError::DataUnavailable(format!("スナップショットのネットワークが不正です: {}", config.network))
        })?;
        Ok(BridgeSnapshot {
            network,
            fee_per_kb: config.fee_per_kb,
            utxos: config.utxos,
            federation: config.federation,
        })
    }
}

impl UtxoProvider for BridgeSnapshot {
    fn fetch_active_utxos(&self) -> Result<Vec<Utxo>, AppError> {
        let mut seen = HashSet::new();
        let mut utxos = Vec::with_capacity(self.utxos.len());

        for entry in &self.utxos {
            let txid = Txid::from_str(&entry.btc_tx_hash).map_err(|e| {
                AppError::DataUnavailable(format!("無効なTXID形式 ({}): {}", entry.btc_tx_hash, e))
            })?;
            let out_point = OutPoint::new(txid, entry.btc_tx_output_index);
            if !seen.insert(out_point) {
                return Err(AppError::DataUnavailable(format!("UTXOが重複しています: {}", out_point)));
            }
            utxos.push(Utxo::new(out_point, Amount::from_sat(entry.value_in_satoshis)));
        }

        log::debug!("アクティブなフェデレーションUTXO: {} 件", utxos.len());
        Ok(utxos)
    }
}

impl FederationProvider for BridgeSnapshot {
    fn fetch_federation_config(&self, network: BitcoinNetwork) -> Result<FederationConfig, AppError> {
        if network != self.network {
            return Err(AppError::NetworkMismatch {
                cli_network: format!("{:?}", network),
                snapshot_network: format!("{:?}", self.network),
            });
        }

        let redeem_script_bytes = hex::decode(&self.federation.redeem_script).map_err(|e| {
            AppError::DataUnavailable(format!("redeem scriptのデコード失敗: {}", e))
        })?;
        let redeem_script = ScriptBuf::from_bytes(redeem_script_bytes);

        let federation = match self.federation.threshold {
            Some(threshold) => FederationConfig::new(threshold, redeem_script)?,
            None => FederationConfig::from_redeem_script(redeem_script)?,
        };
        log::debug!(
            "フェデレーション設定: 閾値 {}, redeem script {} bytes",
            federation.signature_threshold, federation.redeem_script_len()
        );
        Ok(federation)
    }
}

impl FeeRateProvider for BridgeSnapshot {
    fn fetch_fee_per_kb(&self) -> Result<Amount, AppError> {
        Ok(Amount::from_sat(self.fee_per_kb))
    }
}
