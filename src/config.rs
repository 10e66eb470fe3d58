use std::fs;
use std::path::Path;
use serde::Deserialize;

use crate::error::AppError;

/// ブリッジ状態のスナップショット (JSON)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    pub network: String, // "bitcoin", "testnet", "regtest"
    pub fee_per_kb: u64,
    pub utxos: Vec<UtxoEntry>,
    pub federation: FederationEntry,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub btc_tx_hash: String,
    pub btc_tx_output_index: u32,
    pub value_in_satoshis: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FederationEntry {
    pub redeem_script: String,
    /// 省略時はredeem scriptから導出する
    #[serde(default)]
    pub threshold: Option<u32>,
}

pub fn load_snapshot_config(path: &Path) -> Result<SnapshotConfig, AppError> {
    let content = fs::read_to_string(path).map_err(|e| {
        log::error!("スナップショットファイルの読み込みに失敗しました: {:?}", path);
        AppError::Io(e)
    })?;

    let config: SnapshotConfig = serde_json::from_str(&content).map_err(|e| {
        log::error!("スナップショットJSONのパースに失敗しました。");
        AppError::JsonParse {
            file_path: path.to_path_buf(),
            source: e,
        }
    })?;
    log::debug!(
        "スナップショットのパース成功: network={}, UTXO {} 件, feePerKb={}",
        config.network, config.utxos.len(), config.fee_per_kb
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_snapshot() {
        let json = r#"{
            "network": "testnet",
            "feePerKb": 100000,
            "utxos": [
                { "btcTxHash": "abc1000000000000000000000000000000000000000000000000000000000000", "btcTxOutputIndex": 1, "valueInSatoshis": 1000 }
            ],
            "federation": { "redeemScript": "52ae" }
        }"#;
        let config: SnapshotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.fee_per_kb, 100_000);
        assert_eq!(config.utxos[0].btc_tx_output_index, 1);
        assert_eq!(config.federation.threshold, None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_snapshot_config(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
