use std::path::PathBuf;
use bitcoin::Amount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONパースエラー ファイル: {file_path:?}, 詳細: {source}")]
    JsonParse {
        file_path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("入力検証エラー: {0}")]
    InputValidation(String),

    #[error("資金不足: 利用可能なUTXO総額 {} sats, 要求額 {} sats", .available.to_sat(), .required.to_sat())]
    InsufficientFunds {
        available: Amount,
        required: Amount,
    },

    #[error("外部データを取得できません: {0}")]
    DataUnavailable(String),

    #[error("ネットワーク不整合: CLI指定 ({cli_network}) vs スナップショット ({snapshot_network})")]
    NetworkMismatch {
        cli_network: String,
        snapshot_network: String,
    },

    #[error("手数料 {} sats が送金額 {} sats を上回っています", .fee.to_sat(), .submitted.to_sat())]
    FeeExceedsAmount {
        submitted: Amount,
        fee: Amount,
    },

    #[error("内部エラー: {0}")]
    Internal(String),
}
