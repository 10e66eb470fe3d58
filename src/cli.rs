use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use bitcoin::{Amount, Network as BitcoinNetwork};
use crate::error::AppError;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// ブリッジ状態 (UTXO, フェデレーション, 手数料率) を記述したJSONファイルへのパス
    #[clap(short, long, value_parser)]
    pub snapshot: PathBuf,

    /// 使用するネットワーク ("bitcoin", "testnet", "regtest")
    #[clap(short, long, value_parser, default_value = "testnet")]
    pub network: String,

    /// UTXOの選択順
    #[clap(short, long, value_enum, default_value_t = OrderingArg::Hash)]
    pub ordering: OrderingArg,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 指定したsatoshisを受け取るために必要なweis
    Cost {
        /// 受け取りたい額 (satoshis)
        amount: String,
    },
    /// 指定したweisを送った場合に受け取れるsatoshis
    Value {
        /// ブリッジに送る額 (weis)
        amount: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingArg {
    Hash,
    ValueAsc,
    ValueDesc,
}

pub fn parse_network(network_str: &str) -> Result<BitcoinNetwork, AppError> {
    match network_str.to_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(BitcoinNetwork::Bitcoin),
        "testnet" => Ok(BitcoinNetwork::Testnet),
        "regtest" => Ok(BitcoinNetwork::Regtest),
        s => Err(AppError::InputValidation(format!("無効なネットワークが指定されました: {}", s))),
    }
}

fn parse_unsigned(amount_str: &str, unit: &str) -> Result<u128, AppError> {
    let trimmed = amount_str.trim();
    if trimmed.starts_with('-') {
        return Err(AppError::InputValidation(format!("負の額は指定できません: {} {}", trimmed, unit)));
    }
    trimmed.parse::<u128>().map_err(|_| {
        AppError::InputValidation(format!("数値の{}を指定してください: {}", unit, amount_str))
    })
}

pub fn parse_satoshis(amount_str: &str) -> Result<Amount, AppError> {
    let sats = parse_unsigned(amount_str, "satoshis")?;
    let sats = u64::try_from(sats).map_err(|_| {
        AppError::InputValidation(format!("satoshis額が大きすぎます: {}", amount_str))
    })?;
    Ok(Amount::from_sat(sats))
}

pub fn parse_weis(amount_str: &str) -> Result<u128, AppError> {
    parse_unsigned(amount_str, "weis")
}
