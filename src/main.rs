use clap::Parser;

mod cli;
mod config;
mod error;
mod estimator;
mod provider;
mod selection;
mod transaction;
mod types;
mod units;

use cli::{parse_network, parse_satoshis, parse_weis, CliArgs, Command, OrderingArg};
use error::AppError;
use estimator::{BridgeContext, PegoutEstimator};
use provider::BridgeSnapshot;
use selection::{TxHashOrdering, ValueAscendingOrdering, ValueDescendingOrdering};

fn main() -> Result<(), AppError> {
    env_logger::init();

    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。引数: {:?}", args);

    let cli_network = parse_network(&args.network)?;
    log::info!("指定されたネットワーク: {:?}", cli_network);

    // 外部データを読む前に額を検証する
    enum Request {
        Cost(bitcoin::Amount),
        Value(u128),
    }
    let request = match &args.command {
        Command::Cost { amount } => Request::Cost(parse_satoshis(amount)?),
        Command::Value { amount } => Request::Value(parse_weis(amount)?),
    };

    let config = config::load_snapshot_config(&args.snapshot)?;
    let snapshot = BridgeSnapshot::from_config(config)?;

    let estimator = match args.ordering {
        OrderingArg::Hash => PegoutEstimator::new().with_utxo_ordering(TxHashOrdering),
        OrderingArg::ValueAsc => PegoutEstimator::new().with_utxo_ordering(ValueAscendingOrdering),
        OrderingArg::ValueDesc => PegoutEstimator::new().with_utxo_ordering(ValueDescendingOrdering),
    };
    log::info!("UTXO選択順: {}", estimator.ordering_name());

    let ctx = BridgeContext {
        network: cli_network,
        utxos: &snapshot,
        federation: &snapshot,
        fee_rate: &snapshot,
    };

    match request {
        Request::Cost(target) => {
            let cost = estimator.calculate_pegout_cost(target, &ctx)?;
            log_resolution(&cost.resolution);
            log::info!("合計: {} sats", cost.total.to_sat());
            println!(
                "{} satoshisを受け取るには、ブリッジに {} weis を送る必要があります",
                target.to_sat(), cost.weis
            );
        }
        Request::Value(submitted_weis) => {
            let value = estimator.calculate_pegout_value(submitted_weis, &ctx)?;
            log_resolution(&value.resolution);
            println!(
                "ブリッジに {} weis を送ると、{} satoshisを受け取ります",
                submitted_weis, value.satoshis.to_sat()
            );
        }
    }

    log::info!("処理が正常に完了しました。");
    Ok(())
}

fn log_resolution(resolution: &types::FeeResolution) {
    log::info!(
        "入力 {} 件, 推定サイズ {} bytes, 手数料 {} sats (反復 {} 回)",
        resolution.selection.input_count(),
        resolution.tx_size_bytes,
        resolution.fee.to_sat(),
        resolution.iterations
    );
    for utxo in &resolution.selection.selected {
        log::debug!("選択UTXO: {} ({} sats)", utxo.out_point, utxo.value.to_sat());
    }
}
