use bitcoin::Amount;

use crate::{
    error::AppError,
    selection::{select_utxos, UtxoOrdering},
    types::{FederationConfig, FeeResolution, Utxo},
};

// peg-outは受取人への出力とおつり出力の2つ
pub const PEGOUT_OUTPUT_COUNT: u64 = 2;

// version(4) + 入力数(1) + 出力数(1) + lock_time(4)
const TX_ENVELOPE_SIZE: u64 = 10;
// サイズ1バイト + 署名71バイト
const SIGNATURE_SIZE: u64 = 72;
// 先頭のOP_0 + redeem script前のOP_PUSHDATA
const SCRIPT_SIG_EXTRA_SIZE: u64 = 2;
// txid + vout + sequence
const INPUT_EXTRA_SIZE: u64 = 40;
// サイズ1バイト + scriptPubKey 25バイト
const OUTPUT_SCRIPT_SIZE: u64 = 26;
// value + 長さ
const OUTPUT_EXTRA_SIZE: u64 = 9;

/// マルチシグで署名されたpeg-outトランザクションのバイトサイズを推定する。
pub fn estimate_pegout_tx_size(
    input_count: u64,
    output_count: u64,
    signatures_needed: u64,
    redeem_script_len: u64,
) -> u64 {
    let redeem_script_size = redeem_script_len + 1; // 長さプレフィックス
    let script_sig_size = signatures_needed * SIGNATURE_SIZE + redeem_script_size + SCRIPT_SIG_EXTRA_SIZE;
    let input_size = script_sig_size + INPUT_EXTRA_SIZE;
    let output_size = OUTPUT_SCRIPT_SIZE + OUTPUT_EXTRA_SIZE;

    TX_ENVELOPE_SIZE + input_size * input_count + output_size * output_count
}

/// `floor(size * fee_per_kb / 1000)`
pub fn fee_for_size(tx_size_bytes: u64, fee_per_kb: Amount) -> Result<Amount, AppError> {
    tx_size_bytes
        .checked_mul(fee_per_kb.to_sat())
        .map(|v| Amount::from_sat(v / 1000))
        .ok_or_else(|| {
            AppError::Internal(format!(
                "手数料計算がオーバーフローしました: {} bytes * {} sats/kb",
                tx_size_bytes, fee_per_kb.to_sat()
            ))
        })
}

/// 選択したUTXOが「peg-out額 + そのトランザクションの手数料」を賄うまで
/// 選択と手数料計算を繰り返す。
///
/// 要求額は単調非減少なので選択数も単調に増える。反復はプールの件数+1回までに制限し、
/// 選択数が増えないまま収束しない場合は `InsufficientFunds` とする。
pub fn resolve_pegout_fee(
    pool: &[Utxo],
    target: Amount,
    fee_per_kb: Amount,
    federation: &FederationConfig,
    ordering: &dyn UtxoOrdering,
) -> Result<FeeResolution, AppError> {
    log::info!(
        "手数料収束計算を開始します。peg-out額: {} sats, 手数料率: {} sats/kb, プール: {} 件",
        target.to_sat(), fee_per_kb.to_sat(), pool.len()
    );

    let signatures = u64::from(federation.signature_threshold);
    let redeem_script_len = federation.redeem_script_len() as u64;
    let max_iterations = pool.len() + 1;

    let mut amount_to_cover = target;
    let mut previous_input_count: Option<usize> = None;

    for iteration in 1..=max_iterations {
        let selection = select_utxos(pool, amount_to_cover, ordering)?;
        let input_count = selection.input_count();

        let tx_size_bytes = estimate_pegout_tx_size(
            input_count as u64,
            PEGOUT_OUTPUT_COUNT,
            signatures,
            redeem_script_len,
        );
        let fee = fee_for_size(tx_size_bytes, fee_per_kb)?;
        amount_to_cover = target.checked_add(fee).ok_or_else(|| {
            AppError::Internal("peg-out額と手数料の合計がオーバーフローしました".to_string())
        })?;
        log::debug!(
            "反復 {}: 入力 {} 件, 推定サイズ {} bytes, 手数料 {} sats, 必要額 {} sats, 選択額 {} sats",
            iteration, input_count, tx_size_bytes, fee.to_sat(), amount_to_cover.to_sat(),
            selection.selected_value.to_sat()
        );

        if selection.selected_value >= amount_to_cover {
            log::info!(
                "手数料が収束しました: 入力 {} 件, {} bytes, 手数料 {} sats ({} 回)",
                input_count, tx_size_bytes, fee.to_sat(), iteration
            );
            return Ok(FeeResolution {
                fee,
                tx_size_bytes,
                selection,
                iterations: iteration,
            });
        }

        if previous_input_count == Some(input_count) {
            log::warn!("選択UTXO数が {} 件から増えないため収束しません。", input_count);
            return Err(AppError::InsufficientFunds {
                available: selection.selected_value,
                required: amount_to_cover,
            });
        }
        previous_input_count = Some(input_count);
    }

    log::warn!("{} 回の反復で手数料が収束しませんでした。", max_iterations);
    Err(AppError::InsufficientFunds {
        available: pool.iter().map(|u| u.value).sum(),
        required: amount_to_cover,
    })
}
