use std::cmp::Ordering;
use bitcoin::Amount;

use crate::{
    error::AppError,
    types::{SelectionResult, Utxo},
};

/// UTXOの並び順を決める差し替え可能な戦略
pub trait UtxoOrdering: Send + Sync {
    fn compare(&self, a: &Utxo, b: &Utxo) -> Ordering;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> UtxoOrdering for F
where
    F: Fn(&Utxo, &Utxo) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &Utxo, b: &Utxo) -> Ordering {
        self(a, b)
    }
}

/// txidを数値として昇順、同一txidは出力インデックス昇順 (デフォルト)
#[derive(Debug, Default, Clone, Copy)]
pub struct TxHashOrdering;

impl UtxoOrdering for TxHashOrdering {
    fn compare(&self, a: &Utxo, b: &Utxo) -> Ordering {
        // 長さ固定のビッグエンディアン列なので辞書順 = 数値順
        a.tx_hash_be_bytes()
            .cmp(&b.tx_hash_be_bytes())
            .then(a.out_point.vout.cmp(&b.out_point.vout))
    }

    fn name(&self) -> &str {
        "tx-hash"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ValueAscendingOrdering;

impl UtxoOrdering for ValueAscendingOrdering {
    fn compare(&self, a: &Utxo, b: &Utxo) -> Ordering {
        a.value.cmp(&b.value).then_with(|| TxHashOrdering.compare(a, b))
    }

    fn name(&self) -> &str {
        "value-ascending"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ValueDescendingOrdering;

impl UtxoOrdering for ValueDescendingOrdering {
    fn compare(&self, a: &Utxo, b: &Utxo) -> Ordering {
        b.value.cmp(&a.value).then_with(|| TxHashOrdering.compare(a, b))
    }

    fn name(&self) -> &str {
        "value-descending"
    }
}

/// `target` を満たすまで並び替え済みのプールを先頭から積み上げる。
///
/// 判定は追加前の累計に対して行うため、累計がちょうど `target` に達している場合は
/// さらに1件追加される。プール全体でも足りなければ `InsufficientFunds`。
pub fn select_utxos(
    pool: &[Utxo],
    target: Amount,
    ordering: &dyn UtxoOrdering,
) -> Result<SelectionResult, AppError> {
    let mut sorted = pool.to_vec();
    sorted.sort_by(|a, b| ordering.compare(a, b));

    let mut selected = Vec::new();
    let mut selected_value = Amount::ZERO;
    for utxo in sorted {
        if selected_value > target {
            break;
        }
        selected_value = selected_value.checked_add(utxo.value).ok_or_else(|| {
            AppError::Internal("UTXO合計額がオーバーフローしました".to_string())
        })?;
        selected.push(utxo);
    }

    if selected_value < target {
        log::debug!(
            "UTXO不足: プール {} 件, 合計 {} sats, 要求 {} sats",
            pool.len(), selected_value.to_sat(), target.to_sat()
        );
        return Err(AppError::InsufficientFunds {
            available: selected_value,
            required: target,
        });
    }

    log::debug!(
        "UTXO選択 ({}): {} 件, 合計 {} sats, 要求 {} sats",
        ordering.name(), selected.len(), selected_value.to_sat(), target.to_sat()
    );
    Ok(SelectionResult { selected, selected_value })
}
