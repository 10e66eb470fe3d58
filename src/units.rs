use bitcoin::Amount;
use crate::error::AppError;

/// 1 satoshi = 10^10 weis
pub const WEIS_PER_SATOSHI: u128 = 10_000_000_000;

pub fn satoshis_to_weis(amount: Amount) -> u128 {
    amount.to_sat() as u128 * WEIS_PER_SATOSHI
}

/// 端数は切り捨て
pub fn weis_to_satoshis(weis: u128) -> Result<Amount, AppError> {
    let sats = u64::try_from(weis / WEIS_PER_SATOSHI).map_err(|_| {
        AppError::InputValidation(format!("weis額が大きすぎます: {}", weis))
    })?;
    Ok(Amount::from_sat(sats))
}
