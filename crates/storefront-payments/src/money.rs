//! Minor-unit conversion for the card rail.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{PaymentError, Result};

/// Convert a two-decimal major-unit amount into minor units (cents).
///
/// Rounds `amount * 100` half-to-even, so `0.005` becomes `0` and `0.015`
/// becomes `2`.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }

    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| PaymentError::InvalidAmount(format!("{amount} overflows")))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

    cents
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount(format!("{amount} out of range")))
}
