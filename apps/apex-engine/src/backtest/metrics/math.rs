//! Statistical helpers on `Decimal`.

use rust_decimal::Decimal;

use super::constants::{TOLERANCE, TWO};

/// Arithmetic mean.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Population standard deviation.
pub fn std_dev(values: &[Decimal]) -> Option<Decimal> {
    let avg = mean(values)?;
    let variance_sum: Decimal = values.iter().map(|v| (*v - avg) * (*v - avg)).sum();
    sqrt_decimal(variance_sum / Decimal::from(values.len()))
}

/// Root mean square of the negative values, over the full count.
pub fn downside_deviation(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let variance_sum: Decimal = values
        .iter()
        .filter(|v| **v < Decimal::ZERO)
        .map(|v| *v * *v)
        .sum();
    sqrt_decimal(variance_sum / Decimal::from(values.len()))
}

/// Square root by Newton's method.
pub fn sqrt_decimal(value: Decimal) -> Option<Decimal> {
    if value < Decimal::ZERO {
        return None;
    }
    if value == Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let mut guess = if value > Decimal::ONE { value / TWO } else { Decimal::ONE };
    for _ in 0..100 {
        let next = (guess + value / guess) / TWO;
        if (next - guess).abs() < TOLERANCE {
            return Some(next);
        }
        guess = next;
    }
    Some(guess)
}
