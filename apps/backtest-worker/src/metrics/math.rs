//! Decimal statistics for metric calculations.

use rust_decimal::Decimal;

const TWO: Decimal = Decimal::TWO;
// Convergence tolerance for the Newton iteration: 1e-7.
const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 7);

/// Mean of a slice of decimals.
#[must_use]
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len() as u64))
}

/// Sample standard deviation of a slice of decimals.
#[must_use]
pub fn std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance_sum: Decimal = values.iter().map(|v| (*v - avg) * (*v - avg)).sum();
    let variance = variance_sum / Decimal::from((values.len() - 1) as u64);
    sqrt_decimal(variance)
}

/// Approximate square root using Newton's method.
#[must_use]
pub fn sqrt_decimal(value: Decimal) -> Option<Decimal> {
    if value < Decimal::ZERO {
        return None;
    }
    if value == Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let mut guess = value / TWO;
    if guess == Decimal::ZERO {
        guess = value;
    }

    for _ in 0..50 {
        let next = (guess + value / guess) / TWO;
        if (next - guess).abs() < TOLERANCE {
            return Some(next);
        }
        guess = next;
    }

    Some(guess)
}
