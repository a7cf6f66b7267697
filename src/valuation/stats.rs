//! Descriptive statistics over comparable samples.
//!
//! Empty or single-element input yields zero instead of an error, so the
//! aggregation step never has to special-case it. Arithmetic is checked:
//! `None` means a sum, product or quotient left the `Decimal` range.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Arithmetic mean. Zero for an empty slice, `None` on overflow.
pub fn mean(xs: &[Decimal]) -> Option<Decimal> {
    if xs.is_empty() {
        return Some(Decimal::ZERO);
    }
    sum(xs)?.checked_div(Decimal::from(xs.len()))
}

fn sum(xs: &[Decimal]) -> Option<Decimal> {
    xs.iter()
        .try_fold(Decimal::ZERO, |acc, x| acc.checked_add(*x))
}

/// Median of a sorted copy; the input slice is left untouched.
///
/// Even-length input averages the two central elements. Zero for an empty slice.
pub fn median(xs: &[Decimal]) -> Option<Decimal> {
    if xs.is_empty() {
        return Some(Decimal::ZERO);
    }
    let mut sorted = xs.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        // Halve before adding so two values near the limit still average
        let half_low = sorted[mid - 1].checked_div(Decimal::TWO)?;
        let half_high = sorted[mid].checked_div(Decimal::TWO)?;
        half_low.checked_add(half_high)
    }
}

/// Sample standard deviation (n − 1 denominator). Zero for fewer than two elements.
pub fn std(xs: &[Decimal]) -> Option<Decimal> {
    if xs.len() <= 1 {
        return Some(Decimal::ZERO);
    }
    let m = mean(xs)?;
    let sum_sq = xs.iter().try_fold(Decimal::ZERO, |acc, x| {
        let diff = x.checked_sub(m)?;
        acc.checked_add(diff.checked_mul(diff)?)
    })?;
    let variance = sum_sq.checked_div(Decimal::from(xs.len() - 1))?;

    Some(variance.sqrt().unwrap_or(Decimal::ZERO))
}

/// `std / mean`, or zero when the mean is not positive.
pub fn coefficient_of_variation(std: Decimal, mean: Decimal) -> Option<Decimal> {
    if mean <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    std.checked_div(mean)
}

/// Round half away from zero to `decimals` places.
pub fn round(x: Decimal, decimals: u32) -> Decimal {
    x.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Money precision.
pub fn round2(x: Decimal) -> Decimal {
    round(x, 2)
}

/// Ratio precision.
pub fn round4(x: Decimal) -> Decimal {
    round(x, 4)
}
