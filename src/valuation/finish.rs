//! Finish-quality weighting.
//!
//! Combines floor, kitchen and bathroom scores into one weighted index and
//! scales a base value by the subject's index relative to its comparables.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::property::models::{Finish, FinishKind, FinishWeight};

pub const DEFAULT_FLOOR_WEIGHT: Decimal = dec!(7);
pub const DEFAULT_KITCHEN_WEIGHT: Decimal = dec!(3);
pub const DEFAULT_BATHROOM_WEIGHT: Decimal = dec!(4);

/// The three weights used for one appraisal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishWeights {
    pub floor: Decimal,
    pub kitchen: Decimal,
    pub bathroom: Decimal,
}

impl Default for FinishWeights {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR_WEIGHT,
            kitchen: DEFAULT_KITCHEN_WEIGHT,
            bathroom: DEFAULT_BATHROOM_WEIGHT,
        }
    }
}

impl FinishWeights {
    pub fn new(floor: Decimal, kitchen: Decimal, bathroom: Decimal) -> Self {
        Self {
            floor,
            kitchen,
            bathroom,
        }
    }

    /// Take configured weights, keeping the default for any kind not configured.
    pub fn resolve(configured: &[FinishWeight]) -> Self {
        let mut weights = Self::default();
        for w in configured {
            match w.kind {
                FinishKind::Floor => weights.floor = w.weight,
                FinishKind::Kitchen => weights.kitchen = w.weight,
                FinishKind::Bathroom => weights.bathroom = w.weight,
            }
        }
        weights
    }

    pub fn get(&self, kind: FinishKind) -> Decimal {
        match kind {
            FinishKind::Floor => self.floor,
            FinishKind::Kitchen => self.kitchen,
            FinishKind::Bathroom => self.bathroom,
        }
    }

    pub fn total(&self) -> Decimal {
        self.floor + self.kitchen + self.bathroom
    }
}

/// Weighted average of the three finish scores.
///
/// # Formula
/// ```text
/// index = (floor·w_floor + kitchen·w_kitchen + bathroom·w_bathroom) / (w_floor + w_kitchen + w_bathroom)
/// ```
/// A zero weight total means there is no finish signal and yields 0.
/// `None` on `Decimal` overflow.
pub fn weighted_finish_index(
    floor_score: Decimal,
    kitchen_score: Decimal,
    bathroom_score: Decimal,
    weights: &FinishWeights,
) -> Option<Decimal> {
    let total = weights
        .floor
        .checked_add(weights.kitchen)?
        .checked_add(weights.bathroom)?;
    if total.is_zero() {
        return Some(Decimal::ZERO);
    }
    let weighted = floor_score
        .checked_mul(weights.floor)?
        .checked_add(kitchen_score.checked_mul(weights.kitchen)?)?
        .checked_add(bathroom_score.checked_mul(weights.bathroom)?)?;
    weighted.checked_div(total)
}

/// Index for a concrete floor/kitchen/bathroom finish triple.
pub fn finish_index_of(
    floor: &Finish,
    kitchen: &Finish,
    bathroom: &Finish,
    weights: &FinishWeights,
) -> Option<Decimal> {
    weighted_finish_index(floor.score, kitchen.score, bathroom.score, weights)
}

/// Scale `base_value` by the subject's finish index relative to the comparables' mean.
///
/// Returns `base_value` unchanged when the comparables' mean is not positive,
/// since there is nothing meaningful to compare against.
pub fn adjusted_value(
    base_value: Decimal,
    subject_index: Decimal,
    comparables_mean_index: Decimal,
) -> Option<Decimal> {
    if comparables_mean_index <= Decimal::ZERO {
        return Some(base_value);
    }
    base_value.checked_mul(subject_index.checked_div(comparables_mean_index)?)
}
