//! Comparative market analysis.
//!
//! Selects comparables in the subject's sector within a fixed area band,
//! derives the value per m² from them and optionally adjusts the result by
//! the subject's finish quality relative to the comparables.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::property::models::{Finish, Property, PropertyState};
use crate::valuation::finish::{adjusted_value, finish_index_of, FinishWeights};
use crate::valuation::stats::{coefficient_of_variation, mean, median, round2, round4, std};
use crate::valuation::ComparableSource;

/// Comparables must have an area within ±15% of the subject's.
pub const AREA_TOLERANCE: Decimal = dec!(0.15);

/// Inclusive area range accepted as comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl AreaBand {
    /// `None` when the upper bound leaves the `Decimal` range.
    pub fn around(area_m2: Decimal) -> Option<Self> {
        Some(Self {
            min: area_m2.checked_mul(Decimal::ONE - AREA_TOLERANCE)?,
            max: area_m2.checked_mul(Decimal::ONE + AREA_TOLERANCE)?,
        })
    }

    pub fn contains(&self, area_m2: Decimal) -> bool {
        area_m2 >= self.min && area_m2 <= self.max
    }
}

/// Catalog ids of the subject's three finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishIds {
    pub floor: i64,
    pub kitchen: i64,
    pub bathroom: i64,
}

/// The property being appraised.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub sector_id: i64,
    pub area_m2: Decimal,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking: Option<u32>,
    pub year_built: Option<i32>,
    /// `None` appraises without finish adjustment.
    pub finishes: Option<FinishIds>,
}

/// The subject's finishes once resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectFinishes {
    pub floor: Finish,
    pub kitchen: Finish,
    pub bathroom: Finish,
}

impl SubjectFinishes {
    pub fn index(&self, weights: &FinishWeights) -> Option<Decimal> {
        finish_index_of(&self.floor, &self.kitchen, &self.bathroom, weights)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error(
        "no comparable properties in sector {sector_id} with area between {min_area} and {max_area} m²"
    )]
    NoComparables {
        sector_id: i64,
        min_area: Decimal,
        max_area: Decimal,
    },

    #[error("unknown finish identifier: {id}")]
    UnknownFinish { id: i64 },

    #[error("{quantity} is outside the supported numeric range")]
    OutOfRange { quantity: &'static str },

    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

impl ValuationError {
    /// True for failures the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRef {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub score: Decimal,
}

impl From<&Finish> for FinishRef {
    fn from(f: &Finish) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            score: f.score,
        }
    }
}

/// A comparable decorated with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableItem {
    pub id: i64,
    pub sector_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value_per_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub finish_index: Decimal,
    pub rooms: u32,
    pub bathrooms: u32,
    pub parking: u32,
    pub year_built: Option<i32>,
    pub state: PropertyState,
    pub finish_floor: FinishRef,
    pub finish_kitchen: FinishRef,
    pub finish_bathroom: FinishRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishDetail {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectFinishDetail {
    pub floor: FinishDetail,
    pub kitchen: FinishDetail,
    pub bathroom: FinishDetail,
}

/// Outcome of one appraisal. Money is rounded to 2 places, ratios to 4.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub base_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub adjusted_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mean_value_per_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub median_value_per_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub std_value_per_area: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coefficient_of_variation: Decimal,
    pub comparable_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub mean_comparable_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub median_comparable_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mean_finish_index: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub std_finish_index: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub finish_coefficient_of_variation: Decimal,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject_finish_index: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_finish_detail: Option<SubjectFinishDetail>,
    pub comparables: Vec<ComparableItem>,
}

/// Price per m², or zero for a zero-area record. `None` on overflow.
pub fn value_per_area(price: Decimal, area_m2: Decimal) -> Option<Decimal> {
    if area_m2.is_zero() {
        return Some(Decimal::ZERO);
    }
    price.checked_div(area_m2)
}

fn in_range(quantity: &'static str, value: Option<Decimal>) -> Result<Decimal, ValuationError> {
    value.ok_or(ValuationError::OutOfRange { quantity })
}

fn subject_band(subject: &Subject) -> Result<AreaBand, ValuationError> {
    AreaBand::around(subject.area_m2).ok_or(ValuationError::OutOfRange {
        quantity: "subject area",
    })
}

/// Pure valuation over an already fetched comparable set.
///
/// Fails with [`ValuationError::NoComparables`] on an empty set instead of
/// reporting zero-valued statistics.
pub fn compute_valuation(
    subject: &Subject,
    comparables: &[Property],
    weights: &FinishWeights,
    subject_finishes: Option<&SubjectFinishes>,
) -> Result<ValuationResult, ValuationError> {
    if comparables.is_empty() {
        let band = subject_band(subject)?;
        return Err(ValuationError::NoComparables {
            sector_id: subject.sector_id,
            min_area: band.min,
            max_area: band.max,
        });
    }

    let n = comparables.len();
    let mut values_per_area = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);
    let mut finish_indices = Vec::with_capacity(n);

    for p in comparables {
        values_per_area.push(in_range(
            "comparable value per m²",
            value_per_area(p.price, p.area_m2),
        )?);
        prices.push(p.price);
        finish_indices.push(in_range(
            "comparable finish index",
            finish_index_of(&p.floor_finish, &p.kitchen_finish, &p.bathroom_finish, weights),
        )?);
    }

    let mean_vpa = in_range("mean value per m²", mean(&values_per_area))?;
    let median_vpa = in_range("median value per m²", median(&values_per_area))?;
    let std_vpa = in_range("value per m² deviation", std(&values_per_area))?;
    let cv_vpa = in_range("coefficient of variation", coefficient_of_variation(std_vpa, mean_vpa))?;

    let mean_fi = in_range("mean finish index", mean(&finish_indices))?;
    let std_fi = in_range("finish index deviation", std(&finish_indices))?;
    let cv_fi = in_range(
        "finish coefficient of variation",
        coefficient_of_variation(std_fi, mean_fi),
    )?;

    let mean_price = in_range("mean comparable price", mean(&prices))?;
    let median_price = in_range("median comparable price", median(&prices))?;

    let base_value = in_range("base value", subject.area_m2.checked_mul(mean_vpa))?;

    let (adjusted, subject_index) = match subject_finishes {
        Some(finishes) => {
            let index = in_range("subject finish index", finishes.index(weights))?;
            let adjusted = in_range("adjusted value", adjusted_value(base_value, index, mean_fi))?;
            (adjusted, Some(index))
        }
        None => (base_value, None),
    };

    let items = comparables
        .iter()
        .zip(values_per_area.iter().zip(finish_indices.iter()))
        .map(|(p, (vpa, fi))| ComparableItem {
            id: p.id,
            sector_id: p.sector_id,
            price: p.price,
            area: p.area_m2,
            value_per_area: round2(*vpa),
            finish_index: round2(*fi),
            rooms: p.bedrooms,
            bathrooms: p.bathrooms,
            parking: p.parking,
            year_built: p.year_built,
            state: p.state,
            finish_floor: FinishRef::from(&p.floor_finish),
            finish_kitchen: FinishRef::from(&p.kitchen_finish),
            finish_bathroom: FinishRef::from(&p.bathroom_finish),
        })
        .collect();

    Ok(ValuationResult {
        base_value: round2(base_value),
        adjusted_value: round2(adjusted),
        mean_value_per_area: round2(mean_vpa),
        median_value_per_area: round2(median_vpa),
        std_value_per_area: round2(std_vpa),
        coefficient_of_variation: round4(cv_vpa),
        comparable_count: n,
        mean_comparable_price: round2(mean_price),
        median_comparable_price: round2(median_price),
        mean_finish_index: round2(mean_fi),
        std_finish_index: round2(std_fi),
        finish_coefficient_of_variation: round4(cv_fi),
        subject_finish_index: subject_index.map(round2),
        subject_finish_detail: subject_finishes.map(|f| finish_detail(f, weights)),
        comparables: items,
    })
}

fn finish_detail(finishes: &SubjectFinishes, weights: &FinishWeights) -> SubjectFinishDetail {
    let detail = |f: &Finish, weight: Decimal| FinishDetail {
        id: f.id,
        name: f.name.clone(),
        score: f.score,
        weight,
    };
    SubjectFinishDetail {
        floor: detail(&finishes.floor, weights.floor),
        kitchen: detail(&finishes.kitchen, weights.kitchen),
        bathroom: detail(&finishes.bathroom, weights.bathroom),
    }
}

type FinishLookup = (Option<Finish>, Option<Finish>, Option<Finish>);

/// Runs appraisals against a [`ComparableSource`]. Holds no per-request state.
pub struct ValuationEngine {
    source: Arc<dyn ComparableSource>,
}

impl ValuationEngine {
    pub fn new(source: Arc<dyn ComparableSource>) -> Self {
        Self { source }
    }

    /// Fetch comparables, weights and the subject's finishes concurrently, then value the subject.
    #[instrument(skip(self, subject), fields(sector_id = subject.sector_id, area_m2 = %subject.area_m2))]
    pub async fn appraise(&self, subject: &Subject) -> Result<ValuationResult, ValuationError> {
        let band = subject_band(subject)?;

        let (comparables, configured_weights, looked_up) = tokio::try_join!(
            self.source.comparables(subject.sector_id, &band),
            self.source.finish_weights(),
            self.lookup_finishes(subject.finishes),
        )?;

        let outcome = resolve_finishes(subject.finishes, looked_up).and_then(|finishes| {
            let weights = FinishWeights::resolve(&configured_weights);
            compute_valuation(subject, &comparables, &weights, finishes.as_ref())
        });

        match &outcome {
            Ok(result) => info!(
                comparables = result.comparable_count,
                base_value = %result.base_value,
                adjusted_value = %result.adjusted_value,
                cv = %result.coefficient_of_variation,
                "Appraisal complete"
            ),
            Err(e) if e.is_client_error() => warn!(error = %e, "Appraisal rejected"),
            Err(_) => {}
        }

        outcome
    }

    async fn lookup_finishes(&self, ids: Option<FinishIds>) -> anyhow::Result<Option<FinishLookup>> {
        let Some(ids) = ids else {
            return Ok(None);
        };
        let found = tokio::try_join!(
            self.source.finish(ids.floor),
            self.source.finish(ids.kitchen),
            self.source.finish(ids.bathroom),
        )?;
        Ok(Some(found))
    }
}

/// Every requested finish must exist; no partial adjustment is attempted.
fn resolve_finishes(
    ids: Option<FinishIds>,
    looked_up: Option<FinishLookup>,
) -> Result<Option<SubjectFinishes>, ValuationError> {
    let (Some(ids), Some((floor, kitchen, bathroom))) = (ids, looked_up) else {
        return Ok(None);
    };
    Ok(Some(SubjectFinishes {
        floor: floor.ok_or(ValuationError::UnknownFinish { id: ids.floor })?,
        kitchen: kitchen.ok_or(ValuationError::UnknownFinish { id: ids.kitchen })?,
        bathroom: bathroom.ok_or(ValuationError::UnknownFinish { id: ids.bathroom })?,
    }))
}
