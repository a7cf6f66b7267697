pub mod engine;
pub mod finish;
pub mod stats;

use anyhow::Result;
use async_trait::async_trait;

use crate::property::models::{Finish, FinishWeight, Property};
use crate::valuation::engine::AreaBand;

/// Read access the engine needs from the property repository and finish catalog.
/// None of the calls depend on each other, so the engine may issue them concurrently.
#[async_trait]
pub trait ComparableSource: Send + Sync {
    /// Properties in `sector_id` whose constructed area falls inside `band` (inclusive).
    async fn comparables(&self, sector_id: i64, band: &AreaBand) -> Result<Vec<Property>>;

    /// Configured finish weights. Kinds may be missing.
    async fn finish_weights(&self) -> Result<Vec<FinishWeight>>;

    /// Look up a catalog finish by id.
    async fn finish(&self, id: i64) -> Result<Option<Finish>>;
}
