//! End-to-end appraisals against the seeded sample sector.

use std::sync::Arc;

use cma_valuation::db::seed;
use cma_valuation::db::store::Store;
use cma_valuation::property::models::FinishKind;
use cma_valuation::valuation::engine::{FinishIds, Subject, ValuationEngine, ValuationError};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn seeded() -> (Arc<Store>, ValuationEngine) {
    let store = Arc::new(Store::new(":memory:").await.expect("should create store"));
    seed::seed(&store).await.expect("should seed");
    let engine = ValuationEngine::new(store.clone());
    (store, engine)
}

async fn finish_id(store: &Store, kind: FinishKind, name: &str) -> i64 {
    store
        .list_finishes(Some(kind))
        .await
        .unwrap()
        .into_iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("{kind}:{name} should be seeded"))
        .id
}

async fn finishes(store: &Store, floor: &str, kitchen: &str, bathroom: &str) -> FinishIds {
    FinishIds {
        floor: finish_id(store, FinishKind::Floor, floor).await,
        kitchen: finish_id(store, FinishKind::Kitchen, kitchen).await,
        bathroom: finish_id(store, FinishKind::Bathroom, bathroom).await,
    }
}

fn subject(area: Decimal, finishes: Option<FinishIds>) -> Subject {
    Subject {
        sector_id: 1,
        area_m2: area,
        bedrooms: Some(3),
        bathrooms: Some(3),
        parking: Some(2),
        year_built: None,
        finishes,
    }
}

#[tokio::test]
async fn appraisal_without_finishes_uses_whole_sector() {
    let (_store, engine) = seeded().await;
    let result = engine.appraise(&subject(dec!(128), None)).await.unwrap();

    // Band [108.8, 147.2] covers every sample listing
    assert_eq!(result.comparable_count, 15);
    assert_eq!(result.comparables.len(), 15);
    assert_eq!(result.adjusted_value, result.base_value);
    assert!(result.subject_finish_index.is_none());
    assert!(result.subject_finish_detail.is_none());
    assert_eq!(result.median_comparable_price, dec!(110000));
    assert!(result.base_value > Decimal::ZERO);
    assert!(result.coefficient_of_variation > Decimal::ZERO);
    assert!(result.coefficient_of_variation < Decimal::ONE);
}

#[tokio::test]
async fn appraisal_outside_band_has_no_comparables() {
    let (_store, engine) = seeded().await;
    let err = engine.appraise(&subject(dec!(1000), None)).await.unwrap_err();
    assert!(matches!(err, ValuationError::NoComparables { sector_id: 1, .. }));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn appraisal_in_unknown_sector_has_no_comparables() {
    let (_store, engine) = seeded().await;
    let mut s = subject(dec!(128), None);
    s.sector_id = 42;
    let err = engine.appraise(&s).await.unwrap_err();
    assert!(matches!(err, ValuationError::NoComparables { .. }));
}

#[tokio::test]
async fn appraisal_with_unknown_finish_is_rejected() {
    let (store, engine) = seeded().await;
    let mut ids = finishes(&store, "Porcelanato", "Granito", "Porcelanato").await;
    ids.kitchen = 999;
    let err = engine.appraise(&subject(dec!(128), Some(ids))).await.unwrap_err();
    assert!(matches!(err, ValuationError::UnknownFinish { id: 999 }));
}

#[tokio::test]
async fn marble_finishes_raise_the_value() {
    let (store, engine) = seeded().await;
    let ids = finishes(&store, "Marmol", "Marmol", "Marmol").await;
    let result = engine.appraise(&subject(dec!(128), Some(ids))).await.unwrap();

    assert!(result.adjusted_value > result.base_value);
    assert_eq!(result.subject_finish_index, Some(dec!(8)));
    let detail = result.subject_finish_detail.expect("detail should be present");
    assert_eq!(detail.floor.name, "Marmol");
    assert_eq!(detail.floor.weight, dec!(7));
    assert_eq!(detail.kitchen.weight, dec!(3));
    assert_eq!(detail.bathroom.weight, dec!(4));
}

#[tokio::test]
async fn basic_finishes_lower_the_value() {
    let (store, engine) = seeded().await;
    let ids = finishes(&store, "Terracota", "Fórmica", "Cerámica").await;
    let result = engine.appraise(&subject(dec!(128), Some(ids))).await.unwrap();
    assert!(result.adjusted_value < result.base_value);
}

#[tokio::test]
async fn appraisal_is_idempotent() {
    let (store, engine) = seeded().await;
    let ids = finishes(&store, "Porcelanato", "Cuarzo", "Porcelanato").await;
    let s = subject(dec!(125), Some(ids));
    let first = engine.appraise(&s).await.unwrap();
    let second = engine.appraise(&s).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn configured_weights_override_defaults() {
    let (store, engine) = seeded().await;
    store
        .set_finish_weight(FinishKind::Kitchen, dec!(10))
        .await
        .unwrap();
    let ids = finishes(&store, "Marmol", "Marmol", "Marmol").await;
    let result = engine.appraise(&subject(dec!(128), Some(ids))).await.unwrap();
    let detail = result.subject_finish_detail.unwrap();
    assert_eq!(detail.kitchen.weight, dec!(10));
    assert_eq!(detail.floor.weight, dec!(7));
}
