//! Reference catalog and sample listings for the "LOS NARANJOS" sector.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::db::store::Store;
use crate::property::models::{FinishKind, NewProperty, NewSector, PropertyState};

pub const SEED_SECTOR: &str = "LOS NARANJOS";
const SEED_PORTAL: &str = "Mercadolibre";

const FINISHES: [(FinishKind, &str, Decimal); 13] = [
    (FinishKind::Floor, "Terracota", dec!(1)),
    (FinishKind::Floor, "Cerámica", dec!(2)),
    (FinishKind::Floor, "Machiembrado", dec!(3)),
    (FinishKind::Floor, "Porcelanato", dec!(4)),
    (FinishKind::Floor, "Parquet", dec!(4)),
    (FinishKind::Floor, "Marmol", dec!(8)),
    (FinishKind::Kitchen, "Fórmica", dec!(1)),
    (FinishKind::Kitchen, "Granito", dec!(5)),
    (FinishKind::Kitchen, "Cuarzo", dec!(6)),
    (FinishKind::Kitchen, "Marmol", dec!(8)),
    (FinishKind::Bathroom, "Cerámica", dec!(2)),
    (FinishKind::Bathroom, "Porcelanato", dec!(4)),
    (FinishKind::Bathroom, "Marmol", dec!(8)),
];

const WEIGHTS: [(FinishKind, Decimal); 3] = [
    (FinishKind::Floor, dec!(7)),
    (FinishKind::Bathroom, dec!(4)),
    (FinishKind::Kitchen, dec!(3)),
];

struct Listing {
    price: Decimal,
    area: Decimal,
    bedrooms: u32,
    bathrooms: u32,
    parking: u32,
    aux: i64,
    floor: &'static str,
    kitchen: &'static str,
    bathroom: &'static str,
    code: &'static str,
}

const fn listing(
    price: Decimal,
    area: Decimal,
    (bedrooms, bathrooms, parking, aux): (u32, u32, u32, i64),
    (floor, kitchen, bathroom): (&'static str, &'static str, &'static str),
    code: &'static str,
) -> Listing {
    Listing {
        price,
        area,
        bedrooms,
        bathrooms,
        parking,
        aux,
        floor,
        kitchen,
        bathroom,
        code,
    }
}

const LISTINGS: [Listing; 15] = [
    listing(dec!(75000), dec!(126), (3, 2, 2, 47), ("Terracota", "Fórmica", "Cerámica"), "817949404"),
    listing(dec!(80000), dec!(120), (4, 2, 2, 30), ("Machiembrado", "Granito", "Cerámica"), "818532602"),
    listing(dec!(97000), dec!(126), (3, 3, 2, 39), ("Porcelanato", "Granito", "Porcelanato"), "810620930"),
    listing(dec!(97000), dec!(127), (3, 3, 2, 39), ("Cerámica", "Granito", "Cerámica"), "812059458"),
    listing(dec!(97500), dec!(121), (3, 3, 1, 39), ("Porcelanato", "Granito", "Cerámica"), "816411140"),
    listing(dec!(99000), dec!(127), (3, 3, 2, 25), ("Porcelanato", "Granito", "Porcelanato"), "812472290"),
    listing(dec!(100000), dec!(121), (3, 3, 1, 39), ("Porcelanato", "Granito", "Cerámica"), "813355826"),
    listing(dec!(110000), dec!(124), (4, 3, 2, 43), ("Marmol", "Cuarzo", "Cerámica"), "766362823"),
    listing(dec!(115000), dec!(130), (3, 2, 2, 14), ("Porcelanato", "Granito", "Porcelanato"), "817491534"),
    listing(dec!(115000), dec!(130), (3, 2, 2, 44), ("Porcelanato", "Granito", "Cerámica"), "815960024"),
    listing(dec!(125000), dec!(130.65), (3, 3, 1, 44), ("Porcelanato", "Granito", "Porcelanato"), "814406560"),
    listing(dec!(130000), dec!(130), (3, 3, 2, 39), ("Porcelanato", "Granito", "Porcelanato"), "766224505"),
    listing(dec!(160000), dec!(130.65), (3, 3, 2, 25), ("Porcelanato", "Cuarzo", "Porcelanato"), "816566208"),
    listing(dec!(165000), dec!(124), (3, 3, 2, 42), ("Marmol", "Marmol", "Marmol"), "817403868"),
    listing(dec!(165000), dec!(116), (3, 3, 2, 16), ("Porcelanato", "Granito", "Porcelanato"), "813442820"),
];

/// Counts of what [`seed`] inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub sectors: usize,
    pub finishes: usize,
    pub weights: usize,
    pub properties: usize,
}

/// Replace all data with the reference catalog and sample listings.
pub async fn seed(store: &Store) -> Result<SeedSummary> {
    store.clear_all().await?;

    let sector = store
        .create_sector(&NewSector {
            name: SEED_SECTOR.to_string(),
            ..NewSector::default()
        })
        .await
        .context("Failed to seed sector")?;

    let mut finish_ids: HashMap<(FinishKind, &str), i64> = HashMap::new();
    for (kind, name, score) in FINISHES {
        let id = store.insert_finish(kind, name, score).await?;
        finish_ids.insert((kind, name), id);
    }

    for (kind, weight) in WEIGHTS {
        store.set_finish_weight(kind, weight).await?;
    }

    let lookup = |kind: FinishKind, name: &'static str| -> Result<i64> {
        finish_ids
            .get(&(kind, name))
            .copied()
            .with_context(|| format!("Seed finish not found: {kind}:{name}"))
    };

    for row in &LISTINGS {
        let property = NewProperty {
            sector_id: sector.id,
            price: row.price,
            area_m2: row.area,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            parking: row.parking,
            year_built: None,
            state: PropertyState::Available,
            latitude: None,
            longitude: None,
            floor_finish_id: lookup(FinishKind::Floor, row.floor)?,
            kitchen_finish_id: lookup(FinishKind::Kitchen, row.kitchen)?,
            bathroom_finish_id: lookup(FinishKind::Bathroom, row.bathroom)?,
            portal: Some(SEED_PORTAL.to_string()),
            publication_code: Some(row.code.to_string()),
            aux_column: Some(row.aux),
        };
        store
            .create_property(&property)
            .await
            .with_context(|| format!("Failed to seed listing {}", row.code))?;
    }

    let summary = SeedSummary {
        sectors: 1,
        finishes: FINISHES.len(),
        weights: WEIGHTS.len(),
        properties: LISTINGS.len(),
    };
    info!(
        sector = SEED_SECTOR,
        finishes = summary.finishes,
        properties = summary.properties,
        "Database seeded"
    );
    Ok(summary)
}
