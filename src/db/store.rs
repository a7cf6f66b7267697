use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, SqlitePool};

use crate::property::models::{
    Finish, FinishKind, FinishWeight, NewProperty, NewSector, Property, PropertyFilter,
    PropertyState, Sector,
};
use crate::valuation::engine::AreaBand;
use crate::valuation::ComparableSource;

pub struct Store {
    pool: SqlitePool,
}

/// Write failures the API reports to clients differently from plain I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, FromRow)]
struct FinishRow {
    id: i64,
    kind: String,
    name: String,
    score: String,
}

#[derive(Debug, Clone, FromRow)]
struct FinishWeightRow {
    kind: String,
    weight: String,
}

#[derive(Debug, Clone, FromRow)]
struct PropertyRow {
    id: i64,
    sector_id: i64,
    sector_name: String,
    price: String,
    area_m2: String,
    bedrooms: i64,
    bathrooms: i64,
    parking: i64,
    year_built: Option<i64>,
    state: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    portal: Option<String>,
    publication_code: Option<String>,
    aux_column: Option<i64>,
    floor_id: i64,
    floor_kind: String,
    floor_name: String,
    floor_score: String,
    kitchen_id: i64,
    kitchen_kind: String,
    kitchen_name: String,
    kitchen_score: String,
    bathroom_id: i64,
    bathroom_kind: String,
    bathroom_name: String,
    bathroom_score: String,
}

const BAND_SLACK_M2: f64 = 0.01;

const PROPERTY_SELECT: &str = "SELECT p.id, p.sector_id, s.name AS sector_name, p.price, p.area_m2,
        p.bedrooms, p.bathrooms, p.parking, p.year_built, p.state, p.latitude, p.longitude,
        p.portal, p.publication_code, p.aux_column,
        ff.id AS floor_id, ff.kind AS floor_kind, ff.name AS floor_name, ff.score AS floor_score,
        fk.id AS kitchen_id, fk.kind AS kitchen_kind, fk.name AS kitchen_name, fk.score AS kitchen_score,
        fb.id AS bathroom_id, fb.kind AS bathroom_kind, fb.name AS bathroom_name, fb.score AS bathroom_score
     FROM properties p
     JOIN sectors s ON s.id = p.sector_id
     JOIN finishes ff ON ff.id = p.floor_finish_id
     JOIN finishes fk ON fk.id = p.kitchen_finish_id
     JOIN finishes fb ON fb.id = p.bathroom_finish_id";

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Corrupted {field} value: {raw}"))
}

fn parse_count(field: &str, raw: i64) -> Result<u32> {
    u32::try_from(raw).with_context(|| format!("Corrupted {field} value: {raw}"))
}

impl TryFrom<FinishRow> for Finish {
    type Error = anyhow::Error;

    fn try_from(row: FinishRow) -> Result<Self> {
        Ok(Finish {
            id: row.id,
            kind: row
                .kind
                .parse()
                .with_context(|| format!("Corrupted kind for finish {}", row.id))?,
            score: parse_decimal("finish score", &row.score)?,
            name: row.name,
        })
    }
}

impl TryFrom<FinishWeightRow> for FinishWeight {
    type Error = anyhow::Error;

    fn try_from(row: FinishWeightRow) -> Result<Self> {
        Ok(FinishWeight {
            kind: row
                .kind
                .parse()
                .with_context(|| format!("Corrupted finish weight kind: {}", row.kind))?,
            weight: parse_decimal("finish weight", &row.weight)?,
        })
    }
}

impl TryFrom<PropertyRow> for Property {
    type Error = anyhow::Error;

    fn try_from(row: PropertyRow) -> Result<Self> {
        let finish = |id: i64, kind: &str, name: String, score: &str| -> Result<Finish> {
            Ok(Finish {
                id,
                kind: kind
                    .parse()
                    .with_context(|| format!("Corrupted kind for finish {id}"))?,
                name,
                score: parse_decimal("finish score", score)?,
            })
        };

        Ok(Property {
            id: row.id,
            sector_id: row.sector_id,
            sector_name: row.sector_name,
            price: parse_decimal("price", &row.price)?,
            area_m2: parse_decimal("area_m2", &row.area_m2)?,
            bedrooms: parse_count("bedrooms", row.bedrooms)?,
            bathrooms: parse_count("bathrooms", row.bathrooms)?,
            parking: parse_count("parking", row.parking)?,
            year_built: row
                .year_built
                .map(i32::try_from)
                .transpose()
                .context("Corrupted year_built value")?,
            state: PropertyState::from_str(&row.state)
                .with_context(|| format!("Corrupted state for property {}", row.id))?,
            latitude: row.latitude,
            longitude: row.longitude,
            floor_finish: finish(row.floor_id, &row.floor_kind, row.floor_name, &row.floor_score)?,
            kitchen_finish: finish(
                row.kitchen_id,
                &row.kitchen_kind,
                row.kitchen_name,
                &row.kitchen_score,
            )?,
            bathroom_finish: finish(
                row.bathroom_id,
                &row.bathroom_kind,
                row.bathroom_name,
                &row.bathroom_score,
            )?,
            portal: row.portal,
            publication_code: row.publication_code,
            aux_column: row.aux_column,
        })
    }
}

/// Classify a failed INSERT/UPDATE by the constraint it hit.
fn write_error(err: sqlx::Error, conflict: &str, invalid_reference: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::InvalidReference(invalid_reference.to_string());
        }
    }
    StoreError::Other(anyhow::Error::new(err).context("Failed to write row"))
}

impl Store {
    /// Create a Store from an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{database_path}"))
            .context("Invalid database path")?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every connection to ":memory:" opens a separate database, so keep exactly one alive
        let pool_options = if database_path == ":memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_init.sql");
        // Execute each statement separately (sqlx doesn't support multiple statements in one call)
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to execute migration: {trimmed}"))?;
            }
        }
        Ok(())
    }

    /// Delete every row and reset id sequences.
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        for table in ["properties", "finish_weights", "finishes", "sectors", "sqlite_sequence"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to clear {table}"))?;
        }
        tx.commit().await.context("Failed to commit clear")?;
        Ok(())
    }

    // --- Sector operations ---

    pub async fn list_sectors(&self) -> Result<Vec<Sector>> {
        let sectors = sqlx::query_as::<_, Sector>(
            "SELECT id, name, latitude, longitude FROM sectors ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch sectors")?;
        Ok(sectors)
    }

    pub async fn get_sector(&self, id: i64) -> Result<Option<Sector>> {
        let sector = sqlx::query_as::<_, Sector>(
            "SELECT id, name, latitude, longitude FROM sectors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch sector")?;
        Ok(sector)
    }

    pub async fn create_sector(&self, sector: &NewSector) -> Result<Sector, StoreError> {
        let result = sqlx::query("INSERT INTO sectors (name, latitude, longitude) VALUES (?, ?, ?)")
            .bind(&sector.name)
            .bind(sector.latitude)
            .bind(sector.longitude)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "a sector with this name already exists", "invalid sector"))?;

        let id = result.last_insert_rowid();
        self.get_sector(id)
            .await?
            .ok_or_else(|| StoreError::Other(anyhow!("Sector {id} missing after insert")))
    }

    pub async fn update_sector(&self, id: i64, sector: &NewSector) -> Result<Sector, StoreError> {
        let result =
            sqlx::query("UPDATE sectors SET name = ?, latitude = ?, longitude = ? WHERE id = ?")
                .bind(&sector.name)
                .bind(sector.latitude)
                .bind(sector.longitude)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    write_error(e, "a sector with this name already exists", "invalid sector")
                })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("sector {id} not found")));
        }
        self.get_sector(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("sector {id} not found")))
    }

    /// Refuses to delete a sector that still has properties.
    pub async fn delete_sector(&self, id: i64) -> Result<(), StoreError> {
        if self.get_sector(id).await?.is_none() {
            return Err(StoreError::NotFound(format!("sector {id} not found")));
        }

        let (in_use,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM properties WHERE sector_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count sector properties")?;
        if in_use > 0 {
            return Err(StoreError::Conflict(format!(
                "sector {id} has {in_use} associated properties"
            )));
        }

        sqlx::query("DELETE FROM sectors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete sector")?;
        Ok(())
    }

    // --- Finish catalog operations ---

    /// All finishes ordered by kind, score and name; or one kind ordered by score and name.
    pub async fn list_finishes(&self, kind: Option<FinishKind>) -> Result<Vec<Finish>> {
        let rows = match kind {
            Some(kind) => sqlx::query_as::<_, FinishRow>(
                "SELECT id, kind, name, score FROM finishes WHERE kind = ?
                 ORDER BY CAST(score AS REAL), name",
            )
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch finishes by kind")?,
            None => sqlx::query_as::<_, FinishRow>(
                "SELECT id, kind, name, score FROM finishes ORDER BY kind, CAST(score AS REAL), name",
            )
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch finishes")?,
        };
        rows.into_iter().map(Finish::try_from).collect()
    }

    pub async fn get_finish(&self, id: i64) -> Result<Option<Finish>> {
        let row = sqlx::query_as::<_, FinishRow>(
            "SELECT id, kind, name, score FROM finishes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch finish")?;
        row.map(Finish::try_from).transpose()
    }

    pub async fn insert_finish(&self, kind: FinishKind, name: &str, score: Decimal) -> Result<i64> {
        let result = sqlx::query("INSERT INTO finishes (kind, name, score) VALUES (?, ?, ?)")
            .bind(kind.as_str())
            .bind(name)
            .bind(score.to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert finish {kind}:{name}"))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_finish_weights(&self) -> Result<Vec<FinishWeight>> {
        let rows = sqlx::query_as::<_, FinishWeightRow>(
            "SELECT kind, weight FROM finish_weights ORDER BY kind",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch finish weights")?;
        rows.into_iter().map(FinishWeight::try_from).collect()
    }

    pub async fn set_finish_weight(&self, kind: FinishKind, weight: Decimal) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO finish_weights (kind, weight) VALUES (?, ?)")
            .bind(kind.as_str())
            .bind(weight.to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to set weight for {kind}"))?;
        Ok(())
    }

    // --- Property operations ---

    async fn query_properties(&self, filter: &PropertyFilter, order_by: &str) -> Result<Vec<Property>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(PROPERTY_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(sector_id) = filter.sector_id {
            qb.push(" AND p.sector_id = ").push_bind(sector_id);
        }
        if let Some(min_area) = filter.min_area {
            qb.push(" AND CAST(p.area_m2 AS REAL) >= ").push_bind(min_area);
        }
        if let Some(max_area) = filter.max_area {
            qb.push(" AND CAST(p.area_m2 AS REAL) <= ").push_bind(max_area);
        }
        if let Some(min_price) = filter.min_price {
            qb.push(" AND CAST(p.price AS REAL) >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            qb.push(" AND CAST(p.price AS REAL) <= ").push_bind(max_price);
        }
        qb.push(" ORDER BY ").push(order_by);

        let rows: Vec<PropertyRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch properties")?;
        rows.into_iter().map(Property::try_from).collect()
    }

    /// Filtered listing ordered by sector, then price.
    pub async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        self.query_properties(filter, "p.sector_id, CAST(p.price AS REAL), p.id")
            .await
    }

    /// Properties in `sector_id` whose area lies inside `band`, in insertion order.
    ///
    /// SQLite compares areas as REAL, so the query uses a slightly widened band and
    /// the exact inclusive bounds are applied to the decoded decimals.
    pub async fn find_comparables(&self, sector_id: i64, band: &AreaBand) -> Result<Vec<Property>> {
        let filter = PropertyFilter {
            sector_id: Some(sector_id),
            min_area: band.min.to_f64().map(|v| v - BAND_SLACK_M2),
            max_area: band.max.to_f64().map(|v| v + BAND_SLACK_M2),
            ..PropertyFilter::default()
        };
        let mut found = self.query_properties(&filter, "p.id").await?;
        found.retain(|p| band.contains(p.area_m2));
        Ok(found)
    }

    pub async fn get_property(&self, id: i64) -> Result<Option<Property>> {
        let sql = format!("{PROPERTY_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch property")?;
        row.map(Property::try_from).transpose()
    }

    /// Each finish slot must reference an existing finish of that slot's kind.
    async fn check_finish_slots(&self, property: &NewProperty) -> Result<(), StoreError> {
        let slots = [
            (FinishKind::Floor, property.floor_finish_id),
            (FinishKind::Kitchen, property.kitchen_finish_id),
            (FinishKind::Bathroom, property.bathroom_finish_id),
        ];
        for (kind, id) in slots {
            match self.get_finish(id).await? {
                None => {
                    return Err(StoreError::InvalidReference(format!(
                        "finish {id} does not exist"
                    )))
                }
                Some(finish) if finish.kind != kind => {
                    return Err(StoreError::InvalidReference(format!(
                        "finish {id} is a {} finish, expected {kind}",
                        finish.kind
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub async fn create_property(&self, property: &NewProperty) -> Result<Property, StoreError> {
        self.check_finish_slots(property).await?;
        let result = sqlx::query(
            "INSERT INTO properties (sector_id, price, area_m2, bedrooms, bathrooms, parking, year_built, state, latitude, longitude, floor_finish_id, kitchen_finish_id, bathroom_finish_id, portal, publication_code, aux_column)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(property.sector_id)
        .bind(property.price.to_string())
        .bind(property.area_m2.to_string())
        .bind(i64::from(property.bedrooms))
        .bind(i64::from(property.bathrooms))
        .bind(i64::from(property.parking))
        .bind(property.year_built)
        .bind(property.state.as_str())
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.floor_finish_id)
        .bind(property.kitchen_finish_id)
        .bind(property.bathroom_finish_id)
        .bind(&property.portal)
        .bind(&property.publication_code)
        .bind(property.aux_column)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "publication code already exists",
                "sector or finish id does not exist",
            )
        })?;

        let id = result.last_insert_rowid();
        self.get_property(id)
            .await?
            .ok_or_else(|| StoreError::Other(anyhow!("Property {id} missing after insert")))
    }

    /// Replace every column of an existing property.
    pub async fn update_property(&self, id: i64, property: &NewProperty) -> Result<Property, StoreError> {
        self.check_finish_slots(property).await?;
        let result = sqlx::query(
            "UPDATE properties SET sector_id = ?, price = ?, area_m2 = ?, bedrooms = ?, bathrooms = ?, parking = ?, year_built = ?, state = ?, latitude = ?, longitude = ?, floor_finish_id = ?, kitchen_finish_id = ?, bathroom_finish_id = ?, portal = ?, publication_code = ?, aux_column = ?
             WHERE id = ?",
        )
        .bind(property.sector_id)
        .bind(property.price.to_string())
        .bind(property.area_m2.to_string())
        .bind(i64::from(property.bedrooms))
        .bind(i64::from(property.bathrooms))
        .bind(i64::from(property.parking))
        .bind(property.year_built)
        .bind(property.state.as_str())
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.floor_finish_id)
        .bind(property.kitchen_finish_id)
        .bind(property.bathroom_finish_id)
        .bind(&property.portal)
        .bind(&property.publication_code)
        .bind(property.aux_column)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "publication code already exists",
                "sector or finish id does not exist",
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("property {id} not found")));
        }
        self.get_property(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("property {id} not found")))
    }

    pub async fn delete_property(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete property")?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("property {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ComparableSource for Store {
    async fn comparables(&self, sector_id: i64, band: &AreaBand) -> Result<Vec<Property>> {
        self.find_comparables(sector_id, band).await
    }

    async fn finish_weights(&self) -> Result<Vec<FinishWeight>> {
        self.list_finish_weights().await
    }

    async fn finish(&self, id: i64) -> Result<Option<Finish>> {
        self.get_finish(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Store,
        sector_id: i64,
        floor: i64,
        kitchen: i64,
        bathroom: i64,
    }

    async fn fixture() -> Fixture {
        let store = Store::new(":memory:").await.expect("should create store");
        let sector = store
            .create_sector(&NewSector {
                name: "LOS NARANJOS".to_string(),
                ..NewSector::default()
            })
            .await
            .expect("should create sector");
        let floor = store
            .insert_finish(FinishKind::Floor, "Porcelanato", dec!(4))
            .await
            .unwrap();
        let kitchen = store
            .insert_finish(FinishKind::Kitchen, "Granito", dec!(5))
            .await
            .unwrap();
        let bathroom = store
            .insert_finish(FinishKind::Bathroom, "Cerámica", dec!(2))
            .await
            .unwrap();
        Fixture {
            store,
            sector_id: sector.id,
            floor,
            kitchen,
            bathroom,
        }
    }

    fn new_property(f: &Fixture, price: Decimal, area: Decimal) -> NewProperty {
        NewProperty {
            sector_id: f.sector_id,
            price,
            area_m2: area,
            bedrooms: 3,
            bathrooms: 2,
            parking: 1,
            year_built: Some(2015),
            state: PropertyState::Available,
            latitude: None,
            longitude: None,
            floor_finish_id: f.floor,
            kitchen_finish_id: f.kitchen,
            bathroom_finish_id: f.bathroom,
            portal: Some("Mercadolibre".to_string()),
            publication_code: None,
            aux_column: None,
        }
    }

    #[tokio::test]
    async fn test_store_create_and_migrate() {
        let store = Store::new(":memory:").await.expect("should create store");
        assert!(store.list_sectors().await.unwrap().is_empty());
        assert!(store.list_finish_weights().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sector_name_is_unique() {
        let f = fixture().await;
        let err = f
            .store
            .create_sector(&NewSector {
                name: "LOS NARANJOS".to_string(),
                ..NewSector::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_sector_is_not_found() {
        let f = fixture().await;
        let err = f
            .store
            .update_sector(
                999,
                &NewSector {
                    name: "X".to_string(),
                    ..NewSector::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_property_round_trip_keeps_decimals() {
        let f = fixture().await;
        let created = f
            .store
            .create_property(&new_property(&f, dec!(125000), dec!(130.65)))
            .await
            .expect("should insert property");

        let fetched = f.store.get_property(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, dec!(125000));
        assert_eq!(fetched.area_m2, dec!(130.65));
        assert_eq!(fetched.sector_name, "LOS NARANJOS");
        assert_eq!(fetched.floor_finish.name, "Porcelanato");
        assert_eq!(fetched.bathroom_finish.score, dec!(2));
        assert_eq!(fetched.year_built, Some(2015));
    }

    #[tokio::test]
    async fn test_property_with_unknown_finish_is_rejected() {
        let f = fixture().await;
        let mut p = new_property(&f, dec!(100000), dec!(120));
        p.kitchen_finish_id = 999;
        let err = f.store.create_property(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_duplicate_publication_code_conflicts() {
        let f = fixture().await;
        let mut p = new_property(&f, dec!(100000), dec!(120));
        p.publication_code = Some("816411140".to_string());
        f.store.create_property(&p).await.unwrap();
        let err = f.store.create_property(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_comparables_respect_sector_and_band() {
        let f = fixture().await;
        for area in [dec!(100), dec!(110), dec!(130), dec!(150)] {
            f.store
                .create_property(&new_property(&f, dec!(100000), area))
                .await
                .unwrap();
        }

        let band = AreaBand::around(dec!(120)).unwrap(); // [102, 138]
        let found = f.store.find_comparables(f.sector_id, &band).await.unwrap();
        let areas: Vec<Decimal> = found.iter().map(|p| p.area_m2).collect();
        assert_eq!(areas, vec![dec!(110), dec!(130)]);

        let other_sector = f.store.find_comparables(f.sector_id + 1, &band).await.unwrap();
        assert!(other_sector.is_empty());
    }

    #[tokio::test]
    async fn test_comparables_band_bounds_are_inclusive() {
        let f = fixture().await;
        for area in [dec!(108.79), dec!(108.8), dec!(128), dec!(147.2), dec!(147.21)] {
            f.store
                .create_property(&new_property(&f, dec!(100000), area))
                .await
                .unwrap();
        }

        let band = AreaBand::around(dec!(128)).unwrap();
        assert_eq!((band.min, band.max), (dec!(108.8), dec!(147.2)));

        let found = f.store.find_comparables(f.sector_id, &band).await.unwrap();
        let areas: Vec<Decimal> = found.iter().map(|p| p.area_m2).collect();
        assert_eq!(areas, vec![dec!(108.8), dec!(128), dec!(147.2)]);
    }

    #[tokio::test]
    async fn test_finish_in_wrong_slot_is_rejected() {
        let f = fixture().await;
        let mut p = new_property(&f, dec!(100000), dec!(120));
        p.floor_finish_id = f.kitchen;
        let err = f.store.create_property(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));

        let created = f
            .store
            .create_property(&new_property(&f, dec!(100000), dec!(120)))
            .await
            .unwrap();
        assert_eq!(created.kitchen_finish.kind, FinishKind::Kitchen);
        let mut swapped = new_property(&f, dec!(100000), dec!(120));
        swapped.bathroom_finish_id = f.floor;
        let err = f.store.update_property(created.id, &swapped).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));

        // Rows written outside the store still report the finish's own kind
        sqlx::query("UPDATE properties SET floor_finish_id = ? WHERE id = ?")
            .bind(f.kitchen)
            .bind(created.id)
            .execute(f.store.pool())
            .await
            .unwrap();
        let stored = f.store.get_property(created.id).await.unwrap().unwrap();
        assert_eq!(stored.floor_finish.kind, FinishKind::Kitchen);
    }

    #[tokio::test]
    async fn test_list_properties_filters_and_orders_by_price() {
        let f = fixture().await;
        for (price, area) in [(dec!(130000), dec!(120)), (dec!(90000), dec!(125)), (dec!(250000), dec!(200))] {
            f.store
                .create_property(&new_property(&f, price, area))
                .await
                .unwrap();
        }

        let filter = PropertyFilter {
            max_price: Some(200000.0),
            ..PropertyFilter::default()
        };
        let listed = f.store.list_properties(&filter).await.unwrap();
        let prices: Vec<Decimal> = listed.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![dec!(90000), dec!(130000)]);
    }

    #[tokio::test]
    async fn test_delete_sector_in_use_conflicts() {
        let f = fixture().await;
        let created = f
            .store
            .create_property(&new_property(&f, dec!(100000), dec!(120)))
            .await
            .unwrap();

        let err = f.store.delete_sector(f.sector_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        f.store.delete_property(created.id).await.unwrap();
        f.store.delete_sector(f.sector_id).await.unwrap();
        assert!(f.store.get_sector(f.sector_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_weights_upsert() {
        let f = fixture().await;
        f.store.set_finish_weight(FinishKind::Floor, dec!(7)).await.unwrap();
        f.store.set_finish_weight(FinishKind::Floor, dec!(9)).await.unwrap();
        let weights = f.store.list_finish_weights().await.unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].weight, dec!(9));
    }

    #[tokio::test]
    async fn test_list_finishes_by_kind() {
        let f = fixture().await;
        f.store
            .insert_finish(FinishKind::Floor, "Terracota", dec!(1))
            .await
            .unwrap();
        let floors = f.store.list_finishes(Some(FinishKind::Floor)).await.unwrap();
        let names: Vec<&str> = floors.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(names, vec!["Terracota", "Porcelanato"]);
        assert_eq!(f.store.list_finishes(None).await.unwrap().len(), 4);
    }
}
