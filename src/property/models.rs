use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which part of a dwelling a finish applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishKind {
    Floor,
    Kitchen,
    Bathroom,
}

impl FinishKind {
    pub const ALL: [FinishKind; 3] = [Self::Floor, Self::Kitchen, Self::Bathroom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Kitchen => "kitchen",
            Self::Bathroom => "bathroom",
        }
    }
}

impl fmt::Display for FinishKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinishKind {
    type Err = UnknownVariant;

    /// Accepts the legacy catalog names (`piso`, `cocina`, `bano`) as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "floor" | "piso" => Ok(Self::Floor),
            "kitchen" | "cocina" => Ok(Self::Kitchen),
            "bathroom" | "bano" | "baño" => Ok(Self::Bathroom),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Listing state of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyState {
    #[default]
    Available,
    Reserved,
    Rented,
    Sold,
}

impl PropertyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Rented => "rented",
            Self::Sold => "sold",
        }
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" | "disponible" => Ok(Self::Available),
            "reserved" | "reservada" => Ok(Self::Reserved),
            "rented" | "alquilada" => Ok(Self::Rented),
            "sold" | "vendida" => Ok(Self::Sold),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// Named geographic zone used to group comparables.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    pub id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSector {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A quality-graded material choice from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finish {
    pub id: i64,
    pub kind: FinishKind,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub score: Decimal,
}

/// Configured importance of one finish kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishWeight {
    pub kind: FinishKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
}

/// A listed property as stored in the repository, with its finishes resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub sector_id: i64,
    pub sector_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub area_m2: Decimal,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking: u32,
    pub year_built: Option<i32>,
    pub state: PropertyState,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub floor_finish: Finish,
    pub kitchen_finish: Finish,
    pub bathroom_finish: Finish,
    pub portal: Option<String>,
    pub publication_code: Option<String>,
    pub aux_column: Option<i64>,
}

/// Validated input for inserting or replacing a property row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub sector_id: i64,
    pub price: Decimal,
    pub area_m2: Decimal,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking: u32,
    pub year_built: Option<i32>,
    pub state: PropertyState,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub floor_finish_id: i64,
    pub kitchen_finish_id: i64,
    pub bathroom_finish_id: i64,
    pub portal: Option<String>,
    pub publication_code: Option<String>,
    pub aux_column: Option<i64>,
}

/// Optional filters for property listings. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertyFilter {
    pub sector_id: Option<i64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_kind_parses_legacy_names() {
        assert_eq!("piso".parse::<FinishKind>().unwrap(), FinishKind::Floor);
        assert_eq!("Cocina".parse::<FinishKind>().unwrap(), FinishKind::Kitchen);
        assert_eq!("bano".parse::<FinishKind>().unwrap(), FinishKind::Bathroom);
        assert_eq!("bathroom".parse::<FinishKind>().unwrap(), FinishKind::Bathroom);
        assert!("roof".parse::<FinishKind>().is_err());
    }

    #[test]
    fn test_property_state_round_trips_through_display() {
        for state in [
            PropertyState::Available,
            PropertyState::Reserved,
            PropertyState::Rented,
            PropertyState::Sold,
        ] {
            assert_eq!(state.to_string().parse::<PropertyState>().unwrap(), state);
        }
        assert_eq!(PropertyState::default(), PropertyState::Available);
    }

    #[test]
    fn test_finish_serializes_score_as_number() {
        let finish = Finish {
            id: 4,
            kind: FinishKind::Floor,
            name: "Porcelanato".to_string(),
            score: rust_decimal_macros::dec!(4),
        };
        let json = serde_json::to_value(&finish).unwrap();
        assert_eq!(json["kind"], "floor");
        assert_eq!(json["score"], 4.0);
    }
}
