//! Property listing routes.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::api::validate;
use crate::api::AppState;
use crate::error::ApiError;
use crate::property::models::{NewProperty, Property, PropertyFilter, PropertyState};

/// Body of `POST /properties`. Legacy Spanish field names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    pub sector_id: i64,
    #[serde(alias = "precio", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(alias = "areaConstruccionM2", with = "rust_decimal::serde::float")]
    pub area_m2: Decimal,
    #[serde(default, alias = "habitaciones")]
    pub bedrooms: Option<i64>,
    #[serde(default, alias = "banos")]
    pub bathrooms: Option<i64>,
    #[serde(default, alias = "parqueos")]
    pub parking: Option<i64>,
    #[serde(default, alias = "anioConstruccion")]
    pub year_built: Option<i32>,
    #[serde(default, alias = "estado")]
    pub state: Option<String>,
    #[serde(default, alias = "latitud")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "longitud")]
    pub longitude: Option<f64>,
    #[serde(alias = "acabadoPisoId")]
    pub floor_finish_id: i64,
    #[serde(alias = "acabadoCocinaId")]
    pub kitchen_finish_id: i64,
    #[serde(alias = "acabadoBanoId")]
    pub bathroom_finish_id: i64,
    #[serde(default)]
    pub portal: Option<String>,
    #[serde(default, alias = "codPublicacion")]
    pub publication_code: Option<String>,
    #[serde(default, alias = "columnaAux")]
    pub aux_column: Option<i64>,
}

impl CreatePropertyRequest {
    pub fn validate(self) -> Result<NewProperty, ApiError> {
        let state = match self.state {
            Some(raw) => raw
                .parse::<PropertyState>()
                .map_err(|_| ApiError::Validation(format!("invalid state: {raw}")))?,
            None => PropertyState::default(),
        };

        Ok(NewProperty {
            sector_id: validate::positive_id("sectorId", self.sector_id)?,
            price: validate::positive("price", self.price)?,
            area_m2: validate::positive("areaM2", self.area_m2)?,
            bedrooms: validate::count("bedrooms", self.bedrooms)?.unwrap_or(0),
            bathrooms: validate::count("bathrooms", self.bathrooms)?.unwrap_or(0),
            parking: validate::count("parking", self.parking)?.unwrap_or(0),
            year_built: validate::year("yearBuilt", self.year_built)?,
            state,
            latitude: validate::latitude(self.latitude)?,
            longitude: validate::longitude(self.longitude)?,
            floor_finish_id: validate::positive_id("floorFinishId", self.floor_finish_id)?,
            kitchen_finish_id: validate::positive_id("kitchenFinishId", self.kitchen_finish_id)?,
            bathroom_finish_id: validate::positive_id("bathroomFinishId", self.bathroom_finish_id)?,
            portal: validate::text("portal", self.portal)?,
            publication_code: validate::text("publicationCode", self.publication_code)?,
            aux_column: self.aux_column,
        })
    }
}

/// Body of `PATCH /properties/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyRequest {
    pub sector_id: Option<i64>,
    #[serde(default, alias = "precio", with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "areaConstruccionM2", with = "rust_decimal::serde::float_option")]
    pub area_m2: Option<Decimal>,
    #[serde(default, alias = "habitaciones")]
    pub bedrooms: Option<i64>,
    #[serde(default, alias = "banos")]
    pub bathrooms: Option<i64>,
    #[serde(default, alias = "parqueos")]
    pub parking: Option<i64>,
    #[serde(default, alias = "anioConstruccion")]
    pub year_built: Option<i32>,
    #[serde(default, alias = "estado")]
    pub state: Option<String>,
    #[serde(default, alias = "latitud")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "longitud")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "acabadoPisoId")]
    pub floor_finish_id: Option<i64>,
    #[serde(default, alias = "acabadoCocinaId")]
    pub kitchen_finish_id: Option<i64>,
    #[serde(default, alias = "acabadoBanoId")]
    pub bathroom_finish_id: Option<i64>,
    #[serde(default)]
    pub portal: Option<String>,
    #[serde(default, alias = "codPublicacion")]
    pub publication_code: Option<String>,
    #[serde(default, alias = "columnaAux")]
    pub aux_column: Option<i64>,
}

impl UpdatePropertyRequest {
    /// Overlay the patch on the stored row; the result goes through the create checks.
    pub fn merge(self, existing: Property) -> CreatePropertyRequest {
        CreatePropertyRequest {
            sector_id: self.sector_id.unwrap_or(existing.sector_id),
            price: self.price.unwrap_or(existing.price),
            area_m2: self.area_m2.unwrap_or(existing.area_m2),
            bedrooms: self.bedrooms.or(Some(existing.bedrooms.into())),
            bathrooms: self.bathrooms.or(Some(existing.bathrooms.into())),
            parking: self.parking.or(Some(existing.parking.into())),
            year_built: self.year_built.or(existing.year_built),
            state: self.state.or_else(|| Some(existing.state.to_string())),
            latitude: self.latitude.or(existing.latitude),
            longitude: self.longitude.or(existing.longitude),
            floor_finish_id: self.floor_finish_id.unwrap_or(existing.floor_finish.id),
            kitchen_finish_id: self.kitchen_finish_id.unwrap_or(existing.kitchen_finish.id),
            bathroom_finish_id: self.bathroom_finish_id.unwrap_or(existing.bathroom_finish.id),
            portal: self.portal.or(existing.portal),
            publication_code: self.publication_code.or(existing.publication_code),
            aux_column: self.aux_column.or(existing.aux_column),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    pub sector_id: Option<i64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl From<PropertyQuery> for PropertyFilter {
    fn from(q: PropertyQuery) -> Self {
        PropertyFilter {
            sector_id: q.sector_id,
            min_area: q.min_area,
            max_area: q.max_area,
            min_price: q.min_price,
            max_price: q.max_price,
        }
    }
}

pub async fn list_properties(
    State(state): State<AppState>,
    query: Result<Query<PropertyQuery>, QueryRejection>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let Query(query) = query?;
    let filter = PropertyFilter::from(query);
    Ok(Json(state.store.list_properties(&filter).await?))
}

pub async fn get_property(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Property>, ApiError> {
    let Path(id) = id?;
    state
        .store
        .get_property(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("property {id} not found")))
}

pub async fn create_property(
    State(state): State<AppState>,
    payload: Result<Json<CreatePropertyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let property = state.store.create_property(&request.validate()?).await?;
    info!(
        property_id = property.id,
        sector_id = property.sector_id,
        price = %property.price,
        "Property created"
    );
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn update_property(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePropertyRequest>, JsonRejection>,
) -> Result<Json<Property>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let existing = state
        .store
        .get_property(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("property {id} not found")))?;

    let property = request.merge(existing).validate()?;
    Ok(Json(state.store.update_property(id, &property).await?))
}

pub async fn delete_property(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path(id) = id?;
    state.store.delete_property(id).await?;
    info!(property_id = id, "Property deleted");
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(json: &str) -> CreatePropertyRequest {
        serde_json::from_str(json).expect("should deserialize")
    }

    #[test]
    fn test_legacy_field_names() {
        let r = request(
            r#"{"sectorId":1,"precio":97500,"areaConstruccionM2":121,"habitaciones":3,
                "banos":3,"parqueos":1,"acabadoPisoId":4,"acabadoCocinaId":8,"acabadoBanoId":11,
                "codPublicacion":"816411140","columnaAux":39}"#,
        );
        let p = r.validate().unwrap();
        assert_eq!(p.price, dec!(97500));
        assert_eq!(p.area_m2, dec!(121));
        assert_eq!(p.bathrooms, 3);
        assert_eq!(p.kitchen_finish_id, 8);
        assert_eq!(p.publication_code.as_deref(), Some("816411140"));
        assert_eq!(p.state, PropertyState::Available);
    }

    #[test]
    fn test_rejects_non_positive_price_and_bad_state() {
        let base = r#""sectorId":1,"areaM2":100,"floorFinishId":1,"kitchenFinishId":2,"bathroomFinishId":3"#;
        let zero = request(&format!(r#"{{"price":0,{base}}}"#));
        assert!(matches!(zero.validate(), Err(ApiError::Validation(_))));

        let bad_state = request(&format!(r#"{{"price":1,"state":"demolished",{base}}}"#));
        assert!(matches!(bad_state.validate(), Err(ApiError::Validation(_))));

        let old = request(&format!(r#"{{"price":1,"yearBuilt":1850,{base}}}"#));
        assert!(matches!(old.validate(), Err(ApiError::Validation(_))));
    }
}
