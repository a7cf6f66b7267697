//! Sector and finish catalog routes.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::info;

use crate::api::validate;
use crate::api::AppState;
use crate::error::ApiError;
use crate::property::models::{Finish, FinishKind, FinishWeight, NewSector, Sector};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectorRequest {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "latitud")]
    pub latitude: Option<f64>,
    #[serde(alias = "longitud")]
    pub longitude: Option<f64>,
}

impl CreateSectorRequest {
    fn validate(self) -> Result<NewSector, ApiError> {
        Ok(NewSector {
            name: validate::required_text("name", self.name)?,
            latitude: validate::latitude(self.latitude)?,
            longitude: validate::longitude(self.longitude)?,
        })
    }
}

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectorRequest {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "latitud")]
    pub latitude: Option<f64>,
    #[serde(alias = "longitud")]
    pub longitude: Option<f64>,
}

impl UpdateSectorRequest {
    fn merge(self, existing: Sector) -> CreateSectorRequest {
        CreateSectorRequest {
            name: self.name.unwrap_or(existing.name),
            latitude: self.latitude.or(existing.latitude),
            longitude: self.longitude.or(existing.longitude),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FinishQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list_sectors(State(state): State<AppState>) -> Result<Json<Vec<Sector>>, ApiError> {
    Ok(Json(state.store.list_sectors().await?))
}

pub async fn create_sector(
    State(state): State<AppState>,
    payload: Result<Json<CreateSectorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let sector = state.store.create_sector(&request.validate()?).await?;
    info!(sector_id = sector.id, name = %sector.name, "Sector created");
    Ok((StatusCode::CREATED, Json(sector)))
}

pub async fn update_sector(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateSectorRequest>, JsonRejection>,
) -> Result<Json<Sector>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let existing = state
        .store
        .get_sector(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("sector {id} not found")))?;

    let sector = request.merge(existing).validate()?;
    Ok(Json(state.store.update_sector(id, &sector).await?))
}

pub async fn delete_sector(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path(id) = id?;
    state.store.delete_sector(id).await?;
    info!(sector_id = id, "Sector deleted");
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

pub async fn list_finishes(
    State(state): State<AppState>,
    query: Result<Query<FinishQuery>, QueryRejection>,
) -> Result<Json<Vec<Finish>>, ApiError> {
    let Query(query) = query?;
    let kind = query
        .kind
        .map(|raw| {
            raw.parse::<FinishKind>()
                .map_err(|_| ApiError::BadRequest(format!("invalid finish type: {raw}")))
        })
        .transpose()?;
    Ok(Json(state.store.list_finishes(kind).await?))
}

pub async fn list_finish_weights(
    State(state): State<AppState>,
) -> Result<Json<Vec<FinishWeight>>, ApiError> {
    Ok(Json(state.store.list_finish_weights().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sector_accepts_legacy_field_names() {
        let request: CreateSectorRequest =
            serde_json::from_str(r#"{"nombre":" LOS NARANJOS ","latitud":-0.1}"#).unwrap();
        let sector = request.validate().unwrap();
        assert_eq!(sector.name, "LOS NARANJOS");
        assert_eq!(sector.latitude, Some(-0.1));
    }

    #[test]
    fn test_update_sector_keeps_unspecified_fields() {
        let existing = Sector {
            id: 1,
            name: "A".to_string(),
            latitude: Some(1.0),
            longitude: Some(2.0),
        };
        let merged = UpdateSectorRequest {
            name: Some("B".to_string()),
            ..UpdateSectorRequest::default()
        }
        .merge(existing);
        assert_eq!(merged.name, "B");
        assert_eq!(merged.latitude, Some(1.0));
        assert_eq!(merged.longitude, Some(2.0));
    }
}
