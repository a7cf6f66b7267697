//! `POST /amc/run`: comparative market appraisal.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::api::validate;
use crate::api::AppState;
use crate::error::ApiError;
use crate::valuation::engine::{FinishIds, Subject};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAppraisalRequest {
    pub sector_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub area_m2: Decimal,
    #[serde(default, rename = "habitaciones", alias = "bedrooms")]
    pub bedrooms: Option<i64>,
    #[serde(default, rename = "banos", alias = "bathrooms")]
    pub bathrooms: Option<i64>,
    #[serde(default, rename = "parqueos", alias = "parking")]
    pub parking: Option<i64>,
    #[serde(default, rename = "anioConstruccion", alias = "yearBuilt")]
    pub year_built: Option<i32>,
    #[serde(default, alias = "finishPisoId")]
    pub finish_floor_id: Option<i64>,
    #[serde(default, alias = "finishCocinaId")]
    pub finish_kitchen_id: Option<i64>,
    #[serde(default, alias = "finishBanoId")]
    pub finish_bathroom_id: Option<i64>,
}

impl RunAppraisalRequest {
    pub fn into_subject(self) -> Result<Subject, ApiError> {
        let finishes = match (
            self.finish_floor_id,
            self.finish_kitchen_id,
            self.finish_bathroom_id,
        ) {
            (None, None, None) => None,
            (Some(floor), Some(kitchen), Some(bathroom)) => Some(FinishIds {
                floor: validate::positive_id("finishFloorId", floor)?,
                kitchen: validate::positive_id("finishKitchenId", kitchen)?,
                bathroom: validate::positive_id("finishBathroomId", bathroom)?,
            }),
            _ => {
                return Err(ApiError::Validation(
                    "finishFloorId, finishKitchenId and finishBathroomId must be given together"
                        .to_string(),
                ))
            }
        };

        Ok(Subject {
            sector_id: validate::positive_id("sectorId", self.sector_id)?,
            area_m2: validate::positive("areaM2", self.area_m2)?,
            bedrooms: validate::count("habitaciones", self.bedrooms)?,
            bathrooms: validate::count("banos", self.bathrooms)?,
            parking: validate::count("parqueos", self.parking)?,
            year_built: validate::year("anioConstruccion", self.year_built)?,
            finishes,
        })
    }
}

pub async fn run_appraisal(
    State(state): State<AppState>,
    payload: Result<Json<RunAppraisalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let subject = request.into_subject()?;
    let result = state.engine.appraise(&subject).await?;
    state.health.record_appraisal().await;
    Ok((StatusCode::CREATED, Json(result)))
}
