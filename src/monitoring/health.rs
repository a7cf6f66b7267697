//! Service health reported by `GET /`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Shared health state updated by the appraisal handlers.
#[derive(Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthData>>,
}

#[derive(Debug, Clone)]
struct HealthData {
    started_at: DateTime<Utc>,
    appraisals_served: u64,
    last_appraisal_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub message: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub appraisals_served: u64,
    pub last_appraisal_at: Option<DateTime<Utc>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthData {
                started_at: Utc::now(),
                appraisals_served: 0,
                last_appraisal_at: None,
            })),
        }
    }

    pub async fn record_appraisal(&self) {
        let mut data = self.inner.write().await;
        data.appraisals_served += 1;
        data.last_appraisal_at = Some(Utc::now());
    }

    pub async fn report(&self) -> HealthReport {
        let data = self.inner.read().await;
        HealthReport {
            ok: true,
            message: "CMA valuation API running".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: data.started_at,
            uptime_seconds: (Utc::now() - data.started_at).num_seconds(),
            appraisals_served: data.appraisals_served,
            last_appraisal_at: data.last_appraisal_at,
        }
    }
}
