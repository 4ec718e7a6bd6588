//! API route definitions.

use super::state::AppState;
use super::ApiError;
use crate::detect::report::{DeviceStatus, MonitorReport};
use crate::detect::{AnomalyRecord, DeviceReading};
use anyhow::Context;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_ANOMALY_LIMIT: usize = 50;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/readings", post(submit_reading))
        .route("/monitor", post(monitor))
        .route("/anomalies", get(list_anomalies))
        .route("/devices", get(list_devices))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "devices": state.engine.device_count(),
            "engine": state.engine.config()
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn submit_reading(
    State(state): State<AppState>,
    Json(input): Json<DeviceReading>,
) -> Result<Json<Value>, ApiError> {
    check(&input)?;
    let record = state.engine.classify(&input.device_id, input.reading);
    let journal_error = journal(&state, vec![record.clone()]).await;
    Ok(Json(json!({
        "data": record,
        "meta": { "journal_error": journal_error }
    })))
}

#[derive(Debug, Deserialize)]
struct MonitorRequest {
    devices: Vec<DeviceReading>,
}

/// Classify one poll cycle worth of readings and summarize it.
async fn monitor(
    State(state): State<AppState>,
    Json(input): Json<MonitorRequest>,
) -> Result<Json<Value>, ApiError> {
    for item in &input.devices {
        check(item)?;
    }

    let statuses: Vec<DeviceStatus> = input
        .devices
        .into_iter()
        .map(|item| DeviceStatus {
            record: state.engine.classify(&item.device_id, item.reading),
            reading: item.reading,
        })
        .collect();
    let report = MonitorReport::from_statuses(statuses);
    let journal_error = journal(&state, report.anomalies.clone()).await;

    Ok(Json(json!({
        "data": report,
        "meta": { "total": report.devices.len(), "journal_error": journal_error }
    })))
}

#[derive(Debug, Deserialize)]
struct AnomalyQuery {
    limit: Option<usize>,
}

async fn list_anomalies(
    State(state): State<AppState>,
    Query(query): Query<AnomalyQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(journal) = state.journal.clone() else {
        return Ok(Json(
            json!({ "data": [], "meta": { "total": 0, "message": "anomaly journal disabled" } }),
        ));
    };
    let limit = query.limit.unwrap_or(DEFAULT_ANOMALY_LIMIT);

    let entries = tokio::task::spawn_blocking(move || journal.list_recent(limit))
        .await
        .context("journal task panicked")??;

    Ok(Json(json!({ "data": entries, "meta": { "total": entries.len() } })))
}

async fn list_devices(State(state): State<AppState>) -> Json<Value> {
    let devices: Vec<Value> = state
        .engine
        .device_ids()
        .into_iter()
        .map(|id| {
            let history = state.engine.history_len(&id).unwrap_or(0);
            json!({ "device_id": id, "history_len": history })
        })
        .collect();
    Json(json!({ "data": devices, "meta": { "total": devices.len() } }))
}

/// The JSON extractor already refuses numbers that overflow to infinity,
/// since serde_json has no NaN or infinity literals. This still guards
/// readings built any other way before they reach the engine.
fn check(item: &DeviceReading) -> Result<(), ApiError> {
    item.reading
        .validate()
        .map_err(|source| ApiError::InvalidReading {
            device_id: item.device_id.clone(),
            source,
        })
}

/// Persist anomalies off the async runtime. Healthy records are skipped by
/// the journal itself.
///
/// The readings are already in the engine's history by now, so a journal
/// failure is logged and reported back in `meta.journal_error` rather than
/// failing the request.
async fn journal(state: &AppState, records: Vec<AnomalyRecord>) -> Option<String> {
    let journal = state.journal.clone()?;
    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        for record in &records {
            journal.record(record)?;
        }
        Ok(())
    })
    .await
    .context("journal task panicked")
    .and_then(|inner| inner);

    match result {
        Ok(()) => None,
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "failed to journal anomalies");
            Some(message)
        }
    }
}
