//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{
    DayRow, DaysQuery, ErrorResponse, RejectedAgent, SettlementSummary, SettlementsResponse,
    WarningsResponse,
};
use crate::market::EntityId;

fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error: message }))
}

/// Returns the run report and every entity's period totals.
///
/// `GET /settlements` → 200 + `SettlementsResponse` JSON
pub async fn list_settlements(State(state): State<Arc<AppState>>) -> Json<SettlementsResponse> {
    Json(SettlementsResponse {
        report: state.report.clone(),
        entities: state
            .run
            .entities
            .values()
            .map(SettlementSummary::from)
            .collect(),
    })
}

/// Returns one entity with its daily figures.
///
/// `GET /settlements/{id}` → 200 + `EntitySettlement` JSON, or 404
pub async fn get_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.run.get(&EntityId::from(id.as_str())) {
        Some(s) => Ok(Json(s.clone())),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("no settlement for entity \"{id}\""),
        )),
    }
}

/// Returns daily rows, optionally filtered by entity and date range.
///
/// `GET /days?entity=D1&from=2024-07-01&to=2024-07-07` → inclusive range
/// `GET /days?from=2024-07-07&to=2024-07-01` → 400 + `ErrorResponse`
pub async fn get_days(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> impl IntoResponse {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(error(
                StatusCode::BAD_REQUEST,
                format!("`from` ({from}) must be <= `to` ({to})"),
            ));
        }
    }

    let rows: Vec<DayRow> = state
        .run
        .daily_rows()
        .filter(|(s, _)| query.entity.as_deref().is_none_or(|e| s.id.as_str() == e))
        .filter(|(_, d)| query.from.is_none_or(|from| d.date >= from))
        .filter(|(_, d)| query.to.is_none_or(|to| d.date <= to))
        .map(|(s, d)| DayRow::new(s, d))
        .collect();

    Ok(Json(rows))
}

/// Returns warnings and rejected agents.
///
/// `GET /warnings` → 200 + `WarningsResponse` JSON
pub async fn get_warnings(State(state): State<Arc<AppState>>) -> Json<WarningsResponse> {
    Json(WarningsResponse {
        warnings: state.run.warnings.clone(),
        rejected: state
            .run
            .rejected
            .iter()
            .map(|(agent, err)| RejectedAgent {
                agent: agent.clone(),
                error: err.to_string(),
            })
            .collect(),
    })
}
