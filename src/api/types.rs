//! API response and query types.
//!
//! Daily rows use the same field names as the daily CSV export.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Warning;
use crate::market::{EntityId, RoleKind};
use crate::settle::{DayFigures, EntitySettlement, PeriodTotals, SettlementReport};

/// Period totals of one entity, without its daily figures.
#[derive(Debug, Serialize)]
pub struct SettlementSummary {
    pub entity_id: EntityId,
    pub role: RoleKind,
    pub agent: Option<EntityId>,
    pub totals: PeriodTotals,
}

impl From<&EntitySettlement> for SettlementSummary {
    fn from(s: &EntitySettlement) -> Self {
        Self {
            entity_id: s.id.clone(),
            role: s.role,
            agent: s.agent.clone(),
            totals: s.totals.clone(),
        }
    }
}

/// Response of `GET /settlements`.
#[derive(Debug, Serialize)]
pub struct SettlementsResponse {
    pub report: SettlementReport,
    pub entities: Vec<SettlementSummary>,
}

/// One entity-day, using daily CSV field names.
#[derive(Debug, Serialize)]
pub struct DayRow {
    pub entity_id: EntityId,
    pub role: RoleKind,
    pub date: NaiveDate,
    pub capacity_revenue: f64,
    pub response_fee: f64,
    pub user_payout: f64,
    pub assess_pre: f64,
    pub assess_final: f64,
    pub response_revenue: f64,
    pub emergency_revenue: f64,
    pub excess_kw: f64,
    pub total_revenue: f64,
}

impl DayRow {
    pub fn new(s: &EntitySettlement, d: &DayFigures) -> Self {
        Self {
            entity_id: s.id.clone(),
            role: s.role,
            date: d.date,
            capacity_revenue: d.capacity_revenue,
            response_fee: d.response_fee,
            user_payout: d.user_payout,
            assess_pre: d.assess_pre,
            assess_final: d.assess_final,
            response_revenue: d.response_revenue(),
            emergency_revenue: d.emergency_revenue,
            excess_kw: d.excess_kw,
            total_revenue: d.total_revenue(),
        }
    }
}

/// Optional filters for the days endpoint.
#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub entity: Option<String>,
    /// First date (inclusive).
    pub from: Option<NaiveDate>,
    /// Last date (inclusive).
    pub to: Option<NaiveDate>,
}

/// An agent rejected for a configuration error.
#[derive(Debug, Serialize)]
pub struct RejectedAgent {
    pub agent: EntityId,
    pub error: String,
}

/// Response of `GET /warnings`.
#[derive(Debug, Serialize)]
pub struct WarningsResponse {
    pub warnings: Vec<Warning>,
    pub rejected: Vec<RejectedAgent>,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
