use crate::market::{HourRecord, RegionProfile, SettlementDay};

/// Standby capacity actually paid for one hour.
///
/// While regional day-ahead response is active the contracted quantity is
/// capped at the regional mean bid; without a regional figure it is uncapped.
pub fn settled_capacity_kw(
    capacity_kw: f64,
    day_ahead_active: bool,
    regional_mean_bid_kw: Option<f64>,
) -> f64 {
    match (day_ahead_active, regional_mean_bid_kw) {
        (true, Some(mean)) => capacity_kw.min(mean),
        _ => capacity_kw,
    }
}

/// Capacity revenue contributed by a single record.
pub fn hour_revenue(record: &HourRecord, region: &RegionProfile) -> f64 {
    let settled = settled_capacity_kw(
        record.capacity_kw,
        record.day_ahead_active,
        region.mean_bid_kw(record.date, record.hour),
    );
    settled * record.capacity_price
}

/// Gross capacity revenue over a settlement day.
pub fn day_revenue(day: &SettlementDay, region: &RegionProfile) -> f64 {
    day.hours.iter().map(|r| hour_revenue(r, region)).sum()
}

/// Capacity revenue divided between an agent and one represented user.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapacitySplit {
    pub gross: f64,
    /// `gross * gamma`, paid to the agent.
    pub agent: f64,
    /// `gross * (1 - gamma)`, kept by the user.
    pub user: f64,
}

pub fn split(gross: f64, gamma: f64) -> CapacitySplit {
    CapacitySplit {
        gross,
        agent: gross * gamma,
        user: gross * (1.0 - gamma),
    }
}
