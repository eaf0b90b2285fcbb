//! Emergency response revenue.
//!
//! Emergency hours are flagged upstream; the engine only prices them at 10% of
//! the clearing price on the capped effective response.

use super::effective::{self, NegativeResponsePolicy};
use crate::market::{HourRecord, SettlementDay};

/// Revenue contributed by one emergency hour, zero for other hours.
pub fn hour_revenue(record: &HourRecord, policy: NegativeResponsePolicy) -> f64 {
    if !record.emergency {
        return 0.0;
    }
    effective::for_record(record, policy).effective_kw * record.emergency_price()
}

/// Emergency revenue over a settlement day.
pub fn day_revenue(day: &SettlementDay, policy: NegativeResponsePolicy) -> f64 {
    day.emergency_hours()
        .map(|r| hour_revenue(r, policy))
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::market::{EntityId, RecordSet};

    fn record(hour: u8, response_kw: f64, emergency: bool) -> HourRecord {
        HourRecord {
            entity_id: EntityId::from("D1"),
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default(),
            hour,
            baseline_kw: 200.0,
            output_kw: 200.0 - response_kw,
            bid_kw: 100.0,
            capacity_kw: 0.0,
            clearing_price: 500.0,
            capacity_price: 0.0,
            day_ahead_active: false,
            emergency,
        }
    }

    #[test]
    fn emergency_hour_worked_example() {
        let r = record(18, 40.0, true);
        assert!((hour_revenue(&r, NegativeResponsePolicy::Clip) - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn non_emergency_hour_pays_nothing() {
        let r = record(18, 40.0, false);
        assert_eq!(hour_revenue(&r, NegativeResponsePolicy::Clip), 0.0);
    }

    #[test]
    fn emergency_response_is_capped() {
        // actual 130 vs threshold 110 -> 120 effective
        let r = record(18, 130.0, true);
        assert!((hour_revenue(&r, NegativeResponsePolicy::Clip) - 120.0 * 50.0).abs() < 1e-9);
    }

    #[test]
    fn day_revenue_sums_flagged_hours() {
        let set = RecordSet::from_records(vec![
            record(17, 40.0, true),
            record(18, 20.0, true),
            record(19, 90.0, false),
        ])
        .unwrap();
        let day = &set.period(&EntityId::from("D1")).unwrap().days[0];
        assert!((day_revenue(day, NegativeResponsePolicy::Clip) - 3_000.0).abs() < 1e-9);
    }
}
