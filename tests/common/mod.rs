//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use dr_settlement::market::{EntityId, HourRecord, PricingMode, RecordSet, RegionProfile, Registry};
use dr_settlement::market::region::RegionBid;

/// Day `d` of July 2024.
pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

/// A day-ahead response hour with no standby capacity.
pub fn response_hour(
    id: &str,
    day: u32,
    hour: u8,
    response_kw: f64,
    bid_kw: f64,
    clearing_price: f64,
) -> HourRecord {
    HourRecord {
        entity_id: EntityId::from(id),
        date: date(day),
        hour,
        baseline_kw: 500.0,
        output_kw: 500.0 - response_kw,
        bid_kw,
        capacity_kw: 0.0,
        clearing_price,
        capacity_price: 0.0,
        day_ahead_active: true,
        emergency: false,
    }
}

/// An emergency hour outside any day-ahead window.
pub fn emergency_hour(
    id: &str,
    day: u32,
    hour: u8,
    response_kw: f64,
    bid_kw: f64,
    clearing_price: f64,
) -> HourRecord {
    HourRecord {
        day_ahead_active: false,
        emergency: true,
        ..response_hour(id, day, hour, response_kw, bid_kw, clearing_price)
    }
}

/// One direct user `D1` and agent `A1` (γ=0.2, θ=0.5) representing
/// `U1` (floor 400 + 30%) and `U2` (fixed 450).
pub fn worked_registry() -> Registry {
    let mut reg = Registry::new();
    reg.add_direct(EntityId::from("D1")).unwrap();
    let agent = reg
        .add_agent(EntityId::from("A1"), Some(0.2), Some(0.5))
        .unwrap();
    reg.add_represented(
        agent,
        EntityId::from("U1"),
        Some(PricingMode::FloorPlusShare {
            floor: 400.0,
            alpha: 0.3,
        }),
    )
    .unwrap();
    reg.add_represented(
        agent,
        EntityId::from("U2"),
        Some(PricingMode::FixedPrice { price: 450.0 }),
    )
    .unwrap();
    reg
}

/// Records matching `scenarios/worked_example_records.csv`.
pub fn worked_records() -> RecordSet {
    let with_capacity = |r: HourRecord, capacity_kw: f64| HourRecord {
        capacity_kw,
        capacity_price: 5.0,
        ..r
    };
    RecordSet::from_records(vec![
        with_capacity(response_hour("D1", 1, 10, 80.0, 100.0, 500.0), 110.0),
        with_capacity(emergency_hour("D1", 1, 18, 40.0, 100.0, 500.0), 110.0),
        with_capacity(response_hour("U1", 1, 10, 50.0, 50.0, 600.0), 60.0),
        with_capacity(response_hour("U2", 1, 10, 30.0, 50.0, 600.0), 60.0),
    ])
    .unwrap()
}

/// Regional mean bid of 83.75 kW in the worked day-ahead hour.
pub fn worked_region() -> RegionProfile {
    RegionProfile::from_bids([RegionBid {
        date: date(1),
        hour: 10,
        average_bid_kw: 83.75,
    }])
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
