//! Property tests over the settlement calculators.

mod common;

use dr_settlement::market::{PricingMode, RecordSet, RegionProfile};
use dr_settlement::settle::day_ahead::{self, ResponseHour, prorate};
use dr_settlement::settle::effective::effective_capacity;
use dr_settlement::settle::{Engine, EngineConfig, NegativeResponsePolicy, reserve};
use proptest::prelude::*;

const CLIP: NegativeResponsePolicy = NegativeResponsePolicy::Clip;

proptest! {
    #[test]
    fn effective_never_exceeds_actual(
        baseline in 0.0f64..1_000.0,
        output in 0.0f64..1_000.0,
        bid in 0.0f64..500.0,
    ) {
        let q = effective_capacity(baseline, output, bid, CLIP);
        prop_assert!(q.effective_kw <= q.actual_kw + 1e-9);
        let ceiling = 1.1 * bid + 0.5 * (q.actual_kw - 1.1 * bid).max(0.0);
        prop_assert!(q.effective_kw <= ceiling + 1e-9);
        prop_assert!(q.effective_kw >= 0.0);
        prop_assert!(q.excess_kw >= 0.0);
    }

    #[test]
    fn effective_is_monotone_in_response(
        bid in 0.0f64..500.0,
        a in 0.0f64..1_000.0,
        b in 0.0f64..1_000.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let q_lo = effective_capacity(1_000.0, 1_000.0 - lo, bid, CLIP);
        let q_hi = effective_capacity(1_000.0, 1_000.0 - hi, bid, CLIP);
        prop_assert!(q_lo.effective_kw <= q_hi.effective_kw + 1e-9);
    }

    #[test]
    fn capacity_split_conserves_gross(gross in 0.0f64..1e6, gamma in 0.0f64..=1.0) {
        let s = reserve::split(gross, gamma);
        prop_assert!((s.agent + s.user - gross).abs() < 1e-6);
    }

    #[test]
    fn settled_capacity_never_exceeds_contract(
        capacity in 0.0f64..500.0,
        mean in proptest::option::of(0.0f64..500.0),
        active in any::<bool>(),
    ) {
        let settled = reserve::settled_capacity_kw(capacity, active, mean);
        prop_assert!(settled <= capacity);
    }

    #[test]
    fn user_share_of_proration_is_theta(
        agent_pre in 0.0f64..1e6,
        user_pre in proptest::collection::vec(0.0f64..1e5, 1..6),
        theta in 0.0f64..=1.0,
    ) {
        let p = prorate(agent_pre, &user_pre, theta);
        let related: f64 = user_pre.iter().sum();
        let users: f64 = p.user_final.iter().sum();
        if related > 0.0 {
            prop_assert!((users - agent_pre * theta).abs() < 1e-6 * agent_pre.max(1.0));
        } else {
            prop_assert_eq!(users, 0.0);
        }
        prop_assert!((p.agent_final - (agent_pre - related)).abs() < 1e-6);
    }

    #[test]
    fn direct_fee_matches_hourly_sum(
        hours in proptest::collection::vec((0.0f64..200.0, 0.0f64..200.0, 0.0f64..1_000.0), 1..24),
    ) {
        let hours: Vec<ResponseHour> = hours
            .into_iter()
            .enumerate()
            .map(|(h, (bid_kw, effective_kw, clearing_price))| ResponseHour {
                hour: h as u8,
                bid_kw,
                effective_kw,
                clearing_price,
            })
            .collect();
        let r = day_ahead::settle_direct(&hours);
        let expected: f64 = hours.iter().map(|h| h.effective_kw * h.clearing_price).sum();
        prop_assert!((r.response_fee - expected).abs() < 1e-6);
        prop_assert!(r.assessment_fee >= 0.0);
    }

    #[test]
    fn fixed_price_fee_ignores_clearing_price(
        price in 0.0f64..1_000.0,
        clearing in 0.0f64..1_000.0,
    ) {
        let mode = PricingMode::FixedPrice { price };
        prop_assert_eq!(mode.unit_price(clearing), price);
    }

    #[test]
    fn agent_capacity_conserved_across_users(
        u1_kw in 0.0f64..200.0,
        u2_kw in 0.0f64..200.0,
    ) {
        let registry = common::worked_registry();
        let with_capacity = |r: dr_settlement::market::HourRecord, kw: f64| {
            dr_settlement::market::HourRecord {
                capacity_kw: kw,
                capacity_price: 2.0,
                day_ahead_active: false,
                ..r
            }
        };
        let records = RecordSet::from_records(vec![
            with_capacity(common::response_hour("U1", 1, 3, 0.0, 0.0, 50.0), u1_kw),
            with_capacity(common::response_hour("U2", 1, 3, 0.0, 0.0, 50.0), u2_kw),
        ])
        .unwrap();
        let run = Engine::new(EngineConfig::default(), &registry, &records, RegionProfile::new())
            .run();
        let total: f64 = ["A1", "U1", "U2"]
            .iter()
            .map(|id| run.get(&(*id).into()).unwrap().totals.capacity_revenue)
            .sum();
        prop_assert!((total - 2.0 * (u1_kw + u2_kw)).abs() < 1e-6);
    }
}
