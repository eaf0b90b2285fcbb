use chrono::NaiveDate;
use serde::Serialize;

use crate::market::{EntityId, RoleKind};

/// Settlement figures of one entity for one day.
///
/// Every revenue stream is already net of its own assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayFigures {
    pub date: NaiveDate,
    /// Capacity revenue before the agent/user split.
    pub capacity_gross: f64,
    /// Capacity revenue credited to this entity.
    pub capacity_revenue: f64,
    /// Day-ahead response fee received (`F_response`).
    pub response_fee: f64,
    /// Response fees paid on to represented users (agents only).
    pub user_payout: f64,
    pub assess_pre: f64,
    pub assess_final: f64,
    pub emergency_revenue: f64,
    /// Response above 110% of bid over the day (kW summed over hours).
    pub excess_kw: f64,
}

impl DayFigures {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            capacity_gross: 0.0,
            capacity_revenue: 0.0,
            response_fee: 0.0,
            user_payout: 0.0,
            assess_pre: 0.0,
            assess_final: 0.0,
            emergency_revenue: 0.0,
            excess_kw: 0.0,
        }
    }

    pub fn response_revenue(&self) -> f64 {
        self.response_fee - self.user_payout - self.assess_final
    }

    pub fn total_revenue(&self) -> f64 {
        self.capacity_revenue + self.response_revenue() + self.emergency_revenue
    }
}

/// Period totals of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub days: usize,
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

/// Reduces daily figures to period totals.
pub fn reduce_days(days: &[DayFigures]) -> PeriodTotals {
    let mut totals = days.iter().fold(PeriodTotals::default(), |mut acc, d| {
        acc.days += 1;
        acc.capacity_revenue += d.capacity_revenue;
        acc.response_fee += d.response_fee;
        acc.user_payout += d.user_payout;
        acc.assess_pre += d.assess_pre;
        acc.assess_final += d.assess_final;
        acc.response_revenue += d.response_revenue();
        acc.emergency_revenue += d.emergency_revenue;
        acc.excess_kw += d.excess_kw;
        acc
    });
    totals.total_revenue =
        totals.capacity_revenue + totals.response_revenue + totals.emergency_revenue;
    totals
}

/// Complete settlement of one entity over the period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySettlement {
    pub id: EntityId,
    pub role: RoleKind,
    /// Representing agent, for represented users.
    pub agent: Option<EntityId>,
    pub days: Vec<DayFigures>,
    pub totals: PeriodTotals,
}

impl EntitySettlement {
    /// Builds the settlement, ordering days by date and reducing totals.
    pub fn from_days(
        id: EntityId,
        role: RoleKind,
        agent: Option<EntityId>,
        mut days: Vec<DayFigures>,
    ) -> Self {
        days.sort_by_key(|d| d.date);
        let totals = reduce_days(&days);
        Self {
            id,
            role,
            agent,
            days,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> DayFigures {
        DayFigures {
            capacity_gross: 1_000.0,
            capacity_revenue: 800.0,
            response_fee: 40_000.0,
            user_payout: 0.0,
            assess_pre: 5_500.0,
            assess_final: 5_500.0,
            emergency_revenue: 2_000.0,
            excess_kw: 8.0,
            ..DayFigures::empty(NaiveDate::from_ymd_opt(2024, 7, d).unwrap_or_default())
        }
    }

    #[test]
    fn day_total_is_sum_of_net_streams() {
        let d = day(1);
        assert!((d.response_revenue() - 34_500.0).abs() < 1e-9);
        assert!((d.total_revenue() - (800.0 + 34_500.0 + 2_000.0)).abs() < 1e-9);
    }

    #[test]
    fn period_reduction_sums_days() {
        let totals = reduce_days(&[day(1), day(2), day(3)]);
        assert_eq!(totals.days, 3);
        assert!((totals.response_revenue - 3.0 * 34_500.0).abs() < 1e-9);
        assert!(
            (totals.total_revenue
                - (totals.capacity_revenue + totals.response_revenue + totals.emergency_revenue))
                .abs()
                < 1e-9
        );
        assert!((totals.excess_kw - 24.0).abs() < 1e-9);
    }

    #[test]
    fn agent_payout_reduces_response_revenue() {
        let d = DayFigures {
            response_fee: 50_000.0,
            user_payout: 40_000.0,
            assess_final: 1_000.0,
            ..DayFigures::empty(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default())
        };
        assert!((d.response_revenue() - 9_000.0).abs() < 1e-9);
    }

    #[test]
    fn empty_period_totals_are_zero() {
        let totals = reduce_days(&[]);
        assert_eq!(totals, PeriodTotals::default());
    }

    #[test]
    fn from_days_orders_by_date() {
        let s = EntitySettlement::from_days(
            EntityId::from("D1"),
            RoleKind::Direct,
            None,
            vec![day(3), day(1), day(2)],
        );
        let dates: Vec<u32> = s
            .days
            .iter()
            .map(|d| chrono::Datelike::day(&d.date))
            .collect();
        assert_eq!(dates, vec![1, 2, 3]);
        assert_eq!(s.totals.days, 3);
    }
}
