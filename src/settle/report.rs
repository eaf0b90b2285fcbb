//! Human-readable summary of a settlement run.

use std::fmt;

use serde::Serialize;

use super::engine::SettlementRun;
use crate::market::RoleKind;

/// Run-level totals derived from a complete [`SettlementRun`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettlementReport {
    pub direct_users: usize,
    pub represented_users: usize,
    pub agents: usize,
    pub rejected_agents: usize,
    /// Distinct settled days across all entities.
    pub settlement_days: usize,
    pub capacity_revenue: f64,
    pub response_revenue: f64,
    pub emergency_revenue: f64,
    /// Final assessment charged to every entity.
    pub assessment_charged: f64,
    pub total_revenue: f64,
    pub warnings: usize,
}

impl SettlementReport {
    /// Computes the report from the run's entity settlements.
    pub fn from_run(run: &SettlementRun) -> Self {
        let mut report = Self {
            rejected_agents: run.rejected.len(),
            warnings: run.warnings.len(),
            ..Self::default()
        };

        let mut dates = std::collections::BTreeSet::new();
        for s in run.entities.values() {
            match s.role {
                RoleKind::Direct => report.direct_users += 1,
                RoleKind::Represented => report.represented_users += 1,
                RoleKind::Agent => report.agents += 1,
            }
            dates.extend(s.days.iter().map(|d| d.date));
            report.capacity_revenue += s.totals.capacity_revenue;
            report.response_revenue += s.totals.response_revenue;
            report.emergency_revenue += s.totals.emergency_revenue;
            report.assessment_charged += s.totals.assess_final;
            report.total_revenue += s.totals.total_revenue;
        }
        report.settlement_days = dates.len();
        report
    }
}

impl fmt::Display for SettlementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Settlement Report ---")?;
        writeln!(
            f,
            "Entities:              {} direct, {} represented, {} agents",
            self.direct_users, self.represented_users, self.agents
        )?;
        writeln!(f, "Rejected agents:       {}", self.rejected_agents)?;
        writeln!(f, "Settlement days:       {}", self.settlement_days)?;
        writeln!(f, "Capacity revenue:      {:.2}", self.capacity_revenue)?;
        writeln!(f, "Response revenue:      {:.2}", self.response_revenue)?;
        writeln!(f, "Emergency revenue:     {:.2}", self.emergency_revenue)?;
        writeln!(f, "Assessment charged:    {:.2}", self.assessment_charged)?;
        writeln!(f, "Total revenue:         {:.2}", self.total_revenue)?;
        write!(f, "Warnings:              {}", self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::error::SettleError;
    use crate::market::EntityId;
    use crate::settle::{DayFigures, EntitySettlement};

    fn day(d: u32, capacity: f64, fee: f64) -> DayFigures {
        DayFigures {
            capacity_revenue: capacity,
            response_fee: fee,
            ..DayFigures::empty(NaiveDate::from_ymd_opt(2024, 7, d).unwrap_or_default())
        }
    }

    fn settlement(id: &str, role: RoleKind, days: Vec<DayFigures>) -> EntitySettlement {
        EntitySettlement::from_days(EntityId::from(id), role, None, days)
    }

    #[test]
    fn report_sums_entities() {
        let mut run = SettlementRun::default();
        for s in [
            settlement("D1", RoleKind::Direct, vec![day(1, 100.0, 1_000.0), day(2, 100.0, 0.0)]),
            settlement("U1", RoleKind::Represented, vec![day(1, 80.0, 500.0)]),
            settlement("A1", RoleKind::Agent, vec![day(1, 20.0, 0.0)]),
        ] {
            run.entities.insert(s.id.clone(), s);
        }
        run.rejected.insert(
            EntityId::from("A2"),
            SettleError::MissingConfiguration {
                agent: EntityId::from("A2"),
                what: "gamma".to_string(),
            },
        );

        let report = SettlementReport::from_run(&run);
        assert_eq!(report.direct_users, 1);
        assert_eq!(report.represented_users, 1);
        assert_eq!(report.agents, 1);
        assert_eq!(report.rejected_agents, 1);
        assert_eq!(report.settlement_days, 2);
        assert!((report.capacity_revenue - 300.0).abs() < 1e-9);
        assert!((report.total_revenue - 1_800.0).abs() < 1e-9);
    }

    #[test]
    fn empty_run() {
        let report = SettlementReport::from_run(&SettlementRun::default());
        assert_eq!(report, SettlementReport::default());
        let text = report.to_string();
        assert!(text.starts_with("--- Settlement Report ---"));
        assert!(text.contains("Warnings:"));
    }
}
