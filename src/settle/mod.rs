/// Period reduction of daily figures into per-entity settlements.
pub mod aggregate;
/// Day-ahead response fees, assessment, and agent proration.
pub mod day_ahead;
/// Tiered effective-capacity capping.
pub mod effective;
pub mod emergency;
pub mod engine;
/// Standby capacity reserve revenue.
pub mod reserve;
pub mod report;

pub use aggregate::{DayFigures, EntitySettlement, PeriodTotals};
pub use effective::{EffectiveCapacity, NegativeResponsePolicy};
pub use engine::{Engine, EngineConfig, SettlementRun};
pub use report::SettlementReport;
