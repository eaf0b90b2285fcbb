//! Settlement inputs: hour records, entities, pricing terms, and region data.

/// Entity identifiers, roles, and the agent/user registry.
pub mod entity;
/// Pricing modes, allocation ratios, and clearing price profiles.
pub mod pricing;
pub mod record;
/// Regional average bid capacity per hour.
pub mod region;

pub use entity::{AgentBook, AgentTerms, Entity, EntityId, EntityIdx, Registry, Role, RoleKind};
pub use pricing::{AllocationRatios, PricingMode};
pub use record::{HourRecord, RecordSet, SettlementDay, SettlementPeriod};
pub use region::RegionProfile;
