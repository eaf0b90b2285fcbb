//! Scenario wiring: registry, records, regional figures, engine.

use log::info;

use crate::config::ScenarioConfig;
use crate::error::RunError;
use crate::io::records::{load_records, load_region_bids};
use crate::market::{RecordSet, RegionProfile, Registry};
use crate::settle::{Engine, SettlementRun};
use crate::synth::synthesize;

/// Inputs of a settlement run, resolved from a scenario.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub registry: Registry,
    pub records: RecordSet,
    /// Supplied regional figures only; the engine fills gaps.
    pub region: RegionProfile,
}

impl RunInputs {
    /// Builds the registry and loads (or synthesizes) the records.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on duplicate entity ids, unreadable or malformed
    /// input files, or records for entities the scenario does not declare.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, RunError> {
        let registry = scenario.registry()?;

        let records = match &scenario.input.records {
            Some(path) => load_records(path)?,
            None => {
                info!(
                    "synthesizing {} days of records (seed {})",
                    scenario.synthetic.days, scenario.synthetic.seed
                );
                RecordSet::from_records(synthesize(&scenario.synthetic, &registry))?
            }
        };
        records.ensure_registered(&registry)?;

        let region = match &scenario.input.region_bids {
            Some(path) => load_region_bids(path)?,
            None => RegionProfile::new(),
        };

        Ok(Self {
            registry,
            records,
            region,
        })
    }
}

/// Resolves a scenario's inputs and settles them.
///
/// # Errors
///
/// See [`RunInputs::from_scenario`]. Agent configuration errors do not fail
/// the run; they are reported in [`SettlementRun::rejected`].
pub fn run_scenario(scenario: &ScenarioConfig) -> Result<SettlementRun, RunError> {
    let inputs = RunInputs::from_scenario(scenario)?;
    let engine = Engine::new(
        scenario.engine,
        &inputs.registry,
        &inputs.records,
        inputs.region,
    );
    Ok(engine.run())
}
