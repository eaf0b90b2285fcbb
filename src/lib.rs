//! Demand-response revenue settlement engine.

#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
/// Hour records, entity registry, pricing terms, and regional figures.
pub mod market;
pub mod run;
/// Revenue calculators, aggregation, and the parallel settlement engine.
pub mod settle;
pub mod synth;
