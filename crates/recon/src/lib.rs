//! `takeoff-recon`: scores derived material lists against ground truth.
//!
//! Pure scoring crate: receives a completed ledger and an expected list,
//! returns tiered comparison records with category and overall rollups.
//! Loaders for CSV inputs live in [`ingest`]; formatting is left to callers.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ingest;
pub mod model;

pub use config::{CompareConfig, TierBands};
pub use engine::{run, run_takeoff, TakeoffOutcome};
pub use error::ReconError;
pub use model::{
    CategoryRollup, ComparisonRecord, ExpectedItem, ExpectedList, OverallSummary, Report, Tier,
    TierCounts,
};
