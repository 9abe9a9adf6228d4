pub mod dep_graph;
pub mod error;
pub mod evaluator;
pub mod item;
pub mod ledger;
pub mod params;
pub mod quantity;
pub mod registry;
pub mod rule;
pub mod ruleset;

pub use error::TakeoffError;
pub use evaluator::{Diagnostic, EvaluationReport, Evaluator, FiredRule};
pub use item::{Catalog, Category, ItemId, ItemSpec, Unit};
pub use ledger::{Ledger, LedgerEntry, Observation, Provenance, PutOutcome, Tally};
pub use params::Parameters;
pub use quantity::{Quantity, Rounding};
pub use registry::{RegistryLimits, RuleRegistry};
pub use rule::{DerivationRule, Formula};
pub use ruleset::RuleSet;
