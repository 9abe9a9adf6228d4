use thiserror::Error;

use crate::item::ItemId;

/// Fatal conditions raised while building a rule registry or seeding a ledger.
///
/// Anything in here aborts a run before evaluation starts. Conditions that
/// arise during evaluation (unresolved inputs, negative results) are reported
/// as [`crate::evaluator::Diagnostic`] data instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TakeoffError {
    /// Another rule already produces this output item.
    #[error("duplicate output: item '{item}' already has a derivation rule")]
    DuplicateOutput { item: ItemId },

    /// Registering the rule would close a loop in the output→input graph.
    #[error("cyclic dependency: {}", format_path(.path))]
    CyclicDependency { output: ItemId, path: Vec<ItemId> },

    /// A rule binds a parameter name that the configuration does not declare.
    #[error("rule '{rule}': missing configuration parameter '{parameter}'")]
    MissingConfigurationParameter { rule: ItemId, parameter: String },

    /// A rule references an item code the catalog does not know.
    #[error("rule '{rule}': unknown item '{item}'")]
    UnknownItem { rule: ItemId, item: ItemId },

    /// Formula bindings that can never evaluate (wrong arity, zero divisor...).
    #[error("rule '{rule}': {reason}")]
    InvalidRule { rule: ItemId, reason: String },

    /// The registry refuses to grow past its configured bound.
    #[error("rule registry is limited to {limit} rules")]
    TooManyRules { limit: usize },

    /// Negative, NaN or infinite value offered as a quantity.
    #[error("invalid quantity {value} for item '{item}'")]
    InvalidQuantity { item: String, value: f64 },

    /// Empty item code, or one with surrounding whitespace.
    #[error("invalid item identifier '{0}'")]
    InvalidItemId(String),

    /// TOML parse / deserialization error.
    #[error("rule set parse error: {0}")]
    RuleSetParse(String),
}

fn format_path(path: &[ItemId]) -> String {
    let names: Vec<&str> = path.iter().map(ItemId::as_str).collect();
    names.join(" → ")
}
