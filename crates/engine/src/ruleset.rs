//! Serialized rule sets.
//!
//! A rule set is the file form of a registry: catalog, parameter overrides,
//! limits and rules in registration order. Parsing never registers anything;
//! `RuleRegistry::from_rule_set` does that and reports the first fatal
//! condition.

use serde::{Deserialize, Serialize};

use crate::error::TakeoffError;
use crate::item::Catalog;
use crate::params::Parameters;
use crate::registry::{RegistryLimits, RuleRegistry};
use crate::rule::DerivationRule;

const STANDARD_RULES: &str = include_str!("../rules/standard.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub limits: RegistryLimits,
    /// Overrides on top of [`Parameters::standard`].
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub items: Catalog,
    #[serde(default)]
    pub rules: Vec<DerivationRule>,
}

impl RuleSet {
    /// Parse a rule set. Parameters in the file overlay the standard defaults.
    pub fn from_toml(content: &str) -> Result<Self, TakeoffError> {
        let mut set: RuleSet =
            toml::from_str(content).map_err(|e| TakeoffError::RuleSetParse(e.to_string()))?;
        let mut parameters = Parameters::standard();
        parameters.overlay(&set.parameters);
        set.parameters = parameters;
        Ok(set)
    }

    pub fn to_toml(&self) -> Result<String, TakeoffError> {
        toml::to_string(self).map_err(|e| TakeoffError::RuleSetParse(e.to_string()))
    }

    /// The calibrated rule catalog that ships with the engine.
    pub fn standard() -> Result<Self, TakeoffError> {
        Self::from_toml(STANDARD_RULES)
    }

    /// Recalibrate without touching the rules.
    pub fn with_parameter_overrides(mut self, overrides: &Parameters) -> Self {
        self.parameters.overlay(overrides);
        self
    }

    pub fn build(&self) -> Result<RuleRegistry, TakeoffError> {
        RuleRegistry::from_rule_set(self)
    }
}
