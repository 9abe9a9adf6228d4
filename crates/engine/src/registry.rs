//! Rule registry: the explicit, constructed catalog of derivation rules.
//!
//! Every check that can fail happens in [`RuleRegistry::register`]. A rule
//! that passes registration is guaranteed to evaluate, so construction errors
//! never surface mid-run. A failed `register` leaves the registry untouched.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dep_graph::DepGraph;
use crate::error::TakeoffError;
use crate::item::{Catalog, ItemId};
use crate::params::Parameters;
use crate::rule::{CompiledRule, DerivationRule};
use crate::ruleset::RuleSet;

pub const DEFAULT_MAX_RULES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLimits {
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
}

fn default_max_rules() -> usize {
    DEFAULT_MAX_RULES
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_rules: DEFAULT_MAX_RULES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleRegistry {
    name: String,
    catalog: Catalog,
    parameters: Parameters,
    limits: RegistryLimits,
    rules: FxHashMap<ItemId, CompiledRule>,
    /// Outputs in registration order, for round-tripping to a rule set.
    registered: Vec<ItemId>,
    graph: DepGraph,
}

impl RuleRegistry {
    pub fn new(name: impl Into<String>, catalog: Catalog, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            catalog,
            parameters,
            limits: RegistryLimits::default(),
            rules: FxHashMap::default(),
            registered: Vec::new(),
            graph: DepGraph::new(),
        }
    }

    pub fn with_limits(mut self, limits: RegistryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build a registry from serialized form, registering rules in file order.
    pub fn from_rule_set(set: &RuleSet) -> Result<Self, TakeoffError> {
        let mut registry = Self::new(set.name.clone(), set.items.clone(), set.parameters.clone())
            .with_limits(set.limits);
        for rule in &set.rules {
            registry.register(rule.clone())?;
        }
        log::debug!(
            "rule set '{}': {} rules over {} items",
            set.name,
            registry.len(),
            registry.graph.node_count()
        );
        Ok(registry)
    }

    /// Serialized form of this registry.
    pub fn to_rule_set(&self) -> RuleSet {
        RuleSet {
            name: self.name.clone(),
            limits: self.limits,
            parameters: self.parameters.clone(),
            items: self.catalog.clone(),
            rules: self.rules().cloned().collect(),
        }
    }

    /// Add a rule. Checks, in order: size bound, catalog membership, unit,
    /// duplicate output, parameter bindings, acyclicity.
    pub fn register(&mut self, rule: DerivationRule) -> Result<(), TakeoffError> {
        if self.rules.len() >= self.limits.max_rules {
            return Err(TakeoffError::TooManyRules {
                limit: self.limits.max_rules,
            });
        }

        let Some(output_spec) = self.catalog.get(&rule.output) else {
            return Err(TakeoffError::UnknownItem {
                rule: rule.output.clone(),
                item: rule.output.clone(),
            });
        };
        if let Some(unknown) = rule.inputs.iter().find(|i| !self.catalog.contains(i)) {
            return Err(TakeoffError::UnknownItem {
                rule: rule.output.clone(),
                item: unknown.clone(),
            });
        }
        if output_spec.unit != rule.unit {
            return Err(TakeoffError::InvalidRule {
                rule: rule.output.clone(),
                reason: format!(
                    "unit '{}' does not match catalog unit '{}'",
                    rule.unit, output_spec.unit
                ),
            });
        }

        if self.rules.contains_key(&rule.output) {
            return Err(TakeoffError::DuplicateOutput {
                item: rule.output.clone(),
            });
        }

        let compiled = rule.compile(&self.parameters)?;

        if let Some(path) = self.graph.would_create_cycle(&rule.output, &rule.inputs) {
            return Err(TakeoffError::CyclicDependency {
                output: rule.output.clone(),
                path,
            });
        }

        log::debug!(
            "registered {} = {}({}) [{}]",
            rule.output,
            rule.formula.family(),
            rule.inputs.len(),
            rule.rounding
        );

        self.graph.set_inputs(&rule.output, &rule.inputs);
        self.registered.push(rule.output.clone());
        self.rules.insert(rule.output.clone(), compiled);
        Ok(())
    }

    /// The rule producing `item`, if any. At most one exists.
    pub fn rule_for(&self, item: &ItemId) -> Option<&DerivationRule> {
        self.rules.get(item).map(CompiledRule::rule)
    }

    pub(crate) fn compiled(&self, item: &ItemId) -> Option<&CompiledRule> {
        self.rules.get(item)
    }

    /// Rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &DerivationRule> {
        self.registered
            .iter()
            .filter_map(|out| self.rules.get(out).map(CompiledRule::rule))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ItemId> {
        self.registered.iter()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
