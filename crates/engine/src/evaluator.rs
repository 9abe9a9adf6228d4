//! Single forward pass over the rule graph.
//!
//! 1. Derived entries already in the ledger are discarded, so every derived
//!    value comes from the direct entries of this pass alone.
//! 2. Rules whose output already holds a direct value are skipped.
//! 3. The rest run in topological order of the dependency graph.
//! 4. A rule fires only when every input has a value by the time it is
//!    reached; otherwise its output stays absent and an
//!    [`Diagnostic::UnresolvedInput`] is recorded.
//! 5. Results are rounded, floored, clamped at zero and written back as
//!    `Derived`. A result that is not finite is dropped instead.
//!
//! Every rule is pure and the graph is acyclic, so the final ledger does not
//! depend on which topological order is used.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::item::{Category, ItemId};
use crate::ledger::{Ledger, Provenance, PutOutcome};
use crate::quantity::{Quantity, Rounding};
use crate::registry::RuleRegistry;

/// Evaluation-time conditions. Recovered locally, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Inputs still absent when the rule's turn came; the output stays absent.
    UnresolvedInput { output: ItemId, missing: Vec<ItemId> },
    /// Formula went below zero; the written value is 0.
    NegativeResult { output: ItemId, raw: f64 },
    /// Formula overflowed or produced NaN; the output stays absent.
    NonFiniteResult { output: ItemId, raw: f64 },
}

impl Diagnostic {
    pub fn output(&self) -> &ItemId {
        match self {
            Self::UnresolvedInput { output, .. }
            | Self::NegativeResult { output, .. }
            | Self::NonFiniteResult { output, .. } => output,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedInput { output, missing } => {
                let names: Vec<&str> = missing.iter().map(ItemId::as_str).collect();
                write!(f, "{output}: unresolved input(s) {}", names.join(", "))
            }
            Self::NegativeResult { output, raw } => {
                write!(f, "{output}: negative result {raw} clamped to 0")
            }
            Self::NonFiniteResult { output, raw } => {
                write!(f, "{output}: non-finite result {raw} discarded")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredRule {
    pub output: ItemId,
    pub raw: f64,
    pub quantity: Quantity,
    pub rounding: Rounding,
    /// 1 when every input is direct; otherwise 1 + deepest derived input.
    pub depth: usize,
}

/// What one evaluation pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub rules_considered: usize,
    /// In evaluation order.
    pub fired: Vec<FiredRule>,
    /// Outputs left alone because a direct value was supplied. Sorted.
    pub skipped_direct: Vec<ItemId>,
    pub diagnostics: Vec<Diagnostic>,
    pub max_depth: usize,
}

impl EvaluationReport {
    pub fn unresolved(&self) -> impl Iterator<Item = &ItemId> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::UnresolvedInput { output, .. } => Some(output),
            _ => None,
        })
    }

    pub fn clamped(&self) -> impl Iterator<Item = &ItemId> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::NegativeResult { output, .. } => Some(output),
            _ => None,
        })
    }

    pub fn non_finite(&self) -> impl Iterator<Item = &ItemId> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::NonFiniteResult { output, .. } => Some(output),
            _ => None,
        })
    }

    /// Every considered rule either fired or was shadowed by a direct value.
    pub fn is_complete(&self) -> bool {
        self.unresolved().next().is_none() && self.non_finite().next().is_none()
    }

    /// Format as a concise one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} rules fired, {} direct, {} unresolved, {} clamped, depth={}",
            self.fired.len(),
            self.rules_considered,
            self.skipped_direct.len(),
            self.unresolved().count(),
            self.clamped().count(),
            self.max_depth,
        )
    }

    /// Format: `[derive] fired=41 direct=2 unresolved=3 clamped=0 depth=4`
    pub fn log_line(&self) -> String {
        format!(
            "[derive] fired={} direct={} unresolved={} clamped={} depth={}",
            self.fired.len(),
            self.skipped_direct.len(),
            self.unresolved().count(),
            self.clamped().count(),
            self.max_depth,
        )
    }
}

/// Runs a registry against ledgers. Holds no per-run state, so one evaluator
/// can serve many runs at once.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r RuleRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self { registry }
    }

    /// Expand `ledger` in place with every value reachable from its direct
    /// entries. Stale derived entries (e.g. merged in from another ledger)
    /// are dropped first and recomputed, or left absent if their rule cannot
    /// fire.
    pub fn evaluate(&self, ledger: &mut Ledger) -> EvaluationReport {
        let stale = ledger.retain_direct();
        if stale > 0 {
            log::debug!("discarded {} derived entries before evaluation", stale);
        }

        let mut report = EvaluationReport {
            rules_considered: self.registry.len(),
            ..Default::default()
        };

        let mut active: FxHashSet<ItemId> = FxHashSet::default();
        for output in self.registry.outputs() {
            if ledger.has_direct(output) {
                report.skipped_direct.push(output.clone());
            } else {
                active.insert(output.clone());
            }
        }
        report.skipped_direct.sort();

        let order = self.registry.graph().topo_order(&active);
        let mut depths: FxHashMap<ItemId, usize> = FxHashMap::default();

        for output in order {
            let Some(compiled) = self.registry.compiled(&output) else {
                continue;
            };
            let rule = compiled.rule();

            let mut values = Vec::with_capacity(rule.inputs.len());
            let mut missing = Vec::new();
            for input in &rule.inputs {
                match ledger.quantity(input) {
                    Some(q) => values.push(q),
                    None => missing.push(input.clone()),
                }
            }

            if !missing.is_empty() {
                log::warn!(
                    "{} not derived: missing {}",
                    output,
                    missing.iter().map(ItemId::as_str).collect::<Vec<_>>().join(", ")
                );
                report
                    .diagnostics
                    .push(Diagnostic::UnresolvedInput { output, missing });
                continue;
            }

            let value = compiled.evaluate(&values);
            if value.non_finite {
                log::warn!("{} = {} is not finite, not derived", output, value.raw);
                report.diagnostics.push(Diagnostic::NonFiniteResult {
                    output,
                    raw: value.raw,
                });
                continue;
            }
            if value.negative {
                log::warn!("{} = {} went negative, clamped to 0", output, value.raw);
                report.diagnostics.push(Diagnostic::NegativeResult {
                    output: output.clone(),
                    raw: value.raw,
                });
            }

            let depth = 1 + rule
                .inputs
                .iter()
                .filter_map(|i| depths.get(i))
                .max()
                .copied()
                .unwrap_or(0);
            report.max_depth = report.max_depth.max(depth);

            let category = self
                .registry
                .catalog()
                .category(&output)
                .unwrap_or(Category::Subtotal);
            let outcome = ledger.put(output.clone(), value.quantity, Provenance::Derived, category);
            debug_assert_ne!(outcome, PutOutcome::Rejected);

            log::debug!("{} = {} (raw {}, {})", output, value.quantity, value.raw, rule.rounding);
            depths.insert(output.clone(), depth);
            report.fired.push(FiredRule {
                output,
                raw: value.raw,
                quantity: value.quantity,
                rounding: rule.rounding,
                depth,
            });
        }

        log::info!("{}", report.log_line());
        report
    }

    /// Evaluate the direct entries of `seed`, leaving the seed untouched.
    pub fn evaluate_seed(&self, seed: &Ledger) -> (Ledger, EvaluationReport) {
        let mut ledger = seed.direct_entries();
        let report = self.evaluate(&mut ledger);
        (ledger, report)
    }

    /// Evaluate independent seeds in parallel against the shared registry.
    /// Results come back in input order.
    pub fn evaluate_many(&self, seeds: &[Ledger]) -> Vec<(Ledger, EvaluationReport)> {
        seeds.par_iter().map(|seed| self.evaluate_seed(seed)).collect()
    }
}
