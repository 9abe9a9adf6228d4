//! Derivation rules as data.
//!
//! A rule names its output, its ordered inputs, a formula family with the
//! parameter names it binds, a rounding policy and a unit. Nothing in here is
//! a closure: the whole rule set can be written to TOML, diffed and audited.
//!
//! | Family        | Raw value                                   |
//! |---------------|---------------------------------------------|
//! | `scale`       | `sum(inputs) * factor`                      |
//! | `divide`      | `sum(inputs) / divisor`                     |
//! | `per_hundred` | `sum(inputs) / 100 * rate`                  |
//! | `subtract`    | `inputs[0] - sum(inputs[1..])`              |
//! | `sum`         | `sum(inputs)`                               |
//! | `weighted_sum`| `Σ inputs[i] * weights[i]`                  |

use serde::{Deserialize, Serialize};

use crate::error::TakeoffError;
use crate::item::{ItemId, Unit};
use crate::params::Parameters;
use crate::quantity::{Quantity, Rounding};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Formula {
    Scale { factor: String },
    Divide { divisor: String },
    PerHundred { rate: String },
    Subtract,
    Sum,
    WeightedSum { weights: Vec<String> },
}

impl Formula {
    pub fn family(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Divide { .. } => "divide",
            Self::PerHundred { .. } => "per_hundred",
            Self::Subtract => "subtract",
            Self::Sum => "sum",
            Self::WeightedSum { .. } => "weighted_sum",
        }
    }

    /// Parameter names this formula binds, in binding order.
    pub fn parameter_names(&self) -> Vec<&str> {
        match self {
            Self::Scale { factor } => vec![factor.as_str()],
            Self::Divide { divisor } => vec![divisor.as_str()],
            Self::PerHundred { rate } => vec![rate.as_str()],
            Self::Subtract | Self::Sum => Vec::new(),
            Self::WeightedSum { weights } => weights.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationRule {
    pub output: ItemId,
    pub inputs: Vec<ItemId>,
    pub formula: Formula,
    pub rounding: Rounding,
    #[serde(default)]
    pub unit: Unit,
    /// Parameter holding a floor applied after rounding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,
}

impl DerivationRule {
    pub fn new(output: ItemId, inputs: Vec<ItemId>, formula: Formula, rounding: Rounding) -> Self {
        Self {
            output,
            inputs,
            formula,
            rounding,
            unit: Unit::Each,
            minimum: None,
        }
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn minimum(mut self, parameter: &str) -> Self {
        self.minimum = Some(parameter.to_string());
        self
    }

    /// Resolve parameter names against `params` and check arity.
    pub(crate) fn compile(&self, params: &Parameters) -> Result<CompiledRule, TakeoffError> {
        if self.inputs.is_empty() {
            return Err(self.invalid("rule has no inputs"));
        }

        let formula = match &self.formula {
            Formula::Scale { factor } => BoundFormula::Scale(self.param(params, factor)?),
            Formula::PerHundred { rate } => BoundFormula::PerHundred(self.param(params, rate)?),
            Formula::Divide { divisor } => {
                let d = self.param(params, divisor)?;
                if d <= 0.0 {
                    return Err(self.invalid(&format!("divisor '{divisor}' must be > 0, got {d}")));
                }
                BoundFormula::Divide(d)
            }
            Formula::Subtract => {
                if self.inputs.len() < 2 {
                    return Err(self.invalid("subtract needs a minuend and at least one subtrahend"));
                }
                BoundFormula::Subtract
            }
            Formula::Sum => BoundFormula::Sum,
            Formula::WeightedSum { weights } => {
                if weights.len() != self.inputs.len() {
                    return Err(self.invalid(&format!(
                        "weighted_sum has {} weights for {} inputs",
                        weights.len(),
                        self.inputs.len()
                    )));
                }
                let bound = weights
                    .iter()
                    .map(|w| self.param(params, w))
                    .collect::<Result<Vec<_>, _>>()?;
                BoundFormula::WeightedSum(bound)
            }
        };

        let minimum = match &self.minimum {
            Some(name) => Some(self.param(params, name)?),
            None => None,
        };

        Ok(CompiledRule {
            rule: self.clone(),
            formula,
            minimum,
        })
    }

    fn param(&self, params: &Parameters, name: &str) -> Result<f64, TakeoffError> {
        let value = params
            .get(name)
            .ok_or_else(|| TakeoffError::MissingConfigurationParameter {
                rule: self.output.clone(),
                parameter: name.to_string(),
            })?;
        if !value.is_finite() {
            return Err(self.invalid(&format!("parameter '{name}' is not finite")));
        }
        Ok(value)
    }

    fn invalid(&self, reason: &str) -> TakeoffError {
        TakeoffError::InvalidRule {
            rule: self.output.clone(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum BoundFormula {
    Scale(f64),
    Divide(f64),
    PerHundred(f64),
    Subtract,
    Sum,
    WeightedSum(Vec<f64>),
}

impl BoundFormula {
    fn compute(&self, inputs: &[f64]) -> f64 {
        let total: f64 = inputs.iter().sum();
        match self {
            Self::Scale(factor) => total * factor,
            Self::Divide(divisor) => total / divisor,
            Self::PerHundred(rate) => total / 100.0 * rate,
            Self::Subtract => match inputs.split_first() {
                Some((head, rest)) => head - rest.iter().sum::<f64>(),
                None => 0.0,
            },
            Self::Sum => total,
            Self::WeightedSum(weights) => inputs.iter().zip(weights).map(|(v, w)| v * w).sum(),
        }
    }
}

/// A rule with its parameters resolved. Evaluating it cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    rule: DerivationRule,
    formula: BoundFormula,
    minimum: Option<f64>,
}

/// Result of applying one rule to concrete input values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleValue {
    /// Formula result before rounding and clamping.
    pub raw: f64,
    pub quantity: Quantity,
    /// The rounded result was below zero and got clamped.
    pub negative: bool,
    /// The formula overflowed (or produced NaN); `quantity` is meaningless.
    pub non_finite: bool,
}

impl CompiledRule {
    pub fn rule(&self) -> &DerivationRule {
        &self.rule
    }

    /// `inputs` are in the rule's declared input order.
    pub fn evaluate(&self, inputs: &[Quantity]) -> RuleValue {
        let values: Vec<f64> = inputs.iter().map(|q| q.value()).collect();
        let raw = self.formula.compute(&values);
        let mut rounded = self.rule.rounding.apply(raw);
        if let Some(floor) = self.minimum {
            rounded = rounded.max(floor);
        }
        if !raw.is_finite() || !rounded.is_finite() {
            return RuleValue {
                raw,
                quantity: Quantity::ZERO,
                negative: false,
                non_finite: true,
            };
        }
        let (quantity, clamped) = Quantity::clamped(rounded);
        RuleValue {
            raw,
            quantity,
            negative: clamped || (raw < 0.0 && rounded <= 0.0),
            non_finite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &'static str) -> ItemId {
        ItemId::from_static(s)
    }

    fn q(v: f64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    fn compile(rule: DerivationRule, params: &Parameters) -> CompiledRule {
        rule.compile(params).unwrap()
    }

    #[test]
    fn linear_scale_truncates() {
        let params = Parameters::new().with("power_pack_ratio", 0.74);
        let rule = compile(
            DerivationRule::new(
                id("power_packs"),
                vec![id("ceiling_sensors"), id("wall_sensors")],
                Formula::Scale { factor: "power_pack_ratio".into() },
                Rounding::Truncate,
            ),
            &params,
        );
        let value = rule.evaluate(&[q(16.0), q(3.0)]);
        assert!((value.raw - 14.06).abs() < 1e-9);
        assert_eq!(value.quantity, q(14.0));
        assert!(!value.negative);
    }

    #[test]
    fn divide_for_spacing() {
        let params = Parameters::new().with("jhook_spacing_ft", 4.0);
        let rule = compile(
            DerivationRule::new(
                id("jhooks"),
                vec![id("cat6_cable_ft")],
                Formula::Divide { divisor: "jhook_spacing_ft".into() },
                Rounding::Truncate,
            ),
            &params,
        );
        assert_eq!(rule.evaluate(&[q(920.0)]).quantity, q(230.0));
        assert_eq!(rule.evaluate(&[q(923.0)]).quantity, q(230.0));
    }

    #[test]
    fn per_hundred_rounds_half_up() {
        let params = Parameters::new().with("emt_3_4_strap_unistrut_per_100ft", 3.1);
        let rule = compile(
            DerivationRule::new(
                id("emt_3_4_unistrut_straps"),
                vec![id("emt_3_4_ft")],
                Formula::PerHundred { rate: "emt_3_4_strap_unistrut_per_100ft".into() },
                Rounding::HalfUp,
            ),
            &params,
        );
        // 3773 / 100 * 3.1 = 116.963
        assert_eq!(rule.evaluate(&[q(3773.0)]).quantity, q(117.0));
    }

    #[test]
    fn per_hundred_exact_tie_rounds_up() {
        let params = Parameters::new().with("emt_3_4_coupling_per_100ft", 9.2);
        let rule = compile(
            DerivationRule::new(
                id("emt_3_4_couplings"),
                vec![id("emt_3_4_ft")],
                Formula::PerHundred { rate: "emt_3_4_coupling_per_100ft".into() },
                Rounding::HalfUp,
            ),
            &params,
        );
        // 625 / 100 * 9.2 = 57.5
        assert_eq!(rule.evaluate(&[q(625.0)]).quantity, q(58.0));
        assert_eq!(rule.evaluate(&[q(1125.0)]).quantity, q(104.0));
    }

    #[test]
    fn overflow_is_not_reported_as_negative() {
        let params = Parameters::new().with("huge", 1e300);
        let rule = compile(
            DerivationRule::new(
                id("pull_line_ft"),
                vec![id("total_conduit_ft")],
                Formula::Scale { factor: "huge".into() },
                Rounding::Ceiling,
            )
            .unit(Unit::Feet),
            &params,
        );
        let value = rule.evaluate(&[q(1e10)]);
        assert!(value.non_finite);
        assert!(!value.negative);
        assert_eq!(value.raw, f64::INFINITY);
    }

    #[test]
    fn subtract_clamps_and_flags() {
        let rule = compile(
            DerivationRule::new(
                id("ring_4sq_1g"),
                vec![id("wall_devices"), id("two_gang_devices")],
                Formula::Subtract,
                Rounding::None,
            ),
            &Parameters::new(),
        );
        let ok = rule.evaluate(&[q(60.0), q(16.0)]);
        assert_eq!(ok.quantity, q(44.0));
        assert!(!ok.negative);

        let negative = rule.evaluate(&[q(3.0), q(8.0)]);
        assert_eq!(negative.quantity, Quantity::ZERO);
        assert!(negative.negative);
        assert_eq!(negative.raw, -5.0);
        assert!(!negative.non_finite);
    }

    #[test]
    fn sum_is_additive_union() {
        let rule = compile(
            DerivationRule::new(
                id("fixture_whips"),
                vec![id("f2"), id("f8")],
                Formula::Sum,
                Rounding::None,
            ),
            &Parameters::new(),
        );
        assert_eq!(rule.evaluate(&[q(6.0), q(1.0)]).quantity, q(7.0));
    }

    #[test]
    fn weighted_sum_binds_each_weight() {
        let params = Parameters::new().with("w_a", 0.8).with("w_b", 0.2);
        let rule = compile(
            DerivationRule::new(
                id("mix"),
                vec![id("a"), id("b")],
                Formula::WeightedSum { weights: vec!["w_a".into(), "w_b".into()] },
                Rounding::None,
            ),
            &params,
        );
        let value = rule.evaluate(&[q(100.0), q(50.0)]);
        assert!((value.quantity.value() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn minimum_applies_after_rounding() {
        let params = Parameters::new()
            .with("devices_per_black_tape", 50.0)
            .with("minimum_rolls", 1.0);
        let rule = compile(
            DerivationRule::new(
                id("black_tape"),
                vec![id("total_devices")],
                Formula::Divide { divisor: "devices_per_black_tape".into() },
                Rounding::Truncate,
            )
            .unit(Unit::Roll)
            .minimum("minimum_rolls"),
            &params,
        );
        assert_eq!(rule.evaluate(&[q(20.0)]).quantity, q(1.0));
        assert_eq!(rule.evaluate(&[q(171.0)]).quantity, q(3.0));
    }

    #[test]
    fn compile_rejects_missing_parameter() {
        let err = DerivationRule::new(
            id("power_packs"),
            vec![id("ceiling_sensors")],
            Formula::Scale { factor: "power_pack_ratio".into() },
            Rounding::Truncate,
        )
        .compile(&Parameters::new())
        .unwrap_err();
        assert_eq!(
            err,
            TakeoffError::MissingConfigurationParameter {
                rule: id("power_packs"),
                parameter: "power_pack_ratio".into(),
            }
        );
    }

    #[test]
    fn compile_rejects_bad_arity_and_divisor() {
        let subtract = DerivationRule::new(id("x"), vec![id("a")], Formula::Subtract, Rounding::None);
        assert!(matches!(
            subtract.compile(&Parameters::new()),
            Err(TakeoffError::InvalidRule { .. })
        ));

        let divide = DerivationRule::new(
            id("x"),
            vec![id("a")],
            Formula::Divide { divisor: "zero".into() },
            Rounding::None,
        );
        let params = Parameters::new().with("zero", 0.0);
        assert!(matches!(divide.compile(&params), Err(TakeoffError::InvalidRule { .. })));

        let weighted = DerivationRule::new(
            id("x"),
            vec![id("a"), id("b")],
            Formula::WeightedSum { weights: vec!["w".into()] },
            Rounding::None,
        );
        let params = Parameters::new().with("w", 1.0);
        assert!(matches!(weighted.compile(&params), Err(TakeoffError::InvalidRule { .. })));

        let empty = DerivationRule::new(id("x"), vec![], Formula::Sum, Rounding::None);
        assert!(empty.compile(&Parameters::new()).is_err());
    }

    #[test]
    fn formula_deserializes_by_family_tag() {
        #[derive(Deserialize)]
        struct Wrapper {
            formula: Formula,
        }
        let w: Wrapper = toml::from_str(r#"formula = { family = "per_hundred", rate = "r" }"#).unwrap();
        assert_eq!(w.formula, Formula::PerHundred { rate: "r".into() });
        let w: Wrapper = toml::from_str(r#"formula = { family = "subtract" }"#).unwrap();
        assert_eq!(w.formula, Formula::Subtract);
        assert_eq!(w.formula.family(), "subtract");
    }
}
