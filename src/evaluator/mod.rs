//! Rule evaluation over scanned units
//!
//! Architectural Principle: Service Layer - Evaluator pairs every unit with the rules in scope
//! - Pure function of (rules, units); no filesystem access
//! - A failing predicate is isolated to its (rule, unit) pair
//! - Parallel and sequential runs yield identical, identically ordered output

use crate::domain::unit::ComponentUnit;
use crate::domain::violations::{ConformanceError, ConformanceResult, Severity, Violation};
use crate::rules::{Outcome, Rule};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Options for customizing evaluation behavior
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Fan out over units with rayon
    pub parallel: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Everything the evaluator produced
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Ordered by unit, then by rule order
    pub violations: Vec<Violation>,
    /// Number of (rule, unit) pairs whose predicate ran
    pub evaluations: usize,
}

/// Applies a rule list to component units
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    options: EvaluationOptions,
}

impl Evaluator {
    pub fn new(options: EvaluationOptions) -> Self {
        Self { options }
    }

    pub fn sequential() -> Self {
        Self::new(EvaluationOptions { parallel: false })
    }

    /// Evaluate every applicable rule against every unit
    pub fn evaluate(&self, rules: &[Rule], units: &[ComponentUnit]) -> Evaluation {
        let per_unit: Vec<(Vec<Violation>, usize)> = if self.options.parallel && units.len() > 1
        {
            units.par_iter().map(|unit| evaluate_unit(rules, unit)).collect()
        } else {
            units.iter().map(|unit| evaluate_unit(rules, unit)).collect()
        };

        let mut evaluation = Evaluation::default();
        for (violations, evaluated) in per_unit {
            evaluation.violations.extend(violations);
            evaluation.evaluations += evaluated;
        }

        tracing::debug!(
            "Evaluated {} rule/unit pairs over {} units, {} violations",
            evaluation.evaluations,
            units.len(),
            evaluation.violations.len()
        );
        evaluation
    }
}

fn evaluate_unit(rules: &[Rule], unit: &ComponentUnit) -> (Vec<Violation>, usize) {
    let mut violations = Vec::new();
    let mut evaluated = 0;

    for rule in rules.iter().filter(|rule| rule.applies_to(unit)) {
        evaluated += 1;
        match check_isolated(rule, unit) {
            Ok(Outcome::Pass) => {}
            Ok(Outcome::Fail(detail)) => {
                tracing::debug!("{} fails {}: {}", unit.name, rule.id, detail);
                violations.push(
                    Violation::new(
                        &rule.id,
                        &unit.name,
                        unit.layer,
                        rule.severity,
                        rule.render_message(unit, &detail),
                    )
                    .with_path(&unit.path)
                    .with_confidence(rule.confidence),
                );
            }
            Err(e) => {
                tracing::warn!("Rule {} failed internally on {}: {}", rule.id, unit.name, e);
                violations.push(
                    Violation::new(
                        &rule.id,
                        &unit.name,
                        unit.layer,
                        Severity::Error,
                        format!("internal rule failure: {e}"),
                    )
                    .with_path(&unit.path),
                );
            }
        }
    }

    (violations, evaluated)
}

/// Run one predicate, turning a panic into an error for its (rule, unit) pair
fn check_isolated(rule: &Rule, unit: &ComponentUnit) -> ConformanceResult<Outcome> {
    panic::catch_unwind(AssertUnwindSafe(|| rule.check(unit))).unwrap_or_else(|payload| {
        Err(ConformanceError::rule(
            &rule.id,
            &unit.name,
            format!("predicate panicked: {}", panic_message(payload.as_ref())),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
