//! Component Guardian - Convention conformance for front-end component libraries
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Scanner, Evaluator and Report are pure stages composed by `ConformanceChecker`
//! - Rules are data held by a registry; adding one never touches the pipeline
//! - The CLI is a thin adapter over this facade

pub mod config;
pub mod domain;
pub mod evaluator;
pub mod report;
pub mod rules;
pub mod scanner;

// Re-export main types for convenient access
pub use domain::unit::{BarrelFacts, ComponentUnit, FileKind, Layer, SourceFacts};
pub use domain::violations::{
    Confidence, ConformanceError, ConformanceReport, ConformanceResult, ReportSummary,
    ScanWarning, Severity, Violation,
};

pub use config::{CheckerConfig, ConfigBuilder, CustomRuleConfig, CustomRuleKind};

pub use evaluator::{Evaluation, EvaluationOptions, Evaluator};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use rules::{LayerScope, Outcome, Rule, RuleKind, RuleRegistry, UnitCheck, REGISTRY_VERSION};

pub use scanner::{ScanOutcome, Scanner};

use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Runs the Scanner → Evaluator → Report pipeline for one configuration
#[derive(Debug, Clone)]
pub struct ConformanceChecker {
    config: CheckerConfig,
    registry: RuleRegistry,
    scanner: Scanner,
    evaluator: Evaluator,
    report_formatter: ReportFormatter,
}

impl ConformanceChecker {
    /// Create a checker with the given configuration and the registry it implies
    pub fn new(config: CheckerConfig) -> ConformanceResult<Self> {
        config.validate()?;
        let registry = RuleRegistry::from_config(&config)?;
        let scanner = Scanner::new(&config)?;

        Ok(Self {
            config,
            registry,
            scanner,
            evaluator: Evaluator::default(),
            report_formatter: ReportFormatter::default(),
        })
    }

    /// Create a checker with default configuration
    pub fn with_defaults() -> ConformanceResult<Self> {
        Self::new(CheckerConfig::with_defaults())
    }

    /// Create a checker loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> ConformanceResult<Self> {
        let config = CheckerConfig::load_from_file(path)?;
        Self::new(config)
    }

    /// Replace the rule registry, e.g. to add `RuleKind::Custom` rules
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Additional exclusion globs for this checker only
    pub fn with_extra_excludes<I, S>(mut self, patterns: I) -> ConformanceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scanner = self.scanner.with_extra_excludes(patterns)?;
        Ok(self)
    }

    pub fn with_evaluation_options(mut self, options: EvaluationOptions) -> Self {
        self.evaluator = Evaluator::new(options);
        self
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Check the component library rooted at `root`
    pub fn check<P: AsRef<Path>>(&self, root: P) -> ConformanceReport {
        let start_time = Instant::now();
        let root = root.as_ref();
        tracing::info!("Checking component conventions under {}", root.display());

        let scan = self.scanner.scan(root);
        let evaluation = self.evaluator.evaluate(self.registry.rules(), &scan.units);

        let mut report = ConformanceReport::new();
        for violation in evaluation.violations {
            report.add_violation(violation);
        }
        for warning in scan.warnings.iter().cloned() {
            report.add_scan_warning(warning);
        }

        report.set_unit_counts(scan.units.len(), scan.unstructured_count());
        report.set_evaluations(evaluation.evaluations);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());

        tracing::info!(
            "Checked {} units: {} errors, {} warnings",
            report.summary.total_units,
            report.summary.violations_by_severity.error,
            report.summary.violations_by_severity.warning
        );
        report
    }

    /// Format a conformance report for output
    pub fn format_report(
        &self,
        report: &ConformanceReport,
        format: OutputFormat,
    ) -> ConformanceResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// Format a conformance report straight into `writer`
    pub fn write_report<W: Write>(
        &self,
        report: &ConformanceReport,
        format: OutputFormat,
        writer: W,
    ) -> ConformanceResult<()> {
        self.report_formatter.write_report(report, format, writer)
    }
}

/// CI integration utilities
pub mod ci {
    use super::*;

    /// Gate for pre-merge pipelines
    ///
    /// Loads `component_guardian.yaml` from `root` when present and returns
    /// an error if any blocking violation is found.
    pub fn gate<P: AsRef<Path>>(root: P) -> ConformanceResult<ConformanceReport> {
        let root = root.as_ref();
        let checker = match CheckerConfig::discover(root) {
            Some(path) => ConformanceChecker::from_config_file(path)?,
            None => ConformanceChecker::with_defaults()?,
        };
        let report = checker.check(root);

        if report.has_errors() {
            let error_count = report.summary.violations_by_severity.error;
            return Err(ConformanceError::report(format!(
                "Conformance gate failed: {} blocking violation{} found",
                error_count,
                if error_count == 1 { "" } else { "s" }
            )));
        }

        Ok(report)
    }
}
