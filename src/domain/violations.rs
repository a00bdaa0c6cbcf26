//! Violations, scan warnings and the conformance report aggregate
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - Violations know their unit, rule and confidence and can render themselves
//! - ConformanceReport acts as an aggregate root over violations and scan warnings
//! - Summary counts drive the process exit code

use crate::domain::unit::Layer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Severity levels for conformance violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages and suggestions
    Info,
    /// Guideline drift that should be addressed but does not fail the run
    Warning,
    /// Violations that fail the run
    Error,
}

impl Severity {
    /// Whether this severity level should cause the run to fail
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// How much a rule's verdict can be trusted.
///
/// Heuristic checks (e.g. "is this literal a theme value?") are `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// A guideline violation detected for one component unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that failed
    pub rule_id: String,
    /// Name of the component unit (its directory name)
    pub unit: String,
    /// Layer the unit belongs to
    pub layer: Layer,
    /// Directory of the unit
    pub unit_path: PathBuf,
    /// Severity level of this violation
    pub severity: Severity,
    /// Confidence of the rule that produced it
    pub confidence: Confidence,
    /// Human-readable description of the violation
    pub message: String,
    /// When this violation was detected
    pub detected_at: DateTime<Utc>,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        rule_id: impl Into<String>,
        unit: impl Into<String>,
        layer: Layer,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            unit: unit.into(),
            layer,
            unit_path: PathBuf::new(),
            severity,
            confidence: Confidence::High,
            message: message.into(),
            detected_at: Utc::now(),
        }
    }

    /// Set the directory of the offending unit
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.unit_path = path.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Whether this violation is blocking (fails the run)
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Plain one-line rendering: `<unit-name>: [<rule-id>] <message>`
    pub fn format_line(&self) -> String {
        format!("{}: [{}] {}", self.unit, self.rule_id, self.message)
    }
}

/// A path the scanner could not read. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub message: String,
}

impl ScanWarning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn format_display(&self) -> String {
        format!("{}: {}", self.path.display(), self.message)
    }
}

/// Summary statistics for a conformance report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of component units scanned
    pub total_units: usize,
    /// Units without an implementation file matching their directory name
    pub unstructured_units: usize,
    /// Number of (rule, unit) evaluations performed
    pub evaluations: usize,
    /// Number of violations by severity level
    pub violations_by_severity: ViolationCounts,
    /// Number of scan warnings
    pub scan_warnings: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when the check was performed
    pub checked_at: DateTime<Utc>,
}

/// Count of violations by severity level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl ViolationCounts {
    /// Total number of violations across all severities
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }

    /// Whether there are any blocking violations
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    /// Add a violation to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Complete result of one conformance run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Violations in evaluation order (units by layer and name, rules in registry order)
    pub violations: Vec<Violation>,
    /// Paths the scanner could not read
    pub scan_warnings: Vec<ScanWarning>,
    /// Summary statistics
    pub summary: ReportSummary,
    /// Fingerprint of the configuration used for this run
    pub config_fingerprint: Option<String>,
}

impl ConformanceReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            scan_warnings: Vec::new(),
            summary: ReportSummary {
                checked_at: Utc::now(),
                ..Default::default()
            },
            config_fingerprint: None,
        }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity);
        self.violations.push(violation);
    }

    /// Add a scan warning to the report
    pub fn add_scan_warning(&mut self, warning: ScanWarning) {
        self.summary.scan_warnings += 1;
        self.scan_warnings.push(warning);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the report contains blocking violations (errors)
    pub fn has_errors(&self) -> bool {
        self.summary.violations_by_severity.has_blocking()
    }

    /// Process exit code: non-zero iff an error-severity violation exists
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }

    /// Violations grouped by unit name, in unit-name order
    pub fn by_unit(&self) -> BTreeMap<&str, Vec<&Violation>> {
        let mut grouped: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
        for violation in &self.violations {
            grouped.entry(violation.unit.as_str()).or_default().push(violation);
        }
        grouped
    }

    /// Violations produced for one unit
    pub fn violations_for(&self, unit: &str) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.unit == unit).collect()
    }

    pub fn set_unit_counts(&mut self, total: usize, unstructured: usize) {
        self.summary.total_units = total;
        self.summary.unstructured_units = unstructured;
    }

    pub fn set_evaluations(&mut self, evaluations: usize) {
        self.summary.evaluations = evaluations;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }
}

impl Default for ConformanceReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur during a conformance run
#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    /// Configuration could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A path could not be scanned
    #[error("Scan error at {path}: {message}")]
    Scan { path: String, message: String },

    /// A rule predicate failed internally
    #[error("Rule '{rule}' failed on unit '{unit}': {message}")]
    RuleEvaluation {
        rule: String,
        unit: String,
        message: String,
    },

    /// Report rendering failed
    #[error("Report error: {message}")]
    Report { message: String },
}

impl ConformanceError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a scan error
    pub fn scan(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a rule evaluation error
    pub fn rule(
        rule: impl Into<String>,
        unit: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::RuleEvaluation {
            rule: rule.into(),
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Create a report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

/// Result type for conformance operations
pub type ConformanceResult<T> = Result<T, ConformanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_creation() {
        let violation = Violation::new(
            "HAS_TEST_FILE",
            "Button",
            Layer::Atom,
            Severity::Error,
            "Button has no test file",
        )
        .with_path("src/components/atoms/Button");

        assert_eq!(violation.rule_id, "HAS_TEST_FILE");
        assert_eq!(violation.unit, "Button");
        assert_eq!(violation.confidence, Confidence::High);
        assert_eq!(violation.unit_path, PathBuf::from("src/components/atoms/Button"));
        assert!(violation.is_blocking());
        assert_eq!(violation.format_line(), "Button: [HAS_TEST_FILE] Button has no test file");
    }

    #[test]
    fn test_report_counts_and_exit_code() {
        let mut report = ConformanceReport::new();
        assert_eq!(report.exit_code(), 0);

        report.add_violation(Violation::new(
            "HAS_STORY_FILE",
            "Button",
            Layer::Atom,
            Severity::Warning,
            "missing story",
        ));
        assert!(report.has_violations());
        assert_eq!(report.exit_code(), 0);

        report.add_violation(Violation::new(
            "HAS_TEST_FILE",
            "Card",
            Layer::Molecule,
            Severity::Error,
            "missing test",
        ));
        assert_eq!(report.summary.violations_by_severity.total(), 2);
        assert_eq!(report.summary.violations_by_severity.error, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_by_unit_grouping() {
        let mut report = ConformanceReport::new();
        for (rule, unit) in [("A", "Text"), ("B", "Button"), ("C", "Text")] {
            report.add_violation(Violation::new(rule, unit, Layer::Atom, Severity::Info, "m"));
        }

        let grouped = report.by_unit();
        let units: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(units, vec!["Button", "Text"]);
        assert_eq!(grouped["Text"].len(), 2);
        assert_eq!(report.violations_for("Button").len(), 1);
    }

    #[test]
    fn test_scan_warnings_are_counted() {
        let mut report = ConformanceReport::new();
        report.add_scan_warning(ScanWarning::new("src/atoms/Locked", "permission denied"));
        assert_eq!(report.summary.scan_warnings, 1);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.scan_warnings[0].format_display(),
            "src/atoms/Locked: permission denied"
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
    }
}
