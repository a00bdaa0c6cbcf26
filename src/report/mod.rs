//! Report generation with multiple output formats
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ConformanceReport (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Filtering changes what is rendered, never the report's exit code

use crate::domain::violations::{
    Confidence, ConformanceError, ConformanceReport, ConformanceResult, Severity, Violation,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;

/// Supported output formats for conformance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One plain line per violation, grouped by unit
    Text,
    /// Human-readable format with colors and summary
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// SARIF 2.1.0 for code scanning tools
    Sarif,
    /// GitHub Actions workflow annotations
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "sarif" => Some(Self::Sarif),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["text", "human", "json", "junit", "sarif", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (human format)
    pub use_colors: bool,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Whether to list scan warnings
    pub show_warnings: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            min_severity: None,
            max_violations: None,
            show_warnings: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Error,
    Warning,
    Info,
    Success,
    Dim,
    Bold,
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Format a conformance report in the specified format
    pub fn format_report(
        &self,
        report: &ConformanceReport,
        format: OutputFormat,
    ) -> ConformanceResult<String> {
        let violations = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Text => Ok(self.format_text(report, &violations)),
            OutputFormat::Human => Ok(self.format_human(report, &violations)),
            OutputFormat::Json => self.format_json(report, &violations),
            OutputFormat::Junit => Ok(self.format_junit(report, &violations)),
            OutputFormat::Sarif => self.format_sarif(&violations),
            OutputFormat::GitHub => Ok(self.format_github(report, &violations)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ConformanceReport,
        format: OutputFormat,
        mut writer: W,
    ) -> ConformanceResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Filter violations based on report options
    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| self.options.min_severity.map_or(true, |min| v.severity >= min))
            .collect();

        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }

        filtered
    }

    fn format_text(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for unit_violations in group_by_unit(violations).values() {
            for violation in unit_violations {
                output.push_str(&violation.format_line());
                output.push('\n');
            }
        }

        if self.options.show_warnings {
            for warning in &report.scan_warnings {
                output.push_str(&format!("warning: {}\n", warning.format_display()));
            }
        }

        output
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        if !report.has_violations() {
            output.push_str(&format!(
                "✅ {}\n",
                self.paint("All component units conform", Tone::Success)
            ));
        } else {
            let (icon, tone) = if report.has_errors() {
                ("❌", Tone::Error)
            } else {
                ("⚠️", Tone::Warning)
            };
            output.push_str(&format!(
                "{} {}\n\n",
                icon,
                self.paint("Convention Violations Found", tone)
            ));

            let hidden = report.violations.len() - violations.len();
            if hidden > 0 {
                output.push_str(&format!(
                    "{}\n\n",
                    self.paint(
                        &format!("{hidden} violation{} hidden by report options", plural(hidden)),
                        Tone::Dim
                    )
                ));
            }

            for (unit, unit_violations) in group_by_unit(violations) {
                let location = unit_violations
                    .first()
                    .map(|v| format!(" ({}, {})", v.layer, v.unit_path.display()))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "📦 {}{}\n",
                    self.paint(unit, Tone::Bold),
                    self.paint(&location, Tone::Dim)
                ));

                for violation in unit_violations {
                    let marker = match violation.confidence {
                        Confidence::Low => self.paint(" (low confidence)", Tone::Dim),
                        Confidence::High => String::new(),
                    };
                    output.push_str(&format!(
                        "  {} [{}] {}{}\n",
                        self.paint(&violation.rule_id, Tone::Dim),
                        self.paint(violation.severity.as_str(), severity_tone(violation.severity)),
                        violation.message,
                        marker
                    ));
                }
                output.push('\n');
            }
        }

        if self.options.show_warnings && !report.scan_warnings.is_empty() {
            output.push_str(&format!("{}\n", self.paint("Scan warnings:", Tone::Warning)));
            for warning in &report.scan_warnings {
                output.push_str(&format!("  {}\n", warning.format_display()));
            }
            output.push('\n');
        }

        output.push_str(&self.format_summary(report));
        output
    }

    /// Format report in JSON format
    fn format_json(
        &self,
        report: &ConformanceReport,
        violations: &[&Violation],
    ) -> ConformanceResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule_id": v.rule_id,
                    "unit": v.unit,
                    "layer": v.layer.as_str(),
                    "unit_path": v.unit_path.display().to_string(),
                    "severity": v.severity.as_str(),
                    "confidence": v.confidence.as_str(),
                    "message": v.message,
                    "detected_at": v.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_warnings: Vec<JsonValue> = if self.options.show_warnings {
            report
                .scan_warnings
                .iter()
                .map(|w| {
                    serde_json::json!({
                        "path": w.path.display().to_string(),
                        "message": w.message
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let summary = &report.summary;
        let json_report = serde_json::json!({
            "violations": json_violations,
            "scan_warnings": json_warnings,
            "summary": {
                "total_units": summary.total_units,
                "unstructured_units": summary.unstructured_units,
                "evaluations": summary.evaluations,
                "violations_by_severity": {
                    "error": summary.violations_by_severity.error,
                    "warning": summary.violations_by_severity.warning,
                    "info": summary.violations_by_severity.info
                },
                "scan_warnings": summary.scan_warnings,
                "execution_time_ms": summary.execution_time_ms,
                "checked_at": summary.checked_at.to_rfc3339()
            },
            "exit_code": report.exit_code(),
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| ConformanceError::report(format!("JSON serialization failed: {e}")))
    }

    /// Format report in JUnit XML format, one test case per failed (unit, rule) pair
    fn format_junit(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let failures = violations.iter().filter(|v| v.is_blocking()).count();
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        xml.push_str(&format!(
            "<testsuite name=\"component-guardian\" tests=\"{}\" failures=\"{}\" errors=\"0\" \
             time=\"{:.3}\">\n",
            violations.len(),
            failures,
            execution_time
        ));

        for violation in violations {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                escape_xml(&violation.rule_id),
                escape_xml(&violation.unit)
            ));

            if violation.is_blocking() {
                xml.push_str(&format!(
                    "    <failure message=\"{}\">\n",
                    escape_xml(&violation.message)
                ));
                xml.push_str(&format!(
                    "      Unit: {} ({})\n",
                    escape_xml(&violation.unit_path.display().to_string()),
                    violation.layer
                ));
                xml.push_str("    </failure>\n");
            } else {
                xml.push_str(&format!(
                    "    <system-out>{}: {}</system-out>\n",
                    violation.severity.as_str(),
                    escape_xml(&violation.message)
                ));
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Format report in SARIF format
    fn format_sarif(&self, violations: &[&Violation]) -> ConformanceResult<String> {
        let sarif_results: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                let level = match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                };

                serde_json::json!({
                    "ruleId": v.rule_id,
                    "level": level,
                    "message": {
                        "text": format!("{}: {}", v.unit, v.message)
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": v.unit_path.display().to_string()
                            }
                        }
                    }],
                    "properties": {
                        "unit": v.unit,
                        "layer": v.layer.as_str(),
                        "confidence": v.confidence.as_str()
                    }
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "component-guardian",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": sarif_results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| ConformanceError::report(format!("SARIF serialization failed: {e}")))
    }

    /// Format report for GitHub Actions
    fn format_github(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };

            output.push_str(&format!(
                "::{} file={},title={}::{}: {}\n",
                level,
                violation.unit_path.display(),
                violation.rule_id,
                violation.unit,
                violation.message
            ));
        }

        if self.options.show_warnings {
            for warning in &report.scan_warnings {
                output.push_str(&format!(
                    "::warning file={},title=scan::{}\n",
                    warning.path.display(),
                    warning.message
                ));
            }
        }

        output
    }

    /// Format the summary section
    fn format_summary(&self, report: &ConformanceReport) -> String {
        let summary = &report.summary;
        let counts = &summary.violations_by_severity;
        let execution_time = (summary.execution_time_ms as f64) / 1000.0;

        let mut parts = Vec::new();
        if counts.error > 0 {
            let text = format!("{} error{}", counts.error, plural(counts.error));
            parts.push(self.paint(&text, Tone::Error));
        }
        if counts.warning > 0 {
            let text = format!("{} warning{}", counts.warning, plural(counts.warning));
            parts.push(self.paint(&text, Tone::Warning));
        }
        if counts.info > 0 {
            parts.push(self.paint(&format!("{} info", counts.info), Tone::Info));
        }
        if parts.is_empty() {
            parts.push(self.paint("0 violations", Tone::Success));
        }

        let mut line = format!(
            "📊 {} {} in {} units",
            self.paint("Summary:", Tone::Bold),
            parts.join(", "),
            summary.total_units
        );
        if summary.unstructured_units > 0 {
            line.push_str(&format!(", {} unstructured", summary.unstructured_units));
        }
        if summary.scan_warnings > 0 {
            line.push_str(&format!(
                ", {} scan warning{}",
                summary.scan_warnings,
                plural(summary.scan_warnings)
            ));
        }
        line.push_str(&format!(" ({execution_time:.1}s)\n"));
        line
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if self.options.use_colors {
            styled(text, tone)
        } else {
            text.to_string()
        }
    }
}

#[cfg(feature = "colors")]
fn styled(text: &str, tone: Tone) -> String {
    use colored::Colorize;
    match tone {
        Tone::Error => text.red().bold().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Info => text.cyan().to_string(),
        Tone::Success => text.green().to_string(),
        Tone::Dim => text.dimmed().to_string(),
        Tone::Bold => text.bold().to_string(),
    }
}

#[cfg(not(feature = "colors"))]
fn styled(text: &str, _tone: Tone) -> String {
    text.to_string()
}

fn severity_tone(severity: Severity) -> Tone {
    match severity {
        Severity::Error => Tone::Error,
        Severity::Warning => Tone::Warning,
        Severity::Info => Tone::Info,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn group_by_unit<'a>(violations: &[&'a Violation]) -> BTreeMap<&'a str, Vec<&'a Violation>> {
    let mut grouped: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
    for &violation in violations {
        grouped.entry(violation.unit.as_str()).or_default().push(violation);
    }
    grouped
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::Layer;
    use crate::domain::violations::ScanWarning;

    fn create_test_report() -> ConformanceReport {
        let mut report = ConformanceReport::new();

        report.add_violation(
            Violation::new(
                "HAS_TEST_FILE",
                "Button",
                Layer::Atom,
                Severity::Error,
                "missing co-located test file, expected Button.test.tsx or Button.test.ts",
            )
            .with_path("src/components/atoms/Button"),
        );
        report.add_violation(
            Violation::new(
                "NO_HARDCODED_COLOR_LITERAL",
                "Button",
                Layer::Atom,
                Severity::Warning,
                "use theme tokens instead of color literal: #fff",
            )
            .with_path("src/components/atoms/Button")
            .with_confidence(Confidence::Low),
        );
        report.add_violation(
            Violation::new(
                "MAX_LINE_COUNT",
                "Alert",
                Layer::Molecule,
                Severity::Warning,
                "too long",
            )
            .with_path("src/components/molecules/Alert"),
        );
        report.add_scan_warning(ScanWarning::new("src/hooks", "cannot read hook root"));

        report.set_unit_counts(10, 1);
        report.set_execution_time(1200);

        report
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_text_format_groups_by_unit() {
        let output = plain()
            .format_report(&create_test_report(), OutputFormat::Text)
            .unwrap();
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "Alert: [MAX_LINE_COUNT] too long");
        assert!(lines[1].starts_with("Button: [HAS_TEST_FILE] missing co-located test file"));
        assert!(lines[2].starts_with("Button: [NO_HARDCODED_COLOR_LITERAL]"));
        assert_eq!(lines[3], "warning: src/hooks: cannot read hook root");
    }

    #[test]
    fn test_human_format() {
        let output = plain()
            .format_report(&create_test_report(), OutputFormat::Human)
            .unwrap();

        assert!(output.contains("Convention Violations Found"));
        assert!(output.contains("📦 Button (atom, src/components/atoms/Button)"));
        assert!(output.contains("(low confidence)"));
        assert!(output.contains("Scan warnings:"));
        assert!(output.contains("Summary: 1 error, 2 warnings in 10 units, 1 unstructured"));
    }

    #[test]
    fn test_json_format() {
        let output = ReportFormatter::default()
            .format_report(&create_test_report(), OutputFormat::Json)
            .unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["violations"].as_array().unwrap().len(), 3);
        assert_eq!(json["violations"][0]["rule_id"], "HAS_TEST_FILE");
        assert_eq!(json["violations"][1]["confidence"], "low");
        assert_eq!(json["summary"]["total_units"], 10);
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["scan_warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_junit_format() {
        let output = ReportFormatter::default()
            .format_report(&create_test_report(), OutputFormat::Junit)
            .unwrap();

        assert!(output.contains("<?xml version=\"1.0\""));
        assert!(output.contains("tests=\"3\" failures=\"1\""));
        assert!(output.contains("<testcase classname=\"HAS_TEST_FILE\" name=\"Button\">"));
        assert!(output.contains("<failure"));
        assert!(output.contains("<system-out>warning: too long</system-out>"));
    }

    #[test]
    fn test_sarif_format() {
        let output = ReportFormatter::default()
            .format_report(&create_test_report(), OutputFormat::Sarif)
            .unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["version"], "2.1.0");
        let results = json["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["level"], "error");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "src/components/atoms/Button"
        );
    }

    #[test]
    fn test_github_format() {
        let output = ReportFormatter::default()
            .format_report(&create_test_report(), OutputFormat::GitHub)
            .unwrap();

        assert!(output.contains(
            "::error file=src/components/atoms/Button,title=HAS_TEST_FILE::Button: missing"
        ));
        assert!(output
            .contains("::warning file=src/components/molecules/Alert,title=MAX_LINE_COUNT"));
        assert!(output.contains("title=scan::cannot read hook root"));
    }

    #[test]
    fn test_empty_report() {
        let output = plain()
            .format_report(&ConformanceReport::new(), OutputFormat::Human)
            .unwrap();
        assert!(output.contains("All component units conform"));
        assert!(output.contains("0 violations in 0 units"));
    }

    #[test]
    fn test_filtering_never_changes_exit_code() {
        let formatter = ReportFormatter::new(ReportOptions {
            min_severity: Some(Severity::Warning),
            max_violations: Some(1),
            show_warnings: false,
            use_colors: false,
        });
        let report = create_test_report();
        let output = formatter.format_report(&report, OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();

        assert_eq!(json["violations"].as_array().unwrap().len(), 1);
        assert!(json["scan_warnings"].as_array().unwrap().is_empty());
        assert_eq!(json["exit_code"], 1);
    }

    #[test]
    fn test_human_banner_follows_full_report() {
        let formatter = ReportFormatter::new(ReportOptions {
            max_violations: Some(0),
            use_colors: false,
            ..Default::default()
        });
        let report = create_test_report();
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();

        assert!(!output.contains("All component units conform"));
        assert!(output.contains("❌ Convention Violations Found"));
        assert!(output.contains("3 violations hidden by report options"));
        assert!(!output.contains("📦"));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_severity_filtering() {
        let formatter = ReportFormatter::new(ReportOptions {
            min_severity: Some(Severity::Error),
            use_colors: false,
            ..Default::default()
        });
        let output = formatter
            .format_report(&create_test_report(), OutputFormat::Text)
            .unwrap();
        assert_eq!(output.lines().filter(|l| l.contains(": [")).count(), 1);
    }

    #[test]
    fn test_format_names_round_trip() {
        for name in OutputFormat::all_formats() {
            assert!(OutputFormat::parse(name).is_some());
        }
        assert_eq!(OutputFormat::parse("GitHub"), Some(OutputFormat::GitHub));
        assert!(OutputFormat::parse("yaml").is_none());
    }
}
