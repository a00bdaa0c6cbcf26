//! Declarative conformance rules
//!
//! Architectural Principle: Service Layer - Rules are data, the predicate is chosen by kind
//! - Each guideline is a `Rule` value carrying a `RuleKind` tagged variant
//! - Predicates are pure functions of a single ComponentUnit
//! - `RuleKind::Custom` is the extension point for checks written in Rust

pub mod registry;

use crate::domain::unit::{ComponentUnit, FileKind, Layer, SourceFacts};
use crate::domain::violations::{Confidence, ConformanceError, ConformanceResult, Severity};
use crate::scanner::source::matches_whole;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

pub use registry::{RuleRegistry, REGISTRY_VERSION};

/// Result of applying one rule to one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// The unit does not conform; the string is substituted for `{detail}`
    Fail(String),
}

impl Outcome {
    pub fn fail(detail: impl Into<String>) -> Self {
        Self::Fail(detail.into())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A conformance check implemented in Rust rather than declared as data
pub trait UnitCheck: Send + Sync + fmt::Debug {
    /// Check a unit; `Err` is reported as an internal rule failure
    fn check(&self, unit: &ComponentUnit) -> ConformanceResult<Outcome>;

    /// Whether the check reads the implementation file facts
    fn needs_source(&self) -> bool {
        false
    }
}

/// Which layers a rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerScope {
    All,
    Only(BTreeSet<Layer>),
}

impl LayerScope {
    pub fn only<I: IntoIterator<Item = Layer>>(layers: I) -> Self {
        Self::Only(layers.into_iter().collect())
    }

    pub fn contains(&self, layer: Layer) -> bool {
        match self {
            Self::All => true,
            Self::Only(layers) => layers.contains(&layer),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Only(layers) => layers
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// The predicate a rule applies, with its parameters
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// A conventional file must be present
    RequireFile(FileKind),
    /// The barrel may only use named re-exports
    NamedReexportsOnly,
    /// Neither implementation nor barrel may export a default
    NoDefaultExport,
    /// Implementation file line limit
    MaxLineCount(usize),
    /// Props must be declared with `type`, not `interface`
    PropsTypeAlias,
    /// Literal tokens must not look like colors; the regex recognizes a color token
    NoHardcodedColor(Regex),
    /// No `style={{ .. }}` props
    NoInlineStyle,
    /// Unit directory name is PascalCase
    PascalCaseName,
    /// Unit directory name starts with `use` followed by an uppercase letter
    HookNamePrefix,
    /// No imports from layers higher on the composition ladder; maps layer to its directory segment
    LayerDependency(BTreeMap<Layer, String>),
    /// The directory must contain an implementation file matching its name
    Structured,
    /// No import source may match
    ForbidImport(Regex),
    /// At least one import source must match
    RequireImport(Regex),
    Custom(Arc<dyn UnitCheck>),
}

impl RuleKind {
    /// Whether the predicate reads implementation file facts.
    ///
    /// Such rules are not applicable to unstructured units.
    pub fn needs_source(&self) -> bool {
        match self {
            Self::MaxLineCount(_)
            | Self::NoDefaultExport
            | Self::PropsTypeAlias
            | Self::NoHardcodedColor(_)
            | Self::NoInlineStyle
            | Self::LayerDependency(_)
            | Self::ForbidImport(_)
            | Self::RequireImport(_) => true,
            Self::Custom(check) => check.needs_source(),
            Self::RequireFile(_)
            | Self::NamedReexportsOnly
            | Self::PascalCaseName
            | Self::HookNamePrefix
            | Self::Structured => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RequireFile(_) => "require_file",
            Self::NamedReexportsOnly => "named_reexports_only",
            Self::NoDefaultExport => "no_default_export",
            Self::MaxLineCount(_) => "max_line_count",
            Self::PropsTypeAlias => "props_type_alias",
            Self::NoHardcodedColor(_) => "no_hardcoded_color",
            Self::NoInlineStyle => "no_inline_style",
            Self::PascalCaseName => "pascal_case_name",
            Self::HookNamePrefix => "hook_name_prefix",
            Self::LayerDependency(_) => "layer_dependency",
            Self::Structured => "structured",
            Self::ForbidImport(_) => "forbid_import",
            Self::RequireImport(_) => "require_import",
            Self::Custom(_) => "custom",
        }
    }
}

/// One conformance check mapped from a guideline
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub description: String,
    pub scope: LayerScope,
    pub severity: Severity,
    pub confidence: Confidence,
    /// Message template; `{unit}` and `{detail}` are substituted
    pub message: String,
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(id: impl Into<String>, kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            scope: LayerScope::All,
            severity: Severity::Error,
            confidence: Confidence::High,
            message: message.into(),
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_scope(mut self, scope: LayerScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_layers<I: IntoIterator<Item = Layer>>(self, layers: I) -> Self {
        self.with_scope(LayerScope::only(layers))
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Whether this rule is evaluated for `unit`
    pub fn applies_to(&self, unit: &ComponentUnit) -> bool {
        self.scope.contains(unit.layer) && (unit.is_structured() || !self.kind.needs_source())
    }

    pub fn render_message(&self, unit: &ComponentUnit, detail: &str) -> String {
        self.message.replace("{unit}", &unit.name).replace("{detail}", detail)
    }

    /// Apply the predicate
    pub fn check(&self, unit: &ComponentUnit) -> ConformanceResult<Outcome> {
        match &self.kind {
            RuleKind::RequireFile(kind) => Ok(require_file(unit, *kind)),
            RuleKind::Structured => Ok(require_file(unit, FileKind::Implementation)),
            RuleKind::NamedReexportsOnly => self.check_named_reexports(unit),
            RuleKind::NoDefaultExport => {
                let source = self.source_of(unit)?;
                let mut offenders = Vec::new();
                if source.has_default_export {
                    offenders.push(FileKind::Implementation.as_str());
                }
                if unit.barrel.as_ref().is_some_and(|b| b.has_default_export) {
                    offenders.push(FileKind::Barrel.as_str());
                }
                Ok(if offenders.is_empty() {
                    Outcome::Pass
                } else {
                    Outcome::fail(format!("default export in {}", offenders.join(" and ")))
                })
            }
            RuleKind::MaxLineCount(max) => {
                let lines = self.source_of(unit)?.line_count;
                Ok(if lines > *max {
                    Outcome::fail(format!("{lines} lines, limit is {max}"))
                } else {
                    Outcome::Pass
                })
            }
            RuleKind::PropsTypeAlias => {
                let source = self.source_of(unit)?;
                Ok(fail_on_names("interface", &source.props_interfaces))
            }
            RuleKind::NoHardcodedColor(color) => {
                let source = self.source_of(unit)?;
                let colors: BTreeSet<String> = source
                    .literal_tokens
                    .iter()
                    .filter(|token| matches_whole(color, token))
                    .cloned()
                    .collect();
                Ok(fail_on_names("color literal", &colors))
            }
            RuleKind::NoInlineStyle => {
                let count = self.source_of(unit)?.inline_styles;
                Ok(if count > 0 {
                    Outcome::fail(format!("{count} inline style prop(s)"))
                } else {
                    Outcome::Pass
                })
            }
            RuleKind::PascalCaseName => Ok(if is_pascal_case(&unit.name) {
                Outcome::Pass
            } else {
                Outcome::fail(format!("'{}' is not PascalCase", unit.name))
            }),
            RuleKind::HookNamePrefix => Ok(if is_hook_name(&unit.name) {
                Outcome::Pass
            } else {
                Outcome::fail(format!("'{}' does not start with 'use'", unit.name))
            }),
            RuleKind::LayerDependency(segments) => {
                let source = self.source_of(unit)?;
                let offending: BTreeSet<String> = segments
                    .iter()
                    .filter(|(layer, _)| unit.layer.is_below(**layer))
                    .flat_map(|(_, segment)| {
                        source
                            .import_sources
                            .iter()
                            .filter(move |import| {
                                import.split('/').any(|part| part == segment.as_str())
                            })
                    })
                    .cloned()
                    .collect();
                Ok(fail_on_names("import from a higher layer", &offending))
            }
            RuleKind::ForbidImport(pattern) => {
                let source = self.source_of(unit)?;
                let offending: BTreeSet<String> = source
                    .import_sources
                    .iter()
                    .filter(|import| pattern.is_match(import))
                    .cloned()
                    .collect();
                Ok(fail_on_names("forbidden import", &offending))
            }
            RuleKind::RequireImport(pattern) => {
                let source = self.source_of(unit)?;
                Ok(if source.import_sources.iter().any(|import| pattern.is_match(import)) {
                    Outcome::Pass
                } else {
                    Outcome::fail(format!("no import matching '{}'", pattern.as_str()))
                })
            }
            RuleKind::Custom(check) => check.check(unit),
        }
    }

    fn check_named_reexports(&self, unit: &ComponentUnit) -> ConformanceResult<Outcome> {
        if !unit.has_file(FileKind::Barrel) {
            return Ok(Outcome::Pass);
        }
        let barrel = unit.barrel.as_ref().ok_or_else(|| {
            ConformanceError::rule(&self.id, &unit.name, "barrel file could not be read")
        })?;

        let mut problems = Vec::new();
        if !barrel.star_reexports.is_empty() {
            let sources: Vec<_> = barrel.star_reexports.iter().map(String::as_str).collect();
            problems.push(format!("wildcard re-export of {}", sources.join(", ")));
        }
        if barrel.has_default_export {
            problems.push("default re-export".to_string());
        }

        Ok(if problems.is_empty() {
            Outcome::Pass
        } else {
            Outcome::fail(problems.join("; "))
        })
    }

    fn source_of<'a>(&self, unit: &'a ComponentUnit) -> ConformanceResult<&'a SourceFacts> {
        unit.source.as_ref().ok_or_else(|| {
            ConformanceError::rule(&self.id, &unit.name, "implementation file could not be read")
        })
    }
}

fn require_file(unit: &ComponentUnit, kind: FileKind) -> Outcome {
    if unit.has_file(kind) {
        Outcome::Pass
    } else {
        Outcome::fail(format!("expected {}", kind.expected_names(&unit.name).join(" or ")))
    }
}

fn fail_on_names(what: &str, names: &BTreeSet<String>) -> Outcome {
    if names.is_empty() {
        return Outcome::Pass;
    }
    let listed: Vec<_> = names.iter().map(String::as_str).collect();
    Outcome::fail(format!("{what}: {}", listed.join(", ")))
}

fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

fn is_hook_name(name: &str) -> bool {
    name.strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::BarrelFacts;
    use crate::scanner::source::COLOR_LITERAL_PATTERN;
    use rstest::rstest;

    fn atom(name: &str) -> ComponentUnit {
        ComponentUnit::new(name, Layer::Atom, format!("src/atoms/{name}"))
    }

    fn source_with_imports(imports: &[&str]) -> SourceFacts {
        let mut source = SourceFacts::default();
        source
            .import_sources
            .extend(imports.iter().map(|i| i.to_string()));
        source
    }

    #[test]
    fn require_file_reports_expected_names() {
        let rule = Rule::new(
            "HAS_TEST_FILE",
            RuleKind::RequireFile(FileKind::Test),
            "missing test: {detail}",
        );
        let unit = atom("Button");
        let outcome = rule.check(&unit).unwrap();
        assert_eq!(outcome, Outcome::fail("expected Button.test.tsx or Button.test.ts"));
        assert_eq!(rule.render_message(&unit, "x"), "missing test: x");

        let unit = unit.with_file(FileKind::Test);
        assert!(rule.check(&unit).unwrap().is_pass());
    }

    #[test]
    fn missing_barrel_is_reported() {
        let rule = Rule::new(
            "HAS_BARREL_EXPORT",
            RuleKind::RequireFile(FileKind::Barrel),
            "{detail}",
        );
        assert_eq!(
            rule.check(&atom("Button")).unwrap(),
            Outcome::fail("expected index.ts or index.tsx")
        );

        let with_barrel = atom("Button").with_barrel(BarrelFacts::default());
        assert!(rule.check(&with_barrel).unwrap().is_pass());
    }

    #[test]
    fn source_rules_skip_unstructured_units() {
        let rule = Rule::new("MAX_LINE_COUNT", RuleKind::MaxLineCount(10), "{detail}");
        let unit = atom("Orphan");
        assert!(!rule.applies_to(&unit));

        let file_rule = Rule::new(
            "HAS_TEST_FILE",
            RuleKind::RequireFile(FileKind::Test),
            "{detail}",
        );
        assert!(file_rule.applies_to(&unit));
    }

    #[test]
    fn missing_source_is_an_internal_failure() {
        let rule = Rule::new("MAX_LINE_COUNT", RuleKind::MaxLineCount(10), "{detail}");
        let unit = atom("Broken").with_file(FileKind::Implementation);
        assert!(rule.applies_to(&unit));
        let err = rule.check(&unit).unwrap_err();
        assert!(matches!(err, ConformanceError::RuleEvaluation { .. }));
    }

    #[test]
    fn scope_limits_layers() {
        let rule = Rule::new("HAS_STORY_FILE", RuleKind::RequireFile(FileKind::Story), "")
            .with_layers([Layer::Atom, Layer::Molecule]);
        let hook = ComponentUnit::new("useToggle", Layer::Hook, "src/hooks/useToggle");
        assert!(rule.applies_to(&atom("Button")));
        assert!(!rule.applies_to(&hook));
        assert_eq!(rule.scope.describe(), "atom, molecule");
    }

    #[test]
    fn named_reexports_only() {
        let rule = Rule::new("USES_NAMED_EXPORT_ONLY", RuleKind::NamedReexportsOnly, "{detail}");
        assert!(rule.check(&atom("NoBarrel")).unwrap().is_pass());

        let mut star = BarrelFacts::default();
        star.star_reexports.insert("./Button".into());
        let outcome = rule.check(&atom("Button").with_barrel(star)).unwrap();
        assert_eq!(outcome, Outcome::fail("wildcard re-export of ./Button"));

        let unreadable = atom("Button").with_file(FileKind::Barrel);
        assert!(rule.check(&unreadable).is_err());
    }

    #[rstest]
    #[case(false, false, None)]
    #[case(true, false, Some("default export in implementation"))]
    #[case(false, true, Some("default export in barrel"))]
    #[case(true, true, Some("default export in implementation and barrel"))]
    fn no_default_export(
        #[case] in_implementation: bool,
        #[case] in_barrel: bool,
        #[case] expected: Option<&str>,
    ) {
        let rule = Rule::new("NO_DEFAULT_EXPORT", RuleKind::NoDefaultExport, "{detail}");
        let source = SourceFacts {
            has_default_export: in_implementation,
            ..Default::default()
        };
        let barrel = BarrelFacts {
            has_default_export: in_barrel,
            ..Default::default()
        };
        let unit = atom("Card").with_source(source).with_barrel(barrel);

        let outcome = rule.check(&unit).unwrap();
        assert_eq!(outcome, expected.map_or(Outcome::Pass, Outcome::fail));
    }

    #[test]
    fn props_must_use_type_alias() {
        let rule = Rule::new(
            "PROPS_USE_TYPE_ALIAS_NOT_INTERFACE",
            RuleKind::PropsTypeAlias,
            "props must be declared with 'type', found {detail}",
        );

        let mut declared = SourceFacts::default();
        declared.props_interfaces.insert("CardProps".into());
        let unit = atom("Card").with_source(declared);
        let outcome = rule.check(&unit).unwrap();
        assert_eq!(outcome, Outcome::fail("interface: CardProps"));
        assert_eq!(
            rule.render_message(&unit, "interface: CardProps"),
            "props must be declared with 'type', found interface: CardProps"
        );

        let mut aliased = SourceFacts::default();
        aliased.props_type_aliases.insert("CardProps".into());
        assert!(rule.check(&atom("Card").with_source(aliased)).unwrap().is_pass());
    }

    #[test]
    fn layer_dependency_direction() {
        let segments: BTreeMap<Layer, String> = [
            (Layer::Atom, "atoms".to_string()),
            (Layer::Molecule, "molecules".to_string()),
            (Layer::Organism, "organisms".to_string()),
        ]
        .into_iter()
        .collect();
        let rule = Rule::new(
            "LAYER_DEPENDENCY_DIRECTION",
            RuleKind::LayerDependency(segments),
            "{detail}",
        );

        let source = source_with_imports(&["../../molecules/Card", "../Icon"]);
        let outcome = rule.check(&atom("Button").with_source(source.clone())).unwrap();
        assert_eq!(outcome, Outcome::fail("import from a higher layer: ../../molecules/Card"));

        let organism = ComponentUnit::new("Header", Layer::Organism, "src/organisms/Header")
            .with_source(source);
        assert!(rule.check(&organism).unwrap().is_pass());
    }

    #[test]
    fn hardcoded_colors_are_detected() {
        let color = Regex::new(COLOR_LITERAL_PATTERN).unwrap();
        let rule = Rule::new(
            "NO_HARDCODED_COLOR_LITERAL",
            RuleKind::NoHardcodedColor(color),
            "{detail}",
        );

        let mut source = SourceFacts::default();
        source.literal_tokens.extend([
            "#fff".to_string(),
            "Submit".to_string(),
            "12px".to_string(),
            "see #fff".to_string(),
        ]);
        let outcome = rule.check(&atom("Button").with_source(source)).unwrap();
        assert_eq!(outcome, Outcome::fail("color literal: #fff"));
    }

    #[rstest]
    #[case(&["../../store/user", "react"], Some("forbidden import: ../../store/user"))]
    #[case(&["react", "./useStore"], None)]
    fn forbid_import(#[case] imports: &[&str], #[case] expected: Option<&str>) {
        let pattern = Regex::new("(^|/)store(/|$)").unwrap();
        let rule = Rule::new("NO_STORE", RuleKind::ForbidImport(pattern), "{detail}");
        let unit = atom("Avatar").with_source(source_with_imports(imports));
        assert_eq!(
            rule.check(&unit).unwrap(),
            expected.map_or(Outcome::Pass, Outcome::fail)
        );
    }

    #[rstest]
    #[case(&["@/design/tokens", "react"], None)]
    #[case(&["react"], Some("no import matching '^@/design/'"))]
    #[case(&[], Some("no import matching '^@/design/'"))]
    fn require_import(#[case] imports: &[&str], #[case] expected: Option<&str>) {
        let pattern = Regex::new("^@/design/").unwrap();
        let rule = Rule::new("USES_DESIGN_TOKENS", RuleKind::RequireImport(pattern), "{detail}");
        let unit = atom("Badge").with_source(source_with_imports(imports));
        assert_eq!(
            rule.check(&unit).unwrap(),
            expected.map_or(Outcome::Pass, Outcome::fail)
        );
    }

    #[rstest]
    #[case(40, None)]
    #[case(41, Some("41 lines, limit is 40"))]
    fn max_line_count(#[case] lines: usize, #[case] expected: Option<&str>) {
        let rule = Rule::new("MAX_LINE_COUNT", RuleKind::MaxLineCount(40), "{detail}");
        let source = SourceFacts {
            line_count: lines,
            ..Default::default()
        };
        assert_eq!(
            rule.check(&atom("Table").with_source(source)).unwrap(),
            expected.map_or(Outcome::Pass, Outcome::fail)
        );
    }

    #[rstest]
    #[case("Button", true)]
    #[case("DatePicker2", true)]
    #[case("button", false)]
    #[case("date-picker", false)]
    #[case("", false)]
    fn pascal_case(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_pascal_case(name), expected);
    }

    #[rstest]
    #[case("useToggle", true)]
    #[case("use2", false)]
    #[case("user", false)]
    #[case("toggle", false)]
    fn hook_names(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_hook_name(name), expected);
    }
}
