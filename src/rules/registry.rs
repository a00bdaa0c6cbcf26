//! The versioned list of rules in force for a run

use super::{Rule, RuleKind};
use crate::config::{CheckerConfig, CustomRuleConfig, CustomRuleKind};
use crate::domain::unit::{FileKind, Layer};
use crate::domain::violations::{Confidence, ConformanceError, ConformanceResult, Severity};
use crate::scanner::source::COLOR_LITERAL_PATTERN;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Bumped whenever a built-in rule is added, removed or changes meaning
pub const REGISTRY_VERSION: &str = "1";

/// Ordered, id-unique collection of rules
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in guideline rules, parameterized by `config`
    pub fn builtin(config: &CheckerConfig) -> ConformanceResult<Self> {
        let components = Layer::COMPONENTS;
        let composed = [Layer::Atom, Layer::Molecule, Layer::Organism];

        let color = Regex::new(COLOR_LITERAL_PATTERN)
            .map_err(|e| ConformanceError::config(format!("Invalid color pattern: {e}")))?;

        let mut registry = Self::new();
        let rules = vec![
            Rule::new(
                "HAS_TEST_FILE",
                RuleKind::RequireFile(FileKind::Test),
                "missing co-located test file, {detail}",
            )
            .with_description("Every unit ships a test file named after it"),
            Rule::new(
                "HAS_STORY_FILE",
                RuleKind::RequireFile(FileKind::Story),
                "missing story file, {detail}",
            )
            .with_description("Atoms, molecules and organisms are documented with a story")
            .with_layers(composed)
            .with_severity(Severity::Warning),
            Rule::new(
                "HAS_BARREL_EXPORT",
                RuleKind::RequireFile(FileKind::Barrel),
                "missing barrel file, {detail}",
            )
            .with_description("Every unit is imported through its index file"),
            Rule::new(
                "USES_NAMED_EXPORT_ONLY",
                RuleKind::NamedReexportsOnly,
                "barrel must use named re-exports: {detail}",
            )
            .with_description("The barrel lists what it re-exports by name")
            .with_severity(Severity::Warning),
            Rule::new(
                "MAX_LINE_COUNT",
                RuleKind::MaxLineCount(config.max_lines),
                "implementation file too long: {detail}",
            )
            .with_description("Implementation files stay small enough to review")
            .with_severity(Severity::Warning),
            Rule::new("NO_DEFAULT_EXPORT", RuleKind::NoDefaultExport, "{detail}")
                .with_description("Default exports are not allowed"),
            Rule::new(
                "PROPS_USE_TYPE_ALIAS_NOT_INTERFACE",
                RuleKind::PropsTypeAlias,
                "props must be declared with 'type', found {detail}",
            )
            .with_description("Props are declared as type aliases")
            .with_layers(components)
            .with_severity(Severity::Warning),
            Rule::new(
                "NO_HARDCODED_COLOR_LITERAL",
                RuleKind::NoHardcodedColor(color),
                "use theme tokens instead of {detail}",
            )
            .with_description("Colors come from the theme, not literals")
            .with_layers(components)
            .with_severity(Severity::Warning)
            .with_confidence(Confidence::Low),
            Rule::new("NO_INLINE_STYLE", RuleKind::NoInlineStyle, "{detail}")
                .with_description("Styling lives in style files, not inline props")
                .with_layers(components)
                .with_severity(Severity::Warning),
            Rule::new("COMPONENT_NAME_PASCAL_CASE", RuleKind::PascalCaseName, "{detail}")
                .with_description("Component directories are PascalCase")
                .with_layers(components)
                .with_severity(Severity::Warning),
            Rule::new("HOOK_NAME_PREFIX", RuleKind::HookNamePrefix, "{detail}")
                .with_description("Hook directories are named use<Something>")
                .with_layers([Layer::Hook]),
            Rule::new(
                "LAYER_DEPENDENCY_DIRECTION",
                RuleKind::LayerDependency(layer_segments(config)),
                "{detail}",
            )
            .with_description("Lower layers never import from higher ones")
            .with_layers(composed),
            Rule::new(
                "UNSTRUCTURED_DIRECTORY",
                RuleKind::Structured,
                "directory has no main file, {detail}",
            )
            .with_description("Each unit directory holds an implementation file named after it")
            .with_severity(Severity::Warning),
        ];

        for rule in rules {
            registry.push(rule)?;
        }
        Ok(registry)
    }

    /// Built-in rules plus configured custom rules, with disables and overrides applied
    pub fn from_config(config: &CheckerConfig) -> ConformanceResult<Self> {
        let mut registry = Self::builtin(config)?;
        for custom in &config.custom_rules {
            registry.push(compile_custom(custom)?)?;
        }

        for id in &config.disabled_rules {
            if registry.get(id).is_none() {
                return Err(ConformanceError::config(format!("Cannot disable unknown rule '{id}'")));
            }
        }
        for (id, severity) in &config.severity_overrides {
            match registry.rules.iter_mut().find(|rule| &rule.id == id) {
                Some(rule) => rule.severity = *severity,
                None => {
                    return Err(ConformanceError::config(format!(
                        "Severity override for unknown rule '{id}'"
                    )))
                }
            }
        }
        registry.rules.retain(|rule| !config.disabled_rules.contains(&rule.id));

        tracing::debug!(
            "Rule registry v{} loaded with {} rules",
            REGISTRY_VERSION,
            registry.rules.len()
        );
        Ok(registry)
    }

    /// Append a rule; ids must be unique
    pub fn push(&mut self, rule: Rule) -> ConformanceResult<()> {
        if self.get(&rule.id).is_some() {
            return Err(ConformanceError::config(format!("Duplicate rule id '{}'", rule.id)));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules whose scope contains `layer`
    pub fn for_layer(&self, layer: Layer) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.scope.contains(layer))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Last path segment of each ranked layer's root, e.g. `molecules`
fn layer_segments(config: &CheckerConfig) -> BTreeMap<Layer, String> {
    let mut seen = HashSet::new();
    config
        .roots_by_layer
        .iter()
        .filter(|(layer, _)| layer.composition_rank().is_some())
        .filter_map(|(layer, root)| {
            let segment = root.file_name()?.to_string_lossy().into_owned();
            seen.insert(segment.clone()).then_some((*layer, segment))
        })
        .collect()
}

fn compile_custom(custom: &CustomRuleConfig) -> ConformanceResult<Rule> {
    custom.validate()?;

    let pattern = || -> ConformanceResult<Regex> {
        let raw = custom.pattern.as_deref().unwrap_or_default();
        Regex::new(raw).map_err(|e| {
            ConformanceError::config(format!("Invalid regex pattern in rule '{}': {e}", custom.id))
        })
    };

    let kind = match custom.kind {
        CustomRuleKind::ForbidImport => RuleKind::ForbidImport(pattern()?),
        CustomRuleKind::RequireImport => RuleKind::RequireImport(pattern()?),
        CustomRuleKind::RequireFile => {
            RuleKind::RequireFile(custom.file.unwrap_or(FileKind::Implementation))
        }
        CustomRuleKind::MaxLines => RuleKind::MaxLineCount(custom.threshold.unwrap_or_default()),
    };

    let mut rule = Rule::new(&custom.id, kind, &custom.message)
        .with_description(format!("Custom {} rule", kind_label(custom.kind)))
        .with_severity(custom.severity)
        .with_confidence(custom.confidence);
    if let Some(layers) = &custom.layers {
        rule = rule.with_layers(layers.iter().copied());
    }
    Ok(rule)
}

fn kind_label(kind: CustomRuleKind) -> &'static str {
    match kind {
        CustomRuleKind::ForbidImport => "forbid_import",
        CustomRuleKind::RequireImport => "require_import",
        CustomRuleKind::RequireFile => "require_file",
        CustomRuleKind::MaxLines => "max_lines",
    }
}
