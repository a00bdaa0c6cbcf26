//! Configuration loading and management for Component Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects
//! - Default layer layout and exclusions are embedded in the domain, not infrastructure
//! - Custom rules are declared as data and compiled by the rule registry

use crate::domain::unit::{FileKind, Layer};
use crate::domain::violations::{Confidence, ConformanceError, ConformanceResult, Severity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported configuration format versions
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// File names tried when no explicit configuration path is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "component_guardian.yaml",
    "component_guardian.yml",
    ".component_guardian.yaml",
    ".component_guardian.yml",
];

/// Main configuration structure for Component Guardian
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Configuration format version
    pub version: String,
    /// Directory (relative to the checked root) holding each layer's components
    #[serde(alias = "rootsByLayer")]
    pub roots_by_layer: BTreeMap<Layer, PathBuf>,
    /// Directory-name globs that are never visited
    #[serde(default = "default_exclude_dirs", alias = "excludeDirs")]
    pub exclude_dirs: BTreeSet<String>,
    /// Maximum line count of an implementation file
    #[serde(default = "default_max_lines", alias = "maxLines")]
    pub max_lines: usize,
    /// Severity replacements keyed by rule id
    #[serde(default, alias = "severityOverrides")]
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Rule ids removed from the registry
    #[serde(default, alias = "disabledRules")]
    pub disabled_rules: BTreeSet<String>,
    /// Regex for expressions whose literals count as theme values
    #[serde(default = "default_theme_access_pattern", alias = "themeAccessPattern")]
    pub theme_access_pattern: String,
    /// Project-specific rules declared as data
    #[serde(default, alias = "customRules")]
    pub custom_rules: Vec<CustomRuleConfig>,
}

/// A rule declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    /// Unique identifier for this rule
    pub id: String,
    /// Which check to perform
    pub kind: CustomRuleKind,
    /// Regex for `forbid_import` / `require_import`
    #[serde(default)]
    pub pattern: Option<String>,
    /// File kind for `require_file`
    #[serde(default)]
    pub file: Option<FileKind>,
    /// Threshold for `max_lines`
    #[serde(default)]
    pub threshold: Option<usize>,
    /// Layers the rule applies to; all layers when omitted
    #[serde(default)]
    pub layers: Option<Vec<Layer>>,
    #[serde(default = "default_custom_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub confidence: Confidence,
    /// Message template; `{unit}` and `{detail}` are substituted
    pub message: String,
}

/// Kinds of configuration-defined rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomRuleKind {
    /// Fail when any import source matches `pattern`
    ForbidImport,
    /// Fail when no import source matches `pattern`
    RequireImport,
    /// Fail when the unit lacks `file`
    RequireFile,
    /// Fail when the implementation exceeds `threshold` lines
    MaxLines,
}

impl CheckerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConformanceResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            ConformanceError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            ConformanceError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> ConformanceResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConformanceError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Find the first default configuration file in `dir`
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Default configuration: the conventional atomic-design layout
    pub fn with_defaults() -> Self {
        let roots_by_layer = [
            (Layer::Atom, "src/components/atoms"),
            (Layer::Molecule, "src/components/molecules"),
            (Layer::Organism, "src/components/organisms"),
            (Layer::Page, "src/pages"),
            (Layer::Hook, "src/hooks"),
            (Layer::Util, "src/utils"),
        ]
        .into_iter()
        .map(|(layer, path)| (layer, PathBuf::from(path)))
        .collect();

        Self {
            version: "1.0".to_string(),
            roots_by_layer,
            exclude_dirs: default_exclude_dirs(),
            max_lines: default_max_lines(),
            severity_overrides: BTreeMap::new(),
            disabled_rules: BTreeSet::new(),
            theme_access_pattern: default_theme_access_pattern(),
            custom_rules: Vec::new(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> ConformanceResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(ConformanceError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        if self.roots_by_layer.is_empty() {
            return Err(ConformanceError::config(
                "roots_by_layer must map at least one layer to a directory",
            ));
        }

        for (layer, root) in &self.roots_by_layer {
            if root.as_os_str().is_empty() {
                return Err(ConformanceError::config(format!(
                    "Layer '{layer}' has an empty root path"
                )));
            }
        }

        if self.max_lines == 0 {
            return Err(ConformanceError::config("max_lines must be greater than zero"));
        }

        for pattern in &self.exclude_dirs {
            glob::Pattern::new(pattern).map_err(|e| {
                ConformanceError::config(format!("Invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        regex::Regex::new(&self.theme_access_pattern).map_err(|e| {
            ConformanceError::config(format!(
                "Invalid theme_access_pattern '{}': {}",
                self.theme_access_pattern, e
            ))
        })?;

        let mut seen = BTreeSet::new();
        for rule in &self.custom_rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConformanceError::config(format!(
                    "Duplicate custom rule ID '{}'",
                    rule.id
                )));
            }
            rule.validate()?;
        }

        Ok(())
    }

    /// Root directory configured for a layer
    pub fn root_for(&self, layer: Layer) -> Option<&Path> {
        self.roots_by_layer.get(&layer).map(PathBuf::as_path)
    }

    /// Convert to YAML, the format configuration files are written in
    pub fn to_yaml(&self) -> ConformanceResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ConformanceError::config(format!("Failed to serialize config: {e}")))
    }

    /// Stable SHA-256 fingerprint of the configuration, recorded in reports
    pub fn fingerprint(&self) -> String {
        // BTree-backed collections keep the serialized form stable
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
    }
}

impl CustomRuleConfig {
    /// Check that the parameters required by `kind` are present and well-formed
    pub fn validate(&self) -> ConformanceResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConformanceError::config("Custom rule with empty id"));
        }

        match self.kind {
            CustomRuleKind::ForbidImport | CustomRuleKind::RequireImport => {
                let pattern = self.pattern.as_deref().ok_or_else(|| {
                    ConformanceError::config(format!(
                        "Custom rule '{}' needs a 'pattern'",
                        self.id
                    ))
                })?;
                regex::Regex::new(pattern).map_err(|e| {
                    ConformanceError::config(format!(
                        "Invalid regex pattern in rule '{}': {}",
                        self.id, e
                    ))
                })?;
            }
            CustomRuleKind::RequireFile => {
                if self.file.is_none() {
                    return Err(ConformanceError::config(format!(
                        "Custom rule '{}' needs a 'file'",
                        self.id
                    )));
                }
            }
            CustomRuleKind::MaxLines => match self.threshold {
                Some(n) if n > 0 => {}
                _ => {
                    return Err(ConformanceError::config(format!(
                        "Custom rule '{}' needs a positive 'threshold'",
                        self.id
                    )))
                }
            },
        }

        Ok(())
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_exclude_dirs() -> BTreeSet<String> {
    ["__tests__", "__snapshots__", "__mocks__", "node_modules", ".*"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_lines() -> usize {
    150
}

fn default_theme_access_pattern() -> String {
    r"theme(\.[A-Za-z_][A-Za-z0-9_]*|\[[^\]]*\])+".to_string()
}

fn default_custom_severity() -> Severity {
    Severity::Warning
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: CheckerConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CheckerConfig::default(),
        }
    }

    /// Start from an empty layer mapping
    pub fn empty() -> Self {
        let mut config = CheckerConfig::default();
        config.roots_by_layer.clear();
        Self { config }
    }

    /// Map a layer to a root directory
    pub fn root(mut self, layer: Layer, path: impl Into<PathBuf>) -> Self {
        self.config.roots_by_layer.insert(layer, path.into());
        self
    }

    pub fn exclude_dir(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude_dirs.insert(pattern.into());
        self
    }

    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.config.max_lines = max_lines;
        self
    }

    pub fn severity_override(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.config.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    pub fn disable_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.config.disabled_rules.insert(rule_id.into());
        self
    }

    pub fn custom_rule(mut self, rule: CustomRuleConfig) -> Self {
        self.config.custom_rules.push(rule);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ConformanceResult<CheckerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
version: "1.0"
rootsByLayer:
  atoms: ui/atoms
  molecule: ui/molecules
excludeDirs: ["__tests__"]
maxLines: 120
severityOverrides:
  HAS_STORY_FILE: error
custom_rules:
  - id: NO_STORE_IN_ATOMS
    kind: forbid_import
    pattern: "(^|/)store(/|$)"
    layers: [atom]
    severity: error
    message: "{unit} imports global state: {detail}"
"#;

    #[test]
    fn test_defaults_are_valid() {
        let config = CheckerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_lines, 150);
        assert_eq!(config.roots_by_layer.len(), 6);
        assert!(config.exclude_dirs.contains("node_modules"));
    }

    #[test]
    fn test_load_accepts_camel_case_keys() {
        let config = CheckerConfig::load_from_str(SAMPLE).unwrap();
        assert_eq!(config.root_for(Layer::Atom), Some(Path::new("ui/atoms")));
        assert_eq!(config.root_for(Layer::Page), None);
        assert_eq!(config.max_lines, 120);
        assert_eq!(config.severity_overrides["HAS_STORY_FILE"], Severity::Error);
        assert_eq!(config.custom_rules.len(), 1);
        assert_eq!(config.custom_rules[0].kind, CustomRuleKind::ForbidImport);
        assert_eq!(config.custom_rules[0].layers, Some(vec![Layer::Atom]));
    }

    #[test]
    fn test_missing_layer_mapping_is_fatal() {
        let err = CheckerConfig::load_from_str("version: \"1.0\"\nroots_by_layer: {}\n")
            .unwrap_err();
        assert!(matches!(err, ConformanceError::Configuration { .. }));

        let err = CheckerConfig::load_from_str("version: \"1.0\"\n").unwrap_err();
        assert!(matches!(err, ConformanceError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_version = CheckerConfig {
            version: "2.0".into(),
            ..Default::default()
        };
        assert!(bad_version.validate().is_err());

        assert!(ConfigBuilder::new().max_lines(0).build().is_err());
        assert!(ConfigBuilder::new().exclude_dir("[unclosed").build().is_err());

        let bad_regex = CheckerConfig {
            theme_access_pattern: "theme(".into(),
            ..Default::default()
        };
        assert!(bad_regex.validate().is_err());
    }

    #[test]
    fn test_custom_rule_parameters_are_checked() {
        let rule = CustomRuleConfig {
            id: "NEEDS_STYLES".into(),
            kind: CustomRuleKind::RequireFile,
            pattern: None,
            file: None,
            threshold: None,
            layers: None,
            severity: Severity::Warning,
            confidence: Confidence::High,
            message: "{unit} has no styles file".into(),
        };
        assert!(rule.validate().is_err());

        let fixed = CustomRuleConfig {
            file: Some(FileKind::Styles),
            ..rule.clone()
        };
        assert!(fixed.validate().is_ok());

        let duplicated = ConfigBuilder::new()
            .custom_rule(fixed.clone())
            .custom_rule(fixed)
            .build();
        assert!(duplicated.is_err());
    }

    #[test]
    fn test_load_from_file_and_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("component_guardian.yaml");
        let config = ConfigBuilder::new()
            .max_lines(90)
            .disable_rule("NO_INLINE_STYLE")
            .build()
            .unwrap();
        fs::write(&path, config.to_yaml().unwrap()).unwrap();

        assert_eq!(CheckerConfig::discover(temp_dir.path()), Some(path.clone()));
        let loaded = CheckerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = CheckerConfig::default();
        let b = CheckerConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);

        let c = ConfigBuilder::new().max_lines(151).build().unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
