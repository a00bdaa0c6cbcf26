//! Structural records of component directories
//!
//! A `ComponentUnit` is what the scanner knows about one component directory:
//! which conventional files exist, and a shallow textual digest of the
//! implementation and barrel files. Units are immutable once built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Architectural tier of a component unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[serde(alias = "atoms")]
    Atom,
    #[serde(alias = "molecules")]
    Molecule,
    #[serde(alias = "organisms")]
    Organism,
    #[serde(alias = "pages")]
    Page,
    #[serde(alias = "hooks")]
    Hook,
    #[serde(alias = "utils")]
    Util,
}

impl Layer {
    pub const ALL: [Layer; 6] =
        [Self::Atom, Self::Molecule, Self::Organism, Self::Page, Self::Hook, Self::Util];

    /// Layers that render UI and follow the component conventions
    pub const COMPONENTS: [Layer; 4] = [Self::Atom, Self::Molecule, Self::Organism, Self::Page];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atom => "atom",
            Self::Molecule => "molecule",
            Self::Organism => "organism",
            Self::Page => "page",
            Self::Hook => "hook",
            Self::Util => "util",
        }
    }

    /// Position on the composition ladder. Hooks and utils are off the ladder.
    pub fn composition_rank(self) -> Option<u8> {
        match self {
            Self::Atom => Some(0),
            Self::Molecule => Some(1),
            Self::Organism => Some(2),
            Self::Page => Some(3),
            Self::Hook | Self::Util => None,
        }
    }

    /// Whether `other` sits strictly above this layer on the composition ladder
    pub fn is_below(self, other: Layer) -> bool {
        match (self.composition_rank(), other.composition_rank()) {
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atom" | "atoms" => Some(Self::Atom),
            "molecule" | "molecules" => Some(Self::Molecule),
            "organism" | "organisms" => Some(Self::Organism),
            "page" | "pages" => Some(Self::Page),
            "hook" | "hooks" => Some(Self::Hook),
            "util" | "utils" => Some(Self::Util),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conventional files a component directory can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// `<Name>.tsx` or `<Name>.ts`
    Implementation,
    /// `<Name>.test.tsx` or `<Name>.test.ts`
    Test,
    /// `<Name>.stories.tsx` or `<Name>.stories.ts`
    Story,
    /// `index.ts` or `index.tsx`
    Barrel,
    /// `<Name>.styles.ts` or `<Name>.styles.tsx`
    Styles,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::Test => "test",
            Self::Story => "story",
            Self::Barrel => "barrel",
            Self::Styles => "styles",
        }
    }

    /// Expected file names for a unit called `name`
    pub fn expected_names(self, name: &str) -> Vec<String> {
        match self {
            Self::Implementation => vec![format!("{name}.tsx"), format!("{name}.ts")],
            Self::Test => vec![format!("{name}.test.tsx"), format!("{name}.test.ts")],
            Self::Story => vec![format!("{name}.stories.tsx"), format!("{name}.stories.ts")],
            Self::Barrel => vec!["index.ts".to_string(), "index.tsx".to_string()],
            Self::Styles => vec![format!("{name}.styles.ts"), format!("{name}.styles.tsx")],
        }
    }

    /// Classify a file name relative to the unit it lives in
    pub fn classify(unit_name: &str, file_name: &str) -> Option<Self> {
        [Self::Implementation, Self::Test, Self::Story, Self::Barrel, Self::Styles]
            .into_iter()
            .find(|kind| kind.expected_names(unit_name).iter().any(|n| n == file_name))
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "implementation" | "main" => Some(Self::Implementation),
            "test" => Some(Self::Test),
            "story" | "stories" => Some(Self::Story),
            "barrel" | "index" => Some(Self::Barrel),
            "styles" | "style" => Some(Self::Styles),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shallow facts extracted from an implementation file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFacts {
    pub line_count: usize,
    /// Local names bound by import statements
    pub imported_symbols: BTreeSet<String>,
    /// Module specifiers (`'../molecules/Card'`, `'react'`)
    pub import_sources: BTreeSet<String>,
    /// Names exported with `export const|function|class|type|...` or `export { .. }`
    pub named_exports: BTreeSet<String>,
    pub has_default_export: bool,
    /// `interface FooProps` declarations
    pub props_interfaces: BTreeSet<String>,
    /// `type FooProps =` declarations
    pub props_type_aliases: BTreeSet<String>,
    /// String and number literals outside theme access
    pub literal_tokens: BTreeSet<String>,
    /// Occurrences of `style={{`
    pub inline_styles: usize,
}

/// Shallow facts extracted from an `index.ts` barrel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrelFacts {
    pub named_reexports: BTreeSet<String>,
    /// Sources re-exported with `export * from`
    pub star_reexports: BTreeSet<String>,
    /// `export default` or `export { default } from`
    pub has_default_export: bool,
}

/// The scanner's structural record of one component directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUnit {
    pub name: String,
    pub layer: Layer,
    pub path: PathBuf,
    pub files: BTreeSet<FileKind>,
    /// Facts of the implementation file; `None` when missing or unreadable
    pub source: Option<SourceFacts>,
    /// Facts of the barrel file; `None` when missing or unreadable
    pub barrel: Option<BarrelFacts>,
}

impl ComponentUnit {
    pub fn new(name: impl Into<String>, layer: Layer, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            layer,
            path: path.into(),
            files: BTreeSet::new(),
            source: None,
            barrel: None,
        }
    }

    pub fn with_file(mut self, kind: FileKind) -> Self {
        self.files.insert(kind);
        self
    }

    pub fn with_source(mut self, source: SourceFacts) -> Self {
        self.files.insert(FileKind::Implementation);
        self.source = Some(source);
        self
    }

    pub fn with_barrel(mut self, barrel: BarrelFacts) -> Self {
        self.files.insert(FileKind::Barrel);
        self.barrel = Some(barrel);
        self
    }

    pub fn has_file(&self, kind: FileKind) -> bool {
        self.files.contains(&kind)
    }

    /// A unit is structured when its implementation file matches the directory name
    pub fn is_structured(&self) -> bool {
        self.has_file(FileKind::Implementation)
    }

    /// Line count of the implementation file, when it was read
    pub fn line_count(&self) -> Option<usize> {
        self.source.as_ref().map(|s| s.line_count)
    }
}
