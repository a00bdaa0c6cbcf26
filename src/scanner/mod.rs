//! Repository scanner producing component units
//!
//! CDD Principle: Domain Services - Scanner turns a file tree into structural records
//! - Each configured layer root is enumerated one level deep
//! - Every subdirectory becomes exactly one ComponentUnit, structured or not
//! - Unreadable paths become scan warnings and never abort the scan

pub mod filter;
pub mod source;

use crate::config::CheckerConfig;
use crate::domain::unit::{ComponentUnit, FileKind, Layer};
use crate::domain::violations::{ConformanceResult, ScanWarning};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use filter::DirFilter;
pub use source::SourceExtractor;

/// Everything the scanner found
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Units ordered by layer, then by name
    pub units: Vec<ComponentUnit>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanOutcome {
    pub fn unstructured_count(&self) -> usize {
        self.units.iter().filter(|u| !u.is_structured()).count()
    }

    fn warn(&mut self, path: &Path, message: impl Into<String>) {
        let warning = ScanWarning::new(path, message);
        tracing::warn!("Scan warning: {}", warning.format_display());
        self.warnings.push(warning);
    }
}

/// Walks layer roots and builds one `ComponentUnit` per component directory
#[derive(Debug, Clone)]
pub struct Scanner {
    roots_by_layer: Vec<(Layer, PathBuf)>,
    filter: DirFilter,
    extractor: SourceExtractor,
}

impl Scanner {
    /// Create a scanner from configuration
    pub fn new(config: &CheckerConfig) -> ConformanceResult<Self> {
        Ok(Self {
            roots_by_layer: config
                .roots_by_layer
                .iter()
                .map(|(layer, root)| (*layer, root.clone()))
                .collect(),
            filter: DirFilter::new(config.exclude_dirs.iter().cloned())?,
            extractor: SourceExtractor::new(&config.theme_access_pattern)?,
        })
    }

    /// Add exclusion patterns on top of the configured ones
    pub fn with_extra_excludes<I, S>(mut self, patterns: I) -> ConformanceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            self.filter.add_pattern(pattern)?;
        }
        Ok(self)
    }

    pub fn extractor(&self) -> &SourceExtractor {
        &self.extractor
    }

    /// Scan the repository rooted at `root`
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> ScanOutcome {
        let root = root.as_ref();
        let mut outcome = ScanOutcome::default();

        for (layer, relative_root) in &self.roots_by_layer {
            self.scan_layer(root, *layer, relative_root, &mut outcome);
        }

        tracing::debug!(
            "Scanned {} units ({} unstructured, {} warnings) under {}",
            outcome.units.len(),
            outcome.unstructured_count(),
            outcome.warnings.len(),
            root.display()
        );
        outcome
    }

    fn scan_layer(
        &self,
        root: &Path,
        layer: Layer,
        relative_root: &Path,
        outcome: &mut ScanOutcome,
    ) {
        let layer_dir = root.join(relative_root);
        tracing::debug!("Scanning {} layer at {}", layer, layer_dir.display());

        if !layer_dir.exists() {
            outcome.warn(&layer_dir, format!("{layer} root does not exist"));
            return;
        }

        let entries = match fs::read_dir(&layer_dir) {
            Ok(entries) => entries,
            Err(e) => {
                outcome.warn(&layer_dir, format!("cannot read {layer} root: {e}"));
                return;
            }
        };

        let mut unit_dirs = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_dir() {
                        continue;
                    }
                    let relative = relative_root.join(entry.file_name());
                    if self.filter.is_excluded(&relative) {
                        tracing::debug!("Skipping excluded directory {}", relative.display());
                        continue;
                    }
                    unit_dirs.push(path);
                }
                Err(e) => outcome.warn(&layer_dir, format!("cannot read directory entry: {e}")),
            }
        }
        unit_dirs.sort();

        for dir in unit_dirs {
            if let Some(unit) = self.scan_unit(layer, &dir, outcome) {
                outcome.units.push(unit);
            }
        }
    }

    /// Build the record for one component directory.
    ///
    /// Returns `None` (with a warning) when the directory itself cannot be listed.
    pub fn scan_unit(
        &self,
        layer: Layer,
        dir: &Path,
        outcome: &mut ScanOutcome,
    ) -> Option<ComponentUnit> {
        let name = dir.file_name()?.to_string_lossy().into_owned();
        let mut unit = ComponentUnit::new(&name, layer, dir);
        let mut files: Vec<(FileKind, PathBuf)> = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let file_name = entry.file_name().to_string_lossy();
                    if let Some(kind) = FileKind::classify(&name, &file_name) {
                        files.push((kind, entry.path().to_path_buf()));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    outcome.warn(dir, format!("cannot read component directory: {e}"));
                    return None;
                }
            }
        }

        for (kind, path) in files {
            unit.files.insert(kind);
            match kind {
                FileKind::Implementation if unit.source.is_none() => {
                    if let Some(content) = read_source(&path, outcome) {
                        unit.source = Some(self.extractor.extract(&content));
                    }
                }
                FileKind::Barrel if unit.barrel.is_none() => {
                    if let Some(content) = read_source(&path, outcome) {
                        unit.barrel = Some(self.extractor.extract_barrel(&content));
                    }
                }
                _ => {}
            }
        }

        if !unit.is_structured() {
            tracing::debug!("Unit {} at {} has no implementation file", name, dir.display());
        }
        Some(unit)
    }
}

/// Invalid UTF-8 is replaced rather than rejected so one odd byte keeps the unit checkable
fn read_source(path: &Path, outcome: &mut ScanOutcome) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            outcome.warn(path, format!("cannot read file: {e}"));
            None
        }
    }
}
