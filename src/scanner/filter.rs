//! Directory exclusion using glob patterns
//!
//! Architectural Principle: Service Layer - DirFilter owns the rules for skipping directories
//! - Patterns without a slash match the directory name (`__tests__`, `.*`)
//! - Patterns with a slash match the path relative to the checked root
//! - Excluded directories are never descended into

use crate::domain::violations::{ConformanceError, ConformanceResult};
use std::path::Path;

/// Decides which directories the scanner must not visit
#[derive(Debug, Clone, Default)]
pub struct DirFilter {
    patterns: Vec<FilterPattern>,
}

#[derive(Debug, Clone)]
struct FilterPattern {
    pattern: glob::Pattern,
    /// Original pattern string, used to pick the matching strategy
    original: String,
}

impl DirFilter {
    /// Create a filter from exclusion patterns
    pub fn new<I, S>(patterns: I) -> ConformanceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for pattern in patterns {
            filter.add_pattern(pattern)?;
        }
        Ok(filter)
    }

    /// Add an exclusion pattern
    pub fn add_pattern(&mut self, pattern: impl Into<String>) -> ConformanceResult<()> {
        let original = pattern.into();
        let trimmed = original.trim_end_matches('/');
        let glob_pattern = glob::Pattern::new(trimmed).map_err(|e| {
            ConformanceError::config(format!("Invalid exclude pattern '{original}': {e}"))
        })?;

        self.patterns.push(FilterPattern {
            pattern: glob_pattern,
            original: trimmed.to_string(),
        });
        Ok(())
    }

    /// Whether the directory at `relative` (relative to the checked root) is excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.patterns.iter().any(|pattern| pattern_matches_path(pattern, relative))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn pattern_matches_path(pattern: &FilterPattern, path: &Path) -> bool {
    if pattern.original.contains('/') {
        let normalized = path.to_string_lossy().replace('\\', "/");
        let normalized = normalized.trim_start_matches("./");
        let anchored = pattern.original.trim_start_matches('/');
        return glob::Pattern::new(anchored)
            .map(|p| p.matches(normalized))
            .unwrap_or(false);
    }

    path.file_name()
        .map(|name| pattern.pattern.matches(&name.to_string_lossy()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn default_filter() -> DirFilter {
        DirFilter::new(["__tests__", "node_modules", ".*", "src/components/legacy/**"]).unwrap()
    }

    #[rstest]
    #[case("src/components/atoms/__tests__", true)]
    #[case("src/components/atoms/.storybook", true)]
    #[case("node_modules", true)]
    #[case("src/components/legacy/OldButton", true)]
    #[case("src/components/atoms/Button", false)]
    #[case("src/hooks/useToggle", false)]
    fn excludes_by_name_or_relative_path(#[case] path: &str, #[case] excluded: bool) {
        assert_eq!(default_filter().is_excluded(Path::new(path)), excluded);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let filter = DirFilter::new(["dist/"]).unwrap();
        assert!(filter.is_excluded(Path::new("packages/ui/dist")));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(DirFilter::new(["[invalid"]).is_err());
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let filter = DirFilter::new(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert!(!filter.is_excluded(Path::new("anything")));
    }
}
