//! Lightweight textual extraction for TypeScript/TSX sources
//!
//! No syntax tree is built. Comments are stripped by a quote-aware pass, then
//! imports, exports, props declarations and literal tokens are found with
//! regular expressions, so unusual formatting can produce false positives or
//! negatives.

use crate::domain::unit::{BarrelFacts, SourceFacts};
use crate::domain::violations::{ConformanceError, ConformanceResult};
use regex::Regex;
use std::collections::BTreeSet;

/// Hex, rgb(a) and hsl(a) color values
pub const COLOR_LITERAL_PATTERN: &str =
    r"#(?:[0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3,4})\b|\b(?:rgba?|hsla?)\([^)]*\)";

/// Whether `pattern` matches the whole of `token`
pub fn matches_whole(pattern: &Regex, token: &str) -> bool {
    pattern
        .find(token)
        .is_some_and(|m| m.start() == 0 && m.end() == token.len())
}

/// Compiled extraction patterns
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    import_from: Regex,
    module_reference: Regex,
    export_default: Regex,
    export_declaration: Regex,
    export_list: Regex,
    export_star: Regex,
    export_namespace: Regex,
    props_interface: Regex,
    props_alias: Regex,
    inline_style: Regex,
    string_literal: Regex,
    number_literal: Regex,
    color_literal: Regex,
    theme_access: Regex,
}

impl SourceExtractor {
    /// Build an extractor; `theme_access_pattern` marks expressions whose literals are theme values
    pub fn new(theme_access_pattern: &str) -> ConformanceResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ConformanceError::config(format!("Invalid extraction pattern '{pattern}': {e}"))
            })
        };

        Ok(Self {
            import_from: compile(
                r#"(?s)\bimport\s+(?P<clause>[^;'"]*?)\s+from\s+['"](?P<source>[^'"]+)['"]"#,
            )?,
            module_reference: compile(
                r#"(?:\bfrom|\bimport|\brequire\s*\()\s*['"](?P<source>[^'"]+)['"]"#,
            )?,
            export_default: compile(
                r"\bexport\s+default\b|\bexport\s*\{[^}]*\bdefault\b[^}]*\}",
            )?,
            export_declaration: compile(
                r"\bexport\s+(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:const|let|var|function\*?|class|type|interface|enum)\s+(?P<name>[A-Za-z_$][\w$]*)",
            )?,
            export_list: compile(r"\bexport\s+(?:type\s+)?\{(?P<names>[^}]*)\}")?,
            export_star: compile(r#"\bexport\s+\*\s+from\s+['"](?P<source>[^'"]+)['"]"#)?,
            export_namespace: compile(r"\bexport\s+\*\s+as\s+(?P<name>[A-Za-z_$][\w$]*)")?,
            props_interface: compile(r"\binterface\s+(?P<name>[A-Za-z_$][\w$]*Props)\b")?,
            props_alias: compile(
                r"\btype\s+(?P<name>[A-Za-z_$][\w$]*Props)\s*(?:<[^=]*>)?\s*=",
            )?,
            inline_style: compile(r"\bstyle=\{\{")?,
            string_literal: compile(
                r#"'(?P<single>[^'\\\n]*(?:\\.[^'\\\n]*)*)'|"(?P<double>[^"\\\n]*(?:\\.[^"\\\n]*)*)""#,
            )?,
            number_literal: compile(
                r"(?:^|[^\w$#.])(?P<number>\d+(?:\.\d+)?(?:px|rem|em|vh|vw|ms|s|%)?)\b",
            )?,
            color_literal: compile(COLOR_LITERAL_PATTERN)?,
            theme_access: compile(theme_access_pattern)?,
        })
    }

    /// Extract facts from an implementation file
    pub fn extract(&self, content: &str) -> SourceFacts {
        let code = strip_comments(content);
        let mut facts = SourceFacts {
            line_count: content.lines().count(),
            ..Default::default()
        };

        for capture in self.import_from.captures_iter(&code) {
            let clause = capture.name("clause").map_or("", |m| m.as_str());
            facts.imported_symbols.extend(parse_import_clause(clause));
        }
        for capture in self.module_reference.captures_iter(&code) {
            if let Some(source) = capture.name("source") {
                facts.import_sources.insert(source.as_str().to_string());
            }
        }

        facts.has_default_export = self.export_default.is_match(&code);
        facts.named_exports = self.named_exports(&code);

        facts.props_interfaces = capture_names(&self.props_interface, &code, "name");
        facts.props_type_aliases = capture_names(&self.props_alias, &code, "name");
        facts.inline_styles = self.inline_style.find_iter(&code).count();
        facts.literal_tokens = self.literal_tokens(&code);

        facts
    }

    /// Extract facts from an `index.ts` barrel
    pub fn extract_barrel(&self, content: &str) -> BarrelFacts {
        let code = strip_comments(content);

        BarrelFacts {
            named_reexports: self.named_exports(&code),
            star_reexports: capture_names(&self.export_star, &code, "source"),
            has_default_export: self.export_default.is_match(&code),
        }
    }

    fn named_exports(&self, code: &str) -> BTreeSet<String> {
        let mut names = capture_names(&self.export_declaration, code, "name");
        names.extend(capture_names(&self.export_namespace, code, "name"));

        for capture in self.export_list.captures_iter(code) {
            let list = capture.name("names").map_or("", |m| m.as_str());
            for specifier in list.split(',') {
                let specifier = specifier.trim().trim_start_matches("type ").trim();
                let exported = match specifier.split_once(" as ") {
                    Some((_, alias)) => alias.trim(),
                    None => specifier,
                };
                if !exported.is_empty() && exported != "default" {
                    names.insert(exported.to_string());
                }
            }
        }

        names
    }

    fn literal_tokens(&self, code: &str) -> BTreeSet<String> {
        // Module specifiers and theme lookups are not literals of interest
        let code = self.module_reference.replace_all(code, " ");
        let code = self.theme_access.replace_all(&code, " ");

        let mut tokens = BTreeSet::new();
        for capture in self.string_literal.captures_iter(&code) {
            if let Some(value) = capture.name("single").or_else(|| capture.name("double")) {
                if !value.as_str().is_empty() {
                    tokens.insert(value.as_str().to_string());
                }
            }
        }
        for capture in self.number_literal.captures_iter(&code) {
            if let Some(number) = capture.name("number") {
                tokens.insert(number.as_str().to_string());
            }
        }
        for color in self.color_literal.find_iter(&code) {
            tokens.insert(color.as_str().to_string());
        }

        tokens
    }
}

/// Blank out `//` and `/* */` comments, leaving quoted and template spans intact.
///
/// Block comments keep their newlines. A `//` right after `:` is kept so bare
/// URLs in JSX text survive. Single and double quoted spans end at a newline.
fn strip_comments(content: &str) -> String {
    let mut code = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;
    let mut previous = '\n';

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            code.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    code.push(escaped);
                }
            } else if c == open || (c == '\n' && open != '`') {
                quote = None;
            }
            previous = c;
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('/', Some('*')) => {
                chars.next();
                code.push(' ');
                let mut last = '\0';
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        code.push('\n');
                    }
                    if last == '*' && inner == '/' {
                        break;
                    }
                    last = inner;
                }
                previous = ' ';
            }
            ('/', Some('/')) if previous != ':' => {
                while chars.next_if(|&inner| inner != '\n').is_some() {}
            }
            ('\'' | '"' | '`', _) => {
                quote = Some(c);
                code.push(c);
                previous = c;
            }
            _ => {
                code.push(c);
                previous = c;
            }
        }
    }

    code
}

fn capture_names(regex: &Regex, code: &str, group: &str) -> BTreeSet<String> {
    regex
        .captures_iter(code)
        .filter_map(|c| c.name(group).map(|m| m.as_str().to_string()))
        .collect()
}

/// Local names bound by an import clause such as `React, { useState as useLocal }`
fn parse_import_clause(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let clause = clause.strip_prefix("type ").unwrap_or(clause);
    let mut names = Vec::new();

    let (outside, inside) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{} {}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        _ => (clause.to_string(), None),
    };

    if let Some(inside) = inside {
        for specifier in inside.split(',') {
            let specifier = specifier.trim().trim_start_matches("type ").trim();
            let local = match specifier.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => specifier,
            };
            if !local.is_empty() {
                names.push(local.to_string());
            }
        }
    }

    for part in outside.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('*') {
            Some(rest) => {
                if let Some((_, ns)) = rest.split_once("as") {
                    names.push(ns.trim().to_string());
                }
            }
            None => names.push(part.to_string()),
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SourceExtractor {
        SourceExtractor::new(r"theme(\.[A-Za-z_][A-Za-z0-9_]*|\[[^\]]*\])+").unwrap()
    }

    const BUTTON: &str = r#"import React, { useState as useLocalState, type FC } from 'react';
import {
  Icon,
  Spinner,
} from '../../atoms/Icon';
import * as tokens from '@/design/tokens';
import './Button.css';
// import { Legacy } from '../legacy';

export type ButtonProps = {
  label: string;
  size?: 'sm' | 'lg';
};

/* interface OldProps {} */
export const Button = ({ label }: ButtonProps) => {
  const [busy] = useLocalState(false);
  return <button style={{ padding: 4 }}>{label}</button>;
};
"#;

    #[test]
    fn extracts_imports_across_lines() {
        let facts = extractor().extract(BUTTON);
        let symbols: Vec<_> = facts.imported_symbols.iter().map(String::as_str).collect();
        assert_eq!(symbols, vec!["FC", "Icon", "React", "Spinner", "tokens", "useLocalState"]);
        assert!(facts.import_sources.contains("react"));
        assert!(facts.import_sources.contains("../../atoms/Icon"));
        assert!(facts.import_sources.contains("./Button.css"));
        assert!(!facts.import_sources.contains("../legacy"));
    }

    #[test]
    fn extracts_exports_and_props() {
        let facts = extractor().extract(BUTTON);
        assert!(!facts.has_default_export);
        assert!(facts.named_exports.contains("Button"));
        assert!(facts.named_exports.contains("ButtonProps"));
        assert!(facts.props_type_aliases.contains("ButtonProps"));
        assert!(facts.props_interfaces.is_empty());
        assert_eq!(facts.inline_styles, 1);
        assert_eq!(facts.line_count, BUTTON.lines().count());
    }

    #[test]
    fn detects_default_exports_and_interfaces() {
        let source =
            "interface CardProps { title: string }\nconst Card = () => null;\nexport default Card;\n";
        let facts = extractor().extract(source);
        assert!(facts.has_default_export);
        assert!(facts.props_interfaces.contains("CardProps"));

        let aliased = extractor().extract("const Card = 1;\nexport { Card as default };\n");
        assert!(aliased.has_default_export);
        assert!(aliased.named_exports.is_empty());
    }

    #[test]
    fn literals_inside_theme_access_are_ignored() {
        let source = r#"
const Box = styled.div`
  color: ${({ theme }) => theme.colors['primary']};
  background: #ff00aa;
  border: 1px solid rgba(0, 0, 0, 0.2);
`;
const label = "Save";
"#;
        let facts = extractor().extract(source);
        assert!(facts.literal_tokens.contains("#ff00aa"));
        assert!(facts.literal_tokens.contains("rgba(0, 0, 0, 0.2)"));
        assert!(facts.literal_tokens.contains("Save"));
        assert!(facts.literal_tokens.contains("1px"));
        assert!(!facts.literal_tokens.contains("primary"));

        let color = Regex::new(COLOR_LITERAL_PATTERN).unwrap();
        let colors: Vec<_> = facts
            .literal_tokens
            .iter()
            .filter(|t| matches_whole(&color, t))
            .collect();
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn urls_are_not_mistaken_for_comments() {
        let facts = extractor().extract("const docs = 'https://example.com/ui';\n");
        assert!(facts.literal_tokens.contains("https://example.com/ui"));

        let logo = r##"<img src="//cdn.example.com/logo.svg" color="#ff0000" /> // was #00ff00
const note = `see //docs and ${'#0000ff'}`;
<a>https://example.com</a>
"##;
        let facts = extractor().extract(logo);
        assert!(facts.literal_tokens.contains("//cdn.example.com/logo.svg"));
        assert!(facts.literal_tokens.contains("#ff0000"));
        assert!(facts.literal_tokens.contains("#0000ff"));
        assert!(!facts.literal_tokens.contains("#00ff00"));
    }

    #[test]
    fn comments_are_blanked_outside_quotes() {
        let code = strip_comments("a /* one\ntwo */ b // three\n'it''s // here' c");
        assert_eq!(code, "a  \n b \n'it''s // here' c");
    }

    #[test]
    fn barrel_reexports() {
        let named = extractor().extract_barrel(
            "export { Button } from './Button';\nexport type { ButtonProps } from './Button';\n",
        );
        assert_eq!(named.named_reexports.len(), 2);
        assert!(named.star_reexports.is_empty());
        assert!(!named.has_default_export);

        let star = extractor()
            .extract_barrel("export * from './Button';\nexport { default } from './Button';\n");
        assert!(star.star_reexports.contains("./Button"));
        assert!(star.has_default_export);
        assert!(star.named_reexports.is_empty());
    }

    #[test]
    fn namespace_reexport_counts_as_named() {
        let facts = extractor().extract_barrel("export * as icons from './icons';\n");
        assert!(facts.named_reexports.contains("icons"));
        assert!(facts.star_reexports.is_empty());
    }
}
