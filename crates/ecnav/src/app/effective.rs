//! Effective options for a concrete file, and the indentation settings derived from them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::app::pattern::{GlobPattern, PatternLimits};
use crate::domain::model::{Document, NodeId};

pub const INDENT_SIZE: &str = "indent_size";
pub const CONTINUATION_INDENT_SIZE: &str = "continuation_indent_size";
pub const TAB_WIDTH: &str = "tab_width";
pub const INDENT_STYLE: &str = "indent_style";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveOption {
    pub value: String,
    /// Option node that supplied the value.
    pub option: NodeId,
}

/// Options applying to one path, keyed by lowercase option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveOptions {
    pub entries: BTreeMap<String, EffectiveOption>,
}

impl EffectiveOptions {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|entry| entry.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect the options of every section matching `path`; later declarations win.
///
/// `path` is relative to the directory containing the document. Sections whose pattern cannot
/// be compiled are skipped.
pub fn effective_options(doc: &Document, path: &str, limits: &PatternLimits) -> EffectiveOptions {
    let path = path.trim_start_matches("./");
    let mut effective = EffectiveOptions::default();

    for section in doc.sections() {
        let Some(header) = doc.section_header(section) else {
            continue;
        };
        let source = doc.header_pattern_text(header);
        let matcher = match GlobPattern::parse(source).to_glob_set(limits) {
            Ok(matcher) => matcher,
            Err(err) => {
                tracing::warn!(pattern = source, error = %err, "section skipped");
                continue;
            }
        };
        if !matcher.is_match(path) {
            continue;
        }

        for option in doc.section_options(section) {
            let (Some(key), Some(value)) = (doc.option_key(option), doc.option_value(option))
            else {
                continue;
            };
            effective.entries.insert(
                doc.text(key).to_ascii_lowercase(),
                EffectiveOption {
                    value: doc.text(value).to_owned(),
                    option,
                },
            );
        }
    }

    tracing::debug!(path, options = effective.entries.len(), "computed effective options");
    effective
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentStyle {
    Tab,
    Space,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndentOptions {
    pub indent_size: Option<u32>,
    pub continuation_indent_size: Option<u32>,
    pub tab_width: Option<u32>,
    pub indent_style: Option<IndentStyle>,
}

/// A recognised option whose value could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidValue {
    pub key: &'static str,
    pub value: String,
}

impl IndentOptions {
    /// Derive indentation settings.
    ///
    /// `indent_size = tab` borrows `tab_width`; the continuation indent falls back to the
    /// indent size; the tab width falls back to the indent size unless that is `tab`.
    pub fn from_effective(options: &EffectiveOptions) -> (Self, Vec<InvalidValue>) {
        let tab_width = options.get(TAB_WIDTH).unwrap_or("");
        let indent_size = options.get(INDENT_SIZE).unwrap_or("");
        let continuation = options.get(CONTINUATION_INDENT_SIZE).unwrap_or("");
        let style = options.get(INDENT_STYLE).unwrap_or("");

        let is_tab = indent_size.eq_ignore_ascii_case("tab");
        let calculated_indent = if is_tab { tab_width } else { indent_size };
        let calculated_continuation = if continuation.is_empty() {
            calculated_indent
        } else {
            continuation
        };
        let calculated_tab_width = match (tab_width.is_empty(), is_tab) {
            (true, true) => "",
            (true, false) => indent_size,
            (false, _) => tab_width,
        };

        let mut invalid = Vec::new();
        let mut indent = IndentOptions {
            indent_size: parse_size(INDENT_SIZE, calculated_indent, &mut invalid),
            continuation_indent_size: parse_size(
                CONTINUATION_INDENT_SIZE,
                calculated_continuation,
                &mut invalid,
            ),
            tab_width: parse_size(TAB_WIDTH, calculated_tab_width, &mut invalid),
            indent_style: None,
        };

        if !style.is_empty() {
            indent.indent_style = match style.to_ascii_lowercase().as_str() {
                "tab" => Some(IndentStyle::Tab),
                "space" => Some(IndentStyle::Space),
                _ => {
                    report(INDENT_STYLE, style, &mut invalid);
                    None
                }
            };
        }
        (indent, invalid)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_size(key: &'static str, value: &str, invalid: &mut Vec<InvalidValue>) -> Option<u32> {
    if value.is_empty() {
        return None;
    }
    match value.parse::<u32>() {
        Ok(size) => Some(size),
        Err(_) => {
            report(key, value, invalid);
            None
        }
    }
}

fn report(key: &'static str, value: &str, invalid: &mut Vec<InvalidValue>) {
    tracing::warn!(key, value, "invalid editorconfig value");
    invalid.push(InvalidValue {
        key,
        value: value.to_owned(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::parse::parse;

    fn options_for(source: &str, path: &str) -> EffectiveOptions {
        effective_options(&parse(source), path, &PatternLimits::default())
    }

    #[test]
    fn later_sections_override_earlier_ones() {
        let source = "[*]\nindent_size = 2\ncharset = utf-8\n[*.py]\nINDENT_SIZE = 4\n";
        let py = options_for(source, "pkg/main.py");
        assert_eq!(py.get("indent_size"), Some("4"));
        assert_eq!(py.get("charset"), Some("utf-8"));

        let md = options_for(source, "README.md");
        assert_eq!(md.get("indent_size"), Some("2"));
    }

    #[test]
    fn anchored_sections_apply_relative_to_document() {
        let source = "[/docs/*.md]\nmax_line_length = 80\n";
        assert_eq!(
            options_for(source, "docs/intro.md").get("max_line_length"),
            Some("80")
        );
        assert!(options_for(source, "src/docs/intro.md").is_empty());
        assert!(options_for(source, "./docs/intro.md").get("max_line_length").is_some());
    }

    #[test]
    fn indent_size_tab_uses_tab_width() {
        let source = "[*]\nindent_style = tab\nindent_size = tab\ntab_width = 8\n";
        let (indent, invalid) = IndentOptions::from_effective(&options_for(source, "a.c"));
        assert!(invalid.is_empty());
        assert_eq!(indent.indent_size, Some(8));
        assert_eq!(indent.continuation_indent_size, Some(8));
        assert_eq!(indent.tab_width, Some(8));
        assert_eq!(indent.indent_style, Some(IndentStyle::Tab));
    }

    #[test]
    fn tab_width_defaults_to_indent_size() {
        let source = "[*]\nindent_size = 3\ncontinuation_indent_size = 6\n";
        let (indent, _) = IndentOptions::from_effective(&options_for(source, "a.c"));
        assert_eq!(indent.indent_size, Some(3));
        assert_eq!(indent.continuation_indent_size, Some(6));
        assert_eq!(indent.tab_width, Some(3));
        assert_eq!(indent.indent_style, None);
    }

    #[test]
    fn indent_size_tab_without_tab_width_sets_nothing() {
        let source = "[*]\nindent_size = tab\n";
        let (indent, invalid) = IndentOptions::from_effective(&options_for(source, "a.c"));
        assert!(indent.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn invalid_values_are_reported() {
        let source = "[*]\nindent_size = wide\nindent_style = tabs\n";
        let (indent, invalid) = IndentOptions::from_effective(&options_for(source, "a.c"));
        assert_eq!(indent.indent_size, None);
        let keys: Vec<_> = invalid.iter().map(|entry| entry.key).collect();
        assert_eq!(
            keys,
            vec![INDENT_SIZE, CONTINUATION_INDENT_SIZE, TAB_WIDTH, INDENT_STYLE]
        );
    }
}
