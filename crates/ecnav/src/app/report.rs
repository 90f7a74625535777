//! Rendering navigation and option results for the command line.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::app::effective::{EffectiveOptions, IndentOptions, InvalidValue};
use crate::app::navigate::{GotoResult, TargetKind};
use crate::domain::model::{Document, NodeId, NodeKind};
use crate::infra::config::Config;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable listing.
    Text,
    /// Machine-readable JSON document.
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }

    /// Format configured in `[defaults]`, falling back to text.
    pub fn from_config(config: &Config) -> Self {
        config.defaults.format().parse().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using text output");
            OutputFormat::Text
        })
    }
}

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(OutputFormatParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when parsing an [`OutputFormat`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OutputFormatParseError {
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),
}

/// A declaration as shown to the user: 1-based position, its text, and its section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationView {
    pub line: usize,
    pub column: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl DeclarationView {
    pub fn new(doc: &Document, node: NodeId) -> Self {
        let (line, column) = doc.line_col(doc.range(node).start);
        let section = doc
            .enclosing(node, &[NodeKind::Section])
            .and_then(|section| doc.section_header(section))
            .filter(|header| *header != node)
            .map(|header| doc.text(header).to_owned());
        Self {
            line: line + 1,
            column: column + 1,
            text: doc.text(node).to_owned(),
            section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GotoReport {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TargetKind>,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DeclarationView>,
    pub targets: Vec<DeclarationView>,
}

impl GotoReport {
    pub fn new(doc: &Document, result: &GotoResult) -> Self {
        let source = result.source();
        match result {
            GotoResult::NoTarget => Self {
                outcome: "no_target",
                kind: None,
                title: source.chooser_title(),
                message: Some(source.not_found_message()),
                source: None,
                targets: Vec::new(),
            },
            GotoResult::Targets {
                kind,
                source: node,
                targets,
            } => Self {
                outcome: "targets",
                kind: Some(*kind),
                title: source.chooser_title(),
                message: targets.is_empty().then(|| source.not_found_message()),
                source: Some(DeclarationView::new(doc, *node)),
                targets: targets
                    .iter()
                    .map(|target| DeclarationView::new(doc, *target))
                    .collect(),
            },
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("failed to serialize navigation report")
            }
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(source) = &self.source {
            let _ = writeln!(out, "{}:{} {}", source.line, source.column, source.text);
        }
        if let Some(message) = self.message {
            let _ = writeln!(out, "{message}");
            return out;
        }
        let _ = writeln!(out, "{}:", self.title);
        for target in &self.targets {
            let _ = write!(out, "  {}:{} {}", target.line, target.column, target.text);
            if let Some(section) = &target.section {
                let _ = write!(out, " in {section}");
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionsReport {
    pub path: String,
    pub options: Vec<OptionView>,
    pub indent: IndentOptions,
    pub invalid: Vec<InvalidValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub key: String,
    pub value: String,
    pub declared_at: DeclarationView,
}

impl OptionsReport {
    pub fn new(doc: &Document, path: &str, effective: &EffectiveOptions) -> Self {
        let (indent, invalid) = IndentOptions::from_effective(effective);
        Self {
            path: path.to_owned(),
            options: effective
                .entries
                .iter()
                .map(|(key, entry)| OptionView {
                    key: key.clone(),
                    value: entry.value.clone(),
                    declared_at: DeclarationView::new(doc, entry.option),
                })
                .collect(),
            indent,
            invalid,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("failed to serialize options report")
            }
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        if self.options.is_empty() {
            let _ = writeln!(out, "No sections match {}", self.path);
            return out;
        }
        for option in &self.options {
            let _ = writeln!(
                out,
                "{} = {}  ({}:{})",
                option.key, option.value, option.declared_at.line, option.declared_at.column
            );
        }
        for invalid in &self.invalid {
            let _ = writeln!(out, "invalid {}: {}", invalid.key, invalid.value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::effective::effective_options;
    use crate::app::navigate::{ResolveOptions, goto_super};
    use crate::app::parse::parse;
    use crate::app::pattern::PatternLimits;

    #[test]
    fn parses_format_aliases() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("plain".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::from_config(&Config::default()), OutputFormat::Text);
    }

    #[test]
    fn text_report_lists_targets_with_sections() {
        let source = "[*]\na = 1\n[*.py]\na = 2\n";
        let doc = parse(source);
        let offset = source.find("a = 2").expect("key");
        let result = goto_super(&doc, offset, &ResolveOptions::default());
        let report = GotoReport::new(&doc, &result);
        assert_eq!(
            report.render(OutputFormat::Text).expect("render"),
            "4:1 a\nSelect overridden option:\n  2:1 a = 1 in [*]\n"
        );
    }

    #[test]
    fn empty_results_use_not_found_message() {
        let doc = parse("[*]\n");
        let result = goto_super(&doc, 1, &ResolveOptions::default());
        let report = GotoReport::new(&doc, &result);
        assert_eq!(report.message, Some("No supercase header found"));
        assert_eq!(
            report.render(OutputFormat::Text).expect("render"),
            "1:1 [*]\nNo supercase header found\n"
        );
    }

    #[test]
    fn json_report_for_no_target() {
        let doc = parse("# only a comment\n");
        let result = goto_super(&doc, 3, &ResolveOptions::default());
        let json = GotoReport::new(&doc, &result)
            .render(OutputFormat::Json)
            .expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["outcome"], "no_target");
        assert_eq!(value["message"], "No parent found");
        assert!(value.get("source").is_none());
    }

    #[test]
    fn options_report_includes_indent_settings() {
        let source = "[*]\nindent_size = 2\n[*.py]\nindent_size = 4\nindent_style = tab\n";
        let doc = parse(source);
        let effective = effective_options(&doc, "a.py", &PatternLimits::default());
        let report = OptionsReport::new(&doc, "a.py", &effective);
        assert_eq!(report.indent.indent_size, Some(4));
        assert_eq!(
            report.render(OutputFormat::Text).expect("render"),
            "indent_size = 4  (4:1)\nindent_style = tab  (5:1)\n"
        );
    }
}
