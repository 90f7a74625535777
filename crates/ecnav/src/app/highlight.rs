//! Info-level highlighting: which part of a document is a header bracket, a wildcard, a key...

use std::fmt::Write as _;

use serde::Serialize;

use crate::app::pattern::{Element, GlobPattern, Token};
use crate::domain::model::{Document, NodeId, NodeKind, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    RootKeyword,
    Comment,
    HeaderBracket,
    Pattern,
    Wildcard,
    CharClass,
    Variant,
    OptionKey,
    KeyPart,
    Separator,
    Value,
    Error,
}

impl HighlightKind {
    pub fn name(self) -> &'static str {
        match self {
            HighlightKind::RootKeyword => "root_keyword",
            HighlightKind::Comment => "comment",
            HighlightKind::HeaderBracket => "header_bracket",
            HighlightKind::Pattern => "pattern",
            HighlightKind::Wildcard => "wildcard",
            HighlightKind::CharClass => "char_class",
            HighlightKind::Variant => "variant",
            HighlightKind::OptionKey => "option_key",
            HighlightKind::KeyPart => "key_part",
            HighlightKind::Separator => "separator",
            HighlightKind::Value => "value",
            HighlightKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InfoSpan {
    pub range: TextRange,
    pub kind: HighlightKind,
}

/// Classify every meaningful span of `doc`, ordered by position and non-overlapping.
pub fn info_spans(doc: &Document) -> Vec<InfoSpan> {
    let mut spans = Vec::new();
    visit(doc, doc.root(), &mut spans);
    spans.sort_by_key(|span| span.range.start);
    merge_pattern_runs(spans)
}

fn visit(doc: &Document, id: NodeId, out: &mut Vec<InfoSpan>) {
    let range = doc.range(id);
    match doc.kind(id) {
        NodeKind::Comment => push(out, range, HighlightKind::Comment),
        NodeKind::Error => push(out, range, HighlightKind::Error),
        NodeKind::RootKey => push(out, range, HighlightKind::RootKeyword),
        NodeKind::FlatOptionKey => push(out, range, HighlightKind::OptionKey),
        NodeKind::KeyPart => push(out, range, HighlightKind::KeyPart),
        NodeKind::Separator => push(out, range, HighlightKind::Separator),
        NodeKind::OptionValue => push(out, range, HighlightKind::Value),
        NodeKind::QualifiedOptionKey => {
            for (idx, _) in doc.text(id).match_indices('.') {
                let start = range.start + idx;
                push(out, TextRange::new(start, start + 1), HighlightKind::Separator);
            }
            for child in doc.children(id) {
                visit(doc, *child, out);
            }
        }
        NodeKind::Header => {
            push(
                out,
                TextRange::new(range.start, range.start + 1),
                HighlightKind::HeaderBracket,
            );
            push(
                out,
                TextRange::new(range.end - 1, range.end),
                HighlightKind::HeaderBracket,
            );
            for child in doc.children(id) {
                visit(doc, *child, out);
            }
        }
        NodeKind::Pattern => {
            let pattern = GlobPattern::parse(doc.text(id));
            if pattern.source().starts_with('/') {
                push(
                    out,
                    TextRange::new(range.start, range.start + 1),
                    HighlightKind::Pattern,
                );
            }
            pattern_spans(pattern.elements(), range.start, out);
        }
        NodeKind::Document | NodeKind::Section | NodeKind::Option | NodeKind::RootDeclaration => {
            for child in doc.children(id) {
                visit(doc, *child, out);
            }
        }
    }
}

fn push(out: &mut Vec<InfoSpan>, range: TextRange, kind: HighlightKind) {
    if !range.is_empty() {
        out.push(InfoSpan { range, kind });
    }
}

fn pattern_spans(elements: &[Element], base: usize, out: &mut Vec<InfoSpan>) {
    for element in elements {
        let range = element.range.shifted(base);
        let kind = match &element.token {
            Token::Literal(_) => HighlightKind::Pattern,
            Token::Star | Token::DoubleStar | Token::AnyDirs | Token::AnyChar => {
                HighlightKind::Wildcard
            }
            Token::Class(_) => HighlightKind::CharClass,
            Token::NumRange { .. } => HighlightKind::Variant,
            Token::Alternatives { branches, commas } => {
                let mut marks = vec![range.start];
                marks.extend(commas.iter().map(|comma| comma + base));
                marks.push(range.end - 1);
                for mark in marks {
                    out.push(InfoSpan {
                        range: TextRange::new(mark, mark + 1),
                        kind: HighlightKind::Variant,
                    });
                }
                for branch in branches {
                    pattern_spans(branch, base, out);
                }
                continue;
            }
        };
        out.push(InfoSpan { range, kind });
    }
}

/// Join adjacent literal pattern characters into a single span.
fn merge_pattern_runs(spans: Vec<InfoSpan>) -> Vec<InfoSpan> {
    let mut merged: Vec<InfoSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last)
                if last.kind == HighlightKind::Pattern
                    && span.kind == HighlightKind::Pattern
                    && last.range.end == span.range.start =>
            {
                last.range.end = span.range.end;
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// One line per span: `line:column kind "text"`, 1-based positions.
pub fn render_tagged(doc: &Document, spans: &[InfoSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let (line, column) = doc.line_col(span.range.start);
        let text = &doc.source()[span.range.start..span.range.end];
        let _ = writeln!(
            out,
            "{}:{} {} {:?}",
            line + 1,
            column + 1,
            span.kind.name(),
            text
        );
    }
    out
}
