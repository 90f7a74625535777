//! Line-oriented parser for `.editorconfig` sources.
//!
//! The parser never fails: lines it cannot make sense of become [`NodeKind::Error`] nodes and a
//! [`ParseDiagnostic`](crate::domain::model::ParseDiagnostic) is recorded, so every consumer
//! receives a walkable tree.

use crate::domain::model::{Document, DocumentBuilder, NodeId, NodeKind, TextRange};

const ROOT_KEY: &str = "root";

/// Parse `source` into a [`Document`].
pub fn parse(source: &str) -> Document {
    let mut builder = DocumentBuilder::new(source);
    let root = builder.root();
    let mut section: Option<NodeId> = None;

    let mut line_start = 0usize;
    for raw_line in source.split_inclusive('\n') {
        let line_end = line_start + raw_line.len();
        let content = raw_line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            let start = line_start + (content.len() - content.trim_start().len());
            let range = TextRange::new(start, start + trimmed.len());
            section = parse_line(&mut builder, root, section, trimmed, range);
        }
        line_start = line_end;
    }

    let document = builder.finish();
    tracing::debug!(
        sections = document.sections().count(),
        diagnostics = document.diagnostics().len(),
        "parsed editorconfig document"
    );
    document
}

/// Parse one non-blank line, returning the section that owns subsequent lines.
fn parse_line(
    builder: &mut DocumentBuilder,
    root: NodeId,
    section: Option<NodeId>,
    line: &str,
    range: TextRange,
) -> Option<NodeId> {
    let owner = section.unwrap_or(root);

    if line.starts_with('#') || line.starts_with(';') {
        builder.push(NodeKind::Comment, range, owner);
        grow(builder, section, range.end);
        return section;
    }

    if line.starts_with('[') {
        return parse_header(builder, root, section, line, range);
    }

    if let Some(eq) = line.find('=') {
        parse_assignment(builder, root, section, line, range, eq);
        return section;
    }

    builder.push(NodeKind::Error, range, owner);
    builder.diagnostic(range, "expected a section header or `key = value`");
    grow(builder, section, range.end);
    section
}

fn parse_header(
    builder: &mut DocumentBuilder,
    root: NodeId,
    previous: Option<NodeId>,
    line: &str,
    range: TextRange,
) -> Option<NodeId> {
    let Some(close) = header_close(line) else {
        builder.push(NodeKind::Error, range, previous.unwrap_or(root));
        builder.diagnostic(range, "unterminated section header");
        grow(builder, previous, range.end);
        return previous;
    };

    let header_end = range.start + close + 1;
    let section = builder.push(
        NodeKind::Section,
        TextRange::new(range.start, header_end),
        root,
    );
    let header = builder.push(
        NodeKind::Header,
        TextRange::new(range.start, header_end),
        section,
    );
    builder.push(
        NodeKind::Pattern,
        TextRange::new(range.start + 1, range.start + close),
        header,
    );

    let rest = &line[close + 1..];
    let trailing = rest.trim_start();
    if trailing.starts_with(['#', ';']) {
        let comment_start = header_end + (rest.len() - trailing.len());
        builder.push(
            NodeKind::Comment,
            TextRange::new(comment_start, range.end),
            section,
        );
        builder.extend_to(section, range.end);
    } else if !trailing.is_empty() {
        builder.diagnostic(
            TextRange::new(header_end, range.end),
            "unexpected text after section header",
        );
    }
    Some(section)
}

/// Byte index of the `]` closing a header line.
///
/// The first unescaped `]` followed only by whitespace or a comment wins, so brackets inside a
/// trailing comment stay out of the pattern. Otherwise the last `]` closes the header.
fn header_close(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    line.match_indices(']')
        .map(|(idx, _)| idx)
        .filter(|&idx| idx > 0 && bytes[idx - 1] != b'\\')
        .find(|&idx| {
            let rest = line[idx + 1..].trim_start();
            rest.is_empty() || rest.starts_with(['#', ';'])
        })
        .or_else(|| line.rfind(']'))
}

fn parse_assignment(
    builder: &mut DocumentBuilder,
    root: NodeId,
    section: Option<NodeId>,
    line: &str,
    range: TextRange,
    eq: usize,
) {
    let owner = section.unwrap_or(root);
    let raw_key = &line[..eq];
    let key = raw_key.trim_end();
    if key.is_empty() {
        builder.push(NodeKind::Error, range, owner);
        builder.diagnostic(range, "option is missing a key");
        grow(builder, section, range.end);
        return;
    }

    let key_range = TextRange::new(range.start, range.start + key.len());
    let eq_range = TextRange::new(range.start + eq, range.start + eq + 1);
    let raw_value = &line[eq + 1..];
    let value = raw_value.trim_start();
    let value_start = eq_range.end + (raw_value.len() - value.len());
    let value_range = TextRange::new(value_start, value_start + value.len());

    let is_root = section.is_none() && key.eq_ignore_ascii_case(ROOT_KEY);
    let (kind, key_kind) = if is_root {
        (NodeKind::RootDeclaration, NodeKind::RootKey)
    } else if key.contains('.') {
        (NodeKind::Option, NodeKind::QualifiedOptionKey)
    } else {
        (NodeKind::Option, NodeKind::FlatOptionKey)
    };

    let option = builder.push(kind, range, owner);
    let key_node = builder.push(key_kind, key_range, option);
    if key_kind == NodeKind::QualifiedOptionKey {
        let mut part_start = key_range.start;
        for part in key.split('.') {
            if !part.is_empty() {
                builder.push(
                    NodeKind::KeyPart,
                    TextRange::new(part_start, part_start + part.len()),
                    key_node,
                );
            }
            part_start += part.len() + 1;
        }
    }
    builder.push(NodeKind::Separator, eq_range, option);
    if !value_range.is_empty() {
        builder.push(NodeKind::OptionValue, value_range, option);
    } else {
        builder.diagnostic(range, format!("option `{key}` has no value"));
    }

    if is_root && !matches!(value.to_ascii_lowercase().as_str(), "true" | "false") {
        builder.diagnostic(value_range, "`root` expects `true` or `false`");
    }

    grow(builder, section, range.end);
}

fn grow(builder: &mut DocumentBuilder, section: Option<NodeId>, end: usize) {
    if let Some(section) = section {
        builder.extend_to(section, end);
    }
}
