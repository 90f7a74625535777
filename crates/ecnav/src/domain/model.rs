//! Syntax tree for parsed `.editorconfig` documents.
//!
//! Nodes live in a flat arena owned by [`Document`] and refer to each other through [`NodeId`]
//! indices. Every node records its parent, so lookups such as "enclosing section of this key"
//! are plain upward walks.

use serde::Serialize;

use crate::domain::errors::DomainError;

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Half-open byte range into the document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Shift a range expressed relative to `base` into absolute coordinates.
    pub fn shifted(&self, base: usize) -> Self {
        Self::new(self.start + base, self.end + base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    /// `root = true` ahead of the first section.
    RootDeclaration,
    RootKey,
    Comment,
    Section,
    /// Bracketed `[pattern]`, brackets included.
    Header,
    /// Pattern text between the header brackets.
    Pattern,
    Option,
    FlatOptionKey,
    /// Dotted key such as `resharper.csharp.indent`.
    QualifiedOptionKey,
    KeyPart,
    Separator,
    OptionValue,
    Error,
}

impl NodeKind {
    /// Composite kinds never sit directly under the cursor; leaves and headers do.
    fn is_composite(self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Section
                | NodeKind::Option
                | NodeKind::RootDeclaration
                | NodeKind::QualifiedOptionKey
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Recoverable problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub range: TextRange,
    pub message: String,
}

/// Immutable parse of a single `.editorconfig` source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
    diagnostics: Vec<ParseDiagnostic>,
}

impl Document {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.node(id).range
    }

    pub fn text(&self, id: NodeId) -> &str {
        let range = self.range(id);
        &self.source[range.start..range.end]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// The node itself followed by each of its parents up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| self.parent(*current))
    }

    /// Closest node (starting with `id` itself) whose kind is one of `kinds`.
    pub fn enclosing(&self, id: NodeId, kinds: &[NodeKind]) -> Option<NodeId> {
        self.ancestors(id).find(|node| kinds.contains(&self.kind(*node)))
    }

    fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    /// Sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(self.root())
            .iter()
            .copied()
            .filter(|id| self.kind(*id) == NodeKind::Section)
    }

    /// Headers in document order.
    pub fn headers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sections().filter_map(|section| self.section_header(section))
    }

    pub fn section_header(&self, section: NodeId) -> Option<NodeId> {
        self.child_of_kind(section, NodeKind::Header)
    }

    pub fn section_options(&self, section: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(section)
            .iter()
            .copied()
            .filter(|id| self.kind(*id) == NodeKind::Option)
    }

    pub fn header_pattern(&self, header: NodeId) -> Option<NodeId> {
        self.child_of_kind(header, NodeKind::Pattern)
    }

    /// Raw glob text of a header, without brackets.
    pub fn header_pattern_text(&self, header: NodeId) -> &str {
        self.header_pattern(header)
            .map(|pattern| self.text(pattern))
            .unwrap_or("")
    }

    pub fn option_key(&self, option: NodeId) -> Option<NodeId> {
        self.children(option).iter().copied().find(|child| {
            matches!(
                self.kind(*child),
                NodeKind::FlatOptionKey | NodeKind::QualifiedOptionKey
            )
        })
    }

    pub fn option_value(&self, option: NodeId) -> Option<NodeId> {
        self.child_of_kind(option, NodeKind::OptionValue)
    }

    /// Flat key name of an option, if its key is not qualified.
    pub fn flat_key_name(&self, option: NodeId) -> Option<&str> {
        self.option_key(option)
            .filter(|key| self.kind(*key) == NodeKind::FlatOptionKey)
            .map(|key| self.text(key))
    }

    /// Deepest node covering `offset`.
    ///
    /// When the offset lands on a composite node (whitespace between tokens, or just past the
    /// end of a token), the character before the cursor is tried as well so a caret placed right
    /// after a key still resolves to that key.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        let found = self.descend(offset);
        let composite = found.is_none_or(|id| self.kind(id).is_composite());
        if composite && offset > 0 {
            if let Some(previous) = self.descend(offset - 1) {
                if !self.kind(previous).is_composite() {
                    return Some(previous);
                }
            }
        }
        found
    }

    fn descend(&self, offset: usize) -> Option<NodeId> {
        let root = self.root();
        if !self.range(root).contains(offset) {
            return None;
        }
        let mut current = root;
        while let Some(child) = self
            .children(current)
            .iter()
            .copied()
            .find(|child| self.range(*child).contains(offset))
        {
            current = child;
        }
        Some(current)
    }

    /// Zero-based (line, column) of a byte offset; the column counts characters.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let before = &self.source[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        (line, before[line_start..].chars().count())
    }

    /// Byte offset of a 1-based line and column.
    pub fn offset_at(&self, line: usize, column: usize) -> Result<usize, DomainError> {
        let invalid = DomainError::InvalidPosition { line, column };
        if line == 0 || column == 0 {
            return Err(invalid);
        }
        let mut line_start = 0usize;
        for _ in 1..line {
            match self.source[line_start..].find('\n') {
                Some(idx) => line_start += idx + 1,
                None => return Err(invalid),
            }
        }
        let line_end = self.source[line_start..]
            .find('\n')
            .map_or(self.source.len(), |idx| line_start + idx);
        let text = &self.source[line_start..line_end];
        let char_count = text.chars().count();
        if column > char_count + 1 {
            return Err(invalid);
        }
        let within = text
            .char_indices()
            .nth(column - 1)
            .map_or(text.len(), |(idx, _)| idx);
        Ok(line_start + within)
    }

    /// Validate a raw byte offset against the source.
    pub fn check_offset(&self, offset: usize) -> Result<usize, DomainError> {
        if offset > self.source.len() || !self.source.is_char_boundary(offset) {
            return Err(DomainError::OffsetOutOfRange {
                offset,
                len: self.source.len(),
            });
        }
        Ok(offset)
    }
}

/// Arena builder used by the parser.
#[derive(Debug)]
pub(crate) struct DocumentBuilder {
    source: String,
    nodes: Vec<Node>,
    diagnostics: Vec<ParseDiagnostic>,
}

impl DocumentBuilder {
    pub(crate) fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = Node {
            kind: NodeKind::Document,
            range: TextRange::new(0, source.len()),
            parent: None,
            children: Vec::new(),
        };
        Self {
            source,
            nodes: vec![root],
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub(crate) fn push(&mut self, kind: NodeKind, range: TextRange, parent: NodeId) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node {
            kind,
            range,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Grow a node so that it ends at `end`.
    pub(crate) fn extend_to(&mut self, id: NodeId, end: usize) {
        let node = &mut self.nodes[id.index()];
        node.range.end = node.range.end.max(end);
    }

    pub(crate) fn diagnostic(&mut self, range: TextRange, message: impl Into<String>) {
        self.diagnostics.push(ParseDiagnostic {
            range,
            message: message.into(),
        });
    }

    pub(crate) fn finish(self) -> Document {
        Document {
            source: self.source,
            nodes: self.nodes,
            diagnostics: self.diagnostics,
        }
    }
}
