//! "Go to super" navigation.
//!
//! A navigation request starts from a cursor offset. The cursor is classified as sitting in a
//! section header, in a flat option key, or in neither ([`Source`]). Headers resolve to every
//! other header whose pattern covers at least the same files; option keys resolve to the
//! same-named options they override in earlier, strictly broader sections.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;

use crate::app::containment::{Automaton, is_superset};
use crate::app::pattern::{GlobPattern, PatternLimits};
use crate::domain::model::{Document, NodeId, NodeKind};
use crate::infra::config::Config;

/// Knobs for pattern compilation and containment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub limits: PatternLimits,
    /// Upper bound on product states explored by a single containment check.
    pub max_states: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            limits: PatternLimits::default(),
            max_states: 10_000,
        }
    }
}

impl ResolveOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: PatternLimits {
                max_range_expansion: config.resolve.max_range_expansion(),
                max_glob_expansion: config.resolve.max_glob_expansion(),
            },
            max_states: config.resolve.max_states(),
        }
    }
}

/// What the cursor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Source {
    Header(NodeId),
    FlatOptionKey(NodeId),
    Other,
}

/// Kind of a successfully classified source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Header,
    FlatOptionKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GotoResult {
    NoTarget,
    Targets {
        kind: TargetKind,
        source: NodeId,
        targets: Vec<NodeId>,
    },
}

impl GotoResult {
    /// Classified cursor position the result was resolved from.
    pub fn source(&self) -> Source {
        match self {
            GotoResult::NoTarget => Source::Other,
            GotoResult::Targets {
                kind: TargetKind::Header,
                source,
                ..
            } => Source::Header(*source),
            GotoResult::Targets {
                kind: TargetKind::FlatOptionKey,
                source,
                ..
            } => Source::FlatOptionKey(*source),
        }
    }
}

impl Source {
    /// Walk up from the node under `offset` to the closest header or flat option key.
    pub fn classify(doc: &Document, offset: usize) -> Self {
        let Some(leaf) = doc.node_at(offset) else {
            return Source::Other;
        };
        match doc.enclosing(leaf, &[NodeKind::Header, NodeKind::FlatOptionKey]) {
            Some(node) => match doc.kind(node) {
                NodeKind::Header => Source::Header(node),
                _ => Source::FlatOptionKey(node),
            },
            None => Source::Other,
        }
    }

    pub fn chooser_title(&self) -> &'static str {
        match self {
            Source::Header(_) => "Select supercase header",
            Source::FlatOptionKey(_) => "Select overridden option",
            Source::Other => "Select parent",
        }
    }

    pub fn not_found_message(&self) -> &'static str {
        match self {
            Source::Header(_) => "No supercase header found",
            Source::FlatOptionKey(_) => "No overridden option found",
            Source::Other => "No parent found",
        }
    }

    pub fn find_targets(&self, doc: &Document, options: &ResolveOptions) -> Vec<NodeId> {
        match self {
            Source::Header(header) => resolve_overriding_headers(doc, *header, options),
            Source::FlatOptionKey(key) => resolve_overridden_options(doc, *key, options),
            Source::Other => Vec::new(),
        }
    }
}

/// Resolve the super targets for the cursor at `offset`.
pub fn goto_super(doc: &Document, offset: usize, options: &ResolveOptions) -> GotoResult {
    let source = Source::classify(doc, offset);
    let targets = source.find_targets(doc, options);
    match source {
        Source::Header(node) => GotoResult::Targets {
            kind: TargetKind::Header,
            source: node,
            targets,
        },
        Source::FlatOptionKey(node) => GotoResult::Targets {
            kind: TargetKind::FlatOptionKey,
            source: node,
            targets,
        },
        Source::Other => GotoResult::NoTarget,
    }
}

/// Headers whose patterns match every file `header` matches, in document order.
pub fn resolve_overriding_headers(
    doc: &Document,
    header: NodeId,
    options: &ResolveOptions,
) -> Vec<NodeId> {
    let mut scope = HeaderScope::new(doc, options);
    let Some(target) = scope.index_of_header(header) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for candidate in 0..scope.headers.len() {
        if candidate != target && scope.contains(candidate, target) {
            found.push(scope.headers[candidate].header);
        }
    }
    tracing::debug!(
        pattern = doc.header_pattern_text(header),
        found = found.len(),
        "resolved overriding headers"
    );
    found
}

/// Options named like `key` in earlier sections with strictly broader patterns.
///
/// Candidates whose section is covered by another candidate's section come first; remaining
/// ties go to the later declaration.
pub fn resolve_overridden_options(
    doc: &Document,
    key: NodeId,
    options: &ResolveOptions,
) -> Vec<NodeId> {
    let Some(option) = doc.parent(key).filter(|id| doc.kind(*id) == NodeKind::Option) else {
        return Vec::new();
    };
    let Some(section) = doc.enclosing(option, &[NodeKind::Section]) else {
        return Vec::new();
    };
    let name = doc.text(key);

    let mut scope = HeaderScope::new(doc, options);
    let Some(own) = scope.index_of_section(section) else {
        return Vec::new();
    };

    let broader: Vec<usize> = (0..own)
        .filter(|&candidate| scope.strictly_contains(candidate, own))
        .collect();

    let mut found: Vec<(usize, NodeId)> = Vec::new();
    for &candidate in &broader {
        for other in doc.section_options(scope.headers[candidate].section) {
            if doc
                .flat_key_name(other)
                .is_some_and(|other_name| other_name.eq_ignore_ascii_case(name))
            {
                found.push((candidate, other));
            }
        }
    }

    // How many other candidate sections each candidate strictly covers; narrower sets cover
    // fewer, so sorting by it ascending puts the most specific parent first.
    let mut covered: HashMap<usize, usize> = HashMap::new();
    for &candidate in &broader {
        let mut count = 0;
        for &other in &broader {
            if other != candidate && scope.strictly_contains(candidate, other) {
                count += 1;
            }
        }
        covered.insert(candidate, count);
    }

    found.sort_by_key(|&(candidate, option)| {
        (
            covered.get(&candidate).copied().unwrap_or(0),
            Reverse(doc.range(option).start),
        )
    });

    tracing::debug!(
        key = name,
        candidates = broader.len(),
        found = found.len(),
        "resolved overridden options"
    );
    found.into_iter().map(|(_, option)| option).collect()
}

struct CompiledHeader {
    header: NodeId,
    section: NodeId,
    automaton: Option<Automaton>,
}

/// Headers of one document compiled once per request, with memoised containment answers.
struct HeaderScope {
    headers: Vec<CompiledHeader>,
    max_states: usize,
    memo: HashMap<(usize, usize), bool>,
}

impl HeaderScope {
    fn new(doc: &Document, options: &ResolveOptions) -> Self {
        let headers = doc
            .sections()
            .filter_map(|section| {
                let header = doc.section_header(section)?;
                let source = doc.header_pattern_text(header);
                let automaton = match Automaton::compile(&GlobPattern::parse(source), &options.limits)
                {
                    Ok(automaton) => Some(automaton),
                    Err(err) => {
                        tracing::debug!(pattern = source, error = %err, "header excluded from resolution");
                        None
                    }
                };
                Some(CompiledHeader {
                    header,
                    section,
                    automaton,
                })
            })
            .collect();
        Self {
            headers,
            max_states: options.max_states,
            memo: HashMap::new(),
        }
    }

    fn index_of_header(&self, header: NodeId) -> Option<usize> {
        self.headers.iter().position(|entry| entry.header == header)
    }

    fn index_of_section(&self, section: NodeId) -> Option<usize> {
        self.headers.iter().position(|entry| entry.section == section)
    }

    /// Whether header `outer` matches every path header `inner` matches.
    fn contains(&mut self, outer: usize, inner: usize) -> bool {
        if let Some(answer) = self.memo.get(&(outer, inner)) {
            return *answer;
        }
        let answer = match (&self.headers[outer].automaton, &self.headers[inner].automaton) {
            (Some(outer_automaton), Some(inner_automaton)) => {
                match is_superset(outer_automaton, inner_automaton, self.max_states) {
                    Ok(answer) => answer,
                    Err(err) => {
                        tracing::debug!(outer, inner, error = %err, "containment check abandoned");
                        false
                    }
                }
            }
            _ => false,
        };
        self.memo.insert((outer, inner), answer);
        answer
    }

    fn strictly_contains(&mut self, outer: usize, inner: usize) -> bool {
        self.contains(outer, inner) && !self.contains(inner, outer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::parse::parse;

    fn offset_of(source: &str, needle: &str) -> usize {
        source.find(needle).expect("needle present")
    }

    fn texts(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|id| doc.text(*id).to_owned()).collect()
    }

    fn targets(doc: &Document, offset: usize) -> (TargetKind, Vec<String>) {
        match goto_super(doc, offset, &ResolveOptions::default()) {
            GotoResult::Targets { kind, targets, .. } => (kind, texts(doc, &targets)),
            GotoResult::NoTarget => panic!("expected targets at {offset}"),
        }
    }

    #[test]
    fn option_resolves_to_broader_section() {
        let source = "[*]\na = 1\n[*.py]\na = 2\n";
        let doc = parse(source);
        let (kind, found) = targets(&doc, offset_of(source, "a = 2"));
        assert_eq!(kind, TargetKind::FlatOptionKey);
        assert_eq!(found, vec!["a = 1"]);
    }

    #[test]
    fn header_resolves_to_broader_headers() {
        let source = "[*]\na = 1\n[*.py]\na = 2\n";
        let doc = parse(source);
        let (kind, found) = targets(&doc, offset_of(source, "*.py"));
        assert_eq!(kind, TargetKind::Header);
        assert_eq!(found, vec!["[*]"]);

        let (_, found) = targets(&doc, 0);
        assert!(found.is_empty());
    }

    #[test]
    fn options_are_ordered_narrowest_first() {
        let source = "[*]\nb = 1\n[{*.py,*.txt}]\nb = 2\n[*.py]\nb = 3\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, offset_of(source, "b = 3"));
        assert_eq!(found, vec!["b = 2", "b = 1"]);
    }

    #[test]
    fn equally_specific_parents_prefer_later_declarations() {
        let source = "[*.{py,rs}]\nc = 1\n[{*.py,*.md}]\nc = 2\n[*.py]\nc = 3\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, offset_of(source, "c = 3"));
        assert_eq!(found, vec!["c = 2", "c = 1"]);
    }

    #[test]
    fn header_results_keep_document_order_and_include_later_headers() {
        let source = "[*.py]\n[*]\n[{*.py,*.txt}]\n[*.py]\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, 1);
        assert_eq!(found, vec!["[*]", "[{*.py,*.txt}]", "[*.py]"]);
    }

    #[test]
    fn options_ignore_later_and_equal_sections() {
        let source = "[*.py]\nd = 1\n[*.py]\nd = 2\n[*]\nd = 3\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, offset_of(source, "d = 2"));
        assert!(found.is_empty());
    }

    #[test]
    fn option_names_compare_case_insensitively() {
        let source = "[*]\nIndent_Size = 2\nother = 1\n[*.py]\nindent_size = 4\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, offset_of(source, "indent_size = 4"));
        assert_eq!(found, vec!["Indent_Size = 2"]);
    }

    #[test]
    fn cursor_outside_headers_and_flat_keys_has_no_target() {
        let source = "root = true\n[*]\nkey = value\nqualified.key = 1\n# note\n";
        let doc = parse(source);
        for needle in ["root", "value", "qualified", "# note", "= value"] {
            let offset = offset_of(source, needle);
            assert_eq!(
                goto_super(&doc, offset, &ResolveOptions::default()),
                GotoResult::NoTarget,
                "at {needle:?}"
            );
            assert_eq!(Source::classify(&doc, offset), Source::Other);
        }
    }

    #[test]
    fn source_labels() {
        let source = "[*]\nkey = value\n";
        let doc = parse(source);
        let header = Source::classify(&doc, 1);
        let key = Source::classify(&doc, offset_of(source, "key"));
        let other = Source::classify(&doc, offset_of(source, "value"));
        assert_eq!(header.chooser_title(), "Select supercase header");
        assert_eq!(key.not_found_message(), "No overridden option found");
        assert_eq!(other.not_found_message(), "No parent found");
        assert_eq!(other.chooser_title(), "Select parent");
    }

    #[test]
    fn result_remembers_its_source() {
        let source = "[*]\nkey = value\n[*.py]\nkey = other\n";
        let doc = parse(source);
        for offset in 0..source.len() {
            let result = goto_super(&doc, offset, &ResolveOptions::default());
            assert_eq!(result.source(), Source::classify(&doc, offset), "at {offset}");
        }
    }

    #[test]
    fn resolution_is_repeatable() {
        let source = "[*]\nb = 1\n[{*.py,*.txt}]\nb = 2\n[*.py]\nb = 3\n";
        let doc = parse(source);
        let offset = offset_of(source, "b = 3");
        let options = ResolveOptions::default();
        assert_eq!(
            goto_super(&doc, offset, &options),
            goto_super(&doc, offset, &options)
        );
    }

    #[test]
    fn unresolvable_patterns_are_skipped() {
        let source = "[v{1..100000}]\ne = 1\n[*]\ne = 2\n[v1]\ne = 3\n";
        let doc = parse(source);
        let (_, found) = targets(&doc, offset_of(source, "e = 3"));
        assert_eq!(found, vec!["e = 2"]);
        let (_, found) = targets(&doc, 1);
        assert!(found.is_empty());
    }
}
