//! Editorconfig glob patterns.
//!
//! Section headers use editorconfig's glob dialect: `*` stops at `/`, `**` does not, `?` and
//! character classes match a single non-separator character, `{a,b}` alternates (and nests),
//! `{1..10}` matches integers in a range, and `\` escapes the next character. A pattern without
//! any `/` applies at every directory depth; a leading `/` anchors it to the directory holding
//! the `.editorconfig` file.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::domain::errors::PatternError;
use crate::domain::model::TextRange;

/// Expansion limits applied when a pattern is compiled for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternLimits {
    /// Maximum number of integers a single `{lo..hi}` range may stand for.
    pub max_range_expansion: usize,
    /// Maximum number of alternative-free globs one pattern may expand into.
    pub max_glob_expansion: usize,
}

impl Default for PatternLimits {
    fn default() -> Self {
        Self {
            max_range_expansion: 1024,
            max_glob_expansion: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub token: Token,
    /// Byte range relative to the pattern source.
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(char),
    /// `*`
    Star,
    /// `**`
    DoubleStar,
    /// `**/` at a directory boundary: zero or more leading directories.
    AnyDirs,
    /// `?`
    AnyChar,
    Class(CharClass),
    /// `{a,b,c}`; `commas` holds the byte offsets of the top-level separators.
    Alternatives {
        branches: Vec<Vec<Element>>,
        commas: Vec<usize>,
    },
    /// `{lo..hi}`
    NumRange { lo: i64, hi: i64 },
}

/// `[...]` class; items are inclusive character ranges, single characters are `(c, c)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub negated: bool,
    pub items: Vec<(char, char)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    elements: Vec<Element>,
    anchored: bool,
}

impl GlobPattern {
    pub fn parse(source: &str) -> Self {
        let parser = Parser {
            chars: source.char_indices().collect(),
            len: source.len(),
        };
        let body_start = usize::from(source.starts_with('/'));
        let elements = parser.sequence(body_start, parser.chars.len());
        Self {
            source: source.to_owned(),
            elements,
            anchored: source.contains('/'),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Anchored patterns match relative to the document directory only.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Build a [`GlobSet`] matching the same relative paths as this pattern.
    ///
    /// `globset` has no nested alternation and no numeric ranges, so the pattern is first
    /// expanded into alternative-free globs.
    pub fn to_glob_set(&self, limits: &PatternLimits) -> Result<GlobSet, PatternError> {
        let mut builder = GlobSetBuilder::new();
        for variant in expand(&self.elements, limits)? {
            let glob = if self.anchored {
                variant
            } else {
                format!("**/{variant}")
            };
            let compiled = GlobBuilder::new(&glob)
                .literal_separator(true)
                .backslash_escape(true)
                .build()
                .map_err(|source| PatternError::Glob {
                    glob: glob.clone(),
                    source,
                })?;
            builder.add(compiled);
        }
        builder.build().map_err(|source| PatternError::Glob {
            glob: self.source.clone(),
            source,
        })
    }
}

/// Decimal spellings of every integer in `lo..=hi`; empty when `lo > hi`.
pub fn numeric_strings(lo: i64, hi: i64, limit: usize) -> Result<Vec<String>, PatternError> {
    if lo > hi {
        return Ok(Vec::new());
    }
    let count = (i128::from(hi) - i128::from(lo) + 1) as u128;
    if count > limit as u128 {
        return Err(PatternError::RangeTooLarge {
            lo,
            hi,
            count,
            limit,
        });
    }
    Ok((lo..=hi).map(|n| n.to_string()).collect())
}

struct Parser {
    chars: Vec<(usize, char)>,
    len: usize,
}

impl Parser {
    fn offset(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.len, |(offset, _)| *offset)
    }

    fn at(&self, idx: usize) -> char {
        self.chars[idx].1
    }

    fn element(&self, token: Token, from: usize, to: usize) -> Element {
        Element {
            token,
            range: TextRange::new(self.offset(from), self.offset(to)),
        }
    }

    fn sequence(&self, start: usize, end: usize) -> Vec<Element> {
        let mut out: Vec<Element> = Vec::new();
        let mut i = start;
        while i < end {
            match self.at(i) {
                '\\' if i + 1 < end => {
                    out.push(self.element(Token::Literal(self.at(i + 1)), i, i + 2));
                    i += 2;
                }
                '*' => {
                    let mut j = i;
                    while j < end && self.at(j) == '*' {
                        j += 1;
                    }
                    let boundary = matches!(
                        out.last(),
                        None | Some(Element {
                            token: Token::Literal('/'),
                            ..
                        })
                    );
                    if j - i == 1 {
                        out.push(self.element(Token::Star, i, j));
                        i = j;
                    } else if boundary && j < end && self.at(j) == '/' {
                        out.push(self.element(Token::AnyDirs, i, j + 1));
                        i = j + 1;
                    } else {
                        out.push(self.element(Token::DoubleStar, i, j));
                        i = j;
                    }
                }
                '?' => {
                    out.push(self.element(Token::AnyChar, i, i + 1));
                    i += 1;
                }
                '[' => match self.class(i, end) {
                    Some((class, next)) => {
                        out.push(self.element(Token::Class(class), i, next));
                        i = next;
                    }
                    None => {
                        out.push(self.element(Token::Literal('['), i, i + 1));
                        i += 1;
                    }
                },
                '{' => match self.matching_brace(i, end) {
                    Some(close) => {
                        self.braces(i, close, &mut out);
                        i = close + 1;
                    }
                    None => {
                        out.push(self.element(Token::Literal('{'), i, i + 1));
                        i += 1;
                    }
                },
                c => {
                    out.push(self.element(Token::Literal(c), i, i + 1));
                    i += 1;
                }
            }
        }
        out
    }

    /// Parse `[...]` starting at `open`; `None` means the bracket is literal.
    fn class(&self, open: usize, end: usize) -> Option<(CharClass, usize)> {
        let mut k = open + 1;
        let negated = k < end && self.at(k) == '!';
        if negated {
            k += 1;
        }
        let mut items = Vec::new();
        let mut first = true;
        while k < end {
            let c = self.at(k);
            if c == ']' && !first {
                return Some((CharClass { negated, items }, k + 1));
            }
            if c == '/' {
                return None;
            }
            first = false;
            let (low, next) = self.class_char(k, end)?;
            if next + 1 < end && self.at(next) == '-' && self.at(next + 1) != ']' {
                let (high, after) = self.class_char(next + 1, end)?;
                if high == '/' {
                    return None;
                }
                items.push((low, high));
                k = after;
            } else {
                items.push((low, low));
                k = next;
            }
        }
        None
    }

    fn class_char(&self, k: usize, end: usize) -> Option<(char, usize)> {
        match self.at(k) {
            '\\' if k + 1 < end => Some((self.at(k + 1), k + 2)),
            c => Some((c, k + 1)),
        }
    }

    fn matching_brace(&self, open: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = open;
        while k < end {
            match self.at(k) {
                '\\' => {
                    k += 2;
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
            k += 1;
        }
        None
    }

    fn braces(&self, open: usize, close: usize, out: &mut Vec<Element>) {
        let inner: String = self.chars[open + 1..close].iter().map(|(_, c)| c).collect();
        if let Some((lo, hi)) = parse_numeric_range(&inner) {
            out.push(self.element(Token::NumRange { lo, hi }, open, close + 1));
            return;
        }

        let mut commas = Vec::new();
        let mut depth = 0usize;
        let mut k = open + 1;
        while k < close {
            match self.at(k) {
                '\\' => k += 1,
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => commas.push(k),
                _ => {}
            }
            k += 1;
        }

        if commas.is_empty() {
            out.push(self.element(Token::Literal('{'), open, open + 1));
            out.extend(self.sequence(open + 1, close));
            out.push(self.element(Token::Literal('}'), close, close + 1));
            return;
        }

        let mut branches = Vec::with_capacity(commas.len() + 1);
        let mut branch_start = open + 1;
        for &comma in commas.iter().chain(std::iter::once(&close)) {
            branches.push(self.sequence(branch_start, comma));
            branch_start = comma + 1;
        }
        let commas = commas.into_iter().map(|idx| self.offset(idx)).collect();
        out.push(self.element(Token::Alternatives { branches, commas }, open, close + 1));
    }
}

fn parse_numeric_range(inner: &str) -> Option<(i64, i64)> {
    let (lo, hi) = inner.split_once("..")?;
    let is_number = |s: &str| {
        let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    };
    if !is_number(lo) || !is_number(hi) {
        return None;
    }
    Some((lo.parse().ok()?, hi.parse().ok()?))
}

/// Expand alternatives and numeric ranges into plain `globset` syntax.
fn expand(elements: &[Element], limits: &PatternLimits) -> Result<Vec<String>, PatternError> {
    let mut variants = vec![String::new()];
    for element in elements {
        let pieces: Vec<String> = match &element.token {
            Token::Literal(c) => vec![escape_literal(*c)],
            Token::Star => vec!["*".into()],
            // `**` is only legal next to a separator in globset, so split it into "no separator
            // crossed" and "one or more separators crossed".
            Token::DoubleStar => vec!["*".into(), "*/**/*".into()],
            Token::AnyDirs => vec!["**/".into()],
            Token::AnyChar => vec!["?".into()],
            Token::Class(class) => vec![render_class(class)],
            Token::Alternatives { branches, .. } => {
                let mut pieces = Vec::new();
                for branch in branches {
                    pieces.extend(expand(branch, limits)?);
                }
                pieces
            }
            Token::NumRange { lo, hi } => numeric_strings(*lo, *hi, limits.max_range_expansion)?,
        };
        if variants.len() * pieces.len() > limits.max_glob_expansion {
            return Err(PatternError::TooManyExpansions {
                limit: limits.max_glob_expansion,
            });
        }
        variants = variants
            .iter()
            .flat_map(|prefix| pieces.iter().map(move |piece| format!("{prefix}{piece}")))
            .collect();
    }
    Ok(variants)
}

fn escape_literal(c: char) -> String {
    if matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | ',' | '\\' | '!') {
        format!("\\{c}")
    } else {
        c.to_string()
    }
}

fn render_class(class: &CharClass) -> String {
    if !class.negated {
        if let [(low, high)] = class.items.as_slice() {
            if low == high {
                return escape_literal(*low);
            }
        }
    }

    let mut bracket = false;
    let mut dash = false;
    let mut body = String::new();
    let mut tail = String::new();
    for &(low, high) in &class.items {
        if low == high {
            match low {
                ']' => bracket = true,
                '-' => dash = true,
                '!' | '^' => tail.push(low),
                c => body.push(c),
            }
        } else {
            body.push(low);
            body.push('-');
            body.push(high);
        }
    }

    let mut out = String::from("[");
    if class.negated {
        out.push('!');
        // Negated classes never match the separator.
        body.push('/');
    }
    if bracket {
        out.push(']');
    }
    if body.is_empty() && tail.is_empty() && !bracket {
        // Only `-` remains.
        out.push('-');
        dash = false;
    }
    out.push_str(&body);
    out.push_str(&tail);
    if dash {
        out.push('-');
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pattern: &GlobPattern) -> Vec<Token> {
        pattern.elements().iter().map(|e| e.token.clone()).collect()
    }

    #[test]
    fn parses_wildcards_and_anchoring() {
        let pattern = GlobPattern::parse("*.py");
        assert!(!pattern.is_anchored());
        assert_eq!(
            tokens(&pattern),
            vec![
                Token::Star,
                Token::Literal('.'),
                Token::Literal('p'),
                Token::Literal('y')
            ]
        );

        let pattern = GlobPattern::parse("/lib/**/*.js");
        assert!(pattern.is_anchored());
        let kinds = tokens(&pattern);
        assert_eq!(kinds[3], Token::Literal('/'));
        assert_eq!(kinds[4], Token::AnyDirs);
        assert_eq!(pattern.elements()[4].range, TextRange::new(5, 8));
    }

    #[test]
    fn parses_classes() {
        let pattern = GlobPattern::parse("[!a-c_]x");
        assert_eq!(
            tokens(&pattern)[0],
            Token::Class(CharClass {
                negated: true,
                items: vec![('a', 'c'), ('_', '_')],
            })
        );
        assert_eq!(pattern.elements()[0].range, TextRange::new(0, 7));

        // A class containing a separator is a literal bracket.
        let pattern = GlobPattern::parse("[a/b]");
        assert_eq!(tokens(&pattern)[0], Token::Literal('['));
    }

    #[test]
    fn parses_nested_alternatives() {
        let pattern = GlobPattern::parse("{*.py,{a,b}.txt}");
        let [element] = pattern.elements() else {
            panic!("expected a single element");
        };
        let Token::Alternatives { branches, commas } = &element.token else {
            panic!("expected alternatives");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(commas, &vec![5]);
        assert!(matches!(branches[1][0].token, Token::Alternatives { .. }));
    }

    #[test]
    fn single_branch_braces_are_literal() {
        let pattern = GlobPattern::parse("{single}");
        let kinds = tokens(&pattern);
        assert_eq!(kinds.first(), Some(&Token::Literal('{')));
        assert_eq!(kinds.last(), Some(&Token::Literal('}')));
    }

    #[test]
    fn parses_numeric_ranges() {
        let pattern = GlobPattern::parse("file{-2..+3}");
        assert_eq!(tokens(&pattern)[4], Token::NumRange { lo: -2, hi: 3 });
        assert_eq!(
            numeric_strings(-1, 1, 10).expect("small range"),
            vec!["-1", "0", "1"]
        );
        assert!(numeric_strings(0, 5000, 10).is_err());
        assert!(numeric_strings(3, 1, 10).expect("empty").is_empty());
    }

    #[test]
    fn glob_set_matches_relative_paths() {
        let limits = PatternLimits::default();
        let set = GlobPattern::parse("{*.py,*.{js,ts}}")
            .to_glob_set(&limits)
            .expect("glob set");
        assert!(set.is_match("main.py"));
        assert!(set.is_match("pkg/main.py"));
        assert!(set.is_match("lib/a.ts"));
        assert!(!set.is_match("main.rs"));

        let nested = GlobPattern::parse("lib/*.{js,ts}")
            .to_glob_set(&limits)
            .expect("glob set");
        assert!(nested.is_match("lib/a.js"));
        assert!(!nested.is_match("lib/a/b.js"));
        assert!(!nested.is_match("x/lib/a.js"));

        let deep = GlobPattern::parse("src**.rs")
            .to_glob_set(&limits)
            .expect("glob set");
        assert!(deep.is_match("src.rs"));
        assert!(deep.is_match("src/a/b.rs"));

        let anchored = GlobPattern::parse("/docs/*.md")
            .to_glob_set(&limits)
            .expect("glob set");
        assert!(anchored.is_match("docs/readme.md"));
        assert!(!anchored.is_match("src/docs/readme.md"));

        let ranged = GlobPattern::parse("v{1..3}.txt")
            .to_glob_set(&limits)
            .expect("glob set");
        assert!(ranged.is_match("v2.txt"));
        assert!(!ranged.is_match("v4.txt"));
    }
}
