//! Pattern containment: does every path one glob matches also match another?
//!
//! Both patterns are compiled into nondeterministic automata whose edges carry character
//! sets. The alphabet is split into blocks at every set boundary, so one representative per
//! block stands for all of its characters. Inclusion `L(inner) ⊆ L(outer)` is then decided by
//! exploring the product of the two subset constructions, looking for a reachable state where
//! `inner` accepts and `outer` does not. Nothing touches the file system.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::app::pattern::{CharClass, Element, GlobPattern, PatternLimits, Token, numeric_strings};
use crate::domain::errors::{ContainmentError, PatternError};

const MAX_CHAR: u32 = char::MAX as u32;
const SEPARATOR: u32 = '/' as u32;

/// Sorted, disjoint, inclusive code point intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharSet(Vec<(u32, u32)>);

impl CharSet {
    fn single(c: char) -> Self {
        Self(vec![(c as u32, c as u32)])
    }

    fn any() -> Self {
        Self(vec![(0, MAX_CHAR)])
    }

    fn any_but_separator() -> Self {
        Self(vec![(0, SEPARATOR - 1), (SEPARATOR + 1, MAX_CHAR)])
    }

    fn from_class(class: &CharClass) -> Self {
        let mut ranges: Vec<(u32, u32)> = class
            .items
            .iter()
            .map(|&(low, high)| (low as u32, high as u32))
            .filter(|(low, high)| low <= high)
            .collect();
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (low, high) in ranges {
            match merged.last_mut() {
                Some(last) if low <= last.1.saturating_add(1) => last.1 = last.1.max(high),
                _ => merged.push((low, high)),
            }
        }

        let set = if class.negated {
            Self(merged).complement()
        } else {
            Self(merged)
        };
        set.without_separator()
    }

    fn complement(&self) -> Self {
        let mut out = Vec::new();
        let mut next = 0u32;
        for &(low, high) in &self.0 {
            if low > next {
                out.push((next, low - 1));
            }
            next = high.saturating_add(1);
        }
        if next <= MAX_CHAR {
            out.push((next, MAX_CHAR));
        }
        Self(out)
    }

    fn without_separator(self) -> Self {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        for (low, high) in self.0 {
            if low <= SEPARATOR && SEPARATOR <= high {
                if low < SEPARATOR {
                    out.push((low, SEPARATOR - 1));
                }
                if SEPARATOR < high {
                    out.push((SEPARATOR + 1, high));
                }
            } else {
                out.push((low, high));
            }
        }
        Self(out)
    }

    fn contains(&self, c: u32) -> bool {
        self.0.iter().any(|&(low, high)| low <= c && c <= high)
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    epsilon: Vec<usize>,
    edges: Vec<(CharSet, usize)>,
}

/// Automaton recognising the relative paths a header pattern matches.
#[derive(Debug, Clone)]
pub struct Automaton {
    states: Vec<State>,
    start: usize,
    accept: usize,
}

impl Automaton {
    pub fn compile(pattern: &GlobPattern, limits: &PatternLimits) -> Result<Self, PatternError> {
        let mut builder = Builder {
            states: Vec::new(),
            limits,
        };
        let start = builder.add();
        let body = if pattern.is_anchored() {
            start
        } else {
            builder.any_dirs(start)
        };
        let accept = builder.sequence(pattern.elements(), body)?;
        Ok(Self {
            states: builder.states,
            start,
            accept,
        })
    }

    /// Whether `path` (relative, `/`-separated) is matched.
    pub fn matches(&self, path: &str) -> bool {
        let mut current = self.closure([self.start]);
        for c in path.chars() {
            current = self.step(&current, c as u32);
            if current.is_empty() {
                return false;
            }
        }
        current.contains(&self.accept)
    }

    fn closure(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        let mut stack: Vec<usize> = seeds.into_iter().collect();
        while let Some(state) = stack.pop() {
            if seen.insert(state) {
                stack.extend(self.states[state].epsilon.iter().copied());
            }
        }
        seen.into_iter().collect()
    }

    fn step(&self, set: &[usize], symbol: u32) -> Vec<usize> {
        let targets = set.iter().flat_map(|&state| {
            self.states[state]
                .edges
                .iter()
                .filter(move |(chars, _)| chars.contains(symbol))
                .map(|(_, to)| *to)
        });
        self.closure(targets)
    }

    fn accepts(&self, set: &[usize]) -> bool {
        set.binary_search(&self.accept).is_ok()
    }

    fn cut_points(&self, cuts: &mut BTreeSet<u32>) {
        for state in &self.states {
            for (chars, _) in &state.edges {
                for &(low, high) in &chars.0 {
                    cuts.insert(low);
                    if high < MAX_CHAR {
                        cuts.insert(high + 1);
                    }
                }
            }
        }
    }
}

/// Decide whether every path matched by `inner` is also matched by `outer`.
///
/// `max_states` bounds the product exploration; hitting it is reported as an error rather than
/// guessed.
pub fn is_superset(
    outer: &Automaton,
    inner: &Automaton,
    max_states: usize,
) -> Result<bool, ContainmentError> {
    let mut cuts = BTreeSet::from([0u32]);
    outer.cut_points(&mut cuts);
    inner.cut_points(&mut cuts);
    let alphabet: Vec<u32> = cuts.into_iter().collect();

    let start = (inner.closure([inner.start]), outer.closure([outer.start]));
    let mut seen: HashSet<(Vec<usize>, Vec<usize>)> = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start.clone());
    queue.push_back(start);

    while let Some((inner_set, outer_set)) = queue.pop_front() {
        if inner.accepts(&inner_set) && !outer.accepts(&outer_set) {
            return Ok(false);
        }
        for &symbol in &alphabet {
            let inner_next = inner.step(&inner_set, symbol);
            if inner_next.is_empty() {
                continue;
            }
            let outer_next = outer.step(&outer_set, symbol);
            let pair = (inner_next, outer_next);
            if !seen.contains(&pair) {
                if seen.len() >= max_states {
                    return Err(ContainmentError::StateLimit { limit: max_states });
                }
                seen.insert(pair.clone());
                queue.push_back(pair);
            }
        }
    }
    Ok(true)
}

struct Builder<'a> {
    states: Vec<State>,
    limits: &'a PatternLimits,
}

impl Builder<'_> {
    fn add(&mut self) -> usize {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.states[from].epsilon.push(to);
    }

    fn edge(&mut self, from: usize, chars: CharSet, to: usize) {
        self.states[from].edges.push((chars, to));
    }

    /// Consume `chars` any number of times, starting from `from`.
    fn repeat(&mut self, from: usize, chars: CharSet) -> usize {
        let looping = self.add();
        self.epsilon(from, looping);
        self.edge(looping, chars, looping);
        looping
    }

    /// `(.*/)?`: zero or more leading directories.
    fn any_dirs(&mut self, from: usize) -> usize {
        let end = self.add();
        self.epsilon(from, end);
        let dirs = self.repeat(from, CharSet::any());
        self.edge(dirs, CharSet::single('/'), end);
        end
    }

    fn single(&mut self, from: usize, chars: CharSet) -> usize {
        let to = self.add();
        self.edge(from, chars, to);
        to
    }

    fn sequence(&mut self, elements: &[Element], from: usize) -> Result<usize, PatternError> {
        elements
            .iter()
            .try_fold(from, |current, element| self.element(&element.token, current))
    }

    fn element(&mut self, token: &Token, from: usize) -> Result<usize, PatternError> {
        let end = match token {
            Token::Literal(c) => self.single(from, CharSet::single(*c)),
            Token::AnyChar => self.single(from, CharSet::any_but_separator()),
            Token::Class(class) => self.single(from, CharSet::from_class(class)),
            Token::Star => self.repeat(from, CharSet::any_but_separator()),
            Token::DoubleStar => self.repeat(from, CharSet::any()),
            Token::AnyDirs => self.any_dirs(from),
            Token::Alternatives { branches, .. } => {
                let end = self.add();
                for branch in branches {
                    let branch_start = self.add();
                    self.epsilon(from, branch_start);
                    let branch_end = self.sequence(branch, branch_start)?;
                    self.epsilon(branch_end, end);
                }
                end
            }
            Token::NumRange { lo, hi } => {
                let end = self.add();
                for number in numeric_strings(*lo, *hi, self.limits.max_range_expansion)? {
                    let mut current = self.add();
                    self.epsilon(from, current);
                    for c in number.chars() {
                        current = self.single(current, CharSet::single(c));
                    }
                    self.epsilon(current, end);
                }
                end
            }
        };
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 10_000;

    fn compile(source: &str) -> Automaton {
        Automaton::compile(&GlobPattern::parse(source), &PatternLimits::default())
            .expect("pattern compiles")
    }

    fn superset(outer: &str, inner: &str) -> bool {
        is_superset(&compile(outer), &compile(inner), LIMIT).expect("within limit")
    }

    #[test]
    fn matches_editorconfig_semantics() {
        let py = compile("*.py");
        assert!(py.matches("a.py"));
        assert!(py.matches("pkg/sub/a.py"));
        assert!(!py.matches("a.pyc"));

        let anchored = compile("/src/*.rs");
        assert!(anchored.matches("src/lib.rs"));
        assert!(!anchored.matches("crate/src/lib.rs"));
        assert!(!anchored.matches("src/app/mod.rs"));

        let deep = compile("src/**/*.rs");
        assert!(deep.matches("src/lib.rs"));
        assert!(deep.matches("src/app/mod.rs"));

        let class = compile("[!a]?.txt");
        assert!(class.matches("bc.txt"));
        assert!(!class.matches("ab.txt"));
        assert!(!class.matches("/b.txt"));

        let ranged = compile("log{-1..2}");
        assert!(ranged.matches("log-1"));
        assert!(ranged.matches("log2"));
        assert!(!ranged.matches("log3"));
    }

    #[test]
    fn star_contains_every_unanchored_pattern() {
        assert!(superset("*", "*.py"));
        assert!(superset("*", "{a,b}.txt"));
        assert!(superset("*", "[abc]"));
        assert!(!superset("*.py", "*"));
    }

    #[test]
    fn alternatives_contain_their_branches() {
        assert!(superset("{*.py,*.txt}", "*.py"));
        assert!(superset("{*.py,*.txt}", "{a,b}.txt"));
        assert!(!superset("*.py", "{*.py,*.txt}"));
        assert!(superset("*.{py,txt}", "{*.py,*.txt}"));
        assert!(superset("{*.py,*.txt}", "*.{py,txt}"));
    }

    #[test]
    fn classes_and_ranges() {
        assert!(superset("[a-z].md", "[abc].md"));
        assert!(!superset("[abc].md", "[a-z].md"));
        assert!(superset("?.md", "[!x].md"));
        assert!(superset("v{1..9}", "v{2..4}"));
        assert!(!superset("v{2..4}", "v{1..9}"));
        assert!(superset("v*", "v{1..9}"));
    }

    #[test]
    fn anchoring_narrows_scope() {
        assert!(superset("*.rs", "/src/*.rs"));
        assert!(superset("*.rs", "src/**/*.rs"));
        assert!(!superset("/src/*.rs", "*.rs"));
        assert!(superset("**", "lib/*"));
        assert!(!superset("lib/*", "lib/**"));
    }

    #[test]
    fn identical_patterns_contain_each_other() {
        assert!(superset("*.py", "*.py"));
        assert!(superset("{a,b}", "{b,a}"));
    }

    #[test]
    fn state_limit_is_reported() {
        let result = is_superset(&compile("*"), &compile("*.{py,txt,md}"), 1);
        assert_eq!(result, Err(ContainmentError::StateLimit { limit: 1 }));
    }

    #[test]
    fn empty_range_matches_nothing() {
        let empty = compile("v{3..1}");
        assert!(!empty.matches("v2"));
        assert!(superset("*.py", "v{3..1}"));
    }

    #[test]
    fn complement_of_full_range_is_empty() {
        assert_eq!(CharSet::any().complement(), CharSet(Vec::new()));
        let set = CharSet::from_class(&CharClass {
            negated: true,
            items: vec![('a', 'a')],
        });
        assert!(!set.contains('a' as u32));
        assert!(!set.contains(SEPARATOR));
        assert!(set.contains('b' as u32));
    }
}
