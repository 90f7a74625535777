use ecnav::app::containment::{Automaton, is_superset};
use ecnav::app::navigate::{GotoResult, ResolveOptions, Source, TargetKind, goto_super};
use ecnav::app::parse::parse;
use ecnav::app::pattern::{GlobPattern, PatternLimits};
use ecnav::domain::model::Document;

const PATTERNS: &[&str] = &[
    "*",
    "**",
    "*.py",
    "*.txt",
    "{*.py,*.txt}",
    "*.{py,txt,md}",
    "{a,b}.txt",
    "[ab].txt",
    "?.txt",
    "/src/*.py",
    "src/**/*.py",
    "src/**",
    "test_*.py",
    "v{1..5}.txt",
    "[!x]*",
];

const SAMPLE_PATHS: &[&str] = &[
    "a.py",
    "a.txt",
    "b.txt",
    "c.txt",
    "x.txt",
    "notes.md",
    "test_a.py",
    "v3.txt",
    "v9.txt",
    "src/a.py",
    "src/a.txt",
    "src/deep/a.py",
    "lib/src/a.py",
    "lib/test_b.py",
    "x/y/z",
    "README",
];

fn texts(doc: &Document, result: GotoResult) -> (TargetKind, Vec<String>) {
    match result {
        GotoResult::Targets { kind, targets, .. } => (
            kind,
            targets
                .into_iter()
                .map(|id| doc.text(id).to_owned())
                .collect(),
        ),
        GotoResult::NoTarget => panic!("expected targets"),
    }
}

#[test]
fn two_section_example() {
    let source = "[*]\na=1\n[*.py]\na=2\n";
    let doc = parse(source);
    let options = ResolveOptions::default();

    let key = source.rfind("a=2").expect("key");
    let (kind, found) = texts(&doc, goto_super(&doc, key, &options));
    assert_eq!(kind, TargetKind::FlatOptionKey);
    assert_eq!(found, vec!["a=1"]);

    let header = source.find("[*.py]").expect("header");
    let (kind, found) = texts(&doc, goto_super(&doc, header, &options));
    assert_eq!(kind, TargetKind::Header);
    assert_eq!(found, vec!["[*]"]);

    let (_, found) = texts(&doc, goto_super(&doc, 0, &options));
    assert!(found.is_empty());
    assert_eq!(
        Source::classify(&doc, 0).not_found_message(),
        "No supercase header found"
    );
}

#[test]
fn three_section_example_orders_narrowest_first() {
    let source = "[*]\nb = 1\n\n[{*.py,*.txt}]\nb = 2\n\n[*.py]\nb = 3\n";
    let doc = parse(source);
    let key = source.rfind("b = 3").expect("key");
    let (_, found) = texts(&doc, goto_super(&doc, key, &ResolveOptions::default()));
    assert_eq!(found, vec!["b = 2", "b = 1"]);
}

#[test]
fn header_results_never_include_the_source() {
    let source: String = PATTERNS.iter().map(|p| format!("[{p}]\nk = v\n")).collect();
    let doc = parse(&source);
    let options = ResolveOptions::default();
    for header in doc.headers() {
        let offset = doc.range(header).start;
        let (_, found) = texts(&doc, goto_super(&doc, offset, &options));
        assert!(!found.contains(&doc.text(header).to_owned()));
    }
}

#[test]
fn containment_agrees_with_concrete_matching() {
    let limits = PatternLimits::default();
    let compiled: Vec<_> = PATTERNS
        .iter()
        .map(|source| {
            let pattern = GlobPattern::parse(source);
            let automaton = Automaton::compile(&pattern, &limits).expect("automaton");
            let globs = pattern.to_glob_set(&limits).expect("glob set");
            (source, automaton, globs)
        })
        .collect();

    for (source, automaton, globs) in &compiled {
        for path in SAMPLE_PATHS {
            assert_eq!(
                automaton.matches(path),
                globs.is_match(path),
                "{source} vs {path}"
            );
        }
    }

    for (outer_source, outer, outer_globs) in &compiled {
        for (inner_source, inner, inner_globs) in &compiled {
            let contained = is_superset(outer, inner, 10_000).expect("within limit");
            let counterexample = SAMPLE_PATHS
                .iter()
                .find(|path| inner_globs.is_match(path) && !outer_globs.is_match(path));
            if contained {
                assert!(
                    counterexample.is_none(),
                    "{outer_source} claimed to contain {inner_source}, but {counterexample:?} disagrees"
                );
            }
        }
    }
}

#[test]
fn known_containments() {
    let limits = PatternLimits::default();
    let compile = |source: &str| {
        Automaton::compile(&GlobPattern::parse(source), &limits).expect("automaton")
    };
    for (outer, inner) in [
        ("*", "src/**/*.py"),
        ("*.{py,txt,md}", "{*.py,*.txt}"),
        ("src/**", "/src/*.py"),
        ("src/**/*.py", "/src/*.py"),
        ("**", "[!x]*"),
        ("?.txt", "{a,b}.txt"),
        ("{a,b}.txt", "[ab].txt"),
        ("[ab].txt", "{a,b}.txt"),
        ("v*.txt", "v{1..5}.txt"),
        ("*.py", "test_*.py"),
    ] {
        assert!(
            is_superset(&compile(outer), &compile(inner), 10_000).expect("within limit"),
            "{outer} should contain {inner}"
        );
    }
}

#[test]
fn known_non_containments() {
    let limits = PatternLimits::default();
    let compile = |source: &str| {
        Automaton::compile(&GlobPattern::parse(source), &limits).expect("automaton")
    };
    for (outer, inner) in [
        ("*.py", "*"),
        ("/src/*.py", "src/**/*.py"),
        ("[ab].txt", "{a,b,c}.txt"),
        ("v{1..5}.txt", "v*.txt"),
        ("test_*.py", "*.py"),
    ] {
        assert!(
            !is_superset(&compile(outer), &compile(inner), 10_000).expect("within limit"),
            "{outer} should not contain {inner}"
        );
    }
}
