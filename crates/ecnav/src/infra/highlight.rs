//! Terminal rendering of info highlighting using named color themes.

use std::collections::HashMap;
use std::fmt::Write as _;

use crossterm::style::{Attribute, Color, ContentStyle};
use once_cell::sync::Lazy;

use crate::app::highlight::{HighlightKind, InfoSpan};
use crate::domain::model::Document;

const DEFAULT_THEME: &str = "dracula";

fn style(foreground: Option<Color>, attributes: &[Attribute]) -> ContentStyle {
    let mut style = ContentStyle::new();
    style.foreground_color = foreground;
    for attribute in attributes {
        style.attributes.set(*attribute);
    }
    style
}

fn rgb(r: u8, g: u8, b: u8, attributes: &[Attribute]) -> ContentStyle {
    style(Some(Color::Rgb { r, g, b }), attributes)
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    styles: HashMap<HighlightKind, ContentStyle>,
}

impl Theme {
    /// Style for `kind`; kinds the theme leaves out render unstyled.
    pub fn style(&self, kind: HighlightKind) -> ContentStyle {
        self.styles.get(&kind).copied().unwrap_or_default()
    }
}

static THEMES: Lazy<Vec<Theme>> = Lazy::new(|| {
    use Attribute::{Bold, Italic, Underlined};

    let dracula = HashMap::from([
        (HighlightKind::RootKeyword, rgb(255, 121, 198, &[Bold])),
        (HighlightKind::Comment, rgb(98, 114, 164, &[Italic])),
        (HighlightKind::HeaderBracket, rgb(248, 248, 242, &[Bold])),
        (HighlightKind::Pattern, rgb(241, 250, 140, &[])),
        (HighlightKind::Wildcard, rgb(255, 184, 108, &[Bold])),
        (HighlightKind::CharClass, rgb(139, 233, 253, &[])),
        (HighlightKind::Variant, rgb(189, 147, 249, &[])),
        (HighlightKind::OptionKey, rgb(80, 250, 123, &[])),
        (HighlightKind::KeyPart, rgb(80, 250, 123, &[Italic])),
        (HighlightKind::Separator, rgb(248, 248, 242, &[])),
        (HighlightKind::Value, rgb(241, 250, 140, &[])),
        (HighlightKind::Error, rgb(255, 85, 85, &[Underlined])),
    ]);
    let plain = HashMap::from([
        (HighlightKind::RootKeyword, style(None, &[Bold])),
        (HighlightKind::HeaderBracket, style(None, &[Bold])),
        (HighlightKind::Comment, style(None, &[Italic])),
        (HighlightKind::Error, style(None, &[Underlined])),
    ]);
    vec![
        Theme {
            name: "dracula",
            styles: dracula,
        },
        Theme {
            name: "plain",
            styles: plain,
        },
    ]
});

#[derive(Debug, Clone)]
pub struct Highlighter {
    theme: &'static Theme,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl Highlighter {
    /// Select a theme by name (case-insensitive), falling back to the default theme.
    pub fn new(theme: &str) -> Self {
        Self {
            theme: resolve_theme(theme),
        }
    }

    pub fn available_themes() -> Vec<&'static str> {
        let mut themes: Vec<_> = THEMES.iter().map(|theme| theme.name).collect();
        themes.sort_unstable();
        themes
    }

    pub fn theme_name(&self) -> &'static str {
        self.theme.name
    }

    pub fn style(&self, kind: HighlightKind) -> ContentStyle {
        self.theme.style(kind)
    }

    /// Render the whole document with ANSI escapes around every classified span.
    pub fn render_ansi(&self, doc: &Document, spans: &[InfoSpan]) -> String {
        let source = doc.source();
        let mut out = String::with_capacity(source.len() * 2);
        let mut cursor = 0usize;
        for span in spans {
            if span.range.start < cursor {
                continue;
            }
            out.push_str(&source[cursor..span.range.start]);
            let text = &source[span.range.start..span.range.end];
            let style = self.theme.style(span.kind);
            if style == ContentStyle::new() {
                out.push_str(text);
            } else {
                let _ = write!(out, "{}", style.apply(text));
            }
            cursor = span.range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

fn resolve_theme(requested: &str) -> &'static Theme {
    if let Some(theme) = THEMES
        .iter()
        .find(|theme| theme.name.eq_ignore_ascii_case(requested))
    {
        return theme;
    }
    tracing::warn!(requested, fallback = DEFAULT_THEME, "theme not found");
    THEMES
        .iter()
        .find(|theme| theme.name == DEFAULT_THEME)
        .unwrap_or(&THEMES[0])
}
