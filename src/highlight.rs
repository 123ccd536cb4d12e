use std::sync::LazyLock;

use html_escape::encode_text;
use log::{debug, warn};
use regex::{Captures, Regex};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::{Error, Result};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>[^<]+)|(^[^<]+)").expect("valid text run regex"));

/// Language used when a fence names nothing we know.
pub const PLAINTEXT: &str = "plaintext";

pub const DEFAULT_CODE_THEME: &str = "InspiredGitHub";

/// Names of the bundled code color themes.
pub fn code_themes() -> impl Iterator<Item = &'static str> {
    THEME_SET.themes.keys().map(String::as_str)
}

/// A code block after highlighting and whitespace normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedCode {
    /// Language actually used, `plaintext` when the fence was unknown.
    pub language: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    theme: &'static Theme,
}

impl Highlighter {
    /// Highlighter using one of the bundled code themes.
    pub fn new(code_theme: &str) -> Result<Self> {
        let theme = THEME_SET
            .themes
            .get(code_theme)
            .ok_or_else(|| Error::UnknownCodeTheme(code_theme.to_string()))?;
        Ok(Self { theme })
    }

    /// Highlight `code`, falling back to plain text for unknown languages.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> HighlightedCode {
        let (language, syntax) = resolve_language(language);
        let html = match self.highlight_with(code, syntax) {
            Ok(html) => html,
            Err(e) => {
                warn!("highlighting {language} failed, emitting plain code: {e}");
                encode_text(code).into_owned()
            }
        };
        HighlightedCode {
            language,
            html: normalize_whitespace(&html),
        }
    }

    fn highlight_with(
        &self,
        code: &str,
        syntax: &SyntaxReference,
    ) -> std::result::Result<String, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, self.theme);
        let mut html = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, &SYNTAX_SET)?;
            html.push_str(&styled_line_to_highlighted_html(
                &regions[..],
                IncludeBackground::No,
            )?);
        }
        Ok(html)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        // The bundled theme set always ships InspiredGitHub.
        Self::new(DEFAULT_CODE_THEME).expect("bundled default code theme")
    }
}

fn resolve_language(language: Option<&str>) -> (String, &'static SyntaxReference) {
    let requested = language.map(str::trim).filter(|lang| !lang.is_empty());
    if let Some(lang) = requested {
        if let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) {
            return (lang.to_string(), syntax);
        }
        debug!("unknown code language `{lang}`, using {PLAINTEXT}");
    }
    (PLAINTEXT.to_string(), SYNTAX_SET.find_syntax_plain_text())
}

/// Make highlighted HTML survive a whitespace-collapsing host.
///
/// Tabs become four spaces, line endings become `<br/>`, and whitespace inside
/// text runs becomes `&nbsp;`. Whitespace inside tags is left alone.
pub fn normalize_whitespace(html: &str) -> String {
    let html = html
        .replace('\t', "    ")
        .replace("\r\n", "<br/>")
        .replace('\n', "<br/>");
    TEXT_RUN
        .replace_all(&html, |caps: &Captures| {
            caps[0]
                .chars()
                .map(|c| if c.is_whitespace() { "&nbsp;".to_string() } else { c.to_string() })
                .collect::<String>()
        })
        .into_owned()
}
