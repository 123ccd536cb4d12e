//! Markdown to paste-ready HTML.
//!
//! Rich-text publishing hosts drop `<style>` blocks and class-based CSS, so
//! every element produced here carries its presentation in a `style`
//! attribute. External links are moved into a numbered reference list at the
//! end of the document; links to the host platform stay clickable.
//!
//! ```
//! let html = mdpaste::render_markdown("# Title\n\nHello **world**", &Default::default()).unwrap();
//! assert!(html.contains("<strong style="));
//! ```

pub mod config;
pub mod css;
mod error;
pub mod highlight;
mod parser;
pub mod renderer;
pub mod sanitize;
pub mod style;
pub mod theme;

use std::sync::LazyLock;

use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use regex::{Captures, Regex};

pub use config::Config;
pub use error::{Error, Result};
pub use highlight::Highlighter;
pub use renderer::{FootnoteLink, Footnotes, LinkPolicy, Renderer};
pub use sanitize::sanitize_html;
pub use style::{build_style_string, create_base_styles, resolve_runtime_theme};
pub use theme::{ElementKey, StyleMap, StyleValue, ThemeName, ThemeStyles};

pub const DEFAULT_PRIMARY_COLOR: &str = "#0F4C81";
pub const DEFAULT_FONT_FAMILY: &str = "-apple-system-font,BlinkMacSystemFont, Helvetica Neue, PingFang SC, Hiragino Sans GB, Microsoft YaHei UI, Microsoft YaHei, Arial, sans-serif";
pub const DEFAULT_FONT_SIZE: &str = "16px";

static FIRST_PARAGRAPH_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<p\s+style=")([^"]*)""#).expect("valid paragraph regex"));

/// Everything needed to render a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Registered theme variant name.
    pub theme: String,
    /// `#RRGGBB` replacing the theme color placeholder.
    pub primary_color: String,
    pub font_family: String,
    /// Pixel size such as `16px`; em sizes in the theme are resolved against it.
    pub font_size: String,
    /// Bundled syntax highlighting theme for code blocks.
    pub code_theme: String,
    pub links: LinkPolicy,
    /// Heading above the reference list.
    pub footnote_heading: String,
    /// Merged onto the selected variant before resolution.
    pub overrides: Option<ThemeStyles>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: ThemeName::default().to_string(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE.to_string(),
            code_theme: highlight::DEFAULT_CODE_THEME.to_string(),
            links: LinkPolicy::default(),
            footnote_heading: renderer::DEFAULT_FOOTNOTE_HEADING.to_string(),
            overrides: None,
        }
    }
}

impl RenderOptions {
    /// The selected variant with overrides merged, color and sizes resolved.
    pub fn resolve_theme(&self) -> Result<ThemeStyles> {
        let name: ThemeName = self.theme.parse()?;
        match &self.overrides {
            Some(overrides) => {
                let merged = name.styles().merge(overrides);
                style::resolve_styles(&merged, &self.primary_color, &self.font_size)
            }
            None => style::resolve_styles(name.styles(), &self.primary_color, &self.font_size),
        }
    }
}

/// Render markdown with a named theme.
///
/// Fails only on invalid options (unknown theme or code theme, malformed
/// color or font size); the markdown itself never causes an error.
pub fn render_markdown(markdown: &str, options: &RenderOptions) -> Result<String> {
    let theme = options.resolve_theme()?;
    let highlighter = Highlighter::new(&options.code_theme)?;

    Ok(assemble(
        markdown,
        Some(&theme),
        Some(options.font_family.as_str()),
        Some(options.font_size.as_str()),
        &options.links,
        &highlighter,
        &options.footnote_heading,
    ))
}

/// Render markdown with an already resolved theme, or none for bare markup.
pub fn render_with_theme(
    markdown: &str,
    theme: Option<&ThemeStyles>,
    font_family: Option<&str>,
    font_size: Option<&str>,
) -> String {
    assemble(
        markdown,
        theme,
        font_family,
        font_size,
        &LinkPolicy::default(),
        &Highlighter::default(),
        renderer::DEFAULT_FOOTNOTE_HEADING,
    )
}

fn assemble(
    markdown: &str,
    theme: Option<&ThemeStyles>,
    font_family: Option<&str>,
    font_size: Option<&str>,
    links: &LinkPolicy,
    highlighter: &Highlighter,
    footnote_heading: &str,
) -> String {
    let base_css = create_base_styles(theme, font_family, font_size);
    let mut renderer = Renderer::new(theme, &base_css, links, highlighter, footnote_heading);

    let mut html = parser::render_body(markdown, &mut renderer);
    html.push_str(&renderer.footnotes_html());

    sanitize_html(&adjust_first_paragraph_margin(&html))
}

/// Force `margin-top: 0` on the first styled paragraph.
///
/// Any existing `margin-top` declaration is dropped so the result holds exactly one.
pub fn adjust_first_paragraph_margin(html: &str) -> String {
    FIRST_PARAGRAPH_STYLE
        .replacen(html, 1, |caps: &Captures| {
            let styles = decode_html_entities(&caps[2]);
            let mut decls = css::parse_declarations(&styles);
            decls.shift_remove("margin-top");
            let rest = css::serialize_declarations(&decls);
            format!(
                "{}{}\"",
                &caps[1],
                encode_double_quoted_attribute(&format!("margin-top: 0; {rest}"))
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_paragraph_margin_replaced_once() {
        let html = r#"<h1>x</h1><p style="margin-top: 1.5em; color: red; ">a</p><p style="margin-top: 2em; ">b</p>"#;
        assert_eq!(
            adjust_first_paragraph_margin(html),
            r#"<h1>x</h1><p style="margin-top: 0; color: red; ">a</p><p style="margin-top: 2em; ">b</p>"#
        );
    }

    #[test]
    fn first_paragraph_margin_ignores_pre() {
        let html = r#"<pre style="a: b; ">x</pre>"#;
        assert_eq!(adjust_first_paragraph_margin(html), html);
    }

    #[test]
    fn overrides_are_merged_before_resolution() {
        let options = RenderOptions {
            theme: "default".to_string(),
            overrides: Some(ThemeStyles::from_toml("[elements.h1]\nfontSize = \"2em\"").unwrap()),
            ..Default::default()
        };
        let theme = options.resolve_theme().unwrap();
        let h1 = theme.element(ElementKey::H1).unwrap();
        assert_eq!(h1["fontSize"], StyleValue::from("32.0px"));
        assert_eq!(h1["borderBottom"], StyleValue::from("2px solid #0F4C81"));
    }

    #[test]
    fn invalid_options_fail_before_rendering() {
        let options = RenderOptions {
            theme: "neon".to_string(),
            ..Default::default()
        };
        assert!(matches!(render_markdown("x", &options), Err(Error::UnknownTheme(_))));

        let options = RenderOptions {
            code_theme: "neon".to_string(),
            ..Default::default()
        };
        assert!(matches!(render_markdown("x", &options), Err(Error::UnknownCodeTheme(_))));
    }

    #[test]
    fn unstyled_render() {
        assert_eq!(render_with_theme("hi *there*", None, None, None), "<p>hi <em>there</em></p>");
    }
}
