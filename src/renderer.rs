use std::sync::LazyLock;

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use log::trace;
use regex::{Captures, Regex};

use crate::highlight::Highlighter;
use crate::style::{StyleContext, build_style_string};
use crate::theme::{ElementKey, ThemeStyles};

static PARAGRAPH_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p(\s[^>]*)?>").expect("valid paragraph regex"));
static STYLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"style="([^"]*)""#).expect("valid style regex"));
static INLINE_FORMATTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(strong|em|del|s|code)[\s>]").expect("valid formatting regex")
});

/// Decorative window-control dots placed above every code block.
const WINDOW_CONTROLS_SVG: &str = concat!(
    r#"<svg width="45px" height="13px" viewBox="0 0 450 130">"#,
    r#"<ellipse cx="50" cy="65" rx="50" ry="52" stroke="rgb(220,60,54)" stroke-width="2" fill="rgb(237,108,96)"></ellipse>"#,
    r#"<ellipse cx="225" cy="65" rx="50" ry="52" stroke="rgb(218,151,33)" stroke-width="2" fill="rgb(247,193,81)"></ellipse>"#,
    r#"<ellipse cx="400" cy="65" rx="50" ry="52" stroke="rgb(27,161,37)" stroke-width="2" fill="rgb(100,200,86)"></ellipse>"#,
    "</svg>"
);

pub const DEFAULT_PLATFORM_PREFIX: &str = "https://mp.weixin.qq.com";
pub const DEFAULT_FOOTNOTE_HEADING: &str = "引用链接";

/// Decides which links stay clickable.
///
/// Links whose href starts with one of the platform prefixes render as real
/// anchors; everything else becomes a numbered footnote.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPolicy {
    pub platform_prefixes: Vec<String>,
}

impl LinkPolicy {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platform_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_platform_link(&self, href: &str) -> bool {
        self.platform_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && href.starts_with(prefix.as_str()))
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self::new([DEFAULT_PLATFORM_PREFIX])
    }
}

/// A link deferred to the reference list at the end of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteLink {
    pub href: String,
    pub title: Option<String>,
    /// Rendered link text (HTML).
    pub text: String,
}

/// Ordered footnotes of one render; indices are 1-based push positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Footnotes {
    links: Vec<FootnoteLink>,
}

impl Footnotes {
    /// Append a link and return its index.
    pub fn push(&mut self, link: FootnoteLink) -> usize {
        self.links.push(link);
        self.links.len()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FootnoteLink)> {
        self.links.iter().enumerate().map(|(i, link)| (i + 1, link))
    }

    /// `[n] text: href "title"` entries joined by line breaks.
    fn entries_html(&self) -> String {
        self.iter()
            .map(|(index, link)| {
                let marker = format!(r#"<code style="font-size: 90%; opacity: 0.6;">[{index}]</code>"#);
                let href = encode_text(&link.href);
                // Autolinks show the URL once; their label is the escaped href
                if decode_html_entities(&link.text) == link.href {
                    format!(r#"{marker}: <i style="word-break: break-all">{href}</i>"#)
                } else {
                    let title = link
                        .title
                        .as_deref()
                        .map(|title| format!(" \"{}\"", encode_text(title)))
                        .unwrap_or_default();
                    format!(
                        r#"{marker} {}: <i style="word-break: break-all">{href}{title}</i>"#,
                        link.text
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("<br>\n")
    }
}

/// Emits inline-styled HTML for every Markdown construct of one document.
///
/// The footnote list is the only mutable state; everything else is fixed at
/// construction.
pub struct Renderer<'a> {
    style: StyleContext<'a>,
    links: &'a LinkPolicy,
    highlighter: &'a Highlighter,
    footnote_heading: &'a str,
    footnotes: Footnotes,
}

impl<'a> Renderer<'a> {
    pub fn new(
        theme: Option<&'a ThemeStyles>,
        base_css: &'a str,
        links: &'a LinkPolicy,
        highlighter: &'a Highlighter,
        footnote_heading: &'a str,
    ) -> Self {
        Self {
            style: StyleContext::new(theme, base_css),
            links,
            highlighter,
            footnote_heading,
            footnotes: Footnotes::default(),
        }
    }

    pub fn footnotes(&self) -> &Footnotes {
        &self.footnotes
    }

    /// Text is escaped by the caller's grammar layer and passed through.
    pub fn text(&self, text: &str) -> String {
        text.to_string()
    }

    pub fn html(&self, html: &str) -> String {
        html.to_string()
    }

    pub fn paragraph(&self, text: &str) -> String {
        self.style.element(ElementKey::P, "p", &[], text)
    }

    /// Levels outside 1-6 get only the base styles.
    pub fn heading(&self, level: u8, text: &str) -> String {
        let tag = format!("h{}", level);
        match ElementKey::heading(level) {
            Some(key) => self.style.element(key, &tag, &[], text),
            None => self.element_with_base(&tag, text),
        }
    }

    /// Wrap a quote and give every paragraph inside it the `blockquote_p` style.
    pub fn blockquote(&self, quote: &str) -> String {
        let quote = match self.style.theme() {
            Some(theme) if theme.element(ElementKey::BlockquoteP).is_some() => {
                let extra = build_style_string(Some(theme), ElementKey::BlockquoteP, "");
                restyle_paragraphs(quote, &extra)
            }
            _ => quote.to_string(),
        };
        self.style.element(ElementKey::Blockquote, "blockquote", &[], &quote)
    }

    pub fn list(&self, body: &str, ordered: bool) -> String {
        if ordered {
            self.style.element(ElementKey::Ol, "ol", &[], body)
        } else {
            self.style.element(ElementKey::Ul, "ul", &[], body)
        }
    }

    /// Items with inline formatting get an unstyled inner `<p>` block.
    ///
    /// Items holding a code block are left alone, a `<pre>` cannot sit in a `<p>`.
    pub fn list_item(&self, text: &str) -> String {
        if INLINE_FORMATTING.is_match(text) && !text.contains("<pre") {
            let wrapped = format!(r#"<p style="margin:0;padding:0;">{text}</p>"#);
            self.style.element(ElementKey::Li, "li", &[], &wrapped)
        } else {
            self.style.element(ElementKey::Li, "li", &[], text)
        }
    }

    pub fn task_marker(&self, checked: bool) -> String {
        if checked {
            r#"<input type="checkbox" disabled="" checked=""> "#.to_string()
        } else {
            r#"<input type="checkbox" disabled=""> "#.to_string()
        }
    }

    /// Platform links stay anchors; anything else becomes a footnote reference.
    pub fn link(&mut self, href: &str, title: Option<&str>, text: &str) -> String {
        if self.links.is_platform_link(href) {
            return self.style.element(
                ElementKey::PlatformLink,
                "a",
                &[
                    ("href", Some(href)),
                    ("title", Some(title.unwrap_or(text))),
                    ("target", Some("_blank")),
                ],
                text,
            );
        }

        let index = self.footnotes.push(FootnoteLink {
            href: href.to_string(),
            title: title.map(str::to_string),
            text: text.to_string(),
        });
        trace!("footnote [{index}] -> {href}");

        let index_attr = index.to_string();
        self.style.element(
            ElementKey::A,
            "span",
            &[("data-index", Some(index_attr.as_str()))],
            &format!("{text} <sup>[{index}]</sup>"),
        )
    }

    pub fn image(&self, src: &str, title: Option<&str>, alt: &str) -> String {
        self.style.void_element(
            ElementKey::Img,
            "img",
            &[("src", Some(src)), ("alt", Some(alt)), ("title", title)],
        )
    }

    pub fn table(&self, header: &str, body: &str) -> String {
        let content = format!("<thead>{header}</thead><tbody>{body}</tbody>");
        self.style.element(ElementKey::Table, "table", &[], &content)
    }

    pub fn table_row(&self, content: &str) -> String {
        self.style.element(ElementKey::Tr, "tr", &[], content)
    }

    pub fn table_cell(&self, content: &str, header: bool) -> String {
        if header {
            self.style.element(ElementKey::Th, "th", &[], content)
        } else {
            self.style.element(ElementKey::Td, "td", &[], content)
        }
    }

    pub fn strong(&self, text: &str) -> String {
        self.style.element(ElementKey::Strong, "strong", &[], text)
    }

    pub fn emphasis(&self, text: &str) -> String {
        self.style.element(ElementKey::Em, "em", &[], text)
    }

    pub fn strikethrough(&self, text: &str) -> String {
        self.style.element(ElementKey::Del, "del", &[], text)
    }

    pub fn rule(&self) -> String {
        self.style.void_element(ElementKey::Hr, "hr", &[])
    }

    /// Unstyled on purpose.
    pub fn line_break(&self) -> String {
        "<br>".to_string()
    }

    /// Inline code; `code` is raw text.
    pub fn code_span(&self, code: &str) -> String {
        self.style
            .element(ElementKey::CodeSpan, "code", &[], &encode_text(code))
    }

    /// Highlighted code block in a window-style frame.
    pub fn code_block(&self, code: &str, language: Option<&str>) -> String {
        let code = code.strip_suffix('\n').unwrap_or(code);
        let highlighted = self.highlighter.highlight(code, language);

        let class = format!("language-{}", highlighted.language);
        let code_html = self.style.element(
            ElementKey::Code,
            "code",
            &[("class", Some(class.as_str()))],
            &highlighted.html,
        );
        let controls = format!(
            r#"<span class="mac-sign" style="padding:4px;display:flex;">{WINDOW_CONTROLS_SVG}</span>"#
        );

        self.style.element(
            ElementKey::PreCode,
            "pre",
            &[("class", Some("hljs"))],
            &format!("{controls}{code_html}"),
        )
    }

    /// Reference list for every footnoted link, or nothing when there are none.
    pub fn footnotes_html(&self) -> String {
        if self.footnotes.is_empty() {
            return String::new();
        }
        let heading = self
            .style
            .element(ElementKey::H4, "h4", &[], &encode_text(self.footnote_heading));
        let content =
            self.style
                .element(ElementKey::Footnotes, "p", &[], &self.footnotes.entries_html());
        heading + &content
    }

    fn element_with_base(&self, tag: &str, content: &str) -> String {
        // Without a theme every key resolves to the shared declarations.
        StyleContext::new(None, self.style.base_css()).element(ElementKey::P, tag, &[], content)
    }
}

/// Add `extra` declarations to every `<p>` tag in `html`.
fn restyle_paragraphs(html: &str, extra: &str) -> String {
    let extra_attr = encode_double_quoted_attribute(extra);
    PARAGRAPH_TAG
        .replace_all(html, |caps: &Captures| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            if STYLE_ATTR.is_match(attrs) {
                let attrs = STYLE_ATTR.replace(attrs, |style: &Captures| {
                    let existing = style[1].trim_end();
                    if existing.is_empty() || existing.ends_with(';') {
                        format!(r#"style="{existing} {extra_attr}""#)
                    } else {
                        format!(r#"style="{existing}; {extra_attr}""#)
                    }
                });
                format!("<p{attrs}>")
            } else {
                format!(r#"<p{attrs} style="{extra_attr}">"#)
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn theme() -> ThemeStyles {
        ThemeStyles::from_toml(
            r#"
            [elements.p]
            margin = "1em"
            [elements.blockquote_p]
            color = "gray"
            [elements.a]
            color = "blue"
            [elements.strong]
            fontWeight = "bold"
            "#,
        )
        .unwrap()
    }

    fn with_renderer<T>(f: impl FnOnce(&mut Renderer<'_>) -> T) -> T {
        let theme = theme();
        let links = LinkPolicy::default();
        let highlighter = Highlighter::default();
        let mut renderer = Renderer::new(Some(&theme), "", &links, &highlighter, "References");
        f(&mut renderer)
    }

    #[test]
    fn paragraph_and_heading() {
        with_renderer(|r| {
            assert_eq!(r.paragraph("hi"), r#"<p style="margin: 1em; ">hi</p>"#);
            assert_eq!(r.heading(2, "Title"), "<h2>Title</h2>");
        });
    }

    #[test]
    fn heading_without_style_uses_base_only() {
        let links = LinkPolicy::default();
        let highlighter = Highlighter::default();
        let theme = theme();
        let r = Renderer::new(Some(&theme), "font-size: 16px; ", &links, &highlighter, "");
        assert_eq!(r.heading(7, "x"), r#"<h7 style="font-size: 16px; ">x</h7>"#);
    }

    #[test]
    fn blockquote_paragraphs_get_extra_style() {
        with_renderer(|r| {
            let quote = format!("{}<p class=\"x\">b</p>", r.paragraph("a"));
            assert_eq!(
                r.blockquote(&quote),
                concat!(
                    r#"<blockquote><p style="margin: 1em; color: gray; ">a</p>"#,
                    r#"<p class="x" style="color: gray; ">b</p></blockquote>"#
                )
            );
        });
    }

    #[test]
    fn blockquote_leaves_pre_alone() {
        assert_eq!(restyle_paragraphs("<pre>x</pre><p>y</p>", "a: b; "), "<pre>x</pre><p style=\"a: b; \">y</p>");
    }

    #[test]
    fn list_items_with_formatting_get_inner_block() {
        with_renderer(|r| {
            assert_eq!(r.list_item("plain"), "<li>plain</li>");
            let bold = r.strong("b");
            assert_eq!(
                r.list_item(&bold),
                r#"<li><p style="margin:0;padding:0;"><strong style="font-weight: bold; ">b</strong></p></li>"#
            );
            assert_eq!(r.list("<li>x</li>", true), "<ol><li>x</li></ol>");
        });
    }

    #[test]
    fn list_items_with_code_blocks_are_not_wrapped() {
        with_renderer(|r| {
            let item = format!("<p>intro</p>{}", r.code_block("x\n", None));
            let html = r.list_item(&item);
            assert!(!html.contains("margin:0;padding:0;"), "{html}");
            assert!(html.starts_with("<li><p>intro</p><pre"), "{html}");
        });
    }

    #[test]
    fn external_links_become_numbered_footnotes() {
        with_renderer(|r| {
            let a = r.link("http://a.test", None, "A");
            let b = r.link("http://b.test", Some("Bee"), "B");
            assert_eq!(
                a,
                r#"<span data-index="1" style="color: blue; ">A <sup>[1]</sup></span>"#
            );
            assert!(b.contains("<sup>[2]</sup>"));
            let indices: Vec<_> = r.footnotes().iter().map(|(i, l)| (i, l.text.clone())).collect();
            assert_eq!(indices, [(1, "A".to_string()), (2, "B".to_string())]);

            let html = r.footnotes_html();
            assert!(html.starts_with("<h4>References</h4>"));
            assert!(html.contains(r#"[2]</code> B: <i style="word-break: break-all">http://b.test "Bee"</i>"#));
            assert!(html.contains("<br>\n"));
        });
    }

    #[test]
    fn bare_url_footnote_omits_text() {
        with_renderer(|r| {
            r.link("http://a.test", None, "http://a.test");
            assert!(r.footnotes_html().contains(
                r#"[1]</code>: <i style="word-break: break-all">http://a.test</i>"#
            ));
        });
    }

    #[test]
    fn escaped_autolink_label_matches_its_url() {
        with_renderer(|r| {
            r.link("http://a.test/?x=1&y=2", None, "http://a.test/?x=1&amp;y=2");
            r.link("http://b.test/?x=1&y=2", None, "other");
            assert_eq!(r.footnotes().len(), 2);

            let html = r.footnotes_html();
            assert!(html.contains(
                r#"[1]</code>: <i style="word-break: break-all">http://a.test/?x=1&amp;y=2</i>"#
            ), "{html}");
            assert!(html.contains(
                r#"[2]</code> other: <i style="word-break: break-all">http://b.test/?x=1&amp;y=2</i>"#
            ), "{html}");
        });
    }

    #[test]
    fn platform_links_stay_clickable() {
        with_renderer(|r| {
            let html = r.link("https://mp.weixin.qq.com/s/abc", None, "post");
            assert_eq!(
                html,
                r#"<a href="https://mp.weixin.qq.com/s/abc" title="post" target="_blank">post</a>"#
            );
            assert!(r.footnotes().is_empty());
            assert_eq!(r.footnotes_html(), "");
        });
    }

    #[test]
    fn code_block_is_framed() {
        with_renderer(|r| {
            let html = r.code_block("let x = 1;\n", Some("rust"));
            assert!(html.starts_with(r#"<pre class="hljs">"#));
            assert!(html.contains(r#"<span class="mac-sign""#));
            assert!(html.contains(r#"<code class="language-rust">"#));
            assert!(html.ends_with("</code></pre>"));
        });
    }

    #[test]
    fn small_constructs() {
        with_renderer(|r| {
            assert_eq!(r.line_break(), "<br>");
            assert_eq!(r.rule(), "<hr>");
            assert_eq!(r.code_span("a<b"), "<code>a&lt;b</code>");
            assert_eq!(
                r.image("/a.png", None, "pic"),
                r#"<img src="/a.png" alt="pic">"#
            );
            assert_eq!(
                r.table(&r.table_row(&r.table_cell("h", true)), &r.table_row(&r.table_cell("d", false))),
                "<table><thead><tr><th>h</th></tr></thead><tbody><tr><td>d</td></tr></tbody></table>"
            );
        });
    }
}
