use html_escape::encode_double_quoted_attribute;
use log::debug;

use crate::css::{
    camel_to_kebab, em_to_px, is_size_property, parse_declarations, serialize_declarations,
};
use crate::error::{Error, Result};
use crate::theme::{ElementKey, StyleMap, StyleValue, THEME_COLOR_VAR, ThemeName, ThemeStyles};

/// Resolve a registered variant for one render.
///
/// The variant is copied, then every string leaf has the color placeholder
/// replaced with `primary_color` and, for size-named properties, its first
/// `em` length converted to pixels relative to `font_size`.
pub fn resolve_runtime_theme(
    theme: &str,
    primary_color: &str,
    font_size: &str,
) -> Result<ThemeStyles> {
    let name: ThemeName = theme.parse()?;
    resolve_styles(name.styles(), primary_color, font_size)
}

/// Same as [`resolve_runtime_theme`], for an arbitrary theme table.
pub fn resolve_styles(
    theme: &ThemeStyles,
    primary_color: &str,
    font_size: &str,
) -> Result<ThemeStyles> {
    validate_color(primary_color)?;
    let base_px = parse_pixel_size(font_size)?;
    debug!("resolving theme with color {primary_color} at {base_px}px");

    let mut resolved = theme.clone();
    resolve_leaves(&mut resolved.base, primary_color, base_px);
    for styles in resolved.elements.values_mut() {
        resolve_leaves(styles, primary_color, base_px);
    }
    Ok(resolved)
}

fn resolve_leaves(styles: &mut StyleMap, primary_color: &str, base_px: f64) {
    for (name, value) in styles.iter_mut() {
        let StyleValue::Text(text) = value else {
            continue;
        };
        if text.contains(THEME_COLOR_VAR) {
            *text = text.replace(THEME_COLOR_VAR, primary_color);
        }
        if text.contains("em") && is_size_property(name) {
            if let Some(converted) = em_to_px(text, base_px) {
                *text = converted;
            }
        }
    }
}

fn validate_color(color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidColor(color.to_string()))
    }
}

/// Parse `16px` (or a bare `16`) into a pixel count.
pub fn parse_pixel_size(size: &str) -> Result<f64> {
    let trimmed = size.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(px) if px.is_finite() && px > 0.0 => Ok(px),
        _ => Err(Error::InvalidFontSize(size.to_string())),
    }
}

/// Overlay an element's styles onto `base_css`.
///
/// Base declarations keep their order, element properties update existing
/// declarations in place or are appended. Without a theme, or when the theme
/// has no entry for `key`, `base_css` comes back unchanged.
pub fn build_style_string(theme: Option<&ThemeStyles>, key: ElementKey, base_css: &str) -> String {
    let Some(styles) = theme.and_then(|theme| theme.element(key)) else {
        return base_css.to_string();
    };

    let mut decls = parse_declarations(base_css);
    for (name, value) in styles {
        decls.insert(camel_to_kebab(name), value.to_string());
    }
    serialize_declarations(&decls)
}

/// Document-wide declarations every element style starts from.
pub fn create_base_styles(
    theme: Option<&ThemeStyles>,
    font_family: Option<&str>,
    font_size: Option<&str>,
) -> String {
    let mut css = String::new();

    if font_family.is_some() || font_size.is_some() {
        css.push_str(&format!(
            "font-family: {}; font-size: {}; ",
            font_family.unwrap_or("inherit"),
            font_size.unwrap_or("inherit")
        ));
    }

    if let Some(theme) = theme {
        for (name, value) in &theme.base {
            css.push_str(&format!("{}: {}; ", camel_to_kebab(name), value));
        }
    }

    css
}

/// Theme and base declarations shared by every element of one render.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    theme: Option<&'a ThemeStyles>,
    base_css: &'a str,
}

impl<'a> StyleContext<'a> {
    pub fn new(theme: Option<&'a ThemeStyles>, base_css: &'a str) -> Self {
        Self { theme, base_css }
    }

    pub fn theme(&self) -> Option<&'a ThemeStyles> {
        self.theme
    }

    pub fn base_css(&self) -> &'a str {
        self.base_css
    }

    /// Inline style text for `key`.
    pub fn style(&self, key: ElementKey) -> String {
        build_style_string(self.theme, key, self.base_css)
    }

    /// `<tag attrs style="...">content</tag>`
    ///
    /// Attributes with a `None` value are skipped; values are attribute-escaped.
    pub fn element(
        &self,
        key: ElementKey,
        tag: &str,
        attrs: &[(&str, Option<&str>)],
        content: &str,
    ) -> String {
        let mut out = self.open_tag(key, tag, attrs);
        out.push_str(content);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        out
    }

    /// An element without content or closing tag, such as `<img>` or `<hr>`.
    pub fn void_element(&self, key: ElementKey, tag: &str, attrs: &[(&str, Option<&str>)]) -> String {
        self.open_tag(key, tag, attrs)
    }

    fn open_tag(&self, key: ElementKey, tag: &str, attrs: &[(&str, Option<&str>)]) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(tag);
        for (name, value) in attrs {
            if let Some(value) = value {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        let style = self.style(key);
        if !style.is_empty() {
            out.push_str(" style=\"");
            out.push_str(&encode_double_quoted_attribute(&style));
            out.push('"');
        }
        out.push('>');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> StyleValue {
        StyleValue::from(value)
    }

    #[test]
    fn color_placeholder_replaced_everywhere() {
        let theme = ThemeStyles::from_toml(
            r#"
            [elements.h3]
            border = "1px solid var(--theme-color)"
            boxShadow = "0 0 1px var(--theme-color), 0 0 2px var(--theme-color)"
            color = "red"
            "#,
        )
        .unwrap();
        let resolved = resolve_styles(&theme, "#12AB9f", "16px").unwrap();
        let h3 = resolved.element(ElementKey::H3).unwrap();
        assert_eq!(h3["border"], text("1px solid #12AB9f"));
        assert_eq!(h3["boxShadow"], text("0 0 1px #12AB9f, 0 0 2px #12AB9f"));
        assert_eq!(h3["color"], text("red"));
    }

    #[test]
    fn only_size_properties_convert_em() {
        let theme = ThemeStyles::from_toml(
            r#"
            [base]
            lineHeight = "1.5em"
            [elements.p]
            fontSize = "1.5em"
            margin = "2em"
            backgroundSize = "0.5em auto"
            "#,
        )
        .unwrap();
        let resolved = resolve_styles(&theme, "#000000", "16px").unwrap();
        let p = resolved.element(ElementKey::P).unwrap();
        assert_eq!(p["fontSize"], text("24.0px"));
        assert_eq!(p["margin"], text("2em"));
        assert_eq!(p["backgroundSize"], text("8.0px auto"));
        assert_eq!(resolved.base["lineHeight"], text("1.5em"));
    }

    #[test]
    fn registered_theme_is_copied_not_mutated() {
        let resolved = resolve_runtime_theme("default", "#ff0000", "16px").unwrap();
        let strong = resolved.element(ElementKey::Strong).unwrap();
        assert_eq!(strong["color"], text("#ff0000"));

        let pristine = ThemeName::Default.styles().element(ElementKey::Strong).unwrap();
        assert_eq!(pristine["color"], text(THEME_COLOR_VAR));
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        assert!(matches!(
            resolve_runtime_theme("neon", "#000000", "16px"),
            Err(Error::UnknownTheme(_))
        ));
        assert!(matches!(
            resolve_runtime_theme("default", "blue", "16px"),
            Err(Error::InvalidColor(_))
        ));
        assert!(matches!(
            resolve_runtime_theme("default", "#000000", "big"),
            Err(Error::InvalidFontSize(_))
        ));
        assert_eq!(parse_pixel_size("15px").unwrap(), 15.0);
        assert_eq!(parse_pixel_size(" 18 ").unwrap(), 18.0);
    }

    #[test]
    fn base_styles_lead_with_fonts() {
        let theme = ThemeName::Default.styles();
        assert_eq!(
            create_base_styles(Some(theme), Some("Arial"), None),
            "font-family: Arial; font-size: inherit; line-height: 1.6; "
        );
        assert_eq!(create_base_styles(None, None, None), "");
    }

    #[test]
    fn element_styles_overlay_base() {
        let theme = ThemeStyles::from_toml(
            r#"
            [elements.p]
            lineHeight = "2"
            textAlign = "justify"
            "#,
        )
        .unwrap();
        let css = build_style_string(Some(&theme), ElementKey::P, "font-size: 16px; line-height: 1.6;");
        assert_eq!(css, "font-size: 16px; line-height: 2; text-align: justify; ");
    }

    #[test]
    fn missing_element_falls_back_to_base() {
        let theme = ThemeStyles::default();
        let base = "font-size: 16px;";
        assert_eq!(build_style_string(Some(&theme), ElementKey::Td, base), base);
        assert_eq!(build_style_string(None, ElementKey::Td, base), base);
    }

    #[test]
    fn elements_render_attributes_and_style() {
        let theme = ThemeStyles::from_toml("[elements.a]\ncolor = \"red\"").unwrap();
        let ctx = StyleContext::new(Some(&theme), "");
        assert_eq!(
            ctx.element(ElementKey::A, "a", &[("href", Some("/x?a=1&b=\"2\"")), ("title", None)], "go"),
            r#"<a href="/x?a=1&amp;b=&quot;2&quot;" style="color: red; ">go</a>"#
        );

        let bare = StyleContext::new(None, "");
        assert_eq!(bare.void_element(ElementKey::Hr, "hr", &[]), "<hr>");
    }
}
