use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};

static BUILTIN_THEMES: &str = include_str!("themes.toml");

static REGISTRY: LazyLock<ThemeRegistry> = LazyLock::new(|| {
    ThemeRegistry::from_toml(BUILTIN_THEMES).expect("themes.toml is validated by build.rs")
});

/// Placeholder replaced with the primary color during runtime resolution.
pub const THEME_COLOR_VAR: &str = "var(--theme-color)";

/// Every styleable construct, including sub-parts such as `blockquote_p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKey {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    P,
    Blockquote,
    BlockquoteP,
    Code,
    CodeSpan,
    PreCode,
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Th,
    Td,
    A,
    PlatformLink,
    Img,
    Figcaption,
    Hr,
    Strong,
    Em,
    Del,
    Footnotes,
}

impl ElementKey {
    pub const ALL: [ElementKey; 28] = [
        ElementKey::H1,
        ElementKey::H2,
        ElementKey::H3,
        ElementKey::H4,
        ElementKey::H5,
        ElementKey::H6,
        ElementKey::P,
        ElementKey::Blockquote,
        ElementKey::BlockquoteP,
        ElementKey::Code,
        ElementKey::CodeSpan,
        ElementKey::PreCode,
        ElementKey::Ul,
        ElementKey::Ol,
        ElementKey::Li,
        ElementKey::Table,
        ElementKey::Tr,
        ElementKey::Th,
        ElementKey::Td,
        ElementKey::A,
        ElementKey::PlatformLink,
        ElementKey::Img,
        ElementKey::Figcaption,
        ElementKey::Hr,
        ElementKey::Strong,
        ElementKey::Em,
        ElementKey::Del,
        ElementKey::Footnotes,
    ];

    /// Style key for a heading level. Levels outside 1-6 have none.
    pub fn heading(level: u8) -> Option<ElementKey> {
        match level {
            1 => Some(ElementKey::H1),
            2 => Some(ElementKey::H2),
            3 => Some(ElementKey::H3),
            4 => Some(ElementKey::H4),
            5 => Some(ElementKey::H5),
            6 => Some(ElementKey::H6),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKey::H1 => "h1",
            ElementKey::H2 => "h2",
            ElementKey::H3 => "h3",
            ElementKey::H4 => "h4",
            ElementKey::H5 => "h5",
            ElementKey::H6 => "h6",
            ElementKey::P => "p",
            ElementKey::Blockquote => "blockquote",
            ElementKey::BlockquoteP => "blockquote_p",
            ElementKey::Code => "code",
            ElementKey::CodeSpan => "code_span",
            ElementKey::PreCode => "pre_code",
            ElementKey::Ul => "ul",
            ElementKey::Ol => "ol",
            ElementKey::Li => "li",
            ElementKey::Table => "table",
            ElementKey::Tr => "tr",
            ElementKey::Th => "th",
            ElementKey::Td => "td",
            ElementKey::A => "a",
            ElementKey::PlatformLink => "platform_link",
            ElementKey::Img => "img",
            ElementKey::Figcaption => "figcaption",
            ElementKey::Hr => "hr",
            ElementKey::Strong => "strong",
            ElementKey::Em => "em",
            ElementKey::Del => "del",
            ElementKey::Footnotes => "footnotes",
        }
    }
}

impl FromStr for ElementKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ElementKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::UnknownElement(s.to_string()))
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single style property value: a literal string or a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Text(text) => f.write_str(text),
            StyleValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

/// camelCase property name → value, in declaration order.
pub type StyleMap = IndexMap<String, StyleValue>;

/// A complete (or, for overrides, partial) theme table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawTheme")]
pub struct ThemeStyles {
    pub base: StyleMap,
    pub elements: BTreeMap<ElementKey, StyleMap>,
}

/// Serialized form; element names are checked against [`ElementKey`].
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawTheme {
    base: StyleMap,
    elements: IndexMap<String, StyleMap>,
}

impl TryFrom<RawTheme> for ThemeStyles {
    type Error = Error;

    fn try_from(raw: RawTheme) -> Result<Self> {
        let mut elements = BTreeMap::new();
        for (name, styles) in raw.elements {
            elements.insert(name.parse::<ElementKey>()?, styles);
        }
        Ok(Self {
            base: raw.base,
            elements,
        })
    }
}

impl ThemeStyles {
    /// Parse a theme (or a partial override table) from TOML.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(Error::Theme)
    }

    /// Style map for an element, if the theme defines one.
    pub fn element(&self, key: ElementKey) -> Option<&StyleMap> {
        self.elements.get(&key)
    }

    /// Deep-merge `overrides` onto a copy of `self`.
    ///
    /// Properties are merged key by key with the override winning; elements
    /// absent from `self` are added verbatim.
    pub fn merge(&self, overrides: &ThemeStyles) -> ThemeStyles {
        let mut merged = self.clone();
        merge_styles(&mut merged.base, &overrides.base);
        for (key, styles) in &overrides.elements {
            merge_styles(merged.elements.entry(*key).or_default(), styles);
        }
        merged
    }
}

fn merge_styles(target: &mut StyleMap, overrides: &StyleMap) {
    for (name, value) in overrides {
        target.insert(name.clone(), value.clone());
    }
}

/// The closed set of registered theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemeName {
    Default,
    Classic,
    Grace,
    #[default]
    Simple,
}

impl ThemeName {
    pub const ALL: [ThemeName; 4] = [
        ThemeName::Default,
        ThemeName::Classic,
        ThemeName::Grace,
        ThemeName::Simple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Default => "default",
            ThemeName::Classic => "classic",
            ThemeName::Grace => "grace",
            ThemeName::Simple => "simple",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ThemeName::Default => "base theme, suits most articles",
            ThemeName::Classic => "base theme with roomier headings",
            ThemeName::Grace => "soft shadows and rounded accents",
            ThemeName::Simple => "clean and minimal",
        }
    }

    /// The fully merged style table for this variant.
    pub fn styles(self) -> &'static ThemeStyles {
        REGISTRY.get(self)
    }
}

impl FromStr for ThemeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ThemeName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownTheme(s.to_string()))
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical base table every variant derives from.
pub fn base_theme() -> &'static ThemeStyles {
    ThemeName::Default.styles()
}

/// Deep-merge `overrides` onto the base table.
pub fn derive_variant(overrides: &ThemeStyles) -> ThemeStyles {
    base_theme().merge(overrides)
}

/// Look up a registered variant by name.
pub fn lookup(name: &str) -> Result<&'static ThemeStyles> {
    Ok(name.parse::<ThemeName>()?.styles())
}

struct ThemeRegistry {
    variants: [ThemeStyles; 4],
}

impl ThemeRegistry {
    fn from_toml(source: &str) -> Result<Self> {
        let mut tables: IndexMap<String, ThemeStyles> =
            toml::from_str(source).map_err(Error::Theme)?;

        let base = tables
            .shift_remove(ThemeName::Default.as_str())
            .unwrap_or_default();
        let mut derive = |name: ThemeName| {
            let overrides = tables.shift_remove(name.as_str()).unwrap_or_default();
            base.merge(&overrides)
        };

        let classic = derive(ThemeName::Classic);
        let grace = derive(ThemeName::Grace);
        let simple = derive(ThemeName::Simple);
        if let Some(name) = tables.keys().next() {
            return Err(Error::UnknownTheme(name.clone()));
        }

        Ok(Self {
            variants: [base, classic, grace, simple],
        })
    }

    fn get(&self, name: ThemeName) -> &ThemeStyles {
        match name {
            ThemeName::Default => &self.variants[0],
            ThemeName::Classic => &self.variants[1],
            ThemeName::Grace => &self.variants[2],
            ThemeName::Simple => &self.variants[3],
        }
    }
}
