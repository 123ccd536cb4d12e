use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::renderer::{DEFAULT_FOOTNOTE_HEADING, DEFAULT_PLATFORM_PREFIX, LinkPolicy};
use crate::theme::ThemeStyles;
use crate::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_PRIMARY_COLOR, RenderOptions};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    pub primary_color: String,
    pub font_family: String,
    pub font_size: String,
    pub code_theme: String,
    pub links: LinksConfig,
    pub footnotes: FootnotesConfig,
    /// Partial theme merged onto the selected variant.
    pub overrides: Option<ThemeStyles>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: crate::ThemeName::default().to_string(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE.to_string(),
            code_theme: crate::highlight::DEFAULT_CODE_THEME.to_string(),
            links: LinksConfig::default(),
            footnotes: FootnotesConfig::default(),
            overrides: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Links starting with any of these stay clickable anchors.
    pub platform_prefixes: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            platform_prefixes: vec![DEFAULT_PLATFORM_PREFIX.to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FootnotesConfig {
    pub heading: String,
}

impl Default for FootnotesConfig {
    fn default() -> Self {
        Self {
            heading: DEFAULT_FOOTNOTE_HEADING.to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(Error::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Options for [`crate::render_markdown`]; values are validated at render time.
    pub fn to_options(&self) -> RenderOptions {
        RenderOptions {
            theme: self.theme.clone(),
            primary_color: self.primary_color.clone(),
            font_family: self.font_family.clone(),
            font_size: self.font_size.clone(),
            code_theme: self.code_theme.clone(),
            links: LinkPolicy::new(self.links.platform_prefixes.iter().cloned()),
            footnote_heading: self.footnotes.heading.clone(),
            overrides: self.overrides.clone(),
        }
    }
}
