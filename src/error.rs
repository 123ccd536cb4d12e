use std::path::PathBuf;

/// Errors surfaced to callers before rendering starts.
///
/// Rendering itself never fails: unknown code languages, missing element
/// styles and disallowed markup all degrade locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown theme `{0}` (expected one of: default, classic, grace, simple)")]
    UnknownTheme(String),

    #[error("unknown theme element `{0}`")]
    UnknownElement(String),

    #[error("unknown code theme `{0}`")]
    UnknownCodeTheme(String),

    #[error("invalid primary color `{0}`, expected #RRGGBB")]
    InvalidColor(String),

    #[error("invalid font size `{0}`, expected a positive pixel value such as 16px")]
    InvalidFontSize(String),

    #[error("invalid theme table: {0}")]
    Theme(#[source] toml::de::Error),

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
