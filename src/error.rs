use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building sinks from configuration.
///
/// The write path itself reports [`std::io::Error`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("rotation interval must be non-zero")]
    InvalidInterval,

    #[error("invalid `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to parse log config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to open log file `{}`: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl Error {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
