//! Configuration errors.

use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Deser(#[from] toml::de::Error),

    #[error("{0}, line {1}")]
    Syntax(String, usize),

    #[error("{0}")]
    Rule(#[from] crate::rule::Error),
}

impl Error {
    /// Attach the line number to a TOML parsing error.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        let message = err.message().to_string();

        match err.span() {
            Some(span) => {
                let start = span.start.min(source.len());
                let line = source
                    .get(..start)
                    .map(|before| before.matches('\n').count() + 1)
                    .unwrap_or(0);
                Self::Syntax(message, line)
            }
            None => Self::Syntax(message, 0),
        }
    }
}
