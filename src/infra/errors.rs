// src/infra/errors.rs — Error types for flagprobe

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    // Fatal: nothing can be validated without the compiler
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Interrupted by user")]
    Interrupted,

    // Setup
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    Runtime(String),

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DiscoveryError {
    /// Whether the error must abort the whole discovery run.
    ///
    /// Probe outcomes (timeouts, rejected flags, exhausted range searches)
    /// never reach this type; everything that does is fatal except a
    /// configuration problem caught before the run starts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DiscoveryError::Config(_))
    }

    pub(crate) fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        DiscoveryError::Launch {
            program: program.into(),
            source,
        }
    }
}

pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;
