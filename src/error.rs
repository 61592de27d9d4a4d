use thiserror::Error;

/// Playback-engine errors using thiserror for structured error handling.
///
/// Only `SourceUnavailable` and `OutputUnavailable` are ever surfaced
/// synchronously to the caller (from `initialize`/`start`); everything else
/// is absorbed by the pool and reflected through the `on_stopped` callback
/// and logs.

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("audio source unavailable: {reference}")]
    SourceUnavailable {
        reference: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("failed to open audio output device")]
    OutputUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("playback engine failure: {0}")]
    Runtime(String),

    #[error("failed to release playback resources")]
    Release(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// Shorthand for a source that is missing outright (no underlying cause).
    pub fn missing_source(reference: impl Into<String>) -> Self {
        EngineError::SourceUnavailable {
            reference: reference.into(),
            source: None,
        }
    }

    /// True for errors the caller is expected to recover from by fixing or
    /// removing the referenced sound.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, EngineError::SourceUnavailable { .. })
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid fade settings: {0}")]
    Invalid(String),
}

/// Type alias for pool Results
pub type PoolResult<T> = Result<T, EngineError>;

/// Type alias for host Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
