use thiserror::Error;

/// Failures surfaced when a session's epic stops.
///
/// Effect failures inside epics are expected to be turned into actions; these
/// variants cover the epic future itself ending badly.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The epic future returned an error.
    #[error("epic `{epic}` failed: {source}")]
    Epic {
        epic: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The epic task panicked or was aborted.
    #[error("epic task `{epic}` did not complete: {message}")]
    Join { epic: &'static str, message: String },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
