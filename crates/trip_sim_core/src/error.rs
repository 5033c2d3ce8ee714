use thiserror::Error;

/// Errors surfaced by the trip replay engine and its loaders.
///
/// `start` never returns these; it logs and absorbs them. They reach callers
/// through `try_start`, config loading and route parsing.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("cannot start simulation: path is empty")]
    EmptyPath,
    #[error("simulation is already running")]
    AlreadyRunning,
    #[error("no tokio runtime is active: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
