//! Error types for the intake flow.

use crate::intake::registry::StepId;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Session API error: {0}")]
    Api(#[from] ApiError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors talking to the remote session store.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session request failed: {0}")]
    Request(String),

    #[error("Session store returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Anonymous session not found")]
    NotFound,

    #[error("Invalid response from session store: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Message suitable for showing next to the step that failed.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Answer synchronization errors. The cache has already been rolled back
/// when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to save answer for step {step}: {source}")]
    Remote {
        step: StepId,
        #[source]
        source: ApiError,
    },
}

impl SyncError {
    pub fn step(&self) -> StepId {
        match self {
            Self::Remote { step, .. } => *step,
        }
    }
}

/// Errors surfaced by the intake flow façade.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Step does not exist: {0}")]
    UnknownStep(String),

    #[error("Invalid answer for step {step}: {reason}")]
    InvalidAnswer { step: StepId, reason: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Session error: {0}")]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Field-level answer parsing errors. These never reach the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please enter an answer.")]
    Empty,

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Please enter a whole number.")]
    NotANumber,

    #[error("Please answer yes or no.")]
    NotYesNo,
}

/// Result type alias for the intake flow.
pub type Result<T, E = Error> = std::result::Result<T, E>;
