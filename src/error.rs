use thiserror::Error;

use crate::world::EntityId;

/// Failure raised while a script task is executing.
///
/// `Cancelled` is the expected outcome of Stop or a restarted run and is
/// swallowed at the task boundary. Every other variant is a fault: it ends
/// the raising task and is reported on the console.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("script cancelled")]
    Cancelled,
    #[error("{block} expected a number but got '{found}'")]
    TypeMismatch { block: &'static str, found: String },
    #[error("unknown backdrop '{0}'")]
    UnknownBackdrop(String),
    #[error("entity {0} no longer exists")]
    MissingSubject(EntityId),
}

impl ScriptError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScriptError::Cancelled)
    }
}

/// A script document that could not be decoded.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed script document: {0}")]
    Malformed(#[from] serde_json::Error),
}
