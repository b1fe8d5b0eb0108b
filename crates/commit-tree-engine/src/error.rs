//! Error types for the engine.

use thiserror::Error;

use crate::controller::TreeId;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors the engine can report.
///
/// Graph mutations themselves are total; these only cover callers handing
/// the engine something it never issued or cannot parse.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A tree id that was never registered with the controller.
    #[error("unknown tree: {0:?}")]
    UnknownTree(TreeId),

    /// A tree kind name that is neither `local` nor `remote`.
    #[error("unknown tree kind {name:?} (expected local or remote)")]
    UnknownTreeKind { name: String },
}
