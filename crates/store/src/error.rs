//! Store error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by [`crate::FileStore`] operations.
///
/// Corruption found on the read path is *not* represented here: it is healed
/// in place (logged, file reset to the empty default) rather than surfaced.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Disk I/O failed for a reason other than "file absent".
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be serialized for writing.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The document handed to the write path does not have the required
    /// collection-file shape.
    #[error("invalid collection structure: {0}")]
    InvalidStructure(String),

    /// An insert would duplicate an existing document ID.
    #[error("duplicate document id: {0}")]
    DuplicateId(Uuid),

    /// A lookup by ID found nothing.
    #[error("document not found: {0}")]
    NotFound(Uuid),
}
