//! Errors produced by the element/attribute codec and override store.
//!
//! Follows the one-flat-`thiserror`-enum shape used for storage-layer
//! errors elsewhere in this workspace, covering every failure mode of the
//! layer it fronts, with the SQL-row-shaped variants replaced by
//! stream-decode variants.

use thiserror::Error;

use decompiler_core::CoreError;

#[derive(Debug, Error)]
pub enum IoError {
    /// The stream ended while a value was still expected.
    #[error("unexpected end of stream while decoding {0}")]
    UnexpectedEof(&'static str),

    /// A tag byte didn't match any known `ElementId`/`AttributeId`.
    #[error("unknown element tag: {0}")]
    UnknownElement(u8),

    #[error("unknown attribute tag: {0}")]
    UnknownAttribute(u8),

    /// A value decoded out of range for its target type (e.g. a
    /// discriminant byte with no corresponding enum variant).
    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    /// An element was expected but a different one was read.
    #[error("expected element {expected:?}, found {found:?}")]
    UnexpectedElement { expected: u8, found: u8 },

    /// Decoding succeeded but the reconstructed value violates a core
    /// invariant.
    #[error(transparent)]
    Core(#[from] CoreError),
}
