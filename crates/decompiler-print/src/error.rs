//! Errors raised by prototype resolution, override application, and
//! printing. Grounded on `server/error.rs`'s single flat `thiserror` enum
//! shape, trimmed to the failure modes this crate's narrower surface
//! (no HTTP, no persistence) actually has.

use decompiler_analysis::AnalysisError;
use decompiler_core::{Address, CoreError, TypeId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrintError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// A storage-assignment rule was applied to a prototype whose input
    /// storage is locked.
    #[error("cannot reassign {what}: prototype is locked")]
    PrototypeLocked { what: &'static str },

    /// A `Override::Prototype` named a call-spec model that isn't
    /// registered.
    #[error("unknown call-spec model: '{model}'")]
    UnknownCallSpecModel { model: String },

    /// An override referenced an address with no p-code op.
    #[error("no op at address referenced by override: {address:?}")]
    OverrideTargetNotFound { address: Address },

    /// A union-facet directive named a field that doesn't exist on the
    /// accessed type.
    #[error("unknown union facet '{field}' on type {type_id}")]
    UnknownUnionFacet { field: String, type_id: TypeId },

    /// A structured-block id referenced by `structured_root`/a child list
    /// has no node in the structured graph.
    #[error("struct block not found: StructId({})", id.0)]
    StructNotFound { id: decompiler_core::StructId },
}
