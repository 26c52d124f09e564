//! Structurer error types.
//!
//! Grounded on `codegen/error.rs`'s `CodegenError` in shape (one flat
//! `thiserror` enum covering every failure mode of the pipeline it fronts),
//! with the LLVM/linker-specific variants replaced by the structurer's own
//! failure modes.

use decompiler_core::{CoreError, StructId};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum StructureError {
    /// A function has no entry block to seed the structured graph from.
    #[error("function has no entry block")]
    MissingEntryBlock,

    /// Loop discovery found a back edge whose head is unreachable from the
    /// function entry.
    #[error("unreachable loop head: {head:?}")]
    UnreachableLoopHead { head: StructId },

    /// `collapseAll` ran to its pass budget without reaching a single
    /// isolated root.
    #[error("structuring did not converge within {passes} passes, {remaining} blocks unresolved")]
    NoFixpoint { passes: u32, remaining: usize },

    /// After collapse, more than one node remains with no further rule
    /// applicable -- an irreducible remnant TraceDAG couldn't resolve.
    #[error("unstructured remnant: {remaining} block(s) could not be collapsed")]
    UnstructuredRemnant { remaining: usize },

    /// A structural invariant of the underlying IR was violated.
    #[error(transparent)]
    Core(#[from] CoreError),
}
