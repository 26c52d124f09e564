//! Core error types for decompiler-core.
//!
//! [`CoreError`] covers the IR store's own failure modes (missing entities,
//! structural invariant violations). [`DecompError`] is the closed error
//! taxonomy of spec.md §7 -- every error that crosses an `Action`/driver
//! boundary is one of these four kinds, never a bare string.

use thiserror::Error;

use crate::datatype::TypeId;
use crate::id::{BlockId, FunctionId, PcodeOpId, SpaceId, SymbolId, VarnodeId};
use crate::seqnum::SeqNum;

/// Errors produced by the decompiler-core IR store and data model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Attempting to register a type name that already exists in the registry.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// A TypeId was not found in the type registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// A varnode was requested that does not exist.
    #[error("Requested varnode does not exist")]
    VarnodeNotFound { id: VarnodeId },

    /// A p-code op lookup by SeqNum failed.
    #[error("Missing p-code sequence number")]
    MissingSeqNum { seq: SeqNum },

    /// A p-code op id was not found in the current function's op arena.
    #[error("op not found: PcodeOpId({id})", id = id.0)]
    OpNotFound { id: PcodeOpId },

    /// A basic block id was not found in the current function's CFG.
    #[error("block not found: BlockId({id})", id = id.0)]
    BlockNotFound { id: BlockId },

    /// An address-space id was not found in the architecture's space table.
    #[error("address space not found: SpaceId({id})", id = id.0)]
    SpaceNotFound { id: SpaceId },

    /// A function ID was not found.
    #[error("function not found: FunctionId({id})", id = id.0)]
    FunctionNotFound { id: FunctionId },

    /// A symbol ID was not found.
    #[error("symbol not found: SymbolId({id})", id = id.0)]
    SymbolNotFound { id: SymbolId },

    /// An operation was attempted on an input slot that doesn't exist.
    #[error("input slot {slot} out of range for op {op} (has {num_inputs} inputs)")]
    SlotOutOfRange {
        op: PcodeOpId,
        slot: usize,
        num_inputs: usize,
    },

    /// A size mismatch between a Varnode and the access that targets it.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u32, actual: u32 },

    /// An opcode/operand-count combination the IR store does not accept.
    #[error("opcode mismatch: {reason}")]
    OpcodeMismatch { reason: String },

    /// A structural invariant of the IR was violated.
    #[error("IR inconsistency: {reason}")]
    IrInconsistency { reason: String },
}

/// The closed error taxonomy of spec.md §7.
///
/// Every failure that can cross an `Action`'s `perform` boundary is one of
/// these four kinds. `Parse` and `Execution` never clear function state;
/// `LowLevel` and `Decoder` do (the driver invokes the function-abort path);
/// `RecovError` discards only this function's derived analysis state without
/// damaging the architecture.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecompError {
    /// Malformed user/command input (address, type, varnode syntax).
    /// Recovered locally; never fatal to a function.
    #[error("parse error: {0}")]
    Parse(String),

    /// Semantic failure (symbol not found, no function loaded, bad range).
    /// Reported to the caller; analysis state untouched.
    #[error("execution error: {0}")]
    Execution(String),

    /// A core IR invariant was violated. Fatal to the current function:
    /// its analysis is cleared and a warning is issued, but the
    /// architecture survives.
    #[error("low-level error: {0}")]
    LowLevel(#[from] CoreError),

    /// The encoded input stream was corrupt. Same abort path as `LowLevel`.
    #[error("decoder error: {0}")]
    Decoder(String),

    /// Recovery failed for this function without damaging the architecture.
    /// Like `Execution`, but the function's derived state is discarded.
    #[error("recovery error: {0}")]
    Recov(String),
}

impl DecompError {
    /// Whether this error kind requires aborting (clearing) the current
    /// function's analysis state, per spec.md §7.
    pub fn aborts_function(&self) -> bool {
        matches!(self, DecompError::LowLevel(_) | DecompError::Decoder(_))
    }

    /// Whether this error kind discards only derived (non-architecture)
    /// state for the current function.
    pub fn discards_derived_state(&self) -> bool {
        matches!(self, DecompError::Recov(_)) || self.aborts_function()
    }
}
