//! Override application, calling-convention/prototype modeling, and the
//! C-like text printer (spec.md §4.6, §4.7, §6).
//!
//! Consumes a structured `Funcdata` from `decompiler-structure` and
//! produces printable text; owns nothing about flow-following or
//! persistence.

pub mod callspec;
pub mod error;
pub mod overrideapply;
pub mod printer;
pub mod prototype;

pub use callspec::{produce_prototypes_pass, resolve_call_spec, CallSpecRegistry};
pub use error::PrintError;
pub use overrideapply::{apply_overrides, OverrideApplyReport};
pub use printer::{format_integer, format_pcodeop, format_varnode, print_function, MarkupToken};
pub use prototype::{
    produce_prototypes, CallsiteObservation, EvaluationCategory, Parameter, ParameterStorageRule,
    PrototypeLock, PrototypeModel,
};
