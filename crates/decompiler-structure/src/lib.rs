//! Control-flow structurer (spec.md §4.4): turns a function's basic-block
//! graph into a hierarchy of high-level constructs (if/if-else, while-do,
//! do-while, switch, goto).
//!
//! # Modules
//!
//! - [`loopbody`] -- loop discovery (`findBase`/`findExit`/`orderTails`/...)
//! - [`tracedag`] -- TraceDAG goto selection
//! - [`collapse`] -- the iterative `CollapseStructure` rule list
//! - [`conditionaljoin`] -- folding two equivalent branches into one header
//! - [`returnsplit`] -- `ActionReturnSplit`
//! - [`structurer`] -- orchestrates the stages above into `structure_function`
//! - [`error`] -- `StructureError`

pub mod collapse;
pub mod conditionaljoin;
pub mod error;
pub mod loopbody;
pub mod returnsplit;
pub mod structurer;
pub mod tracedag;

pub use error::StructureError;
pub use structurer::structure_function;
