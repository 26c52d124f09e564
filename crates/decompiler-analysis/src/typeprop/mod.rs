//! Type propagation over dataflow, and union-field resolution
//! (spec.md §4.2, §4.5).

pub mod diagnostics;
pub mod lattice;
pub mod rules;
pub mod union;

pub use diagnostics::TypeDiagnostic;
pub use lattice::{propagate, PropagationBudget};
pub use union::{score_union_fields, ResolvedUnion, UnionAccess};
