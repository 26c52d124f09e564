//! Dataflow, type propagation, and the Action/Rule transformation driver
//! (spec.md §4.2, §4.3, §4.5, §8).

pub mod actions;
pub mod dataflow;
pub mod error;
pub mod typeprop;

pub use actions::{Action, ActionGroup, ActionStatistics, BreakKind, BreakPoint, DriverState, PerformOutcome};
pub use actions::{check_invariants, InvariantViolation};
pub use dataflow::{build_ssa, merge_high_variables, Cover, CoverRange, HighVariable};
pub use error::AnalysisError;
pub use typeprop::{propagate, score_union_fields, PropagationBudget, ResolvedUnion, TypeDiagnostic, UnionAccess};
