//! The Action/Rule transformation driver and universal invariant checks
//! (spec.md §4.3, §8).

pub mod driver;
pub mod invariants;

pub use driver::{Action, ActionGroup, ActionStatistics, BreakKind, BreakPoint, DriverState, PerformOutcome};
pub use invariants::{check_invariants, InvariantViolation};
