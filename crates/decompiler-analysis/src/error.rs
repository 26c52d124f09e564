//! Errors raised by the dataflow, type-propagation, and action-driver
//! passes. These compose into [`decompiler_core::DecompError`] at the
//! driver boundary (spec.md §7).

use decompiler_core::{CoreError, DecompError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// SSA construction found a dominance-frontier inconsistency (e.g. a
    /// block reachable from the entry with no recorded immediate dominator).
    #[error("SSA construction failed: {reason}")]
    SsaConstruction { reason: String },

    /// Two HighVariable covers were asked to merge but conflict.
    #[error("cover conflict: cannot merge, live ranges overlap outside a MULTIEQUAL")]
    CoverConflict,

    /// The type propagator exhausted its pass budget without reaching a
    /// fixpoint.
    #[error("type propagation did not converge within {passes} passes")]
    PropagationBudgetExceeded { passes: u32 },

    /// `ScoreUnionFields` exceeded its trial cap before a result could be
    /// computed.
    #[error("union field scoring exceeded trial cap ({cap})")]
    UnionScoringTrialCapExceeded { cap: u32 },

    /// A named `Action` (possibly one defined outside this crate, wrapping
    /// another pass such as the control-flow structurer) failed to perform.
    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },
}

impl From<AnalysisError> for DecompError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Core(core) => DecompError::LowLevel(core),
            other => DecompError::Recov(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_maps_to_low_level() {
        let e = AnalysisError::Core(CoreError::OpNotFound {
            id: decompiler_core::PcodeOpId(1),
        });
        assert!(matches!(DecompError::from(e), DecompError::LowLevel(_)));
    }

    #[test]
    fn analysis_specific_errors_map_to_recov() {
        let e = AnalysisError::CoverConflict;
        assert!(matches!(DecompError::from(e), DecompError::Recov(_)));
    }
}
