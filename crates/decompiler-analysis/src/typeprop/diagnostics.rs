//! Diagnostics emitted by the type propagator -- informational, never fatal
//! (a stuck propagation leaves a Varnode at its prior type, per spec.md
//! §4.2's fixpoint semantics).

use decompiler_core::{PcodeOpId, TypeId, VarnodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDiagnostic {
    /// An edge carried two incompatible locked types; the propagator kept
    /// the sink's existing (locked) type and recorded the conflict.
    LockedTypeConflict {
        op: PcodeOpId,
        varnode: VarnodeId,
        proposed: TypeId,
        kept: TypeId,
    },
    /// A union-typed edge was deferred to `ScoreUnionFields`.
    UnionEdgeDeferred { op: PcodeOpId, slot: i32 },
    /// The propagator ran out of its pass budget before converging.
    BudgetExhausted { passes: u32 },
}
