//! Datatype lattice meet/coercion and the bidirectional type propagator
//! (spec.md §4.2).
//!
//! Types flow across every dataflow edge to a bounded fixpoint; locked
//! varnodes are sinks (the propagator never overwrites a `TYPELOCK`ed
//! varnode's type); a union-typed edge is deferred to `union::score_union_fields`
//! rather than resolved here. Follows the coercion-check shape used for
//! type compatibility elsewhere in this workspace, generalized from a
//! two-type join query to a whole-function fixpoint pass.

use decompiler_core::{Funcdata, Metatype, TypeId, TypeRegistry, VarnodeFlags};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::typeprop::diagnostics::TypeDiagnostic;
use crate::typeprop::rules::{resolve_slot_rule, SlotExpectation};

/// The fixed metatype ordering SPEC_FULL.md §6 resolves as a deterministic
/// tie-break when two candidate types are otherwise equally good: lower
/// ranks first. `Metatype`'s declared variant order already matches this
/// (`Unknown < Void < Int < Uint < Bool < Code < Float < Ptr < Array <
/// Struct < Union`), so ranking is just its derived `Ord`.
pub fn metatype_rank(m: Metatype) -> u8 {
    m as u8
}

/// Joins two metatypes under the lattice: `Unknown` is bottom and is
/// absorbed by anything more specific; two incompatible concrete metatypes
/// join to whichever has the lower rank (the deterministic tie-break of
/// SPEC_FULL.md §6), never silently preferring one arbitrarily.
pub fn meet(a: Metatype, b: Metatype) -> Metatype {
    if a == Metatype::Unknown {
        return b;
    }
    if b == Metatype::Unknown {
        return a;
    }
    if a == b {
        return a;
    }
    if metatype_rank(a) <= metatype_rank(b) {
        a
    } else {
        b
    }
}

/// Whether `expectation` is already satisfied by `current`, given the
/// opcode's other slots for `SameAs` resolution.
fn expectation_metatype(expectation: SlotExpectation, sibling: Metatype) -> Option<Metatype> {
    match expectation {
        SlotExpectation::Any => None,
        SlotExpectation::Exactly(m) => Some(m),
        SlotExpectation::Numeric => None,
        SlotExpectation::Pointer => Some(Metatype::Ptr),
        SlotExpectation::SameAs(_) => Some(sibling),
    }
}

/// Bounds the propagator's fixpoint loop (spec.md §4.2: "bounded by a pass
/// budget").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropagationBudget {
    pub max_passes: u32,
}

impl Default for PropagationBudget {
    fn default() -> Self {
        PropagationBudget { max_passes: 32 }
    }
}

/// Runs the propagator over every alive op in `fd` to a fixpoint (or until
/// `budget.max_passes` is exhausted), returning the diagnostics it recorded.
/// Locked varnodes (`TYPELOCK`) are never overwritten; union-typed edges are
/// recorded as deferred rather than resolved (the caller is expected to run
/// `union::score_union_fields` on each deferred edge separately).
pub fn propagate(
    fd: &mut Funcdata,
    reg: &TypeRegistry,
    budget: PropagationBudget,
) -> Result<Vec<TypeDiagnostic>, AnalysisError> {
    let mut diagnostics = Vec::new();
    let mut passes = 0;
    loop {
        let mut changed = false;
        let ops = fd.store.ops_alive();
        for op_id in ops {
            let (opcode, inputs, output) = {
                let op = fd.store.op(op_id).map_err(AnalysisError::Core)?;
                (op.opcode, op.inputs.clone(), op.output)
            };
            let rule = resolve_slot_rule(opcode);
            let output_metatype = output
                .and_then(|vn| fd.store.varnode(vn).ok())
                .and_then(|vn| reg.get(vn.datatype))
                .map(|dt| dt.metatype())
                .unwrap_or(Metatype::Unknown);

            for (slot, vn_id) in inputs.iter().enumerate() {
                if vn_id.0 == u32::MAX {
                    continue;
                }
                let Some(expectation) = rule.inputs.get(slot).copied() else {
                    continue;
                };
                let vn = fd.store.varnode(*vn_id).map_err(AnalysisError::Core)?;
                if vn.flags.contains(VarnodeFlags::TYPELOCK) {
                    continue;
                }
                let Some(dt) = reg.get(vn.datatype) else {
                    continue;
                };
                if dt.is_union_like() {
                    diagnostics.push(TypeDiagnostic::UnionEdgeDeferred {
                        op: op_id,
                        slot: slot as i32,
                    });
                    continue;
                }
                let current = dt.metatype();
                if current != Metatype::Unknown {
                    continue;
                }
                let Some(wanted) = expectation_metatype(expectation, output_metatype) else {
                    continue;
                };
                if wanted == Metatype::Unknown {
                    continue;
                }
                let proposed = representative_type(wanted);
                fd.store.varnode_mut(*vn_id).map_err(AnalysisError::Core)?.datatype = proposed;
                changed = true;
            }
        }
        passes += 1;
        if !changed || passes >= budget.max_passes {
            if changed {
                diagnostics.push(TypeDiagnostic::BudgetExhausted { passes });
            }
            break;
        }
    }
    Ok(diagnostics)
}

/// A canonical `TypeId` representative of a metatype, used when the
/// propagator needs to materialize *some* concrete type for an
/// otherwise-`Unknown` varnode.
fn representative_type(m: Metatype) -> TypeId {
    match m {
        Metatype::Unknown | Metatype::Void => TypeId::VOID,
        Metatype::Int => TypeId::INT4,
        Metatype::Uint => TypeId::UINT4,
        Metatype::Bool => TypeId::BOOL,
        Metatype::Code => TypeId::CODE,
        Metatype::Float => TypeId::FLOAT8,
        Metatype::Ptr => TypeId::UNKNOWN8,
        Metatype::Array | Metatype::Struct | Metatype::Union => TypeId::UNKNOWN8,
    }
}
