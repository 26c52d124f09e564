//! Per-opcode type-effect resolution, consulted by both the propagator
//! (`lattice::propagate`) and the union-field scorer (`union`).
//!
//! One exhaustive, no-wildcard match over [`Opcode`] produces a
//! [`SlotExpectation`] per input/output slot -- the "per-opcode strategy
//! record (pure data) rather than per-opcode subclassing" spec.md §9 calls
//! for, generalized from a per-op type-rule match used for a narrower
//! opcode set elsewhere in this workspace to a full slot-by-slot
//! expectation table.

use decompiler_core::{Metatype, Opcode};

/// What a given input/output slot of an op expects of the type flowing
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotExpectation {
    /// Any metatype is acceptable; the slot imposes no constraint.
    Any,
    /// The slot expects exactly this metatype.
    Exactly(Metatype),
    /// The slot expects a numeric type (int, uint, or float).
    Numeric,
    /// The slot expects a pointer (to anything).
    Pointer,
    /// The slot's type must match another slot's (by index) -- e.g.
    /// MULTIEQUAL's inputs should agree with its output.
    SameAs(i32),
}

/// The full per-slot expectation table for one opcode: each input slot in
/// order, then the output slot (slot index `-1` by the union resolver's
/// convention, but indexed here as `output`).
#[derive(Debug, Clone)]
pub struct OpSlotRule {
    pub inputs: Vec<SlotExpectation>,
    pub output: SlotExpectation,
}

/// Resolves the slot-expectation rule for `opcode`. Exhaustive over the
/// opcode set; no wildcard arm, so adding an opcode without updating this
/// table is a compile error.
pub fn resolve_slot_rule(opcode: Opcode) -> OpSlotRule {
    use Opcode::*;
    use SlotExpectation::*;
    match opcode {
        IntAdd | IntSub | IntMult | IntDiv | IntSDiv | IntRem | IntSRem | IntAnd | IntOr
        | IntXor | IntLeft | IntRight | IntSRight => OpSlotRule {
            inputs: vec![Numeric, Numeric],
            output: Numeric,
        },
        IntCarry | IntSCarry | IntSBorrow => OpSlotRule {
            inputs: vec![Numeric, Numeric],
            output: Exactly(Metatype::Bool),
        },
        Int2Comp | IntNeg | IntNot => OpSlotRule {
            inputs: vec![Numeric],
            output: Numeric,
        },
        IntEqual | IntNotEqual | IntLess | IntSLess | IntLessEqual | IntSLessEqual => OpSlotRule {
            inputs: vec![Numeric, Numeric],
            output: Exactly(Metatype::Bool),
        },
        IntZext | IntSext => OpSlotRule {
            inputs: vec![Numeric],
            output: Numeric,
        },
        BoolNegate => OpSlotRule {
            inputs: vec![Exactly(Metatype::Bool)],
            output: Exactly(Metatype::Bool),
        },
        BoolAnd | BoolOr | BoolXor => OpSlotRule {
            inputs: vec![Exactly(Metatype::Bool), Exactly(Metatype::Bool)],
            output: Exactly(Metatype::Bool),
        },
        FloatAdd | FloatSub | FloatMult | FloatDiv => OpSlotRule {
            inputs: vec![Exactly(Metatype::Float), Exactly(Metatype::Float)],
            output: Exactly(Metatype::Float),
        },
        FloatNeg | FloatAbs | FloatSqrt | FloatTrunc | FloatCeil | FloatFloor | FloatRound => {
            OpSlotRule {
                inputs: vec![Exactly(Metatype::Float)],
                output: Exactly(Metatype::Float),
            }
        }
        FloatEqual | FloatNotEqual | FloatLess | FloatLessEqual => OpSlotRule {
            inputs: vec![Exactly(Metatype::Float), Exactly(Metatype::Float)],
            output: Exactly(Metatype::Bool),
        },
        FloatNan => OpSlotRule {
            inputs: vec![Exactly(Metatype::Float)],
            output: Exactly(Metatype::Bool),
        },
        FloatInt2Float => OpSlotRule {
            inputs: vec![Numeric],
            output: Exactly(Metatype::Float),
        },
        FloatFloat2Float => OpSlotRule {
            inputs: vec![Exactly(Metatype::Float)],
            output: Exactly(Metatype::Float),
        },
        Load => OpSlotRule {
            inputs: vec![Pointer, Pointer],
            output: Any,
        },
        Store => OpSlotRule {
            inputs: vec![Pointer, Pointer, Any],
            output: Any,
        },
        Branch | BranchInd | Return => OpSlotRule {
            inputs: vec![Any],
            output: Any,
        },
        CBranch => OpSlotRule {
            inputs: vec![Any, Exactly(Metatype::Bool)],
            output: Any,
        },
        Call | CallInd => OpSlotRule {
            inputs: vec![Any],
            output: Any,
        },
        CallOther => OpSlotRule {
            inputs: vec![Any],
            output: Any,
        },
        Copy => OpSlotRule {
            inputs: vec![SameAs(-1)],
            output: Any,
        },
        SubPiece => OpSlotRule {
            inputs: vec![Any, Exactly(Metatype::Int)],
            output: Any,
        },
        Piece => OpSlotRule {
            inputs: vec![Any, Any],
            output: Any,
        },
        Cast => OpSlotRule {
            inputs: vec![Any],
            output: Any,
        },
        PtrAdd => OpSlotRule {
            inputs: vec![Pointer, Numeric, Exactly(Metatype::Int)],
            output: Pointer,
        },
        PtrSub => OpSlotRule {
            inputs: vec![Pointer, Exactly(Metatype::Int)],
            output: Pointer,
        },
        SegmentOp => OpSlotRule {
            inputs: vec![Any, Any],
            output: Pointer,
        },
        Multiequal => OpSlotRule {
            inputs: vec![SameAs(-1)],
            output: Any,
        },
        Indirect => OpSlotRule {
            inputs: vec![SameAs(-1), Any],
            output: Any,
        },
    }
}

/// Whether `metatype` satisfies `expectation`.
pub fn satisfies(expectation: SlotExpectation, metatype: Metatype) -> bool {
    match expectation {
        SlotExpectation::Any => true,
        SlotExpectation::Exactly(m) => m == metatype,
        SlotExpectation::Numeric => matches!(metatype, Metatype::Int | Metatype::Uint | Metatype::Float),
        SlotExpectation::Pointer => metatype == Metatype::Ptr,
        // Resolved relative to a sibling slot by the caller; standalone this
        // is vacuously true.
        SlotExpectation::SameAs(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_add_expects_two_numeric_inputs() {
        let rule = resolve_slot_rule(Opcode::IntAdd);
        assert_eq!(rule.inputs.len(), 2);
        assert!(rule.inputs.iter().all(|e| matches!(e, SlotExpectation::Numeric)));
    }

    #[test]
    fn comparisons_produce_bool() {
        assert_eq!(resolve_slot_rule(Opcode::IntEqual).output, SlotExpectation::Exactly(Metatype::Bool));
        assert_eq!(resolve_slot_rule(Opcode::FloatLess).output, SlotExpectation::Exactly(Metatype::Bool));
    }

    #[test]
    fn ptradd_expects_pointer_and_yields_pointer() {
        let rule = resolve_slot_rule(Opcode::PtrAdd);
        assert_eq!(rule.inputs[0], SlotExpectation::Pointer);
        assert_eq!(rule.output, SlotExpectation::Pointer);
    }

    #[test]
    fn load_and_store_slot1_is_pointer() {
        assert_eq!(resolve_slot_rule(Opcode::Load).inputs[1], SlotExpectation::Pointer);
        assert_eq!(resolve_slot_rule(Opcode::Store).inputs[1], SlotExpectation::Pointer);
    }

    #[test]
    fn satisfies_numeric_accepts_int_uint_float_only() {
        assert!(satisfies(SlotExpectation::Numeric, Metatype::Int));
        assert!(satisfies(SlotExpectation::Numeric, Metatype::Float));
        assert!(!satisfies(SlotExpectation::Numeric, Metatype::Ptr));
    }

    #[test]
    fn multiequal_and_indirect_propagate_same_as_output() {
        assert_eq!(resolve_slot_rule(Opcode::Multiequal).inputs[0], SlotExpectation::SameAs(-1));
        assert_eq!(resolve_slot_rule(Opcode::Indirect).inputs[0], SlotExpectation::SameAs(-1));
    }
}
