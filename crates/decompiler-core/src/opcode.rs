//! The p-code opcode set.
//!
//! Three-address, endian-specific. Grouped by category per spec.md §3:
//! arithmetic, bitwise, comparison, float, memory, control, structural, SSA
//! markers, float conversions.
//!
//! Each opcode additionally carries a per-opcode [`OpTypeEffect`] -- a "pure
//! data" strategy record (type-effect vector + commutativity + branch kind)
//! rather than per-opcode virtual dispatch, per spec.md §9's design note on
//! deep class hierarchies.

use serde::{Deserialize, Serialize};

/// The full p-code opcode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // -- Arithmetic --
    IntAdd,
    IntSub,
    IntMult,
    IntDiv,
    IntSDiv,
    IntRem,
    IntSRem,
    IntCarry,
    IntSCarry,
    IntSBorrow,
    Int2Comp,
    IntNeg,

    // -- Bitwise --
    IntAnd,
    IntOr,
    IntXor,
    IntNot,
    IntLeft,
    IntRight,
    IntSRight,

    // -- Comparison --
    IntEqual,
    IntNotEqual,
    IntLess,
    IntSLess,
    IntLessEqual,
    IntSLessEqual,
    IntZext,
    IntSext,
    BoolNegate,
    BoolAnd,
    BoolOr,
    BoolXor,

    // -- Float --
    FloatAdd,
    FloatSub,
    FloatMult,
    FloatDiv,
    FloatNeg,
    FloatAbs,
    FloatSqrt,
    FloatEqual,
    FloatNotEqual,
    FloatLess,
    FloatLessEqual,
    FloatNan,

    // -- Float conversions --
    FloatInt2Float,
    FloatFloat2Float,
    FloatTrunc,
    FloatCeil,
    FloatFloor,
    FloatRound,

    // -- Memory --
    Load,
    Store,

    // -- Control --
    Branch,
    CBranch,
    BranchInd,
    Call,
    CallInd,
    CallOther,
    Return,

    // -- Structural --
    Copy,
    SubPiece,
    Piece,
    Cast,
    PtrAdd,
    PtrSub,
    SegmentOp,

    // -- SSA markers --
    Multiequal,
    Indirect,
}

/// What kind of control-flow behavior an opcode exhibits, used by the
/// structurer and the SSA builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    /// Not a branch at all.
    None,
    /// Unconditional control transfer (BRANCH, BRANCHIND, RETURN).
    Unconditional,
    /// Two-way conditional (CBRANCH).
    Conditional,
    /// Transfers control to a callee and returns (CALL, CALLIND).
    Call,
}

/// Per-opcode type-effect / behavior record. A pure-data strategy object,
/// consulted by both the type propagator (decompiler-analysis) and the
/// union-field scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpTypeEffect {
    /// Whether swapping input 0 and input 1 produces an equivalent op
    /// (meaningful only for binary opcodes).
    pub commutative: bool,
    /// Whether this opcode operates on/produces floating-point values.
    pub is_float: bool,
    /// Whether this opcode is a boolean-producing comparison.
    pub is_boolean_result: bool,
    /// Whether signedness of the inputs is semantically significant.
    pub is_signed: bool,
    pub branch_kind: BranchKind,
    /// Whether this op is a marker (MULTIEQUAL/INDIRECT) rather than a
    /// computation.
    pub is_marker: bool,
}

impl Opcode {
    /// Returns this opcode's fixed type-effect/behavior record.
    pub fn type_effect(self) -> OpTypeEffect {
        use Opcode::*;
        let base = OpTypeEffect {
            commutative: false,
            is_float: false,
            is_boolean_result: false,
            is_signed: false,
            branch_kind: BranchKind::None,
            is_marker: false,
        };
        match self {
            IntAdd | IntMult | IntAnd | IntOr | IntXor | IntCarry | BoolAnd | BoolOr
            | BoolXor | IntEqual | IntNotEqual | FloatAdd | FloatMult | FloatEqual
            | FloatNotEqual => OpTypeEffect {
                commutative: true,
                is_float: matches!(self, FloatAdd | FloatMult | FloatEqual | FloatNotEqual),
                is_boolean_result: matches!(
                    self,
                    IntEqual | IntNotEqual | FloatEqual | FloatNotEqual
                ),
                ..base
            },
            IntSub | IntDiv | IntRem | IntLeft | IntRight | IntSRight | Int2Comp | IntNeg
            | IntNot => base,
            IntSDiv | IntSRem | IntSCarry | IntSBorrow => OpTypeEffect {
                is_signed: true,
                ..base
            },
            IntSLess | IntSLessEqual => OpTypeEffect {
                is_signed: true,
                is_boolean_result: true,
                ..base
            },
            IntLess | IntLessEqual => OpTypeEffect {
                is_boolean_result: true,
                ..base
            },
            IntZext | IntSext => base,
            BoolNegate => OpTypeEffect {
                is_boolean_result: true,
                ..base
            },
            FloatSub | FloatDiv | FloatNeg | FloatAbs | FloatSqrt | FloatTrunc | FloatCeil
            | FloatFloor | FloatRound => OpTypeEffect {
                is_float: true,
                ..base
            },
            FloatLess | FloatLessEqual | FloatNan => OpTypeEffect {
                is_float: true,
                is_boolean_result: true,
                ..base
            },
            FloatInt2Float | FloatFloat2Float => OpTypeEffect {
                is_float: true,
                ..base
            },
            Load | Store | Copy | SubPiece | Piece | Cast | PtrAdd | PtrSub | SegmentOp => base,
            Branch | BranchInd => OpTypeEffect {
                branch_kind: BranchKind::Unconditional,
                ..base
            },
            CBranch => OpTypeEffect {
                branch_kind: BranchKind::Conditional,
                ..base
            },
            Call | CallInd => OpTypeEffect {
                branch_kind: BranchKind::Call,
                ..base
            },
            CallOther => base,
            Return => OpTypeEffect {
                branch_kind: BranchKind::Unconditional,
                ..base
            },
            Multiequal | Indirect => OpTypeEffect {
                is_marker: true,
                ..base
            },
        }
    }

    pub fn is_commutative(self) -> bool {
        self.type_effect().commutative
    }

    pub fn is_marker(self) -> bool {
        self.type_effect().is_marker
    }

    pub fn is_branch(self) -> bool {
        !matches!(self.type_effect().branch_kind, BranchKind::None)
    }

    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Branch | Opcode::CBranch | Opcode::BranchInd | Opcode::Return
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_add_is_commutative() {
        assert!(Opcode::IntAdd.is_commutative());
        assert!(!Opcode::IntSub.is_commutative());
    }

    #[test]
    fn cbranch_is_conditional_branch() {
        assert!(Opcode::CBranch.is_branch());
        assert_eq!(Opcode::CBranch.type_effect().branch_kind, BranchKind::Conditional);
    }

    #[test]
    fn branch_and_return_are_terminators() {
        assert!(Opcode::Branch.is_terminator());
        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::Copy.is_terminator());
    }

    #[test]
    fn multiequal_and_indirect_are_markers() {
        assert!(Opcode::Multiequal.is_marker());
        assert!(Opcode::Indirect.is_marker());
        assert!(!Opcode::Copy.is_marker());
    }

    #[test]
    fn signed_variants_marked_signed() {
        assert!(Opcode::IntSDiv.type_effect().is_signed);
        assert!(!Opcode::IntDiv.type_effect().is_signed);
    }

    #[test]
    fn float_ops_marked_float() {
        assert!(Opcode::FloatAdd.type_effect().is_float);
        assert!(!Opcode::IntAdd.type_effect().is_float);
    }
}
