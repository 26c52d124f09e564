//! FlowBlock: control-flow graph nodes, both the raw basic-block graph and
//! the hierarchical structured graph the control-flow structurer produces.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::id::{PcodeOpId, StructId};

bitflags! {
    /// Flags carried by an edge of either the basic-block graph or the
    /// structured graph (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BlockEdgeFlags: u32 {
        /// Tail-to-head edge of a loop.
        const BACK_EDGE            = 1 << 0;
        /// Marked as an unstructured control transfer by the structurer.
        const GOTO                 = 1 << 1;
        /// Participates in the currently-active loop-DAG trace.
        const LOOP_DAG             = 1 << 2;
        /// The designated exit edge of its containing loop.
        const LOOP_EXIT             = 1 << 3;
        const SWITCH                = 1 << 4;
        /// The `default:` edge of a switch.
        const DEFAULT_BRANCH        = 1 << 5;
        /// A two-way conditional's decision edge (as opposed to a
        /// fallthrough/unconditional edge).
        const DECISION              = 1 << 6;
        /// Targets a block already visited as an interior goto target.
        const INTERIOR_GOTO_TARGET  = 1 << 7;
    }
}

/// A basic block: a linearly-ordered list of p-code ops. The last op, if
/// any, may be a branch; control falls through to the next op otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicBlock {
    ops: Vec<PcodeOpId>,
}

impl BasicBlock {
    pub fn new() -> Self {
        BasicBlock { ops: Vec::new() }
    }

    pub fn ops(&self) -> &[PcodeOpId] {
        &self.ops
    }

    pub fn push_op(&mut self, op: PcodeOpId) {
        self.ops.push(op);
    }

    pub fn insert_op_at(&mut self, index: usize, op: PcodeOpId) {
        self.ops.insert(index.min(self.ops.len()), op);
    }

    pub fn remove_op(&mut self, op: PcodeOpId) -> bool {
        if let Some(pos) = self.ops.iter().position(|&o| o == op) {
            self.ops.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The kind of AND/OR join a `BlockCondition` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionJoin {
    And,
    Or,
}

/// A node of the hierarchical structured graph the control-flow structurer
/// produces from the basic-block graph (spec.md §3, §4.4).
///
/// Each non-`Basic` variant owns the `StructId`s of its sub-blocks, in the
/// structurally meaningful order (e.g. an `IfElse`'s `else_body` is distinct
/// from its `then_body`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowBlockKind {
    /// A leaf wrapping one raw basic block.
    Basic(crate::id::BlockId),
    /// A single-successor wrapper used to retarget a copied block.
    Copy(StructId),
    Goto(StructId),
    MultiGoto(Vec<StructId>),
    If {
        condition: StructId,
        body: StructId,
    },
    IfElse {
        condition: StructId,
        then_body: StructId,
        else_body: StructId,
    },
    WhileDo {
        header: StructId,
        body: StructId,
    },
    DoWhile {
        body: StructId,
    },
    InfiniteLoop {
        body: StructId,
    },
    Switch {
        header: StructId,
        cases: Vec<StructId>,
        default: Option<StructId>,
    },
    /// Short-circuit AND/OR join of two two-way conditionals.
    Condition {
        join: ConditionJoin,
        left: StructId,
        right: StructId,
    },
    /// Maximal straight-line chain of single-in/single-out blocks.
    List(Vec<StructId>),
}

impl FlowBlockKind {
    /// The immediate sub-blocks this node owns, in structural order.
    pub fn children(&self) -> Vec<StructId> {
        match self {
            FlowBlockKind::Basic(_) => vec![],
            FlowBlockKind::Copy(b) | FlowBlockKind::Goto(b) => vec![*b],
            FlowBlockKind::MultiGoto(v) | FlowBlockKind::List(v) => v.clone(),
            FlowBlockKind::If { condition, body } => vec![*condition, *body],
            FlowBlockKind::IfElse {
                condition,
                then_body,
                else_body,
            } => vec![*condition, *then_body, *else_body],
            FlowBlockKind::WhileDo { header, body } => vec![*header, *body],
            FlowBlockKind::DoWhile { body } | FlowBlockKind::InfiniteLoop { body } => vec![*body],
            FlowBlockKind::Switch {
                header,
                cases,
                default,
            } => {
                let mut v = vec![*header];
                v.extend(cases);
                v.extend(default.iter().copied());
                v
            }
            FlowBlockKind::Condition { left, right, .. } => vec![*left, *right],
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            FlowBlockKind::WhileDo { .. } | FlowBlockKind::DoWhile { .. } | FlowBlockKind::InfiniteLoop { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BlockId;

    #[test]
    fn basic_block_ops_stay_in_insertion_order() {
        let mut bb = BasicBlock::new();
        bb.push_op(PcodeOpId(1));
        bb.push_op(PcodeOpId(2));
        bb.insert_op_at(1, PcodeOpId(99));
        assert_eq!(bb.ops(), &[PcodeOpId(1), PcodeOpId(99), PcodeOpId(2)]);
    }

    #[test]
    fn remove_op_reports_presence() {
        let mut bb = BasicBlock::new();
        bb.push_op(PcodeOpId(1));
        assert!(bb.remove_op(PcodeOpId(1)));
        assert!(!bb.remove_op(PcodeOpId(1)));
        assert!(bb.is_empty());
    }

    #[test]
    fn if_else_children_in_structural_order() {
        let kind = FlowBlockKind::IfElse {
            condition: StructId(0),
            then_body: StructId(1),
            else_body: StructId(2),
        };
        assert_eq!(kind.children(), vec![StructId(0), StructId(1), StructId(2)]);
        assert!(!kind.is_loop());
    }

    #[test]
    fn while_do_is_a_loop() {
        let kind = FlowBlockKind::WhileDo {
            header: StructId(0),
            body: StructId(1),
        };
        assert!(kind.is_loop());
    }

    #[test]
    fn basic_leaf_has_no_children() {
        let kind = FlowBlockKind::Basic(BlockId(4));
        assert!(kind.children().is_empty());
    }

    #[test]
    fn switch_children_include_header_cases_and_default() {
        let kind = FlowBlockKind::Switch {
            header: StructId(0),
            cases: vec![StructId(1), StructId(2)],
            default: Some(StructId(3)),
        };
        assert_eq!(
            kind.children(),
            vec![StructId(0), StructId(1), StructId(2), StructId(3)]
        );
    }
}
