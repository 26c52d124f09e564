//! PcodeOp: a single IR operation.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::id::{BlockId, PcodeOpId, VarnodeId};
use crate::opcode::Opcode;
use crate::seqnum::SeqNum;

bitflags! {
    /// Boolean flags a PcodeOp may carry, beyond what its `Opcode` already
    /// implies (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PcodeOpFlags: u32 {
        /// Op has been removed from the active IR but not yet deallocated.
        const DEAD        = 1 << 0;
        /// MULTIEQUAL or INDIRECT.
        const MARKER       = 1 << 1;
        /// A CBRANCH whose condition sense is logically inverted relative
        /// to its original encoding (set by structuring negation).
        const BOOLEANFLIP  = 1 << 2;
        const CALL         = 1 << 3;
        const BRANCH       = 1 << 4;
        /// An INDIRECT whose target models an uncertain side effect rather
        /// than a definite one (e.g. an unanalyzed CALLOTHER).
        const INDIRECT     = 1 << 5;
    }
}

/// A single p-code operation: an opcode, its parent basic block, a sequence
/// number, ordered inputs, an optional output, and flag bits.
///
/// Invariant: `output`'s `def` and each input's `descendants` must reference
/// this op's id; that bookkeeping is the IR store's job (`store.rs`), not
/// this struct's -- `PcodeOp` itself is a plain data record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcodeOp {
    pub id: PcodeOpId,
    pub opcode: Opcode,
    pub parent: BlockId,
    pub seq: SeqNum,
    pub inputs: Vec<VarnodeId>,
    pub output: Option<VarnodeId>,
    pub flags: PcodeOpFlags,
}

impl PcodeOp {
    pub fn new(id: PcodeOpId, opcode: Opcode, parent: BlockId, seq: SeqNum) -> Self {
        let mut flags = PcodeOpFlags::empty();
        if opcode.is_marker() {
            flags.insert(PcodeOpFlags::MARKER);
        }
        if opcode.is_branch() {
            flags.insert(PcodeOpFlags::BRANCH);
        }
        if matches!(opcode, Opcode::Call | Opcode::CallInd) {
            flags.insert(PcodeOpFlags::CALL);
        }
        PcodeOp {
            id,
            opcode,
            parent,
            seq,
            inputs: Vec::new(),
            output: None,
            flags,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.flags.contains(PcodeOpFlags::DEAD)
    }

    pub fn is_marker(&self) -> bool {
        self.flags.contains(PcodeOpFlags::MARKER)
    }

    pub fn input_slot(&self, vn: VarnodeId) -> Option<usize> {
        self.inputs.iter().position(|&v| v == vn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::id::SpaceId;

    fn seq(off: u64) -> SeqNum {
        SeqNum::new(Address::new(SpaceId(1), off), 0)
    }

    #[test]
    fn new_op_derives_marker_and_branch_flags_from_opcode() {
        let phi = PcodeOp::new(PcodeOpId(0), Opcode::Multiequal, BlockId(0), seq(0x10));
        assert!(phi.is_marker());
        assert!(!phi.flags.contains(PcodeOpFlags::BRANCH));

        let br = PcodeOp::new(PcodeOpId(1), Opcode::CBranch, BlockId(0), seq(0x14));
        assert!(br.flags.contains(PcodeOpFlags::BRANCH));
        assert!(!br.is_marker());
    }

    #[test]
    fn call_opcode_sets_call_flag() {
        let call = PcodeOp::new(PcodeOpId(2), Opcode::Call, BlockId(0), seq(0x20));
        assert!(call.flags.contains(PcodeOpFlags::CALL));
    }

    #[test]
    fn input_slot_finds_position() {
        let mut op = PcodeOp::new(PcodeOpId(3), Opcode::IntAdd, BlockId(0), seq(0x24));
        op.inputs = vec![VarnodeId(5), VarnodeId(9)];
        assert_eq!(op.input_slot(VarnodeId(9)), Some(1));
        assert_eq!(op.input_slot(VarnodeId(1)), None);
    }
}
