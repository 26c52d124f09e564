//! The IR store: owns a function's Varnode and PcodeOp arenas and exposes
//! the mutation/iteration API of spec.md §4.1.
//!
//! Every mutation maintains the descendant sets and `def` pointers
//! atomically, so that after any single call returns, the def-use graph is
//! consistent (spec.md §4.1 invariant). Varnodes and ops are never removed
//! from their arena slots outright -- `op_destroy` tombstones the slot so
//! existing `PcodeOpId`/`VarnodeId` handles elsewhere in the IR don't
//! silently dangle into reused storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::datatype::TypeId;
use crate::error::CoreError;
use crate::id::{BlockId, PcodeOpId, SpaceId, VarnodeId};
use crate::opcode::Opcode;
use crate::pcodeop::PcodeOp;
use crate::seqnum::SeqNum;
use crate::varnode::{Varnode, VarnodeFlags};

/// Owns all Varnodes and PcodeOps for one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrStore {
    varnodes: Vec<Option<Varnode>>,
    ops: Vec<Option<PcodeOp>>,
    /// (address, size, uniq) -> VarnodeId, kept for `findVarnodeWritten`-style
    /// lookups without a linear scan.
    loc_index: BTreeMap<(SpaceId, u64, u32), Vec<VarnodeId>>,
    /// SeqNum -> PcodeOpId, for `findOp`.
    seq_index: BTreeMap<SeqNum, PcodeOpId>,
    next_creation_index: u64,
    /// The architecture's internal ("unique") space, used for SSA temporaries
    /// minted by `new_unique_out`.
    unique_space: SpaceId,
    next_unique_offset: u64,
}

impl IrStore {
    pub fn new(unique_space: SpaceId) -> Self {
        IrStore {
            varnodes: Vec::new(),
            ops: Vec::new(),
            loc_index: BTreeMap::new(),
            seq_index: BTreeMap::new(),
            next_creation_index: 0,
            unique_space,
            next_unique_offset: 0,
        }
    }

    fn alloc_creation_index(&mut self) -> u64 {
        let idx = self.next_creation_index;
        self.next_creation_index += 1;
        idx
    }

    // -- Varnode access -----------------------------------------------------

    pub fn varnode(&self, id: VarnodeId) -> Result<&Varnode, CoreError> {
        self.varnodes
            .get(id.0 as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(CoreError::VarnodeNotFound { id })
    }

    pub fn varnode_mut(&mut self, id: VarnodeId) -> Result<&mut Varnode, CoreError> {
        self.varnodes
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(CoreError::VarnodeNotFound { id })
    }

    fn insert_varnode(&mut self, vn: Varnode) -> VarnodeId {
        let id = VarnodeId(self.varnodes.len() as u32);
        let key = (vn.address.space, vn.address.offset, vn.size);
        self.loc_index.entry(key).or_default().push(id);
        self.varnodes.push(Some(vn));
        id
    }

    pub fn new_free_varnode(&mut self, address: Address, size: u32, datatype: TypeId) -> VarnodeId {
        let idx = self.alloc_creation_index();
        self.insert_varnode(Varnode::new_free(address, size, datatype, idx))
    }

    pub fn new_input_varnode(
        &mut self,
        address: Address,
        size: u32,
        datatype: TypeId,
    ) -> VarnodeId {
        let idx = self.alloc_creation_index();
        self.insert_varnode(Varnode::new_input(address, size, datatype, idx))
    }

    pub fn new_constant_varnode(&mut self, value: u64, size: u32, datatype: TypeId) -> VarnodeId {
        let idx = self.alloc_creation_index();
        let address = Address::new(SpaceId(0), value);
        self.insert_varnode(Varnode::new_constant(value, size, datatype, address, idx))
    }

    /// Mints a fresh SSA temporary in the unique space and sets it as `op`'s
    /// output.
    pub fn new_unique_out(
        &mut self,
        size: u32,
        op: PcodeOpId,
        datatype: TypeId,
    ) -> Result<VarnodeId, CoreError> {
        let offset = self.next_unique_offset;
        self.next_unique_offset += size.max(1) as u64;
        let address = Address::new(self.unique_space, offset);
        let idx = self.alloc_creation_index();
        let vn_id = self.insert_varnode(Varnode::new_free(address, size, datatype, idx));
        self.op_set_output(op, vn_id)?;
        Ok(vn_id)
    }

    /// Varnodes at `(address, size)`, in seqnum order (tie-broken by
    /// creation index) -- `beginLoc`/`endLoc` of spec.md §4.1.
    pub fn varnodes_at(&self, address: Address, size: u32) -> Vec<VarnodeId> {
        let key = (address.space, address.offset, size);
        let mut ids = self.loc_index.get(&key).cloned().unwrap_or_default();
        ids.sort_by_key(|id| {
            let vn = self.varnode(*id).expect("indexed varnode must exist");
            let seq = vn.def.and_then(|op| self.ops.get(op.0 as usize)).and_then(|o| o.as_ref()).map(|o| o.seq);
            (seq, vn.creation_index)
        });
        ids
    }

    /// Varnodes whose flags intersect `flags`, in definition order --
    /// `beginDef(flag)` of spec.md §4.1.
    pub fn varnodes_with_flags(&self, flags: VarnodeFlags) -> Vec<VarnodeId> {
        let mut found: Vec<(VarnodeId, u64)> = self
            .varnodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|vn| (i, vn)))
            .filter(|(_, vn)| vn.flags.intersects(flags))
            .map(|(i, vn)| (VarnodeId(i as u32), vn.creation_index))
            .collect();
        found.sort_by_key(|(_, creation)| *creation);
        found.into_iter().map(|(id, _)| id).collect()
    }

    pub fn find_varnode_input(&self, address: Address, size: u32) -> Option<VarnodeId> {
        self.varnodes_at(address, size)
            .into_iter()
            .find(|id| self.varnode(*id).map(|vn| vn.is_input()).unwrap_or(false))
    }

    pub fn find_varnode_written(
        &self,
        address: Address,
        size: u32,
        seq: SeqNum,
    ) -> Option<VarnodeId> {
        self.varnodes_at(address, size).into_iter().find(|id| {
            self.varnode(*id)
                .ok()
                .and_then(|vn| vn.def)
                .and_then(|op_id| self.op(op_id).ok())
                .map(|op| op.seq.matches(&seq))
                .unwrap_or(false)
        })
    }

    // -- Op access ------------------------------------------------------------

    pub fn op(&self, id: PcodeOpId) -> Result<&PcodeOp, CoreError> {
        self.ops
            .get(id.0 as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(CoreError::OpNotFound { id })
    }

    pub fn op_mut(&mut self, id: PcodeOpId) -> Result<&mut PcodeOp, CoreError> {
        self.ops
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(CoreError::OpNotFound { id })
    }

    pub fn find_op(&self, seq: SeqNum) -> Result<&PcodeOp, CoreError> {
        self.seq_index
            .get(&seq)
            .and_then(|id| self.ops.get(id.0 as usize))
            .and_then(|slot| slot.as_ref())
            .ok_or(CoreError::MissingSeqNum { seq })
    }

    /// Creates a new op with `num_inputs` empty input slots, not yet
    /// inserted into any basic block.
    pub fn new_op(
        &mut self,
        num_inputs: usize,
        opcode: Opcode,
        parent: BlockId,
        address: Address,
    ) -> PcodeOpId {
        let id = PcodeOpId(self.ops.len() as u32);
        let uniq = self.ops.len() as u32;
        let seq = SeqNum::new(address, uniq);
        let mut op = PcodeOp::new(id, opcode, parent, seq);
        // VarnodeId(u32::MAX) marks an unfilled slot until op_set_input binds it.
        op.inputs = vec![VarnodeId(u32::MAX); num_inputs];
        self.seq_index.insert(seq, id);
        self.ops.push(Some(op));
        id
    }

    pub fn op_set_opcode(&mut self, op: PcodeOpId, opcode: Opcode) -> Result<(), CoreError> {
        let o = self.op_mut(op)?;
        o.opcode = opcode;
        Ok(())
    }

    /// Sets input `slot` of `op` to `vn`, updating `vn`'s descendant set.
    /// If the slot previously held a different varnode, that varnode's
    /// descendant entry is removed first.
    pub fn op_set_input(&mut self, op: PcodeOpId, vn: VarnodeId, slot: usize) -> Result<(), CoreError> {
        let num_inputs = self.op(op)?.inputs.len();
        if slot >= num_inputs {
            return Err(CoreError::SlotOutOfRange {
                op,
                slot,
                num_inputs,
            });
        }
        let previous = self.op(op)?.inputs[slot];
        if previous.0 != u32::MAX {
            if let Ok(prev_vn) = self.varnode_mut(previous) {
                prev_vn.remove_descendant(op, slot as u16);
            }
        }
        self.op_mut(op)?.inputs[slot] = vn;
        self.varnode_mut(vn)?.add_descendant(op, slot as u16);
        Ok(())
    }

    pub fn op_remove_input(&mut self, op: PcodeOpId, slot: usize) -> Result<(), CoreError> {
        let vn = self.op(op)?.inputs.get(slot).copied().ok_or(CoreError::SlotOutOfRange {
            op,
            slot,
            num_inputs: self.op(op)?.inputs.len(),
        })?;
        if vn.0 != u32::MAX {
            self.varnode_mut(vn)?.remove_descendant(op, slot as u16);
        }
        self.op_mut(op)?.inputs.remove(slot);
        // Remaining inputs at higher slots shift down; their descendant
        // entries must be re-keyed to the new slot index.
        let remaining: Vec<VarnodeId> = self.op(op)?.inputs[slot..].to_vec();
        for (i, v) in remaining.into_iter().enumerate() {
            let new_slot = slot + i;
            if v.0 != u32::MAX {
                let vn = self.varnode_mut(v)?;
                vn.remove_descendant(op, (new_slot + 1) as u16);
                vn.add_descendant(op, new_slot as u16);
            }
        }
        Ok(())
    }

    /// Sets `op`'s output to `vn`, maintaining `vn.def` and its
    /// `WRITTEN` flag.
    pub fn op_set_output(&mut self, op: PcodeOpId, vn: VarnodeId) -> Result<(), CoreError> {
        self.op_mut(op)?.output = Some(vn);
        self.varnode_mut(vn)?.set_def(op);
        Ok(())
    }

    /// Inserts `op` at the start of `block`'s op list.
    pub fn op_insert_begin(&mut self, op: PcodeOpId, block: &mut crate::block::BasicBlock) {
        block.insert_op_at(0, op);
    }

    /// Inserts `op` at the end of `block`'s op list.
    pub fn op_insert_end(&mut self, op: PcodeOpId, block: &mut crate::block::BasicBlock) {
        block.push_op(op);
    }

    /// Removes `op` from `block`'s op list without destroying it (it may be
    /// reinserted elsewhere).
    pub fn op_uninsert(&mut self, op: PcodeOpId, block: &mut crate::block::BasicBlock) {
        block.remove_op(op);
    }

    /// Destroys `op`: clears its input descendant links and output def
    /// pointer, then tombstones its arena slot.
    pub fn op_destroy(&mut self, op: PcodeOpId) -> Result<(), CoreError> {
        let inputs = self.op(op)?.inputs.clone();
        for (slot, vn) in inputs.iter().enumerate() {
            if vn.0 != u32::MAX {
                if let Ok(v) = self.varnode_mut(*vn) {
                    v.remove_descendant(op, slot as u16);
                }
            }
        }
        if let Some(out) = self.op(op)?.output {
            if let Ok(v) = self.varnode_mut(out) {
                v.def = None;
                v.flags.remove(VarnodeFlags::WRITTEN);
                v.flags.insert(VarnodeFlags::FREE);
            }
        }
        let seq = self.op(op)?.seq;
        self.seq_index.remove(&seq);
        self.ops[op.0 as usize] = None;
        Ok(())
    }

    /// Ops with the given opcode, in SeqNum order -- `beginOp(opcode)`.
    pub fn ops_with_opcode(&self, opcode: Opcode) -> Vec<PcodeOpId> {
        let mut found: Vec<PcodeOpId> = self
            .ops
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|op| op.opcode == opcode)
            .map(|op| op.id)
            .collect();
        found.sort_by_key(|id| self.op(*id).map(|o| o.seq).unwrap_or(SeqNum::any(Address::new(SpaceId(0), 0))));
        found
    }

    /// Non-dead ops, in SeqNum order -- `beginOpAlive`.
    pub fn ops_alive(&self) -> Vec<PcodeOpId> {
        let mut found: Vec<PcodeOpId> = self
            .ops
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|op| !op.is_dead())
            .map(|op| op.id)
            .collect();
        found.sort_by_key(|id| self.op(*id).map(|o| o.seq).unwrap_or(SeqNum::any(Address::new(SpaceId(0), 0))));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(off: u64) -> Address {
        Address::new(SpaceId(1), off)
    }

    fn store() -> IrStore {
        IrStore::new(SpaceId(2))
    }

    #[test]
    fn op_set_input_and_remove_keep_descendants_consistent() {
        let mut s = store();
        let vn = s.new_free_varnode(addr(0x10), 4, TypeId::INT4);
        let op = s.new_op(1, Opcode::IntNeg, BlockId(0), addr(0x100));
        s.op_set_input(op, vn, 0).unwrap();
        assert_eq!(s.varnode(vn).unwrap().descendants(), &[(op, 0)]);
        s.op_remove_input(op, 0).unwrap();
        assert!(s.varnode(vn).unwrap().descendants().is_empty());
    }

    #[test]
    fn op_set_output_sets_def_and_written_flag() {
        let mut s = store();
        let op = s.new_op(0, Opcode::Copy, BlockId(0), addr(0x100));
        let out = s.new_unique_out(4, op, TypeId::INT4).unwrap();
        assert!(s.varnode(out).unwrap().is_written());
        assert_eq!(s.varnode(out).unwrap().def, Some(op));
    }

    #[test]
    fn op_destroy_frees_output_and_clears_input_descendants() {
        let mut s = store();
        let input = s.new_free_varnode(addr(0x20), 4, TypeId::INT4);
        let op = s.new_op(1, Opcode::Copy, BlockId(0), addr(0x100));
        s.op_set_input(op, input, 0).unwrap();
        let out = s.new_unique_out(4, op, TypeId::INT4).unwrap();
        s.op_destroy(op).unwrap();
        assert!(s.varnode(input).unwrap().descendants().is_empty());
        assert!(s.varnode(out).unwrap().is_free());
        assert!(s.op(op).is_err());
    }

    #[test]
    fn find_op_by_seqnum() {
        let mut s = store();
        let op = s.new_op(0, Opcode::Copy, BlockId(0), addr(0x200));
        let seq = s.op(op).unwrap().seq;
        assert_eq!(s.find_op(seq).unwrap().id, op);
    }

    #[test]
    fn ops_with_opcode_filters_and_orders() {
        let mut s = store();
        let a = s.new_op(0, Opcode::IntAdd, BlockId(0), addr(0x10));
        let _b = s.new_op(0, Opcode::IntSub, BlockId(0), addr(0x14));
        let c = s.new_op(0, Opcode::IntAdd, BlockId(0), addr(0x18));
        assert_eq!(s.ops_with_opcode(Opcode::IntAdd), vec![a, c]);
    }

    #[test]
    fn varnodes_with_flags_filters_by_intersection() {
        let mut s = store();
        let input = s.new_input_varnode(addr(0x10), 4, TypeId::INT4);
        let _free = s.new_free_varnode(addr(0x20), 4, TypeId::INT4);
        let found = s.varnodes_with_flags(VarnodeFlags::INPUT);
        assert_eq!(found, vec![input]);
    }

    #[test]
    fn missing_varnode_error_matches_spec_message() {
        let s = store();
        let err = s.varnode(VarnodeId(99)).unwrap_err();
        assert_eq!(err.to_string(), "Requested varnode does not exist");
    }

    #[test]
    fn missing_seqnum_error_matches_spec_message() {
        let s = store();
        let err = s.find_op(SeqNum::any(addr(0))).unwrap_err();
        assert_eq!(err.to_string(), "Missing p-code sequence number");
    }
}
