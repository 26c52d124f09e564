//! Varnode: a storage location participating in dataflow.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::datatype::TypeId;
use crate::id::PcodeOpId;

bitflags! {
    /// Boolean properties a Varnode may carry. Several are mutually
    /// informative rather than mutually exclusive (e.g. `ADDRTIED` and
    /// `PERSIST` commonly co-occur).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct VarnodeFlags: u32 {
        /// Varnode is a function input (parameter or uninitialized-on-entry read).
        const INPUT       = 1 << 0;
        /// Varnode has a defining PcodeOp. `WRITTEN` <=> `def.is_some()`.
        const WRITTEN     = 1 << 1;
        /// Neither `INPUT` nor `WRITTEN`.
        const FREE        = 1 << 2;
        /// Lives in the constant address space; offset is the value.
        const CONSTANT    = 1 << 3;
        /// Carries metadata only, not a real dataflow value.
        const ANNOTATION  = 1 << 4;
        /// Type is locked -- the propagator must not overwrite it.
        const TYPELOCK    = 1 << 5;
        /// Name is locked -- renaming tools must not rename it.
        const NAMELOCK    = 1 << 6;
        /// Storage persists across the function (globals, statics).
        const PERSIST     = 1 << 7;
        /// Reads/writes have observable side effects; never dead-code-eliminate.
        const VOLATILE    = 1 << 8;
        /// Storage is read-only.
        const READONLY    = 1 << 9;
        /// This varnode is itself a space-base register value.
        const SPACEBASE   = 1 << 10;
        /// Value is implied by context; suppressed in output unless forced.
        const IMPLIED     = 1 << 11;
        /// Scratch bit for traversals. MUST be cleared before control
        /// returns to the caller that set it (spec.md §9).
        const MARK        = 1 << 12;
        /// Tied to one address across its whole lifetime (not SSA-renamed
        /// freely).
        const ADDRTIED    = 1 << 13;
        /// Unaffected by calls (callee-saved).
        const UNAFFECTED  = 1 << 14;
    }
}

/// A storage location participating in dataflow: an address + size in
/// bytes, an optional definition, a set of reading ops (descendants), a
/// datatype, and a property bitset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Varnode {
    pub address: Address,
    pub size: u32,
    pub datatype: TypeId,
    pub flags: VarnodeFlags,
    /// The op that writes this varnode, if any. `Some` iff `WRITTEN` is set.
    pub def: Option<PcodeOpId>,
    /// Ops that read this varnode, ordered by (seqnum, slot) -- an ordered
    /// set, never a plain unordered collection, so iteration is
    /// deterministic (spec.md §5 Ordering).
    descendants: Vec<(PcodeOpId, u16)>,
    /// Per-function monotone creation index, used to tie-break same-seqnum
    /// iteration (spec.md §5).
    pub creation_index: u64,
}

impl Varnode {
    pub fn new_free(address: Address, size: u32, datatype: TypeId, creation_index: u64) -> Self {
        Varnode {
            address,
            size,
            datatype,
            flags: VarnodeFlags::FREE,
            def: None,
            descendants: Vec::new(),
            creation_index,
        }
    }

    pub fn new_input(address: Address, size: u32, datatype: TypeId, creation_index: u64) -> Self {
        Varnode {
            address,
            size,
            datatype,
            flags: VarnodeFlags::INPUT,
            def: None,
            descendants: Vec::new(),
            creation_index,
        }
    }

    pub fn new_constant(space_offset_value: u64, size: u32, datatype: TypeId, address: Address, creation_index: u64) -> Self {
        let _ = space_offset_value;
        Varnode {
            address,
            size,
            datatype,
            flags: VarnodeFlags::CONSTANT | VarnodeFlags::FREE,
            def: None,
            descendants: Vec::new(),
            creation_index,
        }
    }

    pub fn is_input(&self) -> bool {
        self.flags.contains(VarnodeFlags::INPUT)
    }

    pub fn is_written(&self) -> bool {
        self.def.is_some()
    }

    pub fn is_free(&self) -> bool {
        !self.is_input() && !self.is_written()
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(VarnodeFlags::CONSTANT)
    }

    /// Marks this varnode as defined by `op`, setting `WRITTEN` and clearing
    /// `INPUT`/`FREE`.
    pub fn set_def(&mut self, op: PcodeOpId) {
        self.def = Some(op);
        self.flags.remove(VarnodeFlags::INPUT | VarnodeFlags::FREE);
        self.flags.insert(VarnodeFlags::WRITTEN);
    }

    /// Inserts `(op, slot)` into the ordered descendant set if not already
    /// present, keeping the set sorted by `(op, slot)`.
    pub fn add_descendant(&mut self, op: PcodeOpId, slot: u16) {
        let key = (op, slot);
        match self.descendants.binary_search(&key) {
            Ok(_) => {}
            Err(pos) => self.descendants.insert(pos, key),
        }
    }

    pub fn remove_descendant(&mut self, op: PcodeOpId, slot: u16) {
        let key = (op, slot);
        if let Ok(pos) = self.descendants.binary_search(&key) {
            self.descendants.remove(pos);
        }
    }

    pub fn descendants(&self) -> &[(PcodeOpId, u16)] {
        &self.descendants
    }

    pub fn clear_mark(&mut self) {
        self.flags.remove(VarnodeFlags::MARK);
    }

    pub fn set_mark(&mut self) {
        self.flags.insert(VarnodeFlags::MARK);
    }

    pub fn is_marked(&self) -> bool {
        self.flags.contains(VarnodeFlags::MARK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SpaceId;

    fn addr(off: u64) -> Address {
        Address::new(SpaceId(1), off)
    }

    #[test]
    fn free_iff_not_input_and_not_written() {
        let vn = Varnode::new_free(addr(0x10), 4, TypeId(0), 0);
        assert!(vn.is_free());
        assert!(!vn.is_input());
        assert!(!vn.is_written());
    }

    #[test]
    fn set_def_clears_free_and_input() {
        let mut vn = Varnode::new_input(addr(0x10), 4, TypeId(0), 0);
        assert!(vn.is_input());
        vn.set_def(PcodeOpId(5));
        assert!(vn.is_written());
        assert!(!vn.is_input());
        assert!(!vn.is_free());
        assert_eq!(vn.def, Some(PcodeOpId(5)));
    }

    #[test]
    fn descendants_stay_ordered_and_deduplicated() {
        let mut vn = Varnode::new_free(addr(0x10), 4, TypeId(0), 0);
        vn.add_descendant(PcodeOpId(3), 0);
        vn.add_descendant(PcodeOpId(1), 0);
        vn.add_descendant(PcodeOpId(2), 1);
        vn.add_descendant(PcodeOpId(1), 0); // duplicate, ignored
        assert_eq!(
            vn.descendants(),
            &[(PcodeOpId(1), 0), (PcodeOpId(2), 1), (PcodeOpId(3), 0)]
        );
    }

    #[test]
    fn remove_descendant_removes_exactly_one() {
        let mut vn = Varnode::new_free(addr(0x10), 4, TypeId(0), 0);
        vn.add_descendant(PcodeOpId(1), 0);
        vn.add_descendant(PcodeOpId(2), 0);
        vn.remove_descendant(PcodeOpId(1), 0);
        assert_eq!(vn.descendants(), &[(PcodeOpId(2), 0)]);
    }

    #[test]
    fn mark_is_scratch_and_clearable() {
        let mut vn = Varnode::new_free(addr(0x10), 4, TypeId(0), 0);
        vn.set_mark();
        assert!(vn.is_marked());
        vn.clear_mark();
        assert!(!vn.is_marked());
    }

    #[test]
    fn constant_varnode_is_constant_and_free() {
        let vn = Varnode::new_constant(7, 4, TypeId(0), addr(7), 0);
        assert!(vn.is_constant());
        assert!(vn.is_free());
    }

    #[test]
    fn serde_roundtrip_flags() {
        let flags = VarnodeFlags::TYPELOCK | VarnodeFlags::PERSIST;
        let json = serde_json::to_string(&flags).unwrap();
        let back: VarnodeFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, back);
    }
}
