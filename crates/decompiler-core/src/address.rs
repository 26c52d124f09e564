//! Address spaces and addresses.
//!
//! An [`Address`] is an (address-space, offset) pair. Offsets are wrapped
//! modulo the owning space's address range -- `a + s - s == a` must hold for
//! every address `a` and size `s` (spec.md §8).

use serde::{Deserialize, Serialize};

use crate::id::SpaceId;

/// The kind of an address space, determining how offsets in it are
/// interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceKind {
    /// Holds immediate values; a constant's offset *is* its value.
    Constant,
    /// A normal processor address space (RAM, register banks, ...).
    Processor,
    /// A space-base register's virtual address space (e.g. the stack).
    Spacebase,
    /// SSA-only temporaries ("uniques") with no processor-visible storage.
    Internal,
    /// Reserved for special purposes (e.g. `join` storage).
    Special,
}

/// Endianness of an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    Big,
    Little,
}

/// An address space: an index, shortcut letter, word size, address size,
/// endianness, and kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpace {
    /// Index into the owning `Architecture`'s space table.
    pub id: SpaceId,
    /// Human name (e.g. "ram", "register", "const", "unique").
    pub name: String,
    /// Single-letter shortcut used in textual addresses (e.g. 'r', 'u').
    pub shortcut: char,
    /// Size in bytes of one addressable word.
    pub word_size: u32,
    /// Size in bytes of an address (e.g. 4 or 8).
    pub address_size: u32,
    pub endian: Endian,
    pub kind: SpaceKind,
    /// For `join` spaces: the piece spaces this one splits storage across,
    /// most-significant first. Empty for non-join spaces.
    pub join_pieces: Vec<SpaceId>,
}

impl AddressSpace {
    pub fn new(
        id: SpaceId,
        name: impl Into<String>,
        shortcut: char,
        word_size: u32,
        address_size: u32,
        endian: Endian,
        kind: SpaceKind,
    ) -> Self {
        AddressSpace {
            id,
            name: name.into(),
            shortcut,
            word_size,
            address_size,
            endian,
            kind,
            join_pieces: Vec::new(),
        }
    }

    /// Constructs a `join` space describing split storage across `pieces`.
    pub fn new_join(id: SpaceId, name: impl Into<String>, pieces: Vec<SpaceId>) -> Self {
        AddressSpace {
            id,
            name: name.into(),
            shortcut: 'j',
            word_size: 1,
            address_size: 8,
            endian: Endian::Big,
            kind: SpaceKind::Special,
            join_pieces: pieces,
        }
    }

    /// The highest representable offset in this space (all-ones mask).
    pub fn max_offset(&self) -> u64 {
        if self.address_size >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.address_size * 8)) - 1
        }
    }

    /// Wraps an offset into this space's representable range.
    pub fn wrap(&self, offset: u64) -> u64 {
        offset & self.max_offset()
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, SpaceKind::Constant)
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.kind, SpaceKind::Internal)
    }
}

/// An (address-space, offset) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub space: SpaceId,
    pub offset: u64,
}

impl Address {
    pub fn new(space: SpaceId, offset: u64) -> Self {
        Address { space, offset }
    }

    /// Adds `delta` to this address's offset, wrapping per `space`'s range.
    pub fn add_wrapped(&self, delta: i64, space: &AddressSpace) -> Address {
        let wrapped = (self.offset as i128 + delta as i128).rem_euclid(space.max_offset() as i128 + 1);
        Address {
            space: self.space,
            offset: space.wrap(wrapped as u64),
        }
    }
}
