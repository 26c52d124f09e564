//! SeqNum: identifies a p-code op within the linearized instruction stream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// `uniq` sentinel meaning "any" -- used when matching a SeqNum without
/// regard to its disambiguating tag.
pub const UNIQ_ANY: u32 = u32::MAX;

/// (address, uniq) identifies a p-code op within the linearized instruction
/// stream. `uniq` is a 32-bit tag assigned at flow time; `UNIQ_ANY` matches
/// any tag at that address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeqNum {
    pub address: Address,
    pub uniq: u32,
}

impl SeqNum {
    pub fn new(address: Address, uniq: u32) -> Self {
        SeqNum { address, uniq }
    }

    /// A SeqNum at `address` matching any uniq tag.
    pub fn any(address: Address) -> Self {
        SeqNum {
            address,
            uniq: UNIQ_ANY,
        }
    }

    /// Whether this SeqNum matches `other`, treating `UNIQ_ANY` as a
    /// wildcard on either side.
    pub fn matches(&self, other: &SeqNum) -> bool {
        self.address == other.address
            && (self.uniq == UNIQ_ANY || other.uniq == UNIQ_ANY || self.uniq == other.uniq)
    }
}

impl PartialOrd for SeqNum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeqNum {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.address.space, self.address.offset, self.uniq).cmp(&(
            other.address.space,
            other.address.offset,
            other.uniq,
        ))
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uniq == UNIQ_ANY {
            write!(f, "{:#x}:*", self.address.offset)
        } else {
            write!(f, "{:#x}:{}", self.address.offset, self.uniq)
        }
    }
}
