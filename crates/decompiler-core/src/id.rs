//! Stable ID newtypes for IR entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, so a `VarnodeId` cannot
//! be accidentally used where a `PcodeOpId` is expected. `BlockId` bridges to
//! petgraph's `NodeIndex<u32>` since the basic-block graph is a
//! `StableGraph`; varnodes and p-code ops live in arenas addressed by their
//! own newtypes (see `store.rs`).

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable varnode identifier. Index into a `Funcdata`'s varnode arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarnodeId(pub u32);

/// Stable p-code op identifier. Index into a `Funcdata`'s op arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PcodeOpId(pub u32);

/// Stable basic-block identifier. Maps to a petgraph `NodeIndex<u32>` in the
/// basic-block graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Stable structured-block identifier. Maps to a petgraph `NodeIndex<u32>`
/// in the *structured* graph produced by the control-flow structurer --
/// a separate node space from `BlockId`'s basic-block graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructId(pub u32);

/// Address-space identifier. Index into the `Architecture`'s space table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub u32);

/// Function identity within an `Architecture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

/// Symbol identity within a `Scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Scope identity within a `Scope` tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

// Display implementations -- just print the inner value.

macro_rules! impl_display {
    ($t:ty) => {
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_display!(VarnodeId);
impl_display!(PcodeOpId);
impl_display!(BlockId);
impl_display!(StructId);
impl_display!(SpaceId);
impl_display!(FunctionId);
impl_display!(SymbolId);
impl_display!(ScopeId);

// Bridge between BlockId and petgraph's NodeIndex<u32>, used by the
// basic-block `StableGraph`.

impl From<NodeIndex<u32>> for BlockId {
    fn from(idx: NodeIndex<u32>) -> Self {
        BlockId(idx.index() as u32)
    }
}

impl From<BlockId> for NodeIndex<u32> {
    fn from(id: BlockId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl From<NodeIndex<u32>> for StructId {
    fn from(idx: NodeIndex<u32>) -> Self {
        StructId(idx.index() as u32)
    }
}

impl From<StructId> for NodeIndex<u32> {
    fn from(id: StructId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let block_id = BlockId::from(idx);
        assert_eq!(block_id.0, 42);

        let back: NodeIndex<u32> = block_id.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn display_impls() {
        assert_eq!(format!("{}", VarnodeId(7)), "7");
        assert_eq!(format!("{}", PcodeOpId(9)), "9");
        assert_eq!(format!("{}", BlockId(1)), "1");
        assert_eq!(format!("{}", SpaceId(0)), "0");
        assert_eq!(format!("{}", FunctionId(3)), "3");
    }

    #[test]
    fn id_types_are_distinct() {
        let vn = VarnodeId(1);
        let op = PcodeOpId(1);
        let blk = BlockId(1);
        assert_eq!(vn.0, op.0);
        assert_eq!(op.0, blk.0);
    }

    #[test]
    fn serde_roundtrip() {
        let vn = VarnodeId(42);
        let json = serde_json::to_string(&vn).unwrap();
        let back: VarnodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(vn, back);
    }

    #[test]
    fn ids_are_ordered() {
        let mut ids = vec![VarnodeId(3), VarnodeId(1), VarnodeId(2)];
        ids.sort();
        assert_eq!(ids, vec![VarnodeId(1), VarnodeId(2), VarnodeId(3)]);
    }
}
