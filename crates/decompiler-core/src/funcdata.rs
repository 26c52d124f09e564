//! Funcdata: the per-function IR container.

use bitflags::bitflags;
use petgraph::stable_graph::StableGraph;
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::block::{BasicBlock, BlockEdgeFlags, FlowBlockKind};
use crate::datatype::TypeId;
use crate::error::CoreError;
use crate::id::{BlockId, FunctionId, ScopeId, StructId};
use crate::store::IrStore;

bitflags! {
    /// Per-function status bits tracked across the decompile pipeline
    /// (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FuncdataFlags: u32 {
        /// No p-code could be raised for this function (e.g. no bytes
        /// mapped at its entry).
        const NO_CODE             = 1 << 0;
        /// Flow-following has started (guards against re-entrant tracing).
        const PROC_STARTED        = 1 << 1;
        /// HighVariables have been computed; cover queries are meaningful.
        const HIGH_ON             = 1 << 2;
        /// A jumptable recovery pass is in progress for this function.
        const JUMPTABLE_RECOVERY  = 1 << 3;
    }
}

/// A per-function override: a user- or heuristic-supplied instruction that
/// changes how this function is decompiled (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Override {
    ForcedGoto { from: Address, to: Address },
    Jumptable { at: Address, targets: Vec<Address> },
    FlowKind { at: Address, kind: FlowOverrideKind },
    Prototype { call_site: Address, model: String },
    DeadCodeDelay { space: crate::id::SpaceId, delay: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOverrideKind {
    Call,
    Return,
    Branch,
    CallReturn,
}

/// The per-function container: entry point, size, IR store, basic-block and
/// structured graphs, local scope, overrides, and status flags.
///
/// `arch` is intentionally *not* stored here -- per spec.md §9's
/// "global state" design note, the owning `Architecture` is passed
/// explicitly to every entry point that needs it, rather than Funcdata
/// holding a back-reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Funcdata {
    pub id: FunctionId,
    pub entry: Address,
    pub size: u32,
    pub name: String,
    pub local_scope: ScopeId,
    pub prototype_return: TypeId,
    pub store: IrStore,
    cfg: StableGraph<BasicBlock, BlockEdgeFlags, Directed, u32>,
    structured: StableGraph<FlowBlockKind, BlockEdgeFlags, Directed, u32>,
    entry_block: Option<BlockId>,
    structured_root: Option<StructId>,
    pub overrides: Vec<Override>,
    pub flags: FuncdataFlags,
}

impl Funcdata {
    pub fn new(
        id: FunctionId,
        name: impl Into<String>,
        entry: Address,
        size: u32,
        local_scope: ScopeId,
        unique_space: crate::id::SpaceId,
    ) -> Self {
        Funcdata {
            id,
            entry,
            size,
            name: name.into(),
            local_scope,
            prototype_return: TypeId::VOID,
            store: IrStore::new(unique_space),
            cfg: StableGraph::new(),
            structured: StableGraph::new(),
            entry_block: None,
            structured_root: None,
            overrides: Vec::new(),
            flags: FuncdataFlags::empty(),
        }
    }

    /// Discards SSA-derived state (blocks, structured graph, HIGH_ON)
    /// without losing the function's identity or overrides --
    /// `clearAnalysis(fd)` of spec.md §4.2/§7.
    pub fn clear_analysis(&mut self) {
        self.cfg = StableGraph::new();
        self.structured = StableGraph::new();
        self.entry_block = None;
        self.structured_root = None;
        self.flags.remove(FuncdataFlags::HIGH_ON | FuncdataFlags::PROC_STARTED);
    }

    // -- basic-block graph ---------------------------------------------------

    pub fn add_block(&mut self, block: BasicBlock) -> BlockId {
        let idx = self.cfg.add_node(block);
        let id = BlockId::from(idx);
        if self.entry_block.is_none() {
            self.entry_block = Some(id);
        }
        id
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock, CoreError> {
        self.cfg
            .node_weight(id.into())
            .ok_or(CoreError::BlockNotFound { id })
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock, CoreError> {
        self.cfg
            .node_weight_mut(id.into())
            .ok_or(CoreError::BlockNotFound { id })
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.entry_block
    }

    pub fn add_block_edge(
        &mut self,
        from: BlockId,
        to: BlockId,
        flags: BlockEdgeFlags,
    ) -> Result<(), CoreError> {
        if self.cfg.node_weight(from.into()).is_none() {
            return Err(CoreError::BlockNotFound { id: from });
        }
        if self.cfg.node_weight(to.into()).is_none() {
            return Err(CoreError::BlockNotFound { id: to });
        }
        self.cfg.add_edge(from.into(), to.into(), flags);
        Ok(())
    }

    pub fn cfg(&self) -> &StableGraph<BasicBlock, BlockEdgeFlags, Directed, u32> {
        &self.cfg
    }

    pub fn cfg_mut(&mut self) -> &mut StableGraph<BasicBlock, BlockEdgeFlags, Directed, u32> {
        &mut self.cfg
    }

    pub fn block_count(&self) -> usize {
        self.cfg.node_count()
    }

    // -- structured graph -----------------------------------------------------

    pub fn add_struct_block(&mut self, kind: FlowBlockKind) -> StructId {
        let idx = self.structured.add_node(kind);
        StructId::from(idx)
    }

    pub fn struct_block(&self, id: StructId) -> Option<&FlowBlockKind> {
        self.structured.node_weight(id.into())
    }

    pub fn set_structured_root(&mut self, id: StructId) {
        self.structured_root = Some(id);
    }

    pub fn structured_root(&self) -> Option<StructId> {
        self.structured_root
    }

    pub fn structured(&self) -> &StableGraph<FlowBlockKind, BlockEdgeFlags, Directed, u32> {
        &self.structured
    }

    pub fn structured_mut(&mut self) -> &mut StableGraph<FlowBlockKind, BlockEdgeFlags, Directed, u32> {
        &mut self.structured
    }

    /// Whether every block in the structured graph has been collapsed away
    /// (no edges remain) -- the termination condition of `collapseAll`
    /// (spec.md §8).
    pub fn structuring_is_isolated(&self) -> bool {
        self.structured.edge_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SpaceId;

    fn entry_addr() -> Address {
        Address::new(SpaceId(1), 0x1000)
    }

    #[test]
    fn entry_block_is_first_added() {
        let mut fd = Funcdata::new(FunctionId(0), "f", entry_addr(), 0, ScopeId(0), SpaceId(3));
        let b0 = fd.add_block(BasicBlock::new());
        let _b1 = fd.add_block(BasicBlock::new());
        assert_eq!(fd.entry_block(), Some(b0));
    }

    #[test]
    fn clear_analysis_drops_blocks_but_keeps_identity() {
        let mut fd = Funcdata::new(FunctionId(0), "f", entry_addr(), 0, ScopeId(0), SpaceId(3));
        fd.add_block(BasicBlock::new());
        fd.flags.insert(FuncdataFlags::HIGH_ON);
        fd.clear_analysis();
        assert_eq!(fd.block_count(), 0);
        assert!(!fd.flags.contains(FuncdataFlags::HIGH_ON));
        assert_eq!(fd.name, "f");
    }

    #[test]
    fn add_block_edge_rejects_unknown_block() {
        let mut fd = Funcdata::new(FunctionId(0), "f", entry_addr(), 0, ScopeId(0), SpaceId(3));
        let b0 = fd.add_block(BasicBlock::new());
        let err = fd.add_block_edge(b0, BlockId(99), BlockEdgeFlags::empty());
        assert!(err.is_err());
    }

    #[test]
    fn structuring_is_isolated_when_no_edges() {
        let mut fd = Funcdata::new(FunctionId(0), "f", entry_addr(), 0, ScopeId(0), SpaceId(3));
        fd.add_struct_block(FlowBlockKind::Basic(BlockId(0)));
        assert!(fd.structuring_is_isolated());
    }
}
