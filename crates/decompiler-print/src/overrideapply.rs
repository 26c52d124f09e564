//! Applies a function's Override set during flow tracing and propagation
//! (spec.md §4.6).
//!
//! Grounded on `server/handlers/mutations.rs`'s shape: a thin entry point
//! that walks a batch of pending changes and applies each to in-memory
//! state, reporting what happened rather than applying silently. Here the
//! "pending changes" are `Funcdata::overrides` and the "state" is the IR
//! store plus the basic-block graph.
//!
//! Not every override kind has a direct IR mutation available at this
//! layer: flow-kind and forced-goto overrides rewrite data already present
//! in a built function; jumptable, prototype, and dead-code-delay
//! overrides describe facts consumed by flow-following and call-spec
//! resolution (the latter in [`crate::callspec`]), which this function
//! collects into the returned report rather than guessing at a mutation.

use std::collections::HashMap;

use decompiler_core::{Address, BlockEdgeFlags, FlowOverrideKind, Funcdata, Override, PcodeOpFlags, SpaceId};

use crate::error::PrintError;

/// What happened when a function's override set was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideApplyReport {
    /// Addresses whose op flow-kind was rewritten.
    pub flow_kind_rewrites: Vec<Address>,
    /// (from, to) block pairs whose edge was marked as a forced goto.
    pub forced_gotos: Vec<(Address, Address)>,
    /// Jumptable targets observed, keyed by the indirect-branch address.
    pub jumptables: HashMap<Address, Vec<Address>>,
    /// Call-spec model name to substitute at each overridden callsite.
    pub call_spec_overrides: HashMap<Address, String>,
    /// (space, delay) dead-code-delay settings observed.
    pub dead_code_delays: Vec<(SpaceId, i32)>,
}

/// Applies every override in `fd.overrides`, mutating the IR where the
/// override kind has a direct representation and recording the rest in the
/// returned report.
pub fn apply_overrides(fd: &mut Funcdata) -> Result<OverrideApplyReport, PrintError> {
    let overrides = fd.overrides.clone();
    let mut report = OverrideApplyReport::default();
    for ov in &overrides {
        match ov {
            Override::FlowKind { at, kind } => {
                apply_flow_kind(fd, *at, *kind)?;
                report.flow_kind_rewrites.push(*at);
            }
            Override::ForcedGoto { from, to } => {
                mark_forced_goto(fd, *from, *to)?;
                report.forced_gotos.push((*from, *to));
            }
            Override::Jumptable { at, targets } => {
                report.jumptables.insert(*at, targets.clone());
            }
            Override::Prototype { call_site, model } => {
                report.call_spec_overrides.insert(*call_site, model.clone());
            }
            Override::DeadCodeDelay { space, delay } => {
                report.dead_code_delays.push((*space, *delay));
            }
        }
    }
    Ok(report)
}

/// Every live op whose `seq.address` equals `addr`, in no particular order.
/// `IrStore::find_op` requires an exact `(address, uniq)` match, but an
/// override names only the address, so this scans the live set instead.
fn ops_at(fd: &Funcdata, addr: Address) -> Vec<decompiler_core::PcodeOpId> {
    fd.store
        .ops_alive()
        .into_iter()
        .filter(|&id| fd.store.op(id).map(|op| op.seq.address == addr).unwrap_or(false))
        .collect()
}

fn apply_flow_kind(fd: &mut Funcdata, at: Address, kind: FlowOverrideKind) -> Result<(), PrintError> {
    let ids = ops_at(fd, at);
    if ids.is_empty() {
        return Err(PrintError::OverrideTargetNotFound { address: at });
    }
    for id in ids {
        let op = fd.store.op_mut(id)?;
        match kind {
            FlowOverrideKind::Call => {
                op.flags.insert(PcodeOpFlags::CALL);
                op.flags.remove(PcodeOpFlags::BRANCH);
            }
            FlowOverrideKind::Branch => {
                op.flags.insert(PcodeOpFlags::BRANCH);
                op.flags.remove(PcodeOpFlags::CALL);
            }
            FlowOverrideKind::Return | FlowOverrideKind::CallReturn => {
                op.flags.remove(PcodeOpFlags::CALL);
                op.flags.remove(PcodeOpFlags::BRANCH);
            }
        }
    }
    Ok(())
}

fn mark_forced_goto(fd: &mut Funcdata, from: Address, to: Address) -> Result<(), PrintError> {
    let from_op = ops_at(fd, from)
        .into_iter()
        .next()
        .ok_or(PrintError::OverrideTargetNotFound { address: from })?;
    let to_op = ops_at(fd, to)
        .into_iter()
        .next()
        .ok_or(PrintError::OverrideTargetNotFound { address: to })?;
    let from_block = fd.store.op(from_op)?.parent;
    let to_block = fd.store.op(to_op)?.parent;

    let cfg = fd.cfg_mut();
    let from_idx = from_block.into();
    let to_idx = to_block.into();
    if let Some(edge) = cfg.find_edge(from_idx, to_idx) {
        if let Some(flags) = cfg.edge_weight_mut(edge) {
            flags.insert(BlockEdgeFlags::GOTO);
        }
    } else {
        cfg.add_edge(from_idx, to_idx, BlockEdgeFlags::GOTO);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{BasicBlock, FunctionId, Opcode, ScopeId};

    fn addr(off: u64) -> Address {
        Address::new(SpaceId(1), off)
    }

    fn sample_fd() -> Funcdata {
        let mut fd = Funcdata::new(FunctionId(0), "f", addr(0x1000), 0, ScopeId(0), SpaceId(2));
        let b0 = fd.add_block(BasicBlock::new());
        let b1 = fd.add_block(BasicBlock::new());
        fd.add_block_edge(b0, b1, BlockEdgeFlags::empty()).unwrap();
        let op0 = fd.store.new_op(0, Opcode::Branch, b0, addr(0x1004));
        let op1 = fd.store.new_op(0, Opcode::Return, b1, addr(0x1008));
        fd.block_mut(b0).unwrap().push_op(op0);
        fd.block_mut(b1).unwrap().push_op(op1);
        fd
    }

    #[test]
    fn flow_kind_override_rewrites_op_flags() {
        let mut fd = sample_fd();
        fd.overrides.push(Override::FlowKind { at: addr(0x1004), kind: FlowOverrideKind::Call });
        let report = apply_overrides(&mut fd).unwrap();
        assert_eq!(report.flow_kind_rewrites, vec![addr(0x1004)]);
        let ids = ops_at(&fd, addr(0x1004));
        let op = fd.store.op(ids[0]).unwrap();
        assert!(op.flags.contains(PcodeOpFlags::CALL));
    }

    #[test]
    fn forced_goto_marks_existing_edge() {
        let mut fd = sample_fd();
        fd.overrides.push(Override::ForcedGoto { from: addr(0x1004), to: addr(0x1008) });
        apply_overrides(&mut fd).unwrap();
        let b0 = fd.entry_block().unwrap();
        let edge = fd.cfg().find_edge(b0.into(), fd.cfg().node_indices().nth(1).unwrap());
        assert!(edge.is_some());
        let flags = fd.cfg().edge_weight(edge.unwrap()).unwrap();
        assert!(flags.contains(BlockEdgeFlags::GOTO));
    }

    #[test]
    fn prototype_override_is_collected_not_applied_directly() {
        let mut fd = sample_fd();
        fd.overrides.push(Override::Prototype { call_site: addr(0x1004), model: "stdcall".to_string() });
        let report = apply_overrides(&mut fd).unwrap();
        assert_eq!(report.call_spec_overrides.get(&addr(0x1004)), Some(&"stdcall".to_string()));
    }

    #[test]
    fn flow_kind_override_at_unknown_address_errors() {
        let mut fd = sample_fd();
        fd.overrides.push(Override::FlowKind { at: addr(0xdead), kind: FlowOverrideKind::Branch });
        assert!(apply_overrides(&mut fd).is_err());
    }
}
