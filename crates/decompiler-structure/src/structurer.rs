//! Control-flow structuring pipeline (spec.md §4.4): seeds a structured
//! graph 1:1 from the basic-block CFG, splits shared return blocks,
//! discovers loops, selects the minimal goto set, then collapses and
//! conditional-joins to a fixpoint.
//!
//! Follows the short, linear driver-function shape used for the
//! top-level pipeline elsewhere in this workspace: each stage runs in
//! order, threading a single error type through `?`. There it compiled
//! one program through codegen and linking; here it structures one
//! function's CFG.

use std::collections::HashMap;

use decompiler_core::{BlockId, FlowBlockKind, Funcdata, StructId};

use crate::collapse::{collapse_all, live_roots};
use crate::conditionaljoin::conditional_join_pass;
use crate::error::StructureError;
use crate::loopbody::{find_loop_bodies, LoopBody};
use crate::returnsplit::split_returns;
use crate::tracedag::{label_gotos, select_gotos};

/// Replaces the structured graph with a fresh 1:1 copy of the basic-block
/// CFG: one `FlowBlockKind::Basic` node per `BlockId`, same edges and
/// flags. Returns the struct id standing in for the entry block.
fn seed_from_cfg(fd: &mut Funcdata) -> Result<StructId, StructureError> {
    let entry = fd.entry_block().ok_or(StructureError::MissingEntryBlock)?;

    let block_ids: Vec<BlockId> = fd.cfg().node_indices().map(BlockId::from).collect();
    let mut struct_of: HashMap<BlockId, StructId> = HashMap::new();
    for block_id in &block_ids {
        let sid = fd.add_struct_block(FlowBlockKind::Basic(*block_id));
        struct_of.insert(*block_id, sid);
    }

    let edges: Vec<_> = fd
        .cfg()
        .edge_indices()
        .filter_map(|e| fd.cfg().edge_endpoints(e).map(|(s, d)| (s, d, *fd.cfg().edge_weight(e).unwrap())))
        .collect();
    for (src, dst, flags) in edges {
        let src_struct = struct_of[&BlockId::from(src)];
        let dst_struct = struct_of[&BlockId::from(dst)];
        fd.structured_mut().add_edge(src_struct.into(), dst_struct.into(), flags);
    }

    let root = struct_of[&entry];
    fd.set_structured_root(root);
    Ok(root)
}

/// Structures one function's basic-block CFG into a single-rooted
/// hierarchy of `FlowBlockKind` nodes.
///
/// Order: seed, split shared returns, discover loops once to label exits
/// and pick gotos, then collapse to a fixpoint interleaved with
/// conditional join (each can expose matches for the other). Completion
/// is measured by `live_roots`, not raw node count: a collapse rule keeps
/// every absorbed node alive in the graph as the parent's child (so it
/// stays reachable through `Funcdata::struct_block`), it just stops being
/// a root.
pub fn structure_function(fd: &mut Funcdata) -> Result<StructId, StructureError> {
    let root = seed_from_cfg(fd)?;
    split_returns(fd);

    let loops = find_loop_bodies(fd, root);
    let gotos = select_gotos(fd, &loops);
    label_gotos(fd, &gotos);

    loop {
        collapse_all(fd, root, find_loop_bodies)?;
        if live_roots(fd).len() <= 1 {
            break;
        }
        if !conditional_join_pass(fd) {
            break;
        }
    }

    let remaining = live_roots(fd);
    if remaining.len() > 1 {
        return Err(StructureError::UnstructuredRemnant { remaining: remaining.len() });
    }

    let new_root = remaining.first().copied().unwrap_or(root);
    fd.set_structured_root(new_root);
    Ok(new_root)
}
