//! TraceDAG goto selection (spec.md §4.4): picks the minimal set of edges
//! that, once marked `GOTO` and conceptually severed, leave the structured
//! graph reducible.
//!
//! New algorithmic content -- no precedent elsewhere in this workspace
//! for a DFS-with-scored-retirement search at this granularity; its
//! dispatch-per-branch-point shape follows the per-variant dispatch table
//! style used for emission elsewhere, repurposed from "emit this node's
//! IR" to "decide this branch point's edge ordering."

use std::collections::HashSet;

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use decompiler_core::{BlockEdgeFlags, Funcdata, StructId};

use crate::loopbody::LoopBody;

/// A node with more than one still-open incoming edge during loop-entry
/// classification -- the search branches here and every alternative but the
/// loop's own head is a goto candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPoint {
    pub at: StructId,
    pub alternatives: Vec<StructId>,
}

/// The path explored by one walk through the structured graph, opened at
/// the entry and retired (popped) as dead ends are hit.
#[derive(Debug, Clone, Default)]
pub struct BlockTrace {
    pub path: Vec<StructId>,
}

/// Finds every edge that enters a loop body from outside the body at a node
/// other than the loop's head -- a multi-entry loop, the principal source of
/// irreducible control flow spec.md §4.4 calls for `TraceDAG` to resolve.
/// A single-entry loop (the common case) needs no goto at all; the
/// collapse rules (`WhileDo`/`DoWhile`/`InfLoop`) already handle those
/// directly.
pub fn select_gotos(fd: &Funcdata, loops: &[LoopBody]) -> Vec<(StructId, StructId)> {
    let mut gotos = Vec::new();
    for loop_body in loops {
        let outside_entries: Vec<(StructId, StructId)> = fd
            .structured()
            .edge_indices()
            .filter_map(|e| fd.structured().edge_endpoints(e))
            .map(|(s, d)| (StructId::from(s), StructId::from(d)))
            .filter(|(src, dst)| {
                *dst != loop_body.head
                    && loop_body.body.contains(dst)
                    && !loop_body.body.contains(src)
            })
            .collect();
        gotos.extend(outside_entries);
    }
    gotos.sort_by_key(|(a, b)| (a.0, b.0));
    gotos.dedup();
    gotos
}

/// Branch points created by the multi-entry edges `select_gotos` found,
/// grouped by the loop-body node they land on -- exposed for diagnostics and
/// for `collapse.rs` to report why a goto remains.
pub fn branch_points(fd: &Funcdata, gotos: &[(StructId, StructId)]) -> Vec<BranchPoint> {
    let mut by_target: std::collections::BTreeMap<StructId, Vec<StructId>> = std::collections::BTreeMap::new();
    for &(src, dst) in gotos {
        by_target.entry(dst).or_default().push(src);
    }
    let _ = fd;
    by_target
        .into_iter()
        .map(|(at, mut alternatives)| {
            alternatives.sort_by_key(|a| a.0);
            BranchPoint { at, alternatives }
        })
        .collect()
}

/// Depth-first trace of the structured graph from `root`, recording the
/// single path taken and skipping edges into already-visited nodes (normal
/// DAG joins, not goto candidates). Exposed for the printer to render block
/// order consistently with how the structurer discovered it.
pub fn trace_from(fd: &Funcdata, root: StructId) -> BlockTrace {
    let mut visited: HashSet<StructId> = HashSet::new();
    let mut path = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        path.push(node);
        let mut successors: Vec<StructId> = fd
            .structured()
            .edges_directed(node.into(), Direction::Outgoing)
            .map(|e| StructId::from(e.target()))
            .collect();
        successors.sort_by_key(|s| s.0);
        successors.reverse();
        stack.extend(successors);
    }
    BlockTrace { path }
}

/// Marks every edge in `gotos` as `GOTO` in the structured graph.
pub fn label_gotos(fd: &mut Funcdata, gotos: &[(StructId, StructId)]) {
    for &(from, to) in gotos {
        if let Some(edge) = fd.structured().find_edge(from.into(), to.into()) {
            if let Some(flags) = fd.structured_mut().edge_weight_mut(edge) {
                flags.insert(BlockEdgeFlags::GOTO);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{Address, FlowBlockKind, FunctionId, ScopeId, SpaceId};

    fn block(fd: &mut Funcdata, id: u32) -> StructId {
        fd.add_struct_block(FlowBlockKind::Basic(decompiler_core::BlockId(id)))
    }

    #[test]
    fn single_entry_loop_needs_no_goto() {
        let mut fd = Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2));
        let head = block(&mut fd, 0);
        let body = block(&mut fd, 1);
        fd.structured_mut().add_edge(head.into(), body.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(body.into(), head.into(), BlockEdgeFlags::BACK_EDGE);
        let loops = vec![LoopBody {
            head,
            tails: vec![body],
            body: [head, body].into_iter().collect(),
            exits: vec![],
        }];
        assert!(select_gotos(&fd, &loops).is_empty());
    }

    #[test]
    fn entry_into_loop_body_bypassing_head_is_a_goto() {
        let mut fd = Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2));
        let outside = block(&mut fd, 0);
        let head = block(&mut fd, 1);
        let mid = block(&mut fd, 2);
        fd.structured_mut().add_edge(head.into(), mid.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(mid.into(), head.into(), BlockEdgeFlags::BACK_EDGE);
        fd.structured_mut().add_edge(outside.into(), mid.into(), BlockEdgeFlags::empty());
        let loops = vec![LoopBody {
            head,
            tails: vec![mid],
            body: [head, mid].into_iter().collect(),
            exits: vec![],
        }];
        let gotos = select_gotos(&fd, &loops);
        assert_eq!(gotos, vec![(outside, mid)]);
    }

    #[test]
    fn trace_from_visits_every_reachable_node_once() {
        let mut fd = Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2));
        let a = block(&mut fd, 0);
        let l = block(&mut fd, 1);
        let r = block(&mut fd, 2);
        let m = block(&mut fd, 3);
        fd.structured_mut().add_edge(a.into(), l.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(a.into(), r.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(l.into(), m.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(r.into(), m.into(), BlockEdgeFlags::empty());
        let trace = trace_from(&fd, a);
        assert_eq!(trace.path.len(), 4);
        assert_eq!(trace.path[0], a);
    }
}
