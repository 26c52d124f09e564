//! Loop discovery over the structured graph (spec.md §4.4).
//!
//! Finds natural loops via back-edge detection against the dominator tree,
//! then grows each loop's body to include every node that reaches a tail
//! without first leaving through the head, and labels the edges that leave
//! the body as exits. Generalizes the graph-traversal-with-accumulator
//! style used for topological sorts elsewhere in this workspace from a
//! one-shot DAG walk to a reachability/containment walk over a cyclic
//! graph.

use std::collections::{HashSet, VecDeque};

use petgraph::algo::dominators::{self, Dominators};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use decompiler_core::{BlockEdgeFlags, Funcdata, StructId};

/// One natural loop: its header, every tail (node with a back edge to the
/// header), the full set of body nodes, and the edges that leave the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopBody {
    pub head: StructId,
    pub tails: Vec<StructId>,
    pub body: HashSet<StructId>,
    pub exits: Vec<(StructId, StructId)>,
}

/// Finds the set of back edges `(tail, head)` where `head` dominates `tail`
/// in the structured graph -- `findBase` of spec.md §4.4.
fn find_base(fd: &Funcdata, root: StructId) -> Vec<(StructId, StructId)> {
    let doms: Dominators<petgraph::graph::NodeIndex<u32>> =
        dominators::simple_fast(fd.structured(), root.into());
    let mut back_edges = Vec::new();
    for edge in fd.structured().edge_indices() {
        let (src, dst) = fd.structured().edge_endpoints(edge).unwrap();
        let dominates = {
            let mut cur = Some(src);
            let mut found = src == dst;
            while let Some(c) = cur {
                if c == dst {
                    found = true;
                    break;
                }
                cur = doms.immediate_dominator(c);
                if cur == Some(c) {
                    break;
                }
            }
            found
        };
        if dominates {
            back_edges.push((StructId::from(src), StructId::from(dst)));
        }
    }
    back_edges
}

/// Grows a loop body from its head and tails: every node that can reach a
/// tail by a path staying within the body, found by walking predecessors
/// backward from each tail until the head is reached -- `extend` of
/// spec.md §4.4.
fn extend(fd: &Funcdata, head: StructId, tails: &[StructId]) -> HashSet<StructId> {
    let mut body: HashSet<StructId> = HashSet::new();
    body.insert(head);
    let mut worklist: VecDeque<StructId> = tails.iter().copied().collect();
    for &t in tails {
        body.insert(t);
    }
    while let Some(node) = worklist.pop_front() {
        if node == head {
            continue;
        }
        for edge in fd.structured().edges_directed(node.into(), Direction::Incoming) {
            let pred = StructId::from(edge.source());
            if body.insert(pred) {
                worklist.push_back(pred);
            }
        }
    }
    body
}

/// Edges leaving `body` (source inside, destination outside) -- `findExit`
/// of spec.md §4.4.
fn find_exit(fd: &Funcdata, body: &HashSet<StructId>) -> Vec<(StructId, StructId)> {
    let mut exits = Vec::new();
    for &node in body {
        for edge in fd.structured().edges_directed(node.into(), Direction::Outgoing) {
            let dst = StructId::from(edge.target());
            if !body.contains(&dst) {
                exits.push((node, dst));
            }
        }
    }
    exits.sort_by_key(|(a, b)| (a.0, b.0));
    exits
}

/// Deterministic tail ordering: lowest `StructId` first -- `orderTails` of
/// spec.md §4.4, used so loop-body construction never depends on HashMap
/// iteration order.
fn order_tails(mut tails: Vec<StructId>) -> Vec<StructId> {
    tails.sort_by_key(|t| t.0);
    tails.dedup();
    tails
}

/// Marks every exit edge in the structured graph with `LOOP_EXIT` --
/// `labelExitEdges` of spec.md §4.4.
fn label_exit_edges(fd: &mut Funcdata, exits: &[(StructId, StructId)]) {
    for &(from, to) in exits {
        if let Some(edge) = fd.structured().find_edge(from.into(), to.into()) {
            if let Some(flags) = fd.structured_mut().edge_weight_mut(edge) {
                flags.insert(BlockEdgeFlags::LOOP_EXIT);
            }
        }
    }
}

/// Discovers every natural loop in `fd`'s structured graph, labels exit
/// edges, and returns the loops head-first (outer loops before nested ones,
/// by ascending head id -- `labelContainments`' ordering guarantee).
pub fn find_loop_bodies(fd: &mut Funcdata, root: StructId) -> Vec<LoopBody> {
    let back_edges = find_base(fd, root);
    let mut by_head: std::collections::BTreeMap<StructId, Vec<StructId>> = std::collections::BTreeMap::new();
    for (tail, head) in back_edges {
        by_head.entry(head).or_default().push(tail);
    }

    let mut loops = Vec::new();
    for (head, tails) in by_head {
        let tails = order_tails(tails);
        let body = extend(fd, head, &tails);
        let exits = find_exit(fd, &body);
        label_exit_edges(fd, &exits);
        loops.push(LoopBody {
            head,
            tails,
            body,
            exits,
        });
    }
    loops.sort_by_key(|l| l.head.0);
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{Address, BasicBlock, FlowBlockKind, FunctionId, ScopeId, SpaceId};

    fn fd_with_self_loop() -> (Funcdata, StructId) {
        let mut fd = Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2));
        let head = fd.add_struct_block(FlowBlockKind::Basic(decompiler_core::BlockId(0)));
        fd.structured_mut().add_edge(head.into(), head.into(), BlockEdgeFlags::BACK_EDGE);
        let _ = BasicBlock::new();
        (fd, head)
    }

    #[test]
    fn self_loop_is_found_with_head_as_only_tail() {
        let (mut fd, head) = fd_with_self_loop();
        let loops = find_loop_bodies(&mut fd, head);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].head, head);
        assert_eq!(loops[0].tails, vec![head]);
    }

    #[test]
    fn two_node_loop_has_both_nodes_in_body() {
        let mut fd = Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2));
        let head = fd.add_struct_block(FlowBlockKind::Basic(decompiler_core::BlockId(0)));
        let tail = fd.add_struct_block(FlowBlockKind::Basic(decompiler_core::BlockId(1)));
        let exit = fd.add_struct_block(FlowBlockKind::Basic(decompiler_core::BlockId(2)));
        fd.structured_mut().add_edge(head.into(), tail.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(tail.into(), head.into(), BlockEdgeFlags::BACK_EDGE);
        fd.structured_mut().add_edge(tail.into(), exit.into(), BlockEdgeFlags::empty());
        let loops = find_loop_bodies(&mut fd, head);
        assert_eq!(loops.len(), 1);
        assert!(loops[0].body.contains(&head));
        assert!(loops[0].body.contains(&tail));
        assert!(!loops[0].body.contains(&exit));
        assert_eq!(loops[0].exits, vec![(tail, exit)]);
    }
}
