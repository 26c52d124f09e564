//! Conditional join (spec.md §4.4): recognizes the short-circuit `&&`/`||`
//! staircase -- two chained two-way decisions where the inner one's only
//! predecessor is the outer's body arm and one of its own arms targets the
//! outer's other arm -- and folds them into a single `Condition` guard.
//!
//! This is a topological recognizer over the live edge shape, not a full
//! functional-equality check across differently-computed-but-equivalent
//! conditions; that would need dataflow-level comparison this layer
//! doesn't have. Grounded on `collapse.rs`'s `rule_if`, which this runs
//! ahead of: a staircase that matches here never reaches `rule_if` as two
//! separate `If` nodes, it collapses directly to the short-circuit form.

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use decompiler_core::{BlockEdgeFlags, ConditionJoin, FlowBlockKind, Funcdata, StructId};

fn out_edges(fd: &Funcdata, node: StructId) -> Vec<(StructId, BlockEdgeFlags)> {
    fd.structured()
        .edges_directed(node.into(), Direction::Outgoing)
        .map(|e| (StructId::from(e.target()), *e.weight()))
        .collect()
}

fn in_degree(fd: &Funcdata, node: StructId) -> usize {
    fd.structured().edges_directed(node.into(), Direction::Incoming).count()
}

fn dup_content(fd: &mut Funcdata, node: StructId) -> StructId {
    let kind = fd.struct_block(node).cloned().expect("node must exist");
    fd.add_struct_block(kind)
}

fn remove_edge(fd: &mut Funcdata, from: StructId, to: StructId) {
    if let Some(e) = fd.structured().find_edge(from.into(), to.into()) {
        fd.structured_mut().remove_edge(e);
    }
}

/// `if (cond1) { if (cond2) { inner } else { skip } } else { skip }`
/// collapses to `if (cond1 && cond2) { inner } else { skip }`.
fn rule_and(fd: &mut Funcdata, outer: StructId) -> bool {
    let outs = out_edges(fd, outer);
    if outs.len() != 2 {
        return false;
    }
    for &(body, _) in &outs {
        let skip = outs.iter().find(|(t, _)| *t != body).map(|(t, _)| *t).unwrap();
        if in_degree(fd, body) != 1 || body == outer {
            continue;
        }
        let body_outs = out_edges(fd, body);
        if body_outs.len() != 2 {
            continue;
        }
        let to_skip = body_outs.iter().any(|(t, _)| *t == skip);
        let inner = body_outs.iter().find(|(t, _)| *t != skip).map(|(t, _)| *t);
        let Some(inner) = inner else { continue };
        if !to_skip || inner == outer || inner == body {
            continue;
        }
        let cond1 = dup_content(fd, outer);
        let cond2 = dup_content(fd, body);
        remove_edge(fd, outer, body);
        remove_edge(fd, outer, skip);
        remove_edge(fd, body, skip);
        remove_edge(fd, body, inner);
        let joined = fd.add_struct_block(FlowBlockKind::Condition {
            join: ConditionJoin::And,
            left: cond1,
            right: cond2,
        });
        if let Some(w) = fd.structured_mut().node_weight_mut(outer.into()) {
            *w = FlowBlockKind::If { condition: joined, body: inner };
        }
        fd.structured_mut().add_edge(outer.into(), skip.into(), BlockEdgeFlags::empty());
        return true;
    }
    false
}

/// `if (cond1) { inner } else { if (cond2) { inner } else { skip } }`
/// collapses to `if (cond1 || cond2) { inner } else { skip }`.
fn rule_or(fd: &mut Funcdata, outer: StructId) -> bool {
    let outs = out_edges(fd, outer);
    if outs.len() != 2 {
        return false;
    }
    for &(body, _) in &outs {
        let inner_from_outer = outs.iter().find(|(t, _)| *t != body).map(|(t, _)| *t).unwrap();
        if in_degree(fd, body) != 1 || body == outer {
            continue;
        }
        let body_outs = out_edges(fd, body);
        if body_outs.len() != 2 {
            continue;
        }
        let reaches_inner = body_outs.iter().any(|(t, _)| *t == inner_from_outer);
        let skip = body_outs.iter().find(|(t, _)| *t != inner_from_outer).map(|(t, _)| *t);
        let Some(skip) = skip else { continue };
        if !reaches_inner || skip == outer || skip == body {
            continue;
        }
        let cond1 = dup_content(fd, outer);
        let cond2 = dup_content(fd, body);
        remove_edge(fd, outer, inner_from_outer);
        remove_edge(fd, outer, body);
        remove_edge(fd, body, inner_from_outer);
        remove_edge(fd, body, skip);
        let joined = fd.add_struct_block(FlowBlockKind::Condition {
            join: ConditionJoin::Or,
            left: cond1,
            right: cond2,
        });
        if let Some(w) = fd.structured_mut().node_weight_mut(outer.into()) {
            *w = FlowBlockKind::If {
                condition: joined,
                body: inner_from_outer,
            };
        }
        fd.structured_mut().add_edge(outer.into(), skip.into(), BlockEdgeFlags::empty());
        return true;
    }
    false
}

/// One pass over every node, applying `rule_and`/`rule_or` wherever they
/// match. Returns whether anything changed.
pub fn conditional_join_pass(fd: &mut Funcdata) -> bool {
    let mut changed = false;
    let nodes: Vec<StructId> = fd.structured().node_indices().map(StructId::from).collect();
    for node in nodes {
        if fd.struct_block(node).is_none() {
            continue;
        }
        if rule_and(fd, node) || rule_or(fd, node) {
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{Address, BlockId, FunctionId, ScopeId, SpaceId};

    fn new_fd() -> Funcdata {
        Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2))
    }

    fn block(fd: &mut Funcdata, id: u32) -> StructId {
        fd.add_struct_block(FlowBlockKind::Basic(BlockId(id)))
    }

    #[test]
    fn and_staircase_collapses_to_single_condition() {
        let mut fd = new_fd();
        let outer = block(&mut fd, 0);
        let body = block(&mut fd, 1);
        let inner = block(&mut fd, 2);
        let skip = block(&mut fd, 3);
        fd.structured_mut().add_edge(outer.into(), body.into(), BlockEdgeFlags::DECISION);
        fd.structured_mut().add_edge(outer.into(), skip.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(body.into(), inner.into(), BlockEdgeFlags::DECISION);
        fd.structured_mut().add_edge(body.into(), skip.into(), BlockEdgeFlags::empty());
        assert!(rule_and(&mut fd, outer));
        match fd.struct_block(outer) {
            Some(FlowBlockKind::If { condition, body: b }) => {
                assert_eq!(*b, inner);
                match fd.struct_block(*condition) {
                    Some(FlowBlockKind::Condition { join: ConditionJoin::And, .. }) => {}
                    other => panic!("expected And condition, got {other:?}"),
                }
            }
            other => panic!("expected If, got {other:?}"),
        }
        assert_eq!(out_edges(&fd, outer), vec![(skip, BlockEdgeFlags::empty())]);
    }

    #[test]
    fn or_staircase_collapses_to_single_condition() {
        let mut fd = new_fd();
        let outer = block(&mut fd, 0);
        let body = block(&mut fd, 1);
        let inner = block(&mut fd, 2);
        let skip = block(&mut fd, 3);
        fd.structured_mut().add_edge(outer.into(), inner.into(), BlockEdgeFlags::DECISION);
        fd.structured_mut().add_edge(outer.into(), body.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(body.into(), inner.into(), BlockEdgeFlags::DECISION);
        fd.structured_mut().add_edge(body.into(), skip.into(), BlockEdgeFlags::empty());
        assert!(rule_or(&mut fd, outer));
        match fd.struct_block(outer) {
            Some(FlowBlockKind::If { condition, body: b }) => {
                assert_eq!(*b, inner);
                match fd.struct_block(*condition) {
                    Some(FlowBlockKind::Condition { join: ConditionJoin::Or, .. }) => {}
                    other => panic!("expected Or condition, got {other:?}"),
                }
            }
            other => panic!("expected If, got {other:?}"),
        }
        assert_eq!(out_edges(&fd, outer), vec![(skip, BlockEdgeFlags::empty())]);
    }

    #[test]
    fn unrelated_diamond_does_not_match_either_rule() {
        let mut fd = new_fd();
        let outer = block(&mut fd, 0);
        let left = block(&mut fd, 1);
        let right = block(&mut fd, 2);
        let join = block(&mut fd, 3);
        fd.structured_mut().add_edge(outer.into(), left.into(), BlockEdgeFlags::DECISION);
        fd.structured_mut().add_edge(outer.into(), right.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(left.into(), join.into(), BlockEdgeFlags::empty());
        fd.structured_mut().add_edge(right.into(), join.into(), BlockEdgeFlags::empty());
        assert!(!rule_and(&mut fd, outer));
        assert!(!rule_or(&mut fd, outer));
    }
}
