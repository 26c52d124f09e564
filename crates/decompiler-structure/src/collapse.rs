//! Iterative structure collapse (spec.md §4.4): repeatedly applies the
//! highest-priority matching rule to the structured graph until no rule
//! applies anywhere, the fixpoint collapse that turns a CFG skeleton into
//! nested `FlowBlockKind` trees.
//!
//! Follows the per-variant emission dispatch used for the largest
//! driving-loop file elsewhere in this workspace: that one walked a fixed
//! IR shape and emitted a codegen value per variant; this one walks a
//! mutable graph and rewrites it per variant, driven to a fixpoint instead
//! of a single pass.

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use decompiler_core::{BlockEdgeFlags, FlowBlockKind, Funcdata, StructId};

use crate::error::StructureError;
use crate::loopbody::LoopBody;

/// One collapse rule tried, in order, against every remaining node each
/// pass. The first rule that matches a node consumes it for that pass.
const MAX_PASSES: u32 = 256;

fn out_edges(fd: &Funcdata, node: StructId) -> Vec<(StructId, BlockEdgeFlags)> {
    fd.structured()
        .edges_directed(node.into(), Direction::Outgoing)
        .map(|e| (StructId::from(e.target()), *e.weight()))
        .collect()
}

fn in_edges(fd: &Funcdata, node: StructId) -> Vec<(StructId, BlockEdgeFlags)> {
    fd.structured()
        .edges_directed(node.into(), Direction::Incoming)
        .map(|e| (StructId::from(e.source()), *e.weight()))
        .collect()
}

fn set_kind(fd: &mut Funcdata, node: StructId, kind: FlowBlockKind) {
    if let Some(w) = fd.structured_mut().node_weight_mut(node.into()) {
        *w = kind;
    }
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

fn add_edge(fd: &mut Funcdata, from: StructId, to: StructId, flags: BlockEdgeFlags) {
    fd.structured_mut().add_edge(from.into(), to.into(), flags);
}

/// `ruleBlockGoto`: a node with a single `GOTO`-flagged out-edge is
/// terminated there -- the edge is severed and replaced by an explicit
/// `Goto` child, so the rest of the graph can keep collapsing around it.
fn rule_block_goto(fd: &mut Funcdata, node: StructId) -> bool {
    let outs = out_edges(fd, node);
    let goto_target = outs.iter().find(|(_, f)| f.contains(BlockEdgeFlags::GOTO)).map(|(t, _)| *t);
    let Some(target) = goto_target else { return false };
    let content = dup_content(fd, node);
    let goto = fd.add_struct_block(FlowBlockKind::Goto(target));
    remove_edge(fd, node, target);
    set_kind(fd, node, FlowBlockKind::List(vec![content, goto]));
    true
}

/// `ruleBlockCat`: `a -> b` where `a`'s only out-edge is to `b` and `b`'s
/// only in-edge is from `a` -- merges `b` into `a` as a straight-line
/// `List`, the maximal-chain reduction that feeds every later rule.
fn rule_block_cat(fd: &mut Funcdata, a: StructId) -> bool {
    let outs = out_edges(fd, a);
    if outs.len() != 1 {
        return false;
    }
    let (b, edge_flags) = outs[0];
    if edge_flags.intersects(BlockEdgeFlags::BACK_EDGE | BlockEdgeFlags::GOTO) || a == b {
        return false;
    }
    if in_edges(fd, b).len() != 1 {
        return false;
    }
    let a_copy = dup_content(fd, a);
    let b_copy = dup_content(fd, b);
    let b_outs = out_edges(fd, b);
    for (target, flags) in &b_outs {
        remove_edge(fd, b, *target);
        add_edge(fd, a, *target, *flags);
    }
    remove_edge(fd, a, b);
    fd.structured_mut().remove_node(b.into());
    set_kind(fd, a, FlowBlockKind::List(vec![a_copy, b_copy]));
    true
}

/// `ruleBlockOr`/`ruleBlockProperIf`/`ruleBlockIfElse`: a two-way decision
/// whose arms rejoin (or dead-end) collapses into `IfElse`/`If`.
fn rule_if(fd: &mut Funcdata, node: StructId) -> bool {
    let mut outs = out_edges(fd, node);
    if outs.len() != 2 {
        return false;
    }
    outs.sort_by_key(|(t, _)| t.0);
    let (left, _) = outs[0];
    let (right, _) = outs[1];
    if left == node || right == node {
        return false;
    }

    let left_solo = in_edges(fd, left).len() == 1 && in_edges(fd, left) == vec![(node, outs[0].1)];
    let right_solo = in_edges(fd, right).len() == 1 && in_edges(fd, right) == vec![(node, outs[1].1)];

    if left_solo && right_solo {
        let left_outs = out_edges(fd, left);
        let right_outs = out_edges(fd, right);
        if left_outs.len() <= 1 && right_outs.len() <= 1 {
            let joins_same = match (left_outs.first(), right_outs.first()) {
                (Some((lt, _)), Some((rt, _))) => lt == rt,
                (None, None) => true,
                _ => false,
            };
            if joins_same {
                let cond = dup_content(fd, node);
                remove_edge(fd, node, left);
                remove_edge(fd, node, right);
                if let Some((join, _)) = left_outs.first() {
                    remove_edge(fd, left, *join);
                    remove_edge(fd, right, *join);
                    add_edge(fd, node, *join, BlockEdgeFlags::empty());
                }
                set_kind(
                    fd,
                    node,
                    FlowBlockKind::IfElse {
                        condition: cond,
                        then_body: left,
                        else_body: right,
                    },
                );
                return true;
            }
        }
    }

    // `ruleBlockProperIf`/`ruleBlockIfNoExit`: one arm is a solo body that
    // either rejoins at the other arm's target or has no exit at all.
    for (body, skip) in [(left, right), (right, left)] {
        if in_edges(fd, body).len() != 1 {
            continue;
        }
        let body_outs = out_edges(fd, body);
        let rejoins_skip = body_outs.len() == 1 && body_outs[0].0 == skip;
        let dead_ends = body_outs.is_empty();
        if !rejoins_skip && !dead_ends {
            continue;
        }
        let cond = dup_content(fd, node);
        remove_edge(fd, node, body);
        if rejoins_skip {
            remove_edge(fd, body, skip);
        }
        // dead-end variant: node's only remaining out-edge is already the
        // original node -> skip edge, left untouched.
        set_kind(fd, node, FlowBlockKind::If { condition: cond, body });
        return true;
    }

    false
}

/// `ruleWhileDo`: a loop whose head carries the conditional exit and whose
/// single body node flows straight back -- collapses to `WhileDo`.
fn rule_while_do(fd: &mut Funcdata, lp: &LoopBody) -> bool {
    if lp.body.len() != 2 || lp.tails.len() != 1 {
        return false;
    }
    let head = lp.head;
    let tail = lp.tails[0];
    if tail == head {
        return false;
    }
    let head_outs = out_edges(fd, head);
    if head_outs.len() != 2 {
        return false;
    }
    let to_body = head_outs.iter().find(|(t, _)| *t == tail);
    let Some(&(_, _)) = to_body else { return false };
    let exit = head_outs.iter().find(|(t, _)| *t != tail).map(|(t, _)| *t);
    let Some(exit) = exit else { return false };
    let tail_outs = out_edges(fd, tail);
    if tail_outs.len() != 1 || tail_outs[0].0 != head {
        return false;
    }
    if in_edges(fd, tail).len() != 1 {
        return false;
    }

    let header_copy = dup_content(fd, head);
    let body_copy = dup_content(fd, tail);
    remove_edge(fd, head, tail);
    remove_edge(fd, tail, head);
    remove_edge(fd, head, exit);
    fd.structured_mut().remove_node(tail.into());
    set_kind(
        fd,
        head,
        FlowBlockKind::WhileDo {
            header: header_copy,
            body: body_copy,
        },
    );
    add_edge(fd, head, exit, BlockEdgeFlags::empty());
    true
}

/// `ruleDoWhile`: a single-block self loop with a conditional back edge.
fn rule_do_while(fd: &mut Funcdata, lp: &LoopBody) -> bool {
    if lp.body.len() != 1 || lp.tails != vec![lp.head] {
        return false;
    }
    let head = lp.head;
    let outs = out_edges(fd, head);
    let back = outs.iter().find(|(t, f)| *t == head && f.contains(BlockEdgeFlags::BACK_EDGE));
    if back.is_none() {
        return false;
    }
    if outs.len() != 2 {
        return false;
    }
    let exit = outs.iter().find(|(t, _)| *t != head).map(|(t, _)| *t);
    let Some(exit) = exit else { return false };
    let body_copy = dup_content(fd, head);
    remove_edge(fd, head, head);
    remove_edge(fd, head, exit);
    set_kind(fd, head, FlowBlockKind::DoWhile { body: body_copy });
    add_edge(fd, head, exit, BlockEdgeFlags::empty());
    true
}

/// `ruleInfLoop`: a single-block self loop with no exit at all.
fn rule_inf_loop(fd: &mut Funcdata, lp: &LoopBody) -> bool {
    if lp.body.len() != 1 || lp.tails != vec![lp.head] || !lp.exits.is_empty() {
        return false;
    }
    let head = lp.head;
    let outs = out_edges(fd, head);
    if outs.len() != 1 || outs[0].0 != head {
        return false;
    }
    let body_copy = dup_content(fd, head);
    remove_edge(fd, head, head);
    set_kind(fd, head, FlowBlockKind::InfiniteLoop { body: body_copy });
    true
}

/// `checkSwitchSkips`: the switch's default arm branches straight to the
/// shared exit with no block of its own -- there's nothing to absorb as a
/// case body, so the edge is retired in favor of an explicit `Goto` child,
/// the same representation `ruleBlockGoto` would have produced had this
/// arm had its own node.
fn check_switch_skips(fd: &mut Funcdata, node: StructId, exit: StructId) -> StructId {
    remove_edge(fd, node, exit);
    fd.add_struct_block(FlowBlockKind::Goto(exit))
}

/// `ruleCaseFallthru`: a switch arm whose own forward edge lands back on
/// its header before the shared exit is a cross-edge, not a case body
/// `ruleSwitch` can absorb directly -- mark it `GOTO` so a later pass's
/// `ruleBlockGoto` turns it into an explicit jump and `ruleSwitch` can
/// treat the arm as a plain dead end.
fn rule_case_fallthru(fd: &mut Funcdata, node: StructId) -> bool {
    let outs = out_edges(fd, node);
    if outs.len() < 3 {
        return false;
    }
    for (arm, _) in &outs {
        let back = out_edges(fd, *arm)
            .into_iter()
            .find(|(t, f)| *t == node && !f.intersects(BlockEdgeFlags::GOTO | BlockEdgeFlags::BACK_EDGE));
        if let Some((_, flags)) = back {
            remove_edge(fd, *arm, node);
            add_edge(fd, *arm, node, flags | BlockEdgeFlags::GOTO);
            return true;
        }
    }
    false
}

/// `ruleBlockSwitch`: a node with three or more out-edges collapses into a
/// `Switch` once the shared exit is identified -- spec.md §4.4(3)'s "first
/// successor with fan-in > 1, fan-out > 1, or a self-loop" -- and every
/// other successor is a single-in, single-out arm that either dead-ends or
/// flows straight to that exit. `checkSwitchSkips` handles a default that
/// reaches the exit directly, with no arm of its own.
fn rule_switch(fd: &mut Funcdata, node: StructId) -> bool {
    let mut outs = out_edges(fd, node);
    if outs.len() < 3 {
        return false;
    }
    if outs.iter().any(|(_, f)| f.intersects(BlockEdgeFlags::BACK_EDGE | BlockEdgeFlags::GOTO)) {
        return false;
    }
    outs.sort_by_key(|(t, _)| t.0);

    let exit = outs.iter().find_map(|(t, _)| {
        if *t == node || in_edges(fd, *t).len() > 1 || out_edges(fd, *t).len() > 1 {
            Some(*t)
        } else {
            None
        }
    });

    for (arm, _) in outs.iter().filter(|(t, _)| Some(*t) != exit) {
        if in_edges(fd, *arm).len() != 1 {
            return false;
        }
        let arm_outs = out_edges(fd, *arm);
        let converges = match exit {
            Some(e) => arm_outs.is_empty() || (arm_outs.len() == 1 && arm_outs[0].0 == e),
            None => arm_outs.is_empty(),
        };
        if !converges {
            return false;
        }
    }

    let header_copy = dup_content(fd, node);
    let mut cases = Vec::new();
    let mut default = None;
    for (arm, flags) in &outs {
        let is_default = flags.contains(BlockEdgeFlags::DEFAULT_BRANCH);
        if Some(*arm) == exit {
            if is_default {
                default = Some(check_switch_skips(fd, node, *arm));
            } else {
                remove_edge(fd, node, *arm);
            }
            continue;
        }
        remove_edge(fd, node, *arm);
        if let Some(e) = exit {
            remove_edge(fd, *arm, e);
        }
        if is_default {
            default = Some(*arm);
        } else {
            cases.push(*arm);
        }
    }

    set_kind(
        fd,
        node,
        FlowBlockKind::Switch {
            header: header_copy,
            cases,
            default,
        },
    );
    if let Some(e) = exit {
        add_edge(fd, node, e, BlockEdgeFlags::empty());
    }
    true
}

/// One fixpoint pass over every loop, then every remaining node, applying
/// the first rule that matches. Returns whether anything changed.
fn collapse_one_pass(fd: &mut Funcdata, loops: &[LoopBody]) -> bool {
    let mut changed = false;
    for lp in loops {
        if fd.struct_block(lp.head).is_none() {
            continue;
        }
        if rule_do_while(fd, lp) || rule_inf_loop(fd, lp) || rule_while_do(fd, lp) {
            changed = true;
        }
    }

    let nodes: Vec<StructId> = fd.structured().node_indices().map(StructId::from).collect();
    for node in nodes {
        if fd.struct_block(node).is_none() {
            continue;
        }
        if rule_block_goto(fd, node)
            || rule_block_cat(fd, node)
            || rule_if(fd, node)
            || rule_case_fallthru(fd, node)
            || rule_switch(fd, node)
        {
            changed = true;
        }
    }
    changed
}

/// Every `StructId` referenced as a child by some node currently in the
/// graph. A collapse rule never deletes the node it absorbs (only the
/// node it reuses in place survives under its original id, via
/// `rule_block_cat`'s and `rule_while_do`'s explicit `remove_node` calls);
/// it keeps living as the referencing parent's child, which is how a
/// nested tree stays fully walkable through `Funcdata::struct_block`.
/// What's left once collapsing is done is exactly the graph nodes nobody
/// references -- the roots still outstanding.
fn referenced_children(fd: &Funcdata) -> std::collections::HashSet<StructId> {
    let mut set = std::collections::HashSet::new();
    for n in fd.structured().node_indices() {
        if let Some(kind) = fd.structured().node_weight(n) {
            set.extend(kind.children());
        }
    }
    set
}

/// The nodes not referenced as anyone's child -- the still-unstructured
/// top-level pieces. A fully structured function has exactly one.
pub fn live_roots(fd: &Funcdata) -> Vec<StructId> {
    let referenced = referenced_children(fd);
    fd.structured()
        .node_indices()
        .map(StructId::from)
        .filter(|id| !referenced.contains(id))
        .collect()
}

/// Drives `collapse_one_pass` to a fixpoint, re-discovering loops each pass
/// since collapsing a nested loop's body can expose or retire outer ones.
/// Returns `Ok` once no rule matches anywhere, even if more than one live
/// root remains -- deciding whether that remainder is acceptable (or
/// resolvable by conditional join) is the caller's job. Fails with
/// `NoFixpoint` only if the pass budget is exhausted while still changing.
pub fn collapse_all(
    fd: &mut Funcdata,
    root: StructId,
    find_loops: impl Fn(&mut Funcdata, StructId) -> Vec<LoopBody>,
) -> Result<(), StructureError> {
    let mut passes = 0;
    loop {
        if live_roots(fd).len() <= 1 {
            return Ok(());
        }
        if passes >= MAX_PASSES {
            return Err(StructureError::NoFixpoint {
                passes,
                remaining: live_roots(fd).len(),
            });
        }
        let loops = find_loops(fd, root);
        let changed = collapse_one_pass(fd, &loops);
        passes += 1;
        if !changed {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{Address, BlockId, FunctionId, ScopeId, SpaceId};

    fn fd_block(fd: &mut Funcdata, id: u32) -> StructId {
        fd.add_struct_block(FlowBlockKind::Basic(BlockId(id)))
    }

    fn new_fd() -> Funcdata {
        Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2))
    }

    #[test]
    fn rule_block_cat_merges_linear_chain_and_retargets_as_list() {
        let mut fd = new_fd();
        let a = fd_block(&mut fd, 0);
        let b = fd_block(&mut fd, 1);
        let c = fd_block(&mut fd, 2);
        add_edge(&mut fd, a, b, BlockEdgeFlags::empty());
        add_edge(&mut fd, b, c, BlockEdgeFlags::empty());
        assert!(rule_block_cat(&mut fd, a));
        assert!(matches!(fd.struct_block(a), Some(FlowBlockKind::List(_))));
        assert_eq!(out_edges(&fd, a), vec![(c, BlockEdgeFlags::empty())]);
        assert!(fd.struct_block(b).is_none());
    }

    #[test]
    fn rule_if_else_collapses_diamond() {
        let mut fd = new_fd();
        let cond = fd_block(&mut fd, 0);
        let left = fd_block(&mut fd, 1);
        let right = fd_block(&mut fd, 2);
        let join = fd_block(&mut fd, 3);
        add_edge(&mut fd, cond, left, BlockEdgeFlags::DECISION);
        add_edge(&mut fd, cond, right, BlockEdgeFlags::empty());
        add_edge(&mut fd, left, join, BlockEdgeFlags::empty());
        add_edge(&mut fd, right, join, BlockEdgeFlags::empty());
        assert!(rule_if(&mut fd, cond));
        match fd.struct_block(cond) {
            Some(FlowBlockKind::IfElse { then_body, else_body, .. }) => {
                assert_eq!(*then_body, left);
                assert_eq!(*else_body, right);
            }
            other => panic!("expected IfElse, got {other:?}"),
        }
        assert_eq!(out_edges(&fd, cond), vec![(join, BlockEdgeFlags::empty())]);
    }

    #[test]
    fn rule_do_while_collapses_self_loop_with_exit() {
        let mut fd = new_fd();
        let head = fd_block(&mut fd, 0);
        let exit = fd_block(&mut fd, 1);
        add_edge(&mut fd, head, head, BlockEdgeFlags::BACK_EDGE);
        add_edge(&mut fd, head, exit, BlockEdgeFlags::LOOP_EXIT);
        let lp = LoopBody {
            head,
            tails: vec![head],
            body: [head].into_iter().collect(),
            exits: vec![(head, exit)],
        };
        assert!(rule_do_while(&mut fd, &lp));
        assert!(matches!(fd.struct_block(head), Some(FlowBlockKind::DoWhile { .. })));
        assert_eq!(out_edges(&fd, head), vec![(exit, BlockEdgeFlags::empty())]);
    }

    #[test]
    fn rule_inf_loop_collapses_exitless_self_loop() {
        let mut fd = new_fd();
        let head = fd_block(&mut fd, 0);
        add_edge(&mut fd, head, head, BlockEdgeFlags::BACK_EDGE);
        let lp = LoopBody {
            head,
            tails: vec![head],
            body: [head].into_iter().collect(),
            exits: vec![],
        };
        assert!(rule_inf_loop(&mut fd, &lp));
        assert!(matches!(fd.struct_block(head), Some(FlowBlockKind::InfiniteLoop { .. })));
        assert!(out_edges(&fd, head).is_empty());
    }

    #[test]
    fn rule_switch_collapses_header_with_direct_exit_default() {
        let mut fd = new_fd();
        let header = fd_block(&mut fd, 0);
        let case1 = fd_block(&mut fd, 1);
        let case2 = fd_block(&mut fd, 2);
        let case3 = fd_block(&mut fd, 3);
        let exit = fd_block(&mut fd, 4);
        add_edge(&mut fd, header, case1, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case2, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case3, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, exit, BlockEdgeFlags::SWITCH | BlockEdgeFlags::DEFAULT_BRANCH);
        add_edge(&mut fd, case1, exit, BlockEdgeFlags::empty());
        add_edge(&mut fd, case2, exit, BlockEdgeFlags::empty());
        add_edge(&mut fd, case3, exit, BlockEdgeFlags::empty());

        assert!(rule_switch(&mut fd, header));
        let Some(FlowBlockKind::Switch { cases, default, .. }) = fd.struct_block(header).cloned() else {
            panic!("expected Switch, got {:?}", fd.struct_block(header));
        };
        assert_eq!(cases, vec![case1, case2, case3]);
        let default = default.expect("default arm");
        assert!(matches!(fd.struct_block(default), Some(FlowBlockKind::Goto(t)) if *t == exit));
        // the header keeps a single edge back to the shared exit, so a
        // later `rule_block_cat` pass can fold the two together.
        assert_eq!(out_edges(&fd, header), vec![(exit, BlockEdgeFlags::empty())]);
        assert_eq!(in_edges(&fd, exit), vec![(header, BlockEdgeFlags::empty())]);
    }

    #[test]
    fn rule_switch_with_no_shared_exit_still_collapses_dead_end_arms() {
        // No successor has fan-in/out > 1, so there's no exit to identify;
        // every arm dead-ending on its own is still a valid switch shape.
        let mut fd = new_fd();
        let header = fd_block(&mut fd, 0);
        let case1 = fd_block(&mut fd, 1);
        let case2 = fd_block(&mut fd, 2);
        let case3 = fd_block(&mut fd, 3);
        add_edge(&mut fd, header, case1, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case2, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case3, BlockEdgeFlags::SWITCH | BlockEdgeFlags::DEFAULT_BRANCH);

        assert!(rule_switch(&mut fd, header));
        let Some(FlowBlockKind::Switch { cases, default, .. }) = fd.struct_block(header).cloned() else {
            panic!("expected Switch, got {:?}", fd.struct_block(header));
        };
        assert_eq!(cases, vec![case1, case2]);
        assert_eq!(default, Some(case3));
        assert!(out_edges(&fd, header).is_empty());
    }

    #[test]
    fn rule_case_fallthru_marks_arm_edge_back_to_header_as_goto() {
        let mut fd = new_fd();
        let header = fd_block(&mut fd, 0);
        let case1 = fd_block(&mut fd, 1);
        let case2 = fd_block(&mut fd, 2);
        let case3 = fd_block(&mut fd, 3);
        add_edge(&mut fd, header, case1, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case2, BlockEdgeFlags::SWITCH);
        add_edge(&mut fd, header, case3, BlockEdgeFlags::SWITCH | BlockEdgeFlags::DEFAULT_BRANCH);
        // case1 falls through back to the header before any shared exit.
        add_edge(&mut fd, case1, header, BlockEdgeFlags::empty());

        assert!(!rule_switch(&mut fd, header), "a live fallthrough edge must not be absorbed as a case");
        assert!(rule_case_fallthru(&mut fd, header));
        assert_eq!(out_edges(&fd, case1), vec![(header, BlockEdgeFlags::GOTO)]);
        // once marked, the generic goto rule turns the arm into an explicit
        // jump and the switch can finally collapse around it.
        assert!(rule_block_goto(&mut fd, case1));
        assert!(rule_switch(&mut fd, header));
    }

    #[test]
    fn collapse_all_reduces_straight_line_function_to_one_node() {
        let mut fd = new_fd();
        let a = fd_block(&mut fd, 0);
        let b = fd_block(&mut fd, 1);
        let c = fd_block(&mut fd, 2);
        add_edge(&mut fd, a, b, BlockEdgeFlags::empty());
        add_edge(&mut fd, b, c, BlockEdgeFlags::empty());
        collapse_all(&mut fd, a, |_, _| vec![]).expect("should converge");
        assert_eq!(live_roots(&fd).len(), 1);
        assert_eq!(live_roots(&fd)[0], a);
    }
}
