//! Return split (spec.md §4.4): a return block reached from more than one
//! predecessor forces a `goto` to the shared copy once structuring starts
//! collapsing -- duplicating it into each predecessor first turns that
//! join into private straight-line tails instead, so `rule_block_cat` can
//! absorb each one without ever seeing the merge.
//!
//! Runs to its own fixpoint before `collapse::collapse_all` starts, the
//! same repeat-until-`NoChange` shape `ActionGroup::run` drives its actions
//! with in `decompiler-analysis`, though this isn't implemented as an
//! `Action` itself -- it has no use for a type registry and reports its
//! own error type, so it stays a plain function the structurer calls
//! directly.

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use decompiler_core::{BlockEdgeFlags, FlowBlockKind, Funcdata, Opcode};

fn is_return_block(fd: &Funcdata, kind: &FlowBlockKind) -> bool {
    let FlowBlockKind::Basic(block_id) = kind else {
        return false;
    };
    let Ok(block) = fd.block(*block_id) else {
        return false;
    };
    match block.ops().last() {
        Some(&op_id) => fd.store.op(op_id).map(|op| op.opcode == Opcode::Return).unwrap_or(false),
        None => false,
    }
}

/// One pass: duplicates every return node with more than one predecessor,
/// one copy per predecessor, and removes the original. Returns the number
/// of nodes split.
fn split_pass(fd: &mut Funcdata) -> usize {
    let candidates: Vec<_> = fd
        .structured()
        .node_indices()
        .filter(|&n| {
            let kind = fd.structured().node_weight(n).unwrap();
            is_return_block(fd, kind) && fd.structured().edges_directed(n, Direction::Incoming).count() > 1
        })
        .collect();

    let mut splits = 0;
    for node in candidates {
        let kind = fd.structured().node_weight(node).unwrap().clone();
        let preds: Vec<_> = fd
            .structured()
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), *e.weight()))
            .collect();
        for (pred, flags) in preds {
            let copy_id = fd.add_struct_block(kind.clone());
            if let Some(e) = fd.structured().find_edge(pred, node) {
                fd.structured_mut().remove_edge(e);
            }
            fd.structured_mut().add_edge(pred, copy_id.into(), flags);
        }
        fd.structured_mut().remove_node(node);
        splits += 1;
    }
    splits
}

/// Runs `split_pass` to a fixpoint (splitting can expose no further merges
/// in this IR shape, but the loop is cheap and keeps the invariant
/// explicit rather than assumed).
pub fn split_returns(fd: &mut Funcdata) -> usize {
    let mut total = 0;
    loop {
        let n = split_pass(fd);
        if n == 0 {
            return total;
        }
        total += n;
    }
}
