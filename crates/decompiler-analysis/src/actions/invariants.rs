//! Universal invariant checks (spec.md §8): structural properties that must
//! hold of a `Funcdata`'s IR at any point actions can observe it, independent
//! of which actions have run.
//!
//! Follows the violation-record shape used for contract checks elsewhere
//! in this workspace: a check doesn't panic on a violated invariant, it
//! reports a structured record the caller collects and decides what to do
//! with -- generalized here from "a contract the user wrote for their own
//! graph" to the decompiler's own fixed, built-in invariant set.

use decompiler_core::{Funcdata, PcodeOpId, VarnodeId};
use serde::{Deserialize, Serialize};

/// One violated invariant, naming the entities involved so a caller can
/// locate the offending op/varnode without re-scanning the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// A varnode's `WRITTEN` flag doesn't agree with its `def` op actually
    /// listing it as output.
    DefOutputMismatch { varnode: VarnodeId, def: PcodeOpId },
    /// A varnode is both `FREE` and has a `def` recorded.
    FreeVarnodeHasDef { varnode: VarnodeId },
    /// An op's input slot does not appear in that varnode's descendant set
    /// at the matching slot index.
    MissingDescendantLink { op: PcodeOpId, varnode: VarnodeId, slot: u16 },
    /// An op's output points back to a varnode whose `def` is some other op.
    OutputDefDisagreement { op: PcodeOpId, varnode: VarnodeId },
}

/// Runs every universal invariant check against `fd`'s alive ops and their
/// varnodes, returning every violation found (empty if the IR is
/// consistent). Never panics; a violation is data, not a fatal error.
pub fn check_invariants(fd: &Funcdata) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for op_id in fd.store.ops_alive() {
        let Ok(op) = fd.store.op(op_id) else { continue };

        if let Some(out) = op.output {
            match fd.store.varnode(out) {
                Ok(vn) => {
                    if vn.def != Some(op_id) {
                        violations.push(InvariantViolation::OutputDefDisagreement {
                            op: op_id,
                            varnode: out,
                        });
                    }
                    if !vn.is_written() {
                        violations.push(InvariantViolation::DefOutputMismatch {
                            varnode: out,
                            def: op_id,
                        });
                    }
                }
                Err(_) => violations.push(InvariantViolation::DefOutputMismatch {
                    varnode: out,
                    def: op_id,
                }),
            }
        }

        for (slot, &vn_id) in op.inputs.iter().enumerate() {
            if vn_id.0 == u32::MAX {
                continue;
            }
            let Ok(vn) = fd.store.varnode(vn_id) else { continue };
            if vn.is_free() && vn.def.is_some() {
                violations.push(InvariantViolation::FreeVarnodeHasDef { varnode: vn_id });
            }
            if !vn.descendants().contains(&(op_id, slot as u16)) {
                violations.push(InvariantViolation::MissingDescendantLink {
                    op: op_id,
                    varnode: vn_id,
                    slot: slot as u16,
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{Address, FunctionId, Opcode, ScopeId, SpaceId, TypeId};

    fn fresh_fd() -> Funcdata {
        Funcdata::new(FunctionId(0), "f", Address::new(SpaceId(1), 0x1000), 0, ScopeId(0), SpaceId(2))
    }

    #[test]
    fn well_formed_function_has_no_violations() {
        let mut fd = fresh_fd();
        let block = fd.add_block(decompiler_core::BasicBlock::new());
        let a = fd.store.new_free_varnode(Address::new(SpaceId(1), 0x10), 4, TypeId::INT4);
        let op = fd.store.new_op(1, Opcode::IntNeg, block, Address::new(SpaceId(1), 0x100));
        fd.store.op_set_input(op, a, 0).unwrap();
        fd.store.new_unique_out(4, op, TypeId::INT4).unwrap();
        assert!(check_invariants(&fd).is_empty());
    }

    #[test]
    fn destroyed_op_leaves_no_dangling_descendant_link() {
        let mut fd = fresh_fd();
        let block = fd.add_block(decompiler_core::BasicBlock::new());
        let a = fd.store.new_free_varnode(Address::new(SpaceId(1), 0x10), 4, TypeId::INT4);
        let op = fd.store.new_op(1, Opcode::IntNeg, block, Address::new(SpaceId(1), 0x100));
        fd.store.op_set_input(op, a, 0).unwrap();
        fd.store.op_destroy(op).unwrap();
        assert!(check_invariants(&fd).is_empty());
    }
}
