//! Self-contained demo functions exercising the pipeline end to end.
//!
//! spec.md §1 excludes the SLEIGH front end and binary loading from this
//! core's scope, so there is no loader here to raise p-code from a real
//! image. These builders stand in for that step, constructing the same
//! basic-block shapes spec.md §8's end-to-end scenarios (E1 a diamond, E2
//! an if-without-else, E3 a two-tailed loop) describe directly against the
//! `Funcdata` API, the way the unit tests in `decompiler-structure` already
//! do. `main.rs`'s `demo` subcommand selects one by name.
use decompiler_core::{Address, Architecture, BasicBlock, BlockEdgeFlags, FunctionId, Opcode};

pub const STRAIGHT_LINE_NAME: &str = "straight_line";
pub const DIAMOND_NAME: &str = "diamond";
pub const LOOP_NAME: &str = "loop_two_tails";
pub const SWITCH_NAME: &str = "switch_default_exit";

fn ret_block(arch: &mut Architecture, fid: FunctionId, addr: u64) -> decompiler_core::BlockId {
    let space = arch.unique_space();
    let fd = arch.function_mut(fid).unwrap();
    let op = fd.store.new_op(0, Opcode::Return, decompiler_core::BlockId(0), Address::new(space, addr));
    let mut bb = BasicBlock::new();
    bb.push_op(op);
    fd.add_block(bb)
}

/// A single basic block falling straight through to a return -- the
/// trivial case `ruleBlockCat` collapses to one `BlockList`.
pub fn build_straight_line(arch: &mut Architecture) -> FunctionId {
    let fid = arch.add_function(STRAIGHT_LINE_NAME, Address::new(arch.unique_space(), 0x1000), 16);
    let fd = arch.function_mut(fid).unwrap();
    let entry = fd.add_block(BasicBlock::new());
    let mid = fd.add_block(BasicBlock::new());
    fd.add_block_edge(entry, mid, BlockEdgeFlags::empty()).unwrap();
    let ret = ret_block(arch, fid, 0x2000);
    let fd = arch.function_mut(fid).unwrap();
    fd.add_block_edge(mid, ret, BlockEdgeFlags::empty()).unwrap();
    fid
}

/// spec.md §8 E1/E2: entry splits two ways, both sides join before a
/// return -- collapses to a `BlockIfElse` once `ruleBlockIfElse` fires.
pub fn build_diamond(arch: &mut Architecture) -> FunctionId {
    let fid = arch.add_function(DIAMOND_NAME, Address::new(arch.unique_space(), 0x1000), 32);
    let fd = arch.function_mut(fid).unwrap();
    let entry = fd.add_block(BasicBlock::new());
    let left = fd.add_block(BasicBlock::new());
    let right = fd.add_block(BasicBlock::new());
    fd.add_block_edge(entry, left, BlockEdgeFlags::DECISION).unwrap();
    fd.add_block_edge(entry, right, BlockEdgeFlags::empty()).unwrap();
    let ret = ret_block(arch, fid, 0x2000);
    let fd = arch.function_mut(fid).unwrap();
    fd.add_block_edge(left, ret, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(right, ret, BlockEdgeFlags::empty()).unwrap();
    fid
}

/// spec.md §8 E3: a loop with two tails back-edging to a shared head, one
/// of which also reaches the loop's exit directly.
pub fn build_loop_two_tails(arch: &mut Architecture) -> FunctionId {
    let fid = arch.add_function(LOOP_NAME, Address::new(arch.unique_space(), 0x1000), 48);
    let fd = arch.function_mut(fid).unwrap();
    let head = fd.add_block(BasicBlock::new());
    let mid = fd.add_block(BasicBlock::new());
    let tail1 = fd.add_block(BasicBlock::new());
    let tail2 = fd.add_block(BasicBlock::new());
    fd.add_block_edge(head, mid, BlockEdgeFlags::DECISION).unwrap();
    let ret = ret_block(arch, fid, 0x3000);
    let fd = arch.function_mut(fid).unwrap();
    fd.add_block_edge(head, ret, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(mid, tail1, BlockEdgeFlags::DECISION).unwrap();
    fd.add_block_edge(mid, tail2, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(tail1, ret, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(tail1, head, BlockEdgeFlags::BACK_EDGE).unwrap();
    fd.add_block_edge(tail2, head, BlockEdgeFlags::BACK_EDGE).unwrap();
    fid
}

/// spec.md §8 E5: a switch header with three cases that converge on a
/// shared exit and a default edge that points at the exit directly.
pub fn build_switch_default_exit(arch: &mut Architecture) -> FunctionId {
    let fid = arch.add_function(SWITCH_NAME, Address::new(arch.unique_space(), 0x1000), 64);
    let fd = arch.function_mut(fid).unwrap();
    let header = fd.add_block(BasicBlock::new());
    let case1 = fd.add_block(BasicBlock::new());
    let case2 = fd.add_block(BasicBlock::new());
    let case3 = fd.add_block(BasicBlock::new());
    let ret = ret_block(arch, fid, 0x4000);
    let fd = arch.function_mut(fid).unwrap();
    fd.add_block_edge(header, case1, BlockEdgeFlags::SWITCH).unwrap();
    fd.add_block_edge(header, case2, BlockEdgeFlags::SWITCH).unwrap();
    fd.add_block_edge(header, case3, BlockEdgeFlags::SWITCH).unwrap();
    fd.add_block_edge(header, ret, BlockEdgeFlags::SWITCH | BlockEdgeFlags::DEFAULT_BRANCH)
        .unwrap();
    fd.add_block_edge(case1, ret, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(case2, ret, BlockEdgeFlags::empty()).unwrap();
    fd.add_block_edge(case3, ret, BlockEdgeFlags::empty()).unwrap();
    fid
}

/// Resolves a demo scenario by name, for the CLI's `--scenario` flag.
pub fn build_by_name(arch: &mut Architecture, name: &str) -> Option<FunctionId> {
    match name {
        STRAIGHT_LINE_NAME => Some(build_straight_line(arch)),
        DIAMOND_NAME => Some(build_diamond(arch)),
        LOOP_NAME => Some(build_loop_two_tails(arch)),
        SWITCH_NAME => Some(build_switch_default_exit(arch)),
        _ => None,
    }
}

pub const SCENARIO_NAMES: &[&str] = &[STRAIGHT_LINE_NAME, DIAMOND_NAME, LOOP_NAME, SWITCH_NAME];

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::ArchitectureConfig;

    #[test]
    fn every_named_scenario_builds() {
        for name in SCENARIO_NAMES {
            let mut arch = Architecture::new(ArchitectureConfig::default());
            assert!(build_by_name(&mut arch, name).is_some());
        }
    }

    #[test]
    fn unknown_scenario_name_returns_none() {
        let mut arch = Architecture::new(ArchitectureConfig::default());
        assert!(build_by_name(&mut arch, "nope").is_none());
    }
}
