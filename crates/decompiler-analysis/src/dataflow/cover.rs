//! HighVariable merging and cover computation (spec.md §4.2).

use decompiler_core::{BlockId, PcodeOpId, SymbolId, TypeId, VarnodeId};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A single live range: `(block, start-op, end-op)`, ordered by the op
/// sequence within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverRange {
    pub block: BlockId,
    pub start: PcodeOpId,
    pub end: PcodeOpId,
}

/// The set of address ranges / basic-block positions where at least one
/// Varnode of a HighVariable is live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cover {
    ranges: Vec<CoverRange>,
}

impl Cover {
    pub fn new() -> Self {
        Cover { ranges: Vec::new() }
    }

    pub fn add_range(&mut self, range: CoverRange) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[CoverRange] {
        &self.ranges
    }

    /// Two covers are compatible if they never overlap in the same block
    /// except through a MULTIEQUAL boundary, which the caller signals by
    /// passing `multiequal_boundary: true` for a specific block.
    pub fn compatible_with(&self, other: &Cover, multiequal_blocks: &[BlockId]) -> bool {
        for a in &self.ranges {
            for b in &other.ranges {
                if a.block != b.block {
                    continue;
                }
                if multiequal_blocks.contains(&a.block) {
                    continue;
                }
                let overlap = a.start <= b.end && b.start <= a.end;
                if overlap {
                    return false;
                }
            }
        }
        true
    }
}

/// An equivalence class of Varnodes merged into one source-level variable
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighVariable {
    pub name: Option<String>,
    pub symbol: Option<SymbolId>,
    pub type_id: TypeId,
    pub members: Vec<VarnodeId>,
    pub cover: Cover,
    pub isolated: bool,
}

impl HighVariable {
    pub fn singleton(vn: VarnodeId, type_id: TypeId) -> Self {
        HighVariable {
            name: None,
            symbol: None,
            type_id,
            members: vec![vn],
            cover: Cover::new(),
            isolated: false,
        }
    }
}

/// Attempts to merge `other` into `target`, refusing if their covers
/// conflict or if either carries the `isolated` flag (spec.md §4.2:
/// "the isolated flag on a symbol suppresses speculative merge across it").
pub fn merge_high_variables(
    target: &mut HighVariable,
    other: HighVariable,
    multiequal_blocks: &[BlockId],
) -> Result<(), AnalysisError> {
    if target.isolated || other.isolated {
        return Err(AnalysisError::CoverConflict);
    }
    if !target.cover.compatible_with(&other.cover, multiequal_blocks) {
        return Err(AnalysisError::CoverConflict);
    }
    target.members.extend(other.members);
    for range in other.cover.ranges() {
        target.cover.add_range(*range);
    }
    if target.name.is_none() {
        target.name = other.name;
    }
    Ok(())
}
