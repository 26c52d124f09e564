//! Calling-convention and prototype model (spec.md §4.7).
//!
//! Builds on the plain parameter-list-plus-return-type signature shape
//! used elsewhere in this workspace, generalized here with the
//! calling-convention fields a signature container doesn't otherwise
//! need: parameter storage assignment, extrapop, evaluation category, and
//! input/output/model locking.

use decompiler_core::{Address, ArchitectureConfig, TypeId};

use crate::error::PrintError;

/// How a prototype model assigns storage locations to parameters. The
/// variants cover the two conventions spec.md's "parameter storage
/// assignment rule" has to choose between; a real architecture would
/// extend this with its own register list, but the two shapes below are
/// enough to make the rule's effect on a call-spec observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterStorageRule {
    /// Parameters occupy a fixed list of register storage locations, in
    /// order, falling back to the stack once the list is exhausted.
    RegistersThenStack { registers: Vec<Address> },
    /// Every parameter is stack-passed, each `slot_size` bytes wide.
    StackOnly { slot_size: u32, stack_space: decompiler_core::SpaceId },
}

/// Which evaluation order / role a prototype model plays at a callsite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationCategory {
    Standard,
    /// The model only describes how *this* function's own parameters are
    /// read, never used to interpret a callsite (spec.md's "uponentry").
    UponEntry,
    /// The model only describes how a callee's return value is received.
    UponReturn,
}

bitflags::bitflags! {
    /// Which parts of a prototype are pinned as ground truth, per
    /// spec.md §4.7's "the decompiler uses locked prototypes as ground
    /// truth".
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PrototypeLock: u32 {
        const INPUT  = 1 << 0;
        const OUTPUT = 1 << 1;
        const MODEL  = 1 << 2;
    }
}

/// One named, typed parameter of a prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_id: TypeId,
    pub storage: Option<Address>,
}

/// A function's calling-convention prototype: parameter list, return
/// storage, extrapop, evaluation category, and lock state.
///
/// `is_variadic` is a supplement beyond spec.md's description (SPEC_FULL.md
/// §13): without it, a model can't decide whether trailing callsite
/// arguments widen the formal parameter list or are simply extra.
#[derive(Debug, Clone, PartialEq)]
pub struct PrototypeModel {
    pub params: Vec<Parameter>,
    pub return_type: TypeId,
    pub return_storage: Option<Address>,
    /// Bytes the callee pops off the stack beyond its own arguments, or
    /// `None` if not yet determined ("unknown extrapop").
    pub extrapop: Option<i32>,
    pub eval_category: EvaluationCategory,
    pub is_variadic: bool,
    pub lock: PrototypeLock,
}

impl PrototypeModel {
    pub fn unlocked(return_type: TypeId) -> Self {
        PrototypeModel {
            params: Vec::new(),
            return_type,
            return_storage: None,
            extrapop: None,
            eval_category: EvaluationCategory::Standard,
            is_variadic: false,
            lock: PrototypeLock::empty(),
        }
    }

    pub fn is_input_locked(&self) -> bool {
        self.lock.contains(PrototypeLock::INPUT)
    }

    pub fn is_output_locked(&self) -> bool {
        self.lock.contains(PrototypeLock::OUTPUT)
    }

    pub fn is_model_locked(&self) -> bool {
        self.lock.contains(PrototypeLock::MODEL)
    }

    /// Assigns storage to every parameter per `rule`, skipping parameters
    /// that already carry an input-locked storage assignment.
    pub fn assign_storage(&mut self, rule: &ParameterStorageRule) -> Result<(), PrintError> {
        if self.is_input_locked() {
            return Err(PrintError::PrototypeLocked { what: "input storage" });
        }
        match rule {
            ParameterStorageRule::RegistersThenStack { registers } => {
                let stack_space = registers.first().map(|a| a.space);
                for (i, param) in self.params.iter_mut().enumerate() {
                    param.storage = registers.get(i).copied().or_else(|| {
                        stack_space.map(|space| {
                            Address::new(space, (i as u64) * 8)
                        })
                    });
                }
            }
            ParameterStorageRule::StackOnly { slot_size, stack_space } => {
                for (i, param) in self.params.iter_mut().enumerate() {
                    param.storage = Some(Address::new(*stack_space, (i as u64) * (*slot_size as u64)));
                }
            }
        }
        Ok(())
    }
}

/// Observed facts about a callsite's argument usage, accumulated while
/// walking the IR, fed into [`produce_prototypes`] to refine an unlocked
/// model. Grounded on `server/project_agent.rs`'s pattern of merging
/// independently-observed facts into one running model.
#[derive(Debug, Clone, Default)]
pub struct CallsiteObservation {
    pub argument_count: usize,
    pub argument_types: Vec<TypeId>,
}

/// Merges callsite observations into an unlocked prototype's parameter
/// list ("produce prototypes", spec.md §4.7). A model-locked or
/// input-locked prototype is left untouched -- locked prototypes are
/// ground truth and are never overwritten by inference.
pub fn produce_prototypes(
    model: &mut PrototypeModel,
    observations: &[CallsiteObservation],
    config: &ArchitectureConfig,
) {
    if model.is_model_locked() || model.is_input_locked() {
        return;
    }
    let widest = observations.iter().map(|o| o.argument_count).max().unwrap_or(0);
    if widest <= model.params.len() {
        return;
    }
    for i in model.params.len()..widest {
        let observed_type = observations
            .iter()
            .filter_map(|o| o.argument_types.get(i).copied())
            .next()
            .unwrap_or(TypeId::UNKNOWN8);
        model.params.push(Parameter {
            name: format!("param_{}", i + 1),
            type_id: observed_type,
            storage: None,
        });
    }
    let _ = config;
}
