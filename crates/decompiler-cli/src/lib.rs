//! Top-level decompile orchestration (spec.md §2, §6): wires
//! `decompiler-core`'s IR store through `decompiler-analysis`'s
//! Action/Rule driver and `decompiler-structure`'s control-flow structurer,
//! then hands the result to `decompiler-print`.
//!
//! Follows the "parse options, load a program, call the one pipeline
//! function, map errors to exit codes" shape the CLI's own binary uses --
//! split into this library plus a thin `main.rs` so the entry point in
//! spec.md §2 ("A `decompile(function)` call resets analysis state...")
//! can be called directly by tests as well as by the binary.

pub mod demo;

use decompiler_analysis::{
    Action, ActionGroup, ActionStatistics, AnalysisError, BreakKind, BreakPoint, DriverState,
};
use decompiler_core::{Architecture, DecompError, FunctionId, Funcdata, TypeRegistry};
use decompiler_print::{print_function, PrintError};
use decompiler_structure::structure_function;

/// The single action this driver schedules: structure the function's
/// basic-block graph into the hierarchical form `decompiler-print` walks.
/// Wrapped as an `Action` (rather than called directly) so it participates
/// in the breakpoint/statistics machinery of spec.md §4.3 like any other
/// pass would.
///
/// `perform` reports `Changed` exactly once (the pass that actually ran
/// `structure_function`) and `NoChange` on every call after -- the local
/// fixpoint `ActionGroup::run` expects from a single-shot pass.
pub struct BlockStructureAction {
    done: bool,
    stats: ActionStatistics,
}

impl BlockStructureAction {
    pub fn new() -> Self {
        BlockStructureAction {
            done: false,
            stats: ActionStatistics::default(),
        }
    }
}

impl Default for BlockStructureAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for BlockStructureAction {
    fn name(&self) -> &str {
        "BlockStructure"
    }

    fn reset(&mut self) {
        self.done = false;
        self.stats = ActionStatistics::default();
    }

    fn perform(&mut self, fd: &mut Funcdata, _reg: &TypeRegistry) -> Result<decompiler_analysis::PerformOutcome, AnalysisError> {
        self.stats.calls += 1;
        if self.done {
            return Ok(decompiler_analysis::PerformOutcome::NoChange);
        }
        match structure_function(fd) {
            Ok(_) => {
                self.done = true;
                self.stats.changes += 1;
                Ok(decompiler_analysis::PerformOutcome::Changed { count: 1 })
            }
            Err(e) => Err(AnalysisError::ActionFailed {
                action: "BlockStructure".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn statistics(&self) -> ActionStatistics {
        self.stats
    }
}

/// The default action group a `decompile` call runs: just `BlockStructure`
/// today (spec.md's core names dozens more rule-level actions under §4.4's
/// structurer, which `decompiler-structure::structure_function` already
/// runs internally to its own fixpoint; this driver schedules it as one
/// named unit the way §2's "current action group" is a short list of
/// coarse-grained passes, not one entry per internal rule).
pub fn default_action_group() -> ActionGroup {
    ActionGroup::new(vec![Box::new(BlockStructureAction::new())])
}

/// The outcome of one `decompile` call: the driver's resting state,
/// per-action statistics, and (only once structuring has completed) the
/// printed C-like text.
#[derive(Debug, Clone)]
pub struct DecompResult {
    pub state: DriverState,
    pub statistics: Vec<(String, ActionStatistics)>,
    pub text: Option<String>,
}

fn print_error_to_decomp(e: PrintError) -> DecompError {
    match e {
        PrintError::Core(core) => DecompError::LowLevel(core),
        PrintError::Analysis(a) => DecompError::from(a),
        other => DecompError::Recov(other.to_string()),
    }
}

/// Resets the named function's analysis state, sets `group` as its current
/// action group, and runs it to completion or a breakpoint -- spec.md §2's
/// entry point. On completion, prints the structured function; on a
/// low-level/decoder error the function's analysis is cleared again before
/// the error is returned (the abort path of spec.md §7/§4.3).
pub fn decompile(
    arch: &mut Architecture,
    fid: FunctionId,
    group: &mut ActionGroup,
) -> Result<DecompResult, DecompError> {
    tracing::info!(function = fid.0, "decompile starting");
    let (fd, reg) = arch.function_and_types_mut(fid).map_err(DecompError::LowLevel)?;
    fd.clear_analysis();

    let run_result = group.run(fd, reg);
    let state = match run_result {
        Ok(state) => state,
        Err(e) => {
            let decomp = DecompError::from(e);
            if decomp.aborts_function() {
                tracing::warn!(function = fid.0, error = %decomp, "decompile aborted, clearing analysis");
                if let Ok(fd) = arch.function_mut(fid) {
                    fd.clear_analysis();
                }
            }
            return Err(decomp);
        }
    };

    let text = if matches!(state, DriverState::Completed) {
        let fd_ref = arch.function(fid).map_err(DecompError::LowLevel)?;
        Some(print_function(arch, &arch.types, fd_ref).map_err(print_error_to_decomp)?)
    } else {
        None
    };

    tracing::info!(function = fid.0, ?state, "decompile finished");
    Ok(DecompResult {
        state,
        statistics: group.statistics(),
        text,
    })
}

/// Resumes `group` against `fid` after a pause, without resetting
/// analysis state -- the `continue` command of spec.md §6/§5's "resume
/// from the same state" boundary. Unlike [`decompile`], this does *not*
/// call `clear_analysis`: doing so would discard whatever the paused
/// action already built.
pub fn continue_decompile(
    arch: &mut Architecture,
    fid: FunctionId,
    group: &mut ActionGroup,
) -> Result<DecompResult, DecompError> {
    tracing::info!(function = fid.0, "decompile resuming");
    let (fd, reg) = arch.function_and_types_mut(fid).map_err(DecompError::LowLevel)?;
    let run_result = group.run(fd, reg);
    let state = match run_result {
        Ok(state) => state,
        Err(e) => {
            let decomp = DecompError::from(e);
            if decomp.aborts_function() {
                tracing::warn!(function = fid.0, error = %decomp, "decompile aborted, clearing analysis");
                if let Ok(fd) = arch.function_mut(fid) {
                    fd.clear_analysis();
                }
            }
            return Err(decomp);
        }
    };

    let text = if matches!(state, DriverState::Completed) {
        let fd_ref = arch.function(fid).map_err(DecompError::LowLevel)?;
        Some(print_function(arch, &arch.types, fd_ref).map_err(print_error_to_decomp)?)
    } else {
        None
    };

    tracing::info!(function = fid.0, ?state, "decompile finished");
    Ok(DecompResult {
        state,
        statistics: group.statistics(),
        text,
    })
}

/// Decompiles every function `arch` currently holds, in id order. A
/// low-level/decoder error aborts only the offending function (its
/// analysis is cleared, a result entry records the error) and the driver
/// continues to the next one -- spec.md §4.3's "continues with the next
/// function if iterating".
pub fn decompile_all(arch: &mut Architecture) -> Vec<(FunctionId, Result<DecompResult, DecompError>)> {
    let mut ids: Vec<FunctionId> = arch.function_ids().copied().collect();
    ids.sort_by_key(|id| id.0);
    ids.into_iter()
        .map(|fid| {
            let mut group = default_action_group();
            let result = decompile(arch, fid, &mut group);
            (fid, result)
        })
        .collect()
}

/// Builds a breakpoint request for `action_name` of the given kind --
/// a thin constructor so `main.rs`'s CLI flag parsing doesn't need to
/// import `decompiler_analysis::driver` types directly.
pub fn break_point(action_name: impl Into<String>, kind: BreakKind) -> BreakPoint {
    BreakPoint {
        action_name: action_name.into(),
        kind,
    }
}
