//! The `Action`/`ActionGroup` transformation driver (spec.md §4.3).
//!
//! Each `Action` is a strategy record -- not a handwritten dispatch tree --
//! consulted by the driver's explicit state machine. Follows an
//! interpreter run-state shape used elsewhere in this workspace (`Ready ->
//! Running -> Paused | Completed | Error`), generalized from one
//! interpreter run to a restartable pass scheduler: actions don't run as
//! coroutines, they are invoked one `perform` at a time and the driver
//! records exactly where it stopped so a breakpoint can resume later.

use decompiler_core::{Funcdata, TypeRegistry};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// The three outcomes `Action::perform` can report for one invocation,
/// mirroring spec.md §4.3's neg/zero/positive return convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformOutcome {
    /// The action made no change; it has reached its own local fixpoint.
    NoChange,
    /// The action made `count` changes this call and may have more to do.
    Changed { count: u32 },
    /// The action determined it cannot proceed (distinct from an error --
    /// the driver records this and moves on rather than aborting).
    Stalled,
}

/// Running totals an `Action` reports through `statistics`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActionStatistics {
    pub calls: u32,
    pub changes: u32,
}

/// One named transformation step. Implementations hold whatever local
/// working state they need between calls to `perform`; `reset` clears it so
/// the same action instance can run again from scratch on a different
/// function.
pub trait Action {
    fn name(&self) -> &str;

    fn reset(&mut self);

    /// Runs one invocation of the action against `fd`, reporting how many
    /// changes it made.
    fn perform(&mut self, fd: &mut Funcdata, reg: &TypeRegistry) -> Result<PerformOutcome, AnalysisError>;

    fn statistics(&self) -> ActionStatistics;
}

/// Where the driver currently sits -- follows the same run-state shape
/// (`Ready -> Running -> Paused | Completed | Error`), with `Paused`
/// additionally recording which breakpoint fired so `continue_` knows
/// whether it's resuming mid-group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Ready,
    Running,
    Paused { at_action: String, kind: BreakKind },
    Completed,
    Failed { reason: String },
}

/// The two breakpoint kinds spec.md §4.3 distinguishes: before an action
/// starts, or after it performs a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Start,
    Action,
}

/// A breakpoint request: stop the driver the next time `action_name` is
/// about to run (`Start`) or has just made a change (`Action`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakPoint {
    pub action_name: String,
    pub kind: BreakKind,
}

/// Schedules a list of actions to a local fixpoint (each action re-run until
/// it reports `NoChange`) before advancing to the next, then loops the whole
/// group until nothing in it changed during a full pass -- `ActionGroup`'s
/// scheduling of spec.md §4.3.
pub struct ActionGroup {
    actions: Vec<Box<dyn Action>>,
    breakpoints: Vec<BreakPoint>,
    state: DriverState,
    cursor: usize,
    total_passes: u32,
}

impl ActionGroup {
    pub fn new(actions: Vec<Box<dyn Action>>) -> Self {
        ActionGroup {
            actions,
            breakpoints: Vec::new(),
            state: DriverState::Ready,
            cursor: 0,
            total_passes: 0,
        }
    }

    pub fn set_break_point(&mut self, bp: BreakPoint) {
        self.breakpoints.push(bp);
    }

    pub fn clear_break_points(&mut self) {
        self.breakpoints.clear();
    }

    pub fn get_status(&self) -> &DriverState {
        &self.state
    }

    pub fn statistics(&self) -> Vec<(String, ActionStatistics)> {
        self.actions
            .iter()
            .map(|a| (a.name().to_string(), a.statistics()))
            .collect()
    }

    fn hits(&self, name: &str, kind: BreakKind) -> bool {
        self.breakpoints.iter().any(|bp| bp.action_name == name && bp.kind == kind)
    }

    /// Runs the group to completion, or until a breakpoint pauses it.
    /// Calling again after a pause resumes from the paused action.
    pub fn run(&mut self, fd: &mut Funcdata, reg: &TypeRegistry) -> Result<DriverState, AnalysisError> {
        if matches!(self.state, DriverState::Completed | DriverState::Failed { .. }) {
            return Ok(self.state.clone());
        }
        self.state = DriverState::Running;

        loop {
            let mut group_changed = false;
            while self.cursor < self.actions.len() {
                let name = self.actions[self.cursor].name().to_string();
                tracing::debug!(action = %name, "action starting");
                if self.hits(&name, BreakKind::Start) {
                    self.state = DriverState::Paused {
                        at_action: name.clone(),
                        kind: BreakKind::Start,
                    };
                    tracing::debug!(action = %name, "action paused at start breakpoint");
                    return Ok(self.state.clone());
                }

                loop {
                    let outcome = self.actions[self.cursor].perform(fd, reg);
                    let outcome = match outcome {
                        Ok(o) => o,
                        Err(e) => {
                            tracing::warn!(action = %name, error = %e, "action failed, driver aborting");
                            self.state = DriverState::Failed { reason: e.to_string() };
                            return Err(e);
                        }
                    };
                    match outcome {
                        PerformOutcome::NoChange => break,
                        PerformOutcome::Stalled => break,
                        PerformOutcome::Changed { count } => {
                            tracing::debug!(action = %name, count, "action changed");
                            group_changed = true;
                            if self.hits(&name, BreakKind::Action) {
                                self.state = DriverState::Paused {
                                    at_action: name.clone(),
                                    kind: BreakKind::Action,
                                };
                                tracing::debug!(action = %name, "action paused after change breakpoint");
                                return Ok(self.state.clone());
                            }
                        }
                    }
                }
                tracing::debug!(action = %name, "action reached local fixpoint");
                self.cursor += 1;
            }
            self.cursor = 0;
            self.total_passes += 1;
            if !group_changed {
                break;
            }
        }

        self.state = DriverState::Completed;
        Ok(self.state.clone())
    }

    pub fn total_passes(&self) -> u32 {
        self.total_passes
    }
}
