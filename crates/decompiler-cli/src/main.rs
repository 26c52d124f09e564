//! Decompiler core control surface.
//!
//! Exposes a thin CLI binding for the control API of spec.md §6 --
//! decompile, continue after a breakpoint, set a breakpoint, print
//! statistics -- over a built-in demo function, since binary loading and
//! the SLEIGH front end are out of scope for this core (spec.md §1
//! Non-goals). A `clap` `Parser`/`Subcommand` pair, numbered exit codes,
//! JSON result on stdout.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use decompiler_analysis::BreakKind;
use decompiler_core::{Architecture, ArchitectureConfig};
use decompiler_cli::{break_point, continue_decompile, decompile, default_action_group};

#[derive(Parser)]
#[command(name = "decompiler", about = "Decompiler core control surface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, ValueEnum)]
enum BreakKindArg {
    Start,
    Action,
}

impl From<BreakKindArg> for BreakKind {
    fn from(a: BreakKindArg) -> Self {
        match a {
            BreakKindArg::Start => BreakKind::Start,
            BreakKindArg::Action => BreakKind::Action,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decompile a built-in demo function and print the result as JSON.
    Decompile {
        /// Which demo scenario to build (see `list-scenarios`).
        #[arg(short, long, default_value = "diamond")]
        scenario: String,

        /// Set a breakpoint before structuring this action runs/changes,
        /// then immediately continue -- demonstrates the pause/resume
        /// boundary of spec.md §5 within a single process.
        #[arg(long, value_name = "ACTION")]
        break_action: Option<String>,

        #[arg(long, value_enum, default_value = "start", requires = "break_action")]
        break_kind: BreakKindArg,
    },
    /// List the names `--scenario` accepts.
    ListScenarios,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Decompile {
            scenario,
            break_action,
            break_kind,
        } => run_decompile(&scenario, break_action.as_deref(), break_kind.into()),
        Commands::ListScenarios => {
            for name in decompiler_cli::demo::SCENARIO_NAMES {
                println!("{}", name);
            }
            0
        }
    };
    process::exit(exit_code);
}

/// Builds the named demo scenario, runs `decompile`, optionally pausing at
/// a breakpoint and resuming once, and prints the final result as JSON.
///
/// Exit codes: 0 success, 1 unknown scenario, 2 execution error
/// (unrecognized action/break kind produced no pause), 3 low-level/decoder
/// error (the §7 abort path).
fn run_decompile(scenario: &str, break_action: Option<&str>, break_kind: BreakKind) -> i32 {
    let mut arch = Architecture::new(ArchitectureConfig::default());
    let Some(fid) = decompiler_cli::demo::build_by_name(&mut arch, scenario) else {
        eprintln!(
            "Error: unknown scenario '{}' (see `decompiler list-scenarios`)",
            scenario
        );
        return 1;
    };

    let mut group = default_action_group();
    if let Some(action) = break_action {
        group.set_break_point(break_point(action, break_kind));
    }

    let result = match decompile(&mut arch, fid, &mut group) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Decompilation error: {}", e);
            return if e.aborts_function() { 3 } else { 2 };
        }
    };

    let paused = matches!(result.state, decompiler_analysis::DriverState::Paused { .. });
    let first = serde_json::json!({
        "scenario": scenario,
        "state": format!("{:?}", result.state),
        "statistics": result.statistics.iter().map(|(n, s)| serde_json::json!({
            "action": n, "calls": s.calls, "changes": s.changes,
        })).collect::<Vec<_>>(),
        "text": result.text,
    });
    println!("{}", serde_json::to_string_pretty(&first).unwrap());

    if paused {
        group.clear_break_points();
        let resumed = match continue_decompile(&mut arch, fid, &mut group) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Decompilation error on resume: {}", e);
                return if e.aborts_function() { 3 } else { 2 };
            }
        };
        let second = serde_json::json!({
            "scenario": scenario,
            "resumed_state": format!("{:?}", resumed.state),
            "text": resumed.text,
        });
        println!("{}", serde_json::to_string_pretty(&second).unwrap());
    }

    0
}
