use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::goal::{validate_plan, Diff, ValidationError};
use crate::pddl::{self, writer, LoadError, Problem};
use crate::planner::{Outcome, Stats, Strategy};
use crate::settings::Settings;
use crate::world::{Fact, Registry, State};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid logging.level: {0}")]
    Logging(#[from] tracing_subscriber::filter::ParseError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{} has no :goal, pass --target", .0.display())]
    NoGoal(PathBuf),
    #[error("no plan reaches the goal")]
    Unsolvable,
    #[error("search budget ran out before a plan was found")]
    TimedOut,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Unsolvable => 2,
            AppError::TimedOut => 3,
            AppError::Load(LoadError::Parse { .. }) => 4,
            AppError::Load(LoadError::Invariant { .. }) => 5,
            AppError::Validation(ValidationError::Step(_)) => 6,
            AppError::Validation(ValidationError::Mismatch { .. }) => 7,
            _ => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Plans between household simulation snapshots", long_about = None)]
pub struct Cli {
    /// Settings file, household-planner.toml in the working directory by default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Loads a problem and checks its invariants
    Check {
        problem: PathBuf,
    },
    /// Searches for a plan
    Plan(PlanArgs),
    /// Prints the facts added and removed between two snapshots
    Diff {
        initial: PathBuf,
        target: PathBuf,
    },
    /// Replays a plan file and compares the result with the target snapshot
    Validate {
        initial: PathBuf,
        target: PathBuf,
        plan: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    pub problem: PathBuf,
    /// Snapshot to reach, instead of the problem's :goal
    #[arg(long)]
    pub target: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,
    /// Stop after expanding this many states
    #[arg(long)]
    pub max_nodes: Option<usize>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Write the state the plan ends in as a problem file
    #[arg(long)]
    pub write_final: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new(cli.config.as_deref())?;
    init_tracing(&settings)?;
    debug!(?settings, "settings loaded");

    match &cli.command {
        Commands::Check { problem } => {
            let report = check(problem)?;
            render(&report, cli.format)?;
        }
        Commands::Plan(args) => {
            let report = plan(args, settings)?;
            render(&report, cli.format)?;
            report.status.into_result()?;
        }
        Commands::Diff { initial, target } => {
            let report = diff(initial, target)?;
            render(&report, cli.format)?;
        }
        Commands::Validate { initial, target, plan } => {
            let (report, result) = validate(initial, target, plan)?;
            render(&report, cli.format)?;
            result?;
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings) -> Result<()> {
    let filter = settings.logging.env_filter()?;
    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            let text = value.display();
            if !text.is_empty() {
                println!("{}", text);
            }
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug, Serialize)]
struct CheckReport {
    problem: String,
    domain: Option<String>,
    objects: usize,
    static_facts: usize,
    fluents: usize,
    goal: Option<String>,
    goal_satisfied: Option<bool>,
}

fn check(path: &Path) -> Result<CheckReport> {
    let problem = pddl::load_problem(path, None)?;
    let state = &problem.state;
    let registry = state.registry();
    Ok(CheckReport {
        problem: problem.name.clone(),
        domain: problem.domain.clone(),
        objects: registry.len(),
        static_facts: state.world().statics().len(),
        fluents: state.fluents().len(),
        goal: problem.goal.as_ref().map(|goal| goal.display(registry).to_string()),
        goal_satisfied: problem.goal.as_ref().map(|goal| goal.is_satisfied(state)),
    })
}

impl DisplayFallback for CheckReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "{}: {} objects, {} static facts, {} fluents",
            self.problem, self.objects, self.static_facts, self.fluents
        )];
        if let (Some(goal), Some(satisfied)) = (&self.goal, self.goal_satisfied) {
            let status = if satisfied { "satisfied" } else { "open" };
            lines.push(format!("goal ({}): {}", status, goal));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Status {
    Solved,
    Unsolvable,
    TimedOut,
}

impl Status {
    fn into_result(self) -> Result<()> {
        match self {
            Status::Solved => Ok(()),
            Status::Unsolvable => Err(AppError::Unsolvable),
            Status::TimedOut => Err(AppError::TimedOut),
        }
    }
}

#[derive(Debug, Serialize)]
struct PlanReport {
    status: Status,
    strategy: Strategy,
    plan: Vec<String>,
    stats: Stats,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_state: Option<PathBuf>,
}

fn plan(args: &PlanArgs, mut settings: Settings) -> Result<PlanReport> {
    let problem = pddl::load_problem(&args.problem, None)?;
    let initial = &problem.state;
    let world = initial.world();
    let goal = match &args.target {
        Some(path) => {
            let target = pddl::load_problem(path, Some(world))?;
            Diff::between(initial, &target.state).goal()
        }
        None => problem.goal.clone().ok_or_else(|| AppError::NoGoal(args.problem.clone()))?,
    };

    if let Some(strategy) = args.strategy {
        settings.search.strategy = strategy;
    }
    if args.max_nodes.is_some() {
        settings.search.max_nodes = args.max_nodes;
    }
    if args.timeout_ms.is_some() {
        settings.search.timeout_ms = args.timeout_ms;
    }
    let search = settings.planner(world).search(initial, &goal);

    let registry = initial.registry();
    let (status, steps, final_state) = match &search.outcome {
        Outcome::Solved(plan) => {
            let final_state = match &args.write_final {
                Some(path) => {
                    write_final(&problem, plan.replay(initial).map_err(ValidationError::from)?, path)?;
                    Some(path.clone())
                }
                None => None,
            };
            let steps = plan.steps().iter().map(|action| action.display(registry).to_string()).collect();
            (Status::Solved, steps, final_state)
        }
        Outcome::Unsolvable => (Status::Unsolvable, Vec::new(), None),
        Outcome::TimedOut => (Status::TimedOut, Vec::new(), None),
    };
    Ok(PlanReport { status, strategy: settings.search.strategy, plan: steps, stats: search.stats, final_state })
}

fn write_final(problem: &Problem, state: State, path: &Path) -> Result<()> {
    let end = Problem {
        name: problem.name.clone(),
        domain: problem.domain.clone(),
        requirements: problem.requirements,
        state,
        goal: None,
    };
    pddl::save(path, &writer::write_problem(&end))?;
    info!(path = %path.display(), "wrote final state");
    Ok(())
}

impl DisplayFallback for PlanReport {
    fn display(&self) -> String {
        match self.status {
            Status::Solved => self.plan.join("\n"),
            Status::Unsolvable => format!("; unsolvable after {} expanded states", self.stats.expanded),
            Status::TimedOut => format!("; timed out after {} expanded states", self.stats.expanded),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct DiffReport {
    added: Vec<String>,
    removed: Vec<String>,
}

impl DiffReport {
    fn new(diff: &Diff, registry: &Registry) -> Self {
        let render = |facts: &BTreeSet<Fact>| -> Vec<String> {
            facts.iter().map(|fact| fact.display(registry).to_string()).collect()
        };
        DiffReport { added: render(&diff.added), removed: render(&diff.removed) }
    }
}

fn diff(initial: &Path, target: &Path) -> Result<DiffReport> {
    let initial = pddl::load_problem(initial, None)?;
    let target = pddl::load_problem(target, Some(initial.state.world()))?;
    let diff = Diff::between(&initial.state, &target.state);
    Ok(DiffReport::new(&diff, initial.state.registry()))
}

impl DisplayFallback for DiffReport {
    fn display(&self) -> String {
        let added = self.added.iter().map(|fact| format!("+ {}", fact));
        let removed = self.removed.iter().map(|fact| format!("- {}", fact));
        added.chain(removed).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    valid: bool,
    steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mismatch: Option<DiffReport>,
}

fn validate(
    initial: &Path,
    target: &Path,
    plan: &Path,
) -> Result<(ValidateReport, std::result::Result<(), ValidationError>)> {
    let initial = pddl::load_problem(initial, None)?;
    let world = initial.state.world();
    let target = pddl::load_problem(target, Some(world))?;
    let plan = pddl::load_plan(plan, world)?;
    let registry = initial.state.registry();

    let mut report = ValidateReport { valid: false, steps: plan.len(), failed_step: None, reason: None, mismatch: None };
    let result = validate_plan(&initial.state, &plan, &target.state).map(|_| ());
    match &result {
        Ok(()) => report.valid = true,
        Err(ValidationError::Step(failed)) => {
            report.failed_step = Some(failed.step);
            report.reason = Some(failed.source.to_string());
        }
        Err(ValidationError::Mismatch { diff, .. }) => report.mismatch = Some(DiffReport::new(diff, registry)),
    }
    Ok((report, result))
}

impl DisplayFallback for ValidateReport {
    fn display(&self) -> String {
        if self.valid {
            return format!("; plan of {} steps reaches the target", self.steps);
        }
        match (&self.failed_step, &self.reason, &self.mismatch) {
            (Some(step), Some(reason), _) => format!("; step {} failed: {}", step, reason),
            (_, _, Some(mismatch)) => format!("; final state differs from the target\n{}", mismatch.display()),
            _ => String::from("; invalid plan"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("problems/household").join(name).join("problem.pddl")
    }

    fn settings() -> Settings {
        Settings::new(Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("household-planner.toml").as_path())).unwrap()
    }

    #[test]
    fn test_check_fixture() {
        let report = check(&fixture("time_0532_state_change")).unwrap();
        assert_eq!(report.problem, "simulation-a");
        assert_eq!(report.objects, 21);
        assert_eq!(report.static_facts, 10);
        assert_eq!(report.fluents, 8);
        assert_eq!(report.goal, None);
        assert!(report.display().starts_with("simulation-a: 21 objects"));
    }

    #[test]
    fn test_plan_to_next_snapshot() {
        let args = PlanArgs {
            problem: fixture("time_0532_state_change"),
            target: Some(fixture("time_0533_state_change")),
            ..PlanArgs::default()
        };
        let report = plan(&args, settings()).unwrap();
        assert_eq!(report.status, Status::Solved);
        assert_eq!(report.plan, ["(pick-up apple)", "(put-in-fridge apple kitchen-fridge)"]);

        let greedy = PlanArgs {
            problem: fixture("time_0533_state_change"),
            target: Some(fixture("time_0534_state_change")),
            strategy: Some(Strategy::GreedyBestFirst),
            ..PlanArgs::default()
        };
        let report = plan(&greedy, settings()).unwrap();
        assert_eq!(report.strategy, Strategy::GreedyBestFirst);
        assert_eq!(report.plan, ["(toggle-tv living-room-tv)"]);
    }

    #[test]
    fn test_plan_to_problem_goal_and_write_final() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("final.pddl");
        let args = PlanArgs {
            problem: fixture("tidy_kitchen"),
            write_final: Some(out.clone()),
            ..PlanArgs::default()
        };
        let report = plan(&args, settings()).unwrap();
        assert_eq!(report.status, Status::Solved);
        assert_eq!(report.plan.len(), 4);
        assert_eq!(report.final_state.as_deref(), Some(out.as_path()));

        let problem = pddl::load_problem(&fixture("tidy_kitchen"), None).unwrap();
        let end = pddl::load_problem(&out, Some(problem.state.world())).unwrap();
        assert!(problem.goal.unwrap().is_satisfied(&end.state));
        assert_eq!(end.goal, None);
    }

    #[test]
    fn test_plan_outcomes_map_to_exit_codes() {
        let no_goal = PlanArgs { problem: fixture("time_0532_state_change"), ..PlanArgs::default() };
        let error = plan(&no_goal, settings()).unwrap_err();
        assert!(matches!(error, AppError::NoGoal(_)));
        assert_eq!(error.exit_code(), 1);

        let starved = PlanArgs {
            problem: fixture("time_0532_state_change"),
            target: Some(fixture("time_0534_state_change")),
            max_nodes: Some(1),
            ..PlanArgs::default()
        };
        let report = plan(&starved, settings()).unwrap();
        assert_eq!(report.status, Status::TimedOut);
        assert!(report.plan.is_empty());
        assert_eq!(report.status.into_result().unwrap_err().exit_code(), 3);
        assert_eq!(Status::Unsolvable.into_result().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_diff_snapshots() {
        let report = diff(&fixture("time_0532_state_change"), &fixture("time_0534_state_change")).unwrap();
        assert_eq!(
            report.added,
            [
                "(fridge-contains kitchen-fridge apple)",
                "(tv-on living-room-tv)",
                "(tv-playing-channel living-room-tv cnn)"
            ]
        );
        assert_eq!(report.removed, ["(table-contains living-room-table apple)"]);
        assert!(report.display().contains("- (table-contains living-room-table apple)"));
        assert_eq!(serde_json::to_value(&report).unwrap()["removed"][0], "(table-contains living-room-table apple)");
    }

    #[test]
    fn test_validate_plan_files() {
        let dir = tempfile::tempdir().unwrap();
        let initial = fixture("time_0532_state_change");
        let target = fixture("time_0533_state_change");
        let plan = dir.path().join("plan.txt");

        fs::write(&plan, "(pick-up apple)\n(put-in-fridge apple kitchen-fridge)\n").unwrap();
        let (report, result) = validate(&initial, &target, &plan).unwrap();
        assert!(report.valid);
        assert!(result.is_ok());

        fs::write(&plan, "(pick-up apple)\n").unwrap();
        let (report, result) = validate(&initial, &target, &plan).unwrap();
        assert!(!report.valid);
        let mismatch = report.mismatch.unwrap();
        assert!(mismatch.added.contains(&String::from("(fridge-contains kitchen-fridge apple)")));
        assert_eq!(AppError::from(result.unwrap_err()).exit_code(), 7);

        fs::write(&plan, "(put-in-fridge apple kitchen-fridge)\n").unwrap();
        let (report, result) = validate(&initial, &target, &plan).unwrap();
        assert_eq!(report.failed_step, Some(1));
        assert_eq!(AppError::from(result.unwrap_err()).exit_code(), 6);

        fs::write(&plan, "(put-in-fridge apple living-room-table)\n").unwrap();
        let error = validate(&initial, &target, &plan).unwrap_err();
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn test_load_errors_map_to_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pddl");
        let source = fs::read_to_string(fixture("time_0532_state_change")).unwrap();

        fs::write(&path, source.replace("(hand-empty me)", "(hand-empty me")).unwrap();
        assert_eq!(check(&path).unwrap_err().exit_code(), 4);

        fs::write(&path, source.replace("(hand-empty me)", "(hand-empty me)\n\t\t(in-hand me apple)")).unwrap();
        assert_eq!(check(&path).unwrap_err().exit_code(), 5);

        assert_eq!(check(&dir.path().join("missing.pddl")).unwrap_err().exit_code(), 1);
    }
}
