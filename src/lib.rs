//! STRIPS-style planning over snapshots of a simulated household.
//!
//! A problem file declares typed objects and the facts that hold at one
//! moment. The planner searches for the sequence of ground actions that
//! turns one snapshot into another, or that satisfies a problem's `:goal`.

pub mod cli;
pub mod domain;
pub mod expander;
pub mod goal;
pub mod pddl;
pub mod planner;
pub mod settings;
pub mod world;

pub use cli::{run, AppError, Cli};
pub use domain::{Action, ActionKind, IllegalAction, Plan};
pub use goal::{validate_plan, Diff, Goal, ValidationError};
pub use pddl::{load_plan, load_problem, parse_problem, LoadError, ParseError, Problem};
pub use planner::{Budget, Outcome, Planner, Search, Strategy};
pub use settings::Settings;
pub use world::{Fact, InvariantViolation, State, World};
