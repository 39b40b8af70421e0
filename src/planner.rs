//! Forward state-space search over the expander's successor relation.

mod search;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domain::Plan;
use crate::expander::Expander;
use crate::goal::Goal;
use crate::world::{State, World};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Shortest plans, visited set keyed by state.
    #[default]
    #[serde(rename = "bfs", alias = "breadth-first")]
    #[value(name = "bfs", alias = "breadth-first")]
    BreadthFirst,
    /// Frontier ordered by the number of unsatisfied goal literals.
    #[serde(rename = "greedy", alias = "greedy-best-first")]
    #[value(name = "greedy", alias = "greedy-best-first")]
    GreedyBestFirst,
}

/// Limits on a single search. Running out of any of them ends the search with
/// [`Outcome::TimedOut`].
#[derive(Debug, Clone, Default)]
pub struct Budget {
    pub max_nodes: Option<usize>,
    pub timeout: Option<Duration>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn exhausted(&self, expanded: usize, started: Instant) -> bool {
        self.max_nodes.map_or(false, |max| expanded >= max)
            || self.timeout.map_or(false, |timeout| started.elapsed() >= timeout)
            || self.cancel.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Solved(Plan),
    Unsolvable,
    TimedOut,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Solved(_) => "solved",
            Outcome::Unsolvable => "unsolvable",
            Outcome::TimedOut => "timed-out",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub expanded: usize,
    pub generated: usize,
    pub duplicates: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub outcome: Outcome,
    pub stats: Stats,
}

pub struct Planner {
    expander: Expander,
    strategy: Strategy,
    budget: Budget,
}

impl Planner {
    pub fn new(world: &World) -> Self {
        Planner { expander: Expander::new(world), strategy: Strategy::default(), budget: Budget::default() }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn dedup_successors(mut self, dedup: bool) -> Self {
        self.expander = self.expander.dedup(dedup);
        self
    }

    /// Searches for a plan from `initial` to any state satisfying `goal`.
    #[instrument(skip_all, fields(strategy = ?self.strategy))]
    pub fn search(&self, initial: &State, goal: &Goal) -> Search {
        let started = Instant::now();
        let mut stats = Stats::default();
        let outcome = if goal.is_satisfied(initial) {
            Outcome::Solved(Plan::default())
        } else if goal.impossible(initial.world()) {
            Outcome::Unsolvable
        } else {
            match self.strategy {
                Strategy::BreadthFirst => search::breadth_first(&self.expander, initial, goal, &self.budget, started, &mut stats),
                Strategy::GreedyBestFirst => {
                    search::greedy_best_first(&self.expander, initial, goal, &self.budget, started, &mut stats)
                }
            }
        };
        stats.elapsed = started.elapsed();
        info!(
            outcome = outcome.label(),
            expanded = stats.expanded,
            generated = stats.generated,
            duplicates = stats.duplicates,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search finished"
        );
        Search { outcome, stats }
    }
}
