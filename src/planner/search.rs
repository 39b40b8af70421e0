use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use priority_queue::PriorityQueue;
use tracing::debug;

use super::{Budget, Outcome, Stats};
use crate::domain::{Action, Plan};
use crate::expander::Expander;
use crate::goal::Goal;
use crate::world::State;

const PROGRESS_EVERY: usize = 10_000;

struct Node {
    state: State,
    parent: Option<usize>,
    action: Option<Action>,
}

fn reconstruct_path(nodes: &[Node], current: usize) -> Plan {
    let mut total_path = Vec::new();
    let mut current = current;
    while let Some(parent) = nodes[current].parent {
        if let Some(action) = nodes[current].action {
            total_path.push(action);
        }
        current = parent;
    }
    total_path.reverse();
    Plan::new(total_path)
}

fn progress(stats: &Stats, frontier: usize) {
    if stats.expanded % PROGRESS_EVERY == 0 {
        debug!(expanded = stats.expanded, generated = stats.generated, frontier, "searching");
    }
}

/// Goal test on generation, so the first plan found is a shortest one.
pub(super) fn breadth_first(
    expander: &Expander,
    initial: &State,
    goal: &Goal,
    budget: &Budget,
    started: Instant,
    stats: &mut Stats,
) -> Outcome {
    let mut nodes = vec![Node { state: initial.clone(), parent: None, action: None }];
    let mut visited: HashSet<State> = HashSet::new();
    visited.insert(initial.clone());
    let mut open = VecDeque::from([0]);

    while let Some(current) = open.pop_front() {
        if budget.exhausted(stats.expanded, started) {
            return Outcome::TimedOut;
        }
        stats.expanded += 1;
        progress(stats, open.len());
        let state = nodes[current].state.clone();
        for (action, next) in expander.successors(&state) {
            stats.generated += 1;
            if visited.contains(&next) {
                stats.duplicates += 1;
                continue;
            }
            visited.insert(next.clone());
            let done = goal.is_satisfied(&next);
            nodes.push(Node { state: next, parent: Some(current), action: Some(action) });
            if done {
                return Outcome::Solved(reconstruct_path(&nodes, nodes.len() - 1));
            }
            open.push_back(nodes.len() - 1);
        }
    }
    Outcome::Unsolvable
}

/// Frontier ordered by unsatisfied goal literals, insertion order breaking
/// ties. The closed set keeps it complete on finite state spaces.
pub(super) fn greedy_best_first(
    expander: &Expander,
    initial: &State,
    goal: &Goal,
    budget: &Budget,
    started: Instant,
    stats: &mut Stats,
) -> Outcome {
    let mut nodes = vec![Node { state: initial.clone(), parent: None, action: None }];
    let mut closed: HashSet<State> = HashSet::new();
    closed.insert(initial.clone());
    let mut open_set = PriorityQueue::new();
    let mut sequence: u64 = 0;
    open_set.push(0usize, Reverse((goal.unsatisfied(initial), sequence)));

    while let Some((current, _)) = open_set.pop() {
        if budget.exhausted(stats.expanded, started) {
            return Outcome::TimedOut;
        }
        stats.expanded += 1;
        progress(stats, open_set.len());
        let state = nodes[current].state.clone();
        for (action, next) in expander.successors(&state) {
            stats.generated += 1;
            if !closed.insert(next.clone()) {
                stats.duplicates += 1;
                continue;
            }
            let h = goal.unsatisfied(&next);
            nodes.push(Node { state: next, parent: Some(current), action: Some(action) });
            if h == 0 {
                return Outcome::Solved(reconstruct_path(&nodes, nodes.len() - 1));
            }
            sequence += 1;
            open_set.push(nodes.len() - 1, Reverse((h, sequence)));
        }
    }
    Outcome::Unsolvable
}
