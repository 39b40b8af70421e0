use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::{Action, ActionKind};
use crate::world::{EntityId, State, World};

/// Pre-grounded action catalogue of a world.
///
/// Actions are kept in template order, then by parameter binding in registry
/// declaration order with the first parameter varying slowest, so successor
/// order is deterministic for a given problem.
#[derive(Debug, Clone)]
pub struct Expander {
    actions: Vec<Action>,
    dedup: bool,
}

impl Expander {
    pub fn new(world: &World) -> Self {
        let registry = world.registry();
        let mut actions = Vec::new();
        for kind in ActionKind::ALL {
            let candidates: Vec<Vec<EntityId>> =
                kind.parameters().iter().map(|kinds| registry.of_kinds(*kinds).collect()).collect();
            let before = actions.len();
            for args in product(&candidates) {
                // only declared shelf levels survive
                if let Ok(action) = Action::ground(kind, &args, world) {
                    actions.push(action);
                }
            }
            debug!(template = kind.name(), count = actions.len() - before, "grounded");
        }
        Expander { actions, dedup: true }
    }

    /// Drop successors equal to one already produced by the same expansion.
    pub fn dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Applicable actions of `state` with their resulting states, lazily.
    pub fn successors<'a>(&'a self, state: &'a State) -> Successors<'a> {
        Successors { actions: self.actions.iter(), state, seen: self.dedup.then(HashSet::new) }
    }
}

fn product(candidates: &[Vec<EntityId>]) -> Vec<Vec<EntityId>> {
    candidates.iter().fold(vec![Vec::new()], |acc, options| {
        acc.iter()
            .flat_map(|prefix| {
                options.iter().map(move |id| {
                    let mut args = prefix.clone();
                    args.push(*id);
                    args
                })
            })
            .collect()
    })
}

pub struct Successors<'a> {
    actions: std::slice::Iter<'a, Action>,
    state: &'a State,
    seen: Option<HashSet<State>>,
}

impl Iterator for Successors<'_> {
    type Item = (Action, State);

    fn next(&mut self) -> Option<Self::Item> {
        for action in self.actions.by_ref() {
            if action.check(self.state).is_err() {
                continue;
            }
            let next = match self.state.apply(&action.effect(self.state)) {
                Ok(next) => next,
                Err(e) => {
                    warn!(action = %action.display(self.state.registry()), error = %e, "effect broke an invariant");
                    continue;
                }
            };
            if next == *self.state {
                continue;
            }
            if let Some(seen) = &mut self.seen {
                if !seen.insert(next.clone()) {
                    continue;
                }
            }
            return Some((*action, next));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::state::tests::{bedroom_world, id, initial};
    use crate::world::Fact;
    use std::sync::Arc;

    #[test]
    fn test_grounding_respects_types_and_levels() {
        let world = bedroom_world();
        let expander = Expander::new(&world);
        let count = |kind| expander.actions().iter().filter(|a| a.kind() == kind).count();
        // 2 items
        assert_eq!(count(ActionKind::PickUp), 2);
        assert_eq!(count(ActionKind::PutOnTable), 2);
        // 2 items x 1 shelf x 2 declared levels
        assert_eq!(count(ActionKind::PutOnShelf), 4);
        assert_eq!(count(ActionKind::PutInSink), 0);
        assert_eq!(count(ActionKind::ChangeChannel), 2);
        assert_eq!(count(ActionKind::ToggleTv), 1);
        assert_eq!(expander.actions()[0], Action::PickUp { item: id(&world, "book-a") });
    }

    #[test]
    fn test_successors_of_initial_state() {
        let world = bedroom_world();
        let state = initial(&world);
        let expander = Expander::new(&world);
        let actions: Vec<Action> = expander.successors(&state).map(|(a, _)| a).collect();
        let book = id(&world, "book-a");
        let pen = id(&world, "red-pen");
        let tv = id(&world, "bob-bedroom-tv");
        assert_eq!(
            actions,
            vec![Action::PickUp { item: book }, Action::PickUp { item: pen }, Action::ToggleTv { tv }]
        );
    }

    #[test]
    fn test_reachable_states_keep_invariants() {
        let world = bedroom_world();
        let expander = Expander::new(&world);
        let mut frontier = vec![initial(&world)];
        let mut visited: HashSet<State> = frontier.iter().cloned().collect();
        while let Some(state) = frontier.pop() {
            for (_, next) in expander.successors(&state) {
                let rebuilt = State::new(Arc::clone(next.world()), next.fluents().clone());
                assert_eq!(rebuilt.as_ref(), Ok(&next));
                let held = next.fluents().iter().filter(|f| matches!(f, Fact::InHand { .. })).count();
                assert_eq!(held + usize::from(next.hand_empty()), 1);
                if visited.insert(next.clone()) {
                    frontier.push(next);
                }
            }
        }
        // 15 item placements with the hand holding at most one, tv off or on one of 2 channels
        assert_eq!(visited.len(), 45);
        let tv = id(&world, "bob-bedroom-tv");
        assert!(visited.iter().all(|s| s.holds(&Fact::TvOn { tv }) == s.channel_of(tv).is_some()));
    }
}
