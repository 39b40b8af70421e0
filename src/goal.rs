//! Goals, snapshot diffs and exact plan validation.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::domain::{Plan, StepFailed};
use crate::world::{Fact, Registry, State, World};

/// Conjunction of facts that must hold and facts that must not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Goal {
    positive: BTreeSet<Fact>,
    negative: BTreeSet<Fact>,
}

impl Goal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_facts(positive: impl IntoIterator<Item = Fact>, negative: impl IntoIterator<Item = Fact>) -> Self {
        Goal { positive: positive.into_iter().collect(), negative: negative.into_iter().collect() }
    }

    pub fn require(&mut self, fact: Fact) {
        self.positive.insert(fact);
    }

    pub fn forbid(&mut self, fact: Fact) {
        self.negative.insert(fact);
    }

    pub fn positive(&self) -> &BTreeSet<Fact> {
        &self.positive
    }

    pub fn negative(&self) -> &BTreeSet<Fact> {
        &self.negative
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    pub fn is_satisfied(&self, state: &State) -> bool {
        self.positive.iter().all(|f| state.holds(f)) && !self.negative.iter().any(|f| state.holds(f))
    }

    /// Number of goal literals `state` gets wrong.
    pub fn unsatisfied(&self, state: &State) -> usize {
        self.positive.iter().filter(|f| !state.holds(f)).count() + self.negative.iter().filter(|f| state.holds(f)).count()
    }

    /// True when no action sequence can ever satisfy the goal in `world`: a
    /// static literal disagrees with the statics, or a fact is both required and
    /// forbidden.
    pub fn impossible(&self, world: &World) -> bool {
        let statics = world.statics();
        self.positive.iter().any(|f| f.is_static() && !statics.contains(f))
            || self.negative.iter().any(|f| f.is_static() && statics.contains(f))
            || !self.positive.is_disjoint(&self.negative)
    }

    pub fn display<'a>(&'a self, registry: &'a Registry) -> GoalDisplay<'a> {
        GoalDisplay { goal: self, registry }
    }
}

pub struct GoalDisplay<'a> {
    goal: &'a Goal,
    registry: &'a Registry,
}

impl fmt::Display for GoalDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(and")?;
        for fact in &self.goal.positive {
            write!(f, " {}", fact.display(self.registry))?;
        }
        for fact in &self.goal.negative {
            write!(f, " (not {})", fact.display(self.registry))?;
        }
        write!(f, ")")
    }
}

/// Fact-set difference between two snapshots of the same household.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub added: BTreeSet<Fact>,
    pub removed: BTreeSet<Fact>,
}

impl Diff {
    pub fn between(initial: &State, target: &State) -> Diff {
        let before = initial.all_facts();
        let after = target.all_facts();
        Diff {
            added: after.difference(&before).copied().collect(),
            removed: before.difference(&after).copied().collect(),
        }
    }

    /// Everything added must hold, nothing removed may.
    pub fn goal(&self) -> Goal {
        Goal::from_facts(self.added.iter().copied(), self.removed.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn display<'a>(&'a self, registry: &'a Registry) -> DiffDisplay<'a> {
        DiffDisplay { diff: self, registry }
    }
}

/// `+ fact` and `- fact` lines.
pub struct DiffDisplay<'a> {
    diff: &'a Diff,
    registry: &'a Registry,
}

impl fmt::Display for DiffDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fact in &self.diff.added {
            writeln!(f, "+ {}", fact.display(self.registry))?;
        }
        for fact in &self.diff.removed {
            writeln!(f, "- {}", fact.display(self.registry))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Step(#[from] StepFailed),
    #[error("final state differs from the target:\n{rendered}")]
    Mismatch { diff: Diff, rendered: String },
}

/// Replays `plan` from `initial` and requires the result to equal `target`
/// exactly, a superset is a mismatch.
pub fn validate_plan(initial: &State, plan: &Plan, target: &State) -> Result<State, ValidationError> {
    let end = plan.replay(initial)?;
    let diff = Diff::between(&end, target);
    if diff.is_empty() {
        Ok(end)
    } else {
        let rendered = diff.display(end.registry()).to_string();
        Err(ValidationError::Mismatch { diff, rendered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;
    use crate::world::state::tests::{bedroom_world, id, initial};

    #[test]
    fn test_diff_between_snapshots() {
        let world = bedroom_world();
        let start = initial(&world);
        let tv = id(&world, "bob-bedroom-tv");
        let book = id(&world, "book-a");
        let table = id(&world, "bob-bedroom-table");
        let target = Plan::new(vec![Action::ToggleTv { tv }, Action::PickUp { item: book }]).replay(&start).unwrap();
        let diff = Diff::between(&start, &target);
        let me = id(&world, "me");
        let cnn = id(&world, "cnn");
        assert_eq!(
            diff.added,
            [Fact::InHand { person: me, item: book }, Fact::TvOn { tv }, Fact::TvPlayingChannel { tv, channel: cnn }]
                .into_iter()
                .collect()
        );
        assert_eq!(
            diff.removed,
            [Fact::TableContains { table, item: book }, Fact::HandEmpty { person: me }].into_iter().collect()
        );
        let goal = diff.goal();
        assert!(!goal.is_satisfied(&start));
        assert_eq!(goal.unsatisfied(&start), 5);
        assert!(goal.is_satisfied(&target));
        assert!(Diff::between(&target, &target).is_empty());
    }

    #[test]
    fn test_validate_requires_exact_match() {
        let world = bedroom_world();
        let start = initial(&world);
        let tv = id(&world, "bob-bedroom-tv");
        let target = Action::ToggleTv { tv }.apply(&start).unwrap();
        let exact = Plan::new(vec![Action::ToggleTv { tv }]);
        assert_eq!(validate_plan(&start, &exact, &target), Ok(target.clone()));

        let cnn = id(&world, "cnn");
        let nbc = id(&world, "nbc");
        let overshoot = Plan::new(vec![Action::ToggleTv { tv }, Action::ChangeChannel { tv, channel: nbc }]);
        match validate_plan(&start, &overshoot, &target) {
            Err(ValidationError::Mismatch { diff, rendered }) => {
                assert_eq!(diff.removed.len(), 1);
                assert_eq!(
                    rendered,
                    "+ (tv-playing-channel bob-bedroom-tv cnn)\n- (tv-playing-channel bob-bedroom-tv nbc)\n"
                );
            }
            other => panic!("unexpected {:?}", other),
        }

        let illegal = Plan::new(vec![Action::ChangeChannel { tv, channel: cnn }]);
        assert!(matches!(validate_plan(&start, &illegal, &target), Err(ValidationError::Step(StepFailed { step: 1, .. }))));
    }

    #[test]
    fn test_impossible_goals() {
        let world = bedroom_world();
        let tv = id(&world, "bob-bedroom-tv");
        let shelf = id(&world, "bob-bedroom-shelf");
        let bedroom = id(&world, "bob-bedroom");
        let mut goal = Goal::new();
        goal.require(Fact::TvOn { tv });
        assert!(!goal.impossible(&world));
        goal.forbid(Fact::InBedroom { room: bedroom, fixture: shelf });
        assert!(goal.impossible(&world));

        let contradictory = Goal::from_facts([Fact::TvOn { tv }], [Fact::TvOn { tv }]);
        assert!(contradictory.impossible(&world));
        let mut on = Goal::new();
        on.require(Fact::TvOn { tv });
        assert_eq!(on.display(world.registry()).to_string(), "(and (tv-on bob-bedroom-tv))");
    }
}
