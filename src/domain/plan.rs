use std::fmt;

use thiserror::Error;

use super::action::{Action, IllegalAction};
use crate::world::{Registry, State};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {step}: {source}")]
pub struct StepFailed {
    /// 1-based position of the failing action.
    pub step: usize,
    #[source]
    pub source: IllegalAction,
}

/// Ordered list of ground actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Action>,
}

impl Plan {
    pub fn new(steps: Vec<Action>) -> Self {
        Plan { steps }
    }

    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, action: Action) {
        self.steps.push(action);
    }

    /// Applies every step in order, stopping at the first one that does not apply.
    pub fn replay(&self, initial: &State) -> Result<State, StepFailed> {
        let mut state = initial.clone();
        for (i, action) in self.steps.iter().enumerate() {
            state = action.apply(&state).map_err(|source| StepFailed { step: i + 1, source })?;
        }
        Ok(state)
    }

    pub fn display<'a>(&'a self, registry: &'a Registry) -> PlanDisplay<'a> {
        PlanDisplay { plan: self, registry }
    }
}

impl FromIterator<Action> for Plan {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Plan::new(iter.into_iter().collect())
    }
}

/// One action per line, the plan-file layout.
pub struct PlanDisplay<'a> {
    plan: &'a Plan,
    registry: &'a Registry,
}

impl fmt::Display for PlanDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in self.plan.steps() {
            writeln!(f, "{}", action.display(self.registry))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::Reason;
    use crate::world::state::tests::{bedroom_world, id, initial};
    use crate::world::Fact;

    #[test]
    fn test_replay_reports_failing_step() {
        let world = bedroom_world();
        let state = initial(&world);
        let book = id(&world, "book-a");
        let pen = id(&world, "red-pen");
        let table = id(&world, "bob-bedroom-table");
        let plan: Plan = vec![
            Action::PickUp { item: pen },
            Action::PutOnTable { item: pen, table },
            Action::PutOnTable { item: book, table },
        ]
        .into_iter()
        .collect();
        let err = plan.replay(&state).unwrap_err();
        assert_eq!(err.step, 3);
        assert!(matches!(err.source.reason, Reason::MissingFact(_)));

        let ok = Plan::new(plan.steps()[..2].to_vec());
        let end = ok.replay(&state).unwrap();
        assert!(end.holds(&Fact::TableContains { table, item: pen }));
        assert_eq!(
            ok.display(world.registry()).to_string(),
            "(pick-up red-pen)\n(put-on-table red-pen bob-bedroom-table)\n"
        );
    }
}
