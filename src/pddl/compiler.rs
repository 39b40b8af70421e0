use std::collections::BTreeSet;
use std::sync::Arc;

use enumset::EnumSet;
use thiserror::Error;

use super::ast::{self, Expr, Literal, Name, Requirement, TypedList};
use super::tokens::Span;
use super::{ParseError, Parser, Position};
use crate::domain::{Action, ActionKind, Plan};
use crate::goal::Goal;
use crate::world::{EntityId, Fact, InvariantViolation, Kind, Predicate, Registry, State, World};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// A loaded problem file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub domain: Option<String>,
    pub requirements: EnumSet<Requirement>,
    pub state: State,
    pub goal: Option<Goal>,
}

impl Problem {
    /// A problem in the generator's naming with no goal.
    pub fn from_state(name: &str, state: State) -> Self {
        Problem {
            name: name.to_owned(),
            domain: Some(String::from("simulation")),
            requirements: EnumSet::empty(),
            state,
            goal: None,
        }
    }
}

fn error(span: Span, message: impl Into<String>) -> ParseError {
    ParseError::new(Position::Span(span), message)
}

fn first_span(expr: &Expr) -> Option<Span> {
    match expr {
        Expr::And(group) => group.iter().find_map(first_span),
        Expr::Not(inner) => first_span(inner),
        Expr::Literal(literal) => Some(literal.name.span),
    }
}

fn arguments(registry: &Registry, names: &[Name]) -> Result<Vec<EntityId>, ParseError> {
    names
        .iter()
        .map(|name| registry.lookup(name.text).ok_or_else(|| error(name.span, format!("Undeclared object '{}'.", name.text))))
        .collect()
}

/// Turns a parsed problem into a checked state.
pub(super) struct Compiler<'w> {
    base: Option<&'w Arc<World>>,
}

impl<'w> Compiler<'w> {
    pub fn new(base: Option<&'w Arc<World>>) -> Self {
        Compiler { base }
    }

    pub fn compile(&self, problem: &ast::Problem) -> Result<Problem, CompileError> {
        let registry = self.build_registry(problem)?;
        let mut statics = BTreeSet::new();
        let mut fluents = BTreeSet::new();
        for literal in &problem.init {
            let fact = self.fact(&registry, literal)?;
            if fact.is_static() {
                statics.insert(fact);
            } else {
                fluents.insert(fact);
            }
        }
        let goal = match &problem.goal {
            Some(expr) => {
                let mut goal = Goal::new();
                self.goal(&registry, expr, &mut goal, false, problem.name.span)?;
                Some(goal)
            }
            None => None,
        };
        let world = World::new(registry, statics)?;
        let world = match self.base {
            Some(base) if **base == world => Arc::clone(base),
            _ => Arc::new(world),
        };
        let state = State::new(world, fluents)?;
        Ok(Problem {
            name: problem.name.text.to_owned(),
            domain: problem.domain.map(|d| d.text.to_owned()),
            requirements: problem.requirements,
            state,
            goal,
        })
    }

    fn build_registry(&self, problem: &ast::Problem) -> Result<Registry, ParseError> {
        let mut registry = Registry::new();
        for TypedList { identifiers, kind } in &problem.objects {
            let k = Kind::from_name(kind.text).ok_or_else(|| error(kind.span, format!("Unknown type '{}'.", kind.text)))?;
            for name in identifiers {
                registry.declare(name.text, k).map_err(|e| {
                    error(name.span, format!("Object '{}' is already declared as {}.", e.name, e.previous))
                })?;
            }
        }
        match self.base {
            Some(base) => {
                self.match_base(&problem.objects, &registry, base.registry(), problem.name.span)?;
                Ok(base.registry().clone())
            }
            None => Ok(registry),
        }
    }

    /// Same names with the same kinds, so ids line up with the base world.
    fn match_base(
        &self,
        objects: &[TypedList],
        registry: &Registry,
        base: &Registry,
        problem: Span,
    ) -> Result<(), ParseError> {
        for name in objects.iter().flat_map(|list| list.identifiers.iter()) {
            let kind = registry.lookup(name.text).map(|id| registry.kind(id));
            match (base.lookup(name.text).map(|id| base.kind(id)), kind) {
                (None, _) => {
                    return Err(error(name.span, format!("Object '{}' is not declared in the initial problem.", name.text)))
                }
                (Some(expected), Some(found)) if expected != found => {
                    return Err(error(
                        name.span,
                        format!("Object '{}' is a {} in the initial problem, not a {}.", name.text, expected, found),
                    ))
                }
                _ => {}
            }
        }
        if let Some((_, missing)) = base.iter().find(|(_, e)| registry.lookup(&e.name).is_none()) {
            return Err(error(problem, format!("Object '{}' of the initial problem is not declared.", missing.name)));
        }
        Ok(())
    }

    fn fact(&self, registry: &Registry, literal: &Literal) -> Result<Fact, ParseError> {
        let name = literal.name;
        let predicate = Predicate::from_name(name.text)
            .ok_or_else(|| error(name.span, format!("Unknown predicate '{}'.", name.text)))?;
        let args = arguments(registry, &literal.arguments)?;
        Fact::new(predicate, &args, registry).map_err(|e| error(name.span, format!("{}.", e)))
    }

    fn goal(&self, registry: &Registry, expr: &Expr, goal: &mut Goal, negated: bool, problem: Span) -> Result<(), ParseError> {
        match expr {
            Expr::Literal(literal) => {
                let fact = self.fact(registry, literal)?;
                if negated {
                    goal.forbid(fact);
                } else {
                    goal.require(fact);
                }
            }
            Expr::And(group) if !negated => {
                for e in group {
                    self.goal(registry, e, goal, false, problem)?;
                }
            }
            Expr::Not(inner) if !negated => self.goal(registry, inner, goal, true, problem)?,
            _ => {
                let span = first_span(expr).unwrap_or(problem);
                return Err(error(span, "Only single facts can be negated in a goal."));
            }
        }
        Ok(())
    }
}

/// Grounds parsed action calls against `world`.
pub fn compile_plan(steps: &[Literal], world: &World) -> Result<Plan, ParseError> {
    let registry = world.registry();
    steps
        .iter()
        .map(|literal| {
            let name = literal.name;
            let kind = ActionKind::from_name(name.text)
                .ok_or_else(|| error(name.span, format!("Unknown action '{}'.", name.text)))?;
            let args = arguments(registry, &literal.arguments)?;
            Action::ground(kind, &args, world).map_err(|e| error(name.span, format!("{}.", e)))
        })
        .collect()
}

impl Plan {
    /// Plan-file text: one `(action arg ...)` per step, `;` comments allowed.
    pub fn parse(text: &str, world: &World) -> Result<Plan, ParseError> {
        let steps = Parser::new(text).plan()?;
        compile_plan(&steps, world)
    }
}

impl Action {
    /// A single call such as `(put-on-shelf red-pen bob-bedroom-shelf level-2)`.
    pub fn parse(text: &str, world: &World) -> Result<Action, ParseError> {
        let plan = Plan::parse(text, world)?;
        match plan.steps() {
            [action] => Ok(*action),
            steps => Err(ParseError::new(
                Position::Span(Span::new(1, 1, text.len())),
                format!("Expected exactly one action, found {}.", steps.len()),
            )),
        }
    }
}
