use enumset::{EnumSet, EnumSetType};

use super::tokens::Span;

/// A name as written in the source, with where it was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Name<'a> {
    pub text: &'a str,
    pub span: Span,
}

#[derive(PartialEq, Debug)]
pub struct Problem<'a> {
    pub name: Name<'a>,
    pub domain: Option<Name<'a>>,
    pub requirements: EnumSet<Requirement>,
    pub objects: Vec<TypedList<'a>>,
    pub init: Vec<Literal<'a>>,
    pub goal: Option<Expr<'a>>,
}

/// `:requirements` flags. Recorded so they survive a rewrite, never enforced.
#[derive(EnumSetType, Debug)]
pub enum Requirement {
    Strips,
    Typing,
    NegativePreconditions,
    DisjunctivePreconditions,
    Equality,
    ExistentialPreconditions,
    UniversalPreconditions,
    QuantifiedPreconditions,
    ConditionalEffects,
    Fluents,
    Adl,
    DurativeActions,
    DerivedPredicates,
    TimedInitialLiterals,
    Preferences,
    Constraints,
    ActionCosts,
}

impl Requirement {
    pub fn name(self) -> &'static str {
        match self {
            Requirement::Strips => "strips",
            Requirement::Typing => "typing",
            Requirement::NegativePreconditions => "negative-preconditions",
            Requirement::DisjunctivePreconditions => "disjunctive-preconditions",
            Requirement::Equality => "equality",
            Requirement::ExistentialPreconditions => "existential-preconditions",
            Requirement::UniversalPreconditions => "universal-preconditions",
            Requirement::QuantifiedPreconditions => "quantified-preconditions",
            Requirement::ConditionalEffects => "conditional-effects",
            Requirement::Fluents => "fluents",
            Requirement::Adl => "adl",
            Requirement::DurativeActions => "durative-actions",
            Requirement::DerivedPredicates => "derived-predicates",
            Requirement::TimedInitialLiterals => "timed-initial-literals",
            Requirement::Preferences => "preferences",
            Requirement::Constraints => "constraints",
            Requirement::ActionCosts => "action-costs",
        }
    }

    pub fn from_name(name: &str) -> Option<Requirement> {
        EnumSet::<Requirement>::all().iter().find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

#[derive(PartialEq, Debug)]
pub enum Expr<'a> {
    And(Vec<Expr<'a>>),
    Not(Box<Expr<'a>>),
    Literal(Literal<'a>),
}

/// `(name arg ...)`, a ground fact or a ground action call.
#[derive(PartialEq, Debug)]
pub struct Literal<'a> {
    pub name: Name<'a>,
    pub arguments: Vec<Name<'a>>,
}

#[derive(PartialEq, Debug)]
pub struct TypedList<'a> {
    pub identifiers: Vec<Name<'a>>,
    pub kind: Name<'a>,
}
