//! Typed closed-world model of the household: entities, facts, states and the
//! invariants every state has to satisfy.

pub mod entity;
pub mod fact;
pub mod invariant;
pub mod state;

pub use entity::{EntityId, Kind, Registry, Redeclared};
pub use fact::{Fact, FactError, Predicate};
pub use invariant::InvariantViolation;
pub use state::{Delta, State, World};
