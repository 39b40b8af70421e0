//! The fixed household action catalogue and plans built from it.

pub mod action;
pub mod plan;

pub use action::{Action, ActionKind, IllegalAction, Reason};
pub use plan::{Plan, StepFailed};
