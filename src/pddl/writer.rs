use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::compiler::Problem;
use crate::goal::Goal;
use crate::world::Registry;

/// Serialises `problem` in the generator's layout: objects in declaration
/// order, then static facts, then fluents.
pub fn write_problem(problem: &Problem) -> String {
    ProblemDisplay { problem }.to_string()
}

pub struct ProblemDisplay<'a> {
    pub problem: &'a Problem,
}

impl fmt::Display for ProblemDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let problem = self.problem;
        let registry = problem.state.registry();
        writeln!(f, "(define (problem {})", problem.name)?;
        if let Some(domain) = &problem.domain {
            writeln!(f, "\t(:domain {})", domain)?;
        }
        if !problem.requirements.is_empty() {
            write!(f, "\t(:requirements")?;
            for requirement in problem.requirements {
                write!(f, " :{}", requirement.name())?;
            }
            writeln!(f, ")")?;
        }
        writeln!(f, "\t(:objects")?;
        for (_, entity) in registry.iter() {
            writeln!(f, "\t\t{} - {}", entity.name, entity.kind)?;
        }
        writeln!(f, "\t)\n\t(:init")?;
        for fact in problem.state.facts() {
            writeln!(f, "\t\t{}", fact.display(registry))?;
        }
        writeln!(f, "\t)")?;
        if let Some(goal) = &problem.goal {
            write_goal(f, goal, registry)?;
        }
        writeln!(f, ")")
    }
}

fn write_goal(f: &mut fmt::Formatter<'_>, goal: &Goal, registry: &Registry) -> fmt::Result {
    writeln!(f, "\t(:goal (and")?;
    for fact in goal.positive() {
        writeln!(f, "\t\t{}", fact.display(registry))?;
    }
    for fact in goal.negative() {
        writeln!(f, "\t\t(not {})", fact.display(registry))?;
    }
    writeln!(f, "\t))")
}

pub(super) fn persist(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
