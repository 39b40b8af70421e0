//! Reading and writing the household problem files and plan files.

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod tokens;
pub mod writer;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::Plan;
use crate::world::{InvariantViolation, World};
pub use compiler::{CompileError, Problem};
pub use parser::Parser;
use tokens::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Span(Span),
    Eof,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Span(span) => write!(f, "line:{} col:{}", span.line, span.col),
            Position::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{pos} {message}")]
pub struct ParseError {
    pub pos: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        ParseError { pos, message: message.into() }
    }

    /// The offending source line with a caret under the error column.
    pub fn render(&self, source: &str, path: &str) -> String {
        let span = match self.pos {
            Position::Span(span) => span,
            Position::Eof => return format!("{}: Error at end of file: {}\n", path, self.message),
        };
        match source.lines().nth(span.line.saturating_sub(1)) {
            Some(line) => {
                let number = span.line.to_string();
                let width = number.len() + 2 + span.col;
                format!(
                    "{}:{} Error:\n\t{}: {}\n\t{:->width$} {}\n",
                    path,
                    span.line,
                    number,
                    line,
                    '^',
                    self.message,
                    width = width
                )
            }
            None => format!("{}:{} Error: {}\n", path, span.line, self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{rendered}")]
    Parse {
        rendered: String,
        #[source]
        error: ParseError,
    },
    #[error("{path}: {violation}")]
    Invariant {
        path: String,
        #[source]
        violation: InvariantViolation,
    },
}

impl LoadError {
    fn io(path: &Path, source: io::Error) -> Self {
        LoadError::Io { path: path.to_owned(), source }
    }

    fn compile(error: CompileError, source: &str, path: &Path) -> Self {
        let display = path.display().to_string();
        match error {
            CompileError::Parse(error) => LoadError::Parse { rendered: error.render(source, &display), error },
            CompileError::Invariant(violation) => LoadError::Invariant { path: display, violation },
        }
    }
}

/// Parses and compiles a problem. With `base`, the objects must be exactly
/// those of the base world so the two snapshots share entity ids.
pub fn parse_problem(text: &str, base: Option<&Arc<World>>) -> Result<Problem, CompileError> {
    let ast = Parser::new(text).problem()?;
    compiler::Compiler::new(base).compile(&ast)
}

#[instrument(skip(base))]
pub fn load_problem(path: &Path, base: Option<&Arc<World>>) -> Result<Problem, LoadError> {
    let source = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let problem = parse_problem(&source, base).map_err(|e| LoadError::compile(e, &source, path))?;
    debug!(
        objects = problem.state.registry().len(),
        facts = problem.state.facts().count(),
        "loaded problem"
    );
    Ok(problem)
}

pub fn load_plan(path: &Path, world: &World) -> Result<Plan, LoadError> {
    let source = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    Plan::parse(&source, world).map_err(|e| LoadError::compile(CompileError::Parse(e), &source, path))
}

/// Writes `contents` next to `path` and renames it into place, so readers never
/// see a partial file.
pub fn save(path: &Path, contents: &str) -> Result<(), LoadError> {
    writer::persist(path, contents).map_err(|e| LoadError::io(path, e))
}
