//! REPL Module
//!
//! This module contains:
//! - [`engine::Evaluator`] - buffers input until every block is closed, then runs it
//! - [`line::LineREPL`] - Line-based REPL with rustyline
//! - [`commands::CommandHandler`] - `:`-prefixed command processor

pub mod commands;
pub mod engine;
pub mod line;

pub use commands::{CommandHandler, CommandResult};
pub use engine::{EvalResult, Evaluator};
pub use line::{LineREPL, REPLCompleter};
