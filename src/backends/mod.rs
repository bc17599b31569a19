//! Execution backends
//!
//! ```text
//! source ──► frontend::prepare ──► Vec<Token>
//!                                      │
//!                                      ▼
//!                              Interpreter::execute ──► GlobalState.output
//! ```
//!
//! `interpreter` holds the dispatch loop and every command family; `dev` holds
//! the interactive REPL built on top of it.

pub mod dev;
pub mod interpreter;

use crate::frontend::lexer::Token;
use crate::runtime::flow::Flow;
use crate::runtime::state::GlobalState;

/// Executor trait - anything that can run a prepared token stream
pub trait Executor {
    /// Execute a token span, returning the control signal that stopped it
    fn execute(
        &mut self,
        tokens: &[Token],
    ) -> Flow;

    /// Tokenize, preprocess and execute source text, returning only the
    /// output lines this call produced
    fn run_source(
        &mut self,
        source: &str,
    ) -> Vec<String>;

    /// Reset the executor state
    fn reset(&mut self);

    /// Get the global state
    fn state(&self) -> &GlobalState;
}
