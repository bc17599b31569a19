//! Token preprocessing
//!
//! Runs between tokenizing and execution: macros are collected and expanded
//! first, then aliases are collected and substituted over the expanded stream.
//! Definitions are stored on the global state so they persist across REPL
//! chunks; problems are reported as error lines and never stop the pipeline.

pub mod aliases;
pub mod macros;

pub use macros::MacroDef;

use tracing::debug;

use crate::frontend::lexer::Token;
use crate::runtime::state::GlobalState;

/// Macro collection, macro expansion, alias collection, alias expansion.
pub fn preprocess(
    tokens: Vec<Token>,
    state: &mut GlobalState,
) -> Vec<Token> {
    let before = tokens.len();
    let tokens = macros::collect(tokens, state);
    let tokens = macros::expand(&tokens, state);
    let tokens = aliases::collect(tokens, state);
    let tokens = aliases::expand(tokens, state);
    debug!(before, after = tokens.len(), "preprocessed token stream");
    tokens
}
