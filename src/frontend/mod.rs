//! Frontend pipeline
//!
//! Source text becomes an executable token stream in two steps: the lexer splits
//! it into tokens, then the preprocessor expands macros and aliases against the
//! global state. There is no parse tree; blocks are found on demand by
//! [`blocks::resolve`] while executing.

use tracing::debug;

use crate::runtime::state::GlobalState;

pub mod blocks;
pub mod lexer;
pub mod preprocess;

pub use lexer::{tokenize, LexError, Token};

/// Tokenize and preprocess `source`. Macro and alias definitions are stored on
/// `state`; preprocessing problems are reported to its output.
pub fn prepare(
    source: &str,
    state: &mut GlobalState,
) -> Result<Vec<Token>, LexError> {
    debug!("Preparing source ({} bytes)", source.len());
    let tokens = lexer::tokenize(source)?;
    debug!("Tokenized into {} tokens", tokens.len());
    Ok(preprocess::preprocess(tokens, state))
}
