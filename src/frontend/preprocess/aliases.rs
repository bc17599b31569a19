//! Alias preprocessor
//!
//! `alias short target` makes every later (and earlier) occurrence of `short` read
//! as `target`. Aliases may point at other aliases; the chain is followed until a
//! name repeats.

use indexmap::IndexSet;

use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::state::GlobalState;

/// Register `alias a b` triples and drop them from the stream.
pub fn collect(
    tokens: Vec<Token>,
    state: &mut GlobalState,
) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        if token != "alias" {
            output.push(token);
            continue;
        }
        match (iter.next(), iter.next()) {
            (Some(short), Some(target)) => {
                state.aliases.insert(short.to_string(), target.to_string());
            }
            _ => state.report(&RuntimeError::usage("alias", "alias <name> <command>")),
        }
    }
    output
}

/// Substitute registered aliases.
pub fn expand(
    tokens: Vec<Token>,
    state: &GlobalState,
) -> Vec<Token> {
    if state.aliases.is_empty() {
        return tokens;
    }
    tokens
        .into_iter()
        .map(|token| match resolve_alias(token.text(), state) {
            Some(target) => Token::new(target, token.line()),
            None => token,
        })
        .collect()
}

/// Follow an alias chain; `None` if `name` is not an alias.
fn resolve_alias(
    name: &str,
    state: &GlobalState,
) -> Option<String> {
    let mut seen = IndexSet::new();
    let mut current = name;
    while let Some(next) = state.aliases.get(current) {
        if !seen.insert(current) {
            break;
        }
        current = next;
    }
    (current != name).then(|| current.to_string())
}
