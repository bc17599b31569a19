//! Macro preprocessor
//!
//! ```text
//! macro twice v do
//!     print $v
//!     print $v
//! end
//! inline twice "hi"
//! ```
//!
//! Call-site arguments are the tokens on the `inline` line after the macro name.
//! A parameter written `when:FLAG` is a guard: the call site expands only if the
//! variable `FLAG` is truthy when preprocessing runs.

use std::rc::Rc;

use tracing::debug;

use crate::frontend::blocks::{resolve, OpenerSet};
use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::state::GlobalState;

/// Guard parameter prefix
pub const GUARD_PREFIX: &str = "when:";

/// A collected macro
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub guard: Option<String>,
    pub body: Vec<Token>,
}

/// Remove `macro ... end` definitions from the stream and register them.
pub fn collect(
    tokens: Vec<Token>,
    state: &mut GlobalState,
) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] != "macro" {
            output.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let Some(name) = tokens.get(i + 1) else {
            state.report(&RuntimeError::usage(
                "macro",
                "macro <name> [params...] do ... end",
            ));
            i += 1;
            continue;
        };

        let mut params = Vec::new();
        let mut guard = None;
        let mut cursor = i + 2;
        let mut has_do = false;
        while let Some(token) = tokens.get(cursor) {
            cursor += 1;
            if *token == "do" {
                has_do = true;
                break;
            }
            if *token == "end" {
                break;
            }
            match token.strip_prefix(GUARD_PREFIX) {
                Some(flag) => guard = Some(flag.to_string()),
                None => params.push(token.to_string()),
            }
        }

        if !has_do {
            let message = if cursor >= tokens.len() && tokens.last().is_some_and(|t| *t != "end") {
                format!("Macro '{}' definition is not terminated with 'end'.", name)
            } else {
                format!("Macro '{}' is missing a 'do' keyword before its body.", name)
            };
            state.report(&RuntimeError::message(message));
            i = cursor;
            continue;
        }

        let block = resolve(&tokens, cursor, &OpenerSet::BLOCK);
        if !block.terminated {
            state.report(&RuntimeError::UnterminatedBlock(format!("macro {}", name)));
            break;
        }
        debug!(name = name.text(), params = params.len(), "macro defined");
        state.macros.insert(
            name.to_string(),
            Rc::new(MacroDef {
                name: name.to_string(),
                params,
                guard,
                body: block.body(&tokens).to_vec(),
            }),
        );
        i = block.next();
    }
    output
}

/// Replace every `inline` call site with its substituted, recursively expanded
/// body.
pub fn expand(
    tokens: &[Token],
    state: &mut GlobalState,
) -> Vec<Token> {
    let mut stack = Vec::new();
    expand_with(tokens, state, &mut stack)
}

fn expand_with(
    tokens: &[Token],
    state: &mut GlobalState,
    stack: &mut Vec<String>,
) -> Vec<Token> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] != "inline" {
            result.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let Some(name) = tokens.get(i + 1) else {
            state.report(&RuntimeError::usage("inline", "inline <macro> [args...]"));
            i += 1;
            continue;
        };
        let Some(def) = state.macros.get(name.text()).cloned() else {
            state.report(&RuntimeError::UndefinedMacro(name.to_string()));
            i += 2;
            continue;
        };

        let line = tokens[i].line();
        let available = tokens[i + 2..]
            .iter()
            .take_while(|t| t.line() == line)
            .count();
        let expected = def.params.len();
        if available < expected {
            state.report(&RuntimeError::MacroArity {
                name: def.name.clone(),
                expected,
                got: available,
            });
            i += 2 + available;
            continue;
        }
        let args = &tokens[i + 2..i + 2 + expected];
        i += 2 + expected;

        if stack.iter().any(|entry| entry == &def.name) {
            let mut path = stack.clone();
            path.push(def.name.clone());
            state.report(&RuntimeError::MacroCycle(path.join(" -> ")));
            continue;
        }
        if let Some(flag) = &def.guard {
            if !state.flag(flag) {
                debug!(name = %def.name, flag = %flag, "macro guard is off");
                continue;
            }
        }

        let body = substitute(&def, args);
        stack.push(def.name.clone());
        let expanded = expand_with(&body, state, stack);
        stack.pop();
        result.extend(expanded);
    }
    result
}

/// Replace `$param` tokens; arguments take the line of the token they replace so
/// nested call sites still see their arguments on their own line.
fn substitute(
    def: &MacroDef,
    args: &[Token],
) -> Vec<Token> {
    def.body
        .iter()
        .map(|token| {
            token
                .strip_prefix('$')
                .and_then(|name| def.params.iter().position(|p| p == name))
                .map_or_else(|| token.clone(), |index| args[index].relocated(token.line()))
        })
        .collect()
}
