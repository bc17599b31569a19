//! Pattern matching
//!
//! `match_full` arms are blocks of their own:
//!
//! ```text
//! match_full subject
//!     case 1 do ... end             exact value (`_` or `default` match anything)
//!     case_or 1 2 3 do ... end      any of the alternatives
//!     case_list a b *rest do ... end
//!     case_dict name:n age:a do ... end   every key present; a bare key binds nothing
//! end
//! ```
//!
//! `match` is the lighter guard form: `case [op] value` separators inside one
//! block, with `case default` as the fallback.

use tracing::trace;

use super::{compare, is_comparison, loosely_equal};
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::{resolve, split_top_level, OpenerSet};
use crate::frontend::lexer::{is_identifier, unquote, Token};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::{CommandResult, Flow};
use crate::runtime::value::{new_array, Value};

pub fn register(registry: &mut CommandRegistry) {
    registry.register("match_full", match_full);
    registry.register("match", match_guard);
}

const MATCH_FULL_USAGE: &str = "match_full <value> case <pattern> do ... end ... end";
const ARM_WORDS: &[&str] = &["case", "case_or", "case_list", "case_dict"];

/// One `case... do ... end` arm
#[derive(Debug)]
struct Arm<'t> {
    kind: &'t Token,
    patterns: &'t [Token],
    body: &'t [Token],
}

/// Split a `match_full` body into its arms. Tokens between arms are ignored.
fn arms(body: &[Token]) -> Result<Vec<Arm<'_>>, RuntimeError> {
    let mut arms = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let kind = &body[i];
        if !ARM_WORDS.contains(&kind.text()) {
            trace!(token = kind.text(), "skipping token between match arms");
            i += 1;
            continue;
        }
        let header_end = body[i + 1..]
            .iter()
            .position(|t| *t == "do" || t.line() != kind.line())
            .map_or(body.len(), |p| i + 1 + p);
        if body.get(header_end).map_or(true, |t| *t != "do") {
            return Err(RuntimeError::usage("match_full", MATCH_FULL_USAGE));
        }
        let block = resolve(body, header_end + 1, &OpenerSet::BLOCK);
        if !block.terminated {
            return Err(RuntimeError::UnterminatedBlock(kind.to_string()));
        }
        arms.push(Arm {
            kind,
            patterns: &body[i + 1..header_end],
            body: block.body(body),
        });
        i = block.next();
    }
    Ok(arms)
}

fn is_wildcard(token: &Token) -> bool {
    *token == "_" || *token == "default"
}

/// Subject of a `match_full`: an array or mapping by that name, else any value
fn subject_value(
    interp: &Interpreter,
    token: &Token,
) -> Value {
    let state = &interp.state;
    if let Some(items) = state.arrays.get(token.text()) {
        return Value::Array(items.clone());
    }
    if let Some(entries) = state.maps.get(token.text()) {
        return Value::Map(entries.clone());
    }
    state.resolve(token)
}

/// Test one arm; on success returns the names it binds.
fn try_arm(
    interp: &Interpreter,
    arm: &Arm<'_>,
    subject: &Value,
) -> Option<Vec<(String, Value)>> {
    let state = &interp.state;
    match arm.kind.text() {
        "case" => {
            let pattern = arm.patterns.first()?;
            (is_wildcard(pattern) || loosely_equal(&state.resolve(pattern), subject)).then(Vec::new)
        }
        "case_or" => arm
            .patterns
            .iter()
            .any(|p| is_wildcard(p) || loosely_equal(&state.resolve(p), subject))
            .then(Vec::new),
        "case_list" => {
            let Value::Array(items) = subject else {
                return None;
            };
            destructure_list(interp, arm.patterns, &items.borrow())
        }
        "case_dict" => {
            let Value::Map(entries) = subject else {
                return None;
            };
            let entries = entries.borrow();
            let mut bindings = Vec::new();
            for pattern in arm.patterns {
                let (key, var) = match pattern.split_once(':') {
                    Some((key, var)) => (key, Some(var)),
                    None => (pattern.text(), None),
                };
                let value = entries.get(&unquote(key))?;
                if let Some(var) = var {
                    bindings.push((var.to_string(), value.clone()));
                }
            }
            Some(bindings)
        }
        _ => None,
    }
}

/// `a b *rest` against a list. Identifiers capture, `_` skips, anything else
/// must be equal.
fn destructure_list(
    interp: &Interpreter,
    patterns: &[Token],
    items: &[Value],
) -> Option<Vec<(String, Value)>> {
    let rest = patterns
        .last()
        .and_then(|p| p.strip_prefix('*'))
        .filter(|name| !name.is_empty());
    let fixed = if rest.is_some() {
        &patterns[..patterns.len() - 1]
    } else {
        patterns
    };
    let arity_ok = match rest {
        Some(_) => items.len() >= fixed.len(),
        None => items.len() == fixed.len(),
    };
    if !arity_ok {
        return None;
    }
    let mut bindings = Vec::new();
    for (pattern, item) in fixed.iter().zip(items) {
        if *pattern == "_" {
            continue;
        }
        if is_identifier(pattern) {
            bindings.push((pattern.to_string(), item.clone()));
        } else if !loosely_equal(&interp.state.resolve(pattern), item) {
            return None;
        }
    }
    if let Some(name) = rest {
        let tail = items[fixed.len()..].to_vec();
        bindings.push((name.to_string(), Value::Array(new_array(tail))));
    }
    Some(bindings)
}

/// `match_full subject arms... end`
fn match_full(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let subject = cursor.expect_operand(interp, MATCH_FULL_USAGE)?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let arms = arms(cursor.body(&block)).map_err(|e| cursor.fail(e))?;
    let subject = subject_value(interp, subject);

    for arm in &arms {
        if let Some(bindings) = try_arm(interp, arm, &subject) {
            trace!(arm = arm.kind.text(), "match arm selected");
            for (name, value) in bindings {
                interp.state.assign(&name, value);
            }
            let flow = interp.execute(arm.body);
            return Ok(cursor.step_with(flow));
        }
    }
    Ok(cursor.step())
}

/// `match var case [op] value ... case default ... end`
fn match_guard(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let var = cursor.expect_operand(interp, "match <var> case [op] <value> ... end")?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let subject = interp
        .state
        .resolve_strict(var)
        .map_err(|e| cursor.fail(e))?;

    let segments = split_top_level(cursor.body(&block), &["case"], &OpenerSet::BLOCK);
    let mut fallback = None;
    for segment in segments.iter().filter(|s| s.marker.is_some()) {
        let tokens = segment.tokens;
        if let [first, body @ ..] = tokens {
            if *first == "default" {
                fallback = fallback.or(Some(body));
                continue;
            }
        }
        let (op, value, body) = match tokens {
            [op, value, body @ ..] if is_comparison(op) => (op.text(), value, body),
            [value, body @ ..] => ("==", value, body),
            [] => continue,
        };
        let rhs = interp.state.resolve(value);
        if compare(&subject, op, &rhs).map_err(|e| cursor.fail(e))? {
            let flow = interp.execute(body);
            return Ok(cursor.step_with(flow));
        }
    }
    let flow = match fallback {
        Some(body) => interp.execute(body),
        None => Flow::Normal,
    };
    Ok(cursor.step_with(flow))
}
