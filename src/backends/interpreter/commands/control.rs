//! Control flow
//!
//! Every construct resolves its block once, runs the relevant part through
//! [`Interpreter::execute`] and turns the returned [`Flow`] into its own
//! result: loops absorb `break`/`continue`, everything else passes signals
//! outwards untouched.

use tracing::debug;

use super::{compare, count_operand, loosely_equal};
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::{split_top_level, OpenerSet, Segment};
use crate::frontend::lexer::{is_identifier, Token};
use crate::runtime::error::{Failure, RuntimeError};
use crate::runtime::flow::{CommandResult, Flow, Step};
use crate::runtime::value::Value;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("loop", repeat);
    registry.register("while", while_loop);
    registry.register("if", if_block);
    registry.register("switch", switch);
    registry.register("try", try_block);
    registry.register("throw", throw);
    registry.register("raise", throw);
    registry.register("break", brk);
    registry.register("continue", cont);
    registry.register("loop_else", loop_else);
    registry.register("while_else", while_else);
}

// ============================================================================
// Loop drivers
// ============================================================================

/// How a loop ended
struct LoopExit {
    /// Left through `break` (or `return`)
    broken: bool,
    /// Signal to pass outwards
    flow: Flow,
}

impl LoopExit {
    fn completed() -> Self {
        Self {
            broken: false,
            flow: Flow::Normal,
        }
    }
}

/// Run one iteration; `Some` ends the loop.
fn iteration(
    interp: &mut Interpreter,
    body: &[Token],
) -> Option<LoopExit> {
    match interp.execute(body) {
        Flow::Normal | Flow::Continue => None,
        Flow::Break => Some(LoopExit {
            broken: true,
            flow: Flow::Normal,
        }),
        flow @ Flow::Return(_) => Some(LoopExit { broken: true, flow }),
    }
}

/// Counted loop, optionally publishing the iteration index as `index_var`.
fn run_counted(
    interp: &mut Interpreter,
    count: usize,
    index_var: Option<&str>,
    body: &[Token],
) -> LoopExit {
    for i in 0..count {
        if let Some(name) = index_var {
            interp.state.assign(name, Value::Int(i as i64));
        }
        if let Some(exit) = iteration(interp, body) {
            return exit;
        }
    }
    LoopExit::completed()
}

/// Condition of a `while` header: the variable is re-read every time, the
/// comparison value is fixed when the loop starts.
struct Condition<'t> {
    var: &'t Token,
    op: &'t Token,
    rhs: Value,
}

impl Condition<'_> {
    fn holds(
        &self,
        interp: &Interpreter,
    ) -> Result<bool, RuntimeError> {
        let lhs = interp.state.resolve_strict(self.var)?;
        compare(&lhs, self.op, &self.rhs)
    }
}

fn run_while(
    interp: &mut Interpreter,
    condition: &Condition<'_>,
    body: &[Token],
) -> Result<LoopExit, RuntimeError> {
    let limit = interp.config.max_loop_iterations;
    let mut iterations = 0usize;
    while condition.holds(interp)? {
        if iterations >= limit {
            return Err(RuntimeError::LoopLimit(limit));
        }
        iterations += 1;
        if let Some(exit) = iteration(interp, body) {
            return Ok(exit);
        }
    }
    debug!(iterations, "while loop finished");
    Ok(LoopExit::completed())
}

/// `var op value` header shared by `while`, `while_else` and `if`
fn condition_header<'t>(
    interp: &Interpreter,
    cursor: &mut Cursor<'t>,
    usage: &'static str,
) -> Result<(&'t Token, &'t Token, &'t Token), Failure> {
    let var = cursor.expect_operand(interp, usage)?;
    let op = cursor.expect_operand(interp, usage)?;
    let value = cursor.expect_operand(interp, usage)?;
    cursor.eat("do");
    Ok((var, op, value))
}

/// Body and `else` segment of a block
fn else_split(body: &[Token]) -> (&[Token], Option<&[Token]>) {
    let segments = split_top_level(body, &["else"], &OpenerSet::BLOCK);
    let main = segments.first().map_or(body, |s| s.tokens);
    let otherwise = segments.get(1).map(|s| s.tokens);
    (main, otherwise)
}

// ============================================================================
// Loops
// ============================================================================

/// `loop count [do] ... end`
fn repeat(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let count = cursor.expect_operand(interp, "loop <count> ... end")?;
    cursor.eat("do");
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let count = count_operand(interp, count).map_err(|e| cursor.fail(e))?;
    let exit = run_counted(interp, count, None, cursor.body(&block));
    Ok(cursor.step_with(exit.flow))
}

/// `while var op value [do] ... end`
fn while_loop(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let (var, op, value) = condition_header(interp, &mut cursor, "while <var> <op> <value> ... end")?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let rhs = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?;
    let condition = Condition { var, op, rhs };
    let exit = run_while(interp, &condition, cursor.body(&block)).map_err(|e| cursor.fail(e))?;
    Ok(cursor.step_with(exit.flow))
}

/// `loop_else count [do] ... else ... end`: the `else` part runs when the
/// loop was not broken. The iteration index is published as `i`.
fn loop_else(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let count = cursor.expect_operand(interp, "loop_else <count> do ... else ... end")?;
    cursor.eat("do");
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let count = count_operand(interp, count).map_err(|e| cursor.fail(e))?;
    let (body, otherwise) = else_split(cursor.body(&block));
    let exit = run_counted(interp, count, Some("i"), body);
    finish_loop_else(interp, &cursor, exit, otherwise)
}

/// `while_else var op value [do] ... else ... end`
fn while_else(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let (var, op, value) = condition_header(
        interp,
        &mut cursor,
        "while_else <var> <op> <value> do ... else ... end",
    )?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let rhs = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?;
    let (body, otherwise) = else_split(cursor.body(&block));
    let condition = Condition { var, op, rhs };
    let exit = run_while(interp, &condition, body).map_err(|e| cursor.fail(e))?;
    finish_loop_else(interp, &cursor, exit, otherwise)
}

fn finish_loop_else(
    interp: &mut Interpreter,
    cursor: &Cursor<'_>,
    exit: LoopExit,
    otherwise: Option<&[Token]>,
) -> CommandResult {
    if exit.broken {
        return Ok(cursor.step_with(exit.flow));
    }
    let flow = match otherwise {
        Some(tokens) => interp.execute(tokens),
        None => Flow::Normal,
    };
    Ok(cursor.step_with(flow))
}

fn brk(
    _: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    Ok(Step::with_flow(0, Flow::Break))
}

fn cont(
    _: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    Ok(Step::with_flow(0, Flow::Continue))
}

// ============================================================================
// Branching
// ============================================================================

/// `if var op value ... [else ...] end`
fn if_block(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let (var, op, value) = condition_header(interp, &mut cursor, "if <var> <op> <value> ... end")?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let holds = (|| -> Result<bool, RuntimeError> {
        let lhs = interp.state.resolve_strict(var)?;
        let rhs = interp.state.resolve_strict(value)?;
        compare(&lhs, op, &rhs)
    })()
    .map_err(|e| cursor.fail(e))?;
    let (then, otherwise) = else_split(cursor.body(&block));
    let flow = match (holds, otherwise) {
        (true, _) => interp.execute(then),
        (false, Some(otherwise)) => interp.execute(otherwise),
        (false, None) => Flow::Normal,
    };
    Ok(cursor.step_with(flow))
}

/// `switch var case <value> ... default ... end`
fn switch(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let subject = cursor.expect_operand(interp, "switch <var> case <value> ... default ... end")?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let subject = interp
        .state
        .resolve_strict(subject)
        .map_err(|e| cursor.fail(e))?;

    let segments = split_top_level(cursor.body(&block), &["case", "default"], &OpenerSet::BLOCK);
    let mut fallback = None;
    let mut chosen = None;
    for segment in &segments {
        match segment.marker.map(Token::text) {
            Some("case") => {
                let Some((value, body)) = segment.tokens.split_first() else {
                    continue;
                };
                if loosely_equal(&interp.state.resolve(value), &subject) {
                    chosen = Some(body);
                    break;
                }
            }
            Some("default") if fallback.is_none() => fallback = Some(segment.tokens),
            _ => {}
        }
    }
    let flow = match chosen.or(fallback) {
        Some(body) => interp.execute(body),
        None => Flow::Normal,
    };
    Ok(cursor.step_with(flow))
}

// ============================================================================
// Errors
// ============================================================================

/// Variable names on the `catch` line
fn catch_bindings<'t>(
    interp: &Interpreter,
    segment: &Segment<'t>,
) -> (Vec<&'t Token>, &'t [Token]) {
    let line = segment.marker.map(Token::line);
    let names = segment
        .tokens
        .iter()
        .take(2)
        .take_while(|t| Some(t.line()) == line && is_identifier(t) && !interp.is_boundary(t))
        .count();
    let (names, body) = segment.tokens.split_at(names);
    (names.iter().collect(), body)
}

/// `try ... catch [errVar [typeVar]] ... end`
///
/// The whole try part runs. If it reported any error, the catch part runs with
/// the last error's message and type bound, and the errors count as handled.
fn try_block(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let segments = split_top_level(cursor.body(&block), &["catch"], &OpenerSet::BLOCK);
    let attempt = segments.first().map_or(&[][..], |s| s.tokens);

    let before = interp.state.error_count;
    let flow = interp.execute(attempt);
    if interp.state.error_count == before {
        return Ok(cursor.step_with(flow));
    }
    let Some(handler) = segments.get(1) else {
        return Ok(cursor.step_with(flow));
    };
    interp.state.error_count = before;
    let (names, body) = catch_bindings(interp, handler);
    if let Some(raised) = interp.state.last_error.clone() {
        debug!(kind = %raised.kind, "caught error");
        let values = [Value::Str(raised.message), Value::Str(raised.kind)];
        for (name, value) in names.into_iter().zip(values) {
            interp.state.assign(name, value);
        }
    }
    // a break or return that ended the try part still applies after catch
    let caught = interp.execute(body);
    let flow = if caught.is_normal() { flow } else { caught };
    Ok(cursor.step_with(flow))
}

/// `throw message [Type]` / `raise Type message`
///
/// A quoted operand is the message and a bare one the exception type; with a
/// single operand it is the message (a variable is resolved).
fn throw(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let operands = cursor.line_operands(interp, false);
    let error = match operands {
        [] => RuntimeError::usage(cursor.command().text(), "throw \"message\" [Type]"),
        [message] => RuntimeError::Thrown {
            message: interp.state.resolve(message).to_string(),
            kind: None,
        },
        [first, second, ..] => {
            let (kind, message) = if first.is_quoted() && !second.is_quoted() {
                (second, first)
            } else {
                (first, second)
            };
            RuntimeError::Thrown {
                message: interp.state.resolve(message).to_string(),
                kind: Some(kind.to_string()),
            }
        }
    };
    Err(cursor.fail(error))
}
