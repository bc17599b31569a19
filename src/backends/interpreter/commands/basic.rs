//! Accumulator, stack, printing and scalar arithmetic

use std::time::Duration;

use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::{CommandResult, Step};
use crate::runtime::value::Value;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("boot", boot);
    registry.register("ping", ping);
    registry.register("crash", crash);
    registry.register("reboot", reboot);
    registry.register("hack", hack);
    registry.register("upload", upload);
    registry.register("download", download);
    registry.register("sleep", sleep);
    registry.register("print", print);
    registry.register("set", set);
    for op in ["add", "sub", "mul", "div", "mod"] {
        registry.register(op, arithmetic);
    }
}

// ============================================================================
// Accumulator and stack
// ============================================================================

fn boot(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    interp.state.accumulator = 0;
    Ok(Step::new(0))
}

fn ping(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    interp.state.accumulator = interp.state.accumulator.wrapping_add(1);
    Ok(Step::new(0))
}

fn crash(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    interp.state.accumulator = interp.state.accumulator.wrapping_sub(1);
    Ok(Step::new(0))
}

fn reboot(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    interp.state.accumulator = 0;
    interp.state.value_stack.clear();
    Ok(Step::new(0))
}

fn hack(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    interp.state.accumulator = interp.state.accumulator.wrapping_mul(2);
    Ok(Step::new(0))
}

fn upload(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    let value = interp.state.accumulator;
    interp.state.value_stack.push(value);
    Ok(Step::new(0))
}

fn download(
    interp: &mut Interpreter,
    _: &[Token],
    _: usize,
) -> CommandResult {
    match interp.state.value_stack.pop() {
        Some(value) => {
            interp.state.accumulator = value;
            Ok(Step::new(0))
        }
        None => Err(RuntimeError::message(
            "Cannot download from empty stack. Use 'upload' to add values to the stack first.",
        )
        .into()),
    }
}

/// `sleep <ms>`
fn sleep(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let token = cursor.expect_operand(interp, "sleep <milliseconds>")?;
    let millis = super::count_operand(interp, token).map_err(|e| cursor.fail(e))?;
    std::thread::sleep(Duration::from_millis(millis as u64));
    Ok(cursor.step())
}

// ============================================================================
// Output
// ============================================================================

/// Text `print` shows for an operand
fn display_operand(
    interp: &Interpreter,
    token: &Token,
) -> Result<String, RuntimeError> {
    if token.is_quoted() {
        return Ok(token.unquoted());
    }
    if let Some(record) = interp.state.structs.get(token.text()) {
        if interp.state.lookup(token).is_none() {
            return Ok(record.dump());
        }
    }
    Ok(interp.state.resolve_strict(token)?.to_string())
}

/// `print [operand]`: without an operand prints the accumulator.
fn print(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let operand = cursor.line_operands(interp, false).first();
    let mut cursor = Cursor::new(tokens, index);
    let line = match operand {
        Some(token) => {
            cursor.next();
            display_operand(interp, token).map_err(|e| cursor.fail(e))?
        }
        None => interp.state.accumulator.to_string(),
    };
    interp.state.emit(line);
    Ok(cursor.step())
}

// ============================================================================
// Variables
// ============================================================================

/// `set name value`
fn set(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "set <variable_name> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let value_token = cursor.expect_operand(interp, USAGE)?;
    let value = interp
        .state
        .resolve_strict(value_token)
        .map_err(|e| cursor.fail(e))?;
    interp.state.assign(name, value);
    Ok(cursor.step())
}

/// `add|sub|mul|div|mod name operand`
fn arithmetic(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let op = cursor.command().text();
    let usage = match op {
        "add" => "add <variable_name> <number>",
        "sub" => "sub <variable_name> <number>",
        "mul" => "mul <variable_name> <number>",
        "div" => "div <variable_name> <number>",
        _ => "mod <variable_name> <number>",
    };
    let name = cursor.expect_operand(interp, usage)?;
    let operand = cursor.expect_operand(interp, usage)?;
    let result = (|| -> Result<_, RuntimeError> {
        let current = interp.state.number(name)?;
        let rhs = interp.state.number(operand)?;
        apply(op, &current, &rhs)
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(name, result);
    Ok(cursor.step())
}

/// Integer arithmetic stays integral (division floors); anything involving a
/// float is done in floating point.
pub fn apply(
    op: &str,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, RuntimeError> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let (a, b) = (*a, *b);
        let overflow = || RuntimeError::Type("Integer overflow".to_string());
        return match op {
            "add" => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            "sub" => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            "mul" => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            "div" if b == 0 => Err(RuntimeError::DivisionByZero),
            "div" => floor_div(a, b).map(Value::Int).ok_or_else(overflow),
            "mod" if b == 0 => Err(RuntimeError::DivisionByZero),
            _ => Ok(Value::Int(floor_mod(a, b))),
        };
    }
    let (a, b) = match (lhs.to_float(), rhs.to_float()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(RuntimeError::Type(format!(
                "Cannot apply '{}' to {} and {}",
                op,
                lhs.value_type(),
                rhs.value_type()
            )))
        }
    };
    let value = match op {
        "add" => a + b,
        "sub" => a - b,
        "mul" => a * b,
        "div" | "mod" if b == 0.0 => return Err(RuntimeError::DivisionByZero),
        "div" => a / b,
        _ => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
    };
    Ok(Value::Float(value))
}

/// `None` on overflow (`i64::MIN / -1`)
fn floor_div(
    a: i64,
    b: i64,
) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(
    a: i64,
    b: i64,
) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Vec<String> {
        let mut interp = Interpreter::new();
        interp.run(source);
        interp.take_output()
    }

    #[test]
    fn test_accumulator_commands() {
        assert_eq!(run("boot ping ping hack crash print"), ["3"]);
        assert_eq!(run("ping upload ping ping download print"), ["1"]);
        assert_eq!(
            run("download"),
            ["[Error: Cannot download from empty stack. Use 'upload' to add values to the stack first.]"]
        );
    }

    #[test]
    fn test_print_forms() {
        assert_eq!(run("print \"a\\tb\""), ["a\tb"]);
        assert_eq!(run("set x 2.0\nprint x"), ["2.0"]);
        assert_eq!(run("print 42"), ["42"]);
        assert_eq!(run("print ghost"), ["[Error: Variable 'ghost' is not defined.]"]);
    }

    #[test]
    fn test_print_takes_one_operand() {
        assert_eq!(run("set a 1\nset b 2\nprint a b"), ["1"]);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("set x 7\ndiv x 2\nprint x"), ["3"]);
        assert_eq!(run("set x -7\ndiv x 2\nprint x"), ["-4"]);
        assert_eq!(run("set x -7\nmod x 3\nprint x"), ["2"]);
        assert_eq!(run("set x 1\nadd x 0.5\nprint x"), ["1.5"]);
        assert_eq!(run("set x 3\nset y 4\nmul x y\nprint x"), ["12"]);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            run("set x 1\ndiv x 0\nprint x"),
            ["[Error: Cannot divide by zero]", "1"]
        );
        assert_eq!(run("set x 1\nmod x 0"), ["[Error: Cannot divide by zero]"]);
    }

    #[test]
    fn test_set_usage_error() {
        assert_eq!(
            run("set"),
            ["[Error: Invalid 'set' command. Use: set <variable_name> <value>]"]
        );
    }

    #[test]
    fn test_apply_mixed() {
        assert_eq!(apply("div", &Value::Float(1.0), &Value::Int(4)).unwrap(), Value::Float(0.25));
        assert!(apply("add", &Value::Str("x".into()), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let min = Value::Int(i64::MIN);
        assert!(apply("div", &min, &Value::Int(-1)).is_err());
        assert!(apply("mul", &min, &Value::Int(2)).is_err());
        assert_eq!(apply("div", &Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!(apply("mod", &min, &Value::Int(-1)).unwrap(), Value::Int(0));
    }
}
