//! Built-in command families
//!
//! Each submodule contributes its words to the [`CommandRegistry`] through a
//! `register` function, the same way a host would add its own family.

use std::cmp::Ordering;

use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::Param;
use crate::runtime::value::Value;

pub mod basic;
pub mod classes;
pub mod closures;
pub mod control;
pub mod data;
pub mod functions;
pub mod modules;
pub mod pattern;
pub mod structs;

/// Register every built-in family
pub fn register_all(registry: &mut CommandRegistry) {
    basic::register(registry);
    data::register(registry);
    functions::register(registry);
    closures::register(registry);
    classes::register(registry);
    structs::register(registry);
    control::register(registry);
    pattern::register(registry);
    modules::register(registry);
}

// ============================================================================
// Shared operand helpers
// ============================================================================

/// Comparison operators accepted by `if`, `while`, `match` and friends
pub const COMPARISON_OPERATORS: &[&str] = &[
    "==", "!=", ">", "<", ">=", "<=", "eq", "ne", "gt", "lt", "ge", "le",
];

pub fn is_comparison(word: &str) -> bool {
    COMPARISON_OPERATORS.contains(&word)
}

/// Equality where a number matches a numeric-looking string. Two strings
/// still compare as text.
pub fn loosely_equal(
    lhs: &Value,
    rhs: &Value,
) -> bool {
    if matches!((lhs, rhs), (Value::Str(_), Value::Str(_))) {
        return lhs == rhs;
    }
    match (lhs.to_int(), rhs.to_int()) {
        (Some(a), Some(b)) => a == b,
        _ => match (lhs.to_float(), rhs.to_float()) {
            (Some(a), Some(b)) => a == b,
            _ => lhs == rhs,
        },
    }
}

/// Evaluate `lhs op rhs`
pub fn compare(
    lhs: &Value,
    op: &str,
    rhs: &Value,
) -> Result<bool, RuntimeError> {
    let ordering = || lhs.compare(rhs);
    let result = match op {
        "==" | "eq" => loosely_equal(lhs, rhs),
        "!=" | "ne" => !loosely_equal(lhs, rhs),
        ">" | "gt" => ordering() == Some(Ordering::Greater),
        "<" | "lt" => ordering() == Some(Ordering::Less),
        ">=" | "ge" => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        "<=" | "le" => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        other => {
            return Err(RuntimeError::Type(format!(
                "Unknown comparison operator '{}'",
                other
            )))
        }
    };
    Ok(result)
}

/// Store `value` in `target`, or print it when there is no target.
pub fn deliver(
    interp: &mut Interpreter,
    target: Option<&Token>,
    value: Value,
) {
    match target {
        Some(target) => interp.state.assign(target, value),
        None => interp.state.emit(value.to_string()),
    }
}

/// Parameter list of a callable header: same-line operands, then an optional
/// `do`.
pub fn header_params(
    cursor: &mut Cursor<'_>,
    interp: &Interpreter,
) -> Vec<Param> {
    let params = cursor
        .line_operands(interp, false)
        .iter()
        .map(|t| Param::parse(t))
        .collect();
    cursor.eat("do");
    params
}

/// A non-negative count operand (`loop 3`, `loop n`)
pub fn count_operand(
    interp: &Interpreter,
    token: &Token,
) -> Result<usize, RuntimeError> {
    let value = interp.state.resolve_strict(token)?;
    match value.to_int() {
        Some(n) if n >= 0 => Ok(n as usize),
        _ => Err(RuntimeError::Type(format!(
            "Count must be a non-negative integer, but got '{}'",
            token.text()
        ))),
    }
}

/// An integer operand (array indices)
pub fn int_operand(
    interp: &Interpreter,
    token: &Token,
) -> Result<i64, RuntimeError> {
    interp.state.resolve_strict(token)?.to_int().ok_or_else(|| {
        RuntimeError::Type(format!("Expected an integer but got '{}'", token.text()))
    })
}

/// A literal key: quoted text loses its quotes, a bound scalar gives its value,
/// anything else is taken as written.
pub fn key_operand(
    interp: &Interpreter,
    token: &Token,
) -> String {
    if token.is_quoted() {
        return token.unquoted();
    }
    match interp.state.scalar(token) {
        Some(value) => value.to_string(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_operators() {
        let three = Value::Int(3);
        let five = Value::Float(5.0);
        assert!(compare(&three, "<", &five).unwrap());
        assert!(compare(&three, "le", &Value::Int(3)).unwrap());
        assert!(compare(&five, "==", &Value::Int(5)).unwrap());
        assert!(compare(&Value::Str("b".into()), ">", &Value::Str("a".into())).unwrap());
        assert!(!compare(&Value::Unset, ">", &three).unwrap());
        assert!(compare(&three, "=~", &five).is_err());
    }

    #[test]
    fn test_equality_coerces_numeric_strings() {
        let text = Value::Str("5".into());
        assert!(compare(&text, "==", &Value::Int(5)).unwrap());
        assert!(compare(&Value::Float(5.0), "eq", &text).unwrap());
        assert!(compare(&text, "!=", &Value::Int(6)).unwrap());
        assert!(!compare(&Value::Str("05".into()), "==", &text).unwrap());
        assert!(!compare(&Value::Str("five".into()), "==", &Value::Int(5)).unwrap());
    }
}
