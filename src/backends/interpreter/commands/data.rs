//! Strings, arrays, mappings and the value-level helpers around them

use std::rc::Rc;

use indexmap::IndexMap;

use super::{count_operand, deliver, int_operand, key_operand};
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::frames::CallFrame;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::OpenerSet;
use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::{CommandResult, Flow};
use crate::runtime::value::{new_array, new_map, ArrayRef, MapRef, Value};

pub fn register(registry: &mut CommandRegistry) {
    registry.register("str_create", str_create);
    registry.register("str_concat", str_concat);
    registry.register("str_length", str_length);

    registry.register("array_create", array_create);
    registry.register("array_push", array_push);
    registry.register("array_get", array_get);
    registry.register("array_set", array_set);
    registry.register("array_pop", array_pop);
    registry.register("array_len", array_len);
    registry.register("foreach", foreach);

    registry.register("dict_create", dict_create);
    registry.register("dict_set", dict_set);
    registry.register("dict_get", dict_get);
    registry.register("dict_keys", dict_keys);

    registry.register("is", identity);
    registry.register("is_not", identity);
    registry.register("in", membership);
    registry.register("pack", pack);
    registry.register("unpack", unpack);
}

fn array_of(
    interp: &Interpreter,
    name: &Token,
) -> Result<ArrayRef, RuntimeError> {
    interp
        .state
        .arrays
        .get(name.text())
        .map(Rc::clone)
        .ok_or_else(|| RuntimeError::UndefinedArray(name.to_string()))
}

fn map_of(
    interp: &Interpreter,
    name: &Token,
) -> Result<MapRef, RuntimeError> {
    interp
        .state
        .maps
        .get(name.text())
        .map(Rc::clone)
        .ok_or_else(|| RuntimeError::UndefinedMap(name.to_string()))
}

/// Position of `index` in an array of `len` items; negative indices count
/// from the end.
fn slot(
    array: &Token,
    index: i64,
    len: usize,
) -> Result<usize, RuntimeError> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::IndexOutOfRange {
            array: array.to_string(),
            index,
        });
    }
    Ok(resolved as usize)
}

// ============================================================================
// Strings
// ============================================================================

/// `str_create name "text"`
fn str_create(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "str_create <name> \"text\"";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let text = interp.state.resolve(value).to_string();
    interp.state.assign(name, Value::Str(text));
    Ok(cursor.step())
}

/// `str_concat name operand`
fn str_concat(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "str_concat <name> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let suffix = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?
        .to_string();
    match interp.state.strings.get_mut(name.text()) {
        Some(text) => text.push_str(&suffix),
        None => return Err(cursor.fail(RuntimeError::UndefinedVariable(name.to_string()))),
    }
    Ok(cursor.step())
}

/// `str_length name [target]`
fn str_length(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "str_length <name> [target]")?;
    let target = cursor.target(interp);
    let length = match interp.state.strings.get(name.text()) {
        Some(text) => text.chars().count() as i64,
        None => return Err(cursor.fail(RuntimeError::UndefinedVariable(name.to_string()))),
    };
    deliver(interp, target, Value::Int(length));
    Ok(cursor.step())
}

// ============================================================================
// Arrays
// ============================================================================

/// `array_create name [size]`
fn array_create(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "array_create <name> [size]")?;
    let size = match cursor.line_operands(interp, false).first() {
        Some(token) => count_operand(interp, token).map_err(|e| cursor.fail(e))?,
        None => 0,
    };
    interp
        .state
        .arrays
        .insert(name.to_string(), new_array(vec![Value::Int(0); size]));
    Ok(cursor.step())
}

/// `array_push name value`
fn array_push(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "array_push <name> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let array = array_of(interp, name).map_err(|e| cursor.fail(e))?;
    let value = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?;
    array.borrow_mut().push(value);
    Ok(cursor.step())
}

/// `array_get name index [target]`
fn array_get(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "array_get <name> <index> [target]";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let position = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.target(interp);
    let value = (|| -> Result<_, RuntimeError> {
        let array = array_of(interp, name)?;
        let items = array.borrow();
        let at = slot(name, int_operand(interp, position)?, items.len())?;
        Ok(items[at].clone())
    })()
    .map_err(|e| cursor.fail(e))?;
    deliver(interp, target, value);
    Ok(cursor.step())
}

/// `array_set name index value`
fn array_set(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "array_set <name> <index> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let position = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    (|| -> Result<_, RuntimeError> {
        let array = array_of(interp, name)?;
        let value = interp.state.resolve_strict(value)?;
        let position = int_operand(interp, position)?;
        let mut items = array.borrow_mut();
        let at = slot(name, position, items.len())?;
        items[at] = value;
        Ok(())
    })()
    .map_err(|e| cursor.fail(e))?;
    Ok(cursor.step())
}

/// `array_pop name [target]`
fn array_pop(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "array_pop <name> [target]")?;
    let target = cursor.target(interp);
    let value = (|| -> Result<_, RuntimeError> {
        let array = array_of(interp, name)?;
        let popped = array.borrow_mut().pop();
        popped.ok_or_else(|| RuntimeError::Type(format!("Cannot pop from empty array '{}'.", name)))
    })()
    .map_err(|e| cursor.fail(e))?;
    deliver(interp, target, value);
    Ok(cursor.step())
}

/// `array_len name [target]`
fn array_len(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "array_len <name> [target]")?;
    let target = cursor.target(interp);
    let len = array_of(interp, name).map_err(|e| cursor.fail(e))?.borrow().len();
    deliver(interp, target, Value::Int(len as i64));
    Ok(cursor.step())
}

/// `foreach array item [do] ... end`
///
/// Iterates over a snapshot of the array taken before the first iteration.
/// The item name is shadowed for the loop and restored afterwards.
fn foreach(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "foreach <array> <item> [do] ... end";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let item = cursor.expect_operand(interp, USAGE)?;
    cursor.eat("do");
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let body = cursor.body(&block);

    let items: Vec<Value> = array_of(interp, name)
        .map_err(|e| cursor.fail(e))?
        .borrow()
        .clone();
    let mut frame = CallFrame::shadow(interp, "foreach");
    let mut result = Flow::Normal;
    for value in items {
        frame.bind(item, value);
        match frame.execute(body) {
            Flow::Break => break,
            Flow::Normal | Flow::Continue => {}
            flow @ Flow::Return(_) => {
                result = flow;
                break;
            }
        }
    }
    Ok(cursor.step_with(result))
}

// ============================================================================
// Mappings
// ============================================================================

/// `dict_create name`
fn dict_create(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "dict_create <name>")?;
    interp
        .state
        .maps
        .insert(name.to_string(), new_map(IndexMap::new()));
    Ok(cursor.step())
}

/// `dict_set name key value`
fn dict_set(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "dict_set <name> <key> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let key = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let map = map_of(interp, name).map_err(|e| cursor.fail(e))?;
    let value = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?;
    map.borrow_mut().insert(key_operand(interp, key), value);
    Ok(cursor.step())
}

/// `dict_get name key [target]`
fn dict_get(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "dict_get <name> <key> [target]";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let key = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.target(interp);
    let key = key_operand(interp, key);
    let value = (|| -> Result<_, RuntimeError> {
        let map = map_of(interp, name)?;
        let entries = map.borrow();
        entries
            .get(&key)
            .cloned()
            .ok_or_else(|| RuntimeError::MissingKey {
                map: name.to_string(),
                key: key.clone(),
            })
    })()
    .map_err(|e| cursor.fail(e))?;
    deliver(interp, target, value);
    Ok(cursor.step())
}

/// `dict_keys name [target]`: the keys as an array, in insertion order.
fn dict_keys(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "dict_keys <name> [target]")?;
    let target = cursor.target(interp);
    let keys: Vec<Value> = map_of(interp, name)
        .map_err(|e| cursor.fail(e))?
        .borrow()
        .keys()
        .map(|k| Value::Str(k.clone()))
        .collect();
    deliver(interp, target, Value::Array(new_array(keys)));
    Ok(cursor.step())
}

// ============================================================================
// Identity, membership, packing
// ============================================================================

/// `is a b target` / `is_not a b target`
fn identity(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let negate = cursor.command().text() == "is_not";
    let usage = if negate {
        "is_not <a> <b> <target>"
    } else {
        "is <a> <b> <target>"
    };
    let lhs = cursor.expect_operand(interp, usage)?;
    let rhs = cursor.expect_operand(interp, usage)?;
    let target = cursor.expect_operand(interp, usage)?;
    let same = (|| -> Result<_, RuntimeError> {
        let lhs = interp.state.resolve_strict(lhs)?;
        let rhs = interp.state.resolve_strict(rhs)?;
        Ok(lhs.same_identity(&rhs))
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, Value::from(same != negate));
    Ok(cursor.step())
}

/// `in value container target`: element of an array, key of a mapping, or
/// substring of a string.
fn membership(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "in <value> <container> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let needle = cursor.expect_operand(interp, USAGE)?;
    let container = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let found = (|| -> Result<_, RuntimeError> {
        let needle = interp.state.resolve_strict(needle)?;
        let found = match interp.state.resolve_strict(container)? {
            Value::Array(items) => items.borrow().contains(&needle),
            Value::Map(entries) => entries.borrow().contains_key(&needle.to_string()),
            Value::Str(text) => text.contains(&needle.to_string()),
            other => {
                return Err(RuntimeError::Type(format!(
                    "Cannot test membership in a {}",
                    other.value_type()
                )))
            }
        };
        Ok(found)
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, Value::from(found));
    Ok(cursor.step())
}

/// `pack name v...`
fn pack(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "pack <name> <values...>")?;
    let items = cursor
        .line_operands(interp, false)
        .iter()
        .map(|t| interp.state.resolve_strict(t))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| cursor.fail(e))?;
    interp
        .state
        .arrays
        .insert(name.to_string(), new_array(items));
    Ok(cursor.step())
}

/// `unpack name v1 v2...`
fn unpack(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "unpack <array> <names...>")?;
    let targets = cursor.line_operands(interp, false);
    let items = array_of(interp, name)
        .map_err(|e| cursor.fail(e))?
        .borrow()
        .clone();
    if items.len() != targets.len() {
        return Err(cursor.fail(RuntimeError::Type(format!(
            "Cannot unpack {} values into {} variables.",
            items.len(),
            targets.len()
        ))));
    }
    for (target, value) in targets.iter().zip(items) {
        interp.state.assign(target, value);
    }
    Ok(cursor.step())
}
