//! `struct` records
//!
//! One command word, two shapes: `struct Name fields... end` defines a record
//! type, `struct new|set|get|dump ...` works on instances.

use indexmap::IndexMap;

use super::deliver;
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::OpenerSet;
use crate::frontend::lexer::Token;
use crate::runtime::class::{StructDef, StructInstance};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::CommandResult;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("struct", structure);
}

const DEFINE_USAGE: &str = "struct <Name> <field:type...> end";

fn structure(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let verb = cursor
        .peek()
        .filter(|t| t.line() == cursor.command().line())
        .map(Token::text);
    match verb {
        Some("new") => {
            cursor.next();
            create(interp, &mut cursor)
        }
        Some("set") => {
            cursor.next();
            set(interp, &mut cursor)
        }
        Some("get") => {
            cursor.next();
            get(interp, &mut cursor)
        }
        Some("dump") => {
            cursor.next();
            dump(interp, &mut cursor)
        }
        _ => define(interp, &mut cursor),
    }
}

/// Field list of a definition: `name:type` tokens or `name type` pairs
fn parse_fields(body: &[Token]) -> Result<IndexMap<String, String>, RuntimeError> {
    let mut fields = IndexMap::new();
    let mut tokens = body.iter();
    while let Some(token) = tokens.next() {
        let (name, type_tag) = match token.split_once(':') {
            Some((name, type_tag)) => (name.to_string(), type_tag.to_string()),
            None => {
                let type_tag = tokens
                    .next()
                    .ok_or_else(|| RuntimeError::usage("struct", DEFINE_USAGE))?;
                (token.to_string(), type_tag.to_string())
            }
        };
        fields.insert(name, type_tag);
    }
    Ok(fields)
}

fn define(
    interp: &mut Interpreter,
    cursor: &mut Cursor<'_>,
) -> CommandResult {
    let name = cursor.expect_operand(interp, DEFINE_USAGE)?;
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let fields = parse_fields(cursor.body(&block)).map_err(|e| cursor.fail(e))?;
    interp.state.struct_defs.insert(
        name.to_string(),
        StructDef {
            name: name.to_string(),
            fields,
        },
    );
    Ok(cursor.step())
}

/// `struct new Type instance`
fn create(
    interp: &mut Interpreter,
    cursor: &mut Cursor<'_>,
) -> CommandResult {
    const USAGE: &str = "struct new <Type> <instance>";
    let type_name = cursor.expect_operand(interp, USAGE)?;
    let instance = cursor.expect_operand(interp, USAGE)?;
    let record = match interp.state.struct_defs.get(type_name.text()) {
        Some(def) => StructInstance::new(def),
        None => {
            return Err(cursor.fail(RuntimeError::UndefinedStructType(
                type_name.to_string(),
            )))
        }
    };
    interp.state.structs.insert(instance.to_string(), record);
    Ok(cursor.step())
}

/// `struct set instance field value`
fn set(
    interp: &mut Interpreter,
    cursor: &mut Cursor<'_>,
) -> CommandResult {
    const USAGE: &str = "struct set <instance> <field> <value>";
    let instance = cursor.expect_operand(interp, USAGE)?;
    let field = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let value = interp
        .state
        .resolve_strict(value)
        .map_err(|e| cursor.fail(e))?;
    let record = interp
        .state
        .structs
        .get_mut(instance.text())
        .ok_or_else(|| cursor.fail(RuntimeError::UndefinedStruct(instance.to_string())))?;
    match record.fields.get_mut(field.text()) {
        Some(slot) => *slot = value,
        None => {
            return Err(cursor.fail(RuntimeError::UndefinedField {
                owner: instance.to_string(),
                field: field.to_string(),
            }))
        }
    }
    Ok(cursor.step())
}

/// `struct get instance field [target]`
fn get(
    interp: &mut Interpreter,
    cursor: &mut Cursor<'_>,
) -> CommandResult {
    const USAGE: &str = "struct get <instance> <field> [target]";
    let instance = cursor.expect_operand(interp, USAGE)?;
    let field = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.target(interp);
    let record = interp
        .state
        .structs
        .get(instance.text())
        .ok_or_else(|| cursor.fail(RuntimeError::UndefinedStruct(instance.to_string())))?;
    let value = record.fields.get(field.text()).cloned().ok_or_else(|| {
        cursor.fail(RuntimeError::UndefinedField {
            owner: instance.to_string(),
            field: field.to_string(),
        })
    })?;
    deliver(interp, target, value);
    Ok(cursor.step())
}

/// `struct dump instance`
fn dump(
    interp: &mut Interpreter,
    cursor: &mut Cursor<'_>,
) -> CommandResult {
    let instance = cursor.expect_operand(interp, "struct dump <instance>")?;
    let text = interp
        .state
        .structs
        .get(instance.text())
        .map(StructInstance::dump)
        .ok_or_else(|| cursor.fail(RuntimeError::UndefinedStruct(instance.to_string())))?;
    interp.state.emit(text);
    Ok(cursor.step())
}
