//! Classes and instances
//!
//! ```text
//! class Name [extends Parent]
//!     field name type [default]
//!     init params... ... end
//!     method name params... [do] ... end
//!     static name params... [do] ... end
//! end
//! ```
//!
//! Methods run through [`Interpreter::call_method`]: fields are bound as
//! transient variables and copied back when the body finishes.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::{deliver, header_params};
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::OpenerSet;
use crate::frontend::lexer::Token;
use crate::runtime::class::{ClassDef, FieldDef, MethodDef};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::CommandResult;
use crate::runtime::function::FunctionDef;
use crate::runtime::value::Value;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("class", class);
    registry.register("new", new_instance);
    registry.register("get_field", get_field);
    registry.register("set_field", set_field);
    registry.register("instanceof", instanceof);
}

const FIELD_USAGE: &str = "field <name> <type> [default]";
const METHOD_USAGE: &str = "method <name> [params...] [do] ... end";

/// Fill `class` from the members of a class body.
fn parse_members(
    interp: &Interpreter,
    class: &mut ClassDef,
    body: &[Token],
) -> Result<(), RuntimeError> {
    let mut i = 0;
    while i < body.len() {
        let mut member = Cursor::new(body, i);
        match body[i].text() {
            "field" => {
                let name = member
                    .expect_operand(interp, FIELD_USAGE)
                    .map_err(|f| f.error)?;
                let type_tag = member
                    .expect_operand(interp, FIELD_USAGE)
                    .map_err(|f| f.error)?;
                let default = member
                    .line_operands(interp, false)
                    .first()
                    .map(|t| Value::from_literal(t));
                class.fields.insert(
                    name.to_string(),
                    FieldDef {
                        type_tag: type_tag.to_string(),
                        default,
                    },
                );
            }
            "method" | "static" => {
                let name = member
                    .expect_operand(interp, METHOD_USAGE)
                    .map_err(|f| f.error)?;
                let params = header_params(&mut member, interp);
                let block = member.block(&OpenerSet::BLOCK).map_err(|f| f.error)?;
                let method = MethodDef {
                    function: FunctionDef::new(name.text(), params, member.body(&block)),
                    is_static: body[i] == "static",
                };
                class.methods.insert(name.to_string(), Rc::new(method));
            }
            "init" => {
                let params = header_params(&mut member, interp);
                let block = member.block(&OpenerSet::BLOCK).map_err(|f| f.error)?;
                let name = format!("{}.init", class.name);
                class.constructor = Some(Rc::new(FunctionDef::new(
                    name,
                    params,
                    member.body(&block),
                )));
            }
            other => {
                trace!(class = %class.name, token = other, "ignoring token in class body");
            }
        }
        i = member.position();
    }
    Ok(())
}

/// `class Name [extends Parent] ... end`
fn class(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "class <Name> [extends <Parent>] ... end";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let parent = if cursor.eat("extends") {
        Some(cursor.expect_operand(interp, USAGE)?.to_string())
    } else {
        None
    };
    let block = cursor.block(&OpenerSet::CLASS_BODY)?;

    let mut def = ClassDef {
        name: name.to_string(),
        parent,
        ..ClassDef::default()
    };
    parse_members(interp, &mut def, cursor.body(&block)).map_err(|e| cursor.fail(e))?;
    debug!(
        class = %def.name,
        parent = ?def.parent,
        fields = def.fields.len(),
        methods = def.methods.len(),
        "define class"
    );
    interp.state.classes.define(def);

    if let Err(err @ RuntimeError::InheritanceCycle(_)) = interp.state.classes.ancestry(name) {
        warn!(class = name.text(), "inheritance chain loops back on itself");
        return Err(cursor.fail(err));
    }
    Ok(cursor.step())
}

/// `new Class instance [args...]`
fn new_instance(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "new <Class> <instance> [args...]";
    let mut cursor = Cursor::new(tokens, index);
    let class = cursor.expect_operand(interp, USAGE)?;
    let instance = cursor.expect_operand(interp, USAGE)?;
    let operands = cursor.line_operands(interp, false);
    // a module's own classes come first inside its functions
    let class = match interp.module_qualified(class) {
        Some(qualified) if interp.state.classes.contains(&qualified) => qualified,
        _ => class.to_string(),
    };
    if !interp.state.classes.contains(&class) {
        return Err(cursor.fail(RuntimeError::UndefinedClass(class)));
    }
    let (args, _) = interp.parse_call_site(operands, None);
    interp
        .construct(&class, instance, args)
        .map_err(|e| cursor.fail(e))?;
    Ok(cursor.step())
}

/// Instance named by an operand, directly or through a variable such as `self`
fn instance_operand(
    interp: &Interpreter,
    token: &Token,
) -> Result<String, RuntimeError> {
    interp
        .state
        .instance_name(token)
        .ok_or_else(|| RuntimeError::UndefinedInstance(token.to_string()))
}

/// Whether `field` of `instance` is bound as a variable by the innermost
/// running method
fn is_live_field(
    interp: &Interpreter,
    instance: &str,
    field: &str,
) -> bool {
    interp
        .receivers
        .last()
        .is_some_and(|r| r.owner == instance && r.binds(field))
}

/// `get_field instance field [target]`
fn get_field(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "get_field <instance> <field> [target]";
    let mut cursor = Cursor::new(tokens, index);
    let owner = cursor.expect_operand(interp, USAGE)?;
    let field = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.target(interp);
    let value = (|| -> Result<Value, RuntimeError> {
        let instance = instance_operand(interp, owner)?;
        let stored = interp
            .state
            .instances
            .get(&instance)
            .and_then(|i| i.fields.get(field.text()).cloned())
            .ok_or_else(|| RuntimeError::UndefinedField {
                owner: instance.clone(),
                field: field.to_string(),
            })?;
        // inside a method the transient binding is the live value
        if is_live_field(interp, &instance, field) {
            if let Some(live) = interp.state.lookup(field) {
                return Ok(live);
            }
        }
        Ok(stored)
    })()
    .map_err(|e| cursor.fail(e))?;
    deliver(interp, target, value);
    Ok(cursor.step())
}

/// `set_field instance field value`
fn set_field(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "set_field <instance> <field> <value>";
    let mut cursor = Cursor::new(tokens, index);
    let owner = cursor.expect_operand(interp, USAGE)?;
    let field = cursor.expect_operand(interp, USAGE)?;
    let value = cursor.expect_operand(interp, USAGE)?;
    let (instance, value) = (|| -> Result<(String, Value), RuntimeError> {
        let instance = instance_operand(interp, owner)?;
        let class = interp
            .state
            .instances
            .get(&instance)
            .map(|i| i.class.clone())
            .ok_or_else(|| RuntimeError::UndefinedInstance(instance.clone()))?;
        let declared = interp
            .state
            .classes
            .find_field(&class, field)?
            .ok_or_else(|| RuntimeError::UndefinedField {
                owner: class,
                field: field.to_string(),
            })?;
        let value = declared.coerce(interp.state.resolve_strict(value)?);
        Ok((instance, value))
    })()
    .map_err(|e| cursor.fail(e))?;

    if let Some(target) = interp.state.instances.get_mut(&instance) {
        target.fields.insert(field.to_string(), value.clone());
    }
    if is_live_field(interp, &instance, field) {
        interp.state.assign(field, value);
    }
    Ok(cursor.step())
}

/// `instanceof instance Class target`
fn instanceof(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "instanceof <instance> <Class> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let owner = cursor.expect_operand(interp, USAGE)?;
    let class = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let result = (|| -> Result<bool, RuntimeError> {
        let instance = instance_operand(interp, owner)?;
        let actual = interp
            .state
            .instances
            .get(&instance)
            .map(|i| i.class.clone())
            .unwrap_or_default();
        interp.state.classes.is_subclass(&actual, class)
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, Value::from(result));
    Ok(cursor.step())
}
