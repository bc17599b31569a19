//! First-class function values
//!
//! `fn` creates a closure over the current scalar and string tables. Partials
//! and compositions wrap other function values; the higher-order commands
//! (`map_fn`, `filter_fn`, `reduce_fn`) call them once per array element.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use super::header_params;
use crate::backends::interpreter::call::{keyword_operand, Callee};
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::OpenerSet;
use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::CommandResult;
use crate::runtime::function::{CallArgs, FunctionDef, FunctionRef, FunctionValue};
use crate::runtime::value::{new_array, Value};

pub fn register(registry: &mut CommandRegistry) {
    registry.register("fn", define);
    registry.register("fn_call", fn_call);
    registry.register("fn_ref", fn_ref);
    registry.register("partial", partial);
    registry.register("compose", compose);
    registry.register("map_fn", map_fn);
    registry.register("filter_fn", filter_fn);
    registry.register("reduce_fn", reduce_fn);
}

/// The function value `name` refers to. A named function is wrapped into a
/// closure over the current scope.
fn function_value(
    interp: &Interpreter,
    name: &str,
) -> Result<FunctionRef, RuntimeError> {
    if let Some(value) = interp.state.fn_values.get(name) {
        return Ok(Rc::clone(value));
    }
    if let Some(def) = interp.state.functions.get(name) {
        return Ok(FunctionValue::closure(
            FunctionDef::clone(def),
            interp.capture_scope(),
        ));
    }
    Err(RuntimeError::UndefinedFunction(name.to_string()))
}

/// First returned value of a single-argument call, `Unset` if nothing came back
fn apply_one(
    interp: &mut Interpreter,
    function: &FunctionRef,
    args: impl IntoIterator<Item = Value>,
) -> Result<Value, RuntimeError> {
    Ok(interp
        .call_value(function, CallArgs::positional(args))?
        .into_iter()
        .next()
        .unwrap_or_default())
}

/// `fn name params... do ... end`
fn define(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "fn <name> [params...] do ... end")?;
    let params = header_params(&mut cursor, interp);
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let function = FunctionDef::new(name.text(), params, cursor.body(&block));
    let captured = interp.capture_scope();
    debug!(
        closure = name.text(),
        captured = captured.variables.len() + captured.strings.len(),
        "create closure"
    );
    interp
        .state
        .fn_values
        .insert(name.to_string(), FunctionValue::closure(function, captured));
    Ok(cursor.step())
}

/// `fn_call f args... [-> targets...]`
fn fn_call(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "fn_call <function> [args...] [-> targets...]";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let operands = cursor.line_operands(interp, true);
    let callee = match interp.state.fn_values.get(name.text()) {
        Some(value) => Callee::Value(Rc::clone(value)),
        None => interp.resolve_callee(name).map_err(|e| cursor.fail(e))?,
    };
    let (args, targets) = interp.parse_call_site(operands, callee.arity());
    let values = interp
        .invoke(&callee, args)
        .map_err(|e| cursor.fail(e))?;
    interp.assign_returns(&targets, values);
    Ok(cursor.step())
}

/// `fn_ref source target`
fn fn_ref(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "fn_ref <function> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let source = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let value = function_value(interp, source).map_err(|e| cursor.fail(e))?;
    interp.state.fn_values.insert(target.to_string(), value);
    Ok(cursor.step())
}

/// `partial f target p=v...`
fn partial(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "partial <function> <target> <param=value...>";
    let mut cursor = Cursor::new(tokens, index);
    let source = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let mut bound = IndexMap::new();
    for token in cursor.line_operands(interp, false) {
        let Some((param, raw)) = keyword_operand(token) else {
            return Err(cursor.fail(RuntimeError::usage("partial", USAGE)));
        };
        let value = interp.state.resolve(&Token::new(raw, token.line()));
        bound.insert(param.to_string(), value);
    }
    let base = function_value(interp, source).map_err(|e| cursor.fail(e))?;
    interp
        .state
        .fn_values
        .insert(target.to_string(), FunctionValue::partial(base, bound));
    Ok(cursor.step())
}

/// `compose f g target`: `target(x) = f(g(x))`
fn compose(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "compose <outer> <inner> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let outer = cursor.expect_operand(interp, USAGE)?;
    let inner = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let (outer, inner) = function_value(interp, outer)
        .and_then(|outer| Ok((outer, function_value(interp, inner)?)))
        .map_err(|e| cursor.fail(e))?;
    interp
        .state
        .fn_values
        .insert(target.to_string(), FunctionValue::compose(outer, inner));
    Ok(cursor.step())
}

/// Elements of the array operand and the function operand
fn array_and_function(
    interp: &Interpreter,
    array: &Token,
    function: &Token,
) -> Result<(Vec<Value>, FunctionRef), RuntimeError> {
    let items = interp
        .state
        .arrays
        .get(array.text())
        .ok_or_else(|| RuntimeError::UndefinedArray(array.to_string()))?
        .borrow()
        .clone();
    Ok((items, function_value(interp, function)?))
}

/// `map_fn array f target`
fn map_fn(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "map_fn <array> <function> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let array = cursor.expect_operand(interp, USAGE)?;
    let function = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let mapped = (|| -> Result<Vec<Value>, RuntimeError> {
        let (items, function) = array_and_function(interp, array, function)?;
        items
            .into_iter()
            .map(|item| apply_one(interp, &function, [item]))
            .collect()
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, Value::Array(new_array(mapped)));
    Ok(cursor.step())
}

/// `filter_fn array f target`
fn filter_fn(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "filter_fn <array> <function> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let array = cursor.expect_operand(interp, USAGE)?;
    let function = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let kept = (|| -> Result<Vec<Value>, RuntimeError> {
        let (items, function) = array_and_function(interp, array, function)?;
        let mut kept = Vec::new();
        for item in items {
            if apply_one(interp, &function, [item.clone()])?.to_bool() {
                kept.push(item);
            }
        }
        Ok(kept)
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, Value::Array(new_array(kept)));
    Ok(cursor.step())
}

/// `reduce_fn array f initial target`
fn reduce_fn(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "reduce_fn <array> <function> <initial> <target>";
    let mut cursor = Cursor::new(tokens, index);
    let array = cursor.expect_operand(interp, USAGE)?;
    let function = cursor.expect_operand(interp, USAGE)?;
    let initial = cursor.expect_operand(interp, USAGE)?;
    let target = cursor.expect_operand(interp, USAGE)?;
    let result = (|| -> Result<Value, RuntimeError> {
        let (items, function) = array_and_function(interp, array, function)?;
        let mut acc = interp.state.resolve_strict(initial)?;
        for item in items {
            acc = apply_one(interp, &function, [acc, item])?;
        }
        Ok(acc)
    })()
    .map_err(|e| cursor.fail(e))?;
    interp.state.assign(target, result);
    Ok(cursor.step())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Vec<String> {
        let mut interp = Interpreter::new();
        interp.run(source);
        interp.take_output()
    }

    const HELPERS: &str = "fn inc x do\nadd x 1\nreturn x\nend\n\
                           fn dbl x do\nmul x 2\nreturn x\nend\n";

    #[test]
    fn test_closure_counter_persists() {
        let src = "set count 0\nfn counter do\nadd count 1\nreturn count\nend\n\
                   fn_call counter -> a\nfn_call counter -> b\nprint a\nprint b\nprint count";
        assert_eq!(run(src), ["1", "2", "0"]);
    }

    #[test]
    fn test_closure_sees_captured_value() {
        let src = "set base 10\nfn add_base x do\nadd x base\nreturn x\nend\nset base 99\n\
                   fn_call add_base 1 -> r\nprint r";
        assert_eq!(run(src), ["11"]);
    }

    #[test]
    fn test_fn_ref_from_named_function() {
        let src = "def sq x do\nmul x x\nreturn x\nend\nfn_ref sq f\nfn_call f 7 -> r\nprint r\nprint f";
        assert_eq!(run(src), ["49", "<function sq>"]);
    }

    #[test]
    fn test_partial() {
        let src = "def power base exp do\nset r 1\nloop exp\nmul r base\nend\nreturn r\nend\n\
                   partial power square exp=2\nfn_call square 5 -> s\nprint s";
        assert_eq!(run(src), ["25"]);
    }

    #[test]
    fn test_partial_rejects_positional() {
        let out = run("fn id x do\nreturn x\nend\npartial id p 3");
        assert_eq!(
            out,
            ["[Error: Invalid 'partial' command. Use: partial <function> <target> <param=value...>]"]
        );
    }

    #[test]
    fn test_compose() {
        let src = format!("{HELPERS}compose inc dbl f\nfn_call f 5 -> r\nprint r");
        assert_eq!(run(&src), ["11"]);
    }

    #[test]
    fn test_map_filter_reduce() {
        let src = format!(
            "{HELPERS}fn odd x do\nmod x 2\nreturn x\nend\n\
             fn plus a b do\nadd a b\nreturn a\nend\n\
             pack xs 1 2 3\nmap_fn xs dbl ys\nfilter_fn xs odd os\nreduce_fn xs plus 0 total\n\
             print ys\nprint os\nprint total"
        );
        assert_eq!(run(&src), ["[2, 4, 6]", "[1, 3]", "6"]);
    }

    #[test]
    fn test_function_value_as_argument() {
        let src = format!(
            "{HELPERS}def apply f v do\nfn_call f v -> out\nreturn out\nend\ncall apply dbl 4 -> r\nprint r"
        );
        assert_eq!(run(&src), ["8"]);
    }

    #[test]
    fn test_undefined_function_value() {
        assert_eq!(
            run("fn_call ghost 1"),
            ["[Error: Function 'ghost' is not defined.]"]
        );
    }
}
