//! Named functions: `def`, `call`, `return`

use std::rc::Rc;

use tracing::debug;

use super::header_params;
use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::OpenerSet;
use crate::frontend::lexer::Token;
use crate::runtime::flow::{CommandResult, Flow, Values};
use crate::runtime::function::FunctionDef;

pub fn register(registry: &mut CommandRegistry) {
    for word in ["def", "defn", "defv"] {
        registry.register(word, def);
    }
    for word in ["call", "calln", "callv"] {
        registry.register(word, call);
    }
    registry.register("return", ret);
    registry.register("return_multi", ret);
}

/// `def name params... [do] ... end`
fn def(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "def <name> [params...] do ... end")?;
    let params = header_params(&mut cursor, interp);
    let block = cursor.block(&OpenerSet::BLOCK)?;
    let function = FunctionDef::new(name.text(), params, cursor.body(&block));
    debug!(
        function = name.text(),
        params = function.params.len(),
        "define function"
    );
    interp
        .state
        .functions
        .insert(name.to_string(), Rc::new(function));
    Ok(cursor.step())
}

/// `call name args... [-> targets...]`
///
/// Without `->`, operands past the callee's positional parameters are return
/// targets.
fn call(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    const USAGE: &str = "call <function> [args...] [-> targets...]";
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, USAGE)?;
    let operands = cursor.line_operands(interp, true);
    let callee = interp
        .resolve_callee(name)
        .map_err(|e| cursor.fail(e))?;
    let (args, targets) = interp.parse_call_site(operands, callee.arity());
    let values = interp
        .invoke(&callee, args)
        .map_err(|e| cursor.fail(e))?;
    interp.assign_returns(&targets, values);
    Ok(cursor.step())
}

/// `return [values...]`: ends the innermost function body.
fn ret(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let values: Values = cursor
        .line_operands(interp, false)
        .iter()
        .map(|t| interp.state.resolve(t))
        .collect();
    Ok(cursor.step_with(Flow::Return(values)))
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
    fn test_def_and_call() {
        assert_eq!(run("def f x do\nreturn x\nend\ncall f 5 -> y\nprint y"), ["5"]);
    }

    #[test]
    fn test_targets_without_arrow() {
        let out = run("def add2 a b\nset s a\nadd s b\nreturn s\nend\ncall add2 2 3 total\nprint total");
        assert_eq!(out, ["5"]);
    }

    #[test]
    fn test_multiple_returns() {
        let out = run(
            "def split n\nset lo n\nmod lo 10\nset hi n\ndiv hi 10\nreturn_multi hi lo\nend\n\
             call split 42 -> a b\nprint a\nprint b",
        );
        assert_eq!(out, ["4", "2"]);
    }

    #[test]
    fn test_defaults_and_keywords() {
        let src = "defn greet name greeting=\"Hello\" do\nstr_create msg greeting\nstr_concat msg \" \"\n\
                   str_concat msg name\nprint msg\nend\n\
                   calln greet \"Ada\"\ncalln greet \"Bob\" greeting=\"Hi\"";
        assert_eq!(run(src), ["Hello Ada", "Hi Bob"]);
    }

    #[test]
    fn test_variadic() {
        let src = "defv sum_all *nums do\nset total 0\nforeach nums n do\nadd total n\nend\nreturn total\nend\n\
                   callv sum_all 1 2 3 4 -> s\nprint s";
        assert_eq!(run(src), ["10"]);
    }

    #[test]
    fn test_keyword_rest() {
        let src = "defv opts **kw do\nprint kw\nend\ncallv opts a=1 b=\"x\"";
        assert_eq!(run(src), ["{\"a\": 1, \"b\": \"x\"}"]);
    }

    #[test]
    fn test_binding_errors() {
        assert_eq!(
            run("def f a do\nping\nend\ncall f\nprint"),
            ["[Error: Missing required argument 'a' for function 'f'.]", "0"]
        );
        assert_eq!(
            run("def f a do\nend\ncall f a=1 z=2"),
            ["[Error: Unexpected keyword argument 'z' for function 'f'.]"]
        );
        assert_eq!(run("call nope 1"), ["[Error: Function 'nope' is not defined.]"]);
    }

    #[test]
    fn test_recursion() {
        let src = "def fact n\nif n <= 1\nreturn 1\nend\nset m n\nsub m 1\ncall fact m -> r\n\
                   mul r n\nreturn r\nend\ncall fact 5 -> out\nprint out";
        assert_eq!(run(src), ["120"]);
    }

    #[test]
    fn test_recursion_limit() {
        let config = crate::util::config::InterpreterConfig {
            max_call_depth: 40,
            ..Default::default()
        };
        let mut interp = Interpreter::with_config(config);
        interp.run("def down n\ncall down n\nend\ncall down 1\nprint \"after\"");
        assert_eq!(
            interp.take_output(),
            ["[Error: Maximum call depth (40) exceeded]", "after"]
        );
    }

    #[test]
    fn test_return_stops_loop_and_body() {
        let src = "def first_big limit do\nloop 10\nping\nif limit < 3\nreturn limit\nend\nend\n\
                   print \"unreachable\"\nend\ncall first_big 1 -> v\nprint v\nprint";
        assert_eq!(run(src), ["1", "1"]);
    }

    #[test]
    fn test_params_restored_after_call() {
        let src = "set x 100\ndef f x do\nadd x 1\nend\ncall f 1\nprint x";
        assert_eq!(run(src), ["100"]);
    }
}
