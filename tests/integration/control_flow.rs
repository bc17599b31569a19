use techlang::{run_with_config, InterpreterConfig};

use crate::lines;

#[test]
fn test_nested_loops_with_break() {
    let src = "set hits 0\nloop 3\nloop 4\nadd hits 1\nif hits == 6\nbreak\nend\nend\nend\nprint hits";
    // break leaves only the inner loop; the outer loop keeps going
    assert_eq!(lines(src), ["10"]);
}

#[test]
fn test_while_counts_down() {
    let src = "set n 3\nwhile n > 0\nprint n\nsub n 1\nend";
    assert_eq!(lines(src), ["3", "2", "1"]);
}

#[test]
fn test_while_iteration_ceiling() {
    let config = InterpreterConfig {
        max_loop_iterations: 25,
        ..Default::default()
    };
    let out = run_with_config("set x 1\nwhile x > 0\nping\nend\nprint", config);
    assert_eq!(
        out,
        "[Error: Loop exceeded maximum iterations (25)]\n25"
    );
}

#[test]
fn test_if_else_chain() {
    let src = "set t 72\nif t > 80\nprint \"hot\"\nelse\nif t > 60\nprint \"mild\"\nelse\nprint \"cold\"\nend\nend";
    assert_eq!(lines(src), ["mild"]);
}

#[test]
fn test_switch_default() {
    let src = "str_create c \"blue\"\nswitch c\ncase \"red\"\nprint 1\ncase \"green\"\nprint 2\ndefault\nprint 0\nend";
    assert_eq!(lines(src), ["0"]);
}

#[test]
fn test_continue_skips_rest_of_body() {
    let src = "set i 0\nset odd 0\nwhile i < 6\nadd i 1\nset r i\nmod r 2\nif r == 0\ncontinue\nend\nadd odd 1\nend\nprint odd";
    assert_eq!(lines(src), ["3"]);
}

#[test]
fn test_try_catch_with_bindings() {
    let src = "try\nset z 0\nset q 4\ndiv q z\nprint \"skipped?\"\ncatch msg kind\nprint kind\nend\nprint \"done\"";
    assert_eq!(
        lines(src),
        [
            "[Error: Cannot divide by zero]",
            "skipped?",
            "ZeroDivisionError",
            "done"
        ]
    );
}

#[test]
fn test_loop_else_runs_without_break() {
    let src = "loop_else 3 do\nping\nelse\nprint \"completed\"\nend\nprint";
    assert_eq!(lines(src), ["completed", "3"]);
}

#[test]
fn test_string_compares_with_number() {
    let src = "str_create s \"5\"\nif s == 5\nprint \"eq\"\nend\nif s >= 5\nprint \"ge\"\nend";
    assert_eq!(lines(src), ["eq", "ge"]);
}
