use techlang::{run_with_config, InterpreterConfig};

use crate::lines;

#[test]
fn test_macro_expands_into_block() {
    let src = "macro repeat_ping n do\nloop $n\nping\nend\nend\ninline repeat_ping 4\nprint";
    assert_eq!(lines(src), ["4"]);
}

#[test]
fn test_alias_for_command() {
    assert_eq!(lines("alias bump ping\nbump\nbump\nprint"), ["2"]);
}

#[test]
fn test_guarded_macro_needs_define() {
    let src = "macro trace msg when:DEBUG do\nprint $msg\nend\ninline trace \"tracing\"\nprint \"done\"";
    assert_eq!(lines(src), ["done"]);

    let mut config = InterpreterConfig::default();
    config.define("DEBUG");
    assert_eq!(run_with_config(src, config), "tracing\ndone");
}

#[test]
fn test_macro_errors_are_reported() {
    assert_eq!(
        lines("inline nope\nprint \"after\""),
        ["[Error: Macro 'nope' is not defined.]", "after"]
    );
}
