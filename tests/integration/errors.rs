use crate::lines;

#[test]
fn test_errors_do_not_abort() {
    let src = "print ghost\nset x 1\ndiv x 0\ncall nowhere\nprint \"end of program\"";
    assert_eq!(
        lines(src),
        [
            "[Error: Variable 'ghost' is not defined.]",
            "[Error: Cannot divide by zero]",
            "[Error: Function 'nowhere' is not defined.]",
            "end of program"
        ]
    );
}

#[test]
fn test_unterminated_block() {
    assert_eq!(
        lines("ping\nloop 3\nping"),
        ["[Error: Missing 'end' for 'loop' block]"]
    );
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        lines("print \"open"),
        ["[Error: Unterminated string literal on line 1]"]
    );
}

#[test]
fn test_usage_error_format() {
    let out = lines("set x");
    assert_eq!(out.len(), 1);
    assert!(out[0].starts_with("[Error: Invalid 'set' command. Use: set"), "{}", out[0]);
}

#[test]
fn test_unknown_words_are_ignored() {
    assert_eq!(lines("hello world ping\nprint"), ["1"]);
}

#[test]
fn test_thrown_kind_prefix() {
    assert_eq!(
        lines("throw \"bad value\" ValueError\nraise \"plain\""),
        ["[Error: ValueError: bad value]", "[Error: plain]"]
    );
}
