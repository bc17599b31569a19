use crate::lines;

#[test]
fn test_loop_with_accumulator() {
    assert_eq!(lines("loop 3\n ping\n end\n print"), ["3"]);
}

#[test]
fn test_def_and_call() {
    assert_eq!(
        lines("def f x do\n return x\n end\n call f 5 -> y\n print y"),
        ["5"]
    );
}

#[test]
fn test_macro_inline() {
    assert_eq!(
        lines("macro twice v do\n print $v\n print $v\n end\n inline twice \"hi\""),
        ["hi", "hi"]
    );
}

#[test]
fn test_inherited_field() {
    assert_eq!(
        lines("class A\n field n int 1\n end\n class B extends A\n end\n new B b\n get_field b n"),
        ["1"]
    );
}

#[test]
fn test_try_catch_signal() {
    let out = lines("try\n throw \"boom\"\n catch\n print \"caught\"\n end");
    let error = out.iter().position(|l| l == "[Error: boom]");
    let caught = out.iter().position(|l| l == "caught");
    assert!(error.is_some() && caught.is_some(), "{:?}", out);
    assert_eq!(out.len(), 2);
}

#[test]
fn test_match_full_wildcard() {
    assert_eq!(
        lines("match_full 7\n case_or 1 2 do\n print \"low\"\n end\n case _ do\n print \"other\"\n end\n end"),
        ["other"]
    );
}

#[test]
fn test_output_is_newline_joined() {
    assert_eq!(techlang::run("print 1\nprint 2"), "1\n2");
    assert_eq!(techlang::run(""), "");
}
