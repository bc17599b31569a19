use crate::lines;

const FIB: &str = "def fib n\nset a 0\nset b 1\nloop n\nset t a\nadd t b\nset a b\nset b t\nend\nreturn a\nend\n";

#[test]
fn test_iterative_fibonacci() {
    let out = lines(&format!("{FIB}call fib 10 -> r\nprint r\ncall fib 1 -> s\nprint s"));
    assert_eq!(out, ["55", "1"]);
}

#[test]
fn test_recursive_factorial() {
    let src = "def fact n\nif n <= 1\nreturn 1\nend\nset m n\nsub m 1\ncall fact m -> r\n\
               mul r n\nreturn r\nend\ncall fact 6 -> out\nprint out";
    assert_eq!(lines(src), ["720"]);
}

#[test]
fn test_parameters_shadow_globals() {
    let src = "set n 7\ndef bump n do\nadd n 100\nreturn n\nend\ncall bump 1 -> r\nprint r\nprint n";
    assert_eq!(lines(src), ["101", "7"]);
}

#[test]
fn test_function_without_return() {
    let src = "def noop do\nping\nend\ncall noop -> r\nprint";
    assert_eq!(lines(src), ["1"]);
}

#[test]
fn test_variadic_and_keywords() {
    let src = "defv total *nums do\nset sum 0\nforeach nums n do\nadd sum n\nend\nreturn sum\nend\n\
               callv total 5 6 7 -> t\nprint t\n\
               defn greet name greeting=\"Hello\" do\nstr_create msg greeting\nstr_concat msg \", \"\n\
               str_concat msg name\nprint msg\nend\ncalln greet \"World\"\ncalln greet name=\"you\" greeting=\"Bye\"";
    assert_eq!(lines(src), ["18", "Hello, World", "Bye, you"]);
}

#[test]
fn test_closures_capture_at_definition() {
    let src = "set rate 3\nfn scale x do\nmul x rate\nreturn x\nend\nset rate 10\n\
               fn_call scale 5 -> r\nprint r";
    assert_eq!(lines(src), ["15"]);
}

#[test]
fn test_closure_state_persists_between_calls() {
    let src = "set count 0\nfn counter do\nadd count 1\nreturn count\nend\n\
               fn_call counter -> a\nfn_call counter -> b\nfn_call counter -> c\nprint c\nprint count";
    assert_eq!(lines(src), ["3", "0"]);
}

#[test]
fn test_higher_order_pipeline() {
    let src = "fn inc x do\nadd x 1\nreturn x\nend\nfn dbl x do\nmul x 2\nreturn x\nend\n\
               compose dbl inc inc_then_dbl\npack xs 1 2 3\nmap_fn xs inc_then_dbl ys\nprint ys\n\
               fn plus a b do\nadd a b\nreturn a\nend\nreduce_fn ys plus 0 total\nprint total";
    assert_eq!(lines(src), ["[4, 6, 8]", "18"]);
}
