use proptest::prelude::*;
use techlang::frontend::tokenize;

proptest! {
    #[test]
    fn prop_whitespace_only_inside_quotes(source in "[ a-z0-9\"#\n\t]{0,80}") {
        if let Ok(tokens) = tokenize(&source) {
            for token in tokens {
                prop_assert!(!token.text().is_empty());
                if !token.text().contains('"') {
                    prop_assert!(!token.text().contains(char::is_whitespace));
                }
            }
        }
    }

    #[test]
    fn prop_loop_count_matches_accumulator(n in 0u32..60) {
        let out = techlang::run(&format!("loop {n}\nping\nend\nprint"));
        prop_assert_eq!(out, n.to_string());
    }

    #[test]
    fn prop_integer_arithmetic(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        let src = format!("set x {a}\nadd x {b}\nprint x\nset y {a}\nmul y {b}\nprint y");
        prop_assert_eq!(techlang::run(&src), format!("{}\n{}", a + b, a * b));
    }

    #[test]
    fn prop_unknown_words_produce_no_output(words in prop::collection::vec("zz[a-z]{1,6}", 0..10)) {
        prop_assert_eq!(techlang::run(&words.join(" ")), "");
    }
}
