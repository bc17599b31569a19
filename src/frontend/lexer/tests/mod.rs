//! Lexer unit tests
use crate::frontend::lexer::{tokenize, unquote, LexError};

fn texts(source: &str) -> Vec<String> {
    tokenize(source)
        .unwrap()
        .iter()
        .map(|t| t.text().to_string())
        .collect()
}

#[cfg(test)]
mod lexer_basic_tests {
    use super::*;

    #[test]
    fn test_empty_source() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(texts("set x 5\nprint x"), ["set", "x", "5", "print", "x"]);
    }

    #[test]
    fn test_quoted_string_is_atomic() {
        assert_eq!(
            texts(r#"print "hello world"  ping"#),
            ["print", "\"hello world\"", "ping"]
        );
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(texts("# header\nping # trailing\n  # indented"), ["ping"]);
    }

    #[test]
    fn test_hash_inside_string_is_kept() {
        assert_eq!(texts(r#"print "a # b""#), ["print", "\"a # b\""]);
    }

    #[test]
    fn test_keyword_argument_with_spaces() {
        assert_eq!(
            texts(r#"calln greet name="Bob Smith" -> out"#),
            ["calln", "greet", "name=\"Bob Smith\"", "->", "out"]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("ping\n\n  ping ping").unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line()).collect();
        assert_eq!(lines, [1, 3, 3]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("ping\nprint \"oops").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 2 });
    }
}

#[cfg(test)]
mod lexer_literal_tests {
    use super::*;

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a\nb""#), "a\nb");
        assert_eq!(unquote(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let tokens = tokenize(r#"print "a\" b" ping"#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_quoted());
        assert_eq!(tokens[1].unquoted(), "a\" b");
    }

    #[test]
    fn test_token_comparison() {
        let tokens = tokenize("end").unwrap();
        assert!(tokens[0] == "end");
        assert_eq!(&*tokens[0], "end");
    }
}
