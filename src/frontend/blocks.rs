//! Block resolution
//!
//! Every construct that owns a body (`def`, `loop`, `if`, `class`, `match_full`, ...)
//! finds the extent of that body with [`resolve`]: a forward scan that counts nested
//! openers against `end` markers. The scan never fails; an unterminated block simply
//! runs to the end of the token stream and is flagged as such.

use tracing::debug;

use crate::frontend::lexer::Token;

/// Keywords that open an `end`-terminated block anywhere in a program.
pub const BLOCK_OPENERS: &[&str] = &[
    "def",
    "defn",
    "defv",
    "fn",
    "if",
    "loop",
    "while",
    "foreach",
    "switch",
    "match",
    "match_full",
    "case",
    "case_or",
    "case_list",
    "case_dict",
    "try",
    "loop_else",
    "while_else",
    "macro",
    "class",
    "struct",
];

/// Additional openers inside a class body.
pub const MEMBER_OPENERS: &[&str] = &["method", "static", "init"];

/// `struct` only opens a block in its definition form.
const STRUCT_VERBS: &[&str] = &["new", "set", "get", "dump"];

/// The keyword that terminates every block.
pub const END: &str = "end";

/// The set of keywords that increase nesting depth for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenerSet {
    keywords: &'static [&'static str],
    members: bool,
}

impl OpenerSet {
    /// Openers for ordinary bodies
    pub const BLOCK: OpenerSet = OpenerSet::new(BLOCK_OPENERS);

    /// Openers inside `class ... end`
    pub const CLASS_BODY: OpenerSet = OpenerSet::new(BLOCK_OPENERS).with_members();

    /// A custom opener set
    pub const fn new(keywords: &'static [&'static str]) -> Self {
        Self {
            keywords,
            members: false,
        }
    }

    /// Also treat `method`/`static`/`init` as openers
    pub const fn with_members(self) -> Self {
        Self {
            keywords: self.keywords,
            members: true,
        }
    }

    /// Whether `tokens[index]` opens a nested block under this set.
    ///
    /// `case` opens only when a `do` follows on the same line (`match_full` cases);
    /// the bare `case <n>` of `switch` and `match` is a separator, not a block.
    pub fn opens(
        &self,
        tokens: &[Token],
        index: usize,
    ) -> bool {
        let word = tokens[index].text();
        if self.members && MEMBER_OPENERS.contains(&word) {
            return true;
        }
        if !self.keywords.contains(&word) {
            return false;
        }
        match word {
            "struct" => !tokens
                .get(index + 1)
                .is_some_and(|next| STRUCT_VERBS.contains(&next.text())),
            "case" => has_do_on_line(tokens, index),
            _ => true,
        }
    }

    fn scopes_class(&self) -> bool {
        self.keywords.contains(&"class")
    }
}

impl Default for OpenerSet {
    fn default() -> Self {
        Self::BLOCK
    }
}

fn has_do_on_line(
    tokens: &[Token],
    index: usize,
) -> bool {
    let line = tokens[index].line();
    tokens[index + 1..]
        .iter()
        .take_while(|t| t.line() == line)
        .any(|t| *t == "do")
}

/// A resolved block: body tokens are `tokens[start..end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// First body token
    pub start: usize,
    /// Index of the terminating `end`, or the stream length when unterminated
    pub end: usize,
    /// Whether a matching `end` was found
    pub terminated: bool,
}

impl Block {
    /// The body tokens
    pub fn body<'t>(
        &self,
        tokens: &'t [Token],
    ) -> &'t [Token] {
        &tokens[self.start..self.end]
    }

    /// Index of the first token after the block (past its `end`)
    pub fn next(&self) -> usize {
        if self.terminated {
            self.end + 1
        } else {
            self.end
        }
    }

    /// Tokens claimed by a command at `command` whose block this is
    pub fn consumed_from(
        &self,
        command: usize,
    ) -> usize {
        self.next().saturating_sub(command + 1)
    }
}

/// Find the body that starts at `start` and the `end` that closes it.
pub fn resolve(
    tokens: &[Token],
    start: usize,
    openers: &OpenerSet,
) -> Block {
    let (end, terminated) = match scan(tokens, start, openers, |_| {}) {
        Some(end) => (end, true),
        None => (tokens.len(), false),
    };
    if !terminated {
        debug!(
            line = tokens.get(start.saturating_sub(1)).map(Token::line),
            "unterminated block"
        );
    }
    Block {
        start: start.min(tokens.len()),
        end,
        terminated,
    }
}

/// Walk `tokens[start..]`, reporting every depth-0 token that is neither an opener
/// nor an `end` to `visit`. Returns the index of the `end` that would take depth
/// below zero, or `None` if the stream runs out first.
fn scan(
    tokens: &[Token],
    start: usize,
    openers: &OpenerSet,
    mut visit: impl FnMut(usize),
) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < tokens.len() {
        if tokens[i] == END {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        } else if tokens[i] == "class" && openers.scopes_class() {
            // class bodies have their own member openers
            let inner = resolve(tokens, i + 1, &OpenerSet::CLASS_BODY);
            if !inner.terminated {
                return None;
            }
            i = inner.end + 1;
            continue;
        } else if openers.opens(tokens, i) {
            depth += 1;
        } else if depth == 0 {
            visit(i);
        }
        i += 1;
    }
    None
}

/// One piece of a block split at depth-0 separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'t> {
    /// The separator that opened this segment; `None` for the leading segment
    pub marker: Option<&'t Token>,
    /// Tokens after the marker up to the next separator
    pub tokens: &'t [Token],
}

/// Split a block body at depth-0 occurrences of any of `separators`.
///
/// The leading segment (before the first separator) is always present, possibly
/// empty. Separators inside nested blocks are left alone.
pub fn split_top_level<'t>(
    body: &'t [Token],
    separators: &[&str],
    openers: &OpenerSet,
) -> Vec<Segment<'t>> {
    let mut cuts = Vec::new();
    scan(body, 0, openers, |i| {
        if separators.contains(&body[i].text()) {
            cuts.push(i);
        }
    });

    let mut segments = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0;
    let mut marker = None;
    for cut in cuts {
        segments.push(Segment {
            marker,
            tokens: &body[from..cut],
        });
        marker = Some(&body[cut]);
        from = cut + 1;
    }
    segments.push(Segment {
        marker,
        tokens: &body[from..],
    });
    segments
}

/// Whether every block opened in `tokens` is closed. Used by the REPL to decide
/// when a multi-line chunk is ready to run.
pub fn is_complete(tokens: &[Token]) -> bool {
    let mut i = 0;
    while i < tokens.len() {
        let openers = if tokens[i] == "class" {
            Some(OpenerSet::CLASS_BODY)
        } else if OpenerSet::BLOCK.opens(tokens, i) {
            Some(OpenerSet::BLOCK)
        } else {
            None
        };
        match openers {
            Some(set) => {
                let block = resolve(tokens, i + 1, &set);
                if !block.terminated {
                    return false;
                }
                i = block.next();
            }
            None => i += 1,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use proptest::prelude::*;

    fn toks(source: &str) -> Vec<Token> {
        tokenize(source).unwrap()
    }

    #[test]
    fn test_resolve_flat() {
        let tokens = toks("loop 3 ping end print");
        let block = resolve(&tokens, 2, &OpenerSet::BLOCK);
        assert!(block.terminated);
        assert_eq!(block.end, 3);
        assert_eq!(block.body(&tokens).len(), 1);
        assert_eq!(block.consumed_from(0), 4);
    }

    #[test]
    fn test_resolve_nested() {
        let tokens = toks("if x > 1 loop 2 ping end if y == 1 crash end end print");
        let block = resolve(&tokens, 4, &OpenerSet::BLOCK);
        assert!(block.terminated);
        assert_eq!(tokens[block.end], "end");
        assert_eq!(block.end, tokens.len() - 2);
    }

    #[test]
    fn test_resolve_unterminated() {
        let tokens = toks("loop 3 ping ping");
        let block = resolve(&tokens, 2, &OpenerSet::BLOCK);
        assert!(!block.terminated);
        assert_eq!(block.end, tokens.len());
        assert_eq!(block.consumed_from(0), 3);
    }

    #[test]
    fn test_struct_verbs_do_not_open() {
        let tokens = toks("loop 1 struct new Point p end print");
        let block = resolve(&tokens, 2, &OpenerSet::BLOCK);
        assert_eq!(block.end, 6);

        let tokens = toks("loop 1 struct Point x:int end end");
        let block = resolve(&tokens, 2, &OpenerSet::BLOCK);
        assert_eq!(block.end, 6);
    }

    #[test]
    fn test_case_opens_only_with_do() {
        let source = "match_full x\n case 1 do\n ping\n end\n end\n switch y\n case 1\n ping\n end";
        let tokens = toks(source);
        let block = resolve(&tokens, 2, &OpenerSet::BLOCK);
        assert_eq!(tokens[block.end].line(), 5);

        let switch = tokens.iter().position(|t| *t == "switch").unwrap();
        let block = resolve(&tokens, switch + 2, &OpenerSet::BLOCK);
        assert!(block.terminated);
        assert_eq!(block.end, tokens.len() - 1);
    }

    #[test]
    fn test_class_members_scoped() {
        let source = "def f do\n class A\n method m do\n ping\n end\n end\n ping\n end\n print";
        let tokens = toks(source);
        let block = resolve(&tokens, 3, &OpenerSet::BLOCK);
        assert_eq!(tokens[block.end].line(), 8);
    }

    #[test]
    fn test_split_top_level() {
        let tokens = toks("ping try crash catch ping end else crash crash");
        let segments = split_top_level(&tokens, &["else", "catch"], &OpenerSet::BLOCK);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].marker.is_none());
        assert_eq!(segments[0].tokens.len(), 6);
        assert_eq!(segments[1].marker.map(|t| t.text()), Some("else"));
        assert_eq!(segments[1].tokens.len(), 2);
    }

    #[test]
    fn test_is_complete() {
        assert!(is_complete(&toks("ping ping")));
        assert!(!is_complete(&toks("def f x do")));
        assert!(is_complete(&toks("def f x do\n return x\n end")));
        assert!(!is_complete(&toks("class A\n method m do\n end")));
    }

    fn nested_program() -> impl Strategy<Value = Vec<String>> {
        let leaf = prop_oneof![Just(vec!["ping".to_string()]), Just(vec![])];
        leaf.prop_recursive(4, 32, 4, |inner| {
            (
                prop_oneof![Just("if"), Just("loop"), Just("while"), Just("try")],
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(opener, children)| {
                    let mut out = vec![opener.to_string()];
                    out.extend(children.into_iter().flatten());
                    out.push("end".to_string());
                    out
                })
        })
    }

    proptest! {
        #[test]
        fn prop_resolve_finds_matching_end(body in nested_program(), tail in 0usize..3) {
            let mut words = body.clone();
            words.push("end".to_string());
            words.extend(std::iter::repeat("ping".to_string()).take(tail));
            let tokens: Vec<Token> = words.iter().map(|w| Token::new(w.as_str(), 1)).collect();

            let block = resolve(&tokens, 0, &OpenerSet::BLOCK);
            prop_assert!(block.terminated);
            prop_assert_eq!(block.end, body.len());
            prop_assert!(tokens[block.end] == "end");

            let opens = block.body(&tokens).iter().filter(|t| **t != "end" && **t != "ping").count();
            let ends = block.body(&tokens).iter().filter(|t| **t == "end").count();
            prop_assert_eq!(opens, ends);
        }

        #[test]
        fn prop_unterminated_never_panics(words in prop::collection::vec(
            prop_oneof![Just("if"), Just("end"), Just("ping"), Just("case"), Just("do")], 0..40)
        ) {
            let tokens: Vec<Token> = words.iter().map(|w| Token::new(*w, 1)).collect();
            let block = resolve(&tokens, 0, &OpenerSet::BLOCK);
            prop_assert!(block.end <= tokens.len());
            prop_assert!(block.next() <= tokens.len());
        }
    }
}
