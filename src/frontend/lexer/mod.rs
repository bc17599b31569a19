//! Lexer module
//!
//! TechLang source is line oriented: every line is split on whitespace, double-quoted
//! spans stay atomic (quotes included) and `#` starts a comment that runs to the end
//! of the line. Blank and comment-only lines produce no tokens.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated string literal on line {line}")]
    UnterminatedString { line: usize },
}

/// A single source token.
///
/// The text is shared, so copying token spans into function bodies or macro
/// expansions never reallocates the underlying strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    text: Rc<str>,
    line: usize,
}

impl Token {
    /// Create a token
    pub fn new(
        text: impl Into<Rc<str>>,
        line: usize,
    ) -> Self {
        Self {
            text: text.into(),
            line,
        }
    }

    /// Raw token text, quotes included
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based source line
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Whether the token is a complete double-quoted literal
    pub fn is_quoted(&self) -> bool {
        is_quoted(&self.text)
    }

    /// The token text with surrounding quotes stripped and escapes applied.
    /// Bare tokens are returned unchanged.
    pub fn unquoted(&self) -> String {
        unquote(&self.text)
    }

    /// Same text, different line (used when splicing macro bodies)
    pub fn relocated(
        &self,
        line: usize,
    ) -> Self {
        Self {
            text: Rc::clone(&self.text),
            line,
        }
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.text
    }
}

impl PartialEq<str> for Token {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        &*self.text == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        &*self.text == *other
    }
}

impl fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Whether `text` looks like a name: `[_XID_Start][XID_Continue]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

/// Whether `text` is a complete double-quoted literal
pub fn is_quoted(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

/// Strip surrounding quotes and process `\n`, `\t`, `\"` and `\\`.
pub fn unquote(text: &str) -> String {
    if !is_quoted(text) {
        return text.to_string();
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub use tokenizer::tokenize;

/// Tokenize source code
mod tokenizer {
    use super::*;
    use std::iter::Peekable;
    use std::str::CharIndices;

    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        for (index, line) in source.lines().enumerate() {
            LineLexer::new(line, index + 1).run(&mut tokens)?;
        }
        Ok(tokens)
    }

    struct LineLexer<'a> {
        source: &'a str,
        chars: Peekable<CharIndices<'a>>,
        line: usize,
    }

    impl<'a> LineLexer<'a> {
        fn new(
            source: &'a str,
            line: usize,
        ) -> Self {
            Self {
                source,
                chars: source.char_indices().peekable(),
                line,
            }
        }

        fn run(
            mut self,
            tokens: &mut Vec<Token>,
        ) -> Result<(), LexError> {
            loop {
                self.skip_whitespace();
                let Some(&(start, c)) = self.chars.peek() else {
                    return Ok(());
                };
                if c == '#' {
                    return Ok(());
                }
                let end = self.scan_token(start)?;
                tokens.push(Token::new(&self.source[start..end], self.line));
            }
        }

        fn skip_whitespace(&mut self) {
            while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
                self.chars.next();
            }
        }

        /// Scan one token. A quote anywhere in a bare token (`name="Bob Smith"`)
        /// opens a span that may contain whitespace.
        fn scan_token(
            &mut self,
            start: usize,
        ) -> Result<usize, LexError> {
            let mut end = start;
            while let Some(&(offset, c)) = self.chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                self.chars.next();
                end = offset + c.len_utf8();
                if c == '"' {
                    end = self.scan_string()?;
                }
            }
            Ok(end)
        }

        /// Consume up to and including the closing quote; returns the end offset.
        fn scan_string(&mut self) -> Result<usize, LexError> {
            while let Some((offset, c)) = self.chars.next() {
                match c {
                    '\\' => {
                        self.chars.next();
                    }
                    '"' => return Ok(offset + 1),
                    _ => {}
                }
            }
            Err(LexError::UnterminatedString { line: self.line })
        }
    }
}

#[cfg(test)]
mod tests;
