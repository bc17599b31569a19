//! REPL Completer
//!
//! Provides completion candidates for rustyline from command words and the
//! names the session has defined so far.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;

/// REPL Completer
///
/// Holds a snapshot of known words; the REPL refreshes it after every chunk.
#[derive(Debug, Default)]
pub struct REPLCompleter {
    words: Vec<String>,
}

impl REPLCompleter {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn set_words(
        &mut self,
        words: Vec<String>,
    ) {
        self.words = words;
    }

    /// Candidates for the word ending at `pos`
    pub fn candidates(
        &self,
        line: &str,
        pos: usize,
    ) -> (usize, Vec<Pair>) {
        let start = line[..pos]
            .rfind(char::is_whitespace)
            .map_or(0, |i| i + 1);
        let word = &line[start..pos];
        if word.is_empty() {
            return (start, Vec::new());
        }
        let pairs = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w.clone(),
            })
            .collect();
        (start, pairs)
    }
}

impl Completer for REPLCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for REPLCompleter {
    type Hint = String;
}

impl Highlighter for REPLCompleter {}

impl Validator for REPLCompleter {}

impl Helper for REPLCompleter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates() {
        let completer = REPLCompleter::new(vec![
            "print".to_string(),
            "ping".to_string(),
            "pack".to_string(),
        ]);
        let (start, pairs) = completer.candidates("boot pri", 8);
        assert_eq!(start, 5);
        let names: Vec<&str> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, ["print"]);

        let (_, pairs) = completer.candidates("p", 1);
        assert_eq!(pairs.len(), 3);
        assert!(completer.candidates("boot ", 5).1.is_empty());
    }
}
