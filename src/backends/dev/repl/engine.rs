//! REPL evaluation engine
//!
//! Input is buffered line by line until every block it opens is closed; the
//! completed chunk then runs against a long-lived interpreter, so definitions
//! persist from one chunk to the next.

use tracing::debug;

use crate::backends::interpreter::Interpreter;
use crate::backends::Executor;
use crate::frontend::blocks::is_complete;
use crate::frontend::lexer::tokenize;
use crate::runtime::value::Value;
use crate::util::config::InterpreterConfig;

/// Result of feeding one line
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// A block is still open; keep reading
    Incomplete,
    /// The chunk ran and printed these lines
    Output(Vec<String>),
}

/// Buffering evaluator shared by the line REPL and tests
#[derive(Debug)]
pub struct Evaluator {
    interpreter: Interpreter,
    buffer: String,
    eval_count: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Evaluator {
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            interpreter: Interpreter::with_config(config),
            buffer: String::new(),
            eval_count: 0,
        }
    }

    /// Add a line of input. Runs the buffered chunk once it is complete.
    ///
    /// A chunk that fails to tokenize is run anyway so the lexer error gets
    /// reported instead of swallowing every following line.
    pub fn feed(
        &mut self,
        line: &str,
    ) -> EvalResult {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        if let Ok(tokens) = tokenize(&self.buffer) {
            if !is_complete(&tokens) {
                return EvalResult::Incomplete;
            }
        }
        let source = std::mem::take(&mut self.buffer);
        self.eval_count += 1;
        debug!(chunk = self.eval_count, bytes = source.len(), "evaluating chunk");
        EvalResult::Output(self.interpreter.run_source(&source))
    }

    /// Whether part of a block has been entered
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop a half-entered block
    pub fn cancel(&mut self) {
        self.buffer.clear();
    }

    /// Clear program state and any pending input
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.interpreter.reset();
    }

    pub fn eval_count(&self) -> usize {
        self.eval_count
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Every bound name with its current value, in definition order per kind
    pub fn variables(&self) -> Vec<(String, String)> {
        let state = self.interpreter.state();
        let mut vars: Vec<(String, String)> = state
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        vars.extend(
            state
                .strings
                .iter()
                .map(|(name, s)| (name.clone(), format!("{:?}", s))),
        );
        vars.extend(
            state
                .arrays
                .iter()
                .map(|(name, items)| (name.clone(), Value::Array(items.clone()).to_string())),
        );
        vars.extend(
            state
                .maps
                .iter()
                .map(|(name, entries)| (name.clone(), Value::Map(entries.clone()).to_string())),
        );
        vars.extend(
            state
                .instances
                .iter()
                .map(|(name, instance)| (name.clone(), format!("<{} instance>", instance.class))),
        );
        vars
    }

    /// Words offered for completion: commands plus every defined name
    pub fn words(&self) -> Vec<String> {
        let state = self.interpreter.state();
        let mut words: Vec<String> = self
            .interpreter
            .registry()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        words.extend(state.variables.keys().cloned());
        words.extend(state.strings.keys().cloned());
        words.extend(state.arrays.keys().cloned());
        words.extend(state.maps.keys().cloned());
        words.extend(state.functions.keys().cloned());
        words.extend(state.classes.names().cloned());
        words.extend(state.instances.keys().cloned());
        words.sort();
        words.dedup();
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(result: EvalResult) -> Vec<String> {
        match result {
            EvalResult::Output(lines) => lines,
            EvalResult::Incomplete => panic!("chunk should be complete"),
        }
    }

    #[test]
    fn test_single_line() {
        let mut eval = Evaluator::default();
        assert_eq!(output(eval.feed("boot ping print")), ["1"]);
        assert_eq!(eval.eval_count(), 1);
    }

    #[test]
    fn test_multi_line_block() {
        let mut eval = Evaluator::default();
        assert_eq!(eval.feed("loop 3"), EvalResult::Incomplete);
        assert!(eval.is_pending());
        assert_eq!(eval.feed("ping"), EvalResult::Incomplete);
        assert_eq!(output(eval.feed("end")), Vec::<String>::new());
        assert_eq!(output(eval.feed("print")), ["3"]);
        assert!(!eval.is_pending());
    }

    #[test]
    fn test_state_persists_between_chunks() {
        let mut eval = Evaluator::default();
        eval.feed("def twice x");
        eval.feed("mul x 2");
        eval.feed("return x");
        eval.feed("end");
        assert_eq!(output(eval.feed("call twice 21 -> r")), Vec::<String>::new());
        assert_eq!(output(eval.feed("print r")), ["42"]);
    }

    #[test]
    fn test_cancel_and_reset() {
        let mut eval = Evaluator::default();
        eval.feed("set x 5");
        eval.feed("if x > 1");
        eval.cancel();
        assert!(!eval.is_pending());
        assert_eq!(output(eval.feed("print x")), ["5"]);
        eval.reset();
        assert_eq!(
            output(eval.feed("print x")),
            ["[Error: Variable 'x' is not defined.]"]
        );
    }

    #[test]
    fn test_variables_and_words() {
        let mut eval = Evaluator::default();
        eval.feed("set n 3");
        eval.feed("str_create s \"hi\"");
        eval.feed("pack xs 1 2");
        let vars = eval.variables();
        assert!(vars.contains(&("n".to_string(), "3".to_string())));
        assert!(vars.contains(&("s".to_string(), "\"hi\"".to_string())));
        assert!(vars.contains(&("xs".to_string(), "[1, 2]".to_string())));
        let words = eval.words();
        assert!(words.iter().any(|w| w == "print"));
        assert!(words.iter().any(|w| w == "xs"));
    }
}
