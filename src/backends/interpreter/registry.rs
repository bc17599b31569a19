//! Command registry
//!
//! Maps command words to handlers. Every command family, built in or supplied by
//! an embedding host, registers under the same contract:
//!
//! ```text
//! handler(interpreter, tokens, index) -> Ok(Step { consumed, flow }) | Err(Failure)
//! ```
//!
//! `tokens[index]` is the command word itself; `consumed` counts the tokens after
//! it that the invocation claimed, nested blocks and their `end` included.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::backends::interpreter::commands;
use crate::backends::interpreter::Interpreter;
use crate::frontend::lexer::Token;
use crate::runtime::flow::CommandResult;

/// Type alias for command handlers.
pub type Handler = fn(&mut Interpreter, &[Token], usize) -> CommandResult;

/// Words that delimit operand lists without being commands themselves.
pub const STRUCTURAL_KEYWORDS: &[&str] = &[
    "end", "do", "else", "catch", "case", "case_or", "case_list", "case_dict", "default", "extends",
    "field", "method", "static", "init", "->",
];

static BUILTIN: Lazy<Arc<CommandRegistry>> = Lazy::new(|| Arc::new(CommandRegistry::builtin()));

/// Command word → handler table.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry")
            .field("handlers_count", &self.handlers.len())
            .field("commands", &names)
            .finish()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with every built-in command family.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        commands::register_all(&mut registry);
        registry
    }

    /// The shared built-in registry.
    pub fn shared() -> Arc<CommandRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Register a command, replacing any previous handler for the same word.
    pub fn register(
        &mut self,
        name: &str,
        handler: Handler,
    ) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Handler for a command word.
    #[inline]
    pub fn get(
        &self,
        name: &str,
    ) -> Option<Handler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command words, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Whether `word` ends an operand list: a command or a structural keyword.
    pub fn is_boundary(
        &self,
        word: &str,
    ) -> bool {
        self.contains(word) || STRUCTURAL_KEYWORDS.contains(&word)
    }
}
