//! Interpreter executor for TechLang
//!
//! The dispatch loop walks a token span and hands every recognised command word
//! to its handler. A handler reports how many following tokens it claimed and
//! what control signal its body produced; the loop advances past the claim and
//! stops early on anything but [`Flow::Normal`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::backends::interpreter::frames::BoundScope;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::Executor;
use crate::frontend::{self, Token};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::Flow;
use crate::runtime::state::GlobalState;
use crate::runtime::value::Value;
use crate::util::config::InterpreterConfig;

/// The TechLang interpreter
pub struct Interpreter {
    /// Global state shared by every handler
    pub(crate) state: GlobalState,
    /// Command word → handler
    registry: Arc<CommandRegistry>,
    /// Configuration
    pub(crate) config: InterpreterConfig,
    /// Active call frames
    pub(crate) depth: usize,
    /// Instances whose methods are currently running, innermost last
    pub(crate) receivers: Vec<BoundScope>,
    /// Modules whose functions are currently running, innermost last
    pub(crate) module_scopes: Vec<BoundScope>,
    /// Directory of the file being run; searched first by `import`
    pub(crate) base_dir: Option<PathBuf>,
}

impl fmt::Debug for Interpreter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("depth", &self.depth)
            .field("receivers", &self.receivers)
            .field("module_scopes", &self.module_scopes)
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create a new interpreter with default configuration
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// Create an interpreter with custom configuration
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::with_registry(config, CommandRegistry::shared())
    }

    /// Create an interpreter dispatching through a custom registry, e.g. the
    /// built-in one extended with host commands.
    pub fn with_registry(
        config: InterpreterConfig,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        let mut interp = Self {
            state: GlobalState::new(),
            registry,
            config,
            depth: 0,
            receivers: Vec::new(),
            module_scopes: Vec::new(),
            base_dir: None,
        };
        interp.seed_defines();
        interp
    }

    /// Directory searched first by `import`
    pub fn set_base_dir(
        &mut self,
        dir: impl Into<PathBuf>,
    ) {
        self.base_dir = Some(dir.into());
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub(crate) fn shared_registry(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GlobalState {
        &mut self.state
    }

    /// Clear all program state, keeping configuration and the set of
    /// already-imported files.
    pub fn reset(&mut self) {
        self.state.reset();
        self.depth = 0;
        self.receivers.clear();
        self.module_scopes.clear();
        self.seed_defines();
    }

    /// Drain the output buffer
    pub fn take_output(&mut self) -> Vec<String> {
        self.state.take_output()
    }

    /// Whether `word` ends an operand list
    #[inline]
    pub fn is_boundary(
        &self,
        word: &str,
    ) -> bool {
        self.registry.is_boundary(word)
    }

    /// Seed configured defines into the variable table
    fn seed_defines(&mut self) {
        let defines: Vec<(String, Value)> = self
            .config
            .defines
            .iter()
            .map(|(name, value)| (name.clone(), define_value(value)))
            .collect();
        for (name, value) in defines {
            self.state.assign(&name, value);
        }
    }

    /// Tokenize, preprocess and execute `source` against the current state.
    pub fn run(
        &mut self,
        source: &str,
    ) {
        match frontend::prepare(source, &mut self.state) {
            Ok(tokens) => {
                debug!(tokens = tokens.len(), "executing program");
                self.execute(&tokens);
            }
            Err(err) => {
                self.state
                    .report(&RuntimeError::message(err.to_string()));
            }
        }
    }

    /// The dispatch loop.
    ///
    /// Unknown words are skipped. A failing handler is reported and the loop
    /// advances past whatever the failure claimed.
    pub fn execute(
        &mut self,
        tokens: &[Token],
    ) -> Flow {
        let mut i = 0;
        while i < tokens.len() {
            let word = tokens[i].text();
            let Some(handler) = self.registry.get(word) else {
                trace!(token = word, line = tokens[i].line(), "skipping unknown token");
                i += 1;
                continue;
            };
            trace!(command = word, line = tokens[i].line(), "dispatch");
            match handler(self, tokens, i) {
                Ok(step) => {
                    i += 1 + step.consumed;
                    if !step.flow.is_normal() {
                        return step.flow;
                    }
                }
                Err(failure) => {
                    self.state.report(&failure.error);
                    i += 1 + failure.consumed;
                }
            }
        }
        Flow::Normal
    }
}

fn define_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::Integer(n) => Value::Int(*n),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::from(*b),
        toml::Value::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

impl Executor for Interpreter {
    fn execute(
        &mut self,
        tokens: &[Token],
    ) -> Flow {
        Interpreter::execute(self, tokens)
    }

    fn run_source(
        &mut self,
        source: &str,
    ) -> Vec<String> {
        let before = self.state.output.len();
        self.run(source);
        self.state.output.split_off(before)
    }

    fn reset(&mut self) {
        Interpreter::reset(self);
    }

    fn state(&self) -> &GlobalState {
        Interpreter::state(self)
    }
}
