//! Line-based REPL with rustyline
//!
//! Provides a REPL using rustyline for editing, completion and history.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{CompletionType, Editor};
use tracing::{debug, warn};

use crate::backends::dev::repl::commands::{CommandHandler, CommandResult};
use crate::backends::dev::repl::engine::{EvalResult, Evaluator};
use crate::util::config::{InterpreterConfig, ReplConfig};
use crate::{NAME, VERSION};

mod completer;
pub use completer::REPLCompleter;

/// Line REPL
pub struct LineREPL {
    /// Configuration
    config: ReplConfig,
    /// rustyline editor
    editor: Editor<REPLCompleter, FileHistory>,
    /// Buffering evaluator
    evaluator: Evaluator,
}

impl LineREPL {
    /// Create with the given interpreter and REPL settings
    pub fn new(
        interpreter: InterpreterConfig,
        config: ReplConfig,
    ) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .max_history_size(config.history_size)
            .context("invalid history size")?
            .build();

        let evaluator = Evaluator::new(interpreter);
        let mut editor: Editor<REPLCompleter, FileHistory> =
            Editor::with_config(rl_config).context("failed to initialise line editor")?;
        editor.set_helper(Some(REPLCompleter::new(evaluator.words())));

        if let Some(history_file) = config.history_path() {
            if history_file.exists() {
                if let Err(e) = editor.load_history(&history_file) {
                    warn!("could not load history from {}: {}", history_file.display(), e);
                }
            }
        }

        Ok(Self {
            config,
            editor,
            evaluator,
        })
    }

    /// Run the REPL until `:quit` or end of input
    pub fn run(&mut self) -> Result<()> {
        println!("{} {} - Type :help for assistance", NAME, VERSION);
        println!("Press Ctrl+D or :quit to exit\n");

        loop {
            let prompt = if self.evaluator.is_pending() {
                self.config.continuation_prompt.clone()
            } else {
                self.config.prompt.clone()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }

                    if !self.evaluator.is_pending() && line.trim_start().starts_with(':') {
                        match CommandHandler::new(&mut self.evaluator).handle(&line) {
                            CommandResult::Exit => break,
                            CommandResult::Continue => {}
                            CommandResult::Output(msg) => println!("{}", msg),
                        }
                        continue;
                    }

                    if let EvalResult::Output(lines) = self.evaluator.feed(&line) {
                        self.print_output(&lines);
                        let words = self.evaluator.words();
                        if let Some(helper) = self.editor.helper_mut() {
                            helper.set_words(words);
                        }
                    }
                }
                Err(ReadlineError::Eof) => break,
                Err(ReadlineError::Interrupted) => {
                    if self.evaluator.is_pending() {
                        self.evaluator.cancel();
                    }
                    println!("(Interrupted)");
                }
                Err(e) => return Err(e).context("failed to read input"),
            }
        }

        if let Some(history_file) = self.config.history_path() {
            if let Err(e) = self.editor.save_history(&history_file) {
                debug!("could not save history to {}: {}", history_file.display(), e);
            }
        }

        Ok(())
    }

    fn print_output(
        &self,
        lines: &[String],
    ) {
        for line in lines {
            if self.config.colors && line.starts_with("[Error:") {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }
}
