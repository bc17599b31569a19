//! REPL Command Handler
//!
//! Handles special commands starting with ':'.

use super::engine::Evaluator;

/// Command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Exit the REPL
    Exit,
    /// Continue to next input
    Continue,
    /// Output a message
    Output(String),
}

/// Command handler for REPL
pub struct CommandHandler<'a> {
    evaluator: &'a mut Evaluator,
}

impl<'a> CommandHandler<'a> {
    /// Create a new command handler
    pub fn new(evaluator: &'a mut Evaluator) -> Self {
        Self { evaluator }
    }

    /// Handle a command line such as `:vars`
    pub fn handle(
        &mut self,
        line: &str,
    ) -> CommandResult {
        let cmd = line.trim_start_matches(':').trim();
        let name = cmd.split_whitespace().next().unwrap_or("");

        match name {
            "quit" | "q" | "exit" => CommandResult::Exit,
            "help" | "h" => CommandResult::Output(help_text()),
            "reset" | "clear" => {
                self.evaluator.reset();
                CommandResult::Output("State cleared".to_string())
            }
            "vars" | "v" => {
                let vars = self.evaluator.variables();
                if vars.is_empty() {
                    return CommandResult::Output("(no variables)".to_string());
                }
                let lines: Vec<String> = vars
                    .into_iter()
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                CommandResult::Output(lines.join("\n"))
            }
            "" => CommandResult::Continue,
            _ => CommandResult::Output(format!("Unknown command: {}", line.trim())),
        }
    }
}

fn help_text() -> String {
    [
        "Available commands:",
        "  :quit, :exit, :q  - Exit the REPL",
        "  :help, :h         - Show this help",
        "  :reset, :clear    - Clear all program state",
        "  :vars, :v         - List variables",
        "Blocks may span several lines; input runs once every block is closed.",
    ]
    .join("\n")
}
