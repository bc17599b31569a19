//! TechLang
//!
//! A line-oriented scripting language in which every whitespace-separated token
//! is either a command or an operand of the command before it.
//!
//! # Example
//!
//! ```
//! let output = techlang::run("boot ping ping print");
//! assert_eq!(output, "2");
//! ```
//!
//! Programs never abort on a runtime error: the error is printed as an
//! `[Error: ...]` line and execution resumes with the next command.

#![doc(html_root_url = "https://docs.rs/techlang")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod backends;
pub mod frontend;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use backends::interpreter::{CommandRegistry, Handler, Interpreter};
pub use backends::Executor;
pub use runtime::{GlobalState, RuntimeError, Value};
pub use util::config::{Config, InterpreterConfig};

use ::std::fs;
use ::std::path::Path;

use tracing::debug;

/// Language version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language name
pub const NAME: &str = "TechLang";

/// Run `source` with the default configuration and return its output, one
/// line per printed value.
pub fn run(source: &str) -> String {
    run_with_config(source, InterpreterConfig::default())
}

/// Run `source` with a custom configuration
pub fn run_with_config(
    source: &str,
    config: InterpreterConfig,
) -> String {
    debug!("run called ({} bytes)", source.len());
    let mut interp = Interpreter::with_config(config);
    interp.run(source);
    interp.state().output_text()
}

/// Run a source file. `import` looks next to the file first.
pub fn run_file(path: &Path) -> Result<String> {
    run_file_with_config(path, InterpreterConfig::default())
}

/// Run a source file with a custom configuration
pub fn run_file_with_config(
    path: &Path,
    config: InterpreterConfig,
) -> Result<String> {
    debug!("Running file: {}", path.display());
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let mut interp = Interpreter::with_config(config);
    if let Some(dir) = path.parent() {
        interp.set_base_dir(dir);
    }
    interp.run(&source);
    Ok(interp.state().output_text())
}
