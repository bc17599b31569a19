//! TechLang - CLI

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use techlang::backends::dev::LineREPL;
use techlang::frontend::prepare;
use techlang::util::config::{self, Config};
use techlang::util::logger::{self, LogLevel};
use techlang::{run_file_with_config, run_with_config, Interpreter, NAME, VERSION};

/// A line-oriented scripting language where every token is a command
#[derive(Parser, Debug)]
#[command(name = "techlang")]
#[command(author = "TechLang Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Define a preprocessor flag (NAME or NAME=VALUE)
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", global = true)]
    defines: Vec<String>,

    /// Iteration ceiling for while loops
    #[arg(long, value_name = "N", global = true)]
    max_iterations: Option<usize>,

    /// Nested call limit
    #[arg(long, value_name = "N", global = true)]
    max_depth: Option<usize>,

    /// Read configuration from this file instead of techlang.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a TechLang source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate TechLang code from command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Start the interactive REPL (default)
    Repl,

    /// Print the token stream of a source file after macro and alias expansion
    Tokens {
        /// Source file to tokenize
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print version information
    Version,
}

/// Effective configuration: the config file, then command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => config::load_config_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?
            .with_context(|| format!("Config file not found: {}", path.display()))?,
        None => config::load_config().unwrap_or_else(|e| {
            tracing::warn!("ignoring configuration: {}", e);
            Config::default()
        }),
    };
    for define in &args.defines {
        config.interpreter.define(define);
    }
    if let Some(n) = args.max_iterations {
        config.interpreter.max_loop_iterations = n;
    }
    if let Some(n) = args.max_depth {
        config.interpreter.max_call_depth = n;
    }
    Ok(config)
}

/// Program output goes to stdout; error lines are red on a terminal when
/// colors are enabled.
fn print_output(
    output: &str,
    colors: bool,
) {
    let colored = colors && std::io::stdout().is_terminal();
    for line in output.lines() {
        if colored && line.starts_with("[Error:") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(LogLevel::from_verbosity(args.verbose));
    tracing::debug!("{} {} on {}", NAME, VERSION, std::env::consts::OS);

    let config = load_config(&args)?;

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Run { file } => {
            let output = run_file_with_config(&file, config.interpreter)
                .with_context(|| format!("Failed to run: {}", file.display()))?;
            print_output(&output, config.repl.colors);
        }
        Commands::Eval { code } => {
            print_output(&run_with_config(&code, config.interpreter), config.repl.colors);
        }
        Commands::Repl => {
            let mut repl = LineREPL::new(config.interpreter, config.repl)?;
            repl.run()?;
        }
        Commands::Tokens { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            // defines seed the state that macro guards read
            let mut interp = Interpreter::with_config(config.interpreter);
            let state = interp.state_mut();
            let tokens = prepare(&source, state)?;
            for line in state.take_output() {
                eprintln!("{}", line);
            }
            for token in tokens {
                println!("{:>4}  {}", token.line(), token.text());
            }
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
