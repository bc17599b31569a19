//! Development tools for TechLang
//!
//! - REPL: interactive evaluation with multi-line blocks and history

pub mod repl;

pub use repl::{Evaluator, LineREPL};
