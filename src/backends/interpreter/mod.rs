//! Interpreter backend for TechLang
//!
//! The interpreter walks the prepared token stream directly. Every command word
//! is looked up in a [`CommandRegistry`] and handed to its handler, which claims
//! the operands and nested blocks it needs.

pub mod call;
pub mod commands;
pub mod cursor;
pub mod executor;
pub mod frames;
pub mod registry;

pub use cursor::Cursor;
pub use executor::Interpreter;
pub use frames::CallFrame;
pub use registry::{CommandRegistry, Handler, STRUCTURAL_KEYWORDS};
