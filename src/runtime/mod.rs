//! Runtime data model
//!
//! Values, the global state tables, function and class definitions, control
//! signals and the error taxonomy shared by every command handler.

pub mod class;
pub mod error;
pub mod flow;
pub mod function;
pub mod state;
pub mod value;

pub use error::{Failure, RuntimeError};
pub use flow::{CommandResult, Flow, Step, Values};
pub use state::GlobalState;
pub use value::Value;
