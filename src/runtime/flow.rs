//! Control transfer between nested bodies
//!
//! `break`, `continue` and `return` do not set flags on the global state. They
//! surface as a [`Flow`] from the handler that saw them and every enclosing
//! `execute` stops consuming its span until a construct that owns the signal
//! (a loop, a call) absorbs it.

use smallvec::SmallVec;

use crate::runtime::error::Failure;
use crate::runtime::value::Value;

/// Return values and positional arguments; almost always one or two entries.
pub type Values = SmallVec<[Value; 2]>;

/// Outcome of executing a span of tokens
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Flow {
    /// Ran to the end of the span
    #[default]
    Normal,
    /// `break` inside a loop body
    Break,
    /// `continue` inside a loop body
    Continue,
    /// `return v...` inside a callable body
    Return(Values),
}

impl Flow {
    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }

    /// Whether a loop must pass this signal outward instead of absorbing it
    pub fn escapes_loop(&self) -> bool {
        matches!(self, Flow::Return(_))
    }
}

/// What a handler did: how many tokens after the command word it claimed, and
/// the control signal its body produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub consumed: usize,
    pub flow: Flow,
}

impl Step {
    /// Normal completion
    #[inline]
    pub fn new(consumed: usize) -> Self {
        Self {
            consumed,
            flow: Flow::Normal,
        }
    }

    /// Completion carrying a control signal
    #[inline]
    pub fn with_flow(
        consumed: usize,
        flow: Flow,
    ) -> Self {
        Self { consumed, flow }
    }
}

/// Result of a command handler
pub type CommandResult = Result<Step, Failure>;
