//! Runtime errors
//!
//! Nothing a program does is fatal to the interpreter. Handlers return these errors,
//! the engine turns them into `[Error: ...]` output lines, bumps the error counter
//! that `try` watches, and keeps going.

/// Errors raised while preprocessing or executing a program
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Malformed invocation
    #[error("Invalid '{command}' command. Use: {usage}")]
    Usage { command: String, usage: &'static str },
    #[error("Variable '{0}' is not defined.")]
    UndefinedVariable(String),
    #[error("Function '{0}' is not defined.")]
    UndefinedFunction(String),
    #[error("Class '{0}' is not defined.")]
    UndefinedClass(String),
    #[error("Instance '{0}' does not exist.")]
    UndefinedInstance(String),
    #[error("Field '{field}' does not exist on '{owner}'.")]
    UndefinedField { owner: String, field: String },
    #[error("Method '{method}' is not defined for class '{class}'.")]
    UndefinedMethod { class: String, method: String },
    #[error("Macro '{0}' is not defined.")]
    UndefinedMacro(String),
    #[error("Array '{0}' does not exist.")]
    UndefinedArray(String),
    #[error("Dictionary '{0}' does not exist.")]
    UndefinedMap(String),
    #[error("Struct type '{0}' is not defined.")]
    UndefinedStructType(String),
    #[error("Struct '{0}' does not exist.")]
    UndefinedStruct(String),
    #[error("Key '{key}' not found in dictionary '{map}'.")]
    MissingKey { map: String, key: String },
    #[error("Index {index} out of range for array '{array}'.")]
    IndexOutOfRange { array: String, index: i64 },
    #[error("{0}")]
    Type(String),
    #[error("Cannot divide by zero")]
    DivisionByZero,
    #[error("Macro '{name}' expects {expected} argument(s) but got {got}.")]
    MacroArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Recursive macro expansion detected: {0}")]
    MacroCycle(String),
    #[error("Missing required argument '{param}' for function '{function}'.")]
    MissingArgument { function: String, param: String },
    #[error("Unexpected keyword argument '{param}' for function '{function}'.")]
    UnexpectedKeyword { function: String, param: String },
    #[error("Function '{function}' expects at most {expected} argument(s) but got {got}.")]
    TooManyArguments {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("Circular inheritance detected: {0}")]
    InheritanceCycle(String),
    #[error("Missing 'end' for '{0}' block")]
    UnterminatedBlock(String),
    #[error("Loop exceeded maximum iterations ({0})")]
    LoopLimit(usize),
    #[error("Maximum call depth ({0}) exceeded")]
    RecursionLimit(usize),
    #[error("Cannot import module '{module}': {reason}")]
    Import { module: String, reason: String },
    /// Raised by `throw`/`raise`
    #[error("{}", thrown_text(.kind, .message))]
    Thrown {
        message: String,
        kind: Option<String>,
    },
    #[error("{0}")]
    Message(String),
}

fn thrown_text(
    kind: &Option<String>,
    message: &str,
) -> String {
    match kind {
        Some(kind) => format!("{}: {}", kind, message),
        None => message.to_string(),
    }
}

impl RuntimeError {
    /// Usage error for `command`
    pub fn usage(
        command: impl Into<String>,
        usage: &'static str,
    ) -> Self {
        RuntimeError::Usage {
            command: command.into(),
            usage,
        }
    }

    /// Free-form error message
    pub fn message(text: impl Into<String>) -> Self {
        RuntimeError::Message(text.into())
    }

    /// Exception type name visible to `catch err kind`
    pub fn kind_name(&self) -> &str {
        match self {
            RuntimeError::Thrown {
                kind: Some(kind), ..
            } => kind,
            RuntimeError::Thrown { kind: None, .. } => "Exception",
            RuntimeError::Usage { .. }
            | RuntimeError::MacroArity { .. }
            | RuntimeError::MacroCycle(_)
            | RuntimeError::UnterminatedBlock(_) => "SyntaxError",
            RuntimeError::UndefinedVariable(_)
            | RuntimeError::UndefinedFunction(_)
            | RuntimeError::UndefinedClass(_)
            | RuntimeError::UndefinedInstance(_)
            | RuntimeError::UndefinedMacro(_)
            | RuntimeError::UndefinedArray(_)
            | RuntimeError::UndefinedMap(_)
            | RuntimeError::UndefinedStructType(_)
            | RuntimeError::UndefinedStruct(_) => "NameError",
            RuntimeError::UndefinedField { .. } | RuntimeError::UndefinedMethod { .. } => {
                "AttributeError"
            }
            RuntimeError::MissingKey { .. } => "KeyError",
            RuntimeError::IndexOutOfRange { .. } => "IndexError",
            RuntimeError::Type(_)
            | RuntimeError::MissingArgument { .. }
            | RuntimeError::UnexpectedKeyword { .. }
            | RuntimeError::TooManyArguments { .. } => "TypeError",
            RuntimeError::DivisionByZero => "ZeroDivisionError",
            RuntimeError::RecursionLimit(_)
            | RuntimeError::LoopLimit(_)
            | RuntimeError::InheritanceCycle(_) => "RecursionError",
            RuntimeError::Import { .. } => "ImportError",
            RuntimeError::Message(_) => "RuntimeError",
        }
    }

    /// Attach a consumption count for the dispatch loop
    pub fn consuming(
        self,
        consumed: usize,
    ) -> Failure {
        Failure {
            error: self,
            consumed,
        }
    }
}

/// The error arm of a command handler: the error to report and how many tokens
/// after the command word the engine should skip.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub error: RuntimeError,
    pub consumed: usize,
}

impl From<RuntimeError> for Failure {
    fn from(error: RuntimeError) -> Self {
        Failure { error, consumed: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_display() {
        let plain = RuntimeError::Thrown {
            message: "boom".into(),
            kind: None,
        };
        assert_eq!(plain.to_string(), "boom");
        assert_eq!(plain.kind_name(), "Exception");

        let typed = RuntimeError::Thrown {
            message: "Invalid value".into(),
            kind: Some("ValueError".into()),
        };
        assert_eq!(typed.to_string(), "ValueError: Invalid value");
        assert_eq!(typed.kind_name(), "ValueError");
    }

    #[test]
    fn test_messages() {
        let err = RuntimeError::MacroArity {
            name: "twice".into(),
            expected: 1,
            got: 0,
        };
        assert_eq!(err.to_string(), "Macro 'twice' expects 1 argument(s) but got 0.");
        assert_eq!(
            RuntimeError::MacroCycle("a -> b -> a".into()).to_string(),
            "Recursive macro expansion detected: a -> b -> a"
        );
        assert_eq!(RuntimeError::DivisionByZero.kind_name(), "ZeroDivisionError");
    }

    #[test]
    fn test_failure_from_error() {
        let failure: Failure = RuntimeError::UndefinedVariable("x".into()).into();
        assert_eq!(failure.consumed, 0);
        assert_eq!(
            RuntimeError::DivisionByZero.consuming(2).consumed,
            2
        );
    }
}
