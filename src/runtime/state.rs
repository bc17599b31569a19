//! Global interpreter state
//!
//! One flat namespace split into independent tables. A name may live in several
//! tables at once (`set x 1` and `array_create x` coexist); which table a command
//! reads or writes is decided by the command. Generic assignment keeps the scalar
//! and string tables mutually exclusive for a given name so that the most recent
//! scalar write is the one that resolves.

use std::path::PathBuf;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::frontend::lexer::{is_identifier, Token};
use crate::frontend::preprocess::MacroDef;
use crate::runtime::class::{ClassInstance, ClassTable, StructDef, StructInstance};
use crate::runtime::error::RuntimeError;
use crate::runtime::function::{FunctionDef, FunctionRef};
use crate::runtime::value::{parse_number, ArrayRef, MapRef, Value};

/// The most recent reported error, as seen by `catch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedError {
    pub message: String,
    pub kind: String,
}

/// What an imported module keeps between calls into it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleState {
    pub path: PathBuf,
    /// Module-level variables, strings, arrays and mappings
    pub globals: IndexMap<String, Value>,
}

/// Mutable root shared by every command handler
#[derive(Debug, Default)]
pub struct GlobalState {
    /// Accumulator driven by `ping`/`crash`/`hack`
    pub accumulator: i64,
    /// `upload`/`download` stack
    pub value_stack: Vec<i64>,

    pub variables: IndexMap<String, Value>,
    pub strings: IndexMap<String, String>,
    pub arrays: IndexMap<String, ArrayRef>,
    pub maps: IndexMap<String, MapRef>,
    pub structs: IndexMap<String, StructInstance>,
    pub instances: IndexMap<String, ClassInstance>,

    pub functions: IndexMap<String, Rc<FunctionDef>>,
    pub classes: ClassTable,
    pub struct_defs: IndexMap<String, StructDef>,
    pub macros: IndexMap<String, Rc<MacroDef>>,
    pub aliases: IndexMap<String, String>,
    pub fn_values: IndexMap<String, FunctionRef>,
    /// Imported modules by export prefix
    pub modules: IndexMap<String, ModuleState>,

    /// Last error reported, for `catch err kind`
    pub last_error: Option<RaisedError>,
    /// Errors reported so far; `try` compares before and after its body
    pub error_count: usize,

    pub output: Vec<String>,
    /// Module files already imported; survives `reset`
    pub loaded_files: IndexSet<PathBuf>,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything except the loaded-file bookkeeping
    pub fn reset(&mut self) {
        let loaded_files = std::mem::take(&mut self.loaded_files);
        *self = GlobalState {
            loaded_files,
            ..GlobalState::default()
        };
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Append an output line
    pub fn emit(
        &mut self,
        line: impl Into<String>,
    ) {
        self.output.push(line.into());
    }

    /// Record an error: emits `[Error: ...]` and arms `try`.
    pub fn report(
        &mut self,
        error: &RuntimeError,
    ) {
        let message = error.to_string();
        debug!(kind = error.kind_name(), "{}", message);
        self.output.push(format!("[Error: {}]", message));
        self.error_count += 1;
        self.last_error = Some(RaisedError {
            message: match error {
                RuntimeError::Thrown { message, .. } => message.clone(),
                _ => message,
            },
            kind: error.kind_name().to_string(),
        });
    }

    /// Drain the output buffer
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// The output buffer joined by newlines
    pub fn output_text(&self) -> String {
        self.output.join("\n")
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Scalar view of a name: numeric variables, then strings
    pub fn scalar(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.variables
            .get(name)
            .cloned()
            .or_else(|| self.strings.get(name).map(|s| Value::Str(s.clone())))
    }

    /// Any value bound to `name`, probing tables in a fixed order.
    pub fn lookup(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.scalar(name)
            .or_else(|| self.arrays.get(name).map(|a| Value::Array(Rc::clone(a))))
            .or_else(|| self.maps.get(name).map(|m| Value::Map(Rc::clone(m))))
            .or_else(|| self.fn_values.get(name).map(|f| Value::Function(Rc::clone(f))))
            .or_else(|| {
                self.instances
                    .contains_key(name)
                    .then(|| Value::Instance(name.to_string()))
            })
    }

    /// Value of an operand token: a quoted literal, a bound name, a number, or
    /// the bare word itself.
    pub fn resolve(
        &self,
        token: &Token,
    ) -> Value {
        if token.is_quoted() {
            return Value::Str(token.unquoted());
        }
        self.lookup(token)
            .or_else(|| parse_number(token))
            .unwrap_or_else(|| Value::Str(token.to_string()))
    }

    /// Like [`resolve`](Self::resolve), but an identifier that names nothing is
    /// an error rather than a bare word.
    pub fn resolve_strict(
        &self,
        token: &Token,
    ) -> Result<Value, RuntimeError> {
        if token.is_quoted() {
            return Ok(Value::Str(token.unquoted()));
        }
        if let Some(value) = self.lookup(token).or_else(|| parse_number(token)) {
            return Ok(value);
        }
        if is_identifier(token) {
            Err(RuntimeError::UndefinedVariable(token.to_string()))
        } else {
            Ok(Value::Str(token.to_string()))
        }
    }

    /// Numeric value of an operand
    pub fn number(
        &self,
        token: &Token,
    ) -> Result<Value, RuntimeError> {
        let value = self.resolve_strict(token)?;
        value.to_number().ok_or_else(|| {
            RuntimeError::Type(format!("Expected a number but got '{}'", token.text()))
        })
    }

    /// Instance named by `token`, directly or through a variable holding its name
    /// (`self` inside a method).
    pub fn instance_name(
        &self,
        token: &str,
    ) -> Option<String> {
        if self.instances.contains_key(token) {
            return Some(token.to_string());
        }
        match self.scalar(token)? {
            Value::Instance(name) | Value::Str(name) if self.instances.contains_key(&name) => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether a flag variable is set and truthy
    pub fn flag(
        &self,
        name: &str,
    ) -> bool {
        self.scalar(name).is_some_and(|v| v.to_bool())
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Bind `name` in the table matching the value's kind.
    pub fn assign(
        &mut self,
        name: &str,
        value: Value,
    ) {
        match value {
            Value::Str(s) => {
                self.variables.shift_remove(name);
                self.strings.insert(name.to_string(), s);
            }
            Value::Array(items) => {
                self.arrays.insert(name.to_string(), items);
            }
            Value::Map(entries) => {
                self.maps.insert(name.to_string(), entries);
            }
            Value::Function(function) => {
                self.fn_values.insert(name.to_string(), function);
            }
            scalar => {
                self.strings.shift_remove(name);
                self.variables.insert(name.to_string(), scalar);
            }
        }
    }
}
