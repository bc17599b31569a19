//! Runtime values
//!
//! Every table in the global state stores [`Value`]s (or a specialisation of them).
//! Arrays and mappings are shared, mutable containers: two names bound to the same
//! array see each other's writes, and identity checks compare storage, not contents.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::frontend::lexer::{is_quoted, unquote};
use crate::runtime::function::FunctionRef;

/// Shared array storage
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared mapping storage (insertion ordered)
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Create fresh array storage
pub fn new_array(items: Vec<Value>) -> ArrayRef {
    Rc::new(RefCell::new(items))
}

/// Create fresh mapping storage
pub fn new_map(entries: IndexMap<String, Value>) -> MapRef {
    Rc::new(RefCell::new(entries))
}

/// Value kind, used in diagnostics and `instanceof`-style checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Unset,
    Int,
    Float,
    String,
    Array,
    Map,
    Instance,
    Function,
}

impl fmt::Display for ValueType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            ValueType::Unset => "unset",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Map => "map",
            ValueType::Instance => "instance",
            ValueType::Function => "function",
        };
        f.write_str(name)
    }
}

/// A TechLang value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent
    #[default]
    Unset,
    Int(i64),
    Float(f64),
    Str(String),
    Array(ArrayRef),
    Map(MapRef),
    /// Class instance, by instance name
    Instance(String),
    /// Closure, partial application or composition
    Function(FunctionRef),
}

impl Value {
    /// Interpret a literal token: quoted text, integer, float, or bare word.
    pub fn from_literal(text: &str) -> Value {
        if is_quoted(text) {
            return Value::Str(unquote(text));
        }
        parse_number(text).unwrap_or_else(|| Value::Str(text.to_string()))
    }

    /// The kind of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Unset => ValueType::Unset,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Instance(_) => ValueType::Instance,
            Value::Function(_) => ValueType::Function,
        }
    }

    /// Integer view; numeric-looking strings coerce, floats must be integral.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Str(s) => match parse_number(s.trim())? {
                Value::Int(n) => Some(n),
                Value::Float(f) if f.fract() == 0.0 => Some(f as i64),
                _ => None,
            },
            _ => None,
        }
    }

    /// Float view; integers widen, numeric-looking strings coerce.
    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => match parse_number(s.trim())? {
                Value::Int(n) => Some(n as f64),
                Value::Float(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Numeric view that keeps integers integral
    pub fn to_number(&self) -> Option<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Some(self.clone()),
            Value::Str(s) => parse_number(s.trim()),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Unset => false,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty() && s != "0",
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::Instance(_) | Value::Function(_) => true,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Whether two values share storage. Containers compare by pointer,
    /// everything else by value.
    pub fn same_identity(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Array(_) | Value::Map(_) | Value::Function(_), _)
            | (_, Value::Array(_) | Value::Map(_) | Value::Function(_)) => false,
            _ => self == other,
        }
    }

    /// Ordering for comparison commands: numeric when both sides are numeric,
    /// otherwise lexicographic on the displayed text.
    pub fn compare(
        &self,
        other: &Value,
    ) -> Option<Ordering> {
        match (self.to_float(), other.to_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (self, other) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                (Value::Unset, _) | (_, Value::Unset) => None,
                _ => Some(self.to_string().cmp(&other.to_string())),
            },
        }
    }

    /// Nested rendering: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

/// Parse an integer or a plain decimal float. Words like `inf` or `nan` stay words.
pub fn parse_number(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }
    let digits = text.trim_start_matches(['-', '+']);
    let numeric = !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
        && digits.chars().any(|c| c.is_ascii_digit());
    if numeric {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        None
    }
}

/// Render a float the way scripts expect: integral floats keep a `.0`.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Value::Unset, Value::Unset) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.to_float() == other.to_float()
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Unset => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                let items: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map(entries) => {
                let entries: Vec<String> = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("\"{}\": {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Instance(name) => write!(f, "<instance {}>", name),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(b as i64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests;
