//! Function definitions, function values and argument binding
//!
//! `def`, `defn`, `defv` and `fn` share one parameter grammar:
//!
//! ```text
//! p          required
//! p=default  optional, literal default
//! *rest      extra positional arguments, bound as an array
//! **kw       unmatched keyword arguments, bound as a mapping
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::frontend::lexer::Token;
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::Values;
use crate::runtime::value::{new_array, new_map, Value};

/// How a parameter receives its value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Required,
    Default(Value),
    Rest,
    KeywordRest,
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    /// Parse a parameter token
    pub fn parse(token: &str) -> Param {
        if let Some(name) = token.strip_prefix("**") {
            return Param {
                name: name.to_string(),
                kind: ParamKind::KeywordRest,
            };
        }
        if let Some(name) = token.strip_prefix('*') {
            return Param {
                name: name.to_string(),
                kind: ParamKind::Rest,
            };
        }
        match token.split_once('=') {
            Some((name, default)) => Param {
                name: name.to_string(),
                kind: ParamKind::Default(Value::from_literal(default)),
            },
            None => Param {
                name: token.to_string(),
                kind: ParamKind::Required,
            },
        }
    }

    /// Required or defaulted: fillable by position
    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ParamKind::Required | ParamKind::Default(_))
    }
}

/// A named, callable body
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Rc<[Token]>,
    /// Module the function was imported from; its body runs in that module
    pub module: Option<String>,
}

impl FunctionDef {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        body: &[Token],
    ) -> Self {
        Self {
            name: name.into(),
            params,
            body: body.into(),
            module: None,
        }
    }

    /// Number of parameters fillable by position
    pub fn positional_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_positional()).count()
    }

    pub fn has_rest(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Rest)
    }
}

/// Arguments collected at a call site
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Values,
    pub keywords: IndexMap<String, Value>,
}

impl CallArgs {
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: IndexMap::new(),
        }
    }
}

/// Resolve call arguments against a parameter list.
///
/// Order: defaults, then positional arguments (skipping names fixed by
/// `prebound`), then keyword overrides. Nothing is bound if any step fails.
pub fn bind_arguments(
    function: &str,
    params: &[Param],
    prebound: &IndexMap<String, Value>,
    args: CallArgs,
) -> Result<Vec<(String, Value)>, RuntimeError> {
    let mut slots: IndexMap<&str, Option<Value>> = IndexMap::new();
    for param in params.iter().filter(|p| p.is_positional()) {
        let initial = match &param.kind {
            ParamKind::Default(value) => Some(value.clone()),
            _ => None,
        };
        slots.insert(&param.name, initial);
    }
    for (name, value) in prebound {
        if let Some(slot) = slots.get_mut(name.as_str()) {
            *slot = Some(value.clone());
        }
    }

    let rest = params.iter().find(|p| p.kind == ParamKind::Rest);
    let keyword_rest = params.iter().find(|p| p.kind == ParamKind::KeywordRest);

    let open: Vec<&str> = slots
        .keys()
        .copied()
        .filter(|name| !prebound.contains_key(*name))
        .collect();
    let got = args.positional.len();
    let mut extra = Vec::new();
    for (index, value) in args.positional.into_iter().enumerate() {
        match open.get(index) {
            Some(name) => {
                slots.insert(*name, Some(value));
            }
            None => extra.push(value),
        }
    }
    if !extra.is_empty() && rest.is_none() {
        return Err(RuntimeError::TooManyArguments {
            function: function.to_string(),
            expected: open.len(),
            got,
        });
    }

    let mut collected = IndexMap::new();
    for (key, value) in args.keywords {
        match slots.get_mut(key.as_str()) {
            Some(slot) => *slot = Some(value),
            None if keyword_rest.is_some() => {
                collected.insert(key, value);
            }
            None => {
                return Err(RuntimeError::UnexpectedKeyword {
                    function: function.to_string(),
                    param: key,
                })
            }
        }
    }

    let mut bindings = Vec::with_capacity(params.len());
    for (name, slot) in slots {
        match slot {
            Some(value) => bindings.push((name.to_string(), value)),
            None => {
                return Err(RuntimeError::MissingArgument {
                    function: function.to_string(),
                    param: name.to_string(),
                })
            }
        }
    }
    if let Some(rest) = rest {
        bindings.push((rest.name.clone(), Value::Array(new_array(extra))));
    }
    if let Some(keyword_rest) = keyword_rest {
        bindings.push((keyword_rest.name.clone(), Value::Map(new_map(collected))));
    }
    Ok(bindings)
}

/// Scalar and string tables captured by a closure, each name tagged by the
/// table it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedScope {
    pub variables: IndexMap<String, Value>,
    pub strings: IndexMap<String, String>,
}

/// A function value with its own captured scope
#[derive(Debug)]
pub struct Closure {
    pub function: FunctionDef,
    pub captured: RefCell<CapturedScope>,
}

/// Shared handle to a function value
pub type FunctionRef = Rc<FunctionValue>;

/// First-class function values
#[derive(Debug)]
pub enum FunctionValue {
    Closure(Closure),
    /// A base function with some parameters fixed
    Partial {
        base: FunctionRef,
        bound: IndexMap<String, Value>,
    },
    /// `outer(inner(x))`
    Composed {
        outer: FunctionRef,
        inner: FunctionRef,
    },
}

impl FunctionValue {
    /// Build a closure value
    pub fn closure(
        function: FunctionDef,
        captured: CapturedScope,
    ) -> FunctionRef {
        Rc::new(FunctionValue::Closure(Closure {
            function,
            captured: RefCell::new(captured),
        }))
    }

    /// Fix parameters of `base`. Partials of partials flatten onto the
    /// innermost base.
    pub fn partial(
        base: FunctionRef,
        bound: IndexMap<String, Value>,
    ) -> FunctionRef {
        match &*base {
            FunctionValue::Partial {
                base: inner,
                bound: earlier,
            } => {
                let mut merged = earlier.clone();
                merged.extend(bound);
                Rc::new(FunctionValue::Partial {
                    base: Rc::clone(inner),
                    bound: merged,
                })
            }
            _ => Rc::new(FunctionValue::Partial { base, bound }),
        }
    }

    pub fn compose(
        outer: FunctionRef,
        inner: FunctionRef,
    ) -> FunctionRef {
        Rc::new(FunctionValue::Composed { outer, inner })
    }

    /// Display name
    pub fn name(&self) -> String {
        match self {
            FunctionValue::Closure(closure) => closure.function.name.clone(),
            FunctionValue::Partial { base, .. } => format!("partial {}", base.name()),
            FunctionValue::Composed { outer, inner } => {
                format!("{} . {}", outer.name(), inner.name())
            }
        }
    }
}
