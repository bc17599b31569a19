//! Emulated call frames
//!
//! There is one flat namespace, so a call cannot push a fresh scope. Instead a
//! [`CallFrame`] remembers whatever the callee is about to overwrite and puts it
//! back when the frame is dropped. Dropping happens on every exit path, so an
//! early `return`, an error or a panic in a handler all leave the caller's
//! bindings intact.
//!
//! ```text
//! enter ─► bind params ─► execute body ─► drop: restore slots, restore snapshot
//! ```

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use tracing::debug;

use crate::backends::interpreter::Interpreter;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::FunctionRef;
use crate::runtime::value::{ArrayRef, MapRef, Value};

/// Everything a name was bound to before the frame shadowed it
#[derive(Debug)]
struct SavedSlot {
    name: String,
    variable: Option<Value>,
    string: Option<String>,
    array: Option<ArrayRef>,
    map: Option<MapRef>,
    function: Option<FunctionRef>,
}

/// Whole scalar and string tables, for closures that replace the scope
#[derive(Debug)]
struct Snapshot {
    variables: IndexMap<String, Value>,
    strings: IndexMap<String, String>,
}

/// Owner of names a running call has bound as variables: the receiver
/// instance of a method, or the module of an imported function. `shadowed`
/// lists the call's own names that hide the owner's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundScope {
    pub owner: String,
    pub shadowed: Vec<String>,
}

impl BoundScope {
    /// Whether `name` is bound to the owner's value rather than shadowed
    pub fn binds(
        &self,
        name: &str,
    ) -> bool {
        !self.shadowed.iter().any(|p| p == name)
    }
}

/// Scoped save/restore guard over the global tables
pub struct CallFrame<'a> {
    interp: &'a mut Interpreter,
    name: String,
    saved: Vec<SavedSlot>,
    snapshot: Option<Snapshot>,
    receiver: bool,
    module: bool,
    counted: bool,
}

impl<'a> CallFrame<'a> {
    /// Open a frame for `name`, enforcing the call-depth limit.
    pub fn enter(
        interp: &'a mut Interpreter,
        name: &str,
    ) -> Result<Self, RuntimeError> {
        let limit = interp.config.max_call_depth;
        if interp.depth >= limit {
            return Err(RuntimeError::RecursionLimit(limit));
        }
        interp.depth += 1;
        debug!(function = name, depth = interp.depth, "enter call frame");
        Ok(Self {
            interp,
            name: name.to_string(),
            saved: Vec::new(),
            snapshot: None,
            receiver: false,
            module: false,
            counted: true,
        })
    }

    /// A frame that only shadows names, e.g. a loop variable. It is not a
    /// call and does not count towards the depth limit.
    pub fn shadow(
        interp: &'a mut Interpreter,
        name: &str,
    ) -> Self {
        Self {
            interp,
            name: name.to_string(),
            saved: Vec::new(),
            snapshot: None,
            receiver: false,
            module: false,
            counted: false,
        }
    }

    /// Also snapshot the entire scalar and string tables; everything the body
    /// writes there is rolled back on exit.
    pub fn isolated(mut self) -> Self {
        let state = &self.interp.state;
        self.snapshot = Some(Snapshot {
            variables: state.variables.clone(),
            strings: state.strings.clone(),
        });
        self
    }

    /// Mark `instance` as the receiver of this call, for `set_field self`
    /// and nested calls on the same instance.
    pub fn set_receiver(
        &mut self,
        instance: &str,
        shadowed: Vec<String>,
    ) {
        if !self.receiver {
            self.interp.receivers.push(BoundScope {
                owner: instance.to_string(),
                shadowed,
            });
            self.receiver = true;
        }
    }

    /// Run this call inside `module`: its globals are bound and unqualified
    /// names resolve against its exports first.
    pub fn set_module(
        &mut self,
        module: &str,
        shadowed: Vec<String>,
    ) {
        if !self.module {
            self.interp.module_scopes.push(BoundScope {
                owner: module.to_string(),
                shadowed,
            });
            self.module = true;
        }
    }

    /// Shadow `name` with `value` for the frame's lifetime.
    pub fn bind(
        &mut self,
        name: &str,
        value: Value,
    ) {
        let state = &mut self.interp.state;
        if self.saved.iter().any(|slot| slot.name == name) {
            state.variables.shift_remove(name);
            state.strings.shift_remove(name);
            state.arrays.shift_remove(name);
            state.maps.shift_remove(name);
            state.fn_values.shift_remove(name);
        } else {
            self.saved.push(SavedSlot {
                name: name.to_string(),
                variable: state.variables.shift_remove(name),
                string: state.strings.shift_remove(name),
                array: state.arrays.shift_remove(name),
                map: state.maps.shift_remove(name),
                function: state.fn_values.shift_remove(name),
            });
        }
        state.assign(name, value);
    }

    pub fn bind_all(
        &mut self,
        bindings: impl IntoIterator<Item = (String, Value)>,
    ) {
        for (name, value) in bindings {
            self.bind(&name, value);
        }
    }
}

fn restore<T>(
    table: &mut IndexMap<String, T>,
    name: String,
    previous: Option<T>,
) {
    match previous {
        Some(value) => {
            table.insert(name, value);
        }
        None => {
            table.shift_remove(&name);
        }
    }
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        let state = &mut self.interp.state;
        for slot in self.saved.drain(..).rev() {
            restore(&mut state.variables, slot.name.clone(), slot.variable);
            restore(&mut state.strings, slot.name.clone(), slot.string);
            restore(&mut state.arrays, slot.name.clone(), slot.array);
            restore(&mut state.maps, slot.name.clone(), slot.map);
            restore(&mut state.fn_values, slot.name, slot.function);
        }
        if let Some(snapshot) = self.snapshot.take() {
            state.variables = snapshot.variables;
            state.strings = snapshot.strings;
        }
        if self.receiver {
            self.interp.receivers.pop();
        }
        if self.module {
            self.interp.module_scopes.pop();
        }
        if self.counted {
            self.interp.depth -= 1;
            debug!(function = %self.name, depth = self.interp.depth, "leave call frame");
        }
    }
}

impl Deref for CallFrame<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interp
    }
}

impl DerefMut for CallFrame<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interp
    }
}
