//! Call machinery
//!
//! Every way of running a callable body ends up here: named functions, function
//! values (closures, partials, compositions), instance methods, static methods
//! and constructors. Each call opens a [`CallFrame`], binds its arguments, runs
//! the body and turns the resulting [`Flow`] into return values. Loop signals do
//! not cross a call boundary.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::backends::interpreter::frames::CallFrame;
use crate::backends::interpreter::Interpreter;
use crate::frontend::lexer::{is_identifier, Token};
use crate::runtime::class::{ClassInstance, MethodDef};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::{Flow, Values};
use crate::runtime::function::{
    bind_arguments, CallArgs, CapturedScope, Closure, FunctionDef, FunctionRef, FunctionValue,
};
use crate::runtime::value::Value;

/// A resolved call target
#[derive(Debug, Clone)]
pub enum Callee {
    Function(Rc<FunctionDef>),
    Value(FunctionRef),
    Method {
        instance: String,
        method: Rc<MethodDef>,
    },
    Static(Rc<MethodDef>),
}

impl Callee {
    /// How many positional operands a call site passes before its return
    /// targets start; `None` when a `*rest` parameter takes them all.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Callee::Function(def) => function_arity(def),
            Callee::Value(value) => value_arity(value),
            Callee::Method { method, .. } | Callee::Static(method) => {
                function_arity(&method.function)
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Callee::Function(def) => def.name.clone(),
            Callee::Value(value) => value.name(),
            Callee::Method { instance, method } => {
                format!("{}.{}", instance, method.function.name)
            }
            Callee::Static(method) => method.function.name.clone(),
        }
    }
}

fn function_arity(def: &FunctionDef) -> Option<usize> {
    if def.has_rest() {
        None
    } else {
        Some(def.positional_count())
    }
}

fn value_arity(value: &FunctionValue) -> Option<usize> {
    match value {
        FunctionValue::Closure(closure) => function_arity(&closure.function),
        FunctionValue::Partial { base, bound } => {
            value_arity(base).map(|n| n.saturating_sub(bound.len()))
        }
        FunctionValue::Composed { inner, .. } => value_arity(inner),
    }
}

/// Return values carried by a body's flow
fn returned(flow: Flow) -> Values {
    match flow {
        Flow::Return(values) => values,
        Flow::Normal | Flow::Break | Flow::Continue => Values::new(),
    }
}

/// `key=value` call-site operand
pub(crate) fn keyword_operand(token: &Token) -> Option<(&str, &str)> {
    if token.is_quoted() {
        return None;
    }
    let (key, value) = token.split_once('=')?;
    (is_identifier(key) && !value.is_empty()).then_some((key, value))
}

impl Interpreter {
    /// Find what `name` refers to at a call site.
    ///
    /// Inside an imported function the module's own exports come first. Then
    /// named functions (module exports included), function values, and
    /// finally `instance.method` and `Class.static`.
    pub(crate) fn resolve_callee(
        &self,
        name: &str,
    ) -> Result<Callee, RuntimeError> {
        if let Some(qualified) = self.module_qualified(name) {
            if let Some(def) = self.state.functions.get(&qualified) {
                return Ok(Callee::Function(Rc::clone(def)));
            }
            if let Some(value) = self.state.fn_values.get(&qualified) {
                return Ok(Callee::Value(Rc::clone(value)));
            }
        }
        if let Some(def) = self.state.functions.get(name) {
            return Ok(Callee::Function(Rc::clone(def)));
        }
        if let Some(value) = self.state.fn_values.get(name) {
            return Ok(Callee::Value(Rc::clone(value)));
        }
        if let Some((owner, member)) = name.split_once('.') {
            if let Some(instance) = self.state.instance_name(owner) {
                let class = self
                    .state
                    .instances
                    .get(&instance)
                    .map(|i| i.class.clone())
                    .ok_or_else(|| RuntimeError::UndefinedInstance(instance.clone()))?;
                let method = self.state.classes.find_method(&class, member)?;
                if method.is_static {
                    return Err(RuntimeError::Type(format!(
                        "Cannot call static method '{}' on instance. Use {}.{} instead.",
                        member, class, member
                    )));
                }
                return Ok(Callee::Method { instance, method });
            }
            if self.state.classes.contains(owner) {
                let method = self.state.classes.find_method(owner, member)?;
                if !method.is_static {
                    return Err(RuntimeError::Type(format!(
                        "Method '{}' is not static. Create an instance first.",
                        member
                    )));
                }
                return Ok(Callee::Static(method));
            }
        }
        Err(RuntimeError::UndefinedFunction(name.to_string()))
    }

    /// Split call-site operands into arguments and return targets.
    ///
    /// With `->` everything after it is a target. Without it, the first `arity`
    /// positional operands are arguments and the rest are targets. `key=value`
    /// operands are keyword arguments wherever they appear before `->`.
    pub(crate) fn parse_call_site(
        &self,
        operands: &[Token],
        arity: Option<usize>,
    ) -> (CallArgs, Vec<Token>) {
        let (left, right) = match operands.iter().position(|t| *t == "->") {
            Some(arrow) => (&operands[..arrow], Some(&operands[arrow + 1..])),
            None => (operands, None),
        };
        let mut args = CallArgs::default();
        let mut targets = Vec::new();
        for token in left {
            if let Some((key, raw)) = keyword_operand(token) {
                let value = self.state.resolve(&Token::new(raw, token.line()));
                args.keywords.insert(key.to_string(), value);
                continue;
            }
            let full = arity.is_some_and(|n| args.positional.len() >= n);
            if right.is_none() && full {
                targets.push(token.clone());
            } else {
                args.positional.push(self.state.resolve(token));
            }
        }
        if let Some(right) = right {
            targets.extend(right.iter().cloned());
        }
        (args, targets)
    }

    /// Bind returned values to targets, pairwise.
    pub(crate) fn assign_returns(
        &mut self,
        targets: &[Token],
        values: Values,
    ) {
        for (target, value) in targets.iter().zip(values) {
            self.state.assign(target, value);
        }
    }

    /// Run any callee
    pub(crate) fn invoke(
        &mut self,
        callee: &Callee,
        args: CallArgs,
    ) -> Result<Values, RuntimeError> {
        match callee {
            Callee::Function(def) => self.call_function(def, args),
            Callee::Value(value) => self.call_value(value, args),
            Callee::Method { instance, method } => {
                self.call_method(instance, &method.function, args)
            }
            Callee::Static(method) => self.call_function(&method.function, args),
        }
    }

    /// Call a named function (or a static method): parameters are shadowed for
    /// the call, everything else the body touches is global. A function
    /// imported from a module also sees that module's globals.
    pub(crate) fn call_function(
        &mut self,
        def: &FunctionDef,
        args: CallArgs,
    ) -> Result<Values, RuntimeError> {
        let bindings = bind_arguments(&def.name, &def.params, &IndexMap::new(), args)?;
        let Some(module) = def.module.as_deref() else {
            let mut frame = CallFrame::enter(self, &def.name)?;
            frame.bind_all(bindings);
            let flow = frame.execute(&def.body);
            return Ok(returned(flow));
        };

        self.commit_module_globals(module);
        let values = {
            let params: Vec<String> = bindings.iter().map(|(name, _)| name.clone()).collect();
            let mut frame = CallFrame::enter(self, &def.name)?;
            let globals = enter_module(&mut frame, module, &params);
            frame.bind_all(bindings);
            let flow = frame.execute(&def.body);
            leave_module(&mut frame, module, &globals);
            returned(flow)
        };
        self.reload_module_globals(module);
        Ok(values)
    }

    /// Call a function value
    pub(crate) fn call_value(
        &mut self,
        function: &FunctionRef,
        args: CallArgs,
    ) -> Result<Values, RuntimeError> {
        match &**function {
            FunctionValue::Closure(closure) => self.call_closure(closure, &IndexMap::new(), args),
            FunctionValue::Partial { base, bound } => match &**base {
                FunctionValue::Closure(closure) => self.call_closure(closure, bound, args),
                _ => {
                    let mut args = args;
                    for (name, value) in bound {
                        args.keywords
                            .entry(name.clone())
                            .or_insert_with(|| value.clone());
                    }
                    self.call_value(base, args)
                }
            },
            FunctionValue::Composed { outer, inner } => {
                let first = self
                    .call_value(inner, args)?
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                self.call_value(outer, CallArgs::positional([first]))
            }
        }
    }

    /// Closure call: the captured scope replaces the scalar and string tables
    /// for the call, and whatever the body leaves in captured names is written
    /// back into the closure so it persists across calls.
    fn call_closure(
        &mut self,
        closure: &Closure,
        prebound: &IndexMap<String, Value>,
        args: CallArgs,
    ) -> Result<Values, RuntimeError> {
        let function = &closure.function;
        let bindings = bind_arguments(&function.name, &function.params, prebound, args)?;
        let captured = closure.captured.borrow().clone();

        let mut frame = CallFrame::enter(self, &function.name)?.isolated();
        for (name, value) in captured.variables {
            frame.state.strings.shift_remove(&name);
            frame.state.variables.insert(name, value);
        }
        for (name, value) in captured.strings {
            frame.state.variables.shift_remove(&name);
            frame.state.strings.insert(name, value);
        }
        frame.bind_all(bindings);
        let flow = frame.execute(&function.body);

        let mut captured = closure.captured.borrow_mut();
        let is_param = |name: &str| function.params.iter().any(|p| p.name == name);
        for (name, slot) in captured.variables.iter_mut() {
            if is_param(name) {
                continue;
            }
            if let Some(value) = frame.state.variables.get(name) {
                *slot = value.clone();
            }
        }
        for (name, slot) in captured.strings.iter_mut() {
            if is_param(name) {
                continue;
            }
            if let Some(value) = frame.state.strings.get(name) {
                *slot = value.clone();
            }
        }
        Ok(returned(flow))
    }

    /// Method call: `self`/`this` name the instance, every field is bound as a
    /// transient variable (parameters win on a name clash), and field values
    /// are copied back into the instance before the frame unwinds.
    ///
    /// A method calling another method on its own receiver commits its live
    /// fields first and picks up the callee's writes afterwards.
    pub(crate) fn call_method(
        &mut self,
        instance: &str,
        function: &FunctionDef,
        args: CallArgs,
    ) -> Result<Values, RuntimeError> {
        let bindings = bind_arguments(&function.name, &function.params, &IndexMap::new(), args)?;
        self.commit_receiver_fields(instance);
        if let Some(module) = function.module.as_deref() {
            self.commit_module_globals(module);
        }
        let fields = self
            .state
            .instances
            .get(instance)
            .map(|i| i.fields.clone())
            .ok_or_else(|| RuntimeError::UndefinedInstance(instance.to_string()))?;

        let values = {
            let params: Vec<String> = bindings.iter().map(|(name, _)| name.clone()).collect();
            let mut frame = CallFrame::enter(self, &function.name)?;
            frame.set_receiver(instance, params.clone());
            frame.bind("self", Value::Str(instance.to_string()));
            frame.bind("this", Value::Str(instance.to_string()));
            let globals = match function.module.as_deref() {
                Some(module) => {
                    let mut shadowed = params.clone();
                    shadowed.extend(fields.keys().cloned());
                    enter_module(&mut frame, module, &shadowed)
                }
                None => Vec::new(),
            };
            for (name, value) in &fields {
                frame.bind(name, value.clone());
            }
            frame.bind_all(bindings);
            let flow = frame.execute(&function.body);

            let updated: Vec<(String, Value)> = fields
                .keys()
                .filter(|name| !params.contains(*name))
                .filter_map(|name| frame.state.lookup(name).map(|v| (name.clone(), v)))
                .collect();
            if let Some(target) = frame.state.instances.get_mut(instance) {
                target.fields.extend(updated);
            }
            if let Some(module) = function.module.as_deref() {
                leave_module(&mut frame, module, &globals);
            }
            returned(flow)
        };
        self.reload_receiver_fields(instance);
        if let Some(module) = function.module.as_deref() {
            self.reload_module_globals(module);
        }
        Ok(values)
    }

    /// Field bindings of the innermost method, if it runs on `instance`
    fn receiver_fields(
        &self,
        instance: &str,
    ) -> Vec<String> {
        match self.receivers.last() {
            Some(receiver) if receiver.owner == instance => self
                .state
                .instances
                .get(instance)
                .map(|i| {
                    i.fields
                        .keys()
                        .filter(|name| receiver.binds(name))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Copy the running method's field variables into `instance`.
    fn commit_receiver_fields(
        &mut self,
        instance: &str,
    ) {
        let live: Vec<(String, Value)> = self
            .receiver_fields(instance)
            .into_iter()
            .filter_map(|name| self.state.lookup(&name).map(|v| (name, v)))
            .collect();
        if let Some(target) = self.state.instances.get_mut(instance) {
            target.fields.extend(live);
        }
    }

    /// Rebind the running method's field variables from `instance`.
    fn reload_receiver_fields(
        &mut self,
        instance: &str,
    ) {
        for name in self.receiver_fields(instance) {
            let stored = self
                .state
                .instances
                .get(instance)
                .and_then(|i| i.fields.get(&name).cloned());
            if let Some(value) = stored {
                self.state.assign(&name, value);
            }
        }
    }

    /// `module.name` when an imported function is running
    pub(crate) fn module_qualified(
        &self,
        name: &str,
    ) -> Option<String> {
        self.module_scopes
            .last()
            .map(|scope| format!("{}.{}", scope.owner, name))
    }

    /// Module globals the innermost running call has bound, if it runs in
    /// `module`
    fn module_bindings(
        &self,
        module: &str,
    ) -> Vec<String> {
        match self.module_scopes.last() {
            Some(scope) if scope.owner == module => self
                .state
                .modules
                .get(module)
                .map(|m| {
                    m.globals
                        .keys()
                        .filter(|name| scope.binds(name))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Store the running call's live module globals back into `module`.
    fn commit_module_globals(
        &mut self,
        module: &str,
    ) {
        let live: Vec<(String, Value)> = self
            .module_bindings(module)
            .into_iter()
            .filter_map(|name| self.state.lookup(&name).map(|v| (name, v)))
            .collect();
        if let Some(target) = self.state.modules.get_mut(module) {
            target.globals.extend(live);
        }
    }

    /// Rebind the running call's module globals from `module`.
    fn reload_module_globals(
        &mut self,
        module: &str,
    ) {
        for name in self.module_bindings(module) {
            let stored = self
                .state
                .modules
                .get(module)
                .and_then(|m| m.globals.get(&name).cloned());
            if let Some(value) = stored {
                self.state.assign(&name, value);
            }
        }
    }

    /// `new Class name args...`: build the merged field set, then run the
    /// nearest constructor with `self` bound to the new instance.
    pub(crate) fn construct(
        &mut self,
        class: &str,
        instance: &str,
        args: CallArgs,
    ) -> Result<(), RuntimeError> {
        let fields = self.state.classes.merged_fields(class)?;
        let constructor = self.state.classes.constructor(class)?;
        self.state.instances.insert(
            instance.to_string(),
            ClassInstance {
                class: class.to_string(),
                fields,
            },
        );
        if let Some(init) = constructor {
            self.call_method(instance, &init, args)?;
        }
        Ok(())
    }

    /// A closure over the current scalar and string tables
    pub(crate) fn capture_scope(&self) -> CapturedScope {
        CapturedScope {
            variables: self.state.variables.clone(),
            strings: self.state.strings.clone(),
        }
    }
}

/// Bind `module`'s globals into `frame` and make it the active module.
/// Returns the globals the call will write back.
fn enter_module(
    frame: &mut CallFrame<'_>,
    module: &str,
    shadowed: &[String],
) -> Vec<String> {
    let globals = frame
        .state
        .modules
        .get(module)
        .map(|m| m.globals.clone())
        .unwrap_or_default();
    frame.set_module(module, shadowed.to_vec());
    let mut bound = Vec::new();
    for (name, value) in globals {
        if shadowed.contains(&name) {
            continue;
        }
        frame.bind(&name, value);
        bound.push(name);
    }
    bound
}

/// Copy the values of `globals` back into `module`.
fn leave_module(
    frame: &mut CallFrame<'_>,
    module: &str,
    globals: &[String],
) {
    let updated: Vec<(String, Value)> = globals
        .iter()
        .filter_map(|name| frame.state.lookup(name).map(|v| (name.clone(), v)))
        .collect();
    if let Some(target) = frame.state.modules.get_mut(module) {
        target.globals.extend(updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::function::Param;

    fn tokens(text: &str) -> Vec<Token> {
        crate::frontend::lexer::tokenize(text).unwrap()
    }

    #[test]
    fn test_call_site_without_arrow_uses_arity() {
        let interp = Interpreter::new();
        let ops = tokens("1 2 r");
        let (args, targets) = interp.parse_call_site(&ops, Some(2));
        assert_eq!(args.positional.len(), 2);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0], "r");
    }

    #[test]
    fn test_call_site_keywords_and_arrow() {
        let interp = Interpreter::new();
        let ops = tokens("1 scale=3 -> out");
        let (args, targets) = interp.parse_call_site(&ops, Some(1));
        assert_eq!(args.positional.as_slice(), &[Value::Int(1)]);
        assert_eq!(args.keywords.get("scale"), Some(&Value::Int(3)));
        assert_eq!(targets[0], "out");
    }

    #[test]
    fn test_function_call_restores_params() {
        let mut interp = Interpreter::new();
        interp.state.assign("x", Value::Int(100));
        let def = FunctionDef::new("id", vec![Param::parse("x")], &tokens("return x"));
        let values = interp
            .call_function(&def, CallArgs::positional([Value::Int(5)]))
            .unwrap();
        assert_eq!(values.as_slice(), &[Value::Int(5)]);
        assert_eq!(interp.state.scalar("x"), Some(Value::Int(100)));
    }

    #[test]
    fn test_binding_error_runs_nothing() {
        let mut interp = Interpreter::new();
        let def = FunctionDef::new("f", vec![Param::parse("a")], &tokens("ping"));
        let err = interp.call_function(&def, CallArgs::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required argument 'a' for function 'f'."
        );
        assert_eq!(interp.state.accumulator, 0);
    }

    #[test]
    fn test_closure_state_persists() {
        let mut interp = Interpreter::new();
        interp.state.assign("count", Value::Int(0));
        let body = tokens("add count 1\nreturn count");
        let closure = FunctionValue::closure(
            FunctionDef::new("counter", Vec::new(), &body),
            interp.capture_scope(),
        );
        interp.state.assign("count", Value::Int(50));
        for expected in 1..=3 {
            let values = interp.call_value(&closure, CallArgs::default()).unwrap();
            assert_eq!(values[0], Value::Int(expected));
        }
        assert_eq!(interp.state.scalar("count"), Some(Value::Int(50)));
    }

    #[test]
    fn test_resolve_callee_reports_undefined() {
        let interp = Interpreter::new();
        assert_eq!(
            interp.resolve_callee("nope").unwrap_err(),
            RuntimeError::UndefinedFunction("nope".into())
        );
    }
}
