//! `import`
//!
//! A module is another `.tl` file. It runs once, in a child interpreter that
//! shares the command registry and configuration; what it defines becomes
//! reachable as `module.member`.
//!
//! The module keeps its top-level variables. An exported function runs with
//! them bound and writes them back when it returns; inside it, unqualified
//! names resolve against the module's own exports before the importer's.
//! Anything else falls through to the importer's state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::backends::interpreter::cursor::Cursor;
use crate::backends::interpreter::registry::CommandRegistry;
use crate::backends::interpreter::Interpreter;
use crate::frontend::lexer::{unquote, Token};
use crate::runtime::class::{ClassDef, MethodDef};
use crate::runtime::error::RuntimeError;
use crate::runtime::flow::CommandResult;
use crate::runtime::function::FunctionDef;
use crate::runtime::state::ModuleState;
use crate::runtime::value::Value;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("import", import);
}

/// File extension of TechLang sources
pub const SOURCE_EXTENSION: &str = "tl";

/// `import name`
fn import(
    interp: &mut Interpreter,
    tokens: &[Token],
    index: usize,
) -> CommandResult {
    let mut cursor = Cursor::new(tokens, index);
    let name = cursor.expect_operand(interp, "import <module>")?;
    let name = unquote(name);
    load_module(interp, &name).map_err(|e| cursor.fail(e))?;
    Ok(cursor.step())
}

/// Candidate files for `name`: the importing file's directory first, then the
/// configured search paths in order.
fn candidates(
    interp: &Interpreter,
    name: &str,
) -> Vec<PathBuf> {
    let file = if name.ends_with(&format!(".{SOURCE_EXTENSION}")) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.{SOURCE_EXTENSION}"))
    };
    interp
        .base_dir
        .iter()
        .chain(interp.config.search_paths.iter())
        .map(|dir| dir.join(&file))
        .collect()
}

fn load_module(
    interp: &mut Interpreter,
    name: &str,
) -> Result<(), RuntimeError> {
    let path = candidates(interp, name)
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| RuntimeError::Import {
            module: name.to_string(),
            reason: "not found in search paths".to_string(),
        })?;
    let path = fs::canonicalize(&path).unwrap_or(path);
    if interp.state.loaded_files.contains(&path) {
        debug!(module = name, path = %path.display(), "module already loaded");
        return Ok(());
    }

    let source = fs::read_to_string(&path).map_err(|e| RuntimeError::Import {
        module: name.to_string(),
        reason: e.to_string(),
    })?;
    interp.state.loaded_files.insert(path.clone());
    info!(module = name, path = %path.display(), "importing module");

    let mut child = Interpreter::with_registry(interp.config.clone(), interp.shared_registry());
    child.base_dir = path.parent().map(Path::to_path_buf);
    child.state.loaded_files = interp.state.loaded_files.clone();
    child.run(&source);

    let prefix = module_prefix(name);
    export(interp, &mut child, &prefix, path);
    Ok(())
}

/// Namespace for a module's exports: the file stem of `name`
fn module_prefix(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Top-level variables, strings, arrays and mappings the module defined.
/// Configured defines belong to the importer and are left out.
fn module_globals(
    child: &Interpreter,
    defines: &BTreeMap<String, toml::Value>,
) -> IndexMap<String, Value> {
    let state = &child.state;
    let variables = state.variables.iter().map(|(n, v)| (n, v.clone()));
    let strings = state.strings.iter().map(|(n, s)| (n, Value::Str(s.clone())));
    let arrays = state.arrays.iter().map(|(n, a)| (n, Value::Array(Rc::clone(a))));
    let maps = state.maps.iter().map(|(n, m)| (n, Value::Map(Rc::clone(m))));
    variables
        .chain(strings)
        .chain(arrays)
        .chain(maps)
        .filter(|(name, _)| !defines.contains_key(*name))
        .map(|(name, value)| (name.clone(), value))
        .collect()
}

/// Copy the child's definitions into `interp` under `prefix.` and append its
/// output. Members the child itself imported keep their own qualified names.
fn export(
    interp: &mut Interpreter,
    child: &mut Interpreter,
    prefix: &str,
    path: PathBuf,
) {
    let qualify = |member: &str| {
        if member.contains('.') {
            member.to_string()
        } else {
            format!("{prefix}.{member}")
        }
    };
    let owned = |module: &Option<String>| {
        module.clone().or_else(|| Some(prefix.to_string()))
    };

    for (name, function) in &child.state.functions {
        let qualified = qualify(name);
        let exported = FunctionDef {
            name: qualified.clone(),
            module: owned(&function.module),
            ..FunctionDef::clone(function)
        };
        interp.state.functions.insert(qualified, Rc::new(exported));
    }

    for name in child.state.classes.names() {
        let Some(class) = child.state.classes.get(name) else {
            continue;
        };
        let parent = class.parent.as_ref().map(|parent| {
            if child.state.classes.contains(parent) {
                qualify(parent)
            } else {
                parent.clone()
            }
        });
        let methods = class
            .methods
            .iter()
            .map(|(method, def)| {
                let function = FunctionDef {
                    module: owned(&def.function.module),
                    ..def.function.clone()
                };
                let def = MethodDef {
                    function,
                    is_static: def.is_static,
                };
                (method.clone(), Rc::new(def))
            })
            .collect();
        let constructor = class.constructor.as_ref().map(|init| {
            Rc::new(FunctionDef {
                module: owned(&init.module),
                ..FunctionDef::clone(init)
            })
        });
        interp.state.classes.define(ClassDef {
            name: qualify(name),
            parent,
            methods,
            constructor,
            ..ClassDef::clone(class)
        });
    }

    for (name, value) in &child.state.fn_values {
        interp.state.fn_values.insert(qualify(name), Rc::clone(value));
    }

    let globals = module_globals(child, &interp.config.defines);
    debug!(module = prefix, globals = globals.len(), "module state kept");
    interp.state.modules.extend(child.state.modules.drain(..));
    interp
        .state
        .modules
        .insert(prefix.to_string(), ModuleState { path, globals });

    interp.state.loaded_files.extend(child.state.loaded_files.drain(..));
    interp.state.output.append(&mut child.state.output);
    interp.state.error_count += child.state.error_count;
}
