//! Classes, instances and struct records
//!
//! Lookups walk the `extends` chain from the class itself towards the root. The
//! walk keeps a visited set, so a chain that loops back on itself (possible when
//! a class is redefined) is reported instead of followed forever.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::runtime::error::RuntimeError;
use crate::runtime::function::FunctionDef;
use crate::runtime::value::{new_array, new_map, Value};

/// A declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub type_tag: String,
    /// Explicit default; `None` means "the zero value of `type_tag`"
    pub default: Option<Value>,
}

impl FieldDef {
    /// A fresh initial value. Containers are created per call so instances
    /// never share storage.
    pub fn initial_value(&self) -> Value {
        match &self.default {
            Some(value) => value.clone(),
            None => zero_value(&self.type_tag),
        }
    }

    /// `value` converted to the declared type; unconvertible input becomes the
    /// type's zero value. Untyped tags keep the value as is.
    pub fn coerce(
        &self,
        value: Value,
    ) -> Value {
        match self.type_tag.as_str() {
            "int" => Value::Int(value.to_int().unwrap_or(0)),
            "float" => Value::Float(value.to_float().unwrap_or(0.0)),
            "bool" => {
                let truthy = match &value {
                    Value::Str(s) => s.eq_ignore_ascii_case("true") || s == "1",
                    other => other.to_int().is_some_and(|n| n != 0),
                };
                Value::from(truthy)
            }
            "string" | "str" => match value {
                Value::Str(_) => value,
                other => Value::Str(other.to_string()),
            },
            _ => value,
        }
    }
}

/// Zero value for a type tag
pub fn zero_value(type_tag: &str) -> Value {
    match type_tag {
        "int" | "bool" => Value::Int(0),
        "float" => Value::Float(0.0),
        "string" | "str" => Value::Str(String::new()),
        "array" | "list" => Value::Array(new_array(Vec::new())),
        "dict" | "map" => Value::Map(new_map(IndexMap::new())),
        _ => Value::Unset,
    }
}

/// Method declared in a class body
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub function: FunctionDef,
    pub is_static: bool,
}

/// A class definition
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub methods: IndexMap<String, Rc<MethodDef>>,
    pub constructor: Option<Rc<FunctionDef>>,
}

/// A live instance
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInstance {
    pub class: String,
    pub fields: IndexMap<String, Value>,
}

/// Class registry with inheritance-aware lookups
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: IndexMap<String, Rc<ClassDef>>,
}

impl ClassTable {
    pub fn define(
        &mut self,
        class: ClassDef,
    ) {
        self.classes.insert(class.name.clone(), Rc::new(class));
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Rc<ClassDef>> {
        self.classes.get(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn clear(&mut self) {
        self.classes.clear();
    }

    /// The class and its ancestors, most derived first.
    pub fn ancestry(
        &self,
        name: &str,
    ) -> Result<Vec<Rc<ClassDef>>, RuntimeError> {
        let mut chain = Vec::new();
        let mut seen = IndexSet::new();
        let mut current = Some(name.to_string());
        while let Some(class_name) = current {
            if !seen.insert(class_name.clone()) {
                let mut path: Vec<&str> = seen.iter().map(String::as_str).collect();
                path.push(&class_name);
                return Err(RuntimeError::InheritanceCycle(path.join(" -> ")));
            }
            let class = self
                .classes
                .get(&class_name)
                .ok_or_else(|| RuntimeError::UndefinedClass(class_name.clone()))?;
            current = class.parent.clone();
            chain.push(Rc::clone(class));
        }
        Ok(chain)
    }

    /// First method named `method` along the chain
    pub fn find_method(
        &self,
        class: &str,
        method: &str,
    ) -> Result<Rc<MethodDef>, RuntimeError> {
        self.ancestry(class)?
            .iter()
            .find_map(|c| c.methods.get(method).cloned())
            .ok_or_else(|| RuntimeError::UndefinedMethod {
                class: class.to_string(),
                method: method.to_string(),
            })
    }

    /// Declaration of `field`, most derived class first
    pub fn find_field(
        &self,
        class: &str,
        field: &str,
    ) -> Result<Option<FieldDef>, RuntimeError> {
        Ok(self
            .ancestry(class)?
            .iter()
            .find_map(|c| c.fields.get(field).cloned()))
    }

    /// Nearest constructor along the chain
    pub fn constructor(
        &self,
        class: &str,
    ) -> Result<Option<Rc<FunctionDef>>, RuntimeError> {
        Ok(self
            .ancestry(class)?
            .iter()
            .find_map(|c| c.constructor.clone()))
    }

    /// Field set of an instance: parent fields first, overridden by name.
    pub fn merged_fields(
        &self,
        class: &str,
    ) -> Result<IndexMap<String, Value>, RuntimeError> {
        let mut fields = IndexMap::new();
        for c in self.ancestry(class)?.iter().rev() {
            for (name, field) in &c.fields {
                fields.insert(name.clone(), field.initial_value());
            }
        }
        Ok(fields)
    }

    /// Whether `class` is `target` or inherits from it
    pub fn is_subclass(
        &self,
        class: &str,
        target: &str,
    ) -> Result<bool, RuntimeError> {
        Ok(self.ancestry(class)?.iter().any(|c| c.name == target))
    }
}

// ============================================================================
// Struct records
// ============================================================================

/// A `struct` type: ordered field names with type tags
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, String>,
}

/// A `struct new` instance
#[derive(Debug, Clone, PartialEq)]
pub struct StructInstance {
    pub type_name: String,
    pub fields: IndexMap<String, Value>,
}

impl StructInstance {
    pub fn new(def: &StructDef) -> Self {
        Self {
            type_name: def.name.clone(),
            fields: def
                .fields
                .iter()
                .map(|(name, ty)| (name.clone(), zero_value(ty)))
                .collect(),
        }
    }

    /// `Type{f: "v", n: 1}`
    pub fn dump(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value.repr()))
            .collect();
        format!("{}{{{}}}", self.type_name, fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(
        name: &str,
        parent: Option<&str>,
        fields: &[(&str, &str, Option<Value>)],
    ) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            fields: fields
                .iter()
                .map(|(n, t, d)| {
                    (
                        n.to_string(),
                        FieldDef {
                            type_tag: t.to_string(),
                            default: d.clone(),
                        },
                    )
                })
                .collect(),
            ..ClassDef::default()
        }
    }

    #[test]
    fn test_merged_fields_override() {
        let mut table = ClassTable::default();
        table.define(class(
            "A",
            None,
            &[("n", "int", Some(Value::Int(1))), ("s", "string", None)],
        ));
        table.define(class("B", Some("A"), &[("n", "int", Some(Value::Int(2)))]));

        let fields = table.merged_fields("B").unwrap();
        assert_eq!(fields["n"], Value::Int(2));
        assert_eq!(fields["s"], Value::Str(String::new()));
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["n", "s"]);
    }

    #[test]
    fn test_subclass() {
        let mut table = ClassTable::default();
        table.define(class("Animal", None, &[]));
        table.define(class("Dog", Some("Animal"), &[]));
        assert!(table.is_subclass("Dog", "Animal").unwrap());
        assert!(!table.is_subclass("Animal", "Dog").unwrap());
    }

    #[test]
    fn test_cycle_detected() {
        let mut table = ClassTable::default();
        table.define(class("A", Some("B"), &[]));
        table.define(class("B", Some("A"), &[]));
        let err = table.ancestry("A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular inheritance detected: A -> B -> A"
        );
    }

    #[test]
    fn test_missing_parent() {
        let mut table = ClassTable::default();
        table.define(class("B", Some("Ghost"), &[]));
        assert_eq!(
            table.ancestry("B").unwrap_err(),
            RuntimeError::UndefinedClass("Ghost".into())
        );
    }

    #[test]
    fn test_struct_dump() {
        let def = StructDef {
            name: "Person".into(),
            fields: [("name", "string"), ("age", "int")]
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        };
        let mut person = StructInstance::new(&def);
        person.fields.insert("name".into(), Value::Str("Ada".into()));
        person.fields.insert("age".into(), Value::Int(36));
        assert_eq!(person.dump(), "Person{name: \"Ada\", age: 36}");
    }
}
