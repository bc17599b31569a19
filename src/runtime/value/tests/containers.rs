//! Container value tests

use indexmap::IndexMap;

use crate::runtime::value::{new_array, new_map, Value};

#[test]
fn test_array_display() {
    let arr = Value::Array(new_array(vec![
        Value::Int(1),
        Value::Str("a".into()),
        Value::Float(1.5),
    ]));
    assert_eq!(arr.to_string(), "[1, \"a\", 1.5]");
}

#[test]
fn test_map_display_keeps_insertion_order() {
    let mut entries = IndexMap::new();
    entries.insert("z".to_string(), Value::Int(1));
    entries.insert("a".to_string(), Value::Str("x".into()));
    assert_eq!(Value::Map(new_map(entries)).to_string(), "{\"z\": 1, \"a\": \"x\"}");
}

#[test]
fn test_structural_equality_vs_identity() {
    let a = Value::Array(new_array(vec![Value::Int(1), Value::Int(2)]));
    let b = Value::Array(new_array(vec![Value::Int(1), Value::Int(2)]));
    let alias = a.clone();

    assert_eq!(a, b);
    assert!(!a.same_identity(&b));
    assert!(a.same_identity(&alias));
}

#[test]
fn test_shared_storage_mutation() {
    let storage = new_array(Vec::new());
    let a = Value::Array(storage.clone());
    storage.borrow_mut().push(Value::Int(9));
    assert_eq!(a.to_string(), "[9]");
}

#[test]
fn test_scalar_identity_is_value_equality() {
    assert!(Value::Int(5).same_identity(&Value::Int(5)));
    assert!(!Value::Str("a".into()).same_identity(&Value::Str("b".into())));
}
