use std::fs;

use tempfile::TempDir;
use techlang::{run_file, run_with_config, InterpreterConfig};

#[test]
fn test_run_file_imports_sibling_module() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("geometry.tl"),
        "def area w h do\nmul w h\nreturn w\nend\nclass Box\nfield size int 2\nend",
    )
    .unwrap();
    let main = dir.path().join("main.tl");
    fs::write(
        &main,
        "import geometry\ncall geometry.area 3 7 -> a\nprint a\nnew geometry.Box b\nget_field b size",
    )
    .unwrap();
    assert_eq!(run_file(&main).unwrap(), "21\n2");
}

#[test]
fn test_search_paths() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("greet.tl"), "print \"hello from module\"").unwrap();
    let config = InterpreterConfig {
        search_paths: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    assert_eq!(
        run_with_config("import greet\nimport greet", config),
        "hello from module"
    );
}

#[test]
fn test_missing_module_is_an_error_line() {
    let dir = TempDir::new().unwrap();
    let main = dir.path().join("main.tl");
    fs::write(&main, "import nothing_here\nprint \"continues\"").unwrap();
    assert_eq!(
        run_file(&main).unwrap(),
        "[Error: Cannot import module 'nothing_here': not found in search paths]\ncontinues"
    );
}

#[test]
fn test_run_file_missing_file() {
    assert!(run_file(std::path::Path::new("/definitely/not/here.tl")).is_err());
}

#[test]
fn test_module_function_calls_sibling_and_keeps_state() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tally.tl"),
        "set total 0\ndef record n do\nadd total n\nend\ndef add_twice n do\ncall record n\ncall record n\nreturn total\nend",
    )
    .unwrap();
    let main = dir.path().join("main.tl");
    fs::write(
        &main,
        "import tally\ncall tally.add_twice 3 -> a\ncall tally.add_twice 1 -> b\nprint a\nprint b",
    )
    .unwrap();
    assert_eq!(run_file(&main).unwrap(), "6\n8");
}
