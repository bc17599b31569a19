use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn techlang() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_techlang"));
    // keep user config files out of the picture
    cmd.env("HOME", env!("CARGO_TARGET_TMPDIR"))
        .env("XDG_CONFIG_HOME", env!("CARGO_TARGET_TMPDIR"));
    cmd
}

#[test]
fn test_cli_run_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("count.tl");
    fs::write(&file, "loop 3\nping\nend\nprint\nprint ghost").unwrap();

    let output = techlang()
        .current_dir(dir.path())
        .arg("run")
        .arg(&file)
        .output()
        .expect("Failed to spawn techlang");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        ["3", "[Error: Variable 'ghost' is not defined.]"]
    );
}

#[test]
fn test_cli_eval_with_define() {
    let dir = TempDir::new().unwrap();
    let output = techlang()
        .current_dir(dir.path())
        .args(["eval", "print LEVEL", "-D", "LEVEL=3"])
        .output()
        .expect("Failed to spawn techlang");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3");
}

#[test]
fn test_cli_project_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("techlang.toml"),
        "[interpreter]\nmax_loop_iterations = 5\n",
    )
    .unwrap();
    let output = techlang()
        .current_dir(dir.path())
        .args(["eval", "set x 1\nwhile x > 0\nping\nend"])
        .output()
        .expect("Failed to spawn techlang");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "[Error: Loop exceeded maximum iterations (5)]"
    );
}

#[test]
fn test_cli_tokens() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("t.tl");
    fs::write(&file, "print \"a b\" # comment\nping").unwrap();
    let output = techlang()
        .arg("tokens")
        .arg(&file)
        .output()
        .expect("Failed to spawn techlang");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let tokens: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(tokens, ["1  print", "1  \"a b\"", "2  ping"]);
}

#[test]
fn test_cli_tokens_apply_defines() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("guarded.tl");
    fs::write(
        &file,
        "macro trace msg when:DEBUG do\nprint $msg\nend\ninline trace \"hi\"",
    )
    .unwrap();
    let texts = |args: &[&str]| -> Vec<String> {
        let output = techlang()
            .current_dir(dir.path())
            .args(args)
            .arg(&file)
            .output()
            .expect("Failed to spawn techlang");
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|l| l.trim().split_once("  ").map(|(_, t)| t.to_string()))
            .collect()
    };
    assert!(texts(&["tokens"]).is_empty());
    assert_eq!(texts(&["-D", "DEBUG", "tokens"]), ["print", "\"hi\""]);
}

#[test]
fn test_cli_missing_file_fails() {
    let output = techlang()
        .args(["run", "/no/such/file.tl"])
        .output()
        .expect("Failed to spawn techlang");
    assert!(!output.status.success());
}

#[test]
fn test_cli_version() {
    let output = techlang()
        .arg("version")
        .output()
        .expect("Failed to spawn techlang");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("TechLang "));
}
