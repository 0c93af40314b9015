use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_spec-cli");

/// Schema with a parent bundle, a required tree, and a required mutex group.
fn write_schema(dir: &TempDir) -> PathBuf {
    let schema = serde_json::json!({
        "parser": {
            "prog": "tools",
            "description": "Build tools",
            "parent_parsers": [{
                "prog": "common",
                "options": [
                    {"flag": ["-v", "--verbose"], "action": "store_true", "help": "chatty output"}
                ]
            }],
            "subparsers": {
                "required": true,
                "commands": [
                    {
                        "name": "build",
                        "help": "build the project",
                        "parents": ["common"],
                        "manager": "tools.handlers.build",
                        "options": [{"flag": ["--target"], "default": "release"}]
                    },
                    {
                        "name": "pick",
                        "manager": "tools.handlers.pick",
                        "mutually_exclusive_groups": [{
                            "title": "which",
                            "required": true,
                            "options": [
                                {"flag": ["-f"], "action": "store_true"},
                                {"flag": ["-g"], "action": "store_true"}
                            ]
                        }]
                    }
                ]
            }
        }
    });
    let path = dir.path().join("tools.json");
    fs::write(&path, serde_json::to_string_pretty(&schema).unwrap()).expect("failed to write schema");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run spec-cli")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_summary_for_valid_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["check", path_str(&schema)]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Compiled 'tools': 2 command(s)"));
}

#[test]
fn check_lists_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    let schema = serde_json::json!({
        "prog": "tools",
        "subparsers": {"commands": [
            {"name": "a", "manager": "handle_a"},
            {"name": "b", "parents": ["ghost"], "manager": "pkg.b"}
        ]}
    });
    fs::write(&path, schema.to_string()).unwrap();

    let output = run(&["check", path_str(&path)]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("2 problem(s)"), "stderr: {err}");
    assert!(err.contains("handle_a"));
    assert!(err.contains("ghost"));
}

#[test]
fn check_rejects_missing_file() {
    let output = run(&["check", "/nonexistent/schema.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error:"));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_values_and_binding() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["parse", path_str(&schema), "--", "build", "--verbose"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["command"], "build");
    assert_eq!(report["binding"], "tools.handlers.build");
    assert_eq!(report["args"]["target"], "release");
    assert_eq!(report["args"]["verbose"], true);
}

#[test]
fn parse_yaml_output() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["parse", path_str(&schema), "--format", "yaml", "--", "pick", "-g"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("command: pick"));
    assert!(out.contains("g: true"));
}

#[test]
fn parse_conflict_exits_with_usage_status() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["parse", path_str(&schema), "--", "pick", "-f", "-g"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("cannot be used with"));
}

#[test]
fn parse_missing_required_command() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["parse", path_str(&schema)]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn parse_help_request_succeeds() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["parse", path_str(&schema), "--", "build", "--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--target"));
}

// ---------------------------------------------------------------------------
// help / commands / config
// ---------------------------------------------------------------------------

#[test]
fn help_renders_root_and_command() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let root = run(&["help", path_str(&schema)]);
    assert!(root.status.success());
    let text = stdout(&root);
    assert!(text.contains("Build tools"));
    assert!(text.contains("build the project"));

    let build = run(&["help", path_str(&schema), "build"]);
    assert!(build.status.success());
    assert!(stdout(&build).contains("chatty output"));

    let unknown = run(&["help", path_str(&schema), "deploy"]);
    assert_eq!(unknown.status.code(), Some(1));
    assert!(stderr(&unknown).contains("Unknown command 'deploy'"));
}

#[test]
fn commands_lists_bindings() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["commands", path_str(&schema)]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "build -> tools.handlers.build\npick -> tools.handlers.pick\n"
    );
}

#[test]
fn reject_policy_from_config_file() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("clash.json");
    let schema = serde_json::json!({
        "prog": "tools",
        "parent_parsers": [{"prog": "common", "options": [{"flag": ["--limit"]}]}],
        "subparsers": {"commands": [{
            "name": "run",
            "parents": ["common"],
            "manager": "tools.handlers.run",
            "options": [{"flag": ["--limit"], "type": "int"}]
        }]}
    });
    fs::write(&schema_path, schema.to_string()).unwrap();

    let default = run(&["check", path_str(&schema_path)]);
    assert!(default.status.success(), "stderr: {}", stderr(&default));

    let config = dir.path().join("compiler.yml");
    fs::write(&config, "inherited_conflicts: reject\n").unwrap();
    let strict = run(&["check", "--config", path_str(&config), path_str(&schema_path)]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(stderr(&strict).contains("--limit"));
}
