//! End-to-end tests running the `pf` binary.
//!
//! Each test gets a sandbox with its own config path, and dates are
//! normalized in UTC unless a test picks another zone.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary sandbox"),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("pf-config.toml")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("failed to write fixture");
        path
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pf"));
        cmd.args(args);
        cmd.env("PF_CONFIG", self.config_path());
        cmd.env("PF_TIMEZONE", "UTC");
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("PF_LOG");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("failed to run pf")
    }

    fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn pf");
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(stdin.as_bytes())
            .expect("failed to write stdin");
        child.wait_with_output().expect("failed to wait for pf")
    }
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "pf failed\nstatus: {}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("sandbox path is UTF-8")
}

const COLUMNS: &str = r#"[
    {"id": "0000", "name": "id"},
    {"id": "0001", "name": "lastname"}
]"#;

#[test]
fn test_to_tree_from_file() {
    let sandbox = Sandbox::new();
    let filters = sandbox.write(
        "filters.json",
        r#"[
            {"type": "contains", "colId": "0001", "args": {"phrase": [{"value": "Du"}]}},
            {"type": "quality", "args": {"invalid": true, "empty": true}}
        ]"#,
    );

    let output = sandbox.run(&["to-tree", path_str(&filters)]);
    assert_eq!(
        stdout_json(&output),
        json!({"filter": {"and": [
            {"contains": {"field": "0001", "value": "Du"}},
            {"or": [{"invalid": {}}, {"empty": {}}]}
        ]}})
    );
}

#[test]
fn test_to_tree_of_empty_list_from_stdin() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_with_stdin(&["to-tree"], "[]");
    assert_eq!(stdout_json(&output), json!({}));
}

#[test]
fn test_from_tree_with_columns() {
    let sandbox = Sandbox::new();
    let columns = sandbox.write("columns.json", COLUMNS);
    let tree = sandbox.write(
        "tree.json",
        r#"{"filter": {"or": [
            {"eq": {"field": "0001", "value": "a"}},
            {"eq": {"field": "0001", "value": "b"}}
        ]}}"#,
    );

    let output = sandbox.run(&[
        "from-tree",
        path_str(&tree),
        "--columns",
        path_str(&columns),
    ]);
    assert_eq!(
        stdout_json(&output),
        json!([{
            "type": "exact",
            "colId": "0001",
            "colName": "lastname",
            "editable": false,
            "args": {"phrase": [{"value": "a"}, {"value": "b"}]},
            "value": [{"value": "a"}, {"value": "b"}]
        }])
    );
}

#[test]
fn test_from_tree_null_and_empty_inputs() {
    let sandbox = Sandbox::new();

    let output = sandbox.run_with_stdin(&["from-tree"], "null");
    assert_eq!(stdout_json(&output), Value::Null);

    let output = sandbox.run_with_stdin(&["from-tree"], "{}");
    assert_eq!(stdout_json(&output), json!([]));
}

#[test]
fn test_create_prints_filter_and_tree() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&[
        "create",
        "--type",
        "inside-range",
        "--column",
        "0000",
        "--args",
        r#"{"intervals": [{"label": "[1 .. 5[", "value": [1, 5]}], "type": "integer"}"#,
    ]);

    let json = stdout_json(&output);
    assert_eq!(json["filter"]["type"], "inside_range");
    assert_eq!(json["filter"]["value"], json!([{"label": "[1 .. 5[", "value": [1, 5]}]));
    assert_eq!(
        json["tree"],
        json!({"range": {"field": "0000", "start": 1, "end": 5, "type": "integer", "label": "[1 .. 5["}})
    );
}

#[test]
fn test_date_range_uses_configured_timezone() {
    let sandbox = Sandbox::new();
    // 2024-01-10T00:00 in Paris, one hour before UTC midnight.
    let start = 1_704_841_200_000_i64;
    let end = start + 86_400_000;
    let filters = sandbox.write(
        "filters.json",
        &json!([{
            "type": "inside_range",
            "colId": "0000",
            "args": {"intervals": [{"label": "day", "value": [start, end]}], "type": "date"}
        }])
        .to_string(),
    );

    let output = sandbox
        .command(&["to-tree", path_str(&filters)])
        .env("PF_TIMEZONE", "Europe/Paris")
        .output()
        .expect("failed to run pf");
    let tree = stdout_json(&output);
    assert_eq!(tree["filter"]["range"]["start"], json!(start + 3_600_000));

    let output = sandbox.run(&["--timezone", "UTC", "to-tree", path_str(&filters)]);
    assert_eq!(stdout_json(&output)["filter"]["range"]["start"], json!(start));
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_with_stdin(&["--verbose", "to-tree"], "[]");

    assert_eq!(stdout_json(&output), json!({}));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read filter list"));
}

#[test]
fn test_unknown_filter_type_exits_with_code_one() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_with_stdin(
        &["--json", "to-tree"],
        r#"[{"type": "between", "colId": "0000"}]"#,
    );

    assert_eq!(output.status.code(), Some(1));
    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(error["error"]["message"]
        .as_str()
        .unwrap()
        .contains("between"));
}

#[test]
fn test_unrecognized_operator_exits_with_filter_error() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_with_stdin(&["--json", "from-tree"], r#"{"xor": []}"#);

    assert_eq!(output.status.code(), Some(1));
    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "FILTER_ERROR");
}

#[test]
fn test_missing_input_file_exits_with_io_error() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["--json", "to-tree", "does-not-exist.json"]);

    assert_eq!(output.status.code(), Some(3));
    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "IO_ERROR");
}

#[test]
fn test_config_set_then_show() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["config", "set", "dates.timezone", "Asia/Tokyo"]);
    assert!(output.status.success());
    let content = fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(content.contains("timezone = \"Asia/Tokyo\""));

    let output = sandbox
        .command(&["config", "show"])
        .env_remove("PF_TIMEZONE")
        .output()
        .unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["config"]["dates"]["timezone"], "Asia/Tokyo");
    assert_eq!(json["timezone"], "Asia/Tokyo");
}

#[test]
fn test_config_rejects_unknown_key() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["config", "set", "dates.calendar", "gregorian"]);

    assert_eq!(output.status.code(), Some(5));
    assert!(!sandbox.config_path().exists());
}

#[test]
fn test_config_path_honors_override() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["config", "path"]);

    let json = stdout_json(&output);
    assert_eq!(json["path"], path_str(&sandbox.config_path()));
    assert_eq!(json["exists"], false);
}

#[test]
fn test_completions_ignore_broken_config() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.config_path(), "version = [").unwrap();

    let output = sandbox.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pf"));

    let output = sandbox.run(&["to-tree"]);
    assert_eq!(output.status.code(), Some(5));
}
