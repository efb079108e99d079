use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::{tempdir, TempDir};

const PASSPHRASE: &str = "test-passphrase-secure-123";

const POSTGRES_CONFIG: &str = r#"{
  "id": "pg-prod",
  "name": "Production",
  "type": "pgsql",
  "metadata": {
    "host": "db.internal",
    "port": "5432",
    "database": "app",
    "user": "analyst",
    "password": "hunter22-secret",
    "sslEnabled": true
  },
  "version": 1
}"#;

const PROJECT: &str = r#"
version: "1.0"
project:
  id: analytics
  name: Analytics
  integrations:
    - {id: pg-prod, name: Production, type: pgsql}
    - {id: warehouse, name: Warehouse, type: big-query}
  notebooks: []
"#;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_deepnote"))
}

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempdir().expect("tempdir should be created");
        std::fs::create_dir_all(root.path().join("config")).expect("create config dir");
        Self { root }
    }

    fn store(&self) -> PathBuf {
        self.root.path().join("store")
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, contents).expect("write should succeed");
        path
    }

    fn command(&self, passphrase: &str) -> Command {
        let mut cmd = Command::new(bin());
        cmd.env("XDG_CONFIG_HOME", self.root.path().join("config"))
            .env("XDG_DATA_HOME", self.root.path().join("data"))
            .env("DEEPNOTE_STORE", self.store())
            .env("DEEPNOTE_PASSPHRASE", passphrase)
            .env_remove("DEEPNOTE_LOG")
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(PASSPHRASE)
            .args(args)
            .output()
            .expect("command should run")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[test]
fn test_add_list_show_remove_flow() {
    let sandbox = Sandbox::new();
    let config = sandbox.write("pg.json", POSTGRES_CONFIG);

    let output = sandbox.run(&["add", path_arg(&config)]);
    assert_success(&output);
    assert!(stdout(&output).contains("Added integration pg-prod"));

    let output = sandbox.run(&["list", "--json"]);
    assert_success(&output);
    let listed: Value = serde_json::from_str(&stdout(&output)).expect("list JSON");
    assert_eq!(listed[0]["id"], "pg-prod");
    assert_eq!(listed[0]["type"], "pgsql");

    let output = sandbox.run(&["show", "pg-prod"]);
    assert_success(&output);
    let shown = stdout(&output);
    assert!(shown.contains("db.internal"));
    assert!(!shown.contains("hunter22-secret"));

    for entry in std::fs::read_dir(sandbox.store()).expect("store should exist") {
        let bytes = std::fs::read(entry.expect("entry").path()).expect("read blob");
        assert!(!String::from_utf8_lossy(&bytes).contains("hunter22-secret"));
    }

    let output = sandbox.run(&["remove", "pg-prod"]);
    assert_success(&output);

    let output = sandbox.run(&["show", "pg-prod"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_add_from_stdin() {
    let sandbox = Sandbox::new();

    let mut child = sandbox
        .command(PASSPHRASE)
        .args(["add", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("command should spawn");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(POSTGRES_CONFIG.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("command should finish");

    assert_success(&output);
}

#[test]
fn test_project_commands() {
    let sandbox = Sandbox::new();
    let config = sandbox.write("pg.json", POSTGRES_CONFIG);
    let project = sandbox.write("analytics.deepnote", PROJECT);
    assert_success(&sandbox.run(&["add", path_arg(&config)]));

    let output = sandbox.run(&["detect", path_arg(&project), "--json"]);
    assert_success(&output);
    let detected: Value = serde_json::from_str(&stdout(&output)).expect("detect JSON");
    assert_eq!(detected[0]["id"], "pg-prod");
    assert_eq!(detected[0]["status"], "connected");
    assert_eq!(detected[1]["id"], "warehouse");
    assert_eq!(detected[1]["status"], "disconnected");

    let output = sandbox.run(&["env", path_arg(&project), "--json"]);
    assert_success(&output);
    let variables: Value = serde_json::from_str(&stdout(&output)).expect("env JSON");
    let pg: Value = serde_json::from_str(
        variables["SQL_PG_PROD"]
            .as_str()
            .expect("variable should be a string"),
    )
    .expect("descriptor JSON");
    assert_eq!(pg["params"]["sslmode"], "require");
    assert!(variables.get("SQL_DEEPNOTE_DATAFRAME_SQL").is_some());
    assert!(variables.get("SQL_WAREHOUSE").is_none());

    let output = sandbox.run(&["startup-code", path_arg(&project)]);
    assert_success(&output);
    let code = stdout(&output);
    assert!(code.starts_with("try:\n"));
    assert!(code.contains(r#"os.environ["SQL_PG_PROD"]"#));

    let output = sandbox.run(&["startup-code", path_arg(&project), "--language", "r"]);
    assert_success(&output);
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_wrong_passphrase_exits_with_auth_code() {
    let sandbox = Sandbox::new();
    let config = sandbox.write("pg.json", POSTGRES_CONFIG);
    assert_success(&sandbox.run(&["add", path_arg(&config)]));

    let output = sandbox
        .command("a-completely-different-passphrase")
        .args(["list"])
        .output()
        .expect("command should run");

    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_reserved_and_invalid_input_exit_codes() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["remove", "deepnote-dataframe-sql"]);
    assert_eq!(output.status.code(), Some(4));

    let invalid = sandbox.write("bad.json", r#"{"id":"pg","name":"x","type":"pgsql","metadata":{}}"#);
    let output = sandbox.run(&["add", path_arg(&invalid)]);
    assert_eq!(output.status.code(), Some(4));

    let output = sandbox.run(&["add", path_arg(&sandbox.root.path().join("missing.json"))]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_add_rejects_dataframe_engine_config() {
    let sandbox = Sandbox::new();
    let duck = sandbox.write(
        "duck.json",
        r#"{"id":"my-duck","name":"Duck","type":"pandas-dataframe","metadata":{}}"#,
    );

    let output = sandbox.run(&["add", path_arg(&duck)]);
    assert_eq!(output.status.code(), Some(4));
    assert!(!stdout(&output).contains("Added integration"));

    let output = sandbox.run(&["list", "--json"]);
    assert_success(&output);
    let listed: Value = serde_json::from_str(&stdout(&output)).expect("list JSON");
    assert_eq!(listed, Value::Array(Vec::new()));
}

#[test]
fn test_show_masks_untyped_snowflake_auth_fields() {
    let sandbox = Sandbox::new();
    let config = sandbox.write(
        "sf.json",
        r#"{
  "id": "sf",
  "name": "Snow",
  "type": "snowflake",
  "metadata": {
    "accountName": "acme",
    "authMethod": "okta",
    "clientId": "client-id",
    "clientSecret": "TOP-SECRET-VALUE"
  }
}"#,
    );
    assert_success(&sandbox.run(&["add", path_arg(&config)]));

    let output = sandbox.run(&["show", "sf"]);
    assert_success(&output);
    let shown = stdout(&output);
    assert!(shown.contains("acme"));
    assert!(!shown.contains("TOP-SECRET-VALUE"));
}

#[test]
fn test_clear_requires_confirmation_without_terminal() {
    let sandbox = Sandbox::new();
    let config = sandbox.write("pg.json", POSTGRES_CONFIG);
    assert_success(&sandbox.run(&["add", path_arg(&config)]));

    let output = sandbox.run(&["clear"]);
    assert_eq!(output.status.code(), Some(4));

    let output = sandbox.run(&["clear", "--yes"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Removed 1 integration(s)"));

    let output = sandbox.run(&["list"]);
    assert_success(&output);
    assert!(stdout(&output).contains("No integrations stored."));
}

#[test]
fn test_missing_passphrase_without_terminal_fails() {
    let sandbox = Sandbox::new();

    let output = sandbox
        .command(PASSPHRASE)
        .env_remove("DEEPNOTE_PASSPHRASE")
        .args(["list"])
        .output()
        .expect("command should run");

    assert_eq!(output.status.code(), Some(5));
}
