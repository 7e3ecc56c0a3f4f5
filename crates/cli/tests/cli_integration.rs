//! CLI integration tests for the `zkplay` subcommands.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! content, and stderr content. Every test runs inside its own temporary
//! directory so a stray `zkplay.toml` cannot leak in.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ABI: &str = r#"{
  "inputs": [
    { "name": "a", "public": true, "type": "field" },
    { "name": "b", "public": false, "type": "bool" },
    { "name": "c", "public": false, "type": "array",
      "components": { "size": 2, "type": "u8" } }
  ],
  "output": { "type": "field" }
}"#;

/// Helper: create a Command for the `zkplay` binary, rooted at `dir`.
fn zkplay(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("zkplay");
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn workspace_with_abi() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("abi.json"), ABI).unwrap();
    dir
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    zkplay(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Front-end for compiling and running zkSNARK programs",
        ));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    zkplay(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zkplay"));
}

#[test]
fn missing_subcommand_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    zkplay(dir.path()).assert().failure();
}

// ──────────────────────────────────────────────
// 2. Schema subcommand
// ──────────────────────────────────────────────

#[test]
fn schema_prints_one_block_per_input() {
    let dir = workspace_with_abi();
    zkplay(dir.path())
        .args(["schema", "abi.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a (field, public):"))
        .stdout(predicate::str::contains("c (u8[2], private):"))
        .stdout(predicate::str::contains("^[0-9]+$"));
}

#[test]
fn schema_json_output() {
    let dir = workspace_with_abi();
    let out = zkplay(dir.path())
        .args(["--output", "json", "schema", "abi.json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let inputs = json["inputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 3);
    assert_eq!(inputs[1]["schema"], serde_json::json!({ "type": "boolean" }));
    assert_eq!(inputs[2]["schema"]["minItems"], 2);
    assert_eq!(inputs[2]["schema"]["maxItems"], 2);
}

#[test]
fn schema_accepts_compiled_artifacts() {
    let dir = TempDir::new().unwrap();
    let artifacts = format!(r#"{{ "program": "AQID", "abi": {} }}"#, ABI);
    fs::write(dir.path().join("artifacts.json"), artifacts).unwrap();
    zkplay(dir.path())
        .args(["schema", "artifacts.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("b (bool, private):"));
}

#[test]
fn schema_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    zkplay(dir.path())
        .args(["schema", "nope.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn schema_unknown_type_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("abi.json"),
        r#"{ "inputs": [ { "name": "x", "public": true, "type": "u128" } ] }"#,
    )
    .unwrap();
    zkplay(dir.path())
        .args(["schema", "abi.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unrecognized component type 'u128'"));
}

// ──────────────────────────────────────────────
// 3. Check subcommand
// ──────────────────────────────────────────────

#[test]
fn check_valid_inputs() {
    let dir = workspace_with_abi();
    zkplay(dir.path())
        .args(["check", "abi.json", "-i", "a=12", "-i", "b=true"])
        .args(["-i", r#"c=["0xff", "7"]"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("a (field): ok"))
        .stdout(predicate::str::contains("b (bool): ok"))
        .stdout(predicate::str::contains("c (u8[2]): ok"))
        .stdout(predicate::str::contains(r#"args: ["12",true,["0xff","7"]]"#));
}

#[test]
fn check_invalid_inputs_still_exit_0() {
    let dir = workspace_with_abi();
    zkplay(dir.path())
        .args(["check", "abi.json", "-i", "a=-1", "-i", "b=yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a (field): invalid"))
        .stdout(predicate::str::contains("b (bool): invalid"))
        .stdout(predicate::str::contains("c (u8[2]): not set"))
        .stdout(predicate::str::contains(r#"args: ["-1","yes",""]"#));
}

#[test]
fn check_json_reports_verdicts() {
    let dir = workspace_with_abi();
    let out = zkplay(dir.path())
        .args(["--output", "json", "check", "abi.json", "-i", "c=[1, 2, 3]"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["valid"], false);
    let c = &json["inputs"][2];
    assert_eq!(c["name"], "c");
    assert_eq!(c["status"], "invalid");
    assert!(!c["diagnostic"].as_str().unwrap().is_empty());
    assert_eq!(json["args"][2], serde_json::json!([1, 2, 3]));
}

#[test]
fn check_reads_inputs_file_and_flags_override() {
    let dir = workspace_with_abi();
    fs::write(
        dir.path().join("values.json"),
        r#"{ "a": "5", "b": true, "c": ["1", "2"] }"#,
    )
    .unwrap();
    zkplay(dir.path())
        .args(["check", "abi.json", "--inputs", "values.json", "-i", "a=6"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"args: ["6",true,["1","2"]]"#));
}

#[test]
fn check_unknown_input_exits_1() {
    let dir = workspace_with_abi();
    zkplay(dir.path())
        .args(["check", "abi.json", "-i", "zzz=1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown input 'zzz'"));
}

#[test]
fn check_malformed_assignment_exits_1() {
    let dir = workspace_with_abi();
    zkplay(dir.path())
        .args(["check", "abi.json", "-i", "a"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn check_json_error_format() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("abi.json"), "{ not json").unwrap();
    let out = zkplay(dir.path())
        .args(["--output", "json", "check", "abi.json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert!(err["error"].as_str().unwrap().contains("invalid JSON"));
}

#[test]
fn quiet_suppresses_error_text() {
    let dir = TempDir::new().unwrap();
    zkplay(dir.path())
        .args(["--quiet", "check", "missing.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 4. Run subcommand
// ──────────────────────────────────────────────

#[test]
fn run_without_engine_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.zok"), "def main() {}").unwrap();
    zkplay(dir.path())
        .args(["run", "main.zok"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no engine configured"));
}

#[test]
fn run_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.zok"), "def main() {}").unwrap();
    fs::write(dir.path().join("zkplay.toml"), "[session]\ndispatch_delay_ms = \"soon\"\n")
        .unwrap();
    zkplay(dir.path())
        .args(["run", "main.zok"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn run_with_missing_engine_binary_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.zok"), "def main() {}").unwrap();
    fs::write(dir.path().join("zkplay.toml"), "[session]\ndispatch_delay_ms = 0\n").unwrap();
    zkplay(dir.path())
        .args(["run", "main.zok", "--engine", "zkplay-no-such-engine-binary"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("engine channel closed"));
}

#[cfg(unix)]
mod with_engine {
    use super::*;

    /// Compiles any source without "broken" in it; computes to 42.
    const ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    *broken*)
      echo '{"kind":"error","payload":{"error":"unexpected token at 1:5","type":"compile"}}' ;;
    *'"kind":"compile"'*)
      echo '{"kind":"compile","payload":{"program":"AQI=","abi":{"inputs":[{"name":"x","public":true,"type":"field"}]}}}' ;;
    *)
      echo '{"kind":"compute","payload":{"output":"42","logs":["witness ok"]}}' ;;
  esac
done
"#;

    fn engine_workspace(source: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("engine.sh"), ENGINE).unwrap();
        fs::write(dir.path().join("main.zok"), source).unwrap();
        fs::write(
            dir.path().join("zkplay.toml"),
            "[session]\ndispatch_delay_ms = 0\n\n[engine]\ncommand = \"sh\"\nargs = [\"engine.sh\"]\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn run_compiles_and_computes() {
        let dir = engine_workspace("def main(field x) -> field { return 42; }");
        zkplay(dir.path())
            .args(["run", "main.zok", "-i", "x=7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Compilation successful (took "))
            .stdout(predicate::str::contains("x (field): ok"))
            .stdout(predicate::str::contains("Successfully computed in "))
            .stdout(predicate::str::contains("output: 42"))
            .stdout(predicate::str::contains("log: witness ok"));
    }

    #[test]
    fn run_submits_invalid_inputs_anyway() {
        let dir = engine_workspace("def main(field x) -> field { return 42; }");
        zkplay(dir.path())
            .args(["run", "main.zok", "-i", "x=abc"])
            .assert()
            .success()
            .stdout(predicate::str::contains("x (field): invalid"))
            .stdout(predicate::str::contains("output: 42"));
    }

    #[test]
    fn run_reports_compile_errors() {
        let dir = engine_workspace("broken program");
        zkplay(dir.path())
            .args(["run", "main.zok"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("unexpected token at 1:5"))
            .stdout(predicate::str::contains("output:").not());
    }

    #[test]
    fn run_compile_only_stops_after_compiling() {
        let dir = engine_workspace("def main() {}");
        zkplay(dir.path())
            .args(["run", "main.zok", "--compile-only"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Compilation successful"))
            .stdout(predicate::str::contains("Successfully computed").not());
    }

    #[test]
    fn run_engine_flag_overrides_config() {
        let dir = engine_workspace("def main() {}");
        fs::write(dir.path().join("zkplay.toml"), "[session]\ndispatch_delay_ms = 0\n").unwrap();
        zkplay(dir.path())
            .args(["run", "main.zok", "--engine", "sh", "--engine-arg", "engine.sh"])
            .args(["-i", "x=1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("output: 42"));
    }

    #[test]
    fn run_json_output_is_one_object() {
        let dir = engine_workspace("def main(field x) -> field { return 42; }");
        let out = zkplay(dir.path())
            .args(["--output", "json", "run", "main.zok", "-i", "x=3"])
            .output()
            .unwrap();
        assert!(out.status.success());
        let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert!(json["compile"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Compilation successful"));
        assert_eq!(json["inputs"][0]["status"], "ok");
        assert_eq!(json["compute"]["output"], "42");
        assert_eq!(json["compute"]["logs"], serde_json::json!(["witness ok"]));
    }
}
