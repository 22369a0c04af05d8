//! End-to-end tests of the `floatchat` binary. None of these reach a model.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::tempdir;

const ROWS: &str = r#"[
  {"float_id": 2902746, "PRES": 5.0, "TEMP": 28.4, "PSAL": 35.5, "LATITUDE": 12.1, "LONGITUDE": 85.3, "TIME": "2024-01-05 03:10:00", "profile_id": 0},
  {"float_id": 2902746, "PRES": 10.0, "TEMP": 28.1, "PSAL": 35.6, "LATITUDE": 12.1, "LONGITUDE": 85.3, "TIME": "2024-01-05 03:10:00", "profile_id": 0},
  {"float_id": 2902747, "PRES": 5.0, "TEMP": null, "PSAL": 34.9, "LATITUDE": -3.2, "LONGITUDE": 70.0, "TIME": "2023-12-30 09:00:00", "profile_id": 1}
]"#;

fn floatchat_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_floatchat"))
}

/// Run with a clean FloatChat environment so the host's settings never leak in.
fn floatchat(db: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(floatchat_bin());
    for var in [
        "FLOATCHAT_BACKEND",
        "FLOATCHAT_MODEL",
        "FLOATCHAT_TIMEOUT_SECS",
        "FLOATCHAT_ROW_LIMIT",
        "FLOATCHAT_FALLBACK_PERIOD",
        "FLOATCHAT_FALLBACK_SQL",
        "FLOATCHAT_READ_ONLY",
        "HUGGING_FACE_HUB_TOKEN",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("FLOATCHAT_DB", db)
        .env("RUST_LOG", "off")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("run floatchat")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_load_then_inspect() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("argo.db");
    let rows = dir.path().join("rows.json");
    std::fs::write(&rows, ROWS).unwrap();

    let load = floatchat(&db, &["load", rows.to_str().unwrap()]);
    assert!(load.status.success(), "{}", String::from_utf8_lossy(&load.stderr));
    let text = String::from_utf8_lossy(&load.stdout);
    assert!(text.contains("inserted 2"), "{text}");
    assert!(text.contains("dropped 1"), "{text}");

    let inspect = floatchat(&db, &["inspect", "--json"]);
    assert!(inspect.status.success());
    let overview = stdout_json(&inspect);
    assert_eq!(overview["row_count"], 2);
    assert_eq!(overview["years"], serde_json::json!(["2024"]));
    assert_eq!(overview["sample"]["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn test_load_append_keeps_rows() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("argo.db");
    let rows = dir.path().join("rows.json");
    std::fs::write(&rows, ROWS).unwrap();

    let path = rows.to_str().unwrap();
    assert!(floatchat(&db, &["load", path]).status.success());
    assert!(floatchat(&db, &["load", path, "--append"]).status.success());

    let overview = stdout_json(&floatchat(&db, &["inspect", "--json"]));
    assert_eq!(overview["row_count"], 4);
}

#[test]
fn test_remote_without_token_fails_at_startup() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("argo.db");

    let out = floatchat(
        &db,
        &["ask", "--json", "--backend", "remote", "salinity", "in", "January"],
    );
    assert!(!out.status.success());
    let failure = stdout_json(&out);
    assert_eq!(failure["error"]["stage"], "startup");
    assert!(failure["error"]["message"]
        .as_str()
        .unwrap()
        .contains("HUGGING_FACE_HUB_TOKEN"));
}

#[test]
fn test_blank_question_is_invalid_input() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("argo.db");
    let rows = dir.path().join("rows.json");
    std::fs::write(&rows, ROWS).unwrap();
    assert!(floatchat(&db, &["load", rows.to_str().unwrap()]).status.success());

    let out = floatchat(&db, &["ask", "--json", "   "]);
    assert!(!out.status.success());
    assert_eq!(stdout_json(&out)["error"]["stage"], "input");
}

#[test]
fn test_invalid_backend_is_a_config_error() {
    let dir = tempdir().unwrap();
    let out = floatchat(&dir.path().join("argo.db"), &["--backend", "gpt", "inspect"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown backend"));
}

#[test]
fn test_missing_database_is_not_created() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("typo.db");

    let inspect = floatchat(&db, &["inspect"]);
    assert!(!inspect.status.success());
    assert!(String::from_utf8_lossy(&inspect.stderr).contains("does not exist"));

    let ask = floatchat(&db, &["ask", "--json", "salinity"]);
    assert!(!ask.status.success());
    assert_eq!(stdout_json(&ask)["error"]["stage"], "startup");
    assert!(!db.exists());
}

#[test]
fn test_oversized_timeout_is_a_config_error() {
    let dir = tempdir().unwrap();
    let out = floatchat(
        &dir.path().join("argo.db"),
        &["--timeout-secs", "18446744073709551615", "ask", "salinity"],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("exceeds the maximum"));
}
