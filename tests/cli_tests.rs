use serde_json::{json, Value};
use std::process::Command;

pub mod common;

use crate::common::{plan_json, write_plan};
use crate::setup::create_test_pdf;

fn tagger() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pdf-ua-tagger"))
}

#[test]
fn missing_plan_argument_reports_usage_as_json() {
    let output = tagger().output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], json!(false));
    assert!(report["errors"][0].as_str().unwrap().starts_with("Usage:"));
}

#[test]
fn successful_run_prints_compact_report() {
    let dir = tempfile::tempdir().unwrap();
    let built = create_test_pdf(dir.path()).unwrap();
    let out = dir.path().join("out.pdf");
    let plan = write_plan(
        dir.path(),
        &plan_json(&built.path, &out, json!([{"type": "link", "page": 0, "link_text": "Home"}])),
    );

    let output = tagger().arg(&plan).arg("--compact").output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim().lines().count(), 1);
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["tags_applied"], json!(1));
    assert!(out.exists());
}

#[test]
fn unreadable_plan_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = tagger().arg(dir.path().join("missing.json")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], json!(false));
}
