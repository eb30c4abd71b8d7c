use assert_cmd::Command;
use std::fs;
use std::path::Path;

use slate_core::ast::{CompileUnit, NodeKind, Program, Ty, TypedNode};
use slate_core::symbol::{MethodRef, Named, Qualifier, Table, VarLabel};

fn int() -> Ty {
    Ty::named("SystemInt32")
}

/// `let x = 1 + 2` at top level, optionally with an unresolved call.
fn sample_unit(with_bad_call: bool) -> (CompileUnit, VarLabel) {
    let mut table = Table::new();
    let add = MethodRef::new_static(int(), "op_Addition", vec![int(), int()], vec![int()]);
    table.register_method(add.clone());
    let one = table.literal("1", &int());
    let two = table.literal("2", &int());

    let x = VarLabel::user(Qualifier::from_segments(["Start"]), "x", int());
    let sum = TypedNode::new(
        int(),
        NodeKind::Call {
            method: Some(add),
            instance: None,
            args: vec![TypedNode::new(int(), NodeKind::Literal(one)), TypedNode::new(int(), NodeKind::Literal(two))],
        },
    );
    let mut entry = vec![TypedNode::unit(NodeKind::Let { targets: vec![x.clone()], value: Box::new(sum) })];
    if with_bad_call {
        entry.push(TypedNode::new(int(), NodeKind::Call { method: None, instance: None, args: vec![] }));
    }
    (CompileUnit::new(table, Program { functions: vec![], entry }), x)
}

fn write_unit(dir: &Path, unit: &CompileUnit) -> String {
    let path = dir.join("unit.json");
    fs::write(&path, serde_json::to_string_pretty(unit).expect("serialize unit")).expect("write unit");
    path.to_string_lossy().into_owned()
}

fn slate() -> Command {
    Command::cargo_bin("slate").expect("slate binary built")
}

#[test]
fn build_prints_the_listing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (unit, x) = sample_unit(false);
    let path = write_unit(dir.path(), &unit);

    let output = slate().args(["--plain", "build", &path]).output().expect("run slate");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(".data_start"));
    assert!(stdout.contains(".code_start"));
    assert!(stdout.contains("_start:"));
    assert!(stdout.contains(&x.identifier()));
}

#[test]
fn build_writes_json_to_the_output_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (unit, _) = sample_unit(false);
    let path = write_unit(dir.path(), &unit);
    let out = dir.path().join("program.json");

    slate()
        .args(["--plain", "build", &path, "--json", "-o"])
        .arg(&out)
        .assert()
        .success();

    let raw = fs::read_to_string(&out).expect("output written");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert!(value.get("data").is_some_and(|d| d.is_array()));
    assert!(value.get("code").is_some_and(|c| c.is_array()));
}

#[test]
fn inspect_prints_tables() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (unit, x) = sample_unit(false);
    let path = write_unit(dir.path(), &unit);

    let output = slate().args(["--plain", "inspect", &path]).output().expect("run slate");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Data part"));
    assert!(stdout.contains("Out-value pool"));
    assert!(stdout.contains(&x.identifier()));
}

#[test]
fn unresolved_call_fails_with_diagnostics() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (unit, _) = sample_unit(true);
    let path = write_unit(dir.path(), &unit);

    let output = slate().args(["--plain", "build", &path]).output().expect("run slate");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SLATE |"));
    assert!(stderr.contains("1 diagnostic(s)"));
}

#[test]
fn unreadable_config_exits_with_io_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (unit, _) = sample_unit(false);
    let path = write_unit(dir.path(), &unit);
    let config = dir.path().join("options.json");
    fs::write(&config, "{ broken").expect("write config");

    let output = slate().args(["--plain", "build", &path, "-c"]).arg(&config).output().expect("run slate");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("parse config"));
}

#[test]
fn missing_unit_exits_with_io_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let absent = dir.path().join("absent.json");

    let output = slate().args(["--plain", "build"]).arg(&absent).output().expect("run slate");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("read compile unit"));
}

#[test]
fn malformed_unit_exits_with_io_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("unit.json");
    fs::write(&path, "[1, 2").expect("write unit");

    let output = slate().args(["--plain", "inspect"]).arg(&path).output().expect("run slate");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("parse compile unit"));
}
