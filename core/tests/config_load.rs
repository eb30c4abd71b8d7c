mod common;

use std::io::Write;

use common::*;
use slate_core::ast::{CompileUnit, Program};
use slate_core::ir::{CodeAddress, Instruction};
use slate_core::symbol::Qualifier;
use slate_core::{compile, compile_file, CompileOptions};

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn options_file_overrides_only_named_keys() {
    let file = write_temp(r#"{"return_sentinel": 4096, "types": {"address": "SystemUInt64"}}"#);
    let opts = CompileOptions::load_from_file(file.path()).expect("load options");
    assert_eq!(opts.return_sentinel, 4096);
    assert_eq!(opts.types.address, "SystemUInt64");
    assert_eq!(opts.types.int, "SystemInt32");
    assert_eq!(opts.entry_event, "Start");
    assert!(opts.indent);
}

#[test]
fn malformed_options_name_the_file() {
    let file = write_temp("{ not json");
    let err = CompileOptions::load_from_file(file.path()).expect_err("malformed json");
    assert_eq!(err.path.as_deref(), Some(file.path()));
    assert!(err.message.starts_with("parse config"));
}

#[test]
fn missing_options_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = CompileOptions::load_from_file(dir.path().join("absent.json")).expect_err("no file");
    assert!(err.message.starts_with("read config"));
}

#[test]
fn blank_type_name_is_rejected_on_load() {
    let file = write_temp(r#"{"types": {"this": ""}}"#);
    assert!(CompileOptions::load_from_file(file.path()).is_err());
}

#[test]
fn custom_sentinel_ends_every_hook() {
    let mut fx = Fixture::new();
    let x = var(&entry_scope(), "x", int());
    let stmt = assign(&x, fx.int_lit(1));
    let unit = fx.unit(Program { functions: vec![], entry: vec![stmt] });
    let opts = CompileOptions { return_sentinel: 0x10, indent: false, ..CompileOptions::default() };
    let program = compile(&unit, &opts).expect("compiles");

    let code = &program.blocks[0].code;
    assert_eq!(code.instructions().last(), Some(&Instruction::Jump(CodeAddress::Absolute(0x10))));
    assert!(code.iter().all(|op| !matches!(op, Instruction::Indent(_))));
    assert!(program.to_string().contains("JUMP, 0x00000010"));
}

#[test]
fn entry_statements_follow_the_configured_event() {
    let mut fx = Fixture::new();
    let x = var(&Qualifier::from_segments(["Update"]), "x", int());
    let stmt = assign(&x, fx.int_lit(1));
    let unit = fx.unit(Program { functions: vec![], entry: vec![stmt] });
    let opts = CompileOptions { entry_event: "Update".to_string(), ..CompileOptions::default() };
    let program = compile(&unit, &opts).expect("compiles");
    assert!(program.block("_update").is_some());
    assert!(program.block("_start").is_none());
}

#[test]
fn compile_file_reads_a_serialized_unit() {
    let mut fx = Fixture::new();
    let x = var(&entry_scope(), "x", int());
    let stmt = assign(&x, fx.int_lit(7));
    let unit = fx.unit(Program { functions: vec![], entry: vec![stmt] });
    let file = write_temp(&serde_json::to_string(&unit).expect("serialize unit"));

    let from_file = compile_file(file.path(), &CompileOptions::default()).unwrap_or_else(|_| panic!("unit compiles"));
    let direct = compile(&unit, &CompileOptions::default()).expect("compiles");
    assert_eq!(from_file, direct);

    let reloaded = CompileUnit::load_from_file(file.path()).expect("reload");
    assert_eq!(reloaded.program, unit.program);
}

#[test]
fn compile_file_reports_an_unreadable_unit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let errs = match compile_file(dir.path().join("missing.json"), &CompileOptions::default()) {
        Ok(_) => panic!("missing file compiled"),
        Err(errs) => errs,
    };
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].issuer(), "config");
}
