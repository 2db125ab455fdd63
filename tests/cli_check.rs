use std::path::PathBuf;
use std::process::Command;

use cir_syntax::options::DEFAULT_MAX_DEPTH;
use cirparse::cli::ParseArgs;
use cirparse::{check_files, parse_file, render_json};
use tempfile::TempDir;

const GOOD: &str = "cir.func @f(%a : !s32i) -> !s32i {\n  cir.return %a : !s32i\n}\n";
const BAD: &str = "cir.func @g() {\n  cir.br ^nowhere\n}\n";

fn args() -> ParseArgs {
    ParseArgs {
        no_deprecations: false,
        max_depth: DEFAULT_MAX_DEPTH,
    }
}

fn write_files(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let paths = files
        .iter()
        .map(|(name, text)| {
            let path = dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

#[test]
fn test_check_keeps_input_order() {
    let files: Vec<(String, &str)> = (0..9)
        .map(|i| (format!("f{i}.cir"), if i % 3 == 0 { BAD } else { GOOD }))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, t)| (n.as_str(), *t)).collect();
    let (_dir, paths) = write_files(&refs);

    let reports = check_files(&paths, &args(), 4);
    assert_eq!(reports.len(), 9);
    for (i, (path, report)) in paths.iter().zip(&reports).enumerate() {
        let report = report.as_ref().unwrap();
        assert_eq!(&report.path, path);
        assert_eq!(report.result.has_errors(), i % 3 == 0, "file {i}");
    }
}

#[test]
fn test_missing_file_is_an_io_error() {
    let (dir, mut paths) = write_files(&[("ok.cir", GOOD)]);
    paths.push(dir.path().join("absent.cir"));
    let reports = check_files(&paths, &args(), 2);
    assert!(reports[0].is_ok());
    assert!(reports[1].is_err());
}

#[test]
fn test_deep_nesting_within_a_raised_limit() {
    let depth = 200;
    let src = format!(
        "cir.func @f() {{\n{}{}\ncir.return\n}}\n",
        "cir.scope {\n".repeat(depth),
        "}\n".repeat(depth)
    );
    let (_dir, paths) = write_files(&[("deep.cir", src.as_str())]);
    let args = ParseArgs {
        no_deprecations: false,
        max_depth: 256,
    };
    let reports = check_files(&paths, &args, 1);
    let report = reports[0].as_ref().unwrap();
    assert!(report.result.diagnostics.is_empty(), "{:?}", report.result.diagnostics);
}

#[test]
fn test_json_report() {
    let (_dir, paths) = write_files(&[("bad.cir", BAD)]);
    let report = parse_file(&paths[0], &args()).unwrap();
    let json = render_json(std::slice::from_ref(&report)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let diag = &value[0]["diagnostics"][0];
    assert_eq!(diag["severity"], "error");
    assert_eq!(diag["code"], "UnresolvedReferenceError");
    assert_eq!(diag["line"], 2);
    assert_eq!(diag["column"], 10);
    insta::assert_snapshot!(
        diag["message"].as_str().unwrap(),
        @"unresolved reference `^nowhere`: no definition in any enclosing scope"
    );
}

#[test]
fn test_binary_exit_codes() {
    let (_dir, paths) = write_files(&[("good.cir", GOOD), ("bad.cir", BAD)]);
    let bin = env!("CARGO_BIN_EXE_cirparse");

    let ok = Command::new(bin).arg("check").arg(&paths[0]).output().unwrap();
    assert!(ok.status.success());

    let bad = Command::new(bin)
        .args(["check", "--format", "json"])
        .args(&paths)
        .output()
        .unwrap();
    assert_eq!(bad.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&bad.stdout).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
}

#[test]
fn test_binary_print() {
    let (_dir, paths) = write_files(&[("good.cir", GOOD)]);
    let out = Command::new(env!("CARGO_BIN_EXE_cirparse"))
        .arg("print")
        .arg(&paths[0])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), GOOD);
}
