use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn quill_eval_prints_result() {
    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("eval").arg("(+ 1 2 3)");
    cmd.assert().success().stdout("6\n");
}

#[test]
fn quill_run_script_displays_and_prints_result() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("program.scm");
    fs::write(
        &script,
        "(define (square x) (* x x))\n(display (list 1 2 3))\n(square 9)\n",
    )
    .expect("write script");

    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert().success().stdout("(1 2 3)\n81\n");
}

#[test]
fn quill_reports_unbound_symbol() {
    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("eval").arg("(+ 1 undefinedVar)");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("UnboundSymbolError"))
        .stderr(predicate::str::contains("undefinedVar"));
}

#[test]
fn quill_rejects_binary_script() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("binary.scm");
    fs::write(&script, [0xffu8, 0xfe, 0x28]).expect("write script");

    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("LexError"));
}

#[test]
fn quill_max_depth_flag_limits_recursion() {
    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("--max-depth")
        .arg("50")
        .arg("eval")
        .arg("(define (spin n) (spin n)) (spin 0)");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("StackOverflowError"));
}

#[test]
fn quill_reports_parse_errors() {
    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("eval").arg("(+ 1 2");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ParseError"));
}

#[test]
fn quill_reports_deeply_nested_script_as_stack_overflow() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("deep.scm");
    let depth = 100_000;
    fs::write(&script, format!("{}1{}", "(".repeat(depth), ")".repeat(depth)))
        .expect("write script");

    let mut cmd = Command::cargo_bin("quill").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("StackOverflowError"));
}
