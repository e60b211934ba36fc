//! Binary-level tests: drive the compiled `ferrocc` executable.

use std::io::Write;
use std::process::{Command, Stdio};

fn ferrocc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ferrocc"))
}

#[test]
fn compiles_a_file_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("ret3.c");
    std::fs::write(&input, "int main() { return 3; }\n").expect("write input");

    let out = ferrocc().arg(&input).output().expect("run ferrocc");
    assert!(out.status.success());
    let asm = String::from_utf8(out.stdout).expect("utf-8 assembly");
    assert!(asm.contains(".global main"));
    assert!(asm.contains("mov $3, %rax"));
}

#[test]
fn dash_reads_standard_input() {
    let mut child = ferrocc()
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn ferrocc");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(b"int main() { return 7; }\n")
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait");
    assert!(out.status.success());
    let asm = String::from_utf8(out.stdout).expect("utf-8 assembly");
    assert!(asm.contains("mov $7, %rax"));
}

#[test]
fn output_flag_writes_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.c");
    let output = dir.path().join("out.s");
    std::fs::write(&input, "int main() { return 0; }\n").expect("write input");

    let out = ferrocc()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .expect("run ferrocc");
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    let asm = std::fs::read_to_string(&output).expect("read output");
    assert!(asm.contains(".global main"));
}

#[test]
fn compile_errors_exit_nonzero_with_a_caret() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("bad.c");
    std::fs::write(&input, "int main() { return ghost; }\n").expect("write input");

    let out = ferrocc().arg(&input).output().expect("run ferrocc");
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).expect("utf-8 stderr");
    assert!(stderr.contains(":1: int main() { return ghost; }"));
    assert!(stderr.contains("^ undefined variable"));
}

#[test]
fn missing_input_file_reports_an_error() {
    let out = ferrocc().arg("/no/such/file.c").output().expect("run ferrocc");
    assert!(!out.status.success());
    assert!(!out.stderr.is_empty());
}
