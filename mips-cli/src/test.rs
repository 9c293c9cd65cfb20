use super::*;
use mips_core::{ExitReason, StopReason};
use std::io::Write;

fn write_source(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn run_source_executes_assembled_program() {
    let path = write_source("mips-cli-test-run-source.s", ".text\nli $v0, 10\nsyscall\n");
    let (reason, _) = run_source(&path, EngineConfig::default()).unwrap();
    assert!(matches!(reason, ExitReason::ProgramStopped(StopReason::Exit(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn assemble_to_mex_then_run_mex_matches_running_the_source_directly() {
    let src_path = write_source("mips-cli-test-roundtrip.s", ".text\nli $t0, 5\nli $v0, 10\nsyscall\n");
    let mut mex_path = std::env::temp_dir();
    mex_path.push("mips-cli-test-roundtrip.mex");

    assemble_to_mex(&src_path, &mex_path).unwrap();
    let (reason, _) = run_mex(&mex_path, EngineConfig::default()).unwrap();
    assert!(matches!(reason, ExitReason::ProgramStopped(StopReason::Exit(_))));

    std::fs::remove_file(&src_path).unwrap();
    std::fs::remove_file(&mex_path).unwrap();
}

#[test]
fn run_source_on_missing_file_reports_io_error() {
    let path = std::path::Path::new("/nonexistent/path/to/nothing.s");
    let err = run_source(path, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
}
