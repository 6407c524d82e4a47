#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use synthesis_benchmark_rs::log_parser::parse_file;
use synthesis_benchmark_rs::runner::{Invocation, Mode, Runner, ScriptRunner};
use synthesis_benchmark_rs::Error;
use tempfile::tempdir;

fn script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("bench.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn runner(program: &Path) -> ScriptRunner {
    ScriptRunner::new(program, Duration::ZERO, Duration::from_millis(10))
}

#[test]
fn combined_output_lands_in_the_log() {
    let dir = tempdir().unwrap();
    let program = script(
        dir.path(),
        r#"echo "args: $*"
echo "warming up" >&2
printf '{\n  accuracy: 1,\n  error: 0.5,\n  elems: 3,\n  constraints: 9,\n  prep: 0.1,\n  resize: 0.2,\n  synth: 7.5\n}\n'
exit 3"#,
    );
    let log = dir.path().join("bench-x.log");
    let invocation = Invocation::new("grp", "x", Mode::Hier, Duration::from_secs(5))
        .with_args(&["--loclearn".to_string(), "bayesian".to_string()]);

    // A non-zero exit is not a failure; the log decides.
    runner(&program).run(&invocation, &log).unwrap();

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("args: grp x hier --timeout 5 --loclearn bayesian"));
    assert!(text.contains("warming up"));
    let record = parse_file(&log, "x");
    assert!(record.finished);
    assert_eq!(record.synth, 7.5);
}

#[test]
fn overrunning_process_is_killed() {
    let dir = tempdir().unwrap();
    let program = script(dir.path(), "sleep 30");
    let log = dir.path().join("bench-slow.log");
    let invocation = Invocation::new("grp", "slow", Mode::Base, Duration::from_secs(0));

    let start = Instant::now();
    let err = runner(&program).run(&invocation, &log).unwrap_err();
    assert!(matches!(err, Error::Timeout { ref instance, .. } if instance == "slow"));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(!parse_file(&log, "slow").finished);
}

#[test]
fn missing_program_is_an_invocation_failure() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("bench-none.log");
    let invocation = Invocation::new("grp", "none", Mode::Hier, Duration::from_secs(1));
    let err = runner(&dir.path().join("no-such-script"))
        .run(&invocation, &log)
        .unwrap_err();
    assert!(matches!(err, Error::RunInvocation { .. }));
}
