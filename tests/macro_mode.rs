use std::fs;
use std::path::Path;
use synthesis_benchmark_rs::catalog::BenchmarkCatalog;
use synthesis_benchmark_rs::config::HarnessConfig;
use synthesis_benchmark_rs::measurement::TABLE_HEADER;
use synthesis_benchmark_rs::orchestrator::Orchestrator;
use synthesis_benchmark_rs::runner::{Invocation, Runner};
use synthesis_benchmark_rs::{Error, Result};
use tempfile::tempdir;

/// Macro mode only reads logs; any call here is a failure.
struct NoRunner;

impl Runner for NoRunner {
    fn run(&self, invocation: &Invocation, _log_path: &Path) -> Result<()> {
        Err(Error::RunInvocation {
            group: invocation.group.clone(),
            instance: invocation.instance.clone(),
            reason: "runner must not be invoked".to_string(),
        })
    }
}

const LOG: &str = "\
compiling layout
{
  accuracy: 0.875,
  error: 2.5,
  elems: 64,
  constraints: 410,
  prep: 0.25,
  resize: 1.5,
  synth: 30.125
}
";

fn strip_name(row: &str) -> &str {
    &row[row.find(',').unwrap()..]
}

#[test]
fn single_root_report_has_header_row_avg_and_sum() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("bench-r.log"), LOG).unwrap();

    let catalog = BenchmarkCatalog::from_json(
        r#"{"R": {"script_key": "r", "benches": {
                "main": {"root": "body", "script_key": "r"},
                "s1": {"root": "nav", "script_key": "s1"}}}}"#,
    )
    .unwrap();
    let config = HarnessConfig {
        output_dir: out.clone(),
        ..HarnessConfig::default()
    };
    let outcome = Orchestrator::new(config, NoRunner).run_macro(&catalog).unwrap();

    let content = fs::read_to_string(&outcome.report).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], TABLE_HEADER);
    assert_eq!(lines[1], "r,2.500,64,0.875,410,0.250,1.500,30.125");
    assert!(lines[2].starts_with("avg,"));
    assert!(lines[3].starts_with("sum,"));
    assert_eq!(strip_name(lines[2]), strip_name(lines[1]));
    assert_eq!(strip_name(lines[3]), strip_name(lines[1]));
}

#[test]
fn failed_roots_stay_visible_and_synthetic_is_skipped() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("bench-a-main.log"), LOG).unwrap();
    fs::write(out.join("bench-b-main.log"), "Error: browser crashed\n").unwrap();
    fs::write(out.join("macro_results.csv"), "left over from last run\n").unwrap();

    let catalog = BenchmarkCatalog::from_json(
        r#"{
            "a": {"script_key": "a", "benches": {"main": {"script_key": "a-main"}}},
            "synthetic": {"script_key": "syn", "benches": {"main": {"script_key": "syn-main"}}},
            "b": {"script_key": "b", "benches": {"main": {"script_key": "b-main"}}},
            "c": {"script_key": "c", "benches": {}}
        }"#,
    )
    .unwrap();
    let config = HarnessConfig {
        output_dir: out.clone(),
        ..HarnessConfig::default()
    };
    let outcome = Orchestrator::new(config, NoRunner).run_macro(&catalog).unwrap();

    let content = fs::read_to_string(&outcome.report).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            TABLE_HEADER,
            "a-main,2.500,64,0.875,410,0.250,1.500,30.125",
            "b-main,-,-,-,-,-,-,-,-",
            "c,-,-,-,-,-,-,-,-",
            "avg,2.500,64,0.875,410,0.250,1.500,30.125",
            "sum,2.500,64,0.875,410,0.250,1.500,30.125",
        ]
    );
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.rows().len(), 5);
}
