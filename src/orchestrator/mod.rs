use crate::catalog::{BenchmarkCatalog, FocusSpec, RootBenchmark, ScriptConfig};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::log_parser;
use crate::measurement::{aggregate_average, aggregate_sum, MeasurementRecord};
use crate::report::{HierComparison, ReportWriter};
use crate::runner::{Invocation, Mode, Runner};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

/// Rows of a macro report: one per root, then the average and the sum.
#[derive(Debug, Clone)]
pub struct MacroOutcome {
    pub records: Vec<MeasurementRecord>,
    pub average: Option<MeasurementRecord>,
    pub sum: Option<MeasurementRecord>,
    pub report: PathBuf,
}

impl MacroOutcome {
    /// Every row in report order.
    pub fn rows(&self) -> Vec<MeasurementRecord> {
        let mut rows = self.records.clone();
        rows.extend(self.average.iter().cloned());
        rows.extend(self.sum.iter().cloned());
        rows
    }
}

/// Rows of a micro report, each tagged with its root id.
#[derive(Debug, Clone)]
pub struct MicroOutcome {
    pub rows: Vec<(String, MeasurementRecord)>,
    pub report: PathBuf,
}

/// Drives the external runner over the catalog and writes reports.
pub struct Orchestrator<R: Runner> {
    config: HarnessConfig,
    runner: R,
}

impl<R: Runner> Orchestrator<R> {
    pub fn new(config: HarnessConfig, runner: R) -> Self {
        Orchestrator { config, runner }
    }

    /// One row per root (except the excluded one) from the log its `main`
    /// run left behind, followed by `avg` and `sum` rows.
    pub fn run_macro(&self, catalog: &BenchmarkCatalog) -> Result<MacroOutcome> {
        let mut report = ReportWriter::macro_report(self.config.macro_report_path())?;
        info!("starting macrobenchmarks");

        let mut records = Vec::new();
        for (root_id, root) in catalog.iter() {
            if root_id == self.config.excluded_root {
                continue;
            }
            info!("running macro {}", root_id);

            let record = self.macro_item(root_id, root).unwrap_or_else(|e| {
                warn!("exception: {}", e);
                MeasurementRecord::tombstone(root_id)
            });
            report.row(&record)?;
            records.push(record);
        }

        let (mut average, mut sum) = (None, None);
        if !records.is_empty() {
            let avg = aggregate_average(&records, "avg");
            report.row(&avg)?;
            let total = aggregate_sum(&records, "sum");
            report.row(&total)?;
            average = Some(avg);
            sum = Some(total);
        }

        let report = report.finish()?;
        Ok(MacroOutcome {
            records,
            average,
            sum,
            report,
        })
    }

    fn macro_item(&self, root_id: &str, root: &RootBenchmark) -> Result<MeasurementRecord> {
        let main = root
            .main()
            .ok_or_else(|| Error::MissingMain(root_id.to_string()))?;
        let log_path = self.config.bench_log_path(&main.script_key);

        if self.config.macro_rerun {
            let invocation = Invocation::new(
                &root.script_key,
                &main.script_key,
                Mode::Hier,
                self.config.micro_timeout,
            )
            .with_args(&self.config.learner_flags);
            self.runner.run(&invocation, &log_path)?;
        }

        Ok(log_parser::parse_file(&log_path, &main.script_key))
    }

    /// Runs every sub-benchmark other than `main` of the admitted roots,
    /// one row each. A failing item becomes a tombstone named by its id.
    pub fn run_micro(&self, catalog: &BenchmarkCatalog, only: &[String]) -> Result<MicroOutcome> {
        let mut report = ReportWriter::micro_report(self.config.micro_report_path())?;
        fs::create_dir_all(&self.config.output_dir)?;
        let script_config = self.script_config();
        info!("starting all microbenchmarks");

        let mut rows = Vec::new();
        for (root_id, root) in catalog.iter() {
            if !HarnessConfig::admits(only, root_id) {
                continue;
            }
            info!("running group {}", root_id);

            let mut group = Vec::new();
            for (micro_id, micro) in root.micros() {
                let record = self
                    .micro_item(root, micro, script_config.as_ref())
                    .unwrap_or_else(|e| {
                        warn!("exception: {}", e);
                        MeasurementRecord::tombstone(micro_id)
                    });
                report.group_row(root_id, &record)?;
                group.push(record);
            }

            if self.config.group_summary && !group.is_empty() {
                let avg = aggregate_average(&group, &format!("{}-avg", root_id));
                let total = aggregate_sum(&group, &format!("{}-sum", root_id));
                report.group_row(root_id, &avg)?;
                report.group_row(root_id, &total)?;
                group.push(avg);
                group.push(total);
            }

            rows.extend(group.into_iter().map(|r| (root_id.to_string(), r)));
        }

        let report = report.finish()?;
        Ok(MicroOutcome { rows, report })
    }

    fn script_config(&self) -> Option<ScriptConfig> {
        let path = &self.config.script_config_path;
        if !path.exists() {
            warn!("{} not found, skipping runner entry checks", path.display());
            return None;
        }
        match ScriptConfig::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                Some(ScriptConfig::default())
            }
        }
    }

    fn micro_item(
        &self,
        root: &RootBenchmark,
        micro: &FocusSpec,
        script_config: Option<&ScriptConfig>,
    ) -> Result<MeasurementRecord> {
        if let Some(config) = script_config {
            if !config.has_ranges(&root.script_key, &micro.script_key) {
                return Err(Error::MissingScriptEntry {
                    group: root.script_key.clone(),
                    instance: micro.script_key.clone(),
                });
            }
        }

        let log_path = self.config.bench_log_path(&micro.script_key);
        let invocation = Invocation::new(
            &root.script_key,
            &micro.script_key,
            Mode::Hier,
            self.config.micro_timeout,
        )
        .with_args(&self.config.learner_flags);
        self.runner.run(&invocation, &log_path)?;

        Ok(log_parser::parse_file(&log_path, &micro.script_key))
    }

    /// Times each configured size under both variants and averages the
    /// synthesis time over the repetitions.
    pub fn run_hier(&self) -> Result<HierComparison> {
        let hier_config = &self.config.hier;
        fs::create_dir_all(&self.config.output_dir)?;

        let mut comparison = HierComparison {
            hier: Vec::new(),
            flat: Vec::new(),
        };
        for (idx, size) in hier_config.sizes.iter().enumerate() {
            for mode in [Mode::Hier, Mode::Base] {
                info!("starting {} benches for {}", mode.as_flag(), size);
                let time = self.mean_synth_time(idx, size, mode);
                match mode {
                    Mode::Hier => comparison.hier.push(time),
                    Mode::Base => comparison.flat.push(time),
                }
            }
        }
        Ok(comparison)
    }

    fn mean_synth_time(&self, idx: usize, size: &str, mode: Mode) -> Option<f64> {
        let hier_config = &self.config.hier;
        let log_path = self.config.hier_log_path(mode, idx);
        let name = log_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut repetitions = Vec::with_capacity(hier_config.iterations);
        for i in 0..hier_config.iterations {
            info!("starting iter {}", i);
            let invocation = Invocation::new(&hier_config.group, size, mode, hier_config.timeout);
            let record = match self.runner.run(&invocation, &log_path) {
                Ok(()) => log_parser::parse_file(&log_path, &name),
                Err(e) => {
                    warn!("exception: {}", e);
                    MeasurementRecord::tombstone(&name)
                }
            };
            repetitions.push(record);
        }

        if repetitions.is_empty() {
            return None;
        }
        let mean = aggregate_average(&repetitions, &name);
        mean.finished.then_some(mean.synth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    enum Canned {
        Synth(f64),
        Crashed,
        Unstartable,
    }

    /// Writes a canned log per instance and records what it was asked to run.
    struct CannedRunner {
        outcome: fn(&Invocation) -> Canned,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl CannedRunner {
        fn new(outcome: fn(&Invocation) -> Canned) -> Self {
            CannedRunner {
                outcome,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Runner for CannedRunner {
        fn run(&self, invocation: &Invocation, log_path: &Path) -> Result<()> {
            self.calls.borrow_mut().push(invocation.args());
            let body = match (self.outcome)(invocation) {
                Canned::Synth(synth) => format!(
                    "{{\n  accuracy: 1,\n  error: 0.5,\n  elems: 10,\n  constraints: 20,\n  prep: 0.1,\n  resize: 0.2,\n  synth: {}\n}}\n",
                    synth
                ),
                Canned::Crashed => "crashed\n".to_string(),
                Canned::Unstartable => {
                    return Err(Error::RunInvocation {
                        group: invocation.group.clone(),
                        instance: invocation.instance.clone(),
                        reason: "Permission denied".to_string(),
                    })
                }
            };
            fs::write(log_path, body)?;
            Ok(())
        }
    }

    fn config(dir: &TempDir) -> HarnessConfig {
        HarnessConfig {
            output_dir: dir.path().join("out"),
            script_config_path: dir.path().join("benches.json"),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn hier_comparison_averages_synth_per_variant() {
        let dir = tempdir().unwrap();
        let runner = CannedRunner::new(|inv| match (inv.mode, inv.instance.as_str()) {
            (Mode::Hier, "fwt-posts-3") => Canned::Synth(2.0),
            (Mode::Base, "fwt-posts-3") => Canned::Synth(4.0),
            (Mode::Hier, _) => Canned::Synth(1.0),
            (Mode::Base, _) => Canned::Crashed,
        });
        let orchestrator = Orchestrator::new(config(&dir), runner);
        let cmp = orchestrator.run_hier().unwrap();

        assert_eq!(cmp.hier, vec![Some(2.0), Some(1.0), Some(1.0), Some(1.0)]);
        assert_eq!(cmp.flat, vec![Some(4.0), None, None, None]);
        // 4 sizes x 2 variants x 3 repetitions
        assert_eq!(orchestrator.runner.calls.borrow().len(), 24);
        assert_eq!(
            orchestrator.runner.calls.borrow()[3],
            vec!["fwt", "fwt-posts-3", "base", "--timeout", "240"]
        );
    }

    #[test]
    fn hier_runner_failure_reports_no_time() {
        let dir = tempdir().unwrap();
        let runner = CannedRunner::new(|inv| match (inv.mode, inv.instance.as_str()) {
            (Mode::Base, "fwt-posts-6") => Canned::Unstartable,
            (Mode::Hier, "fwt-posts-12") => Canned::Unstartable,
            (Mode::Hier, _) => Canned::Synth(2.0),
            (Mode::Base, _) => Canned::Synth(5.0),
        });
        let orchestrator = Orchestrator::new(config(&dir), runner);
        let cmp = orchestrator.run_hier().unwrap();

        assert_eq!(cmp.hier, vec![Some(2.0), Some(2.0), Some(2.0), None]);
        assert_eq!(cmp.flat, vec![Some(5.0), None, Some(5.0), Some(5.0)]);
        // Failed repetitions do not stop the remaining ones.
        assert_eq!(orchestrator.runner.calls.borrow().len(), 24);
    }

    #[test]
    fn macro_rerun_invokes_runner_for_main() {
        let dir = tempdir().unwrap();
        let catalog = BenchmarkCatalog::from_json(
            r#"{"r": {"script_key": "rk", "benches": {"main": {"script_key": "rk-main"}}}}"#,
        )
        .unwrap();
        let runner = CannedRunner::new(|_| Canned::Synth(3.0));
        let orchestrator = Orchestrator::new(
            HarnessConfig {
                macro_rerun: true,
                ..config(&dir)
            },
            runner,
        );
        fs::create_dir_all(dir.path().join("out")).unwrap();
        let outcome = orchestrator.run_macro(&catalog).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].finished);
        assert_eq!(outcome.records[0].name, "rk-main");
        let calls = orchestrator.runner.calls.borrow();
        assert_eq!(calls[0][..3], ["rk", "rk-main", "hier"]);
    }
}
