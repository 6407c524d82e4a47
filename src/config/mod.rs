use crate::runner::Mode;
use std::path::PathBuf;
use std::time::Duration;

pub const CATALOG_PATH: &str = "evaluation-current.json";
pub const SCRIPT_CONFIG_PATH: &str = "benches.json";
pub const OUTPUT_DIR: &str = "eval/tmp/";
pub const BENCH_CACHE_DIR: &str = "bench_cache/";
pub const RUNNER_PATH: &str = "./bench.sh";
pub const MICRO_TIMEOUT_SECS: u64 = 120;
pub const KILL_GRACE_SECS: u64 = 30;

/// Root benchmark that is not structured as a comparable macro case.
pub const EXCLUDED_ROOT: &str = "synthetic";

/// Settings for the hierarchical vs. flat comparison.
#[derive(Debug, Clone)]
pub struct HierConfig {
    pub group: String,
    /// Instance ids in increasing size; entry `i` has `i + 1` rows.
    pub sizes: Vec<String>,
    pub timeout: Duration,
    pub iterations: usize,
}

impl Default for HierConfig {
    fn default() -> Self {
        HierConfig {
            group: "fwt".to_string(),
            sizes: ["fwt-posts-3", "fwt-posts-6", "fwt-posts-9", "fwt-posts-12"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: Duration::from_secs(240),
            iterations: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub catalog_path: PathBuf,
    /// The runner's own instance config; consulted before each micro run.
    pub script_config_path: PathBuf,
    pub output_dir: PathBuf,
    pub bench_cache_dir: PathBuf,
    /// Where `new-config-<key>.json` files are written.
    pub derived_config_dir: PathBuf,
    pub runner: PathBuf,
    pub micro_timeout: Duration,
    /// Extra time past the runner's own timeout before it is killed.
    pub kill_grace: Duration,
    pub poll_interval: Duration,
    pub excluded_root: String,
    pub learner_flags: Vec<String>,
    /// Invoke the runner for each `main` before re-parsing its log.
    pub macro_rerun: bool,
    /// Append `<root>-avg` and `<root>-sum` rows after each micro group.
    pub group_summary: bool,
    pub hier: HierConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            catalog_path: PathBuf::from(CATALOG_PATH),
            script_config_path: PathBuf::from(SCRIPT_CONFIG_PATH),
            output_dir: PathBuf::from(OUTPUT_DIR),
            bench_cache_dir: PathBuf::from(BENCH_CACHE_DIR),
            derived_config_dir: PathBuf::from("."),
            runner: PathBuf::from(RUNNER_PATH),
            micro_timeout: Duration::from_secs(MICRO_TIMEOUT_SECS),
            kill_grace: Duration::from_secs(KILL_GRACE_SECS),
            poll_interval: Duration::from_millis(200),
            excluded_root: EXCLUDED_ROOT.to_string(),
            learner_flags: vec!["--loclearn".to_string(), "bayesian".to_string()],
            macro_rerun: false,
            group_summary: false,
            hier: HierConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Log of a catalog run, keyed by the instance's script key.
    pub fn bench_log_path(&self, script_key: &str) -> PathBuf {
        self.output_dir.join(format!("bench-{}.log", script_key))
    }

    /// Log of one comparison run.
    pub fn hier_log_path(&self, mode: Mode, size_index: usize) -> PathBuf {
        let prefix = match mode {
            Mode::Hier => "hier",
            Mode::Base => "flat",
        };
        self.output_dir.join(format!("{}-bench-{}.log", prefix, size_index))
    }

    pub fn macro_report_path(&self) -> PathBuf {
        self.output_dir.join("macro_results.csv")
    }

    pub fn micro_report_path(&self) -> PathBuf {
        self.output_dir.join("micro_results.csv")
    }

    /// Cached experiment (or derived experiment) for a script key.
    pub fn cache_path(&self, script_key: &str) -> PathBuf {
        self.bench_cache_dir.join(format!("{}.json", script_key))
    }

    pub fn derived_config_path(&self, root_script_key: &str) -> PathBuf {
        self.derived_config_dir
            .join(format!("new-config-{}.json", root_script_key))
    }

    /// Whether a root id passes the caller's allow-list. An empty list
    /// admits every root.
    pub fn admits(only: &[String], root_id: &str) -> bool {
        only.is_empty() || only.iter().any(|id| id == root_id)
    }
}
