//! Derives per-sub-benchmark size ranges from a root's cached experiment.

use crate::catalog::{BenchmarkCatalog, RootBenchmark};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::tree::{find, TreeNode};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SEEDS: [&str; 2] = ["trainSeed", "testSeed"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    /// The smallest range covering every value, or `None` for no values.
    pub fn spanning<I: IntoIterator<Item = f64>>(values: I) -> Option<Range> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Range { low: v, high: v }),
            Some(r) => Some(Range {
                low: r.low.min(v),
                high: r.high.max(v),
            }),
        })
    }
}

/// The part of a derived experiment the runner reads back.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SizeRanges {
    pub height: Range,
    pub width: Range,
}

/// A root's cached experiment: the sampled train and test trees plus the
/// metadata they were sampled with.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CachedExperiment {
    pub train: Vec<TreeNode>,
    pub test: Vec<TreeNode>,
    #[serde(default)]
    pub bench: Map<String, Value>,
}

impl CachedExperiment {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The experiment's own ranges, if its metadata carries them.
    pub fn size_ranges(&self) -> Option<SizeRanges> {
        let height = serde_json::from_value(self.bench.get("height")?.clone()).ok()?;
        let width = serde_json::from_value(self.bench.get("width")?.clone()).ok()?;
        Some(SizeRanges { height, width })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBench {
    pub height: Range,
    pub width: Range,
    pub train_seed: Value,
    pub test_seed: Value,
    pub test_size: usize,
    pub train_size: usize,
}

/// The sub-benchmark view of a cached experiment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DerivedExperiment {
    pub name: String,
    pub bench: DerivedBench,
    pub train: Vec<TreeNode>,
    pub test: Vec<TreeNode>,
}

impl DerivedExperiment {
    pub fn ranges(&self) -> SizeRanges {
        SizeRanges {
            height: self.bench.height,
            width: self.bench.width,
        }
    }
}

/// Per-root config the runner consumes: root script key to instance
/// script key to ranges.
pub type DerivedConfig = BTreeMap<String, BTreeMap<String, SizeRanges>>;

/// Locates `search_key` in every train and every test tree and spans the
/// ranges over all matches.
pub fn derive_experiment(
    root_id: &str,
    bench_id: &str,
    search_key: &str,
    experiment: &CachedExperiment,
) -> Result<DerivedExperiment> {
    let train = experiment
        .train
        .iter()
        .map(|tree| find(search_key, tree).cloned())
        .collect::<Result<Vec<_>>>()?;
    let test = experiment
        .test
        .iter()
        .map(|tree| find(search_key, tree).cloned())
        .collect::<Result<Vec<_>>>()?;

    let matched = || train.iter().chain(test.iter());
    let empty = || Error::EmptyPartition {
        root: root_id.to_string(),
        bench: bench_id.to_string(),
    };
    let height = Range::spanning(matched().map(|n| n.height)).ok_or_else(empty)?;
    let width = Range::spanning(matched().map(|n| n.width)).ok_or_else(empty)?;

    let seed = |key: &str| {
        experiment
            .bench
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingSeed(key.to_string()))
    };

    Ok(DerivedExperiment {
        name: format!("{}-{}", root_id, bench_id),
        bench: DerivedBench {
            height,
            width,
            train_seed: seed(SEEDS[0])?,
            test_seed: seed(SEEDS[1])?,
            test_size: test.len(),
            train_size: train.len(),
        },
        train,
        test,
    })
}

/// Derives every sub-benchmark of one root, writing one derived experiment
/// per sub-benchmark into the bench cache. Returns the root's config.
pub fn derive_root(
    config: &HarnessConfig,
    root_id: &str,
    root: &RootBenchmark,
) -> Result<DerivedConfig> {
    let main = root
        .main()
        .ok_or_else(|| Error::MissingMain(root_id.to_string()))?;
    info!("loading root {}", main.script_key);
    let experiment = CachedExperiment::load(config.cache_path(&main.script_key))?;

    let mut ranges = BTreeMap::new();
    if let Some(own) = experiment.size_ranges() {
        ranges.insert(main.script_key.clone(), own);
    }

    for (bench_id, details) in root.micros() {
        let derived = derive_experiment(root_id, bench_id, &details.root, &experiment)?;
        let path = config.cache_path(&details.script_key);
        info!("writing {}", path.display());
        fs::write(&path, serde_json::to_string(&derived)?)?;
        ranges.insert(details.script_key.clone(), derived.ranges());
    }

    let mut derived_config = BTreeMap::new();
    derived_config.insert(root.script_key.clone(), ranges);
    Ok(derived_config)
}

/// Runs derivation for every admitted root except the excluded one and
/// writes `new-config-<root script key>.json` for each.
pub fn generate_micros(
    config: &HarnessConfig,
    catalog: &BenchmarkCatalog,
    only: &[String],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (root_id, root) in catalog.iter() {
        if root_id == config.excluded_root || !HarnessConfig::admits(only, root_id) {
            continue;
        }
        let derived_config = derive_root(config, root_id, root)?;
        let path = config.derived_config_path(&root.script_key);
        fs::write(&path, serde_json::to_string(&derived_config)?)?;
        written.push(path);
    }
    Ok(written)
}
