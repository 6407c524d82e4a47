use crate::error::Result;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Placeholder carried by catalog fields nobody has filled in yet.
pub const PLACEHOLDER: &str = "TODO";

/// Sub-benchmark id standing for the whole group as one macro case.
pub const MAIN: &str = "main";

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

/// Decodes a JSON object into key/value pairs in document order.
fn ordered<'de, D, T>(deserializer: D) -> std::result::Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(key, value)| {
            serde_json::from_value(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| D::Error::custom(format!("{}: {}", key, e)))
        })
        .collect()
}

/// One sub-benchmark of a root benchmark.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FocusSpec {
    /// Name of the node that roots this sub-benchmark in cached experiment trees.
    #[serde(default = "placeholder")]
    pub root: String,
    #[serde(default = "placeholder")]
    pub script_key: String,
}

impl Default for FocusSpec {
    fn default() -> Self {
        FocusSpec {
            root: placeholder(),
            script_key: placeholder(),
        }
    }
}

/// A benchmark group sharing one dataset.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RootBenchmark {
    #[serde(default = "placeholder")]
    pub description: String,
    #[serde(default = "placeholder")]
    pub src: String,
    #[serde(default = "placeholder")]
    pub url: String,
    #[serde(default = "placeholder")]
    pub script_key: String,
    #[serde(default, deserialize_with = "ordered")]
    pub benches: Vec<(String, FocusSpec)>,
}

impl RootBenchmark {
    pub fn bench(&self, id: &str) -> Option<&FocusSpec> {
        self.benches.iter().find(|(k, _)| k == id).map(|(_, spec)| spec)
    }

    /// The whole-group entry.
    pub fn main(&self) -> Option<&FocusSpec> {
        self.bench(MAIN)
    }

    /// Every sub-benchmark except `main`, in catalog order.
    pub fn micros(&self) -> impl Iterator<Item = (&str, &FocusSpec)> {
        self.benches
            .iter()
            .filter(|(id, _)| id != MAIN)
            .map(|(id, spec)| (id.as_str(), spec))
    }
}

/// The catalog of root benchmarks, in the order the file lists them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenchmarkCatalog {
    pub roots: Vec<(String, RootBenchmark)>,
}

impl BenchmarkCatalog {
    pub fn from_json(content: &str) -> Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(content);
        let roots = ordered(&mut deserializer)?;
        deserializer.end()?;
        Ok(BenchmarkCatalog { roots })
    }

    /// Loads a catalog from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn root(&self, id: &str) -> Option<&RootBenchmark> {
        self.roots.iter().find(|(k, _)| k == id).map(|(_, root)| root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RootBenchmark)> {
        self.roots.iter().map(|(id, root)| (id.as_str(), root))
    }
}

/// The runner's own per-instance configuration, keyed by root script key
/// then instance script key.
#[derive(Debug, Clone, Default)]
pub struct ScriptConfig {
    entries: Map<String, Value>,
}

impl ScriptConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        let entries = serde_json::from_str(content)?;
        Ok(ScriptConfig { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Whether the runner has sized ranges for this instance.
    pub fn has_ranges(&self, group: &str, instance: &str) -> bool {
        self.entries
            .get(group)
            .and_then(|g| g.get(instance))
            .map(|entry| entry.get("height").is_some() && entry.get("width").is_some())
            .unwrap_or(false)
    }
}
