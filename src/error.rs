use std::path::PathBuf;

/// Harness error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No node with the queried name exists in the searched tree
    #[error("missing element {0}")]
    NotFound(String),

    /// A run log did not contain a complete result block
    #[error("invalid parse of result in {}: {reason}", .path.display())]
    MalformedLog { path: PathBuf, reason: String },

    /// The external runner could not be started or waited on
    #[error("running bench {group}, {instance} failed: {reason}")]
    RunInvocation {
        group: String,
        instance: String,
        reason: String,
    },

    /// The external runner was killed after exceeding its deadline
    #[error("bench {group}, {instance} timed out after {seconds}s")]
    Timeout {
        group: String,
        instance: String,
        seconds: u64,
    },

    /// The runner's script config has no usable height/width entry
    #[error("bad auto-mock script entry for {group}, {instance}")]
    MissingScriptEntry { group: String, instance: String },

    /// A root benchmark has no `main` sub-benchmark
    #[error("root benchmark {0} has no main entry")]
    MissingMain(String),

    /// A cached experiment lacks a seed that derived files copy through
    #[error("cached experiment has no {0} in its bench metadata")]
    MissingSeed(String),

    /// Neither partition produced a node to compute ranges from
    #[error("no train or test nodes matched for {root}-{bench}")]
    EmptyPartition { root: String, bench: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;
