use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use synthesis_benchmark_rs::catalog::BenchmarkCatalog;
use synthesis_benchmark_rs::config::HarnessConfig;
use synthesis_benchmark_rs::derive::generate_micros;
use synthesis_benchmark_rs::orchestrator::Orchestrator;
use synthesis_benchmark_rs::report::{grouped_table, print_report_summary, records_table};
use synthesis_benchmark_rs::runner::ScriptRunner;

/// Runs the layout synthesis benchmarks and summarises their logs.
#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Catalog of root benchmarks and their sub-benchmarks.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory that receives logs and CSV reports.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Benchmark script to invoke.
    #[arg(long, global = true)]
    runner: Option<PathBuf>,

    /// Seconds past the runner's own timeout before it is killed.
    #[arg(long, global = true)]
    kill_grace: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarise the logs of every root's main benchmark.
    Macro {
        /// Run each main benchmark before reading its log.
        #[arg(long)]
        rerun: bool,
    },

    /// Run every sub-benchmark, optionally only for the named roots.
    Micro {
        roots: Vec<String>,

        /// Per-run timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// The runner's instance config, checked before each run.
        #[arg(long)]
        script_config: Option<PathBuf>,

        /// Append average and sum rows after each group.
        #[arg(long)]
        group_summary: bool,
    },

    /// Compare hierarchical and flat synthesis time across sizes.
    Hier {
        #[arg(long)]
        group: Option<String>,

        /// Instance ids in increasing size.
        #[arg(long, num_args = 1..)]
        sizes: Vec<String>,

        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Derive sub-benchmark ranges from cached experiments.
    Derive {
        roots: Vec<String>,

        #[arg(long)]
        bench_cache: Option<PathBuf>,

        /// Where `new-config-<key>.json` files are written.
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

fn base_config(paths: &PathArgs) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    if let Some(catalog) = &paths.catalog {
        config.catalog_path = catalog.clone();
    }
    if let Some(output_dir) = &paths.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(runner) = &paths.runner {
        config.runner = runner.clone();
    }
    if let Some(grace) = paths.kill_grace {
        config.kill_grace = Duration::from_secs(grace);
    }
    config
}

fn load_catalog(config: &HarnessConfig) -> Result<BenchmarkCatalog> {
    BenchmarkCatalog::load(&config.catalog_path)
        .with_context(|| format!("loading catalog {}", config.catalog_path.display()))
}

fn orchestrator(config: HarnessConfig) -> Orchestrator<ScriptRunner> {
    let runner = ScriptRunner::new(&config.runner, config.kill_grace, config.poll_interval);
    Orchestrator::new(config, runner)
}

fn main() {
    match main_result() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("{:?}", err);
            std::process::exit(1);
        }
    }
}

fn main_result() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = base_config(&cli.paths);

    match cli.command {
        Commands::Macro { rerun } => {
            config.macro_rerun = rerun;
            let catalog = load_catalog(&config)?;
            let outcome = orchestrator(config).run_macro(&catalog)?;
            print_report_summary("macro", &records_table(&outcome.rows()), &outcome.report);
        }

        Commands::Micro {
            roots,
            timeout,
            script_config,
            group_summary,
        } => {
            if let Some(secs) = timeout {
                config.micro_timeout = Duration::from_secs(secs);
            }
            if let Some(path) = script_config {
                config.script_config_path = path;
            }
            config.group_summary = group_summary;
            let catalog = load_catalog(&config)?;
            let outcome = orchestrator(config).run_micro(&catalog, &roots)?;
            print_report_summary("micro", &grouped_table(&outcome.rows), &outcome.report);
        }

        Commands::Hier {
            group,
            sizes,
            iterations,
            timeout,
        } => {
            if let Some(group) = group {
                config.hier.group = group;
            }
            if !sizes.is_empty() {
                config.hier.sizes = sizes;
            }
            if let Some(n) = iterations {
                config.hier.iterations = n;
            }
            if let Some(secs) = timeout {
                config.hier.timeout = Duration::from_secs(secs);
            }
            let comparison = orchestrator(config).run_hier()?;
            for line in comparison.csv_lines() {
                println!("{}", line);
            }
        }

        Commands::Derive {
            roots,
            bench_cache,
            config_dir,
        } => {
            if let Some(dir) = bench_cache {
                config.bench_cache_dir = dir;
            }
            if let Some(dir) = config_dir {
                config.derived_config_dir = dir;
            }
            let catalog = load_catalog(&config)?;
            for path in generate_micros(&config, &catalog, &roots)? {
                println!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}
