//! grant-split CLI entry point.
//!
//! Thin: loads `.env.local`, sets up tracing on stderr, parses arguments and
//! dispatches to `commands`.  stdout carries only `key=value` lines and the
//! text report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gs_config::Overrides;

mod commands;

#[derive(Parser)]
#[command(name = "grant-split")]
#[command(about = "Municipal grant allocation with minimum-amount floors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a budget over the municipalities in a CSV file
    Compute {
        /// Municipality CSV (see `template`)
        #[arg(long)]
        input: PathBuf,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[command(flatten)]
        params: ParamArgs,

        /// Reject config keys that nothing reads instead of warning
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Run the built-in ten-municipality example data set
    Example {
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Write an import template CSV
    Template {
        /// Output path
        path: PathBuf,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Import a CSV and report accepted/rejected rows without computing
    ImportCheck {
        #[arg(long)]
        input: PathBuf,
    },
}

/// Parameter flags shared by `compute` and `example`; each overrides config.
#[derive(clap::Args, Debug, Clone, Default)]
struct ParamArgs {
    #[arg(long)]
    total_budget: Option<f64>,

    #[arg(long)]
    minimum_amount: Option<f64>,

    /// Fraction of the reference value paid as base amount (0..=1)
    #[arg(long)]
    base_percent: Option<f64>,

    #[arg(long)]
    max_rounds: Option<u32>,

    /// Export root directory (default: exports)
    #[arg(long)]
    exports_root: Option<String>,

    /// Fail the run when the settled total misses the budget
    #[arg(long, default_value_t = false)]
    fail_on_mismatch: bool,

    /// Print results only; write no export directory
    #[arg(long, default_value_t = false)]
    no_export: bool,
}

impl ParamArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            total_budget: self.total_budget,
            minimum_amount: self.minimum_amount,
            base_percent: self.base_percent,
            max_rounds: self.max_rounds,
            exports_root: self.exports_root.clone(),
            fail_on_mismatch: self.fail_on_mismatch,
        }
    }
}

fn main() -> Result<()> {
    // Dev convenience; silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Compute {
            input,
            config_paths,
            params,
            strict_config,
        } => commands::compute::run_compute(commands::compute::ComputeArgs {
            input,
            config_paths,
            overrides: params.overrides(),
            strict_config,
            no_export: params.no_export,
        })?,

        Commands::Example { params } => {
            commands::compute::run_example(params.overrides(), params.no_export)?
        }

        Commands::Template { path } => commands::import::run_template(&path)?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = gs_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::ImportCheck { input } => commands::import::run_import_check(&input)?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
