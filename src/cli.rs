// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_pipeline_path;

/// Command-line arguments for `pipelinerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipelinerun",
    version,
    about = "Run a pipeline of dependent tasks and report its conditions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline definition (TOML).
    ///
    /// Parameter sets are looked up next to it as `<name>.params.toml`.
    #[arg(long, value_name = "PATH", default_value_os_t = default_pipeline_path())]
    pub pipeline: PathBuf,

    /// Name of the pipeline run. Defaults to `<pipeline>-run`.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Parameter set to use instead of `[run].params`.
    #[arg(long, value_name = "NAME")]
    pub params: Option<String>,

    /// Who or what triggered this run.
    #[arg(long, value_name = "NAME")]
    pub trigger_name: Option<String>,

    /// Make a task run fail. Accepts `TASK` or `TASK=MESSAGE`; repeatable.
    #[arg(long = "fail", value_name = "TASK[=MESSAGE]")]
    pub fail: Vec<String>,

    /// Simulated duration of every task run, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub delay_ms: u64,

    /// How the final run is printed.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPELINERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the pipeline and print its execution order without running.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// `--fail` values split into task name and failure message.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.fail
            .iter()
            .map(|spec| match spec.split_once('=') {
                Some((task, message)) => (task.trim().to_string(), message.to_string()),
                None => (spec.trim().to_string(), "simulated failure".to_string()),
            })
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
