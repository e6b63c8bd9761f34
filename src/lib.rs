// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod schema;
pub mod status;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::{CliArgs, OutputFormat};
use crate::config::{DirReader, PipelineDefinition, RawPipelineDefinition, load_from_path};
use crate::engine::{RuntimeEvent, RuntimeOptions, execute_run};
use crate::exec::{OutcomeScript, SimulatedExecutor};
use crate::schema::{
    ObjectReference, PipelineRun, PipelineRunSpec, PipelineTriggerRef, refs_from_graph,
};
use crate::store::RunStore;
use crate::types::ConditionStatus;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline definition loading
/// - run creation in an in-memory store
/// - engine runtime and simulated executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let raw = load_from_path(&args.pipeline)
        .with_context(|| format!("reading {}", args.pipeline.display()))?;

    if args.dry_run {
        let definition = PipelineDefinition::try_from(raw)?;
        print_dry_run(&definition)?;
        return Ok(());
    }

    let run = new_run(&args, &raw)?;
    let run_name = run.name().to_string();

    let store = Arc::new(RunStore::new());
    store.create(run)?;
    info!(run = %run_name, pipeline = %raw.pipeline.name, "pipeline run created");

    let mut script = OutcomeScript::new().with_delay(Duration::from_millis(args.delay_ms));
    for (task, message) in args.failures() {
        script = script.fail(task, message);
    }

    let reader = DirReader::new(definition_dir(&args.pipeline));
    let finished = execute_run(
        Arc::clone(&store),
        &reader,
        &run_name,
        RuntimeOptions::default(),
        |tx| {
            spawn_ctrl_c(tx.clone());
            SimulatedExecutor::new(tx, script)
        },
    )
    .await?;

    match args.output {
        OutputFormat::Table => print!("{}", schema::print::render_run(&finished)),
        OutputFormat::Json => println!("{}", finished.to_json()?),
    }

    let succeeded = finished
        .status
        .condition(types::ConditionType::Succeeded)
        .map(|c| c.status);
    match succeeded {
        Some(ConditionStatus::True) => Ok(()),
        Some(ConditionStatus::False) => bail!("pipeline run '{run_name}' failed"),
        _ => bail!("pipeline run '{run_name}' did not complete"),
    }
}

/// Build the run object for this invocation.
///
/// The pipeline is referenced by file stem so the directory reader resolves
/// it back to the same file.
fn new_run(args: &CliArgs, raw: &RawPipelineDefinition) -> Result<PipelineRun> {
    let stem = args
        .pipeline
        .file_stem()
        .and_then(|s| s.to_str())
        .context("pipeline path has no usable file name")?;

    let params = args
        .params
        .clone()
        .or_else(|| raw.run.params.clone())
        .unwrap_or_default();

    let spec = PipelineRunSpec {
        pipeline_ref: ObjectReference::new(stem).with_api_version(raw.pipeline.api_version.clone()),
        pipeline_params_ref: ObjectReference::new(params),
        trigger_ref: PipelineTriggerRef {
            trigger_type: raw.run.trigger,
            name: args
                .trigger_name
                .clone()
                .or_else(|| raw.run.trigger_name.clone())
                .unwrap_or_default(),
        },
    };

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("{}-run", raw.pipeline.name));
    Ok(PipelineRun::new(name, spec))
}

/// Directory holding the pipeline file.
///
/// A bare filename like "Pipeline.toml" (parent = "") resolves to the
/// current working directory.
fn definition_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn spawn_ctrl_c(tx: tokio::sync::mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

/// Dry-run output: tasks in execution order and the persisted graph shape.
fn print_dry_run(definition: &PipelineDefinition) -> Result<()> {
    let graph = &definition.graph;
    println!("pipeline {} dry-run", definition.pipeline.name);
    println!();

    println!("execution order ({} tasks):", graph.len());
    for (i, name) in graph.topological_order()?.into_iter().enumerate() {
        let after = graph.prev_tasks(name);
        if after.is_empty() {
            println!("  {:>2}. {name}", i + 1);
        } else {
            println!("  {:>2}. {name} (after {})", i + 1, after.join(", "));
        }
    }
    println!();

    println!("{}", serde_json::to_string_pretty(&refs_from_graph(graph))?);
    debug!("dry-run complete (no execution)");
    Ok(())
}
