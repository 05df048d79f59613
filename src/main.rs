use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use polars::prelude::SortMultipleOptions;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use ecotope::engine::{Engine, Manifest};
use ecotope::error::{ArtifactError, EcotopeResult};
use ecotope::report::io::{RunDir, read_parquet};
use ecotope::scenario::{Scenario, canonical_json};

#[derive(Parser)]
#[command(
    name = "ecotope",
    version,
    about = "Deterministic ecology simulator: procedural environments, replayable dynamics, banded agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default scenario YAML.
    Init {
        #[arg(long, default_value = "scenario.yaml")]
        out: PathBuf,
    },

    /// Validate a scenario file and echo its canonical hash.
    Validate { path: PathBuf },

    /// Run the engine; echoes the absolute run directory.
    Run {
        path: PathBuf,

        #[arg(long, default_value_t = 256)]
        ticks: u32,

        #[arg(long, default_value = "runs")]
        out: PathBuf,

        #[arg(long)]
        label: Option<String>,
    },

    /// Print a manifest summary and the tail of the field metrics.
    Inspect { run_dir: PathBuf },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> EcotopeResult<()> {
    match command {
        Command::Init { out } => {
            let yaml = Scenario::default_scenario().to_yaml_string()?;
            std::fs::write(&out, yaml).map_err(ArtifactError::Io)?;
            println!("{}", out.display());
        }
        Command::Validate { path } => {
            let scenario = Scenario::from_yaml_file(&path)?;
            println!("{}", scenario.canonical_hash()?);
        }
        Command::Run {
            path,
            ticks,
            out,
            label,
        } => {
            let scenario = Scenario::from_yaml_file(&path)?;
            let engine = Engine::new(scenario)?;
            let run_dir = engine.run(ticks, &out, label.as_deref())?;
            let absolute = std::fs::canonicalize(&run_dir).unwrap_or(run_dir);
            println!("{}", absolute.display());
        }
        Command::Inspect { run_dir } => {
            let run = RunDir::new(&run_dir);
            let manifest = Manifest::read(&run.manifest_path())?;
            let summary = json!({
                "label": manifest.label,
                "ticks": manifest.ticks,
                "runtime_s": manifest.runtime_s,
            });
            println!("{}", canonical_json(&summary)?);

            let stats = read_parquet(run.field_stats_path())?;
            let tail = stats
                .sort(["tick"], SortMultipleOptions::default())
                .map_err(|e| ArtifactError::DataFrame(e.to_string()))?
                .tail(Some(5));
            println!("{tail}");
        }
    }
    Ok(())
}
