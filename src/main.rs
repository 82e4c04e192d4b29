use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use gemm_bias_gen::{GenerationEngine, GenerationRequest, init_logging, write_artifact};

/// Top-level CLI argument parser for `gemm-bias-gen`
#[derive(Parser)]
#[command(
    name = "gemm-bias-gen",
    about = "Generate runtime-dispatching gemm+bias functions from kernel instance lists",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate declaration (.h) and definition (.cu) for each request
    Generate {
        /// Request YAML files
        #[arg(required = true)]
        requests: Vec<PathBuf>,
        /// Output directory
        #[arg(long, short, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Validate requests and print dispatch diagnostics without writing
    Check {
        /// Request YAML files
        #[arg(required = true)]
        requests: Vec<PathBuf>,
    },
}

fn load(paths: &[PathBuf]) -> Result<Vec<GenerationRequest>> {
    paths.iter().map(|p| GenerationRequest::from_path(p)).collect()
}

fn run(cli: Cli) -> Result<bool> {
    let engine = GenerationEngine::new()?;
    let (paths, out_dir) = match cli.command {
        Commands::Generate { requests, out_dir } => (requests, Some(out_dir)),
        Commands::Check { requests } => (requests, None),
    };
    let requests = load(&paths)?;

    let mut ok = true;
    for (path, result) in paths.iter().zip(engine.generate_all(&requests)) {
        let artifact = match result {
            Ok(a) => a,
            Err(e) => {
                error!("{}: {e:#}", path.display());
                ok = false;
                continue;
            }
        };
        for d in &artifact.diagnostics {
            println!("{}: {d}", path.display());
        }
        match &out_dir {
            Some(dir) => {
                let (header, source) = write_artifact(&artifact, dir)?;
                info!(header = %header.display(), source = %source.display(), "wrote `{}`", artifact.function_name);
            }
            None => println!("{}: `{}` ok", path.display(), artifact.function_name),
        }
    }
    Ok(ok)
}

fn main() {
    init_logging();
    match run(Cli::parse()) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{e:#}");
            process::exit(2);
        }
    }
}
