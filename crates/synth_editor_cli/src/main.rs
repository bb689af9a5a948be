// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synth Editor command-line tools
//!
//! Inspects and normalizes graph documents without opening the editor.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use synth_editor_graph::{
    create_synth_registry, ConfigError, DocumentError, EditorConfig, Graph, GraphError,
    NodeRegistry,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Synth editor graph document tools
#[derive(Debug, Parser)]
#[command(name = "synth-editor", version, about)]
struct Cli {
    /// Editor configuration file (RON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the node templates of the built-in catalog
    Templates,
    /// Import a document and report its size
    Check {
        /// Graph document (JSON)
        path: PathBuf,
    },
    /// Import a document and export it again with fresh ids
    Normalize {
        /// Graph document (JSON)
        path: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("synth_editor=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let registry = create_synth_registry();

    match cli.command {
        Command::Templates => {
            for line in describe_templates(&registry) {
                println!("{line}");
            }
        }
        Command::Check { path } => {
            let graph = load_graph(&path, &config, &registry)?;
            println!(
                "{}: {} node(s), {} connection(s)",
                path.display(),
                graph.node_count(),
                graph.connection_count()
            );
        }
        Command::Normalize { path, output } => {
            let graph = load_graph(&path, &config, &registry)?;
            let json = graph.export_json()?;
            match output {
                Some(out) => std::fs::write(&out, json).map_err(|source| CliError::Write { path: out, source })?,
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}

fn describe_templates(registry: &NodeRegistry) -> Vec<String> {
    registry
        .templates()
        .map(|t| {
            let inputs: Vec<_> = t.inputs.iter().map(|p| p.id.as_str()).collect();
            let outputs: Vec<_> = t.outputs.iter().map(|p| p.id.as_str()).collect();
            let fields: Vec<_> = t
                .config_fields
                .iter()
                .map(|f| format!("{}={}", f.id, f.default))
                .collect();
            format!(
                "{:<10} {:<10} in: [{}] out: [{}] fields: [{}]",
                t.id,
                t.name,
                inputs.join(", "),
                outputs.join(", "),
                fields.join(", ")
            )
        })
        .collect()
}

fn load_graph(path: &Path, config: &EditorConfig, registry: &NodeRegistry) -> Result<Graph, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut graph = Graph::with_layout(config.layout.clone());
    graph.import_json(&json, registry)?;
    tracing::debug!("Loaded {:?}", path);
    Ok(graph)
}
