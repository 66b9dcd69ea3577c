use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use archforge_cli::commands;
use archforge_core::{ArchiveFormat, SourceConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archforge", version, about = "Deterministic archive builder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an archive from inline content, a file, or a directory.
    Build {
        /// Archive type.
        #[arg(long = "type", value_name = "TYPE")]
        format: Option<ArchiveFormat>,
        /// Inline content to archive (requires --source-content-filename).
        #[arg(long)]
        source_content: Option<String>,
        /// Entry name for --source-content.
        #[arg(long)]
        source_content_filename: Option<String>,
        /// Single file to archive.
        #[arg(long)]
        source_file: Option<PathBuf>,
        /// Directory tree to archive.
        #[arg(long)]
        source_dir: Option<PathBuf>,
        /// Where to write the archive.
        #[arg(long)]
        output_path: Option<PathBuf>,
        /// archforge.yaml to read defaults from; flags override its values.
        /// Without it, the nearest archforge.yaml above the working directory is used.
        #[arg(long, env = "ARCHFORGE_CONFIG")]
        config: Option<PathBuf>,
        /// JSON file holding the previous artifact descriptor.
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            format,
            source_content,
            source_content_filename,
            source_file,
            source_dir,
            output_path,
            config,
            state,
        } => {
            let cwd = env::current_dir().context("resolve working directory")?;
            let config = commands::build::discover_config(config, &cwd);
            let outcome = commands::build::run(commands::build::BuildArgs {
                format,
                source: SourceConfig {
                    source_content,
                    source_content_filename,
                    source_file,
                    source_dir,
                },
                output_path,
                config,
                state,
            })?;
            let descriptor = outcome.descriptor;
            println!("output_path={}", descriptor.output_path.display());
            println!("output_size={}", descriptor.byte_size);
            println!("output_sha256={}", descriptor.content_digest);
            if let Some(changed) = outcome.changed {
                println!("changed={}", changed);
            }
            Ok(())
        }
    }
}
