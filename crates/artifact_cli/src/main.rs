use std::io::{self, Write};
use std::path::PathBuf;

use artifact_cli::commands::{
    config_cmd::{self, ConfigCommands},
    download_cmd, list_cmd, upload_cmd,
};
use artifact_cli::config::{get_config_path, resolve_artifact_uri, ARTIFACT_URI_ENV_VAR};
use artifact_cli::Error;
use artifact_client::HttpArtifactRepository;
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Artifact CLI: Log and fetch run artifacts over HTTP
#[derive(Parser, Debug)]
#[command(name = "artifact-cli")]
#[command(about = "Log and fetch run artifacts over HTTP", long_about = None)]
struct Cli {
    /// Artifact root URI (overrides ARTIFACT_URI and the configuration file)
    #[arg(long, global = true)]
    artifact_uri: Option<String>,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the artifacts below a path
    Ls {
        /// Artifact path to list (the artifact root when omitted)
        path: Option<String>,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a single file
    Upload {
        /// Local file to upload
        file: PathBuf,

        /// Destination directory below the artifact root
        #[arg(short, long)]
        dest: Option<String>,
    },

    /// Upload a directory tree
    UploadDir {
        /// Local directory to upload
        dir: PathBuf,

        /// Destination directory below the artifact root
        #[arg(short, long)]
        dest: Option<String>,
    },

    /// Download a single artifact
    Download {
        /// Artifact path to download
        remote: String,

        /// Local file or existing directory to download into
        local: PathBuf,
    },

    /// Download an artifact directory tree
    DownloadDir {
        /// Artifact path to download
        remote: String,

        /// Local directory to download into
        local_dir: PathBuf,
    },

    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show the CLI version
    Version,
}

/// Builds the HTTP repository from the resolved artifact URI.
fn open_repository(cli: &Cli) -> Result<HttpArtifactRepository, Error> {
    let config_path = get_config_path(cli.config.as_deref());
    let artifact_uri = resolve_artifact_uri(
        cli.artifact_uri.as_deref(),
        std::env::var(ARTIFACT_URI_ENV_VAR).ok(),
        &config_path,
    )?;
    debug!(message = "Using artifact repository", uri = %artifact_uri);

    HttpArtifactRepository::new(&artifact_uri).map_err(|e| match e {
        err @ artifact_client::Error::InvalidBaseUri(_) => Error::Config(err.to_string()),
        other => Error::Artifact(other),
    })
}

async fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), Error> {
    match &cli.command {
        Commands::Ls { path, json } => {
            let repository = open_repository(cli)?;
            list_cmd::list_artifacts(&repository, path.as_deref(), *json, out).await
        }
        Commands::Upload { file, dest } => {
            let repository = open_repository(cli)?;
            upload_cmd::upload_file(&repository, file, dest.as_deref(), out).await
        }
        Commands::UploadDir { dir, dest } => {
            let repository = open_repository(cli)?;
            upload_cmd::upload_directory(&repository, dir, dest.as_deref(), out).await
        }
        Commands::Download { remote, local } => {
            let repository = open_repository(cli)?;
            download_cmd::download_file(&repository, remote, local, out)
                .await
                .map(|_| ())
        }
        Commands::DownloadDir { remote, local_dir } => {
            let repository = open_repository(cli)?;
            download_cmd::download_directory(&repository, remote, local_dir, out)
                .await
                .map(|_| ())
        }
        Commands::Config(cmd) => config_cmd::execute(
            cmd,
            cli.config.as_deref(),
            cli.artifact_uri.as_deref(),
            out,
        ),
        Commands::Version => {
            // Print version info from baked-in value
            writeln!(
                out,
                "artifact-cli version {}",
                option_env!("ARTIFACT_CLI_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            )?;
            Ok(())
        }
    }
}

/// Flushes command output; a failed flush after a successful command is an error.
fn flush_output(out: &mut dyn Write, result: Result<(), Error>) -> Result<(), Error> {
    let flushed = out.flush();
    result?;
    flushed?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_writer(io::stderr))
        .with(EnvFilter::from_env("ARTIFACT_CLI_LOG"))
        .init();

    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    let result = run(&cli, &mut stdout).await;
    // process::exit skips destructors, so flush explicitly.
    let result = flush_output(&mut stdout, result);

    match result {
        Ok(()) => std::process::exit(0),
        Err(e @ Error::Artifact(_)) => {
            error!("Error: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            error!("Error: {e}");
            std::process::exit(1);
        }
    }
}
