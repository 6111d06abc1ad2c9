use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use ovfetch::config::Settings;
use ovfetch::error::FetchError;
use ovfetch::pipeline::{HostInfo, InstallRequest, Pipeline};
use ovfetch::platform::Os;
use ovfetch::{apt, progress};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ovfetch")]
#[command(author, version, about = "Fetch and unpack pinned OpenVINO runtime archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download (or reuse) and extract the archive for a platform
    Install {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Directory to extract into
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Install through the system package manager instead
        #[arg(long)]
        apt: bool,

        /// Installer script used with --apt
        #[arg(long, default_value = "install_openvino_apt.sh")]
        apt_script: PathBuf,

        /// Output format for the result
        #[arg(long, value_enum, default_value_t = OutputFormat::Env)]
        format: OutputFormat,
    },

    /// Print the download URL without fetching the archive
    Resolve {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show or clean the download cache
    Cache {
        #[command(flatten)]
        source: SourceArgs,

        /// Remove all cached files
        #[arg(long)]
        clean: bool,

        /// Download the index again
        #[arg(long, conflicts_with = "clean")]
        refresh_index: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Package version, e.g. 2023.1.0
    version: String,

    /// Operating system (defaults to the host)
    #[arg(long)]
    os: Option<String>,

    /// CPU architecture (defaults to the host)
    #[arg(long)]
    arch: Option<String>,

    /// OS release, e.g. ubuntu20 or 12_6 (computed when omitted)
    #[arg(long)]
    release: Option<String>,
}

#[derive(Args)]
struct SourceArgs {
    /// URL of the platform index
    #[arg(long)]
    index_url: Option<String>,

    /// Base URL artifact paths are relative to
    #[arg(long)]
    base_url: Option<String>,

    /// Download cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Env,
    Json,
}

impl TargetArgs {
    fn request(&self) -> anyhow::Result<InstallRequest> {
        Ok(InstallRequest {
            version: Some(self.version.clone()),
            os: self.os.as_deref().map(str::parse::<Os>).transpose()?,
            arch: self.arch.clone(),
            release: self.release.clone(),
        })
    }
}

impl SourceArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.index_url {
            settings.index_url = url.clone();
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(dir) = &self.cache_dir {
            settings.cache_dir = dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
    progress::init_colors();

    // Dropping the run future kills any extraction child and discards partial downloads
    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report(&e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            progress::failure("Interrupted");
            ExitCode::from(130)
        }
    }
}

fn report(error: &anyhow::Error) {
    progress::failure(&error.to_string());
    if let Some(fetch_error) = error.downcast_ref::<FetchError>() {
        if let Ok(detail) = serde_json::to_string(&fetch_error.detail()) {
            eprintln!("{}", detail.dimmed());
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;

    match cli.command {
        Commands::Install {
            target,
            source,
            work_dir,
            apt,
            apt_script,
            format,
        } => {
            source.apply(&mut settings);
            if let Some(dir) = work_dir {
                settings.work_dir = dir;
            }
            let request = target.request()?;
            let host = HostInfo::detect();
            let pipeline = Pipeline::new(&settings, true)?;

            if apt {
                // Release warnings are logged while the tuple is resolved
                let (tuple, _) = pipeline.platform_tuple(&request, &host)?;
                apt::install(&apt_script, &tuple.version, tuple.release.as_deref()).await?;
                progress::success(&format!("Installed {} via {}", tuple.version, apt_script.display()));
                return Ok(());
            }

            let outcome = pipeline.install(&request, &host).await?;
            match format {
                OutputFormat::Env => {
                    for line in outcome.env_lines() {
                        println!("{}", line);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
        }
        Commands::Resolve { target, source } => {
            source.apply(&mut settings);
            let request = target.request()?;
            let pipeline = Pipeline::new(&settings, false)?;
            let resolution = pipeline.resolve(&request, &HostInfo::detect()).await?;
            println!("{}", resolution.url);
        }
        Commands::Cache {
            source,
            clean,
            refresh_index,
        } => {
            source.apply(&mut settings);
            let pipeline = Pipeline::new(&settings, false)?;
            let store = pipeline.store();

            if clean {
                let removed = store.clear()?;
                progress::success(&format!(
                    "Removed {} files from {}",
                    removed,
                    store.dir().display()
                ));
                return Ok(());
            }

            if refresh_index {
                let versions = pipeline.refresh_index().await?;
                progress::success(&format!("Index refreshed: {} versions", versions));
                return Ok(());
            }

            println!("{}", "==> Download Cache".bold().green());
            println!("{}: {}", "Location".bold(), store.dir().display().to_string().cyan());
            let entries = store.entries()?;
            let total: u64 = entries.iter().map(|e| e.size).sum();
            for entry in &entries {
                println!(
                    "  {} {}",
                    entry.key,
                    progress::format_size(entry.size).dimmed()
                );
            }
            println!(
                "{}: {} files, {}",
                "Size".bold(),
                entries.len(),
                progress::format_size(total)
            );
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ovfetch", &mut std::io::stdout());
        }
    }

    Ok(())
}
