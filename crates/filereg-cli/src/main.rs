use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use filereg_core::config_file::{self, ConfigFile, DisplayConfig, ServerConfig};
use filereg_core::{
    ActionCoordinator, ActionError, Config, DeleteOutcome, FileEdits, FileId, FileStore,
    HttpFileStore, RowHandlers, SearchFilter, UploadForm,
};
use tracing_subscriber::EnvFilter;

mod output;
mod shell;

use output::{ColorMode, Console, ConsolePrompt, TableView};

/// filereg - browse and manage files in a remote file registry
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Registry server URL (overrides FILEREG_URL and the config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log requests and state changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer yes to delete confirmations
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files, optionally filtered
    List {
        /// Case-insensitive substring of the file name
        #[arg(long)]
        name: Option<String>,

        /// Case-insensitive substring of the storage path
        #[arg(long)]
        path: Option<String>,
    },

    /// Show one file's details
    Show { id: FileId },

    /// Change a file's name, path or comment
    Edit {
        id: FileId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Delete a file (asks for confirmation unless -y)
    Delete { id: FileId },

    /// Reconcile the registry with its backing storage
    Actualize,

    /// Upload a local file
    Upload {
        file: PathBuf,

        /// Name to register the file under (default: the local file name)
        #[arg(long)]
        name: Option<String>,

        /// Storage path inside the registry
        #[arg(long, default_value = "/")]
        path: String,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Download a file
    Download {
        id: FileId,

        /// Output path (default: the file's name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the registry server is reachable
    Ping,

    /// Interactive session
    Shell,

    /// Store settings in the user config file
    Config {
        #[arg(long)]
        set_url: Option<String>,

        #[arg(long)]
        set_timeout: Option<u64>,

        /// Enable or disable color by default
        #[arg(long)]
        set_color: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !already_reported(&err) {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

/// Coordinator failures are shown through the prompt when they happen.
fn already_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ActionError>().is_some()
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = config_file::load_config();

    if let Command::Config {
        set_url,
        set_timeout,
        set_color,
    } = &cli.command
    {
        return save_settings(set_url.clone(), *set_timeout, *set_color);
    }

    let config = resolve_config(
        &file_config,
        std::env::var("FILEREG_URL").ok(),
        std::env::var("FILEREG_TIMEOUT").ok(),
        cli.url.clone(),
        cli.timeout,
    )?;
    let color_default = file_config
        .display
        .as_ref()
        .and_then(|d| d.color)
        .unwrap_or(true);
    let color = ColorMode(!cli.no_color && color_default);

    tracing::debug!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        "resolved configuration"
    );
    let store = HttpFileStore::new(&config).context("failed to build HTTP client")?;

    let console = Arc::new(Console::new());
    let view = Arc::new(TableView::new(color));
    let prompt = Arc::new(ConsolePrompt::new(console.clone(), color, cli.yes));
    let (handlers, rows) = RowHandlers::channel();
    let coordinator = ActionCoordinator::new(store, view.clone(), prompt, handlers);

    match cli.command {
        Command::List { name, path } => {
            let filter = SearchFilter::new(
                name.as_deref().unwrap_or(""),
                path.as_deref().unwrap_or(""),
            );
            if filter.is_empty() {
                coordinator.load().await?;
            } else {
                view.set_muted(true);
                let loaded = coordinator.load().await;
                view.set_muted(false);
                loaded?;
                coordinator.apply_search(filter);
            }
        }
        Command::Show { id } => {
            let record = coordinator.open_details(id).await?;
            output::write_details(&mut std::io::stdout().lock(), &record, color)?;
        }
        Command::Edit {
            id,
            name,
            path,
            comment,
        } => {
            let record = coordinator.open_details(id).await?;
            let current = FileEdits::from_record(&record);
            let edits = FileEdits {
                name: name.unwrap_or(current.name),
                path: path.unwrap_or(current.path),
                comment: comment.unwrap_or(current.comment),
            };
            if edits == FileEdits::from_record(&record) {
                println!("Nothing to change.");
                return Ok(());
            }
            view.set_muted(true);
            coordinator.save_changes(&edits).await?;
            println!("Saved file {}", id);
        }
        Command::Delete { id } => {
            // Loaded so the confirmation can name the file.
            view.set_muted(true);
            coordinator.load().await?;
            if coordinator.delete_file(id).await? == DeleteOutcome::Cancelled {
                println!("Cancelled.");
            } else {
                println!("Deleted file {}", id);
            }
        }
        Command::Actualize => {
            view.set_muted(true);
            coordinator.actualize().await?;
        }
        Command::Upload {
            file,
            name,
            path,
            comment,
        } => {
            let read = UploadForm::read_from(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let form = UploadForm {
                name: name.unwrap_or(read.name.clone()),
                path,
                comment,
                ..read
            };
            view.set_muted(true);
            coordinator.open_upload();
            let record = coordinator.upload_file(form).await?;
            println!("Uploaded {} as file {}", record.display_name(), record.id);
        }
        Command::Download { id, output: out } => {
            let record = coordinator.open_details(id).await?;
            let dest = out.unwrap_or_else(|| output::default_download_path(&record));
            let bytes = coordinator.download(&dest).await?;
            println!(
                "Saved {} to {}",
                output::format_size(bytes),
                dest.display()
            );
        }
        Command::Ping => {
            coordinator
                .store()
                .ping()
                .await
                .with_context(|| format!("registry at {} is not reachable", config.base_url))?;
            println!("Registry at {} is reachable", config.base_url);
        }
        Command::Shell => {
            shell::Shell::new(&coordinator, view, console, rows, color)
                .run()
                .await?;
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(
    file: &ConfigFile,
    env_url: Option<String>,
    env_timeout: Option<String>,
    flag_url: Option<String>,
    flag_timeout: Option<u64>,
) -> anyhow::Result<Config> {
    let mut config = Config::from_file(file);

    if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
        config.base_url = url;
    }
    if let Some(raw) = env_timeout {
        config.timeout_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("FILEREG_TIMEOUT is not a number of seconds: {:?}", raw))?;
    }
    if let Some(url) = flag_url {
        config.base_url = url;
    }
    if let Some(secs) = flag_timeout {
        config.timeout_secs = secs;
    }

    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        anyhow::bail!(
            "registry URL must start with http:// or https://, got {}",
            config.base_url
        );
    }
    if config.timeout_secs == 0 {
        anyhow::bail!("timeout must be at least one second");
    }
    Ok(config)
}

fn save_settings(
    url: Option<String>,
    timeout: Option<u64>,
    color: Option<bool>,
) -> anyhow::Result<()> {
    if url.is_none() && timeout.is_none() && color.is_none() {
        anyhow::bail!("nothing to set: pass --set-url, --set-timeout or --set-color");
    }
    let path = config_file::config_path().context("could not determine config directory")?;
    let existing = config_file::load_from_path(&path).unwrap_or_default();
    let update = ConfigFile {
        server: Some(ServerConfig {
            base_url: url,
            timeout_secs: timeout,
        }),
        display: Some(DisplayConfig { color }),
    };
    let merged = config_file::merge(existing, update);
    let saved = config_file::save_config(&merged)?;
    println!("Saved settings to {}", saved.display());
    Ok(())
}
