//! Quillpad CLI - file sync for a small offline-capable text workspace
//!
//! Usage: quill <command> [options]

mod local;
mod remote_dir;
mod settings;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use chrono::Utc;

use quill_common::{FileId, EXIT_CONFIG_ERROR, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use quill_sync::{
    ChangeDebouncer, ConflictChoice, ConflictPrompt, Connectivity, LocalChangeEvent, LocalStore,
    PendingUploadTracker, SyncCoordinator, SyncStatus, TimestampStore,
};

use local::WorkspaceLocal;
use remote_dir::{DirConnectivity, DirRemote};
use settings::{Settings, SETTINGS_FILE};
use ui::{CliSink, FixedPrompt, TerminalPrompt};

#[derive(Parser)]
#[command(
    name = "quill",
    version = "0.1.0",
    about = "Quillpad workspace sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: ./quill.toml, or $QUILL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default quill.toml and create the state directories
    Init,

    /// Run one reconciliation pass for the active file
    Sync {
        /// Answer a conflict without prompting: local, remote or cancel
        #[arg(long)]
        keep: Option<String>,
    },

    /// Watch local content for changes and sync after each quiet window
    Watch,

    /// Replace a file's content with stdin, then sync it
    Edit {
        /// File to edit (registered on first use)
        file: String,
    },

    /// Manage the set of known files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
}

#[derive(Subcommand)]
enum FilesAction {
    /// List known files (the active one is starred)
    List,

    /// Register a file
    Add { file: String },

    /// Forget a file and delete its local content
    Remove { file: String },

    /// Rename a file, carrying its content and sync state along
    Rename { old: String, new: String },

    /// Make a file the active one
    Active { file: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    quill_common::telemetry::init_tracing(cli.verbose, false);
    tracing::debug!("Quillpad CLI started");

    let result = match cli.command {
        Commands::Init => cmd_init(cli.config).await,
        Commands::Sync { keep } => cmd_sync(cli.config, keep).await,
        Commands::Watch => cmd_watch(cli.config).await,
        Commands::Edit { file } => cmd_edit(cli.config, file).await,
        Commands::Files { action } => cmd_files(cli.config, action).await,
    };

    std::process::exit(match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    });
}

/// Everything a command needs, wired once from the settings file
struct App {
    settings: Settings,
    timestamps: Arc<TimestampStore>,
    pending: Arc<PendingUploadTracker>,
    local: Arc<WorkspaceLocal>,
    network: Arc<DirConnectivity>,
    sink: Arc<CliSink>,
    coordinator: Arc<SyncCoordinator>,
}

impl App {
    fn build(config: Option<PathBuf>, prompt: Arc<dyn ConflictPrompt>) -> anyhow::Result<Self> {
        let loaded = match config {
            Some(path) => Settings::load_from(&path),
            None => Settings::load(),
        };
        let settings = match loaded {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("Error: {err:#}");
                std::process::exit(EXIT_CONFIG_ERROR);
            }
        };
        std::fs::create_dir_all(&settings.sync.state_dir).with_context(|| {
            format!(
                "failed to create state directory {}",
                settings.sync.state_dir.display()
            )
        })?;

        let timestamps = Arc::new(TimestampStore::open(&settings.sync.state_dir)?);
        let pending = Arc::new(PendingUploadTracker::open(&settings.sync.state_dir)?);
        let local = Arc::new(WorkspaceLocal::open(
            &settings.sync.state_dir,
            timestamps.clone(),
        )?);
        let network = Arc::new(DirConnectivity::new(&settings.remote_dir));
        let sink = Arc::new(CliSink::new());

        let coordinator = Arc::new(SyncCoordinator::new(
            local.clone(),
            network.clone(),
            prompt,
            sink.clone(),
            timestamps.clone(),
            pending.clone(),
            &settings.sync,
        ));

        Ok(Self {
            settings,
            timestamps,
            pending,
            local,
            network,
            sink,
            coordinator,
        })
    }

    fn connect_remote(&self) {
        self.coordinator
            .connect(Arc::new(DirRemote::new(&self.settings.remote_dir)));
    }

    /// Print the final status to stdout; error statuses fail the command
    fn finish(&self) -> anyhow::Result<()> {
        match self.sink.last_report() {
            Some(report) => {
                println!("{}", report.status);
                if report.status == SyncStatus::Error {
                    if report.message.is_empty() {
                        bail!("sync failed");
                    }
                    bail!("{}", report.message);
                }
            }
            None => println!("{}", SyncStatus::NotConnected),
        }
        Ok(())
    }
}

async fn cmd_init(config: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config.unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
    if path.exists() {
        bail!("settings file {} already exists", path.display());
    }

    let settings = Settings::default();
    settings.save(&path)?;
    std::fs::create_dir_all(&settings.sync.state_dir)?;
    std::fs::create_dir_all(&settings.remote_dir)?;

    eprintln!("Initialized quillpad workspace");
    eprintln!("  settings:  {}", path.display());
    eprintln!("  state dir: {}", settings.sync.state_dir.display());
    eprintln!("  remote:    {}", settings.remote_dir.display());
    Ok(())
}

async fn cmd_sync(config: Option<PathBuf>, keep: Option<String>) -> anyhow::Result<()> {
    let app = App::build(config, prompt_for(keep))?;
    app.connect_remote();

    app.coordinator.coordinate().await;
    app.finish()
}

async fn cmd_edit(config: Option<PathBuf>, file: String) -> anyhow::Result<()> {
    let file = FileId::from(file);
    let app = App::build(config, Arc::new(TerminalPrompt))?;
    app.connect_remote();

    let content = std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?;
    app.local.add(&file)?;
    app.local.set_active(&file)?;
    app.local.save_content(&file, &content)?;
    tracing::info!(file = %file, bytes = content.len(), "Local content saved");

    if !app.network.is_online() {
        // Same bookkeeping the debouncer does for an offline editor save
        app.pending.mark_pending(&file)?;
        eprintln!("Offline: change recorded, upload pending");
        println!("{}", SyncStatus::Offline);
        return Ok(());
    }

    app.coordinator.coordinate().await;
    app.finish()
}

async fn cmd_watch(config: Option<PathBuf>) -> anyhow::Result<()> {
    use notify::{RecursiveMode, Watcher};

    let app = App::build(config, Arc::new(TerminalPrompt))?;
    app.connect_remote();

    let (changes, debouncer) = ChangeDebouncer::new(
        app.coordinator.clone(),
        app.local.clone() as Arc<dyn LocalStore>,
        app.network.clone() as Arc<dyn Connectivity>,
        app.pending.clone(),
        &app.settings.sync,
    );
    let debouncer_task = tokio::spawn(debouncer.run());

    // Catch up before watching
    app.coordinator.coordinate().await;

    let (fs_tx, mut fs_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event| {
        let _ = fs_tx.send(event);
    })?;
    watcher.watch(app.local.content_dir(), RecursiveMode::NonRecursive)?;

    eprintln!(
        "Watching {} (Ctrl-C to stop)",
        app.local.content_dir().display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Stopping watcher");
                break;
            }
            maybe_event = fs_rx.recv() => {
                let Some(event) = maybe_event else { break };
                match event {
                    Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                        for path in &event.paths {
                            let Some(file) = app.local.file_for_path(path) else {
                                continue;
                            };
                            app.timestamps.set_local_modified(&file, Utc::now())?;
                            let _ = changes.send(LocalChangeEvent::now(file));
                        }
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "Watcher error"),
                }
            }
        }
    }

    // Closing the channel lets the debouncer drain and stop
    drop(changes);
    debouncer_task.await.context("debouncer task panicked")?;
    Ok(())
}

async fn cmd_files(config: Option<PathBuf>, action: FilesAction) -> anyhow::Result<()> {
    let app = App::build(config, Arc::new(TerminalPrompt))?;

    match action {
        FilesAction::List => {
            let active = app.local.active_file();
            for file in app.local.files() {
                let marker = if Some(&file) == active.as_ref() { "*" } else { " " };
                let pending = if app.pending.is_pending(&file) {
                    "  (upload pending)"
                } else {
                    ""
                };
                println!("{marker} {file}{pending}");
            }
        }
        FilesAction::Add { file } => {
            let file = FileId::from(file);
            app.local.add(&file)?;
            eprintln!("Added {file}");
        }
        FilesAction::Remove { file } => {
            let file = FileId::from(file);
            app.local.remove(&file)?;
            app.timestamps.remove(&file)?;
            app.pending.clear_pending(&file)?;
            eprintln!("Removed {file}");
        }
        FilesAction::Rename { old, new } => {
            let old = FileId::from(old);
            let new = FileId::from(new);
            app.local.rename(&old, &new)?;
            app.timestamps.rename(&old, &new)?;
            app.pending.rename(&old, &new)?;
            eprintln!("Renamed {old} to {new}");
        }
        FilesAction::Active { file } => {
            let file = FileId::from(file);
            app.local.set_active(&file)?;
            eprintln!("Active file is now {file}");
        }
    }
    Ok(())
}

fn prompt_for(keep: Option<String>) -> Arc<dyn ConflictPrompt> {
    let Some(keep) = keep else {
        return Arc::new(TerminalPrompt);
    };
    let choice = match keep.as_str() {
        "local" => ConflictChoice::KeepLocal,
        "remote" => ConflictChoice::KeepRemote,
        "cancel" => ConflictChoice::Cancel,
        other => {
            eprintln!("Error: invalid --keep value {other:?}, expected local, remote or cancel");
            std::process::exit(EXIT_USAGE);
        }
    };
    Arc::new(FixedPrompt(choice))
}
