//! Bangs command-line interface
//!
//! Manages the stored bang dataset and drives the suggestion engine the way
//! an address bar would:
//! - Editing: list, add, modify, delete, reset
//! - Lookup: suggest, open, and an interactive `watch` session

use anyhow::{Context, Result, bail};
use bangs_core::bootstrap::{self, AnySource, DefaultSource};
use bangs_core::config::{Config, Directories};
use bangs_core::editor::BangEditor;
use bangs_core::storage::FileStorage;
use bangs_core::{Bang, BangsCore, Disposition, OmniboxEvent, OmniboxUpdate, TabAction};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bangs={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("bangs-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

/// Bangs - keyword shortcuts for web searches
#[derive(Parser)]
#[command(name = "bangs")]
#[command(about = "Bangs - type a keyword, get a website")]
#[command(version)]
#[command(after_help = "\
Examples:
  bangs list                         Show every stored bang
  bangs add yt YouTube https://youtube.com \\
      --before 'https://youtube.com/results?search_query='
  bangs modify yt --key y            Rename a bang
  bangs suggest g rust traits        Show suggestions for an input
  bangs open --disposition foreground g rust traits
  bangs watch                        Interactive session on stdin

In `watch`, each line is typed input; a line starting with '!' commits it
and an empty line starts a new interaction.
")]
struct Cli {
    /// Config file (defaults to the XDG config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage file (overrides the config file)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored bangs
    List {
        /// Print the dataset as JSON (usable as `storage.defaultBangs`)
        #[arg(long)]
        json: bool,
    },

    /// Add a bang
    Add {
        key: String,
        label: String,
        /// URL opened when no parameter is given
        url: String,
        /// URL part before the parameter
        #[arg(long)]
        before: Option<String>,
        /// URL part after the parameter
        #[arg(long)]
        after: Option<String>,
    },

    /// Change an existing bang; omitted fields keep their value
    Modify {
        /// Bang to change
        original: String,
        /// New key
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        after: Option<String>,
    },

    /// Delete a bang
    Delete { key: String },

    /// Replace all bangs with the defaults
    Reset {
        /// Confirm discarding every custom bang
        #[arg(long)]
        yes: bool,
    },

    /// Show suggestions for an input
    Suggest {
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
    },

    /// Resolve an input the way committing it in the address bar would
    Open {
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
        #[arg(long, value_enum, default_value_t = DispositionArg::Current)]
        disposition: DispositionArg,
    },

    /// Read inputs from stdin and print suggestions, following storage edits
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
enum DispositionArg {
    Current,
    Foreground,
    Background,
}

impl From<DispositionArg> for Disposition {
    fn from(arg: DispositionArg) -> Self {
        match arg {
            DispositionArg::Current => Self::CurrentTab,
            DispositionArg::Foreground => Self::NewForegroundTab,
            DispositionArg::Background => Self::NewBackgroundTab,
        }
    }
}

/// Resolved config, storage and default source
struct App {
    config: Config,
    storage: Arc<FileStorage>,
    source: AnySource,
}

impl App {
    async fn open(config_path: Option<PathBuf>, storage_path: Option<PathBuf>) -> Result<Self> {
        let dirs = Directories::new()?;
        let config_path = config_path.unwrap_or_else(|| dirs.config_file.clone());
        let config = Config::load(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?;

        let storage_path = storage_path
            .or_else(|| config.storage.path.clone())
            .unwrap_or_else(|| dirs.storage_file.clone());
        if let Some(parent) = storage_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        debug!("Using storage file {}", storage_path.display());

        let storage = Arc::new(FileStorage::open(&storage_path).with_context(|| {
            format!("Failed to open storage {}", storage_path.display())
        })?);
        let source = AnySource::from_path(config.storage.default_bangs.clone());

        if bootstrap::ensure_initialized(storage.as_ref(), &source).await? {
            info!("Initialized {}", storage_path.display());
        }

        Ok(Self {
            config,
            storage,
            source,
        })
    }

    fn editor(&self) -> BangEditor<FileStorage, AnySource> {
        BangEditor::new(Arc::clone(&self.storage), self.source.clone())
    }

    async fn core(&self) -> Result<(BangsCore<FileStorage>, UnboundedReceiver<OmniboxUpdate>)> {
        let (mut core, updates) = BangsCore::new(Arc::clone(&self.storage), self.config.clone());
        core.start(&self.source).await?;
        Ok((core, updates))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let app = App::open(cli.config, cli.storage).await?;

    match cli.command {
        Commands::List { json } => run_list(&app, json).await,
        Commands::Add {
            key,
            label,
            url,
            before,
            after,
        } => {
            let bang = Bang::new(key, label, url)
                .with_param_template(before.unwrap_or_default(), after.unwrap_or_default());
            run_add(&app, bang).await
        }
        Commands::Modify {
            original,
            key,
            label,
            url,
            before,
            after,
        } => {
            let changes = BangChanges {
                key,
                label,
                url,
                before,
                after,
            };
            run_modify(&app, &original, changes).await
        }
        Commands::Delete { key } => run_delete(&app, &key).await,
        Commands::Reset { yes } => run_reset(&app, yes).await,
        Commands::Suggest { input } => run_suggest(&app, input.join(" ")).await,
        Commands::Open { input, disposition } => {
            run_open(&app, input.join(" "), disposition.into()).await
        }
        Commands::Watch => run_watch(app).await,
    }
}

fn print_bang(bang: &Bang) {
    println!("  {:<10} {}", bang.key, bang.label);
    println!("             {}", bang.url_without_param);
    if bang.accepts_param() {
        println!(
            "             {}<param>{}",
            bang.url_before_param, bang.url_after_param
        );
    }
}

async fn run_list(app: &App, json: bool) -> Result<()> {
    let listing = app.editor().list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing.bangs)?);
        return Ok(());
    }

    if listing.bangs.is_empty() {
        println!("No bangs stored.");
        return Ok(());
    }

    let origin = if listing.modified {
        "customized"
    } else {
        "defaults"
    };
    println!("\nBangs ({}, {origin}):\n", listing.bangs.len());
    for bang in &listing.bangs {
        print_bang(bang);
    }
    println!();
    Ok(())
}

async fn run_add(app: &App, bang: Bang) -> Result<()> {
    let key = bang.key.clone();
    app.editor().add(bang).await?;
    println!("Added bang: {key}");
    Ok(())
}

/// Field overrides for `modify`
struct BangChanges {
    key: Option<String>,
    label: Option<String>,
    url: Option<String>,
    before: Option<String>,
    after: Option<String>,
}

impl BangChanges {
    fn apply(self, mut bang: Bang) -> Bang {
        if let Some(key) = self.key {
            bang.key = key;
        }
        if let Some(label) = self.label {
            bang.label = label;
        }
        if let Some(url) = self.url {
            bang.url_without_param = url;
        }
        if let Some(before) = self.before {
            bang.url_before_param = before;
        }
        if let Some(after) = self.after {
            bang.url_after_param = after;
        }
        bang
    }
}

async fn run_modify(app: &App, original: &str, changes: BangChanges) -> Result<()> {
    let editor = app.editor();
    let current = editor.lookup(original).await?;
    let updated = changes.apply(current);
    let key = updated.key.clone();

    editor.modify(original, updated).await?;
    if key == original {
        println!("Modified bang: {key}");
    } else {
        println!("Modified bang: {original} -> {key}");
    }
    Ok(())
}

async fn run_delete(app: &App, key: &str) -> Result<()> {
    app.editor().delete(key).await?;
    println!("Deleted bang: {key}");
    Ok(())
}

async fn run_reset(app: &App, yes: bool) -> Result<()> {
    if !yes {
        bail!("Reset replaces every bang with the defaults; pass --yes to confirm");
    }
    let defaults = app.editor().reset().await?;
    println!(
        "Restored {} default bangs from {}",
        defaults.len(),
        app.source.name()
    );
    Ok(())
}

fn print_update(update: &OmniboxUpdate) {
    match update {
        OmniboxUpdate::DefaultSuggestion { description } => {
            debug!("Default suggestion: {}", description);
        }
        OmniboxUpdate::Suggestions { suggestions } => {
            if suggestions.is_empty() {
                println!("No matching bangs.");
            }
            for s in suggestions {
                println!("  {}", s.description);
                println!("    {}", s.content);
            }
        }
        OmniboxUpdate::OpenTab(action) => match action {
            TabAction::Update { url } => println!("Open in current tab: {url}"),
            TabAction::Create { url, active: true } => println!("Open in new tab: {url}"),
            TabAction::Create { url, active: false } => {
                println!("Open in background tab: {url}");
            }
        },
    }
}

fn drain(updates: &mut UnboundedReceiver<OmniboxUpdate>) -> Vec<OmniboxUpdate> {
    let mut drained = Vec::new();
    while let Ok(update) = updates.try_recv() {
        drained.push(update);
    }
    drained
}

async fn run_suggest(app: &App, input: String) -> Result<()> {
    let (mut core, mut updates) = app.core().await?;

    core.process(OmniboxEvent::InputStarted).await;
    core.process(OmniboxEvent::InputChanged { text: input }).await;

    let drained = drain(&mut updates);
    if !drained
        .iter()
        .any(|u| matches!(u, OmniboxUpdate::Suggestions { .. }))
    {
        bail!("Bangs were not ready in time");
    }
    drained.iter().for_each(print_update);
    Ok(())
}

async fn run_open(app: &App, input: String, disposition: Disposition) -> Result<()> {
    let (mut core, mut updates) = app.core().await?;

    core.process(OmniboxEvent::InputStarted).await;
    core.process(OmniboxEvent::InputChanged {
        text: input.clone(),
    })
    .await;
    core.process(OmniboxEvent::InputEntered {
        url: input.clone(),
        disposition,
    })
    .await;

    let Some(action) = drain(&mut updates).into_iter().find_map(|u| match u {
        OmniboxUpdate::OpenTab(action) => Some(action),
        _ => None,
    }) else {
        bail!("No bang matches {input:?}");
    };
    print_update(&OmniboxUpdate::OpenTab(action));
    Ok(())
}

async fn run_watch(app: App) -> Result<()> {
    let _watcher = app
        .storage
        .watch()
        .context("Failed to watch storage file")?;
    let (core, mut updates) = app.core().await?;

    let (events, events_rx) = mpsc::unbounded_channel();
    let engine = tokio::spawn(core.run(events_rx));
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            print_update(&update);
        }
    });

    events.send(OmniboxEvent::InputStarted)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line.is_empty() {
            events.send(OmniboxEvent::InputStarted)?;
        } else if let Some(text) = line.strip_prefix('!') {
            events.send(OmniboxEvent::InputChanged {
                text: text.to_string(),
            })?;
            events.send(OmniboxEvent::InputEntered {
                url: text.to_string(),
                disposition: Disposition::CurrentTab,
            })?;
        } else {
            events.send(OmniboxEvent::InputChanged {
                text: line.to_string(),
            })?;
        }
    }

    drop(events);
    engine.await?;
    printer.await?;
    Ok(())
}
