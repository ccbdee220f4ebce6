//! Command-line client for watching and controlling a torrent daemon.

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use seedwatch_backends::{REGISTRY, lookup, names};
use seedwatch_config::{ConfigStore, FileConfigStore, Settings};
use seedwatch_core::{ListModel, SortKey};
use seedwatch_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bootstrap::{Overrides, Session, connect};
use crate::console::ConsoleSurface;
use crate::controller::Controller;
use crate::error::AppError;
use crate::poller::{PollOutcome, Poller, PollerConfig, PollerHandle, lock_surface};

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    if let Err(err) = init_logging(&logging) {
        let err = CliError::from(AppError::telemetry("init logging", err));
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let store = Arc::new(open_store(cli.config.as_deref())?);
    let overrides = Overrides {
        backend: cli.backend,
        endpoint: cli.endpoint,
        timeout_secs: cli.timeout,
        interval_secs: None,
    };

    match cli.command {
        Command::Watch(args) => {
            let overrides = Overrides {
                interval_secs: args.interval,
                ..overrides
            };
            handle_watch(store, &overrides, args.sort).await
        }
        Command::Ls(args) => handle_list(store, &overrides, args.sort).await,
        Command::Start(args) => {
            let controller = controller_for(store, &overrides).await?;
            controller.start(args.id.as_deref()).await?;
            println!("start requested for {}", target_label(args.id.as_deref()));
            Ok(())
        }
        Command::Stop(args) => {
            let controller = controller_for(store, &overrides).await?;
            controller.stop(args.id.as_deref()).await?;
            println!("stop requested for {}", target_label(args.id.as_deref()));
            Ok(())
        }
        Command::Remove(args) => {
            let controller = controller_for(store, &overrides).await?;
            controller.remove(&args.id, args.delete_files).await?;
            println!("removed {}", args.id);
            Ok(())
        }
        Command::Add(args) => {
            if args.source.trim().is_empty() {
                return Err(CliError::validation("source must not be empty"));
            }
            let controller = controller_for(store, &overrides).await?;
            controller
                .add(&args.source, args.download_dir.as_deref())
                .await?;
            println!("added {}", args.source);
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => handle_config_show(&store),
        Command::Config(ConfigCommand::SetEndpoint(args)) => {
            handle_set_endpoint(store.as_ref(), &args.address, overrides.backend.as_deref())
        }
        Command::Backends => {
            println!("{:<14} {:<24} DESCRIPTION", "NAME", "DEFAULT ENDPOINT");
            for entry in &REGISTRY {
                println!(
                    "{:<14} {:<24} {}",
                    entry.name, entry.default_endpoint, entry.description
                );
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "seedwatch",
    about = "Watch and control a Transmission or rTorrent daemon"
)]
struct Cli {
    #[arg(long, global = true, env = "SEEDWATCH_BACKEND", help = "Backend name (see `backends`)")]
    backend: Option<String>,
    #[arg(long, global = true, env = "SEEDWATCH_ENDPOINT", help = "Daemon address")]
    endpoint: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SEEDWATCH_TIMEOUT_SECS",
        help = "Seconds a single request may take"
    )]
    timeout: Option<u64>,
    #[arg(long, global = true, env = "SEEDWATCH_CONFIG", help = "Settings file to use")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "SEEDWATCH_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "SEEDWATCH_LOG_FORMAT",
        value_parser = parse_log_format
    )]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the daemon and redraw the list until interrupted.
    Watch(WatchArgs),
    /// Print the list once.
    Ls(ListArgs),
    /// Start one torrent, or all of them.
    Start(TargetArgs),
    /// Stop one torrent, or all of them.
    Stop(TargetArgs),
    /// Remove a torrent.
    Remove(RemoveArgs),
    /// Add a torrent from a magnet link, URL or file path.
    Add(AddArgs),
    /// Inspect or change stored settings.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List the supported backends.
    Backends,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the stored settings.
    Show,
    /// Store the endpoint (and `--backend`) to connect to.
    SetEndpoint(SetEndpointArgs),
}

#[derive(Args, Default)]
struct WatchArgs {
    #[arg(long, env = "SEEDWATCH_INTERVAL_SECS", help = "Seconds between polls")]
    interval: Option<u64>,
    #[arg(long, value_parser = parse_sort_key, help = "alphabetical or status")]
    sort: Option<SortKey>,
}

#[derive(Args, Default)]
struct ListArgs {
    #[arg(long, value_parser = parse_sort_key, help = "alphabetical or status")]
    sort: Option<SortKey>,
}

#[derive(Args, Default)]
struct TargetArgs {
    #[arg(help = "Torrent identifier; every torrent when omitted")]
    id: Option<String>,
}

#[derive(Args)]
struct RemoveArgs {
    #[arg(help = "Torrent identifier")]
    id: String,
    #[arg(long, help = "Delete downloaded data as well")]
    delete_files: bool,
}

#[derive(Args)]
struct AddArgs {
    #[arg(help = "Magnet URI, URL or path to a .torrent file")]
    source: String,
    #[arg(long, help = "Directory the daemon should download into")]
    download_dir: Option<String>,
}

#[derive(Args)]
struct SetEndpointArgs {
    #[arg(help = "Daemon address, e.g. http://nas:9091 or scgi://127.0.0.1:5000")]
    address: String,
}

#[derive(Debug)]
enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

type CliResult<T> = Result<T, CliError>;

impl CliError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        if let AppError::UnknownBackend { name } = &err {
            return Self::validation(format!(
                "unknown backend '{name}' (available: {})",
                names().collect::<Vec<_>>().join(", ")
            ));
        }
        if err.is_validation() {
            Self::Validation(format!("{:#}", anyhow::Error::new(err)))
        } else {
            Self::failure(err)
        }
    }
}

fn parse_sort_key(value: &str) -> Result<SortKey, String> {
    value.parse::<SortKey>().map_err(|err| err.to_string())
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|err| err.to_string())
}

fn open_store(path: Option<&Path>) -> CliResult<FileConfigStore> {
    match path {
        Some(path) => Ok(FileConfigStore::new(path)),
        None => FileConfigStore::default_location()
            .map_err(|source| CliError::from(AppError::config("locate settings", source))),
    }
}

async fn controller_for(
    store: Arc<FileConfigStore>,
    overrides: &Overrides,
) -> CliResult<Controller<ListModel>> {
    let Session {
        backend, settings, ..
    } = connect(store.as_ref(), overrides).await?;
    Ok(Controller::new(
        backend,
        Arc::new(Mutex::new(ListModel::new())),
        store,
        settings.request_timeout(),
    ))
}

async fn handle_watch(
    store: Arc<FileConfigStore>,
    overrides: &Overrides,
    sort: Option<SortKey>,
) -> CliResult<()> {
    let session = connect(store.as_ref(), overrides).await?;
    let surface = Arc::new(Mutex::new(ConsoleSurface::new(io::stdout())));
    let cancel = CancellationToken::new();
    let handle = start_poller(&session, &surface, cancel.clone()).await?;

    if let Some(key) = sort {
        let controller = Controller::new(
            Arc::clone(&session.backend),
            Arc::clone(&surface),
            store,
            session.settings.request_timeout(),
        );
        controller.sort(key)?;
        redraw(&surface)?;
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel.cancel(),
            Err(err) => warn!(error = %err, "cannot listen for interrupt; stop with a signal"),
        }
    });
    finish(handle).await
}

async fn handle_list(
    store: Arc<FileConfigStore>,
    overrides: &Overrides,
    sort: Option<SortKey>,
) -> CliResult<()> {
    let session = connect(store.as_ref(), overrides).await?;
    let surface = Arc::new(Mutex::new(ConsoleSurface::deferred(io::stdout())));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let handle = start_poller(&session, &surface, cancel).await?;
    finish(handle).await?;

    if let Some(key) = sort {
        let controller = Controller::new(
            Arc::clone(&session.backend),
            Arc::clone(&surface),
            store,
            session.settings.request_timeout(),
        );
        controller.sort(key)?;
    }
    redraw(&surface)
}

async fn start_poller(
    session: &Session,
    surface: &Arc<Mutex<ConsoleSurface<Stdout>>>,
    cancel: CancellationToken,
) -> CliResult<PollerHandle> {
    let config = PollerConfig {
        interval: session.settings.poll_interval(),
        request_timeout: session.settings.request_timeout(),
        initial_sort: Some(session.settings.sort_order),
    };
    let handle = Poller::start(
        Arc::clone(&session.backend),
        Arc::clone(surface),
        config,
        cancel,
    )
    .await
    .map_err(AppError::from)?;
    Ok(handle)
}

async fn finish(handle: PollerHandle) -> CliResult<()> {
    match handle.join().await.map_err(AppError::from)? {
        PollOutcome::Cancelled => Ok(()),
        PollOutcome::BackendLost(source) => Err(AppError::backend("poll", source).into()),
        PollOutcome::DisplayLost(source) => Err(AppError::display("poll", source).into()),
    }
}

fn redraw(surface: &Mutex<ConsoleSurface<Stdout>>) -> CliResult<()> {
    lock_surface(surface, "draw")
        .and_then(|mut surface| surface.draw())
        .map_err(|source| AppError::display("draw", source).into())
}

fn handle_config_show(store: &FileConfigStore) -> CliResult<()> {
    let settings = store
        .load()
        .map_err(|source| AppError::config("load settings", source))?;
    let default_endpoint = lookup(&settings.backend).map_or("-", |entry| entry.default_endpoint);
    println!("file: {}", store.path().display());
    println!("backend: {}", settings.backend);
    match &settings.endpoint {
        Some(endpoint) => println!("endpoint: {endpoint}"),
        None => println!("endpoint: {default_endpoint} (default)"),
    }
    println!("sort order: {}", settings.sort_order);
    println!("poll interval: {}s", settings.poll_interval_secs);
    println!("request timeout: {}s", settings.request_timeout_secs);
    println!("username: {}", settings.username.as_deref().unwrap_or("-"));
    println!(
        "password: {}",
        if settings.password.is_some() { "set" } else { "-" }
    );
    Ok(())
}

fn handle_set_endpoint(
    store: &dyn ConfigStore,
    address: &str,
    backend: Option<&str>,
) -> CliResult<()> {
    if address.trim().is_empty() {
        return Err(CliError::validation("endpoint must not be empty"));
    }
    if let Some(name) = backend
        && lookup(name).is_none()
    {
        return Err(AppError::UnknownBackend {
            name: name.to_string(),
        }
        .into());
    }
    let mut settings: Settings = store
        .load()
        .map_err(|source| AppError::config("load settings", source))?;
    settings.remember_endpoint(address, backend);
    store
        .save(&settings)
        .map_err(|source| AppError::config("save settings", source))?;
    println!("endpoint saved for {}", settings.backend);
    Ok(())
}

fn target_label(id: Option<&str>) -> String {
    id.map_or_else(|| "all torrents".to_string(), |id| format!("torrent {id}"))
}
