mod cli;
mod console;
mod wizard;

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use devbootstrap::config::Config;
use devbootstrap::error::ConfigError;
use devbootstrap::{
    Backends, HttpFetcher, Orchestrator, Probe, ProgressSink, SilentLauncher, SystemPathStore,
};

use cli::{Cmd, ConfigCmd};
use console::Console;
use wizard::InquirePicker;

type App = Orchestrator<Probe, HttpFetcher, SilentLauncher, SystemPathStore, InquirePicker>;

fn main() {
    // Progress events are rendered by the console; RUST_LOG=events=info
    // mirrors them to the log as well
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .filter_module("events", log::LevelFilter::Off)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

async fn real_main() -> Result<i32> {
    let args = cli::Args::parse();
    let interactive = !args.no_interaction && std::io::stdin().is_terminal();

    let cmd = args.sub.unwrap_or(Cmd::Run {
        dir: None,
        yes: false,
    });
    if let Cmd::Config { action } = &cmd {
        return handle_config(action, args.config.as_deref());
    }

    let (config, source) =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    match source {
        Some(path) => info!("Using config from: {}", path.display()),
        None => info!("Using built-in configuration defaults"),
    }

    let (sink, rx) = ProgressSink::channel();
    let mut console = Console::new(rx)?;
    let backends = Backends {
        detector: Probe::new(&config),
        fetcher: HttpFetcher::new(&config.fetch).context("Failed to create HTTP client")?,
        launcher: SilentLauncher::new(&config.install),
        path_store: SystemPathStore::from_settings(&config.install)
            .context("Failed to open persistent PATH store")?,
        picker: InquirePicker::new(interactive, console.progress(), console.prompt_gate()),
    };
    let mut app: App = Orchestrator::new(config, backends, sink);

    match cmd {
        Cmd::Check => handle_check(&mut app, &mut console).await,
        Cmd::Install { yes } => handle_install(&mut app, &mut console, yes, interactive).await,
        Cmd::Locate { dir } => handle_locate(&mut app, &mut console, dir).await,
        Cmd::Build { dir } => handle_build(&mut app, &mut console, dir).await,
        Cmd::Run { dir, yes } => handle_run(&mut app, &mut console, dir, yes, interactive).await,
        // Handled before the orchestrator is built
        Cmd::Config { .. } => Ok(0),
    }
}

fn start_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

async fn check(app: &mut App, console: &mut Console) -> bool {
    let tools = console.drive("Checking tools", app.check_all()).await.clone();
    wizard::show_tools(&tools);
    tools.all_present()
}

async fn handle_check(app: &mut App, console: &mut Console) -> Result<i32> {
    Ok(if check(app, console).await { 0 } else { 1 })
}

/// Install after confirmation; returns whether every tool is present after
async fn install(app: &mut App, console: &mut Console, yes: bool, interactive: bool) -> Result<bool> {
    let missing = app.tools().map(|t| t.missing()).unwrap_or_default();
    if missing.is_empty() {
        return Ok(true);
    }
    if !wizard::confirm_install(&missing, yes, interactive)? {
        info!("Installation skipped");
        return Ok(false);
    }

    let report = console.drive("Installing tools", app.install_missing()).await;
    wizard::show_install_report(&report);

    let tools = app.tools().cloned();
    if let Some(tools) = &tools {
        wizard::show_tools(tools);
    }
    Ok(tools.is_some_and(|t| t.all_present()))
}

async fn handle_install(
    app: &mut App,
    console: &mut Console,
    yes: bool,
    interactive: bool,
) -> Result<i32> {
    check(app, console).await;
    Ok(if install(app, console, yes, interactive).await? { 0 } else { 1 })
}

async fn handle_locate(app: &mut App, console: &mut Console, dir: Option<PathBuf>) -> Result<i32> {
    let start = start_dir(dir)?;
    match console.drive("Searching for build script", app.locate(&start)).await {
        Some(reference) => {
            println!("{}", reference.path.display());
            Ok(0)
        }
        None => Ok(1),
    }
}

async fn build(app: &mut App, console: &mut Console, start: &Path) -> Result<i32> {
    let result = console
        .drive("Building", app.build(start))
        .await
        .context("Build could not be started")?;

    Ok(match result {
        Some(result) => {
            wizard::show_build_result(&result);
            if result.succeeded { 0 } else { 1 }
        }
        None => 1,
    })
}

async fn handle_build(app: &mut App, console: &mut Console, dir: Option<PathBuf>) -> Result<i32> {
    let start = start_dir(dir)?;
    build(app, console, &start).await
}

async fn handle_run(
    app: &mut App,
    console: &mut Console,
    dir: Option<PathBuf>,
    yes: bool,
    interactive: bool,
) -> Result<i32> {
    let start = start_dir(dir)?;
    wizard::show_welcome();

    if !check(app, console).await && !install(app, console, yes, interactive).await? {
        error!("Required tools are still missing; not building");
        return Ok(1);
    }

    if !wizard::confirm_build(yes, interactive)? {
        info!("Build skipped");
        return Ok(0);
    }
    build(app, console, &start).await
}

fn handle_config(action: &ConfigCmd, explicit: Option<&Path>) -> Result<i32> {
    match action {
        ConfigCmd::Init { force } => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => Config::default_path().ok_or(ConfigError::NoConfigDir)?,
            };
            if path.exists() && !force {
                error!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
                return Ok(1);
            }

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let default_toml = Config::default()
                .to_toml()
                .context("Failed to serialize default config")?;
            fs::write(&path, default_toml).context("Failed to write config file")?;

            info!("Created default configuration at {}", path.display());
            Ok(0)
        }
        ConfigCmd::Show => {
            let (config, source) =
                Config::load(explicit).context("Failed to load configuration")?;
            match source {
                Some(path) => println!("# {}", path.display()),
                None => println!("# built-in defaults"),
            }
            print!("{}", config.to_toml().context("Failed to serialize config")?);
            Ok(0)
        }
    }
}
