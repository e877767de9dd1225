use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use docview::event_source::KeyboardEventSource;
use docview::panic_handler::initialize_panic_handler;
use docview::plugin::{PluginRegistry, ViewerCatalog, default_plugin_dirs, verbose_diagnostics};
use docview::session::{SESSION_FILENAME, Session};
use docview::settings::{self, APP_NAME, Settings};
use docview::{App, run_app_with_event_source};

#[derive(Parser)]
#[command(
    name = "docview",
    version,
    about = "Terminal document viewer with pluggable format viewers"
)]
struct Cli {
    /// Document to open on startup
    file: Option<PathBuf>,

    /// Extra directory with viewer manifests; may be repeated
    #[arg(long = "plugin-dir", value_name = "DIR")]
    plugin_dirs: Vec<PathBuf>,

    /// Print the discovered viewers and exit
    #[arg(long)]
    list_viewers: bool,
}

fn log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_NAME))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .unwrap_or_else(std::env::temp_dir)
        .join("docview.log")
}

fn init_logging() -> Result<()> {
    let level = if verbose_diagnostics() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let path = log_path();
    let file = File::create(&path).with_context(|| format!("cannot create log file {path:?}"))?;
    WriteLogger::init(level, Config::default(), file)?;
    Ok(())
}

fn build_registry(settings: &Settings, extra_dirs: &[PathBuf]) -> PluginRegistry {
    let mut plugin_dirs = default_plugin_dirs();
    plugin_dirs.extend(settings.plugin_dirs.iter().cloned());
    plugin_dirs.extend(extra_dirs.iter().cloned());

    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    registry.discover(&plugin_dirs);
    registry
}

fn list_viewers(registry: &PluginRegistry) {
    for descriptor in registry.descriptors() {
        println!(
            "{} {} ({})\n    {}\n    types: {}",
            descriptor.name(),
            descriptor.version(),
            descriptor.source(),
            descriptor.description(),
            descriptor.media_types().join(", ")
        );
    }
    for warning in registry.warnings() {
        println!("skipped {warning}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    info!("Starting docview {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load();
    let registry = build_registry(&settings, &cli.plugin_dirs);
    if cli.list_viewers {
        list_viewers(&registry);
        return Ok(());
    }

    if let Some(file) = &cli.file {
        if !file.exists() {
            bail!("{} does not exist", file.display());
        }
    }

    let session_path = settings::config_dir().map(|dir| dir.join(SESSION_FILENAME));
    let session = Session::load_or_ephemeral(session_path.as_deref());
    let mut app = App::new_with_config(settings, session, registry);

    initialize_panic_handler();
    enable_raw_mode().context("terminal does not support raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    if let Ok(size) = terminal.size() {
        app.handle_resize(size.width, size.height);
    }

    if let Some(file) = &cli.file {
        app.open_file(file);
    }

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut KeyboardEventSource);
    app.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down docview");
    Ok(())
}
