use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use viewconfig::ViewConfig;

use crate::app::App;
use crate::cli::{RunArgs, ShareArgs};
use crate::paths::AppPaths;
use crate::settings::Settings;
use crate::window;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn config_path(args: &RunArgs) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(AppPaths::discover()?.config_file()),
    }
}

fn load_settings(args: &RunArgs) -> Result<Settings> {
    let path = config_path(args)?;
    let config = ViewConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Settings::resolve(&config, args)
}

fn build_app(settings: &Settings) -> Result<App> {
    let mut app = App::new(settings)?;
    if let Some(token) = &settings.session {
        app.load_session(token);
    }
    Ok(app)
}

pub fn run(args: &RunArgs) -> Result<()> {
    let settings = load_settings(args)?;
    let app = build_app(&settings)?;
    tracing::info!(
        width = settings.window.width,
        height = settings.window.height,
        autoplay = settings.autoplay,
        "starting quadmap"
    );
    window::run_window(app, &settings)
}

pub fn share(args: &RunArgs, share: &ShareArgs) -> Result<()> {
    let settings = load_settings(args)?;
    let mut app = build_app(&settings)?;
    for assignment in &share.assignments {
        app.apply_input(&assignment.group, &assignment.id, &assignment.value)
            .with_context(|| format!("invalid --set {}.{}", assignment.group, assignment.id))?;
    }
    if let Some(time) = share.time {
        app.scheduler_mut()
            .set_time(time)
            .context("invalid --time")?;
    }

    let time = if share.no_time || (!settings.include_time && share.time.is_none()) {
        None
    } else {
        Some(app.scheduler().time())
    };
    let shared = app.share_at(time);
    println!("{}", shared.token);
    if let Some(url) = shared.url {
        println!("{url}");
    }
    Ok(())
}

pub fn describe_paths(args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let origin = if paths.is_overridden() {
        "environment"
    } else {
        "default"
    };
    println!("config dir:  {} ({origin})", paths.config_dir().display());
    println!("config file: {}", config_path(args)?.display());
    Ok(())
}
