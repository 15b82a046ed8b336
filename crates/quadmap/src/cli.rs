use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::AddressMode;
use session::TimeMode;

#[derive(Parser, Debug)]
#[command(
    name = "quadmap",
    author,
    version,
    about = "Animated quadratic-map fractal viewer"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a session token for the configured parameters without opening a window.
    Share(ShareArgs),
    /// Show where quadmap looks for its configuration.
    Where,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Configuration file (defaults to quadmap.toml in the config directory).
    #[arg(long, global = true, value_name = "PATH", env = "QUADMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session token, `#fragment` or URL to restore on startup.
    #[arg(long, global = true, value_name = "TOKEN")]
    pub session: Option<String>,

    /// Initial window size, e.g. 1280x720.
    #[arg(long, value_parser = parse_size, value_name = "WxH")]
    pub size: Option<(u32, u32)>,

    /// Start playing immediately.
    #[arg(long)]
    pub play: bool,

    /// Sampler addressing for the iteration surfaces.
    #[arg(long, value_parser = parse_address, value_name = "MODE")]
    pub iteration_address: Option<AddressMode>,

    /// Sampler addressing for the gradient lookup.
    #[arg(long, value_parser = parse_address, value_name = "MODE")]
    pub gradient_address: Option<AddressMode>,

    /// What a restored session does with its time: restore or zero.
    #[arg(long, global = true, value_parser = parse_time_mode, value_name = "MODE")]
    pub time_mode: Option<TimeMode>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ShareArgs {
    /// Override a parameter before encoding, e.g. `params.iterations=20`.
    #[arg(long = "set", value_parser = parse_assignment, value_name = "GROUP.ID=VALUE")]
    pub assignments: Vec<Assignment>,

    /// Leave the simulation time out of the token.
    #[arg(long, conflicts_with = "time")]
    pub no_time: bool,

    /// Simulation time to store in the token.
    #[arg(long, value_name = "SECONDS")]
    pub time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub group: String,
    pub id: String,
    pub value: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("width and height must be non-zero".into());
    }
    Ok((width, height))
}

fn parse_address(value: &str) -> Result<AddressMode, String> {
    value.parse()
}

fn parse_time_mode(value: &str) -> Result<TimeMode, String> {
    value.parse()
}

fn parse_assignment(value: &str) -> Result<Assignment, String> {
    let (key, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected GROUP.ID=VALUE, got '{value}'"))?;
    let (group, id) = key
        .trim()
        .split_once('.')
        .ok_or_else(|| format!("expected GROUP.ID before '=', got '{key}'"))?;
    if group.is_empty() || id.is_empty() {
        return Err(format!("empty group or parameter in '{key}'"));
    }
    Ok(Assignment {
        group: group.to_string(),
        id: id.to_string(),
        value: raw.trim().to_string(),
    })
}
