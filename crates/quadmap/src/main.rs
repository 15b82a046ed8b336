mod app;
mod cli;
mod paths;
mod run;
mod settings;
mod window;

use anyhow::Result;

use crate::cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match &cli.command {
        Some(Command::Share(args)) => run::share(&cli.run, args),
        Some(Command::Where) => run::describe_paths(&cli.run),
        None => run::run(&cli.run),
    }
}
