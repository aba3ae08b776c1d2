mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::run;

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
    }
}

/// `RUST_LOG` wins; otherwise `info`, raised to debug/trace by `-v`/`-vv`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn main() -> anyhow::Result<()> { run() }
