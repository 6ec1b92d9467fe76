//! Quillmigrate CLI - versioned SQL schema migrations

use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::common::ExitCode;
use commands::{install, plan, status, uninstall, update};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Install(args) => install::execute(args, &cli.global).await,
        cli::Commands::Update(args) => update::execute(args, &cli.global).await,
        cli::Commands::Uninstall => uninstall::execute(&cli.global).await,
        cli::Commands::Plan(args) => plan::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => *code,
            None => {
                eprintln!("Error: {err:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

/// Route `log` output to stderr. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
