use std::panic::{self, AssertUnwindSafe};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paircert_engine::{exit_code, DriverError, EXIT_SUCCESS};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Clean-exit barrier: nothing below may reach the user as a raw panic.
    panic::set_hook(Box::new(|_| {}));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&cli))).unwrap_or_else(|_| {
        Err(DriverError::Internal(
            "unexpected internal fault".to_string(),
        ))
    });

    match outcome {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(exit_code(&error));
        }
    }
}

fn dispatch(cli: &Cli) -> Result<(), DriverError> {
    match &cli.command {
        None | Some(Commands::Wizard) => commands::wizard::run(),
        Some(Commands::Generate(args)) => commands::generate::run(args),
        Some(Commands::Verify(args)) => commands::verify::run(args),
        Some(Commands::Doctor(args)) => commands::doctor::run(args),
        Some(Commands::Version) => {
            println!("paircert {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Licenses) => {
            print!("{}", commands::THIRD_PARTY_NOTICES);
            Ok(())
        }
    }
}

/// Diagnostics go to stderr so the primary stream stays reserved for the
/// suite itself.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
