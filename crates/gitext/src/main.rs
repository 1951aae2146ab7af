#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for the stage/production git workflow, built on the
//! libgitext safety engine.

use std::{
    env,
    io::{self, IsTerminal, Write},
    path::PathBuf,
    process,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use libgitext::{ExecOptions, Gitext, GitextError, RetargetOptions};
use liboutput::{Output, Quiet, Terminal};
use tracing_subscriber::EnvFilter;

/// Command-line definition.
mod args;
/// Per-subcommand logic.
mod commands;
/// Rendering and prompt helpers.
mod ui;

use args::{Cli, Commands, PrepareCommand, RetargetCommand, StartCommand, UpdateCommand};

/// Environment variable holding the diagnostic log filter.
const LOG_ENV: &str = "GITEXT_LOG";

/// Install the diagnostic logger. Silent unless `GITEXT_LOG` is set.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// CLI entrypoint.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let output: Arc<dyn Output> = if cli.quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color, cli.verbose))
    };

    if let Err(e) = run(cli, &output) {
        // Reset any existing colors only if color was enabled and stdout is a TTY
        if color && io::stdout().is_terminal() {
            print!("\x1b[0m");
            if let Err(flush_err) = io::stdout().flush() {
                eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
            }
        }

        let exit_code = match e.downcast_ref::<GitextError>() {
            Some(err @ GitextError::UserAborted) => err.exit_code(),
            Some(err) => {
                if let Err(display_err) = ui::render_error(output.as_ref(), &e) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                err.exit_code()
            }
            None => {
                if let Err(display_err) = output.fail(&format!("{e:#}")) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                1
            }
        };
        if let Err(finish_err) = output.finish() {
            eprintln!("Failed to flush output handler: {finish_err:#}");
        }

        process::exit(exit_code);
    }
    Ok(())
}

/// Execute the selected CLI command using the provided output implementation.
fn run(cli: Cli, output: &Arc<dyn Output>) -> Result<()> {
    let repo_dir = match &cli.repo_dir {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir().context("Failed to determine the current directory")?,
    };
    let options = ExecOptions {
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        ..ExecOptions::default()
    };

    let gx = Gitext::open(&repo_dir, options, Arc::clone(output))?;
    let out = output.as_ref();

    match cli.command {
        Commands::Status => commands::status(&gx, out)?,
        Commands::Sync { target } => commands::sync(&gx, out, target.into())?,
        Commands::Start(StartCommand::Feature { ticket, slug, from }) => {
            commands::start(&gx, out, &ticket, &slug, from.into())?;
        }
        Commands::Update(UpdateCommand::Feature { with, mode }) => {
            commands::update(&gx, out, with.into(), mode.into())?;
        }
        Commands::Retarget(RetargetCommand::Feature {
            onto,
            from,
            allow_non_feature,
            acknowledge_shared,
        }) => {
            commands::retarget(
                &gx,
                out,
                RetargetOptions {
                    onto: onto.into(),
                    from: from.into(),
                    allow_non_feature,
                    acknowledge_shared,
                },
            )?;
        }
        Commands::Cleanup { hard } => commands::cleanup(&gx, out, hard, cli.no_prompt)?,
        Commands::Prepare(PrepareCommand::Pr { to }) => commands::prepare_pr(&gx, out, to.into())?,
    }

    output.finish()?;
    Ok(())
}
