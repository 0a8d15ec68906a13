use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use snapdiff::cli::{Cli, Commands};
use snapdiff::commands::track::TrackOptions;
use snapdiff::output::{self, Verbosity};
use snapdiff::{SnapdiffContext, commands};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    output::set_verbosity(if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(0);
    }

    let ctx = SnapdiffContext::new()?.with_state_dir(cli.state_dir)?;
    output::verbose(&format!("State directory: {}", ctx.state_dir.display()));

    match cli.command {
        Commands::Track {
            roots,
            output,
            strict,
            short,
            exit_code,
        } => {
            let options = TrackOptions {
                output,
                strict,
                short,
            };
            let summary = commands::track::execute(&ctx, &roots, &options)?;
            if exit_code && summary.has_changes() {
                return Ok(1);
            }
        }
        Commands::Scan { roots, quarantine } => {
            commands::scan::execute(&ctx, &roots, quarantine)?;
        }
        Commands::Show { root, previous } => {
            commands::show::execute(&ctx, &root, previous)?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(0)
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("snapdiff=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
