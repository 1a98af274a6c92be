//! chkcrontab CLI binary entry point.
//! Resolves configuration, runs the checker and prints results.

use chkcrontab::cli::Cli;
use chkcrontab::config::{self, Effective};
use chkcrontab::lint::{Checker, Target};
use chkcrontab::logging::init_logging;
use chkcrontab::oracle;
use chkcrontab::output::{self, error_prefix, note_prefix};
use clap::Parser;
use std::path::PathBuf;

/// Exit status for usage and configuration problems.
const EXIT_USAGE: i32 = 2;

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    if cli.list_codes {
        print!("{}", output::render_codes());
        return 0;
    }
    if let Err(e) = init_logging(&cli.log_config()) {
        eprintln!("{} cannot set up logging: {e}", error_prefix());
        return EXIT_USAGE;
    }

    let eff = match config::resolve_effective(cli.overrides()) {
        Ok(eff) => eff,
        Err(e) => {
            eprintln!("{} {e}", error_prefix());
            return EXIT_USAGE;
        }
    };

    let targets = match collect_targets(&cli.files, &eff) {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("{} {msg}", error_prefix());
            return EXIT_USAGE;
        }
    };

    let oracle = oracle::build(
        eff.lookup_mode,
        &eff.passwd,
        eff.timeout,
        eff.allowed_users.clone(),
    );
    let checker = Checker::new(eff.check_options(), oracle.as_ref());
    let report = checker.run(&targets);

    if let Err(e) = output::print_report(&report, eff.output, eff.show_suppressed) {
        eprintln!("{} cannot write report: {e}", error_prefix());
        return EXIT_USAGE;
    }
    report.exit_status().code()
}

/// Files from the command line, or the config's patterns when none given.
fn collect_targets(files: &[PathBuf], eff: &Effective) -> Result<Vec<Target>, String> {
    if !files.is_empty() {
        return Ok(files.iter().map(Target::new).collect());
    }
    if eff.config_path.is_none() {
        eprintln!("{} no chkcrontab.toml found", note_prefix());
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| eff.root.clone());
    let targets = config::expand_patterns(eff, &cwd).map_err(|e| e.to_string())?;
    if targets.is_empty() {
        return Err("no crontab files given and no config patterns matched".to_string());
    }
    Ok(targets)
}
