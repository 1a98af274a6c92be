//! CLI argument parsing via `clap`.

use crate::config::Overrides;
use crate::logging::{LogConfig, LogFormat};
use crate::models::{Code, CrontabVariant};
use crate::oracle::LookupMode;
use crate::output::OutputFormat;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "chkcrontab",
    version,
    about = "Static checker for crontab files",
    long_about = "chkcrontab reads system (/etc/crontab, /etc/cron.d/*) and user crontabs and reports lines cron would reject or misread.\n\nConfiguration precedence: CLI > chkcrontab.toml > defaults.",
    after_help = "Examples:\n  chkcrontab /etc/crontab /etc/cron.d/*\n  chkcrontab --variant user mycrontab\n  chkcrontab --output json --user-lookup passwd cron.d/backup\n\nExit status: 0 no errors, 1 errors found, 2 usage or configuration error."
)]
pub struct Cli {
    /// Crontab files to check (default: `patterns` from the config file).
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    #[arg(long, value_enum, help = "Crontab format (default: derived from the path)")]
    pub variant: Option<VariantArg>,

    #[arg(long, value_enum, help = "Output mode (default: human)")]
    pub output: Option<OutputArg>,

    #[arg(long, action = ArgAction::SetTrue, help = "Enable pedantic checks (minute is * while hour is set)")]
    pub pedantic: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Also print diagnostics silenced by markers or config")]
    pub show_suppressed: bool,

    #[arg(
        long = "allow-user",
        value_name = "USER",
        value_delimiter = ',',
        help = "Skip existence checks for these users (postgres and buildbot always are)"
    )]
    pub allow_users: Vec<String>,

    #[arg(
        long = "disable",
        value_name = "CODE",
        value_delimiter = ',',
        value_parser = parse_code,
        help = "Suppress a diagnostic code everywhere"
    )]
    pub disable: Vec<Code>,

    #[arg(long = "user-lookup", value_enum, help = "How user names are resolved (default: chain)")]
    pub user_lookup: Option<LookupModeArg>,

    #[arg(long = "passwd-file", value_name = "PATH", help = "passwd file for lookups (default: /etc/passwd)")]
    pub passwd_file: Option<PathBuf>,

    #[arg(long = "lookup-timeout-ms", value_name = "MS", help = "Timeout for getent lookups (default: 2000)")]
    pub lookup_timeout_ms: Option<u64>,

    #[arg(long = "config-root", value_name = "DIR", help = "Start config discovery here (default: current dir)")]
    pub config_root: Option<PathBuf>,

    #[arg(long = "list-codes", action = ArgAction::SetTrue, help = "Print all diagnostic codes and exit")]
    pub list_codes: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

fn parse_code(s: &str) -> Result<Code, String> {
    s.parse::<Code>().map_err(|e| e.to_string())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum VariantArg {
    System,
    User,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputArg {
    Human,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LookupModeArg {
    Chain,
    Passwd,
    Getent,
    None,
}

/// CLI log level choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<VariantArg> for CrontabVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::System => CrontabVariant::System,
            VariantArg::User => CrontabVariant::User,
        }
    }
}

impl From<OutputArg> for OutputFormat {
    fn from(v: OutputArg) -> Self {
        match v {
            OutputArg::Human => OutputFormat::Human,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

impl From<LookupModeArg> for LookupMode {
    fn from(v: LookupModeArg) -> Self {
        match v {
            LookupModeArg::Chain => LookupMode::Chain,
            LookupModeArg::Passwd => LookupMode::Passwd,
            LookupModeArg::Getent => LookupMode::Getent,
            LookupModeArg::None => LookupMode::None,
        }
    }
}

impl From<LogLevelArg> for Level {
    fn from(v: LogLevelArg) -> Self {
        match v {
            LogLevelArg::Error => Level::ERROR,
            LogLevelArg::Warn => Level::WARN,
            LogLevelArg::Info => Level::INFO,
            LogLevelArg::Debug => Level::DEBUG,
            LogLevelArg::Trace => Level::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(v: LogFormatArg) -> Self {
        match v {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Settings that take precedence over the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_root: self.config_root.clone(),
            variant: self.variant.map(Into::into),
            output: self.output.map(Into::into),
            // flags only override when set
            pedantic: self.pedantic.then_some(true),
            show_suppressed: self.show_suppressed.then_some(true),
            allowed_users: self.allow_users.clone(),
            disabled: self.disable.clone(),
            lookup_mode: self.user_lookup.map(Into::into),
            passwd: self.passwd_file.clone(),
            timeout_ms: self.lookup_timeout_ms,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        let config = LogConfig::from_verbosity(self.verbose, self.quiet)
            .with_format(self.log_format.into())
            .with_log_file(self.log_file.clone());
        match self.log_level {
            Some(level) => config.with_level(level.into()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::try_parse_from([
            "chkcrontab",
            "--variant",
            "user",
            "--output",
            "json",
            "--pedantic",
            "--allow-user",
            "a,b",
            "--allow-user",
            "c",
            "--disable",
            "dom_dow_or,VAR_REDEFINED",
            "--user-lookup",
            "none",
            "-vv",
            "f1",
            "f2",
        ])
        .unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("f1"), PathBuf::from("f2")]);
        let o = cli.overrides();
        assert_eq!(o.variant, Some(CrontabVariant::User));
        assert_eq!(o.output, Some(OutputFormat::Json));
        assert_eq!(o.pedantic, Some(true));
        assert_eq!(o.show_suppressed, None);
        assert_eq!(o.allowed_users, vec!["a", "b", "c"]);
        assert_eq!(o.disabled, vec![Code::DomDowOr, Code::VarRedefined]);
        assert_eq!(o.lookup_mode, Some(LookupMode::None));
        assert_eq!(cli.log_config().level, Level::DEBUG);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(Cli::try_parse_from(["chkcrontab", "--disable", "NOPE", "f"]).is_err());
    }

    #[test]
    fn test_log_level_overrides_verbosity() {
        let cli = Cli::try_parse_from(["chkcrontab", "-q", "--log-level", "trace"]).unwrap();
        assert_eq!(cli.log_config().level, Level::TRACE);
    }
}
