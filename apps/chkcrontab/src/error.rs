//! Errors that stop a file (or the whole run) before lines are checked.
//!
//! Grammar and semantic problems are not errors in this sense; they are
//! diagnostics and never abort processing.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("cannot read file: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cron will not process this file; its name must match [A-Za-z0-9_-]+")]
    UnacceptableName { path: PathBuf },

    #[error("file is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse YAML config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown diagnostic code '{code}' in {path}")]
    UnknownCode { path: PathBuf, code: String },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
