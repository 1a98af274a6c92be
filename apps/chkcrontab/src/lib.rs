//! chkcrontab core library.
//!
//! Static checks for crontab files: time-field grammar and bounds, `@`
//! keywords, user columns, command escaping and environment assignments.
//! Problems are reported as located diagnostics; nothing is executed.
//!
//! High-level modules:
//! - `classify`: Line classification and suppression markers.
//! - `field`: Time-field tokenizer and value checks.
//! - `schedule`: `@keyword` and five-field schedules, cross-field rules.
//! - `command`: User column and command checks.
//! - `assignment`: `NAME=value` checks.
//! - `lint`: Per-file orchestration and multi-file runs.
//! - `oracle`: User existence lookups (passwd, getent, allow-list).
//! - `filename`: Which file names cron reads and which format they use.
//! - `models`: Diagnostics, codes, reports and field tables.
//! - `config`: Discovery and effective configuration resolution.
//! - `output`: Human/JSON printers.
//! - `logging`: `tracing` subscriber setup.
//! - `error`: Structural and configuration errors.
//! - `cli`: CLI argument parsing (binary uses this).
pub mod assignment;
pub mod classify;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod field;
pub mod filename;
pub mod lint;
pub mod logging;
pub mod models;
pub mod oracle;
pub mod output;
pub mod schedule;
