//! `NAME=value` lines.

use crate::models::{Code, Finding};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Variables cron itself reads.
pub enum SpecialVar {
    MailTo,
    Path,
    Shell,
    Home,
}

impl SpecialVar {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MAILTO" => Some(SpecialVar::MailTo),
            "PATH" => Some(SpecialVar::Path),
            "SHELL" => Some(SpecialVar::Shell),
            "HOME" => Some(SpecialVar::Home),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialVar::MailTo => "MAILTO",
            SpecialVar::Path => "PATH",
            SpecialVar::Shell => "SHELL",
            SpecialVar::Home => "HOME",
        }
    }
}

/// Validate one assignment against the names assigned earlier in the file.
pub fn validate_assignment(name: &str, value: &str, known: &BTreeSet<String>) -> Vec<Finding> {
    let mut out = Vec::new();
    if value.trim().is_empty() {
        out.push(Finding::new(
            Code::QuoteValues,
            format!("assignment to {name} has no value; use quotes for an empty value (\"\")"),
        ));
    }
    if has_unescaped_dollar(value) {
        out.push(Finding::new(
            Code::ShellVar,
            format!("cron does not expand variables; literal $ found in value of {name}"),
        ));
    }
    if known.contains(name) {
        out.push(Finding::new(
            Code::VarRedefined,
            format!("variable {name} redefined"),
        ));
    }
    out
}

fn has_unescaped_dollar(value: &str) -> bool {
    value
        .char_indices()
        .any(|(i, c)| c == '$' && !value[..i].ends_with('\\'))
}
