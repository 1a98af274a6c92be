//! Shared data models for diagnostics, per-file reports and run summaries.

pub mod field;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// How bad a diagnostic is. Only `Error` affects the exit status.
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Stable identifier of a check. Used in suppression markers and config.
pub enum Code {
    LineError,
    FieldCount,
    FieldParseError,
    FieldValueError,
    StepNoEffect,
    NamedSequence,
    DomDowOr,
    HoursNotMinutes,
    InvalidAt,
    BarePercent,
    InvalidUser,
    UserNotFound,
    UserLookupFailed,
    ShellVar,
    QuoteValues,
    VarRedefined,
}

impl Code {
    pub const ALL: [Code; 16] = [
        Code::LineError,
        Code::FieldCount,
        Code::FieldParseError,
        Code::FieldValueError,
        Code::StepNoEffect,
        Code::NamedSequence,
        Code::DomDowOr,
        Code::HoursNotMinutes,
        Code::InvalidAt,
        Code::BarePercent,
        Code::InvalidUser,
        Code::UserNotFound,
        Code::UserLookupFailed,
        Code::ShellVar,
        Code::QuoteValues,
        Code::VarRedefined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Code::LineError => "LINE_ERROR",
            Code::FieldCount => "FIELD_COUNT",
            Code::FieldParseError => "FIELD_PARSE_ERROR",
            Code::FieldValueError => "FIELD_VALUE_ERROR",
            Code::StepNoEffect => "STEP_NO_EFFECT",
            Code::NamedSequence => "NAMED_SEQUENCE",
            Code::DomDowOr => "DOM_DOW_OR",
            Code::HoursNotMinutes => "HOURS_NOT_MINUTES",
            Code::InvalidAt => "INVALID_AT",
            Code::BarePercent => "BARE_PERCENT",
            Code::InvalidUser => "INVALID_USER",
            Code::UserNotFound => "USER_NOT_FOUND",
            Code::UserLookupFailed => "USER_LOOKUP_FAILED",
            Code::ShellVar => "SHELL_VAR",
            Code::QuoteValues => "QUOTE_VALUES",
            Code::VarRedefined => "VAR_REDEFINED",
        }
    }

    /// Every code has exactly one severity.
    pub fn severity(self) -> Severity {
        match self {
            Code::StepNoEffect
            | Code::NamedSequence
            | Code::DomDowOr
            | Code::HoursNotMinutes
            | Code::UserLookupFailed
            | Code::VarRedefined => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// One-line description used by `--list-codes`.
    pub fn summary(self) -> &'static str {
        match self {
            Code::LineError => "line is not a comment, assignment or job",
            Code::FieldCount => "fewer than five time fields",
            Code::FieldParseError => "time field does not match the field grammar",
            Code::FieldValueError => "time field value out of bounds or invalid",
            Code::StepNoEffect => "step is larger than the range it steps over",
            Code::NamedSequence => "names used in a range or list of month/day of week",
            Code::DomDowOr => "day of month and day of week both restricted (OR semantics)",
            Code::HoursNotMinutes => "hour restricted while minute is * (pedantic)",
            Code::InvalidAt => "unknown @ keyword",
            Code::BarePercent => "unescaped % in command",
            Code::InvalidUser => "user column is not a valid user name",
            Code::UserNotFound => "user does not exist",
            Code::UserLookupFailed => "user lookup could not be completed",
            Code::ShellVar => "$ in variable assignment is not expanded",
            Code::QuoteValues => "variable assignment has an empty value",
            Code::VarRedefined => "variable assigned more than once",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCode(pub String);

impl fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown diagnostic code '{}'", self.0)
    }
}

impl std::error::Error for UnknownCode {}

impl FromStr for Code {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Code::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCode(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// System crontabs carry a user column; user crontabs do not.
pub enum CrontabVariant {
    System,
    User,
}

impl fmt::Display for CrontabVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrontabVariant::System => "system",
            CrontabVariant::User => "user",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A problem found by one of the line validators, before it is pinned to
/// a line of a file.
pub struct Finding {
    pub code: Code,
    pub message: String,
}

impl Finding {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Pin the finding to a line, producing the immutable diagnostic.
    pub fn at(self, line: usize, suppressed: bool) -> Diagnostic {
        Diagnostic {
            line,
            severity: self.code.severity(),
            code: self.code,
            message: self.message,
            suppressed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single diagnostic with severity and location.
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub code: Code,
    pub message: String,
    pub suppressed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts used by printers and the exit status.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub suppressed: usize,
    pub files: usize,
}

impl Summary {
    pub fn absorb(&mut self, other: &Summary) {
        self.errors += other.errors;
        self.warnings += other.warnings;
        self.suppressed += other.suppressed;
        self.files += other.files;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Success,
    Error,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// Result of checking one crontab file.
pub struct FileReport {
    pub path: String,
    pub variant: CrontabVariant,
    pub lines: usize,
    /// Ordered by line number, then discovery order.
    pub diagnostics: Vec<Diagnostic>,
    /// Variable names in order of first assignment.
    pub variables: Vec<String>,
    /// Last value assigned to each variable cron itself reads
    /// (`MAILTO`, `PATH`, `SHELL`, `HOME`).
    pub cron_env: BTreeMap<String, String>,
    pub summary: Summary,
}

impl FileReport {
    /// Diagnostics that were not silenced by a marker or config.
    pub fn visible(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.suppressed)
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.has_errors() {
            ExitStatus::Error
        } else {
            ExitStatus::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trips_through_str() {
        for code in Code::ALL {
            assert_eq!(code.as_str().parse::<Code>(), Ok(code));
        }
        assert_eq!("bare_percent".parse::<Code>(), Ok(Code::BarePercent));
        assert!("NOPE".parse::<Code>().is_err());
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let v = serde_json::to_value(Code::UserLookupFailed).unwrap();
        assert_eq!(v, "USER_LOOKUP_FAILED");
        let back: Code = serde_json::from_value(v).unwrap();
        assert_eq!(back, Code::UserLookupFailed);
    }

    #[test]
    fn test_warnings_alone_keep_success_status() {
        let report = FileReport {
            path: "f".into(),
            variant: CrontabVariant::System,
            lines: 1,
            diagnostics: vec![Finding::new(Code::DomDowOr, "x").at(1, false)],
            variables: vec![],
            cron_env: BTreeMap::new(),
            summary: Summary {
                errors: 0,
                warnings: 1,
                suppressed: 0,
                files: 1,
            },
        };
        assert_eq!(report.exit_status(), ExitStatus::Success);
        assert_eq!(report.exit_status().code(), 0);
    }
}
