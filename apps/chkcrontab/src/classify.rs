//! Line classification.
//!
//! Every trimmed line maps to exactly one `LineKind`. Rules apply in order:
//! blank, comment, `NAME=value`, `@keyword ...`, five time fields plus
//! content, and finally malformed.

use crate::models::Code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    Disable,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// `# chkcrontab: disable-msg=CODE` or `# chkcrontab: enable-msg=CODE`.
pub struct Marker {
    pub action: MarkerAction,
    pub code: Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Comment { marker: Option<Marker> },
    Assignment { name: &'a str, value: &'a str },
    AtJob,
    NumericJob,
    Malformed,
}

impl LineKind<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            LineKind::Blank => "blank",
            LineKind::Comment { .. } => "comment",
            LineKind::Assignment { .. } => "assignment",
            LineKind::AtJob => "at-job",
            LineKind::NumericJob => "numeric-job",
            LineKind::Malformed => "malformed",
        }
    }
}

/// Classify one physical line. Surrounding whitespace is ignored.
pub fn classify(raw: &str) -> LineKind<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with('#') {
        return LineKind::Comment {
            marker: parse_marker(line),
        };
    }
    if let Some((name, value)) = split_assignment(line) {
        return LineKind::Assignment { name, value };
    }
    if line.starts_with('@') {
        return LineKind::AtJob;
    }
    if looks_like_time_fields(line) {
        return LineKind::NumericJob;
    }
    LineKind::Malformed
}

/// `[A-Za-z_][A-Za-z0-9_]*` then optional blanks then `=`.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    if !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return None;
    }
    let name_end = bytes
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))?;
    let rest = line[name_end..].trim_start_matches([' ', '\t']);
    let value = rest.strip_prefix('=')?;
    Some((&line[..name_end], value))
}

/// Five whitespace separated fields followed by more content, the first
/// field starting like a minute value.
fn looks_like_time_fields(line: &str) -> bool {
    let starts_like_minute = line
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '*');
    starts_like_minute && line.split_whitespace().nth(5).is_some()
}

fn parse_marker(line: &str) -> Option<Marker> {
    let body = line.trim_start_matches('#').trim_start();
    let body = body.strip_prefix("chkcrontab:")?.trim();
    let (command, code) = body.split_once('=')?;
    let action = match command.trim() {
        "disable-msg" => MarkerAction::Disable,
        "enable-msg" => MarkerAction::Enable,
        other => {
            tracing::debug!(command = other, "ignoring unknown chkcrontab marker command");
            return None;
        }
    };
    match code.trim().parse::<Code>() {
        Ok(code) => Some(Marker { action, code }),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring chkcrontab marker");
            None
        }
    }
}

/// Split off `n` whitespace separated tokens, returning them and the rest
/// of the line with leading whitespace removed.
pub(crate) fn split_tokens(line: &str, n: usize) -> (Vec<&str>, &str) {
    let mut tokens = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    while tokens.len() < n && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (tokens, rest)
}
