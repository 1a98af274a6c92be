//! Schedule validation for `@keyword` and five-field job lines.

use crate::classify::split_tokens;
use crate::field::{check_field, FieldCheck};
use crate::models::field::{Field, FieldName};
use crate::models::{Code, Finding};

/// Keywords cron accepts after `@`.
pub const AT_KEYWORDS: [&str; 8] = [
    "reboot", "yearly", "annually", "monthly", "weekly", "daily", "midnight", "hourly",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Enables the minute-is-`*` check.
    pub pedantic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule<'a> {
    At(&'a str),
    Fields([&'a str; 5]),
}

#[derive(Debug, Clone)]
pub struct ScheduleCheck<'a> {
    /// `None` when the time fields could not even be counted.
    pub schedule: Option<Schedule<'a>>,
    /// Everything after the schedule: the user column (system crontabs)
    /// and the command.
    pub rest: &'a str,
    pub findings: Vec<Finding>,
}

/// Validate the schedule part of a job line.
///
/// Lines starting with `@` are keyword jobs; anything else is split into
/// five time fields. Each field goes through the field grammar, then the
/// cross-field rules run on the parsed terms.
pub fn validate_schedule<'a>(line: &'a str, options: &ScheduleOptions) -> ScheduleCheck<'a> {
    let line = line.trim();
    if let Some(after_at) = line.strip_prefix('@') {
        let end = after_at.find(char::is_whitespace).unwrap_or(after_at.len());
        let keyword = &after_at[..end];
        let rest = after_at[end..].trim_start();
        let mut findings = Vec::new();
        if !AT_KEYWORDS.contains(&keyword) {
            findings.push(Finding::new(
                Code::InvalidAt,
                format!(
                    "unknown @ keyword \"@{keyword}\" (expected one of @{})",
                    AT_KEYWORDS.join(", @")
                ),
            ));
        }
        return ScheduleCheck {
            schedule: Some(Schedule::At(keyword)),
            rest,
            findings,
        };
    }

    let (tokens, rest) = split_tokens(line, 5);
    let Ok(fields) = <[&str; 5]>::try_from(tokens.as_slice()) else {
        return ScheduleCheck {
            schedule: None,
            rest,
            findings: vec![Finding::new(
                Code::FieldCount,
                format!("expected 5 time fields, found {}", tokens.len()),
            )],
        };
    };

    let checks: Vec<FieldCheck<'_>> = FieldName::ALL
        .iter()
        .zip(fields.iter())
        .map(|(name, text)| check_field(&Field::new(*name, *text)))
        .collect();
    let mut findings: Vec<Finding> = checks.iter().flat_map(|c| c.findings.clone()).collect();
    cross_field_rules(&fields, &checks, options, &mut findings);

    ScheduleCheck {
        schedule: Some(Schedule::Fields(fields)),
        rest,
        findings,
    }
}

fn cross_field_rules(
    fields: &[&str; 5],
    checks: &[FieldCheck<'_>],
    options: &ScheduleOptions,
    out: &mut Vec<Finding>,
) {
    let (minute, hour, dom, dow) = (&checks[0], &checks[1], &checks[2], &checks[4]);

    for idx in [3, 4] {
        let c = &checks[idx];
        let sequence = c.terms.len() > 1 || c.terms.iter().any(|t| t.is_range());
        if c.is_clean() && sequence && c.terms.iter().any(|t| t.uses_names()) {
            out.push(Finding::new(
                Code::NamedSequence,
                format!(
                    "names used in a range or list in field \"{}\" (\"{}\"); prefer explicit numeric sequences for portability",
                    FieldName::ALL[idx],
                    fields[idx]
                ),
            ));
        }
    }

    if dom.parsed && dow.parsed && !dom.is_unrestricted() && !dow.is_unrestricted() {
        out.push(Finding::new(
            Code::DomDowOr,
            format!(
                "day of month (\"{}\") and day of week (\"{}\") are both restricted; cron runs the job when either matches, not only when both match",
                fields[2], fields[4]
            ),
        ));
    }

    if options.pedantic && minute.is_unrestricted() && hour.parsed && !hour.is_unrestricted() {
        out.push(Finding::new(
            Code::HoursNotMinutes,
            "minute is \"*\" while hour is restricted; cron will run this every minute of the hours set",
        ));
    }
}
