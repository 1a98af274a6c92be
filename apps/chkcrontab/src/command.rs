//! Checks on the part of a job line after the schedule.

use crate::classify::split_tokens;
use crate::models::{Code, CrontabVariant, Finding};
use crate::oracle::{UserLookup, UserOracle};
use regex::Regex;
use std::sync::LazyLock;

/// Characters that can never appear in a user name.
static BAD_USER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"[\s!"#$%&'()*+,/:;<=>?@\[\\\]^`{|}~]"##).expect("valid regex"));

const MAX_USER_LEN: usize = 31;

/// Validate the text after the schedule.
///
/// For system crontabs the first token is the user column and is checked
/// with `lookup` before the command itself is scanned.
pub fn validate_command(
    text: &str,
    variant: CrontabVariant,
    lookup: &mut dyn FnMut(&str) -> UserLookup,
) -> Vec<Finding> {
    let mut out = Vec::new();
    let command = match variant {
        CrontabVariant::System => {
            let (tokens, command) = split_tokens(text, 1);
            let Some(user) = tokens.first() else {
                out.push(Finding::new(Code::LineError, "missing user and command"));
                return out;
            };
            out.extend(check_user(user, lookup));
            command
        }
        CrontabVariant::User => text.trim(),
    };
    if command.is_empty() {
        out.push(Finding::new(Code::LineError, "missing command"));
        return out;
    }
    if has_bare_percent(command) {
        out.push(Finding::new(
            Code::BarePercent,
            "bare % has special meaning to cron (newline), must be escaped as \\%",
        ));
    }
    out
}

/// Convenience wrapper for callers holding a `UserOracle`.
pub fn validate_command_with(
    text: &str,
    variant: CrontabVariant,
    oracle: &dyn UserOracle,
) -> Vec<Finding> {
    validate_command(text, variant, &mut |name| oracle.lookup(name))
}

fn has_bare_percent(command: &str) -> bool {
    let mut prev = None;
    for c in command.chars() {
        if c == '%' && prev != Some('\\') {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Syntax problems with a user name, if any.
pub fn user_syntax_error(user: &str) -> Option<String> {
    if user.chars().count() > MAX_USER_LEN {
        Some(format!("user name too long \"{user}\" (at most {MAX_USER_LEN} characters)"))
    } else if user.starts_with('-') || BAD_USER_CHARS.is_match(user) {
        Some(format!("invalid user name \"{user}\""))
    } else {
        None
    }
}

fn check_user(user: &str, lookup: &mut dyn FnMut(&str) -> UserLookup) -> Option<Finding> {
    if let Some(msg) = user_syntax_error(user) {
        return Some(Finding::new(Code::InvalidUser, msg));
    }
    match lookup(user) {
        UserLookup::Found => None,
        UserLookup::NotFound => Some(Finding::new(
            Code::UserNotFound,
            format!("user \"{user}\" not found"),
        )),
        UserLookup::Unknown => Some(Finding::new(
            Code::UserLookupFailed,
            format!("could not determine whether user \"{user}\" exists"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::StaticOracle;

    fn codes(text: &str, variant: CrontabVariant, oracle: &StaticOracle) -> Vec<Code> {
        validate_command_with(text, variant, oracle)
            .into_iter()
            .map(|f| f.code)
            .collect()
    }

    fn everyone() -> StaticOracle {
        StaticOracle::new(UserLookup::Found)
    }

    #[test]
    fn test_clean_system_command() {
        assert!(codes("root /bin/true", CrontabVariant::System, &everyone()).is_empty());
    }

    #[test]
    fn test_bare_percent() {
        let o = everyone();
        assert_eq!(
            codes("echo hi % there", CrontabVariant::User, &o),
            vec![Code::BarePercent]
        );
        assert_eq!(codes("%start", CrontabVariant::User, &o), vec![Code::BarePercent]);
        assert!(codes("date +\\%Y", CrontabVariant::User, &o).is_empty());
        assert_eq!(
            codes("root date +%Y", CrontabVariant::System, &o),
            vec![Code::BarePercent]
        );
    }

    #[test]
    fn test_user_column_only_for_system() {
        let nobody = StaticOracle::new(UserLookup::NotFound);
        assert_eq!(
            codes("echo hi", CrontabVariant::System, &nobody),
            vec![Code::UserNotFound]
        );
        assert!(codes("echo hi", CrontabVariant::User, &nobody).is_empty());
    }

    #[test]
    fn test_oracle_unknown_degrades_to_warning() {
        let flaky = StaticOracle::new(UserLookup::Unknown);
        let f = validate_command_with("alice /bin/true", CrontabVariant::System, &flaky);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].code, Code::UserLookupFailed);
        assert_eq!(f[0].severity(), crate::models::Severity::Warning);
    }

    #[test]
    fn test_user_syntax() {
        let o = everyone();
        assert_eq!(codes("-root x", CrontabVariant::System, &o), vec![Code::InvalidUser]);
        assert_eq!(codes("ro:ot x", CrontabVariant::System, &o), vec![Code::InvalidUser]);
        let long = "a".repeat(32);
        assert_eq!(
            codes(&format!("{long} x"), CrontabVariant::System, &o),
            vec![Code::InvalidUser]
        );
        assert!(user_syntax_error("www-data").is_none());
        assert!(user_syntax_error("svc.backup").is_none());
    }

    #[test]
    fn test_missing_parts() {
        let o = everyone();
        assert_eq!(codes("", CrontabVariant::System, &o), vec![Code::LineError]);
        assert_eq!(codes("root", CrontabVariant::System, &o), vec![Code::LineError]);
        assert_eq!(codes("   ", CrontabVariant::User, &o), vec![Code::LineError]);
    }
}
