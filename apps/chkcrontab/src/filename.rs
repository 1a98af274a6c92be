//! Which files cron will read, and which crontab format they use.

use crate::models::CrontabVariant;
use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

static PLAIN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Names cron skips but that are conventional inputs to other tooling.
static ACCEPTED_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\.in$", r"\.cron$", r"\.disabled$", r"^(\S+\.)?cron\.d$"]
        .into_iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});

/// Decide whether `path` is an acceptable cron file and which variant it is.
pub fn inspect(path: &Path, forced: Option<CrontabVariant>) -> (bool, CrontabVariant) {
    let variant = forced.unwrap_or_else(|| variant_for(path));
    let acceptable = match variant {
        // spool files are named after their owner and installed by crontab(1)
        CrontabVariant::User => true,
        CrontabVariant::System => is_acceptable_name(path),
    };
    (acceptable, variant)
}

/// Files below a `var/spool/cron` directory are per-user crontabs.
pub fn variant_for(path: &Path) -> CrontabVariant {
    let components: Vec<Component<'_>> = path.components().collect();
    let in_spool = components.windows(3).any(|w| {
        matches!(w, [Component::Normal(a), Component::Normal(b), Component::Normal(c)]
            if *a == "var" && *b == "spool" && *c == "cron")
    });
    if in_spool {
        CrontabVariant::User
    } else {
        CrontabVariant::System
    }
}

/// `/etc/crontab` and names made of `[A-Za-z0-9_-]`, plus the accepted
/// suffix patterns.
pub fn is_acceptable_name(path: &Path) -> bool {
    if path == Path::new("/etc/crontab") {
        return true;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    PLAIN_NAME.is_match(name) || ACCEPTED_SUFFIXES.iter().any(|re| re.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_are_accepted() {
        assert!(is_acceptable_name(Path::new("/etc/cron.d/backup_daily-1")));
        assert!(is_acceptable_name(Path::new("/etc/crontab")));
        assert!(is_acceptable_name(Path::new("crontab")));
    }

    #[test]
    fn test_dotted_names_are_rejected_unless_whitelisted() {
        assert!(!is_acceptable_name(Path::new("/etc/cron.d/backup.sh")));
        assert!(!is_acceptable_name(Path::new("/etc/cron.d/backup~")));
        assert!(is_acceptable_name(Path::new("/etc/cron.d/backup.in")));
        assert!(is_acceptable_name(Path::new("/etc/cron.d/backup.cron")));
        assert!(is_acceptable_name(Path::new("/etc/cron.d/backup.disabled")));
        assert!(is_acceptable_name(Path::new("pkg/foo.cron.d")));
        assert!(is_acceptable_name(Path::new("pkg/cron.d")));
    }

    #[test]
    fn test_variant_from_location() {
        assert_eq!(variant_for(Path::new("/etc/cron.d/x")), CrontabVariant::System);
        assert_eq!(
            variant_for(Path::new("/var/spool/cron/crontabs/alice")),
            CrontabVariant::User
        );
        assert_eq!(
            variant_for(Path::new("chroot/var/spool/cron/alice")),
            CrontabVariant::User
        );
    }

    #[test]
    fn test_inspect_respects_forced_variant() {
        let (ok, v) = inspect(Path::new("/tmp/my.tab"), Some(CrontabVariant::User));
        assert!(ok);
        assert_eq!(v, CrontabVariant::User);
        let (ok, v) = inspect(Path::new("/tmp/my.tab"), None);
        assert!(!ok);
        assert_eq!(v, CrontabVariant::System);
    }
}
