//! User existence lookups.
//!
//! The checker never talks to the OS directly; it asks a `UserOracle`.
//! Lookups must not fail: anything that prevents a definite answer is
//! reported as `UserLookup::Unknown`.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup {
    Found,
    NotFound,
    /// The lookup could not be completed (timeout, unreadable database).
    Unknown,
}

pub trait UserOracle: Send + Sync {
    fn lookup(&self, name: &str) -> UserLookup;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Which oracle the CLI builds.
pub enum LookupMode {
    /// Local passwd file first, then `getent`.
    #[default]
    Chain,
    Passwd,
    Getent,
    /// Skip user lookups entirely.
    None,
}

pub const DEFAULT_PASSWD: &str = "/etc/passwd";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
/// Service accounts that commonly exist only on the hosts that run them.
pub const DEFAULT_ALLOWED_USERS: &[&str] = &["postgres", "buildbot"];

/// Answers from a passwd-format file read once at construction.
pub struct PasswdOracle {
    users: Option<BTreeSet<String>>,
}

impl PasswdOracle {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => Self {
                users: Some(parse_passwd(&s)),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read passwd file");
                Self { users: None }
            }
        }
    }

    pub fn from_contents(contents: &str) -> Self {
        Self {
            users: Some(parse_passwd(contents)),
        }
    }
}

fn parse_passwd(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split(':').next())
        .filter(|name| !name.is_empty() && !name.starts_with('+') && !name.starts_with('-'))
        .map(str::to_string)
        .collect()
}

impl UserOracle for PasswdOracle {
    fn lookup(&self, name: &str) -> UserLookup {
        match &self.users {
            Some(users) if users.contains(name) => UserLookup::Found,
            Some(_) => UserLookup::NotFound,
            None => UserLookup::Unknown,
        }
    }
}

/// Runs `getent passwd NAME`, which also consults NIS/LDAP/SSSD.
pub struct GetentOracle {
    program: PathBuf,
    timeout: Duration,
}

impl GetentOracle {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("getent", timeout)
    }

    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl UserOracle for GetentOracle {
    fn lookup(&self, name: &str) -> UserLookup {
        let child = Command::new(&self.program)
            .arg("passwd")
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(program = %self.program.display(), error = %e, "cannot run user lookup");
                return UserLookup::Unknown;
            }
        };
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return match status.code() {
                        Some(0) => UserLookup::Found,
                        // getent: key not found in database
                        Some(2) => UserLookup::NotFound,
                        _ => UserLookup::Unknown,
                    };
                }
                Ok(None) if Instant::now() >= deadline => {
                    tracing::warn!(user = name, timeout_ms = self.timeout.as_millis() as u64, "user lookup timed out");
                    let _ = child.kill();
                    let _ = child.wait();
                    return UserLookup::Unknown;
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    tracing::warn!(user = name, error = %e, "user lookup failed");
                    return UserLookup::Unknown;
                }
            }
        }
    }
}

/// Asks each oracle in turn. Found from any oracle wins; otherwise
/// Unknown if any oracle could not answer; NotFound only when every
/// oracle said so.
pub struct ChainOracle {
    oracles: Vec<Box<dyn UserOracle>>,
}

impl ChainOracle {
    pub fn new(oracles: Vec<Box<dyn UserOracle>>) -> Self {
        Self { oracles }
    }
}

impl UserOracle for ChainOracle {
    fn lookup(&self, name: &str) -> UserLookup {
        if self.oracles.is_empty() {
            return UserLookup::Unknown;
        }
        let mut answer = UserLookup::NotFound;
        for oracle in &self.oracles {
            match oracle.lookup(name) {
                UserLookup::Found => return UserLookup::Found,
                UserLookup::Unknown => answer = UserLookup::Unknown,
                UserLookup::NotFound => {}
            }
        }
        answer
    }
}

/// Names on the allow-list are always found; others go to `inner`.
pub struct AllowList {
    allowed: BTreeSet<String>,
    inner: Box<dyn UserOracle>,
}

impl AllowList {
    pub fn new(allowed: BTreeSet<String>, inner: Box<dyn UserOracle>) -> Self {
        Self { allowed, inner }
    }
}

impl UserOracle for AllowList {
    fn lookup(&self, name: &str) -> UserLookup {
        if self.allowed.contains(name) {
            UserLookup::Found
        } else {
            self.inner.lookup(name)
        }
    }
}

/// Fixed answers. Unlisted names get `default`.
pub struct StaticOracle {
    answers: BTreeMap<String, UserLookup>,
    default: UserLookup,
}

impl StaticOracle {
    pub fn new(default: UserLookup) -> Self {
        Self {
            answers: BTreeMap::new(),
            default,
        }
    }

    pub fn with(mut self, name: &str, answer: UserLookup) -> Self {
        self.answers.insert(name.to_string(), answer);
        self
    }
}

impl UserOracle for StaticOracle {
    fn lookup(&self, name: &str) -> UserLookup {
        self.answers.get(name).copied().unwrap_or(self.default)
    }
}

/// Build the oracle selected by configuration, wrapped in the allow-list.
/// `DEFAULT_ALLOWED_USERS` are always accepted.
pub fn build(
    mode: LookupMode,
    passwd: &Path,
    timeout: Duration,
    mut allowed: BTreeSet<String>,
) -> Box<dyn UserOracle> {
    allowed.extend(DEFAULT_ALLOWED_USERS.iter().map(|u| u.to_string()));
    let inner: Box<dyn UserOracle> = match mode {
        LookupMode::Chain => Box::new(ChainOracle::new(vec![
            Box::new(PasswdOracle::load(passwd)),
            Box::new(GetentOracle::new(timeout)),
        ])),
        LookupMode::Passwd => Box::new(PasswdOracle::load(passwd)),
        LookupMode::Getent => Box::new(GetentOracle::new(timeout)),
        LookupMode::None => Box::new(StaticOracle::new(UserLookup::Found)),
    };
    Box::new(AllowList::new(allowed, inner))
}
