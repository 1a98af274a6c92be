//! Configuration discovery and effective settings resolution.
//!
//! `chkcrontab.toml|yaml|yml` is looked up in the start directory and its
//! ancestors, stopping at the first directory that has one or a `.git`.
//! Defaults:
//! - `variant`: derived per file from its location
//! - `output`: `human`
//! - `pedantic`, `show_suppressed`: false
//! - `user_lookup.mode`: `chain`, `passwd`: `/etc/passwd`, `timeout_ms`: 2000
//!
//! Overrides precedence: CLI > config file > defaults. `allowed_users` and
//! `disabled` from both sources are merged.

use crate::error::ConfigError;
use crate::lint::{CheckOptions, Target};
use crate::models::{Code, CrontabVariant};
use crate::oracle::{LookupMode, DEFAULT_PASSWD, DEFAULT_TIMEOUT};
use crate::output::OutputFormat;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_NAMES: [&str; 3] = ["chkcrontab.toml", "chkcrontab.yaml", "chkcrontab.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// `[user_lookup]` section.
pub struct UserLookupCfg {
    pub mode: Option<LookupMode>,
    pub passwd: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `chkcrontab.toml|yaml`.
pub struct FileConfig {
    pub variant: Option<CrontabVariant>,
    pub output: Option<OutputFormat>,
    pub pedantic: Option<bool>,
    pub show_suppressed: Option<bool>,
    #[serde(default)]
    pub allowed_users: Vec<String>,
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub user_lookup: Option<UserLookupCfg>,
}

#[derive(Debug, Default, Clone)]
/// Settings given on the command line. `None`/empty means "not given".
pub struct Overrides {
    pub config_root: Option<PathBuf>,
    pub variant: Option<CrontabVariant>,
    pub output: Option<OutputFormat>,
    pub pedantic: Option<bool>,
    pub show_suppressed: Option<bool>,
    pub allowed_users: Vec<String>,
    pub disabled: Vec<Code>,
    pub lookup_mode: Option<LookupMode>,
    pub passwd: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    /// The config file that was read, if any.
    pub config_path: Option<PathBuf>,
    pub variant: Option<CrontabVariant>,
    pub output: OutputFormat,
    pub pedantic: bool,
    pub show_suppressed: bool,
    pub allowed_users: BTreeSet<String>,
    pub disabled: BTreeSet<Code>,
    pub patterns: Vec<String>,
    pub lookup_mode: LookupMode,
    pub passwd: PathBuf,
    pub timeout: Duration,
}

impl Effective {
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            variant: self.variant,
            pedantic: self.pedantic,
            disabled: self.disabled.clone(),
        }
    }
}

/// Walk upward from `start` to the directory holding a config file or a
/// `.git` directory. Falls back to `start`.
pub fn detect_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load the config file in `root`, if there is one.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, FileConfig)>, ConfigError> {
    for name in CONFIG_NAMES {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str(&text).map_err(|source| ConfigError::Toml {
                path: path.clone(),
                source,
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                path: path.clone(),
                source,
            })?
        };
        return Ok(Some((path, cfg)));
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI overrides, discovered config and
/// defaults.
pub fn resolve_effective(overrides: Overrides) -> Result<Effective, ConfigError> {
    let start = match overrides.config_root.clone() {
        Some(p) => p,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let root = detect_root(&start);
    let (config_path, cfg) = match load_config(&root)? {
        Some((path, cfg)) => (Some(path), cfg),
        None => (None, FileConfig::default()),
    };
    let mut disabled: BTreeSet<Code> = overrides.disabled.iter().copied().collect();
    for raw in &cfg.disabled {
        let code = raw.parse::<Code>().map_err(|e| ConfigError::UnknownCode {
            path: config_path.clone().unwrap_or_else(|| root.clone()),
            code: e.0,
        })?;
        disabled.insert(code);
    }
    let lookup = cfg.user_lookup.unwrap_or_default();
    let passwd = overrides
        .passwd
        .or_else(|| lookup.passwd.map(|p| root.join(p)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PASSWD));
    let timeout = overrides
        .timeout_ms
        .or(lookup.timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT);

    let eff = Effective {
        variant: overrides.variant.or(cfg.variant),
        output: overrides.output.or(cfg.output).unwrap_or_default(),
        pedantic: overrides.pedantic.or(cfg.pedantic).unwrap_or(false),
        show_suppressed: overrides
            .show_suppressed
            .or(cfg.show_suppressed)
            .unwrap_or(false),
        allowed_users: overrides
            .allowed_users
            .into_iter()
            .chain(cfg.allowed_users)
            .collect(),
        disabled,
        patterns: cfg.patterns,
        lookup_mode: overrides.lookup_mode.or(lookup.mode).unwrap_or_default(),
        passwd,
        timeout,
        root,
        config_path,
    };
    tracing::info!(
        root = %eff.root.display(),
        config = ?eff.config_path,
        mode = ?eff.lookup_mode,
        "resolved configuration"
    );
    Ok(eff)
}

/// Expand the configured glob patterns (relative to the root) into check
/// targets, displayed relative to `cwd`.
pub fn expand_patterns(eff: &Effective, cwd: &Path) -> Result<Vec<Target>, ConfigError> {
    let mut seen = BTreeSet::new();
    let mut targets = Vec::new();
    for pat in &eff.patterns {
        let pattern = eff.root.join(pat).to_string_lossy().to_string();
        let entries = glob::glob(&pattern).map_err(|source| ConfigError::Glob {
            pattern: pat.clone(),
            source,
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if seen.insert(path.clone()) {
                        let display = pathdiff::diff_paths(&path, cwd)
                            .unwrap_or_else(|| path.clone())
                            .to_string_lossy()
                            .to_string();
                        targets.push(Target { path, display });
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable glob match"),
            }
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(root: &Path) -> Overrides {
        Overrides {
            config_root: Some(root.to_path_buf()),
            ..Overrides::default()
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let eff = resolve_effective(at(dir.path())).unwrap();
        assert!(eff.config_path.is_none());
        assert_eq!(eff.output, OutputFormat::Human);
        assert_eq!(eff.lookup_mode, LookupMode::Chain);
        assert_eq!(eff.passwd, PathBuf::from(DEFAULT_PASSWD));
        assert_eq!(eff.timeout, DEFAULT_TIMEOUT);
        assert!(!eff.pedantic);
        assert!(eff.variant.is_none());
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("chkcrontab.toml"),
            r#"
variant = "user"
output = "json"
pedantic = true
allowed_users = ["ldapsvc"]
disabled = ["dom_dow_or"]
patterns = ["cron.d/*"]

[user_lookup]
mode = "passwd"
passwd = "fixtures/passwd"
timeout_ms = 250
"#,
        )
        .unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_root(&nested), root);

        let eff = resolve_effective(at(&nested)).unwrap();
        assert_eq!(eff.variant, Some(CrontabVariant::User));
        assert_eq!(eff.output, OutputFormat::Json);
        assert!(eff.pedantic);
        assert!(eff.allowed_users.contains("ldapsvc"));
        assert!(eff.disabled.contains(&Code::DomDowOr));
        assert_eq!(eff.lookup_mode, LookupMode::Passwd);
        assert_eq!(eff.passwd, root.join("fixtures/passwd"));
        assert_eq!(eff.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("chkcrontab.yaml"),
            "output: human\nshow_suppressed: true\nuser_lookup:\n  mode: none\n",
        )
        .unwrap();
        let eff = resolve_effective(at(dir.path())).unwrap();
        assert!(eff.show_suppressed);
        assert_eq!(eff.lookup_mode, LookupMode::None);
    }

    #[test]
    fn test_cli_wins_and_lists_merge() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("chkcrontab.toml"),
            "output = \"json\"\nallowed_users = [\"a\"]\n[user_lookup]\ntimeout_ms = 5\n",
        )
        .unwrap();
        let eff = resolve_effective(Overrides {
            output: Some(OutputFormat::Human),
            allowed_users: vec!["b".into()],
            disabled: vec![Code::VarRedefined],
            timeout_ms: Some(10),
            ..at(dir.path())
        })
        .unwrap();
        assert_eq!(eff.output, OutputFormat::Human);
        assert_eq!(eff.allowed_users.len(), 2);
        assert!(eff.disabled.contains(&Code::VarRedefined));
        assert_eq!(eff.timeout, Duration::from_millis(10));
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("chkcrontab.toml"), "pedantic = [").unwrap();
        let err = resolve_effective(at(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));

        fs::write(dir.path().join("chkcrontab.toml"), "disabled = [\"NOPE\"]").unwrap();
        let err = resolve_effective(at(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCode { ref code, .. } if code == "NOPE"));
    }

    #[test]
    fn test_expand_patterns_relative_to_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("cron.d")).unwrap();
        fs::write(root.join("cron.d/backup"), "").unwrap();
        fs::write(root.join("cron.d/rotate"), "").unwrap();
        fs::create_dir(root.join("cron.d/sub")).unwrap();
        fs::write(
            root.join("chkcrontab.toml"),
            "patterns = [\"cron.d/*\", \"cron.d/backup\"]\n",
        )
        .unwrap();
        let eff = resolve_effective(at(root)).unwrap();
        let targets = expand_patterns(&eff, root).unwrap();
        let shown: Vec<&str> = targets.iter().map(|t| t.display.as_str()).collect();
        assert_eq!(shown, vec!["cron.d/backup", "cron.d/rotate"]);
    }

    #[test]
    fn test_invalid_glob() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("chkcrontab.toml"), "patterns = [\"[\"]\n").unwrap();
        let eff = resolve_effective(at(dir.path())).unwrap();
        assert!(matches!(
            expand_patterns(&eff, dir.path()),
            Err(ConfigError::Glob { .. })
        ));
    }
}
