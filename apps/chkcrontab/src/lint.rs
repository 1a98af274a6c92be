//! File-level orchestration.
//!
//! A `FileChecker` owns the state of one file: it classifies each physical
//! line, routes it to the schedule, command or assignment checks, applies
//! one-shot suppression markers and keeps the counts that decide the exit
//! status. `Checker` runs independent `FileChecker`s over many files.

use crate::assignment::{validate_assignment, SpecialVar};
use crate::classify::{classify, LineKind, Marker, MarkerAction};
use crate::command::validate_command;
use crate::error::CheckError;
use crate::filename;
use crate::models::{
    Code, CrontabVariant, Diagnostic, ExitStatus, FileReport, Finding, Severity, Summary,
};
use crate::oracle::{UserLookup, UserOracle};
use crate::schedule::{validate_schedule, ScheduleOptions};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
/// Settings shared by every file of a run.
pub struct CheckOptions {
    /// Overrides the variant derived from the file's location.
    pub variant: Option<CrontabVariant>,
    pub pedantic: bool,
    /// Codes suppressed on every line.
    pub disabled: BTreeSet<Code>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a `FileChecker` is in its life cycle.
pub enum Phase {
    /// No line fed yet.
    Start,
    Processing,
    /// `finish` was called; further lines are ignored.
    Done,
}

#[derive(Debug)]
/// Mutable state of one file run.
pub struct FileState {
    pub path: String,
    pub variant: CrontabVariant,
    pub line_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub suppressed_count: usize,
    pub known_vars: BTreeSet<String>,
    /// Codes silenced for the next non-comment line only.
    pub pending_suppression: BTreeSet<Code>,
    variables: Vec<String>,
    cron_env: BTreeMap<String, String>,
    users: BTreeMap<String, UserLookup>,
    diagnostics: Vec<Diagnostic>,
}

impl FileState {
    fn new(path: String, variant: CrontabVariant) -> Self {
        Self {
            path,
            variant,
            line_count: 0,
            warning_count: 0,
            error_count: 0,
            suppressed_count: 0,
            known_vars: BTreeSet::new(),
            pending_suppression: BTreeSet::new(),
            variables: Vec::new(),
            cron_env: BTreeMap::new(),
            users: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Checks the lines of a single file, one at a time, in order.
pub struct FileChecker<'a> {
    options: &'a CheckOptions,
    oracle: &'a dyn UserOracle,
    state: FileState,
    phase: Phase,
}

impl<'a> FileChecker<'a> {
    pub fn new(
        path: impl Into<String>,
        variant: CrontabVariant,
        options: &'a CheckOptions,
        oracle: &'a dyn UserOracle,
    ) -> Self {
        Self {
            options,
            oracle,
            state: FileState::new(path.into(), variant),
            phase: Phase::Start,
        }
    }

    pub fn state(&self) -> &FileState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Process the next physical line.
    pub fn feed(&mut self, raw: &str) {
        match self.phase {
            Phase::Start => {
                tracing::debug!(path = %self.state.path, variant = %self.state.variant, "processing");
                self.phase = Phase::Processing;
            }
            Phase::Processing => {}
            Phase::Done => {
                tracing::warn!(path = %self.state.path, "line fed after the file was finished; ignored");
                return;
            }
        }
        self.state.line_count += 1;
        let line_no = self.state.line_count;
        let kind = classify(raw);
        tracing::debug!(line = line_no, kind = kind.label(), "classified line");

        let findings = match kind {
            LineKind::Comment { marker } => {
                if let Some(marker) = marker {
                    self.apply_marker(marker);
                }
                return;
            }
            LineKind::Blank => Vec::new(),
            LineKind::Assignment { name, value } => self.check_assignment(name, value),
            LineKind::AtJob | LineKind::NumericJob => self.check_job(raw),
            LineKind::Malformed => vec![Finding::new(Code::LineError, "failed to parse line")],
        };
        for finding in findings {
            self.record(line_no, finding);
        }
        self.state.pending_suppression.clear();
    }

    /// End the file and produce its report. The checker stays in `Done`;
    /// calling this again returns the same report.
    pub fn finish(&mut self) -> FileReport {
        let state = &self.state;
        if self.phase != Phase::Done {
            tracing::info!(
                path = %state.path,
                lines = state.line_count,
                errors = state.error_count,
                warnings = state.warning_count,
                suppressed = state.suppressed_count,
                "checked file"
            );
            self.phase = Phase::Done;
        }
        FileReport {
            path: state.path.clone(),
            variant: state.variant,
            lines: state.line_count,
            diagnostics: state.diagnostics.clone(),
            variables: state.variables.clone(),
            cron_env: state.cron_env.clone(),
            summary: Summary {
                errors: state.error_count,
                warnings: state.warning_count,
                suppressed: state.suppressed_count,
                files: 1,
            },
        }
    }

    fn apply_marker(&mut self, marker: Marker) {
        match marker.action {
            MarkerAction::Disable => {
                self.state.pending_suppression.insert(marker.code);
            }
            MarkerAction::Enable => {
                self.state.pending_suppression.remove(&marker.code);
            }
        }
    }

    fn check_assignment(&mut self, name: &str, value: &str) -> Vec<Finding> {
        let findings = validate_assignment(name, value, &self.state.known_vars);
        if let Some(special) = SpecialVar::from_name(name) {
            let value = value.trim();
            tracing::debug!(var = special.name(), value, "cron variable assigned");
            self.state
                .cron_env
                .insert(special.name().to_string(), value.to_string());
        }
        if self.state.known_vars.insert(name.to_string()) {
            self.state.variables.push(name.to_string());
        }
        findings
    }

    fn check_job(&mut self, raw: &str) -> Vec<Finding> {
        let check = validate_schedule(
            raw,
            &ScheduleOptions {
                pedantic: self.options.pedantic,
            },
        );
        let mut findings = check.findings;
        if check.schedule.is_some() {
            let variant = self.state.variant;
            let oracle = self.oracle;
            let users = &mut self.state.users;
            let mut lookup = |name: &str| {
                *users
                    .entry(name.to_string())
                    .or_insert_with(|| oracle.lookup(name))
            };
            findings.extend(validate_command(check.rest, variant, &mut lookup));
        }
        findings
    }

    fn record(&mut self, line: usize, finding: Finding) {
        let suppressed = self.state.pending_suppression.contains(&finding.code)
            || self.options.disabled.contains(&finding.code);
        if suppressed {
            self.state.suppressed_count += 1;
        } else {
            match finding.severity() {
                Severity::Warning => self.state.warning_count += 1,
                Severity::Error => self.state.error_count += 1,
            }
        }
        self.state.diagnostics.push(finding.at(line, suppressed));
    }
}

#[derive(Debug, Clone)]
/// A file to check and the name it is reported under.
pub struct Target {
    pub path: PathBuf,
    pub display: String,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.to_string_lossy().to_string();
        Self { path, display }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Checked(FileReport),
    Failed { path: String, error: String },
}

#[derive(Debug, Serialize)]
/// Results of a run over one or more files, in input order.
pub struct RunReport {
    pub files: Vec<FileOutcome>,
    pub summary: Summary,
}

impl RunReport {
    pub fn exit_status(&self) -> ExitStatus {
        if self.summary.errors > 0 {
            ExitStatus::Error
        } else {
            ExitStatus::Success
        }
    }
}

/// Runs file checks with shared options and user oracle.
pub struct Checker<'a> {
    options: CheckOptions,
    oracle: &'a dyn UserOracle,
}

impl<'a> Checker<'a> {
    pub fn new(options: CheckOptions, oracle: &'a dyn UserOracle) -> Self {
        Self { options, oracle }
    }

    /// Check crontab text that is already in memory.
    pub fn check_text(&self, display: &str, variant: CrontabVariant, text: &str) -> FileReport {
        let mut fc = FileChecker::new(display, variant, &self.options, self.oracle);
        for line in text.lines() {
            fc.feed(line);
        }
        fc.finish()
    }

    /// Check a file on disk. Name and read problems abort before any line
    /// is looked at.
    pub fn check_path(&self, path: &Path, shown: &str) -> Result<FileReport, CheckError> {
        let _span = tracing::info_span!("check_file", path = shown).entered();
        let (acceptable, variant) = filename::inspect(path, self.options.variant);
        if !acceptable {
            return Err(CheckError::UnacceptableName {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path).map_err(|source| CheckError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| CheckError::NotUtf8 {
            path: path.to_path_buf(),
        })?;
        Ok(self.check_text(shown, variant, &text))
    }

    /// Check every target. Files are independent and run in parallel;
    /// results keep the input order.
    pub fn run(&self, targets: &[Target]) -> RunReport {
        let files: Vec<FileOutcome> = targets
            .par_iter()
            .map(|t| match self.check_path(&t.path, &t.display) {
                Ok(report) => FileOutcome::Checked(report),
                Err(e) => {
                    tracing::error!(path = %t.display, error = %e, "cannot check file");
                    FileOutcome::Failed {
                        path: t.display.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect();
        let mut summary = Summary::default();
        for outcome in &files {
            match outcome {
                FileOutcome::Checked(report) => summary.absorb(&report.summary),
                FileOutcome::Failed { .. } => {
                    summary.errors += 1;
                    summary.files += 1;
                }
            }
        }
        RunReport { files, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::StaticOracle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn everyone() -> StaticOracle {
        StaticOracle::new(UserLookup::Found)
    }

    fn check(text: &str, variant: CrontabVariant) -> FileReport {
        let oracle = everyone();
        Checker::new(CheckOptions::default(), &oracle).check_text("t", variant, text)
    }

    fn visible_codes(report: &FileReport) -> Vec<(usize, Code)> {
        report.visible().map(|d| (d.line, d.code)).collect()
    }

    #[test]
    fn test_clean_system_crontab() {
        let text = "\
SHELL=/bin/sh
PATH=/usr/bin:/bin
MAILTO=root

# m h dom mon dow user command
17 *  * * * root cd / && run-parts --report /etc/cron.hourly
0 0 1,15 * * root /bin/true
@reboot root /usr/local/bin/start
";
        let r = check(text, CrontabVariant::System);
        assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
        assert_eq!(r.lines, 8);
        assert_eq!(r.variables, vec!["SHELL", "PATH", "MAILTO"]);
        assert_eq!(r.exit_status(), ExitStatus::Success);
    }

    #[test]
    fn test_cron_variables_keep_their_last_value() {
        let text = "MAILTO=root\nFOO=bar\nPATH=/usr/bin:/bin\nMAILTO= ops@example.com \n";
        let r = check(text, CrontabVariant::System);
        assert_eq!(r.variables, vec!["MAILTO", "FOO", "PATH"]);
        assert_eq!(
            r.cron_env,
            BTreeMap::from([
                ("MAILTO".to_string(), "ops@example.com".to_string()),
                ("PATH".to_string(), "/usr/bin:/bin".to_string()),
            ])
        );
    }

    #[test]
    fn test_finished_checker_ignores_further_lines() {
        let oracle = everyone();
        let options = CheckOptions::default();
        let mut fc = FileChecker::new("t", CrontabVariant::System, &options, &oracle);
        assert_eq!(fc.phase(), Phase::Start);
        fc.feed("nope");
        assert_eq!(fc.phase(), Phase::Processing);
        let first = fc.finish();
        assert_eq!(fc.phase(), Phase::Done);
        assert_eq!(first.summary.errors, 1);

        fc.feed("still nope");
        assert_eq!(fc.state().line_count, 1);
        let second = fc.finish();
        assert_eq!(second.lines, 1);
        assert_eq!(second.diagnostics.len(), first.diagnostics.len());
        assert_eq!(second.summary.errors, 1);
    }

    #[test]
    fn test_errors_are_located_and_counted() {
        let text = "\
MAILTO=$ADMIN
* 24 * * * root x
garbage here
@quarterly root x
";
        let r = check(text, CrontabVariant::System);
        assert_eq!(
            visible_codes(&r),
            vec![
                (1, Code::ShellVar),
                (2, Code::FieldValueError),
                (3, Code::LineError),
                (4, Code::InvalidAt),
            ]
        );
        assert_eq!(r.summary.errors, 4);
        assert_eq!(r.exit_status(), ExitStatus::Error);
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let r = check("0 0 13 * 5 root x\nA=1\nA=2\n", CrontabVariant::System);
        assert_eq!(r.summary.warnings, 2);
        assert_eq!(r.summary.errors, 0);
        assert_eq!(r.exit_status(), ExitStatus::Success);
    }

    #[test]
    fn test_user_variant_has_no_user_column() {
        let r = check("* * * * * echo hi % there\n", CrontabVariant::User);
        assert_eq!(visible_codes(&r), vec![(1, Code::BarePercent)]);
        assert_eq!(r.summary.errors, 1);
    }

    #[test]
    fn test_marker_suppresses_next_line_only() {
        let text = "\
# chkcrontab: disable-msg=LINE_ERROR
this is not a cron line
this is not one either
";
        let r = check(text, CrontabVariant::System);
        assert_eq!(visible_codes(&r), vec![(3, Code::LineError)]);
        assert_eq!(r.diagnostics.len(), 2);
        assert!(r.diagnostics[0].suppressed);
        assert_eq!(r.diagnostics[0].line, 2);
        assert_eq!(r.summary.errors, 1);
        assert_eq!(r.summary.suppressed, 1);
    }

    #[test]
    fn test_marker_survives_comments_but_not_blank_lines() {
        let r = check(
            "# chkcrontab: disable-msg=LINE_ERROR\n# another comment\nnope\n",
            CrontabVariant::System,
        );
        assert_eq!(r.summary.errors, 0);
        let r = check(
            "# chkcrontab: disable-msg=LINE_ERROR\n\nnope\n",
            CrontabVariant::System,
        );
        assert_eq!(r.summary.errors, 1);
    }

    #[test]
    fn test_marker_only_silences_its_code() {
        let r = check(
            "# chkcrontab: disable-msg=BARE_PERCENT\n* 25 * * * root date +%s\n",
            CrontabVariant::System,
        );
        assert_eq!(visible_codes(&r), vec![(2, Code::FieldValueError)]);
    }

    #[test]
    fn test_enable_marker_cancels_pending_disable() {
        let r = check(
            "# chkcrontab: disable-msg=LINE_ERROR\n# chkcrontab: enable-msg=LINE_ERROR\nnope\n",
            CrontabVariant::System,
        );
        assert_eq!(r.summary.errors, 1);
    }

    #[test]
    fn test_unknown_marker_is_ignored() {
        let r = check(
            "# chkcrontab: disable-msg=WHATEVER\n0 0 * * * root x\n",
            CrontabVariant::System,
        );
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_config_disabled_codes_apply_everywhere() {
        let oracle = everyone();
        let options = CheckOptions {
            disabled: BTreeSet::from([Code::DomDowOr]),
            ..CheckOptions::default()
        };
        let r = Checker::new(options, &oracle).check_text(
            "t",
            CrontabVariant::System,
            "0 0 1 * 1 root x\n0 0 2 * 2 root x\n",
        );
        assert_eq!(r.summary.warnings, 0);
        assert_eq!(r.summary.suppressed, 2);
    }

    struct CountingOracle(AtomicUsize);

    impl UserOracle for CountingOracle {
        fn lookup(&self, name: &str) -> UserLookup {
            self.0.fetch_add(1, Ordering::SeqCst);
            if name == "root" {
                UserLookup::Found
            } else {
                UserLookup::Unknown
            }
        }
    }

    #[test]
    fn test_user_lookups_are_memoized_per_file() {
        let oracle = CountingOracle(AtomicUsize::new(0));
        let checker = Checker::new(CheckOptions::default(), &oracle);
        let r = checker.check_text(
            "t",
            CrontabVariant::System,
            "0 * * * * root a\n1 * * * * root b\n2 * * * * ldapuser c\n3 * * * * ldapuser d\n",
        );
        assert_eq!(oracle.0.load(Ordering::SeqCst), 2);
        assert_eq!(
            visible_codes(&r),
            vec![(3, Code::UserLookupFailed), (4, Code::UserLookupFailed)]
        );
        assert_eq!(r.exit_status(), ExitStatus::Success);
    }

    #[test]
    fn test_diagnostics_stay_within_line_count() {
        let r = check("x\n\n* * * *\n@nope\n", CrontabVariant::System);
        assert!(r.diagnostics.iter().all(|d| d.line >= 1 && d.line <= r.lines));
    }

    #[test]
    fn test_run_over_files_keeps_order_and_reports_structural_errors() {
        let tmp = tempdir().unwrap();
        let good = tmp.path().join("good");
        let bad = tmp.path().join("bad");
        let dotted = tmp.path().join("job.sh");
        fs::write(&good, "0 0 * * * root /bin/true\n").unwrap();
        fs::write(&bad, "0 0 * * * root echo %\n").unwrap();
        fs::write(&dotted, "0 0 * * * root /bin/true\n").unwrap();
        let missing = tmp.path().join("missing");

        let oracle = everyone();
        let options = CheckOptions {
            variant: Some(CrontabVariant::System),
            ..CheckOptions::default()
        };
        let checker = Checker::new(options, &oracle);
        let run = checker.run(&[
            Target::new(&good),
            Target::new(&bad),
            Target::new(&dotted),
            Target::new(&missing),
        ]);
        assert_eq!(run.files.len(), 4);
        assert!(matches!(&run.files[0], FileOutcome::Checked(r) if !r.has_errors()));
        assert!(matches!(&run.files[1], FileOutcome::Checked(r) if r.has_errors()));
        assert!(matches!(&run.files[2], FileOutcome::Failed { error, .. } if error.contains("name must match")));
        assert!(matches!(&run.files[3], FileOutcome::Failed { error, .. } if error.contains("cannot read")));
        assert_eq!(run.summary.errors, 3);
        assert_eq!(run.summary.files, 4);
        assert_eq!(run.exit_status(), ExitStatus::Error);
    }
}
