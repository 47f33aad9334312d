//! Batch auto-resolve over a set of pending file merges.
//!
//! Each [`PendingMerge`] is one file with a base, a local ("ours") and an
//! incoming ("theirs") version. [`AutoResolver::run`] resolves every file
//! whose conflicts the configured options can all handle, writes the merged
//! text next to the versions, and reports what is left for a human.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use trimerge_core::{FileHeader, MergeData, MergeOutcome, ResolveOptions};

/// Suffixes of the three version files next to a conflicted path.
pub const BASE_SUFFIX: &str = "base";
pub const OURS_SUFFIX: &str = "ours";
pub const THEIRS_SUFFIX: &str = "theirs";

// ---------------------------------------------------------------------------
// AutoResolveMode
// ---------------------------------------------------------------------------

/// Whether conflicts are resolved automatically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AutoResolveMode {
    /// Resolve without asking.
    Always,
    /// Leave every conflict for manual resolution.
    Never,
    /// Ask before resolving.
    #[default]
    Ask,
}

impl AutoResolveMode {
    /// Interpret a stored setting. A missing value or `"ask"` means
    /// [`Self::Ask`], `"always"` means [`Self::Always`] and anything else
    /// means [`Self::Never`].
    #[must_use]
    pub fn from_str_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => Self::Ask,
            Some(v) if v.eq_ignore_ascii_case("ask") => Self::Ask,
            Some(v) if v.eq_ignore_ascii_case("always") => Self::Always,
            Some(_) => Self::Never,
        }
    }

    /// Interpret a yes/no answer. No answer means [`Self::Ask`].
    #[must_use]
    pub const fn from_bool(value: Option<bool>) -> Self {
        match value {
            None => Self::Ask,
            Some(true) => Self::Always,
            Some(false) => Self::Never,
        }
    }

    /// Whether to run the auto-resolve; `ask` is only consulted in
    /// [`Self::Ask`] mode.
    pub fn should_run(self, ask: impl FnOnce() -> bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Ask => ask(),
        }
    }
}

impl From<String> for AutoResolveMode {
    fn from(value: String) -> Self {
        Self::from_str_value(Some(&value))
    }
}

impl From<AutoResolveMode> for String {
    fn from(value: AutoResolveMode) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AutoResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

// ---------------------------------------------------------------------------
// Skip heuristic
// ---------------------------------------------------------------------------

/// Default number of changed lines above which a large file is skipped.
pub const DEFAULT_MAX_CHANGED_LINES: usize = 50;

/// Default text length above which a file counts as large.
pub const DEFAULT_MAX_CHARS: usize = 80_000;

/// Limits for [`should_skip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipLimits {
    /// Changed-line limit for large files; 0 skips every large file.
    pub max_changed_lines: usize,
    /// Text length above which a file counts as large.
    pub max_chars: usize,
}

impl Default for SkipLimits {
    fn default() -> Self {
        Self {
            max_changed_lines: DEFAULT_MAX_CHANGED_LINES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Whether `merge` is too large to auto-resolve.
///
/// Only files where one of the three texts exceeds `max_chars` are
/// candidates; of those, the ones changing more than `max_changed_lines`
/// lines in total are skipped.
#[must_use]
pub fn should_skip(merge: &MergeData, limits: &SkipLimits) -> bool {
    if merge.max_text_chars() <= limits.max_chars {
        return false;
    }
    limits.max_changed_lines == 0 || merge.changed_line_count() > limits.max_changed_lines
}

// ---------------------------------------------------------------------------
// PendingMerge
// ---------------------------------------------------------------------------

/// One conflicted file waiting for resolution.
#[derive(Clone, Debug)]
pub struct PendingMerge {
    /// Path relative to the resolver root.
    pub path: PathBuf,
    pub data: MergeData,
}

impl PendingMerge {
    /// Read `<root>/<path>.base`, `.ours` and `.theirs`.
    ///
    /// A missing `.base` is treated as an empty base.
    ///
    /// # Errors
    /// Returns the I/O error of the first version that cannot be read.
    pub fn load(root: &Path, path: &Path) -> io::Result<Self> {
        let base = match fs::read_to_string(version_path(root, path, BASE_SUFFIX)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let ours = fs::read_to_string(version_path(root, path, OURS_SUFFIX))?;
        let theirs = fs::read_to_string(version_path(root, path, THEIRS_SUFFIX))?;
        Ok(Self {
            path: path.to_owned(),
            data: MergeData::new(FileHeader::new(path), &base, &ours, &theirs),
        })
    }
}

/// `<root>/<path>.<suffix>`
#[must_use]
pub fn version_path(root: &Path, path: &Path, suffix: &str) -> PathBuf {
    let mut name = root.join(path).into_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// AutoResolver
// ---------------------------------------------------------------------------

/// Outcome of one [`AutoResolver::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AutoResolveReport {
    /// Number of files handed to the run.
    pub total: usize,
    /// Files resolved and written.
    pub resolved: Vec<PathBuf>,
    /// Files still needing manual resolution, including skipped ones.
    pub remaining: Vec<PathBuf>,
    /// Files skipped as too large.
    pub skipped: Vec<PathBuf>,
}

impl AutoResolveReport {
    /// "Auto-resolve managed to resolve N of M conflicts"
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Auto-resolve managed to resolve {} of {} conflicts",
            self.resolved.len(),
            self.total
        )
    }
}

/// Resolves pending merges and writes results under `root`.
#[derive(Debug)]
pub struct AutoResolver {
    root: PathBuf,
    options: ResolveOptions,
    limits: SkipLimits,
}

impl AutoResolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, options: ResolveOptions, limits: SkipLimits) -> Self {
        Self {
            root: root.into(),
            options,
            limits,
        }
    }

    /// Resolve every merge the options fully handle.
    ///
    /// Merges are processed last to first. A merge that fails to resolve or
    /// write is logged and stays in `remaining`; the run never aborts. The
    /// report lists paths in input order.
    #[instrument(skip_all, fields(root = %self.root.display(), merges = merges.len()))]
    pub fn run(&self, merges: Vec<PendingMerge>) -> AutoResolveReport {
        let mut report = AutoResolveReport {
            total: merges.len(),
            ..AutoResolveReport::default()
        };

        for PendingMerge { path, mut data } in merges.into_iter().rev() {
            if should_skip(&data, &self.limits) {
                info!(path = %path.display(), "skipping large file");
                report.skipped.push(path.clone());
                report.remaining.push(path);
                continue;
            }

            data.mark_conflicting(&self.options);
            if !data.is_resolvable() {
                debug!(path = %path.display(), "conflicts remain");
                report.remaining.push(path);
                continue;
            }

            match self.resolve_one(&path, &data) {
                Ok(true) => report.resolved.push(path),
                Ok(false) => report.remaining.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "auto-resolve failed");
                    report.remaining.push(path);
                }
            }
        }

        report.resolved.reverse();
        report.remaining.reverse();
        report.skipped.reverse();
        info!(
            resolved = report.resolved.len(),
            remaining = report.remaining.len(),
            "{}",
            report.summary()
        );
        report
    }

    fn resolve_one(&self, path: &Path, data: &MergeData) -> Result<bool, Box<dyn std::error::Error>> {
        let MergeOutcome::Resolved(text) = data.auto_resolve(&self.options)? else {
            return Ok(false);
        };
        let text = data.merged_line_ending().normalize(&text);
        let target = self.root.join(path);
        fs::write(&target, text)?;
        debug!(path = %target.display(), "resolved file written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(path: &str, base: &str, ours: &str, theirs: &str) -> PendingMerge {
        PendingMerge {
            path: PathBuf::from(path),
            data: MergeData::new(FileHeader::new(path), base, ours, theirs),
        }
    }

    #[test]
    fn mode_from_str_value() {
        assert_eq!(AutoResolveMode::from_str_value(None), AutoResolveMode::Ask);
        assert_eq!(AutoResolveMode::from_str_value(Some("Ask")), AutoResolveMode::Ask);
        assert_eq!(
            AutoResolveMode::from_str_value(Some("always")),
            AutoResolveMode::Always
        );
        assert_eq!(
            AutoResolveMode::from_str_value(Some("sometimes")),
            AutoResolveMode::Never
        );
    }

    #[test]
    fn mode_from_bool() {
        assert_eq!(AutoResolveMode::from_bool(None), AutoResolveMode::Ask);
        assert_eq!(AutoResolveMode::from_bool(Some(true)), AutoResolveMode::Always);
        assert_eq!(AutoResolveMode::from_bool(Some(false)), AutoResolveMode::Never);
    }

    #[test]
    fn mode_should_run_only_asks_in_ask_mode() {
        assert!(AutoResolveMode::Always.should_run(|| panic!("asked")));
        assert!(!AutoResolveMode::Never.should_run(|| panic!("asked")));
        assert!(AutoResolveMode::Ask.should_run(|| true));
        assert!(!AutoResolveMode::Ask.should_run(|| false));
    }

    #[test]
    fn small_files_are_never_skipped() {
        let merge = pending("a.txt", "a\n", "b\n", "c\n");
        let limits = SkipLimits {
            max_changed_lines: 0,
            max_chars: DEFAULT_MAX_CHARS,
        };
        assert!(!should_skip(&merge.data, &limits));
    }

    #[test]
    fn large_files_skip_by_changed_lines() {
        let base = "line\n".repeat(20);
        let ours = format!("changed\n{}", "line\n".repeat(19));
        let merge = pending("a.txt", &base, &ours, &base);
        let tight = SkipLimits {
            max_changed_lines: 50,
            max_chars: 10,
        };
        assert!(!should_skip(&merge.data, &tight));
        let zero = SkipLimits {
            max_changed_lines: 0,
            max_chars: 10,
        };
        assert!(should_skip(&merge.data, &zero));
        let one = SkipLimits {
            max_changed_lines: 1,
            max_chars: 10,
        };
        assert!(should_skip(&merge.data, &one));
    }

    #[test]
    fn size_limit_counts_characters_not_bytes() {
        // 6 characters, 11 bytes.
        let merge = pending("a.txt", "äöüäö\n", "ööüäö\n", "äöüäö\n");
        let limits = SkipLimits {
            max_changed_lines: 0,
            max_chars: 8,
        };
        assert!(!should_skip(&merge.data, &limits));
        let tighter = SkipLimits {
            max_changed_lines: 0,
            max_chars: 5,
        };
        assert!(should_skip(&merge.data, &tighter));
    }

    #[test]
    fn run_writes_resolved_and_keeps_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AutoResolver::new(dir.path(), ResolveOptions::builtin(), SkipLimits::default());
        let report = resolver.run(vec![
            pending("clean.txt", "a\nb\nc\n", "A\nb\nc\n", "a\nb\nC\n"),
            pending("conflict.txt", "x = 1\n", "x = 2\n", "x = 3\n"),
            pending("same.txt", "a\n", "b\n", "b\n"),
        ]);

        assert_eq!(report.total, 3);
        assert_eq!(
            report.resolved,
            [PathBuf::from("clean.txt"), PathBuf::from("same.txt")]
        );
        assert_eq!(report.remaining, [PathBuf::from("conflict.txt")]);
        assert!(report.skipped.is_empty());
        assert_eq!(
            report.summary(),
            "Auto-resolve managed to resolve 2 of 3 conflicts"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("clean.txt")).unwrap(),
            "A\nb\nC\n"
        );
        assert!(!dir.path().join("conflict.txt").exists());
    }

    #[test]
    fn run_keeps_windows_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AutoResolver::new(dir.path(), ResolveOptions::builtin(), SkipLimits::default());
        let report = resolver.run(vec![pending(
            "crlf.txt",
            "a\r\nb\r\n",
            "A\r\nb\r\n",
            "a\r\nB\r\n",
        )]);
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("crlf.txt")).unwrap(),
            "A\r\nB\r\n"
        );
    }

    #[test]
    fn write_failure_leaves_file_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AutoResolver::new(dir.path(), ResolveOptions::builtin(), SkipLimits::default());
        let report = resolver.run(vec![pending("missing/dir/file.txt", "a\n", "b\n", "b\n")]);
        assert!(report.resolved.is_empty());
        assert_eq!(report.remaining, [PathBuf::from("missing/dir/file.txt")]);
    }

    #[test]
    fn pending_merge_loads_sibling_versions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.js.ours"), "a\n").unwrap();
        fs::write(dir.path().join("f.js.theirs"), "b\n").unwrap();
        let merge = PendingMerge::load(dir.path(), Path::new("f.js")).unwrap();
        assert_eq!(merge.data.base_text(), "");
        assert_eq!(merge.data.header().extension(), Some("js"));

        assert!(PendingMerge::load(dir.path(), Path::new("g.js")).is_err());
    }

    #[test]
    fn version_path_appends_suffix() {
        assert_eq!(
            version_path(Path::new("/r"), Path::new("src/a.js"), OURS_SUFFIX),
            PathBuf::from("/r/src/a.js.ours")
        );
    }
}

#[cfg(test)]
mod mode_properties {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]

    use proptest::prelude::*;

    use super::{AutoResolveMode, SkipLimits, should_skip};
    use trimerge_core::{FileHeader, MergeData};

    fn arb_mode() -> impl Strategy<Value = AutoResolveMode> {
        prop_oneof![
            Just(AutoResolveMode::Always),
            Just(AutoResolveMode::Never),
            Just(AutoResolveMode::Ask),
        ]
    }

    proptest! {
        #[test]
        fn displayed_mode_parses_back(mode in arb_mode(), pad in "[ \t]{0,3}", upper in any::<bool>()) {
            let text = if upper { mode.to_string().to_uppercase() } else { mode.to_string() };
            let value = format!("{pad}{text}{pad}");
            prop_assert_eq!(AutoResolveMode::from_str_value(Some(&value)), mode);
            prop_assert_eq!(AutoResolveMode::from(value), mode);
        }

        #[test]
        fn unknown_values_mean_never(value in "[a-z]{1,10}") {
            prop_assume!(value != "ask" && value != "always");
            prop_assert_eq!(AutoResolveMode::from_str_value(Some(&value)), AutoResolveMode::Never);
        }

        #[test]
        fn texts_within_the_size_limit_are_never_skipped(
            base in "[a-zäö\n]{0,40}",
            ours in "[a-zäö\n]{0,40}",
            theirs in "[a-zäö\n]{0,40}",
            max_changed_lines in 0usize..5,
        ) {
            let data = MergeData::new(FileHeader::new("p.txt"), &base, &ours, &theirs);
            let limits = SkipLimits { max_changed_lines, max_chars: 40 };
            prop_assert!(!should_skip(&data, &limits));
        }
    }
}
