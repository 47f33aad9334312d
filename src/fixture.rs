//! Three-way merge test cases stored on disk.
//!
//! A case is a directory holding up to four files named by role, with an
//! optional shared extension:
//!
//! - `Original`: the common ancestor (empty if absent),
//! - `VersionA`: the local edit,
//! - `VersionB`: the incoming edit,
//! - `Expected`: the merge result; absent when the case must stay conflicting.
//!
//! Besides running the merge, [`FixtureCase::check_consistency`] checks that
//! an import fixture is self-consistent: the code after the import block is
//! the same in all versions and `Expected` imports exactly what the two
//! versions import together.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};
use trimerge_core::{
    FileHeader, ImportMap, LineEnding, MergeData, MergeError, MergeOutcome, ResolveOptions,
    split_import_block,
};

const ORIGINAL: &str = "Original";
const VERSION_A: &str = "VersionA";
const VERSION_B: &str = "VersionB";
const EXPECTED: &str = "Expected";

// ---------------------------------------------------------------------------
// FixtureError
// ---------------------------------------------------------------------------

/// Errors from loading, checking or running a fixture case.
#[derive(Debug)]
pub enum FixtureError {
    /// I/O while reading the case directory.
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// A required version file is missing.
    MissingFile {
        /// Case directory.
        dir: PathBuf,
        /// Role of the missing file (`VersionA`, `VersionB` or `Expected`).
        role: &'static str,
    },
    /// The merge engine failed.
    Merge {
        case: String,
        source: MergeError,
    },
    /// The merge result does not match the case.
    Failed {
        case: String,
        detail: String,
    },
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::MissingFile { dir, role } => {
                write!(f, "{}: no {role} file in case directory", dir.display())
            }
            Self::Merge { case, source } => write!(f, "case {case}: {source}"),
            Self::Failed { case, detail } => write!(f, "case {case} failed: {detail}"),
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Merge { source, .. } => Some(source),
            Self::MissingFile { .. } | Self::Failed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FixtureCase
// ---------------------------------------------------------------------------

/// One merge test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureCase {
    name: String,
    dir: PathBuf,
    extension: Option<String>,
    original: Option<String>,
    version_a: String,
    version_b: String,
    expected: Option<String>,
}

impl FixtureCase {
    /// Read the case stored in `dir`.
    ///
    /// # Errors
    /// Returns [`FixtureError::MissingFile`] when `VersionA` or `VersionB`
    /// is absent, and [`FixtureError::Io`] when a file cannot be read.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, FixtureError> {
        let entries = fs::read_dir(dir).map_err(|source| FixtureError::Io {
            path: dir.to_owned(),
            source,
        })?;

        let mut original = None;
        let mut version_a = None;
        let mut version_b = None;
        let mut expected = None;
        let mut extension = None;
        for entry in entries {
            let entry = entry.map_err(|source| FixtureError::Io {
                path: dir.to_owned(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let slot = match stem {
                ORIGINAL => &mut original,
                VERSION_A => {
                    extension = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(str::to_owned);
                    &mut version_a
                }
                VERSION_B => &mut version_b,
                EXPECTED => &mut expected,
                _ => continue,
            };
            *slot = Some(fs::read_to_string(&path).map_err(|source| FixtureError::Io {
                path: path.clone(),
                source,
            })?);
        }

        let missing = |role| FixtureError::MissingFile {
            dir: dir.to_owned(),
            role,
        };
        let case = Self {
            name: case_name(dir),
            dir: dir.to_owned(),
            extension,
            original,
            version_a: version_a.ok_or_else(|| missing(VERSION_A))?,
            version_b: version_b.ok_or_else(|| missing(VERSION_B))?,
            expected,
        };
        debug!(
            case = %case.name,
            has_original = case.original.is_some(),
            has_expected = case.expected.is_some(),
            "fixture loaded"
        );
        Ok(case)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn original(&self) -> &str {
        self.original.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn version_a(&self) -> &str {
        &self.version_a
    }

    #[must_use]
    pub fn version_b(&self) -> &str {
        &self.version_b
    }

    #[must_use]
    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    /// Header the merge sees: `<case>.<ext>`, so resolve options keyed on
    /// the extension apply.
    #[must_use]
    pub fn header(&self) -> FileHeader {
        match &self.extension {
            Some(ext) => FileHeader::new(format!("{}.{ext}", self.name)),
            None => FileHeader::new(&self.name),
        }
    }

    /// Check the import fixture invariants.
    ///
    /// # Errors
    /// Returns [`FixtureError::MissingFile`] without an `Expected` file and
    /// [`FixtureError::Merge`] if a version cannot be parsed.
    pub fn check_consistency(&self) -> Result<ConsistencyReport, FixtureError> {
        let expected = self.expected().ok_or_else(|| FixtureError::MissingFile {
            dir: self.dir.clone(),
            role: EXPECTED,
        })?;
        let parse_err = |source| FixtureError::Merge {
            case: self.name.clone(),
            source,
        };

        let (_, expected_body) = split_import_block(expected).map_err(parse_err)?;
        let (_, body_a) = split_import_block(&self.version_a).map_err(parse_err)?;
        let (_, body_b) = split_import_block(&self.version_b).map_err(parse_err)?;

        let expected_ids = ImportMap::parse(expected).map_err(parse_err)?.identifiers();
        let mut union = ImportMap::parse(&self.version_a)
            .map_err(parse_err)?
            .identifiers();
        union.extend(
            ImportMap::parse(&self.version_b)
                .map_err(parse_err)?
                .identifiers(),
        );

        Ok(ConsistencyReport {
            case: self.name.clone(),
            body_matches: expected_body == body_a && expected_body == body_b,
            missing: union.difference(&expected_ids).cloned().collect(),
            extra: expected_ids.difference(&union).cloned().collect(),
        })
    }

    /// Merge `VersionA` and `VersionB` against `Original`.
    ///
    /// # Errors
    /// Returns [`FixtureError::Merge`] if a resolve option fails.
    #[instrument(skip_all, fields(case = %self.name))]
    pub fn run(&self, options: &ResolveOptions) -> Result<FixtureOutcome, FixtureError> {
        let data = MergeData::new(
            self.header(),
            self.original(),
            &self.version_a,
            &self.version_b,
        );
        let merge = data
            .auto_resolve(options)
            .map_err(|source| FixtureError::Merge {
                case: self.name.clone(),
                source,
            })?;
        Ok(FixtureOutcome {
            case: self.name.clone(),
            merge,
            expected: self.expected.clone(),
        })
    }

    /// Run the case and fail unless the outcome matches `Expected`.
    ///
    /// # Errors
    /// Returns [`FixtureError::Failed`] describing the mismatch.
    pub fn verify(&self, options: &ResolveOptions) -> Result<(), FixtureError> {
        let outcome = self.run(options)?;
        if outcome.passed() {
            return Ok(());
        }
        Err(FixtureError::Failed {
            case: self.name.clone(),
            detail: outcome.describe(),
        })
    }
}

fn case_name(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Every case directory directly under `root`, sorted by name.
///
/// Directories without a `VersionA` file are ignored.
///
/// # Errors
/// Returns the first error reading `root` or loading a case.
pub fn discover(root: &Path) -> Result<Vec<FixtureCase>, FixtureError> {
    let io_err = |source| FixtureError::Io {
        path: root.to_owned(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() && has_role_file(&path, VERSION_A) {
            dirs.push(path);
        }
    }
    dirs.sort();
    dirs.iter().map(|dir| FixtureCase::load(dir)).collect()
}

fn has_role_file(dir: &Path, role: &str) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(Result::ok).any(|entry| {
            entry
                .path()
                .file_stem()
                .is_some_and(|stem| stem == role)
        })
    })
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of [`FixtureCase::check_consistency`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub case: String,
    /// The code after the import block is identical in all three files.
    pub body_matches: bool,
    /// Identifiers imported by a version but not by `Expected`.
    pub missing: BTreeSet<String>,
    /// Identifiers imported by `Expected` but by neither version.
    pub extra: BTreeSet<String>,
}

impl ConsistencyReport {
    /// `Expected` imports exactly the union of both versions.
    #[must_use]
    pub fn imports_are_union(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }

    /// No identifier of either version was dropped.
    #[must_use]
    pub fn nothing_dropped(&self) -> bool {
        self.missing.is_empty()
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.body_matches && self.imports_are_union()
    }
}

/// Result of [`FixtureCase::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureOutcome {
    pub case: String,
    pub merge: MergeOutcome,
    pub expected: Option<String>,
}

impl FixtureOutcome {
    /// A resolved merge must equal `Expected` (line endings aside); without
    /// `Expected` the merge must stay conflicting.
    #[must_use]
    pub fn passed(&self) -> bool {
        match (&self.merge, &self.expected) {
            (MergeOutcome::Resolved(actual), Some(expected)) => {
                LineEnding::Unix.normalize(actual) == LineEnding::Unix.normalize(expected)
            }
            (MergeOutcome::Conflicting { .. }, None) => true,
            _ => false,
        }
    }

    /// One-line description of the outcome.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.merge, &self.expected) {
            (MergeOutcome::Resolved(_), Some(_)) if self.passed() => {
                "resolved as expected".to_owned()
            }
            (MergeOutcome::Resolved(actual), Some(expected)) => {
                format!("merged text differs:\n--- expected\n{expected}\n--- actual\n{actual}")
            }
            (MergeOutcome::Resolved(_), None) => {
                "resolved, but the case expects a conflict".to_owned()
            }
            (MergeOutcome::Conflicting { regions }, Some(_)) => {
                format!("{} conflict(s) left unresolved at base lines {regions:?}", regions.len())
            }
            (MergeOutcome::Conflicting { .. }, None) => "stayed conflicting as expected".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_case(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, contents) in files {
            fs::write(dir.join(file), contents).unwrap();
        }
        dir
    }

    #[test]
    fn load_reads_roles_and_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Case",
            &[
                ("Original.js", "a\n"),
                ("VersionA.js", "b\n"),
                ("VersionB.js", "a\n"),
                ("Expected.js", "b\n"),
                ("notes.md", "ignored"),
            ],
        );
        let case = FixtureCase::load(&dir).unwrap();
        assert_eq!(case.name(), "Case");
        assert_eq!(case.original(), "a\n");
        assert_eq!(case.expected(), Some("b\n"));
        assert_eq!(case.header().extension(), Some("js"));
    }

    #[test]
    fn load_requires_both_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(tmp.path(), "Broken", &[("VersionA", "x\n")]);
        let err = FixtureCase::load(&dir).unwrap_err();
        assert!(matches!(err, FixtureError::MissingFile { role: "VersionB", .. }));
    }

    #[test]
    fn missing_expected_means_conflict_expected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Conflict",
            &[("Original", "x = 1\n"), ("VersionA", "x = 2\n"), ("VersionB", "x = 3\n")],
        );
        let case = FixtureCase::load(&dir).unwrap();
        let outcome = case.run(&ResolveOptions::builtin()).unwrap();
        assert!(outcome.passed(), "{}", outcome.describe());
        assert!(case.verify(&ResolveOptions::builtin()).is_ok());
    }

    #[test]
    fn verify_reports_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Wrong",
            &[
                ("Original", "a\n"),
                ("VersionA", "b\n"),
                ("VersionB", "a\n"),
                ("Expected", "c\n"),
            ],
        );
        let err = FixtureCase::load(&dir)
            .unwrap()
            .verify(&ResolveOptions::builtin())
            .unwrap_err();
        assert!(format!("{err}").contains("merged text differs"));
    }

    #[test]
    fn consistency_flags_dropped_imports() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Imports",
            &[
                ("VersionA.js", "import { a, b } from \"m\";\n\nrun();\n"),
                ("VersionB.js", "import { a } from \"m\";\nimport { c } from \"n\";\n\nrun();\n"),
                ("Expected.js", "import { a, b } from \"m\";\n\nrun();\n"),
            ],
        );
        let report = FixtureCase::load(&dir).unwrap().check_consistency().unwrap();
        assert!(report.body_matches);
        assert_eq!(report.missing, BTreeSet::from(["c".to_owned()]));
        assert!(report.extra.is_empty());
        assert!(!report.nothing_dropped());
        assert!(!report.is_consistent());
    }

    #[test]
    fn consistency_flags_differing_body() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Body",
            &[
                ("VersionA.js", "import { a } from \"m\";\n\nrun();\n"),
                ("VersionB.js", "import { a } from \"m\";\n\nrun(1);\n"),
                ("Expected.js", "import { a } from \"m\";\n\nrun();\n"),
            ],
        );
        let report = FixtureCase::load(&dir).unwrap().check_consistency().unwrap();
        assert!(!report.body_matches);
        assert!(report.imports_are_union());
        assert!(!report.is_consistent());
    }

    #[test]
    fn consistency_flags_imports_only_in_expected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_case(
            tmp.path(),
            "Extra",
            &[
                ("VersionA.js", "import { a } from \"m\";\n\nrun();\n"),
                ("VersionB.js", "import { a } from \"m\";\n\nrun();\n"),
                ("Expected.js", "import { a, z } from \"m\";\n\nrun();\n"),
            ],
        );
        let report = FixtureCase::load(&dir).unwrap().check_consistency().unwrap();
        assert!(report.body_matches);
        assert!(report.nothing_dropped());
        assert_eq!(report.extra, BTreeSet::from(["z".to_owned()]));
        assert!(!report.imports_are_union());
        assert!(!report.is_consistent());
    }

    #[test]
    fn discover_sorts_and_skips_non_cases() {
        let tmp = tempfile::tempdir().unwrap();
        write_case(tmp.path(), "Zeta", &[("VersionA", "a"), ("VersionB", "b")]);
        write_case(tmp.path(), "Alpha", &[("VersionA", "a"), ("VersionB", "b")]);
        write_case(tmp.path(), "notes", &[("README", "x")]);
        let names: Vec<_> = discover(tmp.path())
            .unwrap()
            .iter()
            .map(|case| case.name().to_owned())
            .collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
    }
}
