//! Conflict model and the pluggable resolve options.
//!
//! A [`Conflict`] is one region of the base that both sides changed. Both
//! side texts always cover the same base lines, so a resolve option only has
//! to produce the replacement text for that region.
//!
//! Options are tried in ascending [`ResolveOption::position`]; the first one
//! whose `can_resolve` accepts the conflict owns it:
//!
//! | position | option     | resolves when                                   |
//! |----------|------------|-------------------------------------------------|
//! | 0        | `same`     | both sides made the identical change            |
//! | 100      | `enclosed` | one side's text contains the other's            |
//! | 200      | `import`   | both sides only touched ES import declarations  |
//! | 300      | `word`     | the word-level changes of both sides are disjoint |

mod enclosed;
mod import;
mod same;
mod word;

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::{ChangeDelta, LinePart};
use crate::error::MergeError;

pub use enclosed::EnclosedResolveOption;
pub use import::{DEFAULT_IMPORT_EXTENSIONS, ImportResolveOption};
pub use same::SameResolveOption;
pub use word::WordResolveOption;

/// Names of the built-in options, in position order.
pub const BUILTIN_OPTION_NAMES: [&str; 4] = ["same", "enclosed", "import", "word"];

// ---------------------------------------------------------------------------
// ConflictSide
// ---------------------------------------------------------------------------

/// Which version a change comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSide {
    /// The local version (`%A` for a git merge driver).
    Yours,
    /// The incoming version (`%B` for a git merge driver).
    Theirs,
}

impl ConflictSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Yours => Self::Theirs,
            Self::Theirs => Self::Yours,
        }
    }
}

impl fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yours => write!(f, "yours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

// ---------------------------------------------------------------------------
// FileHeader
// ---------------------------------------------------------------------------

/// Information about the file a merge belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    path: PathBuf,
}

impl FileHeader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file, relative to the repository root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File extension without the dot, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// Classification of a conflict after [`crate::merge::MergeData::mark_conflicting`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictState {
    /// Not classified yet.
    Unmarked,
    /// The named option can resolve the conflict.
    Resolvable(&'static str),
    /// No option can resolve the conflict.
    Conflicting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SideChange {
    text: String,
    deltas: Vec<ChangeDelta>,
}

/// One region of the base changed by both sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    base_lines: Range<usize>,
    base_offset: usize,
    base_text: String,
    yours: SideChange,
    theirs: SideChange,
    pub(crate) state: ConflictState,
}

impl Conflict {
    /// Build a conflict. `base_offset` is the byte offset of `base_lines.start`
    /// in the base text; the deltas must lie within `base_lines`.
    #[must_use]
    pub fn new(
        base_lines: Range<usize>,
        base_offset: usize,
        base_text: String,
        yours: (String, Vec<ChangeDelta>),
        theirs: (String, Vec<ChangeDelta>),
    ) -> Self {
        Self {
            base_lines,
            base_offset,
            base_text,
            yours: SideChange {
                text: yours.0,
                deltas: yours.1,
            },
            theirs: SideChange {
                text: theirs.0,
                deltas: theirs.1,
            },
            state: ConflictState::Unmarked,
        }
    }

    /// Base lines covered by the conflict.
    #[must_use]
    pub fn base_lines(&self) -> Range<usize> {
        self.base_lines.clone()
    }

    /// Byte offset of the conflict region in the base.
    #[must_use]
    pub const fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Base text of the region.
    #[must_use]
    pub fn base_text(&self) -> &str {
        &self.base_text
    }

    /// Text `side` puts in place of the region.
    #[must_use]
    pub fn text(&self, side: ConflictSide) -> &str {
        &self.side(side).text
    }

    /// Deltas of `side` inside the region.
    #[must_use]
    pub fn deltas(&self, side: ConflictSide) -> &[ChangeDelta] {
        &self.side(side).deltas
    }

    /// Whether `side` removed the region without replacement.
    #[must_use]
    pub fn is_deletion(&self, side: ConflictSide) -> bool {
        !self.base_text.is_empty() && self.side(side).text.is_empty()
    }

    /// Word-level parts of all deltas of `side`.
    #[must_use]
    pub fn line_parts(&self, side: ConflictSide) -> Vec<LinePart> {
        self.side(side)
            .deltas
            .iter()
            .flat_map(ChangeDelta::line_parts)
            .collect()
    }

    #[must_use]
    pub const fn state(&self) -> ConflictState {
        self.state
    }

    const fn side(&self, side: ConflictSide) -> &SideChange {
        match side {
            ConflictSide::Yours => &self.yours,
            ConflictSide::Theirs => &self.theirs,
        }
    }
}

// ---------------------------------------------------------------------------
// ResolveOption
// ---------------------------------------------------------------------------

/// A strategy for resolving one kind of conflict automatically.
pub trait ResolveOption: fmt::Debug + Send + Sync {
    /// Short identifier used in configuration and reports.
    fn name(&self) -> &'static str;

    /// Lower positions are tried first.
    fn position(&self) -> u32;

    /// Whether this option can resolve `conflict` in the file described by
    /// `header`.
    fn can_resolve(&self, conflict: &Conflict, header: &FileHeader) -> bool;

    /// Produce the text that replaces the conflict region.
    ///
    /// Only called after `can_resolve` returned `true`.
    ///
    /// # Errors
    /// Returns [`MergeError::ResolveFailed`] if the text cannot be produced.
    fn resolve(&self, conflict: &Conflict) -> Result<String, MergeError>;
}

/// Ordered set of resolve options.
#[derive(Debug)]
pub struct ResolveOptions {
    options: Vec<Box<dyn ResolveOption>>,
}

impl ResolveOptions {
    /// Wrap `options`, ordering them by position.
    #[must_use]
    pub fn new(mut options: Vec<Box<dyn ResolveOption>>) -> Self {
        options.sort_by_key(|option| option.position());
        Self { options }
    }

    /// All built-in options with the default import extensions.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_OPTION_NAMES
                .iter()
                .filter_map(|name| builtin_option(name, DEFAULT_IMPORT_EXTENSIONS))
                .collect(),
        )
    }

    /// The built-in options named in `names`.
    ///
    /// # Errors
    /// Returns the first unknown name.
    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        import_extensions: &[S],
    ) -> Result<Self, String> {
        let extensions: Vec<&str> = import_extensions.iter().map(AsRef::as_ref).collect();
        let mut options = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let option =
                builtin_option(name, &extensions).ok_or_else(|| name.to_owned())?;
            options.push(option);
        }
        Ok(Self::new(options))
    }

    /// The first option that can resolve `conflict`.
    #[must_use]
    pub fn find(&self, conflict: &Conflict, header: &FileHeader) -> Option<&dyn ResolveOption> {
        let Some(option) = self
            .options
            .iter()
            .find(|option| option.can_resolve(conflict, header))
        else {
            debug!(
                path = %header.path().display(),
                start = conflict.base_lines.start,
                end = conflict.base_lines.end,
                "no resolve option applies"
            );
            return None;
        };
        debug!(
            path = %header.path().display(),
            start = conflict.base_lines.start,
            end = conflict.base_lines.end,
            option = option.name(),
            "conflict is resolvable"
        );
        Some(option.as_ref())
    }

    /// Look up an option by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ResolveOption> {
        let option = self.options.iter().find(|option| option.name() == name)?;
        Some(option.as_ref())
    }

    /// Option names in position order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.options.iter().map(|option| option.name())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Construct the built-in option called `name`.
#[must_use]
pub fn builtin_option(name: &str, import_extensions: &[&str]) -> Option<Box<dyn ResolveOption>> {
    match name {
        "same" => Some(Box::new(SameResolveOption)),
        "enclosed" => Some(Box::new(EnclosedResolveOption)),
        "import" => Some(Box::new(ImportResolveOption::new(
            import_extensions.iter().map(|ext| (*ext).to_owned()).collect(),
        ))),
        "word" => Some(Box::new(WordResolveOption)),
        _ => None,
    }
}
