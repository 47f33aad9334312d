//! Line and word level diffs between a base text and one derived version.
//!
//! [`FileDiff::compute`] runs a Myers line diff (via `diffy`) and turns the
//! result into ordered, disjoint [`ChangeDelta`]s. Every delta knows its
//! line range and byte range in the base so that deltas from two different
//! versions of the same base can be compared directly.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use diffy::{DiffOptions, Line};
use serde::{Deserialize, Serialize};

use crate::text::{line_offsets, lone_cr_as_lf, split_lines};

/// Deltas touching fewer lines than this get a word-level breakdown.
/// Larger deltas fall back to line granularity for their parts.
pub const WORD_DIFF_LINE_LIMIT: usize = 20;

/// Kind of change a delta makes to the base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Lines inserted where the base had none.
    Add,
    /// Base lines replaced by different lines.
    Modify,
    /// Base lines removed.
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A raw edit: line range in the old text replaced by a line range in the new.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    /// Lines of the old text that are replaced.
    pub old: Range<usize>,
    /// Lines of the new text that replace them.
    pub new: Range<usize>,
}

impl Edit {
    const fn at(old: usize, new: usize) -> Self {
        Self {
            old: old..old,
            new: new..new,
        }
    }
}

/// Compute the line edits turning `old` into `new`.
///
/// The patch is requested with enough context to cover both texts, so
/// `diffy` emits a single hunk anchored at the first line and the edit
/// positions can be read off by walking it.
#[must_use]
pub fn line_edits(old: &str, new: &str) -> Vec<Edit> {
    if old == new {
        return Vec::new();
    }
    let (old, new) = (lone_cr_as_lf(old), lone_cr_as_lf(new));
    let (old, new) = (&*old, &*new);
    let context = split_lines(old).len().max(split_lines(new).len()) + 1;
    let patch = DiffOptions::new()
        .set_context_len(context)
        .create_patch(old, new);

    let mut edits = Vec::new();
    let mut current: Option<Edit> = None;
    let (mut old_idx, mut new_idx) = (0usize, 0usize);
    for hunk in patch.hunks() {
        for line in hunk.lines() {
            match line {
                Line::Context(_) => {
                    if let Some(edit) = current.take() {
                        edits.push(edit);
                    }
                    old_idx += 1;
                    new_idx += 1;
                }
                Line::Delete(_) => {
                    let edit = current.get_or_insert_with(|| Edit::at(old_idx, new_idx));
                    old_idx += 1;
                    edit.old.end = old_idx;
                }
                Line::Insert(_) => {
                    let edit = current.get_or_insert_with(|| Edit::at(old_idx, new_idx));
                    new_idx += 1;
                    edit.new.end = new_idx;
                }
            }
        }
    }
    if let Some(edit) = current {
        edits.push(edit);
    }
    edits
}

// ---------------------------------------------------------------------------
// LinePart
// ---------------------------------------------------------------------------

/// A sub-line change inside a [`ChangeDelta`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinePart {
    /// Replaced bytes, as an absolute range in the base text.
    pub old: Range<usize>,
    /// Replacement text.
    pub text: String,
}

impl LinePart {
    /// Two parts conflict when their base ranges overlap, or when both are
    /// insertions at the same offset.
    #[must_use]
    pub const fn conflicts_with(&self, other: &Self) -> bool {
        (other.old.start < self.old.end && other.old.end > self.old.start)
            || (other.old.start == self.old.end && other.old.end == self.old.start)
    }
}

// ---------------------------------------------------------------------------
// ChangeDelta
// ---------------------------------------------------------------------------

/// One contiguous change between the base and a version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeDelta {
    old_lines: Range<usize>,
    new_lines: Range<usize>,
    old_bytes: Range<usize>,
    old_text: String,
    new_text: String,
}

impl ChangeDelta {
    /// Base lines replaced by this delta.
    #[must_use]
    pub fn old_lines(&self) -> Range<usize> {
        self.old_lines.clone()
    }

    /// Version lines introduced by this delta.
    #[must_use]
    pub fn new_lines(&self) -> Range<usize> {
        self.new_lines.clone()
    }

    /// Base bytes replaced by this delta.
    #[must_use]
    pub fn old_bytes(&self) -> Range<usize> {
        self.old_bytes.clone()
    }

    #[must_use]
    pub fn old_text(&self) -> &str {
        &self.old_text
    }

    #[must_use]
    pub fn new_text(&self) -> &str {
        &self.new_text
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        if self.old_lines.is_empty() {
            ChangeKind::Add
        } else if self.new_lines.is_empty() {
            ChangeKind::Delete
        } else {
            ChangeKind::Modify
        }
    }

    /// Number of lines touched on both sides.
    #[must_use]
    pub fn changed_lines(&self) -> usize {
        self.old_lines.len() + self.new_lines.len()
    }

    /// Word-level breakdown of this delta.
    ///
    /// Small deltas are diffed with every space treated as a line break, so
    /// each word becomes its own diff unit. The substitution keeps byte
    /// offsets stable, which lets the parts index straight into the base.
    #[must_use]
    pub fn line_parts(&self) -> Vec<LinePart> {
        let (old_src, new_src): (Cow<'_, str>, Cow<'_, str>) =
            if self.changed_lines() < WORD_DIFF_LINE_LIMIT {
                (
                    Cow::Owned(self.old_text.replace(' ', "\n")),
                    Cow::Owned(self.new_text.replace(' ', "\n")),
                )
            } else {
                (
                    Cow::Borrowed(self.old_text.as_str()),
                    Cow::Borrowed(self.new_text.as_str()),
                )
            };
        let old_offsets = line_offsets(&old_src);
        let new_offsets = line_offsets(&new_src);
        let base = self.old_bytes.start;

        line_edits(&old_src, &new_src)
            .into_iter()
            .map(|edit| {
                let old = old_offsets[edit.old.start]..old_offsets[edit.old.end];
                let new = new_offsets[edit.new.start]..new_offsets[edit.new.end];
                LinePart {
                    old: base + old.start..base + old.end,
                    text: self.new_text[new].to_owned(),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FileDiff
// ---------------------------------------------------------------------------

/// All changes between a base text and one version of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDiff {
    old: String,
    new: String,
    deltas: Vec<ChangeDelta>,
}

impl FileDiff {
    /// Diff `old` against `new` line by line.
    #[must_use]
    pub fn compute(old: &str, new: &str) -> Self {
        let old_lines = split_lines(old);
        let new_lines = split_lines(new);
        let old_offsets = line_offsets(old);

        let deltas = line_edits(old, new)
            .into_iter()
            .map(|edit| ChangeDelta {
                old_bytes: old_offsets[edit.old.start]..old_offsets[edit.old.end],
                old_text: old_lines[edit.old.clone()].concat(),
                new_text: new_lines[edit.new.clone()].concat(),
                old_lines: edit.old,
                new_lines: edit.new,
            })
            .collect();

        Self {
            old: old.to_owned(),
            new: new.to_owned(),
            deltas,
        }
    }

    /// The base text.
    #[must_use]
    pub fn old_text(&self) -> &str {
        &self.old
    }

    /// The version text.
    #[must_use]
    pub fn new_text(&self) -> &str {
        &self.new
    }

    /// Deltas in base order. They never overlap.
    #[must_use]
    pub fn deltas(&self) -> &[ChangeDelta] {
        &self.deltas
    }

    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Sum of old and new lines over all deltas.
    #[must_use]
    pub fn changed_line_count(&self) -> usize {
        self.deltas.iter().map(ChangeDelta::changed_lines).sum()
    }
}
