//! Three-way merge of one file.
//!
//! [`MergeData::new`] diffs both versions against the base and walks the
//! deltas of both sides in base order. Deltas that overlap in the base, or
//! start on the same base line, are grouped into one region; grouping is
//! transitive, so a chain of overlapping edits becomes a single region.
//!
//! The base is then covered by a sequence of [`MergeRegion`]s:
//!
//! - lines no side touched,
//! - lines only one side changed (taken from that side),
//! - lines both sides changed ([`Conflict`]), which a resolve option must
//!   turn into text.

#[cfg(test)]
mod property_tests;

use std::ops::Range;

use tracing::{debug, info, instrument};

use crate::diff::{ChangeDelta, FileDiff};
use crate::error::MergeError;
use crate::resolve::{Conflict, ConflictSide, ConflictState, FileHeader, ResolveOptions};
use crate::text::{LineEnding, line_offsets, split_lines};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A contiguous run of base lines and what the merge puts there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeRegion {
    /// Base lines neither side touched.
    Unchanged {
        base_lines: Range<usize>,
        text: String,
    },
    /// Base lines only `side` changed.
    Changed {
        side: ConflictSide,
        base_lines: Range<usize>,
        text: String,
    },
    /// Base lines both sides changed.
    Conflict(Conflict),
}

impl MergeRegion {
    #[must_use]
    pub fn base_lines(&self) -> Range<usize> {
        match self {
            Self::Unchanged { base_lines, .. } | Self::Changed { base_lines, .. } => {
                base_lines.clone()
            }
            Self::Conflict(conflict) => conflict.base_lines(),
        }
    }
}

/// Result of [`MergeData::auto_resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every conflict was resolved; the merged text.
    Resolved(String),
    /// Base line ranges of the conflicts no option could resolve.
    Conflicting { regions: Vec<Range<usize>> },
}

impl MergeOutcome {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Labels written after the conflict markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerLabels {
    pub yours: String,
    pub base: String,
    pub theirs: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            yours: "ours".to_owned(),
            base: "base".to_owned(),
            theirs: "theirs".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// MergeData
// ---------------------------------------------------------------------------

/// Base, both versions and the regions derived from them.
#[derive(Clone, Debug)]
pub struct MergeData {
    header: FileHeader,
    base: String,
    yours: FileDiff,
    theirs: FileDiff,
    regions: Vec<MergeRegion>,
}

impl MergeData {
    /// Diff both versions against `base` and split the base into regions.
    #[must_use]
    #[instrument(skip_all, fields(path = %header.path().display()))]
    pub fn new(header: FileHeader, base: &str, yours: &str, theirs: &str) -> Self {
        let yours = FileDiff::compute(base, yours);
        let theirs = FileDiff::compute(base, theirs);
        let regions = build_regions(base, &yours, &theirs);
        debug!(
            regions = regions.len(),
            conflicts = regions
                .iter()
                .filter(|r| matches!(r, MergeRegion::Conflict(_)))
                .count(),
            "merge regions built"
        );
        Self {
            header,
            base: base.to_owned(),
            yours,
            theirs,
            regions,
        }
    }

    #[must_use]
    pub const fn header(&self) -> &FileHeader {
        &self.header
    }

    #[must_use]
    pub fn base_text(&self) -> &str {
        &self.base
    }

    /// Diff of `side` against the base.
    #[must_use]
    pub const fn diff(&self, side: ConflictSide) -> &FileDiff {
        match side {
            ConflictSide::Yours => &self.yours,
            ConflictSide::Theirs => &self.theirs,
        }
    }

    #[must_use]
    pub fn regions(&self) -> &[MergeRegion] {
        &self.regions
    }

    /// Regions both sides changed, in base order.
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.regions.iter().filter_map(|region| match region {
            MergeRegion::Conflict(conflict) => Some(conflict),
            _ => None,
        })
    }

    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.conflicts().count()
    }

    /// Changed lines of both sides combined.
    #[must_use]
    pub fn changed_line_count(&self) -> usize {
        self.yours.changed_line_count() + self.theirs.changed_line_count()
    }

    /// Length in characters of the largest of the three texts.
    #[must_use]
    pub fn max_text_chars(&self) -> usize {
        [self.base.as_str(), self.yours.new_text(), self.theirs.new_text()]
            .iter()
            .map(|text| text.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// Classify every conflict as resolvable by an option or conflicting.
    pub fn mark_conflicting(&mut self, options: &ResolveOptions) {
        let header = &self.header;
        for region in &mut self.regions {
            if let MergeRegion::Conflict(conflict) = region {
                conflict.state = match options.find(conflict, header) {
                    Some(option) => ConflictState::Resolvable(option.name()),
                    None => ConflictState::Conflicting,
                };
            }
        }
    }

    /// Whether no conflict was marked as conflicting.
    ///
    /// Only meaningful after [`Self::mark_conflicting`].
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.conflicts()
            .all(|conflict| conflict.state() != ConflictState::Conflicting)
    }

    /// Resolve every conflict with `options` and compose the merged text.
    ///
    /// # Errors
    /// Returns [`MergeError`] if an option that accepted a conflict fails to
    /// produce its text.
    #[instrument(skip_all, fields(path = %self.header.path().display()))]
    pub fn auto_resolve(&self, options: &ResolveOptions) -> Result<MergeOutcome, MergeError> {
        let mut merged = String::with_capacity(self.base.len());
        let mut unresolved = Vec::new();
        for region in &self.regions {
            match region {
                MergeRegion::Unchanged { text, .. } | MergeRegion::Changed { text, .. } => {
                    merged.push_str(text);
                }
                MergeRegion::Conflict(conflict) => match options.find(conflict, &self.header) {
                    Some(option) => merged.push_str(&option.resolve(conflict)?),
                    None => unresolved.push(conflict.base_lines()),
                },
            }
        }

        if unresolved.is_empty() {
            info!(conflicts = self.conflict_count(), "merge resolved");
            Ok(MergeOutcome::Resolved(merged))
        } else {
            info!(
                conflicts = self.conflict_count(),
                unresolved = unresolved.len(),
                "merge left conflicts"
            );
            Ok(MergeOutcome::Conflicting {
                regions: unresolved,
            })
        }
    }

    /// Compose the merged text, wrapping conflicts no option resolves in
    /// git-style diff3 markers.
    ///
    /// # Errors
    /// Returns [`MergeError`] if an option that accepted a conflict fails to
    /// produce its text.
    pub fn render_with_markers(
        &self,
        options: &ResolveOptions,
        labels: &MarkerLabels,
    ) -> Result<String, MergeError> {
        let mut out = String::with_capacity(self.base.len());
        for region in &self.regions {
            match region {
                MergeRegion::Unchanged { text, .. } | MergeRegion::Changed { text, .. } => {
                    out.push_str(text);
                }
                MergeRegion::Conflict(conflict) => {
                    if let Some(option) = options.find(conflict, &self.header) {
                        out.push_str(&option.resolve(conflict)?);
                        continue;
                    }
                    push_marker(&mut out, "<<<<<<<", &labels.yours);
                    push_block(&mut out, conflict.text(ConflictSide::Yours));
                    push_marker(&mut out, "|||||||", &labels.base);
                    push_block(&mut out, conflict.base_text());
                    out.push_str("=======\n");
                    push_block(&mut out, conflict.text(ConflictSide::Theirs));
                    push_marker(&mut out, ">>>>>>>", &labels.theirs);
                }
            }
        }
        Ok(out)
    }

    /// Line ending for the merged text: the one both versions use, or the
    /// platform's when they differ.
    #[must_use]
    pub fn merged_line_ending(&self) -> LineEnding {
        let yours = LineEnding::detect(self.yours.new_text());
        let theirs = LineEnding::detect(self.theirs.new_text());
        match (yours, theirs) {
            (Some(yours), Some(theirs)) if yours == theirs => yours,
            _ => LineEnding::native(),
        }
    }
}

fn push_marker(out: &mut String, marker: &str, label: &str) {
    out.push_str(marker);
    if !label.is_empty() {
        out.push(' ');
        out.push_str(label);
    }
    out.push('\n');
}

fn push_block(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// Region building
// ---------------------------------------------------------------------------

fn build_regions(base: &str, yours: &FileDiff, theirs: &FileDiff) -> Vec<MergeRegion> {
    let base_lines = split_lines(base);
    let offsets = line_offsets(base);
    let yours_lines = split_lines(yours.new_text());
    let theirs_lines = split_lines(theirs.new_text());

    let mut tagged: Vec<(ConflictSide, &ChangeDelta)> = yours
        .deltas()
        .iter()
        .map(|delta| (ConflictSide::Yours, delta))
        .chain(theirs.deltas().iter().map(|delta| (ConflictSide::Theirs, delta)))
        .collect();
    tagged.sort_by_key(|(side, delta)| {
        let old = delta.old_lines();
        (old.start, old.end, *side)
    });

    let mut regions = Vec::new();
    let mut cursor = 0;
    let mut pending = tagged.into_iter().peekable();
    while let Some(first) = pending.next() {
        let mut span = first.1.old_lines();
        let mut group = vec![first];
        while let Some(next) = pending.next_if(|(_, delta)| {
            let old = delta.old_lines();
            old.start < span.end || old.start == span.start
        }) {
            span.end = span.end.max(next.1.old_lines().end);
            group.push(next);
        }

        if cursor < span.start {
            regions.push(MergeRegion::Unchanged {
                base_lines: cursor..span.start,
                text: base_lines[cursor..span.start].concat(),
            });
        }
        cursor = span.end;

        let yours_group = side_deltas(&group, ConflictSide::Yours);
        let theirs_group = side_deltas(&group, ConflictSide::Theirs);
        let region = match (yours_group.is_empty(), theirs_group.is_empty()) {
            (false, true) => MergeRegion::Changed {
                side: ConflictSide::Yours,
                text: side_text(&yours_lines, &yours_group, &span),
                base_lines: span,
            },
            (true, false) => MergeRegion::Changed {
                side: ConflictSide::Theirs,
                text: side_text(&theirs_lines, &theirs_group, &span),
                base_lines: span,
            },
            _ => MergeRegion::Conflict(Conflict::new(
                span.clone(),
                offsets[span.start],
                base_lines[span.clone()].concat(),
                (side_text(&yours_lines, &yours_group, &span), yours_group),
                (side_text(&theirs_lines, &theirs_group, &span), theirs_group),
            )),
        };
        regions.push(region);
    }

    if cursor < base_lines.len() {
        regions.push(MergeRegion::Unchanged {
            base_lines: cursor..base_lines.len(),
            text: base_lines[cursor..].concat(),
        });
    }
    regions
}

fn side_deltas(group: &[(ConflictSide, &ChangeDelta)], side: ConflictSide) -> Vec<ChangeDelta> {
    group
        .iter()
        .filter(|(s, _)| *s == side)
        .map(|(_, delta)| (*delta).clone())
        .collect()
}

/// Text of one side over the base lines `span`.
///
/// Outside its deltas a side matches the base line for line, so the lines
/// of `span` before the first delta and after the last one map onto the
/// side's lines at a fixed offset.
fn side_text(lines: &[&str], deltas: &[ChangeDelta], span: &Range<usize>) -> String {
    let (Some(first), Some(last)) = (deltas.first(), deltas.last()) else {
        return String::new();
    };
    let start = first.new_lines().start - (first.old_lines().start - span.start);
    let end = last.new_lines().end + (span.end - last.old_lines().end);
    lines[start..end].concat()
}
