//! Error type for the merge engine.

use thiserror::Error;

/// Errors returned by parsing and conflict resolution.
///
/// A conflict that simply cannot be resolved is *not* an error: it is
/// reported through [`MergeOutcome::Conflicting`](crate::merge::MergeOutcome).
#[derive(Debug, Error)]
pub enum MergeError {
    /// The tree-sitter grammar could not be loaded into the parser.
    #[error("parser setup failed: {0}")]
    ParserSetup(String),

    /// The parser returned no tree (cancelled or timed out).
    #[error("source could not be parsed")]
    ParseFailed,

    /// A resolve option accepted a conflict in `can_resolve` but failed to
    /// produce merged text for it.
    #[error("resolve option `{option}` failed at base lines {start}..{end}: {message}")]
    ResolveFailed {
        /// Name of the resolve option.
        option: &'static str,
        /// First base line of the conflict.
        start: usize,
        /// End (exclusive) base line of the conflict.
        end: usize,
        /// What went wrong.
        message: String,
    },
}
