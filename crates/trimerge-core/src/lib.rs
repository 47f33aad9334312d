//! Three-way text merge engine for trimerge.
//!
//! Every other trimerge component goes through this crate to diff, pair and
//! resolve conflicting edits of one file.
//!
//! # Crate layout
//!
//! - [`text`]: line splitting and line ending handling.
//! - [`diff`]: line and word diffs of one version against the base.
//! - [`imports`]: ES module import declarations, parsed with tree-sitter.
//! - [`resolve`]: the [`Conflict`] model and the [`ResolveOption`] trait with
//!   its built-in implementations.
//! - [`merge`]: [`MergeData`], the region builder and conflict composition.
//! - [`error`]: the [`MergeError`] enum.

pub mod diff;
pub mod error;
pub mod imports;
pub mod merge;
pub mod resolve;
pub mod text;

pub use diff::{ChangeDelta, ChangeKind, FileDiff, LinePart};
pub use error::MergeError;
pub use imports::{ImportMap, ImportSpecifier, is_import_block, split_import_block};
pub use merge::{MarkerLabels, MergeData, MergeOutcome, MergeRegion};
pub use resolve::{
    BUILTIN_OPTION_NAMES, Conflict, ConflictSide, ConflictState, DEFAULT_IMPORT_EXTENSIONS,
    FileHeader, ResolveOption, ResolveOptions,
};
pub use text::LineEnding;
