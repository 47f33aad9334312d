use super::{Conflict, ConflictSide, FileHeader, ResolveOption};
use crate::error::MergeError;

/// One side's change contains the other side's change verbatim.
///
/// Typical case: both sides added the same line, one of them added more
/// around it. The enclosing side wins. Deletions never enclose anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnclosedResolveOption;

impl EnclosedResolveOption {
    /// The side whose text contains the other side's text, if any.
    #[must_use]
    pub fn enclosing_side(conflict: &Conflict) -> Option<ConflictSide> {
        if conflict.is_deletion(ConflictSide::Yours) || conflict.is_deletion(ConflictSide::Theirs) {
            return None;
        }
        let yours = conflict.text(ConflictSide::Yours);
        let theirs = conflict.text(ConflictSide::Theirs);
        if yours.contains(theirs) {
            Some(ConflictSide::Yours)
        } else if theirs.contains(yours) {
            Some(ConflictSide::Theirs)
        } else {
            None
        }
    }
}

impl ResolveOption for EnclosedResolveOption {
    fn name(&self) -> &'static str {
        "enclosed"
    }

    fn position(&self) -> u32 {
        100
    }

    fn can_resolve(&self, conflict: &Conflict, _header: &FileHeader) -> bool {
        Self::enclosing_side(conflict).is_some()
    }

    fn resolve(&self, conflict: &Conflict) -> Result<String, MergeError> {
        let side = Self::enclosing_side(conflict).ok_or_else(|| MergeError::ResolveFailed {
            option: self.name(),
            start: conflict.base_lines().start,
            end: conflict.base_lines().end,
            message: "neither side encloses the other".to_owned(),
        })?;
        Ok(conflict.text(side).to_owned())
    }
}
