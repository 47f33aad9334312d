use super::{Conflict, ConflictSide, FileHeader, ResolveOption};
use crate::error::MergeError;

/// Both sides made exactly the same change.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameResolveOption;

impl ResolveOption for SameResolveOption {
    fn name(&self) -> &'static str {
        "same"
    }

    fn position(&self) -> u32 {
        0
    }

    fn can_resolve(&self, conflict: &Conflict, _header: &FileHeader) -> bool {
        conflict.text(ConflictSide::Yours) == conflict.text(ConflictSide::Theirs)
    }

    fn resolve(&self, conflict: &Conflict) -> Result<String, MergeError> {
        Ok(conflict.text(ConflictSide::Yours).to_owned())
    }
}
