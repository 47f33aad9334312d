use super::{Conflict, ConflictSide, FileHeader, ResolveOption};
use crate::diff::LinePart;
use crate::error::MergeError;

/// Both sides changed the same lines, but different words in them.
///
/// The word-level parts of both sides are applied to the base region.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordResolveOption;

impl ResolveOption for WordResolveOption {
    fn name(&self) -> &'static str {
        "word"
    }

    fn position(&self) -> u32 {
        300
    }

    fn can_resolve(&self, conflict: &Conflict, _header: &FileHeader) -> bool {
        let yours = conflict.line_parts(ConflictSide::Yours);
        let theirs = conflict.line_parts(ConflictSide::Theirs);
        theirs
            .iter()
            .all(|other| yours.iter().all(|own| !own.conflicts_with(other)))
    }

    fn resolve(&self, conflict: &Conflict) -> Result<String, MergeError> {
        let mut parts: Vec<LinePart> = conflict.line_parts(ConflictSide::Yours);
        parts.extend(conflict.line_parts(ConflictSide::Theirs));
        parts.sort_by_key(|part| (part.old.start, part.old.end));

        let base = conflict.base_text();
        let offset = conflict.base_offset();
        let mut merged = String::with_capacity(base.len());
        let mut cursor = 0;
        for part in &parts {
            let start = part.old.start - offset;
            let end = part.old.end - offset;
            let Some(unchanged) = base.get(cursor..start) else {
                return Err(MergeError::ResolveFailed {
                    option: self.name(),
                    start: conflict.base_lines().start,
                    end: conflict.base_lines().end,
                    message: format!("word changes overlap at byte {}", part.old.start),
                });
            };
            merged.push_str(unchanged);
            merged.push_str(&part.text);
            cursor = end;
        }
        merged.push_str(&base[cursor..]);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::test_support::whole_file_conflict;

    #[test]
    fn disjoint_word_edits_merge() {
        let conflict = whole_file_conflict(
            "let a = 1;\n",
            "let a = 2;\n",
            "let b = 1;\n",
        );
        assert!(WordResolveOption.can_resolve(&conflict, &FileHeader::new("x.js")));
        assert_eq!(WordResolveOption.resolve(&conflict).unwrap(), "let b = 2;\n");
    }

    #[test]
    fn same_word_edited_twice_conflicts() {
        let conflict = whole_file_conflict(
            "let a = 1;\n",
            "let a = 2;\n",
            "let a = 3;\n",
        );
        assert!(!WordResolveOption.can_resolve(&conflict, &FileHeader::new("x.js")));
    }
}
