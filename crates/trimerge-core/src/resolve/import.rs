use tracing::warn;

use super::{Conflict, ConflictSide, FileHeader, ResolveOption};
use crate::error::MergeError;
use crate::imports::{ImportMap, is_import_block};
use crate::text::LineEnding;

/// Extensions treated as ES modules when none are configured.
pub const DEFAULT_IMPORT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

/// Both sides only changed ES module import declarations.
///
/// The result keeps every import of yours and adds the imports of theirs
/// that yours does not already have, with all bindings of one module
/// combined into a single declaration.
#[derive(Clone, Debug)]
pub struct ImportResolveOption {
    extensions: Vec<String>,
}

impl ImportResolveOption {
    #[must_use]
    pub const fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    fn handles(&self, header: &FileHeader) -> bool {
        header
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn failed(&self, conflict: &Conflict, err: &MergeError) -> MergeError {
        MergeError::ResolveFailed {
            option: self.name(),
            start: conflict.base_lines().start,
            end: conflict.base_lines().end,
            message: err.to_string(),
        }
    }
}

impl Default for ImportResolveOption {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORT_EXTENSIONS.iter().map(|ext| (*ext).to_owned()).collect())
    }
}

impl ResolveOption for ImportResolveOption {
    fn name(&self) -> &'static str {
        "import"
    }

    fn position(&self) -> u32 {
        200
    }

    fn can_resolve(&self, conflict: &Conflict, header: &FileHeader) -> bool {
        if !self.handles(header) {
            return false;
        }
        [ConflictSide::Yours, ConflictSide::Theirs]
            .into_iter()
            .all(|side| match is_import_block(conflict.text(side)) {
                Ok(imports_only) => imports_only,
                Err(e) => {
                    warn!(path = %header.path().display(), error = %e, "import check failed");
                    false
                }
            })
    }

    fn resolve(&self, conflict: &Conflict) -> Result<String, MergeError> {
        let yours = conflict.text(ConflictSide::Yours);
        let mut imports = ImportMap::parse(yours).map_err(|e| self.failed(conflict, &e))?;
        let theirs = ImportMap::parse(conflict.text(ConflictSide::Theirs))
            .map_err(|e| self.failed(conflict, &e))?;
        imports.combine_non_duplicates(&theirs);

        let ending = LineEnding::detect(yours)
            .or_else(|| LineEnding::detect(conflict.text(ConflictSide::Theirs)))
            .unwrap_or(LineEnding::Unix);
        let terminator = ending.as_str();
        let mut combined = ending.normalize(&imports.render());

        // Blank lines trailing the import block stay in place; a block
        // without final terminator keeps none.
        let mut rest = yours;
        let mut trailing = 0;
        while let Some(stripped) = rest.strip_suffix(terminator) {
            trailing += 1;
            rest = stripped;
        }
        if trailing == 0 && combined.ends_with(terminator) {
            combined.truncate(combined.len() - terminator.len());
        }
        for _ in 1..trailing {
            combined.push_str(terminator);
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::test_support::whole_file_conflict;

    const BASE: &str = "import { a } from \"m\";\n";

    #[test]
    fn combines_both_sides() {
        let conflict = whole_file_conflict(
            BASE,
            "import { a, b } from \"m\";\n",
            "import { a } from \"m\";\nimport { c } from \"n\";\n",
        );
        let option = ImportResolveOption::default();
        assert!(option.can_resolve(&conflict, &FileHeader::new("lib/x.js")));
        assert_eq!(
            option.resolve(&conflict).unwrap(),
            "import { a, b } from \"m\";\nimport { c } from \"n\";\n"
        );
    }

    #[test]
    fn only_for_configured_extensions() {
        let conflict = whole_file_conflict(BASE, "import { b } from \"m\";\n", "import { c } from \"m\";\n");
        let option = ImportResolveOption::new(vec!["js".to_owned()]);
        assert!(option.can_resolve(&conflict, &FileHeader::new("x.js")));
        assert!(!option.can_resolve(&conflict, &FileHeader::new("x.ts")));
        assert!(!option.can_resolve(&conflict, &FileHeader::new("README")));
    }

    #[test]
    fn statements_other_than_imports_are_rejected() {
        let conflict = whole_file_conflict(BASE, "import { b } from \"m\";\nrun();\n", "import { c } from \"m\";\n");
        assert!(!ImportResolveOption::default().can_resolve(&conflict, &FileHeader::new("x.js")));
    }

    #[test]
    fn windows_line_endings_are_kept() {
        let conflict = whole_file_conflict(
            "import { a } from \"m\";\r\n",
            "import { a, b } from \"m\";\r\n\r\n",
            "import { a, c } from \"m\";\r\n",
        );
        assert_eq!(
            ImportResolveOption::default().resolve(&conflict).unwrap(),
            "import { a, b, c } from \"m\";\r\n\r\n"
        );
    }

    #[test]
    fn no_final_terminator_is_added() {
        let conflict = whole_file_conflict(
            "import { a } from \"m\";",
            "import { a, b } from \"m\";",
            "import { a, c } from \"m\";",
        );
        assert_eq!(
            ImportResolveOption::default().resolve(&conflict).unwrap(),
            "import { a, b, c } from \"m\";"
        );
    }

    #[test]
    fn keeps_trailing_blank_lines_of_yours() {
        let conflict = whole_file_conflict(BASE, "import { b } from \"m\";\n\n", "import { c } from \"m\";\n");
        assert_eq!(
            ImportResolveOption::default().resolve(&conflict).unwrap(),
            "import { b, c } from \"m\";\n\n"
        );
    }
}
