//! Property tests for the three-way merge.
//!
//! - A side identical to the base never introduces conflicts, and the merge
//!   yields the other side verbatim.
//! - Two identical versions always merge to that version.
//! - Regions tile the base: they are contiguous, ordered and cover every
//!   base line exactly once.

#![allow(clippy::all, clippy::pedantic, clippy::nursery)]

use proptest::prelude::*;

use super::{MergeData, MergeOutcome, MergeRegion};
use crate::resolve::{FileHeader, ResolveOptions};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Short texts over a tiny line alphabet, so versions share many lines and
/// the diffs interleave.
fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d e", "f g h"]), 0..12)
        .prop_map(|lines| lines.into_iter().map(|line| format!("{line}\n")).collect())
}

fn merge(base: &str, yours: &str, theirs: &str) -> MergeData {
    MergeData::new(FileHeader::new("prop.txt"), base, yours, theirs)
}

fn resolve(data: &MergeData) -> MergeOutcome {
    data.auto_resolve(&ResolveOptions::builtin()).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn unchanged_theirs_yields_yours(base in arb_text(), yours in arb_text()) {
        let data = merge(&base, &yours, &base);
        prop_assert_eq!(data.conflict_count(), 0);
        prop_assert_eq!(resolve(&data), MergeOutcome::Resolved(yours));
    }

    #[test]
    fn unchanged_yours_yields_theirs(base in arb_text(), theirs in arb_text()) {
        let data = merge(&base, &base, &theirs);
        prop_assert_eq!(data.conflict_count(), 0);
        prop_assert_eq!(resolve(&data), MergeOutcome::Resolved(theirs));
    }

    #[test]
    fn identical_versions_merge_to_themselves(base in arb_text(), version in arb_text()) {
        let data = merge(&base, &version, &version);
        prop_assert_eq!(resolve(&data), MergeOutcome::Resolved(version));
    }

    #[test]
    fn regions_tile_the_base(base in arb_text(), yours in arb_text(), theirs in arb_text()) {
        let data = merge(&base, &yours, &theirs);
        let line_count = base.split_inclusive('\n').count();
        let mut cursor = 0;
        for region in data.regions() {
            let lines = region.base_lines();
            prop_assert_eq!(lines.start, cursor);
            if let MergeRegion::Unchanged { .. } = region {
                prop_assert!(!lines.is_empty());
            }
            cursor = lines.end;
        }
        prop_assert_eq!(cursor, line_count);
    }
}
