//! Identity and equality primitives
//!
//! Two questions are asked about pairs of entities:
//! - [`Identity::identity_matches`]: do they denote the same logical object?
//!   Used to pick merge targets and to find duplicates.
//! - [`FormatEq::equals`]: are they semantically identical for a target SQL
//!   format? Used by diffing consumers.
//!
//! Names compare ASCII case-insensitively everywhere. This does not model
//! engine-specific quoting or case folding; callers needing that must wrap
//! these primitives.

use crate::enums::SqlFormat;

/// Case-insensitive (ASCII) name comparison
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Same-logical-entity predicate
pub trait Identity {
    fn identity_matches(&self, other: &Self) -> bool;
}

/// Semantic equality parametrized by target SQL format
pub trait FormatEq {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool;
}

/// Identity match where either side may be absent. Absent never matches.
pub fn matches_opt<T: Identity>(a: Option<&T>, b: Option<&T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.identity_matches(b),
        _ => false,
    }
}

/// Format equality where either side may be absent. Absent is never equal.
pub fn equals_opt<T: FormatEq>(a: Option<&T>, b: Option<&T>, format: SqlFormat) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equals(b, format),
        _ => false,
    }
}

/// Pairwise case-insensitive comparison of two name lists
pub fn name_lists_match<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| names_match(x.as_ref(), y.as_ref()))
}

/// Order-independent case-insensitive comparison of two name sets
pub fn name_sets_match<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    fn contains<T: AsRef<str>>(haystack: &[T], needle: &str) -> bool {
        haystack.iter().any(|h| names_match(h.as_ref(), needle))
    }

    a.iter().all(|x| contains(b, x.as_ref())) && b.iter().all(|y| contains(a, y.as_ref()))
}
