//! Case-insensitive string comparison for package ids and pattern literals.
//!
//! Equality, ordering and [`crate::hash::hash_ignore_case`] all agree: two
//! strings are equal exactly when their lowercase expansions are equal.

use std::cmp::Ordering;

pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    cmp_ignore_case(a, b) == Ordering::Equal
}

/// Case-insensitive `starts_with`.
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    let mut chars = value.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| chars.next() == Some(p))
}
