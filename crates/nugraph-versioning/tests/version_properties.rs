use std::cmp::Ordering;

use nugraph_util::hash::hash_of;
use nugraph_versioning::{SemanticVersion, VersionComparer, VersionComparison};
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    prop_oneof![
        "0|[1-9][0-9]{0,3}",
        "[a-zA-Z][a-zA-Z0-9-]{0,6}",
    ]
}

fn version_string() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(0u32..1000, 2..=4),
        prop::collection::vec(label(), 0..3),
        prop::option::of("[a-zA-Z0-9]{1,6}(\\.[a-zA-Z0-9-]{1,4}){0,2}"),
    )
        .prop_map(|(numbers, labels, metadata)| {
            let mut s = numbers
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(".");
            if !labels.is_empty() {
                s.push('-');
                s.push_str(&labels.join("."));
            }
            if let Some(meta) = metadata {
                s.push('+');
                s.push_str(&meta);
            }
            s
        })
}

fn version() -> impl Strategy<Value = SemanticVersion> {
    version_string().prop_map(|s| SemanticVersion::parse(&s).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn test_parse_display_round_trip(s in version_string()) {
        let parsed = SemanticVersion::parse(&s).unwrap();
        let reparsed = SemanticVersion::parse(&parsed.to_string()).unwrap();
        prop_assert_eq!(&parsed, &reparsed);
        prop_assert_eq!(parsed.release_labels(), reparsed.release_labels());
        prop_assert_eq!(parsed.metadata(), reparsed.metadata());
        let strict = VersionComparer::new(VersionComparison::VersionReleaseMetadata);
        prop_assert!(strict.equals(&parsed, &reparsed));
    }

    #[test]
    fn test_compare_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn test_compare_is_transitive(a in version(), b in version(), c in version()) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
        if a >= b && b >= c {
            prop_assert!(a >= c);
        }
        if a == b {
            prop_assert_eq!(a.cmp(&c), b.cmp(&c));
        }
    }

    #[test]
    fn test_equal_versions_hash_alike(a in version()) {
        let without_meta = SemanticVersion::parse(&a.to_normalized_string()).unwrap();
        prop_assert_eq!(a.cmp(&without_meta), Ordering::Equal);
        prop_assert_eq!(hash_of(&a), hash_of(&without_meta));
    }

    #[test]
    fn test_prerelease_sorts_before_stable(a in version()) {
        let stable = a.stable();
        if a.is_prerelease() {
            prop_assert!(a < stable);
        } else {
            prop_assert_eq!(&a, &stable);
        }
    }
}
