use std::collections::HashSet;

use nugraph_core::dependency::{
    LibraryDependency, LibraryDependencyTarget, LibraryIncludeFlags, LibraryRange, ReferenceType,
};

#[test]
fn test_library_dependency_defaults() {
    let dep = LibraryDependency::package("Serilog", Some("2.10")).unwrap();
    assert_eq!(dep.include_type, LibraryIncludeFlags::ALL);
    assert_eq!(dep.suppress_parent, LibraryIncludeFlags::DEFAULT_SUPPRESS_PARENT);
    assert_eq!(dep.reference_type, ReferenceType::Direct);
    assert!(!dep.is_fully_suppressed());
    assert!(dep.with_suppress_parent(LibraryIncludeFlags::ALL).is_fully_suppressed());
}

#[test]
fn test_library_dependency_bad_range() {
    assert!(LibraryDependency::package("Serilog", Some("[1.0")).is_err());
}

#[test]
fn test_library_range_set_ignores_case() {
    let mut set = HashSet::new();
    set.insert(LibraryRange::package("Serilog", None));
    set.insert(LibraryRange::package("serilog", None));
    set.insert(LibraryRange::new("serilog", None, LibraryDependencyTarget::PROJECT));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_include_flags_set_algebra() {
    let all = LibraryIncludeFlags::ALL;
    let trimmed = all - LibraryIncludeFlags::DEFAULT_SUPPRESS_PARENT;
    assert!(trimmed.contains(LibraryIncludeFlags::RUNTIME));
    assert!(!trimmed.intersects(LibraryIncludeFlags::ANALYZERS));
    assert_eq!(
        trimmed.to_string(),
        "runtime;compile;native;buildtransitive"
    );
}

#[test]
fn test_target_flags_parse() {
    let target = LibraryDependencyTarget::parse("Package;Project;ExternalProject").unwrap();
    assert_eq!(target, LibraryDependencyTarget::PACKAGE_PROJECT_EXTERNAL);
    assert_eq!(target.to_string(), "package;project;externalproject");
}
