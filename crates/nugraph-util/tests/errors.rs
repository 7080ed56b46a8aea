use nugraph_util::errors::NuGraphError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = NuGraphError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_parse_error_display() {
    let err = NuGraphError::parse("'1.x' is not a valid version string");
    assert_eq!(
        err.to_string(),
        "Parse error: '1.x' is not a valid version string"
    );
}

#[test]
fn test_resolution_error_display() {
    let err = NuGraphError::Resolution {
        message: "no target frameworks".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Dependency resolution failed: no target frameworks"
    );
}

#[test]
fn test_provider_error_display() {
    let err = NuGraphError::provider("nuget.org", "503 Service Unavailable");
    assert_eq!(
        err.to_string(),
        "Package source 'nuget.org' failed: 503 Service Unavailable"
    );
}

#[test]
fn test_cancelled_display() {
    assert_eq!(NuGraphError::Cancelled.to_string(), "Operation was cancelled");
}

#[test]
fn test_config_and_pattern_display() {
    let err = NuGraphError::Config {
        message: "unknown conflict policy".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: unknown conflict policy");

    let err = NuGraphError::Pattern {
        message: "unterminated token".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid pattern: unterminated token");
}

#[test]
fn test_error_converts_into_miette_report() {
    let report: miette::Report = NuGraphError::Cancelled.into();
    assert!(report.to_string().contains("cancelled"));
}
