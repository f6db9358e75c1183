//! Tests for output formatting helpers

use fedsearch::cli::output::{format_duration, format_relative_time};

#[test]
fn test_format_duration_ranges() {
    assert_eq!(format_duration(0.0), "0ms");
    assert_eq!(format_duration(0.042), "42ms");
    assert_eq!(format_duration(2.0), "2.00s");
    assert_eq!(format_duration(125.0), "2m 5.0s");
}

#[test]
fn test_format_relative_time_days() {
    let then = chrono::Utc::now() - chrono::Duration::days(3);
    assert_eq!(format_relative_time(&then), "3d ago");
}
