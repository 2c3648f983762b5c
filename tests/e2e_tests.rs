//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! test fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Drives all actions through the dispatcher
//! 3. Generates output CSV
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path checkout and request flows
//! - Extension limits
//! - Item contention and reassignment after return
//! - Invalid transitions and terminal states
//! - Malformed input rows

#[cfg(test)]
mod tests {
    use circulation_engine::core::StandardPolicyConfig;
    use circulation_engine::replay::run_replay;
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a test fixture by replaying input.csv and comparing with expected.csv
    ///
    /// # Arguments
    ///
    /// * `fixture_name` - Name of the fixture directory (e.g., "happy_checkout")
    ///
    /// # Panics
    ///
    /// Panics if the fixture files cannot be read or the output does not
    /// match the expected file.
    fn run_test_fixture(fixture_name: &str) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        run_replay(
            Path::new(&input_path),
            StandardPolicyConfig::default(),
            &mut temp_output,
        )
        .unwrap_or_else(|e| panic!("Failed to replay actions: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {}\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures
    #[rstest]
    #[case("happy_checkout")]
    #[case("request_pickup_flow")]
    #[case("request_no_show")]
    #[case("request_then_cancel")]
    #[case("extension_limit")]
    #[case("item_contention")]
    #[case("invalid_transitions")]
    #[case("malformed_rows")]
    #[case("multiple_patrons")]
    fn test_fixtures(#[case] fixture: &str) {
        run_test_fixture(fixture);
    }
}
