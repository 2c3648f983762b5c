use crate::core::StandardPolicyConfig;
use clap::Parser;
use std::path::PathBuf;

/// Replay circulation actions through the loan state machine
#[derive(Parser, Debug)]
#[command(name = "circulation-engine")]
#[command(about = "Replay circulation actions through the loan state machine", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing action rows
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Loan period length in days
    #[arg(
        long = "loan-days",
        value_name = "DAYS",
        help = "Loan period length in days (default: 30)"
    )]
    pub loan_days: Option<i64>,

    /// Length of one extension in days
    #[arg(
        long = "extension-days",
        value_name = "DAYS",
        help = "Length of one extension in days (default: 15)"
    )]
    pub extension_days: Option<i64>,

    /// Maximum number of extensions per loan
    #[arg(
        long = "max-extensions",
        value_name = "COUNT",
        help = "Maximum number of extensions per loan (default: 2)"
    )]
    pub max_extensions: Option<u32>,
}

impl CliArgs {
    /// Create a StandardPolicyConfig from CLI arguments
    ///
    /// Arguments not provided on the command line fall back to the config
    /// defaults.
    pub fn to_policy_config(&self) -> StandardPolicyConfig {
        let default = StandardPolicyConfig::default();
        StandardPolicyConfig {
            loan_days: self.loan_days.unwrap_or(default.loan_days),
            extension_days: self.extension_days.unwrap_or(default.extension_days),
            max_extensions: self.max_extensions.unwrap_or(default.max_extensions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 30, 15, 2)]
    #[case::custom_loan_days(&["program", "--loan-days", "7", "input.csv"], 7, 15, 2)]
    #[case::custom_extension(&["program", "--extension-days", "3", "input.csv"], 30, 3, 2)]
    #[case::all_custom(
        &["program", "--loan-days", "7", "--extension-days", "3", "--max-extensions", "1", "input.csv"],
        7,
        3,
        1
    )]
    fn test_policy_config_conversion(
        #[case] args: &[&str],
        #[case] loan_days: i64,
        #[case] extension_days: i64,
        #[case] max_extensions: u32,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_policy_config();

        assert_eq!(config.loan_days, loan_days);
        assert_eq!(config.extension_days, extension_days);
        assert_eq!(config.max_extensions, max_extensions);
    }

    #[test]
    fn test_input_path_is_parsed() {
        let parsed = CliArgs::try_parse_from(["program", "actions.csv"]).unwrap();
        assert_eq!(parsed.input_file, PathBuf::from("actions.csv"));
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::non_numeric_days(&["program", "--loan-days", "soon", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
