//! CSV format handling for replay actions and loan output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvAction structure for deserialization
//! - Conversion from CSV rows to replay actions
//! - Loan state output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Loan, Trigger};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::io::Write;

/// CSV row structure for deserialization
///
/// Matches the input format with columns:
/// `action,loan,patron,document,item,pickup,date`. Every column after
/// `action` is optional; which ones are required depends on the action.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAction {
    pub action: String,
    pub loan: Option<String>,
    pub patron: Option<String>,
    pub document: Option<String>,
    pub item: Option<String>,
    pub pickup: Option<String>,
    pub date: Option<String>,
}

/// What a replay row asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Register an item with the catalogue (not a loan action)
    AddItem,
    /// Fire a trigger, creating the loan first for request/checkout rows
    /// naming an unknown loan pid
    Trigger(Trigger),
}

/// A validated replay action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub loan: Option<String>,
    pub patron: Option<String>,
    pub document: Option<String>,
    pub item: Option<String>,
    pub pickup: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty()).map(|s| s.trim().to_string())
}

/// Convert a CsvAction to an ActionRecord
///
/// This function:
/// - Parses the action column into `add_item` or a trigger name
/// - Normalizes empty columns to absent
/// - Parses the date column (`YYYY-MM-DD`; replay transactions happen at
///   noon UTC on that day)
/// - Validates that the columns the action needs are present
///
/// # Arguments
///
/// * `csv_action` - The deserialized CSV row
///
/// # Returns
///
/// Result containing either:
/// - Ok(ActionRecord) - Successfully converted action
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_action(csv_action: CsvAction) -> Result<ActionRecord, String> {
    let action = csv_action.action.trim().to_lowercase();
    let kind = if action == "add_item" {
        ActionKind::AddItem
    } else {
        match action.parse::<Trigger>() {
            Ok(trigger) => ActionKind::Trigger(trigger),
            Err(_) => return Err(format!("Invalid action: '{}'", csv_action.action)),
        }
    };

    let loan = non_empty(csv_action.loan);
    let patron = non_empty(csv_action.patron);
    let document = non_empty(csv_action.document);
    let item = non_empty(csv_action.item);
    let pickup = non_empty(csv_action.pickup);

    let date = match non_empty(csv_action.date) {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(day) => day.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc()),
            Err(_) => return Err(format!("Invalid date '{}'", raw)),
        },
        None => None,
    };

    match &kind {
        ActionKind::AddItem => {
            if item.is_none() || document.is_none() {
                return Err("add_item requires item and document columns".to_string());
            }
        }
        ActionKind::Trigger(trigger) => {
            let loan_pid = loan
                .as_deref()
                .ok_or_else(|| format!("{} requires a loan column", trigger))?;
            // Creation rows also need the loan's identity columns.
            if matches!(trigger, Trigger::Request | Trigger::Checkout)
                && (patron.is_none() || document.is_none())
            {
                return Err(format!(
                    "{} for loan '{}' requires patron and document columns",
                    trigger, loan_pid
                ));
            }
        }
    }

    Ok(ActionRecord {
        kind,
        loan,
        patron,
        document,
        item,
        pickup,
        date,
    })
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Write loan states to CSV format
///
/// Writes loans with columns:
/// `loan,state,patron,document,item,start_date,end_date,extensions`.
/// Loans are sorted by pid for deterministic output; absent fields are
/// rendered as empty columns.
///
/// # Arguments
///
/// * `loans` - Slice of loan states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_loans_csv(loans: &[Loan], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "loan",
            "state",
            "patron",
            "document",
            "item",
            "start_date",
            "end_date",
            "extensions",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_loans = loans.to_vec();
    sorted_loans.sort_by(|a, b| a.pid.cmp(&b.pid));

    for loan in sorted_loans {
        writer
            .write_record(&[
                loan.pid.clone(),
                loan.state.to_string(),
                loan.patron_pid.clone(),
                loan.document_pid.clone(),
                loan.item_pid.clone().unwrap_or_default(),
                format_date(loan.start_date),
                format_date(loan.end_date),
                loan.extension_count.to_string(),
            ])
            .map_err(|e| format!("Failed to write loan record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanState;
    use rstest::rstest;

    fn row(action: &str, loan: &str, patron: &str, document: &str, item: &str) -> CsvAction {
        let opt = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        CsvAction {
            action: action.to_string(),
            loan: opt(loan),
            patron: opt(patron),
            document: opt(document),
            item: opt(item),
            pickup: None,
            date: None,
        }
    }

    #[rstest]
    #[case("request", Trigger::Request)]
    #[case("checkout", Trigger::Checkout)]
    #[case("CHECKIN", Trigger::Checkin)] // case insensitive
    #[case("extend", Trigger::Extend)]
    #[case("validate", Trigger::Validate)]
    #[case("deliver", Trigger::Deliver)]
    #[case("receive", Trigger::Receive)]
    #[case("cancel", Trigger::Cancel)]
    fn test_convert_trigger_actions(#[case] action: &str, #[case] expected: Trigger) {
        let result = convert_csv_action(row(action, "loan-1", "patron-1", "doc-1", ""));
        assert_eq!(result.unwrap().kind, ActionKind::Trigger(expected));
    }

    #[test]
    fn test_convert_add_item() {
        let mut csv_action = row("add_item", "", "", "doc-1", "item-1");
        csv_action.pickup = Some("loc-main".to_string());

        let record = convert_csv_action(csv_action).unwrap();
        assert_eq!(record.kind, ActionKind::AddItem);
        assert_eq!(record.item.as_deref(), Some("item-1"));
        assert_eq!(record.document.as_deref(), Some("doc-1"));
        assert_eq!(record.pickup.as_deref(), Some("loc-main"));
    }

    #[test]
    fn test_convert_parses_date_at_noon_utc() {
        let mut csv_action = row("checkin", "loan-1", "", "", "");
        csv_action.date = Some("2024-03-05".to_string());

        let record = convert_csv_action(csv_action).unwrap();
        let date = record.date.unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-05T12:00:00+00:00");
    }

    #[test]
    fn test_convert_normalizes_empty_columns() {
        let mut csv_action = row("checkin", "loan-1", "", "", "");
        csv_action.patron = Some("   ".to_string());

        let record = convert_csv_action(csv_action).unwrap();
        assert_eq!(record.patron, None);
    }

    #[rstest]
    #[case::unknown_action(row("vanish", "loan-1", "p", "d", ""), "Invalid action")]
    #[case::trigger_without_loan(row("checkin", "", "", "", ""), "requires a loan column")]
    #[case::request_without_patron(row("request", "loan-1", "", "doc-1", ""), "requires patron and document")]
    #[case::checkout_without_document(row("checkout", "loan-1", "patron-1", "", ""), "requires patron and document")]
    #[case::add_item_without_item(row("add_item", "", "", "doc-1", ""), "requires item and document")]
    fn test_convert_errors(#[case] csv_action: CsvAction, #[case] expected_error: &str) {
        let result = convert_csv_action(csv_action);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[test]
    fn test_convert_rejects_bad_date() {
        let mut csv_action = row("checkin", "loan-1", "", "", "");
        csv_action.date = Some("03/05/2024".to_string());

        let result = convert_csv_action(csv_action);
        assert!(result.unwrap_err().contains("Invalid date"));
    }

    #[test]
    fn test_write_loans_csv_sorted_and_complete() {
        let mut second = Loan::new("loan-2", "patron-2", "doc-1", LoanState::Pending);
        second.extension_count = 0;

        let mut first = Loan::new("loan-1", "patron-1", "doc-1", LoanState::ItemOnLoan);
        first.item_pid = Some("item-1".to_string());
        first.start_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        first.end_date = NaiveDate::from_ymd_opt(2024, 3, 31);
        first.extension_count = 1;

        let mut output = Vec::new();
        write_loans_csv(&[second, first], &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(
            output_str,
            "loan,state,patron,document,item,start_date,end_date,extensions\n\
             loan-1,ITEM_ON_LOAN,patron-1,doc-1,item-1,2024-03-01,2024-03-31,1\n\
             loan-2,PENDING,patron-2,doc-1,,,,0\n"
        );
    }

    #[test]
    fn test_write_loans_csv_empty() {
        let mut output = Vec::new();
        write_loans_csv(&[], &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "loan,state,patron,document,item,start_date,end_date,extensions\n"
        );
    }
}
