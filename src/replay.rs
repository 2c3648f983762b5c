//! Replay pipeline
//!
//! Drives a CSV file of circulation actions through the dispatcher and
//! writes the final loan states as CSV. This is the orchestration layer of
//! the CLI; it delegates:
//! - CSV parsing to `ActionReader` (iterator interface)
//! - Transitions to `LoanDispatcher` (business logic)
//! - CSV output to `csv_format::write_loans_csv` (format handling)
//!
//! # Error Handling
//!
//! Fatal errors (file not found, output write failure) are returned.
//! Row-level errors - malformed rows as well as rejected transitions - are
//! reported to stderr and processing continues.

use crate::core::{
    LoanDispatcher, MemoryLoanStore, NullSink, StandardPolicy, StandardPolicyConfig,
};
use crate::io::csv_format::{write_loans_csv, ActionKind, ActionRecord};
use crate::io::reader::ActionReader;
use crate::types::{ActorContext, CirculationError, Trigger, TransitionParams};
use std::io::Write;
use std::path::Path;

/// Counters reported after a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Rows applied successfully (including `add_item` rows)
    pub applied: usize,

    /// Rows skipped: malformed, or rejected by the engine
    pub skipped: usize,
}

/// Replay a CSV action file and write the final loan states
///
/// # Arguments
///
/// * `input_path` - Path to the input CSV file
/// * `config` - Configuration for the reference policy
/// * `output` - Writer receiving the final loan states as CSV
///
/// # Returns
///
/// * `Ok(ReplaySummary)` with row counters when the run completed
/// * `Err(String)` on fatal errors (unreadable input, output failure)
pub fn run_replay(
    input_path: &Path,
    config: StandardPolicyConfig,
    output: &mut dyn Write,
) -> Result<ReplaySummary, String> {
    let reader = ActionReader::new(input_path)?;
    let mut dispatcher = LoanDispatcher::new(
        MemoryLoanStore::new(),
        StandardPolicy::new(config),
        NullSink::new(),
    );

    let mut summary = ReplaySummary::default();
    for result in reader {
        match result {
            Ok(record) => match apply_action(&mut dispatcher, &record) {
                Ok(()) => summary.applied += 1,
                Err(e) => {
                    eprintln!("Action error: {}", e);
                    summary.skipped += 1;
                }
            },
            Err(e) => {
                eprintln!("CSV parsing error: {}", e);
                summary.skipped += 1;
            }
        }
    }

    let loans = dispatcher.store().all_loans();
    write_loans_csv(&loans, output)?;

    Ok(summary)
}

/// Apply one validated action to the dispatcher
///
/// `request` and `checkout` rows naming an unknown loan pid create the
/// loan; every other row is a plain transition. `add_item` rows register
/// the item with the reference policy, with the pickup column as its home
/// location.
fn apply_action(
    dispatcher: &mut LoanDispatcher<MemoryLoanStore, StandardPolicy, NullSink>,
    record: &ActionRecord,
) -> Result<(), CirculationError> {
    let actor = ActorContext::default();
    let params = TransitionParams {
        transaction_date: record.date,
        item_pid: record.item.clone(),
        pickup_location_pid: record.pickup.clone(),
        delivery_method: None,
    };

    let trigger = match &record.kind {
        ActionKind::AddItem => {
            // Validated by the converter: item and document are present.
            if let (Some(item), Some(document)) = (&record.item, &record.document) {
                dispatcher
                    .policy()
                    .register_item(item, document, record.pickup.as_deref());
            }
            return Ok(());
        }
        ActionKind::Trigger(trigger) => *trigger,
    };

    // The converter guarantees a loan pid for trigger rows.
    let loan_pid = record.loan.clone().unwrap_or_default();
    let exists = dispatcher.loan(&loan_pid).is_ok();

    match (trigger, exists) {
        (Trigger::Request, false) => {
            let (patron, document) = identity(record);
            dispatcher.request(&loan_pid, &patron, &document, &actor, params)?;
        }
        (Trigger::Checkout, false) => {
            let (patron, document) = identity(record);
            dispatcher.checkout_new(&loan_pid, &patron, &document, &actor, params)?;
        }
        (trigger, _) => {
            dispatcher.apply(&loan_pid, trigger, &actor, params)?;
        }
    }
    Ok(())
}

fn identity(record: &ActionRecord) -> (String, String) {
    (
        record.patron.clone().unwrap_or_default(),
        record.document.clone().unwrap_or_default(),
    )
}
