//! Transition events
//!
//! After a transition commits, the dispatcher publishes a `TransitionEvent`
//! so external collaborators (indexing, notification) can react. Publication
//! is fire-and-forget: a sink failure never unwinds a committed transition.

use crate::types::loan::{LoanPid, LoanState, Trigger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed state change of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// The loan that changed state
    pub loan_pid: LoanPid,

    /// State before the transition
    pub previous_state: LoanState,

    /// The trigger that caused the change
    pub trigger: Trigger,

    /// State after the transition
    pub new_state: LoanState,

    /// When the transition was committed (the transaction date)
    pub timestamp: DateTime<Utc>,
}
