//! Error types for the circulation engine
//!
//! This module defines all typed failures a transition can surface.
//!
//! # Error Classes
//!
//! - **Structural**: loan not found, no such transition in the graph —
//!   always fatal to the call, never retried.
//! - **Policy rejection**: a guard or capability explicitly disallows the
//!   action — fatal to the call, but carries a machine-readable reason.
//! - **Infrastructure**: persistence conflict or policy-provider failure —
//!   retryable by the caller; no partial state is visible afterwards.

use crate::types::loan::{LoanState, Trigger};
use std::fmt;
use thiserror::Error;

/// Machine-readable reason code carried by a policy rejection
///
/// Callers can branch on the code; the display string is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The actor is not allowed to fire this trigger
    TriggerNotPermitted,

    /// The transition needs an item bound to the loan and none is
    ItemNotBound,

    /// The caller named an item different from the one bound to the loan
    ItemMismatch,

    /// The extension policy refused (limit reached or item requested)
    ExtensionDenied,

    /// The duration policy refused the start/end date pair
    InvalidLoanDuration,
}

impl RejectReason {
    /// Stable reason code for machine consumption
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::TriggerNotPermitted => "trigger_not_permitted",
            RejectReason::ItemNotBound => "item_not_bound",
            RejectReason::ItemMismatch => "item_mismatch",
            RejectReason::ExtensionDenied => "extension_denied",
            RejectReason::InvalidLoanDuration => "invalid_loan_duration",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Main error type for the circulation engine
///
/// Each variant carries the loan id and the offending trigger/state pair
/// where applicable, for diagnosability.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CirculationError {
    /// No loan record exists for the given pid
    ///
    /// Structural: fatal to the call.
    #[error("Loan '{loan_pid}' not found")]
    LoanNotFound {
        /// The loan pid that was not found
        loan_pid: String,
    },

    /// The (state, trigger) pair has no entry in the transition graph
    ///
    /// Structural: this is the only place illegal transitions are detected.
    #[error("Trigger '{trigger}' is not a valid transition from state '{state}' for loan '{loan_pid}'")]
    InvalidTransition {
        /// Loan pid
        loan_pid: String,
        /// Current state of the loan
        state: LoanState,
        /// The trigger that was requested
        trigger: Trigger,
    },

    /// A guard or policy capability explicitly disallowed the transition
    ///
    /// Carries a machine-readable reason code rather than a generic error.
    #[error("Transition '{trigger}' rejected for loan '{loan_pid}': {reason}")]
    TransitionRejected {
        /// Loan pid
        loan_pid: String,
        /// The trigger that was rejected
        trigger: Trigger,
        /// Why the policy said no
        reason: RejectReason,
    },

    /// The item bound (or about to be bound) cannot circulate
    #[error("Item '{item_pid}' is not available; transition '{trigger}' failed for loan '{loan_pid}'")]
    ItemNotAvailable {
        /// Loan pid
        loan_pid: String,
        /// The unavailable item
        item_pid: String,
        /// The trigger that failed
        trigger: Trigger,
    },

    /// Auto-assignment found no available item for the loan's document
    #[error("No available item for document '{document_pid}' on loan '{loan_pid}'")]
    NoAvailableItem {
        /// Loan pid
        loan_pid: String,
        /// The document the loan references
        document_pid: String,
    },

    /// More than one active loan holds the same item
    ///
    /// Violation of the one-active-loan-per-item invariant, reported when
    /// detected during an availability check.
    #[error("Multiple active loans on item '{item_pid}'")]
    MultipleLoansOnItem {
        /// The over-committed item
        item_pid: String,
    },

    /// The request policy refused to queue a request for this record
    #[error("Document '{document_pid}' cannot be requested (loan '{loan_pid}')")]
    RecordCannotBeRequested {
        /// Loan pid
        loan_pid: String,
        /// The document that cannot be requested
        document_pid: String,
    },

    /// Item replacement refused
    ///
    /// `replace_item` lives outside the state machine; its refusals carry
    /// their own variant instead of borrowing a trigger.
    #[error("Cannot replace item on loan '{loan_pid}': {message}")]
    ItemReplaceDenied {
        /// Loan pid
        loan_pid: String,
        /// Why the replacement was refused
        message: String,
    },

    /// The storage interface failed to load or save the loan
    ///
    /// Infrastructure: retryable when caused by a version conflict; the
    /// in-memory state change is discarded and no partial commit is visible.
    #[error("Persistence failure for loan '{loan_pid}': {message}")]
    Persistence {
        /// Loan pid
        loan_pid: String,
        /// What went wrong
        message: String,
        /// Whether the caller may retry (version conflicts are retryable)
        retryable: bool,
    },

    /// A policy capability failed unexpectedly while being evaluated
    ///
    /// Distinct from a policy-rejects-the-transition decision.
    #[error("Policy capability '{capability}' failed for loan '{loan_pid}': {message}")]
    PolicyEvaluation {
        /// Loan pid
        loan_pid: String,
        /// The capability that failed
        capability: String,
        /// What went wrong
        message: String,
    },
}

impl CirculationError {
    /// Create a LoanNotFound error
    pub fn loan_not_found(loan_pid: &str) -> Self {
        CirculationError::LoanNotFound {
            loan_pid: loan_pid.to_string(),
        }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(loan_pid: &str, state: LoanState, trigger: Trigger) -> Self {
        CirculationError::InvalidTransition {
            loan_pid: loan_pid.to_string(),
            state,
            trigger,
        }
    }

    /// Create a TransitionRejected error
    pub fn rejected(loan_pid: &str, trigger: Trigger, reason: RejectReason) -> Self {
        CirculationError::TransitionRejected {
            loan_pid: loan_pid.to_string(),
            trigger,
            reason,
        }
    }

    /// Create an ItemNotAvailable error
    pub fn item_not_available(loan_pid: &str, item_pid: &str, trigger: Trigger) -> Self {
        CirculationError::ItemNotAvailable {
            loan_pid: loan_pid.to_string(),
            item_pid: item_pid.to_string(),
            trigger,
        }
    }

    /// Create a NoAvailableItem error
    pub fn no_available_item(loan_pid: &str, document_pid: &str) -> Self {
        CirculationError::NoAvailableItem {
            loan_pid: loan_pid.to_string(),
            document_pid: document_pid.to_string(),
        }
    }

    /// Create a MultipleLoansOnItem error
    pub fn multiple_loans_on_item(item_pid: &str) -> Self {
        CirculationError::MultipleLoansOnItem {
            item_pid: item_pid.to_string(),
        }
    }

    /// Create a RecordCannotBeRequested error
    pub fn record_cannot_be_requested(loan_pid: &str, document_pid: &str) -> Self {
        CirculationError::RecordCannotBeRequested {
            loan_pid: loan_pid.to_string(),
            document_pid: document_pid.to_string(),
        }
    }

    /// Create an ItemReplaceDenied error
    pub fn item_replace_denied(loan_pid: &str, message: &str) -> Self {
        CirculationError::ItemReplaceDenied {
            loan_pid: loan_pid.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Persistence error
    pub fn persistence(loan_pid: &str, message: &str, retryable: bool) -> Self {
        CirculationError::Persistence {
            loan_pid: loan_pid.to_string(),
            message: message.to_string(),
            retryable,
        }
    }

    /// Create a PolicyEvaluation error
    pub fn policy_evaluation(loan_pid: &str, capability: &str, message: &str) -> Self {
        CirculationError::PolicyEvaluation {
            loan_pid: loan_pid.to_string(),
            capability: capability.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the caller may retry the call as-is
    ///
    /// Only infrastructure failures qualify; structural failures and policy
    /// rejections never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CirculationError::Persistence {
                retryable: true,
                ..
            }
        )
    }
}

/// Failure raised by a policy capability
///
/// `Unconfigured` is what the shipped stub policy raises for everything,
/// forcing the host to supply a real implementation. `Failed` covers
/// transport or evaluation failures in a configured provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The capability has no host-supplied implementation
    #[error("Policy capability '{capability}' is not configured")]
    Unconfigured {
        /// The capability that was invoked
        capability: String,
    },

    /// The capability failed while being evaluated
    #[error("Policy capability '{capability}' failed: {message}")]
    Failed {
        /// The capability that failed
        capability: String,
        /// What went wrong
        message: String,
    },
}

impl PolicyError {
    /// Create an Unconfigured error
    pub fn unconfigured(capability: &str) -> Self {
        PolicyError::Unconfigured {
            capability: capability.to_string(),
        }
    }

    /// Create a Failed error
    pub fn failed(capability: &str, message: &str) -> Self {
        PolicyError::Failed {
            capability: capability.to_string(),
            message: message.to_string(),
        }
    }

    /// Name of the capability involved
    pub fn capability(&self) -> &str {
        match self {
            PolicyError::Unconfigured { capability } => capability,
            PolicyError::Failed { capability, .. } => capability,
        }
    }
}
