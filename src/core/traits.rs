//! Boundary traits of the circulation engine
//!
//! This module defines the three seams through which the engine talks to
//! its collaborators:
//! - `PolicyProvider` - host-supplied business decisions consulted by guards
//!   and actions
//! - `LoanStore` - durable storage with optimistic version tokens
//! - `EventSink` - fire-and-forget publication of committed transitions
//!
//! The engine owns none of these concerns; it only orchestrates them.

use crate::types::{
    ActorContext, ItemPid, Loan, LoanPid, LocationPid, PolicyError, Trigger, TransitionEvent,
};
use thiserror::Error;

/// Version token for optimistic concurrency
///
/// `LoanStore::load` returns the current token; `save` commits only if the
/// stored token still matches, converting lost-update races into explicit
/// conflicts.
pub type VersionToken = u64;

/// Host-supplied decision capabilities
///
/// Every guard and action question the engine cannot answer itself goes
/// through this trait. Capabilities are pure queries or decisions from the
/// engine's viewpoint; `item_availability_changed` is the one callback with
/// host-visible side effects (it is invoked from post-actions only, after
/// the transition has committed).
///
/// All methods return `Result` so that a capability failing unexpectedly is
/// distinguishable from a capability answering "no": the former surfaces as
/// a policy-evaluation error, the latter as a typed rejection.
pub trait PolicyProvider {
    /// Whether the given item may circulate at all
    fn item_can_circulate(&self, item_pid: &str) -> Result<bool, PolicyError>;

    /// Loan period length in days for this loan
    fn loan_duration(&self, loan: &Loan) -> Result<i64, PolicyError>;

    /// Extension length in days for this loan
    fn extension_duration(&self, loan: &Loan) -> Result<i64, PolicyError>;

    /// Whether the loan's start/end date pair is acceptable
    fn is_loan_duration_valid(&self, loan: &Loan) -> Result<bool, PolicyError>;

    /// Whether checkout should bind an available item automatically
    fn should_auto_assign_item(&self, loan: &Loan) -> Result<bool, PolicyError>;

    /// Whether the loan may be extended (covers the extension cap and
    /// competing pending requests)
    fn can_extend(&self, loan: &Loan) -> Result<bool, PolicyError>;

    /// Whether a request may be queued for the loan's document
    fn can_be_requested(&self, loan: &Loan) -> Result<bool, PolicyError>;

    /// Whether the actor may fire this trigger on this loan
    ///
    /// The actor context is opaque to the engine and interpreted only here.
    fn is_trigger_permitted(
        &self,
        actor: &ActorContext,
        loan: &Loan,
        trigger: Trigger,
    ) -> Result<bool, PolicyError>;

    /// An available item for the given document, if any (auto-assignment)
    fn available_item_for_document(
        &self,
        document_pid: &str,
    ) -> Result<Option<ItemPid>, PolicyError>;

    /// Home location of an item (default pickup location)
    fn item_location(&self, item_pid: &str) -> Result<Option<LocationPid>, PolicyError>;

    /// Which pending request receives a freed item, if any
    ///
    /// `pending` holds the document's pending loans, oldest request first;
    /// the dispatcher binds the item to the returned loan pid after the
    /// freeing transition has committed. Returning `None` leaves the item
    /// on the shelf.
    fn select_pending_request(
        &self,
        item_pid: &str,
        pending: &[Loan],
    ) -> Result<Option<LoanPid>, PolicyError>;

    /// Availability side-effect callback
    ///
    /// Invoked by post-actions after a commit: `available = false` when an
    /// item leaves the shelf, `true` when it comes back. On `true` the host
    /// may hand the item to the next pending request; the engine only
    /// exposes this hook point.
    fn item_availability_changed(
        &self,
        item_pid: &str,
        available: bool,
    ) -> Result<(), PolicyError>;
}

/// Failures raised by the storage interface
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No record for the given loan pid
    #[error("Loan '{loan_pid}' not found in store")]
    NotFound {
        /// The missing loan pid
        loan_pid: String,
    },

    /// A loan with this pid already exists
    #[error("Loan '{loan_pid}' already exists in store")]
    AlreadyExists {
        /// The duplicated loan pid
        loan_pid: String,
    },

    /// The expected version token no longer matches the stored one
    #[error("Version conflict on loan '{loan_pid}': expected {expected}, found {actual}")]
    Conflict {
        /// The loan pid
        loan_pid: String,
        /// Token the caller read
        expected: VersionToken,
        /// Token currently stored
        actual: VersionToken,
    },

    /// More than one active loan holds the same item
    #[error("Multiple active loans on item '{item_pid}'")]
    MultipleActiveLoans {
        /// The over-committed item
        item_pid: String,
    },

    /// Backend failure (I/O, transport)
    #[error("Store failure: {message}")]
    Backend {
        /// What went wrong
        message: String,
    },
}

/// Durable storage for loan records
///
/// The engine's narrow interface to persistence. `save` carries the version
/// token read by `load`; a mismatch means another writer committed in
/// between and the caller gets a `Conflict` instead of a silent lost update.
///
/// The two query methods support the cross-loan invariant (one active loan
/// per item) and the default request-order reassignment policy.
pub trait LoanStore {
    /// Insert a brand-new loan record
    fn create(&mut self, loan: &Loan) -> Result<VersionToken, StoreError>;

    /// Load a loan together with its current version token
    fn load(&self, loan_pid: &str) -> Result<(Loan, VersionToken), StoreError>;

    /// Persist a loan if the stored version still matches `expected`
    fn save(&mut self, loan: &Loan, expected: VersionToken) -> Result<VersionToken, StoreError>;

    /// All pending loans referencing the given document, oldest request first
    fn pending_loans_for_document(&self, document_pid: &str) -> Result<Vec<Loan>, StoreError>;

    /// The active loan holding the given item, if any
    ///
    /// Fails with `MultipleActiveLoans` when the one-active-loan-per-item
    /// invariant is already violated.
    fn active_loan_for_item(&self, item_pid: &str) -> Result<Option<Loan>, StoreError>;
}

/// Failure raised by an event sink
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Event publication failed: {message}")]
pub struct EmitError {
    /// What went wrong
    pub message: String,
}

impl EmitError {
    /// Create an EmitError
    pub fn new(message: &str) -> Self {
        EmitError {
            message: message.to_string(),
        }
    }
}

/// Publication point for committed transitions
///
/// Fire-and-forget with at-least-once delivery acceptable: the dispatcher
/// logs a failed publish and moves on, since the committed transition is
/// the source of truth and notifications are derivative.
pub trait EventSink {
    /// Publish one transition event
    fn publish(&self, event: &TransitionEvent) -> Result<(), EmitError>;
}
