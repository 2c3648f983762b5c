//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `loan`: the loan record, states, triggers, and call parameters
//! - `event`: transition events published after a commit
//! - `error`: the exception taxonomy

pub mod error;
pub mod event;
pub mod loan;

pub use error::{CirculationError, PolicyError, RejectReason};
pub use event::TransitionEvent;
pub use loan::{
    ActorContext, DeliveryInfo, DocumentPid, ItemPid, Loan, LoanPid, LoanState, LocationPid,
    PatronPid, Trigger, TransitionParams,
};
