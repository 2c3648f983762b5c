//! Loan-related types for the circulation engine
//!
//! This module defines the loan record, the closed set of loan states, the
//! triggers that move a loan between states, and the parameter/actor
//! structures passed through the dispatcher.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loan identifier
///
/// Opaque persistent identifier, unique and immutable once assigned.
pub type LoanPid = String;

/// Item identifier (a specific physical copy)
pub type ItemPid = String;

/// Patron identifier
pub type PatronPid = String;

/// Document identifier (the bibliographic record an item belongs to)
pub type DocumentPid = String;

/// Location identifier (library/branch)
pub type LocationPid = String;

/// Loan states
///
/// The closed enumeration of states a loan can be in. Transitions between
/// states happen exclusively through the dispatcher; terminal states accept
/// no further triggers and are retained as history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanState {
    /// Request created, awaiting fulfillment
    Pending,

    /// Item checked out to the patron
    ItemOnLoan,

    /// Item travelling to the patron's pickup location
    ItemInTransitForPickup,

    /// Item travelling back to its owning location
    ItemInTransitToHouse,

    /// Item checked in at its owning location (terminal)
    ItemReturned,

    /// Request cancelled before fulfillment (terminal)
    Cancelled,

    /// Loan closed after the item travelled back home (terminal)
    Completed,
}

impl LoanState {
    /// Whether this state accepts no further triggers
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanState::ItemReturned | LoanState::Cancelled | LoanState::Completed
        )
    }

    /// Whether the loan currently ties up a physical item
    ///
    /// Active states are the ones counted by the one-active-loan-per-item
    /// invariant: the item is either with the patron or travelling on the
    /// loan's behalf.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LoanState::ItemOnLoan
                | LoanState::ItemInTransitForPickup
                | LoanState::ItemInTransitToHouse
        )
    }

    /// Canonical wire name of the state (e.g. `ITEM_ON_LOAN`)
    pub fn as_str(self) -> &'static str {
        match self {
            LoanState::Pending => "PENDING",
            LoanState::ItemOnLoan => "ITEM_ON_LOAN",
            LoanState::ItemInTransitForPickup => "ITEM_IN_TRANSIT_FOR_PICKUP",
            LoanState::ItemInTransitToHouse => "ITEM_IN_TRANSIT_TO_HOUSE",
            LoanState::ItemReturned => "ITEM_RETURNED",
            LoanState::Cancelled => "CANCELLED",
            LoanState::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triggers accepted by the dispatcher
///
/// A trigger is a named requested action that may move a loan between
/// states. `Request` and `Checkout` double as creation actions: a loan is
/// born in `PENDING` when created by a request, or directly in
/// `ITEM_ON_LOAN` when created by an immediate checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Create a request for a document or item
    Request,
    /// Hand the item to the patron
    Checkout,
    /// Take the item back from the patron
    Checkin,
    /// Cancel a request before fulfillment
    Cancel,
    /// Extend the loan period of an active loan
    Extend,
    /// Validate a pending request and dispatch the item toward pickup
    Validate,
    /// Deliver the in-transit item to the patron
    Deliver,
    /// Receive the in-transit item at its owning location
    Receive,
}

impl Trigger {
    /// Canonical lowercase name of the trigger
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Request => "request",
            Trigger::Checkout => "checkout",
            Trigger::Checkin => "checkin",
            Trigger::Cancel => "cancel",
            Trigger::Extend => "extend",
            Trigger::Validate => "validate",
            Trigger::Deliver => "deliver",
            Trigger::Receive => "receive",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "request" => Ok(Trigger::Request),
            "checkout" => Ok(Trigger::Checkout),
            "checkin" => Ok(Trigger::Checkin),
            "cancel" => Ok(Trigger::Cancel),
            "extend" => Ok(Trigger::Extend),
            "validate" => Ok(Trigger::Validate),
            "deliver" => Ok(Trigger::Deliver),
            "receive" => Ok(Trigger::Receive),
            other => Err(format!("Unknown trigger '{}'", other)),
        }
    }
}

/// Delivery descriptor attached at request time
///
/// Read-only to the engine; only policies interpret the method string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    /// Host-defined delivery method (e.g. "pickup", "mail")
    pub method: Option<String>,

    /// Where the patron collects the item
    pub pickup_location_pid: Option<LocationPid>,
}

/// The loan record
///
/// The mutable entity whose `state` field is driven exclusively by the
/// dispatcher. Temporal fields are nullable until the corresponding
/// transition sets them; `actual_return_date`, once set, is never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Persistent loan identifier
    pub pid: LoanPid,

    /// The patron borrowing the item
    pub patron_pid: PatronPid,

    /// The document being borrowed
    ///
    /// A loan can exist referencing only a document, before any specific
    /// physical item is bound.
    pub document_pid: DocumentPid,

    /// The physical item bound to the loan, once assigned
    pub item_pid: Option<ItemPid>,

    /// Current state, driven by the dispatcher
    pub state: LoanState,

    /// When the request was created (request-born loans only)
    pub request_date: Option<DateTime<Utc>>,

    /// First day of the loan period
    pub start_date: Option<NaiveDate>,

    /// Last day of the loan period, derived from the duration policy
    pub end_date: Option<NaiveDate>,

    /// When the item actually came back; immutable once set
    pub actual_return_date: Option<DateTime<Utc>>,

    /// Delivery descriptor, interpreted only by policies
    pub delivery: Option<DeliveryInfo>,

    /// Number of times the loan has been extended
    pub extension_count: u32,
}

impl Loan {
    /// Create a loan record in the given initial state
    ///
    /// Used by the dispatcher's creation entry points; all temporal fields
    /// start unset.
    pub fn new(
        pid: impl Into<LoanPid>,
        patron_pid: impl Into<PatronPid>,
        document_pid: impl Into<DocumentPid>,
        state: LoanState,
    ) -> Self {
        Loan {
            pid: pid.into(),
            patron_pid: patron_pid.into(),
            document_pid: document_pid.into(),
            item_pid: None,
            state,
            request_date: None,
            start_date: None,
            end_date: None,
            actual_return_date: None,
            delivery: None,
            extension_count: 0,
        }
    }
}

/// Actor context passed through `apply`
///
/// Opaque to the engine: it is forwarded to the `is_trigger_permitted`
/// policy capability and never inspected by the dispatcher itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    /// The user performing the transaction (staff member or patron)
    pub transaction_user_pid: Option<String>,

    /// The location the transaction happens at
    pub transaction_location_pid: Option<LocationPid>,
}

/// Per-call parameters for a transition
///
/// Everything is optional; `transaction_date` defaults to the current time
/// when absent.
#[derive(Debug, Clone, Default)]
pub struct TransitionParams {
    /// When the action happened (defaults to now)
    pub transaction_date: Option<DateTime<Utc>>,

    /// Item to bind, for transitions that accept one
    pub item_pid: Option<ItemPid>,

    /// Pickup location for the delivery descriptor
    pub pickup_location_pid: Option<LocationPid>,

    /// Delivery method for the delivery descriptor
    pub delivery_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LoanState::Pending, false)]
    #[case(LoanState::ItemOnLoan, false)]
    #[case(LoanState::ItemInTransitForPickup, false)]
    #[case(LoanState::ItemInTransitToHouse, false)]
    #[case(LoanState::ItemReturned, true)]
    #[case(LoanState::Cancelled, true)]
    #[case(LoanState::Completed, true)]
    fn test_terminal_states(#[case] state: LoanState, #[case] terminal: bool) {
        assert_eq!(state.is_terminal(), terminal);
    }

    #[rstest]
    #[case(LoanState::Pending, false)]
    #[case(LoanState::ItemOnLoan, true)]
    #[case(LoanState::ItemInTransitForPickup, true)]
    #[case(LoanState::ItemInTransitToHouse, true)]
    #[case(LoanState::ItemReturned, false)]
    #[case(LoanState::Cancelled, false)]
    #[case(LoanState::Completed, false)]
    fn test_active_states(#[case] state: LoanState, #[case] active: bool) {
        assert_eq!(state.is_active(), active);
    }

    #[rstest]
    #[case("checkout", Trigger::Checkout)]
    #[case("CHECKIN", Trigger::Checkin)]
    #[case("Extend", Trigger::Extend)]
    #[case("receive", Trigger::Receive)]
    fn test_trigger_from_str(#[case] input: &str, #[case] expected: Trigger) {
        assert_eq!(input.parse::<Trigger>().unwrap(), expected);
    }

    #[test]
    fn test_trigger_from_str_rejects_unknown() {
        let result = "vanish".parse::<Trigger>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("vanish"));
    }

    #[test]
    fn test_trigger_round_trips_through_display() {
        for trigger in [
            Trigger::Request,
            Trigger::Checkout,
            Trigger::Checkin,
            Trigger::Cancel,
            Trigger::Extend,
            Trigger::Validate,
            Trigger::Deliver,
            Trigger::Receive,
        ] {
            assert_eq!(trigger.to_string().parse::<Trigger>().unwrap(), trigger);
        }
    }

    #[test]
    fn test_new_loan_starts_empty() {
        let loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::Pending);
        assert_eq!(loan.state, LoanState::Pending);
        assert!(loan.item_pid.is_none());
        assert!(loan.start_date.is_none());
        assert!(loan.end_date.is_none());
        assert!(loan.actual_return_date.is_none());
        assert_eq!(loan.extension_count, 0);
    }
}
