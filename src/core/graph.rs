//! The transition graph
//!
//! A static table mapping (source state, trigger) to a destination state.
//! A pair absent from the table is an illegal transition; the dispatcher
//! never guesses a default. Guards and actions are keyed off the same pairs
//! but live in the dispatcher, which is the only component that mutates
//! loan state.

use crate::types::{LoanState, Trigger};
use std::collections::HashMap;

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEntry {
    /// Source state
    pub src: LoanState,
    /// Trigger that fires the transition
    pub trigger: Trigger,
    /// Destination state
    pub dest: LoanState,
}

/// Static table of legal (state, trigger) -> state mappings
///
/// Built once at dispatcher construction. Terminal states have no outgoing
/// entries, which is what makes them terminal: any trigger applied to a
/// loan in `ITEM_RETURNED`, `CANCELLED` or `COMPLETED` misses the table and
/// fails as an invalid transition.
#[derive(Debug)]
pub struct TransitionGraph {
    entries: HashMap<(LoanState, Trigger), LoanState>,
}

/// The complete circulation transition table
///
/// `request` does not appear: it is the creation trigger, consumed by the
/// dispatcher's creation entry points before any graph lookup. `cancel` is
/// deliberately absent from `ITEM_ON_LOAN`: cancellation is only permitted
/// before fulfillment.
const TRANSITIONS: &[TransitionEntry] = &[
    TransitionEntry {
        src: LoanState::Pending,
        trigger: Trigger::Checkout,
        dest: LoanState::ItemOnLoan,
    },
    TransitionEntry {
        src: LoanState::Pending,
        trigger: Trigger::Validate,
        dest: LoanState::ItemInTransitForPickup,
    },
    TransitionEntry {
        src: LoanState::Pending,
        trigger: Trigger::Cancel,
        dest: LoanState::Cancelled,
    },
    TransitionEntry {
        src: LoanState::ItemInTransitForPickup,
        trigger: Trigger::Deliver,
        dest: LoanState::ItemOnLoan,
    },
    TransitionEntry {
        src: LoanState::ItemInTransitForPickup,
        trigger: Trigger::Checkin,
        dest: LoanState::ItemInTransitToHouse,
    },
    TransitionEntry {
        src: LoanState::ItemInTransitForPickup,
        trigger: Trigger::Cancel,
        dest: LoanState::Cancelled,
    },
    TransitionEntry {
        src: LoanState::ItemOnLoan,
        trigger: Trigger::Extend,
        dest: LoanState::ItemOnLoan,
    },
    TransitionEntry {
        src: LoanState::ItemOnLoan,
        trigger: Trigger::Checkin,
        dest: LoanState::ItemReturned,
    },
    TransitionEntry {
        src: LoanState::ItemInTransitToHouse,
        trigger: Trigger::Receive,
        dest: LoanState::Completed,
    },
];

impl TransitionGraph {
    /// Build the graph from the static transition table
    pub fn new() -> Self {
        let mut entries = HashMap::with_capacity(TRANSITIONS.len());
        for entry in TRANSITIONS {
            entries.insert((entry.src, entry.trigger), entry.dest);
        }
        TransitionGraph { entries }
    }

    /// Destination state for a (state, trigger) pair, if the pair is legal
    pub fn destination(&self, src: LoanState, trigger: Trigger) -> Option<LoanState> {
        self.entries.get(&(src, trigger)).copied()
    }

    /// Whether the pair has an entry in the table
    pub fn is_legal(&self, src: LoanState, trigger: Trigger) -> bool {
        self.entries.contains_key(&(src, trigger))
    }

    /// All entries of the table
    pub fn entries(&self) -> impl Iterator<Item = TransitionEntry> + '_ {
        self.entries
            .iter()
            .map(|(&(src, trigger), &dest)| TransitionEntry { src, trigger, dest })
    }
}

impl Default for TransitionGraph {
    fn default() -> Self {
        Self::new()
    }
}
