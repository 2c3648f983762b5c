//! Circulation Engine Library
//! # Overview
//!
//! This library implements the loan lifecycle of a library circulation
//! system as an explicit state machine with pluggable policies, storage,
//! and event publication.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Loan, LoanState, Trigger, errors, events)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::graph`] - The static (state, trigger) transition table
//!   - [`core::dispatcher`] - The transition pipeline
//!   - [`core::traits`] - The `PolicyProvider`, `LoanStore` and `EventSink`
//!     seams, with shipped implementations in [`core::policy`],
//!     [`core::store`] and [`core::emitter`]
//! - [`io`] - CSV input/output for the replay pipeline
//! - [`replay`] - The CLI orchestration layer
//!
//! # Loan Lifecycle
//!
//! A loan is born either `PENDING` (patron request) or directly
//! `ITEM_ON_LOAN` (walk-up checkout). Triggers move it through transit and
//! on-loan states until it reaches one of the terminal states
//! `ITEM_RETURNED`, `CANCELLED` or `COMPLETED`, which accept no further
//! triggers. Every state change runs through
//! [`core::dispatcher::LoanDispatcher`]: guards consult the policy
//! provider, the new state is persisted under an optimistic version token,
//! and a transition event is published after the commit.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use core::{
    LoanDispatcher, MemoryLoanStore, MemorySink, NullSink, StandardPolicy, StandardPolicyConfig,
    TransitionGraph, UnconfiguredPolicy,
};
pub use io::write_loans_csv;
pub use types::{
    ActorContext, CirculationError, DeliveryInfo, DocumentPid, ItemPid, Loan, LoanPid, LoanState,
    LocationPid, PatronPid, PolicyError, RejectReason, Trigger, TransitionEvent, TransitionParams,
};
