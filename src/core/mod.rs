//! Core engine module
//!
//! Contains the transition graph, the dispatcher, and the boundary traits
//! together with their shipped implementations:
//! - `graph`: the static (state, trigger) -> state table
//! - `dispatcher`: the transition pipeline
//! - `traits`: `PolicyProvider`, `LoanStore`, `EventSink`
//! - `policy`: `UnconfiguredPolicy` and the `StandardPolicy` reference
//! - `store`: the in-memory `MemoryLoanStore`
//! - `emitter`: `NullSink` and `MemorySink`

pub mod dispatcher;
pub mod emitter;
pub mod graph;
pub mod policy;
pub mod store;
pub mod traits;

pub use dispatcher::LoanDispatcher;
pub use emitter::{MemorySink, NullSink};
pub use graph::{TransitionEntry, TransitionGraph};
pub use policy::{StandardPolicy, StandardPolicyConfig, UnconfiguredPolicy};
pub use store::MemoryLoanStore;
pub use traits::{EmitError, EventSink, LoanStore, PolicyProvider, StoreError, VersionToken};
