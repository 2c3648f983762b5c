//! Event sinks
//!
//! Two `EventSink` implementations ship with the engine: `NullSink` drops
//! everything, `MemorySink` collects events for inspection by tests and the
//! replay CLI.

use crate::core::traits::{EmitError, EventSink};
use crate::types::TransitionEvent;
use std::sync::Mutex;

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NullSink {
    /// Create a NullSink
    pub fn new() -> Self {
        NullSink
    }
}

impl EventSink for NullSink {
    fn publish(&self, _event: &TransitionEvent) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Sink that records every published event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TransitionEvent>>,
}

impl MemorySink {
    /// Create an empty MemorySink
    pub fn new() -> Self {
        MemorySink {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the events published so far, in publication order
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &TransitionEvent) -> Result<(), EmitError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
