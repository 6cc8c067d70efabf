//! Fire-and-forget diagnostics.
//!
//! Nothing in the core depends on a sink for correctness; sinks exist so that
//! programs built on deferred values can report progress somewhere.

use std::cell::RefCell;

/// Somewhere to send diagnostic messages.
pub trait Diagnostics {
    /// Record `message`. Never fails.
    fn record(&self, message: &str);
}

/// Emits every message as a `tracing` event at `INFO`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Diagnostics for TracingSink {
    fn record(&self, message: &str) {
        tracing::info!(target: "deferred::diagnostics", "{message}");
    }
}

/// Keeps every message in memory, in the order recorded.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: RefCell<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The messages recorded so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Diagnostics for MemorySink {
    fn record(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_owned());
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for std::rc::Rc<D> {
    fn record(&self, message: &str) {
        (**self).record(message)
    }
}
