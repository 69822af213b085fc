//! Change notifications emitted by the GCP driver
//!
//! Events flow one way, from the driver to its subscribers. A subscriber may
//! receive the same value more than once (every edit refits the model and
//! reports the RMSE again), so handlers must treat an already applied value
//! as a no-op.

use std::fmt;

/// A change in the driver state
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// The model was refitted; carries the new mean residual
    RmseChanged(f64),
    /// A cell value changed
    CellChanged { row: usize, column: usize },
    /// A row was appended at the given index
    RowAppended(usize),
    /// A row was removed from the given index
    RowDeleted(usize),
}

type Handler = Box<dyn FnMut(&DriverEvent)>;

/// Ordered list of event handlers
#[derive(Default)]
pub struct EventEmitter {
    handlers: Vec<Handler>,
}

impl EventEmitter {
    pub fn new() -> Self {
        EventEmitter::default()
    }

    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&DriverEvent) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn emit(&mut self, event: &DriverEvent) {
        for handler in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventEmitter({} handlers)", self.handlers.len())
    }
}
