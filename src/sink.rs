//! The output side-channel: where `display` and finished runs send their values.

use std::{cell::RefCell, io::Write, rc::Rc};

use crate::value::Value;

/// Receives values for human inspection. Implementations must not fail the caller.
pub trait Sink {
    fn emit(&mut self, value: &Value);
}

/// Writes each value on its own line to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn emit(&mut self, value: &Value) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout is the host's problem, not the program's.
        let _ = writeln!(stdout, "{value}");
    }
}

/// Records emitted values; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    emitted: Rc<RefCell<Vec<Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<Value> {
        self.emitted.borrow().clone()
    }

    /// Emitted values in their rendered form.
    pub fn rendered(&self) -> Vec<String> {
        self.emitted
            .borrow()
            .iter()
            .map(|value| value.to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.emitted.borrow_mut().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&mut self, value: &Value) {
        self.emitted.borrow_mut().push(value.clone());
    }
}
