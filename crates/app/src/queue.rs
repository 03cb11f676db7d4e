//! Command queue — deferred work for the engine task.

use tokio::sync::mpsc;

use domintell_domain::command::Command;

/// One unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Decode a received line and apply it to the sensor store.
    DecodeLine(String),
    /// Write a command to the gateway.
    Send(Command),
}

/// Create an unbounded FIFO queue.
#[must_use]
pub fn work_queue() -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WorkSender(tx), WorkReceiver(rx))
}

/// Producer side. Cheap to clone; pushing never blocks.
#[derive(Debug, Clone)]
pub struct WorkSender(mpsc::UnboundedSender<WorkItem>);

impl WorkSender {
    /// Enqueue an item. Returns `false` if the engine is gone.
    pub fn push(&self, item: WorkItem) -> bool {
        self.0.send(item).is_ok()
    }
}

/// Consumer side, owned by the engine.
#[derive(Debug)]
pub struct WorkReceiver(mpsc::UnboundedReceiver<WorkItem>);

impl WorkReceiver {
    /// Take the oldest item without waiting.
    pub fn try_next(&mut self) -> Option<WorkItem> {
        self.0.try_recv().ok()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
