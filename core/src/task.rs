//! Send tasks and the items carried by the task queue

/// One message-send unit of work, identified by its submission index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendTask {
    index: u64,
}

impl SendTask {
    /// Create the task with the given sequence index
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    /// Sequence index in `0..N`
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl std::fmt::Display for SendTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.index)
    }
}

/// Entry of the task queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    /// Work for exactly one worker
    Task(SendTask),

    /// Tells the worker that receives it to close its connection and exit
    Shutdown,
}

impl QueueItem {
    /// The task carried by this item, if any
    pub fn task(&self) -> Option<SendTask> {
        match self {
            QueueItem::Task(task) => Some(*task),
            QueueItem::Shutdown => None,
        }
    }
}
