//! Mock collaborators shared by the worker and dispatch test suites

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::message::SyntheticMail;
use crate::traits::{ComposeError, MailConnection, MailConnector, MessageSource, TransportError};

// ============================================================================
// Mock MessageSource
// ============================================================================

pub(crate) struct MockSource {
    counter: AtomicUsize,
    fail: bool,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn built(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl MessageSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn build(&self) -> Result<SyntheticMail, ComposeError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ComposeError::InvalidShape("mock shape".into()));
        }
        Ok(SyntheticMail {
            from: "test@local.test".into(),
            to: "sink@local.test".into(),
            subject: format!("message {n}"),
            body: "body".into(),
            attachment: None,
        })
    }
}

// ============================================================================
// Mock MailConnector
// ============================================================================

#[derive(Default)]
pub(crate) struct MockCounters {
    pub(crate) opened: AtomicUsize,
    pub(crate) closed: AtomicUsize,
    pub(crate) sends: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

pub(crate) struct MockConnector {
    delay: Option<Duration>,
    fail_first: usize,
    fail_message: String,
    failing_workers: HashSet<usize>,
    fail_every_open: bool,
    close_error: bool,
    gate: Option<Arc<Semaphore>>,
    pub(crate) counters: Arc<MockCounters>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self {
            delay: None,
            fail_first: 0,
            fail_message: String::new(),
            failing_workers: HashSet::new(),
            fail_every_open: false,
            close_error: false,
            gate: None,
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The first `n` sends across all connections fail with `message`
    pub(crate) fn with_failures(mut self, n: usize, message: &str) -> Self {
        self.fail_first = n;
        self.fail_message = message.to_string();
        self
    }

    pub(crate) fn with_failing_workers(mut self, ids: &[usize]) -> Self {
        self.failing_workers = ids.iter().copied().collect();
        self
    }

    pub(crate) fn with_all_setups_failing(mut self) -> Self {
        self.fail_every_open = true;
        self
    }

    pub(crate) fn with_close_error(mut self) -> Self {
        self.close_error = true;
        self
    }

    /// Every send waits for a permit from `gate`
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn sends(&self) -> usize {
        self.counters.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailConnector for MockConnector {
    fn transport_name(&self) -> &str {
        "mock"
    }

    async fn open(&self, worker_id: usize) -> Result<Box<dyn MailConnection>, TransportError> {
        if self.fail_every_open || self.failing_workers.contains(&worker_id) {
            return Err(TransportError::Connect("connection refused".into()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            delay: self.delay,
            fail_first: self.fail_first,
            fail_message: self.fail_message.clone(),
            close_error: self.close_error,
            gate: self.gate.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockConnection {
    delay: Option<Duration>,
    fail_first: usize,
    fail_message: String,
    close_error: bool,
    gate: Option<Arc<Semaphore>>,
    counters: Arc<MockCounters>,
}

#[async_trait]
impl MailConnection for MockConnection {
    async fn send(&mut self, _mail: &SyntheticMail) -> Result<(), TransportError> {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let n = self.counters.sends.fetch_add(1, Ordering::SeqCst);
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        if n < self.fail_first {
            return Err(TransportError::Other(self.fail_message.clone()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.close_error {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}
