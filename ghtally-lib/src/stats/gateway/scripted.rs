//! In-memory [`Transport`] for unit tests.

use super::{GraphQlRequest, RawResponse, Transport};
use crate::Result;
use core::sync::atomic::{AtomicUsize, Ordering};
use ohno::app_err;
use std::collections::VecDeque;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&GraphQlRequest) -> Result<RawResponse> + Send + Sync>;

/// Answers each request through a handler and records what was asked.
pub struct ScriptedTransport {
    handler: Handler,
    calls: AtomicUsize,
    labels: Mutex<Vec<String>>,
}

impl core::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedTransport").field("calls", &self.calls).finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&GraphQlRequest) -> Result<RawResponse> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            labels: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order, failing once the script runs out.
    pub fn sequence(responses: Vec<Result<RawResponse>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |request| {
            queue
                .lock()
                .expect("lock not poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(app_err!("unscripted request: {}", request.label)))
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().expect("lock not poisoned").clone()
    }
}

impl Transport for ScriptedTransport {
    async fn post(&self, request: &GraphQlRequest) -> Result<RawResponse> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.labels.lock().expect("lock not poisoned").push(request.label.clone());
        (self.handler)(request)
    }
}
