//! Asynchronous suggestion generation.
//!
//! One worker thread computes suggestions off the input thread. Both
//! directions use a single-slot latest-wins mailbox: a newer request
//! replaces an unserviced one, and a newer result replaces an unread
//! one. The main thread drains the result slot at the start of a
//! redraw and after each key dispatch; a result whose line no longer
//! matches the live buffer is discarded by the caller.

use crate::Suggestion;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::thread::JoinHandle;
use tracing::{debug, trace};

/// A generation request captured against one line snapshot.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub line: String,
    pub cursor: usize,
    pub endword_offset: usize,
}

/// The worker's answer, tagged with the line it was computed for.
#[derive(Debug, Clone)]
pub struct SuggestionResult {
    pub line: String,
    pub endword_offset: usize,
    pub suggestion: Option<Suggestion>,
}

fn post_latest<T>(tx: &Sender<T>, rx: &Receiver<T>, mut value: T) {
    loop {
        match tx.try_send(value) {
            Ok(()) => return,
            Err(TrySendError::Full(v)) => {
                let _ = rx.try_recv();
                value = v;
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}

pub struct SuggestionWorker {
    req_tx: Sender<SuggestionRequest>,
    req_rx: Receiver<SuggestionRequest>,
    res_rx: Receiver<SuggestionResult>,
    handle: Option<JoinHandle<()>>,
}

impl SuggestionWorker {
    /// Spawn the worker. `compute` runs on the worker thread for each
    /// serviced request. An error means the thread could not start;
    /// callers fall back to synchronous generation.
    pub fn spawn<F>(compute: F) -> std::io::Result<Self>
    where
        F: Fn(&SuggestionRequest) -> Option<Suggestion> + Send + 'static,
    {
        let (req_tx, req_rx) = bounded::<SuggestionRequest>(1);
        let (res_tx, res_rx) = bounded::<SuggestionResult>(1);

        let worker_rx = req_rx.clone();
        let worker_res_rx = res_rx.clone();
        let handle = std::thread::Builder::new()
            .name("suggest-worker".to_string())
            .spawn(move || {
                while let Ok(req) = worker_rx.recv() {
                    let suggestion = compute(&req);
                    trace!(
                        target: "suggest",
                        line = %req.line,
                        found = suggestion.is_some(),
                        "worker_computed"
                    );
                    post_latest(
                        &res_tx,
                        &worker_res_rx,
                        SuggestionResult {
                            line: req.line,
                            endword_offset: req.endword_offset,
                            suggestion,
                        },
                    );
                }
                debug!(target: "suggest", "worker_exit");
            })?;

        Ok(Self {
            req_tx,
            req_rx,
            res_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request, replacing any unserviced one.
    pub fn request(&self, req: SuggestionRequest) {
        post_latest(&self.req_tx, &self.req_rx, req);
    }

    /// Take the latest result, if one is waiting.
    pub fn poll(&self) -> Option<SuggestionResult> {
        self.res_rx.try_recv().ok()
    }
}

impl Drop for SuggestionWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        let (tx, _) = bounded(1);
        self.req_tx = tx;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
