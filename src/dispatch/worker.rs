//! Message-passing highlight worker
//!
//! Callers submit [`Request`]s over a bounded channel. Each request is
//! annotated in its own task, and a router task hands every reply to the
//! caller waiting on that request's id. Replies may finish in any order.

use super::{run_request, Request, RequestId, Response};
use crate::error::{HighlightError, Result};
use crate::registry::SharedRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Waiters = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Response>>>>>;

/// Handle to a running worker
pub struct WorkerHandle {
    requests: mpsc::Sender<Request>,
    waiters: Waiters,
    worker: JoinHandle<()>,
}

impl WorkerHandle {
    /// Start a worker on the current tokio runtime.
    ///
    /// Each request is annotated against the registry snapshot current when
    /// the worker picks it up.
    pub fn spawn(registry: Arc<SharedRegistry>, capacity: usize) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<Request>(capacity.max(1));
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<(RequestId, Result<Response>)>();
        let waiters: Waiters = Arc::default();

        let worker = tokio::spawn(async move {
            info!("Highlight worker started");
            while let Some(request) = request_rx.recv().await {
                let snapshot = registry.snapshot();
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let id = request.id;
                    let outcome = run_request(snapshot, request).await;
                    if reply_tx.send((id, outcome)).is_err() {
                        debug!("Reply for request {} dropped, router gone", id);
                    }
                });
            }
            info!("Highlight worker stopped");
        });

        let routes = Arc::clone(&waiters);
        tokio::spawn(async move {
            while let Some((id, outcome)) = reply_rx.recv().await {
                match routes.lock().await.remove(&id) {
                    Some(waiter) => {
                        if waiter.send(outcome).is_err() {
                            debug!("Caller for request {} went away", id);
                        }
                    }
                    None => warn!("Reply for unknown request {}", id),
                }
            }
        });

        Self {
            requests: request_tx,
            waiters,
            worker,
        }
    }

    /// Submit a request and wait for its reply
    pub async fn submit(&self, request: Request) -> Result<Response> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(id, tx);

        if self.requests.send(request).await.is_err() {
            self.waiters.lock().await.remove(&id);
            return Err(HighlightError::Dispatch(
                "highlight worker is not running".to_string(),
            ));
        }

        rx.await
            .map_err(|_| HighlightError::Dispatch(format!("reply for request {} was lost", id)))?
    }

    /// Requests submitted but not yet answered
    pub async fn in_flight(&self) -> usize {
        self.waiters.lock().await.len()
    }

    /// Stop accepting requests. Requests already picked up still complete.
    pub async fn shutdown(&mut self) {
        self.worker.abort();
        let _ = (&mut self.worker).await;
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
