// Dispatch & completion queue for seedprobe
//
// Every dispatched request runs on its own tokio task: acquire a concurrency
// permit, send through the Transport, release the permit, then run the
// completion callback. The outstanding counter is decremented only after the
// callback finishes, so requests a callback dispatches are counted before the
// request that triggered them is retired. run_all() waits for the counter to
// reach zero.

use crate::engine::Transport;
use crate::error::TransportError;
use crate::models::{Request, Response};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Callback invoked exactly once with the outcome of a dispatched request
pub type Completion =
    Box<dyn FnOnce(Result<Response, TransportError>) -> BoxFuture<'static, ()> + Send>;

/// Box a closure into a [`Completion`]
pub fn completion<F, Fut>(f: F) -> Completion
where
    F: FnOnce(Result<Response, TransportError>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |result| f(result).boxed())
}

/// Handle to one in-flight request
#[derive(Debug)]
pub struct RequestHandle {
    pub id: u64,
    pub url: String,
    task: JoinHandle<()>,
}

impl RequestHandle {
    /// Wait for the request and its completion callback
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            warn!("Request #{} to {} did not complete: {}", self.id, self.url, e);
        }
    }
}

#[derive(Clone)]
pub struct DispatchQueue {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    pending: Arc<watch::Sender<usize>>,
    next_id: Arc<AtomicU64>,
}

/// Retires one outstanding request on drop, even if its callback panicked
struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl DispatchQueue {
    pub fn new(transport: Arc<dyn Transport>, max_concurrency: usize) -> Self {
        let (pending, _) = watch::channel(0usize);
        Self {
            transport,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            pending: Arc::new(pending),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Schedule `request`; `on_complete` runs once with its response or failure.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, request: Request, on_complete: Completion) -> RequestHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = request.url.clone();

        self.pending.send_modify(|n| *n += 1);
        let guard = PendingGuard(Arc::clone(&self.pending));
        let transport = Arc::clone(&self.transport);
        let permits = Arc::clone(&self.permits);

        trace!("Dispatching #{} {} {}", id, request.method, request.url);

        let task = tokio::spawn(async move {
            let _guard = guard;

            let result = match permits.acquire_owned().await {
                Ok(_permit) => transport.send(request).await,
                Err(_) => Err(TransportError::NoResponse {
                    url: request.url.clone(),
                    reason: "dispatch queue closed".to_string(),
                }),
            };

            on_complete(result).await;
        });

        RequestHandle { id, url, task }
    }

    pub fn get(&self, url: impl Into<String>, on_complete: Completion) -> RequestHandle {
        self.dispatch(Request::get(url), on_complete)
    }

    pub fn post(
        &self,
        url: impl Into<String>,
        body: impl Into<String>,
        on_complete: Completion,
    ) -> RequestHandle {
        self.dispatch(Request::post(url, body), on_complete)
    }

    /// Requests dispatched whose callbacks have not yet finished
    pub fn outstanding(&self) -> usize {
        *self.pending.borrow()
    }

    /// Abandon the scan: requests still waiting for a permit, and any
    /// dispatched later, complete with a failure instead of being sent.
    /// Requests already on the wire finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Wait until nothing is outstanding, including work queued by callbacks
    /// while waiting.
    pub async fn run_all(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
