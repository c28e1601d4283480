//! Bounded dispatcher implementation.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::queue::{Completion, PendingQueue, QueuedRequest};
use super::ResponseOutcome;
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, FetchError};
use crate::telemetry::{DispatcherMetrics, DispatcherSnapshot};
use crate::transport::{Transport, TransportOutcome, TransportSelector};

// =============================================================================
// Shared State
// =============================================================================

/// Mutable state guarded by the dispatcher lock.
struct State {
    in_flight: usize,
    pending: PendingQueue,
    /// Transport chosen at the first admission (unless reprobing).
    transport: Option<Arc<dyn Transport>>,
    /// Runtime that executes transport calls. Captured at construction or at
    /// the most recent submission made from inside a runtime.
    handle: Option<Handle>,
    /// Set once a fatal configuration error has occurred.
    halted: Option<DispatchError>,
}

impl State {
    fn has_work(&self, max_concurrency: usize) -> bool {
        self.halted.is_none() && !self.pending.is_empty() && self.in_flight < max_concurrency
    }
}

struct Inner {
    max_concurrency: usize,
    reprobe: bool,
    selector: TransportSelector,
    metrics: DispatcherMetrics,
    state: Mutex<State>,
}

/// What one admission attempt decided, computed under the lock and acted on
/// after it is released.
enum Admission {
    Idle,
    Admitted {
        slot: Slot,
        transport: Arc<dyn Transport>,
        handle: Handle,
    },
    Halted {
        error: DispatchError,
        abandoned: Vec<QueuedRequest>,
    },
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Bounded-concurrency GET dispatcher.
///
/// Requests are queued in submission order and at most `max_concurrency` of
/// them run at once. Each completion frees a slot and admits the next queued
/// request. Cloning is cheap; clones share the same queue and counter.
///
/// Transport calls run on the Tokio runtime the dispatcher was created in, or
/// the one it was last submitted from. Once a runtime is known, `submit` may
/// also be called from plain threads.
///
/// Requests cannot be cancelled once submitted, and the queue has no upper
/// bound.
///
/// # Example
///
/// ```no_run
/// use boundfetch::{Dispatcher, DispatcherConfig};
///
/// # async fn run() -> Result<(), boundfetch::DispatchError> {
/// let dispatcher = Dispatcher::from_config(&DispatcherConfig::default())?;
///
/// dispatcher.submit("https://example.com/api", |outcome| {
///     println!("{:?} (ttl {:?})", outcome.status(), outcome.ttl);
/// })?;
///
/// let outcome = dispatcher.fetch("https://example.com/api/v2").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher with the given cap and transport candidates.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidConcurrency`] if `max_concurrency` is zero.
    pub fn new(max_concurrency: usize, selector: TransportSelector) -> Result<Self, DispatchError> {
        Self::with_config(
            &DispatcherConfig::default().with_max_concurrency(max_concurrency),
            selector,
        )
    }

    /// Creates a dispatcher using the built-in transports from `config`.
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        Self::with_config(config, config.transport.build_selector())
    }

    /// Creates a dispatcher with settings from `config` and a custom selector.
    ///
    /// `config.transport` is ignored; the selector supplies the transports.
    pub fn with_config(
        config: &DispatcherConfig,
        selector: TransportSelector,
    ) -> Result<Self, DispatchError> {
        if config.max_concurrency == 0 {
            return Err(DispatchError::InvalidConcurrency(0));
        }

        let handle = Handle::try_current().ok();
        debug!(
            max_concurrency = config.max_concurrency,
            reprobe = config.reprobe,
            runtime = handle.is_some(),
            candidates = ?selector,
            "Dispatcher created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                max_concurrency: config.max_concurrency,
                reprobe: config.reprobe,
                selector,
                metrics: DispatcherMetrics::new(),
                state: Mutex::new(State {
                    in_flight: 0,
                    pending: PendingQueue::new(),
                    transport: None,
                    handle,
                    halted: None,
                }),
            }),
        })
    }

    /// Queues a GET for `url` and returns without waiting for it.
    ///
    /// If a slot is free the request is admitted before this call returns.
    /// `completion` runs exactly once with the outcome. For executed requests
    /// it runs on a runtime worker; when the dispatcher halts, the requests it
    /// abandons are completed on the thread that observed the failure. A
    /// panicking completion is logged and does not affect other requests.
    /// Per-request failures only ever reach `completion`.
    ///
    /// # Errors
    ///
    /// Only configuration-class failures are returned: no transport is
    /// available, no Tokio runtime has ever been reachable, or the dispatcher
    /// already halted because of one of these. When this happens every
    /// request still queued, this one included, is completed with
    /// [`FetchError::Configuration`].
    pub fn submit<F>(&self, url: impl Into<String>, completion: F) -> Result<(), DispatchError>
    where
        F: FnOnce(ResponseOutcome) + Send + 'static,
    {
        let url = url.into();
        let completion: Completion = Box::new(completion);

        {
            let mut state = self.inner.state.lock();
            let halted = state.halted.as_ref().map(ToString::to_string);
            if let Some(reason) = halted {
                drop(state);
                let error = DispatchError::Halted(reason);
                let outcome =
                    ResponseOutcome::failed(url.clone(), FetchError::Configuration(error.to_string()));
                run_completion(&url, || completion(outcome));
                return Err(error);
            }
            let sequence = state.pending.push(url.clone(), completion);
            debug!(url = %url, sequence, queued = state.pending.len(), "Request submitted");
        }
        self.inner.metrics.request_submitted();

        self.inner.admit_next()
    }

    /// Queues a GET for `url` and returns a future resolving to its outcome.
    ///
    /// The request is submitted immediately, not when the future is first
    /// polled.
    pub fn fetch(
        &self,
        url: impl Into<String>,
    ) -> impl Future<Output = Result<ResponseOutcome, DispatchError>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let submitted = self.submit(url, move |outcome| {
            let _ = tx.send(outcome);
        });

        async move {
            submitted?;
            rx.await.map_err(|_| {
                DispatchError::Halted("completion dropped before delivering an outcome".into())
            })
        }
    }

    /// Maximum requests in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Requests currently executing.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight
    }

    /// Requests waiting for admission.
    pub fn queued(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Returns true once a fatal configuration error has stopped the
    /// dispatcher.
    pub fn is_halted(&self) -> bool {
        self.inner.state.lock().halted.is_some()
    }

    /// Point-in-time counters.
    pub fn metrics(&self) -> DispatcherSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Dispatcher")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("in_flight", &state.in_flight)
            .field("queued", &state.pending.len())
            .field("halted", &state.halted.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs a completion, containing any panic it raises.
fn run_completion(url: &str, completion: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(completion)).is_err() {
        warn!(url = %url, "Request completion panicked");
    }
}

// =============================================================================
// Admission
// =============================================================================

impl Inner {
    /// Admits at most one queued request.
    ///
    /// The lock covers the capacity check, pop and increment. Transport
    /// probing happens outside it, inside the runtime context the request
    /// will be spawned on.
    fn admit_next(self: &Arc<Self>) -> Result<(), DispatchError> {
        let (handle, cached) = {
            let mut state = self.state.lock();
            if !state.has_work(self.max_concurrency) {
                return Ok(());
            }
            let handle = match Handle::try_current() {
                Ok(current) => {
                    state.handle = Some(current.clone());
                    Some(current)
                }
                Err(_) => state.handle.clone(),
            };
            let cached = if self.reprobe {
                None
            } else {
                state.transport.clone()
            };
            (handle, cached)
        };

        let admission = match handle {
            None => {
                let mut state = self.state.lock();
                if state.has_work(self.max_concurrency) {
                    self.halt(&mut state, DispatchError::NoRuntime)
                } else {
                    Admission::Idle
                }
            }
            Some(handle) => {
                let resolved = match cached {
                    Some(transport) => Ok(transport),
                    None => {
                        let _context = handle.enter();
                        self.selector.resolve()
                    }
                };
                let mut state = self.state.lock();
                self.try_admit(&mut state, handle, resolved)
            }
        };

        match admission {
            Admission::Idle => Ok(()),
            Admission::Admitted {
                slot,
                transport,
                handle,
            } => {
                handle.spawn(execute(slot, transport));
                Ok(())
            }
            Admission::Halted { error, abandoned } => {
                for request in abandoned {
                    self.metrics.request_failed();
                    let url = request.url.clone();
                    let outcome = ResponseOutcome::failed(
                        url.clone(),
                        FetchError::Configuration(error.to_string()),
                    );
                    run_completion(&url, || request.complete(outcome));
                }
                Err(error)
            }
        }
    }

    fn try_admit(
        self: &Arc<Self>,
        state: &mut State,
        handle: Handle,
        resolved: Result<Arc<dyn Transport>, DispatchError>,
    ) -> Admission {
        // Re-checked: the lock was released while probing.
        if !state.has_work(self.max_concurrency) {
            return Admission::Idle;
        }

        let transport = match resolved {
            Ok(transport) => transport,
            Err(error) => return self.halt(state, error),
        };
        if state.transport.is_none() || self.reprobe {
            state.transport = Some(Arc::clone(&transport));
        }

        let Some(request) = state.pending.pop() else {
            return Admission::Idle;
        };
        state.in_flight += 1;
        self.metrics.request_admitted(state.in_flight);

        debug!(
            url = %request.url,
            sequence = request.sequence(),
            wait_ms = request.wait_time().as_millis() as u64,
            in_flight = state.in_flight,
            queued = state.pending.len(),
            transport = transport.name(),
            "Request admitted"
        );

        Admission::Admitted {
            slot: Slot {
                inner: Arc::clone(self),
                request: Some(request),
            },
            transport,
            handle,
        }
    }

    fn halt(&self, state: &mut State, error: DispatchError) -> Admission {
        error!(error = %error, queued = state.pending.len(), "Dispatcher halted");
        state.halted = Some(error.clone());
        Admission::Halted {
            error,
            abandoned: state.pending.drain(),
        }
    }

    /// Releases the slot of a finished request, delivers its outcome and
    /// admits the next one.
    fn finish(self: &Arc<Self>, request: QueuedRequest, outcome: ResponseOutcome) {
        {
            let mut state = self.state.lock();
            debug_assert!(state.in_flight > 0, "completion without admission");
            state.in_flight = state.in_flight.saturating_sub(1);
        }

        match &outcome.result {
            Ok(_) => {
                self.metrics.request_succeeded();
                debug!(
                    url = %outcome.url,
                    status = outcome.status(),
                    ttl = outcome.ttl,
                    "Request completed"
                );
            }
            Err(e) => {
                self.metrics.request_failed();
                warn!(url = %outcome.url, error = %e, "Request failed");
            }
        }

        let url = request.url.clone();
        run_completion(&url, || request.complete(outcome));

        if let Err(e) = self.admit_next() {
            error!(error = %e, "Admission after completion failed");
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

/// An occupied concurrency slot.
///
/// Created at admission, before the task is spawned. If the task is dropped
/// before it finishes (for example because its runtime shut down), the slot
/// is released and the request completes with a transport error.
struct Slot {
    inner: Arc<Inner>,
    request: Option<QueuedRequest>,
}

impl Slot {
    fn release(mut self, outcome: ResponseOutcome) {
        if let Some(request) = self.request.take() {
            self.inner.finish(request, outcome);
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            let url = request.url.clone();
            warn!(url = %url, "Request task dropped before completion");
            let outcome = ResponseOutcome::failed(
                url.clone(),
                FetchError::Transport {
                    url,
                    reason: "request task dropped before completion".to_string(),
                },
            );
            self.inner.finish(request, outcome);
        }
    }
}

/// Runs one admitted request to completion, then admits the next.
async fn execute(slot: Slot, transport: Arc<dyn Transport>) {
    let url = match &slot.request {
        Some(request) => request.url.clone(),
        None => return,
    };

    // The whole call, including building the future, is inside catch_unwind.
    let outcome = AssertUnwindSafe(async { transport.get(&url).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            TransportOutcome::failure(
                FetchError::Transport {
                    url: url.clone(),
                    reason: format!("transport '{}' panicked", transport.name()),
                },
                None,
            )
        });

    slot.release(ResponseOutcome::from_transport(url, outcome));
}
