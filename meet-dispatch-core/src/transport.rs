//! Request/response and event channel to a detached surface
//!
//! A detached surface (a popup window, a second process) shares no memory
//! with the store. The two sides exchange [`Envelope`]s over a
//! [`TransportBackend`]:
//!
//! ```text
//! { "bus": "request",  "id": 7, "data": { "type": "devices", "name": "getCurrentDevices" } }
//! { "bus": "response", "id": 7, "result": { "audioInput": {..} } }
//! { "bus": "event",    "data": { "type": "devices", "name": "deviceListChanged", "devices": {..} } }
//! ```
//!
//! Requests resolve, fail or time out; they never hang. Call sites are
//! expected to treat failure as "feature unavailable" and fall back to a
//! default, which [`Transport::request_or`] does for them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{RuntimeConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::error::TransportError;

/// Inner message: `{ "type", "name", ...params }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Which logical bus the message belongs to, e.g. `devices`
    #[serde(rename = "type")]
    pub bus_type: String,
    pub name: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Message {
    pub fn new(bus_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bus_type: bus_type.into(),
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Outer frame multiplexing requests, responses and events on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bus", rename_all = "lowercase")]
pub enum Envelope {
    Request {
        id: u64,
        data: Value,
    },
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        data: Value,
    },
}

/// Outbound half of a channel.
pub trait TransportBackend: Send + Sync {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Receiving half of an in-process channel
pub type Inbound = mpsc::UnboundedReceiver<Envelope>;

/// In-process backend over a tokio channel.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MemoryBackend {
    /// Two connected ends: what one backend sends, the other's inbound yields.
    pub fn pair() -> ((MemoryBackend, Inbound), (MemoryBackend, Inbound)) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            (MemoryBackend { tx: b_tx }, a_rx),
            (MemoryBackend { tx: a_tx }, b_rx),
        )
    }
}

impl TransportBackend for MemoryBackend {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx.send(envelope).map_err(|_| TransportError::Closed)
    }
}

type EventHandler = Arc<dyn Fn(&Message) -> bool + Send + Sync>;
type RequestHandler = Arc<dyn Fn(&Message) -> Result<Value, String> + Send + Sync>;
type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, TransportError>>>;

struct Inner {
    backend: Box<dyn TransportBackend>,
    timeout: Duration,
    next_id: AtomicU64,
    pending: Mutex<PendingMap>,
    event_handlers: Mutex<Vec<(String, EventHandler)>>,
    request_handlers: Mutex<HashMap<String, RequestHandler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One side of a detached-surface channel. Cheap to clone.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("timeout", &self.inner.timeout)
            .field("pending", &self.pending_requests())
            .finish()
    }
}

/// Removes a pending entry however the request future ends
struct PendingGuard<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(&self.inner.pending).remove(&self.id);
    }
}

impl Transport {
    /// Transport with the default request timeout
    pub fn new(backend: impl TransportBackend + 'static) -> Self {
        Self::with_timeout(backend, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Transport using [`RuntimeConfig::request_timeout`]
    pub fn from_config(backend: impl TransportBackend + 'static, config: &RuntimeConfig) -> Self {
        Self::with_timeout(backend, config.request_timeout())
    }

    pub fn with_timeout(backend: impl TransportBackend + 'static, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Box::new(backend),
                timeout,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                event_handlers: Mutex::new(Vec::new()),
                request_handlers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Fire-and-forget; no delivery confirmation.
    pub fn send_event(&self, message: Message) -> Result<(), TransportError> {
        let data = serde_json::to_value(&message)?;
        self.inner.backend.send(Envelope::Event { data })
    }

    /// Send a request and wait for the correlated response.
    pub async fn send_request(&self, message: Message) -> Result<Value, TransportError> {
        let data = serde_json::to_value(&message)?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        lock(&self.inner.pending).insert(id, tx);
        let _guard = PendingGuard {
            inner: &self.inner,
            id,
        };

        self.inner.backend.send(Envelope::Request { id, data })?;

        match tokio::time::timeout(self.inner.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Timeout(self.inner.timeout)),
        }
    }

    /// Send a request and decode the response as `T`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        message: Message,
    ) -> Result<T, TransportError> {
        let value = self.send_request(message).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a request, falling back to `default` on any failure.
    pub async fn request_or<T: DeserializeOwned>(&self, message: Message, default: T) -> T {
        let name = message.name.clone();
        match self.request_as(message).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(request = %name, error = %e, "request failed, using default");
                default
            }
        }
    }

    /// Handle inbound events called `name`.
    ///
    /// Handlers run in registration order; the first one returning `true`
    /// claims the event. Unclaimed events are ignored.
    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        lock(&self.inner.event_handlers).push((name.into(), Arc::new(handler)));
        self
    }

    /// Answer inbound requests called `name`. Replaces any earlier handler.
    pub fn on_request<F>(&self, name: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&Message) -> Result<Value, String> + Send + Sync + 'static,
    {
        lock(&self.inner.request_handlers).insert(name.into(), Arc::new(handler));
        self
    }

    /// Process one inbound envelope.
    pub fn receive(&self, envelope: Envelope) {
        match envelope {
            Envelope::Response { id, result, error } => {
                let Some(tx) = lock(&self.inner.pending).remove(&id) else {
                    tracing::debug!(id, "response for unknown or expired request");
                    return;
                };
                let outcome = match error {
                    Some(error) => Err(TransportError::Remote(error)),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                // Receiver gone means the caller stopped waiting
                let _ = tx.send(outcome);
            }
            Envelope::Event { data } => match serde_json::from_value::<Message>(data) {
                Ok(message) => self.handle_event(&message),
                Err(e) => tracing::warn!(error = %e, "malformed event"),
            },
            Envelope::Request { id, data } => {
                let response = match serde_json::from_value::<Message>(data) {
                    Ok(message) => self.answer(&message),
                    Err(e) => Err(TransportError::from(e).to_string()),
                };
                let envelope = match response {
                    Ok(result) => Envelope::Response {
                        id,
                        result: Some(result),
                        error: None,
                    },
                    Err(error) => Envelope::Response {
                        id,
                        result: None,
                        error: Some(error),
                    },
                };
                if let Err(e) = self.inner.backend.send(envelope) {
                    tracing::debug!(id, error = %e, "could not answer request");
                }
            }
        }
    }

    fn handle_event(&self, message: &Message) {
        let handlers: Vec<EventHandler> = lock(&self.inner.event_handlers)
            .iter()
            .filter(|(name, _)| *name == message.name)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        if !handlers.iter().any(|handler| handler(message)) {
            tracing::trace!(event = %message.name, "unhandled event");
        }
    }

    fn answer(&self, message: &Message) -> Result<Value, String> {
        let handler = lock(&self.inner.request_handlers)
            .get(&message.name)
            .cloned();
        match handler {
            Some(handler) => handler(message),
            None => Err(TransportError::Unhandled(message.name.clone()).to_string()),
        }
    }

    /// Receive from `inbound` until `cancel` fires or the channel closes.
    pub async fn pump(&self, mut inbound: Inbound, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = inbound.recv() => match next {
                    Some(envelope) => self.receive(envelope),
                    None => break,
                },
            }
        }
        tracing::debug!("transport pump stopped");
    }

    /// Spawn [`pump`](Self::pump) on tokio.
    pub fn attach(&self, inbound: Inbound, cancel: CancellationToken) -> JoinHandle<()> {
        let transport = self.clone();
        tokio::spawn(async move { transport.pump(inbound, cancel).await })
    }

    /// Fail every pending request with [`TransportError::Closed`] and drop
    /// all handlers.
    pub fn dispose(&self) {
        for (_, tx) in lock(&self.inner.pending).drain() {
            let _ = tx.send(Err(TransportError::Closed));
        }
        lock(&self.inner.event_handlers).clear();
        lock(&self.inner.request_handlers).clear();
    }
}
