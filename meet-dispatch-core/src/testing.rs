//! Test utilities for stores, middlewares and bridges
//!
//! - [`RecordingSink`]: an [`EventSink`] that keeps every event it receives
//! - [`StoreHarness`]: a store plus its follow-up queue, drained on demand
//! - [`assert_forwarded!`], [`assert_not_forwarded!`], [`count_forwarded!`]:
//!   assertions over recorded external events
//!
//! # Example
//!
//! ```ignore
//! use meet_dispatch::testing::{as_sink, RecordingSink, StoreHarness};
//! use meet_dispatch::assert_forwarded;
//!
//! let sink = RecordingSink::shared();
//! listeners.add("shell", &as_sink(&sink));
//!
//! let mut harness = StoreHarness::new(builder);
//! harness.dispatch(AppAction::SetRoom { room: "standup".into() });
//!
//! assert_forwarded!(sink.events(), "CONFERENCE_WILL_JOIN", "url" => "https://meet.example/standup");
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::bridge::{EventSink, ExternalEvent};
use crate::error::DispatchError;
use crate::runtime::DispatchRuntime;
use crate::state::{SliceKey, StateTree};
use crate::store::{DispatchOutcome, Store, StoreBuilder};
use crate::Action;

/// Event sink that records everything it is sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<ExternalEvent>>,
}

impl RecordingSink {
    /// A sink behind `Rc`, ready to be registered
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Copy of all recorded events, oldest first
    pub fn events(&self) -> Vec<ExternalEvent> {
        self.events.borrow().clone()
    }

    /// Names of all recorded events
    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }

    /// Take all recorded events, leaving the sink empty
    pub fn drain(&self) -> Vec<ExternalEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn send_event(&self, event: &ExternalEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Upcast a shared recording sink for registration.
pub fn as_sink(sink: &Rc<RecordingSink>) -> Rc<dyn EventSink> {
    sink.clone()
}

/// Whether `event.data[key]` equals `value` once converted to JSON.
pub fn field_eq(event: &ExternalEvent, key: &str, value: impl Into<Value>) -> bool {
    event.data.get(key) == Some(&value.into())
}

/// How long [`StoreHarness::settle`] waits for a follow-up
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Store plus follow-up queue for synchronous tests.
///
/// Every `dispatch` also drains follow-ups queued with
/// [`Store::enqueue`], so a test sees the settled state. Spawned tasks still
/// need the tokio runtime to make progress; use [`settle`](Self::settle) for
/// those.
pub struct StoreHarness<A: Action> {
    runtime: DispatchRuntime<A>,
}

impl<A: Action> StoreHarness<A> {
    pub fn new(builder: StoreBuilder<A>) -> Self {
        Self {
            runtime: DispatchRuntime::new(builder),
        }
    }

    pub fn store(&self) -> &Store<A> {
        self.runtime.store()
    }

    pub fn state(&self) -> Arc<StateTree> {
        self.runtime.store().state()
    }

    /// Slice by key.
    ///
    /// # Panics
    ///
    /// Panics if the slice is not registered.
    pub fn get<S: Send + Sync + 'static>(&self, key: &SliceKey<S>) -> Arc<S> {
        self.runtime
            .store()
            .get(key)
            .unwrap_or_else(|| panic!("slice `{}` is not registered", key.name()))
    }

    /// Dispatch and drain queued follow-ups; returns the outcome of `action`.
    pub fn dispatch(&mut self, action: A) -> Result<DispatchOutcome, DispatchError> {
        let outcome = self.runtime.dispatch(action);
        self.runtime.drain();
        outcome
    }

    /// Dispatch a sequence, panicking on the first error
    pub fn dispatch_all(&mut self, actions: impl IntoIterator<Item = A>) {
        for action in actions {
            let name = action.name();
            if let Err(e) = self.dispatch(action) {
                panic!("dispatch of {name} failed: {e}");
            }
        }
    }

    /// Dispatch queued follow-ups; returns how many ran
    pub fn drain(&mut self) -> usize {
        self.runtime.drain()
    }

    /// Wait for one follow-up (e.g. from a spawned task) and dispatch it,
    /// then drain anything it queued.
    ///
    /// Gives up after [`SETTLE_TIMEOUT`] and returns `None`.
    pub async fn settle(&mut self) -> Option<Result<DispatchOutcome, DispatchError>> {
        self.settle_within(SETTLE_TIMEOUT).await
    }

    /// [`settle`](Self::settle) with an explicit bound on the wait
    pub async fn settle_within(
        &mut self,
        timeout: Duration,
    ) -> Option<Result<DispatchOutcome, DispatchError>> {
        let outcome = tokio::time::timeout(timeout, self.runtime.next())
            .await
            .ok()
            .flatten();
        self.runtime.drain();
        outcome
    }

    /// Advance paused tokio time, let woken tasks run, then drain their
    /// follow-ups. Requires a runtime started with `start_paused = true`.
    #[cfg(feature = "testing-time")]
    pub async fn advance(&mut self, duration: Duration) -> usize {
        tokio::time::advance(duration).await;
        tokio::task::yield_now().await;
        self.runtime.drain()
    }
}

/// Assert that an event with the given name (and optionally data fields)
/// was forwarded.
///
/// ```ignore
/// assert_forwarded!(sink.events(), "CONFERENCE_LEFT");
/// assert_forwarded!(sink.events(), "CONFERENCE_LEFT", "url" => "https://meet.example/room1");
/// ```
#[macro_export]
macro_rules! assert_forwarded {
    ($events:expr, $name:expr $(, $key:literal => $value:expr)*) => {{
        let events = &$events;
        assert!(
            events.iter().any(|e| e.name == $name
                $(&& $crate::testing::field_eq(e, $key, $value))*),
            "Expected event `{}` to be forwarded, but got: {:?}",
            $name,
            events
        );
    }};
}

/// Assert that no event with the given name was forwarded.
///
/// ```ignore
/// assert_not_forwarded!(sink.events(), "CONFERENCE_FAILED");
/// ```
#[macro_export]
macro_rules! assert_not_forwarded {
    ($events:expr, $name:expr) => {{
        let events = &$events;
        assert!(
            !events.iter().any(|e| e.name == $name),
            "Expected event `{}` NOT to be forwarded, but it was: {:?}",
            $name,
            events
        );
    }};
}

/// Count forwarded events with the given name.
///
/// ```ignore
/// assert_eq!(count_forwarded!(sink.events(), "CONFERENCE_WILL_JOIN"), 1);
/// ```
#[macro_export]
macro_rules! count_forwarded {
    ($events:expr, $name:expr) => {
        $events.iter().filter(|e| e.name == $name).count()
    };
}
