//! Forwarding internal actions to external observers
//!
//! External observers (a native shell, an embedding page) never see actions
//! directly. An [`EventBridge`] turns qualifying actions into
//! [`ExternalEvent`]s, the flat `{ "name": .., "data": {..} }` shape, and
//! hands them to every live [`EventSink`] in its [`ListenerRegistry`].
//!
//! Which actions qualify is decided by per-kind swallow predicates; the
//! decision of *what* to put in `data` belongs to the middleware driving the
//! bridge.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::TOKEN_MARKER;
use crate::state::StateTree;
use crate::{Action, ActionKind};

/// Event delivered to external observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEvent {
    /// Short identifier, e.g. `CONFERENCE_JOINED`
    pub name: String,
    /// Flat JSON payload
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ExternalEvent {
    /// Event with empty data
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
        }
    }

    /// Event named after `kind`
    pub fn for_kind(kind: &ActionKind) -> Self {
        Self::new(event_name(kind))
    }

    /// Add a payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Use a serializable struct as payload; it must serialize to an object.
    pub fn from_payload<T: Serialize>(
        name: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let data = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "event payload must be an object, got {other}"
                )))
            }
        };
        Ok(Self {
            name: name.into(),
            data,
        })
    }

    /// Payload field by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Decode a token such as `Kind(@@base/conference/CONFERENCE_LEFT)` into
/// `CONFERENCE_LEFT`.
///
/// Inputs without the wrapper or marker are accepted as-is.
pub fn decode_token(token: &str) -> &str {
    let inner = token
        .strip_prefix("Kind(")
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(token);
    let inner = inner.strip_prefix(TOKEN_MARKER).unwrap_or(inner);
    inner.rsplit('/').next().unwrap_or(inner)
}

/// External name of an action kind.
///
/// ```
/// use meet_dispatch_core::{bridge::event_name, ActionKind};
///
/// static JOINED: ActionKind = ActionKind::new("base/conference", "CONFERENCE_JOINED");
/// assert_eq!(event_name(&JOINED), "CONFERENCE_JOINED");
/// ```
pub fn event_name(kind: &ActionKind) -> String {
    decode_token(&kind.to_string()).to_owned()
}

/// Receiver of forwarded events.
pub trait EventSink {
    fn send_event(&self, event: &ExternalEvent);
}

/// Stable identity of a registered listener, chosen by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ListenerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-owning set of listeners keyed by [`ListenerId`].
///
/// The registry holds `Weak` references: the owner keeps its listener alive
/// and is expected to [`remove`](Self::remove) it before teardown. Entries
/// whose owner is already gone are skipped and pruned.
///
/// ```
/// use std::rc::Rc;
/// use meet_dispatch_core::bridge::ListenerRegistry;
///
/// let registry: ListenerRegistry<String> = ListenerRegistry::new();
/// let shell = Rc::new("shell".to_string());
/// registry.add("native-shell", &shell);
///
/// assert!(registry.remove(&"native-shell".into()));
/// assert!(!registry.remove(&"native-shell".into()));
/// assert!(registry.is_empty());
/// ```
pub struct ListenerRegistry<L: ?Sized> {
    entries: RefCell<Vec<(ListenerId, Weak<L>)>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for ListenerRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .entries
            .borrow()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect();
        f.debug_struct("ListenerRegistry").field("ids", &ids).finish()
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register `listener` under `id`. An entry with the same id is
    /// replaced; returns true in that case.
    pub fn add(&self, id: impl Into<ListenerId>, listener: &Rc<L>) -> bool {
        let id = id.into();
        let weak = Rc::downgrade(listener);
        let mut entries = self.entries.borrow_mut();
        if let Some(slot) = entries.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = weak;
            return true;
        }
        tracing::trace!(listener = %id, "listener added");
        entries.push((id, weak));
        false
    }

    /// Remove the entry under `id`; false if there was none.
    pub fn remove(&self, id: &ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _)| existing != id);
        entries.len() != before
    }

    pub fn contains(&self, id: &ListenerId) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(existing, weak)| existing == id && weak.strong_count() > 0)
    }

    /// Live listeners at this instant, in registration order.
    ///
    /// Callers iterate the returned vector, so listeners may add or remove
    /// entries while being notified without affecting the current pass.
    pub fn snapshot(&self) -> Vec<Rc<L>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|(_, weak)| weak.strong_count() > 0);
        entries.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of handing an event to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Delivered to this many listeners
    Delivered(usize),
    /// A swallow predicate matched
    Swallowed,
    /// Nobody is listening; the event is dropped
    NoListener,
}

type SwallowPredicate<A> = Box<dyn Fn(&StateTree, &A) -> bool>;

/// Policy-checked forwarding of actions to a [`ListenerRegistry`].
pub struct EventBridge<A: Action> {
    listeners: Rc<ListenerRegistry<dyn EventSink>>,
    swallow: HashMap<&'static ActionKind, Vec<SwallowPredicate<A>>>,
}

impl<A: Action> fmt::Debug for EventBridge<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("listeners", &self.listeners)
            .field("policies", &self.swallow.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<A: Action> Default for EventBridge<A> {
    fn default() -> Self {
        Self::new(Rc::new(ListenerRegistry::new()))
    }
}

impl<A: Action> EventBridge<A> {
    /// Bridge delivering to `listeners`; the registry stays shared with the
    /// caller so listeners can come and go afterwards.
    pub fn new(listeners: Rc<ListenerRegistry<dyn EventSink>>) -> Self {
        Self {
            listeners,
            swallow: HashMap::new(),
        }
    }

    pub fn listeners(&self) -> &Rc<ListenerRegistry<dyn EventSink>> {
        &self.listeners
    }

    /// Suppress actions of `kind` for which `predicate` holds.
    ///
    /// Several predicates per kind are allowed; any one matching swallows.
    pub fn swallow_when<F>(&mut self, kind: &'static ActionKind, predicate: F) -> &mut Self
    where
        F: Fn(&StateTree, &A) -> bool + 'static,
    {
        self.swallow.entry(kind).or_default().push(Box::new(predicate));
        self
    }

    /// Unconditionally suppress actions of `kind`
    pub fn always_swallow(&mut self, kind: &'static ActionKind) -> &mut Self {
        self.swallow_when(kind, |_, _| true)
    }

    /// Whether a predicate swallows `action` in `state`
    pub fn is_swallowed(&self, state: &StateTree, action: &A) -> bool {
        self.swallow
            .get(action.kind())
            .is_some_and(|predicates| predicates.iter().any(|p| p(state, action)))
    }

    /// Deliver `event` for `action` unless a swallow predicate matches.
    pub fn forward(&self, state: &StateTree, action: &A, event: ExternalEvent) -> Forwarded {
        if self.is_swallowed(state, action) {
            tracing::debug!(action = %action.kind(), "external event swallowed");
            return Forwarded::Swallowed;
        }
        self.emit(&event)
    }

    /// Deliver `event` without consulting the policy.
    pub fn emit(&self, event: &ExternalEvent) -> Forwarded {
        let listeners = self.listeners.snapshot();
        if listeners.is_empty() {
            tracing::trace!(event = %event.name, "no external listener");
            return Forwarded::NoListener;
        }
        for listener in &listeners {
            listener.send_event(event);
        }
        tracing::debug!(event = %event.name, listeners = listeners.len(), "external event sent");
        Forwarded::Delivered(listeners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    static LEFT: ActionKind = ActionKind::new("base/conference", "CONFERENCE_LEFT");
    static JOINED: ActionKind = ActionKind::new("base/conference", "CONFERENCE_JOINED");

    #[derive(Clone, Debug)]
    enum TestAction {
        Left(&'static str),
        Joined,
    }

    impl Action for TestAction {
        fn kind(&self) -> &'static ActionKind {
            match self {
                TestAction::Left(_) => &LEFT,
                TestAction::Joined => &JOINED,
            }
        }
    }

    #[test]
    fn test_decode_token() {
        assert_eq!(decode_token("Kind(@@base/conference/CONFERENCE_LEFT)"), "CONFERENCE_LEFT");
        assert_eq!(decode_token("Kind(@@SET_ROOM)"), "SET_ROOM");
        assert_eq!(decode_token("PLAIN"), "PLAIN");
        assert_eq!(event_name(&LEFT), "CONFERENCE_LEFT");
    }

    #[test]
    fn test_from_payload_requires_object() {
        #[derive(Serialize)]
        struct Payload {
            url: &'static str,
        }
        let event = ExternalEvent::from_payload("X", &Payload { url: "u" }).unwrap();
        assert_eq!(event.get("url"), Some(&Value::from("u")));
        assert!(ExternalEvent::from_payload("X", &5).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let event = ExternalEvent::new("CONFERENCE_JOINED").with("url", "https://meet/room1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "CONFERENCE_JOINED", "data": { "url": "https://meet/room1" } })
        );
    }

    #[test]
    fn test_add_replaces_same_id() {
        let registry: ListenerRegistry<dyn EventSink> = ListenerRegistry::new();
        let first: Rc<dyn EventSink> = Rc::new(RecordingSink::default());
        let second: Rc<dyn EventSink> = Rc::new(RecordingSink::default());

        assert!(!registry.add("shell", &first));
        assert!(registry.add("shell", &second));
        assert_eq!(registry.len(), 1);
        assert!(Rc::ptr_eq(&registry.snapshot()[0], &second));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry: ListenerRegistry<dyn EventSink> = ListenerRegistry::new();
        let a: Rc<dyn EventSink> = Rc::new(RecordingSink::default());
        let b: Rc<dyn EventSink> = Rc::new(RecordingSink::default());
        registry.add("a", &a);
        registry.add("b", &b);

        let id = ListenerId::from("a");
        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&"b".into()));
    }

    #[test]
    fn test_dropped_owner_is_pruned() {
        let registry: ListenerRegistry<dyn EventSink> = ListenerRegistry::new();
        {
            let gone: Rc<dyn EventSink> = Rc::new(RecordingSink::default());
            registry.add("gone", &gone);
        }
        assert!(registry.snapshot().is_empty());
        assert!(!registry.remove(&"gone".into()));
    }

    #[test]
    fn test_listener_removing_itself_mid_pass() {
        struct SelfRemoving {
            registry: Rc<ListenerRegistry<dyn EventSink>>,
            calls: RefCell<usize>,
        }
        impl EventSink for SelfRemoving {
            fn send_event(&self, _event: &ExternalEvent) {
                *self.calls.borrow_mut() += 1;
                self.registry.remove(&"self".into());
            }
        }

        let registry: Rc<ListenerRegistry<dyn EventSink>> = Rc::new(ListenerRegistry::new());
        let me = Rc::new(SelfRemoving {
            registry: registry.clone(),
            calls: RefCell::new(0),
        });
        let me_dyn: Rc<dyn EventSink> = me.clone();
        let other = Rc::new(RecordingSink::default());
        let other_dyn: Rc<dyn EventSink> = other.clone();
        registry.add("self", &me_dyn);
        registry.add("other", &other_dyn);

        let bridge = EventBridge::<TestAction>::new(registry.clone());
        assert_eq!(bridge.emit(&ExternalEvent::new("PING")), Forwarded::Delivered(2));
        assert_eq!(bridge.emit(&ExternalEvent::new("PING")), Forwarded::Delivered(1));
        assert_eq!(*me.calls.borrow(), 1);
        assert_eq!(other.events().len(), 2);
    }

    #[test]
    fn test_forward_policy() {
        let registry = Rc::new(ListenerRegistry::<dyn EventSink>::new());
        let mut bridge = EventBridge::<TestAction>::new(registry.clone());
        bridge.swallow_when(&LEFT, |_, action| matches!(action, TestAction::Left("active")));
        let state = StateTree::default();

        // nobody listening
        let event = ExternalEvent::for_kind(&JOINED);
        assert_eq!(
            bridge.forward(&state, &TestAction::Joined, event.clone()),
            Forwarded::NoListener
        );

        let sink = Rc::new(RecordingSink::default());
        let sink_dyn: Rc<dyn EventSink> = sink.clone();
        registry.add("shell", &sink_dyn);

        assert_eq!(
            bridge.forward(&state, &TestAction::Joined, event),
            Forwarded::Delivered(1)
        );
        assert_eq!(
            bridge.forward(
                &state,
                &TestAction::Left("active"),
                ExternalEvent::for_kind(&LEFT)
            ),
            Forwarded::Swallowed
        );
        assert_eq!(
            bridge.forward(
                &state,
                &TestAction::Left("stale"),
                ExternalEvent::for_kind(&LEFT)
            ),
            Forwarded::Delivered(1)
        );
        assert_eq!(sink.names(), vec!["CONFERENCE_JOINED", "CONFERENCE_LEFT"]);
    }
}
