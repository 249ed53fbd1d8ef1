//! Core traits and types for meet-dispatch
//!
//! This crate provides the event-propagation core of a conferencing client
//! shell: actions flow through an ordered middleware chain, are folded into
//! independent named state slices, and qualifying ones are forwarded to
//! external observers.
//!
//! # Core Concepts
//!
//! - **Action**: a tagged enum variant with a unique [`ActionKind`] token
//! - **Slice**: a named part of the [`StateTree`], owned by exactly one reducer
//! - **Store**: runs each dispatch through middlewares and reducers
//! - **Middleware**: ordered interceptor that may continue, replace or swallow
//! - **EventBridge**: policy-checked forwarding to external listeners
//! - **Transport**: request/response + event channel to a detached surface
//!
//! # Basic Example
//!
//! ```ignore
//! use meet_dispatch_core::prelude::*;
//!
//! const ROOM: SliceKey<RoomState> = SliceKey::new("room");
//!
//! fn room_reducer(state: &RoomState, action: &AppAction) -> SliceUpdate<RoomState> {
//!     match action {
//!         AppAction::SetRoom(name) => SliceUpdate::Replace(RoomState { name: name.clone() }),
//!         _ => SliceUpdate::Unchanged,
//!     }
//! }
//!
//! let mut reducers = ReducerRegistry::new();
//! reducers.register(ROOM, RoomState::default(), room_reducer)?;
//!
//! let (store, _follow_ups) = StoreBuilder::new(reducers)
//!     .middleware(ActionLoggerMiddleware::log_all())
//!     .build();
//! store.dispatch(AppAction::SetRoom("standup".into()))?;
//! assert_eq!(store.get(&ROOM).unwrap().name, "standup");
//! ```
//!
//! # Async Follow-ups
//!
//! Middlewares never block on I/O. They hand a future to
//! [`Store::spawn`]; the action it resolves to lands in the follow-up queue
//! and is dispatched as a fresh pass by the [`DispatchRuntime`]:
//!
//! ```ignore
//! impl Middleware<AppAction> for CalendarSync {
//!     fn after(&self, store: &Store<AppAction>, action: &AppAction, _: Reduction<'_>)
//!         -> Result<(), DispatchError>
//!     {
//!         if let AppAction::RefreshCalendar = action {
//!             let source = self.source.clone();
//!             store.spawn("calendar", async move {
//!                 AppAction::SetCalendarEvents(source.fetch().await)
//!             })?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

pub mod action;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod store;
pub mod tasks;
pub mod testing;
pub mod transport;

// Core trait exports
pub use action::{Action, ActionKind, ActionSummary};

// State and reducers
pub use registry::{Reducer, ReducerRegistry};
pub use state::{SliceKey, SliceUpdate, SliceValue, StateTree};

// Store exports
pub use middleware::{Flow, Middleware, MiddlewareChain, Reduction};
pub use runtime::{DispatchRuntime, RunExit};
pub use store::{DispatchOutcome, FollowUps, Store, StoreBuilder, SubscriptionId};
pub use tasks::{TaskKey, TaskManager};

// Bridge and transport exports
pub use bridge::{
    event_name, EventBridge, EventSink, ExternalEvent, Forwarded, ListenerId, ListenerRegistry,
};
pub use transport::{Envelope, MemoryBackend, Message, Transport, TransportBackend};

// Config, logging and errors
pub use config::RuntimeConfig;
pub use error::{ConfigError, DispatchError, DuplicateSliceError, ReducerError, TransportError};
pub use logger::{ActionLog, ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};

// Testing exports
pub use testing::{RecordingSink, StoreHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionKind, ActionSummary};
    pub use crate::bridge::{EventBridge, EventSink, ExternalEvent, Forwarded, ListenerRegistry};
    pub use crate::config::RuntimeConfig;
    pub use crate::error::{DispatchError, ReducerError, TransportError};
    pub use crate::logger::{ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::middleware::{Flow, Middleware, Reduction};
    pub use crate::registry::ReducerRegistry;
    pub use crate::runtime::DispatchRuntime;
    pub use crate::state::{SliceKey, SliceUpdate, StateTree};
    pub use crate::store::{DispatchOutcome, Store, StoreBuilder};
    pub use crate::transport::{Message, Transport};
}
