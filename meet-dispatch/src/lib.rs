//! meet-dispatch: action/reducer/middleware event propagation for
//! conferencing client shells
//!
//! Actions pass an ordered middleware chain, get folded into named state
//! slices, and qualifying ones are mirrored to external listeners.
//!
//! # Example
//! ```ignore
//! use meet_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(feature = "base/conference", prefix = "CONFERENCE")]
//! enum ConferenceAction {
//!     WillJoin { url: String },
//!     Left { url: String },
//! }
//!
//! assert_eq!(
//!     ConferenceAction::Left { url: "u".into() }.kind(),
//!     &conference_action_kinds::CONFERENCE_LEFT,
//! );
//! ```

// Re-export everything from core
pub use meet_dispatch_core::*;

// Re-export derive macros
pub use meet_dispatch_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use meet_dispatch_core::{Action, ActionKind, ActionSummary, EventSink, Middleware};

    // State and reducers
    pub use meet_dispatch_core::{ReducerRegistry, SliceKey, SliceUpdate, StateTree};

    // Store
    pub use meet_dispatch_core::{
        DispatchOutcome, DispatchRuntime, Flow, MiddlewareChain, Reduction, Store, StoreBuilder,
    };

    // Bridge and transport
    pub use meet_dispatch_core::{
        EventBridge, ExternalEvent, Forwarded, ListenerRegistry, Message, Transport,
    };

    // Config, logging, errors
    pub use meet_dispatch_core::{
        ActionLoggerConfig, ActionLoggerMiddleware, DispatchError, ReducerError, RuntimeConfig,
        TransportError,
    };

    // Derive macros
    pub use meet_dispatch_macros::Action;
}
