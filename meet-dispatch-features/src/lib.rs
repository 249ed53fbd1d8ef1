//! Conference shell features for meet-dispatch
//!
//! Each feature module owns its actions (with their kind tokens in a `kinds`
//! submodule), its slice key and state, and a reducer. Middlewares tie the
//! features together:
//!
//! - [`conference_ui::ConferenceUiMiddleware`]: toolbox, filmstrip and video
//!   quality follow the responsive UI; kicks end the session
//! - [`calendar_sync::CalendarSyncMiddleware`]: meeting links from the device
//!   calendar
//! - [`external_api::ExternalApiMiddleware`]: lifecycle events for the
//!   embedding app
//!
//! [`shell::ShellBuilder`] registers all of them:
//!
//! ```ignore
//! use meet_dispatch::prelude::*;
//! use meet_dispatch_features::prelude::*;
//!
//! let mut runtime = DispatchRuntime::new(ShellBuilder::new(RuntimeConfig::default()).build()?);
//! let room1 = ConferenceHandle::new("https://meet.example/room1");
//! runtime.dispatch(ConferenceAction::WillJoin { conference: room1.clone() }.into())?;
//! runtime.dispatch(ConferenceAction::Joined { conference: room1 }.into())?;
//! ```
//!
//! The device selection popup ([`device_selection`]) lives on the other side
//! of a [`Transport`](meet_dispatch::Transport) and does not touch the store.

mod action;

pub mod app;
pub mod calendar_sync;
pub mod conference;
pub mod conference_ui;
pub mod config;
pub mod connection;
pub mod device_selection;
pub mod error;
pub mod external_api;
pub mod known_domains;
pub mod lib_engine;
pub mod picture_in_picture;
pub mod shell;
pub mod ui;
pub mod util;

pub use action::ShellAction;
pub use error::ConferenceError;
pub use shell::{ShellBuilder, ShellError};

pub mod prelude {
    pub use crate::action::ShellAction;
    pub use crate::app::AppAction;
    pub use crate::calendar_sync::{CalendarSource, CalendarSyncAction};
    pub use crate::conference::{ConferenceAction, ConferenceHandle, PasswordMethod};
    pub use crate::config::ConfigAction;
    pub use crate::connection::ConnectionAction;
    pub use crate::error::ConferenceError;
    pub use crate::known_domains::KnownDomainsAction;
    pub use crate::lib_engine::LibEngineAction;
    pub use crate::picture_in_picture::PictureInPictureAction;
    pub use crate::shell::{ShellBuilder, ShellError};
    pub use crate::ui::UiAction;
}
