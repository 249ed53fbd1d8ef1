//! Mirrors conference lifecycle events to the embedding app
//!
//! Events carry the conference URL in place of the session handle:
//!
//! ```text
//! { "name": "CONFERENCE_JOINED", "data": { "url": "https://meet.example/room1" } }
//! ```
//!
//! Two kinds are policed:
//! - `CONFERENCE_LEFT` is dropped while the slice still tracks a session for
//!   the same URL (a rejoin of the same room is in flight).
//! - `CONFERENCE_WILL_JOIN` from the session lifecycle is always dropped; the
//!   embedder already got one when `SET_ROOM` named the room.

use std::rc::Rc;

use meet_dispatch::{
    Action, DispatchError, EventBridge, EventSink, ExternalEvent, Forwarded, ListenerRegistry,
    Middleware, Reduction, Store,
};

use crate::action::ShellAction;
use crate::conference::{self, ConferenceAction, CONFERENCE};
use crate::config::ConfigAction;
use crate::connection::{ConnectionAction, CONNECTION};
use crate::picture_in_picture::PictureInPictureAction;
use crate::util::is_room_valid;

pub struct ExternalApiMiddleware {
    bridge: EventBridge<ShellAction>,
}

impl ExternalApiMiddleware {
    pub fn new(listeners: Rc<ListenerRegistry<dyn EventSink>>) -> Self {
        let mut bridge = EventBridge::new(listeners);
        bridge
            .swallow_when(&conference::kinds::CONFERENCE_LEFT, |state, action| {
                let ShellAction::Conference(ConferenceAction::Left { conference }) = action else {
                    return false;
                };
                state
                    .get(&CONFERENCE)
                    .is_some_and(|slice| slice.tracks_url(conference.url()))
            })
            .always_swallow(&conference::kinds::CONFERENCE_WILL_JOIN);
        Self { bridge }
    }

    pub fn bridge(&self) -> &EventBridge<ShellAction> {
        &self.bridge
    }

    fn location_url(store: &Store<ShellAction>) -> Option<String> {
        store
            .get(&CONNECTION)
            .and_then(|connection| connection.location_url.clone())
    }

    fn forward(&self, store: &Store<ShellAction>, action: &ShellAction) -> Option<Forwarded> {
        let state = store.state();
        let event = ExternalEvent::for_kind(action.kind());

        let forwarded = match action {
            ShellAction::Conference(ConferenceAction::Failed { conference, error }) => {
                if error.recoverable {
                    tracing::debug!(error = %error, "recoverable conference failure not forwarded");
                    return None;
                }
                self.bridge.forward(
                    &state,
                    action,
                    event
                        .with("url", conference.url())
                        .with("error", error.to_string()),
                )
            }
            ShellAction::Conference(
                ConferenceAction::Joined { conference }
                | ConferenceAction::Left { conference }
                | ConferenceAction::WillJoin { conference }
                | ConferenceAction::WillLeave { conference },
            ) => self
                .bridge
                .forward(&state, action, event.with("url", conference.url())),
            ShellAction::Conference(ConferenceAction::SetRoom { room }) => {
                let url = Self::location_url(store)?;
                if !is_room_valid(room.as_deref()) {
                    return None;
                }
                self.bridge.emit(
                    &ExternalEvent::for_kind(&conference::kinds::CONFERENCE_WILL_JOIN)
                        .with("url", url),
                )
            }
            ShellAction::Connection(ConnectionAction::Failed { error }) => {
                if error.recoverable {
                    return None;
                }
                let url = Self::location_url(store)?;
                self.bridge.emit(
                    &ExternalEvent::for_kind(&conference::kinds::CONFERENCE_FAILED)
                        .with("url", url)
                        .with("error", error.name.clone()),
                )
            }
            ShellAction::PictureInPicture(PictureInPictureAction::Enter) => {
                self.bridge.emit(&event)
            }
            ShellAction::Config(ConfigAction::LoadConfigError {
                error,
                location_url,
            }) => self.bridge.emit(
                &event
                    .with("error", error.clone())
                    .with("url", location_url.clone()),
            ),
            _ => return None,
        };
        Some(forwarded)
    }
}

impl Middleware<ShellAction> for ExternalApiMiddleware {
    fn name(&self) -> &'static str {
        "external-api"
    }

    fn after(
        &self,
        store: &Store<ShellAction>,
        action: &ShellAction,
        reduction: Reduction<'_>,
    ) -> Result<(), DispatchError> {
        if reduction.is_swallowed() {
            return Ok(());
        }
        if let Some(forwarded) = self.forward(store, action) {
            tracing::trace!(action = action.name(), ?forwarded, "external api");
        }
        Ok(())
    }
}
