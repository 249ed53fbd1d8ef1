//! Conference screen follow-ups
//!
//! Keeps toolbox, filmstrip and receive quality in line with the responsive
//! UI state, and turns a kick into a terminal failure plus a trip home.

use meet_dispatch::{DispatchError, Middleware, Reduction, Store};

use crate::action::ShellAction;
use crate::app::AppAction;
use crate::conference::{ConferenceAction, VideoQuality, CONFERENCE};
use crate::error::ConferenceError;
use crate::ui::{UiAction, RESPONSIVE_UI};

#[derive(Debug, Default)]
pub struct ConferenceUiMiddleware;

impl ConferenceUiMiddleware {
    pub fn new() -> Self {
        Self
    }

    fn apply_reduced_ui(&self, store: &Store<ShellAction>) -> Result<(), DispatchError> {
        let reduced = store.get(&RESPONSIVE_UI).is_some_and(|ui| ui.reduced_ui);
        let audio_only = store.get(&CONFERENCE).is_some_and(|c| c.audio_only);

        store.dispatch(UiAction::SetToolboxEnabled { enabled: !reduced }.into())?;
        store.dispatch(UiAction::SetFilmstripEnabled { enabled: !reduced }.into())?;
        if !audio_only {
            let quality = if reduced {
                VideoQuality::Low
            } else {
                VideoQuality::High
            };
            store.dispatch(ConferenceAction::SetReceiveVideoQuality { quality }.into())?;
        }
        Ok(())
    }
}

impl Middleware<ShellAction> for ConferenceUiMiddleware {
    fn name(&self) -> &'static str {
        "conference-ui"
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
        match action {
            ShellAction::Conference(ConferenceAction::Joined { .. })
            | ShellAction::Ui(UiAction::SetReducedUi { .. }) => self.apply_reduced_ui(store),
            ShellAction::Conference(ConferenceAction::KickedOut { conference }) => {
                tracing::info!(url = %conference.url(), "kicked out of conference");
                store.dispatch(
                    ConferenceAction::Failed {
                        conference: conference.clone(),
                        error: ConferenceError::kicked(),
                    }
                    .into(),
                )?;
                store.dispatch(AppAction::Navigate { url: None }.into())?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
