use meet_dispatch::Action;

use crate::app::AppAction;
use crate::calendar_sync::CalendarSyncAction;
use crate::conference::ConferenceAction;
use crate::config::ConfigAction;
use crate::connection::ConnectionAction;
use crate::known_domains::KnownDomainsAction;
use crate::lib_engine::LibEngineAction;
use crate::picture_in_picture::PictureInPictureAction;
use crate::ui::UiAction;

/// Every action the shell store accepts, grouped by owning feature.
///
/// Feature enums convert into it with `.into()`; kind tokens stay those of
/// the feature, so `ShellAction::from(left).kind()` is
/// `&conference::kinds::CONFERENCE_LEFT`.
#[derive(Action, Clone, Debug)]
#[action(feature = "shell")]
pub enum ShellAction {
    #[action(nested)]
    App(AppAction),
    #[action(nested)]
    Calendar(CalendarSyncAction),
    #[action(nested)]
    Conference(ConferenceAction),
    #[action(nested)]
    Config(ConfigAction),
    #[action(nested)]
    Connection(ConnectionAction),
    #[action(nested)]
    KnownDomains(KnownDomainsAction),
    #[action(nested)]
    LibEngine(LibEngineAction),
    #[action(nested)]
    PictureInPicture(PictureInPictureAction),
    #[action(nested)]
    Ui(UiAction),
}
