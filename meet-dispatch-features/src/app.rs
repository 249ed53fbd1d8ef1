//! `app`: mounting, navigation and foreground/background state

use meet_dispatch::{Action, SliceKey, SliceUpdate};

use crate::action::ShellAction;
use crate::util::to_url_string;

pub const APP: SliceKey<AppState> = SliceKey::new("features/app");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

#[derive(Action, Clone, Debug)]
#[action(feature = "app", prefix = "APP", kinds = "kinds")]
pub enum AppAction {
    WillMount,
    /// Go to `url`; `None` returns to the welcome page
    Navigate { url: Option<String> },
    StateChanged { state: Lifecycle },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub mounted: bool,
    pub route: Option<String>,
    pub lifecycle: Lifecycle,
}

pub fn reducer(state: &AppState, action: &ShellAction) -> SliceUpdate<AppState> {
    let ShellAction::App(action) = action else {
        return SliceUpdate::Unchanged;
    };
    let next = match action {
        AppAction::WillMount => AppState {
            mounted: true,
            ..state.clone()
        },
        AppAction::Navigate { url } => AppState {
            route: url.as_deref().map(to_url_string),
            ..state.clone()
        },
        AppAction::StateChanged { state: lifecycle } => AppState {
            lifecycle: *lifecycle,
            ..state.clone()
        },
    };
    SliceUpdate::when_changed(state, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_home_clears_route() {
        let state = AppState {
            route: Some("https://meet.example/room1".into()),
            ..AppState::default()
        };
        let update = reducer(&state, &ShellAction::App(AppAction::Navigate { url: None }));
        assert!(matches!(update, SliceUpdate::Replace(next) if next.route.is_none()));
        assert_eq!(AppAction::Navigate { url: None }.name(), "APP_NAVIGATE");
    }
}
