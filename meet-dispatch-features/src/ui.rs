//! Responsive UI, toolbox and filmstrip visibility

use meet_dispatch::{Action, SliceKey, SliceUpdate};

use crate::action::ShellAction;

pub const RESPONSIVE_UI: SliceKey<ResponsiveUiState> = SliceKey::new("features/base/responsive-ui");
pub const TOOLBOX: SliceKey<ToolboxState> = SliceKey::new("features/toolbox");
pub const FILMSTRIP: SliceKey<FilmstripState> = SliceKey::new("features/filmstrip");

#[derive(Action, Clone, Debug)]
#[action(feature = "ui", kinds = "kinds")]
pub enum UiAction {
    /// The window got too small (or large enough again) for the full UI
    SetReducedUi { reduced: bool },
    SetToolboxEnabled { enabled: bool },
    SetFilmstripEnabled { enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponsiveUiState {
    pub reduced_ui: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolboxState {
    pub enabled: bool,
}

impl Default for ToolboxState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilmstripState {
    pub enabled: bool,
}

impl Default for FilmstripState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub fn responsive_ui_reducer(
    state: &ResponsiveUiState,
    action: &ShellAction,
) -> SliceUpdate<ResponsiveUiState> {
    match action {
        ShellAction::Ui(UiAction::SetReducedUi { reduced }) => SliceUpdate::when_changed(
            state,
            ResponsiveUiState {
                reduced_ui: *reduced,
            },
        ),
        _ => SliceUpdate::Unchanged,
    }
}

pub fn toolbox_reducer(state: &ToolboxState, action: &ShellAction) -> SliceUpdate<ToolboxState> {
    match action {
        ShellAction::Ui(UiAction::SetToolboxEnabled { enabled }) => {
            SliceUpdate::when_changed(state, ToolboxState { enabled: *enabled })
        }
        _ => SliceUpdate::Unchanged,
    }
}

pub fn filmstrip_reducer(
    state: &FilmstripState,
    action: &ShellAction,
) -> SliceUpdate<FilmstripState> {
    match action {
        ShellAction::Ui(UiAction::SetFilmstripEnabled { enabled }) => {
            SliceUpdate::when_changed(state, FilmstripState { enabled: *enabled })
        }
        _ => SliceUpdate::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(UiAction::SetReducedUi { reduced: true }.name(), "SET_REDUCED_UI");
        assert_eq!(
            UiAction::SetToolboxEnabled { enabled: true }.name(),
            "SET_TOOLBOX_ENABLED"
        );
    }

    #[test]
    fn test_same_value_is_unchanged() {
        let update = toolbox_reducer(
            &ToolboxState::default(),
            &ShellAction::Ui(UiAction::SetToolboxEnabled { enabled: true }),
        );
        assert_eq!(update, SliceUpdate::Unchanged);
    }
}
