//! `mobile/picture-in-picture`

use meet_dispatch::Action;

#[derive(Action, Clone, Debug)]
#[action(feature = "mobile/picture-in-picture", kinds = "kinds")]
pub enum PictureInPictureAction {
    /// The host app shrank the conference into a floating window
    #[action(kind = "ENTER_PICTURE_IN_PICTURE")]
    Enter,
}
