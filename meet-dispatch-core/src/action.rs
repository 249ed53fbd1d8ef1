//! Action trait and kind tokens

use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};

/// Marker prefix used in the internal token representation of a kind.
pub(crate) const TOKEN_MARKER: &str = "@@";

/// Unique identity of an action kind.
///
/// Kinds are declared as `static` items (one per action variant, generated by
/// `#[derive(Action)]`) and compared by address. Two kinds that share a
/// `name` but live in different features are therefore never equal.
///
/// # Example
/// ```
/// use meet_dispatch_core::ActionKind;
///
/// static LEFT_A: ActionKind = ActionKind::new("base/conference", "CONFERENCE_LEFT");
/// static LEFT_B: ActionKind = ActionKind::new("legacy/conference", "CONFERENCE_LEFT");
///
/// assert_eq!(&LEFT_A, &LEFT_A);
/// assert_ne!(&LEFT_A, &LEFT_B);
/// assert_eq!(LEFT_A.to_string(), "Kind(@@base/conference/CONFERENCE_LEFT)");
/// ```
pub struct ActionKind {
    feature: &'static str,
    name: &'static str,
}

impl ActionKind {
    /// Declare a kind. Only meaningful when bound to a `static`.
    pub const fn new(feature: &'static str, name: &'static str) -> Self {
        Self { feature, name }
    }

    /// Owning feature, e.g. `base/conference`
    pub fn feature(&self) -> &'static str {
        self.feature
    }

    /// Bare kind name, e.g. `CONFERENCE_LEFT`
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ActionKind {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ActionKind {}

impl Hash for ActionKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feature, self.name)
    }
}

/// Internal token representation: `Kind(@@<feature>/<name>)`
impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({}{}/{})", TOKEN_MARKER, self.feature, self.name)
    }
}

/// Trait for actions that can be dispatched to the store
///
/// Actions describe something that happened or is requested. They should be:
/// - Clone: actions are logged, forwarded and replayed
/// - Debug: for logging
/// - Send + 'static: async follow-ups cross task boundaries
///
/// Use `#[derive(Action)]` from `meet-dispatch-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// The unique kind token of this action
    fn kind(&self) -> &'static ActionKind;

    /// Kind name for logging and filtering
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Short human-readable description used by the action log.
///
/// Defaults to the `Debug` representation; override for payload-heavy actions.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    static JOINED: ActionKind = ActionKind::new("base/conference", "CONFERENCE_JOINED");
    static OTHER_JOINED: ActionKind = ActionKind::new("lobby", "CONFERENCE_JOINED");

    #[test]
    fn test_identity_not_name() {
        assert_eq!(JOINED.name(), OTHER_JOINED.name());
        assert_ne!(&JOINED, &OTHER_JOINED);
        assert_eq!(&JOINED, &JOINED);
    }

    #[test]
    fn test_hash_by_identity() {
        let mut set: HashSet<&'static ActionKind> = HashSet::new();
        set.insert(&JOINED);
        set.insert(&OTHER_JOINED);
        set.insert(&JOINED);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(JOINED.to_string(), "Kind(@@base/conference/CONFERENCE_JOINED)");
        assert_eq!(format!("{:?}", JOINED), "base/conference/CONFERENCE_JOINED");
    }
}
