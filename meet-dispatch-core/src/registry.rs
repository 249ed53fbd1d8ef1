//! Reducer registry: slice name -> pure slice transition

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{DuplicateSliceError, ReducerError};
use crate::state::{SliceKey, SliceUpdate, SliceValue, StateTree};
use crate::Action;

/// A reducer that cannot fail.
///
/// Must return [`SliceUpdate::Unchanged`] for every action it does not
/// recognize; the store relies on that to detect changes by reference.
pub type Reducer<S, A> = fn(&S, &A) -> SliceUpdate<S>;

type ErasedReducer<A> = Box<dyn Fn(&SliceValue, &A) -> Result<Option<SliceValue>, ReducerError>>;

struct SliceEntry<A> {
    name: &'static str,
    default: SliceValue,
    reducer: ErasedReducer<A>,
}

/// Owns one reducer per slice name.
///
/// Registration is one-shot per name and happens at initialization; reducers
/// are never unregistered. Slices are reduced in registration order.
///
/// # Example
/// ```ignore
/// let mut reducers = ReducerRegistry::new();
/// reducers.register(CONFERENCE, ConferenceState::default(), conference::reducer)?;
/// reducers.register(CONNECTION, ConnectionState::default(), connection::reducer)?;
/// ```
pub struct ReducerRegistry<A: Action> {
    entries: Vec<SliceEntry<A>>,
    index: HashMap<&'static str, usize>,
}

impl<A: Action> Default for ReducerRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> fmt::Debug for ReducerRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerRegistry")
            .field("slices", &self.slice_names().collect::<Vec<_>>())
            .finish()
    }
}

impl<A: Action> ReducerRegistry<A> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register an infallible reducer for `key`, starting from `default`.
    pub fn register<S, F>(
        &mut self,
        key: SliceKey<S>,
        default: S,
        reducer: F,
    ) -> Result<&mut Self, DuplicateSliceError>
    where
        S: Send + Sync + 'static,
        F: Fn(&S, &A) -> SliceUpdate<S> + 'static,
    {
        self.register_fallible(key, default, move |state, action| Ok(reducer(state, action)))
    }

    /// Register a reducer that may reject an action with a [`ReducerError`].
    pub fn register_fallible<S, F>(
        &mut self,
        key: SliceKey<S>,
        default: S,
        reducer: F,
    ) -> Result<&mut Self, DuplicateSliceError>
    where
        S: Send + Sync + 'static,
        F: Fn(&S, &A) -> Result<SliceUpdate<S>, ReducerError> + 'static,
    {
        let name = key.name();
        if self.index.contains_key(name) {
            return Err(DuplicateSliceError { slice: name });
        }

        let erased: ErasedReducer<A> = Box::new(move |value, action| {
            let Some(state) = value.downcast_ref::<S>() else {
                return Err(ReducerError::new(format!(
                    "slice value is not a {}",
                    std::any::type_name::<S>()
                )));
            };
            match reducer(state, action)? {
                SliceUpdate::Unchanged => Ok(None),
                SliceUpdate::Replace(next) => Ok(Some(Arc::new(next) as SliceValue)),
            }
        });

        self.index.insert(name, self.entries.len());
        self.entries.push(SliceEntry {
            name,
            default: Arc::new(default),
            reducer: erased,
        });
        tracing::trace!(slice = name, "reducer registered");
        Ok(self)
    }

    /// Whether `name` has a registered reducer
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered slice names in registration order
    pub fn slice_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Number of registered slices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no slice is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tree holding every slice's declared default
    pub fn initial_tree(&self) -> StateTree {
        let slices: BTreeMap<_, _> = self
            .entries
            .iter()
            .map(|e| (e.name, Arc::clone(&e.default)))
            .collect();
        StateTree::from_slices(slices)
    }

    /// Run the reducer owning `name`.
    ///
    /// A missing `current` value falls back to the slice default. Returns the
    /// same `Arc` when the reducer left the slice unchanged. Unknown slice
    /// names pass `current` through.
    pub fn reduce(
        &self,
        name: &str,
        current: Option<&SliceValue>,
        action: &A,
    ) -> Result<Option<SliceValue>, ReducerError> {
        let Some(&idx) = self.index.get(name) else {
            return Ok(current.cloned());
        };
        let entry = &self.entries[idx];
        let current = current.unwrap_or(&entry.default);
        let next = (entry.reducer)(current, action)
            .map_err(|e| e.located(entry.name, action.name()))?;
        Ok(Some(next.unwrap_or_else(|| Arc::clone(current))))
    }

    /// Reduce every slice of `tree` in registration order.
    ///
    /// Stops at the first failing reducer. The returned tree always reflects
    /// the slices reduced before the failure, so callers can commit partial
    /// progress.
    pub(crate) fn reduce_tree(
        &self,
        tree: &StateTree,
        action: &A,
    ) -> (StateTree, Result<(), ReducerError>) {
        let mut next = tree.clone();
        for entry in &self.entries {
            let current = tree.raw(entry.name).unwrap_or(&entry.default);
            match (entry.reducer)(current, action) {
                Ok(Some(value)) => next.insert(entry.name, value),
                Ok(None) => {}
                Err(e) => return (next, Err(e.located(entry.name, action.name()))),
            }
        }
        (next, Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionKind;

    static ADD: ActionKind = ActionKind::new("test", "ADD");
    static RENAME: ActionKind = ActionKind::new("test", "RENAME");
    static NOOP: ActionKind = ActionKind::new("test", "NOOP");

    #[derive(Clone, Debug)]
    enum TestAction {
        Add(i32),
        Rename(String),
        Noop,
    }

    impl Action for TestAction {
        fn kind(&self) -> &'static ActionKind {
            match self {
                TestAction::Add(_) => &ADD,
                TestAction::Rename(_) => &RENAME,
                TestAction::Noop => &NOOP,
            }
        }
    }

    const COUNT: SliceKey<i32> = SliceKey::new("count");
    const LABEL: SliceKey<String> = SliceKey::new("label");

    fn count_reducer(state: &i32, action: &TestAction) -> SliceUpdate<i32> {
        match action {
            TestAction::Add(n) => SliceUpdate::Replace(state + n),
            _ => SliceUpdate::Unchanged,
        }
    }

    fn label_reducer(_state: &String, action: &TestAction) -> SliceUpdate<String> {
        match action {
            TestAction::Rename(s) => SliceUpdate::Replace(s.clone()),
            _ => SliceUpdate::Unchanged,
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ReducerRegistry::<TestAction>::new();
        registry.register(COUNT, 0, count_reducer).unwrap();

        let err = registry
            .register(COUNT, 100, |_: &i32, _: &TestAction| SliceUpdate::Replace(-1))
            .unwrap_err();
        assert_eq!(err.slice, "count");
        assert_eq!(registry.len(), 1);

        let next = registry.reduce("count", None, &TestAction::Add(2)).unwrap();
        let next = next.unwrap();
        assert_eq!(next.downcast_ref::<i32>(), Some(&2));
    }

    #[test]
    fn test_reduce_defaults_missing_value() {
        let mut registry = ReducerRegistry::<TestAction>::new();
        registry.register(COUNT, 10, count_reducer).unwrap();

        let next = registry
            .reduce("count", None, &TestAction::Add(1))
            .unwrap()
            .unwrap();
        assert_eq!(next.downcast_ref::<i32>(), Some(&11));
    }

    #[test]
    fn test_unknown_action_is_identity() {
        let mut registry = ReducerRegistry::<TestAction>::new();
        registry.register(COUNT, 0, count_reducer).unwrap();
        registry
            .register(LABEL, String::from("room"), label_reducer)
            .unwrap();

        let tree = registry.initial_tree();
        let (next, result) = registry.reduce_tree(&tree, &TestAction::Noop);
        assert!(result.is_ok());
        assert!(tree.changed_slices(&next).is_empty());
    }

    #[test]
    fn test_reduce_tree_stops_at_failure() {
        let mut registry = ReducerRegistry::<TestAction>::new();
        registry.register(COUNT, 0, count_reducer).unwrap();
        registry
            .register_fallible(LABEL, String::new(), |_: &String, action: &TestAction| {
                match action {
                    TestAction::Add(_) => Err(ReducerError::new("labels do not add")),
                    _ => Ok(SliceUpdate::Unchanged),
                }
            })
            .unwrap();

        let tree = registry.initial_tree();
        let (next, result) = registry.reduce_tree(&tree, &TestAction::Add(5));
        let err = result.unwrap_err();
        assert_eq!(err.slice, "label");
        assert_eq!(err.action, "ADD");
        // count was reduced before the failure and is kept
        assert_eq!(next.get(&COUNT), Some(&5));
    }

    #[test]
    fn test_initial_tree_has_every_slice() {
        let mut registry = ReducerRegistry::<TestAction>::new();
        registry.register(COUNT, 7, count_reducer).unwrap();
        registry.register(LABEL, "x".to_string(), label_reducer).unwrap();

        let tree = registry.initial_tree();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&COUNT), Some(&7));
        assert_eq!(tree.get(&LABEL).map(String::as_str), Some("x"));
    }
}
