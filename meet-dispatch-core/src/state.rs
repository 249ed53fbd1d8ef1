//! The application state tree and typed slice keys

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased slice value held by the tree.
pub type SliceValue = Arc<dyn Any + Send + Sync>;

/// Typed handle to a named slice of the state tree.
///
/// Declare one `const` per slice next to its reducer and use it both to
/// register the reducer and to read the slice back:
///
/// ```
/// use meet_dispatch_core::SliceKey;
///
/// #[derive(Default)]
/// struct ToolboxState { enabled: bool }
///
/// const TOOLBOX: SliceKey<ToolboxState> = SliceKey::new("features/toolbox");
/// assert_eq!(TOOLBOX.name(), "features/toolbox");
/// ```
pub struct SliceKey<S> {
    name: &'static str,
    _marker: PhantomData<fn() -> S>,
}

impl<S> SliceKey<S> {
    /// Create a key for the slice called `name`
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Slice name
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<S> Clone for SliceKey<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SliceKey<S> {}

impl<S> fmt::Debug for SliceKey<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SliceKey").field(&self.name).finish()
    }
}

/// What a reducer decided for its slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceUpdate<S> {
    /// Keep the current value (and its reference identity).
    Unchanged,
    /// Replace the slice with a new value.
    Replace(S),
}

impl<S> SliceUpdate<S> {
    /// Returns true if the slice is replaced.
    #[inline]
    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace(_))
    }
}

impl<S: PartialEq> SliceUpdate<S> {
    /// `Replace(next)` unless `next` equals `current`.
    ///
    /// Lets a reducer build the next value unconditionally and still keep
    /// the old reference when nothing actually moved.
    pub fn when_changed(current: &S, next: S) -> Self {
        if *current == next {
            Self::Unchanged
        } else {
            Self::Replace(next)
        }
    }
}

impl<S> From<Option<S>> for SliceUpdate<S> {
    fn from(next: Option<S>) -> Self {
        match next {
            Some(next) => Self::Replace(next),
            None => Self::Unchanged,
        }
    }
}

/// Snapshot of every registered slice.
///
/// Slices are reference counted: a slice that no reducer touched is the very
/// same allocation in the next snapshot, so "did this slice change" is a
/// pointer comparison.
#[derive(Clone, Default)]
pub struct StateTree {
    slices: BTreeMap<&'static str, SliceValue>,
}

impl StateTree {
    pub(crate) fn from_slices(slices: BTreeMap<&'static str, SliceValue>) -> Self {
        Self { slices }
    }

    /// Borrow a slice by key. `None` if the slice is not registered.
    pub fn get<S: Send + Sync + 'static>(&self, key: &SliceKey<S>) -> Option<&S> {
        self.slices.get(key.name())?.downcast_ref::<S>()
    }

    /// Shared handle to a slice by key.
    pub fn get_arc<S: Send + Sync + 'static>(&self, key: &SliceKey<S>) -> Option<Arc<S>> {
        let value = self.slices.get(key.name())?.clone();
        value.downcast::<S>().ok()
    }

    /// Raw slice value by name.
    pub fn raw(&self, name: &str) -> Option<&SliceValue> {
        self.slices.get(name)
    }

    /// Names of all slices, sorted.
    pub fn slice_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slices.keys().copied()
    }

    /// Number of slices.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Whether the tree has no slices.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Whether the named slice is the same allocation in both trees.
    pub fn same_slice(&self, other: &StateTree, name: &str) -> bool {
        match (self.slices.get(name), other.slices.get(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Names of slices whose reference differs between `self` and `next`.
    pub fn changed_slices(&self, next: &StateTree) -> Vec<&'static str> {
        next.slices
            .keys()
            .copied()
            .filter(|name| !self.same_slice(next, name))
            .collect()
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: SliceValue) {
        self.slices.insert(name, value);
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}
