//! Ordered interceptors around the reducer pass

use std::fmt;

use crate::error::DispatchError;
use crate::state::StateTree;
use crate::store::{DispatchOutcome, Store};
use crate::Action;

/// What a middleware decided in its `before` step.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<A> {
    /// Hand the action to the next middleware unchanged.
    Continue,
    /// Hand a different action to the next middleware.
    Replace(A),
    /// Drop the action: no later middleware, no reducers, no notification.
    Swallow,
}

impl<A> Flow<A> {
    /// Returns true if the action was dropped.
    #[inline]
    pub fn is_swallow(&self) -> bool {
        matches!(self, Self::Swallow)
    }
}

/// Result of a dispatch as seen by `after` hooks.
#[derive(Debug, Clone, Copy)]
pub struct Reduction<'a> {
    previous: &'a StateTree,
    outcome: &'a DispatchOutcome,
}

impl<'a> Reduction<'a> {
    pub(crate) fn new(previous: &'a StateTree, outcome: &'a DispatchOutcome) -> Self {
        Self { previous, outcome }
    }

    /// State tree as it was before reducers ran
    pub fn previous(&self) -> &'a StateTree {
        self.previous
    }

    /// How the dispatch ended
    pub fn outcome(&self) -> &'a DispatchOutcome {
        self.outcome
    }

    /// Whether the named slice got a new reference
    pub fn changed(&self, slice: &str) -> bool {
        self.outcome.changed().contains(&slice)
    }

    /// Whether a later middleware swallowed the action
    pub fn is_swallowed(&self) -> bool {
        self.outcome.is_swallowed()
    }
}

/// Interceptor taking part in every dispatch.
///
/// `before` hooks run in registration order, `after` hooks in reverse order
/// and only for middlewares whose `before` did not swallow. Both receive the
/// store, so a middleware can read state, dispatch other actions
/// synchronously, or [`enqueue`](Store::enqueue) follow-ups that re-enter the
/// chain from the start.
///
/// Middlewares are shared by reference; use `Cell`/`RefCell` for mutable
/// bookkeeping.
pub trait Middleware<A: Action> {
    /// Name used in errors and logs
    fn name(&self) -> &'static str;

    /// Called before the reducers
    fn before(&self, _store: &Store<A>, _action: &A) -> Result<Flow<A>, DispatchError> {
        Ok(Flow::Continue)
    }

    /// Called after the reducers with the action that reached them
    fn after(
        &self,
        _store: &Store<A>,
        _action: &A,
        _reduction: Reduction<'_>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Ordered list of middlewares; first registered runs outermost.
pub struct MiddlewareChain<A: Action> {
    middlewares: Vec<Box<dyn Middleware<A>>>,
}

impl<A: Action> fmt::Debug for MiddlewareChain<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<A: Action> Default for MiddlewareChain<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> MiddlewareChain<A> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware to the chain
    pub fn register<M: Middleware<A> + 'static>(&mut self, middleware: M) -> &mut Self {
        tracing::trace!(middleware = middleware.name(), "middleware registered");
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Number of registered middlewares
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Middlewares in registration order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &dyn Middleware<A>> {
        self.middlewares.iter().map(|m| m.as_ref())
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&dyn Middleware<A>> {
        self.middlewares.get(idx).map(|m| m.as_ref())
    }
}
