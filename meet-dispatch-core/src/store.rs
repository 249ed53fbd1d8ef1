//! Centralized state store: middleware chain around per-slice reducers

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::RuntimeConfig;
use crate::error::DispatchError;
use crate::middleware::{Flow, Middleware, MiddlewareChain, Reduction};
use crate::registry::ReducerRegistry;
use crate::state::{SliceKey, StateTree};
use crate::tasks::{TaskKey, TaskManager};
use crate::Action;

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Reducers ran; `changed` lists slices with a new reference.
    Reduced { changed: Vec<&'static str> },
    /// A middleware dropped the action before the reducers.
    Swallowed { by: &'static str },
}

impl DispatchOutcome {
    /// Slices that changed; empty when swallowed.
    pub fn changed(&self) -> &[&'static str] {
        match self {
            Self::Reduced { changed } => changed,
            Self::Swallowed { .. } => &[],
        }
    }

    /// Whether any slice changed
    pub fn state_changed(&self) -> bool {
        !self.changed().is_empty()
    }

    /// Whether a middleware dropped the action
    pub fn is_swallowed(&self) -> bool {
        matches!(self, Self::Swallowed { .. })
    }
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&StateTree)>;

/// Receiving end of the store's follow-up queue.
///
/// Produced by [`StoreBuilder::build`]; usually owned by a
/// [`DispatchRuntime`](crate::runtime::DispatchRuntime).
pub type FollowUps<A> = mpsc::UnboundedReceiver<A>;

/// Builder wiring reducers, middlewares and config into a [`Store`].
///
/// # Example
/// ```ignore
/// let mut reducers = ReducerRegistry::new();
/// reducers.register(CONFERENCE, ConferenceState::default(), conference::reducer)?;
///
/// let (store, follow_ups) = StoreBuilder::new(reducers)
///     .middleware(ActionLoggerMiddleware::log_all())
///     .middleware(ExternalApiMiddleware::new(bridge))
///     .build();
/// ```
pub struct StoreBuilder<A: Action> {
    reducers: ReducerRegistry<A>,
    middleware: MiddlewareChain<A>,
    config: RuntimeConfig,
}

impl<A: Action> StoreBuilder<A> {
    pub fn new(reducers: ReducerRegistry<A>) -> Self {
        Self {
            reducers,
            middleware: MiddlewareChain::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Append a middleware; the first one added runs outermost.
    pub fn middleware<M: Middleware<A> + 'static>(mut self, middleware: M) -> Self {
        self.middleware.register(middleware);
        self
    }

    /// Use a prepared chain, replacing any middleware added so far
    pub fn chain(mut self, chain: MiddlewareChain<A>) -> Self {
        self.middleware = chain;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the store and the receiver of its follow-up queue.
    pub fn build(self) -> (Store<A>, FollowUps<A>) {
        let (follow_tx, follow_rx) = mpsc::unbounded_channel();
        let initial = self.reducers.initial_tree();
        tracing::debug!(
            slices = initial.len(),
            middlewares = self.middleware.len(),
            "store built"
        );
        let store = Store {
            state: RefCell::new(Arc::new(initial)),
            reducers: self.reducers,
            middleware: self.middleware,
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
            depth: Cell::new(0),
            tasks: RefCell::new(TaskManager::new(follow_tx.clone())),
            follow_tx,
            config: self.config,
        };
        (store, follow_rx)
    }
}

/// Owns the state tree and runs every dispatch.
///
/// A dispatch goes:
/// 1. `before` of each middleware in registration order. `Replace` swaps the
///    action for the rest of the pass; `Swallow` ends it, with no reducer
///    run and no subscriber notified.
/// 2. Every registered reducer, in registration order. A slice is replaced
///    only when its reducer returns a new value.
/// 3. Subscribers, if at least one slice changed.
/// 4. `after` of each middleware that continued, in reverse order.
///
/// If a reducer fails, the slices it ran after keep their new values, the
/// slices after it keep their old ones, subscribers are still notified of
/// the partial change, `after` hooks are skipped and the error is returned.
///
/// The store is single-threaded. Middlewares and subscribers may dispatch
/// synchronously (nesting is bounded by
/// [`RuntimeConfig::max_dispatch_depth`]) or [`enqueue`](Self::enqueue)
/// follow-ups that start a fresh pass later.
pub struct Store<A: Action> {
    state: RefCell<Arc<StateTree>>,
    reducers: ReducerRegistry<A>,
    middleware: MiddlewareChain<A>,
    subscribers: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_subscription: Cell<u64>,
    depth: Cell<usize>,
    tasks: RefCell<TaskManager<A>>,
    follow_tx: mpsc::UnboundedSender<A>,
    config: RuntimeConfig,
}

impl<A: Action> fmt::Debug for Store<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state.borrow())
            .field("middleware", &self.middleware)
            .field("subscribers", &self.subscribers.borrow().len())
            .field("depth", &self.depth.get())
            .finish()
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<A: Action> Store<A> {
    /// Current snapshot
    pub fn state(&self) -> Arc<StateTree> {
        Arc::clone(&self.state.borrow())
    }

    /// Shared handle to one slice of the current snapshot
    pub fn get<S: Send + Sync + 'static>(&self, key: &SliceKey<S>) -> Option<Arc<S>> {
        self.state.borrow().get_arc(key)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn reducers(&self) -> &ReducerRegistry<A> {
        &self.reducers
    }

    /// Nesting level of the dispatch in progress; 0 when idle.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Run `action` through the chain and reducers.
    pub fn dispatch(&self, action: A) -> Result<DispatchOutcome, DispatchError> {
        let limit = self.config.max_dispatch_depth;
        if self.depth.get() >= limit {
            tracing::warn!(action = %action.kind(), limit, "dispatch nested too deeply");
            return Err(DispatchError::DepthExceeded {
                limit,
                action: action.name(),
            });
        }
        let _guard = DepthGuard::enter(&self.depth);

        let mut action = action;
        let mut entered = 0;
        let mut swallowed_by = None;
        for middleware in self.middleware.iter() {
            match middleware.before(self, &action)? {
                Flow::Continue => {}
                Flow::Replace(next) => {
                    tracing::trace!(
                        middleware = middleware.name(),
                        from = %action.kind(),
                        to = %next.kind(),
                        "action replaced"
                    );
                    action = next;
                }
                Flow::Swallow => {
                    swallowed_by = Some(middleware.name());
                    break;
                }
            }
            entered += 1;
        }

        let previous = self.state();
        let outcome = match swallowed_by {
            Some(by) => DispatchOutcome::Swallowed { by },
            None => self.reduce(&previous, &action)?,
        };

        let reduction = Reduction::new(&previous, &outcome);
        for idx in (0..entered).rev() {
            if let Some(middleware) = self.middleware.get(idx) {
                middleware.after(self, &action, reduction)?;
            }
        }
        Ok(outcome)
    }

    fn reduce(&self, previous: &StateTree, action: &A) -> Result<DispatchOutcome, DispatchError> {
        let (next, result) = self.reducers.reduce_tree(previous, action);
        let changed = previous.changed_slices(&next);
        if !changed.is_empty() {
            *self.state.borrow_mut() = Arc::new(next);
            self.notify();
        }
        if let Err(e) = result {
            tracing::warn!(error = %e, committed = ?changed, "reducer failed");
            return Err(e.into());
        }
        Ok(DispatchOutcome::Reduced { changed })
    }

    fn notify(&self) {
        // Listeners may (un)subscribe while we iterate
        let listeners: Vec<Listener> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        let state = self.state();
        for listener in listeners {
            listener(&state);
        }
    }

    /// Call `listener` after every dispatch that changed state
    pub fn subscribe(&self, listener: impl Fn(&StateTree) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Queue `action` to be dispatched from the start of the chain once the
    /// current pass is over.
    pub fn enqueue(&self, action: A) {
        if self.follow_tx.send(action).is_err() {
            tracing::debug!("follow-up queue closed, action dropped");
        }
    }

    /// Sender feeding the follow-up queue, for code running off the store's task
    pub fn follow_up_sender(&self) -> mpsc::UnboundedSender<A> {
        self.follow_tx.clone()
    }

    /// Run `future` on tokio and queue the action it yields.
    ///
    /// An older task under the same key keeps running, but its action is
    /// dropped. Fails with [`DispatchError::NoRuntime`] outside a tokio
    /// runtime.
    pub fn spawn<F>(&self, key: impl Into<TaskKey>, future: F) -> Result<(), DispatchError>
    where
        F: Future<Output = A> + Send + 'static,
    {
        self.tasks.borrow_mut().spawn(key, future)
    }
}
