//! Follow-up loop around a [`Store`]

use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::store::{DispatchOutcome, FollowUps, Store, StoreBuilder};
use crate::Action;

/// Why [`DispatchRuntime::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The cancellation token fired
    Cancelled,
    /// The quit predicate matched a follow-up
    Quit,
}

/// Owns a store together with its follow-up queue.
///
/// Follow-ups (from [`Store::enqueue`], spawned tasks, transport handlers)
/// are dispatched one at a time, each as a fresh pass through the whole
/// chain. The runtime is `!Send`; drive it from the main task or a
/// `LocalSet`.
///
/// # Example
/// ```ignore
/// let mut runtime = DispatchRuntime::new(StoreBuilder::new(reducers).middleware(logger));
/// runtime.dispatch(AppAction::SetRoom { room: "standup".into() })?;
///
/// let cancel = CancellationToken::new();
/// runtime.run(cancel.clone(), |action| matches!(action, AppAction::Quit)).await;
/// ```
pub struct DispatchRuntime<A: Action> {
    store: Store<A>,
    follow_ups: FollowUps<A>,
}

impl<A: Action> DispatchRuntime<A> {
    pub fn new(builder: StoreBuilder<A>) -> Self {
        let (store, follow_ups) = builder.build();
        Self { store, follow_ups }
    }

    pub fn from_parts(store: Store<A>, follow_ups: FollowUps<A>) -> Self {
        Self { store, follow_ups }
    }

    pub fn store(&self) -> &Store<A> {
        &self.store
    }

    /// Dispatch immediately
    pub fn dispatch(&self, action: A) -> Result<DispatchOutcome, DispatchError> {
        self.store.dispatch(action)
    }

    /// Dispatch every follow-up already queued, including ones queued while
    /// draining. Returns the number dispatched.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(action) = self.follow_ups.try_recv() {
            self.dispatch_follow_up(action);
            count += 1;
        }
        count
    }

    /// Wait for the next follow-up and dispatch it.
    ///
    /// The store keeps a sender of its own queue, so on an idle runtime this
    /// waits until something is queued. Wrap it in `tokio::time::timeout`
    /// when the wait must be bounded. `None` only for a queue taken from
    /// another store (see [`from_parts`](Self::from_parts)) whose senders
    /// are all gone.
    pub async fn next(&mut self) -> Option<Result<DispatchOutcome, DispatchError>> {
        let action = self.follow_ups.recv().await?;
        Some(self.store.dispatch(action))
    }

    /// Dispatch follow-ups until cancelled or until `should_quit` matches
    /// one (which is not dispatched). An idle queue keeps the loop waiting.
    pub async fn run<F>(&mut self, cancel: CancellationToken, mut should_quit: F) -> RunExit
    where
        F: FnMut(&A) -> bool,
    {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("dispatch runtime cancelled");
                    return RunExit::Cancelled;
                }
                Some(action) = self.follow_ups.recv() => {
                    if should_quit(&action) {
                        return RunExit::Quit;
                    }
                    self.dispatch_follow_up(action);
                }
            }
        }
    }

    fn dispatch_follow_up(&self, action: A) {
        let kind = action.kind();
        if let Err(e) = self.store.dispatch(action) {
            tracing::warn!(action = %kind, error = %e, "follow-up dispatch failed");
        }
    }

    pub fn into_parts(self) -> (Store<A>, FollowUps<A>) {
        (self.store, self.follow_ups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Flow, Middleware};
    use crate::registry::ReducerRegistry;
    use crate::state::{SliceKey, SliceUpdate};
    use crate::ActionKind;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    static REQUEST: ActionKind = ActionKind::new("test", "REQUEST");
    static LOADED: ActionKind = ActionKind::new("test", "LOADED");
    static QUIT: ActionKind = ActionKind::new("test", "QUIT");

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Request,
        Loaded(u32),
        Quit,
    }

    impl Action for TestAction {
        fn kind(&self) -> &'static ActionKind {
            match self {
                TestAction::Request => &REQUEST,
                TestAction::Loaded(_) => &LOADED,
                TestAction::Quit => &QUIT,
            }
        }
    }

    const VALUE: SliceKey<u32> = SliceKey::new("value");

    /// Turns REQUEST into an async LOADED and records every action it sees
    struct Loader {
        seen: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Middleware<TestAction> for Loader {
        fn name(&self) -> &'static str {
            "loader"
        }

        fn before(
            &self,
            store: &Store<TestAction>,
            action: &TestAction,
        ) -> Result<Flow<TestAction>, DispatchError> {
            self.seen.borrow_mut().push(action.name());
            if matches!(action, TestAction::Request) {
                store.spawn("load", async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    TestAction::Loaded(9)
                })?;
            }
            Ok(Flow::Continue)
        }
    }

    fn runtime(seen: Rc<RefCell<Vec<&'static str>>>) -> DispatchRuntime<TestAction> {
        let mut reducers = ReducerRegistry::new();
        reducers
            .register(VALUE, 0, |_: &u32, action: &TestAction| match action {
                TestAction::Loaded(v) => SliceUpdate::Replace(*v),
                _ => SliceUpdate::Unchanged,
            })
            .unwrap();
        DispatchRuntime::new(StoreBuilder::new(reducers).middleware(Loader { seen }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_follow_up_reenters_chain() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = runtime(seen.clone());

        runtime.dispatch(TestAction::Request).unwrap();
        assert_eq!(runtime.store().get(&VALUE).as_deref(), Some(&0));

        let outcome = runtime.next().await.unwrap().unwrap();
        assert_eq!(outcome.changed(), &["value"]);
        assert_eq!(runtime.store().get(&VALUE).as_deref(), Some(&9));
        assert_eq!(*seen.borrow(), vec!["REQUEST", "LOADED"]);
    }

    #[tokio::test]
    async fn test_drain_dispatches_queued() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = runtime(seen.clone());

        runtime.store().enqueue(TestAction::Loaded(1));
        runtime.store().enqueue(TestAction::Loaded(2));
        assert_eq!(runtime.drain(), 2);
        assert_eq!(runtime.store().get(&VALUE).as_deref(), Some(&2));
        assert_eq!(runtime.drain(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = runtime(seen.clone());

        runtime.store().enqueue(TestAction::Loaded(3));
        runtime.store().enqueue(TestAction::Quit);

        let exit = runtime
            .run(CancellationToken::new(), |a| matches!(a, TestAction::Quit))
            .await;
        assert_eq!(exit, RunExit::Quit);
        assert_eq!(*seen.borrow(), vec!["LOADED"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = runtime(seen);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = runtime.run(cancel, |_| false).await;
        assert_eq!(exit, RunExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_waits_while_idle() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = runtime(seen.clone());

        let idle = tokio::time::timeout(Duration::from_secs(1), runtime.next()).await;
        assert!(idle.is_err());

        runtime.store().enqueue(TestAction::Loaded(4));
        let outcome = runtime.next().await.unwrap().unwrap();
        assert_eq!(outcome.changed(), &["value"]);
        assert_eq!(*seen.borrow(), vec!["LOADED"]);
    }
}
