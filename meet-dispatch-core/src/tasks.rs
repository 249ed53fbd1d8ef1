//! Keyed async follow-ups
//!
//! A middleware that needs to await something (a calendar fetch, a transport
//! request) hands the future to the store's [`TaskManager`]. When the future
//! completes, the action it yields goes back into the store's follow-up queue
//! and is dispatched from the first middleware like any other action.
//!
//! Running tasks are never aborted. Starting a task under a key that is
//! already in flight makes the older task stale: it still runs to the end,
//! but only the newest task under a key delivers its action.
//!
//! ```ignore
//! store.spawn("calendar-refresh", async move {
//!     let events = source.fetch().await;
//!     CalendarAction::SetEvents(events).into()
//! })?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::DispatchError;
use crate::Action;

/// Key under which a follow-up task runs.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs keyed futures on tokio and feeds their actions to a channel.
pub struct TaskManager<A> {
    generations: HashMap<TaskKey, Arc<AtomicU64>>,
    follow_ups: mpsc::UnboundedSender<A>,
}

impl<A> fmt::Debug for TaskManager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("keys", &self.generations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<A: Action> TaskManager<A> {
    /// Create a manager sending completed actions to `follow_ups`
    pub fn new(follow_ups: mpsc::UnboundedSender<A>) -> Self {
        Self {
            generations: HashMap::new(),
            follow_ups,
        }
    }

    /// Run `future` on the current tokio runtime.
    ///
    /// Any task still in flight under `key` keeps running, but its action
    /// is dropped when it completes.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoRuntime`] when called outside a tokio runtime.
    pub fn spawn<F>(&mut self, key: impl Into<TaskKey>, future: F) -> Result<(), DispatchError>
    where
        F: Future<Output = A> + Send + 'static,
    {
        let key = key.into();
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime {
            task: key.to_string(),
        })?;

        let latest = Arc::clone(self.generations.entry(key.clone()).or_default());
        let generation = latest.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.follow_ups.clone();
        runtime.spawn(async move {
            let action = future.await;
            if latest.load(Ordering::SeqCst) != generation {
                tracing::debug!(task = %key, action = %action.kind(), "stale follow-up dropped");
                return;
            }
            if tx.send(action).is_err() {
                tracing::debug!(task = %key, "follow-up dropped, store is gone");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionKind;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    static FETCHED: ActionKind = ActionKind::new("test", "FETCHED");

    #[derive(Clone, Debug, PartialEq)]
    struct Fetched(u32);

    impl Action for Fetched {
        fn kind(&self) -> &'static ActionKind {
            &FETCHED
        }
    }

    #[test]
    fn test_task_key_conversions() {
        let a = TaskKey::new("calendar");
        let b: TaskKey = "calendar".into();
        let c: TaskKey = String::from("calendar").into();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_string(), "calendar");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_feeds_follow_up() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn("fetch", async { Fetched(7) }).unwrap();

        assert_eq!(rx.recv().await, Some(Fetched(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_drops_stale_result_without_aborting() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        tasks
            .spawn("fetch", async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
                Fetched(1)
            })
            .unwrap();
        tasks
            .spawn("fetch", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Fetched(2)
            })
            .unwrap();

        assert_eq!(rx.recv().await, Some(Fetched(2)));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_result_wins_even_if_older_finishes_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.spawn("fetch", async { Fetched(1) }).unwrap();
        tasks
            .spawn("fetch", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Fetched(2)
            })
            .unwrap();

        assert_eq!(rx.recv().await, Some(Fetched(2)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks
            .spawn("a", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Fetched(1)
            })
            .unwrap();
        tasks.spawn("b", async { Fetched(2) }).unwrap();

        assert_eq!(rx.recv().await, Some(Fetched(2)));
        assert_eq!(rx.recv().await, Some(Fetched(1)));
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        let err = tasks.spawn("fetch", async { Fetched(1) }).unwrap_err();
        assert_eq!(
            err,
            DispatchError::NoRuntime {
                task: "fetch".into()
            }
        );
    }
}
