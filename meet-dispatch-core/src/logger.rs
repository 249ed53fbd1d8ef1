//! Action logging with glob filtering and an in-memory history
//!
//! [`ActionLoggerMiddleware`] logs dispatched actions through `tracing` and
//! optionally keeps the most recent ones in an [`ActionLog`] ring buffer,
//! annotated with what the dispatch did: which slices changed, or which
//! middleware swallowed it.
//!
//! ```ignore
//! let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::new(
//!     50,
//!     ActionLoggerConfig::new(Some("CONFERENCE_*"), None),
//! ));
//! let history = logger.handle();
//! chain.register(logger);
//!
//! for entry in history.borrow().recent(5) {
//!     println!("#{} {} {:?}", entry.sequence, entry.name, entry.result);
//! }
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use crate::action::ActionSummary;
use crate::error::DispatchError;
use crate::middleware::{Flow, Middleware, Reduction};
use crate::store::{DispatchOutcome, Store};

/// Include/exclude filter over action names.
///
/// Patterns are globs: `*` matches any run of characters, `?` exactly one.
/// An empty include list admits every name; excludes are applied after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLoggerConfig {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern lists.
    ///
    /// ```
    /// use meet_dispatch_core::logger::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("CONFERENCE_*, SET_ROOM"), Some("*_WILL_*"));
    /// assert!(config.should_log("CONFERENCE_LEFT"));
    /// assert!(config.should_log("SET_ROOM"));
    /// assert!(!config.should_log("CONFERENCE_WILL_LEAVE"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Whether `name` passes the filter
    pub fn should_log(&self, name: &str) -> bool {
        let included = self.include_patterns.is_empty()
            || self.include_patterns.iter().any(|p| glob_match(p, name));
        included && !self.exclude_patterns.iter().any(|p| glob_match(p, name))
    }
}

fn split_patterns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Glob match with `*` and `?` over chars.
///
/// Greedy with single-star backtracking: on mismatch, retry from the most
/// recent `*` with one more character consumed.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// What happened to a logged action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggedResult {
    /// Still in flight, or a reducer failed and `after` never ran
    Pending,
    /// Reducers ran; these slices changed
    Reduced(Vec<&'static str>),
    /// Dropped by the named middleware
    Swallowed(&'static str),
}

/// One entry of the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub name: &'static str,
    pub summary: String,
    pub timestamp: Instant,
    pub sequence: u64,
    pub result: LoggedResult,
}

impl ActionLogEntry {
    /// Compact age for display, e.g. `150ms` or `2.3s`
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.timestamp.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// Ring buffer of recently dispatched actions.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity.min(1024)),
            config,
            next_sequence: 0,
        }
    }

    /// Record `action` if it passes the filter; returns its sequence number.
    pub fn record<A: ActionSummary>(&mut self, action: &A) -> Option<u64> {
        let name = action.name();
        if self.config.capacity == 0 || !self.config.filter.should_log(name) {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActionLogEntry {
            name,
            summary: action.summary(),
            timestamp: Instant::now(),
            sequence,
            result: LoggedResult::Pending,
        });
        Some(sequence)
    }

    /// Fill in the result of the entry with `sequence`, if still buffered
    pub fn resolve(&mut self, sequence: u64, result: LoggedResult) {
        if let Some(entry) = self.entries.iter_mut().rev().find(|e| e.sequence == sequence) {
            entry.result = result;
        }
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Newest first, at most `count`
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Middleware logging actions through `tracing`, optionally into an
/// [`ActionLog`].
///
/// Register it first so that it sees every action, including the ones later
/// middlewares swallow.
#[derive(Debug)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<Rc<RefCell<ActionLog>>>,
    in_flight: RefCell<Vec<Option<u64>>>,
    active: Cell<bool>,
}

impl ActionLoggerMiddleware {
    /// Tracing output only
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            in_flight: RefCell::new(Vec::new()),
            active: Cell::new(true),
        }
    }

    /// Tracing output plus an in-memory history
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Rc::new(RefCell::new(ActionLog::new(config)))),
            in_flight: RefCell::new(Vec::new()),
            active: Cell::new(true),
        }
    }

    /// Log every action, tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::default())
    }

    /// Enable or disable at construction, e.g. from a `--debug` flag
    pub fn active(self, active: bool) -> Self {
        self.active.set(active);
        self
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Shared handle to the history, kept usable after the middleware is
    /// moved into a chain
    pub fn handle(&self) -> Option<Rc<RefCell<ActionLog>>> {
        self.log.clone()
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl<A: ActionSummary> Middleware<A> for ActionLoggerMiddleware {
    fn name(&self) -> &'static str {
        "action-logger"
    }

    fn before(&self, store: &Store<A>, action: &A) -> Result<Flow<A>, DispatchError> {
        let mut sequence = None;
        if self.active.get() && self.config.should_log(action.name()) {
            tracing::debug!(action = %action.kind(), "action");
            if let Some(log) = &self.log {
                sequence = log.borrow_mut().record(action);
            }
        }
        // One slot per nesting level; slots left by aborted dispatches are dropped
        let mut slots = self.in_flight.borrow_mut();
        slots.truncate(store.depth().saturating_sub(1));
        slots.push(sequence);
        Ok(Flow::Continue)
    }

    fn after(
        &self,
        store: &Store<A>,
        action: &A,
        reduction: Reduction<'_>,
    ) -> Result<(), DispatchError> {
        let level = store.depth().saturating_sub(1);
        let sequence = {
            let mut slots = self.in_flight.borrow_mut();
            let sequence = slots.get(level).copied().flatten();
            slots.truncate(level);
            sequence
        };
        let Some(sequence) = sequence else {
            return Ok(());
        };

        let result = match reduction.outcome() {
            DispatchOutcome::Reduced { changed } => {
                tracing::debug!(action = %action.kind(), changed = ?changed, "action reduced");
                LoggedResult::Reduced(changed.clone())
            }
            DispatchOutcome::Swallowed { by } => {
                tracing::debug!(action = %action.kind(), by = *by, "action swallowed");
                LoggedResult::Swallowed(*by)
            }
        };
        if let Some(log) = &self.log {
            log.borrow_mut().resolve(sequence, result);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("CONFERENCE_*", "CONFERENCE_JOINED"));
        assert!(glob_match("*_FAILED", "CONNECTION_FAILED"));
        assert!(glob_match("*WILL*", "CONFERENCE_WILL_LEAVE"));
        assert!(glob_match("SET_?OOM", "SET_ROOM"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(!glob_match("SET_ROOM", "SET_ROOMS"));
        assert!(!glob_match("?", ""));
    }

    #[test]
    fn test_split_patterns_trims_and_drops_empty() {
        let config = ActionLoggerConfig::new(Some(" A*, ,B "), None);
        assert_eq!(config.include_patterns, vec!["A*", "B"]);
        assert!(config.exclude_patterns.is_empty());
    }

    #[test]
    fn test_empty_filter_logs_everything() {
        assert!(ActionLoggerConfig::default().should_log("ANYTHING"));
    }

    #[test]
    fn test_ring_buffer_capacity() {
        use crate::{Action, ActionKind};

        static PING: ActionKind = ActionKind::new("test", "PING");

        #[derive(Clone, Debug)]
        struct Ping(u32);
        impl Action for Ping {
            fn kind(&self) -> &'static ActionKind {
                &PING
            }
        }
        impl ActionSummary for Ping {}

        let mut log = ActionLog::new(ActionLogConfig::new(2, ActionLoggerConfig::default()));
        for n in 0..3 {
            log.record(&Ping(n));
        }
        assert_eq!(log.len(), 2);
        let sequences: Vec<u64> = log.entries().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);

        log.resolve(2, LoggedResult::Swallowed("guard"));
        assert_eq!(
            log.recent(1).next().map(|e| e.result.clone()),
            Some(LoggedResult::Swallowed("guard"))
        );
    }
}
