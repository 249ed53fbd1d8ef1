//! `calendar-sync`: meeting links found in the user's calendar
//!
//! The calendar itself lives behind [`CalendarSource`]. Fetches run as
//! spawned store tasks, and their result comes back through the follow-up
//! queue as `SET_CALENDAR_EVENTS` (or `CALENDAR_FETCH_FAILED`). A fetch
//! started while another is in flight does not cancel it; the older one
//! completes and its result is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use meet_dispatch::{
    Action, DispatchError, Middleware, Reduction, SliceKey, SliceUpdate, Store,
};
use regex::Regex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::action::ShellAction;
use crate::app::{AppAction, Lifecycle};
use crate::known_domains::{KnownDomainsAction, KNOWN_DOMAINS};
use crate::util::{parse_uri_string, APP_LINK_SCHEME};

pub const CALENDAR_SYNC: SliceKey<CalendarSyncState> = SliceKey::new("features/calendar-sync");

/// Days before today to include
pub const FETCH_START_DAYS: i64 = -1;
/// Days after today to include
pub const FETCH_END_DAYS: i64 = 10;
/// Upper bound on listed entries
pub const MAX_LIST_LENGTH: usize = 10;

const FETCH_TASK: &str = "calendar-sync/fetch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarAuthorization {
    Authorized,
    Denied,
    Restricted,
    Undetermined,
}

/// Raw event as reported by the device calendar
#[derive(Debug, Clone, Default)]
pub struct CalendarEvent {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub description: Option<String>,
    /// RFC 3339
    pub start_date: String,
    /// RFC 3339
    pub end_date: String,
}

/// Calendar event that links to a meeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub id: String,
    pub title: Option<String>,
    pub url: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar access failed: {0}")]
    Access(String),

    #[error("fetching calendar events failed: {0}")]
    Fetch(String),
}

/// Device calendar backend.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn authorization_status(&self) -> Result<CalendarAuthorization, CalendarError>;

    /// Ask the user for access
    async fn request_authorization(&self) -> Result<CalendarAuthorization, CalendarError>;

    async fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

#[derive(Action, Clone, Debug)]
#[action(feature = "calendar-sync", kinds = "kinds")]
pub enum CalendarSyncAction {
    RefreshCalendar { force_permission: bool },
    SetCalendarAuthorization { authorization: Option<CalendarAuthorization> },
    SetCalendarEvents { events: Vec<CalendarEntry> },
    #[action(kind = "CALENDAR_FETCH_FAILED")]
    FetchFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarSyncState {
    pub authorization: Option<CalendarAuthorization>,
    pub events: Vec<CalendarEntry>,
    pub error: Option<String>,
}

pub fn reducer(state: &CalendarSyncState, action: &ShellAction) -> SliceUpdate<CalendarSyncState> {
    let ShellAction::Calendar(action) = action else {
        return SliceUpdate::Unchanged;
    };
    let next = match action {
        CalendarSyncAction::RefreshCalendar { .. } => return SliceUpdate::Unchanged,
        CalendarSyncAction::SetCalendarAuthorization { authorization } => CalendarSyncState {
            authorization: *authorization,
            ..state.clone()
        },
        CalendarSyncAction::SetCalendarEvents { events } => CalendarSyncState {
            events: events.clone(),
            error: None,
            ..state.clone()
        },
        CalendarSyncAction::FetchFailed { error } => CalendarSyncState {
            error: Some(error.clone()),
            ..state.clone()
        },
    };
    SliceUpdate::when_changed(state, next)
}

/// Refreshes calendar entries when it matters.
///
/// - `ADD_KNOWN_DOMAINS`: only if the known-domains slice actually changed
/// - `APP_WILL_MOUNT`: without prompting for access
/// - `REFRESH_CALENDAR`: prompting if access was never asked for (or forced)
/// - `APP_STATE_CHANGED` to background: forget the authorization so it is
///   asked again on the next refresh
pub struct CalendarSyncMiddleware {
    source: Arc<dyn CalendarSource>,
}

impl CalendarSyncMiddleware {
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self { source }
    }

    fn fetch(
        &self,
        store: &Store<ShellAction>,
        maybe_prompt: bool,
        force_permission: bool,
    ) -> Result<(), DispatchError> {
        let never_asked = store
            .get(&CALENDAR_SYNC)
            .is_none_or(|state| state.authorization.is_none());
        let prompt = (maybe_prompt && never_asked) || force_permission;
        let known_domains = store
            .get(&KNOWN_DOMAINS)
            .map(|known| known.as_slice().to_vec())
            .unwrap_or_default();

        let source = Arc::clone(&self.source);
        let follow_ups = store.follow_up_sender();
        store.spawn(FETCH_TASK, async move {
            fetch_entries(source, prompt, known_domains, follow_ups).await
        })
    }
}

impl Middleware<ShellAction> for CalendarSyncMiddleware {
    fn name(&self) -> &'static str {
        "calendar-sync"
    }

    fn after(
        &self,
        store: &Store<ShellAction>,
        action: &ShellAction,
        reduction: Reduction<'_>,
    ) -> Result<(), DispatchError> {
        if reduction.is_swallowed() {
            return Ok(());
        }
        match action {
            ShellAction::KnownDomains(KnownDomainsAction::AddKnownDomains { .. }) => {
                if reduction.changed(KNOWN_DOMAINS.name()) {
                    self.fetch(store, false, false)?;
                }
            }
            ShellAction::App(AppAction::WillMount) => self.fetch(store, false, false)?,
            ShellAction::App(AppAction::StateChanged {
                state: Lifecycle::Background,
            }) => {
                store.dispatch(ShellAction::Calendar(
                    CalendarSyncAction::SetCalendarAuthorization {
                        authorization: None,
                    },
                ))?;
            }
            ShellAction::Calendar(CalendarSyncAction::RefreshCalendar { force_permission }) => {
                self.fetch(store, true, *force_permission)?;
            }
            _ => {}
        }
        Ok(())
    }
}

async fn ensure_access(
    source: &dyn CalendarSource,
    prompt: bool,
    follow_ups: &mpsc::UnboundedSender<ShellAction>,
) -> Result<bool, CalendarError> {
    let status = source.authorization_status().await?;
    if status == CalendarAuthorization::Authorized {
        return Ok(true);
    }
    if !prompt {
        return Ok(false);
    }
    let granted = source.request_authorization().await?;
    let _ = follow_ups.send(ShellAction::Calendar(
        CalendarSyncAction::SetCalendarAuthorization {
            authorization: Some(granted),
        },
    ));
    Ok(granted == CalendarAuthorization::Authorized)
}

async fn fetch_entries(
    source: Arc<dyn CalendarSource>,
    prompt: bool,
    known_domains: Vec<String>,
    follow_ups: mpsc::UnboundedSender<ShellAction>,
) -> ShellAction {
    let failed = |error: String| ShellAction::Calendar(CalendarSyncAction::FetchFailed { error });

    match ensure_access(source.as_ref(), prompt, &follow_ups).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("calendar access not granted");
            return failed("calendar access not granted".to_string());
        }
        Err(e) => {
            tracing::error!(error = %e, "error accessing calendar");
            return failed(e.to_string());
        }
    }

    let now = Utc::now();
    let start = now + Duration::days(FETCH_START_DAYS);
    let end = now + Duration::days(FETCH_END_DAYS);
    match source.fetch_events(start, end).await {
        Ok(events) => {
            let events = parse_calendar_entries(&events, &known_domains, Utc::now());
            tracing::debug!(entries = events.len(), "calendar entries updated");
            ShellAction::Calendar(CalendarSyncAction::SetCalendarEvents { events })
        }
        Err(e) => {
            tracing::error!(error = %e, "error fetching calendar");
            failed(e.to_string())
        }
    }
}

struct LinkMatcher {
    web: Option<Regex>,
    scheme: Option<Regex>,
}

impl LinkMatcher {
    fn new(known_domains: &[String]) -> Self {
        const TERMINATOR: &str = r"[^\s<>$]";

        let web = (!known_domains.is_empty())
            .then(|| {
                let domains: Vec<String> = known_domains.iter().map(|d| regex::escape(d)).collect();
                Regex::new(&format!(
                    r"(?i)https?://({})/{TERMINATOR}+",
                    domains.join("|")
                ))
            })
            .and_then(Result::ok);
        let scheme = Regex::new(&format!(
            r"(?i){}{TERMINATOR}+",
            regex::escape(APP_LINK_SCHEME)
        ))
        .ok();
        Self { web, scheme }
    }

    fn find(&self, text: &str) -> Option<String> {
        let found = self
            .web
            .as_ref()
            .and_then(|re| re.find(text))
            .or_else(|| self.scheme.as_ref().and_then(|re| re.find(text)))?;
        parse_uri_string(found.as_str()).map(|url| url.to_string())
    }

    fn url_of(&self, event: &CalendarEvent) -> Option<String> {
        [
            &event.title,
            &event.url,
            &event.location,
            &event.notes,
            &event.description,
        ]
        .into_iter()
        .flatten()
        .find_map(|field| self.find(field))
    }
}

/// Meeting entries among `events`: linked to a known domain (or the app
/// scheme), not over yet, sorted by start, at most [`MAX_LIST_LENGTH`].
pub fn parse_calendar_entries(
    events: &[CalendarEvent],
    known_domains: &[String],
    now: DateTime<Utc>,
) -> Vec<CalendarEntry> {
    let matcher = LinkMatcher::new(known_domains);
    let mut entries: Vec<CalendarEntry> = events
        .iter()
        .filter_map(|event| {
            let url = matcher.url_of(event)?;
            let dates = DateTime::parse_from_rfc3339(&event.start_date)
                .and_then(|start| Ok((start, DateTime::parse_from_rfc3339(&event.end_date)?)));
            match dates {
                Ok((start, end)) => Some(CalendarEntry {
                    id: event.id.clone(),
                    title: event.title.clone(),
                    url,
                    start: start.with_timezone(&Utc),
                    end: end.with_timezone(&Utc),
                }),
                Err(_) => {
                    tracing::warn!(
                        title = ?event.title,
                        start = %event.start_date,
                        end = %event.end_date,
                        "skipping invalid calendar event"
                    );
                    None
                }
            }
        })
        .filter(|entry| entry.end > now)
        .collect();

    entries.sort_by_key(|entry| entry.start);
    entries.truncate(MAX_LIST_LENGTH);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, location: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            title: Some(format!("Meeting {id}")),
            location: Some(location.into()),
            start_date: start.into(),
            end_date: end.into(),
            ..CalendarEvent::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_only_known_domains_and_app_scheme() {
        let domains = vec!["meet.example".to_string()];
        let events = vec![
            event(
                "a",
                "Join at https://meet.example/standup now",
                "2024-05-01T10:00:00Z",
                "2024-05-01T10:30:00Z",
            ),
            event(
                "b",
                "https://elsewhere.example/standup",
                "2024-05-01T10:00:00Z",
                "2024-05-01T10:30:00Z",
            ),
            event(
                "c",
                "org.jitsi.meet://meet.example/retro",
                "2024-05-01T08:00:00Z",
                "2024-05-01T11:00:00Z",
            ),
        ];

        let entries = parse_calendar_entries(&events, &domains, now());
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://meet.example/retro", "https://meet.example/standup"]
        );
    }

    #[test]
    fn test_past_and_invalid_events_are_dropped() {
        let domains = vec!["meet.example".to_string()];
        let events = vec![
            event(
                "past",
                "https://meet.example/old",
                "2024-04-30T10:00:00Z",
                "2024-04-30T11:00:00Z",
            ),
            event("bad", "https://meet.example/bad", "tomorrow", "2024-05-02T11:00:00Z"),
        ];
        assert!(parse_calendar_entries(&events, &domains, now()).is_empty());
    }

    #[test]
    fn test_list_is_capped() {
        let domains = vec!["meet.example".to_string()];
        let events: Vec<CalendarEvent> = (0..15)
            .map(|i| {
                event(
                    &i.to_string(),
                    &format!("https://meet.example/room{i}"),
                    &format!("2024-05-02T{:02}:00:00Z", i),
                    &format!("2024-05-02T{:02}:30:00Z", i),
                )
            })
            .collect();

        let entries = parse_calendar_entries(&events, &domains, now());
        assert_eq!(entries.len(), MAX_LIST_LENGTH);
        assert_eq!(entries[0].id, "0");
    }
}
