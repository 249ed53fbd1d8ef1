//! Wiring of every feature slice and middleware into one store

use std::rc::Rc;
use std::sync::Arc;

use meet_dispatch::{
    ActionLoggerMiddleware, ConfigError, DuplicateSliceError, EventSink, ListenerRegistry,
    ReducerRegistry, RuntimeConfig, StoreBuilder,
};

use crate::action::ShellAction;
use crate::app::{self, AppState, APP};
use crate::calendar_sync::{
    self, CalendarSource, CalendarSyncMiddleware, CalendarSyncState, CALENDAR_SYNC,
};
use crate::conference::{self, ConferenceState, CONFERENCE};
use crate::conference_ui::ConferenceUiMiddleware;
use crate::config::{self, ConfigState, CONFIG};
use crate::connection::{self, ConnectionState, CONNECTION};
use crate::external_api::ExternalApiMiddleware;
use crate::known_domains::{self, KnownDomains, KNOWN_DOMAINS};
use crate::lib_engine::{self, LibEngineState, LIB_ENGINE};
use crate::ui::{
    self, FilmstripState, ResponsiveUiState, ToolboxState, FILMSTRIP, RESPONSIVE_UI, TOOLBOX,
};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Registration(#[from] DuplicateSliceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Every feature reducer, each under its own slice
pub fn reducers() -> Result<ReducerRegistry<ShellAction>, DuplicateSliceError> {
    let mut reducers = ReducerRegistry::new();
    reducers
        .register(APP, AppState::default(), app::reducer)?
        .register(CALENDAR_SYNC, CalendarSyncState::default(), calendar_sync::reducer)?
        .register(CONFERENCE, ConferenceState::default(), conference::reducer)?
        .register(CONFIG, ConfigState::default(), config::reducer)?
        .register(CONNECTION, ConnectionState::default(), connection::reducer)?
        .register(KNOWN_DOMAINS, KnownDomains::default(), known_domains::reducer)?
        .register(LIB_ENGINE, LibEngineState::default(), lib_engine::reducer)?
        .register(RESPONSIVE_UI, ResponsiveUiState::default(), ui::responsive_ui_reducer)?
        .register(TOOLBOX, ToolboxState::default(), ui::toolbox_reducer)?
        .register(FILMSTRIP, FilmstripState::default(), ui::filmstrip_reducer)?;
    Ok(reducers)
}

/// Builds the shell store.
///
/// Middleware order, outermost first: action logger, conference UI,
/// calendar sync (when a calendar is attached), external API.
///
/// ```ignore
/// let listeners = Rc::new(ListenerRegistry::new());
/// let builder = ShellBuilder::new(RuntimeConfig::default())
///     .listeners(Rc::clone(&listeners))
///     .calendar(Arc::new(DeviceCalendar::new()))
///     .build()?;
/// let mut runtime = DispatchRuntime::new(builder);
/// ```
pub struct ShellBuilder {
    config: RuntimeConfig,
    listeners: Rc<ListenerRegistry<dyn EventSink>>,
    calendar: Option<Arc<dyn CalendarSource>>,
    log_actions: bool,
}

impl ShellBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            listeners: Rc::new(ListenerRegistry::new()),
            calendar: None,
            log_actions: true,
        }
    }

    /// Registry the external API forwards to
    pub fn listeners(mut self, listeners: Rc<ListenerRegistry<dyn EventSink>>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn calendar(mut self, source: Arc<dyn CalendarSource>) -> Self {
        self.calendar = Some(source);
        self
    }

    pub fn log_actions(mut self, enabled: bool) -> Self {
        self.log_actions = enabled;
        self
    }

    pub fn build(self) -> Result<StoreBuilder<ShellAction>, ShellError> {
        self.config.validate()?;

        let logger =
            ActionLoggerMiddleware::new(self.config.action_logger()).active(self.log_actions);
        let mut builder = StoreBuilder::new(reducers()?)
            .config(self.config)
            .middleware(logger)
            .middleware(ConferenceUiMiddleware::new());
        if let Some(source) = self.calendar {
            builder = builder.middleware(CalendarSyncMiddleware::new(source));
        }
        Ok(builder.middleware(ExternalApiMiddleware::new(self.listeners)))
    }
}
