//! Playback Controller - owns the engine/sink session lifecycle
//!
//! Coordinates:
//! - Session creation, attach -> load -> manifest-parsed sequencing
//! - Direct-assignment fallback for non-adaptive sources
//! - Quality ladder publication and viewer quality requests
//! - Fatal error recovery
//! - Teardown on reconfiguration and unmount
//!
//! Engine events arrive on a channel, stamped with the session that emitted
//! them. Events from any session other than the live one are dropped, so a
//! destroyed engine can never drive the controller.

use crate::{
    config::{ControllerConfig, EngineConfig, PlayerProps},
    engine::{
        is_adaptive_source, EngineErrorData, EngineEvent, EngineEventSender, EngineFactory,
        MediaSink, SessionEvent, StreamEngine,
    },
    options::{PlaybackOptions, PlaybackOptionsHandle},
    quality::{derive_qualities, resolve_level},
    recovery::RecoveryAction,
    Error, LevelSelection, PlaybackMode, Result, SessionId, SessionInfo, SessionState,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// One engine/sink pairing
struct Session {
    info: SessionInfo,
    /// `None` for direct playback and after destruction
    engine: Option<Box<dyn StreamEngine>>,
}

impl Session {
    fn new(mode: PlaybackMode, generation: u64) -> Self {
        Self {
            info: SessionInfo {
                id: SessionId::new(),
                mode,
                state: SessionState::Idle,
                started_at: Utc::now(),
                generation,
            },
            engine: None,
        }
    }

    fn id(&self) -> SessionId {
        self.info.id
    }

    fn state(&self) -> SessionState {
        self.info.state
    }

    fn set_state(&mut self, new_state: SessionState) -> Result<()> {
        let current = self.info.state;

        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        self.info.state = new_state;
        info!(session_id = %self.info.id, from = %current, to = %new_state, "Session state transition");

        Ok(())
    }

    fn engine_mut(&mut self) -> Result<&mut Box<dyn StreamEngine>> {
        self.engine.as_mut().ok_or(Error::NoActiveSession)
    }

    /// Destroy the engine if one is still held. Safe to call repeatedly.
    fn release_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            debug!(session_id = %self.info.id, "Engine destroyed");
        }
    }

    fn destroy(&mut self) {
        self.release_engine();
        if self.info.state.can_transition_to(SessionState::Destroyed) {
            let _ = self.set_state(SessionState::Destroyed);
        }
    }
}

/// Playback lifecycle controller
///
/// Owns at most one live session. Public operations never fail outward:
/// faults are turned into recovery commands or logged and absorbed.
pub struct PlaybackController {
    factory: Arc<dyn EngineFactory>,
    sink: Arc<dyn MediaSink>,
    options: PlaybackOptionsHandle,
    options_rx: watch::Receiver<PlaybackOptions>,
    props: PlayerProps,
    config: ControllerConfig,
    session: Option<Session>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    /// Height last pushed to the engine; `None` while the engine picks levels itself
    applied_quality: Option<u32>,
    generation: u64,
    consecutive_reinits: u32,
    mounted: bool,
}

impl PlaybackController {
    /// Create an unmounted controller
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        sink: Arc<dyn MediaSink>,
        options: PlaybackOptionsHandle,
        props: PlayerProps,
        config: ControllerConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let options_rx = options.subscribe();

        Self {
            factory,
            sink,
            options,
            options_rx,
            props,
            config,
            session: None,
            events_tx,
            events_rx,
            applied_quality: None,
            generation: 0,
            consecutive_reinits: 0,
            mounted: false,
        }
    }

    /// Current caller inputs
    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    /// Shared options this controller writes
    pub fn options(&self) -> &PlaybackOptionsHandle {
        &self.options
    }

    /// Snapshot of the live session, if any
    pub fn session(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| s.info.clone())
    }

    /// Sessions created so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Start the first session
    #[instrument(skip(self), fields(src = %self.props.src))]
    pub fn mount(&mut self) {
        if self.mounted {
            debug!("Controller already mounted");
            return;
        }
        self.mounted = true;
        self.consecutive_reinits = 0;
        self.start_session();
    }

    /// Tear down the live session; later engine events are ignored
    #[instrument(skip(self))]
    pub fn unmount(&mut self) {
        self.teardown();
        self.mounted = false;
        info!("Controller unmounted");
    }

    /// Apply new caller inputs. Any difference restarts the session.
    #[instrument(skip(self, props), fields(src = %props.src))]
    pub fn set_props(&mut self, props: PlayerProps) {
        if props == self.props {
            debug!("Props unchanged");
            return;
        }
        self.props = props;
        self.restart_if_mounted();
    }

    /// Point the controller at different shared options. Restarts the session.
    #[instrument(skip(self, options))]
    pub fn set_options_handle(&mut self, options: PlaybackOptionsHandle) {
        if options.same_channel(&self.options) {
            return;
        }
        self.options_rx = options.subscribe();
        self.options = options;
        self.applied_quality = None;
        self.restart_if_mounted();
    }

    fn restart_if_mounted(&mut self) {
        if self.mounted {
            self.consecutive_reinits = 0;
            self.start_session();
        }
    }

    /// Dispatch one engine event
    pub async fn handle(&mut self, event: SessionEvent) {
        let Some((live_id, live_state)) = self.session.as_ref().map(|s| (s.id(), s.state())) else {
            debug!(session_id = %event.session, "Event with no live session dropped");
            return;
        };
        if live_id != event.session || !live_state.is_live() {
            debug!(session_id = %event.session, "Stale session event dropped");
            return;
        }

        debug!(session_id = %event.session, event = ?event.event, "Engine event");

        let result = match event.event {
            EngineEvent::MediaAttached => self.on_media_attached(),
            EngineEvent::ManifestParsed => self.on_manifest_parsed().await,
            EngineEvent::Error(data) => self.on_engine_error(data),
        };

        if let Err(e) = result {
            warn!(error = %e, code = e.error_code(), "Engine event handling failed");
        }
    }

    /// Handle every queued engine event and options change; returns the
    /// number of engine events handled
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            self.sync_quality();
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.handle(event).await;
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// React to a viewer quality request written since the last check
    pub fn sync_quality(&mut self) {
        if matches!(self.options_rx.has_changed(), Ok(true)) {
            self.on_quality_requested();
        }
    }

    /// Mount, then drive the controller until `shutdown` fires (or its sender
    /// is dropped), then unmount
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) {
        self.mount();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(event) = self.events_rx.recv() => self.handle(event).await,
                Ok(()) = self.options_rx.changed() => self.on_quality_requested(),
            }
        }

        self.unmount();
    }

    /// Destroy the old session and start a new one for the current props
    fn start_session(&mut self) {
        self.teardown();
        self.generation += 1;
        self.applied_quality = None;

        if !self.factory.is_supported() || !is_adaptive_source(&self.props.src) {
            self.start_direct_session();
            return;
        }

        let config = match self.props.engine_config() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Engine overrides rejected, using defaults");
                EngineConfig::default()
            }
        };

        let mut session = Session::new(PlaybackMode::Adaptive, self.generation);
        let events = EngineEventSender::new(session.id(), self.events_tx.clone());

        info!(
            session_id = %session.id(),
            generation = self.generation,
            enable_worker = config.enable_worker,
            "Creating stream engine"
        );

        let mut engine = self.factory.create(config, events);
        if let Err(e) = session.set_state(SessionState::Attaching) {
            warn!(error = %e, "Session failed to enter attaching");
        }
        engine.attach_media(Arc::clone(&self.sink));
        session.engine = Some(engine);

        self.session = Some(session);
    }

    fn start_direct_session(&mut self) {
        let mut session = Session::new(PlaybackMode::Direct, self.generation);

        info!(
            session_id = %session.id(),
            src = %self.props.src,
            autoplay = self.props.autoplay,
            "Adaptive playback unavailable, assigning source directly"
        );

        self.sink.set_src(&self.props.src);
        self.sink.set_autoplay(self.props.autoplay);

        if let Err(e) = session.set_state(SessionState::Ready) {
            warn!(error = %e, "Direct session failed to enter ready");
        }
        self.session = Some(session);
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!(session_id = %session.id(), "Tearing down session");
            session.destroy();
        }
    }

    fn on_media_attached(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;
        session.set_state(SessionState::ManifestLoading)?;

        info!(session_id = %session.id(), src = %self.props.src, "Media attached, loading source");
        session.engine_mut()?.load_source(&self.props.src);

        Ok(())
    }

    async fn on_manifest_parsed(&mut self) -> Result<()> {
        let levels = {
            let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;
            // A re-parse inside a ready session only refreshes the ladder
            if session.state() != SessionState::Ready {
                session.set_state(SessionState::Ready)?;
            }
            session.engine_mut()?.levels()
        };
        self.consecutive_reinits = 0;

        if self.props.autoplay {
            if let Err(e) = self.sink.play().await {
                warn!(error = %e, "Unable to autoplay prior to user interaction");
            }
        }

        let qualities = derive_qualities(&levels);
        let top = qualities.first().copied();

        info!(levels = levels.len(), qualities = ?qualities, current = ?top, "Manifest parsed");

        // Resets to the top of the new ladder regardless of any earlier viewer choice
        self.options.update(|_| PlaybackOptions {
            qualities,
            current_quality: top,
        });
        // Our own write is not a viewer request. The engine is left on auto,
        // so an explicit pick of `top` must still reach it.
        self.options_rx.borrow_and_update();
        self.applied_quality = None;

        Ok(())
    }

    fn on_engine_error(&mut self, data: EngineErrorData) -> Result<()> {
        let Some(action) = RecoveryAction::for_error(&data) else {
            debug!(error_type = %data.error_type, details = %data.details, "Non-fatal engine error ignored");
            return Ok(());
        };

        warn!(
            error_type = %data.error_type,
            details = %data.details,
            action = %action,
            "Fatal engine error"
        );

        match action {
            RecoveryAction::StartLoad => {
                let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;
                session.engine_mut()?.start_load();
            }
            RecoveryAction::RecoverMediaError => {
                let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;
                session.engine_mut()?.recover_media_error();
            }
            RecoveryAction::Reinitialize => self.reinitialize()?,
        }

        Ok(())
    }

    fn reinitialize(&mut self) -> Result<()> {
        if let Some(limit) = self.config.reinit_limit {
            if self.consecutive_reinits >= limit {
                if let Some(session) = self.session.as_mut() {
                    session.release_engine();
                    session.set_state(SessionState::Error)?;
                }
                error!(attempts = self.consecutive_reinits, "Giving up on session recovery");
                return Err(Error::ReinitLimitReached {
                    attempts: self.consecutive_reinits,
                });
            }
        }

        self.consecutive_reinits += 1;
        info!(attempt = self.consecutive_reinits, "Reinitializing session");
        self.start_session();

        Ok(())
    }

    fn on_quality_requested(&mut self) {
        let desired = self.options_rx.borrow_and_update().current_quality;
        if desired == self.applied_quality {
            return;
        }

        let Some(engine) = self.session.as_mut().and_then(|s| s.engine.as_mut()) else {
            debug!(requested = ?desired, "No engine for quality request");
            return;
        };

        let levels = engine.levels();
        if levels.is_empty() {
            debug!(requested = ?desired, "Quality request before manifest parse ignored");
            return;
        }

        let selection = resolve_level(&levels, desired);
        if selection == LevelSelection::Auto && desired.is_some() {
            warn!(requested = ?desired, "Requested quality not in ladder, engine left on auto");
        }

        engine.set_current_level(selection);
        self.applied_quality = desired;

        info!(requested = ?desired, level = %selection, "Quality applied");
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("props", &self.props)
            .field("session", &self.session.as_ref().map(|s| &s.info))
            .field("generation", &self.generation)
            .field("mounted", &self.mounted)
            .finish()
    }
}
