//! In-process stream engine and media sink
//!
//! Deterministic stand-ins used by the CLI and the test suite. The engine
//! answers `attach_media` and `load_source` by emitting the matching events
//! (unless scripted not to) and records every command it receives.

use crate::{
    config::EngineConfig,
    engine::{EngineErrorData, EngineEvent, EngineEventSender, EngineFactory, MediaSink, StreamEngine},
    Error, Level, LevelSelection, Result, SessionId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Command observed by a simulated engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EngineCommand {
    Create { enable_worker: bool },
    AttachMedia,
    LoadSource { url: String },
    StartLoad,
    RecoverMediaError,
    SetCurrentLevel { level: LevelSelection },
    Destroy,
}

/// Shared, ordered record of engine commands
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<(SessionId, EngineCommand)>>>,
}

impl CommandLog {
    fn record(&self, session: SessionId, command: EngineCommand) {
        debug!(session_id = %session, command = ?command, "Simulated engine command");
        self.entries.lock().push((session, command));
    }

    /// Commands in arrival order
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.entries.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Commands with the session that received them
    pub fn entries(&self) -> Vec<(SessionId, EngineCommand)> {
        self.entries.lock().clone()
    }

    /// Number of recorded commands matching `pred`
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&EngineCommand) -> bool,
    {
        self.entries.lock().iter().filter(|(_, c)| pred(c)).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Simulated adaptive streaming engine
pub struct SimulatedEngine {
    events: EngineEventSender,
    log: CommandLog,
    ladder: Arc<Mutex<Vec<Level>>>,
    levels: Vec<Level>,
    current_level: LevelSelection,
    auto_respond: bool,
    destroyed: bool,
}

impl SimulatedEngine {
    fn record(&self, command: EngineCommand) {
        self.log.record(self.events.session(), command);
    }

    /// Whether `destroy` has been called
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl StreamEngine for SimulatedEngine {
    fn attach_media(&mut self, _sink: Arc<dyn MediaSink>) {
        self.record(EngineCommand::AttachMedia);
        if self.auto_respond && !self.destroyed {
            self.events.emit(EngineEvent::MediaAttached);
        }
    }

    fn load_source(&mut self, url: &str) {
        self.record(EngineCommand::LoadSource { url: url.to_string() });
        if self.auto_respond && !self.destroyed {
            self.levels = self.ladder.lock().clone();
            self.events.emit(EngineEvent::ManifestParsed);
        }
    }

    fn start_load(&mut self) {
        self.record(EngineCommand::StartLoad);
    }

    fn recover_media_error(&mut self) {
        self.record(EngineCommand::RecoverMediaError);
    }

    fn levels(&self) -> Vec<Level> {
        self.levels.clone()
    }

    fn current_level(&self) -> LevelSelection {
        self.current_level
    }

    fn set_current_level(&mut self, selection: LevelSelection) {
        self.record(EngineCommand::SetCurrentLevel { level: selection });
        self.current_level = selection;
    }

    fn destroy(&mut self) {
        self.record(EngineCommand::Destroy);
        self.destroyed = true;
        self.levels.clear();
    }
}

/// Factory producing [`SimulatedEngine`]s
///
/// Keeps every engine's event sender so callers can inject events (fatal
/// errors, late manifest parses) into any session, stale ones included.
#[derive(Clone)]
pub struct SimulatedEngineFactory {
    supported: bool,
    auto_respond: bool,
    ladder: Arc<Mutex<Vec<Level>>>,
    levels: Arc<Mutex<Vec<Arc<Mutex<Vec<Level>>>>>>,
    senders: Arc<Mutex<Vec<EngineEventSender>>>,
    log: CommandLog,
}

impl SimulatedEngineFactory {
    /// Engines that answer attach/load immediately with the given ladder
    pub fn new(ladder: Vec<Level>) -> Self {
        Self {
            supported: true,
            auto_respond: true,
            ladder: Arc::new(Mutex::new(ladder)),
            levels: Arc::new(Mutex::new(Vec::new())),
            senders: Arc::new(Mutex::new(Vec::new())),
            log: CommandLog::default(),
        }
    }

    /// Environment without adaptive streaming support
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Vec::new())
        }
    }

    /// Engines stay silent; the caller emits lifecycle events by hand
    pub fn manual(mut self) -> Self {
        self.auto_respond = false;
        self
    }

    /// Ladder reported by manifests parsed from now on
    pub fn set_ladder(&self, ladder: Vec<Level>) {
        *self.ladder.lock() = ladder;
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Engines constructed so far
    pub fn created(&self) -> usize {
        self.senders.lock().len()
    }

    /// Emit on the most recently constructed engine
    pub fn emit(&self, event: EngineEvent) -> Result<()> {
        let sender = self.senders.lock().last().cloned().ok_or(Error::NoActiveSession)?;
        sender.emit(event);
        Ok(())
    }

    /// Emit on the `index`-th constructed engine (zero-based)
    pub fn emit_on(&self, index: usize, event: EngineEvent) -> Result<()> {
        let sender = self.senders.lock().get(index).cloned().ok_or(Error::NoActiveSession)?;
        sender.emit(event);
        Ok(())
    }

    /// Emit a fatal error on the most recent engine
    pub fn fail(&self, error: EngineErrorData) -> Result<()> {
        self.emit(EngineEvent::Error(error))
    }

    /// Publish the ladder to the latest engine and announce a parsed manifest.
    /// For manual engines.
    pub fn parse_manifest(&self) -> Result<()> {
        let levels = self.levels.lock().last().cloned().ok_or(Error::NoActiveSession)?;
        *levels.lock() = self.ladder.lock().clone();
        self.emit(EngineEvent::ManifestParsed)
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: EngineConfig, events: EngineEventSender) -> Box<dyn StreamEngine> {
        self.log.record(
            events.session(),
            EngineCommand::Create {
                enable_worker: config.enable_worker,
            },
        );
        self.senders.lock().push(events.clone());

        let engine = SimulatedEngine {
            events,
            log: self.log.clone(),
            ladder: Arc::clone(&self.ladder),
            levels: Vec::new(),
            current_level: LevelSelection::Auto,
            auto_respond: self.auto_respond,
            destroyed: false,
        };

        if self.auto_respond {
            Box::new(engine)
        } else {
            let shared = Arc::new(Mutex::new(Vec::new()));
            self.levels.lock().push(Arc::clone(&shared));
            Box::new(ManualEngine { inner: engine, shared })
        }
    }
}

/// Manual-mode engine whose ladder is published by the factory
struct ManualEngine {
    inner: SimulatedEngine,
    shared: Arc<Mutex<Vec<Level>>>,
}

impl StreamEngine for ManualEngine {
    fn attach_media(&mut self, sink: Arc<dyn MediaSink>) {
        self.inner.attach_media(sink);
    }

    fn load_source(&mut self, url: &str) {
        self.inner.load_source(url);
    }

    fn start_load(&mut self) {
        self.inner.start_load();
    }

    fn recover_media_error(&mut self) {
        self.inner.recover_media_error();
    }

    fn levels(&self) -> Vec<Level> {
        if self.inner.is_destroyed() {
            return Vec::new();
        }
        self.shared.lock().clone()
    }

    fn current_level(&self) -> LevelSelection {
        self.inner.current_level()
    }

    fn set_current_level(&mut self, selection: LevelSelection) {
        self.inner.set_current_level(selection);
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

#[derive(Debug)]
struct SinkState {
    src: Option<String>,
    autoplay: bool,
    current_time: f64,
    paused: bool,
    block_play: bool,
    play_calls: usize,
}

/// Simulated media element
#[derive(Debug, Clone)]
pub struct SimulatedSink {
    state: Arc<Mutex<SinkState>>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                src: None,
                autoplay: false,
                current_time: 0.0,
                paused: true,
                block_play: false,
                play_calls: 0,
            })),
        }
    }

    /// Refuse `play()` as a browser does before any user gesture
    pub fn blocking_autoplay() -> Self {
        let sink = Self::new();
        sink.state.lock().block_play = true;
        sink
    }

    /// Lift or restore the play block
    pub fn set_block_play(&self, block: bool) {
        self.state.lock().block_play = block;
    }

    /// Directly assigned source
    pub fn src(&self) -> Option<String> {
        self.state.lock().src.clone()
    }

    /// Directly assigned autoplay flag
    pub fn autoplay(&self) -> bool {
        self.state.lock().autoplay
    }

    /// Number of `play()` calls, refused ones included
    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSink for SimulatedSink {
    async fn play(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.play_calls += 1;
        if state.block_play {
            return Err(Error::rejected(
                "play() failed because the user didn't interact with the document first",
            ));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    fn paused(&self) -> bool {
        self.state.lock().paused
    }

    fn set_src(&self, src: &str) {
        self.state.lock().src = Some(src.to_string());
    }

    fn set_autoplay(&self, autoplay: bool) {
        self.state.lock().autoplay = autoplay;
    }
}
