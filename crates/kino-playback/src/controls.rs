//! Playback controls and overlay model

use crate::{
    broker::{ControlsSignal, Subscription, VisibilityBroker},
    config::ControlsConfig,
    engine::MediaSink,
    options::PlaybackOptionsHandle,
    quality::quality_label,
    PlaybackState, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// User-facing control actions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ControlAction {
    PlayPause,
    Play,
    Pause,
    /// Skip forward by the configured step
    SeekForward,
    /// Skip back by the configured step
    SeekBackward,
    /// Relative seek in seconds
    Seek(f64),
    /// Pick a height, or `None` for automatic
    SelectQuality(Option<u32>),
    /// Click anywhere on the overlay
    OverlayClick,
}

/// One row of the quality menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityEntry {
    pub height: u32,
    pub label: String,
    pub selected: bool,
}

/// Buttons and gestures wired to the media sink and the shared options
#[derive(Clone)]
pub struct ControlSurface {
    sink: Arc<dyn MediaSink>,
    options: PlaybackOptionsHandle,
    config: ControlsConfig,
}

impl ControlSurface {
    pub fn new(sink: Arc<dyn MediaSink>, options: PlaybackOptionsHandle, config: ControlsConfig) -> Self {
        Self { sink, options, config }
    }

    /// Perform an action
    pub async fn dispatch(&self, action: ControlAction) -> Result<()> {
        debug!(action = ?action, "Control action");
        match action {
            ControlAction::PlayPause => self.toggle().await?,
            ControlAction::Play => self.play().await?,
            ControlAction::Pause => self.pause(),
            ControlAction::SeekForward => self.seek(self.config.seek_step_secs),
            ControlAction::SeekBackward => self.seek(-self.config.seek_step_secs),
            ControlAction::Seek(delta) => self.seek(delta),
            ControlAction::SelectQuality(height) => self.select_quality(height),
            ControlAction::OverlayClick => self.overlay_click().await?,
        }
        Ok(())
    }

    /// Move the playhead by `delta` seconds.
    ///
    /// The target is clamped at zero: seeking back past the start lands on
    /// 0.0, and the sink never receives a negative time.
    pub fn seek(&self, delta: f64) {
        let target = (self.sink.current_time() + delta).max(0.0);
        self.sink.set_current_time(target);
    }

    pub async fn play(&self) -> Result<()> {
        self.sink.play().await
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Play when paused, pause when playing
    pub async fn toggle(&self) -> Result<()> {
        if self.sink.paused() {
            self.sink.play().await
        } else {
            self.sink.pause();
            Ok(())
        }
    }

    /// Overlay clicks toggle playback except on touch layouts
    pub async fn overlay_click(&self) -> Result<()> {
        if self.config.mobile {
            return Ok(());
        }
        self.toggle().await
    }

    /// Ask the controller for a height
    pub fn select_quality(&self, height: Option<u32>) {
        self.options.request_quality(height);
    }

    /// Menu rows for the current ladder
    pub fn quality_menu(&self) -> Vec<QualityEntry> {
        let options = self.options.snapshot();
        options
            .qualities
            .iter()
            .map(|&height| QualityEntry {
                height,
                label: quality_label(height),
                selected: options.current_quality == Some(height),
            })
            .collect()
    }
}

/// Centre button of the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterButton {
    Spinner,
    Play,
    Pause,
}

impl CenterButton {
    pub fn for_state(state: PlaybackState) -> Self {
        if state.buffering {
            CenterButton::Spinner
        } else if state.paused {
            CenterButton::Play
        } else {
            CenterButton::Pause
        }
    }
}

/// Transient overlay shown while the player controls are visible
#[derive(Debug)]
pub struct Overlay {
    visible: bool,
    subscription: Subscription,
}

impl Overlay {
    /// Subscribe to `broker`; hidden until the first "controls-shown"
    pub fn new(broker: &VisibilityBroker) -> Self {
        Self {
            visible: false,
            subscription: broker.subscribe(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn apply(&mut self, signal: ControlsSignal) {
        self.visible = matches!(signal, ControlsSignal::Shown);
    }

    /// Apply every queued signal; returns how many were applied
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(signal) = self.subscription.try_recv() {
            self.apply(signal);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply the next signal
    pub async fn next(&mut self) -> Option<ControlsSignal> {
        let signal = self.subscription.recv().await?;
        self.apply(signal);
        Some(signal)
    }

    /// Centre button to render, if the overlay is showing
    pub fn center_button(&self, state: PlaybackState) -> Option<CenterButton> {
        self.visible.then(|| CenterButton::for_state(state))
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::options::PlaybackOptions;
    use crate::sim::SimulatedSink;

    fn surface(sink: &SimulatedSink, config: ControlsConfig) -> (ControlSurface, PlaybackOptionsHandle) {
        let options = PlaybackOptionsHandle::with_options(PlaybackOptions {
            qualities: vec![1080, 720, 480],
            current_quality: Some(1080),
        });
        let surface = ControlSurface::new(Arc::new(sink.clone()), options.clone(), config);
        (surface, options)
    }

    #[tokio::test]
    async fn test_seek_steps() {
        let sink = SimulatedSink::new();
        let (controls, _) = surface(&sink, ControlsConfig::default());
        sink.set_current_time(42.0);

        controls.dispatch(ControlAction::SeekForward).await.unwrap();
        assert_eq!(sink.current_time(), 52.0);

        controls.dispatch(ControlAction::SeekBackward).await.unwrap();
        controls.dispatch(ControlAction::Seek(-5.5)).await.unwrap();
        assert_eq!(sink.current_time(), 36.5);

        controls.dispatch(ControlAction::Seek(-100.0)).await.unwrap();
        assert_eq!(sink.current_time(), 0.0);
    }

    #[tokio::test]
    async fn test_seek_backward_near_start_lands_on_zero() {
        let sink = SimulatedSink::new();
        let (controls, _) = surface(&sink, ControlsConfig::default());
        sink.set_current_time(3.0);

        controls.dispatch(ControlAction::SeekBackward).await.unwrap();
        assert_eq!(sink.current_time(), 0.0);

        controls.dispatch(ControlAction::SeekForward).await.unwrap();
        assert_eq!(sink.current_time(), 10.0);
    }

    #[tokio::test]
    async fn test_overlay_click_toggles() {
        let sink = SimulatedSink::new();
        let (controls, _) = surface(&sink, ControlsConfig::default());

        controls.dispatch(ControlAction::OverlayClick).await.unwrap();
        assert!(!sink.paused());

        controls.dispatch(ControlAction::OverlayClick).await.unwrap();
        assert!(sink.paused());
    }

    #[tokio::test]
    async fn test_overlay_click_ignored_on_mobile() {
        let sink = SimulatedSink::new();
        let config = ControlsConfig {
            mobile: true,
            ..Default::default()
        };
        let (controls, _) = surface(&sink, config);

        controls.dispatch(ControlAction::OverlayClick).await.unwrap();
        assert!(sink.paused());
        assert_eq!(sink.play_calls(), 0);
    }

    #[tokio::test]
    async fn test_play_rejection_surfaces() {
        let sink = SimulatedSink::blocking_autoplay();
        let (controls, _) = surface(&sink, ControlsConfig::default());

        let err = controls.dispatch(ControlAction::Play).await.unwrap_err();
        assert_eq!(err.error_code(), "PLAYBACK_REJECTED");
    }

    #[test]
    fn test_quality_menu() {
        let sink = SimulatedSink::new();
        let (controls, options) = surface(&sink, ControlsConfig::default());

        controls.select_quality(Some(720));
        assert_eq!(options.snapshot().current_quality, Some(720));

        let menu = controls.quality_menu();
        assert_eq!(menu.len(), 3);
        assert_eq!(menu[1].label, "720p");
        assert!(menu[1].selected);
        assert!(!menu[0].selected);
    }

    #[test]
    fn test_center_button() {
        let buffering = PlaybackState { buffering: true, paused: true };
        let paused = PlaybackState { buffering: false, paused: true };
        let playing = PlaybackState { buffering: false, paused: false };

        assert_eq!(CenterButton::for_state(buffering), CenterButton::Spinner);
        assert_eq!(CenterButton::for_state(paused), CenterButton::Play);
        assert_eq!(CenterButton::for_state(playing), CenterButton::Pause);
    }

    #[test]
    fn test_overlay_follows_signals() {
        let broker = VisibilityBroker::new(8);
        let mut overlay = Overlay::new(&broker);
        let state = PlaybackState::default();
        assert!(!overlay.is_visible());
        assert_eq!(overlay.center_button(state), None);

        broker.publish(ControlsSignal::Shown);
        assert_eq!(overlay.pump(), 1);
        assert!(overlay.is_visible());
        assert_eq!(overlay.center_button(state), Some(CenterButton::Play));

        broker.publish(ControlsSignal::Shown);
        broker.publish(ControlsSignal::Hidden);
        assert_eq!(overlay.pump(), 2);
        assert!(!overlay.is_visible());
    }
}
