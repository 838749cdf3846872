//! Stage side: render model, keyboard handling and the stage worker loop
//!
//! The stage never owns the presentation state. It keeps a read replica fed by
//! dashboard frames, tracks its scroll offset locally between frames and turns
//! key presses into [`ControlEvent`]s for the dashboard.

use crate::channel::{ControlEmitter, StateSubscriber};
use crate::data::{ControlEvent, PresentationState, StageMessage, PREVIEW_FONT_SIZE};
use crate::scroll::{FrameClock, ScrollBounds, ScrollEngine, TickOutcome};
use crate::shared_state::{ScrollSnapshot, SharedStageState};
use crate::window::{Viewport, WindowHost, WindowId};
use crossbeam_channel::{select, Receiver};
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

/// Fixed header bar above the script
const HEADER_HEIGHT: f64 = 48.0;
/// Padding as fractions of the viewport
const PADDING_TOP: f64 = 0.08;
const PADDING_BOTTOM: f64 = 0.20;
const PADDING_SIDE: f64 = 0.06;
/// Average glyph advance relative to the font size
const GLYPH_WIDTH_FACTOR: f64 = 0.55;

// ============================================================================
// RENDER MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Full-size presentation window
    Stage,
    /// Small preview on the dashboard
    Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderBody {
    Script(String),
    Placeholder { title: String, hint: String },
}

/// What a host needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub mode: RenderMode,
    pub body: RenderBody,
    pub font_size: u32,
    pub line_height: f64,
    pub color: String,
    pub background: String,
    /// Flip horizontally for beam-splitter glass
    pub mirrored: bool,
    pub scroll_offset: f64,
}

/// Pure mapping from state to a drawable frame
pub fn render(state: &PresentationState, mode: RenderMode, scroll_offset: f64) -> RenderModel {
    let body = if state.text.is_empty() {
        let hint = match mode {
            RenderMode::Stage => "Go back to the dashboard to load your script",
            RenderMode::Preview => "Load a file or type some text to begin",
        };
        RenderBody::Placeholder {
            title: "No script loaded".to_string(),
            hint: hint.to_string(),
        }
    } else {
        RenderBody::Script(state.text.clone())
    };

    RenderModel {
        mode,
        body,
        font_size: match mode {
            RenderMode::Stage => state.font_size,
            RenderMode::Preview => PREVIEW_FONT_SIZE,
        },
        line_height: state.line_height,
        color: state.color.clone(),
        background: state.bg_color.clone(),
        mirrored: state.is_mirrored,
        scroll_offset,
    }
}

/// Estimated height of the stage content for `text` inside `viewport`
///
/// Hosts that can measure real layout should pass their own height to
/// [`StageRenderer::set_content_height`] instead.
pub fn estimate_content_height(text: &str, font_size: u32, line_height: f64, viewport: Viewport) -> f64 {
    if text.is_empty() {
        return viewport.height;
    }

    let font_size = f64::from(font_size);
    let text_width = (viewport.width * (1.0 - 2.0 * PADDING_SIDE)).max(font_size);
    let columns = (text_width / (font_size * GLYPH_WIDTH_FACTOR)).floor().max(1.0);

    let lines: f64 = text
        .split('\n')
        .map(|line| (line.width() as f64 / columns).ceil().max(1.0))
        .sum();

    let content = HEADER_HEIGHT
        + viewport.height * PADDING_TOP
        + lines * font_size * line_height
        + viewport.height * PADDING_BOTTOM;
    content.max(viewport.height)
}

// ============================================================================
// KEYBOARD
// ============================================================================

/// Keys the stage window listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
    Home,
    Escape,
    F11,
    ArrowUp,
    ArrowDown,
}

/// What a key press on the stage asks for
#[derive(Debug, Clone, PartialEq)]
pub enum StageAction {
    /// Forward to the dashboard
    Emit(ControlEvent),
    EnterFullscreen,
    ExitFullscreen,
}

/// Map a stage key press to an action
pub fn map_key(key: Key, speed_step: f64) -> Option<StageAction> {
    match key {
        Key::Space => Some(StageAction::Emit(ControlEvent::TogglePlay)),
        Key::Char('r') | Key::Char('R') | Key::Home => Some(StageAction::Emit(ControlEvent::Reset)),
        Key::ArrowUp => Some(StageAction::Emit(ControlEvent::AdjustSpeed { delta: speed_step })),
        Key::ArrowDown => Some(StageAction::Emit(ControlEvent::AdjustSpeed {
            delta: -speed_step,
        })),
        Key::Escape => Some(StageAction::ExitFullscreen),
        Key::F11 => Some(StageAction::EnterFullscreen),
        Key::Char(_) => None,
    }
}

// ============================================================================
// STAGE RENDERER
// ============================================================================

/// Replica + scroll engine + frame schedule for one stage surface
pub struct StageRenderer {
    replica: PresentationState,
    engine: ScrollEngine,
    frame: FrameClock,
    viewport: Viewport,
    measured_height: Option<f64>,
    margin: f64,
}

impl StageRenderer {
    pub fn new(viewport: Viewport, margin: f64, frame_interval: Duration) -> Self {
        Self {
            replica: PresentationState::stage_initial(),
            engine: ScrollEngine::new(),
            frame: FrameClock::new(frame_interval),
            viewport,
            measured_height: None,
            margin,
        }
    }

    pub fn replica(&self) -> &PresentationState {
        &self.replica
    }

    pub fn offset(&self) -> f64 {
        self.engine.offset()
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame.is_pending()
    }

    pub fn bounds(&self) -> ScrollBounds {
        let content_height = self.measured_height.unwrap_or_else(|| {
            estimate_content_height(
                &self.replica.text,
                self.replica.font_size,
                self.replica.line_height,
                self.viewport,
            )
        });
        ScrollBounds {
            content_height,
            viewport_height: self.viewport.height,
            margin: self.margin,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.engine.clamp_to(self.bounds());
    }

    /// Use a host-measured content height instead of the estimate
    pub fn set_content_height(&mut self, height: Option<f64>) {
        self.measured_height = height;
        self.engine.clamp_to(self.bounds());
    }

    /// Apply one dashboard message
    pub fn apply(&mut self, message: &StageMessage, now: Instant) {
        match message {
            StageMessage::State { update } => {
                let was_playing = self.replica.is_playing;
                self.replica = self.replica.merged(update);

                let bounds = self.bounds();
                if let Some(position) = update.position {
                    if self.engine.seek(position, bounds) {
                        debug!("Stage seek to {}", self.engine.offset());
                    }
                }
                self.engine.clamp_to(bounds);
                self.replica.position = self.engine.offset();

                match (was_playing, self.replica.is_playing) {
                    (false, true) => {
                        self.engine.resume(now);
                        self.frame.request(now);
                    }
                    (true, false) => {
                        self.frame.cancel();
                        self.engine.suspend();
                    }
                    _ => {}
                }
            }
            StageMessage::Reset => {
                self.frame.cancel();
                self.engine.reset();
                self.replica.is_playing = false;
                self.replica.position = 0.0;
            }
        }
    }

    pub fn is_frame_due(&self, now: Instant) -> bool {
        self.frame.is_due(now)
    }

    pub fn time_until_frame(&self, now: Instant) -> Option<Duration> {
        self.frame.time_until(now)
    }

    /// Run one animation frame; reschedules itself only while playing
    pub fn on_frame(&mut self, now: Instant) -> TickOutcome {
        if !self.replica.is_playing {
            self.frame.cancel();
            self.engine.suspend();
            return TickOutcome::Paused;
        }
        let outcome = self
            .engine
            .tick(now, true, self.replica.speed, self.bounds());
        self.frame.request(now);
        outcome
    }

    pub fn render(&self, mode: RenderMode) -> RenderModel {
        render(&self.replica, mode, self.engine.offset())
    }
}

// ============================================================================
// STAGE WORKER
// ============================================================================

/// Tunables for the stage worker
#[derive(Debug, Clone, Copy)]
pub struct StageSettings {
    pub sync_interval: Duration,
    pub frame_interval: Duration,
    pub margin: f64,
    pub speed_step: f64,
}

/// Channels feeding the stage worker
pub struct StageInputs {
    /// Encoded dashboard frames
    pub frames: Receiver<String>,
    pub keys: Receiver<Key>,
    pub stop: Receiver<()>,
}

/// The stage window's single thread of control
pub struct StageWorker {
    renderer: StageRenderer,
    subscriber: StateSubscriber,
    control: ControlEmitter,
    host: Arc<dyn WindowHost>,
    window: WindowId,
    shared: Arc<SharedStageState>,
    settings: StageSettings,
    last_report: Option<Instant>,
    last_reported: f64,
}

impl StageWorker {
    pub fn new(
        host: Arc<dyn WindowHost>,
        window: WindowId,
        shared: Arc<SharedStageState>,
        control: ControlEmitter,
        settings: StageSettings,
    ) -> Self {
        let viewport = host.viewport(window).unwrap_or(Viewport {
            width: 1200.0,
            height: 800.0,
        });
        Self {
            renderer: StageRenderer::new(viewport, settings.margin, settings.frame_interval),
            subscriber: StateSubscriber::new(),
            control,
            host,
            window,
            shared,
            settings,
            last_report: None,
            last_reported: 0.0,
        }
    }

    /// Event loop; returns when stopped or when the dashboard side goes away
    pub fn run(mut self, inputs: StageInputs) {
        info!("Stage worker started for window {:?}", self.window);
        self.present();

        loop {
            let now = Instant::now();
            let wait = self
                .renderer
                .time_until_frame(now)
                .map_or(self.settings.sync_interval, |d| d.min(self.settings.sync_interval));

            select! {
                recv(inputs.stop) -> _ => break,
                recv(inputs.frames) -> frame => match frame {
                    Ok(frame) => self.on_dashboard_frame(&frame),
                    Err(_) => {
                        info!("Dashboard channel closed");
                        break;
                    }
                },
                recv(inputs.keys) -> key => match key {
                    Ok(key) => self.on_key(key),
                    Err(_) => {
                        info!("Stage key source closed");
                        break;
                    }
                },
                default(wait) => {}
            }

            while let Ok(frame) = inputs.frames.try_recv() {
                self.on_dashboard_frame(&frame);
            }

            let now = Instant::now();
            if self.renderer.is_frame_due(now) {
                let outcome = self.renderer.on_frame(now);
                trace!("Stage frame: {:?}", outcome);
                if matches!(outcome, TickOutcome::Advanced { .. }) {
                    self.present();
                }
                self.report_position(now, false);
            }
        }

        info!("Stage worker stopped for window {:?}", self.window);
    }

    fn on_dashboard_frame(&mut self, frame: &str) {
        let envelope = match self.subscriber.accept(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Stage dropping frame: {}", e);
                self.shared.status.update(|s| s.rejected_frames += 1);
                return;
            }
        };

        let was_playing = self.renderer.replica().is_playing;
        let offset_before = self.renderer.offset();
        let requested = match &envelope.payload {
            StageMessage::State { update } => update.position,
            StageMessage::Reset => None,
        };
        self.renderer.apply(&envelope.payload, Instant::now());

        self.shared.replica.set(self.renderer.replica().clone());
        self.shared.status.update(|s| s.applied_seq = envelope.seq);
        self.present();

        // a seek past the end or shrinking content leaves the dashboard's
        // position somewhere the stage is not
        let offset = self.renderer.offset();
        let corrected = match requested {
            Some(position) => (position - offset).abs() > 1.0,
            None => offset != offset_before,
        };
        let stopped = was_playing && !self.renderer.replica().is_playing;
        if corrected || stopped {
            self.report_position(Instant::now(), true);
        }
    }

    fn on_key(&mut self, key: Key) {
        match map_key(key, self.settings.speed_step) {
            Some(StageAction::Emit(event)) => {
                debug!("Stage key {:?} -> {:?}", key, event);
                if let Err(e) = self.control.emit(event) {
                    warn!("Failed to send control event: {}", e);
                }
            }
            Some(StageAction::EnterFullscreen) => self.set_fullscreen(true),
            Some(StageAction::ExitFullscreen) => self.set_fullscreen(false),
            None => {}
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.shared.status.read().fullscreen == fullscreen {
            return;
        }
        let offset_before = self.renderer.offset();
        self.host.set_fullscreen(self.window, fullscreen);
        if let Some(viewport) = self.host.viewport(self.window) {
            self.renderer.set_viewport(viewport);
        }
        self.shared.status.update(|s| s.fullscreen = fullscreen);
        self.present();
        if self.renderer.offset() != offset_before {
            self.report_position(Instant::now(), true);
        }
    }

    /// Tell the dashboard where we are, at most once per sync interval
    ///
    /// Forced reports skip both the throttle and the unchanged-offset check.
    fn report_position(&mut self, now: Instant, force: bool) {
        let offset = self.renderer.offset();
        if !force {
            let throttled = self
                .last_report
                .is_some_and(|last| now.duration_since(last) < self.settings.sync_interval);
            if throttled || offset == self.last_reported {
                return;
            }
        }
        let report = ControlEvent::ReportPosition {
            position: offset,
            seq: self.subscriber.last_applied(),
        };
        if let Err(e) = self.control.emit(report) {
            warn!("Failed to report position: {}", e);
            return;
        }
        self.last_report = Some(now);
        self.last_reported = offset;
    }

    fn present(&self) {
        let bounds = self.renderer.bounds();
        self.shared.scroll.set(ScrollSnapshot {
            offset: self.renderer.offset(),
            max_scroll: bounds.max_scroll(),
        });
        if self.shared.status.read().visible {
            self.host
                .present(self.window, &self.renderer.render(RenderMode::Stage));
        }
    }
}
