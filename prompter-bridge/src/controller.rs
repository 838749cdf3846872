//! Dashboard control surface
//!
//! Owns the canonical [`PresentationState`]. Every operation produces a new
//! state by merging an update into the current one, then publishes it to the
//! stage through a [`PresentationTransport`].

use crate::channel::StatePublisher;
use crate::data::{
    clamp_font_size, clamp_speed, is_valid_css_color, snap_line_height, ControlEvent,
    PresentationState, StageMessage, StateUpdate, TextStats,
};
use crate::error::{BridgeError, BridgeResult, LoadError};
use crate::loader::{DocumentLoader, LoadedDocument};
use crate::stage::{render, RenderMode, RenderModel};
use crate::transport::{Delivery, PresentationTransport, SurfaceStatus};
use std::path::Path;
use tracing::{debug, info, warn};

/// Operator-facing owner of the presentation state
pub struct ControlSurface<T: PresentationTransport> {
    state: PresentationState,
    transport: T,
    publisher: StatePublisher,
    loader: DocumentLoader,
    /// Seq of the latest reset or seek; position reports older than it are stale
    position_epoch: u64,
}

impl<T: PresentationTransport> ControlSurface<T> {
    pub fn new(transport: T, loader: DocumentLoader) -> Self {
        Self {
            state: PresentationState::welcome(),
            transport,
            publisher: StatePublisher::new(),
            loader,
            position_epoch: 0,
        }
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn stats(&self) -> TextStats {
        self.state.stats()
    }

    /// The dashboard's own small preview
    pub fn preview(&self) -> RenderModel {
        render(&self.state, RenderMode::Preview, self.state.position)
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.apply(StateUpdate {
            text: Some(text.into()),
            ..Default::default()
        });
    }

    pub fn set_font_size(&mut self, font_size: u32) {
        self.apply(StateUpdate {
            font_size: Some(clamp_font_size(font_size)),
            ..Default::default()
        });
    }

    /// Set text and background colors; both must be valid CSS colors
    pub fn set_colors(&mut self, color: &str, bg_color: &str) -> BridgeResult<()> {
        for value in [color, bg_color] {
            if !is_valid_css_color(value) {
                return Err(BridgeError::InvalidColor(value.to_string()));
            }
        }
        self.apply(StateUpdate {
            color: Some(color.trim().to_string()),
            bg_color: Some(bg_color.trim().to_string()),
            ..Default::default()
        });
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.apply(StateUpdate {
            speed: Some(clamp_speed(speed)),
            ..Default::default()
        });
    }

    pub fn set_line_height(&mut self, line_height: f64) {
        self.apply(StateUpdate {
            line_height: Some(snap_line_height(line_height)),
            ..Default::default()
        });
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.apply(StateUpdate {
            is_mirrored: Some(mirrored),
            ..Default::default()
        });
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.apply(StateUpdate {
            is_playing: Some(playing),
            ..Default::default()
        });
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn toggle_play(&mut self) {
        let playing = !self.state.is_playing;
        self.set_playing(playing);
    }

    /// Pause and go back to the top
    pub fn reset_position(&mut self) {
        self.state = self.state.merged(&StateUpdate {
            is_playing: Some(false),
            position: Some(0.0),
            ..Default::default()
        });
        self.position_epoch = self.publish(StageMessage::Reset);
        info!("Position reset");
    }

    /// Explicit jump; the only operation that sends a position
    pub fn seek(&mut self, position: f64) {
        let position = position.max(0.0);
        self.state = self.state.merged(&StateUpdate::default().with_position(position));
        self.position_epoch = self.publish(StageMessage::State {
            update: self.state.to_update().with_position(position),
        });
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load an in-memory file; on error the state is left untouched
    pub fn load_file(&mut self, name: &str, bytes: &[u8]) -> Result<LoadedDocument, LoadError> {
        let document = self.loader.load_bytes(name, bytes).inspect_err(|e| {
            warn!("Failed to load {}: {}", name, e);
        })?;
        self.set_text(document.content.clone());
        Ok(document)
    }

    /// Load from disk; on error the state is left untouched
    pub fn load_path(&mut self, path: &Path) -> Result<LoadedDocument, LoadError> {
        let document = self.loader.load_path(path).inspect_err(|e| {
            warn!("Failed to load {}: {}", path.display(), e);
        })?;
        self.set_text(document.content.clone());
        Ok(document)
    }

    // ------------------------------------------------------------------
    // Stage control events
    // ------------------------------------------------------------------

    pub fn apply_control(&mut self, event: ControlEvent) {
        debug!("Control event from stage: {:?}", event);
        match event {
            ControlEvent::TogglePlay => self.toggle_play(),
            ControlEvent::Reset => self.reset_position(),
            ControlEvent::AdjustSpeed { delta } => self.set_speed(self.state.speed + delta),
            ControlEvent::ReportPosition { position, seq } => {
                if seq < self.position_epoch {
                    debug!("Ignoring stale position {} (seq {} < {})", position, seq, self.position_epoch);
                    return;
                }
                // tracked locally, never echoed back
                self.state.position = position.max(0.0);
            }
        }
    }

    /// Apply every pending stage event; returns how many were applied
    pub fn poll_control(&mut self) -> usize {
        let events = self.transport.receive_control();
        let count = events.len();
        for event in events {
            self.apply_control(event);
        }
        count
    }

    // ------------------------------------------------------------------
    // Stage surface
    // ------------------------------------------------------------------

    /// Open (or show again) the stage and resynchronize it
    pub fn open_stage(&mut self) -> BridgeResult<SurfaceStatus> {
        let status = self.transport.open_presentation_surface()?;
        info!("Stage {:?}", status);
        self.publish_state();
        Ok(status)
    }

    pub fn close_stage(&mut self) -> BridgeResult<()> {
        self.transport.close_presentation_surface()
    }

    pub fn is_stage_visible(&self) -> bool {
        self.transport.is_surface_visible()
    }

    pub fn shutdown(&mut self) {
        info!("Control surface shutting down");
        self.transport.shutdown();
    }

    // ------------------------------------------------------------------

    fn apply(&mut self, update: StateUpdate) {
        let next = self.state.merged(&update);
        if next == self.state {
            return;
        }
        self.state = next;
        self.publish_state();
    }

    /// Full state, without position, so the stage keeps its own offset
    fn publish_state(&mut self) {
        self.publish(StageMessage::State {
            update: self.state.to_update(),
        });
    }

    /// Seal and send `message`; returns its seq
    fn publish(&mut self, message: StageMessage) -> u64 {
        let envelope = self.publisher.seal(message);
        match self.transport.send_state(&envelope) {
            Ok(Delivery::Sent) => debug!("Published seq {}", envelope.seq),
            Ok(Delivery::Dropped) => debug!("Stage not listening, seq {} dropped", envelope.seq),
            Err(e) => warn!("Failed to publish seq {}: {}", envelope.seq, e),
        }
        envelope.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FONT_SIZE_MAX, SPEED_MAX, SPEED_MIN};
    use crate::stage::RenderBody;

    /// Records everything the control surface sends
    #[derive(Default)]
    struct RecordingTransport {
        open: bool,
        visible: bool,
        sent: Vec<StageMessage>,
        inbound: Vec<ControlEvent>,
    }

    impl PresentationTransport for RecordingTransport {
        fn open_presentation_surface(&mut self) -> BridgeResult<SurfaceStatus> {
            let status = if self.open {
                SurfaceStatus::Restored
            } else {
                SurfaceStatus::Created
            };
            self.open = true;
            self.visible = true;
            Ok(status)
        }

        fn send_state(&mut self, envelope: &crate::data::Envelope<StageMessage>) -> BridgeResult<Delivery> {
            if !self.open {
                return Ok(Delivery::Dropped);
            }
            self.sent.push(envelope.payload.clone());
            Ok(Delivery::Sent)
        }

        fn receive_control(&mut self) -> Vec<ControlEvent> {
            std::mem::take(&mut self.inbound)
        }

        fn close_presentation_surface(&mut self) -> BridgeResult<()> {
            self.visible = false;
            Ok(())
        }

        fn is_surface_visible(&self) -> bool {
            self.visible
        }

        fn shutdown(&mut self) {
            self.open = false;
            self.visible = false;
        }
    }

    fn surface() -> ControlSurface<RecordingTransport> {
        let mut surface = ControlSurface::new(RecordingTransport::default(), DocumentLoader::default());
        surface.open_stage().unwrap();
        surface.transport_mut().sent.clear();
        surface
    }

    fn last_update(surface: &ControlSurface<RecordingTransport>) -> StateUpdate {
        match surface.transport().sent.last() {
            Some(StageMessage::State { update }) => update.clone(),
            other => panic!("Expected a state message, got {:?}", other),
        }
    }

    #[test]
    fn test_updates_never_carry_position() {
        let mut surface = surface();
        surface.set_font_size(40);
        surface.set_speed(80.0);
        surface.set_mirrored(true);
        surface.toggle_play();
        for message in &surface.transport().sent {
            match message {
                StageMessage::State { update } => {
                    assert!(update.position.is_none());
                    assert!(update.text.is_some());
                }
                StageMessage::Reset => panic!("Unexpected reset"),
            }
        }
        assert_eq!(surface.transport().sent.len(), 4);
    }

    #[test]
    fn test_setters_clamp() {
        let mut surface = surface();
        surface.set_font_size(500);
        assert_eq!(surface.state().font_size, FONT_SIZE_MAX);
        surface.set_speed(1.0);
        assert_eq!(surface.state().speed, SPEED_MIN);
        surface.set_line_height(1.87);
        assert!((surface.state().line_height - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_unchanged_value_is_not_republished() {
        let mut surface = surface();
        surface.set_speed(60.0);
        assert!(surface.transport().sent.is_empty());
    }

    #[test]
    fn test_invalid_color_leaves_state() {
        let mut surface = surface();
        let before = surface.state().clone();
        assert!(matches!(
            surface.set_colors("#12", "#000"),
            Err(BridgeError::InvalidColor(c)) if c == "#12"
        ));
        assert_eq!(surface.state(), &before);
        assert!(surface.transport().sent.is_empty());

        surface.set_colors("yellow", "rgb(10, 20, 30)").unwrap();
        let update = last_update(&surface);
        assert_eq!(update.color.as_deref(), Some("yellow"));
        assert_eq!(update.bg_color.as_deref(), Some("rgb(10, 20, 30)"));
    }

    #[test]
    fn test_seek_is_the_only_position_carrier() {
        let mut surface = surface();
        surface.seek(420.0);
        assert_eq!(last_update(&surface).position, Some(420.0));
        assert_eq!(surface.state().position, 420.0);
    }

    #[test]
    fn test_reset_sends_discrete_message() {
        let mut surface = surface();
        surface.set_playing(true);
        surface.apply_control(ControlEvent::ReportPosition {
            position: 300.0,
            seq: 2,
        });
        surface.reset_position();

        assert_eq!(surface.transport().sent.last(), Some(&StageMessage::Reset));
        assert!(!surface.state().is_playing);
        assert_eq!(surface.state().position, 0.0);
    }

    #[test]
    fn test_reports_older_than_reset_or_seek_are_ignored() {
        let mut surface = surface();
        // seq 1 opened the stage, seq 2 starts playback
        surface.set_playing(true);
        surface.reset_position();
        // measured before the reset (seq 3) was applied
        surface.apply_control(ControlEvent::ReportPosition {
            position: 71.0,
            seq: 2,
        });
        assert_eq!(surface.state().position, 0.0);

        surface.apply_control(ControlEvent::ReportPosition {
            position: 0.0,
            seq: 3,
        });
        assert_eq!(surface.state().position, 0.0);

        surface.seek(500.0);
        surface.apply_control(ControlEvent::ReportPosition {
            position: 12.0,
            seq: 3,
        });
        assert_eq!(surface.state().position, 500.0);

        // the stage clamped the seek and says so
        surface.apply_control(ControlEvent::ReportPosition {
            position: 200.0,
            seq: 4,
        });
        assert_eq!(surface.state().position, 200.0);
    }

    #[test]
    fn test_control_events() {
        let mut surface = surface();
        surface.transport_mut().inbound = vec![
            ControlEvent::TogglePlay,
            ControlEvent::AdjustSpeed { delta: 500.0 },
            ControlEvent::ReportPosition {
                position: 123.0,
                seq: 0,
            },
        ];
        assert_eq!(surface.poll_control(), 3);
        assert!(surface.state().is_playing);
        assert_eq!(surface.state().speed, SPEED_MAX);
        assert_eq!(surface.state().position, 123.0);
        // the position report is not echoed
        assert_eq!(surface.transport().sent.len(), 2);
    }

    #[test]
    fn test_load_error_keeps_state() {
        let mut surface = surface();
        let before = surface.state().clone();
        assert!(matches!(
            surface.load_file("slides.pptx", b"data"),
            Err(LoadError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            surface.load_file("empty.txt", b""),
            Err(LoadError::EmptyFile)
        ));
        assert_eq!(surface.state(), &before);

        let doc = surface.load_file("talk.txt", b"Hello <i>there</i>").unwrap();
        assert_eq!(doc.content, "Hello there");
        assert_eq!(surface.state().text, "Hello there");
    }

    #[test]
    fn test_preview_and_stats() {
        let mut surface = surface();
        surface.set_text("");
        assert!(matches!(surface.preview().body, RenderBody::Placeholder { .. }));
        surface.set_text("one two three");
        assert_eq!(surface.stats().words, 3);
        assert_eq!(surface.preview().font_size, crate::data::PREVIEW_FONT_SIZE);
    }

    #[test]
    fn test_open_resyncs_and_drops_before_open() {
        let mut surface = ControlSurface::new(RecordingTransport::default(), DocumentLoader::default());
        surface.set_text("early");
        assert!(surface.transport().sent.is_empty());

        assert_eq!(surface.open_stage().unwrap(), SurfaceStatus::Created);
        assert_eq!(last_update(&surface).text.as_deref(), Some("early"));
        assert!(surface.is_stage_visible());

        surface.close_stage().unwrap();
        assert!(!surface.is_stage_visible());
        assert_eq!(surface.open_stage().unwrap(), SurfaceStatus::Restored);
    }
}
