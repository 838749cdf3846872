//! Presentation transport
//!
//! The control surface only sees [`PresentationTransport`]. [`ChannelTransport`]
//! is the in-process implementation: the stage surface is a host window driven
//! by a [`StageWorker`] thread, and frames travel over crossbeam channels.

use crate::channel::{control_channel, encode, state_channel, ControlEmitter, ControlInbox};
use crate::config::PrompterConfig;
use crate::data::{ControlEvent, Envelope, StageMessage};
use crate::error::{BridgeError, BridgeResult};
use crate::shared_state::SharedStageState;
use crate::stage::{Key, StageInputs, StageSettings, StageWorker};
use crate::window::{place_stage_window, WindowHost, WindowId, WindowKind};
use crossbeam_channel::{bounded, unbounded, Sender, TrySendError};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long shutdown waits for the stage worker to finish
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of opening the presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// A new surface was created
    Created,
    /// A hidden surface was shown again, with its state intact
    Restored,
}

/// Outcome of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No surface, or the surface could not keep up
    Dropped,
}

/// Dashboard's view of the presentation surface
pub trait PresentationTransport: Send {
    /// Create the surface, or show it again if it is only hidden
    fn open_presentation_surface(&mut self) -> BridgeResult<SurfaceStatus>;

    /// Push a sealed message; never blocks
    fn send_state(&mut self, envelope: &Envelope<StageMessage>) -> BridgeResult<Delivery>;

    /// Control events received since the last call
    fn receive_control(&mut self) -> Vec<ControlEvent>;

    /// Hide the surface; its state survives until it is opened again
    fn close_presentation_surface(&mut self) -> BridgeResult<()>;

    fn is_surface_visible(&self) -> bool;

    /// Stop the surface for good and release its window
    fn shutdown(&mut self);
}

/// A running stage: its window, worker thread and input channels
struct StageLink {
    window: WindowId,
    frames: Sender<String>,
    keys: Sender<Key>,
    stop_sender: Option<Sender<()>>,
    worker_handle: Option<thread::JoinHandle<()>>,
    inbox: ControlInbox,
}

/// In-process transport to a stage window owned by a [`WindowHost`]
pub struct ChannelTransport {
    host: Arc<dyn WindowHost>,
    settings: StageSettings,
    stage_width: f64,
    stage_height: f64,
    shared: Arc<SharedStageState>,
    link: Option<StageLink>,
}

impl ChannelTransport {
    pub fn new(host: Arc<dyn WindowHost>, config: &PrompterConfig) -> Self {
        Self {
            host,
            settings: StageSettings {
                sync_interval: config.sync_interval(),
                frame_interval: config.frame_interval(),
                margin: config.scroll_margin_px,
                speed_step: config.speed_step,
            },
            stage_width: config.stage.width,
            stage_height: config.stage.height,
            shared: SharedStageState::new(),
            link: None,
        }
    }

    /// State published by the stage worker
    pub fn shared(&self) -> Arc<SharedStageState> {
        Arc::clone(&self.shared)
    }

    /// Key input for the stage window, `None` while no stage exists
    pub fn stage_keys(&self) -> Option<Sender<Key>> {
        self.link.as_ref().map(|link| link.keys.clone())
    }

    pub fn stage_window(&self) -> Option<WindowId> {
        self.link.as_ref().map(|link| link.window)
    }

    fn spawn_stage(&mut self) -> BridgeResult<StageLink> {
        let bounds = place_stage_window(
            &self.host.list_displays(),
            self.stage_width,
            self.stage_height,
        );
        let window = self.host.create_window(WindowKind::Stage, bounds)?;
        if let Err(e) = self.host.show(window) {
            self.host.destroy(window);
            return Err(e);
        }
        info!("Stage window {:?} created at {:?}", window, bounds);

        // a fresh stage starts from its initial replica
        let fresh = SharedStageState::new();
        self.shared.replica.set(fresh.replica.read());
        self.shared.scroll.set(fresh.scroll.read());
        self.shared.status.set(fresh.status.read());
        self.shared.status.update(|s| s.visible = true);

        let (frames_tx, frames_rx) = state_channel();
        let (keys_tx, keys_rx) = unbounded();
        let (stop_tx, stop_rx) = bounded(1);
        let (emitter, inbox): (ControlEmitter, ControlInbox) = control_channel();

        let worker = StageWorker::new(
            Arc::clone(&self.host),
            window,
            Arc::clone(&self.shared),
            emitter,
            self.settings,
        );
        let spawned = thread::Builder::new()
            .name("stage-worker".to_string())
            .spawn(move || {
                worker.run(StageInputs {
                    frames: frames_rx,
                    keys: keys_rx,
                    stop: stop_rx,
                })
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.host.destroy(window);
                return Err(BridgeError::WindowCreationFailed(format!(
                    "cannot start stage worker: {}",
                    e
                )));
            }
        };

        Ok(StageLink {
            window,
            frames: frames_tx,
            keys: keys_tx,
            stop_sender: Some(stop_tx),
            worker_handle: Some(handle),
            inbox,
        })
    }

    fn stop_worker(link: &mut StageLink) {
        if let Some(stop_tx) = link.stop_sender.take() {
            let _ = stop_tx.send(());
        }

        if let Some(handle) = link.worker_handle.take() {
            let start = Instant::now();
            loop {
                if start.elapsed() > WORKER_JOIN_TIMEOUT {
                    warn!("Stage worker stop timeout after {:?}", WORKER_JOIN_TIMEOUT);
                    break;
                }
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

impl PresentationTransport for ChannelTransport {
    fn open_presentation_surface(&mut self) -> BridgeResult<SurfaceStatus> {
        if let Some(link) = &self.link {
            self.host.show(link.window)?;
            self.host.focus(link.window);
            self.shared.status.update(|s| s.visible = true);
            info!("Stage window {:?} restored", link.window);
            return Ok(SurfaceStatus::Restored);
        }

        let link = self.spawn_stage()?;
        self.host.focus(link.window);
        self.link = Some(link);
        Ok(SurfaceStatus::Created)
    }

    fn send_state(&mut self, envelope: &Envelope<StageMessage>) -> BridgeResult<Delivery> {
        let Some(link) = &self.link else {
            debug!("No stage surface, dropping seq {}", envelope.seq);
            return Ok(Delivery::Dropped);
        };

        let frame = encode(envelope)?;
        match link.frames.try_send(frame) {
            Ok(()) => Ok(Delivery::Sent),
            Err(TrySendError::Full(_)) => {
                warn!("Stage channel full, dropping seq {}", envelope.seq);
                Ok(Delivery::Dropped)
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Stage worker gone, dropping seq {}", envelope.seq);
                Ok(Delivery::Dropped)
            }
        }
    }

    fn receive_control(&mut self) -> Vec<ControlEvent> {
        match &mut self.link {
            Some(link) => link.inbox.drain(),
            None => Vec::new(),
        }
    }

    fn close_presentation_surface(&mut self) -> BridgeResult<()> {
        let Some(link) = &self.link else {
            return Err(BridgeError::WindowUnavailable(
                "stage window is not open".to_string(),
            ));
        };
        self.host.hide(link.window)?;
        self.shared.status.update(|s| s.visible = false);
        info!("Stage window {:?} hidden", link.window);
        Ok(())
    }

    fn is_surface_visible(&self) -> bool {
        self.link.is_some() && self.shared.status.read().visible
    }

    fn shutdown(&mut self) {
        if let Some(mut link) = self.link.take() {
            Self::stop_worker(&mut link);
            self.host.destroy(link.window);
            self.shared.status.update(|s| s.visible = false);
            info!("Stage window {:?} destroyed", link.window);
        }
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StatePublisher;
    use crate::data::StateUpdate;
    use crate::window::{Display, MockWindowHost, Rect};

    fn host() -> Arc<MockWindowHost> {
        Arc::new(MockWindowHost::new(vec![Display {
            id: 1,
            bounds: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            work_area: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            is_primary: true,
        }]))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_send_without_surface_is_dropped() {
        let mut transport = ChannelTransport::new(host(), &PrompterConfig::default());
        let envelope = StatePublisher::new().seal(StageMessage::Reset);
        assert_eq!(transport.send_state(&envelope).unwrap(), Delivery::Dropped);
        assert!(transport.receive_control().is_empty());
        assert!(!transport.is_surface_visible());
    }

    #[test]
    fn test_open_close_reopen_keeps_window() {
        let host = host();
        let mut transport = ChannelTransport::new(host.clone(), &PrompterConfig::default());

        assert_eq!(
            transport.open_presentation_surface().unwrap(),
            SurfaceStatus::Created
        );
        let window = transport.stage_window().unwrap();
        assert_eq!(host.window(window).unwrap().bounds.x, 1970.0);
        assert!(transport.is_surface_visible());

        transport.close_presentation_surface().unwrap();
        assert!(!host.window(window).unwrap().visible);
        assert!(!transport.is_surface_visible());

        assert_eq!(
            transport.open_presentation_surface().unwrap(),
            SurfaceStatus::Restored
        );
        assert_eq!(transport.stage_window(), Some(window));
        assert_eq!(host.windows_of_kind(WindowKind::Stage).len(), 1);

        transport.shutdown();
        assert!(host.window(window).is_none());
    }

    #[test]
    fn test_close_without_surface_fails() {
        let mut transport = ChannelTransport::new(host(), &PrompterConfig::default());
        assert!(matches!(
            transport.close_presentation_surface(),
            Err(BridgeError::WindowUnavailable(_))
        ));
    }

    #[test]
    fn test_creation_failure_is_reported() {
        let host = host();
        host.set_fail_create(true);
        let mut transport = ChannelTransport::new(host.clone(), &PrompterConfig::default());
        assert!(matches!(
            transport.open_presentation_surface(),
            Err(BridgeError::WindowCreationFailed(_))
        ));

        host.set_fail_create(false);
        assert!(transport.open_presentation_surface().is_ok());
    }

    #[test]
    fn test_frames_reach_the_stage_replica() {
        let mut transport = ChannelTransport::new(host(), &PrompterConfig::default());
        transport.open_presentation_surface().unwrap();

        let mut publisher = StatePublisher::new();
        let envelope = publisher.seal(StageMessage::State {
            update: StateUpdate {
                text: Some("Hello stage".to_string()),
                ..Default::default()
            },
        });
        assert_eq!(transport.send_state(&envelope).unwrap(), Delivery::Sent);

        let shared = transport.shared();
        assert!(wait_until(|| shared.replica.read().text == "Hello stage"));
        assert_eq!(shared.status.read().applied_seq, envelope.seq);
    }

    #[test]
    fn test_undecodable_frame_leaves_replica_alone() {
        let mut transport = ChannelTransport::new(host(), &PrompterConfig::default());
        transport.open_presentation_surface().unwrap();

        let mut publisher = StatePublisher::new();
        let envelope = publisher.seal(StageMessage::State {
            update: StateUpdate {
                text: Some("kept".to_string()),
                ..Default::default()
            },
        });
        transport.send_state(&envelope).unwrap();

        let shared = transport.shared();
        assert!(wait_until(|| shared.replica.read().text == "kept"));
        let before = shared.replica.read();

        let frames = transport.link.as_ref().unwrap().frames.clone();
        frames.send("garbage".to_string()).unwrap();

        assert!(wait_until(|| shared.status.read().rejected_frames == 1));
        assert_eq!(shared.replica.read(), before);
        assert_eq!(shared.status.read().applied_seq, envelope.seq);
    }

    #[test]
    fn test_stage_keys_become_control_events() {
        let mut transport = ChannelTransport::new(host(), &PrompterConfig::default());
        assert!(transport.stage_keys().is_none());
        transport.open_presentation_surface().unwrap();

        let keys = transport.stage_keys().unwrap();
        keys.send(Key::Space).unwrap();
        keys.send(Key::ArrowUp).unwrap();

        let mut received = Vec::new();
        assert!(wait_until(|| {
            received.extend(transport.receive_control());
            received.len() >= 2
        }));
        assert_eq!(
            received,
            vec![
                ControlEvent::TogglePlay,
                ControlEvent::AdjustSpeed { delta: 10.0 }
            ]
        );
    }
}
