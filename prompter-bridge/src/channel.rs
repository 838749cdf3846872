//! Dashboard ↔ stage message channels
//!
//! Frames travel as JSON text so that the stage side can be a separate window,
//! process or webview. Every frame is an [`Envelope`] with a protocol version and
//! a per-sender sequence number; receivers drop anything malformed, from a
//! different protocol version, or not newer than what they already applied.

use crate::data::{ControlEvent, Envelope, StageMessage, PROTOCOL_VERSION};
use crate::error::{BridgeError, BridgeResult, SyncError};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Capacity of each direction; a full channel drops instead of blocking
pub const CHANNEL_CAPACITY: usize = 256;

/// Serialize an envelope into a wire frame
pub fn encode<T: Serialize>(envelope: &Envelope<T>) -> Result<String, SyncError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse a wire frame and check its protocol version
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<Envelope<T>, SyncError> {
    let envelope: Envelope<T> = serde_json::from_str(frame)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(SyncError::UnsupportedVersion {
            found: envelope.version,
            expected: PROTOCOL_VERSION,
        });
    }
    Ok(envelope)
}

/// Hands out increasing sequence numbers
#[derive(Debug, Clone)]
struct Sequencer {
    next: u64,
}

impl Sequencer {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn next(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }
}

/// Accepts only frames newer than the last applied one
#[derive(Debug, Clone, Default)]
struct OrderGuard {
    last_applied: u64,
}

impl OrderGuard {
    fn admit(&mut self, seq: u64) -> Result<(), SyncError> {
        if seq <= self.last_applied {
            return Err(SyncError::Stale {
                seq,
                last_applied: self.last_applied,
            });
        }
        self.last_applied = seq;
        Ok(())
    }
}

// ============================================================================
// DASHBOARD → STAGE
// ============================================================================

/// Dashboard side: stamps outgoing stage messages
#[derive(Debug, Clone)]
pub struct StatePublisher {
    sequencer: Sequencer,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self {
            sequencer: Sequencer::new(),
        }
    }

    pub fn seal(&mut self, message: StageMessage) -> Envelope<StageMessage> {
        Envelope::new(self.sequencer.next(), message)
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage side: decodes inbound frames and enforces ordering
#[derive(Debug, Clone, Default)]
pub struct StateSubscriber {
    guard: OrderGuard,
}

impl StateSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, frame: &str) -> Result<Envelope<StageMessage>, SyncError> {
        let envelope = decode::<StageMessage>(frame)?;
        self.guard.admit(envelope.seq)?;
        Ok(envelope)
    }

    pub fn last_applied(&self) -> u64 {
        self.guard.last_applied
    }
}

/// Create the dashboard → stage frame channel
pub fn state_channel() -> (Sender<String>, Receiver<String>) {
    bounded(CHANNEL_CAPACITY)
}

// ============================================================================
// STAGE → DASHBOARD
// ============================================================================

/// Stage side of the control channel
pub struct ControlEmitter {
    tx: Sender<String>,
    sequencer: Sequencer,
}

impl ControlEmitter {
    /// Send a control event without blocking
    pub fn emit(&mut self, event: ControlEvent) -> BridgeResult<()> {
        let envelope = Envelope::new(self.sequencer.next(), event);
        let frame = encode(&envelope)?;
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                log::warn!("Control channel full, dropping {:?}", envelope.payload);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(BridgeError::ChannelSendError),
        }
    }
}

/// Dashboard side of the control channel
pub struct ControlInbox {
    rx: Receiver<String>,
    guard: OrderGuard,
}

impl ControlInbox {
    /// Take every pending event; bad frames are logged and skipped
    pub fn drain(&mut self) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            match self.accept(&frame) {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Dropping control frame: {}", e),
            }
        }
        events
    }

    fn accept(&mut self, frame: &str) -> Result<ControlEvent, SyncError> {
        let envelope = decode::<ControlEvent>(frame)?;
        self.guard.admit(envelope.seq)?;
        Ok(envelope.payload)
    }
}

/// Create the stage → dashboard control channel
pub fn control_channel() -> (ControlEmitter, ControlInbox) {
    let (tx, rx) = bounded(CHANNEL_CAPACITY);
    (
        ControlEmitter {
            tx,
            sequencer: Sequencer::new(),
        },
        ControlInbox {
            rx,
            guard: OrderGuard::default(),
        },
    )
}
