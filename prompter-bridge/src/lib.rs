//! # Prompter Bridge
//!
//! State synchronization between the teleprompter dashboard and its stage
//! surface, plus the stage's auto-scroll engine.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                     DASHBOARD (caller's thread)                       │
//! │  ControlSurface: canonical PresentationState, setters, file loading   │
//! └───────────┬───────────────────────────────────────────▲───────────────┘
//!             │ Envelope<StageMessage>                    │ Envelope<ControlEvent>
//!             │ (state { update } | reset)                │ (togglePlay, resetPosition,
//!             ▼                                           │  adjustSpeed, reportPosition)
//! ┌───────────────────────────────────────────────────────┴───────────────┐
//! │            PresentationTransport (ChannelTransport)                   │
//! │  bounded crossbeam channels, JSON frames, never blocking              │
//! └───────────┬───────────────────────────────────────────▲───────────────┘
//!             ▼                                           │ keys
//! ┌───────────────────────────────────────────────────────┴───────────────┐
//! │                     STAGE (StageWorker thread)                        │
//! │  replica ⊕ update  →  ScrollEngine  →  RenderModel  →  WindowHost     │
//! │  SharedStageState: replica / scroll / status (dirty-tracked)          │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`ControlSurface`] - the only writer of [`PresentationState`]
//! - [`StatePublisher`] / [`StateSubscriber`] - sequencing and stale-frame rejection
//! - [`ScrollEngine`] - fractional-pixel accumulator, clamped offset
//! - [`StageRenderer`] / [`StageWorker`] - stage replica, keyboard and frame loop
//! - [`ChannelTransport`] - in-process transport to a [`WindowHost`] window
//! - [`DocumentLoader`] - `.txt` / `.docx` to sanitized plain text
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use prompter_bridge::{ChannelTransport, ControlSurface, DocumentLoader, MockWindowHost, PrompterConfig};
//! use std::sync::Arc;
//!
//! let config = PrompterConfig::default();
//! let host = Arc::new(MockWindowHost::new(config.displays.clone()));
//! let transport = ChannelTransport::new(host, &config);
//! let mut dashboard = ControlSurface::new(transport, DocumentLoader::new(config.max_file_bytes));
//!
//! dashboard.open_stage()?;
//! dashboard.set_text("Good evening.");
//! dashboard.set_speed(80.0);
//! dashboard.toggle_play();
//!
//! // on the dashboard's timer
//! dashboard.poll_control();
//! ```

pub mod channel;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod loader;
pub mod scroll;
pub mod shared_state;
pub mod stage;
pub mod transport;
pub mod window;

pub use channel::{control_channel, state_channel, ControlEmitter, ControlInbox, StatePublisher, StateSubscriber};
pub use config::PrompterConfig;
pub use controller::ControlSurface;
pub use data::{
    is_valid_css_color, ControlEvent, Envelope, PresentationState, StageMessage, StateUpdate,
    TextStats, PROTOCOL_VERSION,
};
pub use error::{BridgeError, BridgeResult, LoadError, SyncError};
pub use loader::{DocumentKind, DocumentLoader, LoadedDocument};
pub use scroll::{FrameClock, ScrollBounds, ScrollEngine, TickOutcome};
pub use shared_state::{DirtyValue, ScrollSnapshot, SharedStageState, StageStatus};
pub use stage::{Key, RenderBody, RenderMode, RenderModel, StageRenderer, StageWorker};
pub use transport::{ChannelTransport, Delivery, PresentationTransport, SurfaceStatus};
pub use window::{
    place_stage_window, Display, MockWindowHost, Rect, Viewport, WindowHost, WindowId, WindowKind,
};
