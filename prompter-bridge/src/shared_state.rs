//! Dirty-tracked shared state
//!
//! The stage worker writes, observers (dashboard status line, tests, host
//! adapters) read only when something changed.

use crate::data::PresentationState;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single value with a dirty flag
pub struct DirtyValue<T> {
    value: RwLock<T>,
    dirty: AtomicBool,
}

impl<T: Clone> DirtyValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            dirty: AtomicBool::new(false),
        }
    }

    /// Replace the value and mark it dirty
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.dirty.store(true, Ordering::Release);
    }

    /// Modify the value in place and mark it dirty
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.write());
        self.dirty.store(true, Ordering::Release);
    }

    /// Current value, dirty flag untouched
    pub fn read(&self) -> T {
        self.value.read().clone()
    }

    /// Current value if it changed since the last call, clearing the flag
    pub fn read_if_dirty(&self) -> Option<T> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            Some(self.read())
        } else {
            None
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

impl<T: Clone + Default> Default for DirtyValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Scroll offset as last presented by the stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollSnapshot {
    pub offset: f64,
    pub max_scroll: f64,
}

/// Stage surface status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStatus {
    pub visible: bool,
    pub fullscreen: bool,
    /// Sequence number of the last applied dashboard frame
    pub applied_seq: u64,
    /// Frames refused as malformed, stale or from another protocol version
    pub rejected_frames: u64,
}

/// Everything the stage worker publishes about itself
pub struct SharedStageState {
    pub replica: DirtyValue<PresentationState>,
    pub scroll: DirtyValue<ScrollSnapshot>,
    pub status: DirtyValue<StageStatus>,
}

impl SharedStageState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replica: DirtyValue::new(PresentationState::stage_initial()),
            scroll: DirtyValue::default(),
            status: DirtyValue::default(),
        })
    }
}
