//! Window host interface
//!
//! Window creation, visibility, display enumeration and URL opening belong to
//! the host windowing system. The bridge only talks to it through
//! [`WindowHost`] and decides where the stage window should go.

use crate::error::{BridgeError, BridgeResult};
use crate::stage::RenderModel;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Offset of the stage window inside an extended display
const EXTENDED_DISPLAY_OFFSET: f64 = 100.0;
/// Gap between the primary display's right edge and the stage window
const PRIMARY_RIGHT_GAP: f64 = 50.0;

/// Axis-aligned rectangle in desktop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A monitor as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: u32,
    pub bounds: Rect,
    pub work_area: Rect,
    pub is_primary: bool,
}

impl Display {
    /// True when this display does not overlap `other` on at least one axis
    /// (entirely to the right, left, above or below it)
    fn lies_outside(&self, other: &Display) -> bool {
        self.bounds.x >= other.bounds.right()
            || self.bounds.right() <= other.bounds.x
            || self.bounds.y >= other.bounds.bottom()
            || self.bounds.bottom() <= other.bounds.y
    }
}

/// Opaque host window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Dashboard,
    Stage,
}

/// Drawable area of a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Host windowing system
pub trait WindowHost: Send + Sync {
    fn list_displays(&self) -> Vec<Display>;

    fn create_window(&self, kind: WindowKind, bounds: Rect) -> BridgeResult<WindowId>;

    fn show(&self, window: WindowId) -> BridgeResult<()>;

    fn hide(&self, window: WindowId) -> BridgeResult<()>;

    fn focus(&self, window: WindowId);

    fn destroy(&self, window: WindowId);

    fn set_fullscreen(&self, window: WindowId, fullscreen: bool);

    fn viewport(&self, window: WindowId) -> Option<Viewport>;

    /// Draw one stage frame
    fn present(&self, window: WindowId, frame: &RenderModel);

    /// Hand a URL to the system browser; never followed in-process
    fn open_external(&self, url: &str) -> BridgeResult<()>;

    fn quit(&self);
}

/// Pick the stage window bounds
///
/// Prefers a display lying entirely to the right, left, above or below the
/// primary one; otherwise places the window just right of the primary display.
pub fn place_stage_window(displays: &[Display], width: f64, height: f64) -> Rect {
    let primary = displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first());

    let Some(primary) = primary else {
        return Rect::new(PRIMARY_RIGHT_GAP, EXTENDED_DISPLAY_OFFSET, width, height);
    };

    let extended = displays
        .iter()
        .filter(|d| d.id != primary.id)
        .find(|d| d.lies_outside(primary));

    match extended {
        Some(display) => {
            log::info!("Extended display found: {:?}", display.bounds);
            Rect::new(
                display.bounds.x + EXTENDED_DISPLAY_OFFSET,
                display.bounds.y + EXTENDED_DISPLAY_OFFSET,
                width,
                height,
            )
        }
        None => {
            log::info!("No extended display, placing stage right of the primary display");
            Rect::new(
                primary.bounds.right() + PRIMARY_RIGHT_GAP,
                primary.bounds.y + EXTENDED_DISPLAY_OFFSET,
                width,
                height,
            )
        }
    }
}

// ============================================================================
// MOCK HOST
// ============================================================================

/// Window record kept by [`MockWindowHost`]
#[derive(Debug, Clone)]
pub struct MockWindow {
    pub kind: WindowKind,
    pub bounds: Rect,
    pub visible: bool,
    pub fullscreen: bool,
    pub frames_presented: u64,
    pub last_frame: Option<RenderModel>,
}

/// In-memory host for tests and headless runs
pub struct MockWindowHost {
    displays: Vec<Display>,
    windows: Mutex<HashMap<WindowId, MockWindow>>,
    next_id: AtomicU64,
    fail_create: AtomicBool,
    opened_urls: Mutex<Vec<String>>,
    quit_requested: AtomicBool,
}

impl MockWindowHost {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays,
            windows: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_create: AtomicBool::new(false),
            opened_urls: Mutex::new(Vec::new()),
            quit_requested: AtomicBool::new(false),
        }
    }

    /// Make the next window creations fail
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Release);
    }

    pub fn window(&self, id: WindowId) -> Option<MockWindow> {
        self.windows.lock().get(&id).cloned()
    }

    pub fn windows_of_kind(&self, kind: WindowKind) -> Vec<(WindowId, MockWindow)> {
        self.windows
            .lock()
            .iter()
            .filter(|(_, w)| w.kind == kind)
            .map(|(id, w)| (*id, w.clone()))
            .collect()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().clone()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::Acquire)
    }

    fn with_window<R>(&self, id: WindowId, f: impl FnOnce(&mut MockWindow) -> R) -> BridgeResult<R> {
        let mut windows = self.windows.lock();
        windows
            .get_mut(&id)
            .map(f)
            .ok_or_else(|| BridgeError::WindowUnavailable(format!("no window {:?}", id)))
    }
}

impl WindowHost for MockWindowHost {
    fn list_displays(&self) -> Vec<Display> {
        self.displays.clone()
    }

    fn create_window(&self, kind: WindowKind, bounds: Rect) -> BridgeResult<WindowId> {
        if self.fail_create.load(Ordering::Acquire) {
            return Err(BridgeError::WindowCreationFailed(
                "host refused to create window".to_string(),
            ));
        }
        let id = WindowId(self.next_id.fetch_add(1, Ordering::AcqRel));
        self.windows.lock().insert(
            id,
            MockWindow {
                kind,
                bounds,
                visible: false,
                fullscreen: false,
                frames_presented: 0,
                last_frame: None,
            },
        );
        Ok(id)
    }

    fn show(&self, window: WindowId) -> BridgeResult<()> {
        self.with_window(window, |w| w.visible = true)
    }

    fn hide(&self, window: WindowId) -> BridgeResult<()> {
        self.with_window(window, |w| w.visible = false)
    }

    fn focus(&self, _window: WindowId) {}

    fn destroy(&self, window: WindowId) {
        self.windows.lock().remove(&window);
    }

    fn set_fullscreen(&self, window: WindowId, fullscreen: bool) {
        let _ = self.with_window(window, |w| w.fullscreen = fullscreen);
    }

    fn viewport(&self, window: WindowId) -> Option<Viewport> {
        self.windows.lock().get(&window).map(|w| Viewport {
            width: w.bounds.width,
            height: w.bounds.height,
        })
    }

    fn present(&self, window: WindowId, frame: &RenderModel) {
        let _ = self.with_window(window, |w| {
            w.frames_presented += 1;
            w.last_frame = Some(frame.clone());
        });
    }

    fn open_external(&self, url: &str) -> BridgeResult<()> {
        self.opened_urls.lock().push(url.to_string());
        Ok(())
    }

    fn quit(&self) {
        self.quit_requested.store(true, Ordering::Release);
    }
}
