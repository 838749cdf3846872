//! Headless window host
//!
//! Keeps window records in memory and logs what a real windowing system would
//! draw. Displays come from the config; URLs go to the system browser.

use log::{debug, info, trace};
use parking_lot::Mutex;
use prompter_bridge::stage::RenderBody;
use prompter_bridge::{
    BridgeError, BridgeResult, Display, Rect, RenderModel, Viewport, WindowHost, WindowId,
    WindowKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct HeadlessWindow {
    kind: WindowKind,
    bounds: Rect,
    restored_bounds: Rect,
    visible: bool,
    last_first_line: Option<String>,
}

pub struct HeadlessHost {
    displays: Vec<Display>,
    windows: Mutex<HashMap<WindowId, HeadlessWindow>>,
    next_id: AtomicU64,
    quit_requested: AtomicBool,
}

impl HeadlessHost {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays,
            windows: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            quit_requested: AtomicBool::new(false),
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::Acquire)
    }

    fn with_window<R>(
        &self,
        id: WindowId,
        f: impl FnOnce(&mut HeadlessWindow) -> R,
    ) -> BridgeResult<R> {
        self.windows
            .lock()
            .get_mut(&id)
            .map(f)
            .ok_or_else(|| BridgeError::WindowUnavailable(format!("window {:?} is gone", id)))
    }

    /// Display containing the window's top-left corner
    fn display_for(&self, bounds: &Rect) -> Option<&Display> {
        self.displays
            .iter()
            .find(|d| {
                bounds.x >= d.bounds.x
                    && bounds.x < d.bounds.right()
                    && bounds.y >= d.bounds.y
                    && bounds.y < d.bounds.bottom()
            })
            .or_else(|| self.displays.iter().find(|d| d.is_primary))
    }
}

impl WindowHost for HeadlessHost {
    fn list_displays(&self) -> Vec<Display> {
        self.displays.clone()
    }

    fn create_window(&self, kind: WindowKind, bounds: Rect) -> BridgeResult<WindowId> {
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Err(BridgeError::WindowCreationFailed(format!(
                "invalid size {}x{}",
                bounds.width, bounds.height
            )));
        }
        let id = WindowId(self.next_id.fetch_add(1, Ordering::AcqRel));
        self.windows.lock().insert(
            id,
            HeadlessWindow {
                kind,
                bounds,
                restored_bounds: bounds,
                visible: false,
                last_first_line: None,
            },
        );
        info!("Created {:?} window {:?} at {:?}", kind, id, bounds);
        Ok(id)
    }

    fn show(&self, window: WindowId) -> BridgeResult<()> {
        self.with_window(window, |w| w.visible = true)?;
        debug!("Window {:?} shown", window);
        Ok(())
    }

    fn hide(&self, window: WindowId) -> BridgeResult<()> {
        self.with_window(window, |w| w.visible = false)?;
        debug!("Window {:?} hidden", window);
        Ok(())
    }

    fn focus(&self, window: WindowId) {
        trace!("Window {:?} focused", window);
    }

    fn destroy(&self, window: WindowId) {
        if let Some(w) = self.windows.lock().remove(&window) {
            debug!("Destroyed {:?} window {:?}", w.kind, window);
        }
    }

    fn set_fullscreen(&self, window: WindowId, fullscreen: bool) {
        let target = {
            let windows = self.windows.lock();
            let Some(w) = windows.get(&window) else {
                return;
            };
            if fullscreen {
                self.display_for(&w.bounds).map(|d| d.bounds)
            } else {
                Some(w.restored_bounds)
            }
        };

        let _ = self.with_window(window, |w| {
            if fullscreen {
                w.restored_bounds = w.bounds;
            }
            if let Some(bounds) = target {
                w.bounds = bounds;
            }
        });
        info!("Window {:?} fullscreen: {}", window, fullscreen);
    }

    fn viewport(&self, window: WindowId) -> Option<Viewport> {
        self.windows.lock().get(&window).map(|w| Viewport {
            width: w.bounds.width,
            height: w.bounds.height,
        })
    }

    fn present(&self, window: WindowId, frame: &RenderModel) {
        let first_line = match &frame.body {
            RenderBody::Script(text) => text.lines().next().unwrap_or_default().to_string(),
            RenderBody::Placeholder { title, .. } => title.clone(),
        };
        let _ = self.with_window(window, |w| {
            if w.visible && w.last_first_line.as_deref() != Some(first_line.as_str()) {
                debug!("Stage now showing: {}", first_line);
                w.last_first_line = Some(first_line);
            }
        });
        trace!(
            "Present {:?}: offset {} font {}px mirrored {}",
            window,
            frame.scroll_offset,
            frame.font_size,
            frame.mirrored
        );
    }

    fn open_external(&self, url: &str) -> BridgeResult<()> {
        info!("Opening {} in the system browser", url);
        open::that(url).map_err(|e| BridgeError::WindowUnavailable(format!("cannot open {}: {}", url, e)))
    }

    fn quit(&self) {
        info!("Quit requested");
        self.quit_requested.store(true, Ordering::Release);
    }
}
