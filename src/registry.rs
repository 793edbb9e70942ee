//! Window registry: ids, cached state and the lifecycle state machine.
use std::collections::HashMap;

use bitflags::bitflags;
use dpi::{LogicalPosition, LogicalSize};
use fenestra_core::error::RequestError;
use fenestra_core::event::{
    Event, WindowConfigureEvent, WindowDrawEvent, WindowFocusChangeEvent,
    WindowFullScreenToggleEvent, WindowMoveEvent, WindowOcclusionChangeEvent, WindowResizeEvent,
    WindowScaleChangedEvent, WindowScreenChangeEvent,
};
use fenestra_core::screen::{ScreenId, ScreenInfo};
use fenestra_core::window::{
    DecorationMode, PointerShape, WindowAttributes, WindowCapabilities, WindowId, WindowLifecycle,
};
use tracing::{debug, trace};

use crate::platform::headless::{SurfaceConfigure, SurfaceId};

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct WindowFlags: u16 {
        const KEY = 1 << 0;
        const MAIN = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const MAXIMIZED = 1 << 3;
        const OCCLUDED = 1 << 4;
        const RESIZING = 1 << 5;
        const REDRAW_REQUESTED = 1 << 6;
        /// A frame was committed and its callback didn't arrive yet.
        const FRAME_PENDING = 1 << 7;
    }
}

#[derive(Debug)]
pub(crate) struct WindowEntry {
    pub(crate) surface: SurfaceId,
    pub(crate) lifecycle: WindowLifecycle,
    pub(crate) flags: WindowFlags,
    pub(crate) size: LogicalSize<f64>,
    pub(crate) origin: LogicalPosition<f64>,
    pub(crate) scale: f64,
    pub(crate) screen: Option<ScreenId>,
    pub(crate) title: String,
    pub(crate) min_size: Option<LogicalSize<f64>>,
    pub(crate) max_size: Option<LogicalSize<f64>>,
    pub(crate) pointer_shape: PointerShape,
    pub(crate) decoration_mode: DecorationMode,
    pub(crate) capabilities: WindowCapabilities,
}

impl WindowEntry {
    fn wants_draw(&self) -> bool {
        self.lifecycle != WindowLifecycle::Created
            && self.flags.contains(WindowFlags::REDRAW_REQUESTED)
            && !self.flags.contains(WindowFlags::FRAME_PENDING)
    }

    fn configure_event(&self) -> WindowConfigureEvent {
        WindowConfigureEvent {
            size: self.size,
            active: self.flags.contains(WindowFlags::KEY),
            maximized: self.flags.contains(WindowFlags::MAXIMIZED),
            fullscreen: self.flags.contains(WindowFlags::FULLSCREEN),
            decoration_mode: self.decoration_mode,
            capabilities: self.capabilities,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    windows: HashMap<WindowId, WindowEntry>,
    surfaces: HashMap<SurfaceId, WindowId>,
    key_window: Option<WindowId>,
}

impl Registry {
    pub(crate) fn insert(
        &mut self,
        window_id: WindowId,
        surface: SurfaceId,
        attributes: &WindowAttributes,
        screen: Option<&ScreenInfo>,
    ) {
        let entry = WindowEntry {
            surface,
            lifecycle: WindowLifecycle::Created,
            flags: WindowFlags::empty(),
            size: attributes.size.unwrap_or(LogicalSize::new(0.0, 0.0)),
            origin: screen.map_or(LogicalPosition::new(0.0, 0.0), |screen| screen.origin),
            scale: screen.map_or(1.0, |screen| screen.scale_factor),
            screen: screen.map(|screen| screen.id),
            title: attributes.title.clone(),
            min_size: attributes.min_size,
            max_size: attributes.max_size,
            pointer_shape: attributes.pointer_shape,
            decoration_mode: attributes.preferred_decoration_mode.unwrap_or_default(),
            capabilities: WindowCapabilities::default(),
        };
        self.windows.insert(window_id, entry);
        self.surfaces.insert(surface, window_id);
    }

    /// Look a window up. Destroyed windows are `Ok(None)`.
    pub(crate) fn get(&self, window_id: WindowId) -> Result<Option<&WindowEntry>, RequestError> {
        match self.windows.get(&window_id) {
            Some(entry) => Ok(Some(entry)),
            None if window_id.was_issued() => Ok(None),
            None => Err(RequestError::UnknownWindow(window_id)),
        }
    }

    pub(crate) fn get_mut(
        &mut self,
        window_id: WindowId,
    ) -> Result<Option<&mut WindowEntry>, RequestError> {
        match self.windows.get_mut(&window_id) {
            Some(entry) => Ok(Some(entry)),
            None if window_id.was_issued() => Ok(None),
            None => Err(RequestError::UnknownWindow(window_id)),
        }
    }

    /// Retire a window once its surface is gone. Removing twice does nothing.
    pub(crate) fn remove(&mut self, window_id: WindowId) -> Option<WindowEntry> {
        let mut entry = self.windows.remove(&window_id)?;
        self.surfaces.remove(&entry.surface);
        if self.key_window == Some(window_id) {
            self.key_window = None;
        }
        entry.lifecycle = WindowLifecycle::Destroyed;
        debug!(?window_id, "window retired");
        Some(entry)
    }

    pub(crate) fn window_for_surface(&self, surface: SurfaceId) -> Option<WindowId> {
        self.surfaces.get(&surface).copied()
    }

    pub(crate) fn is_alive(&self, window_id: WindowId) -> bool {
        self.windows.contains_key(&window_id)
    }

    pub(crate) fn key_window(&self) -> Option<WindowId> {
        self.key_window
    }

    pub(crate) fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self.windows.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Apply a configure from the window manager.
    ///
    /// The first one moves the window to `Configured` and reports its full state. Later ones
    /// only report what changed: fullscreen first, then size, then the remaining state.
    pub(crate) fn configure(
        &mut self,
        window_id: WindowId,
        configure: &SurfaceConfigure,
    ) -> Vec<Event> {
        let Some(entry) = self.windows.get_mut(&window_id) else {
            return Vec::new();
        };

        let size = configure.size.unwrap_or(entry.size);
        let fullscreen_changed =
            entry.flags.contains(WindowFlags::FULLSCREEN) != configure.fullscreen;
        let size_changed = entry.size != size;
        let state_changed = entry.flags.contains(WindowFlags::MAXIMIZED) != configure.maximized
            || entry.decoration_mode != configure.decoration_mode
            || entry.capabilities != configure.capabilities;

        entry.size = size;
        entry.flags.set(WindowFlags::FULLSCREEN, configure.fullscreen);
        entry.flags.set(WindowFlags::MAXIMIZED, configure.maximized);
        entry.flags.set(WindowFlags::RESIZING, configure.resizing);
        entry.decoration_mode = configure.decoration_mode;
        entry.capabilities = configure.capabilities;

        let mut events = Vec::new();
        if entry.lifecycle == WindowLifecycle::Created {
            entry.lifecycle = WindowLifecycle::Configured;
            entry.flags.insert(WindowFlags::REDRAW_REQUESTED);
            trace!(?window_id, "window configured");
            events.push(Event::WindowConfigure(entry.configure_event()));
            events.push(Event::WindowResize(WindowResizeEvent { size }));
            return events;
        }

        if fullscreen_changed {
            events.push(Event::WindowFullScreenToggle(WindowFullScreenToggleEvent {
                is_full_screen: configure.fullscreen,
            }));
        }
        if size_changed {
            entry.flags.insert(WindowFlags::REDRAW_REQUESTED);
            events.push(Event::WindowResize(WindowResizeEvent { size }));
        }
        if state_changed {
            events.push(Event::WindowConfigure(entry.configure_event()));
        }
        events
    }

    /// Keyboard focus moved to or away from `window_id`.
    pub(crate) fn focus(&mut self, window_id: WindowId, focused: bool) -> Vec<(WindowId, Event)> {
        let mut events = Vec::new();
        if !self.windows.contains_key(&window_id) {
            return events;
        }

        if focused {
            if let Some(previous) = self.key_window.filter(|previous| *previous != window_id) {
                events.extend(self.set_key(previous, false));
            }
            self.key_window = Some(window_id);
        } else if self.key_window == Some(window_id) {
            self.key_window = None;
        }
        events.extend(self.set_key(window_id, focused));
        events
    }

    fn set_key(&mut self, window_id: WindowId, key: bool) -> Option<(WindowId, Event)> {
        let entry = self.windows.get_mut(&window_id)?;
        if entry.flags.contains(WindowFlags::KEY) == key {
            return None;
        }
        entry.flags.set(WindowFlags::KEY | WindowFlags::MAIN, key);
        Some((
            window_id,
            Event::WindowFocusChange(WindowFocusChangeEvent { is_key: key, is_main: key }),
        ))
    }

    /// The user asked to close the window. Nothing is torn down.
    pub(crate) fn close_requested(&mut self, window_id: WindowId) -> Option<Event> {
        let entry = self.windows.get_mut(&window_id)?;
        entry.lifecycle = WindowLifecycle::CloseRequested;
        Some(Event::WindowCloseRequest)
    }

    pub(crate) fn moved(
        &mut self,
        window_id: WindowId,
        origin: LogicalPosition<f64>,
    ) -> Option<Event> {
        let entry = self.windows.get_mut(&window_id)?;
        if entry.origin == origin {
            return None;
        }
        entry.origin = origin;
        Some(Event::WindowMove(WindowMoveEvent { origin }))
    }

    pub(crate) fn enter_screen(&mut self, window_id: WindowId, screen: ScreenId) -> Option<Event> {
        let entry = self.windows.get_mut(&window_id)?;
        if entry.screen == Some(screen) {
            return None;
        }
        entry.screen = Some(screen);
        Some(Event::WindowScreenChange(WindowScreenChangeEvent { new_screen_id: screen }))
    }

    pub(crate) fn rescale(&mut self, window_id: WindowId, scale: f64) -> Option<Event> {
        let entry = self.windows.get_mut(&window_id)?;
        if entry.scale == scale {
            return None;
        }
        entry.scale = scale;
        entry.flags.insert(WindowFlags::REDRAW_REQUESTED);
        Some(Event::WindowScaleChanged(WindowScaleChangedEvent { new_scale: scale }))
    }

    pub(crate) fn occlude(&mut self, window_id: WindowId, occluded: bool) -> Option<Event> {
        let entry = self.windows.get_mut(&window_id)?;
        if entry.flags.contains(WindowFlags::OCCLUDED) == occluded {
            return None;
        }
        entry.flags.set(WindowFlags::OCCLUDED, occluded);
        Some(Event::WindowOcclusionChange(WindowOcclusionChangeEvent { is_occluded: occluded }))
    }

    /// Ask for a draw, coalesced with pending ones.
    pub(crate) fn request_redraw(&mut self, window_id: WindowId) {
        if let Some(entry) = self.windows.get_mut(&window_id) {
            entry.flags.insert(WindowFlags::REDRAW_REQUESTED);
        }
    }

    pub(crate) fn has_redraws(&self) -> bool {
        self.windows.values().any(WindowEntry::wants_draw)
    }

    /// A frame was committed for `window_id`, hold further draws until the compositor is ready.
    pub(crate) fn frame_committed(&mut self, window_id: WindowId) {
        if let Some(entry) = self.windows.get_mut(&window_id) {
            entry.flags.insert(WindowFlags::FRAME_PENDING);
        }
    }

    pub(crate) fn frame_done(&mut self, window_id: WindowId) {
        if let Some(entry) = self.windows.get_mut(&window_id) {
            entry.flags.remove(WindowFlags::FRAME_PENDING);
        }
    }

    /// Take the pending draws of configured windows, in id order.
    pub(crate) fn take_redraws(&mut self) -> Vec<(WindowId, SurfaceId, WindowDrawEvent)> {
        let mut draws: Vec<_> = self
            .windows
            .iter_mut()
            .filter(|(_, entry)| entry.wants_draw())
            .map(|(window_id, entry)| {
                entry.flags.remove(WindowFlags::REDRAW_REQUESTED);
                let draw = WindowDrawEvent {
                    size: entry.size.to_physical(entry.scale),
                    scale: entry.scale,
                };
                (*window_id, entry.surface, draw)
            })
            .collect();
        draws.sort_by_key(|(window_id, ..)| *window_id);
        draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configure(size: f64, fullscreen: bool) -> SurfaceConfigure {
        SurfaceConfigure {
            size: Some(LogicalSize::new(size, size)),
            active: false,
            maximized: false,
            fullscreen,
            resizing: false,
            decoration_mode: DecorationMode::ServerSide,
            capabilities: WindowCapabilities::default(),
        }
    }

    fn registry_with_window() -> (Registry, WindowId) {
        let mut registry = Registry::default();
        let window_id = WindowId::next_unique();
        registry.insert(window_id, SurfaceId(1), &WindowAttributes::default(), None);
        (registry, window_id)
    }

    #[test]
    fn first_configure_reports_everything() {
        let (mut registry, window_id) = registry_with_window();
        let events = registry.configure(window_id, &configure(100.0, false));
        assert!(matches!(&events[..], [Event::WindowConfigure(_), Event::WindowResize(_)]));
        assert_eq!(
            registry.get(window_id).unwrap().unwrap().lifecycle,
            WindowLifecycle::Configured
        );
    }

    #[test]
    fn later_configures_report_changes_in_order() {
        let (mut registry, window_id) = registry_with_window();
        registry.configure(window_id, &configure(100.0, false));

        let events = registry.configure(window_id, &configure(300.0, true));
        assert!(matches!(
            &events[..],
            [Event::WindowFullScreenToggle(WindowFullScreenToggleEvent { is_full_screen: true }), Event::WindowResize(_)]
        ));

        assert!(registry.configure(window_id, &configure(300.0, true)).is_empty());
    }

    #[test]
    fn retired_and_unknown_ids() {
        let (mut registry, window_id) = registry_with_window();
        assert!(registry.remove(window_id).is_some());
        assert!(registry.remove(window_id).is_none());
        assert!(matches!(registry.get(window_id), Ok(None)));

        let never_issued = WindowId::from(u64::MAX);
        assert!(matches!(registry.get(never_issued), Err(RequestError::UnknownWindow(_))));
    }

    #[test]
    fn focus_moves_between_windows() {
        let (mut registry, first) = registry_with_window();
        let second = WindowId::next_unique();
        registry.insert(second, SurfaceId(2), &WindowAttributes::default(), None);

        registry.focus(first, true);
        let events = registry.focus(second, true);
        let ids: Vec<_> = events.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [first, second]);
        assert_eq!(registry.key_window(), Some(second));
    }

    #[test]
    fn redraws_are_coalesced() {
        let (mut registry, window_id) = registry_with_window();
        registry.request_redraw(window_id);
        assert!(!registry.has_redraws(), "unconfigured windows don't draw");

        registry.configure(window_id, &configure(100.0, false));
        registry.request_redraw(window_id);
        registry.request_redraw(window_id);
        assert_eq!(registry.take_redraws().len(), 1);
        assert!(!registry.has_redraws());

        registry.frame_committed(window_id);
        registry.request_redraw(window_id);
        assert!(!registry.has_redraws(), "throttled until the frame is done");
        registry.frame_done(window_id);
        assert!(registry.has_redraws());
    }
}
