//! The headless compositor: the native side of every request.
use std::collections::VecDeque;

use dpi::{LogicalPosition, LogicalSize};
use fenestra_core::data_transfer::{DataSource, DataTransferSerial, DragAndDropActions};
use fenestra_core::error::RequestError;
use fenestra_core::os_error;
use fenestra_core::screen::{ScreenId, ScreenInfo};
use fenestra_core::text_input::TextInputContentPurpose;
use fenestra_core::window::{
    clamp_size, DecorationMode, PointerShape, WindowAttributes, WindowCapabilities, WindowId,
};
use tracing::{debug, trace};

use super::{
    lock, HeadlessConfig, InteractiveOp, NativeEvent, NativeShared, NativeSource, SharedState,
    SurfaceConfigure, SurfaceId, SurfaceSnapshot,
};

/// What the client asks the text-input object to report to the input method.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextInputRequest {
    pub(crate) surrounding_text: String,
    pub(crate) cursor: usize,
    pub(crate) anchor: usize,
    pub(crate) content_purpose: TextInputContentPurpose,
    pub(crate) multiline: bool,
    pub(crate) cursor_rectangle: (LogicalPosition<f64>, LogicalSize<f64>),
}

#[derive(Debug)]
struct Grab {
    surface: SurfaceId,
    op: InteractiveOp,
    anchor: LogicalPosition<f64>,
    start_size: LogicalSize<f64>,
    start_origin: LogicalPosition<f64>,
}

#[derive(Debug, Default)]
struct Pointer {
    surface: Option<SurfaceId>,
    position: LogicalPosition<f64>,
    pressed: Option<u32>,
    grab: Option<Grab>,
}

#[derive(Debug)]
pub(crate) struct Compositor {
    config: HeadlessConfig,
    shared: SharedState,
    next_surface: u32,
    next_serial: u32,
    pointer: Pointer,
    keyboard_focus: Option<SurfaceId>,
    /// Answers to requests, delivered before any further queued notification.
    responses: VecDeque<NativeEvent>,
}

fn configure_of(snapshot: &SurfaceSnapshot, resizing: bool) -> SurfaceConfigure {
    SurfaceConfigure {
        size: Some(snapshot.size),
        active: snapshot.active,
        maximized: snapshot.maximized,
        fullscreen: snapshot.fullscreen,
        resizing,
        decoration_mode: snapshot.decoration_mode,
        capabilities: snapshot.capabilities,
    }
}

fn valid_size(size: LogicalSize<f64>) -> bool {
    size.width.is_finite() && size.height.is_finite() && size.width >= 0.0 && size.height >= 0.0
}

fn check_size(size: LogicalSize<f64>) -> Result<(), RequestError> {
    if valid_size(size) {
        Ok(())
    } else {
        Err(os_error!(format!("invalid surface size {}x{}", size.width, size.height)).into())
    }
}

impl Compositor {
    pub(crate) fn new(config: HeadlessConfig) -> Self {
        let shared = SharedState::default();
        lock(&shared).screens = config.screens.clone();
        Self {
            config,
            shared,
            next_surface: 1,
            next_serial: 1,
            pointer: Pointer::default(),
            keyboard_focus: None,
            responses: VecDeque::new(),
        }
    }

    pub(crate) fn shared(&self) -> SharedState {
        self.shared.clone()
    }

    pub(crate) fn pop_response(&mut self) -> Option<NativeEvent> {
        self.responses.pop_front()
    }

    pub(crate) fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    pub(crate) fn screens(&self) -> Vec<ScreenInfo> {
        lock(&self.shared).screens.clone()
    }

    pub(crate) fn screen(&self, screen_id: ScreenId) -> Option<ScreenInfo> {
        lock(&self.shared).screens.iter().find(|screen| screen.id == screen_id).cloned()
    }

    /// The screen new surfaces are mapped on.
    pub(crate) fn host_screen(&self) -> Option<ScreenInfo> {
        let shared = lock(&self.shared);
        shared.screens.iter().find(|screen| screen.is_primary).or(shared.screens.first()).cloned()
    }

    /// Size of the screen holding `origin`, the host screen when it is off every screen.
    fn screen_size_at(
        shared: &NativeShared,
        origin: Option<LogicalPosition<f64>>,
        fallback: LogicalSize<f64>,
    ) -> LogicalSize<f64> {
        let screens = &shared.screens;
        origin
            .and_then(|origin| screens.iter().find(|screen| screen.contains(origin)))
            .or_else(|| screens.iter().find(|screen| screen.is_primary))
            .or(screens.first())
            .map_or(fallback, |screen| screen.size)
    }

    pub(crate) fn create_surface(
        &mut self,
        window_id: WindowId,
        attributes: &WindowAttributes,
    ) -> Result<SurfaceId, RequestError> {
        let sizes = [attributes.size, attributes.min_size, attributes.max_size];
        for size in sizes.into_iter().flatten() {
            check_size(size)?;
        }

        let mut shared = lock(&self.shared);
        if let Some(max) = self.config.max_windows {
            if shared.surfaces.len() >= max {
                return Err(os_error!(format!("surface limit of {max} reached")).into());
            }
        }

        let surface = SurfaceId(self.next_surface);
        self.next_surface += 1;

        let size = clamp_size(
            attributes.size.unwrap_or(self.config.default_size),
            attributes.min_size,
            attributes.max_size,
        );
        let origin = shared
            .screens
            .iter()
            .find(|screen| screen.is_primary)
            .map_or(LogicalPosition::new(0.0, 0.0), |screen| screen.origin);
        let snapshot = SurfaceSnapshot {
            window_id,
            title: attributes.title.clone(),
            app_id: attributes.app_id.clone(),
            size,
            origin,
            min_size: attributes.min_size,
            max_size: attributes.max_size,
            active: false,
            fullscreen: false,
            maximized: false,
            minimized: false,
            decoration_mode: attributes
                .preferred_decoration_mode
                .unwrap_or(self.config.decoration_mode),
            capabilities: self.config.capabilities,
            pointer_shape: attributes.pointer_shape,
            interactive: None,
            frames: 0,
            restore_size: None,
        };
        let configure = configure_of(&snapshot, false);
        shared.surfaces.insert(surface, snapshot);
        drop(shared);

        debug!(?surface, ?window_id, "surface created");
        self.responses.push_back(NativeEvent::Configure { surface, configure });
        Ok(surface)
    }

    pub(crate) fn destroy_surface(&mut self, surface: SurfaceId) {
        let mut shared = lock(&self.shared);
        if shared.surfaces.remove(&surface).is_none() {
            return;
        }
        if shared.text_input.surface == Some(surface) {
            shared.text_input.enabled = false;
            shared.text_input.surface = None;
        }
        drop(shared);

        if self.keyboard_focus == Some(surface) {
            self.keyboard_focus = None;
        }
        if self.pointer.surface == Some(surface) {
            self.pointer.surface = None;
            self.pointer.pressed = None;
        }
        if self.pointer.grab.as_ref().is_some_and(|grab| grab.surface == surface) {
            self.pointer.grab = None;
        }
        // Notifications already queued for the surface are dropped on arrival.
        self.responses.retain(|event| surface_of(event) != Some(surface));
        debug!(?surface, "surface destroyed");
    }

    fn with_surface<R>(
        &mut self,
        surface: SurfaceId,
        f: impl FnOnce(&mut SurfaceSnapshot, LogicalSize<f64>) -> (R, Option<SurfaceConfigure>),
    ) -> Result<R, RequestError> {
        let mut shared = lock(&self.shared);
        let origin = shared.surfaces.get(&surface).map(|snapshot| snapshot.origin);
        let screen_size = Self::screen_size_at(&shared, origin, self.config.default_size);
        let snapshot = shared
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| os_error!(format!("no such surface {surface:?}")))?;
        let (result, configure) = f(snapshot, screen_size);
        drop(shared);
        if let Some(configure) = configure {
            self.responses.push_back(NativeEvent::Configure { surface, configure });
        }
        Ok(result)
    }

    pub(crate) fn set_size(
        &mut self,
        surface: SurfaceId,
        size: LogicalSize<f64>,
    ) -> Result<(), RequestError> {
        check_size(size)?;
        self.with_surface(surface, |snapshot, _| {
            if snapshot.fullscreen || snapshot.maximized {
                trace!(?surface, "size request ignored while fullscreen or maximized");
                return ((), None);
            }
            let size = clamp_size(size, snapshot.min_size, snapshot.max_size);
            if size == snapshot.size {
                return ((), None);
            }
            snapshot.size = size;
            ((), Some(configure_of(snapshot, false)))
        })
    }

    pub(crate) fn set_size_bounds(
        &mut self,
        surface: SurfaceId,
        min_size: Option<Option<LogicalSize<f64>>>,
        max_size: Option<Option<LogicalSize<f64>>>,
    ) -> Result<(), RequestError> {
        for size in [min_size.flatten(), max_size.flatten()].into_iter().flatten() {
            check_size(size)?;
        }
        self.with_surface(surface, |snapshot, _| {
            if let Some(min_size) = min_size {
                snapshot.min_size = min_size;
            }
            if let Some(max_size) = max_size {
                snapshot.max_size = max_size;
            }
            if snapshot.fullscreen || snapshot.maximized {
                return ((), None);
            }
            let size = clamp_size(snapshot.size, snapshot.min_size, snapshot.max_size);
            if size == snapshot.size {
                return ((), None);
            }
            snapshot.size = size;
            ((), Some(configure_of(snapshot, false)))
        })
    }

    pub(crate) fn set_title(
        &mut self,
        surface: SurfaceId,
        title: &str,
    ) -> Result<(), RequestError> {
        self.with_surface(surface, |snapshot, _| {
            snapshot.title = title.to_owned();
            ((), None)
        })
    }

    pub(crate) fn set_pointer_shape(
        &mut self,
        surface: SurfaceId,
        shape: PointerShape,
    ) -> Result<(), RequestError> {
        self.with_surface(surface, |snapshot, _| {
            snapshot.pointer_shape = shape;
            ((), None)
        })
    }

    pub(crate) fn set_fullscreen(
        &mut self,
        surface: SurfaceId,
        fullscreen: bool,
    ) -> Result<(), RequestError> {
        self.with_surface(surface, |snapshot, screen_size| {
            if !snapshot.capabilities.contains(WindowCapabilities::FULLSCREEN) {
                return (Err(RequestError::Ignored), None);
            }
            if snapshot.fullscreen == fullscreen {
                return (Ok(()), None);
            }
            snapshot.fullscreen = fullscreen;
            if fullscreen {
                if !snapshot.maximized {
                    snapshot.restore_size = Some(snapshot.size);
                }
                snapshot.size = screen_size;
            } else if !snapshot.maximized {
                snapshot.size = snapshot.restore_size.take().unwrap_or(snapshot.size);
            }
            (Ok(()), Some(configure_of(snapshot, false)))
        })?
    }

    pub(crate) fn set_maximized(
        &mut self,
        surface: SurfaceId,
        maximized: bool,
    ) -> Result<(), RequestError> {
        self.with_surface(surface, |snapshot, screen_size| {
            if !snapshot.capabilities.contains(WindowCapabilities::MAXIMIZE) {
                return (Err(RequestError::Ignored), None);
            }
            if snapshot.maximized == maximized {
                return (Ok(()), None);
            }
            snapshot.maximized = maximized;
            if !snapshot.fullscreen {
                if maximized {
                    snapshot.restore_size = Some(snapshot.size);
                    snapshot.size = screen_size;
                } else {
                    snapshot.size = snapshot.restore_size.take().unwrap_or(snapshot.size);
                }
            }
            (Ok(()), Some(configure_of(snapshot, false)))
        })?
    }

    pub(crate) fn minimize(&mut self, surface: SurfaceId) -> Result<(), RequestError> {
        let newly = self.with_surface(surface, |snapshot, _| {
            if !snapshot.capabilities.contains(WindowCapabilities::MINIMIZE) {
                return (Err(RequestError::Ignored), None);
            }
            let newly = !snapshot.minimized;
            snapshot.minimized = true;
            (Ok(newly), None)
        })??;
        if newly {
            self.responses.push_back(NativeEvent::Occluded { surface, occluded: true });
        }
        Ok(())
    }

    pub(crate) fn request_decoration_mode(
        &mut self,
        surface: SurfaceId,
        mode: Option<DecorationMode>,
    ) -> Result<(), RequestError> {
        let mode = mode.unwrap_or(self.config.decoration_mode);
        self.with_surface(surface, |snapshot, _| {
            if snapshot.decoration_mode == mode {
                return ((), None);
            }
            snapshot.decoration_mode = mode;
            ((), Some(configure_of(snapshot, false)))
        })
    }

    /// Start a move, resize or window menu. Needs a button held on the surface.
    pub(crate) fn start_interactive(
        &mut self,
        surface: SurfaceId,
        op: InteractiveOp,
    ) -> Result<(), RequestError> {
        if self.pointer.pressed.is_none() || self.pointer.surface != Some(surface) {
            debug!(?surface, ?op, "interactive request without a pointer press");
            return Err(RequestError::Ignored);
        }

        let anchor = self.pointer.position;
        let grab = self.with_surface(surface, |snapshot, _| {
            match op {
                InteractiveOp::WindowMenu(_)
                    if !snapshot.capabilities.contains(WindowCapabilities::WINDOW_MENU) =>
                {
                    return (Err(RequestError::Ignored), None);
                },
                InteractiveOp::Resize(_) if snapshot.fullscreen || snapshot.maximized => {
                    return (Err(RequestError::Ignored), None);
                },
                _ => (),
            }
            snapshot.interactive = Some(op);
            let grab = Grab {
                surface,
                op,
                anchor,
                start_size: snapshot.size,
                start_origin: snapshot.origin,
            };
            let configure =
                matches!(op, InteractiveOp::Resize(_)).then(|| configure_of(snapshot, true));
            (Ok(grab), configure)
        })??;

        if !matches!(op, InteractiveOp::WindowMenu(_)) {
            self.pointer.grab = Some(grab);
        }
        Ok(())
    }

    /// Count a frame and answer with a frame callback.
    pub(crate) fn commit_frame(&mut self, surface: SurfaceId) {
        let committed = match lock(&self.shared).surfaces.get_mut(&surface) {
            Some(snapshot) => {
                snapshot.frames += 1;
                true
            },
            None => false,
        };
        if committed {
            self.responses.push_back(NativeEvent::FrameDone { surface });
        }
    }

    pub(crate) fn text_input_enable(&mut self, surface: SurfaceId, request: TextInputRequest) {
        let mut shared = lock(&self.shared);
        let state = &mut shared.text_input;
        state.enabled = true;
        state.surface = Some(surface);
        Self::apply_text_input(state, request);
    }

    pub(crate) fn text_input_update(&mut self, request: TextInputRequest) {
        Self::apply_text_input(&mut lock(&self.shared).text_input, request);
    }

    /// Report the surrounding text only, keeping the rest of the state.
    pub(crate) fn text_input_set_surrounding(&mut self, text: &str, cursor: usize, anchor: usize) {
        let mut shared = lock(&self.shared);
        let state = &mut shared.text_input;
        state.surrounding_text = text.to_owned();
        state.cursor = cursor;
        state.anchor = anchor;
        state.commit_count += 1;
    }

    pub(crate) fn text_input_disable(&mut self) {
        let mut shared = lock(&self.shared);
        let state = &mut shared.text_input;
        state.enabled = false;
        state.surface = None;
        state.commit_count += 1;
    }

    fn apply_text_input(state: &mut super::NativeTextInputState, request: TextInputRequest) {
        state.surrounding_text = request.surrounding_text;
        state.cursor = request.cursor;
        state.anchor = request.anchor;
        state.content_purpose = request.content_purpose;
        state.multiline = request.multiline;
        state.cursor_rectangle = request.cursor_rectangle;
        state.commit_count += 1;
    }

    fn next_serial(&mut self) -> DataTransferSerial {
        let serial = DataTransferSerial(self.next_serial);
        self.next_serial = self.next_serial.wrapping_add(1).max(1);
        serial
    }

    /// Take ownership of the clipboard or the primary selection.
    ///
    /// The source previously owned is cancelled.
    pub(crate) fn set_selection(
        &mut self,
        source: DataSource,
        mime_types: Vec<String>,
    ) -> DataTransferSerial {
        let serial = self.next_serial();
        let previous = lock(&self.shared).sources.insert(source, NativeSource {
            serial,
            mime_types,
            actions: DragAndDropActions::empty(),
        });
        if let Some(previous) = previous {
            self.responses
                .push_back(NativeEvent::SourceCancelled { source, serial: previous.serial });
        }
        serial
    }

    pub(crate) fn start_drag(
        &mut self,
        surface: SurfaceId,
        mime_types: Vec<String>,
        actions: DragAndDropActions,
    ) -> Result<DataTransferSerial, RequestError> {
        if self.pointer.pressed.is_none() || self.pointer.surface != Some(surface) {
            debug!(?surface, "drag started without a pointer press");
            return Err(RequestError::Ignored);
        }
        let serial = self.next_serial();
        let previous = lock(&self.shared).sources.insert(DataSource::DragAndDrop, NativeSource {
            serial,
            mime_types,
            actions,
        });
        if let Some(previous) = previous {
            self.responses.push_back(NativeEvent::DragSourceFinished {
                serial: previous.serial,
                action: None,
            });
        }
        Ok(serial)
    }

    /// Withdraw an owned source without notifying the client.
    pub(crate) fn release_source(&mut self, source: DataSource) {
        lock(&self.shared).sources.remove(&source);
    }

    /// Track the native state a notification changes.
    ///
    /// Returns `false` when the compositor consumed the notification, for example pointer motion
    /// during an interactive move.
    pub(crate) fn observe(&mut self, event: &NativeEvent) -> bool {
        match event {
            NativeEvent::ScreensChanged(screens) => {
                lock(&self.shared).screens = screens.clone();
            },
            NativeEvent::Configure { surface, configure } => {
                if let Some(snapshot) = lock(&self.shared).surfaces.get_mut(surface) {
                    if let Some(size) = configure.size {
                        snapshot.size = size;
                    }
                    snapshot.active = configure.active;
                    snapshot.maximized = configure.maximized;
                    snapshot.fullscreen = configure.fullscreen;
                    snapshot.decoration_mode = configure.decoration_mode;
                    snapshot.capabilities = configure.capabilities;
                }
            },
            NativeEvent::SurfaceMoved { surface, origin } => {
                if let Some(snapshot) = lock(&self.shared).surfaces.get_mut(surface) {
                    snapshot.origin = *origin;
                }
            },
            NativeEvent::KeyboardEnter { surface } => {
                self.keyboard_focus = Some(*surface);
                let mut unminimized = false;
                if let Some(snapshot) = lock(&self.shared).surfaces.get_mut(surface) {
                    snapshot.active = true;
                    unminimized = std::mem::take(&mut snapshot.minimized);
                }
                if unminimized {
                    self.responses
                        .push_back(NativeEvent::Occluded { surface: *surface, occluded: false });
                }
            },
            NativeEvent::KeyboardLeave { surface } => {
                if self.keyboard_focus == Some(*surface) {
                    self.keyboard_focus = None;
                }
                if let Some(snapshot) = lock(&self.shared).surfaces.get_mut(surface) {
                    snapshot.active = false;
                }
            },
            NativeEvent::PointerEnter { surface, position, .. } => {
                self.pointer.surface = Some(*surface);
                self.pointer.position = *position;
            },
            NativeEvent::PointerLeave { surface, .. } => {
                if self.pointer.surface == Some(*surface) {
                    self.pointer.surface = None;
                    self.pointer.pressed = None;
                }
            },
            NativeEvent::PointerMotion { position, .. } => {
                if self.pointer.grab.is_some() {
                    self.drive_grab(*position);
                    return false;
                }
                self.pointer.position = *position;
            },
            NativeEvent::PointerButton { button, pressed, .. } => {
                if *pressed {
                    self.pointer.pressed = Some(*button);
                } else {
                    self.pointer.pressed = None;
                    if let Some(grab) = self.pointer.grab.take() {
                        self.end_grab(grab);
                        return false;
                    }
                    if let Some(surface) = self.pointer.surface {
                        if let Some(snapshot) = lock(&self.shared).surfaces.get_mut(&surface) {
                            snapshot.interactive = None;
                        }
                    }
                }
            },
            NativeEvent::SourceCancelled { source, serial } => {
                let mut shared = lock(&self.shared);
                if shared.sources.get(source).is_some_and(|owned| owned.serial == *serial) {
                    shared.sources.remove(source);
                }
            },
            NativeEvent::DragSourceFinished { serial, .. } => {
                let mut shared = lock(&self.shared);
                if shared
                    .sources
                    .get(&DataSource::DragAndDrop)
                    .is_some_and(|owned| owned.serial == *serial)
                {
                    shared.sources.remove(&DataSource::DragAndDrop);
                }
            },
            _ => (),
        }
        true
    }

    fn drive_grab(&mut self, position: LogicalPosition<f64>) {
        let Some(grab) = self.pointer.grab.as_ref() else {
            return;
        };
        let surface = grab.surface;
        let dx = position.x - grab.anchor.x;
        let dy = position.y - grab.anchor.y;

        let mut shared = lock(&self.shared);
        let Some(snapshot) = shared.surfaces.get_mut(&surface) else {
            return;
        };

        match grab.op {
            InteractiveOp::Move => {
                let origin =
                    LogicalPosition::new(grab.start_origin.x + dx, grab.start_origin.y + dy);
                snapshot.origin = origin;
                drop(shared);
                self.responses.push_back(NativeEvent::SurfaceMoved { surface, origin });
            },
            InteractiveOp::Resize(edge) => {
                let ((fw, move_x), (fh, move_y)) = edge.factors();
                let wanted = LogicalSize::new(
                    (grab.start_size.width + fw * dx).max(1.0),
                    (grab.start_size.height + fh * dy).max(1.0),
                );
                let size = clamp_size(wanted, snapshot.min_size, snapshot.max_size);
                let mut origin = grab.start_origin;
                if move_x {
                    origin.x += grab.start_size.width - size.width;
                }
                if move_y {
                    origin.y += grab.start_size.height - size.height;
                }
                snapshot.size = size;
                let moved = snapshot.origin != origin;
                snapshot.origin = origin;
                let configure = configure_of(snapshot, true);
                drop(shared);
                self.responses.push_back(NativeEvent::Configure { surface, configure });
                if moved {
                    self.responses.push_back(NativeEvent::SurfaceMoved { surface, origin });
                }
            },
            InteractiveOp::WindowMenu(_) => (),
        }
    }

    fn end_grab(&mut self, grab: Grab) {
        let mut shared = lock(&self.shared);
        let Some(snapshot) = shared.surfaces.get_mut(&grab.surface) else {
            return;
        };
        snapshot.interactive = None;
        if matches!(grab.op, InteractiveOp::Resize(_)) {
            let configure = configure_of(snapshot, false);
            drop(shared);
            self.responses.push_back(NativeEvent::Configure { surface: grab.surface, configure });
        }
    }

    /// Drop everything the client owns, as a disconnect would.
    pub(crate) fn disconnect(&mut self) {
        let mut shared = lock(&self.shared);
        shared.surfaces.clear();
        shared.sources.clear();
        shared.text_input = Default::default();
        drop(shared);
        self.pointer = Pointer::default();
        self.keyboard_focus = None;
        self.responses.clear();
    }
}

/// The surface a notification is about, if any.
pub(crate) fn surface_of(event: &NativeEvent) -> Option<SurfaceId> {
    match event {
        NativeEvent::Configure { surface, .. }
        | NativeEvent::SurfaceMoved { surface, .. }
        | NativeEvent::Close { surface }
        | NativeEvent::SurfaceEnterScreen { surface, .. }
        | NativeEvent::PreferredScale { surface, .. }
        | NativeEvent::Occluded { surface, .. }
        | NativeEvent::FrameDone { surface }
        | NativeEvent::KeyboardEnter { surface }
        | NativeEvent::KeyboardLeave { surface }
        | NativeEvent::PointerEnter { surface, .. }
        | NativeEvent::PointerLeave { surface, .. }
        | NativeEvent::TextInputEnter { surface }
        | NativeEvent::TextInputLeave { surface }
        | NativeEvent::DragEnter { surface, .. } => Some(*surface),
        _ => None,
    }
}
