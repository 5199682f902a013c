//! Multi-viewport bridge
//!
//! [`ViewportBridge`] implements Dear ImGui's
//! [`PlatformViewportBackend`]. It maps each floating [`Viewport`] to a
//! [`ViewportWindow`] through the opaque [`PlatformHandle`] stored on the
//! viewport, publishes the monitor list, and renders every floating
//! viewport's draw data once per frame.
//!
//! # Frame order
//!
//! 1. The host forwards window notifications with
//!    [`ViewportBridge::handle_window_event`] and feeds
//!    [`ViewportBridge::drain_input`] to Dear ImGui.
//! 2. The host builds the frame, calls `Context::render`, then
//!    `Context::update_platform_windows`, which invokes the window callbacks.
//!    The shared bridge must not be borrowed across that call.
//! 3. The host renders the main surface, then calls
//!    [`ViewportBridge::render_viewports`].

use crate::config::CanvasConfig;
use crate::error::{ViewportError, ViewportResult};
use crate::platform::{
    PlatformHandle, ViewportId, publish_monitors, register_callbacks, unregister_callbacks,
};
use crate::renderer::{self, Renderer};
use crate::window::{ViewportWindow, WindowEvent, WindowId, WindowServer, from_pixels, to_pixels};
use dear_imgui_rs::internal::RawCast;
use dear_imgui_rs::platform_io::{PlatformIo, Viewport};
use dear_imgui_rs::render::{DrawData, DrawDataSnapshot};
use dear_imgui_rs::sys;
use dear_imgui_rs::viewport_backend::{
    PlatformViewportBackend, PlatformViewportContext, clear_platform_viewport_context,
    has_platform_viewport_context, set_platform_viewport_context,
};
use dear_imgui_rs::{BackendFlags, Context};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::rc::Rc;

const PLATFORM_NAME: &str = "dear_imgui_canvas_windows";

/// Platform-window implementation backed by a [`WindowServer`] and a [`Renderer`]
pub struct ViewportBridge<R: Renderer, W: WindowServer> {
    renderer: R,
    windows: W,
    config: CanvasConfig,
    registry: HashMap<PlatformHandle, ViewportWindow>,
    next_handle: NonZeroUsize,
    main_handle: Option<PlatformHandle>,
    input: VecDeque<(WindowId, W::InputEvent)>,
    installed: bool,
}

impl<R: Renderer, W: WindowServer> ViewportBridge<R, W> {
    pub fn new(renderer: R, windows: W, config: CanvasConfig) -> Self {
        Self {
            renderer,
            windows,
            config,
            registry: HashMap::new(),
            next_handle: NonZeroUsize::MIN,
            main_handle: None,
            input: VecDeque::new(),
            installed: false,
        }
    }

    #[inline]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[inline]
    pub fn windows(&self) -> &W {
        &self.windows
    }

    #[inline]
    pub fn windows_mut(&mut self) -> &mut W {
        &mut self.windows
    }

    #[inline]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Whether this bridge is the thread's installed platform backend
    #[inline]
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Advertises capabilities, wraps the main window and publishes monitors
    pub fn init(&mut self, ctx: &mut Context) {
        if let Err(err) = ctx.set_platform_name(Some(PLATFORM_NAME)) {
            tracing::warn!(target: "dear-imgui-canvas", %err, "failed to set platform name");
        }
        if let Err(err) = ctx.set_renderer_name(Some(self.renderer.name())) {
            tracing::warn!(target: "dear-imgui-canvas", %err, "failed to set renderer name");
        }

        let io = ctx.io_mut();
        self.renderer.init(io);
        if self.config.viewports_enabled {
            io.set_backend_flags(io.backend_flags() | BackendFlags::PLATFORM_HAS_VIEWPORTS);
        }
        self.init_platform(ctx.platform_io_mut());
    }

    /// Wraps the main viewport's window and publishes monitors
    ///
    /// `Viewports[0]` of the platform IO is the main viewport.
    pub fn init_platform(&mut self, io: &mut PlatformIo) {
        if let Some(main) = io.viewports_iter_mut().next() {
            self.wrap_main(main);
        }
        self.update_monitors(io);
    }

    /// Registers the host's application window as the main viewport's window
    pub fn wrap_main(&mut self, main: &mut Viewport) {
        if let Some(previous) = PlatformHandle::detach(main) {
            self.registry.remove(&previous);
        }
        let handle = self.allocate_handle();
        let window = ViewportWindow::wrap_main(main, self.windows.main_window(), handle);
        self.registry.insert(handle, window);
        handle.attach(main);
        self.main_handle = Some(handle);
    }

    /// Registers the bridge as this thread's platform viewport backend and
    /// points Dear ImGui's window callbacks at it
    ///
    /// The returned handle is shared with the registration; keep it to drive
    /// [`render_viewports`](Self::render_viewports) and
    /// [`shutdown`](Self::shutdown).
    pub fn install(mut self, io: &mut PlatformIo) -> ViewportResult<Rc<RefCell<Self>>>
    where
        R: 'static,
        W: 'static,
        W::InputEvent: 'static,
    {
        if has_platform_viewport_context() {
            return Err(ViewportError::AlreadyInstalled);
        }
        self.installed = true;
        let bridge = Rc::new(RefCell::new(self));
        set_platform_viewport_context(PlatformViewportContext::new(SharedBridge(Rc::clone(
            &bridge,
        ))));
        register_callbacks(io);
        tracing::debug!(target: "dear-imgui-canvas", "installed platform viewport backend");
        Ok(bridge)
    }

    /// Window registered for `viewport`, if any
    pub fn window(&self, viewport: &Viewport) -> Option<&ViewportWindow> {
        PlatformHandle::of(viewport).and_then(|handle| self.registry.get(&handle))
    }

    /// Number of live windows, the main window wrapper included
    pub fn window_count(&self) -> usize {
        self.registry.len()
    }

    /// Renders the draw data of every floating viewport into its surface
    ///
    /// Call after `Context::render`, while the per-viewport draw data is
    /// valid. Viewports without a live window and viewports without draw
    /// data are skipped. A failing viewport is logged and does not stop the
    /// others; the first failure is returned once all were attempted.
    pub fn render_viewports(&mut self, io: &PlatformIo) -> ViewportResult<()> {
        let mut first_error = None;
        for viewport in io.viewports_iter().filter(|vp| !vp.is_main()) {
            let raw = viewport.draw_data();
            if raw.is_null() {
                continue;
            }
            // Safety: the draw data stays valid until the next `new_frame`.
            let draw_data = unsafe { DrawData::from_raw(&*raw) };
            let result = renderer::snapshot(draw_data)
                .map_err(ViewportError::from)
                .and_then(|snapshot| self.render_viewport(viewport, &snapshot));
            record_failure(&mut first_error, viewport.id(), result);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Renders already snapshotted frames, one per viewport
    ///
    /// Failures are handled as in [`render_viewports`](Self::render_viewports).
    pub fn render_snapshots<'a, I>(&mut self, frames: I) -> ViewportResult<()>
    where
        I: IntoIterator<Item = (&'a Viewport, &'a DrawDataSnapshot)>,
    {
        let mut first_error = None;
        for (viewport, draw_data) in frames {
            let result = self.render_viewport(viewport, draw_data);
            record_failure(&mut first_error, viewport.id(), result);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Renders one frame into `viewport`'s surface
    ///
    /// Returns `false` if the viewport has no window with a surface.
    pub fn render_viewport(
        &mut self,
        viewport: &Viewport,
        draw_data: &DrawDataSnapshot,
    ) -> ViewportResult<bool> {
        let Some(surface) = self.window(viewport).and_then(ViewportWindow::surface) else {
            tracing::trace!(
                target: "dear-imgui-canvas",
                viewport = viewport.id(),
                "skipping viewport without a live window"
            );
            return Ok(false);
        };
        self.renderer.render_draw_data(surface, draw_data)?;
        Ok(true)
    }

    /// Monitor list built from the host's display topology
    ///
    /// With no displays reported, the main window's bounds stand in for one.
    pub fn monitors(&self) -> Vec<sys::ImGuiPlatformMonitor> {
        let count = self.windows.screen_count();
        let mut monitors: Vec<_> = (0..count)
            .map(|screen| {
                let usable = self.windows.screen_usable_rect(screen);
                let mut monitor = sys::ImGuiPlatformMonitor::default();
                monitor.MainPos = vec2(from_pixels(self.windows.screen_position(screen)));
                monitor.MainSize = vec2(from_pixels(self.windows.screen_size(screen)));
                monitor.WorkPos = vec2(from_pixels(usable.position));
                monitor.WorkSize = vec2(from_pixels(usable.size));
                monitor.DpiScale = self.windows.screen_scale(screen);
                monitor.PlatformHandle = std::ptr::null_mut();
                monitor
            })
            .collect();

        if monitors.is_empty() {
            let main = self.windows.main_window();
            tracing::warn!(
                target: "dear-imgui-canvas",
                "host reported no displays, using the main window bounds"
            );
            let mut monitor = sys::ImGuiPlatformMonitor::default();
            monitor.MainPos = vec2(from_pixels(self.windows.position(main)));
            monitor.MainSize = vec2(from_pixels(self.windows.size(main)));
            monitor.WorkPos = monitor.MainPos;
            monitor.WorkSize = monitor.MainSize;
            monitor.DpiScale = 1.0;
            monitors.push(monitor);
        }
        monitors
    }

    /// Re-reads the display topology and publishes it to Dear ImGui
    ///
    /// Call again whenever the set of displays changes.
    pub fn update_monitors(&self, io: &mut PlatformIo) {
        let monitors = self.monitors();
        tracing::debug!(target: "dear-imgui-canvas", count = monitors.len(), "updated monitors");
        publish_monitors(io, &monitors);
    }

    /// Routes a notification from a host window to its viewport
    ///
    /// Close and resize notifications raise the viewport's request flags for
    /// Dear ImGui to poll; input goes to the shared input queue. Returns
    /// `false` if the window belongs to no viewport.
    pub fn handle_window_event(
        &mut self,
        io: &mut PlatformIo,
        window: WindowId,
        event: WindowEvent<W::InputEvent>,
    ) -> bool {
        let Some(handle) = self
            .registry
            .values()
            .find(|w| w.window() == window)
            .map(ViewportWindow::handle)
        else {
            return false;
        };

        match event {
            WindowEvent::CloseRequested => {
                if let Some(viewport) = find_viewport(io, handle) {
                    viewport.set_platform_request_close(true);
                }
            }
            WindowEvent::SizeChanged => {
                if let Some(viewport) = find_viewport(io, handle) {
                    viewport.set_platform_request_resize(true);
                }
            }
            WindowEvent::Input(input) => self.input.push_back((window, input)),
        }
        true
    }

    /// Adds input received by any window to the shared queue
    pub fn queue_input(&mut self, window: WindowId, input: W::InputEvent) {
        self.input.push_back((window, input));
    }

    /// Takes all queued input, oldest first
    pub fn drain_input(&mut self) -> impl Iterator<Item = (WindowId, W::InputEvent)> + '_ {
        self.input.drain(..)
    }

    /// Destroys every floating window, releases the main window wrapper,
    /// shuts the renderer down and uninstalls the bridge
    ///
    /// After this Dear ImGui has no window callbacks and the thread has no
    /// platform viewport backend, so a new bridge can be installed.
    pub fn shutdown(&mut self, io: &mut PlatformIo) {
        for viewport in io.viewports_iter_mut() {
            let floating = !viewport.is_main();
            self.destroy_viewport_window(viewport);
            if floating {
                viewport.set_platform_window_created(false);
            }
        }

        for (_, window) in self.registry.drain() {
            window.dispose(&mut self.windows, &mut self.renderer);
        }
        self.main_handle = None;
        self.renderer.shutdown();
        self.input.clear();

        if self.installed {
            unregister_callbacks(io);
            clear_platform_viewport_context();
            self.installed = false;
            tracing::debug!(target: "dear-imgui-canvas", "uninstalled platform viewport backend");
        }
    }

    fn allocate_handle(&mut self) -> PlatformHandle {
        let handle = PlatformHandle::from(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        handle
    }

    fn destroy_viewport_window(&mut self, viewport: &mut Viewport) {
        let Some(handle) = PlatformHandle::detach(viewport) else {
            return;
        };
        if self.main_handle == Some(handle) {
            self.main_handle = None;
        }
        if let Some(window) = self.registry.remove(&handle) {
            window.dispose(&mut self.windows, &mut self.renderer);
        }
    }

    fn find(&self, viewport: &Viewport, callback: &str) -> Option<WindowId> {
        let window = self.window(viewport).map(ViewportWindow::window);
        if window.is_none() {
            tracing::warn!(
                target: "dear-imgui-canvas",
                viewport = viewport.id(),
                callback,
                "platform callback on a viewport without a window"
            );
        }
        window
    }
}

#[inline]
fn vec2([x, y]: [f32; 2]) -> sys::ImVec2 {
    sys::ImVec2 { x, y }
}

fn find_viewport(io: &mut PlatformIo, handle: PlatformHandle) -> Option<&mut Viewport> {
    io.viewports_iter_mut()
        .find(|vp| PlatformHandle::of(vp) == Some(handle))
}

fn record_failure(
    first_error: &mut Option<ViewportError>,
    viewport: ViewportId,
    result: ViewportResult<bool>,
) {
    if let Err(err) = result {
        tracing::error!(
            target: "dear-imgui-canvas",
            viewport,
            %err,
            "failed to render viewport"
        );
        first_error.get_or_insert(err);
    }
}

impl<R, W> PlatformViewportBackend for ViewportBridge<R, W>
where
    R: Renderer + 'static,
    W: WindowServer + 'static,
    W::InputEvent: 'static,
{
    fn create_window(&mut self, viewport: &mut Viewport) {
        if PlatformHandle::of(viewport).is_some() {
            tracing::warn!(
                target: "dear-imgui-canvas",
                viewport = viewport.id(),
                "create_window on a viewport that already has a window"
            );
            return;
        }

        let main = self.windows.main_window();
        self.windows
            .set_embed_subwindows(main, self.config.window.embed_subwindows);

        let handle = self.allocate_handle();
        match ViewportWindow::create(
            &mut self.windows,
            &mut self.renderer,
            viewport,
            &self.config.window,
            handle,
        ) {
            Ok(window) => {
                self.registry.insert(handle, window);
                handle.attach(viewport);
            }
            Err(err) => tracing::error!(
                target: "dear-imgui-canvas",
                viewport = viewport.id(),
                %err,
                "failed to create viewport window"
            ),
        }
    }

    fn destroy_window(&mut self, viewport: &mut Viewport) {
        self.destroy_viewport_window(viewport);
    }

    fn show_window(&mut self, viewport: &mut Viewport) {
        if let Some(window) = self.find(viewport, "show_window") {
            self.windows.show(window);
        }
    }

    fn set_window_pos(&mut self, viewport: &mut Viewport, pos: [f32; 2]) {
        if let Some(window) = self.find(viewport, "set_window_pos") {
            self.windows.set_position(window, to_pixels(pos));
        }
    }

    fn get_window_pos(&mut self, viewport: &mut Viewport) -> [f32; 2] {
        match self.find(viewport, "get_window_pos") {
            Some(window) => from_pixels(self.windows.position(window)),
            None => viewport.pos(),
        }
    }

    fn set_window_size(&mut self, viewport: &mut Viewport, size: [f32; 2]) {
        if let Some(window) = self.find(viewport, "set_window_size") {
            self.windows.set_size(window, to_pixels(size));
        }
    }

    fn get_window_size(&mut self, viewport: &mut Viewport) -> [f32; 2] {
        match self.find(viewport, "get_window_size") {
            Some(window) => from_pixels(self.windows.size(window)),
            None => viewport.size(),
        }
    }

    fn set_window_focus(&mut self, viewport: &mut Viewport) {
        if let Some(window) = self.find(viewport, "set_window_focus") {
            self.windows.grab_focus(window);
        }
    }

    fn get_window_focus(&mut self, viewport: &mut Viewport) -> bool {
        self.find(viewport, "get_window_focus")
            .is_some_and(|window| self.windows.has_focus(window))
    }

    fn get_window_minimized(&mut self, viewport: &mut Viewport) -> bool {
        self.find(viewport, "get_window_minimized")
            .is_some_and(|window| self.windows.is_minimized(window))
    }

    fn set_window_title(&mut self, viewport: &mut Viewport, title: &str) {
        if let Some(window) = self.find(viewport, "set_window_title") {
            self.windows.set_title(window, title);
        }
    }

    fn set_window_alpha(&mut self, _viewport: &mut Viewport, _alpha: f32) {}

    fn update_window(&mut self, _viewport: &mut Viewport) {}

    fn render_window(&mut self, _viewport: &mut Viewport) {}

    fn swap_buffers(&mut self, _viewport: &mut Viewport) {}

    fn create_vk_surface(
        &mut self,
        _viewport: &mut Viewport,
        _instance: u64,
        _out_surface: &mut u64,
    ) -> i32 {
        -1
    }
}

/// The bridge as registered in the platform viewport context
///
/// Dear ImGui owns the registration while the host keeps driving the same
/// bridge through its own `Rc`.
struct SharedBridge<R: Renderer, W: WindowServer>(Rc<RefCell<ViewportBridge<R, W>>>);

impl<R: Renderer, W: WindowServer> SharedBridge<R, W> {
    fn dispatch<T>(
        &self,
        callback: &str,
        fallback: T,
        f: impl FnOnce(&mut ViewportBridge<R, W>) -> T,
    ) -> T {
        match self.0.try_borrow_mut() {
            Ok(mut bridge) => f(&mut bridge),
            Err(_) => {
                tracing::error!(
                    target: "dear-imgui-canvas",
                    callback,
                    "viewport bridge is borrowed while Dear ImGui updates platform windows"
                );
                fallback
            }
        }
    }
}

impl<R, W> PlatformViewportBackend for SharedBridge<R, W>
where
    R: Renderer + 'static,
    W: WindowServer + 'static,
    W::InputEvent: 'static,
{
    fn create_window(&mut self, viewport: &mut Viewport) {
        self.dispatch("create_window", (), |b| b.create_window(viewport));
    }

    fn destroy_window(&mut self, viewport: &mut Viewport) {
        self.dispatch("destroy_window", (), |b| b.destroy_window(viewport));
    }

    fn show_window(&mut self, viewport: &mut Viewport) {
        self.dispatch("show_window", (), |b| b.show_window(viewport));
    }

    fn set_window_pos(&mut self, viewport: &mut Viewport, pos: [f32; 2]) {
        self.dispatch("set_window_pos", (), |b| b.set_window_pos(viewport, pos));
    }

    fn get_window_pos(&mut self, viewport: &mut Viewport) -> [f32; 2] {
        let fallback = viewport.pos();
        self.dispatch("get_window_pos", fallback, |b| b.get_window_pos(viewport))
    }

    fn set_window_size(&mut self, viewport: &mut Viewport, size: [f32; 2]) {
        self.dispatch("set_window_size", (), |b| b.set_window_size(viewport, size));
    }

    fn get_window_size(&mut self, viewport: &mut Viewport) -> [f32; 2] {
        let fallback = viewport.size();
        self.dispatch("get_window_size", fallback, |b| b.get_window_size(viewport))
    }

    fn set_window_focus(&mut self, viewport: &mut Viewport) {
        self.dispatch("set_window_focus", (), |b| b.set_window_focus(viewport));
    }

    fn get_window_focus(&mut self, viewport: &mut Viewport) -> bool {
        self.dispatch("get_window_focus", false, |b| b.get_window_focus(viewport))
    }

    fn get_window_minimized(&mut self, viewport: &mut Viewport) -> bool {
        self.dispatch("get_window_minimized", false, |b| {
            b.get_window_minimized(viewport)
        })
    }

    fn set_window_title(&mut self, viewport: &mut Viewport, title: &str) {
        self.dispatch("set_window_title", (), |b| b.set_window_title(viewport, title));
    }

    fn set_window_alpha(&mut self, _viewport: &mut Viewport, _alpha: f32) {}

    fn update_window(&mut self, _viewport: &mut Viewport) {}

    fn render_window(&mut self, _viewport: &mut Viewport) {}

    fn swap_buffers(&mut self, _viewport: &mut Viewport) {}

    fn create_vk_surface(
        &mut self,
        _viewport: &mut Viewport,
        _instance: u64,
        _out_surface: &mut u64,
    ) -> i32 {
        -1
    }
}
