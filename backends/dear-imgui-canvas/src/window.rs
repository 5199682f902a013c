//! Native windows backing floating viewports
//!
//! [`WindowServer`] is the windowing contract supplied by the host engine.
//! [`ViewportWindow`] owns one native window plus the render surface embedded
//! in it, and is the object a viewport's [`PlatformHandle`] resolves to.

use crate::config::WindowConfig;
use crate::error::ViewportResult;
use crate::platform::{PlatformHandle, ViewportId, has_flag};
use crate::renderer::Renderer;
use crate::scene::Rid;
use dear_imgui_rs::platform_io::Viewport;
use dear_imgui_rs::sys;

/// Opaque identifier of a host window
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct WindowId(pub u64);

/// Integer rectangle in desktop pixels
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ScreenRect {
    pub position: [i32; 2],
    pub size: [i32; 2],
}

/// Attributes for a new native window
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSettings {
    pub title: String,
    pub position: [i32; 2],
    pub size: [i32; 2],
    pub borderless: bool,
    pub transparent: bool,
    pub always_on_top: bool,
    /// Created windows start hidden unless this is set
    pub visible: bool,
}

/// Notification a host window delivers to the bridge
#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent<E> {
    /// The user or the OS asked to close the window
    CloseRequested,
    /// The window's size changed outside of `set_window_size`
    SizeChanged,
    /// Raw input received by the window
    Input(E),
}

/// Windowing and display operations the bridge needs from the host
pub trait WindowServer {
    /// Host input event type forwarded into the GUI input queue
    type InputEvent;

    /// The pre-existing application window hosting the main viewport
    fn main_window(&self) -> WindowId;

    fn create_window(&mut self, settings: &WindowSettings) -> ViewportResult<WindowId>;

    /// Embeds a render surface filling `window` and returns the surface id
    fn embed_surface(&mut self, window: WindowId) -> ViewportResult<Rid>;

    /// Clears the background of `window`'s own root viewport
    ///
    /// With this off, a transparent window still paints its default clear
    /// color behind the embedded surface.
    fn set_transparent_background(&mut self, window: WindowId, transparent: bool);

    /// Whether child windows of `window` are drawn inside it instead of as OS windows
    fn set_embed_subwindows(&mut self, window: WindowId, embed: bool);

    /// Schedules `window` for deletion at the host's next safe teardown point
    fn queue_free(&mut self, window: WindowId);

    fn show(&mut self, window: WindowId);

    fn set_position(&mut self, window: WindowId, position: [i32; 2]);

    fn position(&self, window: WindowId) -> [i32; 2];

    fn set_size(&mut self, window: WindowId, size: [i32; 2]);

    fn size(&self, window: WindowId) -> [i32; 2];

    fn grab_focus(&mut self, window: WindowId);

    fn has_focus(&self, window: WindowId) -> bool;

    fn is_minimized(&self, window: WindowId) -> bool;

    fn set_title(&mut self, window: WindowId, title: &str);

    fn screen_count(&self) -> usize;

    fn screen_position(&self, screen: usize) -> [i32; 2];

    fn screen_size(&self, screen: usize) -> [i32; 2];

    fn screen_scale(&self, screen: usize) -> f32;

    /// Screen area not covered by task bars, docks or menus
    fn screen_usable_rect(&self, screen: usize) -> ScreenRect;
}

/// The window behind one viewport
#[derive(Debug)]
pub struct ViewportWindow {
    handle: PlatformHandle,
    viewport: ViewportId,
    window: WindowId,
    surface: Option<Rid>,
    owned: bool,
}

impl ViewportWindow {
    /// Creates a hidden native window matching `viewport`'s rectangle and
    /// registers its embedded surface as a render target
    pub fn create<W, R>(
        windows: &mut W,
        renderer: &mut R,
        viewport: &Viewport,
        config: &WindowConfig,
        handle: PlatformHandle,
    ) -> ViewportResult<Self>
    where
        W: WindowServer + ?Sized,
        R: Renderer + ?Sized,
    {
        let settings = WindowSettings {
            title: config.initial_title.clone(),
            position: to_pixels(viewport.pos()),
            size: to_pixels(viewport.size()),
            borderless: config.borderless
                || has_flag(viewport, sys::ImGuiViewportFlags_NoDecoration as i32),
            transparent: config.transparent,
            always_on_top: has_flag(viewport, sys::ImGuiViewportFlags_TopMost as i32),
            visible: false,
        };

        let window = windows.create_window(&settings)?;
        let surface = match windows.embed_surface(window) {
            Ok(surface) => surface,
            Err(err) => {
                windows.queue_free(window);
                return Err(err);
            }
        };
        if let Err(err) = renderer.init_viewport(surface) {
            windows.queue_free(window);
            return Err(err.into());
        }
        if config.transparent {
            windows.set_transparent_background(window, true);
        }

        tracing::debug!(
            target: "dear-imgui-canvas",
            viewport = viewport.id(),
            window = window.0,
            surface = surface.get(),
            "created viewport window"
        );

        Ok(Self {
            handle,
            viewport: viewport.id(),
            window,
            surface: Some(surface),
            owned: true,
        })
    }

    /// Wraps the host application window for the main viewport
    ///
    /// The wrapper owns neither the window nor a render surface.
    pub fn wrap_main(viewport: &Viewport, window: WindowId, handle: PlatformHandle) -> Self {
        Self {
            handle,
            viewport: viewport.id(),
            window,
            surface: None,
            owned: false,
        }
    }

    /// Releases the render target and queues the native window for deletion
    pub fn dispose<W, R>(self, windows: &mut W, renderer: &mut R)
    where
        W: WindowServer + ?Sized,
        R: Renderer + ?Sized,
    {
        if let Some(surface) = self.surface {
            if let Err(err) = renderer.close_viewport(surface) {
                tracing::warn!(target: "dear-imgui-canvas", %err, "closing viewport surface");
            }
        }
        if self.owned {
            windows.queue_free(self.window);
        }
        tracing::debug!(
            target: "dear-imgui-canvas",
            viewport = self.viewport,
            window = self.window.0,
            "disposed viewport window"
        );
    }

    #[inline]
    pub fn handle(&self) -> PlatformHandle {
        self.handle
    }

    #[inline]
    pub fn viewport(&self) -> ViewportId {
        self.viewport
    }

    #[inline]
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Render surface used as this viewport's render target
    #[inline]
    pub fn surface(&self) -> Option<Rid> {
        self.surface
    }

    /// Whether this wrapper created (and will free) its native window
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

/// Truncates GUI coordinates to whole desktop pixels
#[inline]
pub(crate) fn to_pixels(v: [f32; 2]) -> [i32; 2] {
    [v[0] as i32, v[1] as i32]
}

#[inline]
pub(crate) fn from_pixels(v: [i32; 2]) -> [f32; 2] {
    [v[0] as f32, v[1] as f32]
}
