//! Glue between Dear ImGui's platform IO and the viewport bridge
//!
//! Dear ImGui calls the `Platform_*` function pointers of `ImGuiPlatformIO`
//! whenever it needs a native window for a floating viewport. The functions
//! registered here forward each call to the thread's
//! [`PlatformViewportContext`](dear_imgui_rs::viewport_backend::PlatformViewportContext),
//! which is where [`ViewportBridge::install`](crate::ViewportBridge::install)
//! puts the bridge.
//!
//! Each viewport finds its window through a [`PlatformHandle`] stored in
//! the viewport's `PlatformUserData`.

use dear_imgui_rs::platform_io::{PlatformIo, Viewport};
use dear_imgui_rs::sys;
use std::ffi::c_void;
use std::num::NonZeroUsize;

/// Identifier Dear ImGui assigns to a viewport
pub type ViewportId = sys::ImGuiID;

/// Opaque back-reference stored on a [`Viewport`] to find its window
///
/// Handles are allocated from a monotonically increasing counter and never
/// reused, so a stale handle can only miss, never alias another window.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PlatformHandle(NonZeroUsize);

impl PlatformHandle {
    #[inline]
    pub const fn new(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Handle stored on `viewport`, if it has a window
    #[inline]
    pub fn of(viewport: &Viewport) -> Option<Self> {
        Self::new(viewport.platform_user_data().addr())
    }

    /// Stores the handle in the viewport's platform user data and platform
    /// handle
    #[inline]
    pub fn attach(self, viewport: &mut Viewport) {
        let raw = std::ptr::without_provenance_mut::<c_void>(self.get());
        viewport.set_platform_user_data(raw);
        viewport.set_platform_handle(raw);
    }

    /// Clears what [`attach`](Self::attach) stored, returning the handle
    pub fn detach(viewport: &mut Viewport) -> Option<Self> {
        let handle = Self::of(viewport);
        viewport.set_platform_user_data(std::ptr::null_mut());
        viewport.set_platform_handle(std::ptr::null_mut());
        handle
    }
}

impl From<NonZeroUsize> for PlatformHandle {
    #[inline]
    fn from(raw: NonZeroUsize) -> Self {
        Self(raw)
    }
}

#[inline]
pub(crate) fn has_flag(viewport: &Viewport, flag: i32) -> bool {
    (viewport.flags() as i32) & flag != 0
}

/// Points Dear ImGui's platform window callbacks at the installed backend
pub fn register_callbacks(io: &mut PlatformIo) {
    // Safety: every callback tolerates null viewports, never keeps the
    // viewport pointer past the call, and the typed setters route them
    // through trampolines that abort instead of unwinding into C++.
    unsafe {
        io.set_platform_create_window(Some(callbacks::create_window));
        io.set_platform_destroy_window(Some(callbacks::destroy_window));
        io.set_platform_show_window(Some(callbacks::show_window));
        io.set_platform_set_window_pos(Some(callbacks::set_window_pos));
        io.set_platform_get_window_pos(Some(callbacks::get_window_pos));
        io.set_platform_set_window_size(Some(callbacks::set_window_size));
        io.set_platform_get_window_size(Some(callbacks::get_window_size));
        io.set_platform_set_window_focus(Some(callbacks::set_window_focus));
        io.set_platform_get_window_focus(Some(callbacks::get_window_focus));
        io.set_platform_get_window_minimized(Some(callbacks::get_window_minimized));
        io.set_platform_set_window_title(Some(callbacks::set_window_title));
    }
}

/// Removes every callback installed by [`register_callbacks`]
pub fn unregister_callbacks(io: &mut PlatformIo) {
    // Safety: clearing a callback is always sound.
    unsafe {
        io.set_platform_create_window(None);
        io.set_platform_destroy_window(None);
        io.set_platform_show_window(None);
        io.set_platform_set_window_pos(None);
        io.set_platform_get_window_pos(None);
        io.set_platform_set_window_size(None);
        io.set_platform_get_window_size(None);
        io.set_platform_set_window_focus(None);
        io.set_platform_get_window_focus(None);
        io.set_platform_get_window_minimized(None);
        io.set_platform_set_window_title(None);
    }
}

/// Whether Dear ImGui currently has a window creation callback
pub fn callbacks_registered(io: &PlatformIo) -> bool {
    // Safety: `as_raw` points at the platform IO borrowed by `io`.
    unsafe { (*io.as_raw()).Platform_CreateWindow.is_some() }
}

/// Replaces Dear ImGui's monitor list
///
/// The list is owned by Dear ImGui and freed with its allocator, so the new
/// storage comes from the same allocator.
pub(crate) fn publish_monitors(io: &mut PlatformIo, monitors: &[sys::ImGuiPlatformMonitor]) {
    // Safety: `Monitors` is only ever allocated through `igMemAlloc`, by Dear
    // ImGui itself or by this function.
    unsafe {
        let list = &mut (*io.as_raw_mut()).Monitors;
        if !list.Data.is_null() {
            sys::igMemFree(list.Data.cast());
        }
        list.Data = std::ptr::null_mut();
        list.Size = 0;
        list.Capacity = 0;

        if monitors.is_empty() {
            return;
        }
        let data = sys::igMemAlloc(std::mem::size_of_val(monitors)) as *mut sys::ImGuiPlatformMonitor;
        if data.is_null() {
            tracing::error!(target: "dear-imgui-canvas", "failed to allocate the monitor list");
            return;
        }
        std::ptr::copy_nonoverlapping(monitors.as_ptr(), data, monitors.len());
        list.Data = data;
        list.Size = monitors.len() as i32;
        list.Capacity = monitors.len() as i32;
    }
}

mod callbacks {
    use dear_imgui_rs::platform_io::Viewport;
    use dear_imgui_rs::sys;
    use dear_imgui_rs::viewport_backend::with_platform_viewport_context;
    use std::ffi::{CStr, c_char};

    #[inline]
    fn vec2([x, y]: [f32; 2]) -> sys::ImVec2 {
        sys::ImVec2 { x, y }
    }

    pub(super) unsafe extern "C" fn create_window(vp: *mut Viewport) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| backend.create_window(vp));
        }
    }

    pub(super) unsafe extern "C" fn destroy_window(vp: *mut Viewport) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| backend.destroy_window(vp));
        }
    }

    pub(super) unsafe extern "C" fn show_window(vp: *mut Viewport) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| backend.show_window(vp));
        }
    }

    pub(super) unsafe extern "C" fn set_window_pos(vp: *mut Viewport, pos: sys::ImVec2) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| backend.set_window_pos(vp, [pos.x, pos.y]));
        }
    }

    pub(super) unsafe extern "C" fn get_window_pos(vp: *mut Viewport) -> sys::ImVec2 {
        let Some(vp) = (unsafe { vp.as_mut() }) else {
            return vec2([0.0, 0.0]);
        };
        let fallback = vp.pos();
        vec2(with_platform_viewport_context(|backend| backend.get_window_pos(vp)).unwrap_or(fallback))
    }

    pub(super) unsafe extern "C" fn set_window_size(vp: *mut Viewport, size: sys::ImVec2) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| {
                backend.set_window_size(vp, [size.x, size.y])
            });
        }
    }

    pub(super) unsafe extern "C" fn get_window_size(vp: *mut Viewport) -> sys::ImVec2 {
        let Some(vp) = (unsafe { vp.as_mut() }) else {
            return vec2([0.0, 0.0]);
        };
        let fallback = vp.size();
        vec2(with_platform_viewport_context(|backend| backend.get_window_size(vp)).unwrap_or(fallback))
    }

    pub(super) unsafe extern "C" fn set_window_focus(vp: *mut Viewport) {
        if let Some(vp) = unsafe { vp.as_mut() } {
            with_platform_viewport_context(|backend| backend.set_window_focus(vp));
        }
    }

    pub(super) unsafe extern "C" fn get_window_focus(vp: *mut Viewport) -> bool {
        match unsafe { vp.as_mut() } {
            Some(vp) => with_platform_viewport_context(|backend| backend.get_window_focus(vp))
                .unwrap_or(false),
            None => false,
        }
    }

    pub(super) unsafe extern "C" fn get_window_minimized(vp: *mut Viewport) -> bool {
        match unsafe { vp.as_mut() } {
            Some(vp) => {
                with_platform_viewport_context(|backend| backend.get_window_minimized(vp))
                    .unwrap_or(false)
            }
            None => false,
        }
    }

    pub(super) unsafe extern "C" fn set_window_title(vp: *mut Viewport, title: *const c_char) {
        if title.is_null() {
            return;
        }
        let Some(vp) = (unsafe { vp.as_mut() }) else {
            return;
        };
        let title = unsafe { CStr::from_ptr(title) }.to_string_lossy();
        with_platform_viewport_context(|backend| backend.set_window_title(vp, &title));
    }
}
