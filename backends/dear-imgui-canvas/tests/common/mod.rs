//! In-memory scene and window collaborators shared by the integration tests
#![allow(dead_code)]

use dear_imgui_canvas::dear_imgui_rs::TextureId;
use dear_imgui_canvas::dear_imgui_rs::platform_io::{PlatformIo, Viewport};
use dear_imgui_canvas::dear_imgui_rs::render::{
    DrawCmdSnapshot, DrawDataSnapshot, DrawListSnapshot, DrawVert, TextureBinding,
};
use dear_imgui_canvas::dear_imgui_rs::sys;
use dear_imgui_canvas::glam::{Affine2, Vec2};
use dear_imgui_canvas::{
    Color, Rect2, Rid, SceneServer, ScreenRect, TriangleArray, ViewportError, ViewportResult,
    WindowId, WindowServer, WindowSettings,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes tests that touch Dear ImGui's process-wide callback slots
pub fn test_guard() -> MutexGuard<'static, ()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owned copy of one `canvas_item_add_triangle_array` call
#[derive(Clone, Debug, PartialEq)]
pub struct Submitted {
    pub indices: Vec<i32>,
    pub points: Vec<Vec2>,
    pub colors: Vec<Color>,
    pub uvs: Vec<Vec2>,
    pub texture: TextureBinding,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemState {
    pub parent: Option<Rid>,
    pub draw_index: Option<i32>,
    pub transform: Affine2,
    pub clip: bool,
    pub custom_rect: Option<Rect2>,
    pub triangles: Vec<Submitted>,
    pub clears: usize,
}

/// Scene server recording every call, with double-free detection
#[derive(Debug, Default)]
pub struct RecordingScene {
    next: u64,
    pub canvases: Vec<Rid>,
    pub items: HashMap<Rid, ItemState>,
    /// surface -> attached canvas
    pub attached: HashMap<Rid, Rid>,
    pub freed: Vec<Rid>,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> Rid {
        self.next += 1;
        Rid::new(self.next).unwrap()
    }

    pub fn item(&self, rid: Rid) -> &ItemState {
        self.items
            .get(&rid)
            .unwrap_or_else(|| panic!("{rid:?} is not a live canvas item"))
    }

    pub fn is_live(&self, rid: Rid) -> bool {
        self.items.contains_key(&rid) || self.canvases.contains(&rid)
    }

    /// Live items parented to `parent`, sorted by draw index
    pub fn children(&self, parent: Rid) -> Vec<Rid> {
        let mut children: Vec<(i32, Rid)> = self
            .items
            .iter()
            .filter(|(_, state)| state.parent == Some(parent))
            .map(|(rid, state)| (state.draw_index.unwrap_or(-1), *rid))
            .collect();
        children.sort();
        children.into_iter().map(|(_, rid)| rid).collect()
    }

    pub fn live_count(&self) -> usize {
        self.items.len() + self.canvases.len()
    }
}

impl SceneServer for RecordingScene {
    fn canvas_create(&mut self) -> Rid {
        let rid = self.alloc();
        self.canvases.push(rid);
        rid
    }

    fn canvas_item_create(&mut self) -> Rid {
        let rid = self.alloc();
        self.items.insert(rid, ItemState::default());
        rid
    }

    fn viewport_attach_canvas(&mut self, surface: Rid, canvas: Rid) {
        assert!(self.canvases.contains(&canvas), "attach of unknown canvas");
        self.attached.insert(surface, canvas);
    }

    fn canvas_item_set_parent(&mut self, item: Rid, parent: Rid) {
        assert!(self.is_live(parent), "parent {parent:?} is not live");
        self.items.get_mut(&item).unwrap().parent = Some(parent);
    }

    fn canvas_item_set_draw_index(&mut self, item: Rid, index: i32) {
        self.items.get_mut(&item).unwrap().draw_index = Some(index);
    }

    fn canvas_item_clear(&mut self, item: Rid) {
        let state = self.items.get_mut(&item).unwrap();
        state.triangles.clear();
        state.clears += 1;
    }

    fn canvas_item_set_transform(&mut self, item: Rid, transform: Affine2) {
        self.items.get_mut(&item).unwrap().transform = transform;
    }

    fn canvas_item_set_clip(&mut self, item: Rid, clip: bool) {
        self.items.get_mut(&item).unwrap().clip = clip;
    }

    fn canvas_item_set_custom_rect(&mut self, item: Rid, use_custom_rect: bool, rect: Rect2) {
        self.items.get_mut(&item).unwrap().custom_rect = use_custom_rect.then_some(rect);
    }

    fn canvas_item_add_triangle_array(&mut self, item: Rid, triangles: TriangleArray<'_>) {
        assert_eq!(triangles.points.len(), triangles.colors.len());
        assert_eq!(triangles.points.len(), triangles.uvs.len());
        self.items.get_mut(&item).unwrap().triangles.push(Submitted {
            indices: triangles.indices.to_vec(),
            points: triangles.points.to_vec(),
            colors: triangles.colors.to_vec(),
            uvs: triangles.uvs.to_vec(),
            texture: triangles.texture,
        });
    }

    fn free_rid(&mut self, rid: Rid) {
        assert!(!self.freed.contains(&rid), "double free of {rid:?}");
        let was_item = self.items.remove(&rid).is_some();
        let was_canvas = self
            .canvases
            .iter()
            .position(|c| *c == rid)
            .map(|i| self.canvases.remove(i))
            .is_some();
        assert!(was_item || was_canvas, "free of unknown {rid:?}");
        self.freed.push(rid);
    }
}

/// Host input event used by the fake window server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Key(char),
    MouseMoved(i32, i32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FakeWindow {
    pub settings: WindowSettings,
    pub position: [i32; 2],
    pub size: [i32; 2],
    pub visible: bool,
    pub focused: bool,
    pub minimized: bool,
    pub title: String,
    pub surface: Option<Rid>,
    pub embed_subwindows: Option<bool>,
    pub queued_free: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FakeScreen {
    pub position: [i32; 2],
    pub size: [i32; 2],
    pub scale: f32,
    pub usable: ScreenRect,
}

impl FakeScreen {
    pub fn new(position: [i32; 2], size: [i32; 2], scale: f32, task_bar: i32) -> Self {
        Self {
            position,
            size,
            scale,
            usable: ScreenRect {
                position,
                size: [size[0], size[1] - task_bar],
            },
        }
    }
}

/// Window server keeping every window in memory
#[derive(Debug)]
pub struct FakeWindowServer {
    main: WindowId,
    next_window: u64,
    next_surface: u64,
    pub windows: BTreeMap<WindowId, FakeWindow>,
    pub transparent_windows: Vec<WindowId>,
    pub screens: Vec<FakeScreen>,
    pub fail_create: bool,
    pub fail_embed: bool,
}

pub const MAIN_WINDOW: WindowId = WindowId(1);

// Surface ids live far from the ids handed out by `RecordingScene`.
const FIRST_SURFACE: u64 = 1_000_000;

impl FakeWindowServer {
    pub fn new() -> Self {
        let mut windows = BTreeMap::new();
        windows.insert(
            MAIN_WINDOW,
            FakeWindow {
                settings: WindowSettings {
                    title: "Main".to_string(),
                    position: [0, 0],
                    size: [1280, 720],
                    borderless: false,
                    transparent: false,
                    always_on_top: false,
                    visible: true,
                },
                position: [0, 0],
                size: [1280, 720],
                visible: true,
                focused: true,
                minimized: false,
                title: "Main".to_string(),
                surface: None,
                embed_subwindows: None,
                queued_free: 0,
            },
        );
        Self {
            main: MAIN_WINDOW,
            next_window: MAIN_WINDOW.0,
            next_surface: FIRST_SURFACE,
            windows,
            transparent_windows: Vec::new(),
            screens: vec![FakeScreen::new([0, 0], [1920, 1080], 1.0, 40)],
            fail_create: false,
            fail_embed: false,
        }
    }

    pub fn with_screens(mut self, screens: Vec<FakeScreen>) -> Self {
        self.screens = screens;
        self
    }

    pub fn window(&self, id: WindowId) -> &FakeWindow {
        &self.windows[&id]
    }

    pub fn window_mut(&mut self, id: WindowId) -> &mut FakeWindow {
        self.windows.get_mut(&id).unwrap()
    }

    /// Windows created through `create_window`, oldest first
    pub fn created(&self) -> Vec<WindowId> {
        self.windows.keys().copied().filter(|id| *id != self.main).collect()
    }

    fn window_for(&mut self, id: WindowId) -> &mut FakeWindow {
        let window = self
            .windows
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown window {id:?}"));
        assert_eq!(window.queued_free, 0, "{id:?} used after queue_free");
        window
    }
}

impl Default for FakeWindowServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowServer for FakeWindowServer {
    type InputEvent = Input;

    fn main_window(&self) -> WindowId {
        self.main
    }

    fn create_window(&mut self, settings: &WindowSettings) -> ViewportResult<WindowId> {
        if self.fail_create {
            return Err(ViewportError::WindowCreation("display server refused".into()));
        }
        self.next_window += 1;
        let id = WindowId(self.next_window);
        self.windows.insert(
            id,
            FakeWindow {
                settings: settings.clone(),
                position: settings.position,
                size: settings.size,
                visible: settings.visible,
                focused: false,
                minimized: false,
                title: settings.title.clone(),
                surface: None,
                embed_subwindows: None,
                queued_free: 0,
            },
        );
        Ok(id)
    }

    fn embed_surface(&mut self, window: WindowId) -> ViewportResult<Rid> {
        if self.fail_embed {
            return Err(ViewportError::WindowCreation("no surface".into()));
        }
        self.next_surface += 1;
        let surface = Rid::new(self.next_surface).unwrap();
        self.window_for(window).surface = Some(surface);
        Ok(surface)
    }

    fn set_transparent_background(&mut self, window: WindowId, transparent: bool) {
        self.window_for(window);
        if transparent {
            self.transparent_windows.push(window);
        } else {
            self.transparent_windows.retain(|w| *w != window);
        }
    }

    fn set_embed_subwindows(&mut self, window: WindowId, embed: bool) {
        self.window_for(window).embed_subwindows = Some(embed);
    }

    fn queue_free(&mut self, window: WindowId) {
        self.windows
            .get_mut(&window)
            .unwrap_or_else(|| panic!("unknown window {window:?}"))
            .queued_free += 1;
    }

    fn show(&mut self, window: WindowId) {
        self.window_for(window).visible = true;
    }

    fn set_position(&mut self, window: WindowId, position: [i32; 2]) {
        self.window_for(window).position = position;
    }

    fn position(&self, window: WindowId) -> [i32; 2] {
        self.windows[&window].position
    }

    fn set_size(&mut self, window: WindowId, size: [i32; 2]) {
        self.window_for(window).size = size;
    }

    fn size(&self, window: WindowId) -> [i32; 2] {
        self.windows[&window].size
    }

    fn grab_focus(&mut self, window: WindowId) {
        for w in self.windows.values_mut() {
            w.focused = false;
        }
        self.window_for(window).focused = true;
    }

    fn has_focus(&self, window: WindowId) -> bool {
        self.windows[&window].focused
    }

    fn is_minimized(&self, window: WindowId) -> bool {
        self.windows[&window].minimized
    }

    fn set_title(&mut self, window: WindowId, title: &str) {
        self.window_for(window).title = title.to_string();
    }

    fn screen_count(&self) -> usize {
        self.screens.len()
    }

    fn screen_position(&self, screen: usize) -> [i32; 2] {
        self.screens[screen].position
    }

    fn screen_size(&self, screen: usize) -> [i32; 2] {
        self.screens[screen].size
    }

    fn screen_scale(&self, screen: usize) -> f32 {
        self.screens[screen].scale
    }

    fn screen_usable_rect(&self, screen: usize) -> ScreenRect {
        self.screens[screen].usable
    }
}

pub fn surface(id: u64) -> Rid {
    Rid::new(FIRST_SURFACE / 2 + id).unwrap()
}

pub fn vert(x: f32, y: f32, col: u32) -> DrawVert {
    DrawVert {
        pos: [x, y],
        uv: [x / 100.0, y / 100.0],
        col,
    }
}

pub fn cmd(count: usize, idx_offset: usize, vtx_offset: usize) -> DrawCmdSnapshot {
    DrawCmdSnapshot::Elements {
        count,
        clip_rect: [0.0, 0.0, 100.0, 100.0],
        texture: TextureBinding::Legacy(TextureId::new(1)),
        vtx_offset,
        idx_offset,
    }
}

/// A white quad as two triangles, drawn by a single command
pub fn quad_list() -> DrawListSnapshot {
    DrawListSnapshot {
        vtx: vec![
            vert(0.0, 0.0, 0xFFFF_FFFF),
            vert(10.0, 0.0, 0xFFFF_FFFF),
            vert(10.0, 10.0, 0xFFFF_FFFF),
            vert(0.0, 10.0, 0xFFFF_FFFF),
        ],
        idx: vec![0, 1, 2, 0, 2, 3],
        commands: vec![cmd(6, 0, 0)],
    }
}

/// The quad list with one command per entry of `counts`, each drawing from index 0
pub fn list_with_commands(counts: &[usize]) -> DrawListSnapshot {
    DrawListSnapshot {
        commands: counts.iter().map(|&n| cmd(n, 0, 0)).collect(),
        ..quad_list()
    }
}

pub fn draw_data(draw_lists: Vec<DrawListSnapshot>) -> DrawDataSnapshot {
    DrawDataSnapshot {
        display_pos: [0.0, 0.0],
        display_size: [1280.0, 720.0],
        framebuffer_scale: [1.0, 1.0],
        draw_lists,
    }
}

/// Platform IO living outside any Dear ImGui context
///
/// Holds a main viewport plus any floating viewports added by the test, laid
/// out the way Dear ImGui lays out `ImGuiPlatformIO::Viewports`.
pub struct FakePlatformIo {
    raw: Box<sys::ImGuiPlatformIO>,
    viewports: Vec<Box<Viewport>>,
    pointers: Vec<*mut sys::ImGuiViewport>,
    next_id: sys::ImGuiID,
}

impl FakePlatformIo {
    pub fn new() -> Self {
        // Safety: the platform IO is plain C data; all-zero is its empty state.
        let raw = Box::new(unsafe { std::mem::zeroed::<sys::ImGuiPlatformIO>() });
        let mut io = Self {
            raw,
            viewports: Vec::new(),
            pointers: Vec::new(),
            next_id: 0x100,
        };
        let mut main = Box::new(Viewport::dummy());
        main.set_size([1280.0, 720.0]);
        io.viewports.push(main);
        io
    }

    /// Adds a floating viewport and returns its index
    pub fn add_floating(&mut self, pos: [f32; 2], size: [f32; 2], flags: i32) -> usize {
        let mut viewport = Box::new(Viewport::dummy());
        // Safety: the viewport is exclusively owned here.
        unsafe { (*viewport.as_raw_mut()).ID = self.next_id };
        self.next_id += 1;
        viewport.set_pos(pos);
        viewport.set_size(size);
        viewport.set_flags((flags | sys::ImGuiViewportFlags_IsPlatformWindow as i32) as _);
        self.viewports.push(viewport);
        self.viewports.len() - 1
    }

    pub fn viewport(&self, index: usize) -> &Viewport {
        &self.viewports[index]
    }

    pub fn viewport_mut(&mut self, index: usize) -> &mut Viewport {
        &mut self.viewports[index]
    }

    pub fn main(&mut self) -> &mut Viewport {
        self.viewport_mut(0)
    }

    /// The platform IO, listing every viewport
    pub fn io(&mut self) -> &mut PlatformIo {
        self.pointers = self
            .viewports
            .iter_mut()
            .map(|vp| vp.as_raw_mut())
            .collect();
        let raw = &mut *self.raw;
        raw.Viewports.Data = self.pointers.as_mut_ptr();
        raw.Viewports.Size = self.pointers.len() as i32;
        raw.Viewports.Capacity = self.pointers.len() as i32;
        // Safety: `raw` and every listed viewport are owned by `self` and
        // outlive the returned borrow.
        unsafe { PlatformIo::from_raw_mut(raw) }
    }

    /// Monitors as published to Dear ImGui
    pub fn monitors(&mut self) -> Vec<sys::ImGuiPlatformMonitor> {
        self.io().monitors().as_slice().to_vec()
    }
}

impl Default for FakePlatformIo {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FakePlatformIo {
    fn drop(&mut self) {
        let raw = &mut *self.raw;
        raw.Viewports.Data = std::ptr::null_mut();
        raw.Viewports.Size = 0;
        raw.Viewports.Capacity = 0;
        if !raw.Monitors.Data.is_null() {
            // Safety: the monitor list is only allocated through `igMemAlloc`.
            unsafe { sys::igMemFree(raw.Monitors.Data.cast()) };
            raw.Monitors.Data = std::ptr::null_mut();
        }
    }
}
