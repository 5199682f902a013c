//! Retained scene-graph contract
//!
//! The renderer never draws anything itself. It creates, parents, orders and
//! fills canvas items through a [`SceneServer`] supplied by the host engine.

use dear_imgui_rs::render::TextureBinding;
use glam::{Affine2, Vec2};
use std::num::NonZeroU64;

/// Opaque identifier of a host scene resource (canvas, canvas item, surface)
///
/// Ids are never reused by the host after [`SceneServer::free_rid`] without
/// being handed out again by a create call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Rid(NonZeroU64);

impl Rid {
    /// Wraps a raw host id. Returns `None` for the null id.
    #[inline]
    pub const fn new(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw host id
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Normalized RGBA color as the scene expects it
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Unpacks Dear ImGui's `0xAABBGGRR` vertex color
    ///
    /// The lowest byte is red, so the channel order is reversed relative to
    /// reading the value as `0xRRGGBBAA`.
    #[inline]
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: f32::from(a) / 255.0,
        }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Axis-aligned rectangle in position/size form
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect2 {
    pub position: Vec2,
    pub size: Vec2,
}

impl Rect2 {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Converts a `(x1, y1, x2, y2)` clip rectangle
    #[inline]
    pub fn from_min_max(rect: [f32; 4]) -> Self {
        Self::new(rect[0], rect[1], rect[2] - rect[0], rect[3] - rect[1])
    }
}

/// One indexed triangle list submitted to a canvas item
///
/// `points`, `colors` and `uvs` are parallel. No custom normals, bones,
/// weights or explicit z-index are ever set.
#[derive(Copy, Clone, Debug)]
pub struct TriangleArray<'a> {
    pub indices: &'a [i32],
    pub points: &'a [Vec2],
    pub colors: &'a [Color],
    pub uvs: &'a [Vec2],
    /// Texture as bound by the draw command; the host resolves both user
    /// textures and textures managed by Dear ImGui
    pub texture: TextureBinding,
}

/// Scene operations the renderer needs from the host engine
pub trait SceneServer {
    /// Creates a canvas that can be attached to a render surface.
    fn canvas_create(&mut self) -> Rid;

    /// Creates an empty canvas item.
    fn canvas_item_create(&mut self) -> Rid;

    /// Makes `canvas` draw into the host render surface `surface`.
    fn viewport_attach_canvas(&mut self, surface: Rid, canvas: Rid);

    /// Parents `item` to a canvas or another canvas item.
    fn canvas_item_set_parent(&mut self, item: Rid, parent: Rid);

    /// Sets the position of `item` in its parent's draw order.
    fn canvas_item_set_draw_index(&mut self, item: Rid, index: i32);

    /// Removes every primitive previously submitted to `item`.
    fn canvas_item_clear(&mut self, item: Rid);

    fn canvas_item_set_transform(&mut self, item: Rid, transform: Affine2);

    /// Enables or disables clipping of `item` to its custom rectangle.
    fn canvas_item_set_clip(&mut self, item: Rid, clip: bool);

    fn canvas_item_set_custom_rect(&mut self, item: Rid, use_custom_rect: bool, rect: Rect2);

    fn canvas_item_add_triangle_array(&mut self, item: Rid, triangles: TriangleArray<'_>);

    /// Releases a canvas or canvas item.
    fn free_rid(&mut self, rid: Rid);
}

impl<S: SceneServer + ?Sized> SceneServer for &mut S {
    fn canvas_create(&mut self) -> Rid {
        (**self).canvas_create()
    }

    fn canvas_item_create(&mut self) -> Rid {
        (**self).canvas_item_create()
    }

    fn viewport_attach_canvas(&mut self, surface: Rid, canvas: Rid) {
        (**self).viewport_attach_canvas(surface, canvas)
    }

    fn canvas_item_set_parent(&mut self, item: Rid, parent: Rid) {
        (**self).canvas_item_set_parent(item, parent)
    }

    fn canvas_item_set_draw_index(&mut self, item: Rid, index: i32) {
        (**self).canvas_item_set_draw_index(item, index)
    }

    fn canvas_item_clear(&mut self, item: Rid) {
        (**self).canvas_item_clear(item)
    }

    fn canvas_item_set_transform(&mut self, item: Rid, transform: Affine2) {
        (**self).canvas_item_set_transform(item, transform)
    }

    fn canvas_item_set_clip(&mut self, item: Rid, clip: bool) {
        (**self).canvas_item_set_clip(item, clip)
    }

    fn canvas_item_set_custom_rect(&mut self, item: Rid, use_custom_rect: bool, rect: Rect2) {
        (**self).canvas_item_set_custom_rect(item, use_custom_rect, rect)
    }

    fn canvas_item_add_triangle_array(&mut self, item: Rid, triangles: TriangleArray<'_>) {
        (**self).canvas_item_add_triangle_array(item, triangles)
    }

    fn free_rid(&mut self, rid: Rid) {
        (**self).free_rid(rid)
    }
}
