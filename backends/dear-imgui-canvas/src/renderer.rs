//! Draw data to retained canvas items
//!
//! [`CanvasRenderer`] keeps one [`PrimitivePool`] per render surface and
//! rewrites every pooled item each frame from that surface's draw data.
//!
//! Frames are consumed as [`DrawDataSnapshot`]s, the owned copy of
//! Dear ImGui's `ImDrawData`; [`Renderer::render`] takes the live
//! [`DrawData`] returned by `Context::render` and snapshots it first.

use crate::error::{RenderError, RenderResult};
use crate::pool::PrimitivePool;
use crate::scene::{Color, Rect2, Rid, SceneServer, TriangleArray};
use dear_imgui_rs::render::{
    DrawCmdSnapshot, DrawData, DrawDataSnapshot, DrawListSnapshot, DrawVert, FrameSnapshot,
    SnapshotOptions, TextureBinding, UserCallbackPolicy,
};
use dear_imgui_rs::{BackendFlags, Io};
use glam::{Affine2, Vec2};
use std::collections::HashMap;

/// A renderer backend for Dear ImGui draw data
///
/// [`CanvasRenderer`] is the retained scene-graph implementation; a direct
/// GPU renderer would implement the same trait.
pub trait Renderer {
    /// Backend name reported to the GUI library
    fn name(&self) -> &'static str;

    /// Advertises renderer capabilities to the GUI library.
    fn init(&mut self, io: &mut Io);

    /// Registers a host render surface as a render target.
    fn init_viewport(&mut self, surface: Rid) -> RenderResult<()>;

    /// Converts one frame of draw data into the target's primitives.
    fn render_draw_data(&mut self, surface: Rid, draw_data: &DrawDataSnapshot)
    -> RenderResult<()>;

    /// Snapshots a live frame and renders it into `surface`.
    fn render(&mut self, surface: Rid, draw_data: &DrawData) -> RenderResult<()> {
        let snapshot = snapshot(draw_data)?;
        self.render_draw_data(surface, &snapshot)
    }

    /// Releases every resource of a render target and forgets it.
    fn close_viewport(&mut self, surface: Rid) -> RenderResult<()>;

    /// Drops pooled primitives of every target while the GUI is hidden.
    fn on_hide(&mut self);

    /// Releases every resource of every target.
    fn shutdown(&mut self);
}

/// Copies a live frame out of the Dear ImGui context
///
/// User callback commands have no canvas equivalent and are dropped. Texture
/// uploads are the host's business, so no texture requests are captured.
pub fn snapshot(draw_data: &DrawData) -> RenderResult<DrawDataSnapshot> {
    let options = SnapshotOptions {
        user_callback_policy: UserCallbackPolicy::Drop,
        capture_texture_requests: false,
    };
    Ok(FrameSnapshot::from_draw_data(draw_data, options)?.draw)
}

/// Scene resources of one render target
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RenderTarget {
    /// Canvas attached to the host surface
    pub canvas: Rid,
    /// Canvas item every primitive of this target is parented to
    pub root: Rid,
}

#[derive(Debug)]
struct ViewportData {
    target: RenderTarget,
    pool: PrimitivePool,
}

/// Retained renderer writing Dear ImGui draw data into canvas items
pub struct CanvasRenderer<S: SceneServer> {
    scene: S,
    targets: HashMap<Rid, ViewportData>,
}

impl<S: SceneServer> CanvasRenderer<S> {
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            targets: HashMap::new(),
        }
    }

    #[inline]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Scene resources registered for `surface`
    pub fn target(&self, surface: Rid) -> Option<RenderTarget> {
        self.targets.get(&surface).map(|data| data.target)
    }

    /// Number of pooled primitives currently backing `surface`
    pub fn pool_len(&self, surface: Rid) -> Option<usize> {
        self.targets.get(&surface).map(|data| data.pool.len())
    }

    /// Pooled primitives backing `surface`, in draw order
    pub fn primitives(&self, surface: Rid) -> Option<Vec<Rid>> {
        self.targets
            .get(&surface)
            .map(|data| data.pool.iter().collect())
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn free_target(scene: &mut S, mut data: ViewportData) {
        data.pool.clear(scene);
        scene.free_rid(data.target.root);
        scene.free_rid(data.target.canvas);
    }
}

impl<S: SceneServer> Renderer for CanvasRenderer<S> {
    fn name(&self) -> &'static str {
        "dear_imgui_canvas"
    }

    fn init(&mut self, io: &mut Io) {
        let flags = io.backend_flags()
            | BackendFlags::RENDERER_HAS_VTX_OFFSET
            | BackendFlags::RENDERER_HAS_VIEWPORTS;
        io.set_backend_flags(flags);
    }

    fn init_viewport(&mut self, surface: Rid) -> RenderResult<()> {
        if self.targets.contains_key(&surface) {
            return Err(RenderError::TargetAlreadyRegistered(surface));
        }

        let canvas = self.scene.canvas_create();
        let root = self.scene.canvas_item_create();
        self.scene.viewport_attach_canvas(surface, canvas);
        self.scene.canvas_item_set_parent(root, canvas);

        self.targets.insert(
            surface,
            ViewportData {
                target: RenderTarget { canvas, root },
                pool: PrimitivePool::new(root),
            },
        );
        Ok(())
    }

    fn render_draw_data(
        &mut self,
        surface: Rid,
        draw_data: &DrawDataSnapshot,
    ) -> RenderResult<()> {
        let scene = &mut self.scene;
        let data = self
            .targets
            .get_mut(&surface)
            .ok_or(RenderError::UnknownTarget(surface))?;

        data.pool.resize(scene, active_command_count(draw_data));

        let transform = display_transform(draw_data.display_pos);
        let mut items = data.pool.iter();

        for draw_list in &draw_data.draw_lists {
            let vertices = DecodedVertices::decode(&draw_list.vtx);

            for cmd in active_commands(draw_list) {
                let Some(item) = items.next() else {
                    return Ok(());
                };

                let indices = command_indices(draw_list, &cmd);
                let window = vertices.tail(cmd.vtx_offset);
                let clip = Rect2::from_min_max(scale_clip_rect(
                    cmd.clip_rect,
                    draw_data.framebuffer_scale,
                ));

                scene.canvas_item_clear(item);
                scene.canvas_item_set_transform(item, transform);
                scene.canvas_item_set_clip(item, true);
                scene.canvas_item_set_custom_rect(item, true, clip);
                scene.canvas_item_add_triangle_array(
                    item,
                    TriangleArray {
                        indices: &indices,
                        points: window.points,
                        colors: window.colors,
                        uvs: window.uvs,
                        texture: cmd.texture,
                    },
                );
            }
        }

        Ok(())
    }

    fn close_viewport(&mut self, surface: Rid) -> RenderResult<()> {
        let data = self
            .targets
            .remove(&surface)
            .ok_or(RenderError::UnknownTarget(surface))?;
        Self::free_target(&mut self.scene, data);
        Ok(())
    }

    fn on_hide(&mut self) {
        for data in self.targets.values_mut() {
            data.pool.clear(&mut self.scene);
        }
    }

    fn shutdown(&mut self) {
        for (_, data) in self.targets.drain() {
            Self::free_target(&mut self.scene, data);
        }
    }
}

/// Element command with a non-zero element count
#[derive(Copy, Clone, Debug)]
struct ActiveCommand {
    count: usize,
    clip_rect: [f32; 4],
    texture: TextureBinding,
    vtx_offset: usize,
    idx_offset: usize,
}

fn active_commands(draw_list: &DrawListSnapshot) -> impl Iterator<Item = ActiveCommand> + '_ {
    draw_list.commands.iter().filter_map(|cmd| match *cmd {
        DrawCmdSnapshot::Elements {
            count,
            clip_rect,
            texture,
            vtx_offset,
            idx_offset,
        } if count > 0 => Some(ActiveCommand {
            count,
            clip_rect,
            texture,
            vtx_offset,
            idx_offset,
        }),
        _ => None,
    })
}

/// Number of commands in the frame that produce a primitive
///
/// Zero-count commands and render-state resets draw nothing.
pub fn active_command_count(draw_data: &DrawDataSnapshot) -> usize {
    draw_data
        .draw_lists
        .iter()
        .map(|list| active_commands(list).count())
        .sum()
}

/// Clip rectangle in framebuffer pixels
#[inline]
pub fn scale_clip_rect(rect: [f32; 4], scale: [f32; 2]) -> [f32; 4] {
    [
        rect[0] * scale[0],
        rect[1] * scale[1],
        rect[2] * scale[0],
        rect[3] * scale[1],
    ]
}

/// Canvas-item transform for a frame drawn at `display_pos`
///
/// Floating viewports report positions in desktop space while their surface is
/// window-relative, so the whole-pixel display origin is translated away.
pub fn display_transform(display_pos: [f32; 2]) -> Affine2 {
    if display_pos == [0.0, 0.0] {
        return Affine2::IDENTITY;
    }
    let origin = Vec2::new(display_pos[0].trunc(), display_pos[1].trunc());
    Affine2::from_translation(origin).inverse()
}

/// Indices of `cmd`, relative to its vertex offset
fn command_indices(draw_list: &DrawListSnapshot, cmd: &ActiveCommand) -> Vec<i32> {
    let start = cmd.idx_offset;
    let end = start.saturating_add(cmd.count);
    match draw_list.idx.get(start..end) {
        Some(range) => range.iter().map(|&idx| i32::from(idx)).collect(),
        None => {
            tracing::warn!(
                target: "dear-imgui-canvas",
                start,
                end,
                len = draw_list.idx.len(),
                "draw command index range outside index buffer"
            );
            Vec::new()
        }
    }
}

/// A draw list's vertex buffer split into the parallel arrays the scene takes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedVertices {
    pub points: Vec<Vec2>,
    pub colors: Vec<Color>,
    pub uvs: Vec<Vec2>,
}

/// Borrowed window into [`DecodedVertices`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexWindow<'a> {
    pub points: &'a [Vec2],
    pub colors: &'a [Color],
    pub uvs: &'a [Vec2],
}

impl VertexWindow<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl DecodedVertices {
    pub fn decode(vtx_buffer: &[DrawVert]) -> Self {
        let mut decoded = Self {
            points: Vec::with_capacity(vtx_buffer.len()),
            colors: Vec::with_capacity(vtx_buffer.len()),
            uvs: Vec::with_capacity(vtx_buffer.len()),
        };
        for vtx in vtx_buffer {
            decoded.points.push(Vec2::from(vtx.pos));
            decoded.colors.push(Color::from_packed(vtx.col));
            decoded.uvs.push(Vec2::from(vtx.uv));
        }
        decoded
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertices from `offset` to the end of the buffer
    ///
    /// Indices of a command with a vertex offset are relative to that offset,
    /// so handing the scene the tail of the buffer keeps them valid without
    /// rewriting each index.
    pub fn tail(&self, offset: usize) -> VertexWindow<'_> {
        let offset = offset.min(self.len());
        VertexWindow {
            points: &self.points[offset..],
            colors: &self.colors[offset..],
            uvs: &self.uvs[offset..],
        }
    }
}
