//! Retained canvas renderer and multi-viewport bridge for Dear ImGui
//!
//! This crate turns Dear ImGui draw data into retained canvas items on a host
//! engine's scene graph, and implements the platform-window callbacks that let
//! Dear ImGui float viewports into their own native windows.
//!
//! The host engine supplies two collaborators:
//!
//! - a [`SceneServer`] that creates, orders and fills canvas items, and
//! - a [`WindowServer`] that creates native windows with embedded render
//!   surfaces and reports the display topology.
//!
//! # Features
//!
//! - **Primitive pooling**: one canvas item per non-empty draw command, reused
//!   frame over frame ([`PrimitivePool`])
//! - **Vertex offsets**: large meshes split with a command's `vtx_offset` render
//!   correctly
//! - **Multi-viewport**: floating viewports get a borderless, transparent
//!   native window each ([`ViewportBridge`])
//!
//! # Example
//!
//! ```rust,ignore
//! use dear_imgui_canvas::{CanvasConfig, CanvasRenderer, Renderer, ViewportBridge};
//!
//! let mut ctx = dear_imgui_rs::Context::create()?;
//! ctx.enable_multi_viewport();
//!
//! let mut bridge = ViewportBridge::new(
//!     CanvasRenderer::new(scene),
//!     windows,
//!     CanvasConfig::default(),
//! );
//! bridge.init(&mut ctx);
//! bridge.renderer_mut().init_viewport(main_surface)?;
//! let bridge = bridge.install(ctx.platform_io_mut())?;
//!
//! // Every frame, after the GUI layout pass:
//! let draw_data = ctx.render();
//! bridge.borrow_mut().renderer_mut().render(main_surface, draw_data)?;
//! ctx.update_platform_windows();
//! bridge.borrow_mut().render_viewports(ctx.platform_io_mut())?;
//!
//! // On exit:
//! bridge.borrow_mut().shutdown(ctx.platform_io_mut());
//! ```

pub mod config;
mod error;
#[cfg(feature = "tracing-subscriber")]
pub mod logging;
pub mod platform;
mod pool;
pub mod renderer;
pub mod scene;
pub mod viewports;
pub mod window;

pub use config::{CanvasConfig, WindowConfig};
pub use error::*;
pub use platform::{
    PlatformHandle, ViewportId, callbacks_registered, register_callbacks, unregister_callbacks,
};
pub use pool::PrimitivePool;
pub use renderer::{CanvasRenderer, RenderTarget, Renderer};
pub use scene::{Color, Rect2, Rid, SceneServer, TriangleArray};
pub use viewports::ViewportBridge;
pub use window::{ScreenRect, ViewportWindow, WindowEvent, WindowId, WindowServer, WindowSettings};

// Re-export the GUI crate and glam so hosts use the matching versions.
pub use dear_imgui_rs;
pub use glam;
