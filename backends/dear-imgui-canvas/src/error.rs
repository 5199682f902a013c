//! Error types for the canvas renderer and the viewport bridge

use crate::scene::Rid;
use dear_imgui_rs::render::SnapshotError;
use thiserror::Error;

/// Errors that can occur while rendering draw data
#[derive(Error, Debug)]
pub enum RenderError {
    /// No render target is registered for this surface
    #[error("no render target registered for surface {0:?}")]
    UnknownTarget(Rid),

    /// A render target is already registered for this surface
    #[error("render target already registered for surface {0:?}")]
    TargetAlreadyRegistered(Rid),

    /// Dear ImGui draw data could not be copied out of the context
    #[error("failed to snapshot draw data: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors that can occur when working with viewports
#[derive(Error, Debug)]
pub enum ViewportError {
    /// A platform viewport backend is already installed for this thread
    #[error("a platform viewport backend is already installed")]
    AlreadyInstalled,

    /// The host failed to create a native window or its render surface
    #[error("failed to create viewport window: {0}")]
    WindowCreation(String),

    /// The renderer rejected a viewport's render target
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for viewport operations
pub type ViewportResult<T> = Result<T, ViewportError>;
