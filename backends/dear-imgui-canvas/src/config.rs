//! Backend configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Attributes applied to every floating viewport window
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WindowConfig {
    /// Create windows without OS decorations; the GUI draws its own title bar
    pub borderless: bool,
    /// Only GUI-drawn pixels are visible
    pub transparent: bool,
    /// Title used until the GUI library sets one
    pub initial_title: String,
    /// Applied to the main window whenever a floating viewport is created.
    /// Floating viewports only become OS windows while this is off.
    pub embed_subwindows: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            borderless: true,
            transparent: true,
            initial_title: String::from("Dear ImGui Viewport"),
            embed_subwindows: false,
        }
    }
}

/// Configuration for [`ViewportBridge`](crate::ViewportBridge)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CanvasConfig {
    /// Advertise platform viewport support to the GUI library
    pub viewports_enabled: bool,
    pub window: WindowConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            viewports_enabled: true,
            window: WindowConfig::default(),
        }
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewports(mut self, enabled: bool) -> Self {
        self.viewports_enabled = enabled;
        self
    }

    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }
}

impl WindowConfig {
    pub fn with_borderless(mut self, borderless: bool) -> Self {
        self.borderless = borderless;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_initial_title(mut self, title: impl Into<String>) -> Self {
        self.initial_title = title.into();
        self
    }

    pub fn with_embed_subwindows(mut self, embed: bool) -> Self {
        self.embed_subwindows = embed;
        self
    }
}
