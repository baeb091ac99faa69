//! Render options for the diagram pipeline.
//!
//! Options are plain inputs threaded through each pipeline stage; the
//! pipeline holds no hidden cross-invocation state. All types implement
//! [`serde::Deserialize`] so callers can load them from external sources.

use serde::Deserialize;

/// Caller-supplied options controlling grouping, filtering, and opacity.
///
/// # Example
///
/// ```
/// use terrane::config::RenderOptions;
///
/// let options = RenderOptions::default()
///     .with_detailed(true)
///     .with_show_unchanged(true);
/// assert!(options.detailed());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderOptions {
    /// Promote unconnected resource nodes to singleton groups.
    #[serde(default)]
    detailed: bool,

    /// Keep groups with no pending changes.
    #[serde(default)]
    show_unchanged: bool,

    /// Render every group fully opaque, disabling the unchanged-dim rule.
    #[serde(default)]
    opacity_full: bool,

    /// Categories removed from the result by exact match.
    #[serde(default)]
    deselected_categories: Vec<String>,

    /// Tag keys a group's member changes must carry to be kept. Empty keeps
    /// everything.
    #[serde(default)]
    selected_tags: Vec<String>,
}

impl RenderOptions {
    /// Sets detailed mode.
    pub fn with_detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Sets whether unchanged groups are kept.
    pub fn with_show_unchanged(mut self, show_unchanged: bool) -> Self {
        self.show_unchanged = show_unchanged;
        self
    }

    /// Sets full-opacity mode.
    pub fn with_opacity_full(mut self, opacity_full: bool) -> Self {
        self.opacity_full = opacity_full;
        self
    }

    /// Sets the de-selected categories.
    pub fn with_deselected_categories(mut self, categories: Vec<String>) -> Self {
        self.deselected_categories = categories;
        self
    }

    /// Sets the selected tag keys.
    pub fn with_selected_tags(mut self, tags: Vec<String>) -> Self {
        self.selected_tags = tags;
        self
    }

    /// Whether detailed mode is enabled.
    pub fn detailed(&self) -> bool {
        self.detailed
    }

    /// Whether unchanged groups are kept.
    pub fn show_unchanged(&self) -> bool {
        self.show_unchanged
    }

    /// Whether full-opacity mode is enabled.
    pub fn opacity_full(&self) -> bool {
        self.opacity_full
    }

    /// The de-selected categories.
    pub fn deselected_categories(&self) -> &[String] {
        &self.deselected_categories
    }

    /// The selected tag keys.
    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }
}
