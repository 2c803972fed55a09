//! The rendering-surface contract shared by all backends.
//!
//! A surface is one isolated browsing context: checks never share one. Every
//! check constructs its own surface, navigates, waits for a readiness signal,
//! optionally mutates interaction state (viewport, hover, key press), then
//! extracts facts and discards the surface.

use crate::dom::DomSnapshot;
use crate::layout::Rect;
use crate::render::Screenshot;
use crate::{Result, Viewport};

/// Readiness signal to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The document has been fetched and parsed
    DomContentLoaded,
    /// The document plus its subresources (stylesheets) have settled
    NetworkIdle,
}

/// What a screenshot covers
#[derive(Debug, Clone)]
pub enum ScreenshotTarget {
    /// The full page at the current viewport width
    Page,
    /// The first element matching the selector, cropped to its border box
    Element(String),
}

/// Horizontal document metrics, the overflow facts checks compare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_width: u32,
    pub client_width: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    /// True when the document overflows its viewport horizontally
    pub fn has_horizontal_overflow(&self) -> bool {
        self.scroll_width > self.client_width
    }
}

/// Core trait for rendering-surface backends
pub trait Surface {
    /// Navigate to a URL and block until the readiness signal is reached
    fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<()>;

    /// Reconfigure the rendering surface dimensions. Facts extracted
    /// afterwards reflect the new viewport.
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// The currently configured viewport
    fn viewport(&self) -> Viewport;

    /// Snapshot the rendered document's element tree
    fn dom(&self) -> Result<DomSnapshot>;

    /// Read a computed style property from the first element matching the
    /// selector. Returns `None` when no element matches or the property has
    /// no resolved value.
    fn computed_style(&self, selector: &str, property: &str) -> Result<Option<String>>;

    /// Read a computed style property from the element at the given snapshot
    /// index (matching `DomSnapshot` element order).
    fn computed_style_of(&self, element: usize, property: &str) -> Result<Option<String>>;

    /// Border-box bounding rectangle of the first element matching the
    /// selector, or `None` when nothing matches.
    fn bounding_box(&self, selector: &str) -> Result<Option<Rect>>;

    /// Document-level scroll and client dimensions
    fn scroll_metrics(&self) -> Result<ScrollMetrics>;

    /// Simulate hovering the first element matching the selector
    fn hover(&mut self, selector: &str) -> Result<()>;

    /// Clear any simulated hover state
    fn clear_hover(&mut self) -> Result<()>;

    /// Simulate a key press (e.g. "Tab") on the page
    fn press_key(&mut self, key: &str) -> Result<()>;

    /// Capture a screenshot with animations disabled
    fn screenshot(&self, target: &ScreenshotTarget) -> Result<Screenshot>;

    /// Probe a URL and return its HTTP status, when the backend supports
    /// out-of-band requests. Backends without a client return `Ok(None)`.
    fn probe(&self, url: &str) -> Result<Option<u16>> {
        let _ = url;
        Ok(None)
    }

    /// Close the surface and release its resources
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_strict() {
        let m = ScrollMetrics {
            scroll_width: 375,
            client_width: 375,
            scroll_height: 900,
            client_height: 667,
        };
        assert!(!m.has_horizontal_overflow());
        let wide = ScrollMetrics { scroll_width: 376, ..m };
        assert!(wide.has_horizontal_overflow());
    }
}
