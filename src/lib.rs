//! PageCheck Verification Harness
//!
//! A browser-driven test harness for a single static landing page. It loads
//! the page on a controllable rendering surface, waits for a readiness
//! condition, and asserts facts about the render: HTML structure, WCAG 2.1
//! A/AA accessibility, link integrity, responsive layout across a fixed
//! viewport table, and visual appearance against stored baseline images.
//!
//! # Backends
//!
//! - **Static backend** (default): fetches the page and its stylesheets over
//!   HTTP, resolves computed styles with an in-crate cascade, and rasterizes
//!   deterministic screenshots. No browser required.
//! - **CDP backend** (feature `cdp`): drives headless Chrome for the same
//!   fact extraction against a real render.
//!
//! # Example
//!
//! ```no_run
//! use pagecheck::runner::{run_checks, RunConfig};
//! use pagecheck::static_backend::StaticSurface;
//! use pagecheck::HarnessConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = RunConfig {
//!     base_url: "http://127.0.0.1:8080".to_string(),
//!     ..Default::default()
//! };
//! let harness = HarnessConfig::default();
//! let report = run_checks(move || StaticSurface::new(harness.clone()), &cfg);
//! println!("{} passed, {} failed", report.passed, report.failed);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

pub mod error;
pub use error::{Error, Result};

pub mod baseline;
pub mod checks;
pub mod css;
pub mod dom;
pub mod layout;
pub mod render;
pub mod runner;
pub mod surface;

// Static HTTP-based backend (default)
pub mod static_backend;

// CDP backend (feature-gated)
#[cfg(feature = "cdp")]
pub mod cdp;

pub use surface::{ScreenshotTarget, ScrollMetrics, Surface, WaitUntil};

/// Configuration for a rendering surface
///
/// The defaults are conservative: a desktop viewport, a 30 second navigation
/// timeout, and animations disabled so screenshots are stable.
///
/// # Examples
///
/// ```
/// let cfg = pagecheck::HarnessConfig::default();
/// assert!(cfg.user_agent.contains("PageCheck"));
/// assert!(cfg.disable_animations);
/// ```
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Initial viewport dimensions
    pub viewport: Viewport,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Whether to suppress CSS animations and transitions before capture
    pub disable_animations: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 PageCheck/0.1".to_string(),
            viewport: Viewport::default(),
            timeout_ms: 30000,
            headers: HashMap::new(),
            disable_animations: true,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A named entry in the fixed viewport table used by responsive and visual
/// checks. The label keys baseline images and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ViewportProfile {
    pub label: &'static str,
    pub viewport: Viewport,
}

impl ViewportProfile {
    pub const fn new(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            viewport: Viewport { width, height },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert!(config.disable_animations);
    }

    #[test]
    fn test_viewport_profile() {
        let p = ViewportProfile::new("desktop-wide", 1920, 1080);
        assert_eq!(p.viewport.width, 1920);
        assert_eq!(p.label, "desktop-wide");
    }
}
