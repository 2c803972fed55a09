//! Layout facts across the fixed viewport table.

use crate::checks::{CheckContext, Mismatch, Outcome};
use crate::error::Result;
use crate::surface::{Surface, WaitUntil};
use crate::ViewportProfile;

/// The six device profiles every responsive fact is measured at.
pub const VIEWPORTS: [ViewportProfile; 6] = [
    ViewportProfile::new("mobile", 375, 667),
    ViewportProfile::new("mobile-large", 414, 896),
    ViewportProfile::new("tablet-portrait", 768, 1024),
    ViewportProfile::new("tablet-landscape", 1024, 768),
    ViewportProfile::new("desktop", 1280, 720),
    ViewportProfile::new("desktop-wide", 1920, 1080),
];

/// Expected layout literals for the page under test.
///
/// These mirror the stylesheet's own constants; a drift on either side is a
/// regression worth hearing about.
mod expected {
    /// Widths below this get the narrow layout (`max-width: 767px` media query).
    pub const BREAKPOINT_PX: u32 = 768;
    pub const CONTAINER_MAX_WIDTH_PX: u32 = 640;
    pub const H1_FONT_SIZE_WIDE: &str = "42px";
    pub const H1_FONT_SIZE_NARROW: &str = "32px";
    pub const PADDING_WIDE: &str = "48px";
    pub const PADDING_NARROW: &str = "24px";
    pub const INFO_ROW_DIRECTION_WIDE: &str = "row";
    pub const INFO_ROW_DIRECTION_NARROW: &str = "column";
}

const CONTAINER: &str = ".container";
const INFO_ROW: &str = ".info-row";

pub fn run<S: Surface>(surface: &mut S, ctx: &CheckContext) -> Result<Outcome> {
    surface.navigate(&ctx.base_url, WaitUntil::NetworkIdle)?;
    let mut mismatches = Vec::new();

    for profile in VIEWPORTS {
        surface.set_viewport(profile.viewport)?;
        let label = profile.label;
        let narrow = profile.viewport.width < expected::BREAKPOINT_PX;

        let metrics = surface.scroll_metrics()?;
        if metrics.has_horizontal_overflow() {
            mismatches.push(Mismatch::new(
                format!("horizontal overflow @ {label}"),
                format!("scrollWidth <= {}", metrics.client_width),
                metrics.scroll_width.to_string(),
            ));
        }

        match surface.bounding_box(CONTAINER)? {
            Some(rect) => {
                if rect.width > profile.viewport.width {
                    mismatches.push(Mismatch::new(
                        format!("container width @ {label}"),
                        format!("<= viewport width {}", profile.viewport.width),
                        rect.width.to_string(),
                    ));
                }
                if !narrow && rect.width > expected::CONTAINER_MAX_WIDTH_PX {
                    mismatches.push(Mismatch::new(
                        format!("container width @ {label}"),
                        format!("<= {}", expected::CONTAINER_MAX_WIDTH_PX),
                        rect.width.to_string(),
                    ));
                }
            }
            None => mismatches.push(Mismatch::new(
                format!("container box @ {label}"),
                "a rendered box",
                "not found",
            )),
        }

        expect_style(
            surface,
            &mut mismatches,
            label,
            "h1",
            "font-size",
            if narrow { expected::H1_FONT_SIZE_NARROW } else { expected::H1_FONT_SIZE_WIDE },
        )?;
        expect_style(
            surface,
            &mut mismatches,
            label,
            CONTAINER,
            "padding-left",
            if narrow { expected::PADDING_NARROW } else { expected::PADDING_WIDE },
        )?;
        expect_style(
            surface,
            &mut mismatches,
            label,
            INFO_ROW,
            "flex-direction",
            if narrow {
                expected::INFO_ROW_DIRECTION_NARROW
            } else {
                expected::INFO_ROW_DIRECTION_WIDE
            },
        )?;
    }

    Ok(Outcome::from_mismatches(mismatches, Vec::new()))
}

fn expect_style<S: Surface>(
    surface: &S,
    mismatches: &mut Vec<Mismatch>,
    label: &str,
    selector: &str,
    property: &str,
    expected: &str,
) -> Result<()> {
    let actual = surface.computed_style(selector, property)?;
    if actual.as_deref() != Some(expected) {
        mismatches.push(Mismatch::new(
            format!("{property} of {selector} @ {label}"),
            expected,
            actual.unwrap_or_else(|| "not found".into()),
        ));
    }
    Ok(())
}
