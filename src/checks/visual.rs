//! Screenshot comparison against the stored baseline set.

use crate::baseline::{BaselineOutcome, BaselineStore};
use crate::checks::{CheckContext, Mismatch, Outcome};
use crate::error::Result;
use crate::surface::{ScreenshotTarget, Surface, WaitUntil};
use crate::Viewport;

struct VisualTarget {
    /// Baseline file stem, e.g. `page-desktop` -> `page-desktop.png`
    key: &'static str,
    viewport: Viewport,
    capture: ScreenshotTarget,
}

fn targets() -> Vec<VisualTarget> {
    vec![
        VisualTarget {
            key: "page-desktop",
            viewport: Viewport { width: 1280, height: 720 },
            capture: ScreenshotTarget::Page,
        },
        VisualTarget {
            key: "page-mobile",
            viewport: Viewport { width: 375, height: 667 },
            capture: ScreenshotTarget::Page,
        },
        VisualTarget {
            key: "container-desktop",
            viewport: Viewport { width: 1280, height: 720 },
            capture: ScreenshotTarget::Element(".container".into()),
        },
    ]
}

pub fn run<S: Surface>(surface: &mut S, ctx: &CheckContext) -> Result<Outcome> {
    surface.navigate(&ctx.base_url, WaitUntil::NetworkIdle)?;
    let store = BaselineStore::new(&ctx.baseline_dir);

    let mut mismatches = Vec::new();
    let mut notes = Vec::new();

    for target in targets() {
        surface.set_viewport(target.viewport)?;
        let shot = surface.screenshot(&target.capture)?;
        match store.compare(target.key, &shot, ctx.update_baselines)? {
            // First capture is the accepted bootstrap, not a pass on merit.
            BaselineOutcome::Created => {
                notes.push(format!("{}: baseline created (bootstrap run)", target.key));
            }
            BaselineOutcome::Refreshed => {
                notes.push(format!("{}: baseline refreshed", target.key));
            }
            BaselineOutcome::Matched { diff_ratio } => {
                if diff_ratio > 0.0 {
                    notes.push(format!(
                        "{}: matched within tolerance (diff ratio {diff_ratio:.5})",
                        target.key
                    ));
                }
            }
            BaselineOutcome::Mismatched { diff_ratio, detail } => {
                mismatches.push(Mismatch::new(
                    format!("baseline {}", target.key),
                    "pixel diff within tolerance",
                    format!("diff ratio {diff_ratio:.5}: {detail}"),
                ));
            }
        }
    }

    Ok(Outcome::from_mismatches(mismatches, notes))
}
