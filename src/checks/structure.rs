//! Structural validity: singleton landmarks, unique ids, heading order.

use crate::checks::{CheckContext, Mismatch, Outcome};
use crate::error::Result;
use crate::surface::{Surface, WaitUntil};

pub fn run<S: Surface>(surface: &mut S, ctx: &CheckContext) -> Result<Outcome> {
    surface.navigate(&ctx.base_url, WaitUntil::DomContentLoaded)?;
    let dom = surface.dom()?;
    let mut mismatches = Vec::new();

    for tag in ["html", "head", "body", "h1"] {
        let count = dom.by_tag(tag).len();
        if count != 1 {
            mismatches.push(Mismatch::new(
                format!("<{tag}> element count"),
                "1",
                count.to_string(),
            ));
        }
    }

    for id in dom.duplicate_ids() {
        mismatches.push(Mismatch::new(
            format!("elements with id \"{id}\""),
            "1",
            "multiple",
        ));
    }

    // A heading may repeat or go back up any number of levels, but must not
    // skip downward (h1 -> h3 with no h2 in between).
    let headings = dom.headings();
    for window in headings.windows(2) {
        let (_, prev) = window[0];
        let (idx, next) = window[1];
        if next > prev + 1 {
            mismatches.push(Mismatch::new(
                format!("heading level after h{prev} ({})", dom.elements[idx].locator()),
                format!("h{} or shallower", prev + 1),
                format!("h{next}"),
            ));
        }
    }

    Ok(Outcome::from_mismatches(mismatches, Vec::new()))
}
