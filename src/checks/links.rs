//! Anchor integrity: targets, accessible names, fragments, isolation.

use url::Url;

use crate::checks::{CheckContext, Mismatch, Outcome};
use crate::error::{Error, Result};
use crate::surface::{Surface, WaitUntil};

/// The published contact address must point at this host...
const CONTACT_HOST: &str = "smp16.simplex.im";
/// ...and carry this exact connection key.
const CONTACT_KEY: &str = "2ezKSyifGZbk_Se0QYcbzVSzQXOpGb3MML0dZ7RA1nA";

pub fn run<S: Surface>(surface: &mut S, ctx: &CheckContext) -> Result<Outcome> {
    surface.navigate(&ctx.base_url, WaitUntil::DomContentLoaded)?;
    let dom = surface.dom()?;
    let base = Url::parse(&ctx.base_url)
        .map_err(|e| Error::ConfigError(format!("invalid base URL {}: {e}", ctx.base_url)))?;

    let mut mismatches = Vec::new();
    let mut notes = Vec::new();
    let mut contact_seen = false;

    for i in dom.anchors() {
        let el = &dom.elements[i];
        let locator = el.locator();

        let href = el.attr("href").unwrap_or("").trim();
        if href.is_empty() {
            mismatches.push(Mismatch::new(
                format!("href of {locator}"),
                "non-empty target",
                "missing or empty",
            ));
            continue;
        }

        if dom.accessible_name(i).is_empty() {
            mismatches.push(Mismatch::new(
                format!("accessible name of {locator}"),
                "non-empty",
                "empty",
            ));
        }

        if el.attr("target") == Some("_blank") {
            let rel = el.attr("rel").unwrap_or("");
            let isolated = rel
                .split_whitespace()
                .any(|t| t == "noopener" || t == "noreferrer");
            if !isolated {
                mismatches.push(Mismatch::new(
                    format!("rel of {locator} (target=_blank)"),
                    "noopener or noreferrer",
                    if rel.is_empty() { "missing".to_string() } else { rel.to_string() },
                ));
            }
        }

        if href.contains(CONTACT_HOST) {
            contact_seen = true;
            if !href.contains(CONTACT_KEY) {
                mismatches.push(Mismatch::new(
                    format!("contact address in {locator}"),
                    format!("href containing {CONTACT_KEY}"),
                    href.to_string(),
                ));
            }
        }

        if let Some(fragment) = href.strip_prefix('#') {
            if fragment.is_empty() || dom.by_id(fragment).is_none() {
                mismatches.push(Mismatch::new(
                    format!("fragment target of {locator}"),
                    "an element with a matching id",
                    format!("#{fragment} does not resolve"),
                ));
            }
            continue;
        }

        // Non-http schemes (mailto, tel, the messaging deep link) are
        // checked syntactically only.
        let resolved = match base.join(href) {
            Ok(u) => u,
            Err(e) => {
                mismatches.push(Mismatch::new(
                    format!("href of {locator}"),
                    "a parseable URL",
                    format!("{href} ({e})"),
                ));
                continue;
            }
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        let same_origin = resolved.host_str() == base.host_str()
            && resolved.port_or_known_default() == base.port_or_known_default();
        if same_origin {
            match surface.probe(resolved.as_str())? {
                Some(status) if status >= 400 => {
                    mismatches.push(Mismatch::new(
                        format!("reachability of {locator}"),
                        "status < 400",
                        status.to_string(),
                    ));
                }
                Some(_) => {}
                None => notes.push(format!("{locator}: probe unsupported, checked syntax only")),
            }
        } else {
            notes.push(format!("{locator}: external target, checked syntax only"));
        }
    }

    if !contact_seen {
        mismatches.push(Mismatch::new(
            "contact link",
            format!("an anchor pointing at {CONTACT_HOST}"),
            "none found",
        ));
    }

    Ok(Outcome::from_mismatches(mismatches, notes))
}
