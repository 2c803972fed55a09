//! Automated WCAG 2.1 AA rule scan.
//!
//! A small in-crate rule engine modeled on the common automated audits:
//! each rule reports structured violations carrying the conformance tags it
//! belongs to, and the check asserts the WCAG 2.1 AA subset is empty.

use serde::Serialize;

use crate::checks::{CheckContext, Mismatch, Outcome};
use crate::css::color::{contrast_ratio, parse_color, Rgba};
use crate::dom::DomSnapshot;
use crate::error::Result;
use crate::surface::{Surface, WaitUntil};

/// Conformance tags the check filters on.
pub const WCAG_TAGS: [&str; 3] = ["wcag2a", "wcag2aa", "wcag21aa"];

const NORMAL_TEXT_RATIO: f64 = 4.5;
const LARGE_TEXT_RATIO: f64 = 3.0;

/// One element breaking one rule.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule: &'static str,
    pub tags: Vec<&'static str>,
    /// Short locator for the offending element, e.g. `a.contact`
    pub target: String,
    pub description: String,
}

impl Violation {
    fn new(rule: &'static str, tags: &[&'static str], target: String, description: String) -> Self {
        Self {
            rule,
            tags: tags.to_vec(),
            target,
            description,
        }
    }

    pub fn matches_tags(&self, filter: &[&str]) -> bool {
        self.tags.iter().any(|t| filter.contains(t))
    }
}

pub fn run<S: Surface>(surface: &mut S, ctx: &CheckContext) -> Result<Outcome> {
    surface.navigate(&ctx.base_url, WaitUntil::NetworkIdle)?;
    let dom = surface.dom()?;
    let violations = scan(surface, &dom)?;

    let mismatches = violations
        .iter()
        .filter(|v| v.matches_tags(&WCAG_TAGS))
        .map(|v| {
            Mismatch::new(
                format!("{} on {}", v.rule, v.target),
                "no violation",
                v.description.clone(),
            )
        })
        .collect();
    Ok(Outcome::from_mismatches(mismatches, Vec::new()))
}

/// Run every rule and collect all violations, unfiltered.
pub fn scan<S: Surface>(surface: &S, dom: &DomSnapshot) -> Result<Vec<Violation>> {
    let mut out = Vec::new();
    rule_document_title(dom, &mut out);
    rule_html_has_lang(dom, &mut out);
    rule_image_alt(dom, &mut out);
    rule_link_name(dom, &mut out);
    rule_button_name(dom, &mut out);
    rule_duplicate_id(dom, &mut out);
    rule_tabindex(dom, &mut out);
    rule_heading_order(dom, &mut out);
    rule_meta_viewport(dom, &mut out);
    rule_color_contrast(surface, dom, &mut out)?;
    Ok(out)
}

fn rule_document_title(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    let titled = dom
        .by_tag("title")
        .iter()
        .any(|&i| !dom.elements[i].text.is_empty());
    if !titled {
        out.push(Violation::new(
            "document-title",
            &["wcag2a", "wcag242"],
            "html".into(),
            "document has no non-empty <title>".into(),
        ));
    }
}

fn rule_html_has_lang(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for &i in &dom.by_tag("html") {
        let lang = dom.elements[i].attr("lang").unwrap_or("");
        if lang.trim().is_empty() {
            out.push(Violation::new(
                "html-has-lang",
                &["wcag2a", "wcag311"],
                "html".into(),
                "<html> element has no lang attribute".into(),
            ));
        }
    }
}

fn rule_image_alt(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for &i in &dom.by_tag("img") {
        let el = &dom.elements[i];
        // alt="" is a valid decorative marker; a missing attribute is not.
        if el.attr("alt").is_none() && el.attr("aria-label").is_none() {
            out.push(Violation::new(
                "image-alt",
                &["wcag2a", "wcag111"],
                el.locator(),
                "image has no alt attribute".into(),
            ));
        }
    }
}

fn rule_link_name(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for i in dom.anchors() {
        if dom.accessible_name(i).is_empty() {
            out.push(Violation::new(
                "link-name",
                &["wcag2a", "wcag244", "wcag412"],
                dom.elements[i].locator(),
                "link has no accessible name".into(),
            ));
        }
    }
}

fn rule_button_name(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for &i in &dom.by_tag("button") {
        if dom.accessible_name(i).is_empty() {
            out.push(Violation::new(
                "button-name",
                &["wcag2a", "wcag412"],
                dom.elements[i].locator(),
                "button has no accessible name".into(),
            ));
        }
    }
}

fn rule_duplicate_id(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for id in dom.duplicate_ids() {
        out.push(Violation::new(
            "duplicate-id",
            &["wcag2a", "wcag411"],
            format!("#{id}"),
            format!("id \"{id}\" appears on more than one element"),
        ));
    }
}

fn rule_tabindex(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for (i, el) in dom.elements.iter().enumerate() {
        if let Some(value) = el.attr("tabindex") {
            if value.trim().parse::<i32>().map(|v| v > 0).unwrap_or(false) {
                out.push(Violation::new(
                    "tabindex",
                    &["wcag2a", "wcag243"],
                    dom.elements[i].locator(),
                    format!("positive tabindex {value} disrupts focus order"),
                ));
            }
        }
    }
}

fn rule_heading_order(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    let headings = dom.headings();
    for window in headings.windows(2) {
        let (_, prev) = window[0];
        let (idx, next) = window[1];
        if next > prev + 1 {
            out.push(Violation::new(
                "heading-order",
                &["wcag2a", "wcag131"],
                dom.elements[idx].locator(),
                format!("h{next} follows h{prev}, skipping a level"),
            ));
        }
    }
}

fn rule_meta_viewport(dom: &DomSnapshot, out: &mut Vec<Violation>) {
    for &i in &dom.by_tag("meta") {
        let el = &dom.elements[i];
        if el.attr("name") != Some("viewport") {
            continue;
        }
        let content = el.attr("content").unwrap_or("").to_ascii_lowercase();
        let blocks_zoom = content.contains("user-scalable=no")
            || content
                .split(',')
                .filter_map(|part| part.trim().strip_prefix("maximum-scale="))
                .any(|v| v.trim().parse::<f64>().map(|s| s < 2.0).unwrap_or(false));
        if blocks_zoom {
            out.push(Violation::new(
                "meta-viewport",
                &["wcag2aa", "wcag144"],
                "meta[name=viewport]".into(),
                "viewport meta disables or limits zoom".into(),
            ));
        }
    }
}

/// WCAG 1.4.3: text contrast against the effective background.
///
/// Only leaf elements with rendered text are measured; the background is
/// found by walking up the ancestor chain to the nearest element with an
/// opaque background color, defaulting to white.
fn rule_color_contrast<S: Surface>(
    surface: &S,
    dom: &DomSnapshot,
    out: &mut Vec<Violation>,
) -> Result<()> {
    for (i, el) in dom.elements.iter().enumerate() {
        if el.text.is_empty() || !el.children.is_empty() {
            continue;
        }
        if matches!(el.tag.as_str(), "script" | "style" | "title" | "meta" | "link" | "head") {
            continue;
        }
        if surface.computed_style_of(i, "display")?.as_deref() == Some("none") {
            continue;
        }

        let Some(fg) = surface
            .computed_style_of(i, "color")?
            .as_deref()
            .and_then(parse_color)
        else {
            continue;
        };
        let bg = effective_background(surface, dom, i)?;

        let font_size = surface
            .computed_style_of(i, "font-size")?
            .as_deref()
            .and_then(crate::css::parse_px)
            .unwrap_or(16.0);
        let bold = surface
            .computed_style_of(i, "font-weight")?
            .map(|w| w == "bold" || w.parse::<u32>().map(|n| n >= 700).unwrap_or(false))
            .unwrap_or(false);
        let large = font_size >= 24.0 || (bold && font_size >= 18.66);
        let required = if large { LARGE_TEXT_RATIO } else { NORMAL_TEXT_RATIO };

        let ratio = contrast_ratio(fg, bg);
        if ratio < required {
            out.push(Violation::new(
                "color-contrast",
                &["wcag2aa", "wcag143"],
                el.locator(),
                format!(
                    "contrast {ratio:.2} is below {required} ({} on {})",
                    fg.to_hex(),
                    bg.to_hex()
                ),
            ));
        }
    }
    Ok(())
}

fn effective_background<S: Surface>(
    surface: &S,
    dom: &DomSnapshot,
    mut index: usize,
) -> Result<Rgba> {
    loop {
        if let Some(bg) = surface
            .computed_style_of(index, "background-color")?
            .as_deref()
            .and_then(parse_color)
        {
            if bg.a > 0 {
                return Ok(bg);
            }
        }
        match dom.elements[index].parent {
            Some(p) => index = p,
            None => return Ok(Rgba::WHITE),
        }
    }
}
