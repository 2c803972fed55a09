//! Viewport-aware style resolution.
//!
//! Applies every stylesheet rule whose media condition matches the current
//! viewport width, orders declarations by (importance, specificity, source
//! order), folds in inline `style=""` attributes, then runs an inheritance
//! pass for font size and color. The result is one `ComputedStyle` per
//! element, indexed in the same depth-first document order as
//! [`crate::dom::DomSnapshot`].

use std::collections::{HashMap, HashSet};

use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::css::color::{self, Rgba};
use crate::css::{parse_declarations, parse_px, Stylesheet};

/// Resolved style of a single element
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    /// Post-cascade declared properties, shorthands expanded
    declared: HashMap<String, String>,
    pub font_size: f32,
    pub color: Rgba,
    /// `None` means transparent; effective background comes from an ancestor
    pub background_color: Option<Rgba>,
    pub display: String,
}

impl ComputedStyle {
    /// Look up a property the way `getComputedStyle` reports it: colors in
    /// canonical `#rrggbb`, font sizes in px, everything else as declared.
    pub fn get(&self, property: &str) -> Option<String> {
        match property {
            "font-size" => Some(format_px(self.font_size)),
            "color" => Some(self.color.to_hex()),
            "background-color" => Some(
                self.background_color
                    .map(|c| c.to_hex())
                    .unwrap_or_else(|| "transparent".to_string()),
            ),
            "display" => Some(self.display.clone()),
            "flex-direction" => Some(
                self.declared
                    .get("flex-direction")
                    .cloned()
                    .unwrap_or_else(|| "row".to_string()),
            ),
            _ => {
                let raw = self.declared.get(property)?;
                if property.contains("color") {
                    Some(color::normalize(raw))
                } else {
                    Some(raw.clone())
                }
            }
        }
    }

    /// A declared property value without normalization
    pub fn declared(&self, property: &str) -> Option<&str> {
        self.declared.get(property).map(|s| s.as_str())
    }

    /// A declared length resolved to px against this element's font size
    pub fn length_px(&self, property: &str) -> Option<f32> {
        parse_px(self.declared.get(property)?)
    }

    pub fn is_visible(&self) -> bool {
        self.display != "none"
    }
}

pub fn format_px(v: f32) -> String {
    if (v - v.round()).abs() < 0.005 {
        format!("{}px", v.round() as i64)
    } else {
        format!("{:.2}px", v)
    }
}

/// Resolve styles for every element of the document at the given viewport
/// width. `hovered` holds element indices with simulated hover state.
pub fn resolve_styles(
    document: &Html,
    sheets: &[Stylesheet],
    viewport_width: u32,
    hovered: &HashSet<usize>,
) -> Vec<ComputedStyle> {
    let elements = document_elements(document);
    let mut index_of = HashMap::new();
    for (i, el) in elements.iter().enumerate() {
        index_of.insert(el.id(), i);
    }

    // (important, specificity, order) sort key per candidate declaration
    let mut candidates: Vec<Vec<(bool, u32, usize, String, String)>> =
        vec![Vec::new(); elements.len()];

    for sheet in sheets {
        for rule in &sheet.rules {
            if let Some(media) = &rule.media {
                if !media.matches(viewport_width) {
                    continue;
                }
            }
            let selector_text = if rule.hover {
                rule.selector_text.replace(":hover", "")
            } else {
                rule.selector_text.clone()
            };
            let selector_text = selector_text.trim();
            if selector_text.is_empty() {
                continue;
            }
            let selector = match Selector::parse(selector_text) {
                Ok(s) => s,
                Err(_) => {
                    debug!("skipping unparseable selector: {}", rule.selector_text);
                    continue;
                }
            };
            for matched in document.select(&selector) {
                let Some(&idx) = index_of.get(&matched.id()) else { continue };
                if rule.hover && !hovered.contains(&idx) {
                    continue;
                }
                for decl in &rule.declarations {
                    candidates[idx].push((
                        decl.important,
                        rule.specificity,
                        rule.order,
                        decl.property.clone(),
                        decl.value.clone(),
                    ));
                }
            }
        }
    }

    // Inline style attributes outrank any sheet specificity
    for (i, el) in elements.iter().enumerate() {
        if let Some(style_attr) = el.value().attr("style") {
            for decl in parse_declarations(style_attr) {
                candidates[i].push((
                    decl.important,
                    u32::MAX,
                    usize::MAX,
                    decl.property,
                    decl.value,
                ));
            }
        }
    }

    // Fold in cascade order; later entries overwrite earlier ones
    let mut declared: Vec<HashMap<String, String>> = Vec::with_capacity(elements.len());
    for mut cand in candidates {
        cand.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
        let mut map = HashMap::new();
        for (_, _, _, property, value) in cand {
            expand_declaration(&mut map, &property, &value);
        }
        declared.push(map);
    }

    // Inheritance pass. Parents precede children in DFS order, so a single
    // forward sweep sees resolved parents.
    let parents: Vec<Option<usize>> = {
        let mut index_parent = vec![None; elements.len()];
        for (i, el) in elements.iter().enumerate() {
            if let Some(parent) = el.parent().and_then(ElementRef::wrap) {
                index_parent[i] = index_of.get(&parent.id()).copied();
            }
        }
        index_parent
    };

    let mut out: Vec<ComputedStyle> = Vec::with_capacity(elements.len());
    for (i, map) in declared.into_iter().enumerate() {
        let parent = parents[i].map(|p| &out[p]);
        let parent_font = parent.map(|p| p.font_size).unwrap_or(16.0);
        let font_size = map
            .get("font-size")
            .and_then(|v| resolve_font_size(v, parent_font))
            .unwrap_or(parent_font);
        let color = map
            .get("color")
            .and_then(|v| color::parse_color(v))
            .unwrap_or_else(|| parent.map(|p| p.color).unwrap_or(Rgba::BLACK));
        let background_color = map
            .get("background-color")
            .and_then(|v| color::parse_color(v))
            .filter(|c| !c.is_transparent());
        let display = map
            .get("display")
            .cloned()
            .unwrap_or_else(|| default_display(elements[i].value().name()).to_string());
        out.push(ComputedStyle {
            declared: map,
            font_size,
            color,
            background_color,
            display,
        });
    }
    out
}

/// Depth-first element list in document order, matching
/// `DomSnapshot::from_document`.
pub fn document_elements(document: &Html) -> Vec<ElementRef<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![document.root_element()];
    while let Some(node) = stack.pop() {
        out.push(node);
        let children: Vec<_> = node
            .children()
            .filter_map(ElementRef::wrap)
            .collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

fn resolve_font_size(value: &str, parent: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(n) = v.strip_suffix("px") {
        return n.trim().parse::<f32>().ok();
    }
    if let Some(n) = v.strip_suffix("rem") {
        return n.trim().parse::<f32>().ok().map(|x| x * 16.0);
    }
    if let Some(n) = v.strip_suffix("em") {
        return n.trim().parse::<f32>().ok().map(|x| x * parent);
    }
    if let Some(n) = v.strip_suffix('%') {
        return n.trim().parse::<f32>().ok().map(|x| x / 100.0 * parent);
    }
    None
}

fn expand_declaration(map: &mut HashMap<String, String>, property: &str, value: &str) {
    match property {
        "padding" | "margin" => {
            let sides = expand_sides(value);
            if let Some([top, right, bottom, left]) = sides {
                map.insert(format!("{property}-top"), top);
                map.insert(format!("{property}-right"), right);
                map.insert(format!("{property}-bottom"), bottom);
                map.insert(format!("{property}-left"), left);
            }
            map.insert(property.to_string(), value.to_string());
        }
        "background" => {
            // keep only the color component of the shorthand when present
            for part in value.split_whitespace() {
                if color::parse_color(part).is_some() {
                    map.insert("background-color".to_string(), part.to_string());
                    break;
                }
            }
            map.insert(property.to_string(), value.to_string());
        }
        _ => {
            map.insert(property.to_string(), value.to_string());
        }
    }
}

fn expand_sides(value: &str) -> Option<[String; 4]> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let s = |i: usize| parts[i].to_string();
    match parts.len() {
        1 => Some([s(0), s(0), s(0), s(0)]),
        2 => Some([s(0), s(1), s(0), s(1)]),
        3 => Some([s(0), s(1), s(2), s(1)]),
        4 => Some([s(0), s(1), s(2), s(3)]),
        _ => None,
    }
}

fn default_display(tag: &str) -> &'static str {
    match tag {
        "html" | "body" | "div" | "p" | "ul" | "ol" | "li" | "section" | "header" | "footer"
        | "main" | "nav" | "article" | "aside" | "form" | "figure" | "blockquote" | "h1"
        | "h2" | "h3" | "h4" | "h5" | "h6" => "block",
        "head" | "title" | "meta" | "link" | "style" | "script" => "none",
        _ => "inline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;

    fn resolve_one(html: &str, css: &str, width: u32) -> (Html, Vec<ComputedStyle>) {
        let doc = Html::parse_document(html);
        let sheet = parse_stylesheet(css, 0);
        let styles = resolve_styles(&doc, &[sheet], width, &HashSet::new());
        (doc, styles)
    }

    fn index_of_tag(doc: &Html, tag: &str) -> usize {
        document_elements(doc)
            .iter()
            .position(|e| e.value().name() == tag)
            .unwrap()
    }

    #[test]
    fn id_beats_class_beats_tag() {
        let html = "<html><body><div id=\"hello\" class=\"greeting\">x</div></body></html>";
        let css = "div{color:blue}.greeting{color:green}#hello{color:red;font-size:12px}";
        let (doc, styles) = resolve_one(html, css, 1280);
        let div = index_of_tag(&doc, "div");
        assert_eq!(styles[div].get("color").unwrap(), "#ff0000");
        assert_eq!(styles[div].get("font-size").unwrap(), "12px");
    }

    #[test]
    fn media_queries_switch_on_viewport_width() {
        let html = "<html><body><h1>t</h1></body></html>";
        let css = "h1{font-size:42px} @media (max-width:767px){ h1{font-size:32px} }";
        let (doc, desktop) = resolve_one(html, css, 1280);
        let h1 = index_of_tag(&doc, "h1");
        assert_eq!(desktop[h1].get("font-size").unwrap(), "42px");
        let (_, mobile) = resolve_one(html, css, 375);
        assert_eq!(mobile[h1].get("font-size").unwrap(), "32px");
    }

    #[test]
    fn inline_style_wins_over_sheets() {
        let html = "<html><body><div id=\"a\" style=\"width: 1200px\">x</div></body></html>";
        let css = "#a{width:100px}";
        let (doc, styles) = resolve_one(html, css, 1280);
        let div = index_of_tag(&doc, "div");
        assert_eq!(styles[div].declared("width"), Some("1200px"));
    }

    #[test]
    fn important_beats_specificity() {
        let html = "<html><body><div id=\"a\">x</div></body></html>";
        let css = "div{color:red !important}#a{color:blue}";
        let (doc, styles) = resolve_one(html, css, 1280);
        let div = index_of_tag(&doc, "div");
        assert_eq!(styles[div].get("color").unwrap(), "#ff0000");
    }

    #[test]
    fn color_and_font_size_inherit() {
        let html = "<html><body><div><span>x</span></div></body></html>";
        let css = "body{color:#e8ecf1;font-size:18px}";
        let (doc, styles) = resolve_one(html, css, 1280);
        let span = index_of_tag(&doc, "span");
        assert_eq!(styles[span].get("color").unwrap(), "#e8ecf1");
        assert_eq!(styles[span].get("font-size").unwrap(), "18px");
        assert_eq!(styles[span].display, "inline");
    }

    #[test]
    fn hover_rules_only_apply_to_hovered_elements() {
        let html = "<html><body><a href=\"#x\">x</a></body></html>";
        let css = "a{color:#7aa2ff} a:hover{color:#ffffff}";
        let doc = Html::parse_document(html);
        let sheet = parse_stylesheet(css, 0);
        let a = index_of_tag(&doc, "a");

        let plain = resolve_styles(&doc, &[sheet.clone()], 1280, &HashSet::new());
        assert_eq!(plain[a].get("color").unwrap(), "#7aa2ff");

        let mut hovered = HashSet::new();
        hovered.insert(a);
        let hot = resolve_styles(&doc, &[sheet], 1280, &hovered);
        assert_eq!(hot[a].get("color").unwrap(), "#ffffff");
    }

    #[test]
    fn padding_shorthand_expands() {
        let html = "<html><body><div>x</div></body></html>";
        let css = "div{padding: 48px 24px}";
        let (doc, styles) = resolve_one(html, css, 1280);
        let div = index_of_tag(&doc, "div");
        assert_eq!(styles[div].declared("padding-top"), Some("48px"));
        assert_eq!(styles[div].declared("padding-left"), Some("24px"));
        assert_eq!(styles[div].declared("padding"), Some("48px 24px"));
    }
}
