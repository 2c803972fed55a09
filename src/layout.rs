//! Style-driven block and flex layout for the static backend.
//!
//! This is not a browser-grade layout engine; it covers what a landing page
//! needs to answer the harness's questions: stacked blocks, centered
//! max-width containers, `box-sizing: border-box`, padding, flex rows and
//! columns with gaps, and text height estimated from font size. The rects it
//! produces back bounding boxes, scroll metrics, and the rasterizer.

use crate::css::cascade::ComputedStyle;
use crate::css::parse_px;
use crate::dom::DomSnapshot;
use crate::surface::ScrollMetrics;
use crate::Viewport;

/// An element's border-box rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Layout result: one optional rect per element, indexed like the snapshot
#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub boxes: Vec<Option<Rect>>,
    pub viewport: Viewport,
}

impl LayoutTree {
    pub fn rect(&self, element: usize) -> Option<Rect> {
        self.boxes.get(element).copied().flatten()
    }

    /// Document-level metrics equivalent to `scrollWidth`/`clientWidth`
    pub fn scroll_metrics(&self) -> ScrollMetrics {
        let mut max_right = 0i32;
        let mut max_bottom = 0i32;
        for rect in self.boxes.iter().flatten() {
            max_right = max_right.max(rect.right());
            max_bottom = max_bottom.max(rect.bottom());
        }
        ScrollMetrics {
            scroll_width: (max_right.max(0) as u32).max(self.viewport.width),
            client_width: self.viewport.width,
            scroll_height: (max_bottom.max(0) as u32).max(self.viewport.height),
            client_height: self.viewport.height,
        }
    }
}

/// Average glyph advance as a fraction of font size
const CHAR_WIDTH_RATIO: f32 = 0.6;
/// Line box height as a fraction of font size
const LINE_HEIGHT_RATIO: f32 = 1.4;

struct LayoutCtx<'a> {
    dom: &'a DomSnapshot,
    styles: &'a [ComputedStyle],
    boxes: Vec<Option<Rect>>,
}

/// Lay out the whole document at the given viewport
pub fn layout_document(
    dom: &DomSnapshot,
    styles: &[ComputedStyle],
    viewport: Viewport,
) -> LayoutTree {
    let mut ctx = LayoutCtx {
        dom,
        styles,
        boxes: vec![None; dom.elements.len()],
    };
    if let Some(body) = dom.by_tag("body").first().copied() {
        ctx.place(body, 0, 0, viewport.width);
    }
    LayoutTree {
        boxes: ctx.boxes,
        viewport,
    }
}

impl LayoutCtx<'_> {
    /// Place one element at (x, y) inside a containing block of width
    /// `cb_width`. Returns the occupied height including margins.
    fn place(&mut self, idx: usize, x: i32, y: i32, cb_width: u32) -> u32 {
        let style = &self.styles[idx];
        if !style.is_visible() {
            return 0;
        }

        let margin_top = side_px(style, "margin-top", cb_width);
        let margin_bottom = side_px(style, "margin-bottom", cb_width);
        let pad_left = side_px(style, "padding-left", cb_width);
        let pad_right = side_px(style, "padding-right", cb_width);
        let pad_top = side_px(style, "padding-top", cb_width);
        let pad_bottom = side_px(style, "padding-bottom", cb_width);

        let border_box = style
            .declared("box-sizing")
            .map(|v| v == "border-box")
            .unwrap_or(false);

        // Border-box width of this element
        let mut width = match style.declared("width").and_then(|v| resolve_length(v, cb_width)) {
            Some(w) if border_box => w,
            Some(w) => w + pad_left + pad_right,
            None => cb_width as f32,
        };
        if let Some(max) = style
            .declared("max-width")
            .and_then(|v| resolve_length(v, cb_width))
        {
            let max = if border_box { max } else { max + pad_left + pad_right };
            width = width.min(max);
        }
        let width = width.max(0.0).round() as u32;

        // `margin: 0 auto` centering
        let margin_left_auto = style.declared("margin-left").map(|v| v.trim() == "auto");
        let margin_right_auto = style.declared("margin-right").map(|v| v.trim() == "auto");
        let centered = matches!((margin_left_auto, margin_right_auto), (Some(true), Some(true)))
            || style
                .declared("margin")
                .map(|v| v.split_whitespace().any(|p| p == "auto"))
                .unwrap_or(false);
        let x = if centered && width < cb_width {
            x + ((cb_width - width) / 2) as i32
        } else {
            x + side_px(style, "margin-left", cb_width).round() as i32
        };

        let content_width = (width as f32 - pad_left - pad_right).max(0.0).round() as u32;
        let content_x = x + pad_left.round() as i32;
        let top = y + margin_top.round() as i32;
        let content_y = top + pad_top.round() as i32;

        let block_children: Vec<usize> = self.dom.elements[idx]
            .children
            .iter()
            .copied()
            .filter(|&c| self.styles[c].is_visible())
            .collect();

        let inner_height = if style.display == "flex"
            && style
                .declared("flex-direction")
                .map(|d| d != "column")
                .unwrap_or(true)
        {
            self.place_flex_row(&block_children, content_x, content_y, content_width, style)
        } else if block_children.is_empty() {
            text_height(&self.dom.elements[idx].text, style, content_width)
        } else {
            let gap = if style.display == "flex" {
                style.length_px("gap").unwrap_or(0.0).round() as u32
            } else {
                0
            };
            let mut cursor = content_y;
            for (n, &child) in block_children.iter().enumerate() {
                if n > 0 {
                    cursor += gap as i32;
                }
                let used = self.place(child, content_x, cursor, content_width);
                cursor += used as i32;
            }
            (cursor - content_y).max(0) as u32
        };

        let height = match style.declared("height").and_then(|v| resolve_length(v, 0)) {
            Some(h) => h.round() as u32,
            None => inner_height + pad_top.round() as u32 + pad_bottom.round() as u32,
        };

        self.boxes[idx] = Some(Rect {
            x,
            y: top,
            width,
            height,
        });

        margin_top.round() as u32 + height + margin_bottom.round() as u32
    }

    /// Place children side by side; returns the row's content height
    fn place_flex_row(
        &mut self,
        children: &[usize],
        x: i32,
        y: i32,
        content_width: u32,
        parent: &ComputedStyle,
    ) -> u32 {
        let gap = parent.length_px("gap").unwrap_or(0.0).round() as i32;
        let mut cursor = x;
        let mut max_height = 0u32;
        for (n, &child) in children.iter().enumerate() {
            if n > 0 {
                cursor += gap;
            }
            let style = &self.styles[child];
            let intrinsic = intrinsic_width(&self.dom.elements[child].text, style)
                .min(content_width as f32);
            let child_width = style
                .declared("width")
                .and_then(|v| resolve_length(v, content_width))
                .unwrap_or(intrinsic)
                .round() as u32;
            let used = self.place(child, cursor, y, child_width);
            if let Some(rect) = self.boxes[child] {
                cursor = rect.right();
                max_height = max_height.max(used);
            }
        }
        max_height
    }
}

fn side_px(style: &ComputedStyle, property: &str, cb_width: u32) -> f32 {
    style
        .declared(property)
        .and_then(|v| resolve_length(v, cb_width))
        .unwrap_or(0.0)
}

fn resolve_length(value: &str, cb_width: u32) -> Option<f32> {
    let v = value.trim();
    if v == "auto" {
        return None;
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| p / 100.0 * cb_width as f32);
    }
    parse_px(v)
}

fn intrinsic_width(text: &str, style: &ComputedStyle) -> f32 {
    let pad = side_px(style, "padding-left", 0) + side_px(style, "padding-right", 0);
    let glyphs = text.chars().count() as f32;
    glyphs * style.font_size * CHAR_WIDTH_RATIO + pad
}

fn text_height(text: &str, style: &ComputedStyle, content_width: u32) -> u32 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    let char_w = (style.font_size * CHAR_WIDTH_RATIO).max(1.0);
    let per_line = ((content_width as f32 / char_w).floor() as usize).max(1);
    // word wrap, matching the painter's line breaking
    let mut lines = 0usize;
    let mut cur = 0usize;
    for word in text.split_whitespace() {
        let add = if cur == 0 { word.len() } else { word.len() + 1 };
        if cur + add > per_line && cur > 0 {
            lines += 1;
            cur = word.len();
        } else {
            cur += add;
        }
    }
    if cur > 0 {
        lines += 1;
    }
    (lines as f32 * style.font_size * LINE_HEIGHT_RATIO).round() as u32
}

/// Word-wrapped lines for the painter; kept next to `text_height` so the two
/// always agree.
pub fn wrap_text(text: &str, font_size: f32, content_width: u32) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let char_w = (font_size * CHAR_WIDTH_RATIO).max(1.0);
    let per_line = ((content_width as f32 / char_w).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.len() + word.len() + 1 > per_line {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Line height in px for a given font size
pub fn line_height(font_size: f32) -> u32 {
    (font_size * LINE_HEIGHT_RATIO).round() as u32
}

/// Advance width in px of one rendered line
pub fn text_advance(text: &str, font_size: f32) -> u32 {
    (text.chars().count() as f32 * font_size * CHAR_WIDTH_RATIO).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::cascade::resolve_styles;
    use crate::css::parse_stylesheet;
    use scraper::Html;
    use std::collections::HashSet;

    fn layout(html: &str, css: &str, viewport: Viewport) -> (DomSnapshot, LayoutTree) {
        let doc = Html::parse_document(html);
        let dom = DomSnapshot::from_document(&doc);
        let styles = resolve_styles(&doc, &[parse_stylesheet(css, 0)], viewport.width, &HashSet::new());
        let tree = layout_document(&dom, &styles, viewport);
        (dom, tree)
    }

    const PAGE: &str = "<html><body><div class=\"container\"><h1>Title</h1><p>Some copy text for the page.</p></div></body></html>";
    const CSS: &str = "*{box-sizing:border-box} body{margin:0} .container{max-width:640px;margin:0 auto;padding:48px}";

    #[test]
    fn container_clamps_and_centers_at_desktop() {
        let (dom, tree) = layout(PAGE, CSS, Viewport { width: 1280, height: 720 });
        let container = dom.elements.iter().position(|e| e.has_class("container")).unwrap();
        let rect = tree.rect(container).unwrap();
        assert_eq!(rect.width, 640);
        assert_eq!(rect.x, 320);
    }

    #[test]
    fn container_fits_narrow_viewport() {
        let (dom, tree) = layout(PAGE, CSS, Viewport { width: 375, height: 667 });
        let container = dom.elements.iter().position(|e| e.has_class("container")).unwrap();
        let rect = tree.rect(container).unwrap();
        assert_eq!(rect.width, 375);
        assert_eq!(rect.x, 0);
        assert!(!tree.scroll_metrics().has_horizontal_overflow());
    }

    #[test]
    fn fixed_width_element_overflows_narrow_viewport() {
        let html = "<html><body><div style=\"width:1200px\">wide</div></body></html>";
        let (_, tree) = layout(html, "*{box-sizing:border-box} body{margin:0}", Viewport { width: 375, height: 667 });
        let m = tree.scroll_metrics();
        assert!(m.has_horizontal_overflow());
        assert_eq!(m.scroll_width, 1200);
    }

    #[test]
    fn flex_row_places_children_side_by_side() {
        let html = "<html><body><div class=\"row\"><span>a</span><span>b</span></div></body></html>";
        let css = "body{margin:0} .row{display:flex;flex-direction:row;gap:12px}";
        let (dom, tree) = layout(html, css, Viewport { width: 1280, height: 720 });
        let spans = dom.by_tag("span");
        let first = tree.rect(spans[0]).unwrap();
        let second = tree.rect(spans[1]).unwrap();
        assert_eq!(first.y, second.y);
        assert!(second.x >= first.right() + 12);
    }

    #[test]
    fn flex_column_stacks_children() {
        let html = "<html><body><div class=\"row\"><span>a</span><span>b</span></div></body></html>";
        let css = "body{margin:0} .row{display:flex;flex-direction:column;gap:12px}";
        let (dom, tree) = layout(html, css, Viewport { width: 375, height: 667 });
        let spans = dom.by_tag("span");
        let first = tree.rect(spans[0]).unwrap();
        let second = tree.rect(spans[1]).unwrap();
        assert!(second.y >= first.bottom());
    }
}
