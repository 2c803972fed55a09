//! Display-list construction from layout results.

use crate::css::cascade::ComputedStyle;
use crate::css::color::Rgba;
use crate::dom::DomSnapshot;
use crate::layout::{self, LayoutTree, Rect};

/// One paint operation, in painting order
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect { rect: Rect, rgba: Rgba },
    /// A rendered text line, painted as a filled line box
    TextLine { rect: Rect, rgba: Rgba },
}

/// Build the page display list: element backgrounds in tree order, then text
/// line boxes for leaf elements.
pub fn build_display_list(
    dom: &DomSnapshot,
    styles: &[ComputedStyle],
    tree: &LayoutTree,
) -> Vec<PaintCommand> {
    let mut commands = Vec::new();
    for (idx, el) in dom.elements.iter().enumerate() {
        let Some(rect) = tree.rect(idx) else { continue };
        let style = &styles[idx];
        if let Some(bg) = style.background_color {
            commands.push(PaintCommand::SolidRect { rect, rgba: bg });
        }
        let has_visible_children = el
            .children
            .iter()
            .any(|&c| tree.rect(c).is_some());
        if has_visible_children || el.text.trim().is_empty() {
            continue;
        }
        let pad_left = style.length_px("padding-left").unwrap_or(0.0).round() as i32;
        let pad_top = style.length_px("padding-top").unwrap_or(0.0).round() as i32;
        let content_width = rect
            .width
            .saturating_sub((pad_left as u32).saturating_mul(2));
        let line_h = layout::line_height(style.font_size);
        // glyph box sits on the baseline inside the line box
        let glyph_h = (style.font_size * 0.8).round() as u32;
        let mut y = rect.y + pad_top;
        for line in layout::wrap_text(&el.text, style.font_size, content_width) {
            let advance = layout::text_advance(&line, style.font_size).min(content_width);
            commands.push(PaintCommand::TextLine {
                rect: Rect {
                    x: rect.x + pad_left,
                    y: y + (line_h.saturating_sub(glyph_h) / 2) as i32,
                    width: advance,
                    height: glyph_h,
                },
                rgba: style.color,
            });
            y += line_h as i32;
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_command_fields() {
        let cmd = PaintCommand::SolidRect {
            rect: Rect { x: 0, y: 0, width: 10, height: 10 },
            rgba: Rgba { r: 255, g: 0, b: 0, a: 255 },
        };
        match cmd {
            PaintCommand::SolidRect { rect, .. } => assert_eq!(rect.width, 10),
            _ => panic!("unexpected"),
        }
    }
}
