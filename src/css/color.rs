//! Color parsing, canonical formatting, and WCAG contrast math.

/// An sRGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Canonical `#rrggbb` form used when reporting computed colors
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse any CSS color syntax into `Rgba`. Returns `None` for keywords such
/// as `inherit` or values that are not colors at all.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("transparent") {
        return Some(Rgba { r: 0, g: 0, b: 0, a: 0 });
    }
    let parsed = csscolorparser::parse(v).ok()?;
    let [r, g, b, a] = parsed.to_rgba8();
    Some(Rgba { r, g, b, a })
}

/// Normalize a color value to `#rrggbb`, passing through anything that does
/// not parse as a color.
pub fn normalize(value: &str) -> String {
    match parse_color(value) {
        Some(c) if !c.is_transparent() => c.to_hex(),
        _ => value.trim().to_string(),
    }
}

/// WCAG relative luminance of an sRGB color
pub fn relative_luminance(c: Rgba) -> f64 {
    fn channel(v: u8) -> f64 {
        let s = v as f64 / 255.0;
        if s <= 0.04045 {
            s / 12.92
        } else {
            ((s + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * channel(c.r) + 0.7152 * channel(c.g) + 0.0722 * channel(c.b)
}

/// WCAG contrast ratio between two opaque colors, in `[1, 21]`
pub fn contrast_ratio(fg: Rgba, bg: Rgba) -> f64 {
    let l1 = relative_luminance(fg);
    let l2 = relative_luminance(bg);
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_syntaxes() {
        assert_eq!(parse_color("#ff0000").unwrap().to_hex(), "#ff0000");
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap().to_hex(), "#ff0000");
        assert_eq!(parse_color("red").unwrap().to_hex(), "#ff0000");
        assert!(parse_color("transparent").unwrap().is_transparent());
        assert!(parse_color("inherit").is_none());
    }

    #[test]
    fn normalize_passes_non_colors_through() {
        assert_eq!(normalize("White"), "#ffffff");
        assert_eq!(normalize("42px"), "42px");
    }

    #[test]
    fn contrast_extremes() {
        let c = contrast_ratio(Rgba::BLACK, Rgba::WHITE);
        assert!((c - 21.0).abs() < 0.01);
        let same = contrast_ratio(Rgba::WHITE, Rgba::WHITE);
        assert!((same - 1.0).abs() < 0.01);
    }
}
