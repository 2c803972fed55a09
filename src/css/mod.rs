//! Stylesheet model for the static backend.
//!
//! Covers the subset of CSS a landing page exercises: rule blocks, `@media`
//! width conditions, `!important`, and shorthand padding/margin. Selector
//! matching itself is delegated to `scraper` at cascade time; this module
//! only records selector text, specificity, and whether `:hover` is
//! required.

pub mod cascade;
pub mod color;

/// A single `property: value` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// A width-interval media condition. Conditions mentioning features this
/// model does not understand never match, so their rules cannot leak into
/// computed styles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaCondition {
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub never: bool,
}

impl MediaCondition {
    pub fn matches(&self, viewport_width: u32) -> bool {
        if self.never {
            return false;
        }
        let w = viewport_width as f32;
        if let Some(min) = self.min_width {
            if w < min {
                return false;
            }
        }
        if let Some(max) = self.max_width {
            if w > max {
                return false;
            }
        }
        true
    }
}

/// One selector with its declaration block
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector_text: String,
    /// True when the selector carries `:hover`; the rule only applies to
    /// elements in the simulated hover set.
    pub hover: bool,
    pub specificity: u32,
    pub declarations: Vec<Declaration>,
    pub media: Option<MediaCondition>,
    /// Source order across the whole stylesheet list
    pub order: usize,
}

/// A parsed stylesheet
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
}

/// Parse stylesheet text. `order_base` offsets rule source order so several
/// sheets cascade in document order.
pub fn parse_stylesheet(css: &str, order_base: usize) -> Stylesheet {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    parse_block(&css, None, order_base, &mut rules);
    Stylesheet { rules }
}

fn parse_block(
    input: &str,
    media: Option<MediaCondition>,
    order_base: usize,
    rules: &mut Vec<StyleRule>,
) {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        // Skip whitespace and stray semicolons between blocks
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b';') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let header_start = i;
        while i < bytes.len() && bytes[i] != b'{' && bytes[i] != b';' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b';' {
            // statement at-rule such as @import; nothing to keep
            i += 1;
            continue;
        }
        let header = input[header_start..i].trim().to_string();
        let body_start = i + 1;
        let body_end = match find_matching_brace(bytes, i) {
            Some(end) => end,
            None => break,
        };
        let body = &input[body_start..body_end];
        i = body_end + 1;

        if let Some(cond_text) = header.strip_prefix("@media") {
            let cond = parse_media_condition(cond_text);
            parse_block(body, Some(cond), order_base, rules);
        } else if header.starts_with('@') {
            // @font-face, @keyframes and friends carry no cascaded styles
            continue;
        } else {
            let declarations = parse_declarations(body);
            if declarations.is_empty() {
                continue;
            }
            for selector in split_top_level(&header, ',') {
                let selector = selector.trim();
                if selector.is_empty() {
                    continue;
                }
                let hover = selector.contains(":hover");
                rules.push(StyleRule {
                    selector_text: selector.to_string(),
                    hover,
                    specificity: specificity(selector),
                    declarations: declarations.clone(),
                    media,
                    order: order_base + rules.len(),
                });
            }
        }
    }
}

fn find_matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn parse_declarations(body: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for piece in split_top_level(body, ';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let Some(colon) = piece.find(':') else { continue };
        let property = piece[..colon].trim().to_ascii_lowercase();
        let mut value = piece[colon + 1..].trim().to_string();
        let mut important = false;
        if let Some(stripped) = value.to_ascii_lowercase().strip_suffix("!important") {
            important = true;
            value = value[..stripped.len()].trim_end().to_string();
        }
        if property.is_empty() || value.is_empty() {
            continue;
        }
        out.push(Declaration {
            property,
            value,
            important,
        });
    }
    out
}

/// Split on a separator, ignoring separators nested in parentheses or
/// brackets (e.g. `:not(a, b)` or `[data-x=","]` stay whole).
fn split_top_level(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in input.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                cur.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                cur.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut cur));
            }
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        parts.push(cur);
    }
    parts
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Selector specificity as `ids * 100 + (classes|attrs|pseudo-classes) * 10
/// + types`. Close enough for the flat selectors a landing page uses.
pub fn specificity(selector: &str) -> u32 {
    let mut a = 0u32;
    let mut b = 0u32;
    let mut c = 0u32;
    let chars: Vec<char> = selector.chars().collect();
    let mut i = 0;
    let mut compound_start = true;
    while i < chars.len() {
        match chars[i] {
            '#' => {
                a += 1;
                i += 1;
                skip_ident(&chars, &mut i);
                compound_start = false;
            }
            '.' => {
                b += 1;
                i += 1;
                skip_ident(&chars, &mut i);
                compound_start = false;
            }
            '[' => {
                b += 1;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                i += 1;
                compound_start = false;
            }
            ':' => {
                if i + 1 < chars.len() && chars[i + 1] == ':' {
                    c += 1; // pseudo-element
                    i += 2;
                } else {
                    b += 1;
                    i += 1;
                }
                skip_ident(&chars, &mut i);
                // functional pseudo-class argument
                if i < chars.len() && chars[i] == '(' {
                    let mut depth = 0;
                    while i < chars.len() {
                        match chars[i] {
                            '(' => depth += 1,
                            ')' => {
                                depth -= 1;
                                if depth == 0 {
                                    i += 1;
                                    break;
                                }
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                }
                compound_start = false;
            }
            ' ' | '>' | '+' | '~' => {
                compound_start = true;
                i += 1;
            }
            '*' => {
                compound_start = false;
                i += 1;
            }
            ch if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' => {
                if compound_start {
                    c += 1;
                }
                i += 1;
                skip_ident(&chars, &mut i);
                compound_start = false;
            }
            _ => i += 1,
        }
    }
    a * 100 + b * 10 + c
}

fn skip_ident(chars: &[char], i: &mut usize) {
    while *i < chars.len()
        && (chars[*i].is_ascii_alphanumeric() || chars[*i] == '-' || chars[*i] == '_')
    {
        *i += 1;
    }
}

fn parse_media_condition(text: &str) -> MediaCondition {
    let text = text.trim().to_ascii_lowercase();
    let mut cond = MediaCondition::default();
    if text.contains("print") && !text.contains("screen") && !text.contains("all") {
        cond.never = true;
        return cond;
    }
    let mut rest = text.as_str();
    while let Some(open) = rest.find('(') {
        let Some(close_rel) = rest[open..].find(')') else { break };
        let inner = &rest[open + 1..open + close_rel];
        rest = &rest[open + close_rel + 1..];
        let Some(colon) = inner.find(':') else {
            cond.never = true;
            continue;
        };
        let feature = inner[..colon].trim();
        let value = inner[colon + 1..].trim();
        match feature {
            "min-width" => match parse_px(value) {
                Some(px) => cond.min_width = Some(px),
                None => cond.never = true,
            },
            "max-width" => match parse_px(value) {
                Some(px) => cond.max_width = Some(px),
                None => cond.never = true,
            },
            _ => cond.never = true,
        }
    }
    cond
}

/// Parse a `<length>` in px, em, or rem into px (16px font base)
pub fn parse_px(value: &str) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(n) = v.strip_suffix("px") {
        return n.trim().parse::<f32>().ok();
    }
    if let Some(n) = v.strip_suffix("rem") {
        return n.trim().parse::<f32>().ok().map(|x| x * 16.0);
    }
    if let Some(n) = v.strip_suffix("em") {
        return n.trim().parse::<f32>().ok().map(|x| x * 16.0);
    }
    if v == "0" {
        return Some(0.0);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_rules_and_media_blocks() {
        let css = r#"
            /* palette */
            body { margin: 0; background: #0f1420; }
            .container, .footer { padding: 48px; }
            @media (max-width: 767px) {
                .container { padding: 24px !important; }
            }
            @font-face { font-family: "X"; src: url(x.woff2); }
        "#;
        let sheet = parse_stylesheet(css, 0);
        assert_eq!(sheet.rules.len(), 4);
        assert_eq!(sheet.rules[0].selector_text, "body");
        assert_eq!(sheet.rules[1].selector_text, ".container");
        assert_eq!(sheet.rules[2].selector_text, ".footer");
        let media_rule = &sheet.rules[3];
        assert!(media_rule.declarations[0].important);
        let cond = media_rule.media.unwrap();
        assert!(cond.matches(375));
        assert!(!cond.matches(768));
    }

    #[test]
    fn specificity_orders_id_class_type() {
        assert!(specificity("#hello") > specificity(".greeting"));
        assert!(specificity(".greeting") > specificity("div"));
        assert_eq!(specificity("div.info-row"), 11);
        assert_eq!(specificity("a:hover"), 11);
        assert_eq!(specificity("[data-x]"), 10);
    }

    #[test]
    fn unknown_media_features_never_match() {
        let css = "@media (prefers-reduced-motion: reduce) { body { margin: 8px; } }";
        let sheet = parse_stylesheet(css, 0);
        assert_eq!(sheet.rules.len(), 1);
        assert!(!sheet.rules[0].media.unwrap().matches(1280));
    }

    #[test]
    fn px_lengths_resolve() {
        assert_eq!(parse_px("42px"), Some(42.0));
        assert_eq!(parse_px("2rem"), Some(32.0));
        assert_eq!(parse_px("0"), Some(0.0));
        assert_eq!(parse_px("row"), None);
    }
}
