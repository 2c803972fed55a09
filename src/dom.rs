//! Backend-independent snapshot of a rendered document's element tree.
//!
//! Elements are flattened depth-first in document order so that any backend
//! (static or CDP) produces the same indexable table. Checks work against
//! this table instead of backend-specific node handles.

use std::collections::HashMap;

use scraper::Html;

/// One element in document order
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    /// Text content of the element's subtree, whitespace-collapsed
    pub text: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// A short selector-like locator for failure reports, e.g. `a#contact`
    /// or `div.info-row`.
    pub fn locator(&self) -> String {
        if let Some(id) = &self.id {
            format!("{}#{}", self.tag, id)
        } else if let Some(class) = self.classes.first() {
            format!("{}.{}", self.tag, class)
        } else {
            self.tag.clone()
        }
    }
}

/// Flattened element table for a rendered document
#[derive(Debug, Clone, Default)]
pub struct DomSnapshot {
    pub elements: Vec<ElementInfo>,
}

impl DomSnapshot {
    /// Build a snapshot by depth-first traversal of a parsed document,
    /// preserving document order.
    pub fn from_document(document: &Html) -> Self {
        let mut elements: Vec<ElementInfo> = Vec::new();
        let root = document.root_element();
        let mut stack: Vec<(scraper::ElementRef, Option<usize>)> = vec![(root, None)];
        while let Some((node, parent_idx)) = stack.pop() {
            let value = node.value();
            let idx = elements.len();
            let info = ElementInfo {
                tag: value.name().to_string(),
                id: value.attr("id").map(|s| s.to_string()),
                classes: value
                    .attr("class")
                    .map(|c| c.split_whitespace().map(|s| s.to_string()).collect())
                    .unwrap_or_default(),
                attrs: value
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                text: collapse_whitespace(&node.text().collect::<String>()),
                parent: parent_idx,
                children: Vec::new(),
            };
            if let Some(p) = parent_idx {
                elements[p].children.push(idx);
            }
            elements.push(info);

            // Push children in reverse so the traversal keeps document order.
            let children: Vec<_> = node
                .children()
                .filter_map(scraper::ElementRef::wrap)
                .collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        DomSnapshot { elements }
    }

    pub fn get(&self, index: usize) -> Option<&ElementInfo> {
        self.elements.get(index)
    }

    /// Indices of all elements with the given tag name
    pub fn by_tag(&self, tag: &str) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tag == tag)
            .map(|(i, _)| i)
            .collect()
    }

    /// First element carrying the given id attribute
    pub fn by_id(&self, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
    }

    /// Indices of all anchor elements
    pub fn anchors(&self) -> Vec<usize> {
        self.by_tag("a")
    }

    /// Headings in document order as (index, level) pairs
    pub fn headings(&self) -> Vec<(usize, u8)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e.tag.as_str() {
                "h1" => Some((i, 1)),
                "h2" => Some((i, 2)),
                "h3" => Some((i, 3)),
                "h4" => Some((i, 4)),
                "h5" => Some((i, 5)),
                "h6" => Some((i, 6)),
                _ => None,
            })
            .collect()
    }

    /// Ids that appear on more than one element
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for e in &self.elements {
            if let Some(id) = e.id.as_deref() {
                *counts.entry(id).or_default() += 1;
            }
        }
        let mut dups: Vec<String> = counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, _)| id.to_string())
            .collect();
        dups.sort();
        dups
    }

    /// The accessible name of an element: `aria-label`, then the element
    /// referenced by `aria-labelledby`, then subtree text, then a descendant
    /// image's alt text, then the `title` attribute.
    pub fn accessible_name(&self, index: usize) -> String {
        let el = match self.get(index) {
            Some(e) => e,
            None => return String::new(),
        };
        if let Some(label) = el.attr("aria-label") {
            let label = label.trim();
            if !label.is_empty() {
                return label.to_string();
            }
        }
        if let Some(target) = el.attr("aria-labelledby") {
            if let Some(ref_idx) = self.by_id(target.trim()) {
                let text = self.elements[ref_idx].text.trim();
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
        if !el.text.trim().is_empty() {
            return el.text.trim().to_string();
        }
        for &child in &el.children {
            let c = &self.elements[child];
            if c.tag == "img" {
                if let Some(alt) = c.attr("alt") {
                    if !alt.trim().is_empty() {
                        return alt.trim().to_string();
                    }
                }
            }
        }
        el.attr("title").unwrap_or_default().trim().to_string()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(html: &str) -> DomSnapshot {
        DomSnapshot::from_document(&Html::parse_document(html))
    }

    #[test]
    fn traversal_preserves_document_order() {
        let dom = snapshot(
            "<html><head><title>T</title></head><body><h1>A</h1><p>B</p></body></html>",
        );
        let tags: Vec<&str> = dom.elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["html", "head", "title", "body", "h1", "p"]);
        let h1 = dom.by_tag("h1")[0];
        assert_eq!(dom.elements[h1].text, "A");
        let body = dom.by_tag("body")[0];
        assert_eq!(dom.elements[h1].parent, Some(body));
    }

    #[test]
    fn duplicate_ids_are_reported_once() {
        let dom = snapshot(
            "<html><body><div id=\"x\"></div><span id=\"x\"></span><p id=\"y\"></p></body></html>",
        );
        assert_eq!(dom.duplicate_ids(), vec!["x".to_string()]);
    }

    #[test]
    fn accessible_name_prefers_aria_label() {
        let dom = snapshot(
            "<html><body><a href=\"#a\" aria-label=\"Contact us\">x</a><a href=\"#b\"><img src=\"i.png\" alt=\"Logo\"></a></body></html>",
        );
        let anchors = dom.anchors();
        assert_eq!(dom.accessible_name(anchors[0]), "Contact us");
        assert_eq!(dom.accessible_name(anchors[1]), "Logo");
    }

    #[test]
    fn headings_carry_levels() {
        let dom = snapshot("<html><body><h1>a</h1><h2>b</h2><h2>c</h2></body></html>");
        let levels: Vec<u8> = dom.headings().iter().map(|(_, l)| *l).collect();
        assert_eq!(levels, vec![1, 2, 2]);
    }
}
