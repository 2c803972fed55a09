//! Static HTTP-backed rendering surface (default backend).
//!
//! Fetches the page with a blocking client, parses the DOM, resolves
//! computed styles with the in-crate cascade, and lays the page out for the
//! current viewport. Every fact query recomputes from the parsed inputs, so
//! viewport changes and hover simulation have no hidden state beyond the
//! fields that model them.

use std::collections::HashSet;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::css::cascade::{self, ComputedStyle};
use crate::css::color::Rgba;
use crate::css::{parse_stylesheet, Stylesheet};
use crate::dom::DomSnapshot;
use crate::error::{Error, Result};
use crate::layout::{self, LayoutTree, Rect};
use crate::render::{paint, raster, Screenshot};
use crate::surface::{ScreenshotTarget, ScrollMetrics, Surface, WaitUntil};
use crate::{HarnessConfig, Viewport};

struct LoadedPage {
    url: String,
    document: Html,
    dom: DomSnapshot,
    sheets: Vec<Stylesheet>,
}

/// Pure-Rust `Surface` backend
pub struct StaticSurface {
    config: HarnessConfig,
    client: Client,
    viewport: Viewport,
    page: Option<LoadedPage>,
    hovered: HashSet<usize>,
}

impl StaticSurface {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {e}")))?;
        let viewport = config.viewport;
        Ok(Self {
            config,
            client,
            viewport,
            page: None,
            hovered: HashSet::new(),
        })
    }

    fn page(&self) -> Result<&LoadedPage> {
        self.page
            .as_ref()
            .ok_or_else(|| Error::ExtractionError("no document loaded".into()))
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", self.config.user_agent.clone());
        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send().map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout_ms)
            } else {
                Error::LoadError(format!("Failed to fetch {url}: {e}"))
            }
        })?;
        resp.text()
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {e}")))
    }

    /// Collect inline `<style>` blocks and, when `fetch_linked` is set,
    /// linked stylesheets resolved against the page URL.
    fn extract_styles(&self, document: &Html, base_url: &str, fetch_linked: bool) -> Vec<Stylesheet> {
        let mut sheets = Vec::new();
        let mut order = 0usize;

        let style_sel = Selector::parse("style").unwrap();
        for node in document.select(&style_sel) {
            let text = node.text().collect::<String>();
            if !text.trim().is_empty() {
                let sheet = parse_stylesheet(&text, order);
                order += sheet.rules.len();
                sheets.push(sheet);
            }
        }

        if fetch_linked {
            let link_sel = Selector::parse("link[rel=\"stylesheet\"]").unwrap();
            for node in document.select(&link_sel) {
                let Some(href) = node.value().attr("href") else { continue };
                let css_url = match url::Url::parse(base_url).and_then(|b| b.join(href)) {
                    Ok(u) => u.to_string(),
                    Err(_) => href.to_string(),
                };
                match self.fetch(&css_url) {
                    Ok(text) if !text.trim().is_empty() => {
                        let sheet = parse_stylesheet(&text, order);
                        order += sheet.rules.len();
                        sheets.push(sheet);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("failed to fetch stylesheet {css_url}: {e}"),
                }
            }
        }
        sheets
    }

    fn resolved(&self) -> Result<(Vec<ComputedStyle>, LayoutTree)> {
        let page = self.page()?;
        let styles = cascade::resolve_styles(
            &page.document,
            &page.sheets,
            self.viewport.width,
            &self.hovered,
        );
        let tree = layout::layout_document(&page.dom, &styles, self.viewport);
        Ok((styles, tree))
    }

    /// Snapshot index of the first element matching a selector
    fn index_of_first(&self, selector: &str) -> Result<Option<usize>> {
        let page = self.page()?;
        let sel = Selector::parse(selector)
            .map_err(|_| Error::ExtractionError(format!("invalid selector: {selector}")))?;
        let Some(matched) = page.document.select(&sel).next() else {
            return Ok(None);
        };
        let target = matched.id();
        Ok(cascade::document_elements(&page.document)
            .iter()
            .position(|el| el.id() == target))
    }
}

impl Surface for StaticSurface {
    fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<()> {
        let body = self.fetch(url)?;
        let document = Html::parse_document(&body);
        let dom = DomSnapshot::from_document(&document);
        let sheets = self.extract_styles(&document, url, wait == WaitUntil::NetworkIdle);
        self.page = Some(LoadedPage {
            url: url.to_string(),
            document,
            dom,
            sheets,
        });
        self.hovered.clear();
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport {}x{} is degenerate",
                viewport.width, viewport.height
            )));
        }
        self.viewport = viewport;
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn dom(&self) -> Result<DomSnapshot> {
        Ok(self.page()?.dom.clone())
    }

    fn computed_style(&self, selector: &str, property: &str) -> Result<Option<String>> {
        let Some(idx) = self.index_of_first(selector)? else {
            return Ok(None);
        };
        self.computed_style_of(idx, property)
    }

    fn computed_style_of(&self, element: usize, property: &str) -> Result<Option<String>> {
        let (styles, _) = self.resolved()?;
        Ok(styles.get(element).and_then(|s| s.get(property)))
    }

    fn bounding_box(&self, selector: &str) -> Result<Option<Rect>> {
        let Some(idx) = self.index_of_first(selector)? else {
            return Ok(None);
        };
        let (_, tree) = self.resolved()?;
        Ok(tree.rect(idx))
    }

    fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        let (_, tree) = self.resolved()?;
        Ok(tree.scroll_metrics())
    }

    fn hover(&mut self, selector: &str) -> Result<()> {
        let Some(idx) = self.index_of_first(selector)? else {
            return Err(Error::ExtractionError(format!(
                "nothing matches hover target {selector}"
            )));
        };
        self.hovered.insert(idx);
        Ok(())
    }

    fn clear_hover(&mut self) -> Result<()> {
        self.hovered.clear();
        Ok(())
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        // The static backend has no focus ring to move; key presses only
        // matter to the CDP backend.
        debug!("ignoring key press {key} on static surface");
        Ok(())
    }

    fn screenshot(&self, target: &ScreenshotTarget) -> Result<Screenshot> {
        let (styles, tree) = self.resolved()?;
        let page = self.page()?;
        let background = page
            .dom
            .by_tag("body")
            .first()
            .and_then(|&b| styles[b].background_color)
            .unwrap_or(Rgba::WHITE);
        let metrics = tree.scroll_metrics();
        let commands = paint::build_display_list(&page.dom, &styles, &tree);
        let full = raster::rasterize(
            metrics.scroll_width,
            metrics.scroll_height,
            background,
            &commands,
        )?;
        match target {
            ScreenshotTarget::Page => Ok(full),
            ScreenshotTarget::Element(selector) => {
                let Some(idx) = self.index_of_first(selector)? else {
                    return Err(Error::RenderError(format!(
                        "nothing matches screenshot target {selector}"
                    )));
                };
                let rect = tree.rect(idx).ok_or_else(|| {
                    Error::RenderError(format!("{selector} has no rendered box"))
                })?;
                raster::crop(&full, rect)
            }
        }
    }

    fn probe(&self, url: &str) -> Result<Option<u16>> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", self.config.user_agent.clone())
            .send()
            .map_err(|e| Error::NetworkError(format!("probe of {url} failed: {e}")))?;
        Ok(Some(resp.status().as_u16()))
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

impl StaticSurface {
    /// URL of the currently loaded page
    pub fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_once(html: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        std::thread::spawn(move || {
            while let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string(html);
                let _ = request.respond(response);
            }
        });
        format!("http://{addr}")
    }

    const PAGE: &str = "<html><head><title>S</title><style>body{margin:0;background:#0f1420;color:#e8ecf1} h1{font-size:42px} @media (max-width:767px){ h1{font-size:32px} }</style></head><body><h1>Hello</h1></body></html>";

    #[test]
    fn navigate_and_read_computed_styles() {
        let url = serve_once(PAGE);
        let mut surface = StaticSurface::new(HarnessConfig::default()).expect("create surface");
        surface.navigate(&url, WaitUntil::NetworkIdle).expect("load");

        assert_eq!(
            surface.computed_style("h1", "font-size").unwrap().as_deref(),
            Some("42px")
        );
        surface
            .set_viewport(Viewport { width: 375, height: 667 })
            .unwrap();
        assert_eq!(
            surface.computed_style("h1", "font-size").unwrap().as_deref(),
            Some("32px")
        );
        assert_eq!(
            surface.computed_style("body", "background-color").unwrap().as_deref(),
            Some("#0f1420")
        );
    }

    #[test]
    fn screenshot_is_stable_across_calls() {
        let url = serve_once(PAGE);
        let mut surface = StaticSurface::new(HarnessConfig::default()).expect("create surface");
        surface.navigate(&url, WaitUntil::NetworkIdle).expect("load");
        let a = surface.screenshot(&ScreenshotTarget::Page).unwrap();
        let b = surface.screenshot(&ScreenshotTarget::Page).unwrap();
        assert!(a.is_png());
        assert_eq!(a.png_data, b.png_data);
    }

    #[test]
    fn hover_switches_pseudo_class_rules() {
        let url = serve_once(
            "<html><head><title>H</title><style>a{color:#7aa2f7} a:hover{color:#a8c0fa}</style></head><body><a href=\"#x\" id=\"x\">link</a></body></html>",
        );
        let mut surface = StaticSurface::new(HarnessConfig::default()).expect("create surface");
        surface.navigate(&url, WaitUntil::NetworkIdle).expect("load");

        assert_eq!(
            surface.computed_style("a", "color").unwrap().as_deref(),
            Some("#7aa2f7")
        );
        surface.hover("a").expect("hover");
        assert_eq!(
            surface.computed_style("a", "color").unwrap().as_deref(),
            Some("#a8c0fa")
        );
        surface.clear_hover().expect("clear hover");
        assert_eq!(
            surface.computed_style("a", "color").unwrap().as_deref(),
            Some("#7aa2f7")
        );
        // Key presses are accepted but have no effect on a static render.
        surface.press_key("Tab").expect("key press");
    }

    #[test]
    fn missing_document_is_an_extraction_error() {
        let surface = StaticSurface::new(HarnessConfig::default()).expect("create surface");
        assert!(matches!(
            surface.scroll_metrics(),
            Err(Error::ExtractionError(_))
        ));
    }
}
