use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, ScrollBehavior, ScrollToOptions, Window,
};

use super::js_err;
use crate::background::BackgroundSurface;
use crate::config::{ControllerConfig, Selectors};
use crate::error::{ScrollError, ScrollResult};
use crate::section::{self, Layer, Measure, SectionDescriptor, SectionNode};
use crate::stage::{Placement, ScrollMetrics, Stage};

pub(super) fn set_style(el: &HtmlElement, property: &str, value: &str) {
    if let Err(err) = el.style().set_property(property, value) {
        tracing::warn!(property, ?err, "failed to set style");
    }
}

fn clear_style(el: &HtmlElement, property: &str) {
    if let Err(err) = el.style().remove_property(property) {
        tracing::warn!(property, ?err, "failed to clear style");
    }
}

/// Every element under `root` matching `selector`, skipping non-HTML nodes.
pub(super) fn select_all(root: &Element, selector: &str) -> Vec<HtmlElement> {
    let list = match root.query_selector_all(selector) {
        Ok(list) => list,
        Err(err) => {
            tracing::warn!(selector, ?err, "bad selector");
            return Vec::new();
        }
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect()
}

struct DomSection<'a> {
    element: HtmlElement,
    content_selector: &'a str,
}

impl SectionNode for DomSection<'_> {
    type Handle = HtmlElement;

    fn handle(&self) -> HtmlElement {
        self.element.clone()
    }

    fn data(&self, key: &str) -> Option<String> {
        self.element.get_attribute(&format!("data-{key}"))
    }

    fn element_id(&self) -> Option<String> {
        Some(self.element.id()).filter(|id| !id.is_empty())
    }

    fn has_class(&self, class: &str) -> bool {
        self.element.class_list().contains(class)
    }

    fn content(&self) -> Option<(HtmlElement, f64)> {
        let content = self
            .element
            .query_selector(self.content_selector)
            .ok()
            .flatten()?
            .dyn_into::<HtmlElement>()
            .ok()?;
        let height = f64::from(content.scroll_height());
        Some((content, height))
    }
}

pub fn scan_sections(
    window: &Window,
    document: &Document,
    config: &ControllerConfig,
) -> ScrollResult<Vec<SectionDescriptor<HtmlElement>>> {
    let root = document
        .document_element()
        .ok_or_else(|| ScrollError::missing("documentElement"))?;
    let viewport_height = window
        .inner_height()
        .map_err(js_err)?
        .as_f64()
        .unwrap_or(0.0);
    let measure = Measure {
        viewport_height,
        viewport_ratio: config.tall.viewport_ratio,
        tall_class: &config.selectors.tall_class,
    };

    let mut sections: Vec<_> = select_all(&root, &config.selectors.section)
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            let node = DomSection {
                element,
                content_selector: &config.selectors.content,
            };
            section::parse_section(&node, index, measure)
        })
        .collect();
    section::dedupe_ids(&mut sections);
    Ok(sections)
}

pub struct DomStage {
    document: Document,
    progress_id: String,
    animate_item: String,
    layers: Vec<Option<HtmlElement>>,
    progress: Option<HtmlElement>,
}

impl DomStage {
    pub fn new(document: Document, selectors: &Selectors) -> ScrollResult<Self> {
        let bg_root = document
            .query_selector(&selectors.background_root)
            .map_err(js_err)?;
        if bg_root.is_none() {
            tracing::debug!(selector = %selectors.background_root, "no background container");
        }
        let layers = selectors
            .background_layers
            .iter()
            .map(|sel| {
                bg_root
                    .as_ref()?
                    .query_selector(sel)
                    .ok()
                    .flatten()?
                    .dyn_into::<HtmlElement>()
                    .ok()
            })
            .collect();
        Ok(Self {
            document,
            progress_id: selectors.progress_id.clone(),
            animate_item: selectors.animate_item.clone(),
            layers,
            progress: None,
        })
    }

    fn page_roots(&self) -> Vec<HtmlElement> {
        let mut roots = Vec::with_capacity(2);
        if let Some(body) = self.document.body() {
            roots.push(body);
        }
        if let Some(html) = self
            .document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            roots.push(html);
        }
        roots
    }
}

fn scroll_region(section: &SectionDescriptor<HtmlElement>) -> Option<&HtmlElement> {
    section.scroll_target()
}

impl BackgroundSurface for DomStage {
    fn apply_layer(&mut self, layer: usize, state: &Layer) {
        let Some(Some(el)) = self.layers.get(layer) else {
            return;
        };
        set_style(
            el,
            "transform",
            &format!("translate({}%, {}%) scale({})", state.x, state.y, state.scale),
        );
        set_style(el, "opacity", &state.opacity.to_string());
    }
}

impl Stage for DomStage {
    type Root = HtmlElement;

    fn lock_page(&mut self, locked: bool) {
        for root in self.page_roots() {
            if locked {
                set_style(&root, "overflow", "hidden");
            } else {
                clear_style(&root, "overflow");
            }
        }
    }

    fn place(&mut self, section: &SectionDescriptor<HtmlElement>, placement: Placement) {
        let el = &section.root;
        set_style(el, "position", "fixed");
        set_style(el, "left", "0");
        set_style(el, "width", "100%");
        set_style(el, "height", "100vh");
        set_style(el, "top", &format!("{}%", placement.offset));
        set_style(el, "z-index", &placement.z_index.to_string());
        set_style(el, "visibility", "visible");

        let root_scrolls = scroll_region(section).is_some_and(|region| region == el);
        set_style(el, "overflow-y", if root_scrolls { "auto" } else { "hidden" });
        if let Some(region) = scroll_region(section).filter(|region| *region != el) {
            set_style(region, "height", "100%");
            set_style(region, "overflow-y", "auto");
        }
    }

    fn set_active(&mut self, section: &SectionDescriptor<HtmlElement>, active: bool) {
        let el = &section.root;
        if active {
            clear_style(el, "pointer-events");
            if let Err(err) = el.remove_attribute("aria-hidden") {
                tracing::warn!(?err, "failed to clear aria-hidden");
            }
        } else {
            set_style(el, "pointer-events", "none");
            if let Err(err) = el.set_attribute("aria-hidden", "true") {
                tracing::warn!(?err, "failed to set aria-hidden");
            }
        }
    }

    fn set_offset(&mut self, section: &SectionDescriptor<HtmlElement>, percent: f64) {
        set_style(&section.root, "top", &format!("{percent}%"));
    }

    fn scroll_metrics(&self, section: &SectionDescriptor<HtmlElement>) -> ScrollMetrics {
        let Some(region) = scroll_region(section) else {
            return ScrollMetrics::default();
        };
        ScrollMetrics {
            top: f64::from(region.scroll_top()),
            height: f64::from(region.scroll_height()),
            client_height: f64::from(region.client_height()),
        }
    }

    fn scroll_by(&mut self, section: &SectionDescriptor<HtmlElement>, delta: f64) {
        let Some(region) = scroll_region(section) else {
            return;
        };
        let options = ScrollToOptions::new();
        options.set_top(delta);
        options.set_behavior(ScrollBehavior::Smooth);
        region.scroll_by_with_scroll_to_options(&options);
    }

    fn reset_scroll(&mut self, section: &SectionDescriptor<HtmlElement>) {
        if let Some(region) = scroll_region(section) {
            region.set_scroll_top(0);
        }
    }

    fn prepare_entry(&mut self, section: &SectionDescriptor<HtmlElement>) {
        for item in select_all(&section.root, &self.animate_item) {
            set_style(&item, "opacity", "0");
            set_style(&item, "transform", "translateY(40px)");
        }
    }

    fn mount_progress(&mut self) {
        if self.progress.is_some() {
            return;
        }
        let Some(body) = self.document.body() else {
            tracing::warn!("no body; progress indicator skipped");
            return;
        };
        let bar = match self
            .document
            .create_element("div")
            .map(|el| el.unchecked_into::<HtmlElement>())
        {
            Ok(bar) => bar,
            Err(err) => {
                tracing::warn!(?err, "failed to create progress indicator");
                return;
            }
        };
        bar.set_id(&self.progress_id);
        bar.set_class_name("scroll-progress");
        set_style(&bar, "position", "fixed");
        set_style(&bar, "top", "0");
        set_style(&bar, "left", "0");
        if let Err(err) = body.append_child(&bar) {
            tracing::warn!(?err, "failed to mount progress indicator");
            return;
        }
        self.progress = Some(bar);
    }

    fn render_progress(&mut self, fraction: f64) {
        if let Some(bar) = &self.progress {
            set_style(bar, "width", &format!("{}%", fraction * 100.0));
        }
    }

    fn unmount_progress(&mut self) {
        if let Some(bar) = self.progress.take() {
            bar.remove();
        }
    }
}
