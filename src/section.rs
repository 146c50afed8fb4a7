//! Section model: what the controller knows about each content section.

use serde::{Deserialize, Serialize};

pub const LAYER_COUNT: usize = 3;

/// Target state of one background layer while a section is active.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer {
    /// Horizontal offset in percent of the layer's own size.
    pub x: f64,
    /// Vertical offset in percent of the layer's own size.
    pub y: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

pub type BackgroundKeyframes = [Layer; LAYER_COUNT];

/// Parses the `data-bg-position` payload.
///
/// Each layer falls back field by field, missing trailing layers fall back
/// whole, and anything that is not a JSON array of layer objects yields the
/// all-default triplet.
pub fn parse_keyframes(raw: Option<&str>) -> BackgroundKeyframes {
    let mut keyframes = BackgroundKeyframes::default();
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return keyframes;
    };
    match serde_json::from_str::<Vec<Layer>>(raw) {
        Ok(layers) => {
            for (slot, layer) in keyframes.iter_mut().zip(layers) {
                *slot = layer;
            }
        }
        Err(err) => {
            tracing::debug!(%err, "ignoring malformed background keyframes");
        }
    }
    keyframes
}

/// Read-only view of a section's markup, implemented over the DOM in the
/// browser and over plain structs in tests.
pub trait SectionNode {
    type Handle: Clone;

    fn handle(&self) -> Self::Handle;
    /// Value of the `data-{key}` attribute.
    fn data(&self, key: &str) -> Option<String>;
    fn element_id(&self) -> Option<String>;
    fn has_class(&self, class: &str) -> bool;
    /// The nested content element and its scroll height in pixels.
    fn content(&self) -> Option<(Self::Handle, f64)>;
}

/// Inputs to [`parse_section`] that come from the page rather than the node.
#[derive(Clone, Copy, Debug)]
pub struct Measure<'a> {
    pub viewport_height: f64,
    pub viewport_ratio: f64,
    pub tall_class: &'a str,
}

#[derive(Clone, Debug)]
pub struct SectionDescriptor<H> {
    pub id: String,
    pub root: H,
    pub is_tall: bool,
    pub background: BackgroundKeyframes,
    /// Element that scrolls internally; only set for tall sections.
    pub scrollable_region: Option<H>,
}

impl<H> SectionDescriptor<H> {
    /// The element whose scroll offset gates transitions.
    pub fn scroll_target(&self) -> Option<&H> {
        self.scrollable_region.as_ref()
    }
}

pub fn parse_section<N: SectionNode>(
    node: &N,
    index: usize,
    measure: Measure<'_>,
) -> SectionDescriptor<N::Handle> {
    let id = node
        .data("section-id")
        .filter(|id| !id.is_empty())
        .or_else(|| node.element_id().filter(|id| !id.is_empty()))
        .unwrap_or_else(|| format!("section-{index}"));

    let flagged = node.has_class(measure.tall_class);
    let content = node.content();
    let overflows = content
        .as_ref()
        .is_some_and(|(_, height)| *height > measure.viewport_height * measure.viewport_ratio);
    let is_tall = flagged || overflows;

    let scrollable_region = match content {
        Some((handle, _)) if overflows => Some(handle),
        _ if is_tall => Some(node.handle()),
        _ => None,
    };

    SectionDescriptor {
        id,
        root: node.handle(),
        is_tall,
        background: parse_keyframes(node.data("bg-position").as_deref()),
        scrollable_region,
    }
}

/// Makes section ids unique by suffixing repeats with their index.
pub fn dedupe_ids<H>(sections: &mut [SectionDescriptor<H>]) {
    let mut seen = std::collections::HashSet::new();
    for (index, section) in sections.iter_mut().enumerate() {
        if !seen.insert(section.id.clone()) {
            let renamed = format!("{}-{index}", section.id);
            tracing::warn!(id = %section.id, %renamed, "duplicate section id");
            section.id = renamed.clone();
            seen.insert(renamed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeNode {
        handle: u32,
        section_id: Option<&'static str>,
        element_id: Option<&'static str>,
        classes: Vec<&'static str>,
        bg: Option<&'static str>,
        content: Option<(u32, f64)>,
    }

    impl SectionNode for FakeNode {
        type Handle = u32;

        fn handle(&self) -> u32 {
            self.handle
        }

        fn data(&self, key: &str) -> Option<String> {
            match key {
                "section-id" => self.section_id.map(str::to_owned),
                "bg-position" => self.bg.map(str::to_owned),
                _ => None,
            }
        }

        fn element_id(&self) -> Option<String> {
            self.element_id.map(str::to_owned)
        }

        fn has_class(&self, class: &str) -> bool {
            self.classes.contains(&class)
        }

        fn content(&self) -> Option<(u32, f64)> {
            self.content
        }
    }

    const MEASURE: Measure<'static> = Measure {
        viewport_height: 800.0,
        viewport_ratio: 0.9,
        tall_class: "parallax-section--tall",
    };

    #[test]
    fn empty_layer_objects_resolve_to_defaults() {
        let kf = parse_keyframes(Some("[{},{},{}]"));
        for layer in kf {
            assert_eq!(
                layer,
                Layer {
                    x: 0.0,
                    y: 0.0,
                    scale: 1.0,
                    opacity: 1.0
                }
            );
        }
    }

    #[test]
    fn fields_default_independently() {
        let kf = parse_keyframes(Some(r#"[{"x":5},{"y":-20,"opacity":0.4},{"scale":1.3}]"#));
        assert_eq!(kf[0], Layer { x: 5.0, ..Layer::default() });
        assert_eq!(
            kf[1],
            Layer {
                y: -20.0,
                opacity: 0.4,
                ..Layer::default()
            }
        );
        assert_eq!(kf[2].scale, 1.3);
        assert_eq!(kf[2].opacity, 1.0);
    }

    #[test]
    fn short_arrays_pad_and_long_arrays_truncate() {
        let kf = parse_keyframes(Some(r#"[{"y":10}]"#));
        assert_eq!(kf[0].y, 10.0);
        assert_eq!(kf[1], Layer::default());
        let kf = parse_keyframes(Some(r#"[{},{},{},{"y":99}]"#));
        assert!(kf.iter().all(|l| *l == Layer::default()));
    }

    #[test]
    fn malformed_payloads_fall_back_silently() {
        for raw in [
            Some("not json"),
            Some(r#"{"x":0,"y":0,"scale":1}"#),
            Some(r#"[{"x":"left"}]"#),
            Some(""),
            None,
        ] {
            assert_eq!(parse_keyframes(raw), BackgroundKeyframes::default());
        }
    }

    #[test]
    fn short_section_has_no_scroll_region() {
        let node = FakeNode {
            handle: 1,
            section_id: Some("hero"),
            content: Some((2, 400.0)),
            ..FakeNode::default()
        };
        let section = parse_section(&node, 0, MEASURE);
        assert_eq!(section.id, "hero");
        assert!(!section.is_tall);
        assert!(section.scroll_target().is_none());
    }

    #[test]
    fn overflowing_content_becomes_the_scroll_region() {
        let node = FakeNode {
            handle: 1,
            section_id: Some("ingredients"),
            content: Some((2, 721.0)),
            ..FakeNode::default()
        };
        let section = parse_section(&node, 0, MEASURE);
        assert!(section.is_tall);
        assert_eq!(section.scroll_target(), Some(&2));
    }

    #[test]
    fn class_flag_marks_tall_and_scrolls_the_root() {
        let node = FakeNode {
            handle: 7,
            classes: vec!["parallax-section--tall"],
            ..FakeNode::default()
        };
        let section = parse_section(&node, 3, MEASURE);
        assert!(section.is_tall);
        assert_eq!(section.scroll_target(), Some(&7));
        assert_eq!(section.id, "section-3");
    }

    #[test]
    fn id_falls_back_to_element_id() {
        let node = FakeNode {
            element_id: Some("faq"),
            section_id: Some(""),
            ..FakeNode::default()
        };
        assert_eq!(parse_section(&node, 0, MEASURE).id, "faq");
    }

    #[test]
    fn duplicate_ids_get_suffixed() {
        let node = FakeNode {
            section_id: Some("a"),
            ..FakeNode::default()
        };
        let mut sections = vec![
            parse_section(&node, 0, MEASURE),
            parse_section(&node, 1, MEASURE),
        ];
        dedupe_ids(&mut sections);
        assert_eq!(sections[0].id, "a");
        assert_eq!(sections[1].id, "a-1");
    }
}
