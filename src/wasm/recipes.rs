//! Browser animation recipes: configured per section id, played on the
//! shared [`Timeline`] clock.

use std::ops::Range;

use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, HtmlImageElement};

use super::dom::{select_all, set_style};
use crate::config::{ControllerConfig, Recipe};
use crate::ease::Ease;
use crate::registry::{AnimationHandle, AnimationPair, AnimationRegistry, Completion, Notifier};
use crate::timeline::{Timeline, Tween};

const WAVE_DURATION: f64 = 0.5;
const WAVE_RISE_PERCENT: f64 = 200.0;
const FADE_UP_DURATION: f64 = 0.6;
const FADE_UP_OFFSET_PX: f64 = 40.0;
const FADE_OUT_DURATION: f64 = 0.4;
const SLIDE_DURATION: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prop {
    Opacity,
    /// Pixels.
    Y,
    YPercent,
    XPercent,
}

#[derive(Clone, Copy, Debug)]
struct Track {
    target: usize,
    prop: Prop,
}

#[derive(Debug)]
enum Cue {
    ShowImages(Range<usize>),
    HideImages(Range<usize>),
}

/// Last written value of each animated property of one target.
#[derive(Clone, Copy, Debug, Default)]
struct Pose {
    opacity: Option<f64>,
    y: Option<f64>,
    y_percent: Option<f64>,
    x_percent: Option<f64>,
}

impl Pose {
    fn set(&mut self, prop: Prop, value: f64) {
        let slot = match prop {
            Prop::Opacity => &mut self.opacity,
            Prop::Y => &mut self.y,
            Prop::YPercent => &mut self.y_percent,
            Prop::XPercent => &mut self.x_percent,
        };
        *slot = Some(value);
    }

    fn transform(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.x_percent.is_some() || self.y_percent.is_some() {
            parts.push(format!(
                "translate({}%, {}%)",
                self.x_percent.unwrap_or(0.0),
                self.y_percent.unwrap_or(0.0)
            ));
        }
        if let Some(y) = self.y {
            parts.push(format!("translateY({y}px)"));
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

struct Split {
    element: HtmlElement,
    markup: String,
}

fn escape_html(c: char) -> String {
    match c {
        '&' => "&amp;".into(),
        '<' => "&lt;".into(),
        '>' => "&gt;".into(),
        c => c.to_string(),
    }
}

/// Replaces the element's content with one inline-block span per visible
/// character and returns the spans. Whitespace stays as plain text so lines
/// still wrap.
fn split_chars(element: &HtmlElement) -> (Split, Vec<HtmlElement>) {
    let markup = element.inner_html();
    let text = element.text_content().unwrap_or_default();
    let html: String = text
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                " ".to_owned()
            } else {
                format!(r#"<span style="display:inline-block">{}</span>"#, escape_html(c))
            }
        })
        .collect();
    element.set_inner_html(&html);
    let chars = select_all(element, ":scope > span");
    let split = Split {
        element: element.clone(),
        markup,
    };
    (split, chars)
}

#[derive(Default)]
struct Builder {
    targets: Vec<HtmlElement>,
    images: Vec<HtmlImageElement>,
    splits: Vec<Split>,
    tweens: Vec<Tween<Track>>,
    cues: Vec<(f64, Cue)>,
}

impl Builder {
    fn target(&mut self, element: HtmlElement) -> usize {
        self.targets.push(element);
        self.targets.len() - 1
    }

    #[allow(clippy::too_many_arguments)]
    fn tween(&mut self, target: usize, prop: Prop, from: f64, to: f64, at: f64, duration: f64, ease: Ease) {
        self.tweens.push(Tween {
            key: Track { target, prop },
            from,
            to,
            at,
            duration,
            ease,
        });
    }

    fn images(&mut self, root: &HtmlElement, selector: &str) -> Range<usize> {
        let start = self.images.len();
        self.images.extend(
            select_all(root, selector)
                .into_iter()
                .filter_map(|el| el.dyn_into::<HtmlImageElement>().ok()),
        );
        start..self.images.len()
    }

    fn add(&mut self, root: &HtmlElement, recipe: &Recipe) {
        match recipe {
            Recipe::WaveIn { selector, stagger } => {
                for element in select_all(root, selector) {
                    let (split, chars) = split_chars(&element);
                    self.splits.push(split);
                    for (i, ch) in chars.into_iter().enumerate() {
                        let at = i as f64 * stagger;
                        let t = self.target(ch);
                        self.tween(t, Prop::YPercent, WAVE_RISE_PERCENT, 0.0, at, WAVE_DURATION, Ease::OutBack);
                        self.tween(t, Prop::Opacity, 0.0, 1.0, at, WAVE_DURATION, Ease::OutQuad);
                    }
                }
            }
            Recipe::FadeUp { selector, stagger } => {
                for (i, element) in select_all(root, selector).into_iter().enumerate() {
                    let at = i as f64 * stagger;
                    let t = self.target(element);
                    self.tween(t, Prop::Y, FADE_UP_OFFSET_PX, 0.0, at, FADE_UP_DURATION, Ease::OutCubic);
                    self.tween(t, Prop::Opacity, 0.0, 1.0, at, FADE_UP_DURATION, Ease::OutCubic);
                }
            }
            Recipe::FadeOut { selector } => {
                for element in select_all(root, selector) {
                    let t = self.target(element);
                    self.tween(t, Prop::Opacity, 1.0, 0.0, 0.0, FADE_OUT_DURATION, Ease::InQuad);
                }
            }
            Recipe::SlideIn {
                selector,
                from_x_percent,
            } => {
                for element in select_all(root, selector) {
                    let t = self.target(element);
                    self.tween(t, Prop::XPercent, *from_x_percent, 0.0, 0.0, SLIDE_DURATION, Ease::OutCubic);
                    self.tween(t, Prop::Opacity, 0.0, 1.0, 0.0, SLIDE_DURATION, Ease::OutCubic);
                }
            }
            Recipe::RevealImages { selector, delay } => {
                let range = self.images(root, selector);
                self.cues.push((*delay, Cue::ShowImages(range)));
            }
            Recipe::HideImages { selector, delay } => {
                let range = self.images(root, selector);
                self.cues.push((*delay, Cue::HideImages(range)));
            }
        }
    }

    fn finish(self) -> DomAnimation {
        let initial = self.tweens.iter().map(|tw| (tw.key, tw.from)).collect();
        let mut timeline = Timeline::new();
        for tween in self.tweens {
            timeline = timeline.tween(tween);
        }
        for (at, cue) in self.cues {
            timeline = timeline.call(at, cue);
        }
        DomAnimation {
            poses: vec![Pose::default(); self.targets.len()],
            targets: self.targets,
            initial,
            images: self.images,
            splits: self.splits,
            timeline,
            done: Notifier::new(),
            reverted: false,
        }
    }
}

/// One section's entry or exit: every recipe in the list runs concurrently
/// and the completion fires once the longest of them ends.
pub struct DomAnimation {
    targets: Vec<HtmlElement>,
    poses: Vec<Pose>,
    /// Start values, rendered on play so staggered targets begin hidden.
    initial: Vec<(Track, f64)>,
    images: Vec<HtmlImageElement>,
    splits: Vec<Split>,
    timeline: Timeline<Track, Cue>,
    done: Notifier,
    reverted: bool,
}

impl DomAnimation {
    pub fn build(root: &HtmlElement, recipes: &[Recipe]) -> Self {
        let mut builder = Builder::default();
        for recipe in recipes {
            builder.add(root, recipe);
        }
        builder.finish()
    }

    fn render(&self, target: usize) {
        let (Some(element), Some(pose)) = (self.targets.get(target), self.poses.get(target)) else {
            return;
        };
        if let Some(opacity) = pose.opacity {
            set_style(element, "opacity", &opacity.to_string());
        }
        if let Some(transform) = pose.transform() {
            set_style(element, "transform", &transform);
        }
    }

    fn apply_cue(&self, cue: Cue) {
        match cue {
            Cue::ShowImages(range) => {
                for img in &self.images[range] {
                    if let Some(src) = img.get_attribute("data-src") {
                        img.set_src(&src);
                    }
                    set_style(img, "display", "block");
                }
            }
            Cue::HideImages(range) => {
                for img in &self.images[range] {
                    set_style(img, "display", "none");
                }
            }
        }
    }
}

impl AnimationHandle for DomAnimation {
    fn play(&mut self, now: f64) -> Completion {
        if !self.reverted && !self.timeline.is_started() {
            for (track, value) in &self.initial {
                self.poses[track.target].set(track.prop, *value);
            }
            for target in 0..self.targets.len() {
                self.render(target);
            }
            self.timeline.start(now);
            self.tick(now);
        }
        self.done.subscribe()
    }

    fn tick(&mut self, now: f64) {
        if self.reverted || self.done.is_fired() || !self.timeline.is_started() {
            return;
        }
        let frame = self.timeline.sample(now);
        let mut dirty = vec![false; self.targets.len()];
        for (track, value) in frame.values {
            self.poses[track.target].set(track.prop, value);
            dirty[track.target] = true;
        }
        for (target, _) in dirty.iter().enumerate().filter(|(_, d)| **d) {
            self.render(target);
        }
        for cue in frame.cues {
            self.apply_cue(cue);
        }
        if frame.finished {
            self.done.notify();
        }
    }

    fn is_finished(&self) -> bool {
        self.done.is_fired()
    }

    /// Restores split text to its original markup and stops the run. Inline
    /// styles stay where the last frame left them.
    fn revert(&mut self) {
        if self.reverted {
            return;
        }
        self.reverted = true;
        for split in self.splits.drain(..) {
            split.element.set_inner_html(&split.markup);
        }
        self.done.notify();
    }
}

pub fn registry_from_config(config: &ControllerConfig) -> AnimationRegistry<HtmlElement> {
    let mut registry = AnimationRegistry::new();
    for (id, spec) in &config.animations {
        let entry = spec.entry.clone();
        let exit = spec.exit.clone();
        registry.register(
            id.clone(),
            AnimationPair::new(
                move |root: &HtmlElement| {
                    Box::new(DomAnimation::build(root, &entry)) as Box<dyn AnimationHandle>
                },
                move |root: &HtmlElement| {
                    Box::new(DomAnimation::build(root, &exit)) as Box<dyn AnimationHandle>
                },
            ),
        );
    }
    tracing::debug!(sections = config.animations.len(), "animation recipes registered");
    registry
}

#[cfg(test)]
mod tests {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::HtmlElement;

    use super::DomAnimation;
    use crate::config::Recipe;
    use crate::registry::AnimationHandle;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mount(markup: &str) -> HtmlElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let root: HtmlElement = document.create_element("section").unwrap().unchecked_into();
        root.set_inner_html(markup);
        document.body().unwrap().append_child(&root).unwrap();
        root
    }

    fn opacity(el: &HtmlElement) -> String {
        el.style().get_property_value("opacity").unwrap()
    }

    #[wasm_bindgen_test]
    fn wave_in_splits_characters_and_revert_restores_markup() {
        let root = mount(r#"<h2>Hi <b>yo</b></h2>"#);
        let title: HtmlElement = root.query_selector("h2").unwrap().unwrap().unchecked_into();
        let original = title.inner_html();

        let mut wave = DomAnimation::build(
            &root,
            &[Recipe::WaveIn {
                selector: "h2".into(),
                stagger: 0.1,
            }],
        );
        assert_eq!(title.children().length(), 4);
        let chars = super::select_all(&title, ":scope > span");

        wave.play(0.0);
        // The last character has not started yet and sits hidden.
        assert_eq!(opacity(&chars[3]), "0");
        wave.tick(0.25);
        assert_eq!(opacity(&chars[3]), "0");
        assert_ne!(opacity(&chars[0]), "0");
        assert!(!wave.is_finished());

        wave.revert();
        assert!(wave.is_finished());
        assert_eq!(title.inner_html(), original);
        // Ticks after a revert leave the restored markup alone.
        wave.tick(2.0);
        assert_eq!(title.inner_html(), original);
        root.remove();
    }

    #[wasm_bindgen_test]
    fn reveal_images_waits_for_its_delay() {
        let root = mount(r#"<img data-src="data:," style="display:none">"#);
        let img: HtmlElement = root.query_selector("img").unwrap().unwrap().unchecked_into();

        let mut reveal = DomAnimation::build(
            &root,
            &[Recipe::RevealImages {
                selector: "img[data-src]".into(),
                delay: 0.5,
            }],
        );
        reveal.play(0.0);
        reveal.tick(0.3);
        assert!(img.get_attribute("src").is_none());
        assert_eq!(img.style().get_property_value("display").unwrap(), "none");
        assert!(!reveal.is_finished());

        reveal.tick(0.6);
        assert_eq!(img.get_attribute("src").as_deref(), Some("data:,"));
        assert_eq!(img.style().get_property_value("display").unwrap(), "block");
        assert!(reveal.is_finished());
        root.remove();
    }

    #[wasm_bindgen_test]
    fn completion_waits_for_the_longest_recipe() {
        let root = mount(r#"<p class="a">one</p><p class="b">two</p><p class="b">three</p>"#);
        let items: Vec<HtmlElement> = super::select_all(&root, "p.b");

        let mut entry = DomAnimation::build(
            &root,
            &[
                Recipe::FadeOut {
                    selector: "p.a".into(),
                },
                Recipe::FadeUp {
                    selector: "p.b".into(),
                    stagger: 0.1,
                },
            ],
        );
        let mut done = entry.play(0.0);
        assert_eq!(opacity(&items[1]), "0");

        // The fade out is over at 0.4; the second staggered item runs to 0.7.
        entry.tick(0.5);
        assert!(!entry.is_finished());
        assert!(!done.is_resolved());

        entry.tick(0.75);
        assert!(entry.is_finished());
        assert!(done.is_resolved());
        assert_eq!(opacity(&items[1]), "1");
        root.remove();
    }
}
