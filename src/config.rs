//! Controller configuration.
//!
//! Every field has a default matching the stock page markup, so an empty JSON
//! object (or no config at all) yields a working controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ease::Ease;
use crate::error::{ScrollError, ScrollResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    pub transition: TransitionTiming,
    pub background: BackgroundTiming,
    pub input: InputConfig,
    pub tall: TallConfig,
    pub selectors: Selectors,
    /// Section id -> entry/exit recipes.
    pub animations: BTreeMap<String, AnimationSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionTiming {
    pub duration: f64,
    /// Fraction of `duration` at which the background update fires.
    pub background_at: f64,
    /// Fraction of `duration` at which the incoming entry animation starts.
    pub entry_at: f64,
    /// Pause between exit completion and the section move.
    pub grace: f64,
    pub ease: Ease,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            duration: 0.9,
            background_at: 0.3,
            entry_at: 0.4,
            grace: 0.1,
            ease: Ease::InOutQuad,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundTiming {
    pub duration: f64,
    pub ease: Ease,
}

impl Default for BackgroundTiming {
    fn default() -> Self {
        Self {
            duration: 1.5,
            ease: Ease::OutQuad,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputConfig {
    /// Dead zone in pixels; smaller accumulated deltas never produce an intent.
    pub tolerance: f64,
    /// Seconds without wheel input after which the dead-zone accumulator
    /// starts over.
    pub wheel_gap: f64,
    pub advance_keys: Vec<String>,
    pub retreat_keys: Vec<String>,
    /// Pixels scrolled inside a tall section when an intent is absorbed
    /// without a native scroll to carry it (keyboard, programmatic calls).
    pub internal_scroll_step: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            wheel_gap: 0.15,
            advance_keys: vec!["ArrowDown".into(), "PageDown".into(), " ".into()],
            retreat_keys: vec!["ArrowUp".into(), "PageUp".into()],
            internal_scroll_step: 150.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TallConfig {
    /// Content taller than this fraction of the viewport makes a section tall.
    pub viewport_ratio: f64,
    /// Pixel slack when deciding whether a tall section sits at its top/bottom.
    pub edge_tolerance: f64,
}

impl Default for TallConfig {
    fn default() -> Self {
        Self {
            viewport_ratio: 0.9,
            edge_tolerance: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
    pub section: String,
    pub tall_class: String,
    pub content: String,
    pub animate_item: String,
    pub background_root: String,
    pub background_layers: Vec<String>,
    pub progress_id: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            section: ".parallax-section".into(),
            tall_class: "parallax-section--tall".into(),
            content: ".section-content".into(),
            animate_item: ".animate-item".into(),
            background_root: "#parallax-bg".into(),
            background_layers: vec!["#savannah".into(), "#rocks".into(), "#forest".into()],
            progress_id: "scroll-progress".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpec {
    pub entry: Vec<Recipe>,
    pub exit: Vec<Recipe>,
}

/// Named animation recipes a section can opt into. Selectors are resolved
/// inside the section root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Recipe {
    /// Per-character rise with a slight overshoot.
    #[serde(rename_all = "camelCase")]
    WaveIn {
        selector: String,
        #[serde(default = "default_wave_stagger")]
        stagger: f64,
    },
    #[serde(rename_all = "camelCase")]
    FadeUp {
        selector: String,
        #[serde(default = "default_item_stagger")]
        stagger: f64,
    },
    FadeOut { selector: String },
    #[serde(rename_all = "camelCase")]
    SlideIn {
        selector: String,
        #[serde(default = "default_slide_from")]
        from_x_percent: f64,
    },
    /// Copies `data-src` into `src` and shows the images once `delay` passes.
    RevealImages {
        selector: String,
        #[serde(default = "default_reveal_delay")]
        delay: f64,
    },
    HideImages {
        selector: String,
        #[serde(default = "default_hide_delay")]
        delay: f64,
    },
}

fn default_wave_stagger() -> f64 {
    0.02
}

fn default_item_stagger() -> f64 {
    0.1
}

fn default_slide_from() -> f64 {
    -100.0
}

fn default_reveal_delay() -> f64 {
    1.0
}

fn default_hide_delay() -> f64 {
    0.5
}

impl ControllerConfig {
    pub fn from_json(json: &str) -> ScrollResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ScrollResult<()> {
        let t = &self.transition;
        if !(t.duration > 0.0) {
            return Err(ScrollError::config("transition.duration must be positive"));
        }
        for (name, frac) in [("backgroundAt", t.background_at), ("entryAt", t.entry_at)] {
            if !(0.0..=1.0).contains(&frac) {
                return Err(ScrollError::config(format!(
                    "transition.{name} must be within [0, 1], got {frac}"
                )));
            }
        }
        if !(t.grace >= 0.0) {
            return Err(ScrollError::config("transition.grace must not be negative"));
        }
        if !(self.background.duration > 0.0) {
            return Err(ScrollError::config("background.duration must be positive"));
        }
        if !(self.input.tolerance >= 0.0) {
            return Err(ScrollError::config("input.tolerance must not be negative"));
        }
        if !(self.input.wheel_gap > 0.0) {
            return Err(ScrollError::config("input.wheelGap must be positive"));
        }
        if !(self.tall.edge_tolerance >= 0.0) || !(self.tall.viewport_ratio > 0.0) {
            return Err(ScrollError::config(
                "tall.edgeTolerance must not be negative and tall.viewportRatio must be positive",
            ));
        }
        if self.selectors.background_layers.len() != crate::section::LAYER_COUNT {
            return Err(ScrollError::config(format!(
                "selectors.backgroundLayers needs exactly {} entries, got {}",
                crate::section::LAYER_COUNT,
                self.selectors.background_layers.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ControllerConfig::from_json("{}").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.transition.duration, 0.9);
        assert_eq!(config.transition.grace, 0.1);
        assert_eq!(config.background.duration, 1.5);
        assert_eq!(config.input.tolerance, 10.0);
        assert_eq!(config.tall.edge_tolerance, 10.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config =
            ControllerConfig::from_json(r#"{"transition":{"duration":1.2},"input":{"tolerance":4}}"#)
                .unwrap();
        assert_eq!(config.transition.duration, 1.2);
        assert_eq!(config.transition.entry_at, 0.4);
        assert_eq!(config.input.tolerance, 4.0);
        assert_eq!(config.input.retreat_keys, vec!["ArrowUp", "PageUp"]);
    }

    #[test]
    fn recipes_are_tagged_by_kind() {
        let config = ControllerConfig::from_json(
            r##"{"animations":{"faq":{
                "entry":[{"kind":"waveIn","selector":"#faq_title"},
                         {"kind":"revealImages","selector":"img[data-src]"}],
                "exit":[{"kind":"hideImages","selector":"img[data-src]","delay":0.2}]
            }}}"##,
        )
        .unwrap();
        let faq = &config.animations["faq"];
        assert_eq!(
            faq.entry[0],
            Recipe::WaveIn {
                selector: "#faq_title".into(),
                stagger: 0.02
            }
        );
        assert_eq!(
            faq.entry[1],
            Recipe::RevealImages {
                selector: "img[data-src]".into(),
                delay: 1.0
            }
        );
        assert_eq!(
            faq.exit[0],
            Recipe::HideImages {
                selector: "img[data-src]".into(),
                delay: 0.2
            }
        );
    }

    #[test]
    fn rejects_out_of_range_cue_fractions() {
        let err = ControllerConfig::from_json(r#"{"transition":{"entryAt":1.5}}"#).unwrap_err();
        assert!(err.to_string().contains("entryAt"));
    }

    #[test]
    fn rejects_wrong_layer_count() {
        let err = ControllerConfig::from_json(r##"{"selectors":{"backgroundLayers":["#a"]}}"##)
            .unwrap_err();
        assert!(matches!(err, ScrollError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let err = ControllerConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ScrollError::Serde(_)));
    }
}
