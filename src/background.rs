//! Parallax background coordination.
//!
//! Three fixed layers sit behind every section. Each section names a target
//! state per layer; when a section becomes active the coordinator tweens all
//! layers towards it together.

use crate::config::BackgroundTiming;
use crate::section::{BackgroundKeyframes, Layer, LAYER_COUNT};
use crate::timeline::Timeline;

/// Receives interpolated layer states.
pub trait BackgroundSurface {
    fn apply_layer(&mut self, layer: usize, state: &Layer);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Property {
    X,
    Y,
    Scale,
    Opacity,
}

impl Property {
    const ALL: [Property; 4] = [Property::X, Property::Y, Property::Scale, Property::Opacity];

    fn read(self, layer: &Layer) -> f64 {
        match self {
            Property::X => layer.x,
            Property::Y => layer.y,
            Property::Scale => layer.scale,
            Property::Opacity => layer.opacity,
        }
    }

    fn write(self, layer: &mut Layer, value: f64) {
        match self {
            Property::X => layer.x = value,
            Property::Y => layer.y = value,
            Property::Scale => layer.scale = value,
            Property::Opacity => layer.opacity = value,
        }
    }
}

pub type Track = (usize, Property);

pub struct BackgroundCoordinator {
    timing: BackgroundTiming,
    current_section: Option<String>,
    layers: BackgroundKeyframes,
    tween: Option<Timeline<Track, ()>>,
}

impl BackgroundCoordinator {
    pub fn new(timing: BackgroundTiming) -> Self {
        Self {
            timing,
            current_section: None,
            layers: BackgroundKeyframes::default(),
            tween: None,
        }
    }

    pub fn current_section(&self) -> Option<&str> {
        self.current_section.as_deref()
    }

    /// Last applied layer states.
    pub fn layers(&self) -> &BackgroundKeyframes {
        &self.layers
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Starts tweening towards `keyframes` unless `section_id` is already the
    /// active background. Returns whether a tween was started.
    ///
    /// The active id switches immediately, so a later request for another
    /// section replaces an in-flight tween, starting from wherever the layers
    /// currently are.
    pub fn update(&mut self, section_id: &str, keyframes: &BackgroundKeyframes, now: f64) -> bool {
        if self.current_section.as_deref() == Some(section_id) {
            return false;
        }
        self.current_section = Some(section_id.to_owned());

        let mut timeline = Timeline::new();
        for (index, (from, to)) in self.layers.iter().zip(keyframes).enumerate() {
            for prop in Property::ALL {
                timeline = timeline.to(
                    (index, prop),
                    prop.read(from),
                    prop.read(to),
                    0.0,
                    self.timing.duration,
                    self.timing.ease,
                );
            }
        }
        timeline.start(now);
        self.tween = Some(timeline);
        tracing::debug!(section = section_id, "background tween started");
        true
    }

    pub fn tick<S: BackgroundSurface + ?Sized>(&mut self, now: f64, surface: &mut S) {
        let Some(tween) = self.tween.as_mut() else {
            return;
        };
        let frame = tween.sample(now);
        let mut touched = [false; LAYER_COUNT];
        for ((index, prop), value) in frame.values {
            prop.write(&mut self.layers[index], value);
            touched[index] = true;
        }
        for (index, layer) in self.layers.iter().enumerate() {
            if touched[index] {
                surface.apply_layer(index, layer);
            }
        }
        if frame.finished {
            self.tween = None;
        }
    }

    /// Forgets the active section so the next update always tweens.
    pub fn reset(&mut self) {
        self.current_section = None;
        self.tween = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<(usize, Layer)>,
    }

    impl BackgroundSurface for Recorder {
        fn apply_layer(&mut self, layer: usize, state: &Layer) {
            self.applied.push((layer, *state));
        }
    }

    fn shifted(y: f64) -> BackgroundKeyframes {
        [
            Layer { y, ..Layer::default() },
            Layer {
                y: y * 2.0,
                scale: 1.2,
                ..Layer::default()
            },
            Layer {
                opacity: 0.5,
                ..Layer::default()
            },
        ]
    }

    #[test]
    fn repeated_requests_for_the_same_section_start_one_tween() {
        let mut bg = BackgroundCoordinator::new(BackgroundTiming::default());
        assert!(bg.update("hero", &shifted(-10.0), 0.0));
        assert!(!bg.update("hero", &shifted(-10.0), 0.1));
        assert_eq!(bg.current_section(), Some("hero"));
    }

    #[test]
    fn layers_reach_their_targets_together() {
        let mut bg = BackgroundCoordinator::new(BackgroundTiming::default());
        let mut surface = Recorder::default();
        bg.update("hero", &shifted(-10.0), 0.0);
        bg.tick(0.75, &mut surface);
        assert!(bg.is_animating());
        let mid = bg.layers()[0].y;
        assert!(mid < 0.0 && mid > -10.0);

        bg.tick(1.5, &mut surface);
        assert!(!bg.is_animating());
        assert_eq!(bg.layers(), &shifted(-10.0));
        let last: Vec<usize> = surface.applied.iter().rev().take(3).map(|(i, _)| *i).collect();
        assert_eq!(last, vec![2, 1, 0]);
    }

    #[test]
    fn different_section_overrides_in_flight_tween_from_current_values() {
        let mut bg = BackgroundCoordinator::new(BackgroundTiming::default());
        let mut surface = Recorder::default();
        bg.update("a", &shifted(-40.0), 0.0);
        bg.tick(0.5, &mut surface);
        let partway = bg.layers()[0].y;

        assert!(bg.update("b", &shifted(0.0), 0.5));
        assert_eq!(bg.current_section(), Some("b"));
        bg.tick(0.5, &mut surface);
        assert_eq!(bg.layers()[0].y, partway);

        bg.tick(2.0, &mut surface);
        assert_eq!(bg.layers()[0].y, 0.0);
    }

    #[test]
    fn reset_allows_the_same_section_again() {
        let mut bg = BackgroundCoordinator::new(BackgroundTiming::default());
        bg.update("a", &shifted(1.0), 0.0);
        bg.reset();
        assert!(bg.update("a", &shifted(1.0), 0.0));
    }
}
