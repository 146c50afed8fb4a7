//! Synchronized timeline scheduler.
//!
//! A [`Timeline`] holds tweens on keyed tracks and one-shot cues, all placed at
//! offsets relative to a single start time. The driver samples it with the
//! current clock; every sample reports the tracks that are live, the cues whose
//! offset has been crossed since the previous sample, and whether the timeline
//! has run to its end.

use crate::ease::Ease;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<K> {
    pub key: K,
    pub from: f64,
    pub to: f64,
    /// Offset from the timeline start, in seconds.
    pub at: f64,
    pub duration: f64,
    pub ease: Ease,
}

impl<K: Copy> Tween<K> {
    pub fn end(&self) -> f64 {
        self.at + self.duration.max(0.0)
    }

    fn value_at(&self, elapsed: f64) -> Option<f64> {
        if elapsed < self.at {
            return None;
        }
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (elapsed - self.at) / self.duration
        };
        let e = self.ease.apply(t);
        Some(self.from + (self.to - self.from) * e)
    }
}

/// Output of one [`Timeline::sample`] call.
#[derive(Debug)]
pub struct Frame<K, C> {
    pub values: Vec<(K, f64)>,
    pub cues: Vec<C>,
    pub finished: bool,
}

impl<K, C> Frame<K, C> {
    fn empty() -> Self {
        Self {
            values: Vec::new(),
            cues: Vec::new(),
            finished: false,
        }
    }
}

pub struct Timeline<K, C> {
    tweens: Vec<Tween<K>>,
    cues: Vec<(f64, Option<C>)>, // sorted by offset, taken when fired
    started_at: Option<f64>,
    finished: bool,
}

impl<K: Copy, C> Default for Timeline<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy, C> Timeline<K, C> {
    pub fn new() -> Self {
        Self {
            tweens: Vec::new(),
            cues: Vec::new(),
            started_at: None,
            finished: false,
        }
    }

    pub fn tween(mut self, tween: Tween<K>) -> Self {
        self.tweens.push(tween);
        self
    }

    pub fn to(self, key: K, from: f64, to: f64, at: f64, duration: f64, ease: Ease) -> Self {
        self.tween(Tween {
            key,
            from,
            to,
            at,
            duration,
            ease,
        })
    }

    /// Schedules `cue` at offset `at`. Cues sharing an offset fire in insertion order.
    pub fn call(mut self, at: f64, cue: C) -> Self {
        let idx = self.cues.partition_point(|(offset, _)| *offset <= at);
        self.cues.insert(idx, (at, Some(cue)));
        self
    }

    pub fn duration(&self) -> f64 {
        let tweens = self.tweens.iter().map(Tween::end).fold(0.0, f64::max);
        let cues = self.cues.iter().map(|(at, _)| *at).fold(0.0, f64::max);
        tweens.max(cues)
    }

    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
        self.finished = false;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Seconds elapsed since start, or `None` before [`Timeline::start`].
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.started_at.map(|start| (now - start).max(0.0))
    }

    pub fn sample(&mut self, now: f64) -> Frame<K, C> {
        let Some(elapsed) = self.elapsed(now) else {
            return Frame::empty();
        };
        if self.finished {
            return Frame {
                finished: true,
                ..Frame::empty()
            };
        }

        let finished = elapsed >= self.duration();
        let horizon = if finished { f64::INFINITY } else { elapsed };

        let values = self
            .tweens
            .iter()
            .filter_map(|tw| tw.value_at(horizon).map(|v| (tw.key, v)))
            .collect();

        let cues = self
            .cues
            .iter_mut()
            .filter(|(at, _)| *at <= horizon)
            .filter_map(|(_, cue)| cue.take())
            .collect();

        self.finished = finished;
        Frame {
            values,
            cues,
            finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Track {
        A,
        B,
    }

    fn value(frame: &Frame<Track, &'static str>, key: Track) -> Option<f64> {
        frame.values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    #[test]
    fn unstarted_timeline_yields_nothing() {
        let mut tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, 1.0, 0.0, 1.0, Ease::Linear)
            .call(0.0, "x");
        let frame = tl.sample(5.0);
        assert!(frame.values.is_empty());
        assert!(frame.cues.is_empty());
        assert!(!frame.finished);
    }

    #[test]
    fn tweens_share_one_start_and_interpolate() {
        let mut tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, -100.0, 0.0, 1.0, Ease::Linear)
            .to(Track::B, 100.0, 0.0, 0.0, 1.0, Ease::Linear);
        tl.start(10.0);
        let frame = tl.sample(10.5);
        assert_eq!(value(&frame, Track::A), Some(-50.0));
        assert_eq!(value(&frame, Track::B), Some(50.0));
        assert!(!frame.finished);
    }

    #[test]
    fn delayed_tween_is_silent_until_its_offset() {
        let mut tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, 1.0, 0.0, 1.0, Ease::Linear)
            .to(Track::B, 0.0, 1.0, 0.5, 0.5, Ease::Linear);
        tl.start(0.0);
        let frame = tl.sample(0.25);
        assert!(value(&frame, Track::B).is_none());
        let frame = tl.sample(0.75);
        assert_eq!(value(&frame, Track::B), Some(0.5));
    }

    #[test]
    fn cues_fire_once_in_offset_order() {
        let mut tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, 1.0, 0.0, 1.0, Ease::Linear)
            .call(0.4, "entry")
            .call(0.3, "background");
        tl.start(0.0);
        assert!(tl.sample(0.2).cues.is_empty());
        assert_eq!(tl.sample(0.5).cues, vec!["background", "entry"]);
        assert!(tl.sample(0.6).cues.is_empty());
    }

    #[test]
    fn finishing_sample_flushes_final_values_and_cues() {
        let mut tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, 1.0, 0.0, 0.9, Ease::InOutQuad)
            .call(0.9, "end");
        tl.start(1.0);
        let frame = tl.sample(3.0);
        assert!(frame.finished);
        assert_eq!(value(&frame, Track::A), Some(1.0));
        assert_eq!(frame.cues, vec!["end"]);
        assert!(tl.is_finished());
        assert!(tl.sample(4.0).values.is_empty());
    }

    #[test]
    fn duration_covers_cues_past_the_last_tween() {
        let tl: Timeline<Track, &str> = Timeline::new()
            .to(Track::A, 0.0, 1.0, 0.0, 0.5, Ease::Linear)
            .call(1.2, "late");
        assert_eq!(tl.duration(), 1.2);
    }
}
