//! Gesture normalization.
//!
//! Raw wheel, drag and key events are reduced to a [`Verdict`]: an optional
//! navigation intent plus whether the native event should be cancelled.

use crate::config::InputConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the next section (scrolling down).
    Forward,
    /// Towards the previous section (scrolling up).
    Backward,
}

impl Direction {
    pub fn step(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture<'a> {
    /// Vertical wheel delta in pixels (positive scrolls down), received at
    /// `at` seconds.
    Wheel { delta_y: f64, at: f64 },
    DragStart { y: f64 },
    DragMove { y: f64 },
    DragEnd,
    Key { key: &'a str },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub intent: Option<Direction>,
    /// Cancel the native event.
    pub suppress: bool,
}

impl Verdict {
    const PASS: Verdict = Verdict {
        intent: None,
        suppress: false,
    };
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    origin: f64,
    fired: bool,
}

pub struct InputObserver {
    config: InputConfig,
    wheel_accum: f64,
    last_wheel: Option<f64>,
    drag: Option<Drag>,
}

impl InputObserver {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            wheel_accum: 0.0,
            last_wheel: None,
            drag: None,
        }
    }

    pub fn key_direction(&self, key: &str) -> Option<Direction> {
        if self.config.advance_keys.iter().any(|k| k == key) {
            Some(Direction::Forward)
        } else if self.config.retreat_keys.iter().any(|k| k == key) {
            Some(Direction::Backward)
        } else {
            None
        }
    }

    /// Interprets one gesture. `absorbs` reports whether the active section can
    /// take a move in the given direction as its own internal scroll, in which
    /// case the native event is left alone and no intent is produced.
    pub fn interpret(&mut self, gesture: Gesture<'_>, absorbs: impl Fn(Direction) -> bool) -> Verdict {
        match gesture {
            Gesture::Wheel { delta_y, at } => self.wheel(delta_y, at, absorbs),
            Gesture::DragStart { y } => {
                self.drag = Some(Drag {
                    origin: y,
                    fired: false,
                });
                Verdict::PASS
            }
            Gesture::DragMove { y } => self.drag_move(y, absorbs),
            Gesture::DragEnd => {
                self.drag = None;
                Verdict::PASS
            }
            Gesture::Key { key } => match self.key_direction(key) {
                Some(direction) => Verdict {
                    intent: Some(direction),
                    suppress: true,
                },
                None => Verdict::PASS,
            },
        }
    }

    fn wheel(&mut self, delta_y: f64, at: f64, absorbs: impl Fn(Direction) -> bool) -> Verdict {
        // Ticks separated by a pause belong to different gestures.
        if self
            .last_wheel
            .is_some_and(|last| at - last > self.config.wheel_gap)
        {
            self.wheel_accum = 0.0;
        }
        self.last_wheel = Some(at);
        let direction = if delta_y > 0.0 {
            Direction::Forward
        } else if delta_y < 0.0 {
            Direction::Backward
        } else {
            return Verdict::PASS;
        };
        if absorbs(direction) {
            self.wheel_accum = 0.0;
            return Verdict::PASS;
        }
        if self.wheel_accum.signum() != delta_y.signum() {
            self.wheel_accum = 0.0;
        }
        self.wheel_accum += delta_y;
        let intent = if self.wheel_accum.abs() >= self.config.tolerance {
            self.wheel_accum = 0.0;
            Some(direction)
        } else {
            None
        };
        Verdict {
            intent,
            suppress: true,
        }
    }

    fn drag_move(&mut self, y: f64, absorbs: impl Fn(Direction) -> bool) -> Verdict {
        let Some(drag) = self.drag.as_mut() else {
            return Verdict::PASS;
        };
        let travel = drag.origin - y; // finger moving up scrolls forward
        let direction = if travel > 0.0 {
            Direction::Forward
        } else if travel < 0.0 {
            Direction::Backward
        } else {
            return Verdict::PASS;
        };
        if absorbs(direction) {
            drag.origin = y;
            return Verdict::PASS;
        }
        let intent = if !drag.fired && travel.abs() >= self.config.tolerance {
            drag.fired = true;
            Some(direction)
        } else {
            None
        };
        Verdict {
            intent,
            suppress: true,
        }
    }
}
