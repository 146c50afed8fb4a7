//! Section transition orchestrator.
//!
//! The controller owns the section list and steps between adjacent sections.
//! A transition runs in three phases:
//!
//! 1. exit: the outgoing section's exit animation plays to completion, then a
//!    short grace pause elapses;
//! 2. reposition: one timeline slides the outgoing section out and the
//!    incoming one in, firing the background update and the incoming entry
//!    animation at fixed fractions of its length;
//! 3. settle: the new index is committed and progress re-rendered.
//!
//! At most one transition is in flight. Intents arriving meanwhile are
//! dropped, not queued. Time only advances through [`ScrollController::tick`],
//! so the driver (a frame loop in the browser, a virtual clock in tests)
//! decides what "now" is.

use crate::background::BackgroundCoordinator;
use crate::config::ControllerConfig;
use crate::error::{ScrollError, ScrollResult};
use crate::input::Direction;
use crate::registry::{AnimationRegistry, Completion, SharedHandle};
use crate::section::SectionDescriptor;
use crate::stage::{Placement, Stage};
use crate::timeline::{Frame, Timeline};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseKind {
    /// Waiting on the outgoing exit animation or the grace pause after it.
    Exit,
    Reposition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle { index: usize },
    Transitioning { from: usize, to: usize, phase: PhaseKind },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Already at the first or last section.
    Boundary,
    /// Another transition is in flight.
    Transitioning,
    /// Torn down.
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Started { from: usize, to: usize },
    /// The active tall section scrolled internally instead.
    Absorbed,
    Ignored(IgnoreReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Outgoing,
    Incoming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cue {
    Background,
    Entry,
}

enum Phase {
    Exit {
        handle: SharedHandle,
        done: Completion,
        grace_until: Option<f64>,
    },
    Reposition {
        timeline: Timeline<Slot, Cue>,
    },
}

enum State {
    Idle,
    Transitioning { from: usize, to: usize, phase: Phase },
}

enum Step {
    Wait,
    Again,
    /// Grace ended at the given time.
    StartReposition(f64),
    Frame(Frame<Slot, Cue>),
}

pub struct ScrollController<S: Stage> {
    stage: S,
    sections: Vec<SectionDescriptor<S::Root>>,
    registry: AnimationRegistry<S::Root>,
    background: BackgroundCoordinator,
    config: ControllerConfig,
    current: usize,
    state: State,
    running: Vec<SharedHandle>,
    started: bool,
}

impl<S: Stage> ScrollController<S> {
    pub fn new(
        stage: S,
        sections: Vec<SectionDescriptor<S::Root>>,
        registry: AnimationRegistry<S::Root>,
        config: ControllerConfig,
    ) -> ScrollResult<Self> {
        if sections.is_empty() {
            return Err(ScrollError::NoSections);
        }
        config.validate()?;
        Ok(Self {
            stage,
            sections,
            registry,
            background: BackgroundCoordinator::new(config.background.clone()),
            config,
            current: 0,
            state: State::Idle,
            running: Vec::new(),
            started: false,
        })
    }

    /// Lays out the sections, locks page scroll, renders progress and plays
    /// the first section's entry. Only the first call has any effect.
    pub fn start(&mut self, now: f64) {
        if self.started || self.sections.is_empty() {
            tracing::warn!("scroll controller already started");
            return;
        }
        self.started = true;

        self.stage.lock_page(true);
        let count = self.sections.len();
        for (index, section) in self.sections.iter().enumerate() {
            self.stage.place(section, Placement::for_index(index, count));
            self.stage.set_active(section, index == 0);
        }
        self.stage.mount_progress();
        self.stage.render_progress(self.progress());

        let first = &self.sections[0];
        self.background.update(&first.id, &first.background, now);
        self.start_entry(0, now);

        let tall: Vec<&str> = self
            .sections
            .iter()
            .filter(|s| s.is_tall)
            .map(|s| s.id.as_str())
            .collect();
        tracing::info!(sections = count, ?tall, "scroll controller initialized");
    }

    pub fn advance(&mut self, now: f64) -> Outcome {
        self.navigate(Direction::Forward, now)
    }

    pub fn retreat(&mut self, now: f64) -> Outcome {
        self.navigate(Direction::Backward, now)
    }

    pub fn navigate(&mut self, direction: Direction, now: f64) -> Outcome {
        if self.sections.is_empty() {
            return Outcome::Ignored(IgnoreReason::Inactive);
        }
        if self.is_transitioning() {
            tracing::trace!(?direction, "intent dropped mid-transition");
            return Outcome::Ignored(IgnoreReason::Transitioning);
        }
        let from = self.current;
        let to = match direction {
            Direction::Forward if from + 1 < self.sections.len() => from + 1,
            Direction::Backward if from > 0 => from - 1,
            _ => return Outcome::Ignored(IgnoreReason::Boundary),
        };

        if self.can_absorb(direction) {
            let step = self.config.input.internal_scroll_step * direction.step();
            self.stage.scroll_by(&self.sections[from], step);
            return Outcome::Absorbed;
        }

        let section = &self.sections[from];
        let handle = self.registry.exit(&section.id, &section.root);
        let done = handle.borrow_mut().play(now);
        tracing::debug!(from, to, "transition started");
        self.state = State::Transitioning {
            from,
            to,
            phase: Phase::Exit {
                handle,
                done,
                grace_until: None,
            },
        };
        self.step_transition(now);
        Outcome::Started { from, to }
    }

    /// Whether the active section can take a move in `direction` as internal
    /// scroll. Always false mid-transition.
    pub fn can_absorb(&self, direction: Direction) -> bool {
        if self.is_transitioning() {
            return false;
        }
        let Some(section) = self.sections.get(self.current) else {
            return false;
        };
        if !section.is_tall || section.scroll_target().is_none() {
            return false;
        }
        let metrics = self.stage.scroll_metrics(section);
        let tolerance = self.config.tall.edge_tolerance;
        match direction {
            Direction::Forward => metrics.room_below(tolerance),
            Direction::Backward => metrics.room_above(tolerance),
        }
    }

    pub fn tick(&mut self, now: f64) {
        self.step_transition(now);
        self.background.tick(now, &mut self.stage);
        for handle in &self.running {
            handle.borrow_mut().tick(now);
        }
        self.running.retain(|h| !h.borrow().is_finished());
    }

    fn step_transition(&mut self, now: f64) {
        loop {
            let grace = self.config.transition.grace;
            let (from, to, step) = match &mut self.state {
                State::Idle => return,
                State::Transitioning { from, to, phase } => {
                    let step = match phase {
                        Phase::Exit {
                            handle,
                            done,
                            grace_until,
                        } => {
                            handle.borrow_mut().tick(now);
                            match *grace_until {
                                Some(until) if now >= until => Step::StartReposition(until),
                                Some(_) => Step::Wait,
                                None if done.is_resolved() => {
                                    *grace_until = Some(now + grace);
                                    Step::Again
                                }
                                None => Step::Wait,
                            }
                        }
                        Phase::Reposition { timeline } => Step::Frame(timeline.sample(now)),
                    };
                    (*from, *to, step)
                }
            };

            match step {
                Step::Wait => return,
                Step::Again => continue,
                Step::StartReposition(at) => {
                    self.start_reposition(from, to, at);
                    continue;
                }
                Step::Frame(frame) => {
                    let finished = frame.finished;
                    self.apply_frame(from, to, frame, now);
                    if finished {
                        self.settle(from, to);
                    }
                    return;
                }
            }
        }
    }

    /// Starts the move at `at`, the instant the grace pause ended, so a late
    /// frame does not stretch the transition.
    fn start_reposition(&mut self, from: usize, to: usize, at: f64) {
        let t = &self.config.transition;
        // Advancing pushes the outgoing section up; retreating pushes it down.
        let out_to = if to > from { -100.0 } else { 100.0 };
        let mut timeline = Timeline::new()
            .to(Slot::Outgoing, 0.0, out_to, 0.0, t.duration, t.ease)
            .to(Slot::Incoming, -out_to, 0.0, 0.0, t.duration, t.ease)
            .call(t.duration * t.background_at, Cue::Background)
            .call(t.duration * t.entry_at, Cue::Entry);
        timeline.start(at);
        self.stage.set_active(&self.sections[to], true);
        tracing::debug!(from, to, "reposition started");
        self.state = State::Transitioning {
            from,
            to,
            phase: Phase::Reposition { timeline },
        };
    }

    fn apply_frame(&mut self, from: usize, to: usize, frame: Frame<Slot, Cue>, now: f64) {
        for (slot, value) in frame.values {
            let index = match slot {
                Slot::Outgoing => from,
                Slot::Incoming => to,
            };
            self.stage.set_offset(&self.sections[index], value);
        }
        for cue in frame.cues {
            match cue {
                Cue::Background => {
                    let incoming = &self.sections[to];
                    self.background
                        .update(&incoming.id, &incoming.background, now);
                }
                Cue::Entry => self.start_entry(to, now),
            }
        }
    }

    fn start_entry(&mut self, index: usize, now: f64) {
        let section = &self.sections[index];
        self.stage.prepare_entry(section);
        if section.is_tall {
            self.stage.reset_scroll(section);
        }
        let handle = self.registry.entry(&section.id, &section.root);
        let _ = handle.borrow_mut().play(now);
        self.running.push(handle);
    }

    fn settle(&mut self, from: usize, to: usize) {
        self.current = to;
        self.state = State::Idle;
        self.stage.set_active(&self.sections[from], false);
        self.stage.render_progress(self.progress());
        tracing::debug!(index = to, "transition settled");
    }

    /// Reverts every animation handle still held, makes each section
    /// interactive again, removes the progress indicator and releases page
    /// scroll. The controller ignores every later intent.
    pub fn teardown(&mut self) {
        self.state = State::Idle;
        self.running.clear();
        self.registry.revert_all();
        if self.started {
            for section in &self.sections {
                self.stage.set_active(section, true);
            }
            self.stage.unmount_progress();
            self.stage.lock_page(false);
        }
        self.background.reset();
        self.sections.clear();
        self.current = 0;
        self.started = false;
        tracing::debug!("scroll controller torn down");
    }

    pub fn status(&self) -> Status {
        match &self.state {
            State::Idle => Status::Idle {
                index: self.current,
            },
            State::Transitioning { from, to, phase } => Status::Transitioning {
                from: *from,
                to: *to,
                phase: match phase {
                    Phase::Exit { .. } => PhaseKind::Exit,
                    Phase::Reposition { .. } => PhaseKind::Reposition,
                },
            },
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, State::Transitioning { .. })
    }

    /// `(current + 1) / count`, or zero once torn down.
    pub fn progress(&self) -> f64 {
        if self.sections.is_empty() {
            return 0.0;
        }
        (self.current + 1) as f64 / self.sections.len() as f64
    }

    /// Whether anything still needs frames: a transition, a background
    /// tween or a running entry animation.
    pub fn is_busy(&self) -> bool {
        self.is_transitioning() || self.background.is_animating() || !self.running.is_empty()
    }

    pub fn sections(&self) -> &[SectionDescriptor<S::Root>] {
        &self.sections
    }

    pub fn background(&self) -> &BackgroundCoordinator {
        &self.background
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}
