//! Animation registry.
//!
//! Sections opt into entry/exit animations by id. The registry builds a fresh
//! handle on every request, reverting whatever the previous handle for the
//! same section left behind, and falls back to [`NoopAnimation`] for ids it
//! does not know.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// Resolves once the animation it was obtained from has finished.
///
/// A dropped sender counts as resolved, so a handle that is discarded
/// mid-flight never leaves a waiter hanging.
pub struct Completion {
    rx: oneshot::Receiver<()>,
    resolved: bool,
}

impl Completion {
    /// Polls without an executor.
    pub fn is_resolved(&mut self) -> bool {
        if !self.resolved {
            self.resolved = !matches!(self.rx.try_recv(), Ok(None));
        }
        self.resolved
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.resolved {
            return Poll::Ready(());
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(_) => {
                self.resolved = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Sending side of one or more [`Completion`]s for a single run.
#[derive(Default)]
pub struct Notifier {
    waiters: Vec<oneshot::Sender<()>>,
    fired: bool,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Completion {
        let (tx, rx) = oneshot::channel();
        if self.fired {
            let _ = tx.send(());
        } else {
            self.waiters.push(tx);
        }
        Completion {
            rx,
            resolved: false,
        }
    }

    /// Fires every outstanding completion. Later calls do nothing.
    pub fn notify(&mut self) {
        if self.fired {
            return;
        }
        self.fired = true;
        for tx in self.waiters.drain(..) {
            let _ = tx.send(());
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }
}

/// A playable, revertible animation bound to one section root.
pub trait AnimationHandle {
    /// Starts playback at `now` (seconds). Calling it again while running
    /// does not restart; it hands out another completion for the same run.
    fn play(&mut self, now: f64) -> Completion;

    /// Advances internal effects to `now`.
    fn tick(&mut self, now: f64);

    fn is_finished(&self) -> bool;

    /// Undoes transient DOM changes (split text, inline styles) made by this handle.
    fn revert(&mut self);
}

/// Finishes the moment it is played.
#[derive(Default)]
pub struct NoopAnimation {
    done: Notifier,
}

impl AnimationHandle for NoopAnimation {
    fn play(&mut self, _now: f64) -> Completion {
        self.done.notify();
        self.done.subscribe()
    }

    fn tick(&mut self, _now: f64) {}

    fn is_finished(&self) -> bool {
        self.done.is_fired()
    }

    fn revert(&mut self) {}
}

pub type SharedHandle = Rc<RefCell<Box<dyn AnimationHandle>>>;

pub type Factory<R> = Box<dyn Fn(&R) -> Box<dyn AnimationHandle>>;

pub struct AnimationPair<R> {
    pub entry: Factory<R>,
    pub exit: Factory<R>,
}

impl<R> AnimationPair<R> {
    pub fn new(
        entry: impl Fn(&R) -> Box<dyn AnimationHandle> + 'static,
        exit: impl Fn(&R) -> Box<dyn AnimationHandle> + 'static,
    ) -> Self {
        Self {
            entry: Box::new(entry),
            exit: Box::new(exit),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Entry,
    Exit,
}

pub struct AnimationRegistry<R> {
    pairs: HashMap<String, AnimationPair<R>>,
    /// Last handle handed out per section, kept until superseded.
    latest: HashMap<String, SharedHandle>,
}

impl<R> Default for AnimationRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> AnimationRegistry<R> {
    pub fn new() -> Self {
        Self {
            pairs: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    /// Reverts and forgets every retained handle.
    pub fn revert_all(&mut self) {
        for (_, handle) in self.latest.drain() {
            handle.borrow_mut().revert();
        }
    }

    pub fn register(&mut self, section_id: impl Into<String>, pair: AnimationPair<R>) {
        self.pairs.insert(section_id.into(), pair);
    }

    pub fn is_registered(&self, section_id: &str) -> bool {
        self.pairs.contains_key(section_id)
    }

    pub fn entry(&mut self, section_id: &str, root: &R) -> SharedHandle {
        self.create(section_id, root, Kind::Entry)
    }

    pub fn exit(&mut self, section_id: &str, root: &R) -> SharedHandle {
        self.create(section_id, root, Kind::Exit)
    }

    fn create(&mut self, section_id: &str, root: &R, kind: Kind) -> SharedHandle {
        if let Some(previous) = self.latest.remove(section_id) {
            previous.borrow_mut().revert();
        }

        let handle: Box<dyn AnimationHandle> = match self.pairs.get(section_id) {
            Some(pair) => match kind {
                Kind::Entry => (pair.entry)(root),
                Kind::Exit => (pair.exit)(root),
            },
            None => Box::new(NoopAnimation::default()),
        };
        let shared = Rc::new(RefCell::new(handle));
        self.latest.insert(section_id.to_owned(), Rc::clone(&shared));
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Timed {
        started: Option<f64>,
        length: f64,
        done: Notifier,
        reverts: Rc<Cell<u32>>,
    }

    impl AnimationHandle for Timed {
        fn play(&mut self, now: f64) -> Completion {
            self.started.get_or_insert(now);
            self.done.subscribe()
        }

        fn tick(&mut self, now: f64) {
            if self.started.is_some_and(|s| now - s >= self.length) {
                self.done.notify();
            }
        }

        fn is_finished(&self) -> bool {
            self.done.is_fired()
        }

        fn revert(&mut self) {
            self.reverts.set(self.reverts.get() + 1);
        }
    }

    fn timed_registry(reverts: Rc<Cell<u32>>) -> AnimationRegistry<()> {
        let mut registry = AnimationRegistry::new();
        let r1 = reverts.clone();
        let r2 = reverts;
        registry.register(
            "faq",
            AnimationPair::new(
                move |_: &()| {
                    Box::new(Timed {
                        started: None,
                        length: 1.0,
                        done: Notifier::new(),
                        reverts: r1.clone(),
                    }) as Box<dyn AnimationHandle>
                },
                move |_: &()| {
                    Box::new(Timed {
                        started: None,
                        length: 0.5,
                        done: Notifier::new(),
                        reverts: r2.clone(),
                    }) as Box<dyn AnimationHandle>
                },
            ),
        );
        registry
    }

    #[test]
    fn unknown_ids_resolve_to_an_immediate_noop() {
        let mut registry: AnimationRegistry<()> = AnimationRegistry::new();
        assert!(!registry.is_registered("nope"));
        let handle = registry.exit("nope", &());
        let mut done = handle.borrow_mut().play(0.0);
        assert!(done.is_resolved());
        assert!(handle.borrow().is_finished());
    }

    #[test]
    fn completion_fires_once_when_the_handle_finishes() {
        let mut registry = timed_registry(Rc::new(Cell::new(0)));
        let handle = registry.entry("faq", &());
        let mut first = handle.borrow_mut().play(2.0);
        let mut second = handle.borrow_mut().play(2.5);
        handle.borrow_mut().tick(2.9);
        assert!(!first.is_resolved());
        handle.borrow_mut().tick(3.0);
        assert!(first.is_resolved());
        assert!(second.is_resolved());
        assert!(first.is_resolved());
    }

    #[test]
    fn completion_is_awaitable() {
        let mut notifier = Notifier::new();
        let done = notifier.subscribe();
        notifier.notify();
        futures::executor::block_on(done);
    }

    #[test]
    fn dropped_notifier_resolves_waiters() {
        let mut notifier = Notifier::new();
        let mut done = notifier.subscribe();
        drop(notifier);
        assert!(done.is_resolved());
    }

    #[test]
    fn new_handle_for_the_same_section_reverts_the_previous_one() {
        let reverts = Rc::new(Cell::new(0));
        let mut registry = timed_registry(reverts.clone());
        let entry = registry.entry("faq", &());
        assert_eq!(reverts.get(), 0);
        let _exit = registry.exit("faq", &());
        assert_eq!(reverts.get(), 1);
        drop(entry);
        let _again = registry.entry("faq", &());
        assert_eq!(reverts.get(), 2);
    }

    #[test]
    fn finished_handles_are_still_reverted_when_superseded() {
        let reverts = Rc::new(Cell::new(0));
        let mut registry = timed_registry(reverts.clone());
        let exit = registry.exit("faq", &());
        let _ = exit.borrow_mut().play(0.0);
        exit.borrow_mut().tick(1.0);
        assert!(exit.borrow().is_finished());
        drop(exit);
        let _entry = registry.entry("faq", &());
        assert_eq!(reverts.get(), 1);
    }

    #[test]
    fn other_sections_are_left_alone() {
        let reverts = Rc::new(Cell::new(0));
        let mut registry = timed_registry(reverts.clone());
        let _faq = registry.entry("faq", &());
        let _other = registry.entry("hero", &());
        assert_eq!(reverts.get(), 0);
    }

    #[test]
    fn revert_all_reverts_each_retained_handle_once() {
        let reverts = Rc::new(Cell::new(0));
        let mut registry = timed_registry(reverts.clone());
        let _entry = registry.entry("faq", &());
        let _other = registry.entry("hero", &());
        registry.revert_all();
        assert_eq!(reverts.get(), 1);
        registry.revert_all();
        assert_eq!(reverts.get(), 1);
        let _again = registry.exit("faq", &());
        assert_eq!(reverts.get(), 1);
    }
}
