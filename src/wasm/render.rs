use std::rc::Rc;

use gloo::render::request_animation_frame;

use super::Shared;

/// Seconds since page load, on the same clock for intents and frames.
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or(0.0, |p| p.now() / 1000.0)
}

/// Requests frames while the controller has work in flight.
///
/// Each frame ticks the controller once and re-arms only if it is still busy,
/// so an idle page costs nothing. Calling this while a frame is pending is a
/// no-op.
pub fn schedule(shared: &Rc<Shared>) {
    if shared.frame.borrow().is_some() {
        return;
    }
    let next = Rc::clone(shared);
    let handle = request_animation_frame(move |_| {
        next.frame.borrow_mut().take();
        let busy = {
            let mut controller = next.controller.borrow_mut();
            controller.tick(now());
            controller.is_busy()
        };
        if busy {
            schedule(&next);
        }
    });
    *shared.frame.borrow_mut() = Some(handle);
}
