use std::rc::{Rc, Weak};

use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, HtmlElement, KeyboardEvent, PointerEvent, TouchEvent, WheelEvent};

use super::{render, Shared};
use crate::controller::Outcome;
use crate::error::{ScrollError, ScrollResult};
use crate::input::Gesture;

const LINE_HEIGHT_PX: f64 = 16.0;

/// Attaches every input listener. Dropping the returned listeners detaches
/// them.
pub fn install(shared: &Rc<Shared>) -> ScrollResult<Vec<EventListener>> {
    let window = web_sys::window().ok_or_else(|| ScrollError::missing("window"))?;
    let document = window
        .document()
        .ok_or_else(|| ScrollError::missing("document"))?;
    let window: &EventTarget = window.as_ref();
    let document: &EventTarget = document.as_ref();

    let listeners = vec![
        listen(window, "wheel", shared, on_wheel),
        listen(window, "touchstart", shared, on_touch),
        listen(window, "touchmove", shared, on_touch),
        listen(window, "touchend", shared, on_touch),
        listen(window, "touchcancel", shared, on_touch),
        listen(window, "pointerdown", shared, on_pointer),
        listen(window, "pointermove", shared, on_pointer),
        listen(window, "pointerup", shared, on_pointer),
        listen(document, "keydown", shared, on_key),
    ];
    tracing::debug!(count = listeners.len(), "input listeners installed");
    Ok(listeners)
}

/// Non-passive so handlers may cancel the native scroll. The closure holds a
/// weak reference; the session owns the listeners.
fn listen(
    target: &EventTarget,
    event: &'static str,
    shared: &Rc<Shared>,
    handler: fn(&Rc<Shared>, &Event),
) -> EventListener {
    let weak: Weak<Shared> = Rc::downgrade(shared);
    EventListener::new_with_options(
        target,
        event,
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            if let Some(shared) = weak.upgrade() {
                handler(&shared, event);
            }
        },
    )
}

fn on_wheel(shared: &Rc<Shared>, event: &Event) {
    let Some(wheel) = event.dyn_ref::<WheelEvent>() else {
        return;
    };
    let scale = match wheel.delta_mode() {
        WheelEvent::DOM_DELTA_LINE => LINE_HEIGHT_PX,
        WheelEvent::DOM_DELTA_PAGE => web_sys::window()
            .and_then(|w| w.inner_height().ok())
            .and_then(|h| h.as_f64())
            .unwrap_or(800.0),
        _ => 1.0,
    };
    dispatch(
        shared,
        event,
        Gesture::Wheel {
            delta_y: wheel.delta_y() * scale,
            at: render::now(),
        },
    );
}

fn on_touch(shared: &Rc<Shared>, event: &Event) {
    let Some(touch) = event.dyn_ref::<TouchEvent>() else {
        return;
    };
    let y = touch.touches().get(0).map(|t| f64::from(t.client_y()));
    let gesture = match (event.type_().as_str(), y) {
        ("touchstart", Some(y)) => Gesture::DragStart { y },
        ("touchmove", Some(y)) => Gesture::DragMove { y },
        ("touchend" | "touchcancel", _) => Gesture::DragEnd,
        _ => return,
    };
    dispatch(shared, event, gesture);
}

/// Mouse drags only; touch pointers are handled by the touch listeners.
fn on_pointer(shared: &Rc<Shared>, event: &Event) {
    let Some(pointer) = event.dyn_ref::<PointerEvent>() else {
        return;
    };
    if pointer.pointer_type() != "mouse" {
        return;
    }
    let y = f64::from(pointer.client_y());
    let gesture = match event.type_().as_str() {
        "pointerdown" if pointer.button() == 0 => Gesture::DragStart { y },
        "pointermove" if pointer.buttons() & 1 == 1 => Gesture::DragMove { y },
        "pointerup" => Gesture::DragEnd,
        _ => return,
    };
    dispatch(shared, event, gesture);
}

fn is_editable(target: Option<EventTarget>) -> bool {
    let Some(element) = target.and_then(|t| t.dyn_into::<HtmlElement>().ok()) else {
        return false;
    };
    element.is_content_editable()
        || matches!(
            element.tag_name().to_ascii_uppercase().as_str(),
            "INPUT" | "TEXTAREA" | "SELECT"
        )
}

fn on_key(shared: &Rc<Shared>, event: &Event) {
    let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
        return;
    };
    if key.default_prevented()
        || key.ctrl_key()
        || key.meta_key()
        || key.alt_key()
        || is_editable(event.target())
    {
        return;
    }
    let name = key.key();
    dispatch(shared, event, Gesture::Key { key: &name });
}

fn dispatch(shared: &Rc<Shared>, event: &Event, gesture: Gesture<'_>) {
    let verdict = {
        let controller = shared.controller.borrow();
        shared
            .observer
            .borrow_mut()
            .interpret(gesture, |direction| controller.can_absorb(direction))
    };
    if verdict.suppress && event.cancelable() {
        event.prevent_default();
    }
    let Some(direction) = verdict.intent else {
        return;
    };
    let outcome = shared
        .controller
        .borrow_mut()
        .navigate(direction, render::now());
    tracing::trace!(?direction, ?outcome, "intent");
    if !matches!(outcome, Outcome::Ignored(_)) {
        render::schedule(shared);
    }
}
