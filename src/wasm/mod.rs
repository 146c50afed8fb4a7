use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::render::AnimationFrame;
use wasm_bindgen::prelude::*;

use crate::config::ControllerConfig;
use crate::controller::{Outcome, ScrollController};
use crate::error::{ScrollError, ScrollResult};
use crate::input::InputObserver;

mod dom;
mod listeners;
mod logging;
mod recipes;
mod render;

thread_local! {
    static SESSION_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// State shared between the exported session, the event listeners and the
/// frame driver. Everything runs on the page's event loop, so plain
/// `RefCell`s serialize every mutation.
pub(crate) struct Shared {
    controller: RefCell<ScrollController<dom::DomStage>>,
    observer: RefCell<InputObserver>,
    frame: RefCell<Option<AnimationFrame>>,
    listeners: RefCell<Vec<EventListener>>,
}

impl From<ScrollError> for JsValue {
    fn from(err: ScrollError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

pub(crate) fn js_err(err: JsValue) -> ScrollError {
    ScrollError::dom(
        err.as_string()
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init();
}

/// Accepts a JSON string, a plain object, or nothing.
fn read_config(value: &JsValue) -> ScrollResult<ControllerConfig> {
    if value.is_undefined() || value.is_null() {
        return Ok(ControllerConfig::default());
    }
    let json = match value.as_string() {
        Some(json) => json,
        None => String::from(js_sys::JSON::stringify(value).map_err(js_err)?),
    };
    ControllerConfig::from_json(&json)
}

/// Scans the page, takes over scrolling and returns the live session.
///
/// Returns `None`, leaving the page as a plain scrollable document, when no
/// sections match or a session is already running.
#[wasm_bindgen]
pub fn initialize(config: JsValue) -> Result<Option<ScrollSession>, JsValue> {
    if SESSION_ACTIVE.with(Cell::get) {
        tracing::warn!("scroll controller already initialized");
        return Ok(None);
    }
    let config = read_config(&config)?;

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let sections = dom::scan_sections(&window, &document, &config)?;
    if sections.is_empty() {
        tracing::warn!(
            selector = %config.selectors.section,
            "no sections found; native scrolling left in place"
        );
        return Ok(None);
    }

    let stage = dom::DomStage::new(document, &config.selectors)?;
    let registry = recipes::registry_from_config(&config);
    let observer = InputObserver::new(config.input.clone());
    let mut controller = ScrollController::new(stage, sections, registry, config)?;
    controller.start(render::now());

    let shared = Rc::new(Shared {
        controller: RefCell::new(controller),
        observer: RefCell::new(observer),
        frame: RefCell::new(None),
        listeners: RefCell::new(Vec::new()),
    });
    let installed = listeners::install(&shared)?;
    *shared.listeners.borrow_mut() = installed;
    render::schedule(&shared);

    SESSION_ACTIVE.with(|active| active.set(true));
    Ok(Some(ScrollSession {
        shared: Some(shared),
    }))
}

#[wasm_bindgen]
pub struct ScrollSession {
    shared: Option<Rc<Shared>>,
}

#[wasm_bindgen]
impl ScrollSession {
    /// Returns whether a transition started (or the tall section scrolled).
    pub fn advance(&self) -> bool {
        self.step(crate::input::Direction::Forward)
    }

    pub fn retreat(&self) -> bool {
        self.step(crate::input::Direction::Backward)
    }

    fn step(&self, direction: crate::input::Direction) -> bool {
        let Some(shared) = &self.shared else {
            return false;
        };
        let outcome = shared
            .controller
            .borrow_mut()
            .navigate(direction, render::now());
        match outcome {
            Outcome::Ignored(_) => false,
            Outcome::Started { .. } | Outcome::Absorbed => {
                render::schedule(shared);
                true
            }
        }
    }

    #[wasm_bindgen(js_name = currentIndex)]
    pub fn current_index(&self) -> usize {
        self.shared
            .as_ref()
            .map_or(0, |s| s.controller.borrow().current_index())
    }

    pub fn progress(&self) -> f64 {
        self.shared
            .as_ref()
            .map_or(0.0, |s| s.controller.borrow().progress())
    }

    #[wasm_bindgen(js_name = isTransitioning)]
    pub fn is_transitioning(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|s| s.controller.borrow().is_transitioning())
    }

    /// Removes listeners and the progress bar and restores page scrolling.
    pub fn teardown(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        shared.listeners.borrow_mut().clear();
        shared.frame.borrow_mut().take();
        shared.controller.borrow_mut().teardown();
        SESSION_ACTIVE.with(|active| active.set(false));
    }
}

/// Dropping a session (or calling `free()` from JS) tears it down.
impl Drop for ScrollSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
