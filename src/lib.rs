//! Scroll-snapping section navigator for long-form landing pages.
//!
//! The page is a stack of full-viewport sections. Wheel, touch, pointer and
//! keyboard gestures step between adjacent sections with exit/entry
//! animations and a parallax background, while tall sections scroll
//! internally before handing over.
//!
//! Everything outside `wasm` is plain Rust and runs on the host; the browser
//! side lives behind `target_arch = "wasm32"`.

pub mod background;
pub mod config;
pub mod controller;
pub mod ease;
pub mod error;
pub mod input;
pub mod registry;
pub mod section;
pub mod stage;
pub mod timeline;

pub use config::ControllerConfig;
pub use controller::{IgnoreReason, Outcome, PhaseKind, ScrollController, Status};
pub use ease::Ease;
pub use error::{ScrollError, ScrollResult};
pub use input::{Direction, Gesture, InputObserver, Verdict};
pub use registry::{AnimationHandle, AnimationPair, AnimationRegistry, Completion, Notifier};
pub use section::{BackgroundKeyframes, Layer, SectionDescriptor};
pub use stage::{Placement, ScrollMetrics, Stage};

// Only compile wasm-specific code when targeting wasm32.
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{initialize, ScrollSession};
