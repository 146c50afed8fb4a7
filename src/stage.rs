use crate::background::BackgroundSurface;
use crate::section::SectionDescriptor;

/// Scroll geometry of a section's internal scroll region, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    pub top: f64,
    pub height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn room_below(&self, tolerance: f64) -> bool {
        self.top + self.client_height < self.height - tolerance
    }

    pub fn room_above(&self, tolerance: f64) -> bool {
        self.top > tolerance
    }
}

/// Where the layering policy parks a section: earlier sections stack above
/// later ones, and every section but the first starts one viewport below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub z_index: usize,
    pub offset: f64,
}

impl Placement {
    pub fn for_index(index: usize, count: usize) -> Self {
        Self {
            z_index: count - index,
            offset: if index == 0 { 0.0 } else { 100.0 },
        }
    }
}

/// Every page side effect the controller performs.
pub trait Stage: BackgroundSurface {
    type Root: Clone;

    /// Suppresses (or restores) native page scrolling.
    fn lock_page(&mut self, locked: bool);

    /// Pins `section` as a full-viewport layer.
    fn place(&mut self, section: &SectionDescriptor<Self::Root>, placement: Placement);

    /// Only the active section takes pointer input and is exposed to
    /// assistive tech.
    fn set_active(&mut self, section: &SectionDescriptor<Self::Root>, active: bool);

    /// Vertical offset of the section layer, in percent of the viewport.
    fn set_offset(&mut self, section: &SectionDescriptor<Self::Root>, percent: f64);

    fn scroll_metrics(&self, section: &SectionDescriptor<Self::Root>) -> ScrollMetrics;

    fn scroll_by(&mut self, section: &SectionDescriptor<Self::Root>, delta: f64);

    fn reset_scroll(&mut self, section: &SectionDescriptor<Self::Root>);

    /// Returns animate-on-enter elements to their hidden starting state.
    fn prepare_entry(&mut self, section: &SectionDescriptor<Self::Root>);

    fn mount_progress(&mut self);

    /// `fraction` is in `(0, 1]`.
    fn render_progress(&mut self, fraction: f64);

    fn unmount_progress(&mut self);
}
