//! Page navigation and zoom for the signing viewer

use crate::config::ViewerConfig;
use serde::{Deserialize, Serialize};

/// Which page is showing and at what zoom.
///
/// `page` is 1-based and always within `[1, page_count]`. The zoom is also
/// the capture scale recorded on annotations placed while it is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerState {
    page: u32,
    page_count: u32,
    zoom: f64,
    #[serde(default)]
    limits: ViewerConfig,
}

impl ViewerState {
    /// `page_count` of 0 is treated as 1 so the state stays navigable
    pub fn new(page_count: u32, limits: ViewerConfig) -> Self {
        Self {
            page: 1,
            page_count: page_count.max(1),
            zoom: 1.0,
            limits,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn next_page(&mut self) -> u32 {
        self.go_to(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> u32 {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> u32 {
        self.go_to(1)
    }

    pub fn last_page(&mut self) -> u32 {
        self.go_to(self.page_count)
    }

    /// Jump to `page`, clamped into range. Returns the page now showing.
    pub fn go_to(&mut self, page: u32) -> u32 {
        self.page = page.clamp(1, self.page_count);
        self.page
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + self.limits.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - self.limits.zoom_step)
    }

    pub fn reset_zoom(&mut self) -> f64 {
        self.set_zoom(1.0)
    }

    /// Set zoom, clamped to the configured range. Non-finite input is ignored.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.limits.min_zoom, self.limits.max_zoom);
        }
        self.zoom
    }

    pub fn can_go_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn can_go_previous(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(pages: u32) -> ViewerState {
        ViewerState::new(pages, ViewerConfig::default())
    }

    #[test]
    fn test_starts_on_first_page_at_unit_zoom() {
        let v = viewer(5);
        assert_eq!(v.page(), 1);
        assert_eq!(v.zoom(), 1.0);
        assert!(!v.can_go_previous());
        assert!(v.can_go_next());
    }

    #[test]
    fn test_navigation_clamps() {
        let mut v = viewer(3);
        assert_eq!(v.previous_page(), 1);
        assert_eq!(v.next_page(), 2);
        assert_eq!(v.next_page(), 3);
        assert_eq!(v.next_page(), 3);
        assert_eq!(v.go_to(0), 1);
        assert_eq!(v.go_to(99), 3);
        assert_eq!(v.first_page(), 1);
        assert_eq!(v.last_page(), 3);
    }

    #[test]
    fn test_zero_page_document() {
        let mut v = viewer(0);
        assert_eq!(v.page_count(), 1);
        assert_eq!(v.next_page(), 1);
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut v = viewer(1);
        assert_eq!(v.zoom_in(), 1.25);
        for _ in 0..20 {
            v.zoom_in();
        }
        assert_eq!(v.zoom(), 3.0);

        for _ in 0..20 {
            v.zoom_out();
        }
        assert_eq!(v.zoom(), 0.5);

        assert_eq!(v.reset_zoom(), 1.0);
    }

    #[test]
    fn test_set_zoom_ignores_nan() {
        let mut v = viewer(1);
        v.set_zoom(2.0);
        assert_eq!(v.set_zoom(f64::NAN), 2.0);
    }
}
