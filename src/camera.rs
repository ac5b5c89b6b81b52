//! Page-space camera: pan and zoom mapping between host screen pixels and page units.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::model::Point;

/// Mapping between the host's screen space and a page's coordinate space.
///
/// `pan_x` / `pan_y` are the screen position (CSS pixels) of the page origin.
/// `zoom` is screen pixels per page unit (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to page coordinates.
    #[must_use]
    pub fn screen_to_page(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a page-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn page_to_screen(&self, page: Point) -> Point {
        Point {
            x: page.x * self.zoom + self.pan_x,
            y: page.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to a page-space distance.
    #[must_use]
    pub fn screen_dist_to_page(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }
}
