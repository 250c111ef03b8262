//! Coordinate mapping between the page viewer and PDF user space
//!
//! The viewer places overlays with a top-left origin in CSS pixels. PDF pages
//! use a bottom-left origin in points. At a render scale of 1.0 a pixel is a
//! point, so mapping only flips the vertical axis.

use serde::{Deserialize, Serialize};

/// A position, either in screen space (top-left origin) or PDF space
/// (bottom-left origin) depending on where it came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Native page dimensions in PDF units (usually points)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
        }
    }
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }

    /// Clamp into `[min, max]` per axis.
    ///
    /// With `keep_aspect` the box is scaled uniformly first, so a resize that
    /// overshoots a bound keeps its proportions. Aspect ratios that cannot
    /// satisfy both bounds at once fall back to per-axis clamping.
    /// Where `min` exceeds `max` (or a bound is NaN) the `max` side wins.
    pub fn clamp(self, min: Size, max: Size, keep_aspect: bool) -> Size {
        // f64::clamp panics on inverted or NaN bounds
        let per_axis = |s: Size| Size {
            width: s.width.max(min.width).min(max.width),
            height: s.height.max(min.height).min(max.height),
        };

        if !keep_aspect || self.width <= 0.0 || self.height <= 0.0 {
            return per_axis(self);
        }

        let shrink = (max.width / self.width)
            .min(max.height / self.height)
            .min(1.0);
        let grow = (min.width / self.width)
            .max(min.height / self.height)
            .max(1.0);
        let factor = if shrink < 1.0 { shrink } else { grow };

        per_axis(Size {
            width: self.width * factor,
            height: self.height * factor,
        })
    }
}

/// Map a screen-space rectangle to the PDF position of its bottom-left corner.
///
/// `pdf_x = x`, `pdf_y = page_height - y - height`. Subtracting the height
/// anchors the image's bottom edge, which is what PDF drawing operators
/// position. Results are not clamped; a rectangle hanging off the page maps
/// to coordinates outside it.
pub fn screen_to_pdf(position: Point, size: Size, page: PageSize) -> Point {
    Point {
        x: position.x,
        y: page.height - position.y - size.height,
    }
}

/// Inverse of [`screen_to_pdf`]
pub fn pdf_to_screen(pdf: Point, size: Size, page: PageSize) -> Point {
    Point {
        x: pdf.x,
        y: page.height - pdf.y - size.height,
    }
}

/// Bring a rectangle captured at `scale` back to the 1:1 pixel-to-point space
/// [`screen_to_pdf`] expects.
pub fn normalize(position: Point, size: Size, scale: f64) -> (Point, Size) {
    if scale == 1.0 {
        return (position, size);
    }
    (
        Point {
            x: position.x / scale,
            y: position.y / scale,
        },
        Size {
            width: size.width / scale,
            height: size.height / scale,
        },
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Screen -> PDF -> screen is exact for whole-pixel geometry
        #[test]
        fn roundtrip_is_exact_for_pixel_values(
            page_h in 1u32..5000,
            y_frac in 0.0f64..=1.0,
            h_frac in 0.0f64..=1.0,
            x in 0u32..5000,
        ) {
            let page = PageSize { width: 5000.0, height: page_h as f64 };
            let y = (y_frac * page_h as f64).floor();
            let h = (h_frac * page_h as f64).floor();
            let position = Point::new(x as f64, y);
            let size = Size::new(10.0, h);

            let pdf = screen_to_pdf(position, size, page);
            let back = pdf_to_screen(pdf, size, page);

            prop_assert_eq!(back.x, position.x);
            prop_assert_eq!(back.y, position.y);
        }

        /// Fractional geometry round-trips within floating point tolerance
        #[test]
        fn roundtrip_fractional(
            page_h in 1.0f64..5000.0,
            y_pct in 0.0f64..=1.0,
            h_pct in 0.0f64..=1.0,
        ) {
            let page = PageSize { width: 612.0, height: page_h };
            let position = Point::new(0.0, y_pct * page_h);
            let size = Size::new(1.0, h_pct * page_h);

            let back = pdf_to_screen(screen_to_pdf(position, size, page), size, page);
            prop_assert!((back.y - position.y).abs() < 1e-9);
        }

        /// An overlay touching the top of the viewer sits flush with the page top
        #[test]
        fn top_edge_flush(page_h in 1.0f64..5000.0, h_pct in 0.0f64..=1.0) {
            let h = h_pct * page_h;
            let page = PageSize { width: 612.0, height: page_h };
            let pdf = screen_to_pdf(Point::new(0.0, 0.0), Size::new(1.0, h), page);
            prop_assert!((pdf.y + h - page_h).abs() < 1e-9);
        }

        /// Moving down on screen moves down on the page
        #[test]
        fn y_axis_direction(
            page_h in 100.0f64..5000.0,
            y1 in 0.0f64..50.0,
            dy in 1.0f64..50.0,
        ) {
            let page = PageSize { width: 612.0, height: page_h };
            let size = Size::new(10.0, 10.0);
            let a = screen_to_pdf(Point::new(0.0, y1), size, page);
            let b = screen_to_pdf(Point::new(0.0, y1 + dy), size, page);
            prop_assert!(b.y < a.y);
        }

        /// Clamping always lands inside the configured bounds
        #[test]
        fn clamp_stays_in_bounds(
            w in 0.1f64..2000.0,
            h in 0.1f64..2000.0,
            keep_aspect in any::<bool>(),
        ) {
            let min = Size::new(50.0, 25.0);
            let max = Size::new(400.0, 200.0);
            let c = Size::new(w, h).clamp(min, max, keep_aspect);
            prop_assert!(c.width >= min.width && c.width <= max.width);
            prop_assert!(c.height >= min.height && c.height <= max.height);
        }

        /// Normalizing a scaled capture recovers the 1:1 geometry
        #[test]
        fn normalize_inverts_scaling(
            x in 0.0f64..1000.0,
            y in 0.0f64..1000.0,
            scale in 0.5f64..3.0,
        ) {
            let (pos, _) = normalize(Point::new(x * scale, y * scale), Size::new(scale, scale), scale);
            prop_assert!((pos.x - x).abs() < 1e-9);
            prop_assert!((pos.y - y).abs() < 1e-9);
        }
    }
}
