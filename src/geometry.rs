//! Page geometry and coordinate conversion.
//!
//! Two coordinate conventions meet here:
//!
//! - **Screen space**: percentages of the page, origin top-left, Y down. This is
//!   what an interactive preview produces when the user drags an overlay.
//! - **Page space**: PDF user-space points (1/72 inch), origin bottom-left, Y up.

use serde::{Deserialize, Serialize};

// --- Page sizes ---

/// A4 portrait in points
pub const A4: PageGeometry = PageGeometry {
    width: 595.0,
    height: 842.0,
};

/// US Letter portrait in points
pub const LETTER: PageGeometry = PageGeometry {
    width: 612.0,
    height: 792.0,
};

/// Physical page dimensions in points, Y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        PageGeometry { width, height }
    }

    /// The same page turned a quarter turn (width and height swapped)
    pub fn transposed(&self) -> Self {
        PageGeometry {
            width: self.height,
            height: self.width,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Anchor chosen on the preview, in percent of the page (screen convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPosition {
    pub x: f64,
    pub y: f64,
}

impl Default for AnchorPosition {
    fn default() -> Self {
        AnchorPosition { x: 50.0, y: 50.0 }
    }
}

impl AnchorPosition {
    pub fn new(x: f64, y: f64) -> Self {
        AnchorPosition { x, y }
    }

    /// Clamp both percentages into `[0, 100]`.
    ///
    /// NaN is left untouched; configuration validation rejects it separately.
    pub fn clamped(self) -> Self {
        AnchorPosition {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
        }
    }

    /// Map the anchor onto a page, flipping the Y axis.
    pub fn to_page_point(self, page: PageGeometry) -> Point {
        let x = (self.x / 100.0) * page.width;
        let y = page.height - (self.y / 100.0) * page.height;
        Point::new(x, y)
    }

    /// Inverse of [`AnchorPosition::to_page_point`]
    pub fn from_page_point(point: Point, page: PageGeometry) -> Self {
        AnchorPosition {
            x: point.x / page.width * 100.0,
            y: (page.height - point.y) / page.height * 100.0,
        }
    }
}

/// Counter-clockwise 2D rotation in degrees.
///
/// Holds the precomputed sine and cosine so a layout pass does the trig once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    degrees: f64,
    cos: f64,
    sin: f64,
}

impl Rotation {
    pub fn from_degrees(degrees: f64) -> Self {
        let rad = degrees * std::f64::consts::PI / 180.0;
        Rotation {
            degrees,
            cos: rad.cos(),
            sin: rad.sin(),
        }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn cos(&self) -> f64 {
        self.cos
    }

    pub fn sin(&self) -> f64 {
        self.sin
    }

    /// Rotate the vector `(x, y)`
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }
}

/// Normalise any real angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Text matrix `[a b c d e f]` for drawing rotated text at `origin`.
pub fn text_matrix(rotation: &Rotation, origin: Point) -> [f64; 6] {
    [
        rotation.cos(),
        rotation.sin(),
        -rotation.sin(),
        rotation.cos(),
        origin.x,
        origin.y,
    ]
}
