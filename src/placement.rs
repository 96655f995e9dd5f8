//! Watermark placement.
//!
//! A preview shows the watermark centred on the point the user dragged it to
//! and rotated about its own centre. PDF text matrices rotate about the
//! baseline start instead, so the draw origin has to be pulled back by the
//! rotated anchor offset or the exported stamp drifts away from the preview as
//! the angle changes.
//!
//! [`compute_placement`] is the single-line centre-anchored case.
//! [`PlacementCalculator`] generalises it to multi-line blocks, any anchor
//! point inside the block, and backends that pivot about the box centre.

use crate::geometry::{normalize_degrees, AnchorPosition, PageGeometry, Point, Rotation};
use crate::metrics::FontMetrics;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lower-left draw origin in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub origin_x: f64,
    pub origin_y: f64,
}

impl Placement {
    pub fn origin(&self) -> Point {
        Point::new(self.origin_x, self.origin_y)
    }
}

/// Compute where a single line of text must be drawn so that, once rotated
/// about its baseline start, its visual centre sits on `anchor`.
///
/// Empty text is a zero-size box and lands exactly on the anchor.
pub fn compute_placement<M: FontMetrics + ?Sized>(
    anchor: AnchorPosition,
    page: PageGeometry,
    text: &str,
    font_size: f64,
    rotation_degrees: f64,
    metrics: &M,
) -> Placement {
    let (text_width, text_height) = if text.is_empty() {
        (0.0, 0.0)
    } else {
        (
            metrics.width_of_text_at_size(text, font_size),
            metrics.height_at_size(font_size),
        )
    };

    let center = anchor.to_page_point(page);
    let cx = text_width / 2.0;
    let cy = text_height / 2.0;

    let rotation = Rotation::from_degrees(normalize_degrees(rotation_degrees));
    let (dx, dy) = rotation.apply(cx, cy);

    Placement {
        origin_x: center.x - dx,
        origin_y: center.y - dy,
    }
}

// --- Block layout ---

/// Horizontal alignment of lines inside a multi-line block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlignment {
    fn factor(&self) -> f64 {
        match self {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => 0.5,
            TextAlignment::Right => 1.0,
        }
    }
}

impl FromStr for TextAlignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(TextAlignment::Left),
            "center" | "centre" => Ok(TextAlignment::Center),
            "right" => Ok(TextAlignment::Right),
            other => Err(format!("unknown alignment '{}' (left, center, right)", other)),
        }
    }
}

/// How the drawing backend rotates the box it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PivotConvention {
    /// Rotation about the origin passed in (PDF `Tm`, most text APIs)
    #[default]
    BaselineStart,
    /// Rotation about the centre of the unrotated box
    BoxCenter,
}

impl FromStr for PivotConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline-start" | "baseline" | "origin" => Ok(PivotConvention::BaselineStart),
            "box-center" | "center" | "centre" => Ok(PivotConvention::BoxCenter),
            other => Err(format!(
                "unknown pivot '{}' (baseline-start, box-center)",
                other
            )),
        }
    }
}

/// Point of the text block that lands on the page anchor, as fractions of
/// the block measured from its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxAnchor {
    pub fx: f64,
    pub fy: f64,
}

impl Default for BoxAnchor {
    fn default() -> Self {
        BoxAnchor::CENTER
    }
}

impl BoxAnchor {
    pub const CENTER: BoxAnchor = BoxAnchor { fx: 0.5, fy: 0.5 };
    pub const TOP_LEFT: BoxAnchor = BoxAnchor { fx: 0.0, fy: 1.0 };
    pub const TOP: BoxAnchor = BoxAnchor { fx: 0.5, fy: 1.0 };
    pub const TOP_RIGHT: BoxAnchor = BoxAnchor { fx: 1.0, fy: 1.0 };
    pub const LEFT: BoxAnchor = BoxAnchor { fx: 0.0, fy: 0.5 };
    pub const RIGHT: BoxAnchor = BoxAnchor { fx: 1.0, fy: 0.5 };
    pub const BOTTOM_LEFT: BoxAnchor = BoxAnchor { fx: 0.0, fy: 0.0 };
    pub const BOTTOM: BoxAnchor = BoxAnchor { fx: 0.5, fy: 0.0 };
    pub const BOTTOM_RIGHT: BoxAnchor = BoxAnchor { fx: 1.0, fy: 0.0 };

    pub fn new(fx: f64, fy: f64) -> Self {
        BoxAnchor { fx, fy }
    }

    fn local_point(&self, width: f64, height: f64) -> (f64, f64) {
        (self.fx * width, self.fy * height)
    }
}

impl FromStr for BoxAnchor {
    type Err = String;

    /// Accepts a compass name (`top-left`, `center`, ...) or `fx,fy`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let named = match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "center" | "centre" => Some(BoxAnchor::CENTER),
            "top-left" => Some(BoxAnchor::TOP_LEFT),
            "top" => Some(BoxAnchor::TOP),
            "top-right" => Some(BoxAnchor::TOP_RIGHT),
            "left" => Some(BoxAnchor::LEFT),
            "right" => Some(BoxAnchor::RIGHT),
            "bottom-left" => Some(BoxAnchor::BOTTOM_LEFT),
            "bottom" => Some(BoxAnchor::BOTTOM),
            "bottom-right" => Some(BoxAnchor::BOTTOM_RIGHT),
            _ => None,
        };
        if let Some(anchor) = named {
            return Ok(anchor);
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if let [fx, fy] = parts.as_slice() {
            let fx = fx.parse::<f64>().map_err(|e| format!("bad fx '{}': {}", fx, e))?;
            let fy = fy.parse::<f64>().map_err(|e| format!("bad fy '{}': {}", fy, e))?;
            return Ok(BoxAnchor { fx, fy });
        }
        Err(format!("unknown box anchor '{}'", s))
    }
}

/// One measured line of a text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f64,
    /// Baseline start relative to the block's lower-left corner, unrotated
    pub offset: Point,
}

/// Text measured and stacked into lines, before any rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub width: f64,
    pub height: f64,
    pub line_advance: f64,
}

impl TextBlock {
    pub fn layout<M: FontMetrics + ?Sized>(
        text: &str,
        font_size: f64,
        line_spacing: f64,
        alignment: TextAlignment,
        metrics: &M,
    ) -> Self {
        if text.is_empty() {
            return TextBlock {
                lines: vec![TextLine {
                    text: String::new(),
                    width: 0.0,
                    offset: Point::default(),
                }],
                width: 0.0,
                height: 0.0,
                line_advance: 0.0,
            };
        }

        let line_height = metrics.height_at_size(font_size);
        let line_advance = line_height * line_spacing;
        let measured: Vec<(&str, f64)> = text
            .split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                (line, metrics.width_of_text_at_size(line, font_size))
            })
            .collect();

        let width = measured.iter().map(|(_, w)| *w).fold(0.0, f64::max);
        let count = measured.len();
        let height = line_height + (count - 1) as f64 * line_advance;

        let lines = measured
            .into_iter()
            .enumerate()
            .map(|(i, (line, line_width))| TextLine {
                text: line.to_string(),
                width: line_width,
                offset: Point::new(
                    alignment.factor() * (width - line_width),
                    (count - 1 - i) as f64 * line_advance,
                ),
            })
            .collect();

        TextBlock {
            lines,
            width,
            height,
            line_advance,
        }
    }
}

/// A line positioned on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    /// Page-space baseline start after rotation
    pub origin: Point,
}

/// Full result of placing a text block on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockPlacement {
    /// Origin to hand to a backend with the configured pivot convention
    pub origin: Point,
    pub lines: Vec<PlacedLine>,
    /// Rotation in `[0, 360)`
    pub rotation_degrees: f64,
    pub width: f64,
    pub height: f64,
    pub box_anchor: BoxAnchor,
    pub pivot: PivotConvention,
}

impl BlockPlacement {
    /// Map a block-local point (unrotated, from the lower-left corner) to the
    /// page, following the pivot convention.
    pub fn to_page(&self, local: Point) -> Point {
        let rotation = Rotation::from_degrees(self.rotation_degrees);
        match self.pivot {
            PivotConvention::BaselineStart => {
                let (dx, dy) = rotation.apply(local.x, local.y);
                self.origin.translate(dx, dy)
            }
            PivotConvention::BoxCenter => {
                let cx = self.width / 2.0;
                let cy = self.height / 2.0;
                let (dx, dy) = rotation.apply(local.x - cx, local.y - cy);
                self.origin.translate(cx + dx, cy + dy)
            }
        }
    }

    /// Where the configured box anchor ends up once drawn
    pub fn anchor_point(&self) -> Point {
        let (ax, ay) = self.box_anchor.local_point(self.width, self.height);
        self.to_page(Point::new(ax, ay))
    }

    /// Rotated block corners: lower-left, lower-right, upper-right, upper-left
    pub fn corners(&self) -> [Point; 4] {
        [
            self.to_page(Point::new(0.0, 0.0)),
            self.to_page(Point::new(self.width, 0.0)),
            self.to_page(Point::new(self.width, self.height)),
            self.to_page(Point::new(0.0, self.height)),
        ]
    }

    /// The single-line view of this placement
    pub fn placement(&self) -> Placement {
        Placement {
            origin_x: self.origin.x,
            origin_y: self.origin.y,
        }
    }
}

/// Places text blocks with a configurable anchor, alignment and pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementCalculator {
    box_anchor: BoxAnchor,
    pivot: PivotConvention,
    alignment: TextAlignment,
    line_spacing: f64,
}

impl Default for PlacementCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementCalculator {
    pub const DEFAULT_LINE_SPACING: f64 = 1.2;

    pub fn new() -> Self {
        PlacementCalculator {
            box_anchor: BoxAnchor::CENTER,
            pivot: PivotConvention::BaselineStart,
            alignment: TextAlignment::Center,
            line_spacing: Self::DEFAULT_LINE_SPACING,
        }
    }

    pub fn with_box_anchor(mut self, box_anchor: BoxAnchor) -> Self {
        self.box_anchor = box_anchor;
        self
    }

    pub fn with_pivot(mut self, pivot: PivotConvention) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f64) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    /// Measure `text` and place it so its box anchor lands on `anchor`.
    pub fn layout<M: FontMetrics + ?Sized>(
        &self,
        anchor: AnchorPosition,
        page: PageGeometry,
        text: &str,
        font_size: f64,
        rotation_degrees: f64,
        metrics: &M,
    ) -> BlockPlacement {
        let block = TextBlock::layout(text, font_size, self.line_spacing, self.alignment, metrics);
        self.place_block(anchor.to_page_point(page), &block, rotation_degrees)
    }

    /// Place an already measured block so its box anchor lands on `target`.
    pub fn place_block(&self, target: Point, block: &TextBlock, rotation_degrees: f64) -> BlockPlacement {
        let degrees = normalize_degrees(rotation_degrees);
        let rotation = Rotation::from_degrees(degrees);
        let (ax, ay) = self.box_anchor.local_point(block.width, block.height);

        let origin = match self.pivot {
            PivotConvention::BaselineStart => {
                let (dx, dy) = rotation.apply(ax, ay);
                target.translate(-dx, -dy)
            }
            PivotConvention::BoxCenter => {
                let cx = block.width / 2.0;
                let cy = block.height / 2.0;
                let (dx, dy) = rotation.apply(ax - cx, ay - cy);
                target.translate(-dx - cx, -dy - cy)
            }
        };

        let mut placement = BlockPlacement {
            origin,
            lines: Vec::with_capacity(block.lines.len()),
            rotation_degrees: degrees,
            width: block.width,
            height: block.height,
            box_anchor: self.box_anchor,
            pivot: self.pivot,
        };
        placement.lines = block
            .lines
            .iter()
            .map(|line| PlacedLine {
                text: line.text.clone(),
                origin: placement.to_page(line.offset),
            })
            .collect();
        placement
    }
}
