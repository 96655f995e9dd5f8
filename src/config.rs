//! Watermark configuration.
//!
//! A [`WatermarkConfig`] can be read from JSON, overridden from the command
//! line, and must pass [`WatermarkConfig::validate`] before it reaches the
//! document pipeline. Validation is also where the anchor gets clamped onto
//! the page, since the placement calculator expects an in-range anchor.

use crate::error::{Result, WatermarkError};
use crate::geometry::AnchorPosition;
use crate::metrics::StandardFont;
use crate::placement::{BoxAnchor, PlacementCalculator, TextAlignment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Everything needed to stamp a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub text: String,
    pub font: StandardFont,
    pub font_size: f64,
    /// Counter-clockwise, degrees
    pub rotation: f64,
    pub opacity: f64,
    /// RGB fill, each component in `[0, 1]`
    pub color: [f64; 3],
    pub anchor: AnchorPosition,
    pub box_anchor: BoxAnchor,
    pub alignment: TextAlignment,
    pub line_spacing: f64,
    pub pages: PageSelection,
    /// Flate-compress the stamp streams
    pub compress: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        WatermarkConfig {
            text: "CONFIDENTIAL".to_string(),
            font: StandardFont::Helvetica,
            font_size: 48.0,
            rotation: -45.0,
            opacity: 0.3,
            color: [0.5, 0.5, 0.5],
            anchor: AnchorPosition::default(),
            box_anchor: BoxAnchor::CENTER,
            alignment: TextAlignment::Center,
            line_spacing: PlacementCalculator::DEFAULT_LINE_SPACING,
            pages: PageSelection::All,
            compress: true,
        }
    }
}

impl WatermarkConfig {
    pub fn new(text: &str) -> Self {
        WatermarkConfig {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check ranges and clamp the anchor. Returns the config to use.
    pub fn validate(mut self) -> Result<Self> {
        let numbers = [
            ("font_size", self.font_size),
            ("rotation", self.rotation),
            ("opacity", self.opacity),
            ("anchor.x", self.anchor.x),
            ("anchor.y", self.anchor.y),
            ("box_anchor.fx", self.box_anchor.fx),
            ("box_anchor.fy", self.box_anchor.fy),
            ("line_spacing", self.line_spacing),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(WatermarkError::invalid(format!("{} must be finite, got {}", name, value)));
            }
        }

        if self.font_size <= 0.0 {
            return Err(WatermarkError::invalid(format!(
                "font_size must be positive, got {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::invalid(format!(
                "opacity must be within 0.0-1.0, got {}",
                self.opacity
            )));
        }
        if self.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(WatermarkError::invalid(format!(
                "color components must be within 0.0-1.0, got {:?}",
                self.color
            )));
        }
        if !(0.0..=1.0).contains(&self.box_anchor.fx) || !(0.0..=1.0).contains(&self.box_anchor.fy) {
            return Err(WatermarkError::invalid(format!(
                "box_anchor fractions must be within 0.0-1.0, got ({}, {})",
                self.box_anchor.fx, self.box_anchor.fy
            )));
        }
        if self.line_spacing <= 0.0 {
            return Err(WatermarkError::invalid(format!(
                "line_spacing must be positive, got {}",
                self.line_spacing
            )));
        }

        let clamped = self.anchor.clamped();
        if clamped != self.anchor {
            tracing::debug!(
                from_x = self.anchor.x,
                from_y = self.anchor.y,
                to_x = clamped.x,
                to_y = clamped.y,
                "Anchor clamped onto page"
            );
            self.anchor = clamped;
        }

        Ok(self)
    }

    pub fn calculator(&self) -> PlacementCalculator {
        PlacementCalculator::new()
            .with_box_anchor(self.box_anchor)
            .with_alignment(self.alignment)
            .with_line_spacing(self.line_spacing)
    }
}

/// Parse an `r,g,b` colour (components 0-1) or a `#rrggbb` hex colour.
pub fn parse_color(s: &str) -> std::result::Result<[f64; 3], String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("hex colour must be #rrggbb, got '{}'", s));
        }
        let mut rgb = [0.0; 3];
        for (i, slot) in rgb.iter_mut().enumerate() {
            let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| format!("invalid hex colour '{}'", s))?;
            *slot = byte as f64 / 255.0;
        }
        return Ok(rgb);
    }

    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid colour '{}': {}", s, e))?;
    match parts.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(format!("colour needs three components, got '{}'", s)),
    }
}

// --- Page selection ---

/// Which pages receive the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageSelection {
    #[default]
    All,
    /// 1-based, inclusive ranges in the order given
    Ranges(Vec<(usize, usize)>),
}

impl PageSelection {
    /// Resolve to sorted, de-duplicated 0-based page indices.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        match self {
            PageSelection::All => Ok((0..page_count).collect()),
            PageSelection::Ranges(ranges) => {
                let mut indices = Vec::new();
                for &(start, end) in ranges {
                    if end > page_count {
                        return Err(WatermarkError::PageOutOfRange {
                            page: end,
                            count: page_count,
                        });
                    }
                    indices.extend((start - 1)..end);
                }
                indices.sort_unstable();
                indices.dedup();
                Ok(indices)
            }
        }
    }
}

impl FromStr for PageSelection {
    type Err = WatermarkError;

    /// Parses `all` or a list like `1,3-5`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let mut ranges = Vec::new();
        for part in s.split(',').map(str::trim) {
            let parse = |v: &str| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| WatermarkError::invalid(format!("invalid page number '{}'", v)))
            };
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (parse(a)?, parse(b)?),
                None => {
                    let p = parse(part)?;
                    (p, p)
                }
            };
            if start == 0 || end == 0 || start > end {
                return Err(WatermarkError::invalid(format!(
                    "invalid page range '{}' (1-indexed, inclusive)",
                    part
                )));
            }
            ranges.push((start, end));
        }
        Ok(PageSelection::Ranges(ranges))
    }
}

impl TryFrom<String> for PageSelection {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PageSelection> for String {
    fn from(selection: PageSelection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => f.write_str("all"),
            PageSelection::Ranges(ranges) => {
                let parts: Vec<String> = ranges
                    .iter()
                    .map(|&(a, b)| if a == b { a.to_string() } else { format!("{}-{}", a, b) })
                    .collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = WatermarkConfig::default().validate().unwrap();
        assert_eq!(config.text, "CONFIDENTIAL");
        assert_eq!(config.font_size, 48.0);
        assert_eq!(config.anchor, AnchorPosition::new(50.0, 50.0));
    }

    #[test]
    fn test_anchor_is_clamped() {
        let mut config = WatermarkConfig::new("DRAFT");
        config.anchor = AnchorPosition::new(-20.0, 150.0);
        let config = config.validate().unwrap();
        assert_eq!(config.anchor, AnchorPosition::new(0.0, 100.0));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = WatermarkConfig::new("X");
        config.opacity = 1.5;
        assert!(matches!(config.validate(), Err(WatermarkError::InvalidConfig(_))));

        let mut config = WatermarkConfig::new("X");
        config.font_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = WatermarkConfig::new("X");
        config.rotation = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = WatermarkConfig::new("X");
        config.color = [0.0, 2.0, 0.0];
        assert!(config.validate().is_err());

        let mut config = WatermarkConfig::new("X");
        config.line_spacing = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_text_is_allowed() {
        assert!(WatermarkConfig::new("").validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "text": "PROPRIETARY",
            "font": "Times-Bold",
            "rotation": 30,
            "anchor": {"x": 25, "y": 75},
            "box_anchor": {"fx": 0.0, "fy": 0.0},
            "pages": "1,3-4"
        }"#;
        let config = WatermarkConfig::from_json_str(json).unwrap();
        assert_eq!(config.text, "PROPRIETARY");
        assert_eq!(config.font, StandardFont::TimesBold);
        assert_eq!(config.rotation, 30.0);
        assert_eq!(config.opacity, 0.3);
        assert_eq!(config.anchor, AnchorPosition::new(25.0, 75.0));
        assert_eq!(config.box_anchor, BoxAnchor::BOTTOM_LEFT);
        assert_eq!(config.pages, PageSelection::Ranges(vec![(1, 1), (3, 4)]));
    }

    #[test]
    fn test_from_json_rejects_unknown_font_and_fields() {
        assert!(WatermarkConfig::from_json_str(r#"{"font": "Papyrus"}"#).is_err());
        assert!(WatermarkConfig::from_json_str(r#"{"txt": "typo"}"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = WatermarkConfig::new("A\nB");
        config.pages = "2-3".parse().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back = WatermarkConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_page_selection_resolve() {
        let all = PageSelection::All.resolve(3).unwrap();
        assert_eq!(all, vec![0, 1, 2]);

        let sel: PageSelection = "3, 1-2, 2".parse().unwrap();
        assert_eq!(sel.resolve(5).unwrap(), vec![0, 1, 2]);

        let sel: PageSelection = "4-6".parse().unwrap();
        assert!(matches!(
            sel.resolve(5),
            Err(WatermarkError::PageOutOfRange { page: 6, count: 5 })
        ));
    }

    #[test]
    fn test_page_selection_parse_errors() {
        assert!("0".parse::<PageSelection>().is_err());
        assert!("5-2".parse::<PageSelection>().is_err());
        assert!("x".parse::<PageSelection>().is_err());
        assert_eq!("ALL".parse::<PageSelection>().unwrap(), PageSelection::All);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("1,0,0").unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(parse_color("#ff0000").unwrap(), [1.0, 0.0, 0.0]);
        assert!(parse_color("#ff00").is_err());
        assert!(parse_color("1,0").is_err());
        assert!(parse_color("#a\u{e9}123").is_err());
    }

    #[test]
    fn test_box_anchor_out_of_range_rejected() {
        let mut config = WatermarkConfig::default();
        config.box_anchor = BoxAnchor::new(5.0, 0.5);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("box_anchor"));

        let mut config = WatermarkConfig::default();
        config.box_anchor = BoxAnchor::new(0.5, -0.1);
        assert!(config.validate().is_err());

        let mut config = WatermarkConfig::default();
        config.box_anchor = BoxAnchor::new(1.0, 0.0);
        assert!(config.validate().is_ok());
    }
}
