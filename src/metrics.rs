//! Font metrics for the standard PDF text fonts.
//!
//! Watermarks are drawn with one of the base-14 fonts, which every PDF reader
//! ships, so nothing has to be embedded. Their advance widths are fixed by the
//! Adobe AFM files and are reproduced here for the printable ASCII range.

use crate::error::{Result, WatermarkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measures text the way the drawing backend will render it.
pub trait FontMetrics {
    /// Advance width of `text` at `size` points
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64;

    /// Vertical extent of a line at `size` points
    fn height_at_size(&self, size: f64) -> f64;
}

impl<T: FontMetrics + ?Sized> FontMetrics for &T {
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64 {
        (**self).width_of_text_at_size(text, size)
    }

    fn height_at_size(&self, size: f64) -> f64 {
        (**self).height_at_size(size)
    }
}

/// Base-14 text fonts usable for watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

// Glyphs 0x20..=0x7E, WinAnsi order, 1/1000 em.
const FIRST_CHAR: u8 = 0x20;
const LAST_CHAR: u8 = 0x7E;
const GLYPH_COUNT: usize = (LAST_CHAR - FIRST_CHAR + 1) as usize;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; GLYPH_COUNT] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_WIDTHS: [u16; GLYPH_COUNT] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const COURIER_WIDTH: u16 = 600;

impl StandardFont {
    pub const ALL: [StandardFont; 6] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::Courier,
        StandardFont::CourierBold,
    ];

    /// The `/BaseFont` name written into the font dictionary
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
        }
    }

    /// Parse a font name, ignoring case and `-`, `_` or space separators.
    pub fn from_name(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "helvetica" | "arial" | "sans" => Ok(StandardFont::Helvetica),
            "helveticabold" | "arialbold" | "sansbold" => Ok(StandardFont::HelveticaBold),
            "timesroman" | "times" | "serif" => Ok(StandardFont::TimesRoman),
            "timesbold" | "serifbold" => Ok(StandardFont::TimesBold),
            "courier" | "mono" | "monospace" => Ok(StandardFont::Courier),
            "courierbold" | "monobold" => Ok(StandardFont::CourierBold),
            _ => Err(WatermarkError::UnknownFont(name.to_string())),
        }
    }

    fn ascender(&self) -> f64 {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaBold => 718.0,
            StandardFont::TimesRoman | StandardFont::TimesBold => 683.0,
            StandardFont::Courier | StandardFont::CourierBold => 629.0,
        }
    }

    fn descender(&self) -> f64 {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaBold => -207.0,
            StandardFont::TimesRoman | StandardFont::TimesBold => -217.0,
            StandardFont::Courier | StandardFont::CourierBold => -157.0,
        }
    }

    /// Advance width of one encoded byte in 1/1000 em
    fn glyph_width(&self, byte: u8) -> u16 {
        let byte = if (FIRST_CHAR..=LAST_CHAR).contains(&byte) {
            byte
        } else {
            SUBSTITUTE
        };
        let idx = (byte - FIRST_CHAR) as usize;
        match self {
            StandardFont::Helvetica => HELVETICA_WIDTHS[idx],
            StandardFont::HelveticaBold => HELVETICA_BOLD_WIDTHS[idx],
            StandardFont::TimesRoman => TIMES_ROMAN_WIDTHS[idx],
            StandardFont::TimesBold => TIMES_BOLD_WIDTHS[idx],
            StandardFont::Courier | StandardFont::CourierBold => COURIER_WIDTH,
        }
    }
}

impl FontMetrics for StandardFont {
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64 {
        let units: u64 = encode_text(text)
            .bytes
            .iter()
            .map(|&b| self.glyph_width(b) as u64)
            .sum();
        units as f64 / 1000.0 * size
    }

    fn height_at_size(&self, size: f64) -> f64 {
        (self.ascender() - self.descender()) / 1000.0 * size
    }
}

impl FromStr for StandardFont {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        StandardFont::from_name(s)
    }
}

impl TryFrom<String> for StandardFont {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self> {
        StandardFont::from_name(&value)
    }
}

impl From<StandardFont> for String {
    fn from(font: StandardFont) -> Self {
        font.base_font_name().to_string()
    }
}

impl fmt::Display for StandardFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_font_name())
    }
}

// --- Text encoding ---

const SUBSTITUTE: u8 = b'?';

/// Single-byte text ready for a `Tj` operand.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub bytes: Vec<u8>,
    /// Number of characters replaced by `?`
    pub substituted: usize,
}

/// Encode text for a standard font string, replacing what cannot be shown.
pub fn encode_text(text: &str) -> EncodedText {
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = 0;
    for c in text.chars() {
        if c.is_ascii() && (FIRST_CHAR..=LAST_CHAR).contains(&(c as u8)) {
            bytes.push(c as u8);
        } else {
            bytes.push(SUBSTITUTE);
            substituted += 1;
        }
    }
    EncodedText { bytes, substituted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_widths() {
        // "Hello" = 722 + 556 + 222 + 222 + 556
        let w = StandardFont::Helvetica.width_of_text_at_size("Hello", 1000.0);
        assert!((w - 2278.0).abs() < 1e-9);
    }

    #[test]
    fn test_very_long_text_width() {
        // 5M glyphs of 944 units each exceeds u32
        let w = StandardFont::Helvetica.width_of_text_at_size(&"W".repeat(5_000_000), 1.0);
        assert!((w - 4_720_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_width_scales_with_size() {
        let font = StandardFont::TimesBold;
        let w12 = font.width_of_text_at_size("DRAFT", 12.0);
        let w24 = font.width_of_text_at_size("DRAFT", 24.0);
        assert!((w24 - 2.0 * w12).abs() < 1e-9);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let w = StandardFont::Courier.width_of_text_at_size("iiWW", 10.0);
        assert!((w - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_height_at_size() {
        let h = StandardFont::Helvetica.height_at_size(100.0);
        assert!((h - 92.5).abs() < 1e-9);
        let h = StandardFont::Courier.height_at_size(10.0);
        assert!((h - 7.86).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_has_no_width() {
        for font in StandardFont::ALL {
            assert_eq!(font.width_of_text_at_size("", 48.0), 0.0);
        }
    }

    #[test]
    fn test_non_ascii_measured_as_substitute() {
        let font = StandardFont::Helvetica;
        let a = font.width_of_text_at_size("caf\u{e9}", 10.0);
        let b = font.width_of_text_at_size("caf?", 10.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_text() {
        let encoded = encode_text("A\u{2014}B");
        assert_eq!(encoded.bytes, b"A?B".to_vec());
        assert_eq!(encoded.substituted, 1);
    }

    #[test]
    fn test_from_name_variants() {
        assert_eq!(StandardFont::from_name("Helvetica-Bold").unwrap(), StandardFont::HelveticaBold);
        assert_eq!(StandardFont::from_name("times roman").unwrap(), StandardFont::TimesRoman);
        assert_eq!(StandardFont::from_name("COURIER_BOLD").unwrap(), StandardFont::CourierBold);
        assert!(matches!(
            StandardFont::from_name("Comic Sans"),
            Err(WatermarkError::UnknownFont(_))
        ));
    }

    #[test]
    fn test_base_font_name_roundtrip() {
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(font.base_font_name()).unwrap(), font);
        }
    }

    #[test]
    fn test_serde_uses_base_font_name() {
        let json = serde_json::to_string(&StandardFont::TimesBold).unwrap();
        assert_eq!(json, "\"Times-Bold\"");
        let font: StandardFont = serde_json::from_str("\"helvetica\"").unwrap();
        assert_eq!(font, StandardFont::Helvetica);
    }
}
