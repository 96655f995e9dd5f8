//! File-level operations behind the CLI.
//!
//! These wrap the library pipeline with `anyhow` context so failures name the
//! file and step that went wrong.

use crate::config::WatermarkConfig;
use crate::geometry::{PageGeometry, A4, LETTER};
use crate::pdf::PdfDocument;
use crate::pdf_generator;
use crate::placement::{BlockPlacement, PivotConvention};
use crate::watermark::{self, StampReport};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;

/// Stamp `input_file` and write the result to `output_file`.
///
/// Nothing is written unless every selected page was stamped.
///
/// # Example
///
/// ```rust,no_run
/// use pdfmark::config::WatermarkConfig;
/// use pdfmark::pdf_ops;
///
/// let config = WatermarkConfig::new("CONFIDENTIAL");
/// pdf_ops::watermark_pdf("in.pdf", "out.pdf", &config).expect("watermark failed");
/// ```
pub fn watermark_pdf(input_file: &str, output_file: &str, config: &WatermarkConfig) -> Result<StampReport> {
    let mut doc = PdfDocument::load_from_file(input_file)
        .with_context(|| format!("Failed to load {}", input_file))?;
    let report = watermark::stamp_document(&mut doc, config)
        .with_context(|| format!("Failed to watermark {}", input_file))?;
    doc.save(output_file)
        .with_context(|| format!("Failed to write {}", output_file))?;

    tracing::info!(
        input = input_file,
        output = output_file,
        pages = report.pages_stamped,
        "Watermarked document"
    );
    Ok(report)
}

/// In-memory variant of [`watermark_pdf`].
pub fn watermark_pdf_bytes(data: &[u8], config: &WatermarkConfig) -> Result<(Vec<u8>, StampReport)> {
    let mut doc = PdfDocument::load_from_bytes(data).context("Failed to parse PDF")?;
    let report = watermark::stamp_document(&mut doc, config).context("Failed to watermark PDF")?;
    Ok((doc.to_bytes(), report))
}

/// Where the watermark would land on a page of the given size.
pub fn preview_placement(
    config: &WatermarkConfig,
    page: PageGeometry,
    pivot: PivotConvention,
) -> Result<BlockPlacement> {
    if !page.is_valid() {
        return Err(anyhow!("Page size must be positive, got {} x {}", page.width, page.height));
    }
    let config = config.clone().validate()?;
    Ok(config.calculator().with_pivot(pivot).layout(
        config.anchor,
        page,
        &config.text,
        config.font_size,
        config.rotation,
        &config.font,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page: usize,
    pub width: f64,
    pub height: f64,
    pub rotate: i64,
    pub display_width: f64,
    pub display_height: f64,
}

pub fn page_summaries(input_file: &str) -> Result<Vec<PageSummary>> {
    let doc = PdfDocument::load_from_file(input_file)
        .with_context(|| format!("Failed to load {}", input_file))?;
    let pages = doc
        .pages()
        .with_context(|| format!("Failed to read page tree of {}", input_file))?;

    Ok(pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let geometry = page.geometry();
            let display = page.display_geometry();
            PageSummary {
                page: i + 1,
                width: geometry.width,
                height: geometry.height,
                rotate: page.rotation(),
                display_width: display.width,
                display_height: display.height,
            }
        })
        .collect())
}

pub fn create_blank_pdf(output_file: &str, page: PageGeometry, count: usize) -> Result<()> {
    let doc = pdf_generator::blank_document(&vec![page; count])?;
    doc.save(output_file)
        .with_context(|| format!("Failed to write {}", output_file))?;
    tracing::info!(output = output_file, pages = count, "Created blank document");
    Ok(())
}

/// Parse `a4`, `letter`, or `WIDTHxHEIGHT` in points.
pub fn parse_page_size(s: &str) -> std::result::Result<PageGeometry, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "a4" => Ok(A4),
        "letter" => Ok(LETTER),
        other => {
            let (w, h) = other
                .split_once('x')
                .ok_or_else(|| format!("page size must be a4, letter or WIDTHxHEIGHT, got '{}'", s))?;
            let width = w.trim().parse::<f64>().map_err(|e| format!("invalid width '{}': {}", w, e))?;
            let height = h.trim().parse::<f64>().map_err(|e| format!("invalid height '{}': {}", h, e))?;
            let page = PageGeometry::new(width, height);
            if !page.is_valid() {
                return Err(format!("page size must be positive, got '{}'", s));
            }
            Ok(page)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_size() {
        assert_eq!(parse_page_size("A4").unwrap(), A4);
        assert_eq!(parse_page_size("letter").unwrap(), LETTER);
        assert_eq!(parse_page_size("300x200").unwrap(), PageGeometry::new(300.0, 200.0));
        assert!(parse_page_size("300").is_err());
        assert!(parse_page_size("0x200").is_err());
        assert!(parse_page_size("tabloid").is_err());
    }

    #[test]
    fn test_preview_placement_box_center() {
        let config = WatermarkConfig::new("PROPRIETARY");
        let baseline = preview_placement(&config, A4, PivotConvention::BaselineStart).unwrap();
        let centred = preview_placement(&config, A4, PivotConvention::BoxCenter).unwrap();

        // Both conventions draw the same box, from different origins
        for (a, b) in baseline.corners().iter().zip(centred.corners().iter()) {
            assert!(a.distance(*b) < 1e-9);
        }
        assert!(baseline.origin.distance(centred.origin) > 1.0);
    }

    #[test]
    fn test_preview_rejects_bad_page() {
        let config = WatermarkConfig::default();
        assert!(preview_placement(&config, PageGeometry::new(-1.0, 10.0), PivotConvention::BaselineStart).is_err());
    }

    #[test]
    fn test_watermark_bytes_roundtrip() {
        let blank = pdf_generator::blank_document(&[A4]).unwrap().to_bytes();
        let (stamped, report) = watermark_pdf_bytes(&blank, &WatermarkConfig::new("DRAFT")).unwrap();
        assert_eq!(report.pages_stamped, 1);
        assert!(crate::pdf::validate_pdf_bytes(&stamped).valid);
    }

    #[test]
    fn test_watermark_bytes_rejects_garbage() {
        assert!(watermark_pdf_bytes(b"not a pdf", &WatermarkConfig::default()).is_err());
    }
}
