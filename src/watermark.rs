//! Stamping text watermarks onto existing documents.
//!
//! Each selected page gets one extra content stream. The page's original
//! content is wrapped in `q ... Q` so whatever graphics state it leaves behind
//! cannot shift or tint the stamp, and the page's resources are copied inline
//! before the watermark font and graphics state are added, so resource
//! dictionaries shared between pages are never touched.
//!
//! Pages with `/Rotate` are laid out in the frame the viewer displays: the
//! anchor is taken relative to the displayed page, mapped back to user space,
//! and the display rotation is added to the text angle.

use crate::compression;
use crate::config::WatermarkConfig;
use crate::error::{Result, WatermarkError};
use crate::geometry::{text_matrix, Rotation};
use crate::metrics::{encode_text, StandardFont};
use crate::pdf::{Dictionary, ObjectId, PageInfo, PdfDocument, PdfObject, PdfStream};
use crate::pdf_generator::{escape_pdf_bytes, format_number};
use crate::placement::{BlockPlacement, PlacementCalculator, TextBlock};
use rayon::prelude::*;
use serde::Serialize;

pub const FONT_RESOURCE: &str = "Fpdfmark";
pub const GSTATE_RESOURCE: &str = "GSpdfmark";

/// Placement used on one page (1-based page number).
#[derive(Debug, Clone, Serialize)]
pub struct PageStamp {
    pub page: usize,
    pub placement: BlockPlacement,
}

/// Outcome of stamping a document.
#[derive(Debug, Clone, Serialize)]
pub struct StampReport {
    pub pages_total: usize,
    pub pages_stamped: usize,
    /// Characters drawn as `?` because the standard fonts cannot show them
    pub substituted_chars: usize,
    pub placements: Vec<PageStamp>,
}

/// Resource names picked for one page, avoiding names it already uses.
#[derive(Debug, Clone)]
struct PreparedPage {
    index: usize,
    info: PageInfo,
    resources: Dictionary,
    font_name: String,
    gstate_name: String,
}

struct RenderedPage {
    prepared: PreparedPage,
    placement: BlockPlacement,
    stream: PdfStream,
}

/// Stamp the configured watermark onto every selected page of `doc`.
///
/// Either every selected page is stamped or `doc` is left unchanged.
pub fn stamp_document(doc: &mut PdfDocument, config: &WatermarkConfig) -> Result<StampReport> {
    let config = config.clone().validate()?;
    let pages = doc.pages()?;
    if pages.is_empty() {
        return Err(WatermarkError::NoPages);
    }
    let selected = config.pages.resolve(pages.len())?;

    let block = TextBlock::layout(
        &config.text,
        config.font_size,
        config.line_spacing,
        config.alignment,
        &config.font,
    );
    let substituted: usize = block.lines.iter().map(|line| encode_text(&line.text).substituted).sum();
    if substituted > 0 {
        tracing::warn!(
            count = substituted,
            font = %config.font,
            "Characters outside the standard font encoding will be drawn as '?'"
        );
    }

    let prepared: Vec<PreparedPage> = selected
        .iter()
        .map(|&index| prepare_page(doc, index, &pages[index]))
        .collect();

    let calculator = config.calculator();
    let rendered = prepared
        .into_par_iter()
        .map(|page| render_page(page, &block, &config, &calculator))
        .collect::<Result<Vec<_>>>()?;

    let placements = apply_stamps(doc, rendered, &config);
    tracing::debug!(stamped = placements.len(), total = pages.len(), "Stamped document");

    Ok(StampReport {
        pages_total: pages.len(),
        pages_stamped: placements.len(),
        substituted_chars: substituted,
        placements,
    })
}

fn prepare_page(doc: &PdfDocument, index: usize, info: &PageInfo) -> PreparedPage {
    let resources = info
        .resources
        .as_ref()
        .and_then(|r| doc.resolve(r).as_dict())
        .cloned()
        .unwrap_or_default();

    let font_name = unique_name(&sub_dictionary(doc, &resources, "Font"), FONT_RESOURCE);
    let gstate_name = unique_name(&sub_dictionary(doc, &resources, "ExtGState"), GSTATE_RESOURCE);

    PreparedPage {
        index,
        info: info.clone(),
        resources,
        font_name,
        gstate_name,
    }
}

/// Resolved copy of a resource category such as `/Font`
fn sub_dictionary(doc: &PdfDocument, resources: &Dictionary, key: &str) -> Dictionary {
    resources
        .get(key)
        .and_then(|v| doc.resolve(v).as_dict())
        .cloned()
        .unwrap_or_default()
}

/// `base`, or `base1`, `base2`, ... when the name is taken.
pub fn unique_name(existing: &Dictionary, base: &str) -> String {
    if !existing.contains_key(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !existing.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn render_page(
    prepared: PreparedPage,
    block: &TextBlock,
    config: &WatermarkConfig,
    calculator: &PlacementCalculator,
) -> Result<RenderedPage> {
    let info = &prepared.info;
    let frame = info.display_geometry();
    let target = info.display_to_user(config.anchor.to_page_point(frame));
    let rotation = config.rotation + info.rotation() as f64;
    let placement = calculator.place_block(target, block, rotation);

    tracing::debug!(
        page = prepared.index + 1,
        width = frame.width,
        height = frame.height,
        rotate = info.rotation(),
        origin_x = placement.origin.x,
        origin_y = placement.origin.y,
        "Placed watermark"
    );

    let content = build_content_stream(&placement, config, &prepared.font_name, &prepared.gstate_name);
    let mut dict = Dictionary::new();
    let data = if config.compress {
        dict.insert("Filter".to_string(), PdfObject::name("FlateDecode"));
        compression::compress_deflate(&content)?
    } else {
        content
    };

    Ok(RenderedPage {
        prepared,
        placement,
        stream: PdfStream { dict, data },
    })
}

/// Content stream drawing the placed block.
///
/// Starts with `Q` to close the `q` that guards the page's own content.
pub fn build_content_stream(
    placement: &BlockPlacement,
    config: &WatermarkConfig,
    font_name: &str,
    gstate_name: &str,
) -> Vec<u8> {
    let rotation = Rotation::from_degrees(placement.rotation_degrees);
    let [r, g, b] = config.color;

    let mut out = String::new();
    out.push_str("Q\nq\n");
    out.push_str(&format!("/{} gs\n", gstate_name));
    out.push_str(&format!("{} {} {} rg\n", format_number(r), format_number(g), format_number(b)));
    out.push_str("BT\n");
    out.push_str(&format!("/{} {} Tf\n", font_name, format_number(config.font_size)));
    for line in &placement.lines {
        let m = text_matrix(&rotation, line.origin);
        let matrix: Vec<String> = m.iter().map(|v| format_number(*v)).collect();
        out.push_str(&format!("{} Tm\n", matrix.join(" ")));
        // Escaped string bytes are printable ASCII
        let escaped = escape_pdf_bytes(&encode_text(&line.text).bytes);
        out.push_str(&format!("({}) Tj\n", String::from_utf8_lossy(&escaped)));
    }
    out.push_str("ET\nQ\n");
    out.into_bytes()
}

fn font_dictionary(font: StandardFont) -> PdfObject {
    let mut dict = Dictionary::new();
    dict.insert("Type".to_string(), PdfObject::name("Font"));
    dict.insert("Subtype".to_string(), PdfObject::name("Type1"));
    dict.insert("BaseFont".to_string(), PdfObject::name(font.base_font_name()));
    dict.insert("Encoding".to_string(), PdfObject::name("WinAnsiEncoding"));
    PdfObject::Dictionary(dict)
}

fn gstate_dictionary(opacity: f64) -> PdfObject {
    let mut dict = Dictionary::new();
    dict.insert("Type".to_string(), PdfObject::name("ExtGState"));
    dict.insert("ca".to_string(), PdfObject::Real(opacity));
    dict.insert("CA".to_string(), PdfObject::Real(opacity));
    PdfObject::Dictionary(dict)
}

/// Existing `/Contents` entries as a list of references or streams
fn content_items(doc: &PdfDocument, page: &Dictionary) -> Vec<PdfObject> {
    match page.get("Contents") {
        None => Vec::new(),
        Some(contents) => match doc.resolve(contents) {
            PdfObject::Array(items) => items.clone(),
            PdfObject::Null => Vec::new(),
            _ => vec![contents.clone()],
        },
    }
}

fn apply_stamps(doc: &mut PdfDocument, rendered: Vec<RenderedPage>, config: &WatermarkConfig) -> Vec<PageStamp> {
    if rendered.is_empty() {
        return Vec::new();
    }

    let guard_id = doc.add_object(PdfObject::Stream(PdfStream {
        dict: Dictionary::new(),
        data: b"q\n".to_vec(),
    }));
    let font_id = doc.add_object(font_dictionary(config.font));
    let gstate_id = doc.add_object(gstate_dictionary(config.opacity));

    let mut placements = Vec::with_capacity(rendered.len());
    for page in rendered {
        let RenderedPage {
            prepared,
            placement,
            stream,
        } = page;
        let stamp_id = doc.add_object(PdfObject::Stream(stream));
        let page_id = prepared.info.id;

        let Some(mut page_dict) = doc.get(page_id).and_then(|p| p.as_dict()).cloned() else {
            continue;
        };

        let mut contents = vec![PdfObject::Reference(guard_id)];
        contents.extend(content_items(doc, &page_dict));
        contents.push(PdfObject::Reference(stamp_id));
        page_dict.insert("Contents".to_string(), PdfObject::Array(contents));

        let mut resources = prepared.resources.clone();
        add_resource(doc, &mut resources, "Font", &prepared.font_name, font_id);
        add_resource(doc, &mut resources, "ExtGState", &prepared.gstate_name, gstate_id);
        page_dict.insert("Resources".to_string(), PdfObject::Dictionary(resources));

        doc.objects.insert(page_id, PdfObject::Dictionary(page_dict));
        placements.push(PageStamp {
            page: prepared.index + 1,
            placement,
        });
    }
    placements
}

fn add_resource(doc: &PdfDocument, resources: &mut Dictionary, category: &str, name: &str, id: ObjectId) {
    let mut entries = sub_dictionary(doc, resources, category);
    entries.insert(name.to_string(), PdfObject::Reference(id));
    resources.insert(category.to_string(), PdfObject::Dictionary(entries));
}
