use pdfmark::compression;
use pdfmark::config::{PageSelection, WatermarkConfig};
use pdfmark::geometry::{AnchorPosition, PageGeometry, Point, A4};
use pdfmark::pdf::{validate_pdf_bytes, Dictionary, PdfDocument, PdfObject};
use pdfmark::pdf_generator::blank_document;
use pdfmark::pdf_ops;
use pdfmark::watermark::{stamp_document, FONT_RESOURCE};
use pdfmark::WatermarkError;
use std::fs;

/// Assemble a PDF from raw object bodies. The xref pointer is deliberately
/// bogus; the reader must not depend on it.
fn build_pdf(objects: &[(u32, Vec<u8>)], trailer: Option<&str>) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    for (num, body) in objects {
        out.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    if let Some(trailer) = trailer {
        out.extend_from_slice(format!("trailer\n{}\n", trailer).as_bytes());
    }
    out.extend_from_slice(b"startxref\n999999\n%%EOF\n");
    out
}

fn stream(data: &[u8], extra: &str) -> Vec<u8> {
    let mut body = format!("<< /Length {} {} >>\nstream\n", data.len(), extra).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

fn dict(body: &str) -> Vec<u8> {
    body.as_bytes().to_vec()
}

/// Two pages sharing an inherited resource dictionary; the second page is
/// cropped and rotated.
fn shared_resources_pdf() -> Vec<u8> {
    build_pdf(
        &[
            (1, dict("<< /Type /Catalog /Pages 2 0 R >>")),
            (
                2,
                dict("<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] /Resources 5 0 R >>"),
            ),
            (3, dict("<< /Type /Page /Parent 2 0 R /Contents 6 0 R >>")),
            (
                4,
                dict("<< /Type /Page /Parent 2 0 R /Contents [6 0 R 7 0 R] /Rotate 270 /CropBox [10 10 602 782] >>"),
            ),
            (5, dict("<< /Font << /F1 8 0 R >> >>")),
            (6, stream(b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET", "")),
            (7, stream(b"0 0 1 rg", "")),
            (8, dict("<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>")),
        ],
        Some("<< /Root 1 0 R /Size 9 >>"),
    )
}

fn uncompressed(text: &str) -> WatermarkConfig {
    let mut config = WatermarkConfig::new(text);
    config.compress = false;
    config
}

fn page_dict(doc: &PdfDocument, index: usize) -> Dictionary {
    let page = &doc.pages().unwrap()[index];
    doc.get(page.id).and_then(|p| p.as_dict()).cloned().unwrap()
}

fn stamp_content(doc: &PdfDocument, index: usize) -> String {
    let page = page_dict(doc, index);
    let contents = page.get("Contents").and_then(|c| c.as_array()).unwrap();
    match doc.resolve(contents.last().unwrap()) {
        PdfObject::Stream(s) => {
            String::from_utf8(compression::decode_stream(&s.dict, &s.data).unwrap()).unwrap()
        }
        other => panic!("expected stamp stream, got {:?}", other),
    }
}

#[test]
fn test_inherited_attributes() {
    let doc = PdfDocument::load_from_bytes(&shared_resources_pdf()).unwrap();
    let pages = doc.pages().unwrap();
    assert_eq!(pages.len(), 2);

    assert_eq!(pages[0].geometry(), PageGeometry::new(612.0, 792.0));
    assert_eq!(pages[0].rotation(), 0);
    assert_eq!(pages[0].resources, Some(PdfObject::Reference((5, 0))));

    assert_eq!(pages[1].geometry(), PageGeometry::new(592.0, 772.0));
    assert_eq!(pages[1].rotation(), 270);
    assert_eq!(pages[1].display_geometry(), PageGeometry::new(772.0, 592.0));
}

#[test]
fn test_stamp_keeps_shared_resources_untouched() {
    let mut doc = PdfDocument::load_from_bytes(&shared_resources_pdf()).unwrap();
    let shared_before = doc.get((5, 0)).cloned().unwrap();

    stamp_document(&mut doc, &uncompressed("SHARED")).unwrap();
    let bytes = doc.to_bytes();
    let doc = PdfDocument::load_from_bytes(&bytes).unwrap();

    assert_eq!(doc.get((5, 0)).cloned().unwrap(), shared_before);

    for index in 0..2 {
        let page = page_dict(&doc, index);
        let resources = page.get("Resources").and_then(|r| r.as_dict()).unwrap();
        let fonts = resources.get("Font").and_then(|f| f.as_dict()).unwrap();
        assert!(fonts.contains_key("F1"), "page {} lost its original font", index + 1);
        assert!(fonts.contains_key(FONT_RESOURCE));
    }
}

#[test]
fn test_stamp_wraps_original_content() {
    let mut doc = PdfDocument::load_from_bytes(&shared_resources_pdf()).unwrap();
    stamp_document(&mut doc, &uncompressed("WRAP")).unwrap();

    let first = page_dict(&doc, 0);
    let contents = first.get("Contents").and_then(|c| c.as_array()).unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[1], PdfObject::Reference((6, 0)));
    match doc.resolve(&contents[0]) {
        PdfObject::Stream(guard) => assert_eq!(guard.data, b"q\n".to_vec()),
        other => panic!("expected guard stream, got {:?}", other),
    }

    let second = page_dict(&doc, 1);
    let contents = second.get("Contents").and_then(|c| c.as_array()).unwrap();
    assert_eq!(contents.len(), 4);
    assert_eq!(&contents[1..3], &[PdfObject::Reference((6, 0)), PdfObject::Reference((7, 0))]);

    let content = stamp_content(&doc, 1);
    assert!(content.starts_with("Q\nq\n"));
    assert!(content.contains("(WRAP) Tj"));
}

#[test]
fn test_rotated_cropped_page_centres_on_visible_area() {
    let mut doc = PdfDocument::load_from_bytes(&shared_resources_pdf()).unwrap();
    let report = stamp_document(&mut doc, &uncompressed("ROTATED")).unwrap();

    let placement = &report.placements[1].placement;
    let centre = placement.anchor_point();
    assert!(centre.distance(Point::new(306.0, 396.0)) < 1e-9, "centre = {:?}", centre);
    // -45 on screen plus the page's 270 display rotation
    assert!((placement.rotation_degrees - 225.0).abs() < 1e-9);
}

#[test]
fn test_object_streams_and_xref_stream() {
    let obj2 = "<< /Type /Pages /Kids [3 0 R] /Count 1 >>";
    let obj3 = "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] /Contents 5 0 R >>";
    let header = format!("2 0 3 {} ", obj2.len() + 1);
    let packed = format!("{}{} {}", header, obj2, obj3);
    let compressed = compression::compress_deflate(packed.as_bytes()).unwrap();

    let pdf = build_pdf(
        &[
            (1, dict("<< /Type /Catalog /Pages 2 0 R >>")),
            (
                4,
                stream(
                    &compressed,
                    &format!("/Type /ObjStm /N 2 /First {} /Filter /FlateDecode", header.len()),
                ),
            ),
            (5, stream(b"0 0 m 10 10 l S", "")),
            (6, stream(b"\x01\x00\x10", "/Type /XRef /Root 1 0 R /Size 7 /W [1 1 1]")),
        ],
        None,
    );

    let mut doc = PdfDocument::load_from_bytes(&pdf).unwrap();
    assert!(doc.get((4, 0)).is_none(), "object stream container should be dropped");
    assert!(doc.get((6, 0)).is_none(), "xref stream should be dropped");
    let pages = doc.pages().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].geometry(), PageGeometry::new(300.0, 400.0));

    stamp_document(&mut doc, &WatermarkConfig::new("PACKED")).unwrap();
    let validation = validate_pdf_bytes(&doc.to_bytes());
    assert!(validation.valid, "errors: {:?}", validation.errors);
    assert_eq!(validation.page_count, 1);
}

#[test]
fn test_encrypted_document_rejected() {
    let pdf = build_pdf(
        &[
            (1, dict("<< /Type /Catalog /Pages 2 0 R >>")),
            (2, dict("<< /Type /Pages /Kids [] /Count 0 >>")),
            (9, dict("<< /Filter /Standard /V 2 /R 3 >>")),
        ],
        Some("<< /Root 1 0 R /Encrypt 9 0 R /Size 10 >>"),
    );
    assert!(matches!(
        PdfDocument::load_from_bytes(&pdf),
        Err(WatermarkError::Unsupported(_))
    ));
}

#[test]
fn test_page_tree_loop_rejected() {
    let pdf = build_pdf(
        &[
            (1, dict("<< /Type /Catalog /Pages 2 0 R >>")),
            (2, dict("<< /Type /Pages /Kids [2 0 R] /Count 1 >>")),
        ],
        Some("<< /Root 1 0 R >>"),
    );
    let doc = PdfDocument::load_from_bytes(&pdf).unwrap();
    assert!(matches!(doc.pages(), Err(WatermarkError::MalformedPdf(_))));
}

#[test]
fn test_empty_page_tree_is_an_error() {
    let pdf = build_pdf(
        &[
            (1, dict("<< /Type /Catalog /Pages 2 0 R >>")),
            (2, dict("<< /Type /Pages /Kids [] /Count 0 >>")),
        ],
        None,
    );
    let mut doc = PdfDocument::load_from_bytes(&pdf).unwrap();
    assert!(matches!(
        stamp_document(&mut doc, &WatermarkConfig::default()),
        Err(WatermarkError::NoPages)
    ));
}

#[test]
fn test_zero_rotation_matrix_is_exact() {
    let mut doc = blank_document(&[A4]).unwrap();
    let mut config = uncompressed("");
    config.rotation = 0.0;
    config.anchor = AnchorPosition::new(25.0, 75.0);
    stamp_document(&mut doc, &config).unwrap();

    // Empty text is a zero-size box, drawn on the anchor itself
    let content = stamp_content(&doc, 0);
    assert!(content.contains("1 0 0 1 148.75 210.5 Tm"), "content:\n{}", content);
}

#[test]
fn test_multiline_block_emits_one_matrix_per_line() {
    let mut doc = blank_document(&[A4]).unwrap();
    stamp_document(&mut doc, &uncompressed("TOP SECRET\nINTERNAL")).unwrap();
    let content = stamp_content(&doc, 0);
    assert_eq!(content.matches(" Tm\n").count(), 2);
    assert!(content.contains("(TOP SECRET) Tj"));
    assert!(content.contains("(INTERNAL) Tj"));
}

#[test]
fn test_page_selection_subset() {
    let mut doc = blank_document(&[A4, A4, A4, A4]).unwrap();
    let mut config = uncompressed("SOME");
    config.pages = "1,3-4".parse::<PageSelection>().unwrap();
    let report = stamp_document(&mut doc, &config).unwrap();
    let stamped: Vec<usize> = report.placements.iter().map(|p| p.page).collect();
    assert_eq!(stamped, vec![1, 3, 4]);

    let untouched = page_dict(&doc, 1);
    assert!(untouched.get("Contents").and_then(|c| c.as_reference()).is_some());
}

#[test]
fn test_failed_export_writes_nothing() {
    let base = env!("CARGO_MANIFEST_DIR");
    let dir = format!("{}/target/test_output", base);
    fs::create_dir_all(&dir).unwrap();

    let input = format!("{}/all_or_nothing_input.pdf", dir);
    let output = format!("{}/all_or_nothing_output.pdf", dir);
    let _ = fs::remove_file(&output);
    blank_document(&[A4, A4]).unwrap().save(&input).unwrap();

    let mut config = WatermarkConfig::new("NOPE");
    config.pages = PageSelection::Ranges(vec![(1, 5)]);
    let err = pdf_ops::watermark_pdf(&input, &output, &config).unwrap_err();
    assert!(format!("{:#}", err).contains("Page 5 out of range"), "error: {:#}", err);
    assert!(!std::path::Path::new(&output).exists());

    let missing_dir_output = format!("{}/does_not_exist/out.pdf", dir);
    assert!(pdf_ops::watermark_pdf(&input, &missing_dir_output, &WatermarkConfig::default()).is_err());
}
