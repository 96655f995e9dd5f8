use crate::error::{Result, WatermarkError};
use crate::geometry::PageGeometry;
use crate::pdf::{Dictionary, ObjectId, PdfDocument, PdfObject, PdfStream};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

// --- Token formatting ---

/// Format a number with at most four decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.4}", value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Escape bytes for use inside a literal string `( ... )`.
pub fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
    out
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        let plain = (0x21..=0x7E).contains(&b)
            && !matches!(b, b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%');
        if plain {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        write_name(out, key);
        out.push(b' ');
        write_object(out, value);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}

/// Serialize a direct object (streams write dictionary and data).
pub fn write_object(out: &mut Vec<u8>, obj: &PdfObject) {
    match obj {
        PdfObject::Null => out.extend_from_slice(b"null"),
        PdfObject::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        PdfObject::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        PdfObject::Real(r) => out.extend_from_slice(format_number(*r).as_bytes()),
        PdfObject::String(bytes) => {
            out.push(b'(');
            out.extend_from_slice(&escape_pdf_bytes(bytes));
            out.push(b')');
        }
        PdfObject::HexString(bytes) => {
            out.push(b'<');
            out.extend_from_slice(crate::compression::encode_hex_string(bytes).as_bytes());
            out.push(b'>');
        }
        PdfObject::Name(name) => write_name(out, name),
        PdfObject::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
        }
        PdfObject::Dictionary(dict) => write_dictionary(out, dict),
        PdfObject::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.insert("Length".to_string(), PdfObject::Integer(stream.data.len() as i64));
            write_dictionary(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.data);
            out.extend_from_slice(b"\nendstream");
        }
        PdfObject::Reference((num, generation)) => {
            out.extend_from_slice(format!("{} {} R", num, generation).as_bytes());
        }
    }
}

// --- Whole-file writer ---

pub struct PdfGenerator<'a> {
    version: &'a str,
    /// Highest generation wins when a number appears twice
    objects: BTreeMap<u32, (u16, &'a PdfObject)>,
    trailer: &'a Dictionary,
}

impl<'a> PdfGenerator<'a> {
    pub fn new(doc: &'a PdfDocument) -> Self {
        let mut objects = BTreeMap::new();
        for (&(num, generation), obj) in &doc.objects {
            objects.insert(num, (generation, obj));
        }
        PdfGenerator {
            version: &doc.version,
            objects,
            trailer: &doc.trailer,
        }
    }

    pub fn generate(&self) -> Vec<u8> {
        let mut pdf = Vec::new();

        // PDF header with a binary marker comment
        pdf.extend_from_slice(format!("%PDF-{}\n", self.version).as_bytes());
        pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets: BTreeMap<u32, (usize, u16)> = BTreeMap::new();
        for (&num, &(generation, obj)) in &self.objects {
            offsets.insert(num, (pdf.len(), generation));
            pdf.extend_from_slice(format!("{} {} obj\n", num, generation).as_bytes());
            write_object(&mut pdf, obj);
            pdf.extend_from_slice(b"\nendobj\n");
        }

        // xref table covering 0..=max, gaps marked free
        let size = self.objects.keys().max().map_or(1, |max| max + 1);
        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for num in 1..size {
            match offsets.get(&num) {
                Some((offset, generation)) => {
                    pdf.extend_from_slice(format!("{:010} {:05} n \n", offset, generation).as_bytes())
                }
                None => pdf.extend_from_slice(b"0000000000 00001 f \n"),
            }
        }

        let mut trailer = Dictionary::new();
        trailer.insert("Size".to_string(), PdfObject::Integer(size as i64));
        for key in ["Root", "Info", "ID"] {
            if let Some(value) = self.trailer.get(key) {
                trailer.insert(key.to_string(), value.clone());
            }
        }
        pdf.extend_from_slice(b"trailer\n");
        write_dictionary(&mut pdf, &trailer);
        pdf.extend_from_slice(b"\nstartxref\n");
        pdf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        pdf.extend_from_slice(b"%%EOF\n");

        pdf
    }
}

impl PdfDocument {
    pub fn to_bytes(&self) -> Vec<u8> {
        PdfGenerator::new(self).generate()
    }

    /// Write to `path` through a sibling temporary file so a failed write
    /// never leaves a truncated output behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes();

        let file_name = path
            .file_name()
            .ok_or_else(|| WatermarkError::invalid(format!("output path {} has no file name", path.display())))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".pdfmark-tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let write = || -> Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, path)?;
            Ok(())
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote PDF");
        Ok(())
    }
}

/// Create a document of empty pages, one per geometry.
pub fn blank_document(pages: &[PageGeometry]) -> Result<PdfDocument> {
    if pages.is_empty() {
        return Err(WatermarkError::NoPages);
    }
    if let Some(bad) = pages.iter().find(|p| !p.is_valid()) {
        return Err(WatermarkError::invalid(format!(
            "page size must be positive, got {} x {}",
            bad.width, bad.height
        )));
    }

    let mut doc = PdfDocument::new();
    let catalog_id: ObjectId = (1, 0);
    let pages_id: ObjectId = (2, 0);

    // Reserve the catalog and page tree numbers
    doc.objects.insert(catalog_id, PdfObject::Null);
    doc.objects.insert(pages_id, PdfObject::Null);

    let mut kids = Vec::with_capacity(pages.len());
    for geometry in pages {
        let content_id = doc.add_object(PdfObject::Stream(PdfStream {
            dict: Dictionary::new(),
            data: Vec::new(),
        }));

        let mut page = Dictionary::new();
        page.insert("Type".to_string(), PdfObject::name("Page"));
        page.insert("Parent".to_string(), PdfObject::Reference(pages_id));
        page.insert(
            "MediaBox".to_string(),
            PdfObject::Array(vec![
                PdfObject::Integer(0),
                PdfObject::Integer(0),
                PdfObject::Real(geometry.width),
                PdfObject::Real(geometry.height),
            ]),
        );
        page.insert("Contents".to_string(), PdfObject::Reference(content_id));
        page.insert("Resources".to_string(), PdfObject::Dictionary(Dictionary::new()));
        kids.push(PdfObject::Reference(doc.add_object(PdfObject::Dictionary(page))));
    }

    let mut tree = Dictionary::new();
    tree.insert("Type".to_string(), PdfObject::name("Pages"));
    tree.insert("Count".to_string(), PdfObject::Integer(kids.len() as i64));
    tree.insert("Kids".to_string(), PdfObject::Array(kids));
    doc.objects.insert(pages_id, PdfObject::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.insert("Type".to_string(), PdfObject::name("Catalog"));
    catalog.insert("Pages".to_string(), PdfObject::Reference(pages_id));
    doc.objects.insert(catalog_id, PdfObject::Dictionary(catalog));
    doc.trailer.insert("Root".to_string(), PdfObject::Reference(catalog_id));

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{A4, LETTER};

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.70710678), "0.7071");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(134.8600), "134.86");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_escape_pdf_bytes() {
        assert_eq!(escape_pdf_bytes(b"a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(escape_pdf_bytes(&[0x80]), b"\\200".to_vec());
    }

    #[test]
    fn test_write_name_escapes_delimiters() {
        let mut out = Vec::new();
        write_name(&mut out, "A B/C");
        assert_eq!(out, b"/A#20B#2FC".to_vec());
    }

    #[test]
    fn test_blank_document_structure() {
        let doc = blank_document(&[A4, LETTER]).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].geometry(), A4);
        assert_eq!(pages[1].geometry(), LETTER);
        assert_eq!(doc.catalog_id().unwrap(), (1, 0));
    }

    #[test]
    fn test_blank_document_rejects_empty() {
        assert!(matches!(blank_document(&[]), Err(WatermarkError::NoPages)));
        assert!(blank_document(&[PageGeometry::new(0.0, 10.0)]).is_err());
    }

    #[test]
    fn test_generate_reloads() {
        let doc = blank_document(&[A4]).unwrap();
        let bytes = doc.to_bytes();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let reloaded = PdfDocument::load_from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.objects.len(), doc.objects.len());
        assert_eq!(reloaded.pages().unwrap()[0].geometry(), A4);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let doc = blank_document(&[A4]).unwrap();
        let bytes = doc.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        let xref_start = text.find("xref\n").unwrap();
        let entry = text[xref_start..].lines().nth(3).unwrap(); // object 1
        let offset: usize = entry[..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }
}
