//! PDF object model and reader.
//!
//! The reader scans the file for `N G obj ... endobj` bodies instead of
//! trusting the cross-reference table, so documents with stale or broken
//! xref offsets still load. Compressed object streams are expanded into plain
//! objects; the writer emits a fresh classic xref table on save.

use crate::compression;
use crate::error::{Result, WatermarkError};
use crate::geometry::{PageGeometry, Point, LETTER};
use regex::bytes::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Object number and generation
pub type ObjectId = (u32, u16);

pub type Dictionary = BTreeMap<String, PdfObject>;

#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: Dictionary,
    /// Raw (still encoded) stream bytes
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>),
    HexString(Vec<u8>),
    Name(String),
    Array(Vec<PdfObject>),
    Dictionary(Dictionary),
    Stream(PdfStream),
    Reference(ObjectId),
}

static NULL: PdfObject = PdfObject::Null;

impl PdfObject {
    pub fn name(name: &str) -> Self {
        PdfObject::Name(name.to_string())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<PdfObject>> {
        match self {
            PdfObject::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or stream object
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    fn type_name(&self) -> Option<&str> {
        self.as_dict()?.get("Type")?.as_name()
    }
}

// --- Lexer / parser ---

const MAX_NESTING: usize = 64;

fn is_whitespace(b: u8) -> bool {
    matches!(b, 0 | 9 | 10 | 12 | 13 | 32)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Lexer { data, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn starts_with(&self, token: &[u8]) -> bool {
        self.data[self.pos.min(self.data.len())..].starts_with(token)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn error(&self, what: &str) -> WatermarkError {
        WatermarkError::malformed(format!("{} at byte {}", what, self.pos))
    }

    fn read_regular(&mut self) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    fn parse_object(&mut self, depth: usize) -> Result<PdfObject> {
        if depth > MAX_NESTING {
            return Err(self.error("object nesting too deep"));
        }
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of data")),
            Some(b'/') => self.parse_name().map(PdfObject::Name),
            Some(b'(') => self.parse_literal_string().map(PdfObject::String),
            Some(b'<') if self.peek_at(1) == Some(b'<') => {
                self.parse_dictionary(depth).map(PdfObject::Dictionary)
            }
            Some(b'<') => self.parse_hex_string().map(PdfObject::HexString),
            Some(b'[') => self.parse_array(depth).map(PdfObject::Array),
            Some(b) if b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.') => self.parse_number(),
            Some(_) => {
                let word = self.read_regular();
                match word {
                    b"true" => Ok(PdfObject::Boolean(true)),
                    b"false" => Ok(PdfObject::Boolean(false)),
                    b"null" => Ok(PdfObject::Null),
                    _ => Err(self.error(&format!(
                        "unexpected token '{}'",
                        String::from_utf8_lossy(word)
                    ))),
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<PdfObject> {
        let token = self.read_regular();
        let text = std::str::from_utf8(token).map_err(|_| self.error("invalid number"))?;

        if !text.contains('.') {
            if let Ok(value) = text.parse::<i64>() {
                if value >= 0 {
                    if let Some(reference) = self.try_reference(value) {
                        return Ok(reference);
                    }
                }
                return Ok(PdfObject::Integer(value));
            }
        }
        text.parse::<f64>()
            .map(PdfObject::Real)
            .map_err(|_| self.error(&format!("invalid number '{}'", text)))
    }

    /// After a non-negative integer, look ahead for `G R`.
    fn try_reference(&mut self, number: i64) -> Option<PdfObject> {
        let saved = self.pos;
        self.skip_whitespace();
        let generation = std::str::from_utf8(self.read_regular())
            .ok()
            .and_then(|g| g.parse::<u16>().ok());
        if let Some(generation) = generation {
            self.skip_whitespace();
            let is_ref = self.peek() == Some(b'R') && self.peek_at(1).is_none_or(|b| !is_regular(b));
            if is_ref && number <= u32::MAX as i64 {
                self.pos += 1;
                return Some(PdfObject::Reference((number as u32, generation)));
            }
        }
        self.pos = saved;
        None
    }

    fn parse_name(&mut self) -> Result<String> {
        self.pos += 1; // '/'
        let raw = self.read_regular();
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                let hex = std::str::from_utf8(&raw[i + 1..i + 3]).unwrap_or("");
                if let Ok(b) = u8::from_str_radix(hex, 16) {
                    bytes.push(b);
                    i += 3;
                    continue;
                }
            }
            bytes.push(raw[i]);
            i += 1;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn parse_literal_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // '('
        let mut out = Vec::new();
        let mut depth = 1;
        loop {
            let b = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    let esc = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' | b')' | b'\\' => out.push(esc),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }
        Ok(out)
    }

    fn parse_hex_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // '<'
        let start = self.pos;
        let len = find(&self.data[start..], b">").ok_or_else(|| self.error("unterminated hex string"))?;
        self.pos = start + len + 1;
        let hex = String::from_utf8_lossy(&self.data[start..start + len]);
        compression::decode_hex_string(&hex)
    }

    fn parse_array(&mut self, depth: usize) -> Result<Vec<PdfObject>> {
        self.pos += 1; // '['
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.parse_object(depth + 1)?),
            }
        }
    }

    fn parse_dictionary(&mut self, depth: usize) -> Result<Dictionary> {
        self.pos += 2; // '<<'
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            if self.starts_with(b">>") {
                self.pos += 2;
                return Ok(dict);
            }
            match self.peek() {
                None => return Err(self.error("unterminated dictionary")),
                Some(b'/') => {
                    let key = self.parse_name()?;
                    let value = self.parse_object(depth + 1)?;
                    dict.insert(key, value);
                }
                Some(_) => return Err(self.error("dictionary key is not a name")),
            }
        }
    }
}

/// Parse one object starting at `pos`. Returns the object and the end offset.
pub fn parse_object_at(data: &[u8], pos: usize) -> Result<(PdfObject, usize)> {
    let mut lexer = Lexer::new(data, pos);
    let obj = lexer.parse_object(0)?;
    Ok((obj, lexer.pos))
}

/// Parse the body of an indirect object (after `N G obj`), including a
/// trailing stream. Returns the object and the offset after `endobj`.
fn parse_indirect_body(data: &[u8], start: usize) -> Result<(PdfObject, usize)> {
    let mut lexer = Lexer::new(data, start);
    let mut obj = lexer.parse_object(0)?;
    lexer.skip_whitespace();

    if lexer.starts_with(b"stream") {
        let dict = match obj {
            PdfObject::Dictionary(d) => d,
            _ => return Err(lexer.error("stream keyword without dictionary")),
        };
        let mut data_start = lexer.pos + b"stream".len();
        if data[data_start..].starts_with(b"\r\n") {
            data_start += 2;
        } else if data[data_start..].starts_with(b"\n") || data[data_start..].starts_with(b"\r") {
            data_start += 1;
        }
        let (stream_data, after) = read_stream_data(data, data_start, &dict)?;
        lexer.pos = after;
        obj = PdfObject::Stream(PdfStream {
            dict,
            data: stream_data,
        });
        lexer.skip_whitespace();
    }

    if lexer.starts_with(b"endobj") {
        lexer.pos += b"endobj".len();
    }
    Ok((obj, lexer.pos))
}

fn read_stream_data(data: &[u8], start: usize, dict: &Dictionary) -> Result<(Vec<u8>, usize)> {
    // Trust a direct /Length when `endstream` follows it
    if let Some(len) = dict.get("Length").and_then(|l| l.as_i64()) {
        if len >= 0 {
            let end = start + len as usize;
            if end <= data.len() {
                let mut lexer = Lexer::new(data, end);
                lexer.skip_whitespace();
                if lexer.starts_with(b"endstream") {
                    return Ok((data[start..end].to_vec(), lexer.pos + b"endstream".len()));
                }
            }
        }
    }

    let rel = find(&data[start..], b"endstream")
        .ok_or_else(|| WatermarkError::malformed(format!("unterminated stream at byte {}", start)))?;
    let mut end = start + rel;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((data[start..end].to_vec(), start + rel + b"endstream".len()))
}

/// Parse the objects packed in an object stream (`/Type /ObjStm`).
///
/// The decoded stream starts with `n` pairs of (object number, offset); the
/// offsets are relative to `first`.
pub fn parse_object_stream(data: &[u8], n: usize, first: usize) -> Result<Vec<(u32, PdfObject)>> {
    let mut header = Lexer::new(data, 0);
    let mut entries = Vec::with_capacity(n);
    for _ in 0..n {
        let num = header.parse_object(0)?.as_i64();
        let offset = header.parse_object(0)?.as_i64();
        match (num, offset) {
            (Some(num), Some(offset)) if num >= 0 && offset >= 0 => {
                entries.push((num as u32, offset as usize))
            }
            _ => return Err(WatermarkError::malformed("invalid object stream header")),
        }
    }

    entries
        .into_iter()
        .map(|(num, offset)| {
            let pos = first + offset;
            if pos > data.len() {
                return Err(WatermarkError::malformed(format!(
                    "object {} offset outside object stream",
                    num
                )));
            }
            parse_object_at(data, pos).map(|(obj, _)| (num, obj))
        })
        .collect()
}

// --- Document ---

#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub version: String,
    pub objects: BTreeMap<ObjectId, PdfObject>,
    /// Carried trailer entries (`Root`, `Info`, `ID`)
    pub trailer: Dictionary,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn object_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?-u)(\d{1,10})\s+(\d{1,5})\s+obj\b").expect("valid object regex"))
}

fn trailer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"trailer\s*<<").expect("valid trailer regex"))
}

const TRAILER_KEYS: [&str; 4] = ["Root", "Info", "ID", "Encrypt"];

impl PdfDocument {
    pub fn new() -> Self {
        PdfDocument {
            version: "1.4".to_string(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::load_from_bytes(&data)
    }

    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        let head = &data[..data.len().min(1024)];
        let header_pos = find(head, b"%PDF-")
            .ok_or_else(|| WatermarkError::malformed("missing %PDF- header"))?;

        let mut doc = PdfDocument::new();
        let version_start = header_pos + b"%PDF-".len();
        let version: String = data[version_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|b| *b as char)
            .collect();
        if !version.is_empty() {
            doc.version = version;
        }

        let mut pos = 0;
        while let Some(caps) = object_header_regex().captures_at(data, pos) {
            let Some(whole) = caps.get(0) else { break };
            if whole.start() > 0 && data[whole.start() - 1].is_ascii_digit() {
                pos = whole.end();
                continue;
            }
            let num = std::str::from_utf8(&caps[1]).ok().and_then(|s| s.parse::<u32>().ok());
            let generation = std::str::from_utf8(&caps[2]).ok().and_then(|s| s.parse::<u16>().ok());
            let (Some(num), Some(generation)) = (num, generation) else {
                pos = whole.end();
                continue;
            };

            match parse_indirect_body(data, whole.end()) {
                Ok((obj, end)) => {
                    doc.objects.insert((num, generation), obj);
                    pos = end;
                }
                Err(e) => {
                    tracing::warn!(object = num, error = %e, "Skipping unparsable object");
                    pos = whole.end();
                }
            }
        }

        if doc.objects.is_empty() {
            return Err(WatermarkError::malformed("no objects found"));
        }

        doc.read_trailers(data);
        doc.expand_object_streams()?;

        if doc.trailer.contains_key("Encrypt") {
            return Err(WatermarkError::Unsupported("encrypted documents".to_string()));
        }
        if !doc.trailer.contains_key("Root") {
            let catalog = doc
                .objects
                .iter()
                .find(|(_, obj)| obj.type_name() == Some("Catalog"))
                .map(|(id, _)| *id)
                .ok_or_else(|| WatermarkError::malformed("no document catalog"))?;
            tracing::debug!(catalog = catalog.0, "Recovered catalog without trailer");
            doc.trailer.insert("Root".to_string(), PdfObject::Reference(catalog));
        }

        tracing::debug!(
            version = %doc.version,
            objects = doc.objects.len(),
            "Loaded PDF document"
        );
        Ok(doc)
    }

    /// Merge classic trailers and cross-reference stream dictionaries, later
    /// sections overriding earlier ones.
    fn read_trailers(&mut self, data: &[u8]) {
        let mut sections: Vec<(usize, Dictionary)> = Vec::new();

        for m in trailer_regex().find_iter(data) {
            if let Ok((PdfObject::Dictionary(dict), _)) = parse_object_at(data, m.end() - 2) {
                sections.push((m.start(), dict));
            }
        }

        // Xref streams are ordered by object number as a stand-in for file order
        let xref_streams: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, obj)| obj.type_name() == Some("XRef"))
            .map(|(id, _)| *id)
            .collect();
        for id in xref_streams {
            if let Some(PdfObject::Stream(stream)) = self.objects.remove(&id) {
                sections.push((0, stream.dict));
            }
        }
        sections.sort_by_key(|(offset, _)| *offset);

        for (_, dict) in sections {
            for key in TRAILER_KEYS {
                if let Some(value) = dict.get(key) {
                    self.trailer.insert(key.to_string(), value.clone());
                }
            }
        }
    }

    fn expand_object_streams(&mut self) -> Result<()> {
        let containers: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, obj)| obj.type_name() == Some("ObjStm"))
            .map(|(id, _)| *id)
            .collect();

        for id in containers {
            let Some(PdfObject::Stream(stream)) = self.objects.remove(&id) else {
                continue;
            };
            let n = stream.dict.get("N").and_then(|v| v.as_i64()).unwrap_or(0).max(0) as usize;
            let first = stream.dict.get("First").and_then(|v| v.as_i64()).unwrap_or(0).max(0) as usize;
            let decoded = compression::decode_stream(&stream.dict, &stream.data)?;
            let packed = parse_object_stream(&decoded, n, first)?;
            tracing::debug!(container = id.0, count = packed.len(), "Expanded object stream");
            for (num, obj) in packed {
                // Objects stored directly in the file take precedence
                self.objects.entry((num, 0)).or_insert(obj);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: ObjectId) -> Option<&PdfObject> {
        self.objects.get(&id)
    }

    /// Follow references until a direct object is reached.
    ///
    /// Dangling references resolve to `null`, as the PDF format prescribes.
    pub fn resolve<'a>(&'a self, obj: &'a PdfObject) -> &'a PdfObject {
        let mut current = obj;
        for _ in 0..MAX_NESTING {
            match current {
                PdfObject::Reference(id) => match self.objects.get(id) {
                    Some(next) => current = next,
                    None => return &NULL,
                },
                _ => return current,
            }
        }
        &NULL
    }

    pub fn max_object_number(&self) -> u32 {
        self.objects.keys().map(|(num, _)| *num).max().unwrap_or(0)
    }

    /// Store a new object under the next free number
    pub fn add_object(&mut self, obj: PdfObject) -> ObjectId {
        let id = (self.max_object_number() + 1, 0);
        self.objects.insert(id, obj);
        id
    }

    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.trailer
            .get("Root")
            .and_then(|r| r.as_reference())
            .ok_or_else(|| WatermarkError::malformed("trailer has no /Root reference"))
    }

    /// All pages in document order, with inherited attributes resolved.
    pub fn pages(&self) -> Result<Vec<PageInfo>> {
        let catalog_id = self.catalog_id()?;
        let catalog = self
            .get(catalog_id)
            .and_then(|c| c.as_dict())
            .ok_or_else(|| WatermarkError::malformed("catalog object missing"))?;
        let root = catalog
            .get("Pages")
            .and_then(|p| p.as_reference())
            .ok_or_else(|| WatermarkError::malformed("catalog has no /Pages reference"))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, &Inherited::default(), &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn collect_pages(
        &self,
        id: ObjectId,
        inherited: &Inherited,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<PageInfo>,
    ) -> Result<()> {
        if !visited.insert(id) {
            return Err(WatermarkError::malformed(format!("page tree loop at {} {} R", id.0, id.1)));
        }
        let dict = self
            .get(id)
            .and_then(|d| d.as_dict())
            .ok_or_else(|| WatermarkError::malformed(format!("page node {} {} R missing", id.0, id.1)))?;

        let mut attrs = inherited.clone();
        if let Some(rect) = dict.get("MediaBox").and_then(|r| self.rect(r)) {
            attrs.media_box = Some(rect);
        }
        if let Some(rect) = dict.get("CropBox").and_then(|r| self.rect(r)) {
            attrs.crop_box = Some(rect);
        }
        if let Some(rotate) = dict.get("Rotate").and_then(|r| self.resolve(r).as_i64()) {
            attrs.rotate = Some(rotate);
        }
        if let Some(resources) = dict.get("Resources") {
            attrs.resources = Some(resources.clone());
        }

        let node_type = dict.get("Type").and_then(|t| t.as_name());
        let is_tree_node = node_type == Some("Pages") || (node_type.is_none() && dict.contains_key("Kids"));

        if is_tree_node {
            let kids = dict
                .get("Kids")
                .and_then(|k| self.resolve(k).as_array())
                .ok_or_else(|| WatermarkError::malformed(format!("pages node {} {} R has no /Kids", id.0, id.1)))?;
            for kid in kids {
                match kid.as_reference() {
                    Some(kid_id) => self.collect_pages(kid_id, &attrs, visited, out)?,
                    None => tracing::warn!(node = id.0, "Ignoring direct object in /Kids"),
                }
            }
        } else {
            let media_box = attrs.media_box.unwrap_or_else(|| {
                tracing::warn!(page = id.0, "Page has no /MediaBox, assuming Letter");
                [0.0, 0.0, LETTER.width, LETTER.height]
            });
            out.push(PageInfo {
                id,
                media_box,
                crop_box: attrs.crop_box,
                rotate: attrs.rotate.unwrap_or(0),
                resources: attrs.resources,
            });
        }
        Ok(())
    }

    /// Read a rectangle, normalised to `[llx, lly, urx, ury]`
    fn rect(&self, obj: &PdfObject) -> Option<[f64; 4]> {
        let items = self.resolve(obj).as_array()?;
        if items.len() != 4 {
            return None;
        }
        let mut v = [0.0; 4];
        for (slot, item) in v.iter_mut().zip(items) {
            *slot = self.resolve(item).as_f64()?;
        }
        Some([v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])])
    }
}

#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<[f64; 4]>,
    crop_box: Option<[f64; 4]>,
    rotate: Option<i64>,
    resources: Option<PdfObject>,
}

/// A page with its inherited attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub id: ObjectId,
    pub media_box: [f64; 4],
    pub crop_box: Option<[f64; 4]>,
    /// `/Rotate` as written
    pub rotate: i64,
    /// `/Resources` value (possibly a reference), if any
    pub resources: Option<PdfObject>,
}

impl PageInfo {
    /// The visible region: crop box clipped to the media box
    pub fn visible_box(&self) -> [f64; 4] {
        let m = self.media_box;
        match self.crop_box {
            Some(c) => {
                let clipped = [c[0].max(m[0]), c[1].max(m[1]), c[2].min(m[2]), c[3].min(m[3])];
                if clipped[2] > clipped[0] && clipped[3] > clipped[1] {
                    clipped
                } else {
                    m
                }
            }
            None => m,
        }
    }

    /// Size of the visible region in user space
    pub fn geometry(&self) -> PageGeometry {
        let b = self.visible_box();
        PageGeometry::new(b[2] - b[0], b[3] - b[1])
    }

    pub fn box_origin(&self) -> Point {
        let b = self.visible_box();
        Point::new(b[0], b[1])
    }

    /// Clockwise display rotation, snapped to 0, 90, 180 or 270
    pub fn rotation(&self) -> i64 {
        let quarter = (self.rotate.rem_euclid(360) as f64 / 90.0).round() as i64;
        (quarter * 90).rem_euclid(360)
    }

    /// Size of the page as a viewer shows it
    pub fn display_geometry(&self) -> PageGeometry {
        match self.rotation() {
            90 | 270 => self.geometry().transposed(),
            _ => self.geometry(),
        }
    }

    /// Map a point in the displayed frame (origin bottom-left of the page as
    /// shown, Y up) into user space.
    pub fn display_to_user(&self, p: Point) -> Point {
        let PageGeometry { width, height } = self.geometry();
        let local = match self.rotation() {
            90 => Point::new(width - p.y, p.x),
            180 => Point::new(width - p.x, height - p.y),
            270 => Point::new(p.y, height - p.x),
            _ => p,
        };
        let origin = self.box_origin();
        local.translate(origin.x, origin.y)
    }
}

// --- Structural validation ---

/// Validation result for PDF structural checks
#[derive(Debug, Clone)]
pub struct PdfValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub page_count: usize,
    pub object_count: usize,
}

/// Check that bytes load as a document with a reachable page tree.
pub fn validate_pdf_bytes(data: &[u8]) -> PdfValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !data.starts_with(b"%PDF-") {
        errors.push("Missing PDF header (%PDF-x.x)".to_string());
    }
    let tail = &data[data.len().saturating_sub(1024)..];
    if find(tail, b"%%EOF").is_none() {
        errors.push("Missing %%EOF marker at end of file".to_string());
    }
    if find(tail, b"startxref").is_none() {
        warnings.push("Missing startxref pointer".to_string());
    }

    let (page_count, object_count) = match PdfDocument::load_from_bytes(data) {
        Ok(doc) => {
            let pages = match doc.pages() {
                Ok(pages) => pages.len(),
                Err(e) => {
                    errors.push(format!("Page tree: {}", e));
                    0
                }
            };
            (pages, doc.objects.len())
        }
        Err(e) => {
            errors.push(e.to_string());
            (0, 0)
        }
    };
    if page_count == 0 && errors.is_empty() {
        errors.push("No page objects found".to_string());
    }

    PdfValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
        page_count,
        object_count,
    }
}
