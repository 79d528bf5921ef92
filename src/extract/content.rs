//! Content stream interpretation.
//!
//! Walks a page's content stream once, tracking the graphics and text
//! state, and collects positioned text spans, ruling lines and image
//! placements. Form XObjects are followed with their own resources so
//! nothing nested inside them is lost.

use std::collections::HashSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};

use super::ruling::{Edge, PathBuilder};

/// Form XObjects nested deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 16;

/// TJ adjustments (thousandths of an em) above this read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A text span with position information, in default user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The decoded text
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Approximate width of the text
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = estimate_advance(&text, font_size);
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge of the span.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Everything the walker found on a page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Text spans in content stream order
    pub spans: Vec<TextSpan>,
    /// Horizontal and vertical segments of painted paths
    pub edges: Vec<Edge>,
    /// Number of image placements (image XObjects drawn plus inline images)
    pub image_count: usize,
}

/// Affine transform `[a b c d e f]` as used by `cm` and `Tm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub(crate) fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6]
            .iter()
            .map(get_number)
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    /// `self × other`: apply `self` first, then `other`.
    pub(crate) fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through the transform.
    pub(crate) fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub(crate) fn origin(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    pub(crate) fn vertical_scale(&self) -> f32 {
        let scale = (self.c * self.c + self.d * self.d).sqrt();
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.matrix = Matrix::translation(tx, 0.0).then(&self.matrix);
    }
}

/// Walks content streams of one document.
pub(crate) struct ContentWalker<'a> {
    doc: &'a LopdfDocument,
    active_forms: HashSet<ObjectId>,
}

impl<'a> ContentWalker<'a> {
    pub(crate) fn new(doc: &'a LopdfDocument) -> Self {
        Self {
            doc,
            active_forms: HashSet::new(),
        }
    }

    /// Walk a page's content stream.
    pub(crate) fn walk_page(&mut self, page_id: ObjectId) -> Result<PageContent> {
        let content = self.page_content(page_id)?;
        let resources = page_resources(self.doc, page_id);

        let mut out = PageContent::default();
        self.walk(&content, resources, Matrix::IDENTITY, 0, &mut out)?;
        Ok(out)
    }

    /// Concatenated `/Contents` streams. A page without `/Contents` is
    /// blank; a reference to a missing or non-stream object is an error.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(format!("page {:?}: {}", page_id, e)))?;

        let ids: Vec<ObjectId> = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => references(items),
                _ => vec![*id],
            },
            Ok(Object::Array(items)) => references(items),
            _ => return Ok(Vec::new()),
        };

        let mut data = Vec::new();
        for id in ids {
            let stream = self
                .doc
                .get_object(id)
                .and_then(Object::as_stream)
                .map_err(|e| Error::PdfParse(format!("content stream {:?}: {}", id, e)))?;
            let bytes = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            data.extend_from_slice(&bytes);
            data.push(b'\n');
        }
        Ok(data)
    }

    fn walk(
        &mut self,
        data: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
        out: &mut PageContent,
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let content = Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut ctm = base_ctm;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut font: Option<&'a Dictionary> = None;
        let mut path = PathBuilder::default();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    text.matrix = Matrix::IDENTITY;
                    text.line_matrix = Matrix::IDENTITY;
                }
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Object::Name(name) = &operands[0] {
                            font = lookup_font(self.doc, resources, name);
                        }
                        text.font_size = get_number(&operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let decoded = decode_with_font(self.doc, font, bytes);
                        let advance = estimate_advance(&decoded, text.font_size);
                        show_text(&mut text, &ctm, decoded, advance, out);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let (decoded, advance) = self.decode_tj(font, items, text.font_size);
                        show_text(&mut text, &ctm, decoded, advance, out);
                    }
                }
                "'" | "\"" => {
                    text.next_line();
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = operands.get(text_idx) {
                        let decoded = decode_with_font(self.doc, font, bytes);
                        let advance = estimate_advance(&decoded, text.font_size);
                        show_text(&mut text, &ctm, decoded, advance, out);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(resources, name, ctm, depth, out)?;
                    }
                }
                "BI" => out.image_count += 1,
                "m" => {
                    if let Some(p) = point(operands, 0, &ctm) {
                        path.move_to(p);
                    }
                }
                "l" => {
                    if let Some(p) = point(operands, 0, &ctm) {
                        path.line_to(p);
                    }
                }
                "c" => {
                    if let Some(p) = point(operands, 4, &ctm) {
                        path.curve_to(p);
                    }
                }
                "v" | "y" => {
                    if let Some(p) = point(operands, 2, &ctm) {
                        path.curve_to(p);
                    }
                }
                "h" => path.close(),
                "re" => {
                    if let Some(corners) = rect_corners(operands, &ctm) {
                        path.rect(corners);
                    }
                }
                "S" | "f" | "F" | "f*" | "B" | "B*" => out.edges.extend(path.paint()),
                "s" | "b" | "b*" => {
                    path.close();
                    out.edges.extend(path.paint());
                }
                "n" => path.clear(),
                _ => {}
            }
        }

        Ok(())
    }

    /// Decode a TJ array. Returns the text and its advance in text space.
    fn decode_tj(
        &self,
        font: Option<&'a Dictionary>,
        items: &[Object],
        font_size: f32,
    ) -> (String, f32) {
        let mut combined = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = decode_with_font(self.doc, font, bytes);
                    advance += estimate_advance(&decoded, font_size);
                    combined.push_str(&decoded);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = -get_number(item).unwrap_or(0.0);
                    advance += adjustment / 1000.0 * font_size;
                    if adjustment > TJ_SPACE_THRESHOLD && needs_space_after(&combined) {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }

        (combined, advance)
    }

    fn draw_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        ctm: Matrix,
        depth: usize,
        out: &mut PageContent,
    ) -> Result<()> {
        let Some(xobjects) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| resolve_dict(self.doc, o))
        else {
            log::debug!(
                "Do /{} with no XObject resources",
                String::from_utf8_lossy(name)
            );
            return Ok(());
        };

        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            return Ok(());
        };
        let id = *id;

        let stream = match self.doc.get_object(id) {
            Ok(Object::Stream(stream)) => stream,
            Ok(_) => return Ok(()),
            Err(e) => return Err(Error::ImageLocate(format!("XObject {:?}: {}", id, e))),
        };

        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => out.image_count += 1,
            Ok(b"Form") => {
                if depth >= MAX_FORM_DEPTH || !self.active_forms.insert(id) {
                    log::debug!("Skipping form XObject {:?} (depth {})", id, depth);
                    return Ok(());
                }

                let form_ctm = Matrix::from_operands(
                    stream
                        .dict
                        .get(b"Matrix")
                        .and_then(|m| m.as_array())
                        .map(|a| a.as_slice())
                        .unwrap_or(&[]),
                )
                .unwrap_or(Matrix::IDENTITY)
                .then(&ctm);

                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(self.doc, o))
                    .or(resources);

                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let result = self.walk(&data, form_resources, form_ctm, depth + 1, out);
                self.active_forms.remove(&id);
                result?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn show_text(
    state: &mut TextState,
    ctm: &Matrix,
    decoded: String,
    advance: f32,
    out: &mut PageContent,
) {
    if !decoded.trim().is_empty() {
        let rendering = state.matrix.then(ctm);
        let (x, y) = rendering.origin();
        let size = state.font_size * rendering.vertical_scale();
        out.spans.push(TextSpan::new(decoded, x, y, size));
    }
    state.advance(advance);
}

fn references(items: &[Object]) -> Vec<ObjectId> {
    items.iter().filter_map(|o| o.as_reference().ok()).collect()
}

/// The point at `operands[i..i + 2]` in user space.
fn point(operands: &[Object], i: usize, ctm: &Matrix) -> Option<(f32, f32)> {
    let x = get_number(operands.get(i)?)?;
    let y = get_number(operands.get(i + 1)?)?;
    Some(ctm.apply(x, y))
}

fn rect_corners(operands: &[Object], ctm: &Matrix) -> Option<[(f32, f32); 4]> {
    let n: Vec<f32> = operands
        .get(..4)?
        .iter()
        .map(get_number)
        .collect::<Option<Vec<_>>>()?;
    let (x, y, w, h) = (n[0], n[1], n[2], n[3]);
    Some([
        ctm.apply(x, y),
        ctm.apply(x + w, y),
        ctm.apply(x + w, y + h),
        ctm.apply(x, y + h),
    ])
}

fn needs_space_after(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && c != '\u{00A0}' && !is_spaceless_script_char(c),
        None => false,
    }
}

/// Half an em per character; good enough for gap and column heuristics.
fn estimate_advance(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

/// Resolve an object to a dictionary, following one reference.
pub(crate) fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Find a page's resource dictionary, walking up the page tree if the
/// page inherits it.
pub(crate) fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; page trees are shallow and may be cyclic when broken.
    for _ in 0..32 {
        if let Some(res) = node.get(b"Resources").ok().and_then(|o| resolve_dict(doc, o)) {
            return Some(res);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn lookup_font<'a>(
    doc: &'a LopdfDocument,
    resources: Option<&'a Dictionary>,
    name: &[u8],
) -> Option<&'a Dictionary> {
    let fonts = resources?
        .get(b"Font")
        .ok()
        .and_then(|o| resolve_dict(doc, o))?;
    fonts.get(name).ok().and_then(|o| resolve_dict(doc, o))
}

fn decode_with_font(doc: &LopdfDocument, font: Option<&Dictionary>, bytes: &[u8]) -> String {
    if let Some(font) = font {
        // lopdf asserts /Type /Font, which many producers leave out.
        let typed;
        let font = if font.type_is(b"Font") {
            font
        } else {
            let mut patched = font.clone();
            patched.set("Type", Object::Name(b"Font".to_vec()));
            typed = patched;
            &typed
        };
        if let Ok(encoding) = font.get_font_encoding(doc) {
            if let Ok(text) = LopdfDocument::decode_text(&encoding, bytes) {
                return text;
            }
        }
    }
    decode_text_simple(bytes)
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Scripts written without spaces between words (Chinese, Japanese).
/// Hangul is deliberately absent: Korean uses word spaces.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3040..=0x309F).contains(&code)
        || (0x30A0..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}
