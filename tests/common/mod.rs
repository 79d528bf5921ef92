//! Builds small slide decks with lopdf for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

/// One slide: text placed at absolute positions, ruling lines, and image
/// placements.
#[derive(Default, Clone)]
pub struct Slide {
    texts: Vec<(f32, f32, String)>,
    lines: Vec<Operation>,
    images: usize,
    dangling_contents: bool,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `text` with its baseline at (x, y), 12pt.
    pub fn text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.texts.push((x, y, text.to_string()));
        self
    }

    /// Lay out a grid of cells without any lines; an empty string leaves
    /// the cell blank. Rows are 20pt apart.
    pub fn grid(mut self, top: f32, xs: &[f32], rows: &[&[&str]]) -> Self {
        for (r, row) in rows.iter().enumerate() {
            let y = top - r as f32 * 20.0;
            for (cell, x) in row.iter().zip(xs) {
                if !cell.is_empty() {
                    self = self.text(*x, y, cell);
                }
            }
        }
        self
    }

    /// Like `grid`, with every cell boxed by ruling lines. Text sits 8pt
    /// right of each column line and 6pt above each row's bottom line.
    pub fn ruled_grid(mut self, top: f32, xs: &[f32], width: f32, rows: &[&[&str]]) -> Self {
        let text_xs: Vec<f32> = xs.iter().map(|x| x + 8.0).collect();
        self = self.grid(top - 14.0, &text_xs, rows);

        let left = xs[0];
        let right = xs[xs.len() - 1] + width;
        let bottom = top - rows.len() as f32 * 20.0;
        for r in 0..=rows.len() {
            let y = top - r as f32 * 20.0;
            self = self.line((left, y), (right, y));
        }
        for &x in xs.iter().chain(std::iter::once(&right)) {
            self = self.line((x, top), (x, bottom));
        }
        self
    }

    /// Stroke a straight line.
    pub fn line(mut self, from: (f32, f32), to: (f32, f32)) -> Self {
        self.lines.extend([
            Operation::new("m", vec![from.0.into(), from.1.into()]),
            Operation::new("l", vec![to.0.into(), to.1.into()]),
            Operation::new("S", vec![]),
        ]);
        self
    }

    /// Stroke a rectangle with `re`.
    pub fn rect(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.lines.extend([
            Operation::new(
                "re",
                vec![x.into(), y.into(), width.into(), height.into()],
            ),
            Operation::new("S", vec![]),
        ]);
        self
    }

    /// Point `/Contents` at an object that does not exist.
    pub fn dangling_contents(mut self) -> Self {
        self.dangling_contents = true;
        self
    }

    pub fn images(mut self, count: usize) -> Self {
        self.images = count;
        self
    }

    fn operations(&self) -> Vec<Operation> {
        let mut ops = self.lines.clone();
        for (x, y, text) in &self.texts {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            ops.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(text.as_str())],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        for i in 0..self.images {
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    100.into(),
                    0.into(),
                    0.into(),
                    100.into(),
                    (50 + i as i64 * 120).into(),
                    50.into(),
                ],
            ));
            ops.push(Operation::new("Do", vec!["Im1".into()]));
            ops.push(Operation::new("Q", vec![]));
        }
        ops
    }
}

/// A deck of slides.
#[derive(Default)]
pub struct Deck {
    slides: Vec<Slide>,
    inherit_resources: bool,
    untyped_font: bool,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: Slide) -> Self {
        self.slides.push(slide);
        self
    }

    /// Put the resources on the page tree node instead of each page.
    pub fn inherit_resources(mut self) -> Self {
        self.inherit_resources = true;
        self
    }

    /// Use a WinAnsi TrueType font dictionary that has no `/Type`.
    pub fn untyped_font(mut self) -> Self {
        self.untyped_font = true;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let font_id = if self.untyped_font {
            doc.add_object(dictionary! {
                "Subtype" => "TrueType",
                "BaseFont" => "Arial",
                "Encoding" => "WinAnsiEncoding",
            })
        } else {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            })
        };
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0x80],
        ));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for slide in &self.slides {
            let content = Content {
                operations: slide.operations(),
            };
            let content_id = if slide.dangling_contents {
                doc.new_object_id()
            } else {
                doc.add_object(Stream::new(
                    dictionary! {},
                    content.encode().expect("encode content"),
                ))
            };

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if !self.inherit_resources {
                page.set("Resources", resources_id);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 960.into(), 540.into()]),
        };
        if self.inherit_resources {
            pages.set("Resources", resources_id);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("save deck");
        buf
    }

    /// Write the deck to a fresh temporary directory.
    pub fn write(&self) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deck.pdf");
        std::fs::write(&path, self.to_bytes()).expect("write deck");
        (dir, path)
    }
}

/// Count occurrences of slide headers and return their numbers in order.
pub fn slide_numbers(output: &str) -> Vec<usize> {
    output
        .lines()
        .filter_map(|l| l.strip_prefix("=== SLIDE "))
        .filter_map(|l| l.strip_suffix(" ==="))
        .filter_map(|n| n.parse().ok())
        .collect()
}
