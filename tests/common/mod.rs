//! Helpers shared across integration tests.

#![allow(dead_code)]

use notepress::{
    ApproxMeasure, Document, DrawOp, Error, ImageLoader, LoadedImage, NoImageLoader, PageGeometry,
    Result, TextOp, Theme, layout_document,
};

/// Lays out `content` on A4 with the default theme, no title and no images.
pub fn layout(content: &str) -> Document {
    layout_with(content, PageGeometry::a4(), &mut NoImageLoader)
}

pub fn layout_with(content: &str, geometry: PageGeometry, images: &mut dyn ImageLoader) -> Document {
    layout_document(
        "",
        content,
        &Theme::default(),
        geometry,
        &mut ApproxMeasure,
        images,
    )
}

/// Every text op in page order, paired with its 0-based page index.
pub fn texts(doc: &Document) -> Vec<(usize, &TextOp)> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(idx, page)| page.texts().map(move |t| (idx, t)))
        .collect()
}

pub fn find_text<'a>(doc: &'a Document, text: &str) -> Option<&'a TextOp> {
    doc.pages
        .iter()
        .flat_map(|page| page.texts())
        .find(|t| t.text == text)
}

pub fn all_ops(doc: &Document) -> impl Iterator<Item = &DrawOp> {
    doc.pages.iter().flat_map(|page| page.ops.iter())
}

/// Smallest valid PNG header carrying a width and height.
pub fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    bytes
}

/// Serves fixed-size PNGs for `*.png` sources starting with `ok`, fails the
/// rest, and records every request.
#[derive(Debug, Default)]
pub struct StubImages {
    pub requested: Vec<String>,
}

impl ImageLoader for StubImages {
    fn load(&mut self, source: &str) -> Result<LoadedImage> {
        self.requested.push(source.to_string());
        if source.starts_with("ok") && source.ends_with(".png") {
            LoadedImage::from_bytes(png_header(1000, 500), source)
        } else {
            Err(Error::ImageTimeout(source.to_string()))
        }
    }
}
