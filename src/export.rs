use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::error::{Error, Result};
use crate::fonts::{self, CosmicTextMeasure, TextMeasure};
use crate::image::{DEFAULT_IMAGE_TIMEOUT, HttpImageLoader, ImageLoader, NoImageLoader};
use crate::paginate::{self, Document, PageGeometry};
use crate::svg;
use crate::theme::Theme;

const LOCAL_FONTS_DIR: &str = "fonts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
    Pdf,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything one export needs besides the note itself.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: OutputFormat,
    pub out_dir: PathBuf,
    /// Raster scale multiplier for PNG output.
    pub png_scale: f32,
    pub theme: Theme,
    pub geometry: PageGeometry,
    pub image_timeout: Duration,
    pub images_enabled: bool,
    /// Directory relative image paths are resolved against.
    pub base_path: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            out_dir: PathBuf::from("."),
            png_scale: 1.0,
            theme: Theme::default(),
            geometry: PageGeometry::default(),
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            images_enabled: true,
            base_path: None,
        }
    }
}

/// File stem derived from a note title: every character outside
/// `[A-Za-z0-9]` becomes `_`, and an empty title becomes `Untitled`.
pub fn export_file_name(title: &str) -> String {
    if title.is_empty() {
        return "Untitled".to_string();
    }
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Lays out the note and writes it to `options.out_dir`, returning the
/// paths written in page order.
pub fn export(title: &str, content: &str, options: &ExportOptions) -> Result<Vec<PathBuf>> {
    let mut measure = CosmicTextMeasure::new();
    let mut loader: Box<dyn ImageLoader> = if options.images_enabled {
        Box::new(HttpImageLoader::new(
            options.image_timeout,
            options.base_path.clone(),
        ))
    } else {
        Box::new(NoImageLoader)
    };
    export_with(title, content, options, &mut measure, loader.as_mut())
}

/// [`export`] with caller-supplied measurement and image loading.
pub fn export_with<T: TextMeasure>(
    title: &str,
    content: &str,
    options: &ExportOptions,
    measure: &mut T,
    images: &mut dyn ImageLoader,
) -> Result<Vec<PathBuf>> {
    if options.format == OutputFormat::Png
        && (!options.png_scale.is_finite() || options.png_scale <= 0.0)
    {
        return Err(Error::Render(format!(
            "invalid PNG scale: {}",
            options.png_scale
        )));
    }

    let document = paginate::layout_document(
        title,
        content,
        &options.theme,
        options.geometry,
        measure,
        images,
    );
    write_document(&document, options)
}

/// Serializes an already laid-out document.
pub fn write_document(document: &Document, options: &ExportOptions) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&options.out_dir)?;
    let name = export_file_name(&document.title);
    let ext = options.format.extension();

    if options.format == OutputFormat::Json {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| Error::Render(format!("failed to serialize document: {}", e)))?;
        let path = options.out_dir.join(format!("{}.{}", name, ext));
        fs::write(&path, json)?;
        log::debug!("wrote {}", path.display());
        return Ok(vec![path]);
    }

    let encoder = PageEncoder::new(options.format, options.png_scale);
    let total = document.pages.len();
    let mut written = Vec::with_capacity(total);

    for page in &document.pages {
        let svg = svg::page_to_svg(page, &document.geometry, &document.background);
        let bytes = encoder.encode(svg)?;
        let path = page_path(&options.out_dir, &name, page.number, total, ext);
        fs::write(&path, bytes)?;
        log::debug!("wrote page {}/{} to {}", page.number, total, path.display());
        written.push(path);
    }
    Ok(written)
}

fn page_path(dir: &Path, name: &str, number: usize, total: usize, ext: &str) -> PathBuf {
    if total == 1 {
        dir.join(format!("{}.{}", name, ext))
    } else {
        dir.join(format!("{}-{}.{}", name, number, ext))
    }
}

/// Per-export encoder; font databases are loaded once and shared by pages.
enum PageEncoder {
    Svg,
    Png {
        fontdb: Arc<usvg::fontdb::Database>,
        scale: f32,
    },
    Pdf {
        fontdb: Arc<svg2pdf::usvg::fontdb::Database>,
    },
}

impl PageEncoder {
    fn new(format: OutputFormat, scale: f32) -> Self {
        match format {
            OutputFormat::Png => Self::Png {
                fontdb: Arc::new(resvg_fontdb()),
                scale,
            },
            OutputFormat::Pdf => Self::Pdf {
                fontdb: Arc::new(svg2pdf_fontdb()),
            },
            OutputFormat::Svg | OutputFormat::Json => Self::Svg,
        }
    }

    fn encode(&self, svg: String) -> Result<Vec<u8>> {
        match self {
            Self::Svg => Ok(svg.into_bytes()),
            Self::Png { fontdb, scale } => svg_to_png(&svg, *scale, fontdb),
            Self::Pdf { fontdb } => svg_to_pdf(&svg, fontdb),
        }
    }
}

fn svg_to_png(svg: &str, scale: f32, fontdb: &Arc<usvg::fontdb::Database>) -> Result<Vec<u8>> {
    let mut opts = usvg::Options::default();
    opts.fontdb = Arc::clone(fontdb);

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Render(format!("failed to parse SVG: {}", e)))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Render(format!("failed to create {}x{} pixmap", width, height)))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| Error::Render(format!("failed to encode PNG: {}", e)))
}

fn svg_to_pdf(svg: &str, fontdb: &Arc<svg2pdf::usvg::fontdb::Database>) -> Result<Vec<u8>> {
    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = Arc::clone(fontdb);

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Render(format!("failed to parse SVG: {}", e)))?;

    // Text goes out as paths so viewers without the fonts still show it.
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;
    let page_options = svg2pdf::PageOptions::default();

    svg2pdf::to_pdf(&tree, options, page_options)
        .map_err(|e| Error::Render(format!("failed to convert SVG to PDF: {}", e)))
}

fn resvg_fontdb() -> usvg::fontdb::Database {
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    let local_fonts = Path::new(LOCAL_FONTS_DIR);
    if local_fonts.is_dir() {
        fontdb.load_fonts_dir(local_fonts);
    }

    let families = fonts::pick_fallback_families(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = families.sans.as_deref() {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = families.serif.as_deref() {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = families.mono.as_deref() {
        fontdb.set_monospace_family(family);
    }
    log::debug!("raster fonts: {} faces loaded", fontdb.len());
    fontdb
}

fn svg2pdf_fontdb() -> svg2pdf::usvg::fontdb::Database {
    let mut fontdb = svg2pdf::usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    let local_fonts = Path::new(LOCAL_FONTS_DIR);
    if local_fonts.is_dir() {
        fontdb.load_fonts_dir(local_fonts);
    }

    let families = fonts::pick_fallback_families(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = families.sans.as_deref() {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = families.serif.as_deref() {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = families.mono.as_deref() {
        fontdb.set_monospace_family(family);
    }
    log::debug!("PDF fonts: {} faces loaded", fontdb.len());
    fontdb
}
