//! Lays out markdown notes as fixed-size pages of positioned, styled runs
//! and exports them as SVG, PNG or PDF.
//!
//! ```no_run
//! use notepress::{ExportOptions, OutputFormat};
//!
//! let options = ExportOptions {
//!     format: OutputFormat::Pdf,
//!     ..ExportOptions::default()
//! };
//! let written = notepress::export("Groceries", "- [ ] milk\n- [x] bread", &options)?;
//! # Ok::<(), notepress::Error>(())
//! ```

pub mod block;
pub mod error;
pub mod export;
pub mod fonts;
pub mod highlight;
pub mod image;
pub mod inline;
pub mod paginate;
pub mod render;
pub mod svg;
pub mod theme;
pub mod wrap;

pub use block::{Block, classify};
pub use error::{Error, Result};
pub use export::{ExportOptions, OutputFormat, export, export_file_name, export_with, write_document};
pub use fonts::{ApproxMeasure, CosmicTextMeasure, TextMeasure};
pub use image::{HttpImageLoader, ImageLoader, LoadedImage, NoImageLoader};
pub use inline::{StyledRun, parse_inline};
pub use paginate::{Document, PageGeometry, PaginationContext, layout_document};
pub use render::{DrawOp, Page, TextOp};
pub use theme::Theme;
