use std::io;
use thiserror::Error;

/// Result type alias for notepress operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration, fetching images or producing
/// the exported artifact. Layout itself never fails.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading inputs or writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The image could not be fetched from its source.
    #[error("Failed to fetch image '{url}': {reason}")]
    ImageFetch { url: String, reason: String },

    /// The image fetch did not complete within the configured timeout.
    #[error("Timed out fetching image '{0}'")]
    ImageTimeout(String),

    /// The fetched bytes are not an image format the page serializer can embed.
    #[error("Unsupported image data from '{0}'")]
    UnsupportedImage(String),

    /// Theme file or built-in theme could not be parsed.
    #[error("Theme error: {0}")]
    Theme(String),

    /// Unknown output format.
    #[error("Unsupported output format: .{0} (use svg, png, pdf or json)")]
    UnsupportedFormat(String),

    /// Failure while rasterizing, converting or encoding the pages.
    #[error("Rendering error: {0}")]
    Render(String),
}
