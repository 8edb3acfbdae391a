use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use imagesize::ImageType;

use crate::error::{Error, Result};

const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Default ceiling for one image fetch.
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Decoded image bytes with their intrinsic size.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    /// Sniffs the format and dimensions; rejects anything the page
    /// serializer cannot embed.
    pub fn from_bytes(bytes: Vec<u8>, source: &str) -> Result<Self> {
        let mime = match imagesize::image_type(&bytes) {
            Ok(ImageType::Png) => "image/png",
            Ok(ImageType::Jpeg) => "image/jpeg",
            Ok(ImageType::Gif) => "image/gif",
            Ok(ImageType::Webp) => "image/webp",
            Ok(ImageType::Bmp) => "image/bmp",
            _ => return Err(Error::UnsupportedImage(source.to_string())),
        };
        let size = imagesize::blob_size(&bytes)
            .map_err(|_| Error::UnsupportedImage(source.to_string()))?;
        if size.width == 0 || size.height == 0 {
            return Err(Error::UnsupportedImage(source.to_string()));
        }

        Ok(Self {
            bytes,
            mime,
            width: size.width as u32,
            height: size.height as u32,
        })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }

    /// Size scaled to fit inside `max_width` x `max_height`, preserving the
    /// aspect ratio and never enlarging.
    pub fn fit_within(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let w = self.width as f32;
        let h = self.height as f32;
        let scale = (max_width / w).min(max_height / h).min(1.0);
        (w * scale, h * scale)
    }
}

/// Resolves an image reference from markdown to image data.
pub trait ImageLoader {
    fn load(&mut self, source: &str) -> Result<LoadedImage>;
}

/// Loader that refuses everything; every image renders as its placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImageLoader;

impl ImageLoader for NoImageLoader {
    fn load(&mut self, source: &str) -> Result<LoadedImage> {
        Err(Error::ImageFetch {
            url: source.to_string(),
            reason: "image loading disabled".to_string(),
        })
    }
}

/// Fetches `http(s)` URLs, decodes `data:` URIs and reads local files
/// relative to an optional base directory. Requests block, each bounded by
/// a global timeout.
pub struct HttpImageLoader {
    agent: ureq::Agent,
    base_path: Option<PathBuf>,
}

impl HttpImageLoader {
    pub fn new(timeout: Duration, base_path: Option<PathBuf>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, base_path }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Timeout(_) => Error::ImageTimeout(url.to_string()),
            ureq::Error::Io(ref io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
                Error::ImageTimeout(url.to_string())
            }
            other => Error::ImageFetch {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_IMAGE_BYTES)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => Error::ImageTimeout(url.to_string()),
                other => Error::ImageFetch {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    fn resolve_path(&self, source: &str) -> PathBuf {
        let raw = source.strip_prefix("file://").unwrap_or(source);
        let path = Path::new(raw);
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&mut self, source: &str) -> Result<LoadedImage> {
        let source = source.trim();
        let bytes = if source.starts_with("http://") || source.starts_with("https://") {
            self.fetch(source)?
        } else if let Some(rest) = source.strip_prefix("data:") {
            decode_data_uri(rest).ok_or_else(|| Error::UnsupportedImage(source.to_string()))?
        } else {
            std::fs::read(self.resolve_path(source))?
        };
        LoadedImage::from_bytes(bytes, source)
    }
}

/// Payload of a `data:` URI (without the scheme). Only base64 payloads carry
/// binary image data.
fn decode_data_uri(rest: &str) -> Option<Vec<u8>> {
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    BASE64.decode(payload.trim()).ok()
}
