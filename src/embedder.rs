//! Face embedding extraction.
//!
//! The matching core only consumes fixed-length vectors; this module is the
//! seam where uploaded image bytes become one. [`PixelEmbedder`] is a small
//! deterministic extractor used by the server and tests. A real recognition
//! model plugs in by implementing [`Embedder`].

use image::{DynamicImage, imageops::FilterType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("embedding extraction failed: {0}")]
    Extract(String),
}

/// Converts a decoded image into a raw embedding.
pub trait Embedder: Send + Sync {
    /// Model name, reported by the status endpoints.
    fn name(&self) -> &str;

    /// Length of every vector returned by [`embed`](Embedder::embed).
    fn dimension(&self) -> usize;

    fn embed(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbedError>;
}

/// Decodes uploaded bytes, sniffing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, EmbedError> {
    if bytes.is_empty() {
        return Err(EmbedError::Extract("empty upload".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Largest embedding a [`PixelEmbedder`] will produce.
pub const MAX_PIXEL_DIMENSION: usize = 65_536;

/// Grayscale thumbnail embedding.
///
/// The image is resized to `width x height`, converted to luma in `[0, 1]`
/// and mean-centred. A uniform image therefore embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct PixelEmbedder {
    width: u32,
    height: u32,
}

impl PixelEmbedder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for PixelEmbedder {
    fn default() -> Self {
        // 128 values, the embedding size of the models this service is usually paired with
        Self::new(16, 8)
    }
}

impl Embedder for PixelEmbedder {
    fn name(&self) -> &str {
        "pixel-luma"
    }

    fn dimension(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    fn embed(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbedError> {
        if self.width == 0 || self.height == 0 {
            return Err(EmbedError::Extract("embedder configured with zero size".to_string()));
        }
        if self.dimension() > MAX_PIXEL_DIMENSION {
            return Err(EmbedError::Extract(format!(
                "embedder size {}x{} exceeds {} values", self.width, self.height, MAX_PIXEL_DIMENSION
            )));
        }

        let thumb = image
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_luma8();

        let pixels = thumb.into_raw();
        let n = pixels.len() as i64;
        let sum: i64 = pixels.iter().map(|&p| p as i64).sum();

        // (p - sum/n) / 255, kept in integers until the last step so a flat image is exactly zero
        let scale = 255.0 * n as f32;
        Ok(pixels.iter().map(|&p| (p as i64 * n - sum) as f32 / scale).collect())
    }
}
