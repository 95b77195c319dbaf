//! Seam to the external face-embedding extractor.

use crate::error::ExtractionError;
use crate::types::Embedding;
use image::DynamicImage;

/// Opaque face-embedding extractor: one decoded image in, one embedding out.
///
/// Implementations report "no face" as [`ExtractionError::NoFaceDetected`].
/// Callers never retry a failed extraction.
pub trait Embedder: Send {
    fn embed(&mut self, image: &DynamicImage) -> Result<Embedding, ExtractionError>;
}

/// Decode an uploaded image (any format the `image` crate recognises).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Decode `bytes` and run `embedder` on the result.
pub fn embed_bytes<E: Embedder + ?Sized>(
    embedder: &mut E,
    bytes: &[u8],
) -> Result<Embedding, ExtractionError> {
    let image = decode_image(bytes)?;
    tracing::debug!(width = image.width(), height = image.height(), "image decoded");
    embedder.embed(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    struct MeanColor;

    impl Embedder for MeanColor {
        fn embed(&mut self, image: &DynamicImage) -> Result<Embedding, ExtractionError> {
            let rgb = image.to_rgb8();
            let px = rgb.get_pixel(0, 0);
            Ok(Embedding::new(px.0.iter().map(|&c| c as f32 / 255.0).collect()))
        }
    }

    fn png(color: [u8; 3]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb(color)))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_embed_bytes_decodes_png() {
        let embedding = embed_bytes(&mut MeanColor, &png([255, 0, 51])).unwrap();
        assert_eq!(embedding.values, vec![1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let err = embed_bytes(&mut MeanColor, b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
    }
}
