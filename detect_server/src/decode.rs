//! Decoding of captured photos.
//!
use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("the captured image is empty")]
    Empty,
    #[error("failed to decode captured image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode an encoded photo (JPEG, PNG, ...) into an RGB pixel grid.
///
/// The format is guessed from the content, not from any file name.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image = image::load_from_memory(bytes)?.to_rgb8();
    log::debug!("Decoded {}x{} image", image.width(), image.height());

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn empty_buffer() {
        assert!(matches!(decode_image(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn garbage_bytes() {
        let res = decode_image(b"definitely not an image");
        assert!(matches!(res, Err(DecodeError::Image(_))));
    }

    #[test]
    fn truncated_png() {
        let image = RgbImage::from_pixel(32, 16, Rgb([10, 20, 30]));
        let bytes = encode(&image, ImageOutputFormat::Png);
        assert!(decode_image(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn decode_png_keeps_pixels() {
        let image = RgbImage::from_pixel(32, 16, Rgb([10, 20, 30]));
        let decoded = decode_image(&encode(&image, ImageOutputFormat::Png)).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded[(5, 5)], Rgb([10, 20, 30]));
    }

    #[test]
    fn decode_jpeg() {
        let image = RgbImage::from_pixel(40, 30, Rgb([200, 100, 50]));
        let decoded = decode_image(&encode(&image, ImageOutputFormat::Jpeg(90))).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }
}
