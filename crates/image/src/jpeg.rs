use {
    crate::{Image, ImageError},
    crates_image::ImageEncoder,
};

pub const DEFAULT_QUALITY: u8 = 75;

impl Image {
    /// Encode as baseline JPEG for the UI stream.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        if self.is_empty() {
            return Err(ImageError::Encode("cannot encode an empty image".to_string()));
        }
        let rgb = self.to_rgb8();
        let mut buffer = Vec::new();
        let encoder =
            crates_image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder.write_image(
            &rgb.data,
            rgb.size.width as u32,
            rgb.size.height as u32,
            crates_image::ExtendedColorType::Rgb8,
        )?;
        Ok(buffer)
    }
}
