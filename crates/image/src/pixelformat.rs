use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Yuyv,
}

impl PixelFormat {
    /// Bytes needed for `pixels` pixels. YUYV packs two pixels in four bytes.
    pub fn buffer_len(&self, pixels: usize) -> usize {
        match self {
            PixelFormat::Gray8 => pixels,
            PixelFormat::Rgb8 => pixels * 3,
            PixelFormat::Yuyv => pixels * 2,
        }
    }
}

// BT.601 YUV-to-RGB for a single pixel (fixed point, shift 8)
pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        (y + ((359 * v) >> 8)).clamp(0, 255) as u8,
        (y - ((88 * u + 183 * v) >> 8)).clamp(0, 255) as u8,
        (y + ((454 * u) >> 8)).clamp(0, 255) as u8,
    ]
}

// BT.601 luma from RGB (fixed point, weights sum to 256)
pub(crate) fn rgb_to_luma(rgb: &[u8]) -> u8 {
    ((77 * rgb[0] as u32 + 150 * rgb[1] as u32 + 29 * rgb[2] as u32) >> 8) as u8
}
