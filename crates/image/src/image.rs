use {
    crate::{
        ImageError, PixelFormat,
        pixelformat::{rgb_to_luma, yuv_to_rgb},
    },
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, PartialEq)]
pub struct Image {
    pub size: Size,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

// pixel data is elided, it can be megabytes
impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.size)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Image {
    /// Wrap a pixel buffer, checking its length against size and format.
    pub fn new(size: Size, format: PixelFormat, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = format.buffer_len(size.area());
        if data.len() != expected {
            return Err(ImageError::Size {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, format, data })
    }

    /// A zero-area image.
    pub fn empty(format: PixelFormat) -> Self {
        Self {
            size: Size::default(),
            format,
            data: Vec::new(),
        }
    }

    /// Solid RGB image.
    pub fn filled_rgb(size: Size, rgb: [u8; 3]) -> Self {
        let data = rgb.iter().copied().cycle().take(size.area() * 3).collect();
        Self {
            size,
            format: PixelFormat::Rgb8,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.size.width
    }

    pub fn height(&self) -> usize {
        self.size.height
    }

    /// True when the image has no pixels (a capture glitch).
    pub fn is_empty(&self) -> bool {
        self.size.area() == 0 || self.data.is_empty()
    }

    /// Luma of the pixel at (x, y).
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        let index = y * self.size.width + x;
        match self.format {
            PixelFormat::Gray8 => self.data[index],
            PixelFormat::Rgb8 => rgb_to_luma(&self.data[index * 3..index * 3 + 3]),
            // Y0 U Y1 V: luma sits at every even byte
            PixelFormat::Yuyv => self.data[index * 2],
        }
    }

    /// Convert to packed RGB.
    pub fn to_rgb8(&self) -> Image {
        let data = match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            PixelFormat::Gray8 => self.data.iter().flat_map(|&l| [l, l, l]).collect(),
            PixelFormat::Yuyv => self
                .data
                .chunks_exact(4)
                .flat_map(|c| {
                    let [r0, g0, b0] = yuv_to_rgb(c[0], c[1], c[3]);
                    let [r1, g1, b1] = yuv_to_rgb(c[2], c[1], c[3]);
                    [r0, g0, b0, r1, g1, b1]
                })
                .collect(),
        };
        Image {
            size: self.size,
            format: PixelFormat::Rgb8,
            data,
        }
    }

    /// Nearest-neighbour downscale by an integer divisor, always RGB.
    pub fn downscale(&self, divisor: usize) -> Image {
        let rgb = self.to_rgb8();
        if divisor <= 1 {
            return rgb;
        }
        let size = Size::new(self.size.width / divisor, self.size.height / divisor);
        let mut data = Vec::with_capacity(size.area() * 3);
        for y in 0..size.height {
            for x in 0..size.width {
                let src = ((y * divisor) * self.size.width + x * divisor) * 3;
                data.extend_from_slice(&rgb.data[src..src + 3]);
            }
        }
        Image {
            size,
            format: PixelFormat::Rgb8,
            data,
        }
    }
}
