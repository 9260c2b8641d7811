use image::{Image, ImageError, PixelFormat, Size};

#[test]
fn test_new_checks_buffer_length() {
    let result = Image::new(Size::new(2, 2), PixelFormat::Rgb8, vec![0; 11]);
    assert_eq!(
        result.unwrap_err(),
        ImageError::Size {
            expected: 12,
            actual: 11
        }
    );
}

#[test]
fn test_new_yuyv_length() {
    let image = Image::new(Size::new(4, 2), PixelFormat::Yuyv, vec![128; 16]).unwrap();
    assert_eq!(image.width(), 4);
    assert_eq!(image.height(), 2);
}

#[test]
fn test_empty_image() {
    let image = Image::empty(PixelFormat::Rgb8);
    assert!(image.is_empty());
    assert!(!Image::filled_rgb(Size::new(1, 1), [0, 0, 0]).is_empty());
}

#[test]
fn test_zero_width_is_empty() {
    let image = Image::new(Size::new(0, 480), PixelFormat::Gray8, Vec::new()).unwrap();
    assert!(image.is_empty());
}

#[test]
fn test_luma_of_white_and_black() {
    let white = Image::filled_rgb(Size::new(2, 2), [255, 255, 255]);
    let black = Image::filled_rgb(Size::new(2, 2), [0, 0, 0]);
    assert!(white.luma_at(1, 1) >= 254);
    assert_eq!(black.luma_at(0, 0), 0);
}

#[test]
fn test_gray_to_rgb() {
    let gray = Image::new(Size::new(2, 1), PixelFormat::Gray8, vec![10, 200]).unwrap();
    let rgb = gray.to_rgb8();
    assert_eq!(rgb.format, PixelFormat::Rgb8);
    assert_eq!(rgb.data, vec![10, 10, 10, 200, 200, 200]);
}

#[test]
fn test_yuyv_neutral_chroma_is_gray() {
    let yuyv = Image::new(Size::new(2, 1), PixelFormat::Yuyv, vec![100, 128, 150, 128]).unwrap();
    let rgb = yuyv.to_rgb8();
    assert_eq!(rgb.data, vec![100, 100, 100, 150, 150, 150]);
    assert_eq!(yuyv.luma_at(1, 0), 150);
}

#[test]
fn test_downscale_halves_size() {
    let image = Image::filled_rgb(Size::new(8, 6), [1, 2, 3]);
    let small = image.downscale(2);
    assert_eq!(small.size, Size::new(4, 3));
    assert_eq!(small.data.len(), 4 * 3 * 3);
    assert_eq!(&small.data[0..3], &[1, 2, 3]);
}

#[test]
fn test_downscale_by_one_is_identity() {
    let image = Image::filled_rgb(Size::new(3, 3), [9, 9, 9]);
    assert_eq!(image.downscale(1), image);
}

#[test]
fn test_size_display() {
    assert_eq!(Size::new(640, 480).to_string(), "640x480");
}
