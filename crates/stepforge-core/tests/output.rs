use image::{Rgba, RgbaImage};
use std::path::Path;
use stepforge_core::output::{auto_crop, content_bounds, write_image, OutputFormat};
use stepforge_core::RenderError;

#[test]
fn format_from_extension() {
    assert_eq!(Some(OutputFormat::Png), OutputFormat::from_path(Path::new("a.png")));
    assert_eq!(Some(OutputFormat::Bmp), OutputFormat::from_path(Path::new("a.BMP")));
    assert_eq!(Some(OutputFormat::Jpeg), OutputFormat::from_path(Path::new("a.JPG")));
    assert_eq!(Some(OutputFormat::Jpeg), OutputFormat::from_path(Path::new("a.jpeg")));
    assert_eq!(None, OutputFormat::from_path(Path::new("a.gif")));
    assert_eq!(None, OutputFormat::from_path(Path::new("png")));
}

#[test]
fn crops_transparent_margin() {
    let mut img = RgbaImage::new(8, 6);
    img.put_pixel(2, 3, Rgba([255, 0, 0, 255]));
    img.put_pixel(5, 1, Rgba([0, 0, 255, 128]));

    let bounds = content_bounds(&img);
    assert_eq!((2, 1, 5, 3), (bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y));

    let cropped = auto_crop(&img);
    assert_eq!((4, 3), cropped.dimensions());
    assert_eq!(Rgba([255, 0, 0, 255]), *cropped.get_pixel(0, 2));
}

#[test]
fn crops_opaque_background_by_corner_colour() {
    let mut img = RgbaImage::from_pixel(5, 5, Rgba([255, 255, 255, 255]));
    img.put_pixel(3, 2, Rgba([200, 0, 0, 255]));
    let cropped = auto_crop(&img);
    assert_eq!((1, 1), cropped.dimensions());
}

#[test]
fn blank_image_is_not_cropped() {
    let img = RgbaImage::new(7, 4);
    assert!(content_bounds(&img).is_empty());
    assert_eq!((7, 4), auto_crop(&img).dimensions());
}

#[test]
fn writes_png_and_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let mut img = RgbaImage::new(4, 4);
    img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));

    let png = dir.path().join("out").join("step.png");
    write_image(&img, &png, true).unwrap();
    let written = image::open(&png).unwrap();
    assert_eq!(1, written.width());

    let jpg = dir.path().join("step.jpg");
    write_image(&img, &jpg, false).unwrap();
    assert_eq!(4, image::open(&jpg).unwrap().width());
}

#[test]
fn rejects_unknown_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("step.gif");
    let err = write_image(&RgbaImage::new(1, 1), &path, false).unwrap_err();
    assert!(matches!(err, RenderError::UnsupportedOutput { .. }));
    assert!(!path.exists());
}
