use crate::error::RenderError;
use crate::geom::PixelBox;
use crate::strutil::extension_lower;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Bmp,
    Jpeg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension_lower(path).as_str() {
            "png" => Some(OutputFormat::Png),
            "bmp" => Some(OutputFormat::Bmp),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Bounds of the pixels that differ from the background. The background is
/// fully transparent, or the colour of the top-left pixel when that pixel is
/// opaque.
pub fn content_bounds(img: &RgbaImage) -> PixelBox {
    let mut bounds = PixelBox::empty();
    if img.width() == 0 || img.height() == 0 {
        return bounds;
    }
    let corner = *img.get_pixel(0, 0);
    let is_background = |p: &Rgba<u8>| p[3] == 0 || (corner[3] != 0 && *p == corner);
    for (x, y, p) in img.enumerate_pixels() {
        if !is_background(p) {
            bounds.include_point(x, y);
        }
    }
    bounds
}

/// Crops to the content bounds. An all-background image is left unchanged.
pub fn auto_crop(img: &RgbaImage) -> RgbaImage {
    let bounds = content_bounds(img);
    if bounds.is_empty() {
        return img.clone();
    }
    image::imageops::crop_imm(img, bounds.min_x, bounds.min_y, bounds.width(), bounds.height()).to_image()
}

/// Writes the rendered image in the format implied by the extension.
pub fn write_image(img: &RgbaImage, path: &Path, crop: bool) -> Result<(), RenderError> {
    let format = OutputFormat::from_path(path).ok_or_else(|| RenderError::UnsupportedOutput {
        path: path.to_path_buf(),
    })?;
    let img = if crop { auto_crop(img) } else { img.clone() };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let output_err = |source| RenderError::Output {
        path: path.to_path_buf(),
        source,
    };
    match format {
        // JPEG has no alpha channel.
        OutputFormat::Jpeg => DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, format.image_format())
            .map_err(output_err),
        _ => img.save_with_format(path, format.image_format()).map_err(output_err),
    }
}
