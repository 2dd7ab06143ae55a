//! Shared progress buffer written by the renderer.
//!
//! Layout (little-endian): `version`, `width`, `height`, `pixels_written`,
//! `pixels_read` as `u32`, then `width * height` RGBA pixels. The renderer
//! owns every field except `pixels_read`, which only the consumer writes,
//! after it has copied the pixels up to `pixels_written`.

use crate::error::RenderError;
use image::RgbaImage;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};

pub const HEADER_LEN: usize = 20;
pub const BYTES_PER_PIXEL: usize = 4;
const PIXELS_READ_OFFSET: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHeader {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub pixels_written: u32,
    pub pixels_read: u32,
}

impl BufferHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let field = |i: usize| {
            let at = i * 4;
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Some(Self {
            version: field(0),
            width: field(1),
            height: field(2),
            pixels_written: field(3),
            pixels_read: field(4),
        })
    }

    pub fn write_to(&self, bytes: &mut [u8]) {
        for (i, value) in [
            self.version,
            self.width,
            self.height,
            self.pixels_written,
            self.pixels_read,
        ]
        .into_iter()
        .enumerate()
        {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// `width * height`, or `None` if it does not fit in memory.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Total file size implied by the header.
    pub fn buffer_len(&self) -> Option<usize> {
        self.pixel_count()?
            .checked_mul(BYTES_PER_PIXEL)?
            .checked_add(HEADER_LEN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub pixels_read: u32,
    pub pixel_count: u32,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.pixel_count == 0 {
            0.0
        } else {
            self.pixels_read as f32 / self.pixel_count as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pixel_count > 0 && self.pixels_read == self.pixel_count
    }
}

/// Consumer side of the shared progress buffer.
pub struct SharedBuffer {
    path: PathBuf,
    file: File,
    map: MmapMut,
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("path", &self.path)
            .field("len", &self.map.len())
            .finish()
    }
}

impl SharedBuffer {
    /// Maps the buffer file. `Ok(None)` means the renderer has not created
    /// it yet, or it is still shorter than the header.
    pub fn open(path: &Path) -> Result<Option<Self>, RenderError> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if (file.metadata()?.len() as usize) < HEADER_LEN {
            return Ok(None);
        }
        let map = map_file(&file)?;
        log::debug!("mapped render buffer {path:?} ({} bytes)", map.len());
        Ok(Some(Self {
            path: path.to_path_buf(),
            file,
            map,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> BufferHeader {
        let header = BufferHeader::parse(&self.map).unwrap_or(BufferHeader {
            version: 0,
            width: 0,
            height: 0,
            pixels_written: 0,
            pixels_read: 0,
        });
        // Pixel bytes up to `pixels_written` are visible after this point.
        fence(Ordering::Acquire);
        header
    }

    /// Copies the pixels written since the last call into `image` and
    /// advances `pixels_read`. The image is (re)allocated when it is missing
    /// or its size differs from the header.
    pub fn drain_into(&mut self, image: &mut Option<RgbaImage>) -> Result<Progress, RenderError> {
        let header = self.header();
        let pixel_count = header.pixel_count().ok_or_else(|| {
            RenderError::Buffer(format!(
                "image size {}x{} overflows",
                header.width, header.height
            ))
        })?;
        let pixel_count_u32 = u32::try_from(pixel_count)
            .map_err(|_| RenderError::Buffer(format!("{pixel_count} pixels exceed the header range")))?;

        self.remap_if_grown(&header)?;
        let mapped_pixels = self.map.len().saturating_sub(HEADER_LEN) / BYTES_PER_PIXEL;

        let written = (header.pixels_written as usize)
            .min(pixel_count)
            .min(mapped_pixels);

        let needs_alloc = match image {
            Some(img) => img.width() != header.width || img.height() != header.height,
            None => true,
        };
        let mut read = header.pixels_read as usize;
        if needs_alloc {
            *image = Some(RgbaImage::new(header.width, header.height));
            read = 0;
        }
        let read = read.min(written);

        if written > read {
            let Some(img) = image.as_mut() else {
                return Err(RenderError::Buffer("image buffer missing".to_string()));
            };
            let src = &self.map[HEADER_LEN + read * BYTES_PER_PIXEL..HEADER_LEN + written * BYTES_PER_PIXEL];
            let dst: &mut [u8] = img;
            dst[read * BYTES_PER_PIXEL..written * BYTES_PER_PIXEL].copy_from_slice(src);

            fence(Ordering::Release);
            self.map[PIXELS_READ_OFFSET..PIXELS_READ_OFFSET + 4]
                .copy_from_slice(&(written as u32).to_le_bytes());
            log::debug!("decoded pixels {read}..{written} of {pixel_count}");
        }

        Ok(Progress {
            pixels_read: written as u32,
            pixel_count: pixel_count_u32,
        })
    }

    fn remap_if_grown(&mut self, header: &BufferHeader) -> Result<(), RenderError> {
        let Some(expected) = header.buffer_len() else {
            return Ok(());
        };
        if self.map.len() >= expected {
            return Ok(());
        }
        let len = self.file.metadata()?.len() as usize;
        if len > self.map.len() {
            self.map = map_file(&self.file)?;
        }
        Ok(())
    }
}

fn map_file(file: &File) -> Result<MmapMut, RenderError> {
    // SAFETY: the file is opened read/write and only this process and the
    // renderer touch it. The renderer never writes `pixels_read`, and pixel
    // bytes are only read below the `pixels_written` counter it publishes.
    let map = unsafe { MmapOptions::new().map_mut(file)? };
    Ok(map)
}
