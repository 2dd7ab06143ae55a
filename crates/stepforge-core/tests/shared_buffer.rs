use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use stepforge_core::shm::{BufferHeader, SharedBuffer, BYTES_PER_PIXEL, HEADER_LEN};

fn buffer_bytes(width: u32, height: u32, written: u32) -> Vec<u8> {
    let header = BufferHeader {
        version: 1,
        width,
        height,
        pixels_written: written,
        pixels_read: 0,
    };
    let count = (width * height) as usize;
    let mut bytes = vec![0u8; HEADER_LEN + count * BYTES_PER_PIXEL];
    header.write_to(&mut bytes);
    for i in 0..count {
        let at = HEADER_LEN + i * BYTES_PER_PIXEL;
        bytes[at..at + 4].copy_from_slice(&[i as u8, i as u8 + 10, i as u8 + 20, 255]);
    }
    bytes
}

fn set_written(path: &Path, written: u32) {
    let mut file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(12)).unwrap();
    file.write_all(&written.to_le_bytes()).unwrap();
    file.flush().unwrap();
}

fn read_header(path: &Path) -> BufferHeader {
    BufferHeader::parse(&std::fs::read(path).unwrap()).unwrap()
}

#[test]
fn header_pixel_count_and_len() {
    let header = BufferHeader::parse(&buffer_bytes(4, 3, 0)).unwrap();
    assert_eq!(Some(12), header.pixel_count());
    assert_eq!(Some(HEADER_LEN + 48), header.buffer_len());
    assert_eq!(None, BufferHeader::parse(&[0u8; 19]));
}

#[test]
fn missing_or_short_buffer_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.map");
    assert!(SharedBuffer::open(&path).unwrap().is_none());

    std::fs::write(&path, [0u8; 10]).unwrap();
    assert!(SharedBuffer::open(&path).unwrap().is_none());
}

#[test]
fn drain_copies_only_written_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.map");
    std::fs::write(&path, buffer_bytes(4, 2, 3)).unwrap();

    let mut buffer = SharedBuffer::open(&path).unwrap().unwrap();
    let mut image = None;
    let progress = buffer.drain_into(&mut image).unwrap();
    assert_eq!(3, progress.pixels_read);
    assert_eq!(8, progress.pixel_count);
    assert!(!progress.is_complete());

    let img = image.as_ref().unwrap();
    assert_eq!((4, 2), img.dimensions());
    assert_eq!([2, 12, 22, 255], img.get_pixel(2, 0).0);
    assert_eq!([0, 0, 0, 0], img.get_pixel(3, 0).0);
    assert_eq!(3, read_header(&path).pixels_read);

    set_written(&path, 8);
    let progress = buffer.drain_into(&mut image).unwrap();
    assert_eq!(8, progress.pixels_read);
    assert!(progress.is_complete());
    assert!((1.0 - progress.fraction()).abs() < f32::EPSILON);

    let img = image.as_ref().unwrap();
    assert_eq!([3, 13, 23, 255], img.get_pixel(3, 0).0);
    assert_eq!([7, 17, 27, 255], img.get_pixel(3, 1).0);
    assert_eq!(8, read_header(&path).pixels_read);
}

#[test]
fn pixels_read_never_passes_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.map");
    std::fs::write(&path, buffer_bytes(2, 2, 100)).unwrap();

    let mut buffer = SharedBuffer::open(&path).unwrap().unwrap();
    let mut image = None;
    let progress = buffer.drain_into(&mut image).unwrap();
    assert_eq!(4, progress.pixels_read);

    let header = read_header(&path);
    assert!(header.pixels_read <= header.pixels_written);
    assert_eq!(4, header.pixels_read);

    // Nothing new: the counter stays where it was.
    let again = buffer.drain_into(&mut image).unwrap();
    assert_eq!(progress, again);
}

#[test]
fn size_change_reallocates_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.map");
    std::fs::write(&path, buffer_bytes(2, 2, 4)).unwrap();

    let mut image = Some(image::RgbaImage::new(9, 9));
    let mut buffer = SharedBuffer::open(&path).unwrap().unwrap();
    buffer.drain_into(&mut image).unwrap();
    assert_eq!((2, 2), image.unwrap().dimensions());
}
