//! Shared fixtures for integration tests

#![allow(dead_code)]

use cms_fields::storage::IncomingFile;
use image::{ImageBuffer, Rgb};
use std::path::Path;

/// Writes a real PNG of the given size into `dir` and returns it as an upload
pub fn png_upload(dir: &Path, name: &str, width: u32, height: u32) -> IncomingFile {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let path = dir.join(format!("upload-{name}"));
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    let size = std::fs::metadata(&path).unwrap().len();
    IncomingFile::new(path, name, "image/png", size)
}

/// Encoded PNG bytes of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb([0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Number of entries in a directory, zero when it does not exist
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}
