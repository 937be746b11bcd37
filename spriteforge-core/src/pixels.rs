//! Pixel Buffer Model
//!
//! `PixelData` is the universal image representation: RGBA interleaved,
//! row-major, `width * height * 4` bytes. The length invariant is checked
//! on construction and cannot be broken afterwards because the buffer is
//! only exposed as a fixed-length slice.
//!
//! `Clone` is the defensive deep copy. Every stage that mutates pixels
//! takes a `PixelData` by value and hands it back, so a buffer passed to a
//! stage is consumed and the caller keeps the returned one.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::{ImageFormat, RgbaImage};

use crate::error::ForgeError;

/// An `(r, g, b)` triple.
pub type Rgb = [u8; 3];

/// Unique colors in first-seen order. Order matters for nearest-color ties.
pub type Palette = Vec<Rgb>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelData {
    /// Wrap an RGBA buffer, rejecting zero dimensions or a length that does
    /// not match `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ForgeError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));

        match expected {
            Some(len) if width > 0 && height > 0 && len == data.len() => {
                Ok(Self { width, height, data })
            }
            _ => Err(ForgeError::InvalidBuffer {
                width,
                height,
                len: data.len(),
            }),
        }
    }

    /// Fully transparent canvas.
    pub fn transparent(width: u32, height: u32) -> Result<Self, ForgeError> {
        let len = (width as usize) * (height as usize) * 4;
        Self::new(width, height, vec![0; len])
    }

    /// Canvas filled with one RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ForgeError> {
        let pixels = (width as usize) * (height as usize);
        let data = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.data[self.offset(x, y) + 3]
    }

    pub fn from_rgba_image(img: RgbaImage) -> Result<Self, ForgeError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub fn to_rgba_image(&self) -> Result<RgbaImage, ForgeError> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            ForgeError::InvalidBuffer {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            },
        )
    }

    /// Decode any supported image file to RGBA.
    pub fn load(path: &Path) -> Result<Self, ForgeError> {
        let decoded = image::open(path)?;
        Self::from_rgba_image(decoded.to_rgba8())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ForgeError> {
        self.to_rgba_image()?
            .save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ForgeError> {
        let mut bytes = Vec::new();
        self.to_rgba_image()?
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn to_png_base64(&self) -> Result<String, ForgeError> {
        let png = self.encode_png()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }
}

/// One byte per pixel, aligned to `y * width + x`.
///
/// Used for silhouette masks, delta maps and edge maps. Entries produced
/// by this crate are always 0 or 255; [`Mask::project`] normalizes
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ForgeError> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(ForgeError::InvalidBuffer {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub(crate) fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of nonzero entries.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Normalize to strict 0/255 values.
    pub fn project(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| if v > 0 { 255 } else { 0 }).collect(),
        }
    }

    /// Grayscale visualization: 255 entries become white, the rest black.
    pub fn to_pixels(&self) -> Result<PixelData, ForgeError> {
        let data = self
            .data
            .iter()
            .flat_map(|&v| [v, v, v, 255])
            .collect();
        PixelData::new(self.width, self.height, data)
    }
}
