//! 1-bit foreground/background raster.

use image::GrayImage;

use crate::error::TraceError;

/// Read-only binary raster, one bit per pixel, rows packed MSB-first.
///
/// Each row starts on a byte boundary (`stride = ceil(width / 8)`), the same
/// layout PBM and most 1-bit image formats use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    width: u32,
    height: u32,
    stride: usize,
    bits: Vec<u8>,
}

impl PixelMask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            width,
            height,
            stride,
            bits: vec![0; stride * height as usize],
        }
    }

    /// Wrap packed rows. `bits.len()` must equal `ceil(width / 8) * height`.
    pub fn from_packed(width: u32, height: u32, bits: Vec<u8>) -> Result<Self, TraceError> {
        let stride = (width as usize).div_ceil(8);
        let expected = stride * height as usize;
        if bits.len() != expected {
            return Err(TraceError::InvalidMask(format!(
                "{}x{} mask needs {} bytes, got {}",
                width,
                height,
                expected,
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            bits,
        })
    }

    /// Non-zero pixels are foreground.
    pub fn from_gray(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let mut mask = Self::new(width, height);
        for (x, y, px) in img.enumerate_pixels() {
            if px.0[0] != 0 {
                mask.set(x, y, true);
            }
        }
        mask
    }

    /// Build a mask from a text picture: `#` (or any of `X`, `1`, `*`) is
    /// foreground, everything else background. Blank leading/trailing lines
    /// and the common indentation are ignored.
    pub fn from_ascii(art: &str) -> Self {
        let mut rows: Vec<&str> = art.lines().map(str::trim_end).collect();
        while rows.first().is_some_and(|r| r.is_empty()) {
            rows.remove(0);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        let indent = rows
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| r.len() - r.trim_start().len())
            .min()
            .unwrap_or(0);

        let height = rows.len() as u32;
        let width = rows
            .iter()
            .map(|r| r.chars().count().saturating_sub(indent))
            .max()
            .unwrap_or(0) as u32;
        let mut mask = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().skip(indent).enumerate() {
                if matches!(c, '#' | 'X' | '1' | '*') {
                    mask.set(x as u32, y as u32, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed row data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Foreground test with out-of-bounds coordinates reading as background.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        let byte = self.bits[y * self.stride + x / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let idx = y * self.stride + x / 8;
        let bit = 0x80 >> (x % 8);
        if value {
            self.bits[idx] |= bit;
        } else {
            self.bits[idx] &= !bit;
        }
    }

    pub fn count_foreground(&self) -> usize {
        self.iter_foreground().count()
    }

    /// Foreground pixel coordinates in raster order.
    pub fn iter_foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| self.get(x as i64, y as i64).then_some((x, y)))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }
}
