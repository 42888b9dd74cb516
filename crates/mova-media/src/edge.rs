//! Host-side edge filtering and resampling.
//!
//! `sobel_magnitude` is the software stand-in for the external device: a
//! 3×3 Sobel gradient in both axes combined as `sqrt(gx² + gy²)` and
//! saturated to a byte. Borders replicate the nearest edge pixel.

use image::imageops::{self, FilterType};
use image::GrayImage;
use rayon::prelude::*;

/// Mask that keeps every bit of the input.
pub const FULL_MASK: u8 = 0xFF;

/// Sobel gradient magnitude of `frame`.
///
/// Each input pixel is ANDed with `mask` first; `0xF0` reproduces a 4-bit
/// quantizing front end, [`FULL_MASK`] leaves the frame untouched.
pub fn sobel_magnitude(frame: &GrayImage, mask: u8) -> GrayImage {
    let (width, height) = frame.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let src: Vec<i32> = frame.as_raw().iter().map(|&p| (p & mask) as i32).collect();
    let at = |x: usize, y: usize| src[y * w + x];

    let mut out = vec![0u8; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(h - 1);
        for (x, slot) in row.iter_mut().enumerate() {
            let left = x.saturating_sub(1);
            let right = (x + 1).min(w - 1);

            let gx = (at(right, up) + 2 * at(right, y) + at(right, down))
                - (at(left, up) + 2 * at(left, y) + at(left, down));
            let gy = (at(left, down) + 2 * at(x, down) + at(right, down))
                - (at(left, up) + 2 * at(x, up) + at(right, up));

            let magnitude = ((gx * gx + gy * gy) as f64).sqrt();
            *slot = magnitude.round().min(255.0) as u8;
        }
    });

    // Dimensions come from `frame`, so the buffer length always matches.
    GrayImage::from_raw(width, height, out).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Bilinear resize; returns a copy when the size already matches.
pub fn resize_gray(frame: &GrayImage, width: u32, height: u32) -> GrayImage {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    imageops::resize(frame, width, height, FilterType::Triangle)
}
