//! Heatmap visualization.
//!
//! Presentation only: nothing here feeds back into analytics.

use std::sync::OnceLock;

use image::{Rgb, RgbImage};
use ndarray::Array2;

/// Inferno control points, evenly spaced from 0 to 255.
const INFERNO_STOPS: [[u8; 3]; 10] = [
    [0x00, 0x00, 0x04],
    [0x1b, 0x0c, 0x41],
    [0x4a, 0x0c, 0x6b],
    [0x78, 0x1c, 0x6d],
    [0xa5, 0x2c, 0x60],
    [0xcf, 0x44, 0x46],
    [0xed, 0x69, 0x25],
    [0xfb, 0x9b, 0x06],
    [0xf7, 0xd1, 0x3d],
    [0xfc, 0xff, 0xa4],
];

/// 256-entry inferno lookup table.
pub fn inferno_table() -> &'static [[u8; 3]; 256] {
    static TABLE: OnceLock<[[u8; 3]; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let segments = (INFERNO_STOPS.len() - 1) as f64;
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let position = i as f64 / 255.0 * segments;
            let lo = (position.floor() as usize).min(INFERNO_STOPS.len() - 2);
            let t = position - lo as f64;
            for channel in 0..3 {
                let a = INFERNO_STOPS[lo][channel] as f64;
                let b = INFERNO_STOPS[lo + 1][channel] as f64;
                entry[channel] = (a + (b - a) * t).round() as u8;
            }
        }
        table
    })
}

/// Min-max normalize `heatmap` to 0..=255.
///
/// A grid with no spread (max == min) maps to all zeros.
pub fn normalize(heatmap: &Array2<f32>) -> Array2<u8> {
    let (min, max) = heatmap
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let span = max - min;
    if !(span > 0.0) {
        return Array2::zeros(heatmap.raw_dim());
    }

    heatmap.mapv(|v| (((v - min) / span) * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Color image of `heatmap` through the inferno scale.
pub fn render(heatmap: &Array2<f32>) -> RgbImage {
    let (rows, cols) = heatmap.dim();
    let levels = normalize(heatmap);
    let table = inferno_table();

    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        Rgb(table[levels[[y as usize, x as usize]] as usize])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_endpoints_and_monotone_red() {
        let table = inferno_table();
        assert_eq!(table[0], INFERNO_STOPS[0]);
        assert_eq!(table[255], INFERNO_STOPS[9]);
        // Luminance rises overall from dark to bright.
        let luma = |c: [u8; 3]| c[0] as u32 * 3 + c[1] as u32 * 6 + c[2] as u32;
        assert!(luma(table[200]) > luma(table[50]));
    }

    #[test]
    fn test_flat_heatmap_renders_darkest_color() {
        let heatmap = Array2::<f32>::from_elem((4, 6), 12.5);
        let image = render(&heatmap);
        assert_eq!(image.dimensions(), (6, 4));
        assert!(image.pixels().all(|p| p.0 == INFERNO_STOPS[0]));
    }

    #[test]
    fn test_normalize_spans_full_range() {
        let mut heatmap = Array2::<f32>::zeros((2, 3));
        heatmap[[0, 1]] = 5.0;
        heatmap[[1, 2]] = 10.0;
        let levels = normalize(&heatmap);
        assert_eq!(levels[[0, 0]], 0);
        assert_eq!(levels[[0, 1]], 128);
        assert_eq!(levels[[1, 2]], 255);

        let image = render(&heatmap);
        assert_eq!(image.get_pixel(2, 1).0, INFERNO_STOPS[9]);
        assert_eq!(image.get_pixel(0, 0).0, INFERNO_STOPS[0]);
    }
}
