//! Decaying motion heatmap.

use image::GrayImage;
use ndarray::{Array2, ArrayView2, Zip};

use super::config::AccumulatorConfig;
use crate::error::{MediaError, MediaResult};

/// Turns a stream of edge-magnitude frames into a decaying heatmap and a
/// lifetime total.
///
/// For every frame after the first:
///
/// ```text
/// delta    = |edge[n] - edge[n-1]|
/// heatmap  = heatmap * decay + delta
/// lifetime = lifetime + delta
/// ```
///
/// Both grids are `(height, width)` and never go negative.
#[derive(Debug, Clone)]
pub struct MotionAccumulator {
    config: AccumulatorConfig,
    width: u32,
    height: u32,
    heatmap: Array2<f32>,
    lifetime: Array2<f64>,
    previous: Option<Array2<u8>>,
    ingested: u64,
}

impl MotionAccumulator {
    /// Zeroed accumulator for `width × height` frames.
    pub fn new(width: u32, height: u32, config: AccumulatorConfig) -> Self {
        let shape = (height as usize, width as usize);
        Self {
            config,
            width,
            height,
            heatmap: Array2::zeros(shape),
            lifetime: Array2::zeros(shape),
            previous: None,
            ingested: 0,
        }
    }

    /// Zero both grids for a new `width × height` stream and forget the
    /// previous frame.
    pub fn reset(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height, self.config);
    }

    /// Feed one edge-magnitude frame.
    ///
    /// Returns `false` for the first frame after a reset, which only
    /// becomes the reference for the next delta.
    pub fn ingest(&mut self, edge_frame: &GrayImage) -> MediaResult<bool> {
        if edge_frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::dimension_mismatch(
                (self.width, self.height),
                edge_frame.dimensions(),
            ));
        }

        let current = ArrayView2::from_shape(
            (self.height as usize, self.width as usize),
            edge_frame.as_raw().as_slice(),
        )
        .map_err(|e| MediaError::internal(format!("edge frame layout: {e}")))?;

        self.ingested += 1;

        let Some(previous) = self.previous.as_mut() else {
            self.previous = Some(current.to_owned());
            return Ok(false);
        };

        let decay = self.config.decay_rate as f32;
        Zip::from(&mut self.heatmap)
            .and(&mut self.lifetime)
            .and(&mut *previous)
            .and(&current)
            .for_each(|heat, total, prev, &cur| {
                let delta = cur.abs_diff(*prev);
                *heat = *heat * decay + delta as f32;
                *total += delta as f64;
                *prev = cur;
            });

        Ok(true)
    }

    /// Mean heatmap energy; 0 for an empty grid.
    pub fn current_intensity(&self) -> f64 {
        if self.heatmap.is_empty() {
            return 0.0;
        }
        self.heatmap.iter().map(|&v| v as f64).sum::<f64>() / self.heatmap.len() as f64
    }

    /// Decaying heatmap, `(height, width)`.
    pub fn heatmap(&self) -> &Array2<f32> {
        &self.heatmap
    }

    /// Sum of every delta since the last reset, `(height, width)`.
    pub fn lifetime(&self) -> &Array2<f64> {
        &self.lifetime
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frames ingested since the last reset, including the reference frame.
    pub fn frames_ingested(&self) -> u64 {
        self.ingested
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }
}
