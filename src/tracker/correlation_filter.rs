//! Appearance model used to carry a box across frames without detections.
//!
//! The filter keeps a zero-mean grayscale template of the object and, on
//! each step, slides it over a small search window around the last known
//! position, picking the offset with the highest normalized
//! cross-correlation (NCC) response.

use image::GrayImage;
use log::trace;
use ndarray::{Array2, ArrayView2, Zip, s};

use crate::tracker::rect::Rect;

const EPS: f32 = 1e-6;

/// Convert a grayscale frame to a row-major (height, width) luma array.
pub fn luma_array(frame: &GrayImage) -> Array2<f32> {
    let (width, height) = frame.dimensions();
    let shape = (height as usize, width as usize);
    let len = shape.0 * shape.1;
    // The buffer always holds at least width * height samples.
    match frame.as_raw().get(..len).map(|raw| ArrayView2::from_shape(shape, raw)) {
        Some(Ok(view)) => view.mapv(f32::from),
        _ => Array2::zeros(shape),
    }
}

/// Tuning for [`CorrelationFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Largest displacement searched per step, in pixels on each axis.
    pub search_radius: u32,
    /// Weight of the newly observed patch when the template is updated after
    /// a step. 0 keeps the seeded template unchanged.
    pub learning_rate: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            search_radius: 16,
            learning_rate: 0.125,
        }
    }
}

/// Result of advancing the filter by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub bbox: Rect,
    /// NCC response at the chosen offset, in [-1, 1]; 0 when the filter has
    /// nothing to correlate.
    pub response: f32,
}

#[derive(Debug, Clone)]
struct Template {
    /// Zero-mean patch.
    patch: Array2<f32>,
    norm: f32,
    /// Top-left pixel (col, row) of the patch in frame coordinates.
    origin: (i64, i64),
}

impl Template {
    fn capture(luma: &Array2<f32>, bbox: &Rect) -> Option<Self> {
        let (rows, cols) = luma.dim();
        let x0 = (bbox.x.floor() as i64).max(0);
        let y0 = (bbox.y.floor() as i64).max(0);
        let x1 = ((bbox.x + bbox.width).ceil() as i64).min(cols as i64);
        let y1 = ((bbox.y + bbox.height).ceil() as i64).min(rows as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let view = luma.slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize]);
        let patch = zero_mean(view);
        let norm = energy(&patch).sqrt();
        Some(Self {
            patch,
            norm,
            origin: (x0, y0),
        })
    }

    fn window<'a>(&self, luma: &'a Array2<f32>, origin: (i64, i64)) -> Option<ArrayView2<'a, f32>> {
        let (rows, cols) = luma.dim();
        let (h, w) = self.patch.dim();
        let (x, y) = origin;
        if x < 0 || y < 0 || x as usize + w > cols || y as usize + h > rows {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some(luma.slice(s![y..y + h, x..x + w]))
    }

    fn response(&self, window: ArrayView2<'_, f32>) -> f32 {
        let mean = window.mean().unwrap_or(0.0);
        let mut cross = 0.0_f32;
        let mut window_energy = 0.0_f32;
        Zip::from(&window).and(&self.patch).for_each(|&p, &t| {
            let centered = p - mean;
            cross += centered * t;
            window_energy += centered * centered;
        });

        let denom = window_energy.sqrt() * self.norm;
        if denom <= EPS { 0.0 } else { cross / denom }
    }

    fn blend(&mut self, window: ArrayView2<'_, f32>, learning_rate: f32) {
        let observed = zero_mean(window);
        self.patch = &self.patch * (1.0 - learning_rate) + &observed * learning_rate;
        self.norm = energy(&self.patch).sqrt();
    }
}

fn zero_mean(view: ArrayView2<'_, f32>) -> Array2<f32> {
    let mean = view.mean().unwrap_or(0.0);
    view.mapv(|v| v - mean)
}

fn energy(patch: &Array2<f32>) -> f32 {
    patch.iter().map(|v| v * v).sum()
}

/// Per-track visual correlation filter.
#[derive(Debug, Clone)]
pub struct CorrelationFilter {
    template: Option<Template>,
    params: FilterParams,
}

impl CorrelationFilter {
    /// Seed a filter from the region of `luma` under `bbox`.
    ///
    /// A box that lies entirely outside the frame yields a filter without a
    /// template; such a filter holds its position on every step.
    pub fn seed(luma: &Array2<f32>, bbox: &Rect, params: FilterParams) -> Self {
        Self {
            template: Template::capture(luma, bbox),
            params,
        }
    }

    /// Replace the template with the region under a freshly detected box.
    pub fn reseed(&mut self, luma: &Array2<f32>, bbox: &Rect) {
        self.template = Template::capture(luma, bbox);
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Advance one frame: find where the template moved and shift `bbox` by
    /// the same displacement.
    pub fn step(&mut self, luma: &Array2<f32>, bbox: &Rect) -> Prediction {
        let hold = Prediction {
            bbox: *bbox,
            response: 0.0,
        };
        let Some(template) = self.template.as_mut() else {
            return hold;
        };

        let (ox, oy) = template.origin;
        let mut best: Option<((i64, i64), f32)> = template
            .window(luma, (ox, oy))
            .map(|w| ((0, 0), template.response(w)));

        let radius = self.params.search_radius as i64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let Some(window) = template.window(luma, (ox + dx, oy + dy)) else {
                    continue;
                };
                let response = template.response(window);
                if best.is_none_or(|(_, r)| response > r) {
                    best = Some(((dx, dy), response));
                }
            }
        }

        let Some(((dx, dy), response)) = best else {
            return hold;
        };

        template.origin = (ox + dx, oy + dy);
        if self.params.learning_rate > 0.0 {
            if let Some(window) = template.window(luma, template.origin) {
                template.blend(window, self.params.learning_rate);
            }
        }
        trace!("correlation step moved ({dx}, {dy}) with response {response:.3}");

        Prediction {
            bbox: bbox.translate(dx as f32, dy as f32),
            response,
        }
    }
}
