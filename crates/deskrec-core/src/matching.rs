//! Template matching for anchor images
//!
//! Zero-mean normalized cross-correlation on grayscale images. A coarse pass
//! on downscaled copies picks a few candidate positions, a full-resolution
//! pass around each candidate picks the winner. Scores range over [-1, 1];
//! a match is reported only when the best score reaches the confidence.

use crate::geometry::Region;
use image::imageops::{self, FilterType};
use image::GrayImage;

/// Candidates kept from the coarse pass
const CANDIDATES: usize = 8;
/// Coarse pass targets roughly this haystack width
const COARSE_WIDTH: u32 = 480;
/// Smallest needle side allowed after downscaling
const MIN_COARSE_NEEDLE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Position in haystack pixels
    pub region: Region,
    pub score: f32,
}

/// Best placement of `needle` in `haystack` if it scores at least `confidence`.
pub fn find(haystack: &GrayImage, needle: &GrayImage, confidence: f32) -> Option<Match> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();
    if nw == 0 || nh == 0 || nw > hw || nh > hh {
        return None;
    }

    let scale = (hw / COARSE_WIDTH)
        .max(1)
        .min((nw.min(nh) / MIN_COARSE_NEEDLE).max(1));

    let full = Scorer::new(haystack, needle);
    let best = if scale == 1 {
        full.scan(1).into_iter().next()
    } else {
        let small_hay = imageops::resize(haystack, hw / scale, hh / scale, FilterType::Triangle);
        let small_needle = imageops::resize(needle, nw / scale, nh / scale, FilterType::Triangle);
        let coarse = Scorer::new(&small_hay, &small_needle);

        let max_x = hw - nw;
        let max_y = hh - nh;
        let mut best: Option<(u32, u32, f32)> = None;
        for (cx, cy, _) in coarse.scan(CANDIDATES) {
            let (fx, fy) = (cx * scale, cy * scale);
            for y in fy.saturating_sub(scale)..=(fy + scale).min(max_y) {
                for x in fx.saturating_sub(scale)..=(fx + scale).min(max_x) {
                    let score = full.score_at(x, y);
                    if best.map_or(true, |(_, _, s)| score > s) {
                        best = Some((x, y, score));
                    }
                }
            }
        }
        best
    };

    best.filter(|&(_, _, score)| score >= confidence)
        .map(|(x, y, score)| Match {
            region: Region::new(x as i32, y as i32, nw, nh),
            score,
        })
}

/// Precomputed sums for scoring one needle against one haystack
struct Scorer<'a> {
    hay: &'a GrayImage,
    /// Summed-area tables of pixel values and squared values, (w+1)*(h+1)
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    /// Needle with its mean removed
    needle: Vec<f64>,
    needle_w: u32,
    needle_h: u32,
    needle_mean: f64,
    needle_energy: f64,
}

impl<'a> Scorer<'a> {
    fn new(hay: &'a GrayImage, needle: &GrayImage) -> Self {
        let (w, h) = hay.dimensions();
        let stride = (w + 1) as usize;
        let mut sum = vec![0.0; stride * (h + 1) as usize];
        let mut sum_sq = vec![0.0; stride * (h + 1) as usize];
        for y in 0..h {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = hay.get_pixel(x, y).0[0] as f64;
                row += v;
                row_sq += v * v;
                let i = (y as usize + 1) * stride + x as usize + 1;
                sum[i] = sum[i - stride] + row;
                sum_sq[i] = sum_sq[i - stride] + row_sq;
            }
        }

        let raw: Vec<f64> = needle.pixels().map(|p| p.0[0] as f64).collect();
        let needle_mean = raw.iter().sum::<f64>() / raw.len() as f64;
        let centered: Vec<f64> = raw.iter().map(|v| v - needle_mean).collect();
        let needle_energy = centered.iter().map(|v| v * v).sum();

        Self {
            hay,
            sum,
            sum_sq,
            needle: centered,
            needle_w: needle.width(),
            needle_h: needle.height(),
            needle_mean,
            needle_energy,
        }
    }

    fn window_sums(&self, x: u32, y: u32) -> (f64, f64) {
        let stride = (self.hay.width() + 1) as usize;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + self.needle_w as usize, y0 + self.needle_h as usize);
        let area = |t: &[f64]| t[y1 * stride + x1] - t[y0 * stride + x1] - t[y1 * stride + x0] + t[y0 * stride + x0];
        (area(&self.sum), area(&self.sum_sq))
    }

    fn score_at(&self, x: u32, y: u32) -> f32 {
        let n = (self.needle_w * self.needle_h) as f64;
        let (s, sq) = self.window_sums(x, y);
        let window_energy = (sq - s * s / n).max(0.0);

        // Flat patches have no correlation to speak of; compare brightness.
        if self.needle_energy < 1e-6 || window_energy < 1e-6 {
            if self.needle_energy < 1e-6 && window_energy < 1e-6 {
                return (1.0 - ((s / n) - self.needle_mean).abs() / 255.0) as f32;
            }
            return 0.0;
        }

        let mut cross = 0.0;
        for ny in 0..self.needle_h {
            let row = (ny * self.needle_w) as usize;
            for nx in 0..self.needle_w {
                let v = self.hay.get_pixel(x + nx, y + ny).0[0] as f64;
                cross += v * self.needle[row + nx as usize];
            }
        }
        (cross / (window_energy * self.needle_energy).sqrt()) as f32
    }

    /// Every placement scored, best `keep` returned in descending order.
    fn scan(&self, keep: usize) -> Vec<(u32, u32, f32)> {
        let max_x = self.hay.width() - self.needle_w;
        let max_y = self.hay.height() - self.needle_h;
        let mut scored = Vec::with_capacity(((max_x + 1) * (max_y + 1)) as usize);
        for y in 0..=max_y {
            for x in 0..=max_x {
                scored.push((x, y, self.score_at(x, y)));
            }
        }
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored.truncate(keep);
        scored
    }
}
