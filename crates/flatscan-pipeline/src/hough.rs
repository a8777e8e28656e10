//! Progressive probabilistic Hough transform (line segments).
//!
//! Edge pixels are visited in a shuffled order. Each visit votes for every
//! quantized `(theta, rho)` line through the pixel; once a cell reaches the
//! vote threshold, the line is followed through the edge map in both
//! directions (tolerating gaps of up to `max_gap` pixels). Long enough runs
//! are emitted as segments and their pixels are removed from the map and
//! from the accumulator, so every edge pixel belongs to at most one segment.
//!
//! The visiting order comes from a seeded RNG: the transform is
//! deterministic for a given seed.

use image::GrayImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Fixed-point precision used while walking along a candidate line.
const SHIFT: u32 = 16;

/// A detected segment between two edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    /// Start column.
    pub x1: i32,
    /// Start row.
    pub y1: i32,
    /// End column.
    pub x2: i32,
    /// End row.
    pub y2: i32,
}

impl LineSegment {
    /// Direction of the segment in degrees, `atan2(dy, dx)`, in `(-180, 180]`.
    #[must_use]
    pub fn angle_degrees(&self) -> f64 {
        f64::from(self.y2 - self.y1)
            .atan2(f64::from(self.x2 - self.x1))
            .to_degrees()
    }
}

/// Parameters of the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Distance resolution of the accumulator, in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator, in radians.
    pub theta: f64,
    /// Minimum accumulator votes before a line is followed.
    pub votes: u32,
    /// Minimum segment extent along x or y, in pixels.
    pub min_length: u32,
    /// Maximum gap between edge pixels on the same segment.
    pub max_gap: u32,
    /// Seed for the visiting order.
    pub seed: u64,
}

/// Accumulator over `(theta, rho)` with precomputed trigonometry.
struct Accumulator {
    cells: Vec<u32>,
    num_rho: usize,
    /// `(cos, sin)` of every angle bin, pre-divided by `rho`.
    trig: Vec<(f64, f64)>,
}

impl Accumulator {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn new(width: u32, height: u32, params: &HoughParams) -> Self {
        let num_angle = ((std::f64::consts::PI / params.theta).round() as usize).max(1);
        let num_rho =
            (((f64::from(width) + f64::from(height)) * 2.0 + 1.0) / params.rho).round() as usize;
        let inv_rho = 1.0 / params.rho;
        let trig = (0..num_angle)
            .map(|n| {
                let angle = n as f64 * params.theta;
                (angle.cos() * inv_rho, angle.sin() * inv_rho)
            })
            .collect();
        Self {
            cells: vec![0; num_angle * num_rho],
            num_rho,
            trig,
        }
    }

    /// Accumulator index of the line at angle bin `n` through `(x, y)`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell(&self, n: usize, x: usize, y: usize) -> usize {
        let (cos, sin) = self.trig[n];
        #[allow(clippy::cast_precision_loss)]
        let r = (x as f64).mul_add(cos, y as f64 * sin).round() as i64;
        let r = (r + (self.num_rho as i64 - 1) / 2).clamp(0, self.num_rho as i64 - 1);
        n * self.num_rho + r as usize
    }

    /// Add the votes of `(x, y)` and return the strongest angle bin with
    /// its vote count.
    fn vote(&mut self, x: usize, y: usize) -> (usize, u32) {
        let mut best = (0, 0);
        for n in 0..self.trig.len() {
            let idx = self.cell(n, x, y);
            self.cells[idx] += 1;
            if self.cells[idx] > best.1 {
                best = (n, self.cells[idx]);
            }
        }
        best
    }

    /// Withdraw the votes of `(x, y)`.
    fn unvote(&mut self, x: usize, y: usize) {
        for n in 0..self.trig.len() {
            let idx = self.cell(n, x, y);
            self.cells[idx] = self.cells[idx].saturating_sub(1);
        }
    }
}

/// Fixed-point walker along a line direction.
#[derive(Clone, Copy)]
struct Walker {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    /// `true` when x advances by whole pixels and y is fixed-point.
    x_major: bool,
}

impl Walker {
    #[allow(clippy::cast_possible_truncation)]
    fn new(x0: usize, y0: usize, cos: f64, sin: f64) -> Self {
        let (a, b) = (-sin, cos);
        #[allow(clippy::cast_possible_wrap)]
        let (x0, y0) = (x0 as i64, y0 as i64);
        let one = f64::from(1u32 << SHIFT);
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x: x0,
                y: (y0 << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x: (x0 << SHIFT) + half,
                y: y0,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    const fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            ..self
        }
    }

    const fn pixel(&self) -> (i64, i64) {
        if self.x_major {
            (self.x, self.y >> SHIFT)
        } else {
            (self.x >> SHIFT, self.y)
        }
    }

    const fn advance(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }
}

/// Detect line segments in a binary edge map (non-zero = edge).
///
/// Returns segments in detection order. An empty edge map yields no
/// segments.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn detect_segments(edges: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut mask: Vec<bool> = edges.pixels().map(|p| p.0[0] != 0).collect();

    let mut points: Vec<(usize, usize)> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| mask[y * w + x])
        .collect();
    if points.is_empty() {
        return Vec::new();
    }
    points.shuffle(&mut StdRng::seed_from_u64(params.seed));

    let mut accumulator = Accumulator::new(width, height, params);
    let mut segments = Vec::new();
    let in_bounds = |(x, y): (i64, i64)| x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h;

    for &(x0, y0) in &points {
        // Already consumed by an earlier segment.
        if !mask[y0 * w + x0] {
            continue;
        }
        let (best_angle, best_votes) = accumulator.vote(x0, y0);
        if best_votes < params.votes {
            continue;
        }

        let (cos, sin) = accumulator.trig[best_angle];
        let forward = Walker::new(x0, y0, cos, sin);
        let walkers = [forward, forward.reversed()];

        // Find the furthest edge pixel in each direction.
        let mut ends = [(x0 as i64, y0 as i64); 2];
        for (k, start) in walkers.iter().enumerate() {
            let mut walker = *start;
            let mut gap = 0;
            loop {
                let p = walker.pixel();
                if !in_bounds(p) {
                    break;
                }
                if mask[p.1 as usize * w + p.0 as usize] {
                    gap = 0;
                    ends[k] = p;
                } else {
                    gap += 1;
                    if gap > params.max_gap {
                        break;
                    }
                }
                walker.advance();
            }
        }

        let min_length = i64::from(params.min_length);
        let good = (ends[1].0 - ends[0].0).abs() >= min_length
            || (ends[1].1 - ends[0].1).abs() >= min_length;

        // Consume the pixels of the walked line, withdrawing their votes
        // when the line is kept.
        for (k, start) in walkers.iter().enumerate() {
            let mut walker = *start;
            loop {
                let p = walker.pixel();
                if !in_bounds(p) {
                    break;
                }
                let idx = p.1 as usize * w + p.0 as usize;
                if mask[idx] {
                    if good {
                        accumulator.unvote(p.0 as usize, p.1 as usize);
                    }
                    mask[idx] = false;
                }
                if p == ends[k] {
                    break;
                }
                walker.advance();
            }
        }

        if good {
            segments.push(LineSegment {
                x1: ends[0].0 as i32,
                y1: ends[0].1 as i32,
                x2: ends[1].0 as i32,
                y2: ends[1].1 as i32,
            });
        }
    }

    segments
}
