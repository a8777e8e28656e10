//! Classic Canny edge detection on an unblurred grayscale image.
//!
//! Differs from `imageproc::edges::canny` in three ways that matter for
//! panel analysis:
//!
//! 1. **No implicit Gaussian pre-blur.** Sharpness is one of the signals
//!    being measured, so the detector sees the crop exactly as captured.
//! 2. **L1 gradient magnitude** (`|gx| + |gy|`) so the 50/150 thresholds
//!    are in the same units as the reference detector.
//! 3. **Bounds-checked 8-neighbour hysteresis.** The `imageproc 0.26`
//!    hysteresis underflows at the image border and only visits 6 of the
//!    8 neighbours (<https://github.com/image-rs/imageproc/issues/705>).
//!
//! Non-maximum suppression compares strictly against the "previous"
//! neighbour and non-strictly against the "next" one, so a plateau of
//! equal magnitudes thins to a single pixel instead of vanishing.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Value written for edge pixels.
pub const EDGE: u8 = 255;

/// Minimum allowed threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// potential edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges in `image`.
///
/// Returns a binary image: [`EDGE`] for edge pixels, 0 otherwise. The
/// one-pixel image border is never marked. Images narrower or shorter
/// than 3 pixels have no interior and produce an all-black map.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and `low`
/// is clamped to at most `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }

    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);

    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let magnitude = Image::<Luma<f32>>::from_fn(width, height, |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.abs() + v.abs()])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low, high)
}

/// Count edge pixels in a binary edge map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] == EDGE)).sum()
}

/// Quantized gradient direction, in degrees modulo 180.
#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Diagonal45,
    Vertical,
    Diagonal135,
}

impl Direction {
    fn from_gradient(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if !(22.5..157.5).contains(&angle) {
            Self::Horizontal
        } else if angle < 67.5 {
            Self::Diagonal45
        } else if angle < 112.5 {
            Self::Vertical
        } else {
            Self::Diagonal135
        }
    }

    /// Offsets of the "previous" and "next" neighbours across the edge.
    const fn neighbours(self) -> ((i64, i64), (i64, i64)) {
        match self {
            Self::Horizontal => ((-1, 0), (1, 0)),
            Self::Diagonal45 => ((-1, -1), (1, 1)),
            Self::Vertical => ((0, -1), (0, 1)),
            Self::Diagonal135 => ((1, -1), (-1, 1)),
        }
    }
}

/// Keep only pixels that are local maxima across the gradient direction.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_maximum_suppression(
    magnitude: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (width, height) = magnitude.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0]));
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let m = magnitude.get_pixel(x, y).0[0];
            if m <= 0.0 {
                continue;
            }
            let direction = Direction::from_gradient(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let ((px, py), (nx, ny)) = direction.neighbours();
            // Interior pixels only, so the offsets stay in bounds.
            let prev = magnitude
                .get_pixel((i64::from(x) + px) as u32, (i64::from(y) + py) as u32)
                .0[0];
            let next = magnitude
                .get_pixel((i64::from(x) + nx) as u32, (i64::from(y) + ny) as u32)
                .0[0];
            if m > prev && m >= next {
                out.put_pixel(x, y, Luma([m]));
            }
        }
    }
    out
}

/// Link weak edges to strong ones with an explicit-stack flood fill.
///
/// Magnitudes strictly above `high` seed an edge; magnitudes strictly
/// above `low` extend one.
fn hysteresis(input: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (width, height) = input.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut stack = Vec::new();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if input.get_pixel(x, y).0[0] <= high || out.get_pixel(x, y).0[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBOURS {
                    let Some(nx) = cx.checked_add_signed(dx) else {
                        continue;
                    };
                    let Some(ny) = cy.checked_add_signed(dy) else {
                        continue;
                    };
                    if nx >= width || ny >= height {
                        continue;
                    }
                    if input.get_pixel(nx, ny).0[0] > low && out.get_pixel(nx, ny).0[0] != EDGE {
                        out.put_pixel(nx, ny, Luma([EDGE]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
