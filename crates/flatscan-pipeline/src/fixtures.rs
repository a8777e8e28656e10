//! Synthetic photos shared by unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plain white photo.
pub fn white(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// 500x500 white photo crossed by dark bands in two directions.
///
/// Two 4px vertical bands span the full height on the left; two 6px
/// diagonal bands (running down-right) sit on the right, clear of the
/// vertical ones. Every band lies well inside the central 400x400 crop.
pub fn diverging_bands() -> RgbImage {
    RgbImage::from_fn(500, 500, |x, y| {
        let vertical = (100..104).contains(&x) || (150..154).contains(&x);
        let diagonal = (230..440).contains(&x) && {
            let d = i64::from(x) - i64::from(y);
            (170..176).contains(&d) || (60..66).contains(&d)
        };
        if vertical || diagonal {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

/// Mid-gray photo crossed by `segments` dark line segments at random
/// positions and angles, plus additive Gaussian noise of standard
/// deviation `sigma` on every pixel. Deterministic for a given `seed`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn noisy_segments(width: u32, height: u32, segments: usize, sigma: f64, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut photo = RgbImage::from_pixel(width, height, Rgb([128, 128, 128]));

    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (width as f32, height as f32);
    for _ in 0..segments {
        let (cx, cy) = (rng.random_range(0.0..w), rng.random_range(0.0..h));
        let angle = rng.random_range(0.0..std::f32::consts::PI);
        let half = rng.random_range(50.0..200.0_f32);
        let (dx, dy) = (angle.cos() * half, angle.sin() * half);
        // Two pixels thick.
        for (ox, oy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            draw_line_segment_mut(
                &mut photo,
                (cx - dx + ox, cy - dy + oy),
                (cx + dx + ox, cy + dy + oy),
                Rgb([0, 0, 0]),
            );
        }
    }

    // Box-Muller, same offset on all channels so the grayscale noise is
    // exactly `sigma`.
    for pixel in photo.pixels_mut() {
        let u1 = 1.0 - rng.random::<f64>();
        let u2 = rng.random::<f64>();
        let noise = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos() * sigma;
        let v = (f64::from(pixel.0[0]) + noise).round().clamp(0.0, 255.0) as u8;
        *pixel = Rgb([v, v, v]);
    }
    photo
}

/// Mask that is white inside each `(x, y, width, height)` rectangle.
pub fn mask_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = rects
            .iter()
            .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh);
        Luma([if inside { 255 } else { 0 }])
    })
}
