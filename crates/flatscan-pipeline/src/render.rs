//! Result overlay: translucent green/red boxes over the original photo.
//!
//! Boxes are rasterized with `tiny-skia` into a transparent layer the size
//! of the photo. Later boxes replace earlier ones where they overlap, so
//! no pixel is tinted twice. The layer is then alpha-composited onto the
//! photo: `out = photo * (1 - a) + color * a`, leaving uncovered pixels
//! unchanged.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tiny_skia::{BlendMode, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::types::BoundingBox;

/// Fill color for flat panels.
pub const FLAT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Fill color for panels that are not flat.
pub const NOT_FLAT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Settings for the result overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Fill opacity of each box (`128` is about 50%).
    pub alpha: u8,
    /// Width of the opaque black outline, in pixels. `0` disables it.
    pub outline_width: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: 128,
            outline_width: 1.0,
        }
    }
}

/// Draw one box per `(bbox, flat)` pair over `photo`.
///
/// A box covers the pixel columns `x..=x + width` and rows
/// `y..=y + height`, clipped to the photo. The result is fully opaque.
#[must_use]
pub fn render_overlay(
    photo: &RgbImage,
    panels: &[(BoundingBox, bool)],
    config: &OverlayConfig,
) -> RgbaImage {
    let (width, height) = photo.dimensions();
    let Some(layer) = draw_layer(width, height, panels, config) else {
        return opaque(photo);
    };

    RgbaImage::from_fn(width, height, |x, y| {
        let Rgb(bg) = *photo.get_pixel(x, y);
        let Rgba([r, g, b, a]) = *layer.get_pixel(x, y);
        if a == 0 {
            return Rgba([bg[0], bg[1], bg[2], 255]);
        }
        let alpha = f64::from(a) / 255.0;
        let blend = |under: u8, over: u8| -> u8 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let v = f64::from(under)
                .mul_add(1.0 - alpha, f64::from(over) * alpha)
                .round()
                .clamp(0.0, 255.0) as u8;
            v
        };
        Rgba([blend(bg[0], r), blend(bg[1], g), blend(bg[2], b), 255])
    })
}

/// Flatten an overlay to RGB for encoders without alpha support.
#[must_use]
pub fn flatten(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
        Rgb([r, g, b])
    })
}

fn opaque(photo: &RgbImage) -> RgbaImage {
    RgbaImage::from_fn(photo.width(), photo.height(), |x, y| {
        let Rgb([r, g, b]) = *photo.get_pixel(x, y);
        Rgba([r, g, b, 255])
    })
}

/// Rasterize the boxes into a straight-alpha layer, or `None` for an
/// empty photo.
#[allow(clippy::cast_precision_loss)]
fn draw_layer(
    width: u32,
    height: u32,
    panels: &[(BoundingBox, bool)],
    config: &OverlayConfig,
) -> Option<RgbaImage> {
    let mut pixmap = Pixmap::new(width, height)?;

    for &(bbox, flat) in panels {
        let Rgb([r, g, b]) = if flat { FLAT_COLOR } else { NOT_FLAT_COLOR };
        let mut fill = Paint::default();
        fill.set_color_rgba8(r, g, b, config.alpha);
        fill.anti_alias = false;
        fill.blend_mode = BlendMode::Source;

        let (x, y) = (bbox.x as f32, bbox.y as f32);
        let (w, h) = (bbox.width as f32, bbox.height as f32);
        if let Some(rect) = Rect::from_xywh(x, y, w + 1.0, h + 1.0) {
            pixmap.fill_rect(rect, &fill, Transform::identity(), None);
        }

        if config.outline_width > 0.0 {
            let mut outline = Paint::default();
            outline.set_color_rgba8(0, 0, 0, 255);
            outline.anti_alias = false;
            outline.blend_mode = BlendMode::Source;
            let stroke = Stroke {
                width: config.outline_width,
                ..Stroke::default()
            };
            // Pixel centers, so a 1px stroke lands on the edge rows/columns.
            if let Some(rect) = Rect::from_xywh(x + 0.5, y + 0.5, w, h) {
                let path = PathBuilder::from_rect(rect);
                pixmap.stroke_path(&path, &outline, &stroke, Transform::identity(), None);
            }
        }
    }

    // Pixmap data is premultiplied RGBA.
    let data = pixmap.data();
    let mut layer = RgbaImage::new(width, height);
    for (i, pixel) in layer.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            continue;
        }
        let unpremultiply = |c: u8| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (u16::from(c) * 255 / u16::from(a)).min(255) as u8;
            v
        };
        *pixel = Rgba([
            unpremultiply(data[off]),
            unpremultiply(data[off + 1]),
            unpremultiply(data[off + 2]),
            a,
        ]);
    }
    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn flat_panel_is_tinted_green() {
        let out = render_overlay(
            &white(50, 50),
            &[(BoundingBox::new(10, 10, 20, 20), true)],
            &OverlayConfig::default(),
        );
        let Rgba([r, g, b, a]) = *out.get_pixel(20, 20);
        assert_eq!(a, 255);
        assert_eq!(g, 255);
        assert!((126..=128).contains(&r), "r = {r}");
        assert_eq!(r, b);
    }

    #[test]
    fn not_flat_panel_is_tinted_red() {
        let out = render_overlay(
            &white(50, 50),
            &[(BoundingBox::new(10, 10, 20, 20), false)],
            &OverlayConfig::default(),
        );
        let Rgba([r, g, b, _]) = *out.get_pixel(20, 20);
        assert_eq!(r, 255);
        assert!((126..=128).contains(&g), "g = {g}");
        assert_eq!(g, b);
    }

    #[test]
    fn uncovered_pixels_are_unchanged() {
        let photo = RgbImage::from_fn(40, 40, |x, y| Rgb([x as u8, y as u8, 99]));
        let out = render_overlay(
            &photo,
            &[(BoundingBox::new(5, 5, 10, 10), true)],
            &OverlayConfig::default(),
        );
        assert_eq!(*out.get_pixel(30, 30), Rgba([30, 30, 99, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 99, 255]));
    }

    #[test]
    fn outline_is_opaque_black() {
        let out = render_overlay(
            &white(50, 50),
            &[(BoundingBox::new(10, 10, 20, 20), true)],
            &OverlayConfig::default(),
        );
        assert_eq!(*out.get_pixel(10, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(30, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(20, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn no_outline_when_width_is_zero() {
        let config = OverlayConfig {
            outline_width: 0.0,
            ..OverlayConfig::default()
        };
        let out = render_overlay(
            &white(50, 50),
            &[(BoundingBox::new(10, 10, 20, 20), true)],
            &config,
        );
        assert_eq!(out.get_pixel(10, 20).0[1], 255);
    }

    #[test]
    fn overlapping_boxes_do_not_double_tint() {
        let out = render_overlay(
            &white(60, 60),
            &[
                (BoundingBox::new(5, 5, 30, 30), true),
                (BoundingBox::new(20, 20, 30, 30), true),
            ],
            &OverlayConfig {
                outline_width: 0.0,
                ..OverlayConfig::default()
            },
        );
        assert_eq!(out.get_pixel(25, 25), out.get_pixel(10, 10));
    }

    #[test]
    fn no_panels_returns_photo() {
        let photo = white(8, 8);
        let out = render_overlay(&photo, &[], &OverlayConfig::default());
        assert_eq!(flatten(&out), photo);
    }

    #[test]
    fn empty_photo_renders_empty() {
        let out = render_overlay(&RgbImage::new(0, 0), &[], &OverlayConfig::default());
        assert_eq!(out.dimensions(), (0, 0));
    }
}
