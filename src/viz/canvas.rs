//! Minimal line-chart canvas.

use image::{Rgb, RgbImage};

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([220, 220, 220]);
    pub const RED: Rgb<u8> = Rgb([220, 20, 20]);
    pub const BLUE: Rgb<u8> = Rgb([20, 60, 220]);
    pub const PALE_BLUE: Rgb<u8> = Rgb([198, 219, 239]);
    pub const NAVY: Rgb<u8> = Rgb([8, 48, 107]);
}

/// Chart geometry and colors.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: Rgb<u8>,
    pub axis_color: Rgb<u8>,
    /// Pixels drawn / skipped along a dashed line
    pub dash: (u32, u32),
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            margin: 40,
            background: colors::WHITE,
            axis_color: colors::BLACK,
            dash: (6, 4),
        }
    }
}

/// Linear blend of two colors, `t` clamped to `[0, 1]`.
pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgb([
        ((1.0 - t) * c1.0[0] as f64 + t * c2.0[0] as f64) as u8,
        ((1.0 - t) * c1.0[1] as f64 + t * c2.0[1] as f64) as u8,
        ((1.0 - t) * c1.0[2] as f64 + t * c2.0[2] as f64) as u8,
    ])
}

/// `count` shades from light to dark blue.
pub fn blue_shades(count: usize) -> Vec<Rgb<u8>> {
    (0..count)
        .map(|i| {
            let t = if count > 1 {
                0.4 + 0.6 * i as f64 / (count - 1) as f64
            } else {
                1.0
            };
            interpolate_color(colors::PALE_BLUE, colors::NAVY, t)
        })
        .collect()
}

/// Image plus the data-to-pixel mapping of one chart.
pub struct Canvas {
    image: RgbImage,
    config: PlotConfig,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Canvas {
    /// Blank chart covering `x` in `[0, x_max]` and `y` in `[y_min, y_max]`.
    pub fn new(config: PlotConfig, x_max: f64, y_min: f64, y_max: f64) -> Self {
        let mut image = RgbImage::from_pixel(config.width, config.height, config.background);

        let (y_min, y_max) = if (y_max - y_min).abs() < f64::EPSILON {
            (y_min - 1.0, y_max + 1.0)
        } else {
            let pad = (y_max - y_min) * 0.05;
            (y_min - pad, y_max + pad)
        };

        let (left, right) = (config.margin, config.width.saturating_sub(config.margin));
        let (top, bottom) = (config.margin, config.height.saturating_sub(config.margin));
        for x in left..=right.min(config.width.saturating_sub(1)) {
            if bottom < config.height {
                image.put_pixel(x, bottom, config.axis_color);
            }
        }
        for y in top..=bottom.min(config.height.saturating_sub(1)) {
            if left < config.width {
                image.put_pixel(left, y, config.axis_color);
            }
        }

        Self {
            image,
            config,
            x_max: x_max.max(1.0),
            y_min,
            y_max,
        }
    }

    fn to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let m = self.config.margin as f64;
        let w = self.config.width as f64 - 2.0 * m;
        let h = self.config.height as f64 - 2.0 * m;
        let px = m + x / self.x_max * w;
        let py = m + (1.0 - (y - self.y_min) / (self.y_max - self.y_min)) * h;
        (px.round() as i64, py.round() as i64)
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Polyline through `points`; dashed when `dashed` is set.
    pub fn polyline(&mut self, points: &[(f64, f64)], color: Rgb<u8>, dashed: bool) {
        let (on, off) = self.config.dash;
        let period = (on + off).max(1) as u64;
        let mut step = 0u64;

        for pair in points.windows(2) {
            let (mut x0, mut y0) = self.to_pixel(pair[0].0, pair[0].1);
            let (x1, y1) = self.to_pixel(pair[1].0, pair[1].1);

            // Bresenham
            let dx = (x1 - x0).abs();
            let dy = -(y1 - y0).abs();
            let sx = if x0 < x1 { 1 } else { -1 };
            let sy = if y0 < y1 { 1 } else { -1 };
            let mut err = dx + dy;
            loop {
                if !dashed || step % period < on as u64 {
                    self.plot(x0, y0, color);
                }
                step += 1;
                if x0 == x1 && y0 == y1 {
                    break;
                }
                let e2 = 2 * err;
                if e2 >= dy {
                    err += dy;
                    x0 += sx;
                }
                if e2 <= dx {
                    err += dx;
                    y0 += sy;
                }
            }
        }
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_color() {
        let mid = interpolate_color(Rgb([0, 0, 0]), Rgb([255, 255, 255]), 0.5);
        assert_eq!(mid, Rgb([127, 127, 127]));
    }

    #[test]
    fn test_blue_shades_darken() {
        let shades = blue_shades(9);
        assert_eq!(shades.len(), 9);
        assert_eq!(shades[8], colors::NAVY);
        assert!(shades[0].0[0] > shades[8].0[0]);
    }

    #[test]
    fn test_polyline_draws_inside_frame() {
        let config = PlotConfig {
            width: 100,
            height: 50,
            margin: 5,
            ..Default::default()
        };
        let mut canvas = Canvas::new(config, 10.0, 0.0, 1.0);
        canvas.polyline(&[(0.0, 0.0), (10.0, 1.0)], colors::RED, false);
        let image = canvas.into_image();

        let red = image.pixels().filter(|p| **p == colors::RED).count();
        assert!(red >= 90);
    }

    #[test]
    fn test_dashed_line_has_gaps() {
        let config = PlotConfig {
            width: 200,
            height: 20,
            margin: 0,
            ..Default::default()
        };
        let mut solid = Canvas::new(config.clone(), 1.0, 0.0, 1.0);
        let mut dashed = Canvas::new(config, 1.0, 0.0, 1.0);
        let line = [(0.0, 0.5), (1.0, 0.5)];
        solid.polyline(&line, colors::BLUE, false);
        dashed.polyline(&line, colors::BLUE, true);

        let count = |img: RgbImage| img.pixels().filter(|p| **p == colors::BLUE).count();
        let (s, d) = (count(solid.into_image()), count(dashed.into_image()));
        assert!(d < s && d > s / 2);
    }
}
