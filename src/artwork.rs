//! Still images: the artifact type and the procedural offline illustrator.

use crate::font::{CaptionFont, wrap_words};
use crate::provider::{OfflineGenerator, Source};
use crate::request::{GenerationRequest, ImageStyle};
use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_rect_mut,
    draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

pub const CANVAS_SIZE: u32 = 1024;
/// Description lines never hold more characters than this.
pub const WRAP_CHARS: usize = 30;

pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
pub const SUN_COLOR: Rgb<u8> = Rgb([255, 215, 0]);
pub const SUN_CENTER: (i32, i32) = (CANVAS_SIZE as i32 - 140, 140);
const SUN_RADIUS: i32 = 70;

const HEADLINE: &str = "Generated Image";
const HEADLINE_SIZE: f32 = 48.0;
const BODY_SIZE: f32 = 32.0;
const LABEL_SIZE: f32 = 20.0;
const CELL: u32 = 64;

#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub pixels: RgbImage,
    pub source: Source,
    pub style: ImageStyle,
}

impl ImageArtifact {
    /// Decodes a provider bitmap, resizing it to the fixed canvas if needed.
    pub fn from_encoded(bytes: &[u8], style: ImageStyle) -> Result<Self, image::ImageError> {
        let mut pixels = image::load_from_memory(bytes)?.to_rgb8();
        if pixels.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
            pixels = image::imageops::resize(&pixels, CANVAS_SIZE, CANVAS_SIZE, FilterType::Lanczos3);
        }
        Ok(Self {
            pixels,
            source: Source::Provider,
            style,
        })
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buf, ImageFormat::Png)
            .context("PNG encode failed")?;
        Ok(buf.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.pixels
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write image {}", path.display()))
    }
}

pub fn background_color(style: &ImageStyle) -> Rgb<u8> {
    match style {
        ImageStyle::Realistic => Rgb([20, 20, 30]),
        ImageStyle::Cartoon => Rgb([80, 150, 200]),
        ImageStyle::PixelArt => Rgb([40, 40, 40]),
        ImageStyle::Oil => Rgb([120, 90, 60]),
        ImageStyle::Watercolor => Rgb([230, 220, 210]),
        ImageStyle::Minimalist => Rgb([250, 250, 250]),
        ImageStyle::Futuristic => Rgb([20, 30, 80]),
        ImageStyle::Other(_) => DEFAULT_BACKGROUND,
    }
}

/// Dark ink on light backgrounds, light ink otherwise.
pub fn ink_for(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 150.0 {
        Rgb([35, 35, 35])
    } else {
        Rgb([235, 235, 235])
    }
}

fn scene_seed(description: &str) -> u64 {
    description
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
        })
}

fn rect(x: i32, y: i32, w: u32, h: u32) -> Rect {
    Rect::at(x, y).of_size(w.max(1), h.max(1))
}

pub struct OfflineIllustrator {
    font: Arc<CaptionFont>,
}

impl OfflineIllustrator {
    pub fn new(font: Arc<CaptionFont>) -> Self {
        Self { font }
    }

    pub fn illustrate(&self, description: &str, style: &ImageStyle) -> ImageArtifact {
        let background = background_color(style);
        let ink = ink_for(background);
        let mut canvas = RgbImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, background);

        draw_scenery(&mut canvas, description);
        draw_decoration(&mut canvas, style);

        let h = CANVAS_SIZE as i32;
        self.font
            .draw_centered(&mut canvas, h / 6, HEADLINE_SIZE, ink, HEADLINE);

        let line_height = CaptionFont::line_height(BODY_SIZE);
        let mut y = h / 3;
        for line in wrap_words(description, WRAP_CHARS) {
            self.font.draw_centered(&mut canvas, y, BODY_SIZE, ink, &line);
            y += line_height;
        }

        let label = format!("Style: {}", style.label());
        self.font.draw(&mut canvas, 20, h - 50, LABEL_SIZE, ink, &label);

        ImageArtifact {
            pixels: canvas,
            source: Source::Offline,
            style: style.clone(),
        }
    }
}

impl OfflineGenerator for OfflineIllustrator {
    type Output = ImageArtifact;

    fn generate_offline(&self, request: &GenerationRequest) -> ImageArtifact {
        self.illustrate(&request.image_description, &request.image_style)
    }
}

fn draw_scenery(canvas: &mut RgbImage, description: &str) {
    let lower = description.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |options: &[&str]| words.iter().any(|w| options.contains(w));

    let mut rng = StdRng::seed_from_u64(scene_seed(&lower));
    if has(&["forest", "jungle", "rainforest", "woods"]) {
        draw_forest(canvas, &mut rng);
    } else if has(&["car", "cars"]) && has(&["street", "road"]) {
        draw_street(canvas, &mut rng, has(&["night", "dark"]));
    }
}

fn draw_forest(canvas: &mut RgbImage, rng: &mut StdRng) {
    let (w, h) = (CANVAS_SIZE as i32, CANVAS_SIZE as i32);

    for y in 0..h / 2 {
        let shade = (y / 5) as u8;
        let sky = Rgb([50, 100 + shade, 150 + shade]);
        draw_line_segment_mut(canvas, (0.0, y as f32), ((w - 1) as f32, y as f32), sky);
    }

    for i in 0..3 {
        let base_x = w * i / 3;
        let peak_x = base_x + w / 6;
        let base_y = h / 2;
        let peak_y = base_y - rng.gen_range(100..200);
        let points = [
            Point::new(base_x, base_y),
            Point::new(peak_x, peak_y),
            Point::new(base_x + w / 3, base_y),
        ];
        let tone = Rgb([60 + i as u8 * 20, 80 + i as u8 * 10, 60 + i as u8 * 10]);
        draw_polygon_mut(canvas, &points, tone);
    }

    draw_filled_rect_mut(canvas, rect(0, h / 2, w as u32, (h / 2) as u32), Rgb([80, 60, 20]));

    for _ in 0..20 {
        let x = rng.gen_range(0..w);
        let y = rng.gen_range(h / 2..h - 100);
        draw_filled_rect_mut(canvas, rect(x - 10, y, 20, 100), Rgb([80, 50, 20]));
        draw_filled_ellipse_mut(canvas, (x, y - 30), 50, 50, Rgb([20, 120, 30]));
    }
}

fn draw_street(canvas: &mut RgbImage, rng: &mut StdRng, night: bool) {
    let (w, h) = (CANVAS_SIZE as i32, CANVAS_SIZE as i32);

    draw_filled_rect_mut(canvas, rect(0, h / 2, w as u32, (h / 2) as u32), Rgb([40, 40, 40]));
    for x in (0..w).step_by(100) {
        draw_filled_rect_mut(canvas, rect(x, h / 2 + 100, 50, 10), Rgb([200, 200, 200]));
    }

    let (car_x, car_y) = (w / 3, h / 2 + 50);
    draw_filled_rect_mut(canvas, rect(car_x, car_y, 200, 80), Rgb([150, 0, 0]));
    draw_filled_rect_mut(canvas, rect(car_x + 40, car_y - 40, 120, 40), Rgb([100, 0, 0]));
    draw_filled_circle_mut(canvas, (car_x + 50, car_y + 90), 20, Rgb([10, 10, 10]));
    draw_filled_circle_mut(canvas, (car_x + 150, car_y + 90), 20, Rgb([10, 10, 10]));
    draw_filled_circle_mut(canvas, (car_x + 190, car_y + 30), 10, Rgb([255, 255, 200]));

    if night {
        for _ in 0..100 {
            let x = rng.gen_range(0..w);
            let y = rng.gen_range(0..h / 2);
            let size = rng.gen_range(1..=3);
            draw_filled_rect_mut(canvas, rect(x, y, size, size), Rgb([255, 255, 255]));
        }
        draw_filled_circle_mut(canvas, (w - 150, 200), 50, Rgb([230, 230, 230]));
    }
}

fn draw_decoration(canvas: &mut RgbImage, style: &ImageStyle) {
    let size = CANVAS_SIZE;
    match style {
        ImageStyle::Cartoon => {
            draw_filled_circle_mut(canvas, SUN_CENTER, SUN_RADIUS, SUN_COLOR);
        }
        ImageStyle::PixelArt => {
            for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                if (x / CELL + y / CELL) % 2 == 0 {
                    pixel.0 = pixel.0.map(|c| c.saturating_add(24));
                }
            }
        }
        ImageStyle::Futuristic => {
            let line = Rgb([0, 140, 220]);
            let far = (size - 1) as f32;
            for step in (0..size).step_by(CELL as usize) {
                let at = step as f32;
                draw_line_segment_mut(canvas, (at, 0.0), (at, far), line);
                draw_line_segment_mut(canvas, (0.0, at), (far, at), line);
            }
        }
        _ => {
            for i in 0..5u32 {
                let tone = (100 + i * 20) as u8;
                draw_hollow_rect_mut(
                    canvas,
                    rect(i as i32, i as i32, size - 2 * i, size - 2 * i),
                    Rgb([tone, tone, tone]),
                );
            }
        }
    }
}
