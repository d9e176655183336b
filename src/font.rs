//! Caption text rendering.
//!
//! Layout math only depends on the requested size: line height is
//! `size * LINE_SPACING` for every font, and centring uses the width the
//! active font reports for the string. A TrueType font is used when one can
//! be loaded; otherwise glyphs come from the built-in 8x8 bitmap font scaled
//! to the nearest whole multiple of the size.

use crate::{logi, logw};
use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

pub const LINE_SPACING: f32 = 1.25;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub enum CaptionFont {
    Outline(FontVec),
    Bitmap,
}

impl CaptionFont {
    /// Tries `preferred`, then a few common system fonts, then gives up and
    /// returns the bitmap font.
    pub fn load(preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    logi(format!("Caption font: {}", path.display()));
                    return Self::Outline(font);
                }
                Err(err) => logw(format!("Unusable font {}: {}", path.display(), err)),
            }
        }

        logi("No TrueType font found; captions use the bitmap font.");
        Self::Bitmap
    }

    pub fn bitmap() -> Self {
        Self::Bitmap
    }

    pub fn line_height(size: f32) -> i32 {
        (size * LINE_SPACING).round() as i32
    }

    pub fn text_width(&self, text: &str, size: f32) -> u32 {
        match self {
            Self::Outline(font) => imageproc::drawing::text_size(PxScale::from(size), font, text).0,
            Self::Bitmap => text.chars().count() as u32 * 8 * bitmap_scale(size),
        }
    }

    pub fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        match self {
            Self::Outline(font) => {
                imageproc::drawing::draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text)
            }
            Self::Bitmap => draw_bitmap_text(canvas, x, y, size, color, text),
        }
    }

    pub fn draw_centered(&self, canvas: &mut RgbImage, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let width = self.text_width(text, size) as i32;
        let x = ((canvas.width() as i32 - width) / 2).max(0);
        self.draw(canvas, x, y, size, color, text);
    }
}

fn bitmap_scale(size: f32) -> u32 {
    ((size / 8.0).round() as u32).max(1)
}

fn bitmap_glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_bitmap_text(canvas: &mut RgbImage, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
    let scale = bitmap_scale(size) as i32;
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    for (index, ch) in text.chars().enumerate() {
        let origin_x = x + index as i32 * 8 * scale;
        for (row, bits) in bitmap_glyph(ch).iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (cx, cy) = (px + dx, py + dy);
                        if cx >= 0 && cy >= 0 && cx < width && cy < height {
                            canvas.put_pixel(cx as u32, cy as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Greedy word wrap. A word joins the current line only if the line stays
/// within `max_chars`; words longer than `max_chars` are split into chunks.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        let mut chunks: Vec<&[char]> = chars.chunks(max_chars).collect();
        let Some(last) = chunks.pop() else {
            continue;
        };

        for full in chunks {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            lines.push(full.iter().collect());
        }

        if line_len > 0 && line_len + 1 + last.len() > max_chars {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(last.iter());
        line_len += last.len();
    }

    if line_len > 0 {
        lines.push(line);
    }
    lines
}
