use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use unicode_bidi::BidiInfo;

use crate::error::RenderError;

pub trait Face {
    fn measure(&self, text: &str, size: f32) -> (u32, u32);

    // (x, y) is the top-left corner of the line box.
    fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: u32, y: u32, color: Rgba<u8>);
}

pub struct FontFace {
    font: FontVec,
}

impl FontFace {
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| RenderError::InvalidFont(path.to_path_buf()))?;
        Ok(Self { font })
    }

    // Glyphs positioned along a baseline at the ascent, plus the caret's final x.
    fn layout(&self, text: &str, size: f32) -> (Vec<Glyph>, f32) {
        let scale = PxScale::from(size);
        let scaled = self.font.as_scaled(scale);
        let mut caret = point(0.0, scaled.ascent());
        let mut previous = None;
        let mut glyphs = Vec::with_capacity(text.len());

        for c in visual_order(text).chars().filter(|c| !c.is_control()) {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret.x += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, caret));
            caret.x += scaled.h_advance(id);
            previous = Some(id);
        }

        (glyphs, caret.x)
    }
}

impl Face for FontFace {
    fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let (_, width) = self.layout(text, size);
        let height = scaled.ascent() - scaled.descent();
        (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: u32, y: u32, color: Rgba<u8>) {
        let (glyphs, _) = self.layout(text, size);

        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = x as i64 + bounds.min.x as i64 + gx as i64;
                let py = y as i64 + bounds.min.y as i64 + gy as i64;
                if px < 0 || py < 0 || px >= canvas.width() as i64 || py >= canvas.height() as i64 {
                    return;
                }
                blend(canvas.get_pixel_mut(px as u32, py as u32), color, coverage);
            });
        }
    }
}

// Glyphs are drawn left to right, so right-to-left runs are reversed first.
// Arabic letters keep their isolated forms; there is no contextual shaping.
pub fn visual_order(text: &str) -> Cow<'_, str> {
    let info = BidiInfo::new(text, None);
    if !info.has_rtl() {
        return Cow::Borrowed(text);
    }
    let mut line = String::with_capacity(text.len());
    for paragraph in &info.paragraphs {
        line.push_str(&info.reorder_line(paragraph, paragraph.range.clone()));
    }
    Cow::Owned(line)
}

// Source-over compositing.
pub fn blend(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let sa = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    for c in 0..3 {
        let src = color[c] as f32;
        let existing = dst[c] as f32;
        dst[c] = ((src * sa + existing * da * (1.0 - sa)) / out_a).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
