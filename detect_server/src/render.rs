//! Drawing of detections onto the captured photo.
//!
use std::{io::Cursor, path::Path};

use anyhow::{anyhow, Context, Result};
use common::{Detection, LabelMap};
use image::{codecs::jpeg::JpegEncoder, ColorType, ImageError, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use rusttype::{Font, Scale};

/// Box colours, picked per category id.
const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [203, 56, 255],
];

const TEXT_SCALE: f32 = 16.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Draws bounding boxes, with captions when a font is available.
#[derive(Default)]
pub struct Annotator {
    font: Option<Font<'static>>,
}

impl Annotator {
    pub fn new(font: Option<Font<'static>>) -> Self {
        Self { font }
    }

    /// Load a TrueType font for the box captions.
    pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = Font::try_from_vec(data)
            .ok_or_else(|| anyhow!("{} is not a valid TrueType font", path.display()))?;

        Ok(Self::new(Some(font)))
    }

    pub fn draw(&self, frame: &mut RgbImage, detections: &[Detection], labels: &LabelMap) {
        for detection in detections {
            let color = color_for(detection.category_id);
            let [x_tl, y_tl, x_br, y_br] = detection.bbox;

            let rect = Rect::at(x_tl as i32, y_tl as i32).of_size(
                ((x_br - x_tl) as u32).max(1),
                ((y_br - y_tl) as u32).max(1),
            );
            draw_hollow_rect_mut(frame, rect, color);
            // Second outline one pixel inside
            if rect.width() > 2 && rect.height() > 2 {
                let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                    .of_size(rect.width() - 2, rect.height() - 2);
                draw_hollow_rect_mut(frame, inner, color);
            }

            if let Some(font) = &self.font {
                let caption = match labels.get(detection.category_id) {
                    Ok(label) => format!("{} {:.2}", label, detection.score),
                    Err(_) => format!("#{} {:.2}", detection.category_id, detection.score),
                };
                let caption_top = (y_tl as i32 - TEXT_SCALE as i32).max(0);
                let caption_width = (caption.len() as f32 * TEXT_SCALE * 0.6) as u32;

                let caption_rect = Rect::at(x_tl as i32, caption_top)
                    .of_size(caption_width.max(1), TEXT_SCALE as u32);
                draw_filled_rect_mut(frame, caption_rect, color);
                draw_text_mut(
                    frame,
                    TEXT_COLOR,
                    x_tl as i32,
                    caption_top,
                    Scale::uniform(TEXT_SCALE),
                    font,
                    &caption,
                );
            }
        }
    }
}

fn color_for(category_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[category_id as usize % PALETTE.len()])
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        frame,
        frame.width(),
        frame.height(),
        ColorType::Rgb8,
    )?;

    Ok(buf.into_inner())
}
