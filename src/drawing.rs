// drawing.rs - freehand drawing canvas and the saved-drawings shelf
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

use crate::data_url::{self, DataUrlError};
use crate::image_record::{NewImage, SourceKind};
use crate::storage::{self, SharedStore, DRAWINGS_KEY};

pub const CANVAS_WIDTH: u32 = 350;
pub const CANVAS_HEIGHT: u32 = 250;
pub const STROKE_WIDTH: f32 = 5.0;
pub const STROKE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Distance between brush stamps along a segment, in pixels.
const STAMP_SPACING: f32 = 0.5;

#[derive(Debug, Error)]
pub enum DrawingError {
    #[error(transparent)]
    DataUrl(#[from] DataUrlError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ── Canvas ───────────────────────────────────────────────────────────────

/// Transparent RGBA raster with a round white brush.
pub struct DrawingCanvas {
    pixels:      RgbaImage,
    pen:         Option<Point>,
    has_drawing: bool,
}

impl Default for DrawingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingCanvas {
    pub fn new() -> Self {
        Self {
            pixels:      RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            pen:         None,
            has_drawing: false,
        }
    }

    pub fn has_drawing(&self) -> bool {
        self.has_drawing
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.pen = Some(at);
    }

    /// Extends the current path; ignored unless the pointer is down or
    /// when `to` is not a finite point.
    pub fn pointer_move(&mut self, to: Point) {
        let Some(from) = self.pen else { return };
        if !(to.x.is_finite() && to.y.is_finite()) {
            return;
        }
        self.segment(from, to);
        self.pen = Some(to);
        self.has_drawing = true;
    }

    /// Pointer up and pointer leaving the canvas both end the path.
    pub fn pointer_up(&mut self) {
        self.pen = None;
    }

    /// Convenience: one down / move… / up sequence.
    pub fn stroke(&mut self, points: &[Point]) {
        let Some((first, rest)) = points.split_first() else { return };
        self.pointer_down(*first);
        for p in rest {
            self.pointer_move(*p);
        }
        self.pointer_up();
    }

    pub fn clear(&mut self) {
        self.pixels = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        self.pen = None;
        self.has_drawing = false;
    }

    /// Rasterize as a PNG data URL.
    pub fn to_data_url(&self) -> Result<String, DrawingError> {
        let mut png: Vec<u8> = Vec::new();
        DynamicImage::ImageRgba8(self.pixels.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(data_url::encode_bytes("image/png", &png))
    }

    /// Rasterize into a drawn image record and clear the canvas.
    /// `None` when nothing has been drawn.
    pub fn commit(&mut self) -> Result<Option<NewImage>, DrawingError> {
        if !self.has_drawing {
            return Ok(None);
        }
        let url = self.to_data_url()?;
        let image = NewImage::from_data_url(SourceKind::Drawn, &url)?;
        self.clear();
        Ok(Some(image))
    }

    /// Rasterize without clearing and append to the saved shelf.
    /// Returns the new entry's index.
    pub fn save(&self, shelf: &mut SavedDrawings) -> Result<Option<usize>, DrawingError> {
        if !self.has_drawing {
            return Ok(None);
        }
        Ok(Some(shelf.push(self.to_data_url()?)))
    }

    /// Replace the canvas with a saved drawing, scaled to canvas size.
    pub fn load(&mut self, url: &str) -> Result<(), DrawingError> {
        let bytes = data_url::decode_payload(data_url::strip(url)?)?;
        let img = image::load_from_memory(&bytes)?.to_rgba8();
        let scaled = if img.dimensions() == (CANVAS_WIDTH, CANVAS_HEIGHT) {
            img
        } else {
            imageops::resize(&img, CANVAS_WIDTH, CANVAS_HEIGHT, imageops::FilterType::Triangle)
        };
        self.clear();
        self.pixels = scaled;
        self.has_drawing = true;
        Ok(())
    }

    fn segment(&mut self, from: Point, to: Point) {
        let Some((from, to)) = clip_to_canvas(from, to) else { return };
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let steps = ((dx * dx + dy * dy).sqrt() / STAMP_SPACING).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(from.x + dx * t, from.y + dy * t);
        }
    }

    /// Filled disc of the stroke width; gives round caps and joins.
    fn stamp(&mut self, cx: f32, cy: f32) {
        let r = STROKE_WIDTH / 2.0;
        if cx + r < 0.0 || cy + r < 0.0 {
            return;
        }
        let x0 = (cx - r).floor().max(0.0) as u32;
        let y0 = (cy - r).floor().max(0.0) as u32;
        let x1 = ((cx + r).ceil() as i64).min(CANVAS_WIDTH as i64 - 1) as u32;
        let y1 = ((cy + r).ceil() as i64).min(CANVAS_HEIGHT as i64 - 1) as u32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                if px * px + py * py <= r * r {
                    self.pixels.put_pixel(x, y, STROKE_COLOR);
                }
            }
        }
    }
}

/// Clips a segment to the canvas grown by the brush radius, so the stamp
/// count stays bounded however far away the endpoints are.
fn clip_to_canvas(from: Point, to: Point) -> Option<(Point, Point)> {
    if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
        return None;
    }
    let r = STROKE_WIDTH / 2.0;
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    // Liang-Barsky
    let edges = [
        (-dx, from.x + r),
        (dx, CANVAS_WIDTH as f32 + r - from.x),
        (-dy, from.y + r),
        (dy, CANVAS_HEIGHT as f32 + r - from.y),
    ];
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f32| Point::new(from.x + dx * t, from.y + dy * t);
    Some((at(t0), at(t1)))
}

// ── Saved drawings ───────────────────────────────────────────────────────

/// Ordered shelf of PNG data URLs persisted under [`DRAWINGS_KEY`].
pub struct SavedDrawings {
    entries: Vec<String>,
    store:   SharedStore,
}

impl SavedDrawings {
    pub fn load(store: SharedStore) -> Self {
        let entries = storage::load_string_list(store.as_ref(), DRAWINGS_KEY);
        Self { entries, store }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn push(&mut self, url: String) -> usize {
        self.entries.push(url);
        self.persist();
        self.entries.len() - 1
    }

    /// Remove by position; out-of-range is a no-op.
    pub fn delete(&mut self, index: usize) -> Option<String> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.persist();
        Some(removed)
    }

    fn persist(&self) {
        if let Err(e) = storage::save_string_list(self.store.as_ref(), DRAWINGS_KEY, &self.entries) {
            log::error!("Failed to save drawings: {}", e);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
