//! Annotated review of a recording
//!
//! [`VisualReplayEngine`] pairs the recorded screenshots with annotations
//! derived from the action list and composites them on demand. It never
//! touches input devices.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::Builder;
use thiserror::Error;

use crate::replay::action::{ActionRecord, MouseButton};
use crate::replay::annotation::{
    generate_annotations, Annotation, AnnotationKind, DEFAULT_ANNOTATION_DURATION,
};
use crate::replay::draw;
use crate::replay::recording::{FrameFile, RecordingDir, RecordingError, FRAME_RATE};

/// Added before flooring in [`VisualReplayEngine::get_frame_at_time`] so
/// that `f / rate * rate` lands back on `f`
const FRAME_EPSILON: f64 = 1e-9;

const CLICK_LEFT: Rgba<u8> = Rgba([235, 64, 52, 255]);
const CLICK_RIGHT: Rgba<u8> = Rgba([52, 120, 235, 255]);
const CLICK_MIDDLE: Rgba<u8> = Rgba([60, 200, 90, 255]);
const TRAIL: Rgba<u8> = Rgba([250, 210, 50, 255]);
const DRAG: Rgba<u8> = Rgba([240, 140, 30, 255]);
const SCROLL: Rgba<u8> = Rgba([180, 90, 230, 255]);
const FOCUS: Rgba<u8> = Rgba([40, 210, 220, 255]);
const TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_BOX: Rgba<u8> = Rgba([0, 0, 0, 255]);

const RIPPLE_MIN_RADIUS: f32 = 8.0;
const RIPPLE_GROWTH: f32 = 22.0;
const LABEL_SCALE: u32 = 2;
const TEXT_MARGIN: i32 = 10;
const TEXT_PADDING: u32 = 6;
const SCROLL_ARROW_LEN: i32 = 28;
const FOCUS_BORDER: u32 = 4;

#[derive(Error, Debug)]
pub enum VisualError {
    #[error("No recording loaded")]
    NotLoaded,
    #[error("Frame {frame} out of range ({count} frames)")]
    FrameOutOfRange { frame: usize, count: usize },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct VisualReplayEngine {
    frame_rate: f64,
    annotation_duration: f64,
    root: Option<PathBuf>,
    frames: Vec<FrameFile>,
    frame_size: Option<(u32, u32)>,
    annotations: Vec<Annotation>,
}

impl Default for VisualReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualReplayEngine {
    pub fn new() -> Self {
        Self {
            frame_rate: FRAME_RATE,
            annotation_duration: DEFAULT_ANNOTATION_DURATION,
            root: None,
            frames: Vec::new(),
            frame_size: None,
            annotations: Vec::new(),
        }
    }

    /// Override the capture rate. Non-positive or non-finite rates are ignored.
    pub fn with_frame_rate(mut self, rate: f64) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.frame_rate = rate;
        } else {
            tracing::warn!(rate, "Ignoring invalid frame rate");
        }
        self
    }

    pub fn with_annotation_duration(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds >= 0.0 {
            self.annotation_duration = seconds;
        }
        self
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Scan `dir` and load its frames and annotations. Returns `Ok(false)`
    /// when the directory has no frames.
    pub fn load_recording(&mut self, dir: &Path) -> Result<bool, VisualError> {
        let recording = RecordingDir::scan(dir)?;
        Ok(self.load_scanned(&recording))
    }

    /// Load from an already scanned recording
    pub fn load_scanned(&mut self, recording: &RecordingDir) -> bool {
        self.frames = recording.frames.clone();
        self.annotations = generate_annotations(&recording.actions, self.annotation_duration);
        self.root = Some(recording.root.clone());
        self.frame_size = self.frames.first().and_then(|frame| {
            image::image_dimensions(&frame.path)
                .map_err(|e| {
                    tracing::warn!(path = %frame.path.display(), error = %e, "Failed to read frame header");
                })
                .ok()
        });

        tracing::info!(
            root = %recording.root.display(),
            frames = self.frames.len(),
            annotations = self.annotations.len(),
            "Loaded recording for visual replay"
        );
        !self.frames.is_empty()
    }

    /// Replace the annotations with ones generated from `actions`
    pub fn set_actions(&mut self, actions: &[ActionRecord]) {
        self.annotations = generate_annotations(actions, self.annotation_duration);
    }

    /// Insert a host-supplied annotation (e.g. a window focus change),
    /// keeping timestamp order
    pub fn add_annotation(&mut self, annotation: Annotation) {
        let at = self
            .annotations
            .partition_point(|a| a.timestamp <= annotation.timestamp);
        self.annotations.insert(at, annotation);
    }

    pub fn is_loaded(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame dimensions, from the first frame's header
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    /// Length of the screenshot sequence in seconds
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.frame_rate
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get_frame_at_time(&self, t: f64) -> usize {
        if t.is_nan() || t <= 0.0 {
            return 0;
        }
        (t * self.frame_rate + FRAME_EPSILON).floor() as usize
    }

    pub fn get_time_at_frame(&self, frame: usize) -> f64 {
        frame as f64 / self.frame_rate
    }

    /// Annotations visible on `frame`, in paint order
    pub fn annotations_at_frame(&self, frame: usize) -> Vec<&Annotation> {
        let t = self.get_time_at_frame(frame);
        self.annotations
            .iter()
            .filter(|a| a.is_visible_at(t))
            .collect()
    }

    /// Decode `frame` and draw every annotation visible at its time onto it
    pub fn render_frame(&self, frame: usize) -> Result<RgbaImage, VisualError> {
        if self.frames.is_empty() {
            return Err(VisualError::NotLoaded);
        }
        let file = self.frames.get(frame).ok_or(VisualError::FrameOutOfRange {
            frame,
            count: self.frames.len(),
        })?;

        let mut img = image::open(&file.path)?.to_rgba8();
        let t = self.get_time_at_frame(frame);
        for annotation in self.annotations_at_frame(frame) {
            draw_annotation(&mut img, annotation, t);
        }
        Ok(img)
    }

    /// Render `frame` and write it as a PNG. The file is replaced atomically.
    pub fn render_frame_to(&self, frame: usize, path: &Path) -> Result<(), VisualError> {
        let img = self.render_frame(frame)?;

        let mut png: Vec<u8> = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = Builder::new()
            .prefix(".frame-")
            .suffix(".png")
            .tempfile_in(parent)?;
        tmp.write_all(&png)?;
        tmp.persist(path).map_err(|e| VisualError::Io(e.error))?;

        tracing::debug!(frame, path = %path.display(), "Rendered frame");
        Ok(())
    }
}

fn draw_annotation(img: &mut RgbaImage, annotation: &Annotation, t: f64) {
    let progress = annotation.progress_at(t) as f32;
    let (x, y) = annotation.position;

    match &annotation.kind {
        AnnotationKind::MouseClick { button } => {
            let color = match button {
                MouseButton::Left => CLICK_LEFT,
                MouseButton::Right => CLICK_RIGHT,
                MouseButton::Middle => CLICK_MIDDLE,
            };
            let radius = RIPPLE_MIN_RADIUS + RIPPLE_GROWTH * progress;
            draw::draw_ring(img, (x, y), radius, 3.0, color, 0.9 * (1.0 - progress));
            draw::fill_circle(img, (x, y), 4.0, color, 1.0);
            let label = button.label();
            let (w, h) = draw::text_size(label, LABEL_SCALE);
            let (lx, ly) = (x.saturating_add(10), y.saturating_sub(10 + h as i32));
            draw::fill_rect(
                img,
                lx.saturating_sub(2),
                ly.saturating_sub(2),
                w + 4,
                h + 4,
                TEXT_BOX,
                0.6,
            );
            draw::draw_text(img, lx, ly, label, LABEL_SCALE, color, 1.0);
        }
        AnnotationKind::MouseMove => {
            draw::fill_circle(img, (x, y), 3.0, TRAIL, 0.7 * (1.0 - 0.5 * progress));
        }
        AnnotationKind::KeyboardInput { text } => {
            draw_text_box(img, text);
        }
        AnnotationKind::WindowFocus { title } => {
            draw::draw_rect_outline(
                img,
                0,
                0,
                img.width(),
                img.height(),
                FOCUS_BORDER,
                FOCUS,
                0.8 * (1.0 - 0.5 * progress),
            );
            if !title.is_empty() {
                let inset = (FOCUS_BORDER + TEXT_PADDING) as i32;
                draw::draw_text(img, inset, inset, title, LABEL_SCALE, FOCUS, 1.0);
            }
        }
        AnnotationKind::Scroll { dx, dy } => {
            // Positive dy scrolls up
            let to = (
                x.saturating_add(dx.signum() * SCROLL_ARROW_LEN),
                y.saturating_sub(dy.signum() * SCROLL_ARROW_LEN),
            );
            if to != (x, y) {
                draw::draw_arrow(img, (x, y), to, 3.0, SCROLL, 0.9 * (1.0 - 0.5 * progress));
            }
        }
        AnnotationKind::Drag { from } => {
            let opacity = 0.9 * (1.0 - 0.5 * progress);
            draw::draw_line(img, *from, (x, y), 3.0, DRAG, opacity);
            draw::fill_circle(img, *from, 4.0, DRAG, opacity);
            draw::fill_circle(img, (x, y), 4.0, DRAG, opacity);
        }
    }
}

/// Keyboard overlay anchored at the bottom-left corner
fn draw_text_box(img: &mut RgbaImage, text: &str) {
    let advance = (draw::GLYPH_WIDTH + 1) * LABEL_SCALE;
    let room = img
        .width()
        .saturating_sub((2 * TEXT_MARGIN) as u32 + 2 * TEXT_PADDING);
    let max_chars = (room / advance).max(1) as usize;
    let shown: String = text.chars().take(max_chars).collect();

    let (w, h) = draw::text_size(&shown, LABEL_SCALE);
    let box_w = w + 2 * TEXT_PADDING;
    let box_h = h + 2 * TEXT_PADDING;
    let box_x = TEXT_MARGIN;
    let box_y = img.height() as i32 - TEXT_MARGIN - box_h as i32;

    draw::fill_rect(img, box_x, box_y, box_w, box_h, TEXT_BOX, 0.7);
    draw::draw_text(
        img,
        box_x + TEXT_PADDING as i32,
        box_y + TEXT_PADDING as i32,
        &shown,
        LABEL_SCALE,
        TEXT,
        1.0,
    );
}
