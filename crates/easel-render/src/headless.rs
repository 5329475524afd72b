#![forbid(unsafe_code)]

//! Headless test doubles: a recording backend and a static data provider.
//!
//! [`RecordingBackend`] behaves like a real paint target (accumulates
//! invalidations additively, honors the start/end bracket, reports a
//! dirty rect) but instead of drawing it records every protocol call for
//! assertions. [`StaticRenderData`] is a plain-struct provider whose fields
//! tests poke directly.
//!
//! Both are ordinary crate items (not test-gated) so integration tests and
//! benches can drive the full pipeline through the public API.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use easel_core::color::Rgb;
use easel_core::cursor::CursorStyle;
use easel_core::geometry::{Delta, Point, Rect, Viewport};

use crate::attrs::{ColorRef, GridLines, TextAttribute};
use crate::backend::{
    CursorPaint, FontInfo, FontRequest, FontSizePx, PaintStatus, RenderBackend,
};
use crate::buffer::TextBuffer;
use crate::data::{ImeComposition, RenderData};
use crate::error::{RenderError, Result};

/// The standard 16-color palette used by [`StaticRenderData`].
pub const ANSI_PALETTE: [Rgb; 16] = [
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0x80, 0x00, 0x00),
    Rgb::new(0x00, 0x80, 0x00),
    Rgb::new(0x80, 0x80, 0x00),
    Rgb::new(0x00, 0x00, 0x80),
    Rgb::new(0x80, 0x00, 0x80),
    Rgb::new(0x00, 0x80, 0x80),
    Rgb::new(0xC0, 0xC0, 0xC0),
    Rgb::new(0x80, 0x80, 0x80),
    Rgb::new(0xFF, 0x00, 0x00),
    Rgb::new(0x00, 0xFF, 0x00),
    Rgb::new(0xFF, 0xFF, 0x00),
    Rgb::new(0x00, 0x00, 0xFF),
    Rgb::new(0xFF, 0x00, 0xFF),
    Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0xFF, 0xFF, 0xFF),
];

/// A recorded paint-protocol call.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    StartPaint,
    /// The scroll replay, carrying the delta accumulated since the last
    /// bracket.
    ScrollFrame(Delta),
    Background,
    Brushes {
        foreground: Rgb,
        background: Rgb,
        legacy_attr: u16,
        bold: bool,
        include_background: bool,
    },
    Line {
        text: String,
        widths: Vec<u8>,
        target: Point,
        trim_left: bool,
        wrapped: bool,
    },
    GridLines {
        lines: GridLines,
        color: Rgb,
        length: usize,
        target: Point,
    },
    Selection(Rect),
    Cursor(CursorPaint),
    Title(String),
    UpdateDpi(u32),
    UpdateFont(String),
    EndPaint,
    Present,
}

/// Dirty rect placeholder for "everything": deliberately larger than any
/// buffer so the orchestrator's clamping is exercised.
const UNBOUNDED: Rect = Rect::new(0, 0, i32::MAX - 1, i32::MAX - 1);

const EMPTY: Rect = Rect::new(0, 0, -1, -1);

#[derive(Debug, Default)]
struct Inner {
    viewport: Option<Viewport>,
    dirty: Option<Rect>,
    title_dirty: bool,
    last_title: Option<String>,
    in_paint: bool,
    frames: usize,
    presents: usize,
    ops: Vec<PaintOp>,
    pending_scroll: Delta,
    fail_start_paint: bool,
    fail_background: bool,
    teardown_repaint: bool,
    circling_repaint: bool,
    font_size: Option<FontSizePx>,
    proposed_font: Option<FontInfo>,
    glyph_wide: Option<bool>,
}

impl Inner {
    fn add_dirty(&mut self, region: Rect) {
        if region.is_empty() {
            return;
        }
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(&region),
            None => region,
        });
    }

    fn local_bounds(&self) -> Option<Rect> {
        self.viewport
            .map(|v| Rect::from_dimensions(Point::new(0, 0), v.width(), v.height()))
    }
}

/// A backend that records instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Inner>>,
}

/// Shared view into a [`RecordingBackend`]'s state, kept by tests after
/// the backend itself has been boxed into the orchestrator.
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Arc<Mutex<Inner>>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingBackend {
    /// Create a clean backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle observing this backend's recorded state.
    pub fn handle(&self) -> RecordingHandle {
        RecordingHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RecordingHandle {
    /// Drain and return the recorded protocol calls.
    pub fn take_ops(&self) -> Vec<PaintOp> {
        std::mem::take(&mut lock(&self.inner).ops)
    }

    /// The currently accumulated dirty rect (degenerate when clean).
    pub fn dirty_rect(&self) -> Rect {
        lock(&self.inner).dirty.unwrap_or(EMPTY)
    }

    /// Number of completed paint brackets.
    pub fn frame_count(&self) -> usize {
        lock(&self.inner).frames
    }

    /// Number of `present` calls.
    pub fn present_count(&self) -> usize {
        lock(&self.inner).presents
    }

    /// The most recent title applied with `update_title`.
    pub fn last_title(&self) -> Option<String> {
        lock(&self.inner).last_title.clone()
    }

    /// Inject a failure into `start_paint`.
    pub fn set_fail_start_paint(&self, fail: bool) {
        lock(&self.inner).fail_start_paint = fail;
    }

    /// Inject a failure into `paint_background`.
    pub fn set_fail_background(&self, fail: bool) {
        lock(&self.inner).fail_background = fail;
    }

    /// Make `prepare_for_teardown` request a final frame.
    pub fn set_teardown_repaint(&self, wants: bool) {
        lock(&self.inner).teardown_repaint = wants;
    }

    /// Make `invalidate_circling` request a synchronous frame.
    pub fn set_circling_repaint(&self, wants: bool) {
        lock(&self.inner).circling_repaint = wants;
    }

    /// Configure the definite `font_size` answer (`None` = no opinion).
    pub fn set_font_size(&self, size: Option<FontSizePx>) {
        lock(&self.inner).font_size = size;
    }

    /// Configure the definite `proposed_font` answer.
    pub fn set_proposed_font(&self, font: Option<FontInfo>) {
        lock(&self.inner).proposed_font = font;
    }

    /// Configure the definite `is_glyph_wide` answer.
    pub fn set_glyph_wide(&self, wide: Option<bool>) {
        lock(&self.inner).glyph_wide = wide;
    }
}

impl RenderBackend for RecordingBackend {
    fn start_paint(&mut self) -> Result<PaintStatus> {
        let mut inner = lock(&self.inner);
        if inner.fail_start_paint {
            return Err(RenderError::Backend("injected start_paint failure".into()));
        }
        if inner.dirty.is_none() && !inner.title_dirty {
            return Ok(PaintStatus::NothingToDo);
        }
        inner.in_paint = true;
        inner.frames += 1;
        inner.ops.push(PaintOp::StartPaint);
        Ok(PaintStatus::Dirty)
    }

    fn invalidate(&mut self, region: &Rect) -> Result<()> {
        lock(&self.inner).add_dirty(*region);
        Ok(())
    }

    fn invalidate_system(&mut self, region: &Rect) -> Result<()> {
        lock(&self.inner).add_dirty(*region);
        Ok(())
    }

    fn invalidate_cell(&mut self, cell: Point) -> Result<()> {
        lock(&self.inner).add_dirty(Rect::from_cell(cell));
        Ok(())
    }

    fn invalidate_scroll(&mut self, delta: Delta) -> Result<()> {
        if delta.is_zero() {
            return Ok(());
        }
        let mut inner = lock(&self.inner);
        inner.pending_scroll = Delta::new(
            inner.pending_scroll.dx + delta.dx,
            inner.pending_scroll.dy + delta.dy,
        );
        let Some(local) = inner.local_bounds() else {
            inner.dirty = Some(UNBOUNDED);
            return Ok(());
        };
        // Shift retained damage with the frame content.
        inner.dirty = inner
            .dirty
            .and_then(|d| d.translate(delta).intersect(&local));
        // Newly exposed strips need painting.
        let (width, height) = (local.width(), local.height());
        if delta.dy < 0 {
            inner.add_dirty(Rect::new(0, height + delta.dy, width - 1, height - 1));
        } else if delta.dy > 0 {
            inner.add_dirty(Rect::new(0, 0, width - 1, delta.dy - 1));
        }
        if delta.dx < 0 {
            inner.add_dirty(Rect::new(width + delta.dx, 0, width - 1, height - 1));
        } else if delta.dx > 0 {
            inner.add_dirty(Rect::new(0, 0, delta.dx - 1, height - 1));
        }
        Ok(())
    }

    fn invalidate_selection(&mut self, rects: &[Rect]) -> Result<()> {
        let mut inner = lock(&self.inner);
        for rect in rects {
            inner.add_dirty(*rect);
        }
        Ok(())
    }

    fn invalidate_all(&mut self) -> Result<()> {
        let mut inner = lock(&self.inner);
        let everything = inner.local_bounds().unwrap_or(UNBOUNDED);
        inner.add_dirty(everything);
        Ok(())
    }

    fn invalidate_circling(&mut self) -> Result<bool> {
        Ok(lock(&self.inner).circling_repaint)
    }

    fn invalidate_title(&mut self, _title: &str) -> Result<()> {
        lock(&self.inner).title_dirty = true;
        Ok(())
    }

    fn dirty_rect(&self) -> Rect {
        lock(&self.inner).dirty.unwrap_or(EMPTY)
    }

    fn update_viewport(&mut self, viewport: Viewport) -> Result<()> {
        lock(&self.inner).viewport = Some(viewport);
        Ok(())
    }

    fn scroll_frame(&mut self) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        let pending = inner.pending_scroll;
        inner.ops.push(PaintOp::ScrollFrame(pending));
        Ok(())
    }

    fn paint_background(&mut self) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        if inner.fail_background {
            return Err(RenderError::Backend("injected background failure".into()));
        }
        inner.ops.push(PaintOp::Background);
        Ok(())
    }

    fn paint_buffer_line(
        &mut self,
        text: &str,
        widths: &[u8],
        target: Point,
        trim_left: bool,
        wrapped: bool,
    ) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.ops.push(PaintOp::Line {
            text: text.to_owned(),
            widths: widths.to_vec(),
            target,
            trim_left,
            wrapped,
        });
        Ok(())
    }

    fn paint_grid_lines(
        &mut self,
        lines: GridLines,
        color: Rgb,
        length: usize,
        target: Point,
    ) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.ops.push(PaintOp::GridLines {
            lines,
            color,
            length,
            target,
        });
        Ok(())
    }

    fn paint_selection(&mut self, rect: Rect) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.ops.push(PaintOp::Selection(rect));
        Ok(())
    }

    fn paint_cursor(&mut self, cursor: &CursorPaint) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.ops.push(PaintOp::Cursor(*cursor));
        Ok(())
    }

    fn update_drawing_brushes(
        &mut self,
        foreground: Rgb,
        background: Rgb,
        legacy_attr: u16,
        bold: bool,
        include_background: bool,
    ) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.ops.push(PaintOp::Brushes {
            foreground,
            background,
            legacy_attr,
            bold,
            include_background,
        });
        Ok(())
    }

    fn update_title(&mut self, title: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.last_title = Some(title.to_owned());
        inner.ops.push(PaintOp::Title(title.to_owned()));
        Ok(())
    }

    fn end_paint(&mut self) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(inner.in_paint);
        inner.in_paint = false;
        inner.dirty = None;
        inner.title_dirty = false;
        inner.pending_scroll = Delta::ZERO;
        inner.ops.push(PaintOp::EndPaint);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug_assert!(!inner.in_paint);
        inner.presents += 1;
        inner.ops.push(PaintOp::Present);
        Ok(())
    }

    fn prepare_for_teardown(&mut self) -> Result<bool> {
        Ok(lock(&self.inner).teardown_repaint)
    }

    fn update_dpi(&mut self, dpi: u32) -> Result<()> {
        lock(&self.inner).ops.push(PaintOp::UpdateDpi(dpi));
        Ok(())
    }

    fn update_font(&mut self, desired: &FontRequest, actual: &mut FontInfo) -> Result<()> {
        let mut inner = lock(&self.inner);
        if let Some(font) = &inner.proposed_font {
            *actual = font.clone();
        }
        inner.ops.push(PaintOp::UpdateFont(desired.family.clone()));
        Ok(())
    }

    fn proposed_font(&mut self, _dpi: u32, _desired: &FontRequest) -> Result<Option<FontInfo>> {
        Ok(lock(&self.inner).proposed_font.clone())
    }

    fn font_size(&self) -> Result<Option<FontSizePx>> {
        Ok(lock(&self.inner).font_size)
    }

    fn is_glyph_wide(&self, _glyph: &str) -> Result<Option<bool>> {
        Ok(lock(&self.inner).glyph_wide)
    }
}

/// A provider whose state is plain fields.
#[derive(Debug)]
pub struct StaticRenderData {
    pub buffer: TextBuffer,
    pub viewport: Viewport,
    pub selection: Vec<Rect>,
    pub cursor: Point,
    pub cursor_visible: bool,
    pub cursor_double_width: bool,
    pub cursor_style: CursorStyle,
    pub cursor_color: Option<Rgb>,
    pub title: String,
    pub default_attr: TextAttribute,
    pub default_foreground: Rgb,
    pub default_background: Rgb,
    pub ime: Vec<ImeComposition>,
    pub grid_lines_allowed: bool,
}

impl StaticRenderData {
    /// A blank buffer with the viewport covering all of it.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: TextBuffer::new(width, height, TextAttribute::new()),
            viewport: Viewport::new(Point::new(0, 0), width as i32, height as i32),
            selection: Vec::new(),
            cursor: Point::new(0, 0),
            cursor_visible: true,
            cursor_double_width: false,
            cursor_style: CursorStyle::Legacy,
            cursor_color: None,
            title: String::new(),
            default_attr: TextAttribute::new(),
            default_foreground: ANSI_PALETTE[7],
            default_background: ANSI_PALETTE[0],
            ime: Vec::new(),
            grid_lines_allowed: true,
        }
    }

    fn resolve(&self, color: ColorRef, default: Rgb) -> Rgb {
        match color {
            ColorRef::Default => default,
            ColorRef::Indexed(i) => ANSI_PALETTE[(i & 0x0F) as usize],
            ColorRef::Rgb(rgb) => rgb,
        }
    }
}

impl RenderData for StaticRenderData {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn text_buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    fn selection_rects(&self) -> Vec<Rect> {
        self.selection.clone()
    }

    fn cursor_position(&self) -> Point {
        self.cursor
    }

    fn is_cursor_double_width(&self) -> bool {
        self.cursor_double_width
    }

    fn cursor_style(&self) -> CursorStyle {
        self.cursor_style
    }

    fn cursor_color(&self) -> Option<Rgb> {
        self.cursor_color
    }

    fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn foreground_color(&self, attr: &TextAttribute) -> Rgb {
        self.resolve(attr.foreground, self.default_foreground)
    }

    fn background_color(&self, attr: &TextAttribute) -> Rgb {
        self.resolve(attr.background, self.default_background)
    }

    fn default_attribute(&self) -> TextAttribute {
        self.default_attr
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn ime_compositions(&self) -> &[ImeComposition] {
        &self.ime
    }

    fn is_grid_line_drawing_allowed(&self) -> bool {
        self.grid_lines_allowed
    }
}
