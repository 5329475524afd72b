#![forbid(unsafe_code)]

//! The paint-protocol contract every output backend implements.
//!
//! This trait is the one ABI boundary of the subsystem: a new output target
//! (GPU surface, raster window, text stream) only has to implement
//! [`RenderBackend`] to be driven by the orchestrator.
//!
//! # Protocol
//!
//! - The `invalidate_*` family is purely additive: backends accumulate
//!   invalid regions until the next paint bracket consumes them.
//! - Drawing primitives are called only between a `Dirty`-returning
//!   [`start_paint`](RenderBackend::start_paint) and the matching
//!   [`end_paint`](RenderBackend::end_paint).
//!   [`present`](RenderBackend::present) follows `end_paint`, outside the
//!   console lock, and must not read buffer state.
//! - Speculative queries (`proposed_font`, `font_size`, `is_glyph_wide`)
//!   are usable outside the bracket and answer `Ok(None)` when the backend
//!   has no opinion (e.g. a text-stream backend has no font).
//!
//! Coordinates handed to backends are viewport-local unless noted.

use easel_core::color::Rgb;
use easel_core::cursor::CursorStyle;
use easel_core::geometry::{Delta, Point, Rect, Viewport};

use crate::attrs::GridLines;
use crate::error::Result;

/// Outcome of opening a paint bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStatus {
    /// The backend has pending invalid regions; run the pipeline.
    Dirty,
    /// Nothing accumulated since the last frame; skip this backend.
    NothingToDo,
}

/// Everything a backend needs to strike the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPaint {
    /// Viewport-local cell the cursor occupies.
    pub position: Point,
    /// Height percentage for the legacy partial-block style.
    pub height: u32,
    /// True when the cursor covers a double-width pair; the backend paints
    /// the adjacent half as well.
    pub double_width: bool,
    pub style: CursorStyle,
    /// Explicit color, or `None` for the backend's inverse default.
    pub color: Option<Rgb>,
}

/// A font the host would like to use.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRequest {
    pub family: String,
    pub size_pt: f32,
    pub weight: u16,
}

/// The font a backend actually selected.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub family: String,
    pub size_pt: f32,
    pub weight: u16,
    /// Resulting cell size in pixels.
    pub cell_size: FontSizePx,
}

/// Pixel dimensions of one character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSizePx {
    pub width: u16,
    pub height: u16,
}

impl FontSizePx {
    /// Create a cell size.
    #[inline]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for FontSizePx {
    /// The 1×1 placeholder used when no backend has a real font.
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A pluggable paint target.
pub trait RenderBackend: Send {
    /// Begin a paint bracket.
    fn start_paint(&mut self) -> Result<PaintStatus>;

    /// Mark a viewport-local character region as needing repaint.
    fn invalidate(&mut self, region: &Rect) -> Result<()>;

    /// Window-system damage, forwarded verbatim in viewport-local cells.
    fn invalidate_system(&mut self, region: &Rect) -> Result<()>;

    /// Mark the single (viewport-local) cursor cell.
    fn invalidate_cell(&mut self, cell: Point) -> Result<()>;

    /// The viewport scrolled by `delta`; shift accumulated damage and mark
    /// the newly exposed strip.
    fn invalidate_scroll(&mut self, delta: Delta) -> Result<()>;

    /// Mark each rect of a selection set (viewport-local).
    fn invalidate_selection(&mut self, rects: &[Rect]) -> Result<()>;

    /// Everything is invalid.
    fn invalidate_all(&mut self) -> Result<()>;

    /// The backing buffer is about to rotate. Returns true when the
    /// backend wants one synchronous frame before that happens.
    fn invalidate_circling(&mut self) -> Result<bool>;

    /// The title changed; repaint it next frame.
    fn invalidate_title(&mut self, title: &str) -> Result<()>;

    /// The backend's union of pending invalid regions, viewport-local.
    ///
    /// May be larger than the buffer or viewport (window-manager damage);
    /// the orchestrator clamps before use.
    fn dirty_rect(&self) -> Rect;

    /// The viewport for the coming frame.
    fn update_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Shift the cached frame by the accumulated scroll delta.
    fn scroll_frame(&mut self) -> Result<()>;

    /// Fill the dirty region with the current background brush.
    fn paint_background(&mut self) -> Result<()>;

    /// Draw one run of text.
    ///
    /// `widths[i]` is the cell width (1 or 2) of `text`'s i-th character.
    /// `trim_left` asks the backend to clip the leftmost half of the first
    /// glyph: the run started on the trailing half of a wide pair and the
    /// target was backed up one cell to compensate.
    fn paint_buffer_line(
        &mut self,
        text: &str,
        widths: &[u8],
        target: Point,
        trim_left: bool,
        wrapped: bool,
    ) -> Result<()>;

    /// Inscribe box-drawing edges along `length` cells starting at `target`.
    fn paint_grid_lines(
        &mut self,
        lines: GridLines,
        color: Rgb,
        length: usize,
        target: Point,
    ) -> Result<()>;

    /// Highlight one selection rect (viewport-local, pre-clipped).
    fn paint_selection(&mut self, rect: Rect) -> Result<()>;

    /// Strike the cursor.
    fn paint_cursor(&mut self, cursor: &CursorPaint) -> Result<()>;

    /// Set the brushes used by subsequent draws.
    ///
    /// `include_background` is set when the frame's defaults are being
    /// established, not when colors swap mid-row.
    fn update_drawing_brushes(
        &mut self,
        foreground: Rgb,
        background: Rgb,
        legacy_attr: u16,
        bold: bool,
        include_background: bool,
    ) -> Result<()>;

    /// Apply the (possibly unchanged) title; backends may no-op.
    fn update_title(&mut self, title: &str) -> Result<()>;

    /// Close the paint bracket, consuming accumulated invalidation.
    fn end_paint(&mut self) -> Result<()>;

    /// Finalize display of the painted frame. Runs outside the console
    /// lock; must not read buffer state.
    fn present(&mut self) -> Result<()>;

    /// Queried once at shutdown. Returns true when the backend needs one
    /// final synchronous repaint before destruction.
    fn prepare_for_teardown(&mut self) -> Result<bool>;

    /// The display's DPI changed.
    fn update_dpi(&mut self, dpi: u32) -> Result<()>;

    /// Select a new font; backends fix up `actual` with what they chose.
    fn update_font(&mut self, desired: &FontRequest, actual: &mut FontInfo) -> Result<()>;

    /// What font would this backend pick for `desired` at `dpi`?
    /// `Ok(None)` means no opinion.
    fn proposed_font(&mut self, dpi: u32, desired: &FontRequest) -> Result<Option<FontInfo>>;

    /// Current cell size in pixels; `Ok(None)` means no opinion.
    fn font_size(&self) -> Result<Option<FontSizePx>>;

    /// Is `glyph` full-width under the backend's font? `Ok(None)` means no
    /// opinion.
    fn is_glyph_wide(&self, glyph: &str) -> Result<Option<bool>>;
}
