#![forbid(unsafe_code)]

//! The read-only capability interface the orchestrator consumes.
//!
//! Everything the frame painter knows about the world comes through
//! [`RenderData`]: the buffer, the viewport, the cursor, the selection, the
//! title, color resolution, and any active IME composition overlays. The
//! orchestrator never mutates provider state.
//!
//! Implementations live on the mutator side of the console lock; the
//! painter holds that lock for the whole time it reads from the trait.

use easel_core::color::Rgb;
use easel_core::cursor::CursorStyle;
use easel_core::geometry::{Point, Rect, Viewport};

use crate::attrs::TextAttribute;
use crate::buffer::TextBuffer;

/// An IME composition overlay: a small auxiliary buffer painted on top of
/// the main buffer while the user composes input.
#[derive(Debug, Clone)]
pub struct ImeComposition {
    /// Hidden overlays (switched off, or suppressed during a scroll) are
    /// skipped entirely.
    pub hidden: bool,
    /// View into `buffer`, in the overlay's own coordinates.
    ///
    /// Convention differs from the rest of the subsystem: `right` and
    /// `bottom` are EXCLUSIVE here. The painter converts explicitly when
    /// clipping against the inclusive dirty rectangle.
    pub window: Rect,
    /// Where the overlay's (0, 0) lands in buffer-absolute coordinates.
    pub origin: Point,
    /// Backing buffer for the composition text, typically one row.
    pub buffer: TextBuffer,
}

/// Read access to the console state needed to compose a frame.
pub trait RenderData {
    /// The currently visible window into the buffer.
    fn viewport(&self) -> Viewport;

    /// The backing text buffer.
    fn text_buffer(&self) -> &TextBuffer;

    /// The selected region, one inclusive rect per covered row, in
    /// buffer-absolute coordinates. Empty when nothing is selected.
    fn selection_rects(&self) -> Vec<Rect>;

    /// Cursor position in buffer-absolute coordinates.
    fn cursor_position(&self) -> Point;

    /// Cursor height as a percentage of the cell (legacy style only).
    fn cursor_height(&self) -> u32 {
        25
    }

    /// True when the cursor sits on the leading half of a wide glyph.
    fn is_cursor_double_width(&self) -> bool {
        false
    }

    /// Shape the cursor should be struck with.
    fn cursor_style(&self) -> CursorStyle {
        CursorStyle::Legacy
    }

    /// Explicit cursor color; `None` means the backend's inverse default.
    fn cursor_color(&self) -> Option<Rgb> {
        None
    }

    /// False hides the cursor entirely.
    fn is_cursor_visible(&self) -> bool;

    /// Resolve an attribute's foreground reference to a concrete color.
    fn foreground_color(&self, attr: &TextAttribute) -> Rgb;

    /// Resolve an attribute's background reference to a concrete color.
    fn background_color(&self, attr: &TextAttribute) -> Rgb;

    /// The attribute whose resolved colors are the frame's default brushes.
    fn default_attribute(&self) -> TextAttribute;

    /// Current window title.
    fn title(&self) -> String;

    /// Active IME composition overlays; empty when not composing.
    fn ime_compositions(&self) -> &[ImeComposition] {
        &[]
    }

    /// Whether box-drawing grid lines may be painted this frame.
    fn is_grid_line_drawing_allowed(&self) -> bool {
        true
    }
}
