#![forbid(unsafe_code)]

//! The character-cell backing buffer.
//!
//! A [`TextBuffer`] is a fixed-size grid of [`Row`]s. The orchestrator only
//! ever reads it (through the data-provider trait); the mutation API here
//! is the minimum a provider implementation needs: wide-glyph-aware text
//! writes, attribute fills, wrap flags, and the row rotation a circular
//! scrollback performs underneath an unmoved viewport.
//!
//! # Invariants
//!
//! 1. Every row is exactly `width` cells wide.
//! 2. Leading/Trailing markers always come in adjacent pairs; a write that
//!    would split a pair at the row edge stores a blank instead.
//! 3. A row's attribute runs cover the full width (see [`AttrRow`]).

use easel_core::geometry::{Point, Rect};
use unicode_width::UnicodeWidthChar;

use crate::attrs::{AttrRow, TextAttribute};
use crate::cell::{Cell, WideMarker};

/// One line of the buffer: cells, attribute runs, and the wrap flag.
#[derive(Debug, Clone)]
pub struct Row {
    cells: Vec<Cell>,
    attrs: AttrRow,
    wrap_forced: bool,
}

impl Row {
    fn new(width: usize, attr: TextAttribute) -> Self {
        Self {
            cells: vec![Cell::BLANK; width],
            attrs: AttrRow::new(width, attr),
            wrap_forced: false,
        }
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// All cells, left to right.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell at `x`, if in bounds.
    #[inline]
    pub fn cell(&self, x: usize) -> Option<&Cell> {
        self.cells.get(x)
    }

    /// Attribute runs for this row.
    #[inline]
    pub fn attrs(&self) -> &AttrRow {
        &self.attrs
    }

    /// Mutable attribute runs for this row.
    #[inline]
    pub fn attrs_mut(&mut self) -> &mut AttrRow {
        &mut self.attrs
    }

    /// True when this row ends in a forced (soft) wrap rather than a hard
    /// newline.
    #[inline]
    pub fn wrap_forced(&self) -> bool {
        self.wrap_forced
    }

    /// Mark or clear the forced-wrap flag.
    #[inline]
    pub fn set_wrap_forced(&mut self, wrapped: bool) {
        self.wrap_forced = wrapped;
    }

    /// One past the last occupied column; 0 for a blank row.
    pub fn measure_right(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| *c != Cell::BLANK)
            .map_or(0, |i| i + 1)
    }

    fn clear_cell(&mut self, x: usize) {
        // Splitting a wide pair leaves the orphaned half blank.
        match self.cells[x].marker {
            WideMarker::Leading => {
                if x + 1 < self.cells.len() {
                    self.cells[x + 1] = Cell::BLANK;
                }
            }
            WideMarker::Trailing => {
                if x > 0 {
                    self.cells[x - 1] = Cell::BLANK;
                }
            }
            WideMarker::Single => {}
        }
        self.cells[x] = Cell::BLANK;
    }
}

/// A fixed-size grid of rows.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    width: usize,
    height: usize,
    rows: Vec<Row>,
}

impl TextBuffer {
    /// Create a blank buffer covered by `attr`.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is 0.
    pub fn new(width: usize, height: usize, attr: TextAttribute) -> Self {
        assert!(width > 0, "buffer width must be > 0");
        assert!(height > 0, "buffer height must be > 0");
        Self {
            width,
            height,
            rows: (0..height).map(|_| Row::new(width, attr)).collect(),
        }
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Inclusive bounds of the whole buffer.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_dimensions(Point::new(0, 0), self.width as i32, self.height as i32)
    }

    /// The row at index `y`, if in bounds.
    #[inline]
    pub fn row(&self, y: i32) -> Option<&Row> {
        usize::try_from(y).ok().and_then(|y| self.rows.get(y))
    }

    /// Mutable access to the row at index `y`.
    #[inline]
    pub fn row_mut(&mut self, y: i32) -> Option<&mut Row> {
        usize::try_from(y).ok().and_then(|y| self.rows.get_mut(y))
    }

    /// Write `text` starting at `(x, y)`, classifying glyph widths.
    ///
    /// Double-width glyphs are stored as a Leading + Trailing pair; a wide
    /// glyph that would not fit before the row edge (or the end of a
    /// partially overwritten pair) is dropped. Zero-width characters are
    /// skipped. Returns the number of cells written.
    pub fn write_str(&mut self, x: usize, y: usize, text: &str) -> usize {
        let width = self.width;
        let Some(row) = self.rows.get_mut(y) else {
            return 0;
        };
        let mut col = x;
        for ch in text.chars() {
            let glyph_width = ch.width().unwrap_or(0);
            if glyph_width == 0 {
                continue;
            }
            if col >= width {
                break;
            }
            if glyph_width >= 2 {
                if col + 1 >= width {
                    // No room for the pair; blank the remainder instead.
                    row.clear_cell(col);
                    col += 1;
                    break;
                }
                row.clear_cell(col);
                row.clear_cell(col + 1);
                row.cells[col] = Cell {
                    ch,
                    marker: WideMarker::Leading,
                };
                row.cells[col + 1] = Cell {
                    ch,
                    marker: WideMarker::Trailing,
                };
                col += 2;
            } else {
                row.clear_cell(col);
                row.cells[col] = Cell::new(ch);
                col += 1;
            }
        }
        col - x
    }

    /// Apply `attr` to `length` cells of row `y` starting at `x`.
    pub fn fill_attr(&mut self, x: usize, y: usize, length: usize, attr: TextAttribute) {
        if let Some(row) = self.rows.get_mut(y) {
            row.attrs.set_range(x, length, attr);
        }
    }

    /// Rotate `count` rows out of the top, appending blank rows at the
    /// bottom.
    ///
    /// This is what a circular scrollback does when it circles: the
    /// viewport does not move, the content underneath it does. Callers pair
    /// this with the explicit-delta scroll trigger.
    pub fn rotate_up(&mut self, count: usize, attr: TextAttribute) {
        let count = count.min(self.height);
        if count == 0 {
            return;
        }
        self.rows.drain(..count);
        self.rows
            .extend((0..count).map(|_| Row::new(self.width, attr)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::ColorRef;

    fn buffer(w: usize, h: usize) -> TextBuffer {
        TextBuffer::new(w, h, TextAttribute::new())
    }

    #[test]
    fn write_ascii() {
        let mut buf = buffer(20, 5);
        assert_eq!(buf.write_str(0, 1, "Hello"), 5);
        assert_eq!(buf.row(1).unwrap().cell(0).unwrap().ch, 'H');
        assert_eq!(buf.row(1).unwrap().cell(4).unwrap().ch, 'o');
        assert_eq!(buf.row(1).unwrap().cell(5).unwrap(), &Cell::BLANK);
    }

    #[test]
    fn write_wide_stores_pair() {
        let mut buf = buffer(10, 1);
        assert_eq!(buf.write_str(2, 0, "中"), 2);
        let row = buf.row(0).unwrap();
        assert!(row.cell(2).unwrap().is_leading());
        assert!(row.cell(3).unwrap().is_trailing());
        assert_eq!(row.cell(2).unwrap().ch, '中');
        assert_eq!(row.cell(3).unwrap().ch, '中');
    }

    #[test]
    fn wide_refused_at_row_edge() {
        let mut buf = buffer(4, 1);
        buf.write_str(3, 0, "中");
        let row = buf.row(0).unwrap();
        assert_eq!(row.cell(3).unwrap(), &Cell::BLANK);
    }

    #[test]
    fn overwriting_half_a_pair_blanks_the_other_half() {
        let mut buf = buffer(10, 1);
        buf.write_str(2, 0, "中");
        buf.write_str(3, 0, "x");
        let row = buf.row(0).unwrap();
        assert_eq!(row.cell(2).unwrap(), &Cell::BLANK);
        assert_eq!(row.cell(3).unwrap().ch, 'x');
    }

    #[test]
    fn measure_right_finds_last_occupied() {
        let mut buf = buffer(20, 1);
        assert_eq!(buf.row(0).unwrap().measure_right(), 0);
        buf.write_str(0, 0, "Hello World");
        assert_eq!(buf.row(0).unwrap().measure_right(), 11);
    }

    #[test]
    fn bounds_are_inclusive() {
        let buf = buffer(80, 24);
        assert_eq!(buf.bounds(), Rect::new(0, 0, 79, 23));
    }

    #[test]
    fn row_out_of_bounds_is_none() {
        let buf = buffer(10, 5);
        assert!(buf.row(-1).is_none());
        assert!(buf.row(5).is_none());
    }

    #[test]
    fn fill_attr_updates_runs() {
        let mut buf = buffer(10, 2);
        let red = TextAttribute::new().with_foreground(ColorRef::Indexed(1));
        buf.fill_attr(2, 0, 3, red);
        let (attr, applies) = buf.row(0).unwrap().attrs().attr_at(2).unwrap();
        assert_eq!(*attr, red);
        assert_eq!(applies, 3);
    }

    #[test]
    fn rotate_up_shifts_content() {
        let mut buf = buffer(10, 3);
        buf.write_str(0, 0, "top");
        buf.write_str(0, 1, "mid");
        buf.rotate_up(1, TextAttribute::new());
        assert_eq!(buf.row(0).unwrap().cell(0).unwrap().ch, 'm');
        assert_eq!(buf.row(2).unwrap().cell(0).unwrap(), &Cell::BLANK);
        assert_eq!(buf.height(), 3);
    }
}
