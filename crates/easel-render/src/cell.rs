#![forbid(unsafe_code)]

//! The cell: one buffer position.
//!
//! A double-width glyph occupies exactly two adjacent cells: a `Leading`
//! cell followed by a `Trailing` cell, both storing the same character.
//! The frame painter collapses such pairs into a single emission of width
//! 2; the trailing copy exists so that a repaint that starts mid-glyph can
//! still recover the character.

/// Width marker for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WideMarker {
    /// An ordinary single-width cell.
    #[default]
    Single,
    /// Left half of a double-width glyph.
    Leading,
    /// Right half of a double-width glyph; duplicates the leading char.
    Trailing,
}

/// One position in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub marker: WideMarker,
}

impl Cell {
    /// An empty single-width cell.
    pub const BLANK: Self = Self {
        ch: ' ',
        marker: WideMarker::Single,
    };

    /// A single-width cell holding `ch`.
    #[inline]
    pub const fn new(ch: char) -> Self {
        Self {
            ch,
            marker: WideMarker::Single,
        }
    }

    /// True for the left half of a double-width pair.
    #[inline]
    pub const fn is_leading(&self) -> bool {
        matches!(self.marker, WideMarker::Leading)
    }

    /// True for the right half of a double-width pair.
    #[inline]
    pub const fn is_trailing(&self) -> bool {
        matches!(self.marker, WideMarker::Trailing)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}
